//! Map and table rendering of aggregated rows.

use accident_map_analysis_models::{
    AggregatedTable, CircleMarker, ColumnMapping, FILL_OPACITY, LatLng, MapDescriptor,
    MapSettings, MarkerColor, RenderedView,
};
use accident_map_dataset_models::FieldLookup;

/// Builds the map descriptor and table rows for an aggregated table.
///
/// Rows without coordinates are left off the map but always appear in the
/// table rows.
#[must_use]
pub fn render(
    table: AggregatedTable,
    columns: &ColumnMapping,
    settings: &MapSettings,
) -> RenderedView {
    let markers: Vec<CircleMarker> = table
        .rows
        .iter()
        .filter_map(|row| {
            let location = row.coordinates?;
            let name = columns
                .intersection_name
                .as_deref()
                .and_then(|column| row.fields.field(column))
                .map_or_else(|| settings.unknown_label.clone(), ToString::to_string);

            Some(CircleMarker {
                location,
                radius: CircleMarker::radius_for(row.accident_count),
                color: MarkerColor::for_count(row.accident_count),
                fill: true,
                fill_opacity: FILL_OPACITY,
                popup: format!("{name}：{}{}", row.accident_count, settings.count_suffix),
                accident_count: row.accident_count,
            })
        })
        .collect();

    let (center, message) = match mean_position(&markers) {
        Some(center) => (center, None),
        None => (
            settings.fallback(),
            Some(settings.no_coordinates_message.clone()),
        ),
    };

    log::debug!(
        "Rendered {} markers from {} rows",
        markers.len(),
        table.rows.len()
    );

    RenderedView {
        join_key: table.join_key,
        map: MapDescriptor {
            center,
            zoom: settings.zoom,
            markers,
            message,
        },
        table_rows: table.rows.into_iter().map(|row| row.fields).collect(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_position(markers: &[CircleMarker]) -> Option<LatLng> {
    if markers.is_empty() {
        return None;
    }
    let n = markers.len() as f64;
    let lat = markers.iter().map(|m| m.location.lat).sum::<f64>() / n;
    let lng = markers.iter().map(|m| m.location.lng).sum::<f64>() / n;
    Some(LatLng { lat, lng })
}
