#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Filter, join/aggregate, coordinate, and map rendering pipeline for the
//! accident map.
//!
//! Each request runs the same single pass over the loaded tables:
//!
//! 1. [`filter::filter_regulations`] narrows the regulation table by area
//!    and intersection name.
//! 2. [`aggregate::aggregate`] counts accidents per join key and left-joins
//!    the counts on.
//! 3. [`coordinates::normalize`] resolves each row's position.
//! 4. [`render::render`] builds the marker list and the table rows.
//!
//! Every stage is a pure function of its inputs.

pub mod aggregate;
pub mod coordinates;
pub mod filter;
pub mod render;

use accident_map_analysis_models::{ColumnMapping, FilterCriteria, MapSettings, RenderedView};
use accident_map_dataset_models::{Cell, Table};

/// Distinct, sorted, non-null area values of the regulation table.
///
/// Empty if no area column is configured or present.
#[must_use]
pub fn list_areas(regulations: &Table, columns: &ColumnMapping) -> Vec<Cell> {
    columns
        .area
        .as_deref()
        .map(|column| regulations.distinct_values(column))
        .unwrap_or_default()
}

/// Runs the full filter → aggregate → normalize → render pipeline.
#[must_use]
pub fn filter_and_render(
    regulations: &Table,
    accidents: &Table,
    criteria: &FilterCriteria,
    columns: &ColumnMapping,
    settings: &MapSettings,
) -> RenderedView {
    let filtered = filter::filter_regulations(regulations, criteria, columns);
    let mut aggregated = aggregate::aggregate(&filtered, accidents, columns);

    for row in &mut aggregated.rows {
        row.coordinates = coordinates::normalize(&row.fields, &columns.coordinates);
    }

    render::render(aggregated, columns, settings)
}

#[cfg(test)]
mod tests {
    use accident_map_analysis_models::MarkerColor;

    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_owned())
    }

    fn regulations() -> Table {
        Table::new(
            ["交差点ID", "交差点名", "地区名", "緯度", "経度"]
                .map(str::to_owned)
                .to_vec(),
            vec![
                vec![
                    Cell::Integer(1),
                    text("福井駅前"),
                    text("中央"),
                    Cell::Float(36.0622),
                    Cell::Float(136.2236),
                ],
                vec![Cell::Integer(2), text("Main St"), text("北部"), Cell::Null, Cell::Null],
                vec![
                    Cell::Integer(3),
                    text("MAIN & 2nd"),
                    text("中央"),
                    Cell::Float(36.07),
                    Cell::Float(136.22),
                ],
            ],
        )
    }

    fn accidents() -> Table {
        Table::new(
            vec!["交差点ID".to_owned()],
            vec![
                vec![Cell::Integer(1)],
                vec![Cell::Integer(1)],
                vec![Cell::Integer(2)],
                vec![Cell::Integer(9)],
            ],
        )
    }

    fn run(criteria: &FilterCriteria) -> RenderedView {
        filter_and_render(
            &regulations(),
            &accidents(),
            criteria,
            &ColumnMapping::default(),
            &MapSettings::default(),
        )
    }

    #[test]
    fn lists_areas_sorted_and_distinct() {
        assert_eq!(
            list_areas(&regulations(), &ColumnMapping::default()),
            [text("中央"), text("北部")]
        );
    }

    #[test]
    fn lists_no_areas_without_area_column() {
        let columns = ColumnMapping {
            area: None,
            ..ColumnMapping::default()
        };
        assert!(list_areas(&regulations(), &columns).is_empty());
    }

    #[test]
    fn unfiltered_run_keeps_every_row() {
        let view = run(&FilterCriteria::default());
        assert_eq!(view.table_rows.len(), 3);
        assert_eq!(view.join_key.as_deref(), Some("交差点ID"));

        let counts: Vec<_> = view
            .table_rows
            .iter()
            .map(|r| r.get("事故件数").cloned())
            .collect();
        assert_eq!(
            counts,
            [Some(Cell::Integer(2)), Some(Cell::Integer(1)), Some(Cell::Integer(0))]
        );

        // Row 2 has no coordinates, so only two markers.
        assert_eq!(view.map.markers.len(), 2);
        assert_eq!(view.map.markers[0].color, MarkerColor::Red);
        assert_eq!(view.map.markers[1].color, MarkerColor::Blue);
    }

    #[test]
    fn filtered_run_combines_area_and_name() {
        let view = run(&FilterCriteria::new(Some("中央"), Some("main")));
        assert_eq!(view.table_rows.len(), 1);
        assert_eq!(view.table_rows[0].get("交差点ID"), Some(&Cell::Integer(3)));
    }

    #[test]
    fn no_match_yields_empty_table_and_fallback_map() {
        let view = run(&FilterCriteria::new(Some("南部"), None));
        assert!(view.table_rows.is_empty());
        assert!(view.map.message.is_some());
        assert_eq!(view.map.center, MapSettings::default().fallback());
    }

    #[test]
    fn repeated_runs_serialize_identically() {
        let criteria = FilterCriteria::new(Some("中央"), None);
        let first = serde_json::to_string(&run(&criteria).table_rows).unwrap();
        let second = serde_json::to_string(&run(&criteria).table_rows).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with(concat!(
            r#"[{"交差点ID":1,"交差点名":"福井駅前","地区名":"中央","#,
            r#""緯度":36.0622,"経度":136.2236,"事故件数":2}"#
        )));
    }
}
