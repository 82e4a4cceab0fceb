#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Filter criteria, column mapping, and map descriptor types for the
//! accident map.
//!
//! The column mapping pins down everything that differs between dataset
//! versions (which column holds the area, which columns carry the join key,
//! how coordinates are encoded) so the pipeline never has to guess.

use accident_map_dataset_models::OrderedRecord;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Scale of fixed-point survey coordinates (degrees × 10^7).
pub const FIXED_POINT_SCALE: f64 = 10_000_000.0;

/// Marker radius for an intersection with no accidents.
pub const BASE_RADIUS: f64 = 5.0;

/// Radius added per recorded accident.
pub const RADIUS_PER_ACCIDENT: f64 = 0.5;

/// Fill opacity of every marker.
pub const FILL_OPACITY: f64 = 0.6;

/// Request-scoped filter values.
///
/// Blank strings are normalised to `None`, so an empty form field means
/// "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Exact-match area selector.
    pub area: Option<String>,
    /// Case-insensitive intersection name substring.
    pub intersection: Option<String>,
}

impl FilterCriteria {
    /// Builds criteria from raw request values, trimming whitespace and
    /// dropping blanks.
    #[must_use]
    pub fn new(area: Option<&str>, intersection: Option<&str>) -> Self {
        fn clean(value: Option<&str>) -> Option<String> {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        }

        Self {
            area: clean(area),
            intersection: clean(intersection),
        }
    }

    /// Returns `true` when neither filter is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.area.is_none() && self.intersection.is_none()
    }
}

/// How one dataset version names its columns.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    /// Area/region grouping column of the regulation table.
    pub area: Option<String>,
    /// Intersection name column of the regulation table.
    pub intersection_name: Option<String>,
    /// Join key candidates in priority order. The first one present in both
    /// tables is used.
    pub join_keys: Vec<String>,
    /// Name of the computed accident count field in table output.
    pub count_column: String,
    /// Coordinate sources tried in order for each row.
    pub coordinates: Vec<CoordinateSource>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            area: Some("地区名".to_owned()),
            intersection_name: Some("交差点名".to_owned()),
            join_keys: vec!["交差点ID".to_owned()],
            count_column: "事故件数".to_owned(),
            coordinates: vec![CoordinateSource::Decimal {
                lat: "緯度".to_owned(),
                lon: "経度".to_owned(),
            }],
        }
    }
}

/// Where a row's position comes from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinateSource {
    /// Separate columns already in decimal degrees.
    Decimal {
        /// Latitude column.
        lat: String,
        /// Longitude column.
        lon: String,
    },
    /// Separate integer columns scaled by a fixed factor.
    FixedPoint {
        /// Latitude column.
        lat: String,
        /// Longitude column.
        lon: String,
        /// Divisor that recovers decimal degrees.
        #[serde(default = "default_scale")]
        scale: f64,
    },
    /// One text column holding `"lat<separator>lon"`.
    Combined {
        /// Column name.
        field: String,
        /// Separator between the two halves.
        #[serde(default = "default_separator")]
        separator: String,
    },
}

const fn default_scale() -> f64 {
    FIXED_POINT_SCALE
}

fn default_separator() -> String {
    ",".to_owned()
}

/// A position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

impl LatLng {
    /// Returns `None` for non-finite or out-of-range values.
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }
}

/// A regulation row after the accident counts have been joined on.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    /// Source fields in column order, with the count field set.
    pub fields: OrderedRecord,
    /// Number of accident rows sharing this row's join key.
    pub accident_count: u64,
    /// Resolved position, if any.
    pub coordinates: Option<LatLng>,
}

/// Output of the join/aggregate stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedTable {
    /// Join key column used, or `None` when the tables share no key and every
    /// row was given the fallback count.
    pub join_key: Option<String>,
    /// One entry per filtered regulation row, in input order.
    pub rows: Vec<AggregatedRow>,
}

/// Marker colour keyed by whether any accident was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MarkerColor {
    /// At least one accident.
    Red,
    /// No accidents.
    Blue,
}

impl MarkerColor {
    /// Colour for an accident count.
    #[must_use]
    pub const fn for_count(count: u64) -> Self {
        if count > 0 { Self::Red } else { Self::Blue }
    }
}

/// A circle marker drawn by the frontend map library.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleMarker {
    /// Marker centre.
    pub location: LatLng,
    /// Radius in pixels.
    pub radius: f64,
    /// Stroke and fill colour.
    pub color: MarkerColor,
    /// Whether the circle is filled.
    pub fill: bool,
    /// Fill opacity.
    pub fill_opacity: f64,
    /// Popup text.
    pub popup: String,
    /// Accident count the marker represents.
    pub accident_count: u64,
}

impl CircleMarker {
    /// Radius grows linearly with the accident count.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn radius_for(count: u64) -> f64 {
        RADIUS_PER_ACCIDENT.mul_add(count as f64, BASE_RADIUS)
    }
}

/// Everything the frontend needs to draw the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDescriptor {
    /// Initial view centre.
    pub center: LatLng,
    /// Initial zoom level.
    pub zoom: u8,
    /// One marker per row with valid coordinates.
    pub markers: Vec<CircleMarker>,
    /// Shown instead of markers when no row could be placed.
    pub message: Option<String>,
}

/// Map defaults and label text.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    /// `[lat, lng]` used when no row has coordinates.
    pub fallback_center: [f64; 2],
    /// Initial zoom level.
    pub zoom: u8,
    /// Popup name when the intersection name is missing.
    pub unknown_label: String,
    /// Appended to the count in popups.
    pub count_suffix: String,
    /// Explanation shown when nothing could be placed on the map.
    pub no_coordinates_message: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            fallback_center: [36.0652, 136.2216],
            zoom: 13,
            unknown_label: "不明".to_owned(),
            count_suffix: "件".to_owned(),
            no_coordinates_message: "座標のある交差点が見つからないため、既定の地点を表示しています"
                .to_owned(),
        }
    }
}

impl MapSettings {
    /// The fallback centre as a [`LatLng`].
    #[must_use]
    pub const fn fallback(&self) -> LatLng {
        LatLng {
            lat: self.fallback_center[0],
            lng: self.fallback_center[1],
        }
    }
}

/// The result of one filter-and-render request.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedView {
    /// Join key used, if any.
    pub join_key: Option<String>,
    /// Map descriptor.
    pub map: MapDescriptor,
    /// Every aggregated row, including those without coordinates.
    pub table_rows: Vec<OrderedRecord>,
}
