//! Coordinate normalization.
//!
//! Survey tables carry positions as decimal degrees, as fixed-point integers
//! (degrees × 10^7), or as a single `"lat,lon"` text column. The configured
//! [`CoordinateSource`]s are tried in order and the first one that yields a
//! valid position wins.

use accident_map_analysis_models::{CoordinateSource, LatLng};
use accident_map_dataset_models::{Cell, FieldLookup};

/// Resolves a row's position from the first usable coordinate source.
///
/// Returns `None` if no source has both values present and parseable, or
/// if the result is out of range.
#[must_use]
pub fn normalize(row: &impl FieldLookup, sources: &[CoordinateSource]) -> Option<LatLng> {
    sources.iter().find_map(|source| resolve(row, source))
}

fn resolve(row: &impl FieldLookup, source: &CoordinateSource) -> Option<LatLng> {
    match source {
        CoordinateSource::Decimal { lat, lon } => {
            LatLng::new(row.field(lat)?.as_f64()?, row.field(lon)?.as_f64()?)
        }
        CoordinateSource::FixedPoint { lat, lon, scale } => {
            if scale.abs() < f64::EPSILON {
                return None;
            }
            LatLng::new(
                row.field(lat)?.as_f64()? / scale,
                row.field(lon)?.as_f64()? / scale,
            )
        }
        CoordinateSource::Combined { field, separator } => match row.field(field)? {
            Cell::Text(text) => parse_combined(text, separator),
            _ => None,
        },
    }
}

/// Parses `"lat<separator>lon"`. Exactly two parts are required.
fn parse_combined(text: &str, separator: &str) -> Option<LatLng> {
    let mut parts = text.split(separator);
    let lat = parts.next()?.trim().parse().ok()?;
    let lng = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    LatLng::new(lat, lng)
}
