#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the accident map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the pipeline types to allow independent evolution of the API
//! contract.

use accident_map_analysis_models::{FilterCriteria, MapDescriptor, RenderedView};
use accident_map_dataset_models::OrderedRecord;
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Query string or form body for the results endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsParams {
    /// Area to keep (exact match).
    pub area: Option<String>,
    /// Intersection name substring (case-insensitive).
    pub intersection: Option<String>,
}

impl From<&ResultsParams> for FilterCriteria {
    fn from(params: &ResultsParams) -> Self {
        Self::new(params.area.as_deref(), params.intersection.as_deref())
    }
}

/// Response from the results endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResults {
    /// Area filter that was applied.
    pub area: Option<String>,
    /// Intersection filter that was applied.
    pub intersection: Option<String>,
    /// Join key column used for the counts, or `null` when the tables share
    /// none and every row was counted once.
    pub join_key: Option<String>,
    /// Number of rows that matched the filters.
    pub total_count: usize,
    /// Number of those rows placed on the map.
    pub mapped_count: usize,
    /// Map view and markers.
    pub map: MapDescriptor,
    /// Every matching row with its accident count, in source column order.
    pub table_rows: Vec<OrderedRecord>,
}

impl ApiResults {
    /// Wraps a rendered view together with the criteria that produced it.
    #[must_use]
    pub fn new(criteria: FilterCriteria, view: RenderedView) -> Self {
        Self {
            area: criteria.area,
            intersection: criteria.intersection,
            join_key: view.join_key,
            total_count: view.table_rows.len(),
            mapped_count: view.map.markers.len(),
            map: view.map,
            table_rows: view.table_rows,
        }
    }
}
