//! HTTP handler functions for the accident map API.

use accident_map_analysis::{filter_and_render, list_areas};
use accident_map_analysis_models::FilterCriteria;
use accident_map_dataset_models::Record;
use accident_map_server_models::{ApiHealth, ApiResults, ResultsParams};
use actix_web::{HttpResponse, web};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/areas`
///
/// Returns the distinct, sorted area values of the regulation table.
pub async fn areas(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(list_areas(&state.tables.regulations, &state.columns))
}

/// `GET /api/results`
///
/// Filters by the `area` and `intersection` query parameters and returns
/// the map descriptor and table rows.
pub async fn results_query(
    state: web::Data<AppState>,
    params: web::Query<ResultsParams>,
) -> HttpResponse {
    results(&state, &params)
}

/// `POST /api/results`
///
/// Same as [`results_query`] for a form-encoded body.
pub async fn results_form(
    state: web::Data<AppState>,
    params: web::Form<ResultsParams>,
) -> HttpResponse {
    results(&state, &params)
}

fn results(state: &AppState, params: &ResultsParams) -> HttpResponse {
    let criteria = FilterCriteria::from(params);

    let view = filter_and_render(
        &state.tables.regulations,
        &state.tables.accidents,
        &criteria,
        &state.columns,
        &state.map,
    );

    log::debug!(
        "Results for {criteria:?}: {} rows, {} markers",
        view.table_rows.len(),
        view.map.markers.len()
    );

    HttpResponse::Ok().json(ApiResults::new(criteria, view))
}

/// `GET /api/accidents`
///
/// Exports the full accident table without filtering.
pub async fn accidents(state: web::Data<AppState>) -> HttpResponse {
    let rows: Vec<Record<'_>> = state.tables.accidents.records().collect();
    HttpResponse::Ok().json(rows)
}

/// `GET /api/definitions`
///
/// Exports the code-to-label definition table, if one was loaded.
pub async fn definitions(state: web::Data<AppState>) -> HttpResponse {
    match &state.tables.definitions {
        Some(table) => {
            let rows: Vec<Record<'_>> = table.records().collect();
            HttpResponse::Ok().json(rows)
        }
        None => HttpResponse::NotFound().json(serde_json::json!({
            "error": "No definition table loaded"
        })),
    }
}
