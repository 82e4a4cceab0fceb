#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the accident map application.
//!
//! Loads the regulation and accident tables once at startup and serves the
//! filter-and-render API plus the static frontend, which draws the markers
//! with a third-party map library. The loaded tables are never modified
//! after startup, so request handlers share them without locking.

pub mod config;
mod handlers;

use accident_map_analysis_models::{ColumnMapping, MapSettings};
use accident_map_dataset::{LoadError, ReferenceTables};
use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};

use crate::config::AppConfig;

/// Errors that prevent the server from starting or keep it from running.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A required dataset file could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The HTTP server failed to bind or run.
    #[error("HTTP server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// Tables loaded at startup.
    pub tables: ReferenceTables,
    /// Column names of the loaded dataset version.
    pub columns: ColumnMapping,
    /// Map defaults and labels.
    pub map: MapSettings,
}

impl AppState {
    /// Loads the configured tables.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if any required table fails to load.
    pub fn load(config: AppConfig) -> Result<Self, LoadError> {
        let tables = ReferenceTables::load(&config.dataset)?;
        Ok(Self {
            tables,
            columns: config.columns,
            map: config.map,
        })
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/areas", web::get().to(handlers::areas))
            .route("/results", web::get().to(handlers::results_query))
            .route("/results", web::post().to(handlers::results_form))
            .route("/accidents", web::get().to(handlers::accidents))
            .route("/definitions", web::get().to(handlers::definitions)),
    );
}

/// Starts the accident map API server.
///
/// Loads the dataset described by `config` and starts the Actix-Web HTTP
/// server. This is a regular async function; the caller is responsible for
/// providing the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError::Load`] if a required table cannot be loaded, in
/// which case no request is ever served, or [`ServerError::Io`] if the
/// HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: AppConfig) -> Result<(), ServerError> {
    log::info!("Loading dataset from {}...", config.dataset.data_dir.display());
    let state = web::Data::new(AppState::load(config)?);

    log::info!(
        "Loaded {} regulation rows and {} accident rows",
        state.tables.regulations.len(),
        state.tables.accidents.len()
    );

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
            // Serve frontend static files
            .service(Files::new("/", "app").index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    Ok(())
}
