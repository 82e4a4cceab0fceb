#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the accident map API server.

use std::path::PathBuf;

use accident_map_server::config::{AppConfig, DEFAULT_CONFIG_PATH};
use clap::Parser;

#[derive(Parser)]
#[command(name = "accident_map_server", about = "Traffic accident map API server")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Directory containing the dataset files (overrides `dataset.data_dir`)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config)?;
    if let Some(data_dir) = cli.data_dir {
        config.dataset.data_dir = data_dir;
    }

    if let Err(e) = accident_map_server::run_server(config).await {
        log::error!("{e}");
        return Err(e.into());
    }

    Ok(())
}
