//! Command-line interface for extracting thematic OSM layers per country.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod extract;
mod logging;
mod parallel;
mod worker;

pub use error::CliError;

use extract::{ExtractArgs, run_extract};
use worker::{ExtractLayerArgs, run_extract_layer};

pub(crate) const ARG_GEOJSON_DIR: &str = "geojson-dir";
pub(crate) const ARG_LOG_DIR: &str = "log-dir";
pub(crate) const ARG_OUTPUT_PATH: &str = "output-path";
pub(crate) const ARG_PARALLEL: &str = "parallel";
pub(crate) const ARG_WORKERS: &str = "workers";
pub(crate) const ARG_LAYER: &str = "layer";
pub(crate) const ARG_BOUNDARY: &str = "boundary";
pub(crate) const ARG_OVERPASS_URL: &str = "overpass-url";
pub(crate) const ARG_CACHE_DIR: &str = "cache-dir";
pub(crate) const ARG_NO_CACHE: &str = "no-cache";
pub(crate) const ARG_VERBOSE_QUERY_LOGGING: &str = "verbose-query-logging";
pub(crate) const ARG_QUERY_TIMEOUT: &str = "query-timeout";
pub(crate) const ENV_GEOJSON_DIR: &str = "OSMLAYERS_CMDS_EXTRACT_GEOJSON_DIR";
pub(crate) const ENV_LOG_DIR: &str = "OSMLAYERS_CMDS_EXTRACT_LOG_DIR";
pub(crate) const ENV_OUTPUT_PATH: &str = "OSMLAYERS_CMDS_EXTRACT_OUTPUT_PATH";

/// Name of the hidden per-layer subcommand run by parallel workers.
pub(crate) const WORKER_SUBCOMMAND: &str = "extract-layer";

/// Run the CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Extract(args) => run_extract(args),
        Command::ExtractLayer(args) => run_extract_layer(&args, &mut std::io::stdout().lock()),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "osm-layers",
    about = "Extract thematic OpenStreetMap layers for country boundaries",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract every catalogued layer for each boundary in a directory.
    Extract(ExtractArgs),
    /// Extract one layer for one boundary and report the outcome as JSON.
    #[command(name = WORKER_SUBCOMMAND, hide = true)]
    ExtractLayer(ExtractLayerArgs),
}

#[cfg(test)]
mod tests;
