//! The hidden `extract-layer` subcommand run by parallel workers.
//!
//! A worker extracts one layer for one boundary and prints the
//! [`LayerOutcome`] as a single JSON line on stdout. Extraction failures are
//! reported as [`LayerOutcome::Failed`] rather than as a process error so
//! the parent can log them like any other layer.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use osmlayers_core::{BoundarySource, LayerConfig, LayerExtractor, LayerOutcome, find_layer};
use osmlayers_data::{FileVectorWriter, GeoJsonBoundarySource, Proj4Transform};

use crate::extract::QueryOptions;
use crate::{
    ARG_BOUNDARY, ARG_CACHE_DIR, ARG_LAYER, ARG_LOG_DIR, ARG_NO_CACHE, ARG_OUTPUT_PATH,
    ARG_OVERPASS_URL, ARG_QUERY_TIMEOUT, ARG_VERBOSE_QUERY_LOGGING, CliError, logging,
};

/// Arguments for one worker invocation.
#[derive(Debug, Clone, Parser)]
pub(crate) struct ExtractLayerArgs {
    /// Boundary GeoJSON file.
    #[arg(long = ARG_BOUNDARY, value_name = "path")]
    pub(crate) boundary: PathBuf,
    /// Catalog layer to extract.
    #[arg(long = ARG_LAYER, value_name = "name")]
    pub(crate) layer: String,
    /// Root directory for layer outputs.
    #[arg(long = ARG_OUTPUT_PATH, value_name = "dir")]
    pub(crate) output_path: PathBuf,
    /// Directory holding the shared processing log.
    #[arg(long = ARG_LOG_DIR, value_name = "dir")]
    pub(crate) log_dir: Option<PathBuf>,
    #[arg(long = ARG_OVERPASS_URL, value_name = "url")]
    pub(crate) overpass_url: Option<String>,
    #[arg(long = ARG_CACHE_DIR, value_name = "dir")]
    pub(crate) cache_dir: Option<PathBuf>,
    #[arg(long = ARG_NO_CACHE)]
    pub(crate) no_cache: bool,
    #[arg(long = ARG_VERBOSE_QUERY_LOGGING)]
    pub(crate) verbose_query_logging: bool,
    #[arg(long = ARG_QUERY_TIMEOUT, value_name = "secs")]
    pub(crate) query_timeout: Option<u64>,
}

impl ExtractLayerArgs {
    pub(crate) fn query_options(&self) -> QueryOptions {
        QueryOptions::new(
            self.overpass_url.clone(),
            self.cache_dir.clone(),
            self.no_cache,
            self.verbose_query_logging,
            self.query_timeout,
        )
    }
}

pub(crate) fn run_extract_layer(
    args: &ExtractLayerArgs,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    if let Some(log_dir) = &args.log_dir {
        logging::init(log_dir)?;
    }
    let layer = find_layer(&args.layer).ok_or_else(|| CliError::UnknownLayer {
        name: args.layer.clone(),
    })?;
    let outcome =
        load_and_extract(args, layer).unwrap_or_else(|reason| LayerOutcome::Failed { reason });
    write_outcome(out, &outcome)
}

fn load_and_extract(
    args: &ExtractLayerArgs,
    layer: &'static LayerConfig,
) -> Result<LayerOutcome, String> {
    let boundary = GeoJsonBoundarySource
        .load(&args.boundary)
        .map_err(|err| err.to_string())?;
    let client = args
        .query_options()
        .build_client()
        .map_err(|err| err.to_string())?;
    let extractor = LayerExtractor::new(&client, &Proj4Transform, &FileVectorWriter);
    extractor
        .extract(&boundary, layer, &args.output_path)
        .map_err(|err| err.to_string())
}

pub(crate) fn write_outcome(out: &mut dyn Write, outcome: &LayerOutcome) -> Result<(), CliError> {
    let line = serde_json::to_string(outcome).map_err(CliError::SerialiseOutcome)?;
    out.write_all(line.as_bytes())
        .map_err(CliError::WriteOutcome)?;
    out.write_all(b"\n").map_err(CliError::WriteOutcome)?;
    out.flush().map_err(CliError::WriteOutcome)
}
