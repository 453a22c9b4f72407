//! Error types emitted by the osm-layers CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use osmlayers_data::ClientBuildError;
use thiserror::Error;

/// Errors emitted by the osm-layers CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input directory does not exist or is not a directory.
    #[error("{field} path {path:?} does not exist or is not a directory")]
    MissingSourceDirectory { field: &'static str, path: PathBuf },
    /// A directory the run writes into exists but is not a directory.
    #[error("{field} path {path:?} exists but is not a directory")]
    NotADirectory { field: &'static str, path: PathBuf },
    /// A layer name is not in the catalog.
    #[error("unknown layer {name:?}")]
    UnknownLayer { name: String },
    /// `--workers` was zero.
    #[error("--workers must be at least 1")]
    ZeroWorkers,
    /// Listing the boundary directory failed.
    #[error("failed to list boundaries in {path:?}: {source}")]
    ListBoundaries {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The processing log could not be opened.
    #[error("failed to open log file {path:?}: {source}")]
    OpenLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A global logger was already installed.
    #[error("failed to initialise logging: {0}")]
    InitLogging(#[from] log::SetLoggerError),
    /// The Overpass client could not be constructed.
    #[error("failed to build query client for {endpoint}: {source}")]
    BuildQueryClient {
        endpoint: String,
        #[source]
        source: ClientBuildError,
    },
    /// The running executable could not be located for worker processes.
    #[error("failed to locate the current executable: {0}")]
    CurrentExecutable(#[source] io::Error),
    /// A layer outcome could not be serialised.
    #[error("failed to serialise layer outcome: {0}")]
    SerialiseOutcome(#[source] serde_json::Error),
    /// Writing a layer outcome failed.
    #[error("failed to write layer outcome: {0}")]
    WriteOutcome(#[source] io::Error),
}
