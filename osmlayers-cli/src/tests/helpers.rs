//! Test helpers for the extract command scenarios.

use super::*;
use crate::extract::ExtractConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Boundary, log and output directories inside one temporary workspace.
pub(super) struct RunDirectories {
    _dir: TempDir,
    geojson: PathBuf,
    logs: PathBuf,
    output: PathBuf,
}

impl RunDirectories {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let geojson = dir.path().join("boundaries");
        let logs = dir.path().join("logs-root");
        let output = dir.path().join("out");
        for path in [&geojson, &logs, &output] {
            fs::create_dir_all(path).expect("create run directory");
        }
        Self {
            _dir: dir,
            geojson,
            logs,
            output,
        }
    }

    pub(super) fn geojson(&self) -> &Path {
        &self.geojson
    }

    pub(super) fn logs(&self) -> &Path {
        &self.logs
    }

    pub(super) fn output(&self) -> &Path {
        &self.output
    }
}

/// Parse `extract` arguments and resolve them without config files or
/// environment layers.
pub(super) fn parse_extract(args: &[String]) -> Result<ExtractConfig, CliError> {
    let mut invocation = vec!["osm-layers".to_owned(), "extract".to_owned()];
    invocation.extend(args.iter().cloned());
    let cli = Cli::try_parse_from(invocation).map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Extract(args) => ExtractConfig::try_from(args),
        Command::ExtractLayer(args) => panic!("parsed a worker invocation: {args:?}"),
    }
}

pub(super) fn layer_names(config: &ExtractConfig) -> Vec<&'static str> {
    config.layers.iter().map(|layer| layer.name).collect()
}
