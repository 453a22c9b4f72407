//! The `extract` subcommand: run the layer catalog over a boundary directory.

use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use osmlayers_core::{
    CATALOG, LayerConfig, LayerDispatch, LayerExtractor, Orchestrator, SequentialDispatch,
    find_layer,
};
use osmlayers_data::{
    DEFAULT_ENDPOINT, FileVectorWriter, GeoJsonBoundarySource, OverpassClient, OverpassConfig,
    Proj4Transform, QuerySettings,
};
use serde::{Deserialize, Serialize};

use crate::parallel::ProcessDispatch;
use crate::{
    ARG_CACHE_DIR, ARG_GEOJSON_DIR, ARG_LAYER, ARG_LOG_DIR, ARG_NO_CACHE, ARG_OUTPUT_PATH,
    ARG_OVERPASS_URL, ARG_PARALLEL, ARG_QUERY_TIMEOUT, ARG_VERBOSE_QUERY_LOGGING, ARG_WORKERS,
    CliError, ENV_GEOJSON_DIR, ENV_LOG_DIR, ENV_OUTPUT_PATH, logging,
};

/// Default directory for cached Overpass responses, relative to the working
/// directory.
const DEFAULT_CACHE_DIR: &str = "cache";

/// Cores left free for the rest of the machine when picking a default
/// worker count.
const RESERVED_CORES: usize = 2;

/// CLI arguments for the `extract` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Extract every catalogued OpenStreetMap layer for each GeoJSON \
                 boundary in a directory. Paths can come from CLI flags, \
                 configuration files, or environment variables.",
    about = "Extract thematic layers for a directory of country boundaries"
)]
#[ortho_config(prefix = "OSMLAYERS")]
pub(crate) struct ExtractArgs {
    /// Directory containing `<iso3>.json` boundary files.
    #[arg(long = ARG_GEOJSON_DIR, alias = "geojson_dir", value_name = "dir")]
    #[serde(default)]
    pub(crate) geojson_dir: Option<PathBuf>,
    /// Directory receiving `logs/processing_log.txt`.
    #[arg(long = ARG_LOG_DIR, alias = "log_dir", value_name = "dir")]
    #[serde(default)]
    pub(crate) log_dir: Option<PathBuf>,
    /// Root directory for layer outputs.
    #[arg(long = ARG_OUTPUT_PATH, alias = "output_path", value_name = "dir")]
    #[serde(default)]
    pub(crate) output_path: Option<PathBuf>,
    /// Run each boundary's layers in worker processes.
    #[arg(
        long = ARG_PARALLEL,
        value_name = "bool",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    #[serde(default)]
    pub(crate) parallel: Option<bool>,
    /// Worker process count in parallel mode (defaults to cores minus two).
    #[arg(long = ARG_WORKERS, value_name = "n")]
    #[serde(default)]
    pub(crate) workers: Option<usize>,
    /// Restrict the run to the named layers (repeatable).
    #[arg(long = ARG_LAYER, value_name = "name")]
    #[serde(default)]
    pub(crate) layer: Option<Vec<String>>,
    /// Overpass interpreter URL.
    #[arg(long = ARG_OVERPASS_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) overpass_url: Option<String>,
    /// Directory for cached query responses.
    #[arg(long = ARG_CACHE_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) cache_dir: Option<PathBuf>,
    /// Always query the service, ignoring cached responses.
    #[arg(
        long = ARG_NO_CACHE,
        value_name = "bool",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    #[serde(default)]
    pub(crate) no_cache: Option<bool>,
    /// Log every query at info level.
    #[arg(
        long = ARG_VERBOSE_QUERY_LOGGING,
        value_name = "bool",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    #[serde(default)]
    pub(crate) verbose_query_logging: Option<bool>,
    /// Client-side query timeout in seconds; unset waits indefinitely.
    #[arg(long = ARG_QUERY_TIMEOUT, value_name = "secs")]
    #[serde(default)]
    pub(crate) query_timeout: Option<u64>,
}

impl ExtractArgs {
    pub(crate) fn into_config(self) -> Result<ExtractConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ExtractConfig::try_from(merged)
    }
}

/// How each boundary's layers are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunMode {
    /// Layers run one after another in this process.
    Sequential,
    /// Layers run in up to `workers` child processes.
    Parallel { workers: NonZeroUsize },
}

/// Overpass options shared by the parent run and its worker processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QueryOptions {
    pub(crate) endpoint: String,
    pub(crate) cache_dir: PathBuf,
    pub(crate) settings: QuerySettings,
    pub(crate) timeout_secs: Option<u64>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            settings: QuerySettings::default(),
            timeout_secs: None,
        }
    }
}

impl QueryOptions {
    pub(crate) fn new(
        endpoint: Option<String>,
        cache_dir: Option<PathBuf>,
        no_cache: bool,
        verbose_logging: bool,
        timeout_secs: Option<u64>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            endpoint: endpoint.unwrap_or(defaults.endpoint),
            cache_dir: cache_dir.unwrap_or(defaults.cache_dir),
            settings: QuerySettings {
                use_cache: !no_cache,
                verbose_logging,
            },
            timeout_secs,
        }
    }

    pub(crate) fn overpass_config(&self) -> OverpassConfig {
        let config = OverpassConfig::new(self.endpoint.clone())
            .with_cache_dir(self.cache_dir.clone())
            .with_settings(self.settings);
        match self.timeout_secs {
            Some(secs) => config.with_timeout(Duration::from_secs(secs)),
            None => config,
        }
    }

    pub(crate) fn build_client(&self) -> Result<OverpassClient, CliError> {
        OverpassClient::with_config(self.overpass_config()).map_err(|source| {
            CliError::BuildQueryClient {
                endpoint: self.endpoint.clone(),
                source,
            }
        })
    }

    /// Flags that reproduce these options on a worker command line.
    pub(crate) fn worker_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            format!("--{ARG_OVERPASS_URL}").into(),
            self.endpoint.clone().into(),
            format!("--{ARG_CACHE_DIR}").into(),
            self.cache_dir.clone().into(),
        ];
        if !self.settings.use_cache {
            args.push(format!("--{ARG_NO_CACHE}").into());
        }
        if self.settings.verbose_logging {
            args.push(format!("--{ARG_VERBOSE_QUERY_LOGGING}").into());
        }
        if let Some(secs) = self.timeout_secs {
            args.push(format!("--{ARG_QUERY_TIMEOUT}").into());
            args.push(secs.to_string().into());
        }
        args
    }
}

/// Resolved `extract` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExtractConfig {
    pub(crate) geojson_dir: PathBuf,
    pub(crate) log_dir: PathBuf,
    pub(crate) output_path: PathBuf,
    pub(crate) mode: RunMode,
    pub(crate) layers: Vec<&'static LayerConfig>,
    pub(crate) query: QueryOptions,
}

impl ExtractConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        if !self.geojson_dir.is_dir() {
            return Err(CliError::MissingSourceDirectory {
                field: ARG_GEOJSON_DIR,
                path: self.geojson_dir.clone(),
            });
        }
        Self::reject_non_directory(&self.output_path, ARG_OUTPUT_PATH)?;
        Self::reject_non_directory(&self.log_dir, ARG_LOG_DIR)?;
        Ok(())
    }

    fn reject_non_directory(path: &Path, field: &'static str) -> Result<(), CliError> {
        if path.exists() && !path.is_dir() {
            Err(CliError::NotADirectory {
                field,
                path: path.to_path_buf(),
            })
        } else {
            Ok(())
        }
    }
}

impl TryFrom<ExtractArgs> for ExtractConfig {
    type Error = CliError;

    fn try_from(args: ExtractArgs) -> Result<Self, Self::Error> {
        let geojson_dir = args.geojson_dir.ok_or(CliError::MissingArgument {
            field: ARG_GEOJSON_DIR,
            env: ENV_GEOJSON_DIR,
        })?;
        let log_dir = args.log_dir.ok_or(CliError::MissingArgument {
            field: ARG_LOG_DIR,
            env: ENV_LOG_DIR,
        })?;
        let output_path = args.output_path.ok_or(CliError::MissingArgument {
            field: ARG_OUTPUT_PATH,
            env: ENV_OUTPUT_PATH,
        })?;
        let workers = args
            .workers
            .map(|count| NonZeroUsize::new(count).ok_or(CliError::ZeroWorkers))
            .transpose()?;
        let mode = if args.parallel.unwrap_or(false) {
            RunMode::Parallel {
                workers: workers.unwrap_or_else(default_workers),
            }
        } else {
            RunMode::Sequential
        };
        let layers = resolve_layers(args.layer.unwrap_or_default())?;
        let query = QueryOptions::new(
            args.overpass_url,
            args.cache_dir,
            args.no_cache.unwrap_or(false),
            args.verbose_query_logging.unwrap_or(false),
            args.query_timeout,
        );
        Ok(Self {
            geojson_dir,
            log_dir,
            output_path,
            mode,
            layers,
            query,
        })
    }
}

/// Available cores minus [`RESERVED_CORES`], never below one.
pub(crate) fn default_workers() -> NonZeroUsize {
    std::thread::available_parallelism()
        .ok()
        .and_then(|cores| NonZeroUsize::new(cores.get().saturating_sub(RESERVED_CORES)))
        .unwrap_or(NonZeroUsize::MIN)
}

/// Map layer names onto catalog entries, keeping request order and dropping
/// repeats. An empty request selects the whole catalog.
pub(crate) fn resolve_layers(names: Vec<String>) -> Result<Vec<&'static LayerConfig>, CliError> {
    if names.is_empty() {
        return Ok(CATALOG.iter().collect());
    }
    let mut layers: Vec<&'static LayerConfig> = Vec::with_capacity(names.len());
    for name in names {
        let layer = find_layer(&name).ok_or(CliError::UnknownLayer { name })?;
        if !layers.iter().any(|known| known.name == layer.name) {
            layers.push(layer);
        }
    }
    Ok(layers)
}

pub(crate) fn run_extract(args: ExtractArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    logging::init(&config.log_dir)?;
    let boundaries = list_boundaries(&config.geojson_dir)?;
    info!(
        "Found {} boundary files in {}",
        boundaries.len(),
        config.geojson_dir.display()
    );

    let boundary_source = GeoJsonBoundarySource;
    match config.mode {
        RunMode::Sequential => {
            let client = config.query.build_client()?;
            let extractor = LayerExtractor::new(&client, &Proj4Transform, &FileVectorWriter);
            let dispatch = SequentialDispatch::new(extractor);
            run_boundaries(&config, &boundary_source, &dispatch, boundaries);
        }
        RunMode::Parallel { workers } => {
            let program = std::env::current_exe().map_err(CliError::CurrentExecutable)?;
            let mut worker_args = vec![
                format!("--{ARG_LOG_DIR}").into(),
                config.log_dir.clone().into_os_string(),
            ];
            worker_args.extend(config.query.worker_args());
            info!("Dispatching layers to {workers} worker processes");
            let dispatch = ProcessDispatch::new(program, workers, worker_args);
            run_boundaries(&config, &boundary_source, &dispatch, boundaries);
        }
    }
    Ok(())
}

fn run_boundaries(
    config: &ExtractConfig,
    boundary_source: &GeoJsonBoundarySource,
    dispatch: &dyn LayerDispatch,
    boundaries: Vec<PathBuf>,
) {
    let orchestrator = Orchestrator::new(boundary_source, dispatch, config.output_path.clone())
        .with_layers(config.layers.clone());
    let runs = orchestrator.run_all(boundaries);
    let failed = runs.iter().filter(|run| run.result.is_err()).count();
    info!("Processed {} boundaries ({failed} failed)", runs.len());
}

fn list_boundaries(dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    let list_error = |source| CliError::ListBoundaries {
        path: dir.to_path_buf(),
        source,
    };
    let utf8 = osmlayers_fs::utf8_path(dir).map_err(list_error)?;
    let files = osmlayers_fs::list_files_with_extension(utf8, "json").map_err(list_error)?;
    Ok(files.into_iter().map(|path| path.into_std_path_buf()).collect())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ExtractConfig, CliError> {
    let merged = ExtractArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ExtractConfig::try_from(merged)
}
