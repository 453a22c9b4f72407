//! Run the catalog over boundary files with per-layer and per-boundary
//! isolation.
//!
//! The [`Orchestrator`] loads each boundary, hands the layer list to a
//! [`LayerDispatch`] strategy and logs one line per layer and per boundary.
//! A failing layer never stops its siblings and a failing boundary never
//! stops the run.

use std::path::{Path, PathBuf};

use log::{error, info};

use crate::boundary::{Boundary, BoundarySource};
use crate::catalog::{CATALOG, LayerConfig};
use crate::extract::{ExtractError, LayerExtractor, LayerOutcome};

/// Everything a dispatcher needs to extract layers for one boundary.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryJob<'a> {
    /// Boundary file the boundary was loaded from.
    pub path: &'a Path,
    /// The loaded, validated boundary.
    pub boundary: &'a Boundary,
    /// Root directory for layer outputs.
    pub output_root: &'a Path,
}

/// Strategy for running a boundary's layers.
///
/// Implementations must return exactly one outcome per layer, in the order
/// given, and must turn any per-layer error into [`LayerOutcome::Failed`].
pub trait LayerDispatch {
    /// Extract `layers` for `job`.
    fn dispatch(&self, job: &BoundaryJob<'_>, layers: &[&'static LayerConfig]) -> Vec<LayerOutcome>;
}

/// Runs layers one after another on the calling thread.
#[derive(Debug, Clone, Copy)]
pub struct SequentialDispatch<'a> {
    extractor: LayerExtractor<'a>,
}

impl<'a> SequentialDispatch<'a> {
    /// Wrap an extractor.
    pub const fn new(extractor: LayerExtractor<'a>) -> Self {
        Self { extractor }
    }
}

impl LayerDispatch for SequentialDispatch<'_> {
    fn dispatch(&self, job: &BoundaryJob<'_>, layers: &[&'static LayerConfig]) -> Vec<LayerOutcome> {
        layers
            .iter()
            .map(|layer| {
                LayerOutcome::from_result(self.extractor.extract(job.boundary, layer, job.output_root))
            })
            .collect()
    }
}

/// Outcome of one layer within a boundary run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerReport {
    /// Layer name.
    pub layer: &'static str,
    /// What happened.
    pub outcome: LayerOutcome,
}

/// Per-layer outcomes for one boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryReport {
    /// Country code of the boundary.
    pub country_code: String,
    /// One entry per dispatched layer, in catalog order.
    pub layers: Vec<LayerReport>,
}

impl BoundaryReport {
    /// Number of layers that wrote a file.
    pub fn written(&self) -> usize {
        self.count(|outcome| matches!(outcome, LayerOutcome::Written { .. }))
    }

    /// Number of layers that matched nothing.
    pub fn no_data(&self) -> usize {
        self.count(|outcome| matches!(outcome, LayerOutcome::NoData))
    }

    /// Number of layers that failed.
    pub fn failed(&self) -> usize {
        self.count(LayerOutcome::is_failed)
    }

    /// The outcome recorded for `layer`.
    pub fn outcome(&self, layer: &str) -> Option<&LayerOutcome> {
        self.layers
            .iter()
            .find(|report| report.layer == layer)
            .map(|report| &report.outcome)
    }

    fn count(&self, predicate: impl Fn(&LayerOutcome) -> bool) -> usize {
        self.layers
            .iter()
            .filter(|report| predicate(&report.outcome))
            .count()
    }
}

/// Result of processing one boundary file.
#[derive(Debug)]
pub struct BoundaryRun {
    /// Boundary file.
    pub path: PathBuf,
    /// Report, or the error that stopped the boundary.
    pub result: Result<BoundaryReport, ExtractError>,
}

/// Drives the layer catalog across boundary files.
pub struct Orchestrator<'a> {
    boundaries: &'a dyn BoundarySource,
    dispatch: &'a dyn LayerDispatch,
    layers: Vec<&'static LayerConfig>,
    output_root: PathBuf,
}

impl std::fmt::Debug for Orchestrator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.layers.iter().map(|layer| layer.name).collect();
        f.debug_struct("Orchestrator")
            .field("layers", &names)
            .field("output_root", &self.output_root)
            .finish_non_exhaustive()
    }
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator that runs the full [`CATALOG`].
    pub fn new(
        boundaries: &'a dyn BoundarySource,
        dispatch: &'a dyn LayerDispatch,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            boundaries,
            dispatch,
            layers: CATALOG.iter().collect(),
            output_root: output_root.into(),
        }
    }

    /// Restrict the run to `layers`.
    #[must_use]
    pub fn with_layers(mut self, layers: Vec<&'static LayerConfig>) -> Self {
        self.layers = layers;
        self
    }

    /// The layers each boundary runs.
    pub fn layers(&self) -> &[&'static LayerConfig] {
        &self.layers
    }

    /// Process one boundary file.
    ///
    /// Layer failures are recorded in the report, not returned.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] when the boundary cannot be loaded or is not
    /// a polygon or multi-polygon.
    pub fn run_boundary(&self, path: &Path) -> Result<BoundaryReport, ExtractError> {
        let boundary = self.boundaries.load(path)?;
        boundary
            .ensure_areal()
            .map_err(|kind| ExtractError::UnsupportedGeometry { kind })?;
        info!(
            "Processing {} (country {}, projected {})",
            path.display(),
            boundary.country_code,
            boundary.crs().projected
        );

        let job = BoundaryJob {
            path,
            boundary: &boundary,
            output_root: &self.output_root,
        };
        let mut outcomes = self.dispatch.dispatch(&job, &self.layers).into_iter();
        let layers = self
            .layers
            .iter()
            .map(|layer| {
                let outcome = outcomes.next().unwrap_or_else(|| LayerOutcome::Failed {
                    reason: "dispatcher returned no outcome".to_owned(),
                });
                log_outcome(layer.name, &outcome);
                LayerReport {
                    layer: layer.name,
                    outcome,
                }
            })
            .collect();
        Ok(BoundaryReport {
            country_code: boundary.country_code,
            layers,
        })
    }

    /// Process boundary files in order, isolating failures per file.
    pub fn run_all<I>(&self, paths: I) -> Vec<BoundaryRun>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        paths
            .into_iter()
            .map(|path| {
                let result = self.run_boundary(&path);
                match &result {
                    Ok(report) => {
                        info!(
                            "Successfully processed {} ({} written, {} no data, {} failed)",
                            path.display(),
                            report.written(),
                            report.no_data(),
                            report.failed()
                        );
                    }
                    Err(err) => error!("Failed to process {}: {err}", path.display()),
                }
                BoundaryRun { path, result }
            })
            .collect()
    }
}

fn log_outcome(layer: &str, outcome: &LayerOutcome) {
    match outcome {
        LayerOutcome::Written { .. } => info!("Completed: {layer}"),
        LayerOutcome::NoData => info!("No data: {layer}"),
        LayerOutcome::Failed { reason } => error!("Error in {layer}: {reason}"),
    }
}
