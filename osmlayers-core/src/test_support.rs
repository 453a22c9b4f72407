//! In-memory collaborator doubles used by unit and behaviour tests.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use geo::{Coord, Geometry, MapCoords};

use crate::boundary::{Boundary, BoundaryError, BoundarySource, country_code_from_path};
use crate::crs::{Crs, CrsTransform, ProjectionError};
use crate::query::{QueryError, TagQuery};
use crate::table::{Feature, FeatureTable, GeometryKind};
use crate::tags::TagFilter;
use crate::writer::{OutputFormat, VectorWriter, WriteError};

/// Boundaries keyed by path; the country code comes from the file name.
#[derive(Debug, Default)]
pub struct MemoryBoundarySource {
    geometries: HashMap<PathBuf, Geometry<f64>>,
}

impl MemoryBoundarySource {
    /// Register a boundary geometry under `path`.
    #[must_use]
    pub fn with_boundary(mut self, path: impl Into<PathBuf>, geometry: Geometry<f64>) -> Self {
        self.geometries.insert(path.into(), geometry);
        self
    }
}

impl BoundarySource for MemoryBoundarySource {
    fn load(&self, path: &Path) -> Result<Boundary, BoundaryError> {
        let geometry = self
            .geometries
            .get(path)
            .cloned()
            .ok_or_else(|| BoundaryError::Read {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            })?;
        let country_code =
            country_code_from_path(path).ok_or_else(|| BoundaryError::CountryCode {
                path: path.to_path_buf(),
            })?;
        Ok(Boundary::new(country_code, geometry))
    }
}

/// Answers queries by filtering a fixed feature list by tags.
///
/// Queries whose filter mentions a key registered with
/// [`FixtureQuery::failing_for`] fail with a network error.
#[derive(Debug, Default)]
pub struct FixtureQuery {
    features: Vec<Feature>,
    failing_keys: Vec<&'static str>,
}

impl FixtureQuery {
    /// Serve `features`.
    pub fn new<I>(features: I) -> Self
    where
        I: IntoIterator<Item = Feature>,
    {
        Self {
            features: features.into_iter().collect(),
            failing_keys: Vec::new(),
        }
    }

    /// Fail every query that filters on `key`.
    #[must_use]
    pub fn failing_for(mut self, key: &'static str) -> Self {
        self.failing_keys.push(key);
        self
    }
}

impl TagQuery for FixtureQuery {
    fn query(&self, area: &Geometry<f64>, filter: &TagFilter) -> Result<FeatureTable, QueryError> {
        let kind = GeometryKind::of(area);
        if !kind.is_areal() {
            return Err(QueryError::UnsupportedArea { kind });
        }
        if let Some(key) = filter
            .keys()
            .into_iter()
            .find(|key| self.failing_keys.contains(key))
        {
            return Err(QueryError::Network {
                url: "fixture://query".to_owned(),
                message: format!("simulated failure for {key}"),
            });
        }
        Ok(FeatureTable::from_features(
            Crs::WGS84,
            self.features
                .iter()
                .filter(|feature| filter.matches_feature(feature))
                .cloned(),
        ))
    }
}

/// Relabels tables without touching coordinates.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTransform;

impl CrsTransform for IdentityTransform {
    fn transform(&self, table: FeatureTable, target: Crs) -> Result<FeatureTable, ProjectionError> {
        Ok(table.with_crs(target))
    }
}

/// Shifts coordinates by a fixed offset when leaving WGS84 and back again
/// when returning, standing in for a false-easting projection.
#[derive(Debug, Clone, Copy)]
pub struct OffsetTransform {
    dx: f64,
    dy: f64,
}

impl OffsetTransform {
    /// Create a transform with the given offsets.
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

impl CrsTransform for OffsetTransform {
    fn transform(&self, table: FeatureTable, target: Crs) -> Result<FeatureTable, ProjectionError> {
        if table.crs() == target {
            return Ok(table);
        }
        let (dx, dy) = if target == Crs::WGS84 {
            (-self.dx, -self.dy)
        } else {
            (self.dx, self.dy)
        };
        let shifted = table.try_map_geometries(|geometry| {
            Ok::<_, ProjectionError>(geometry.map_coords(|Coord { x, y }| Coord {
                x: x + dx,
                y: y + dy,
            }))
        })?;
        Ok(shifted.with_crs(target))
    }
}

/// A write captured by [`RecordingWriter`].
pub type RecordedWrite = (PathBuf, OutputFormat, FeatureTable);

/// Records writes in memory instead of touching the filesystem.
#[derive(Debug, Default)]
pub struct RecordingWriter {
    writes: Mutex<Vec<RecordedWrite>>,
}

impl RecordingWriter {
    /// Writes received so far.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl VectorWriter for RecordingWriter {
    fn write(
        &self,
        table: &FeatureTable,
        path: &Path,
        format: OutputFormat,
    ) -> Result<(), WriteError> {
        let mut guard = self.writes.lock().map_err(|_| WriteError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("recording writer lock poisoned"),
        })?;
        guard.push((path.to_path_buf(), format, table.clone()));
        Ok(())
    }
}

/// Rejects every write.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingWriter;

impl VectorWriter for FailingWriter {
    fn write(
        &self,
        _table: &FeatureTable,
        path: &Path,
        _format: OutputFormat,
    ) -> Result<(), WriteError> {
        Err(WriteError::Io {
            path: path.to_path_buf(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        })
    }
}
