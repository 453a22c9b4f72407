//! Country boundaries and the collaborator that loads them.

use std::path::{Path, PathBuf};

use geo::Geometry;
use thiserror::Error;

use crate::crs::CrsPair;
use crate::table::GeometryKind;

/// A country's area of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    /// Country code taken from the boundary file name, in its original case.
    pub country_code: String,
    /// Boundary geometry in WGS84.
    pub geometry: Geometry<f64>,
}

impl Boundary {
    /// Create a boundary.
    pub fn new(country_code: impl Into<String>, geometry: Geometry<f64>) -> Self {
        Self {
            country_code: country_code.into(),
            geometry,
        }
    }

    /// The geometry variant of the boundary.
    pub const fn kind(&self) -> GeometryKind {
        GeometryKind::of(&self.geometry)
    }

    /// Check the boundary is a polygon or multi-polygon.
    ///
    /// # Errors
    ///
    /// Returns the offending kind for any other geometry.
    pub const fn ensure_areal(&self) -> Result<(), GeometryKind> {
        let kind = self.kind();
        if kind.is_areal() { Ok(()) } else { Err(kind) }
    }

    /// The projected/global CRS pair for this boundary's country.
    pub fn crs(&self) -> CrsPair {
        CrsPair::for_country(&self.country_code)
    }
}

/// Derive a country code from a boundary file path.
///
/// The code is the file name up to its first `.`, so `ken.admin0.json`
/// yields `ken`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use osmlayers_core::country_code_from_path;
///
/// assert_eq!(country_code_from_path(Path::new("/data/AFG.json")).as_deref(), Some("AFG"));
/// assert_eq!(country_code_from_path(Path::new("/data/.json")), None);
/// ```
pub fn country_code_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let code = name.split('.').next()?;
    if code.is_empty() {
        None
    } else {
        Some(code.to_owned())
    }
}

/// Errors raised while loading a boundary.
#[derive(Debug, Error)]
pub enum BoundaryError {
    /// The file could not be read.
    #[error("failed to read boundary file {path:?}")]
    Read {
        /// Boundary file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a usable GeoJSON document.
    #[error("boundary file {path:?} is not valid GeoJSON: {message}")]
    Parse {
        /// Boundary file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
    /// The document holds no geometry.
    #[error("boundary file {path:?} contains no geometry")]
    Empty {
        /// Boundary file.
        path: PathBuf,
    },
    /// No country code could be derived from the file name.
    #[error("cannot derive a country code from {path:?}")]
    CountryCode {
        /// Boundary file.
        path: PathBuf,
    },
}

/// Load boundaries from files.
pub trait BoundarySource: Send + Sync {
    /// Read the boundary stored at `path`.
    ///
    /// Implementations return whatever geometry the file holds; validating
    /// that it is areal is the caller's concern.
    fn load(&self, path: &Path) -> Result<Boundary, BoundaryError>;
}
