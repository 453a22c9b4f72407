//! Coordinate reference systems and the projection collaborator.

use std::fmt;

use thiserror::Error;

use crate::table::FeatureTable;

/// An EPSG-coded coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct Crs(u32);

impl Crs {
    /// WGS84 geographic coordinates, the global storage CRS.
    pub const WGS84: Self = Self(4326);

    /// Wrap an EPSG code.
    pub const fn from_epsg(code: u32) -> Self {
        Self(code)
    }

    /// The EPSG code.
    pub const fn epsg(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

/// Countries with a dedicated local CRS, keyed by lower-case code.
const COUNTRY_CRS: &[(&str, Crs)] = &[
    ("afg", Crs(4255)),
    ("gha", Crs(2136)),
    ("swe", Crs(3006)),
    ("irq", Crs(3893)),
    ("ken", Crs(4210)),
];

/// Look up the local CRS for a country code.
///
/// Matching is case-insensitive. Unknown codes fall back to
/// [`Crs::WGS84`], in which case no local reprojection takes place.
///
/// # Examples
///
/// ```
/// use osmlayers_core::{Crs, crs_for_country};
///
/// assert_eq!(crs_for_country("AFG"), crs_for_country("afg"));
/// assert_eq!(crs_for_country("xyz"), Crs::WGS84);
/// ```
pub fn crs_for_country(country_code: &str) -> Crs {
    COUNTRY_CRS
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(country_code))
        .map_or(Crs::WGS84, |(_, crs)| *crs)
}

/// The local and global CRS used while reducing a country's geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrsPair {
    /// Planar CRS used for centroid computation.
    pub projected: Crs,
    /// Storage CRS for query results and outputs.
    pub global: Crs,
}

impl CrsPair {
    /// The pair for a country code.
    pub fn for_country(country_code: &str) -> Self {
        Self {
            projected: crs_for_country(country_code),
            global: Crs::WGS84,
        }
    }
}

/// Errors raised by a [`CrsTransform`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    /// No definition is known for the CRS.
    #[error("no projection definition for {crs}")]
    UnknownCrs {
        /// The unsupported CRS.
        crs: Crs,
    },
    /// The transformation itself failed.
    #[error("failed to transform coordinates from {from} to {to}: {message}")]
    Transform {
        /// Source CRS.
        from: Crs,
        /// Target CRS.
        to: Crs,
        /// Description from the projection engine.
        message: String,
    },
}

/// Reproject feature tables between coordinate reference systems.
///
/// Implementations must return the table unchanged when its CRS already
/// equals `target`.
pub trait CrsTransform: Send + Sync {
    /// Return `table` with every geometry expressed in `target`.
    fn transform(&self, table: FeatureTable, target: Crs) -> Result<FeatureTable, ProjectionError>;
}
