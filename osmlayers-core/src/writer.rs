//! The vector-file writer collaborator.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::table::{FeatureTable, GeometryKind};

/// Output file format of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputFormat {
    /// ESRI Shapefile (`.shp` plus sidecar files).
    Shapefile,
    /// OGC GeoPackage (`.gpkg`).
    GeoPackage,
}

impl OutputFormat {
    /// File extension without the leading dot.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Shapefile => "shp",
            Self::GeoPackage => "gpkg",
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            ext if ext.eq_ignore_ascii_case("shp") => Some(Self::Shapefile),
            ext if ext.eq_ignore_ascii_case("gpkg") => Some(Self::GeoPackage),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Shapefile => "Shapefile",
            Self::GeoPackage => "GeoPackage",
        })
    }
}

/// Errors raised while persisting a table.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The output directory could not be created.
    #[error("failed to create output directory for {path:?}")]
    CreateDirectory {
        /// Output file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The format cannot store this geometry kind.
    #[error("cannot write {kind} geometry to a {format} file")]
    UnsupportedGeometry {
        /// Offending geometry kind.
        kind: GeometryKind,
        /// Target format.
        format: OutputFormat,
    },
    /// A Shapefile target received several shape families.
    #[error("{path:?} would mix {first} and {second} geometries")]
    MixedGeometry {
        /// Output file.
        path: PathBuf,
        /// Kind of the first feature.
        first: GeometryKind,
        /// First conflicting kind.
        second: GeometryKind,
    },
    /// A column name is not acceptable to the format.
    #[error("column name {name:?} is not valid for {format}")]
    ColumnName {
        /// Offending column.
        name: String,
        /// Target format.
        format: OutputFormat,
    },
    /// The encoder rejected the data.
    #[error("failed to encode {path:?}: {message}")]
    Encode {
        /// Output file.
        path: PathBuf,
        /// Encoder message.
        message: String,
    },
    /// A filesystem operation failed.
    #[error("I/O error writing {path:?}")]
    Io {
        /// Output file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Persist feature tables as vector files.
pub trait VectorWriter: Send + Sync {
    /// Write `table` to `path` in `format`, creating parent directories and
    /// replacing any existing file.
    fn write(&self, table: &FeatureTable, path: &Path, format: OutputFormat)
    -> Result<(), WriteError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("roads.shp", Some(OutputFormat::Shapefile))]
    #[case("dam.GPKG", Some(OutputFormat::GeoPackage))]
    #[case("notes.txt", None)]
    #[case("no_extension", None)]
    fn infers_format_from_extension(#[case] name: &str, #[case] expected: Option<OutputFormat>) {
        assert_eq!(OutputFormat::from_path(Path::new(name)), expected);
    }
}
