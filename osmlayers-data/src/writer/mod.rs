//! File-backed [`VectorWriter`].

mod geopackage;
mod shapefile;
mod wkb;

use std::io;
use std::path::Path;

use camino::Utf8Path;
use osmlayers_core::{FeatureTable, OutputFormat, VectorWriter, WriteError};

/// Writes Shapefiles and GeoPackages to the local filesystem.
///
/// Parent directories are created on demand and existing outputs are
/// replaced.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileVectorWriter;

impl VectorWriter for FileVectorWriter {
    fn write(
        &self,
        table: &FeatureTable,
        path: &Path,
        format: OutputFormat,
    ) -> Result<(), WriteError> {
        let utf8 = utf8(path)?;
        osmlayers_fs::ensure_parent_dir(utf8).map_err(|source| WriteError::CreateDirectory {
            path: path.to_path_buf(),
            source,
        })?;
        match format {
            OutputFormat::Shapefile => shapefile::write(table, path),
            OutputFormat::GeoPackage => geopackage::write(table, utf8),
        }?;
        log::debug!("Wrote {} features to {}", table.len(), path.display());
        Ok(())
    }
}

fn utf8(path: &Path) -> Result<&Utf8Path, WriteError> {
    osmlayers_fs::utf8_path(path).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a small text file next to `path`, swapping its extension.
fn write_sidecar(path: &Path, extension: &str, contents: &str) -> Result<(), WriteError> {
    let sidecar = path.with_extension(extension);
    let io_error = |source: io::Error| WriteError::Io {
        path: sidecar.clone(),
        source,
    };
    let (dir, name) = osmlayers_fs::open_dir_and_file(utf8(&sidecar)?).map_err(io_error)?;
    dir.write(name.as_str(), contents).map_err(io_error)
}
