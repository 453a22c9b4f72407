//! On-disk response cache keyed by endpoint and query text.

use std::io;
use std::path::{Path, PathBuf};

use camino::Utf8Path;
use osmlayers_core::QueryError;
use sha2::{Digest, Sha256};

/// Cached Overpass answers stored as `<hash>.json` files.
#[derive(Debug, Clone)]
pub(super) struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    pub(super) fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The cache file for a request.
    pub(super) fn entry_path(&self, endpoint: &str, query: &str) -> PathBuf {
        self.dir.join(format!("{}.json", request_digest(endpoint, query)))
    }

    /// The cached body, if present.
    pub(super) fn load(&self, path: &Path) -> Result<Option<String>, QueryError> {
        let utf8 = osmlayers_fs::utf8_path(path).map_err(|err| cache_error(path, &err))?;
        // A missing cache directory reads as a miss too.
        match read_file(utf8) {
            Ok(body) => Ok(Some(body)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(cache_error(path, &err)),
        }
    }

    /// Persist a response body.
    pub(super) fn store(&self, path: &Path, body: &str) -> Result<(), QueryError> {
        let utf8 = osmlayers_fs::utf8_path(path).map_err(|err| cache_error(path, &err))?;
        osmlayers_fs::ensure_parent_dir(utf8).map_err(|err| cache_error(path, &err))?;
        write_file(utf8, body).map_err(|err| cache_error(path, &err))
    }
}

fn read_file(path: &Utf8Path) -> io::Result<String> {
    let (dir, name) = osmlayers_fs::open_dir_and_file(path)?;
    dir.read_to_string(name.as_str())
}

fn write_file(path: &Utf8Path, body: &str) -> io::Result<()> {
    let (dir, name) = osmlayers_fs::open_dir_and_file(path)?;
    dir.write(name.as_str(), body)
}

fn cache_error(path: &Path, err: &io::Error) -> QueryError {
    QueryError::Cache {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Lowercase hex SHA-256 of the endpoint and query, newline separated.
fn request_digest(endpoint: &str, query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(endpoint.as_bytes());
    hasher.update(b"\n");
    hasher.update(query.as_bytes());
    format!("{:x}", hasher.finalize())
}
