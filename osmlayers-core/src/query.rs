//! The tag-query collaborator.

use std::path::PathBuf;

use geo::Geometry;
use thiserror::Error;

use crate::table::{FeatureTable, GeometryKind};
use crate::tags::TagFilter;

/// Errors from [`TagQuery::query`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The query area is not a polygon or multi-polygon.
    #[error("query area must be a Polygon or MultiPolygon, got {kind}")]
    UnsupportedArea {
        /// Offending geometry kind.
        kind: GeometryKind,
    },
    /// The request exceeded the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Endpoint URL.
        url: String,
        /// Configured timeout.
        timeout_secs: u64,
    },
    /// The service answered with an error status.
    #[error("request to {url} failed with HTTP {status}: {message}")]
    Http {
        /// Endpoint URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },
    /// The request could not be completed.
    #[error("network error contacting {url}: {message}")]
    Network {
        /// Endpoint URL.
        url: String,
        /// Error description.
        message: String,
    },
    /// The service answered but reported an error in its payload.
    #[error("query service reported an error: {message}")]
    Service {
        /// Remark returned by the service.
        message: String,
    },
    /// The response could not be decoded.
    #[error("failed to parse query response: {message}")]
    Parse {
        /// Decoder message.
        message: String,
    },
    /// The response cache could not be read or written.
    #[error("query cache at {path:?} is unusable: {message}")]
    Cache {
        /// Cache entry path.
        path: PathBuf,
        /// IO error description.
        message: String,
    },
}

/// Fetch OSM features matching a tag filter inside an area.
///
/// Returned tables are in WGS84 and carry one column per OSM tag found.
pub trait TagQuery: Send + Sync {
    /// Return every element inside `area` that matches `filter`.
    fn query(&self, area: &Geometry<f64>, filter: &TagFilter) -> Result<FeatureTable, QueryError>;
}
