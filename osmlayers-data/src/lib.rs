//! Adapters that connect the layer pipeline to the outside world.
//!
//! Responsibilities:
//! - Read GeoJSON country boundaries.
//! - Query the Overpass API for tagged OSM elements, with an on-disk cache.
//! - Reproject tables between EPSG codes using `proj4rs`.
//! - Write Shapefile and GeoPackage outputs.
//!
//! Boundaries:
//! - Do not encode layer rules (live in `osmlayers-core`).
//! - Keep the collaborator traits synchronous; async HTTP is bridged
//!   internally.

#![forbid(unsafe_code)]

pub mod boundary;
pub mod overpass;
pub mod projection;
pub mod writer;

pub use boundary::GeoJsonBoundarySource;
pub use overpass::{
    ClientBuildError, DEFAULT_ENDPOINT, DEFAULT_USER_AGENT, OverpassClient, OverpassConfig,
    QuerySettings,
};
pub use projection::Proj4Transform;
pub use writer::FileVectorWriter;
