//! Facade crate for the OSM thematic layer extractor.
//!
//! This crate re-exports the core domain types and, behind the `data`
//! feature, the Overpass, projection and file-format adapters.

#![forbid(unsafe_code)]

pub use osmlayers_core::{
    Boundary, BoundaryError, BoundaryReport, BoundaryRun, BoundarySource, CATALOG, Crs,
    CrsTransform, ExtractError, FeatureTable, LayerConfig, LayerDispatch, LayerExtractor,
    LayerOutcome, Orchestrator, OutputFormat, QueryError, SequentialDispatch, TagFilter, TagQuery,
    VectorWriter, find_layer,
};

#[cfg(feature = "data")]
pub use osmlayers_data::{
    FileVectorWriter, GeoJsonBoundarySource, OverpassClient, OverpassConfig, Proj4Transform,
};
