//! Core domain for extracting thematic OpenStreetMap layers.
//!
//! A country [`Boundary`] is run through every [`LayerConfig`] in the
//! [`CATALOG`]. Each layer follows the same template: a tag query, geometry
//! reduction through a local CRS, `fclass` classification, schema
//! reconciliation, column-name normalization and a file write.
//!
//! Network access, projection maths and file formats live behind the
//! [`TagQuery`], [`CrsTransform`] and [`VectorWriter`] traits so this crate
//! performs no I/O of its own.

#![forbid(unsafe_code)]

pub mod boundary;
pub mod catalog;
pub mod columns;
pub mod crs;
pub mod extract;
pub mod orchestrate;
pub mod query;
pub mod reduce;
pub mod schema;
pub mod table;
pub mod tags;
pub mod writer;

#[doc(hidden)]
pub mod test_support;

pub use boundary::{Boundary, BoundaryError, BoundarySource, country_code_from_path};
pub use catalog::{CATALOG, FCLASS_COLUMN, FclassSource, LayerConfig, OutputName, find_layer};
pub use columns::{ColumnMapping, MAX_COLUMN_NAME_LEN, normalize_column_names};
pub use crs::{Crs, CrsPair, CrsTransform, ProjectionError, crs_for_country};
pub use extract::{ExtractError, LayerExtractor, LayerOutcome};
pub use orchestrate::{
    BoundaryJob, BoundaryReport, BoundaryRun, LayerDispatch, LayerReport, Orchestrator,
    SequentialDispatch,
};
pub use query::{QueryError, TagQuery};
pub use reduce::{ReductionMode, reduce_geometries};
pub use schema::{SchemaReport, reconcile_schema};
pub use table::{AttributeValue, Feature, FeatureTable, GeometryKind};
pub use tags::{TagClause, TagCondition, TagFilter, TagMatch};
pub use writer::{OutputFormat, VectorWriter, WriteError};
