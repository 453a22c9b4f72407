//! The generic layer extraction template.
//!
//! [`LayerExtractor::extract`] runs one [`LayerConfig`] against one
//! [`Boundary`]: query, reduce, classify, reconcile, normalize, write. Every
//! catalogued layer goes through the same sequence.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use crate::boundary::{Boundary, BoundaryError};
use crate::catalog::{FCLASS_COLUMN, LayerConfig};
use crate::columns::normalize_column_names;
use crate::crs::{CrsTransform, ProjectionError};
use crate::query::{QueryError, TagQuery};
use crate::reduce::reduce_geometries;
use crate::schema::reconcile_schema;
use crate::table::{FeatureTable, GeometryKind};
use crate::writer::{VectorWriter, WriteError};

/// Result of one layer extraction that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "status", rename_all = "snake_case")
)]
pub enum LayerOutcome {
    /// Features were written to `path`.
    Written {
        /// Output file.
        path: PathBuf,
        /// Number of features written.
        features: usize,
    },
    /// Nothing matched; no file was written.
    NoData,
    /// The extraction failed with `reason`.
    Failed {
        /// Rendered error.
        reason: String,
    },
}

impl LayerOutcome {
    /// Convert an extraction result into an outcome, rendering errors.
    pub fn from_result(result: Result<Self, ExtractError>) -> Self {
        result.unwrap_or_else(|err| Self::Failed {
            reason: err.to_string(),
        })
    }

    /// Return `true` for [`LayerOutcome::Failed`].
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Errors that abort a single layer extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The boundary is not a polygon or multi-polygon.
    #[error("unsupported boundary geometry {kind}; expected Polygon or MultiPolygon")]
    UnsupportedGeometry {
        /// Offending geometry kind.
        kind: GeometryKind,
    },
    /// The boundary could not be loaded.
    #[error(transparent)]
    Boundary(#[from] BoundaryError),
    /// The tag query failed.
    #[error("query for layer {layer} failed: {source}")]
    Query {
        /// Layer name.
        layer: &'static str,
        /// Underlying error.
        #[source]
        source: QueryError,
    },
    /// Reprojection failed.
    #[error("reprojection for layer {layer} failed: {source}")]
    Projection {
        /// Layer name.
        layer: &'static str,
        /// Underlying error.
        #[source]
        source: ProjectionError,
    },
    /// The writer rejected the table.
    #[error("writing layer {layer} to {path:?} failed: {source}")]
    Write {
        /// Layer name.
        layer: &'static str,
        /// Output file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: WriteError,
    },
}

/// Runs the extraction template with a fixed set of collaborators.
#[derive(Clone, Copy)]
pub struct LayerExtractor<'a> {
    query: &'a dyn TagQuery,
    transform: &'a dyn CrsTransform,
    writer: &'a dyn VectorWriter,
}

impl std::fmt::Debug for LayerExtractor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerExtractor").finish_non_exhaustive()
    }
}

impl<'a> LayerExtractor<'a> {
    /// Bind the collaborators.
    pub const fn new(
        query: &'a dyn TagQuery,
        transform: &'a dyn CrsTransform,
        writer: &'a dyn VectorWriter,
    ) -> Self {
        Self {
            query,
            transform,
            writer,
        }
    }

    /// Extract `layer` for `boundary` into `output_root`.
    ///
    /// A selection that is empty after reduction yields
    /// [`LayerOutcome::NoData`] and writes nothing. Missing required
    /// attributes are logged as a warning and filled with nulls.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] when the boundary is not areal or a
    /// collaborator fails.
    pub fn extract(
        &self,
        boundary: &Boundary,
        layer: &'static LayerConfig,
        output_root: &Path,
    ) -> Result<LayerOutcome, ExtractError> {
        boundary
            .ensure_areal()
            .map_err(|kind| ExtractError::UnsupportedGeometry { kind })?;

        let queried = self
            .query
            .query(&boundary.geometry, &layer.filter)
            .map_err(|source| ExtractError::Query {
                layer: layer.name,
                source,
            })?;
        debug!("{}: query returned {} features", layer.name, queried.len());

        let mut table = reduce_geometries(queried, layer.reduction, self.transform, boundary.crs())
            .map_err(|source| ExtractError::Projection {
                layer: layer.name,
                source,
            })?;

        classify(&mut table, layer);
        let report = reconcile_schema(&mut table, layer.attributes);
        if !report.is_complete() {
            warn!(
                "{}: missing attributes filled with nulls: {}",
                layer.name,
                report.missing.join(", ")
            );
        }
        table.select_columns(&layer.output_columns());
        let mapping = normalize_column_names(table.columns());
        table.rename_columns(&mapping);

        if table.is_empty() {
            return Ok(LayerOutcome::NoData);
        }

        let path = layer.output_path(output_root, &boundary.country_code);
        self.writer
            .write(&table, &path, layer.output.format)
            .map_err(|source| ExtractError::Write {
                layer: layer.name,
                path: path.clone(),
                source,
            })?;
        Ok(LayerOutcome::Written {
            path,
            features: table.len(),
        })
    }
}

fn classify(table: &mut FeatureTable, layer: &LayerConfig) {
    if !layer.fclass.is_present() {
        return;
    }
    table.add_column(FCLASS_COLUMN);
    for feature in table.features_mut() {
        if let Some(class) = layer.fclass.classify(feature) {
            feature.attributes.insert(FCLASS_COLUMN.to_owned(), class);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::find_layer;
    use crate::crs::Crs;
    use crate::table::Feature;
    use crate::test_support::{FailingWriter, FixtureQuery, IdentityTransform, RecordingWriter};
    use crate::writer::OutputFormat;
    use geo::{Geometry, LineString, Point, polygon};
    use rstest::{fixture, rstest};

    #[fixture]
    fn boundary() -> Boundary {
        Boundary::new(
            "xyz",
            Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)
            ]),
        )
    }

    fn bank(x: f64, name: &str) -> Feature {
        Feature::new(Geometry::Point(Point::new(x, 1.0)))
            .with_attribute("amenity", "bank")
            .with_attribute("name", name)
            .with_attribute("operator", "Central")
    }

    #[rstest]
    fn writes_reconciled_table(boundary: Boundary) {
        let query = FixtureQuery::new([bank(1.0, "First"), bank(2.0, "Second")]);
        let writer = RecordingWriter::default();
        let extractor = LayerExtractor::new(&query, &IdentityTransform, &writer);
        let layer = find_layer("bank").expect("bank layer");

        let outcome = extractor
            .extract(&boundary, layer, Path::new("/out"))
            .expect("extraction succeeds");

        let expected = PathBuf::from("/out/xyz/208_cash/xyz_cash_bnk_pt_s0_osm_pp_bank.shp");
        assert_eq!(
            outcome,
            LayerOutcome::Written {
                path: expected.clone(),
                features: 2,
            }
        );
        let writes = writer.writes();
        let (path, format, table) = writes.first().expect("one write");
        assert_eq!(path, &expected);
        assert_eq!(*format, OutputFormat::Shapefile);
        assert_eq!(table.columns(), ["fclass", "name", "name:en", "name_en"]);
        assert_eq!(table.features()[0].tag("fclass"), Some("bank"));
        assert!(table.features()[0].value("name:en").is_null());
    }

    #[rstest]
    fn empty_selection_reports_no_data(boundary: Boundary) {
        let query = FixtureQuery::new([bank(1.0, "Elsewhere")]);
        let writer = RecordingWriter::default();
        let extractor = LayerExtractor::new(&query, &IdentityTransform, &writer);
        let layer = find_layer("schools").expect("schools layer");

        let outcome = extractor
            .extract(&boundary, layer, Path::new("/out"))
            .expect("extraction succeeds");

        assert_eq!(outcome, LayerOutcome::NoData);
        assert!(writer.writes().is_empty());
    }

    #[rstest]
    fn line_layers_drop_points_before_writing(boundary: Boundary) {
        let query = FixtureQuery::new([
            Feature::new(Geometry::Point(Point::new(1.0, 1.0))).with_attribute("waterway", "river"),
            Feature::new(Geometry::LineString(LineString::from(vec![(1.0, 1.0), (2.0, 2.0)])))
                .with_attribute("waterway", "river")
                .with_attribute("name", "Tana"),
        ]);
        let writer = RecordingWriter::default();
        let extractor = LayerExtractor::new(&query, &IdentityTransform, &writer);
        let layer = find_layer("rivers").expect("rivers layer");

        let outcome = extractor
            .extract(&boundary, layer, Path::new("/out"))
            .expect("extraction succeeds");

        assert!(matches!(outcome, LayerOutcome::Written { features: 1, .. }));
        let writes = writer.writes();
        let (_, _, table) = writes.first().expect("one write");
        assert_eq!(table.features()[0].tag("fclass"), Some("river"));
        assert_eq!(table.crs(), Crs::WGS84);
    }

    #[rstest]
    fn long_attribute_names_are_normalized(boundary: Boundary) {
        let query = FixtureQuery::new([Feature::new(Geometry::Point(Point::new(1.0, 1.0)))
            .with_attribute("amenity", "school")
            .with_attribute("operator:type", "public")
            .with_attribute("school:gender", "mixed")]);
        let writer = RecordingWriter::default();
        let extractor = LayerExtractor::new(&query, &IdentityTransform, &writer);
        let layer = find_layer("schools").expect("schools layer");

        extractor
            .extract(&boundary, layer, Path::new("/out"))
            .expect("extraction succeeds");

        let writes = writer.writes();
        let (_, _, table) = writes.first().expect("one write");
        assert!(table.columns().iter().all(|column| column.len() <= 10));
        assert!(table.has_column("operator:t"));
        assert!(table.has_column("operator_t"));
        assert_eq!(table.features()[0].tag("school:gen"), Some("mixed"));
    }

    #[rstest]
    fn point_boundary_is_rejected() {
        let query = FixtureQuery::new([bank(1.0, "First")]);
        let writer = RecordingWriter::default();
        let extractor = LayerExtractor::new(&query, &IdentityTransform, &writer);
        let layer = find_layer("bank").expect("bank layer");
        let boundary = Boundary::new("xyz", Geometry::Point(Point::new(0.0, 0.0)));

        let err = extractor
            .extract(&boundary, layer, Path::new("/out"))
            .expect_err("point boundary must fail");

        assert!(matches!(
            err,
            ExtractError::UnsupportedGeometry {
                kind: GeometryKind::Point
            }
        ));
    }

    #[rstest]
    fn writer_failures_carry_layer_identity(boundary: Boundary) {
        let query = FixtureQuery::new([bank(1.0, "First")]);
        let extractor = LayerExtractor::new(&query, &IdentityTransform, &FailingWriter);
        let layer = find_layer("bank").expect("bank layer");

        let outcome = LayerOutcome::from_result(extractor.extract(
            &boundary,
            layer,
            Path::new("/out"),
        ));

        let LayerOutcome::Failed { reason } = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert!(reason.contains("bank"), "reason should name the layer: {reason}");
    }
}
