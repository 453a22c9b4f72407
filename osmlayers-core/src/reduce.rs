//! Geometry reduction: centroids and geometry-type filters.
//!
//! Every mode round-trips the table through the country's projected CRS so
//! centroids are computed on a planar surface, then returns it in the global
//! CRS.

use geo::{Centroid, Geometry};

use crate::crs::{CrsPair, CrsTransform, ProjectionError};
use crate::table::{FeatureTable, GeometryKind};

/// How a layer turns query geometries into its output representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionMode {
    /// Replace every geometry with its centroid.
    Centroid,
    /// Replace non-point geometries with their centroid; keep points.
    CentroidIfNotPoint,
    /// Keep only line strings and multi-line strings.
    Lines,
    /// Keep only polygons and multi-polygons.
    Polygons,
}

impl ReductionMode {
    /// Return `true` when features of `kind` survive the pre-projection filter.
    pub const fn keeps(self, kind: GeometryKind) -> bool {
        match self {
            Self::Centroid | Self::CentroidIfNotPoint => true,
            Self::Lines => matches!(kind, GeometryKind::LineString | GeometryKind::MultiLineString),
            Self::Polygons => matches!(kind, GeometryKind::Polygon | GeometryKind::MultiPolygon),
        }
    }
}

/// Reduce `table` according to `mode`.
///
/// Features without a centroid (empty geometries) are dropped. An empty
/// result is a normal outcome.
///
/// # Errors
///
/// Returns [`ProjectionError`] when either reprojection fails.
pub fn reduce_geometries(
    mut table: FeatureTable,
    mode: ReductionMode,
    transform: &dyn CrsTransform,
    crs: CrsPair,
) -> Result<FeatureTable, ProjectionError> {
    table.retain(|feature| mode.keeps(feature.kind()));
    let projected = transform.transform(table, crs.projected)?;
    let reduced = match mode {
        ReductionMode::Centroid => projected.filter_map_geometries(centroid),
        ReductionMode::CentroidIfNotPoint => {
            projected.filter_map_geometries(|geometry| match geometry {
                Geometry::Point(_) => Some(geometry),
                other => centroid(other),
            })
        }
        ReductionMode::Lines | ReductionMode::Polygons => projected,
    };
    transform.transform(reduced, crs.global)
}

fn centroid(geometry: Geometry<f64>) -> Option<Geometry<f64>> {
    geometry.centroid().map(Geometry::Point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use crate::table::Feature;
    use crate::test_support::{IdentityTransform, OffsetTransform};
    use geo::{LineString, Point, Polygon, polygon};
    use rstest::{fixture, rstest};

    fn square() -> Polygon<f64> {
        polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)]
    }

    #[fixture]
    fn mixed() -> FeatureTable {
        FeatureTable::from_features(
            Crs::WGS84,
            [
                Feature::new(Geometry::Point(Point::new(5.0, 5.0))).with_attribute("name", "node"),
                Feature::new(Geometry::LineString(LineString::from(vec![
                    (0.0, 0.0),
                    (4.0, 0.0),
                ])))
                .with_attribute("name", "way"),
                Feature::new(Geometry::Polygon(square())).with_attribute("name", "area"),
            ],
        )
    }

    fn pair() -> CrsPair {
        CrsPair {
            projected: Crs::from_epsg(3006),
            global: Crs::WGS84,
        }
    }

    #[rstest]
    fn centroid_mode_yields_only_points(mixed: FeatureTable) {
        let reduced = reduce_geometries(mixed, ReductionMode::Centroid, &IdentityTransform, pair())
            .expect("reduction succeeds");
        assert_eq!(reduced.len(), 3);
        assert!(reduced.features().iter().all(|f| f.kind() == GeometryKind::Point));
        assert_eq!(
            reduced.features()[2].geometry,
            Geometry::Point(Point::new(1.0, 1.0))
        );
        assert_eq!(reduced.crs(), Crs::WGS84);
    }

    #[rstest]
    fn centroid_round_trip_preserves_points(mixed: FeatureTable) {
        let transform = OffsetTransform::new(500_000.0, 6_000_000.0);
        let reduced = reduce_geometries(mixed, ReductionMode::Centroid, &transform, pair())
            .expect("reduction succeeds");
        let Geometry::Point(point) = reduced.features()[0].geometry else {
            panic!("expected a point");
        };
        assert!((point.x() - 5.0).abs() < 1e-9);
        assert!((point.y() - 5.0).abs() < 1e-9);
    }

    #[rstest]
    fn centroid_if_not_point_keeps_nodes(mixed: FeatureTable) {
        let reduced = reduce_geometries(
            mixed,
            ReductionMode::CentroidIfNotPoint,
            &IdentityTransform,
            pair(),
        )
        .expect("reduction succeeds");
        assert_eq!(
            reduced.features()[0].geometry,
            Geometry::Point(Point::new(5.0, 5.0))
        );
        assert_eq!(
            reduced.features()[1].geometry,
            Geometry::Point(Point::new(2.0, 0.0))
        );
    }

    #[rstest]
    fn line_filter_keeps_lines_with_attributes(mixed: FeatureTable) {
        let reduced = reduce_geometries(mixed, ReductionMode::Lines, &IdentityTransform, pair())
            .expect("reduction succeeds");
        assert_eq!(reduced.len(), 1);
        let line = &reduced.features()[0];
        assert_eq!(line.kind(), GeometryKind::LineString);
        assert_eq!(line.tag("name"), Some("way"));
    }

    #[rstest]
    fn polygon_filter_keeps_areas(mixed: FeatureTable) {
        let reduced = reduce_geometries(mixed, ReductionMode::Polygons, &IdentityTransform, pair())
            .expect("reduction succeeds");
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced.features()[0].kind(), GeometryKind::Polygon);
    }

    #[rstest]
    fn empty_filter_result_is_not_an_error() {
        let table = FeatureTable::from_features(
            Crs::WGS84,
            [Feature::new(Geometry::Point(Point::new(0.0, 0.0)))],
        );
        let reduced = reduce_geometries(table, ReductionMode::Lines, &IdentityTransform, pair())
            .expect("reduction succeeds");
        assert!(reduced.is_empty());
    }
}
