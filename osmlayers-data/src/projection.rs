//! [`CrsTransform`] backed by `proj4rs`.

use geo::{Coord, MapCoords};
use osmlayers_core::{Crs, CrsTransform, FeatureTable, ProjectionError};
use proj4rs::proj::Proj;

/// PROJ definitions for every CRS the catalogue can request.
///
/// The flag marks geographic systems, whose coordinates `proj4rs` expects
/// in radians.
const DEFINITIONS: &[(u32, &str, bool)] = &[
    (4326, "+proj=longlat +datum=WGS84 +no_defs", true),
    (
        4255,
        "+proj=longlat +ellps=intl +towgs84=-333,-222,114,0,0,0,0 +no_defs",
        true,
    ),
    (
        2136,
        "+proj=tmerc +lat_0=4.666666666666667 +lon_0=-1 +k=0.99975 +x_0=274319.7391633579 \
         +y_0=0 +a=6378300 +b=6356751.689189189 +towgs84=-199,32,322,0,0,0,0 \
         +to_meter=0.3047997101815088 +no_defs",
        false,
    ),
    (
        3006,
        "+proj=utm +zone=33 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
        false,
    ),
    (
        3893,
        "+proj=tmerc +lat_0=29.02626833333333 +lon_0=46.5 +k=0.9994 +x_0=800000 +y_0=0 \
         +ellps=intl +towgs84=-87,-98,-121,0,0,0,0 +units=m +no_defs",
        false,
    ),
    (
        4210,
        "+proj=longlat +ellps=clrk80 +towgs84=-160,-6,-302,0,0,0,0 +no_defs",
        true,
    ),
];

/// Reprojects tables using built-in PROJ strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct Proj4Transform;

struct Endpoint {
    crs: Crs,
    proj: Proj,
    geographic: bool,
}

impl Endpoint {
    fn for_crs(crs: Crs) -> Result<Self, ProjectionError> {
        let (_, definition, geographic) = DEFINITIONS
            .iter()
            .find(|(code, _, _)| *code == crs.epsg())
            .ok_or(ProjectionError::UnknownCrs { crs })?;
        let proj = Proj::from_proj_string(definition).map_err(|err| {
            ProjectionError::Transform {
                from: crs,
                to: crs,
                message: err.to_string(),
            }
        })?;
        Ok(Self {
            crs,
            proj,
            geographic: *geographic,
        })
    }
}

impl Proj4Transform {
    /// Whether a definition is available for `crs`.
    pub fn supports(crs: Crs) -> bool {
        DEFINITIONS.iter().any(|(code, _, _)| *code == crs.epsg())
    }

    fn convert(source: &Endpoint, target: &Endpoint, coord: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        let mut point = if source.geographic {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        proj4rs::transform::transform(&source.proj, &target.proj, &mut point).map_err(|err| {
            ProjectionError::Transform {
                from: source.crs,
                to: target.crs,
                message: err.to_string(),
            }
        })?;
        let (x, y, _) = point;
        if target.geographic {
            Ok(Coord {
                x: x.to_degrees(),
                y: y.to_degrees(),
            })
        } else {
            Ok(Coord { x, y })
        }
    }
}

impl CrsTransform for Proj4Transform {
    fn transform(&self, table: FeatureTable, target: Crs) -> Result<FeatureTable, ProjectionError> {
        if table.crs() == target {
            return Ok(table);
        }
        let source = Endpoint::for_crs(table.crs())?;
        let destination = Endpoint::for_crs(target)?;
        let transformed = table.try_map_geometries(|geometry| {
            geometry.try_map_coords(|coord| Self::convert(&source, &destination, coord))
        })?;
        Ok(transformed.with_crs(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Geometry, Point};
    use osmlayers_core::{Feature, crs_for_country};
    use rstest::rstest;

    fn point_table(crs: Crs, x: f64, y: f64) -> FeatureTable {
        FeatureTable::from_features(crs, [Feature::new(Geometry::Point(Point::new(x, y)))])
    }

    fn only_point(table: &FeatureTable) -> Point<f64> {
        match table.features()[0].geometry {
            Geometry::Point(point) => point,
            ref other => panic!("expected point, got {other:?}"),
        }
    }

    #[rstest]
    fn same_crs_is_untouched() {
        let table = point_table(Crs::WGS84, 12.5, 55.25);
        let out = Proj4Transform
            .transform(table.clone(), Crs::WGS84)
            .expect("identity");
        assert_eq!(out, table);
    }

    #[rstest]
    fn sweden_projects_to_utm_metres() {
        let projected = Proj4Transform
            .transform(point_table(Crs::WGS84, 15.0, 60.0), crs_for_country("swe"))
            .expect("projects");

        let point = only_point(&projected);
        assert_eq!(projected.crs(), Crs::from_epsg(3006));
        // Zone 33 central meridian is 15°E, so easting sits at the false easting.
        assert!((point.x() - 500_000.0).abs() < 1.0, "easting {}", point.x());
        assert!((point.y() - 6_651_411.0).abs() < 100.0, "northing {}", point.y());
    }

    #[rstest]
    #[case("afg", 66.0, 34.0)]
    #[case("gha", -1.0, 7.0)]
    #[case("irq", 44.0, 33.0)]
    #[case("ken", 37.0, 0.5)]
    #[case("swe", 18.0, 59.3)]
    fn round_trips_through_local_crs(#[case] country: &str, #[case] lon: f64, #[case] lat: f64) {
        let local = crs_for_country(country);
        let there = Proj4Transform
            .transform(point_table(Crs::WGS84, lon, lat), local)
            .expect("forward");
        let back = Proj4Transform
            .transform(there, Crs::WGS84)
            .expect("inverse");

        let point = only_point(&back);
        assert!((point.x() - lon).abs() < 1e-6, "lon {}", point.x());
        assert!((point.y() - lat).abs() < 1e-6, "lat {}", point.y());
    }

    #[rstest]
    fn unknown_crs_is_reported() {
        let err = Proj4Transform
            .transform(point_table(Crs::WGS84, 0.0, 0.0), Crs::from_epsg(32633))
            .expect_err("no definition");
        assert_eq!(
            err,
            ProjectionError::UnknownCrs {
                crs: Crs::from_epsg(32633)
            }
        );
    }
}
