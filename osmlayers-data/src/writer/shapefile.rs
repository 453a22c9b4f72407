//! ESRI Shapefile output with `.prj` and `.cpg` sidecars.
//!
//! Every attribute becomes a 254-byte character field. A Shapefile holds a
//! single shape family, so point, line and polygon features cannot share a
//! file.

use std::path::Path;

use geo::{Coord, Geometry, LineString, Polygon};
use osmlayers_core::{Crs, Feature, FeatureTable, GeometryKind, OutputFormat, WriteError};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point as ShpPoint, Polygon as ShpPolygon, PolygonRing, Polyline};

/// dBase character fields cannot exceed this many bytes.
const MAX_FIELD_BYTES: usize = 254;

const WGS84_PRJ: &str = "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",\
SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],PRIMEM[\"Greenwich\",0.0],\
UNIT[\"Degree\",0.0174532925199433]]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Point,
    Line,
    Polygon,
}

impl Family {
    const fn of(kind: GeometryKind) -> Option<Self> {
        match kind {
            GeometryKind::Point => Some(Self::Point),
            GeometryKind::Line | GeometryKind::LineString | GeometryKind::MultiLineString => {
                Some(Self::Line)
            }
            GeometryKind::Polygon
            | GeometryKind::MultiPolygon
            | GeometryKind::Rect
            | GeometryKind::Triangle => Some(Self::Polygon),
            GeometryKind::MultiPoint | GeometryKind::GeometryCollection => None,
        }
    }
}

pub(super) fn write(table: &FeatureTable, path: &Path) -> Result<(), WriteError> {
    let family = shape_family(table, path)?;
    let builder = table_builder(table)?;
    let records: Vec<Record> = table
        .features()
        .iter()
        .map(|feature| record(table, feature))
        .collect();
    let encode_error = |message: String| WriteError::Encode {
        path: path.to_path_buf(),
        message,
    };

    // Every shape is converted before the writer creates any file, so a
    // degenerate geometry leaves nothing behind.
    macro_rules! write_shapes {
        ($convert:expr) => {{
            let shapes = table
                .features()
                .iter()
                .map(|feature| {
                    $convert(&feature.geometry).ok_or_else(|| {
                        encode_error(format!("degenerate {} geometry", feature.kind()))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let mut writer = shapefile::Writer::from_path(path, builder)
                .map_err(|err| encode_error(err.to_string()))?;
            for (shape, record) in shapes.iter().zip(&records) {
                writer
                    .write_shape_and_record(shape, record)
                    .map_err(|err| encode_error(err.to_string()))?;
            }
        }};
    }

    match family {
        Family::Point => write_shapes!(to_point),
        Family::Line => write_shapes!(to_polyline),
        Family::Polygon => write_shapes!(to_polygon),
    }

    if table.crs() == Crs::WGS84 {
        super::write_sidecar(path, "prj", WGS84_PRJ)?;
    }
    super::write_sidecar(path, "cpg", "UTF-8")
}

/// The single shape family of `table`, rejecting mixtures and kinds with no
/// Shapefile equivalent.
fn shape_family(table: &FeatureTable, path: &Path) -> Result<Family, WriteError> {
    let mut first: Option<(GeometryKind, Family)> = None;
    for feature in table.features() {
        let kind = feature.kind();
        let family = Family::of(kind).ok_or(WriteError::UnsupportedGeometry {
            kind,
            format: OutputFormat::Shapefile,
        })?;
        match first {
            None => first = Some((kind, family)),
            Some((first_kind, first_family)) if first_family != family => {
                return Err(WriteError::MixedGeometry {
                    path: path.to_path_buf(),
                    first: first_kind,
                    second: kind,
                });
            }
            Some(_) => {}
        }
    }
    Ok(first.map_or(Family::Point, |(_, family)| family))
}

fn table_builder(table: &FeatureTable) -> Result<TableWriterBuilder, WriteError> {
    let mut builder = TableWriterBuilder::new();
    for column in table.columns() {
        let name = FieldName::try_from(column.as_str()).map_err(|_| WriteError::ColumnName {
            name: column.clone(),
            format: OutputFormat::Shapefile,
        })?;
        builder = builder.add_character_field(name, 254);
    }
    Ok(builder)
}

fn record(table: &FeatureTable, feature: &Feature) -> Record {
    let mut record = Record::default();
    for column in table.columns() {
        let cell = feature
            .value(column)
            .to_cell()
            .map(|text| truncate_bytes(text, MAX_FIELD_BYTES));
        record.insert(column.clone(), FieldValue::Character(cell));
    }
    record
}

fn truncate_bytes(mut text: String, max: usize) -> String {
    if text.len() > max {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

fn shp_points(line: &LineString<f64>) -> Vec<ShpPoint> {
    line.0
        .iter()
        .map(|Coord { x, y }| ShpPoint::new(*x, *y))
        .collect()
}

fn to_point(geometry: &Geometry<f64>) -> Option<ShpPoint> {
    match geometry {
        Geometry::Point(point) => Some(ShpPoint::new(point.x(), point.y())),
        _ => None,
    }
}

fn to_polyline(geometry: &Geometry<f64>) -> Option<Polyline> {
    let lines: Vec<LineString<f64>> = match geometry {
        Geometry::Line(line) => vec![LineString::new(vec![line.start, line.end])],
        Geometry::LineString(line) => vec![line.clone()],
        Geometry::MultiLineString(multi) => multi.0.clone(),
        _ => return None,
    };
    let parts: Vec<Vec<ShpPoint>> = lines
        .iter()
        .filter(|line| line.0.len() >= 2)
        .map(shp_points)
        .collect();
    (!parts.is_empty()).then(|| Polyline::with_parts(parts))
}

fn to_polygon(geometry: &Geometry<f64>) -> Option<ShpPolygon> {
    let polygons: Vec<Polygon<f64>> = match geometry {
        Geometry::Polygon(polygon) => vec![polygon.clone()],
        Geometry::MultiPolygon(multi) => multi.0.clone(),
        Geometry::Rect(rect) => vec![rect.to_polygon()],
        Geometry::Triangle(triangle) => vec![triangle.to_polygon()],
        _ => return None,
    };
    let mut rings = Vec::new();
    for polygon in &polygons {
        if polygon.exterior().0.len() < 4 {
            continue;
        }
        rings.push(PolygonRing::Outer(shp_points(polygon.exterior())));
        rings.extend(
            polygon
                .interiors()
                .iter()
                .filter(|ring| ring.0.len() >= 4)
                .map(|ring| PolygonRing::Inner(shp_points(ring))),
        );
    }
    (!rings.is_empty()).then(|| ShpPolygon::with_rings(rings))
}
