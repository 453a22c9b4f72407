//! Little-endian WKB encoding.

use geo::{Coord, Geometry, LineString, Polygon};

const POINT: u32 = 1;
const LINE_STRING: u32 = 2;
const POLYGON: u32 = 3;
const MULTI_POINT: u32 = 4;
const MULTI_LINE_STRING: u32 = 5;
const MULTI_POLYGON: u32 = 6;
const GEOMETRY_COLLECTION: u32 = 7;

/// Append the WKB form of `geometry` to `buf`.
///
/// `Line`, `Rect` and `Triangle` are written as their line string or
/// polygon equivalents.
pub(super) fn encode(buf: &mut Vec<u8>, geometry: &Geometry<f64>) {
    match geometry {
        Geometry::Point(point) => {
            header(buf, POINT);
            coord(buf, point.0);
        }
        Geometry::Line(line) => {
            header(buf, LINE_STRING);
            count(buf, 2);
            coord(buf, line.start);
            coord(buf, line.end);
        }
        Geometry::LineString(line) => line_string(buf, line),
        Geometry::Polygon(polygon) => self::polygon(buf, polygon),
        Geometry::MultiPoint(multi) => {
            header(buf, MULTI_POINT);
            count(buf, multi.0.len());
            for point in &multi.0 {
                header(buf, POINT);
                coord(buf, point.0);
            }
        }
        Geometry::MultiLineString(multi) => {
            header(buf, MULTI_LINE_STRING);
            count(buf, multi.0.len());
            for line in &multi.0 {
                line_string(buf, line);
            }
        }
        Geometry::MultiPolygon(multi) => {
            header(buf, MULTI_POLYGON);
            count(buf, multi.0.len());
            for polygon in &multi.0 {
                self::polygon(buf, polygon);
            }
        }
        Geometry::GeometryCollection(collection) => {
            header(buf, GEOMETRY_COLLECTION);
            count(buf, collection.0.len());
            for member in &collection.0 {
                encode(buf, member);
            }
        }
        Geometry::Rect(rect) => self::polygon(buf, &rect.to_polygon()),
        Geometry::Triangle(triangle) => self::polygon(buf, &triangle.to_polygon()),
    }
}

fn header(buf: &mut Vec<u8>, kind: u32) {
    buf.push(1);
    buf.extend_from_slice(&kind.to_le_bytes());
}

fn count(buf: &mut Vec<u8>, n: usize) {
    let n = u32::try_from(n).unwrap_or(u32::MAX);
    buf.extend_from_slice(&n.to_le_bytes());
}

fn coord(buf: &mut Vec<u8>, c: Coord<f64>) {
    buf.extend_from_slice(&c.x.to_le_bytes());
    buf.extend_from_slice(&c.y.to_le_bytes());
}

fn ring(buf: &mut Vec<u8>, line: &LineString<f64>) {
    count(buf, line.0.len());
    for c in &line.0 {
        coord(buf, *c);
    }
}

fn line_string(buf: &mut Vec<u8>, line: &LineString<f64>) {
    header(buf, LINE_STRING);
    ring(buf, line);
}

fn polygon(buf: &mut Vec<u8>, polygon: &Polygon<f64>) {
    header(buf, POLYGON);
    count(buf, 1 + polygon.interiors().len());
    ring(buf, polygon.exterior());
    for interior in polygon.interiors() {
        ring(buf, interior);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{MultiPoint, Point, polygon};

    #[test]
    fn encodes_points() {
        let mut buf = Vec::new();
        encode(&mut buf, &Geometry::Point(Point::new(1.0, 2.0)));

        assert_eq!(buf.len(), 21);
        assert_eq!(&buf[..5], &[1, 1, 0, 0, 0]);
        assert_eq!(&buf[5..13], &1.0_f64.to_le_bytes());
        assert_eq!(&buf[13..], &2.0_f64.to_le_bytes());
    }

    #[test]
    fn encodes_polygon_ring_counts() {
        let mut buf = Vec::new();
        encode(
            &mut buf,
            &Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]),
        );

        // header, ring count, point count, four closed-ring coordinates
        assert_eq!(buf.len(), 5 + 4 + 4 + 4 * 16);
        assert_eq!(&buf[5..9], &1_u32.to_le_bytes());
        assert_eq!(&buf[9..13], &4_u32.to_le_bytes());
    }

    #[test]
    fn multipoints_nest_point_records() {
        let mut buf = Vec::new();
        encode(
            &mut buf,
            &Geometry::MultiPoint(MultiPoint::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)])),
        );

        assert_eq!(buf.len(), 9 + 2 * 21);
        assert_eq!(&buf[1..5], &4_u32.to_le_bytes());
    }
}
