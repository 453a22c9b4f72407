//! Assemble Overpass elements into features.

use std::collections::BTreeMap;

use geo::{
    Contains, Coord, Geometry, Intersects, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use osmlayers_core::{AttributeValue, Crs, Feature, FeatureTable};

use super::response::{Element, LatLon, Member};

/// Keys whose closed ways describe areas unless tagged `area=no`.
const AREA_KEYS: &[&str] = &[
    "aeroway",
    "amenity",
    "boundary",
    "building",
    "harbour",
    "healthcare",
    "historic",
    "landuse",
    "leisure",
    "man_made",
    "military",
    "natural",
    "office",
    "place",
    "shop",
    "tourism",
    "water",
];

/// `waterway` values whose closed ways are areas.
const AREA_WATERWAYS: &[&str] = &["riverbank", "dock", "boatyard", "dam"];

/// Convert elements to a WGS84 table, keeping those that touch `area`.
///
/// Every feature carries its tags plus `osmid` and `element_type`.
pub(super) fn elements_to_table(elements: Vec<Element>, area: &Geometry<f64>) -> FeatureTable {
    let mut table = FeatureTable::new(Crs::WGS84);
    for element in elements {
        let Some(feature) = element_to_feature(element) else {
            continue;
        };
        if feature.geometry.intersects(area) {
            table.push(feature);
        }
    }
    table
}

fn element_to_feature(element: Element) -> Option<Feature> {
    let (id, element_type, geometry, tags) = match element {
        Element::Node { id, lat, lon, tags } => {
            (id, "node", Some(Geometry::Point(Point::new(lon, lat))), tags)
        }
        Element::Way { id, geometry, tags } => {
            let geometry = way_geometry(coords(&geometry), &tags);
            (id, "way", geometry, tags)
        }
        Element::Relation { id, members, tags } => {
            let geometry = relation_geometry(&members, &tags);
            (id, "relation", geometry, tags)
        }
    };
    let mut feature = Feature::new(geometry?)
        .with_attribute("osmid", id)
        .with_attribute("element_type", element_type);
    for (key, value) in tags {
        feature.attributes.insert(key, AttributeValue::Text(value));
    }
    Some(feature)
}

fn coords(points: &[Option<LatLon>]) -> Vec<Coord<f64>> {
    points
        .iter()
        .flatten()
        .map(|point| Coord {
            x: point.lon,
            y: point.lat,
        })
        .collect()
}

fn way_geometry(coords: Vec<Coord<f64>>, tags: &BTreeMap<String, String>) -> Option<Geometry<f64>> {
    if coords.len() < 2 {
        return None;
    }
    let line = LineString::new(coords);
    if line.is_closed() && line.0.len() >= 4 && is_area(tags) {
        Some(Geometry::Polygon(Polygon::new(line, Vec::new())))
    } else {
        Some(Geometry::LineString(line))
    }
}

fn is_area(tags: &BTreeMap<String, String>) -> bool {
    match tags.get("area").map(String::as_str) {
        Some("yes") => return true,
        Some("no") => return false,
        _ => {}
    }
    if tags
        .get("waterway")
        .is_some_and(|value| AREA_WATERWAYS.contains(&value.as_str()))
    {
        return true;
    }
    AREA_KEYS.iter().any(|key| tags.contains_key(*key))
}

fn relation_geometry(
    members: &[Member],
    tags: &BTreeMap<String, String>,
) -> Option<Geometry<f64>> {
    let is_multipolygon = matches!(
        tags.get("type").map(String::as_str),
        Some("multipolygon" | "boundary")
    );
    if is_multipolygon && let Some(polygons) = assemble_multipolygon(members) {
        return Some(Geometry::MultiPolygon(polygons));
    }

    let lines: Vec<LineString<f64>> = members
        .iter()
        .filter(|member| member.kind == "way")
        .map(|member| coords(&member.geometry))
        .filter(|coords| coords.len() >= 2)
        .map(LineString::new)
        .collect();
    if !lines.is_empty() {
        return Some(Geometry::MultiLineString(MultiLineString::new(lines)));
    }

    let points: Vec<Point<f64>> = members
        .iter()
        .filter(|member| member.kind == "node")
        .filter_map(|member| Some(Point::new(member.lon?, member.lat?)))
        .collect();
    (!points.is_empty()).then(|| Geometry::MultiPoint(MultiPoint::new(points)))
}

fn assemble_multipolygon(members: &[Member]) -> Option<MultiPolygon<f64>> {
    let segments = |role: &str| -> Vec<Vec<Coord<f64>>> {
        members
            .iter()
            .filter(|member| member.kind == "way" && member.role == role)
            .map(|member| coords(&member.geometry))
            .filter(|coords| coords.len() >= 2)
            .collect()
    };
    let outers = close_rings(segments("outer"));
    if outers.is_empty() {
        return None;
    }
    let mut inners = close_rings(segments("inner"));

    let mut polygons = Vec::with_capacity(outers.len());
    for outer in outers {
        let shell = Polygon::new(outer.clone(), Vec::new());
        let (holes, rest): (Vec<_>, Vec<_>) = inners
            .into_iter()
            .partition(|inner| inner.0.first().is_some_and(|start| shell.contains(start)));
        inners = rest;
        polygons.push(Polygon::new(outer, holes));
    }
    Some(MultiPolygon::new(polygons))
}

/// Join way segments end to end into closed rings, discarding leftovers
/// that cannot be closed.
fn close_rings(mut segments: Vec<Vec<Coord<f64>>>) -> Vec<LineString<f64>> {
    let mut rings = Vec::new();
    while let Some(mut ring) = segments.pop() {
        loop {
            let (Some(&start), Some(&end)) = (ring.first(), ring.last()) else {
                break;
            };
            if ring.len() >= 4 && start == end {
                rings.push(LineString::new(ring));
                break;
            }
            let Some(index) = segments.iter().position(|segment| {
                segment.first() == Some(&end) || segment.last() == Some(&end)
            }) else {
                break;
            };
            let mut next = segments.swap_remove(index);
            if next.first() != Some(&end) {
                next.reverse();
            }
            ring.extend(next.into_iter().skip(1));
        }
    }
    rings
}
