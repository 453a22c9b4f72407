//! Overpass QL generation.

use geo::{Geometry, LineString, Polygon};
use osmlayers_core::{GeometryKind, QueryError, TagCondition, TagFilter, TagMatch};

/// Compile `filter` into a query restricted to `area`.
///
/// Each clause is issued once per exterior ring as an `nwr` statement and the
/// union is printed with full geometry. Holes are not expressible in a
/// `poly:` filter; results are clipped to the exact area afterwards.
pub(super) fn build_query(
    area: &Geometry<f64>,
    filter: &TagFilter,
    server_timeout_secs: u32,
) -> Result<String, QueryError> {
    let polygons = query_polygons(area)?;
    let mut query = format!("[out:json][timeout:{server_timeout_secs}];\n(\n");
    for polygon in &polygons {
        let poly = poly_filter(polygon.exterior());
        for clause in filter.clauses {
            query.push_str("  nwr");
            for condition in clause.conditions {
                query.push_str(&condition_filter(condition));
            }
            query.push_str(&format!("(poly:\"{poly}\");\n"));
        }
    }
    query.push_str(");\nout geom;\n");
    Ok(query)
}

fn query_polygons(area: &Geometry<f64>) -> Result<Vec<Polygon<f64>>, QueryError> {
    match area {
        Geometry::Polygon(polygon) => Ok(vec![polygon.clone()]),
        Geometry::MultiPolygon(multi) => Ok(multi.0.clone()),
        other => Err(QueryError::UnsupportedArea {
            kind: GeometryKind::of(other),
        }),
    }
}

/// `lat lon` pairs separated by spaces, as `poly:` expects.
fn poly_filter(ring: &LineString<f64>) -> String {
    let mut coords = ring.0.as_slice();
    if ring.is_closed() && coords.len() > 1 {
        coords = &coords[..coords.len() - 1];
    }
    coords
        .iter()
        .map(|coord| format!("{} {}", coord.y, coord.x))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The `[...]` tag filter for one condition.
fn condition_filter(condition: &TagCondition) -> String {
    let key = escape_string(condition.key);
    match condition.matcher {
        TagMatch::Any => format!("[\"{key}\"]"),
        TagMatch::Equals(value) => format!("[\"{key}\"=\"{}\"]", escape_string(value)),
        TagMatch::OneOf(values) => format!("[\"{key}\"~\"{}\"]", value_pattern(values)),
        TagMatch::NoneOf(values) => format!("[\"{key}\"!~\"{}\"]", value_pattern(values)),
    }
}

fn value_pattern(values: &[&str]) -> String {
    let alternatives: Vec<String> = values
        .iter()
        .map(|value| escape_string(&escape_regex(value)))
        .collect();
    format!("^({})$", alternatives.join("|"))
}

fn escape_regex(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(
            ch,
            '.' | '^' | '$' | '|' | '(' | ')' | '[' | ']' | '{' | '}' | '*' | '+' | '?' | '\\'
        ) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn escape_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{MultiPolygon, Point, polygon};
    use osmlayers_core::{TagClause, find_layer};
    use rstest::rstest;

    fn square() -> Polygon<f64> {
        polygon![(x: 36.0, y: -1.0), (x: 37.0, y: -1.0), (x: 37.0, y: 0.0), (x: 36.0, y: 0.0)]
    }

    #[rstest]
    fn compiles_bank_layer() {
        let bank = find_layer("bank").expect("bank layer");
        let query = build_query(&Geometry::Polygon(square()), &bank.filter, 180)
            .expect("query builds");
        assert_eq!(
            query,
            "[out:json][timeout:180];\n(\n  nwr[\"amenity\"=\"bank\"]\
             (poly:\"-1 36 -1 37 0 37 0 36\");\n);\nout geom;\n"
        );
    }

    #[rstest]
    fn value_lists_become_anchored_regexes() {
        static FILTER: TagFilter = TagFilter::new(&[TagClause::new(&[
            TagCondition::one_of("highway", &["primary", "primary_link"]),
            TagCondition::none_of("service", &["driveway"]),
            TagCondition::any("name"),
        ])]);
        let query =
            build_query(&Geometry::Polygon(square()), &FILTER, 60).expect("query builds");
        assert!(query.contains(
            "nwr[\"highway\"~\"^(primary|primary_link)$\"][\"service\"!~\"^(driveway)$\"][\"name\"]"
        ));
    }

    #[rstest]
    fn emits_each_clause_per_polygon() {
        static FILTER: TagFilter = TagFilter::new(&[
            TagClause::new(&[TagCondition::equals("amenity", "atm")]),
            TagClause::new(&[TagCondition::equals("atm", "yes")]),
        ]);
        let other = polygon![(x: 40.0, y: 1.0), (x: 41.0, y: 1.0), (x: 41.0, y: 2.0)];
        let area = Geometry::MultiPolygon(MultiPolygon::new(vec![square(), other]));

        let query = build_query(&area, &FILTER, 60).expect("query builds");

        assert_eq!(query.matches("nwr").count(), 4);
    }

    #[rstest]
    fn rejects_non_areal_areas() {
        let err = build_query(
            &Geometry::Point(Point::new(0.0, 0.0)),
            &find_layer("bank").expect("bank layer").filter,
            60,
        )
        .expect_err("points are not areas");
        assert_eq!(
            err,
            QueryError::UnsupportedArea {
                kind: GeometryKind::Point
            }
        );
    }

    #[rstest]
    #[case(TagCondition::any("name"), "[\"name\"]")]
    #[case(TagCondition::equals("amenity", "bank"), "[\"amenity\"=\"bank\"]")]
    #[case(TagCondition::one_of("ford", &["yes", "stepping_stones"]), "[\"ford\"~\"^(yes|stepping_stones)$\"]")]
    #[case(TagCondition::none_of("access", &["private"]), "[\"access\"!~\"^(private)$\"]")]
    fn renders_one_filter_per_condition(#[case] condition: TagCondition, #[case] expected: &str) {
        assert_eq!(condition_filter(&condition), expected);
    }

    #[rstest]
    #[case("a.b", "a\\\\.b")]
    #[case("say \"hi\"", "say \\\"hi\\\"")]
    fn escapes_special_characters(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(escape_string(&escape_regex(raw)), expected);
    }
}
