//! Feature tables: the in-memory result of a tag query.
//!
//! A [`FeatureTable`] is an ordered sequence of [`Feature`] records, each with
//! a geometry and a map of attribute values. The table tracks its column list
//! explicitly so a column can exist even when no feature carries a value for
//! it, which is how the schema reconciler synthesizes null columns.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use geo::Geometry;

use crate::columns::ColumnMapping;
use crate::crs::Crs;

static NULL: AttributeValue = AttributeValue::Null;

/// How a null element reads inside a flattened list.
const NULL_LIST_ITEM: &str = "None";

/// A single attribute value attached to a feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// No value recorded.
    Null,
    /// A textual value, the common case for OSM tags.
    Text(String),
    /// An integer value such as an OSM element identifier.
    Integer(i64),
    /// Several values collected under a single key.
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Build a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Return `true` when the value is [`AttributeValue::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the inner string of a [`AttributeValue::Text`] value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Collapse a list into a single comma-separated text value.
    ///
    /// Null elements read as `None`. Scalars are returned unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use osmlayers_core::AttributeValue;
    ///
    /// let list = AttributeValue::List(vec![
    ///     AttributeValue::text("primary"),
    ///     AttributeValue::Integer(3),
    /// ]);
    /// assert_eq!(list.flatten(), AttributeValue::text("primary, 3"));
    /// ```
    #[must_use]
    pub fn flatten(self) -> Self {
        match self {
            Self::List(items) => Self::Text(join_list(&items)),
            other => other,
        }
    }

    /// Render the value as text for a file writer; nulls become `None`.
    pub fn to_cell(&self) -> Option<String> {
        match self {
            Self::Null => None,
            other => Some(other.to_string()),
        }
    }
}

fn join_list(items: &[AttributeValue]) -> String {
    items
        .iter()
        .map(|item| match item {
            AttributeValue::Null => NULL_LIST_ITEM.to_owned(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(value) => f.write_str(value),
            Self::Integer(value) => write!(f, "{value}"),
            Self::List(items) => f.write_str(&join_list(items)),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// Geometry variant tags used for filtering, validation and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GeometryKind {
    /// A single position.
    Point,
    /// Several positions.
    MultiPoint,
    /// A single two-point segment.
    Line,
    /// An open or closed chain of positions.
    LineString,
    /// Several line strings.
    MultiLineString,
    /// An area with optional holes.
    Polygon,
    /// Several areas.
    MultiPolygon,
    /// An axis-aligned rectangle.
    Rect,
    /// A three-vertex area.
    Triangle,
    /// A heterogeneous collection.
    GeometryCollection,
}

impl GeometryKind {
    /// Classify a geometry.
    pub const fn of(geometry: &Geometry<f64>) -> Self {
        match geometry {
            Geometry::Point(_) => Self::Point,
            Geometry::MultiPoint(_) => Self::MultiPoint,
            Geometry::Line(_) => Self::Line,
            Geometry::LineString(_) => Self::LineString,
            Geometry::MultiLineString(_) => Self::MultiLineString,
            Geometry::Polygon(_) => Self::Polygon,
            Geometry::MultiPolygon(_) => Self::MultiPolygon,
            Geometry::Rect(_) => Self::Rect,
            Geometry::Triangle(_) => Self::Triangle,
            Geometry::GeometryCollection(_) => Self::GeometryCollection,
        }
    }

    /// Return `true` for the two areal kinds a boundary may take.
    pub const fn is_areal(self) -> bool {
        matches!(self, Self::Polygon | Self::MultiPolygon)
    }

    /// The OGC name of the kind.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::MultiPoint => "MultiPoint",
            Self::Line => "Line",
            Self::LineString => "LineString",
            Self::MultiLineString => "MultiLineString",
            Self::Polygon => "Polygon",
            Self::MultiPolygon => "MultiPolygon",
            Self::Rect => "Rect",
            Self::Triangle => "Triangle",
            Self::GeometryCollection => "GeometryCollection",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One record of a feature table.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature geometry in the owning table's CRS.
    pub geometry: Geometry<f64>,
    /// Attribute values keyed by column name.
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Feature {
    /// Create a feature without attributes.
    pub const fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    /// Attach an attribute, replacing any previous value for `key`.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// The value stored under `column`, or [`AttributeValue::Null`].
    pub fn value(&self, column: &str) -> &AttributeValue {
        self.attributes.get(column).unwrap_or(&NULL)
    }

    /// The text stored under `key`, if it holds a non-empty text value.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.value(key).as_str().filter(|value| !value.is_empty())
    }

    /// The geometry variant of this feature.
    pub const fn kind(&self) -> GeometryKind {
        GeometryKind::of(&self.geometry)
    }
}

/// An ordered collection of features sharing one CRS and column list.
///
/// # Examples
///
/// ```
/// use geo::{Geometry, Point};
/// use osmlayers_core::{Crs, Feature, FeatureTable};
///
/// let mut table = FeatureTable::new(Crs::WGS84);
/// table.push(Feature::new(Geometry::Point(Point::new(1.0, 2.0))).with_attribute("name", "Bank"));
/// assert_eq!(table.columns(), ["name"]);
/// assert_eq!(table.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    crs: Crs,
    columns: Vec<String>,
    column_index: HashSet<String>,
    features: Vec<Feature>,
}

impl FeatureTable {
    /// Create an empty table in `crs`.
    pub fn new(crs: Crs) -> Self {
        Self {
            crs,
            columns: Vec::new(),
            column_index: HashSet::new(),
            features: Vec::new(),
        }
    }

    /// Build a table from features, discovering columns in first-seen order.
    pub fn from_features<I>(crs: Crs, features: I) -> Self
    where
        I: IntoIterator<Item = Feature>,
    {
        let mut table = Self::new(crs);
        for feature in features {
            table.push(feature);
        }
        table
    }

    /// Append a feature, registering any attribute keys not yet seen.
    pub fn push(&mut self, feature: Feature) {
        for key in feature.attributes.keys() {
            self.register_column(key);
        }
        self.features.push(feature);
    }

    /// Register a column; features without a value read it as null.
    pub fn add_column(&mut self, name: &str) {
        self.register_column(name);
    }

    fn register_column(&mut self, name: &str) {
        if !self.column_index.contains(name) {
            self.column_index.insert(name.to_owned());
            self.columns.push(name.to_owned());
        }
    }

    fn rebuild_column_index(&mut self) {
        self.column_index = self.columns.iter().cloned().collect();
    }

    /// The coordinate reference system of every geometry in the table.
    pub const fn crs(&self) -> Crs {
        self.crs
    }

    /// Relabel the table's CRS after its coordinates have been transformed.
    #[must_use]
    pub const fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    /// Column names in table order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Return `true` when `name` is a registered column.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index.contains(name)
    }

    /// The features in table order.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Mutable access to the features; columns are not updated.
    pub fn features_mut(&mut self) -> &mut [Feature] {
        &mut self.features
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Return `true` when the table holds no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Keep only the features for which `keep` returns `true`.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Feature) -> bool,
    {
        self.features.retain(keep);
    }

    /// Replace every geometry, dropping features whose replacement is `None`.
    #[must_use]
    pub fn filter_map_geometries<F>(mut self, mut map: F) -> Self
    where
        F: FnMut(Geometry<f64>) -> Option<Geometry<f64>>,
    {
        self.features = self
            .features
            .into_iter()
            .filter_map(|feature| {
                let Feature {
                    geometry,
                    attributes,
                } = feature;
                map(geometry).map(|geometry| Feature {
                    geometry,
                    attributes,
                })
            })
            .collect();
        self
    }

    /// Replace every geometry with a fallible mapping.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `map`.
    pub fn try_map_geometries<F, E>(mut self, mut map: F) -> Result<Self, E>
    where
        F: FnMut(Geometry<f64>) -> Result<Geometry<f64>, E>,
    {
        for feature in &mut self.features {
            let geometry = std::mem::replace(
                &mut feature.geometry,
                Geometry::GeometryCollection(geo::GeometryCollection::default()),
            );
            feature.geometry = map(geometry)?;
        }
        Ok(self)
    }

    /// Collapse list values to delimited text in every cell.
    pub fn flatten_lists(&mut self) {
        for feature in &mut self.features {
            for value in feature.attributes.values_mut() {
                if matches!(value, AttributeValue::List(_)) {
                    let list = std::mem::replace(value, AttributeValue::Null);
                    *value = list.flatten();
                }
            }
        }
    }

    /// Restrict the table to `keep`, in that order.
    ///
    /// Names in `keep` that are not registered columns are ignored.
    pub fn select_columns(&mut self, keep: &[String]) {
        let mut columns = Vec::new();
        let mut index = HashSet::new();
        for name in keep {
            if self.has_column(name) && index.insert(name.clone()) {
                columns.push(name.clone());
            }
        }
        self.columns = columns;
        self.column_index = index;
        let index = &self.column_index;
        for feature in &mut self.features {
            feature.attributes.retain(|key, _| index.contains(key));
        }
    }

    /// Rename columns and attribute keys according to `mapping`.
    ///
    /// Columns absent from the mapping keep their names.
    pub fn rename_columns(&mut self, mapping: &ColumnMapping) {
        for column in &mut self.columns {
            if let Some(renamed) = mapping.get(column) {
                renamed.clone_into(column);
            }
        }
        self.rebuild_column_index();
        for feature in &mut self.features {
            let attributes = std::mem::take(&mut feature.attributes);
            feature.attributes = attributes
                .into_iter()
                .map(|(key, value)| match mapping.get(&key) {
                    Some(renamed) => (renamed.to_owned(), value),
                    None => (key, value),
                })
                .collect();
        }
    }
}
