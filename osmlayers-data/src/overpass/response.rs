//! Overpass JSON response types for `out geom` output.
//!
//! See: <https://wiki.openstreetmap.org/wiki/Overpass_API/Output_Formats#JSON>

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level Overpass answer.
#[derive(Debug, Deserialize)]
pub(super) struct OverpassResponse {
    /// Matched elements.
    #[serde(default)]
    pub elements: Vec<Element>,
    /// Server remark, present when evaluation was aborted.
    #[serde(default)]
    pub remark: Option<String>,
}

impl OverpassResponse {
    /// The remark when it signals a failed evaluation.
    pub fn error_remark(&self) -> Option<&str> {
        self.remark
            .as_deref()
            .filter(|remark| remark.contains("error"))
    }
}

/// One OSM element.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(super) enum Element {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Way {
        id: i64,
        #[serde(default)]
        geometry: Vec<Option<LatLon>>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Relation {
        id: i64,
        #[serde(default)]
        members: Vec<Member>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
}

/// A coordinate pair; `null` entries mark nodes outside the server's view.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub(super) struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// A relation member with inlined geometry.
#[derive(Debug, Deserialize)]
pub(super) struct Member {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub geometry: Vec<Option<LatLon>>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}
