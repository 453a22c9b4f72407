//! The static catalog of thematic layers.
//!
//! Each [`LayerConfig`] is plain data: adding a layer means adding an entry to
//! [`CATALOG`], not writing code.

use std::path::{Path, PathBuf};

use crate::reduce::ReductionMode;
use crate::table::{AttributeValue, Feature};
use crate::tags::{TagClause, TagCondition, TagFilter};
use crate::writer::OutputFormat;

/// Name of the classification column.
pub const FCLASS_COLUMN: &str = "fclass";

/// Attributes most layers carry.
const NAMES: &[&str] = &["name", "name:en", "name_en"];

/// Where a layer's `fclass` value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FclassSource {
    /// The layer has no `fclass` column.
    None,
    /// Every feature gets the same value.
    Literal(&'static str),
    /// The value of a tag, or `fallback` when the tag is missing.
    Tag {
        /// Tag key to read.
        key: &'static str,
        /// Value for features without the tag.
        fallback: Option<&'static str>,
    },
    /// `class` when `key=value`, otherwise the value of `otherwise`.
    Override {
        /// Tag key to test.
        key: &'static str,
        /// Value that triggers the override.
        value: &'static str,
        /// Class assigned on a match.
        class: &'static str,
        /// Tag key read when the override does not apply.
        otherwise: &'static str,
    },
}

impl FclassSource {
    /// Return `true` when the layer writes an `fclass` column.
    pub const fn is_present(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Classify one feature; `None` when the layer has no `fclass` column.
    pub fn classify(self, feature: &Feature) -> Option<AttributeValue> {
        let class = match self {
            Self::None => return None,
            Self::Literal(class) => Some(class),
            Self::Tag { key, fallback } => feature.tag(key).or(fallback),
            Self::Override {
                key,
                value,
                class,
                otherwise,
            } => {
                if feature.tag(key) == Some(value) {
                    Some(class)
                } else {
                    feature.tag(otherwise)
                }
            }
        };
        Some(class.map_or(AttributeValue::Null, AttributeValue::text))
    }
}

/// Components of a layer's output file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputName {
    /// Thematic directory, such as `208_cash`.
    pub category_code: &'static str,
    /// Category token, such as `cash`.
    pub category: &'static str,
    /// Subtype token including the geometry suffix, such as `bnk_pt`.
    pub subtype: &'static str,
    /// Processing stage, such as `s0`.
    pub stage: &'static str,
    /// Layer token, such as `bank`.
    pub layer: &'static str,
    /// File format.
    pub format: OutputFormat,
}

impl OutputName {
    /// The file name for a country.
    pub fn file_name(&self, country_code: &str) -> String {
        format!(
            "{country_code}_{}_{}_{}_osm_pp_{}.{}",
            self.category,
            self.subtype,
            self.stage,
            self.layer,
            self.format.extension()
        )
    }

    /// `{root}/{country}/{category_code}/{file_name}`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use osmlayers_core::find_layer;
    ///
    /// let bank = find_layer("bank").expect("bank is catalogued");
    /// assert_eq!(
    ///     bank.output.path(Path::new("/out"), "xyz"),
    ///     Path::new("/out/xyz/208_cash/xyz_cash_bnk_pt_s0_osm_pp_bank.shp"),
    /// );
    /// ```
    pub fn path(&self, root: &Path, country_code: &str) -> PathBuf {
        root.join(country_code)
            .join(self.category_code)
            .join(self.file_name(country_code))
    }
}

/// Immutable description of one thematic layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerConfig {
    /// Identifier used in logs and on the command line.
    pub name: &'static str,
    /// Elements to select.
    pub filter: TagFilter,
    /// Geometry reduction applied to the selection.
    pub reduction: ReductionMode,
    /// Source of the `fclass` column.
    pub fclass: FclassSource,
    /// Attributes every output must carry, in output order.
    pub attributes: &'static [&'static str],
    /// Output file naming.
    pub output: OutputName,
}

impl LayerConfig {
    /// Output columns in order: `fclass` when present, then the attributes.
    pub fn output_columns(&self) -> Vec<String> {
        let fclass = self.fclass.is_present().then_some(FCLASS_COLUMN);
        fclass
            .into_iter()
            .chain(self.attributes.iter().copied())
            .map(str::to_owned)
            .collect()
    }

    /// The output file for a country under `root`.
    pub fn output_path(&self, root: &Path, country_code: &str) -> PathBuf {
        self.output.path(root, country_code)
    }
}

/// Look up a catalogued layer by name.
pub fn find_layer(name: &str) -> Option<&'static LayerConfig> {
    CATALOG.iter().find(|layer| layer.name == name)
}

const fn output(
    category_code: &'static str,
    category: &'static str,
    subtype: &'static str,
    stage: &'static str,
    layer: &'static str,
    format: OutputFormat,
) -> OutputName {
    OutputName {
        category_code,
        category,
        subtype,
        stage,
        layer,
        format,
    }
}

/// Every layer extracted for a boundary, in processing order.
pub static CATALOG: [LayerConfig; 19] = [
    LayerConfig {
        name: "roads",
        filter: TagFilter::new(&[TagClause::new(&[TagCondition::one_of(
            "highway",
            &[
                "motorway",
                "trunk",
                "primary",
                "secondary",
                "tertiary",
                "unclassified",
                "residential",
                "motorway_link",
                "trunk_link",
                "primary_link",
                "secondary_link",
                "tertiary_link",
                "living_street",
                "service",
                "track",
                "road",
            ],
        )])]),
        reduction: ReductionMode::Lines,
        fclass: FclassSource::Tag {
            key: "highway",
            fallback: None,
        },
        attributes: &[
            "osmid", "name", "oneway", "maxspeed", "bridge", "tunnel", "surface",
        ],
        output: output("232_tran", "tran", "rds_ln", "s0", "roads", OutputFormat::Shapefile),
    },
    LayerConfig {
        name: "railways",
        filter: TagFilter::new(&[TagClause::new(&[TagCondition::one_of(
            "railway",
            &["rail", "narrow_gauge", "subway"],
        )])]),
        reduction: ReductionMode::Lines,
        fclass: FclassSource::Tag {
            key: "railway",
            fallback: None,
        },
        attributes: &["name", "name_en", "name:en", "gauge"],
        output: output("232_tran", "tran", "rrd_ln", "s0", "railways", OutputFormat::Shapefile),
    },
    LayerConfig {
        name: "dam",
        filter: TagFilter::new(&[TagClause::new(&[TagCondition::equals("waterway", "dam")])]),
        reduction: ReductionMode::Centroid,
        fclass: FclassSource::Literal("dam"),
        attributes: NAMES,
        output: output("221_phys", "phys", "dam_pt", "s2", "dam", OutputFormat::GeoPackage),
    },
    LayerConfig {
        name: "schools",
        filter: TagFilter::new(&[TagClause::new(&[TagCondition::equals("amenity", "school")])]),
        reduction: ReductionMode::Centroid,
        fclass: FclassSource::Literal("school"),
        attributes: &[
            "operator",
            "operator:type",
            "operator_type",
            "capacity",
            "grades",
            "min_age",
            "max_age",
            "school:gender",
            "name",
            "name:en",
            "name_en",
            "osmid",
        ],
        output: output("210_educ", "educ", "edu_pt", "s3", "schools", OutputFormat::GeoPackage),
    },
    LayerConfig {
        name: "university",
        filter: TagFilter::new(&[TagClause::new(&[TagCondition::one_of(
            "amenity",
            &["university", "college"],
        )])]),
        reduction: ReductionMode::Centroid,
        fclass: FclassSource::Tag {
            key: "amenity",
            fallback: None,
        },
        attributes: NAMES,
        output: output("210_educ", "educ", "edu_pt", "s3", "university", OutputFormat::GeoPackage),
    },
    LayerConfig {
        name: "ferry_terminal",
        filter: TagFilter::new(&[TagClause::new(&[TagCondition::equals(
            "amenity",
            "ferry_terminal",
        )])]),
        reduction: ReductionMode::Centroid,
        fclass: FclassSource::None,
        attributes: NAMES,
        output: output("232_tran", "tran", "fte_pt", "s2", "ferryterminal", OutputFormat::GeoPackage),
    },
    LayerConfig {
        name: "ferry_route",
        filter: TagFilter::new(&[TagClause::new(&[TagCondition::equals("route", "ferry")])]),
        reduction: ReductionMode::Lines,
        fclass: FclassSource::None,
        attributes: NAMES,
        output: output("232_tran", "tran", "fer_ln", "s2", "ferryroute", OutputFormat::GeoPackage),
    },
    LayerConfig {
        name: "port",
        filter: TagFilter::new(&[
            TagClause::new(&[TagCondition::one_of(
                "landuse",
                &["harbour", "industrial", "port"],
            )]),
            TagClause::new(&[TagCondition::equals("harbour", "port")]),
        ]),
        reduction: ReductionMode::Centroid,
        fclass: FclassSource::Tag {
            key: "landuse",
            fallback: Some("port"),
        },
        attributes: NAMES,
        output: output("232_tran", "tran", "por_pt", "s0", "port", OutputFormat::Shapefile),
    },
    LayerConfig {
        name: "bank",
        filter: TagFilter::new(&[TagClause::new(&[TagCondition::equals("amenity", "bank")])]),
        reduction: ReductionMode::Centroid,
        fclass: FclassSource::Tag {
            key: "amenity",
            fallback: None,
        },
        attributes: NAMES,
        output: output("208_cash", "cash", "bnk_pt", "s0", "bank", OutputFormat::Shapefile),
    },
    LayerConfig {
        name: "atm",
        filter: TagFilter::new(&[
            TagClause::new(&[TagCondition::equals("amenity", "atm")]),
            TagClause::new(&[
                TagCondition::equals("amenity", "bank"),
                TagCondition::equals("atm", "yes"),
            ]),
        ]),
        reduction: ReductionMode::Centroid,
        fclass: FclassSource::Tag {
            key: "amenity",
            fallback: None,
        },
        attributes: &["name", "name:en", "name_en", "osmid"],
        output: output("208_cash", "cash", "atm_pt", "s3", "atm", OutputFormat::Shapefile),
    },
    LayerConfig {
        name: "health",
        filter: TagFilter::new(&[TagClause::new(&[TagCondition::one_of(
            "amenity",
            &["clinic", "doctors", "hospital", "pharmacy", "health_post"],
        )])]),
        reduction: ReductionMode::CentroidIfNotPoint,
        fclass: FclassSource::Tag {
            key: "amenity",
            fallback: Some("health_facility"),
        },
        attributes: NAMES,
        output: output(
            "215_heal",
            "heal",
            "hea_pt",
            "s3",
            "healthfacilities",
            OutputFormat::Shapefile,
        ),
    },
    LayerConfig {
        name: "hospital",
        filter: TagFilter::new(&[TagClause::new(&[TagCondition::equals("amenity", "hospital")])]),
        reduction: ReductionMode::CentroidIfNotPoint,
        fclass: FclassSource::None,
        attributes: &[
            "osmid",
            "name",
            "name:en",
            "name_en",
            "emergency",
            "operator",
            "operator:type",
            "beds",
            "operator_type",
            "operator_ty",
        ],
        output: output("215_heal", "heal", "hea_pt", "s3", "hospital", OutputFormat::Shapefile),
    },
    LayerConfig {
        name: "border_crossing",
        filter: TagFilter::new(&[TagClause::new(&[TagCondition::equals(
            "border",
            "border_control",
        )])]),
        reduction: ReductionMode::CentroidIfNotPoint,
        fclass: FclassSource::Literal("border_control"),
        attributes: NAMES,
        output: output(
            "222_pois",
            "pois",
            "bor_pt",
            "s3",
            "bordercrossing",
            OutputFormat::Shapefile,
        ),
    },
    LayerConfig {
        name: "settlements",
        filter: TagFilter::new(&[
            TagClause::new(&[TagCondition::one_of(
                "place",
                &["city", "borough", "town", "village", "hamlet"],
            )]),
            TagClause::new(&[TagCondition::any("capital")]),
        ]),
        reduction: ReductionMode::CentroidIfNotPoint,
        fclass: FclassSource::Override {
            key: "capital",
            value: "yes",
            class: "national_capital",
            otherwise: "place",
        },
        attributes: NAMES,
        output: output("229_stle", "stle", "stl_pt", "s3", "settlements", OutputFormat::Shapefile),
    },
    LayerConfig {
        name: "lakes",
        filter: TagFilter::new(&[TagClause::new(&[TagCondition::one_of(
            "water",
            &["lake", "reservoir"],
        )])]),
        reduction: ReductionMode::Polygons,
        fclass: FclassSource::Tag {
            key: "water",
            fallback: None,
        },
        attributes: NAMES,
        output: output("221_phys", "phys", "lak_py", "s3", "lake", OutputFormat::Shapefile),
    },
    LayerConfig {
        name: "large_rivers",
        filter: TagFilter::new(&[TagClause::new(&[TagCondition::equals("water", "river")])]),
        reduction: ReductionMode::Polygons,
        fclass: FclassSource::Tag {
            key: "water",
            fallback: None,
        },
        attributes: NAMES,
        output: output("221_phys", "phys", "riv_py", "s3", "rivers", OutputFormat::Shapefile),
    },
    LayerConfig {
        name: "rivers",
        filter: TagFilter::new(&[TagClause::new(&[TagCondition::equals("waterway", "river")])]),
        reduction: ReductionMode::Lines,
        fclass: FclassSource::Literal("river"),
        attributes: NAMES,
        output: output("221_phys", "phys", "riv_ln", "s3", "rivers", OutputFormat::Shapefile),
    },
    LayerConfig {
        name: "canal",
        filter: TagFilter::new(&[TagClause::new(&[TagCondition::equals("waterway", "canal")])]),
        reduction: ReductionMode::Lines,
        fclass: FclassSource::None,
        attributes: NAMES,
        output: output("232_tran", "phys", "can_ln", "s3", "canal", OutputFormat::Shapefile),
    },
    LayerConfig {
        name: "railway_station",
        filter: TagFilter::new(&[TagClause::new(&[TagCondition::one_of(
            "railway",
            &["station", "halt"],
        )])]),
        reduction: ReductionMode::Centroid,
        fclass: FclassSource::Tag {
            key: "railway",
            fallback: None,
        },
        attributes: &[
            "name",
            "name:en",
            "name_en",
            "amenity",
            "passenger",
            "cargo",
        ],
        output: output(
            "232_tran",
            "tran",
            "rst_pt",
            "s2",
            "railwaystation",
            OutputFormat::Shapefile,
        ),
    },
];
