//! Behavioural tests running layers through the file-backed adapters.

use geo::{Geometry, LineString, Point};
use osmlayers_core::test_support::FixtureQuery;
use osmlayers_core::{
    BoundaryRun, Feature, LayerExtractor, LayerOutcome, Orchestrator, SequentialDispatch,
    find_layer,
};
use osmlayers_data::{FileVectorWriter, GeoJsonBoundarySource, Proj4Transform};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use rusqlite::Connection;
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const KENYA: &str = r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},
    "geometry":{"type":"Polygon","coordinates":[[[36.0,-2.0],[38.0,-2.0],[38.0,0.0],[36.0,0.0],[36.0,-2.0]]]}}]}"#;

struct FileWorld {
    workspace: TempDir,
    boundary: RefCell<Option<PathBuf>>,
    query: RefCell<FixtureQuery>,
    runs: RefCell<Vec<BoundaryRun>>,
}

impl FileWorld {
    fn output_root(&self) -> PathBuf {
        self.workspace.path().join("out")
    }

    fn write_boundary(&self, name: &str, body: &str) {
        let path = self.workspace.path().join(name);
        fs::write(&path, body).expect("write boundary");
        *self.boundary.borrow_mut() = Some(path);
    }
}

#[fixture]
fn world() -> FileWorld {
    FileWorld {
        workspace: TempDir::new().expect("tempdir"),
        boundary: RefCell::new(None),
        query: RefCell::new(FixtureQuery::default()),
        runs: RefCell::new(Vec::new()),
    }
}

#[given("a Kenyan boundary file")]
fn kenya(#[from(world)] world: &FileWorld) {
    world.write_boundary("ken.json", KENYA);
}

#[given("a point boundary file for aaa")]
fn point_boundary(#[from(world)] world: &FileWorld) {
    world.write_boundary("aaa.json", r#"{"type":"Point","coordinates":[37.0,-1.0]}"#);
}

#[given("a query service holding one bank and one dam way")]
fn bank_and_dam(#[from(world)] world: &FileWorld) {
    *world.query.borrow_mut() = FixtureQuery::new([
        Feature::new(Geometry::Point(Point::new(36.82, -1.29)))
            .with_attribute("amenity", "bank")
            .with_attribute("name", "Harbour Bank"),
        Feature::new(Geometry::LineString(LineString::from(vec![
            (37.0, -1.0),
            (37.02, -1.0),
        ])))
        .with_attribute("waterway", "dam")
        .with_attribute("name", "Masinga"),
    ]);
}

#[when("I extract the bank and dam layers")]
fn extract(#[from(world)] world: &FileWorld) {
    let path = world.boundary.borrow().clone().expect("boundary written");
    let query = world.query.borrow();
    let extractor = LayerExtractor::new(&*query, &Proj4Transform, &FileVectorWriter);
    let dispatch = SequentialDispatch::new(extractor);
    let layers = ["bank", "dam"]
        .into_iter()
        .map(|name| find_layer(name).expect("catalogued layer"))
        .collect();
    let output_root = world.output_root();
    let orchestrator = Orchestrator::new(&GeoJsonBoundarySource, &dispatch, &output_root)
        .with_layers(layers);
    *world.runs.borrow_mut() = orchestrator.run_all([path]);
}

#[then("a bank Shapefile with a projection sidecar exists")]
fn bank_written(#[from(world)] world: &FileWorld) {
    let shp = world
        .output_root()
        .join("ken/208_cash/ken_cash_bnk_pt_s0_osm_pp_bank.shp");
    assert!(shp.exists(), "missing {}", shp.display());
    assert!(shp.with_extension("prj").exists());

    let runs = world.runs.borrow();
    let report = runs[0].result.as_ref().expect("boundary succeeds");
    assert!(matches!(
        report.outcome("bank"),
        Some(LayerOutcome::Written { features: 1, .. })
    ));
}

#[then("the dam GeoPackage holds one point near the original dam")]
fn dam_written(#[from(world)] world: &FileWorld) {
    let gpkg = world
        .output_root()
        .join("ken/221_phys/ken_phys_dam_pt_s2_osm_pp_dam.gpkg");
    let conn = Connection::open(&gpkg).expect("open geopackage");
    let (geometry_type, min_x, min_y): (String, f64, f64) = conn
        .query_row(
            "SELECT c.geometry_type_name, t.min_x, t.min_y FROM gpkg_geometry_columns c \
             JOIN gpkg_contents t USING (table_name)",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .expect("metadata row");
    assert_eq!(geometry_type, "POINT");
    assert!((min_x - 37.01).abs() < 1e-6, "centroid x {min_x}");
    assert!((min_y + 1.0).abs() < 1e-6, "centroid y {min_y}");
}

#[then("the aaa boundary is reported as failed")]
fn aaa_failed(#[from(world)] world: &FileWorld) {
    let runs = world.runs.borrow();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].result.is_err());
}

#[then("no output directory exists for aaa")]
fn no_outputs(#[from(world)] world: &FileWorld) {
    assert!(!world.output_root().join("aaa").exists());
}

#[scenario(
    path = "tests/features/file_outputs.feature",
    name = "a Kenyan bank and dam reach their output files"
)]
fn kenyan_outputs(#[from(world)] world: FileWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/file_outputs.feature",
    name = "a non-areal boundary file produces no outputs"
)]
fn point_boundary_outputs(#[from(world)] world: FileWorld) {
    let _ = world;
}
