//! Minimal OGC GeoPackage writer built on SQLite.
//!
//! One feature table is written per file, named after the file stem, with a
//! `geom` column in GeoPackage binary encoding and one `TEXT` column per
//! attribute.

use camino::Utf8Path;
use geo::{BoundingRect, Geometry, Rect};
use osmlayers_core::{FeatureTable, GeometryKind, OutputFormat, WriteError};
use rusqlite::{Connection, Transaction, params_from_iter};

use super::wkb;

/// `GPKG` as a big-endian integer.
const APPLICATION_ID: i32 = 0x4750_4B47;
/// GeoPackage 1.3.
const USER_VERSION: i32 = 10_300;

const WGS84_WKT: &str = "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,\
298.257223563,AUTHORITY[\"EPSG\",\"7030\"]],AUTHORITY[\"EPSG\",\"6326\"]],PRIMEM[\"Greenwich\",0,\
AUTHORITY[\"EPSG\",\"8901\"]],UNIT[\"degree\",0.0174532925199433,AUTHORITY[\"EPSG\",\"9122\"]],\
AUTHORITY[\"EPSG\",\"4326\"]]";

pub(super) fn write(table: &FeatureTable, path: &Utf8Path) -> Result<(), WriteError> {
    let sqlite_error = |err: rusqlite::Error| WriteError::Encode {
        path: path.as_std_path().to_path_buf(),
        message: err.to_string(),
    };
    let table_name = path.file_stem().unwrap_or("features").to_owned();
    for column in table.columns() {
        if column.eq_ignore_ascii_case("fid") || column.eq_ignore_ascii_case("geom") {
            return Err(WriteError::ColumnName {
                name: column.clone(),
                format: OutputFormat::GeoPackage,
            });
        }
    }

    osmlayers_fs::remove_file_if_exists(path).map_err(|source| WriteError::Io {
        path: path.as_std_path().to_path_buf(),
        source,
    })?;
    let mut connection = Connection::open(path.as_std_path()).map_err(sqlite_error)?;
    connection
        .pragma_update(None, "application_id", APPLICATION_ID)
        .map_err(sqlite_error)?;
    connection
        .pragma_update(None, "user_version", USER_VERSION)
        .map_err(sqlite_error)?;

    let transaction = connection.transaction().map_err(sqlite_error)?;
    create_metadata(&transaction, table).map_err(sqlite_error)?;
    create_feature_table(&transaction, &table_name, table).map_err(sqlite_error)?;
    register_contents(&transaction, &table_name, table).map_err(sqlite_error)?;
    insert_rows(&transaction, &table_name, table).map_err(sqlite_error)?;
    transaction.commit().map_err(sqlite_error)
}

fn create_metadata(transaction: &Transaction<'_>, table: &FeatureTable) -> rusqlite::Result<()> {
    transaction.execute_batch(
        "CREATE TABLE gpkg_spatial_ref_sys (
            srs_name TEXT NOT NULL,
            srs_id INTEGER PRIMARY KEY,
            organization TEXT NOT NULL,
            organization_coordsys_id INTEGER NOT NULL,
            definition TEXT NOT NULL,
            description TEXT
        );
        CREATE TABLE gpkg_contents (
            table_name TEXT NOT NULL PRIMARY KEY,
            data_type TEXT NOT NULL,
            identifier TEXT UNIQUE,
            description TEXT DEFAULT '',
            last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            min_x DOUBLE,
            min_y DOUBLE,
            max_x DOUBLE,
            max_y DOUBLE,
            srs_id INTEGER,
            CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
        );
        CREATE TABLE gpkg_geometry_columns (
            table_name TEXT NOT NULL,
            column_name TEXT NOT NULL,
            geometry_type_name TEXT NOT NULL,
            srs_id INTEGER NOT NULL,
            z TINYINT NOT NULL,
            m TINYINT NOT NULL,
            CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
            CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
            CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys (srs_id)
        );
        INSERT INTO gpkg_spatial_ref_sys VALUES
            ('Undefined cartesian SRS', -1, 'NONE', -1, 'undefined', NULL),
            ('Undefined geographic SRS', 0, 'NONE', 0, 'undefined', NULL);",
    )?;
    let epsg = table.crs().epsg();
    let definition = if table.crs() == osmlayers_core::Crs::WGS84 {
        WGS84_WKT
    } else {
        "undefined"
    };
    transaction.execute(
        "INSERT INTO gpkg_spatial_ref_sys VALUES (?1, ?2, 'EPSG', ?2, ?3, NULL)",
        (table.crs().to_string(), epsg, definition),
    )?;
    Ok(())
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn create_feature_table(
    transaction: &Transaction<'_>,
    table_name: &str,
    table: &FeatureTable,
) -> rusqlite::Result<()> {
    let mut sql = format!(
        "CREATE TABLE {} (fid INTEGER PRIMARY KEY AUTOINCREMENT, geom {}",
        quote(table_name),
        geometry_type_name(table)
    );
    for column in table.columns() {
        sql.push_str(", ");
        sql.push_str(&quote(column));
        sql.push_str(" TEXT");
    }
    sql.push(')');
    transaction.execute(&sql, [])?;
    Ok(())
}

fn register_contents(
    transaction: &Transaction<'_>,
    table_name: &str,
    table: &FeatureTable,
) -> rusqlite::Result<()> {
    let extent = extent(table);
    transaction.execute(
        "INSERT INTO gpkg_contents (table_name, data_type, identifier, min_x, min_y, max_x, max_y, srs_id)
         VALUES (?1, 'features', ?1, ?2, ?3, ?4, ?5, ?6)",
        (
            table_name,
            extent.map(|rect| rect.min().x),
            extent.map(|rect| rect.min().y),
            extent.map(|rect| rect.max().x),
            extent.map(|rect| rect.max().y),
            table.crs().epsg(),
        ),
    )?;
    transaction.execute(
        "INSERT INTO gpkg_geometry_columns VALUES (?1, 'geom', ?2, ?3, 0, 0)",
        (table_name, geometry_type_name(table), table.crs().epsg()),
    )?;
    Ok(())
}

fn insert_rows(
    transaction: &Transaction<'_>,
    table_name: &str,
    table: &FeatureTable,
) -> rusqlite::Result<()> {
    let columns: Vec<String> = std::iter::once("geom".to_owned())
        .chain(table.columns().iter().map(|column| quote(column)))
        .collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    let mut statement = transaction.prepare(&format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(table_name),
        columns.join(", "),
        placeholders.join(", ")
    ))?;
    let srs_id = i32::try_from(table.crs().epsg()).unwrap_or(-1);
    for feature in table.features() {
        let blob = rusqlite::types::Value::Blob(geometry_blob(&feature.geometry, srs_id));
        let cells = table.columns().iter().map(|column| {
            feature
                .value(column)
                .to_cell()
                .map_or(rusqlite::types::Value::Null, rusqlite::types::Value::Text)
        });
        statement.execute(params_from_iter(std::iter::once(blob).chain(cells)))?;
    }
    Ok(())
}

/// The declared geometry type: the shared kind, or `GEOMETRY` when mixed.
fn geometry_type_name(table: &FeatureTable) -> String {
    let mut kinds = table.features().iter().map(|feature| feature.kind());
    let Some(first) = kinds.next() else {
        return "GEOMETRY".to_owned();
    };
    if kinds.all(|kind| kind == first) {
        match first {
            GeometryKind::Line => "LINESTRING".to_owned(),
            GeometryKind::Rect | GeometryKind::Triangle => "POLYGON".to_owned(),
            other => other.name().to_ascii_uppercase(),
        }
    } else {
        "GEOMETRY".to_owned()
    }
}

fn extent(table: &FeatureTable) -> Option<Rect<f64>> {
    table
        .features()
        .iter()
        .filter_map(|feature| feature.geometry.bounding_rect())
        .reduce(|acc, rect| {
            Rect::new(
                geo::Coord {
                    x: acc.min().x.min(rect.min().x),
                    y: acc.min().y.min(rect.min().y),
                },
                geo::Coord {
                    x: acc.max().x.max(rect.max().x),
                    y: acc.max().y.max(rect.max().y),
                },
            )
        })
}

/// GeoPackage binary: `GP` header with an XY envelope, then WKB.
fn geometry_blob(geometry: &Geometry<f64>, srs_id: i32) -> Vec<u8> {
    let envelope = geometry.bounding_rect();
    let mut blob = Vec::with_capacity(64);
    blob.extend_from_slice(b"GP");
    blob.push(0);
    // Bit 0: little-endian. Bits 1-3: envelope kind (1 = XY). Bit 4: empty.
    blob.push(if envelope.is_some() { 0b0000_0011 } else { 0b0001_0001 });
    blob.extend_from_slice(&srs_id.to_le_bytes());
    if let Some(rect) = envelope {
        for value in [rect.min().x, rect.max().x, rect.min().y, rect.max().y] {
            blob.extend_from_slice(&value.to_le_bytes());
        }
    }
    wkb::encode(&mut blob, geometry);
    blob
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use geo::{LineString, Point};
    use osmlayers_core::{Crs, Feature};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn temp_dir() -> TempDir {
        TempDir::new().expect("create temp dir")
    }

    fn rivers() -> FeatureTable {
        FeatureTable::from_features(
            Crs::WGS84,
            [
                Feature::new(Geometry::LineString(LineString::from(vec![
                    (36.0, -1.0),
                    (36.5, -0.5),
                ])))
                .with_attribute("fclass", "river")
                .with_attribute("name", "Tana"),
                Feature::new(Geometry::LineString(LineString::from(vec![
                    (37.0, 0.0),
                    (37.5, 0.5),
                ])))
                .with_attribute("fclass", "river"),
            ],
        )
    }

    fn db_path(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("ken_phys_riv_ln_s1_osm_pp_rivers.gpkg"))
            .expect("utf-8 path")
    }

    #[rstest]
    fn writes_features_and_metadata(temp_dir: TempDir) {
        let path = db_path(&temp_dir);

        write(&rivers(), &path).expect("write geopackage");

        let conn = Connection::open(path.as_std_path()).expect("open database");
        let (name, geometry_type): (String, String) = conn
            .query_row(
                "SELECT table_name, geometry_type_name FROM gpkg_geometry_columns",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("geometry column row");
        assert_eq!(name, "ken_phys_riv_ln_s1_osm_pp_rivers");
        assert_eq!(geometry_type, "LINESTRING");

        let rows: Vec<(Vec<u8>, Option<String>)> = conn
            .prepare("SELECT geom, name FROM ken_phys_riv_ln_s1_osm_pp_rivers ORDER BY fid")
            .expect("prepare")
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .expect("query")
            .collect::<Result<_, _>>()
            .expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0].0[..2], b"GP");
        assert_eq!(rows[0].1.as_deref(), Some("Tana"));
        assert_eq!(rows[1].1, None);

        let app_id: i32 = conn
            .query_row("PRAGMA application_id", [], |row| row.get(0))
            .expect("application id");
        assert_eq!(app_id, APPLICATION_ID);
    }

    #[rstest]
    fn rewriting_replaces_the_file(temp_dir: TempDir) {
        let path = db_path(&temp_dir);
        write(&rivers(), &path).expect("first write");

        let mut single = rivers();
        single.retain(|feature| feature.tag("name").is_some());
        write(&single, &path).expect("second write");

        let conn = Connection::open(path.as_std_path()).expect("open database");
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM ken_phys_riv_ln_s1_osm_pp_rivers",
                [],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(count, 1);
    }

    #[rstest]
    fn mixed_tables_declare_generic_geometry() {
        let table = FeatureTable::from_features(
            Crs::WGS84,
            [
                Feature::new(Geometry::Point(Point::new(0.0, 0.0))),
                Feature::new(Geometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]))),
            ],
        );
        assert_eq!(geometry_type_name(&table), "GEOMETRY");
    }

    #[rstest]
    fn reserved_column_names_are_rejected(temp_dir: TempDir) {
        let table = FeatureTable::from_features(
            Crs::WGS84,
            [Feature::new(Geometry::Point(Point::new(0.0, 0.0))).with_attribute("geom", "x")],
        );
        let err = write(&table, &db_path(&temp_dir)).expect_err("reserved column");
        assert!(matches!(err, WriteError::ColumnName { .. }), "got {err:?}");
    }

    #[rstest]
    fn blobs_carry_envelope_and_srs() {
        let blob = geometry_blob(&Geometry::Point(Point::new(2.0, 3.0)), 4326);
        assert_eq!(blob[3], 0b0000_0011);
        assert_eq!(&blob[4..8], &4326_i32.to_le_bytes());
        assert_eq!(&blob[8..16], &2.0_f64.to_le_bytes());
        assert_eq!(blob.len(), 8 + 32 + 21);
    }
}
