//! GeoJSON boundary files.

use std::fs;
use std::path::Path;

use geo::Geometry;
use geojson::GeoJson;
use osmlayers_core::{Boundary, BoundaryError, BoundarySource, country_code_from_path};

/// Loads boundaries from GeoJSON documents.
///
/// Feature collections contribute their first feature with a geometry; bare
/// features and geometries are used as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeoJsonBoundarySource;

impl BoundarySource for GeoJsonBoundarySource {
    fn load(&self, path: &Path) -> Result<Boundary, BoundaryError> {
        let country_code =
            country_code_from_path(path).ok_or_else(|| BoundaryError::CountryCode {
                path: path.to_path_buf(),
            })?;
        let text = fs::read_to_string(path).map_err(|source| BoundaryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let geometry = parse_boundary(&text)
            .map_err(|message| BoundaryError::Parse {
                path: path.to_path_buf(),
                message,
            })?
            .ok_or_else(|| BoundaryError::Empty {
                path: path.to_path_buf(),
            })?;
        Ok(Boundary::new(country_code, geometry))
    }
}

fn parse_boundary(text: &str) -> Result<Option<Geometry<f64>>, String> {
    let document: GeoJson = text.parse().map_err(|err: geojson::Error| err.to_string())?;
    let Some(geometry) = first_geometry(document) else {
        return Ok(None);
    };
    Geometry::<f64>::try_from(geometry)
        .map(Some)
        .map_err(|err| err.to_string())
}

fn first_geometry(document: GeoJson) -> Option<geojson::Geometry> {
    match document {
        GeoJson::Geometry(geometry) => Some(geometry),
        GeoJson::Feature(feature) => feature.geometry,
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .find_map(|feature| feature.geometry),
    }
}
