//! Country boundaries and the Natural Earth projection used by the map.

use crate::error::LoadError;
use geojson::{GeoJson, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// One ring of `(longitude, latitude)` degrees
pub type Ring = Vec<(f64, f64)>;

/// A named country outline: polygons, each a list of rings (outer first)
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub name: String,
    pub polygons: Vec<Vec<Ring>>,
}

#[derive(Debug, Clone, Default)]
pub struct BoundarySet {
    pub features: Vec<Boundary>,
}

impl BoundarySet {
    /// Load boundaries from a local file or an `http(s)://` URL
    pub fn load(source: &str) -> Result<Self, LoadError> {
        let text = if source.starts_with("http://") || source.starts_with("https://") {
            fetch(source)?
        } else {
            std::fs::read_to_string(Path::new(source)).map_err(|e| LoadError::Io {
                path: source.into(),
                source: e,
            })?
        };
        let set = Self::parse(&text)?;
        info!(source, features = set.features.len(), "loaded boundaries");
        Ok(set)
    }

    /// Parse a GeoJSON FeatureCollection. Features without a polygon
    /// geometry are ignored; a collection with none left is an error.
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        let geojson: GeoJson = text.parse()?;
        let features = match geojson {
            GeoJson::FeatureCollection(fc) => fc.features,
            GeoJson::Feature(f) => vec![f],
            GeoJson::Geometry(_) => Vec::new(),
        };

        let mut out = Vec::new();
        for feature in features {
            let name = feature
                .property("name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let Some(geometry) = feature.geometry else {
                continue;
            };
            let polygons = match geometry.value {
                Value::Polygon(rings) => vec![to_rings(rings)],
                Value::MultiPolygon(polys) => polys.into_iter().map(to_rings).collect(),
                _ => {
                    debug!(name = %name, "skipping non-polygon feature");
                    continue;
                }
            };
            out.push(Boundary { name, polygons });
        }

        if out.is_empty() {
            return Err(LoadError::NoFeatures);
        }
        Ok(Self { features: out })
    }
}

fn to_rings(rings: Vec<Vec<Vec<f64>>>) -> Vec<Ring> {
    rings
        .into_iter()
        .map(|ring| {
            ring.into_iter()
                .filter(|p| p.len() >= 2)
                .map(|p| (p[0], p[1]))
                .collect()
        })
        .collect()
}

fn fetch(url: &str) -> Result<String, LoadError> {
    let wrap = |source| LoadError::Fetch {
        url: url.to_string(),
        source,
    };
    let response = reqwest::blocking::get(url).map_err(wrap)?;
    let response = response.error_for_status().map_err(wrap)?;
    response.text().map_err(wrap)
}

/// Geometry-name to dataset-name corrections for countries whose naming
/// differs between the two sources
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameFixes(BTreeMap<String, String>);

impl NameFixes {
    pub fn new(table: BTreeMap<String, String>) -> Self {
        Self(table)
    }

    /// Dataset name for a geometry name
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.0.get(name).map(String::as_str).unwrap_or(name)
    }
}

/// Natural Earth I pseudo-cylindrical projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NaturalEarth {
    pub scale: f64,
    pub translate: (f64, f64),
}

impl NaturalEarth {
    pub fn new(scale: f64, translate: (f64, f64)) -> Self {
        Self { scale, translate }
    }

    /// Project `(longitude, latitude)` in degrees to canvas coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let lambda = lon.to_radians();
        let phi = lat.to_radians();
        let phi2 = phi * phi;
        let phi4 = phi2 * phi2;
        let x = lambda
            * (0.8707 - 0.131979 * phi2
                + phi4 * (-0.013791 + phi4 * (0.003971 * phi2 - 0.001529 * phi4)));
        let y = phi
            * (1.007226
                + phi2 * (0.015085 + phi4 * (-0.044475 + 0.028874 * phi2 - 0.005916 * phi4)));
        (self.translate.0 + self.scale * x, self.translate.1 - self.scale * y)
    }

    /// Project every ring of a boundary. Rings that cross the antimeridian
    /// are split where consecutive longitudes jump by more than 180°.
    pub fn project_boundary(&self, boundary: &Boundary) -> Vec<Vec<(f64, f64)>> {
        let mut out = Vec::new();
        for polygon in &boundary.polygons {
            for ring in polygon {
                for piece in split_antimeridian(ring) {
                    if piece.len() >= 3 {
                        out.push(piece.iter().map(|&(lon, lat)| self.project(lon, lat)).collect());
                    }
                }
            }
        }
        out
    }
}

fn split_antimeridian(ring: &[(f64, f64)]) -> Vec<Ring> {
    let mut pieces = vec![Vec::new()];
    let mut previous: Option<f64> = None;
    for &(lon, lat) in ring {
        if let Some(prev) = previous {
            if (lon - prev).abs() > 180.0 {
                pieces.push(Vec::new());
            }
        }
        if let Some(current) = pieces.last_mut() {
            current.push((lon, lat));
        }
        previous = Some(lon);
    }
    pieces
}
