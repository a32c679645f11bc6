//! Optional geographic filter: a single polygon loaded from a GeoJSON
//! FeatureCollection, used to restrict the OSM pass to an area of
//! interest.

use std::fs;

use geo::{Contains, LineString, Point, Polygon};
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use log::warn;
use serde_json::json;

use crate::error::Error;

/// Passing this instead of a file path disables polygon filtering.
pub const NO_POLYGON: &str = "NONE";

/// A clip polygon; possibly empty, in which case everything is in scope.
///
/// The outer ring is expected counter-clockwise, and closed (last point
/// equal to the first).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipPolygon {
    ring: Option<Polygon<f64>>,
}

impl ClipPolygon {
    /// Loads the polygon file, or the empty polygon for the literal
    /// argument `"NONE"`.
    pub fn load(polygonfile_path: &str) -> Result<ClipPolygon, Error> {
        if polygonfile_path == NO_POLYGON {
            warn!("no filtering by polygon will be used");
            return Ok(ClipPolygon::default());
        }

        let raw = fs::read_to_string(polygonfile_path).map_err(|e| Error::UnreadableFile {
            path: polygonfile_path.into(),
            source: e,
        })?;
        let points = parse_polygonfile(&raw)?;
        Ok(ClipPolygon::from_points(points))
    }

    pub(crate) fn from_points(points: Vec<(f64, f64)>) -> ClipPolygon {
        if points.is_empty() {
            return ClipPolygon::default();
        }
        ClipPolygon {
            ring: Some(Polygon::new(LineString::from(points), vec![])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_none()
    }

    /// Point-in-polygon test; false for the empty polygon.
    pub fn is_inside(&self, lon: f64, lat: f64) -> bool {
        match &self.ring {
            Some(polygon) => polygon.contains(&Point::new(lon, lat)),
            None => false,
        }
    }

    /// Debug dump of the clip ring as a one-feature LineString collection.
    pub fn to_geojson(&self) -> Option<FeatureCollection> {
        let polygon = self.ring.as_ref()?;
        let ring = polygon.exterior();
        let coordinates: Vec<Vec<f64>> = ring.coords().map(|c| vec![c.x, c.y]).collect();
        let mut properties = geojson::JsonObject::new();
        properties.insert("nb_points".to_string(), json!(coordinates.len()));
        let feature = Feature {
            bbox: None,
            geometry: Some(Geometry::new(GeoJsonValue::LineString(coordinates))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        };
        Some(FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        })
    }
}

fn assert_geojson_format(condition: bool, description: &str) -> Result<(), Error> {
    if condition {
        Ok(())
    } else {
        Err(Error::PolygonFormat(description.to_string()))
    }
}

/// Parses a GeoJSON FeatureCollection whose first feature is a Polygon;
/// the points of its outer ring are returned.
fn parse_polygonfile(raw: &str) -> Result<Vec<(f64, f64)>, Error> {
    let doc: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| Error::PolygonFormat(format!("not valid JSON: {e}")))?;

    assert_geojson_format(doc.is_object(), "doc is not an object")?;
    let features = doc
        .get("features")
        .ok_or_else(|| Error::PolygonFormat("doc has no 'features'".to_string()))?;
    assert_geojson_format(features.is_array(), "'features' is not an array")?;
    let feature = features
        .get(0)
        .ok_or_else(|| Error::PolygonFormat("'features' is empty".to_string()))?;
    assert_geojson_format(feature.is_object(), "feature is not an object")?;

    let geometry = feature
        .get("geometry")
        .ok_or_else(|| Error::PolygonFormat("feature has no 'geometry'".to_string()))?;
    assert_geojson_format(geometry.is_object(), "'geometry' is not an object")?;
    let geom_type = geometry
        .get("type")
        .ok_or_else(|| Error::PolygonFormat("geometry has no 'type'".to_string()))?;
    assert_geojson_format(geom_type.is_string(), "geometry 'type' is not a string")?;
    assert_geojson_format(geom_type == "Polygon", "geometry 'type' is not a 'Polygon'")?;

    let coordinates = geometry
        .get("coordinates")
        .ok_or_else(|| Error::PolygonFormat("geometry has no 'coordinates'".to_string()))?;
    let rings = coordinates
        .as_array()
        .ok_or_else(|| Error::PolygonFormat("'coordinates' is not an array".to_string()))?;
    // the coordinates format allows holes; only the outer ring is used
    assert_geojson_format(rings.len() == 1, "there are multiple rings")?;
    let outer_ring = rings[0]
        .as_array()
        .ok_or_else(|| Error::PolygonFormat("outer ring is not an array".to_string()))?;

    let mut points = Vec::with_capacity(outer_ring.len());
    for coordinate_pair in outer_ring {
        let pair = coordinate_pair
            .as_array()
            .ok_or_else(|| Error::PolygonFormat("coordinate pair is not an array".to_string()))?;
        assert_geojson_format(pair.len() == 2, "coordinate pair has not 2 elements")?;
        let lon = pair[0]
            .as_f64()
            .ok_or_else(|| Error::PolygonFormat("lon is not a double".to_string()))?;
        let lat = pair[1]
            .as_f64()
            .ok_or_else(|| Error::PolygonFormat("lat is not a double".to_string()))?;
        points.push((lon, lat));
    }
    Ok(points)
}
