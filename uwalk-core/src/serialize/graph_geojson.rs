//! GeoJSON serialization of the walking graph.
//!
//! The graph is a FeatureCollection with one LineString feature per
//! (directed) edge. Re-parsing a dump yields the same graph, which the
//! driver verifies after writing.

use std::io::{Read, Write};

use geo::LineString;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value as GeoJsonValue};
use serde_json::json;

use crate::error::Error;
use crate::model::walking::components::{node_url, RankedEdge, StopWithClosestNode};
use crate::model::walking::graph::WalkingGraph;

fn edge_to_feature(edge: &RankedEdge) -> Feature {
    let coordinates: Vec<Vec<f64>> = edge.geometry.coords().map(|c| vec![c.x, c.y]).collect();

    let mut properties = JsonObject::new();
    properties.insert("node_from_rank".to_string(), json!(edge.node_from_rank));
    properties.insert("node_from".to_string(), json!(edge.node_from));
    properties.insert("node_to_rank".to_string(), json!(edge.node_to_rank));
    properties.insert("node_to".to_string(), json!(edge.node_to));
    properties.insert("node_from_url".to_string(), json!(node_url(&edge.node_from)));
    properties.insert("node_to_url".to_string(), json!(node_url(&edge.node_to)));
    properties.insert("weight".to_string(), json!(edge.weight));
    properties.insert("length_meters".to_string(), json!(edge.length_m));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(GeoJsonValue::LineString(coordinates))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn graph_feature_collection(edges: &[RankedEdge]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: edges.iter().map(edge_to_feature).collect(),
        foreign_members: None,
    }
}

/// One Point feature per stop, with its attachment node in the
/// properties. Used by the HL-UW server.
pub fn stops_feature_collection(stops: &[StopWithClosestNode]) -> FeatureCollection {
    let features = stops
        .iter()
        .map(|stop| {
            let mut properties = JsonObject::new();
            properties.insert("stop_id".to_string(), json!(stop.stop.id));
            properties.insert("stop_name".to_string(), json!(stop.stop.name));
            properties.insert("closest_node_id".to_string(), json!(stop.closest_node_id));
            properties.insert("closest_node_url".to_string(), json!(stop.closest_node_url));
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(GeoJsonValue::Point(vec![
                    stop.stop.lon,
                    stop.stop.lat,
                ]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn serialize_walking_graph<W: Write>(graph: &WalkingGraph, mut out: W) -> Result<(), Error> {
    let collection = graph_feature_collection(&graph.edges_with_stops_bidirectional);
    serde_json::to_writer_pretty(&mut out, &collection)?;
    out.flush()?;
    Ok(())
}

pub fn walking_graph_to_string(graph: &WalkingGraph) -> Result<String, Error> {
    let collection = graph_feature_collection(&graph.edges_with_stops_bidirectional);
    Ok(serde_json::to_string_pretty(&collection)?)
}

pub fn unserialize_walking_graph<R: Read>(mut input: R) -> Result<WalkingGraph, Error> {
    let mut raw = String::new();
    input.read_to_string(&mut raw)?;
    let edges = parse_geojson_graph(&raw)?;
    WalkingGraph::from_ranked_edges(edges)
}

/// Serializing, re-parsing and serializing again must give back the same
/// bytes and the same edges.
pub fn check_graph_serialization_idempotent(graph: &WalkingGraph) -> Result<(), Error> {
    let first = walking_graph_to_string(graph)?;
    let deserialized = unserialize_walking_graph(first.as_bytes())?;
    if deserialized.edges_with_stops_bidirectional != graph.edges_with_stops_bidirectional {
        return Err(Error::RoundTrip(
            "deserialized walking graph differs from the original".to_string(),
        ));
    }
    let second = walking_graph_to_string(&deserialized)?;
    if first != second {
        return Err(Error::RoundTrip(
            "walking-graph serialization is not byte-identical after a round-trip".to_string(),
        ));
    }
    Ok(())
}

fn assert_geojson_format(condition: bool, description: &str) -> Result<(), Error> {
    if condition {
        Ok(())
    } else {
        Err(Error::GraphFormat(description.to_string()))
    }
}

fn parse_geojson_graph(raw: &str) -> Result<Vec<RankedEdge>, Error> {
    let doc: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| Error::GraphFormat(format!("not valid JSON: {e}")))?;

    assert_geojson_format(doc.is_object(), "doc is not an object")?;
    let features = doc
        .get("features")
        .ok_or_else(|| Error::GraphFormat("doc has no 'features'".to_string()))?;
    let features = features
        .as_array()
        .ok_or_else(|| Error::GraphFormat("'features' is not an array".to_string()))?;

    let mut edges = Vec::with_capacity(features.len());
    for feature in features {
        assert_geojson_format(feature.is_object(), "feature is not an object")?;
        assert_geojson_format(feature.get("type").is_some(), "feature has no 'type'")?;

        let properties = feature
            .get("properties")
            .ok_or_else(|| Error::GraphFormat("feature has no 'properties'".to_string()))?;
        assert_geojson_format(properties.is_object(), "'properties' is not an object")?;
        let property_str = |name: &str| -> Result<String, Error> {
            properties
                .get(name)
                .ok_or_else(|| Error::GraphFormat(format!("properties has no '{name}'")))?
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::GraphFormat(format!("'{name}' is not a string")))
        };
        let property_rank = |name: &str| -> Result<usize, Error> {
            properties
                .get(name)
                .ok_or_else(|| Error::GraphFormat(format!("properties has no '{name}'")))?
                .as_u64()
                .map(|rank| rank as usize)
                .ok_or_else(|| Error::GraphFormat(format!("'{name}' is not an integer")))
        };
        let property_f64 = |name: &str| -> Result<f64, Error> {
            properties
                .get(name)
                .ok_or_else(|| Error::GraphFormat(format!("properties has no '{name}'")))?
                .as_f64()
                .ok_or_else(|| Error::GraphFormat(format!("'{name}' is not a double")))
        };

        let node_from = property_str("node_from")?;
        let node_from_rank = property_rank("node_from_rank")?;
        let node_to = property_str("node_to")?;
        let node_to_rank = property_rank("node_to_rank")?;
        let weight = property_f64("weight")?;
        let length_m = property_f64("length_meters")?;

        let geometry = feature
            .get("geometry")
            .ok_or_else(|| Error::GraphFormat("feature has no 'geometry'".to_string()))?;
        assert_geojson_format(geometry.is_object(), "'geometry' is not an object")?;
        let geom_type = geometry
            .get("type")
            .ok_or_else(|| Error::GraphFormat("geometry has no 'type'".to_string()))?;
        assert_geojson_format(geom_type.is_string(), "geometry 'type' is not a string")?;
        assert_geojson_format(
            geom_type == "LineString",
            "geometry 'type' is not a 'LineString'",
        )?;
        let coordinates = geometry
            .get("coordinates")
            .ok_or_else(|| Error::GraphFormat("geometry has no 'coordinates'".to_string()))?;
        let coordinates = coordinates
            .as_array()
            .ok_or_else(|| Error::GraphFormat("'coordinates' is not an array".to_string()))?;

        let mut polyline = Vec::with_capacity(coordinates.len());
        for coordinate_pair in coordinates {
            let pair = coordinate_pair.as_array().ok_or_else(|| {
                Error::GraphFormat("coordinate pair is not an array".to_string())
            })?;
            assert_geojson_format(pair.len() == 2, "coordinate pair has not 2 elements")?;
            let lon = pair[0]
                .as_f64()
                .ok_or_else(|| Error::GraphFormat("lon is not a double".to_string()))?;
            let lat = pair[1]
                .as_f64()
                .ok_or_else(|| Error::GraphFormat("lat is not a double".to_string()))?;
            polyline.push((lon, lat));
        }

        edges.push(RankedEdge {
            node_from,
            node_to,
            node_from_rank,
            node_to_rank,
            geometry: LineString::from(polyline),
            length_m,
            weight,
        });
    }
    Ok(edges)
}
