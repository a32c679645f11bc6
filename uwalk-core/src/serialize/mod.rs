//! Serialization of the pipeline outputs: round-trippable GeoJSON for the
//! walking graph, structured JSON for the parsed GTFS data, and the flat
//! text artifacts consumed by HL-UW.

pub mod gtfs_json;
pub mod graph_geojson;
pub mod hluw;
