//! Preprocessing of public-transit data for multimodal routing engines.
//!
//! From a GTFS feed and an OpenStreetMap extract, this crate builds a
//! unified pedestrian graph in which transit stops occupy the first node
//! ranks, plus a normalized trip-event structure partitioned into
//! scientific routes (trips sharing the exact same stop sequence).

pub mod error;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod serialize;

pub use error::Error;

/// Node identifier: the OSM node URL for graph nodes, the GTFS stop id for stop nodes.
pub type NodeId = String;
/// OSM node id as found in the PBF data.
pub type NodeOsmId = i64;
/// OSM way id.
pub type WayId = i64;
/// Dense node rank; stops occupy the first ranks of the graph.
pub type NodeRank = usize;
/// Trip event time in seconds since midnight (may exceed 24h for overnight trips).
pub type TripEventTime = i32;
