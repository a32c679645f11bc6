use std::path::Path;

use log::info;

use crate::error::Error;
use crate::loading::attach::extend_with_stops;
use crate::loading::osm::osm_to_edges;
use crate::loading::polygon::ClipPolygon;
use crate::model::walking::components::Stop;
use crate::model::walking::graph::WalkingGraph;

/// Builds the walking graph for a set of stops from an OSM extract.
///
/// The OSM edges are extended with one edge between each stop and its
/// closest OSM node, every edge is mirrored to make the graph
/// bidirectional, and nodes are ranked with stops first.
///
/// # Errors
///
/// Returns an error if the extract cannot be read, if the graph has no
/// node to attach a stop to, or if the assembled structures end up
/// inconsistent.
pub fn build_walking_graph(
    osm_file: &Path,
    polygon: ClipPolygon,
    stops: &[Stop],
    walkspeed_km_per_hour: f64,
) -> Result<WalkingGraph, Error> {
    info!("Building walking graph from {}", osm_file.display());
    let edges_osm = osm_to_edges(osm_file, &polygon, walkspeed_km_per_hour)?;
    let (edges_with_stops, stops_with_closest_node) =
        extend_with_stops(stops, edges_osm, walkspeed_km_per_hour)?;
    WalkingGraph::assemble(
        edges_with_stops,
        stops_with_closest_node,
        walkspeed_km_per_hour,
        polygon,
    )
}
