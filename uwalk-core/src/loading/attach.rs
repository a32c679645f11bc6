//! Attachment of transit stops to the walking graph.
//!
//! Each stop becomes a new node, linked to its closest OSM node by a
//! straight synthetic edge.

use geo::{HaversineDistance, LineString, Point};
use log::info;
use rstar::primitives::GeomWithData;
use rstar::RTree;

use crate::error::Error;
use crate::model::walking::components::{node_url, Edge, Stop, StopWithClosestNode};
use crate::NodeId;

type IndexedNode = GeomWithData<[f64; 2], NodeId>;

/// Spatial index over every edge endpoint. Duplicate insertions are
/// harmless: duplicates carry the same id.
fn index_graph_nodes(edges: &[Edge]) -> RTree<IndexedNode> {
    let mut nodes = Vec::with_capacity(edges.len() * 2);
    for edge in edges {
        let from = edge.from_location();
        let to = edge.to_location();
        nodes.push(IndexedNode::new([from.x, from.y], edge.node_from.clone()));
        nodes.push(IndexedNode::new([to.x, to.y], edge.node_to.clone()));
    }
    RTree::bulk_load(nodes)
}

/// Extends the OSM edges with one synthetic edge per stop, from the stop
/// to its closest node in the graph. The stop edges are appended after
/// the OSM edges, in stop order.
pub fn extend_with_stops(
    stops: &[Stop],
    mut edges: Vec<Edge>,
    walkspeed_km_per_hour: f64,
) -> Result<(Vec<Edge>, Vec<StopWithClosestNode>), Error> {
    info!("Attaching {} stops to the graph", stops.len());
    let rtree = index_graph_nodes(&edges);
    let walkspeed_m_per_s = walkspeed_km_per_hour / 3.6;

    let mut stops_with_closest_node = Vec::with_capacity(stops.len());
    for stop in stops {
        let closest = rtree
            .nearest_neighbor(&[stop.lon, stop.lat])
            .ok_or(Error::NoNodesToAttach)?;
        let [node_lon, node_lat] = *closest.geom();

        let geometry = LineString::from(vec![(stop.lon, stop.lat), (node_lon, node_lat)]);
        let length_m =
            Point::new(stop.lon, stop.lat).haversine_distance(&Point::new(node_lon, node_lat));
        let weight = length_m / walkspeed_m_per_s;
        edges.push(Edge::new(
            stop.id.clone(),
            closest.data.clone(),
            geometry,
            length_m,
            weight,
        ));

        stops_with_closest_node.push(StopWithClosestNode {
            stop: stop.clone(),
            closest_node_id: closest.data.clone(),
            closest_node_url: node_url(&closest.data).to_string(),
        });
    }
    Ok((edges, stops_with_closest_node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::walking::components::osm_node_id;
    use geo::Coord;

    fn edge(from: i64, from_loc: (f64, f64), to: i64, to_loc: (f64, f64)) -> Edge {
        Edge::new(
            osm_node_id(from),
            osm_node_id(to),
            LineString::from(vec![from_loc, to_loc]),
            50.0,
            36.0,
        )
    }

    fn stop(id: &str, lon: f64, lat: f64) -> Stop {
        Stop {
            lon,
            lat,
            id: id.to_string(),
            name: id.to_string(),
        }
    }

    #[test]
    fn each_stop_is_attached_to_its_closest_node() {
        let edges = vec![
            edge(1, (7.4200, 43.7300), 2, (7.4210, 43.7300)),
            edge(2, (7.4210, 43.7300), 3, (7.4220, 43.7300)),
        ];
        let stops = vec![stop("near-1", 7.4201, 43.7302), stop("near-3", 7.4219, 43.7299)];

        let (extended, attached) = extend_with_stops(&stops, edges, 5.0).unwrap();
        assert_eq!(extended.len(), 4);
        assert_eq!(attached.len(), 2);

        assert_eq!(attached[0].closest_node_id, osm_node_id(1));
        assert_eq!(attached[1].closest_node_id, osm_node_id(3));
        assert_eq!(attached[0].closest_node_url, osm_node_id(1));

        // stop edges come after the OSM edges, in stop order
        let stop_edge = &extended[2];
        assert_eq!(stop_edge.node_from, "near-1");
        assert_eq!(stop_edge.node_to, osm_node_id(1));
        assert_eq!(stop_edge.geometry.0.len(), 2);
        assert_eq!(stop_edge.from_location(), Coord { x: 7.4201, y: 43.7302 });
        assert_eq!(stop_edge.to_location(), Coord { x: 7.4200, y: 43.7300 });
        assert!(stop_edge.length_m > 0.0);
        assert!((stop_edge.weight - stop_edge.length_m / (5.0 / 3.6)).abs() < 1e-9);
    }

    #[test]
    fn attaching_to_an_empty_graph_is_fatal() {
        let stops = vec![stop("lonely", 7.42, 43.73)];
        let result = extend_with_stops(&stops, Vec::new(), 5.0);
        assert!(matches!(result, Err(Error::NoNodesToAttach)));
    }
}
