//! Walking graph components - nodes, edges, and attached transit stops

use geo::{Coord, LineString};

use crate::{NodeId, NodeOsmId, NodeRank};

/// OSM nodes are identified by their URL on openstreetmap.org.
pub const OSM_NODE_URL_PREFIX: &str = "https://www.openstreetmap.org/node/";

/// Canonical id of an OSM node: its URL form.
pub fn osm_node_id(id: NodeOsmId) -> NodeId {
    format!("{OSM_NODE_URL_PREFIX}{id}")
}

/// URL of a graph node. OSM node ids are their own URL; stop nodes
/// (identified by their GTFS stop id) have none.
pub fn node_url(id: &str) -> &str {
    if id.starts_with(OSM_NODE_URL_PREFIX) {
        id
    } else {
        ""
    }
}

/// Tolerance under which two coordinates are considered equal.
pub const COORD_EPSILON: f64 = 1e-9;

pub(crate) fn approx_equal(left: f64, right: f64) -> bool {
    (left - right).abs() < COORD_EPSILON
}

/// Directed walking edge. A single OSM way can be split into several edges.
///
/// Invariant: the geometry has at least two points; its first point is the
/// location of `node_from` and its last point the location of `node_to`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub node_from: NodeId,
    pub node_to: NodeId,
    pub geometry: LineString<f64>,
    pub length_m: f64,
    /// Pedestrian traversal time in seconds
    pub weight: f64,
}

impl Edge {
    pub fn new(
        node_from: NodeId,
        node_to: NodeId,
        geometry: LineString<f64>,
        length_m: f64,
        weight: f64,
    ) -> Self {
        debug_assert!(geometry.0.len() >= 2);
        Edge {
            node_from,
            node_to,
            geometry,
            length_m,
            weight,
        }
    }

    pub fn from_location(&self) -> Coord<f64> {
        self.geometry.0[0]
    }

    pub fn to_location(&self) -> Coord<f64> {
        self.geometry.0[self.geometry.0.len() - 1]
    }

    pub(crate) fn with_ranks(self, node_from_rank: NodeRank, node_to_rank: NodeRank) -> RankedEdge {
        RankedEdge {
            node_from: self.node_from,
            node_to: self.node_to,
            node_from_rank,
            node_to_rank,
            geometry: self.geometry,
            length_m: self.length_m,
            weight: self.weight,
        }
    }
}

/// An edge of the finalized graph, where both endpoints carry their rank.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEdge {
    pub node_from: NodeId,
    pub node_to: NodeId,
    pub node_from_rank: NodeRank,
    pub node_to_rank: NodeRank,
    pub geometry: LineString<f64>,
    pub length_m: f64,
    pub weight: f64,
}

impl RankedEdge {
    /// The same edge, walked in the other direction.
    pub fn reversed(&self) -> RankedEdge {
        let mut geometry = self.geometry.clone();
        geometry.0.reverse();
        RankedEdge {
            node_from: self.node_to.clone(),
            node_to: self.node_from.clone(),
            node_from_rank: self.node_to_rank,
            node_to_rank: self.node_from_rank,
            geometry,
            length_m: self.length_m,
            weight: self.weight,
        }
    }

    pub fn from_location(&self) -> Coord<f64> {
        self.geometry.0[0]
    }

    pub fn to_location(&self) -> Coord<f64> {
        self.geometry.0[self.geometry.0.len() - 1]
    }
}

/// A transit stop, as handed over by the GTFS pass.
#[derive(Debug, Clone)]
pub struct Stop {
    pub lon: f64,
    pub lat: f64,
    pub id: String,
    pub name: String,
}

impl PartialEq for Stop {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && approx_equal(self.lon, other.lon)
            && approx_equal(self.lat, other.lat)
    }
}

/// A stop augmented with the graph node it was attached to.
#[derive(Debug, Clone, PartialEq)]
pub struct StopWithClosestNode {
    pub stop: Stop,
    pub closest_node_id: NodeId,
    pub closest_node_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn osm_node_ids_are_urls() {
        let id = osm_node_id(2825675780);
        assert_eq!(id, "https://www.openstreetmap.org/node/2825675780");
        assert_eq!(node_url(&id), id);
    }

    #[test]
    fn stop_nodes_have_no_url() {
        assert_eq!(node_url("StopArea:1024"), "");
    }

    #[test]
    fn reversed_edge_swaps_endpoints_and_geometry() {
        let edge = RankedEdge {
            node_from: "a".into(),
            node_to: "b".into(),
            node_from_rank: 3,
            node_to_rank: 7,
            geometry: vec![(0.0, 0.0), (1.0, 0.5), (2.0, 1.0)].into(),
            length_m: 250.0,
            weight: 180.0,
        };
        let reversed = edge.reversed();
        assert_eq!(reversed.node_from, "b");
        assert_eq!(reversed.node_to, "a");
        assert_eq!(reversed.node_from_rank, 7);
        assert_eq!(reversed.node_to_rank, 3);
        assert_eq!(reversed.geometry.0[0], edge.geometry.0[2]);
        assert_eq!(reversed.length_m, edge.length_m);
        assert_eq!(reversed.weight, edge.weight);
        assert_eq!(reversed.reversed(), edge);
    }

    #[test]
    fn stop_equality_tolerates_tiny_coordinate_noise() {
        let stop = Stop {
            lon: 7.4259518,
            lat: 43.7389494,
            id: "S1".into(),
            name: "Place d'Armes".into(),
        };
        let mut shifted = stop.clone();
        shifted.lon += 1e-12;
        assert_eq!(stop, shifted);
        shifted.lon += 1e-6;
        assert_ne!(stop, shifted);
    }
}
