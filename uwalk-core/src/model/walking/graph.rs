//! Finalized walking graph: ranked nodes, bidirectional edges, adjacency.
//!
//! Each node of the graph is identified by a dense rank. Nodes that
//! represent transit stops are ranked before all other nodes, as required
//! by ULTRA-style routing engines.

use std::collections::BTreeSet;

use hashbrown::HashMap;
use log::info;

use crate::error::Error;
use crate::loading::polygon::ClipPolygon;
use crate::model::walking::components::{Edge, RankedEdge, StopWithClosestNode};
use crate::{NodeId, NodeRank};

#[derive(Debug, Default)]
pub struct WalkingGraph {
    /// All edges, each one present in both directions.
    pub edges_with_stops_bidirectional: Vec<RankedEdge>,
    /// Out-edge indices of each node, indexed by node rank.
    pub node_to_out_edges: Vec<Vec<usize>>,
    /// The stops the graph was extended with, each with its attachment node.
    pub stops_with_closest_node: Vec<StopWithClosestNode>,
    pub walkspeed_km_per_hour: f64,
    pub polygon: ClipPolygon,
}

/// Assigns a rank to every edge endpoint.
///
/// Stops are ranked first, in the order they were given; the remaining
/// nodes get the next ranks in order of first appearance in the edge list.
/// Returns the ranked edges and the total number of nodes.
fn rank_nodes(
    edges_with_stops: Vec<Edge>,
    stops: &[StopWithClosestNode],
) -> (Vec<RankedEdge>, usize) {
    let mut node_to_rank: HashMap<NodeId, NodeRank> =
        HashMap::with_capacity(stops.len() + edges_with_stops.len());
    for stop in stops {
        let rank = node_to_rank.len();
        node_to_rank.insert(stop.stop.id.clone(), rank);
    }

    let mut ranked = Vec::with_capacity(edges_with_stops.len());
    for edge in edges_with_stops {
        let next = node_to_rank.len();
        let from_rank = *node_to_rank.entry(edge.node_from.clone()).or_insert(next);
        let next = node_to_rank.len();
        let to_rank = *node_to_rank.entry(edge.node_to.clone()).or_insert(next);
        ranked.push(edge.with_ranks(from_rank, to_rank));
    }

    (ranked, node_to_rank.len())
}

/// For each edge, adds its reversed edge; this doubles the edge list.
fn add_reversed_edges(edges: Vec<RankedEdge>) -> Vec<RankedEdge> {
    let mut bidirectional = Vec::with_capacity(edges.len() * 2);
    bidirectional.extend(edges.iter().cloned());
    bidirectional.extend(edges.iter().map(RankedEdge::reversed));
    debug_assert_eq!(bidirectional.len(), 2 * edges.len());
    bidirectional
}

/// Retrieves the out-edges of a node from its rank.
fn map_nodes_to_out_edges(edges: &[RankedEdge], nb_nodes: usize) -> Vec<Vec<usize>> {
    let mut node_to_out_edges = vec![Vec::new(); nb_nodes];
    for (edge_index, edge) in edges.iter().enumerate() {
        node_to_out_edges[edge.node_from_rank].push(edge_index);
    }
    node_to_out_edges
}

impl WalkingGraph {
    /// Builds the final graph from the extended edge list: ranks the
    /// nodes, mirrors every edge, and indexes out-edges per node.
    pub fn assemble(
        edges_with_stops: Vec<Edge>,
        stops_with_closest_node: Vec<StopWithClosestNode>,
        walkspeed_km_per_hour: f64,
        polygon: ClipPolygon,
    ) -> Result<WalkingGraph, Error> {
        let (ranked_edges, nb_nodes) = rank_nodes(edges_with_stops, &stops_with_closest_node);
        let edges_with_stops_bidirectional = add_reversed_edges(ranked_edges);
        let node_to_out_edges = map_nodes_to_out_edges(&edges_with_stops_bidirectional, nb_nodes);

        let graph = WalkingGraph {
            edges_with_stops_bidirectional,
            node_to_out_edges,
            stops_with_closest_node,
            walkspeed_km_per_hour,
            polygon,
        };
        info!("Number of nodes in the graph = {}", graph.node_to_out_edges.len());
        info!(
            "Number of edges in the graph = {}",
            graph.edges_with_stops_bidirectional.len()
        );
        graph.check_structures_consistency()?;
        Ok(graph)
    }

    /// Rebuilds a graph from an already-ranked edge list, as obtained from
    /// deserialization. Stops, walkspeed and polygon are not part of the
    /// serialized graph and are left at their default values.
    pub fn from_ranked_edges(edges: Vec<RankedEdge>) -> Result<WalkingGraph, Error> {
        let nb_nodes = edges
            .iter()
            .map(|edge| edge.node_from_rank.max(edge.node_to_rank) + 1)
            .max()
            .unwrap_or(0);
        let node_to_out_edges = map_nodes_to_out_edges(&edges, nb_nodes);
        let graph = WalkingGraph {
            edges_with_stops_bidirectional: edges,
            node_to_out_edges,
            ..WalkingGraph::default()
        };
        graph.check_structures_consistency()?;
        Ok(graph)
    }

    /// Every rank referenced by an edge endpoint must be a valid index of
    /// `node_to_out_edges`, and conversely.
    pub fn check_structures_consistency(&self) -> Result<(), Error> {
        let used_ranks: BTreeSet<NodeRank> = self
            .edges_with_stops_bidirectional
            .iter()
            .flat_map(|edge| [edge.node_from_rank, edge.node_to_rank])
            .collect();
        let indexed_ranks: BTreeSet<NodeRank> = (0..self.node_to_out_edges.len()).collect();
        if used_ranks != indexed_ranks {
            return Err(Error::Inconsistency(format!(
                "{} ranks used in edges but {} ranks indexed in node_to_out_edges",
                used_ranks.len(),
                indexed_ranks.len()
            )));
        }
        Ok(())
    }
}
