//! Extraction of walking edges from an OSM extract.
//!
//! Ways that share an interior node (street crossings) must be split
//! there, otherwise the resulting graph has no link between the two
//! streets. Example (as of april 2021): way 158189827 is crossed mid-way
//! by way 446530366; the shared node 2825675780 has to become an edge
//! endpoint on both sides.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use geo::{Coord, HaversineLength, LineString};
use hashbrown::HashMap;
use log::info;
use osmpbfreader::{OsmObj, OsmPbfReader, Way};

use crate::error::Error;
use crate::loading::polygon::ClipPolygon;
use crate::model::walking::components::{osm_node_id, Edge};
use crate::{NodeOsmId, WayId};

/// An OSM node reference resolved to its location.
type LocatedNode = (NodeOsmId, Coord<f64>);

/// Nodes of each kept way, in way order. A BTreeMap keeps the way
/// iteration order (and therefore the edge order) deterministic.
type WayToNodes = BTreeMap<WayId, Vec<LocatedNode>>;

/// For a given node, how many kept ways reference it.
type NodeUseCounter = HashMap<NodeOsmId, u32>;

struct PbfScan {
    node_locations: HashMap<NodeOsmId, Coord<f64>>,
    candidate_ways: BTreeMap<WayId, Vec<NodeOsmId>>,
}

/// Reads the extract once, keeping every node location and the node list
/// of each way that looks usable for walking.
fn scan_pbf(osm_file: &Path) -> Result<PbfScan, Error> {
    let file = File::open(osm_file).map_err(|e| Error::UnreadableFile {
        path: osm_file.to_path_buf(),
        source: e,
    })?;
    let mut pbf = OsmPbfReader::new(file);

    let mut scan = PbfScan {
        node_locations: HashMap::new(),
        candidate_ways: BTreeMap::new(),
    };
    for obj in pbf.iter() {
        let obj = obj.map_err(|e| {
            Error::InvalidOsm(format!("failed to read '{}': {e:?}", osm_file.display()))
        })?;
        match obj {
            OsmObj::Node(node) => {
                scan.node_locations.insert(
                    node.id.0,
                    Coord {
                        x: node.lon(),
                        y: node.lat(),
                    },
                );
            }
            OsmObj::Way(way) => {
                if is_way_interesting(&way) {
                    scan.candidate_ways
                        .insert(way.id.0, way.nodes.iter().map(|node| node.0).collect());
                }
            }
            OsmObj::Relation(_) => {}
        }
    }
    Ok(scan)
}

/// As a rule of thumb, a way with the `highway` tag can be used for
/// walking, unless it only delimits an area.
fn is_way_interesting(way: &Way) -> bool {
    if way.tags.get("highway").is_none() {
        return false;
    }
    if way.tags.get("area").map(|value| value.as_str()) == Some("yes") {
        return false;
    }
    way.nodes.len() >= 2
}

/// A way is in scope if either of its endpoint nodes falls inside the
/// polygon. The empty polygon keeps every way.
fn is_way_in_polygon(nodes: &[LocatedNode], polygon: &ClipPolygon) -> bool {
    if polygon.is_empty() {
        return true;
    }
    let (_, front) = nodes[0];
    let (_, back) = nodes[nodes.len() - 1];
    polygon.is_inside(front.x, front.y) || polygon.is_inside(back.x, back.y)
}

/// Resolves way nodes to their location, applies the polygon filter, and
/// counts how many kept ways use each node.
fn locate_ways(scan: PbfScan, polygon: &ClipPolygon) -> Result<(WayToNodes, NodeUseCounter), Error> {
    let mut way_to_nodes = WayToNodes::new();
    let mut node_use_counter = NodeUseCounter::new();

    for (way_id, node_ids) in scan.candidate_ways {
        let mut nodes = Vec::with_capacity(node_ids.len());
        for node_id in node_ids {
            let location = scan.node_locations.get(&node_id).copied().ok_or_else(|| {
                Error::InvalidOsm(format!(
                    "way {way_id} references node {node_id}, which has no location in the extract"
                ))
            })?;
            nodes.push((node_id, location));
        }
        if !is_way_in_polygon(&nodes, polygon) {
            continue;
        }
        for (node_id, _) in &nodes {
            *node_use_counter.entry(*node_id).or_insert(0) += 1;
        }
        way_to_nodes.insert(way_id, nodes);
    }
    Ok((way_to_nodes, node_use_counter))
}

fn add_edge(
    edges: &mut Vec<Edge>,
    node_from: NodeOsmId,
    node_to: NodeOsmId,
    geometry: Vec<Coord<f64>>,
    walkspeed_m_per_s: f64,
) {
    let geometry = LineString::new(geometry);
    let length_m = geometry.haversine_length();
    let weight = length_m / walkspeed_m_per_s;
    edges.push(Edge::new(
        osm_node_id(node_from),
        osm_node_id(node_to),
        geometry,
        length_m,
        weight,
    ));
}

/// Splits one way at every node used by at least one other way.
///
/// Interior nodes private to this way become polyline vertices; the first
/// and last nodes always become edge endpoints, even with a use count of
/// 1, so that dead ends are not lost.
fn split_way(
    nodes: &[LocatedNode],
    node_use_counter: &NodeUseCounter,
    walkspeed_m_per_s: f64,
    edges: &mut Vec<Edge>,
) {
    let last = nodes.len() - 1;
    let mut first = 0;
    while first != last {
        let mut geometry = vec![nodes[first].1];
        let mut second = first + 1;

        // skipping all nodes that only belong to this way :
        while second <= last && node_use_counter[&nodes[second].0] < 2 {
            geometry.push(nodes[second].1);
            second += 1;
        }

        // here, second points to the first node (after first) with a use
        // count >= 2, or past the end if the way is a dead end
        if second > last {
            add_edge(edges, nodes[first].0, nodes[last].0, geometry, walkspeed_m_per_s);
            break;
        }

        geometry.push(nodes[second].1);
        add_edge(edges, nodes[first].0, nodes[second].0, geometry, walkspeed_m_per_s);
        first = second;
    }
}

/// Builds the edge list from the kept ways, splitting each way at the
/// nodes it shares with other ways.
fn build_edges(
    way_to_nodes: &WayToNodes,
    node_use_counter: &NodeUseCounter,
    walkspeed_km_per_hour: f64,
) -> Vec<Edge> {
    let walkspeed_m_per_s = walkspeed_km_per_hour / 3.6;
    let mut edges = Vec::new();
    for nodes in way_to_nodes.values() {
        split_way(nodes, node_use_counter, walkspeed_m_per_s, &mut edges);
    }
    edges
}

/// Extracts the pedestrian edges of an OSM file, restricted to the given
/// polygon if it is not empty.
pub fn osm_to_edges(
    osm_file: &Path,
    polygon: &ClipPolygon,
    walkspeed_km_per_hour: f64,
) -> Result<Vec<Edge>, Error> {
    info!("Parsing OSM extract {}", osm_file.display());
    let scan = scan_pbf(osm_file)?;
    info!(
        "OSM extract has {} nodes and {} candidate ways",
        scan.node_locations.len(),
        scan.candidate_ways.len()
    );
    let (way_to_nodes, node_use_counter) = locate_ways(scan, polygon)?;
    let edges = build_edges(&way_to_nodes, &node_use_counter, walkspeed_km_per_hour);
    info!("Kept {} ways, split into {} edges", way_to_nodes.len(), edges.len());
    Ok(edges)
}
