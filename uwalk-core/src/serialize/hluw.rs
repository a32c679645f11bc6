//! Flat-text artifacts consumed by the HL-UW pipeline: the edge file, the
//! stop list, the stop coordinates and the stop-time table.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Error;
use crate::model::transit::data::GtfsParsedData;
use crate::model::walking::graph::WalkingGraph;
use crate::serialize::graph_geojson::stops_feature_collection;

fn create(path: &Path) -> Result<BufWriter<File>, Error> {
    Ok(BufWriter::new(File::create(path)?))
}

/// Dumps the graph-side HL-UW structures into `hluw_output_dir`:
/// `walkspeed_km_per_hour.txt`, `graph.edgefile` (one `from to weight`
/// line per edge, integer weights), `stops.nodes` and `stops.geojson`.
pub fn serialize_walking_graph_hluw(
    graph: &WalkingGraph,
    hluw_output_dir: &Path,
) -> Result<(), Error> {
    let mut out_walkspeed = create(&hluw_output_dir.join("walkspeed_km_per_hour.txt"))?;
    writeln!(out_walkspeed, "{}", graph.walkspeed_km_per_hour)?;
    out_walkspeed.flush()?;

    let mut out_edges = create(&hluw_output_dir.join("graph.edgefile"))?;
    for edge in &graph.edges_with_stops_bidirectional {
        writeln!(out_edges, "{} {} {:.0}", edge.node_from, edge.node_to, edge.weight)?;
    }
    out_edges.flush()?;

    let mut out_nodes = create(&hluw_output_dir.join("stops.nodes"))?;
    for stop in &graph.stops_with_closest_node {
        writeln!(out_nodes, "{}", stop.stop.id)?;
    }
    out_nodes.flush()?;

    // stops geojson (used by the HL-UW server)
    let mut out_stops = create(&hluw_output_dir.join("stops.geojson"))?;
    let collection = stops_feature_collection(&graph.stops_with_closest_node);
    serde_json::to_writer_pretty(&mut out_stops, &collection)?;
    out_stops.flush()?;
    Ok(())
}

/// Dumps the stop times of every trip, route by route, as the CSV table
/// HL-UW expects. `stop_sequence` is 1-indexed, as in GTFS.
pub fn serialize_gtfs_hluw<W: Write>(gtfs: &GtfsParsedData, out: W) -> Result<(), Error> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "trip_id",
        "arrival_time",
        "departure_time",
        "stop_id",
        "stop_sequence",
    ])?;

    for (route_label, parsed_route) in &gtfs.routes {
        let stop_ids = route_label.to_stop_ids();
        for ((_, trip_id), events) in &parsed_route.trips {
            if events.len() != stop_ids.len() {
                return Err(Error::Inconsistency(format!(
                    "trip '{trip_id}' has {} events for {} stops",
                    events.len(),
                    stop_ids.len()
                )));
            }
            for (index, (arrival_time, departure_time)) in events.iter().enumerate() {
                let stop_sequence = index + 1;
                let record = [
                    trip_id.clone(),
                    arrival_time.to_string(),
                    departure_time.to_string(),
                    stop_ids[index].clone(),
                    stop_sequence.to_string(),
                ];
                writer.write_record(&record)?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::transit::types::{ParsedRoute, RouteLabel};

    fn sample_gtfs() -> GtfsParsedData {
        let mut route = ParsedRoute::default();
        route
            .trips
            .insert((27000, "T2".to_string()), vec![(27000, 27060), (27600, 27660)]);
        route
            .trips
            .insert((28800, "T1".to_string()), vec![(28800, 28860), (29400, 29460)]);
        let mut gtfs = GtfsParsedData::default();
        gtfs.routes.insert(RouteLabel("A+B".to_string()), route);
        gtfs
    }

    #[test]
    fn stoptimes_table_lists_trips_in_order() {
        let mut raw = Vec::new();
        serialize_gtfs_hluw(&sample_gtfs(), &mut raw).unwrap();
        let text = String::from_utf8(raw).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "trip_id,arrival_time,departure_time,stop_id,stop_sequence",
                "T2,27000,27060,A,1",
                "T2,27600,27660,B,2",
                "T1,28800,28860,A,1",
                "T1,29400,29460,B,2",
            ]
        );
    }

    #[test]
    fn mismatched_event_count_is_fatal() {
        let mut gtfs = sample_gtfs();
        let route = gtfs.routes.get_mut(&RouteLabel("A+B".to_string())).unwrap();
        route.trips.insert((30000, "T3".to_string()), vec![(30000, 30060)]);
        let mut raw = Vec::new();
        let err = serialize_gtfs_hluw(&gtfs, &mut raw).unwrap_err();
        assert!(err.to_string().contains("T3"));
    }

    #[test]
    fn edgefile_weights_are_integer_seconds() {
        use crate::loading::polygon::ClipPolygon;
        use crate::model::walking::components::{Edge, StopWithClosestNode};
        use geo::LineString;

        let edges = vec![
            Edge::new(
                "a".to_string(),
                "b".to_string(),
                LineString::from(vec![(7.42, 43.73), (7.421, 43.73)]),
                80.6,
                58.1,
            ),
            Edge::new(
                "s".to_string(),
                "a".to_string(),
                LineString::from(vec![(7.4195, 43.73), (7.42, 43.73)]),
                40.2,
                28.9,
            ),
        ];
        let stops = vec![StopWithClosestNode {
            stop: crate::model::Stop {
                lon: 7.4195,
                lat: 43.73,
                id: "s".to_string(),
                name: "s".to_string(),
            },
            closest_node_id: "a".to_string(),
            closest_node_url: "".to_string(),
        }];
        let graph = WalkingGraph::assemble(edges, stops, 5.0, ClipPolygon::default()).unwrap();

        let dir = std::env::temp_dir().join(format!("hluw-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        serialize_walking_graph_hluw(&graph, &dir).unwrap();

        let edgefile = std::fs::read_to_string(dir.join("graph.edgefile")).unwrap();
        let lines: Vec<&str> = edgefile.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "a b 58");
        assert_eq!(lines[1], "s a 29");

        let walkspeed = std::fs::read_to_string(dir.join("walkspeed_km_per_hour.txt")).unwrap();
        assert_eq!(walkspeed.trim(), "5");

        let nodes = std::fs::read_to_string(dir.join("stops.nodes")).unwrap();
        assert_eq!(nodes.trim(), "s");

        std::fs::remove_dir_all(&dir).ok();
    }
}
