// Re-export of the key pipeline entry points
pub use crate::loading::build_walking_graph;
pub use crate::loading::extend_with_stops;
pub use crate::loading::gtfs::gtfs_parsed_data_from_feed;
pub use crate::loading::polygon::ClipPolygon;

// Core model types
pub use crate::model::{Edge, GtfsParsedData, RankedEdge, Stop, StopWithClosestNode, WalkingGraph};

// Serialization of the pipeline outputs
pub use crate::serialize::gtfs_json::{check_gtfs_serialization_idempotent, serialize_gtfs, unserialize_gtfs};
pub use crate::serialize::graph_geojson::{
    check_graph_serialization_idempotent, serialize_walking_graph, unserialize_walking_graph,
};
pub use crate::serialize::hluw::{serialize_gtfs_hluw, serialize_walking_graph_hluw};

// Core scalar types
pub use crate::{NodeId, NodeOsmId, NodeRank, TripEventTime, WayId};
