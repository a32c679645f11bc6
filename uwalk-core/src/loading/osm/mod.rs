//! OSM pbf processing

mod processor;

pub use processor::osm_to_edges;
