//! GTFS feed parsing and partitioning into scientific routes

mod parser;
mod processor;
mod raw_types;

pub use parser::{deserialize_gtfs_file, parse_time};
pub use processor::{gtfs_parsed_data_from_feed, gtfs_parsed_data_from_rows};
pub use raw_types::{FeedStop, FeedStopTime, FeedTrip};
