//! Parsed transit feed model

pub mod data;
pub mod types;

pub use data::GtfsParsedData;
pub use types::{OrderableTripId, ParsedRoute, ParsedStop, RouteLabel, StopEvent};
