//! Data model for the walking graph and the parsed transit feed

pub mod transit;
pub mod walking;

pub use transit::data::GtfsParsedData;
pub use transit::types::{OrderableTripId, ParsedRoute, ParsedStop, RouteLabel, StopEvent};
pub use walking::components::{Edge, RankedEdge, Stop, StopWithClosestNode};
pub use walking::graph::WalkingGraph;
