//! Pedestrian graph model

pub mod components;
pub mod graph;

pub use components::{Edge, RankedEdge, Stop, StopWithClosestNode};
pub use graph::WalkingGraph;
