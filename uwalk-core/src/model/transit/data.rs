//! Parsed GTFS feed, partitioned into scientific routes and ranked.
//!
//! Only stops that appear in at least one trip are kept. Routes and stops
//! both get a dense rank in `[0, N)`; a route (or stop) can be identified
//! either by its label (or id) or by its rank, and the conversion
//! structures allow going back and forth.

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::model::transit::types::{ParsedRoute, ParsedStop, RouteLabel};
use crate::model::walking::components::Stop;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GtfsParsedData {
    pub routes: BTreeMap<RouteLabel, ParsedRoute>,

    /// `ranked_routes[rank]` is the label of the route of that rank.
    pub ranked_routes: Vec<RouteLabel>,
    /// Reverse mapping of `ranked_routes`.
    pub route_to_rank: HashMap<RouteLabel, usize>,

    /// `ranked_stops[rank]` is the stop of that rank.
    pub ranked_stops: Vec<ParsedStop>,
    /// Reverse mapping of `ranked_stops`.
    pub stopid_to_rank: HashMap<String, usize>,
}

impl GtfsParsedData {
    pub fn route_rank(&self, label: &RouteLabel) -> Option<usize> {
        self.route_to_rank.get(label).copied()
    }

    pub fn stop_rank(&self, stop_id: &str) -> Option<usize> {
        self.stopid_to_rank.get(stop_id).copied()
    }

    /// The ranked stops, converted for the walking-graph pass. The
    /// conversion keeps the stop order, so walking-graph stop ranks match
    /// the GTFS stop ranks.
    pub fn walking_stops(&self) -> Vec<Stop> {
        self.ranked_stops
            .iter()
            .map(|stop| Stop {
                lon: stop.longitude,
                lat: stop.latitude,
                id: stop.id.clone(),
                name: stop.name.clone(),
            })
            .collect()
    }
}
