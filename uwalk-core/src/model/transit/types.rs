//! Structures describing a parsed GTFS feed.
//!
//! Beware of the two mismatching definitions of the word "route":
//! - the scientific literature calls "route" a set of trips serving
//!   exactly the same sequence of stops;
//! - the GTFS standard attaches an arbitrary `route_id` to each trip, and
//!   two trips with the same `route_id` may serve different stops.
//!
//! Everything here deals with scientific routes; GTFS route ids are never
//! used.

use std::collections::BTreeMap;
use std::fmt;

use crate::model::walking::components::approx_equal;
use crate::TripEventTime;

/// Identity of a scientific route: the concatenation of its stop ids,
/// joined with `'+'` (e.g. `32+33+34+122`). Two trips have the same label
/// iff they serve exactly the same sequence of stops.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RouteLabel(pub String);

impl RouteLabel {
    /// Builds back the ordered list of stop ids the label was made of.
    pub fn to_stop_ids(&self) -> Vec<String> {
        self.0.split('+').map(str::to_string).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Orders the trips of a route by departure time of their first stop,
/// then by trip id to break ties.
pub type OrderableTripId = (TripEventTime, String);

/// Arrival and departure times at one stop of one trip.
pub type StopEvent = (TripEventTime, TripEventTime);

/// The trips of a scientific route and their events, ordered by
/// [`OrderableTripId`]. Every event vector has exactly as many entries as
/// the route has stops.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedRoute {
    pub trips: BTreeMap<OrderableTripId, Vec<StopEvent>>,
}

// There is a slight rounding error in json serialization/deserialization
// of coordinates. Limiting the decimal places makes deserialized data
// binary identical, with no effect on coordinate precision.
const TRIMMING_FACTOR: f64 = 1e9;

fn trim(x: f64) -> f64 {
    (x * TRIMMING_FACTOR).round() / TRIMMING_FACTOR
}

/// A stop as used by the routing preprocessing: id, name, coordinates.
#[derive(Debug, Clone)]
pub struct ParsedStop {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl ParsedStop {
    pub fn new(id: String, name: String, latitude: f64, longitude: f64) -> Self {
        ParsedStop {
            id,
            name,
            latitude: trim(latitude),
            longitude: trim(longitude),
        }
    }
}

impl PartialEq for ParsedStop {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && approx_equal(self.longitude, other.longitude)
            && approx_equal(self.latitude, other.latitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_roundtrips_to_stop_ids() {
        let label = RouteLabel("32+33+34+122+123".to_string());
        assert_eq!(label.to_stop_ids(), vec!["32", "33", "34", "122", "123"]);
    }

    #[test]
    fn labels_order_lexicographically() {
        let mut labels = vec![
            RouteLabel("B+A".into()),
            RouteLabel("A+B+C".into()),
            RouteLabel("A+B".into()),
        ];
        labels.sort();
        assert_eq!(
            labels.iter().map(RouteLabel::as_str).collect::<Vec<_>>(),
            vec!["A+B", "A+B+C", "B+A"]
        );
    }

    #[test]
    fn orderable_trip_ids_order_by_departure_then_id() {
        let mut trips = vec![
            (28800, "trip-x".to_string()),
            (27000, "trip-z".to_string()),
            (28800, "trip-a".to_string()),
        ];
        trips.sort();
        assert_eq!(trips[0].1, "trip-z");
        assert_eq!(trips[1].1, "trip-a");
        assert_eq!(trips[2].1, "trip-x");
    }

    #[test]
    fn stop_coordinates_are_trimmed_on_construction() {
        let stop = ParsedStop::new("id".into(), "name".into(), 43.123456789123, 7.98765432155);
        assert_eq!(stop.latitude, 43.123456789);
        assert_eq!(stop.longitude, 7.987654322);
    }
}
