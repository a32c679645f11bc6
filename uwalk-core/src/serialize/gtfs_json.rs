//! JSON serialization of the parsed GTFS data.
//!
//! The route partition is an ordered map, so it is serialized as an array
//! of `[key, value]` pairs (same for the trips of each route); plain JSON
//! objects would lose the iteration order that ranking relies on.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use hashbrown::HashMap;
use serde_json::{json, Value};

use crate::error::Error;
use crate::model::transit::data::GtfsParsedData;
use crate::model::transit::types::{ParsedRoute, ParsedStop, RouteLabel, StopEvent};
use crate::TripEventTime;

fn gtfs_to_json(gtfs: &GtfsParsedData) -> Value {
    let ranked_routes: Vec<Value> = gtfs
        .ranked_routes
        .iter()
        .map(|label| json!(label.as_str()))
        .collect();

    let ranked_stops: Vec<Value> = gtfs
        .ranked_stops
        .iter()
        .map(|stop| {
            json!({
                "latitude": stop.latitude,
                "longitude": stop.longitude,
                "id": stop.id,
                "name": stop.name,
            })
        })
        .collect();

    let routes: Vec<Value> = gtfs
        .routes
        .iter()
        .map(|(label, route)| {
            let trips: Vec<Value> = route
                .trips
                .iter()
                .map(|((first_departure, trip_id), events)| {
                    let events: Vec<Value> = events
                        .iter()
                        .map(|(arrival, departure)| json!([arrival, departure]))
                        .collect();
                    json!([[first_departure, trip_id], events])
                })
                .collect();
            json!([label.as_str(), trips])
        })
        .collect();

    json!({
        "ranked_routes": ranked_routes,
        "ranked_stops": ranked_stops,
        "routes": routes,
    })
}

pub fn serialize_gtfs<W: Write>(gtfs: &GtfsParsedData, mut out: W) -> Result<(), Error> {
    serde_json::to_writer_pretty(&mut out, &gtfs_to_json(gtfs))?;
    out.flush()?;
    Ok(())
}

pub fn gtfs_to_string(gtfs: &GtfsParsedData) -> Result<String, Error> {
    Ok(serde_json::to_string_pretty(&gtfs_to_json(gtfs))?)
}

pub fn unserialize_gtfs<R: Read>(mut input: R) -> Result<GtfsParsedData, Error> {
    let mut raw = String::new();
    input.read_to_string(&mut raw)?;
    parse_gtfs(&raw)
}

/// Serializing, re-parsing and serializing again must give back the same
/// bytes and an equal structure.
pub fn check_gtfs_serialization_idempotent(gtfs: &GtfsParsedData) -> Result<(), Error> {
    let first = gtfs_to_string(gtfs)?;
    let deserialized = parse_gtfs(&first)?;
    if deserialized != *gtfs {
        return Err(Error::RoundTrip(
            "deserialized gtfs data differs from the original".to_string(),
        ));
    }
    let second = gtfs_to_string(&deserialized)?;
    if first != second {
        return Err(Error::RoundTrip(
            "gtfs serialization is not byte-identical after a round-trip".to_string(),
        ));
    }
    Ok(())
}

fn assert_json_format(condition: bool, description: &str) -> Result<(), Error> {
    if condition {
        Ok(())
    } else {
        Err(Error::GtfsFormat(description.to_string()))
    }
}

fn as_pair<'a>(value: &'a Value, what: &str) -> Result<(&'a Value, &'a Value), Error> {
    let pair = value
        .as_array()
        .ok_or_else(|| Error::GtfsFormat(format!("{what} is not an array")))?;
    assert_json_format(pair.len() == 2, &format!("{what} should have 2 elements"))?;
    Ok((&pair[0], &pair[1]))
}

fn as_int(value: &Value, what: &str) -> Result<TripEventTime, Error> {
    let wide = value
        .as_i64()
        .ok_or_else(|| Error::GtfsFormat(format!("{what} should be an int")))?;
    TripEventTime::try_from(wide)
        .map_err(|_| Error::GtfsFormat(format!("{what} is out of range")))
}

fn parse_gtfs(raw: &str) -> Result<GtfsParsedData, Error> {
    let doc: Value = serde_json::from_str(raw)
        .map_err(|e| Error::GtfsFormat(format!("not valid JSON: {e}")))?;
    assert_json_format(doc.is_object(), "doc is not an object")?;

    // ranked_routes
    let ranked_routes_json = doc
        .get("ranked_routes")
        .ok_or_else(|| Error::GtfsFormat("doc has no 'ranked_routes'".to_string()))?
        .as_array()
        .ok_or_else(|| Error::GtfsFormat("'ranked_routes' is not an array".to_string()))?;
    let mut ranked_routes = Vec::with_capacity(ranked_routes_json.len());
    let mut route_to_rank = HashMap::with_capacity(ranked_routes_json.len());
    for label_json in ranked_routes_json {
        let label = label_json
            .as_str()
            .ok_or_else(|| Error::GtfsFormat("label is not a string".to_string()))?;
        let label = RouteLabel(label.to_string());
        route_to_rank.insert(label.clone(), ranked_routes.len());
        ranked_routes.push(label);
    }

    // ranked_stops
    let ranked_stops_json = doc
        .get("ranked_stops")
        .ok_or_else(|| Error::GtfsFormat("doc has no 'ranked_stops'".to_string()))?
        .as_array()
        .ok_or_else(|| Error::GtfsFormat("'ranked_stops' is not an array".to_string()))?;
    let mut ranked_stops = Vec::with_capacity(ranked_stops_json.len());
    let mut stopid_to_rank = HashMap::with_capacity(ranked_stops_json.len());
    for stop_json in ranked_stops_json {
        assert_json_format(stop_json.is_object(), "stop is not an object")?;
        let field = |name: &str| -> Result<&Value, Error> {
            stop_json
                .get(name)
                .ok_or_else(|| Error::GtfsFormat(format!("stop has no '{name}'")))
        };
        let latitude = field("latitude")?
            .as_f64()
            .ok_or_else(|| Error::GtfsFormat("'latitude' is not a double".to_string()))?;
        let longitude = field("longitude")?
            .as_f64()
            .ok_or_else(|| Error::GtfsFormat("'longitude' is not a double".to_string()))?;
        let id = field("id")?
            .as_str()
            .ok_or_else(|| Error::GtfsFormat("'id' is not a string".to_string()))?;
        let name = field("name")?
            .as_str()
            .ok_or_else(|| Error::GtfsFormat("'name' is not a string".to_string()))?;

        stopid_to_rank.insert(id.to_string(), ranked_stops.len());
        ranked_stops.push(ParsedStop::new(
            id.to_string(),
            name.to_string(),
            latitude,
            longitude,
        ));
    }

    // routes, an array of [label, trips] pairs
    let routes_json = doc
        .get("routes")
        .ok_or_else(|| Error::GtfsFormat("doc has no 'routes'".to_string()))?
        .as_array()
        .ok_or_else(|| Error::GtfsFormat("'routes' is not an array".to_string()))?;
    let mut routes: BTreeMap<RouteLabel, ParsedRoute> = BTreeMap::new();
    for route_pair_json in routes_json {
        let (label_json, trips_json) = as_pair(route_pair_json, "route pair")?;
        let label = label_json
            .as_str()
            .ok_or_else(|| Error::GtfsFormat("label is not a string".to_string()))?;

        let trips_json = trips_json
            .as_array()
            .ok_or_else(|| Error::GtfsFormat("trips is not an array".to_string()))?;
        let mut route = ParsedRoute::default();
        for trip_pair_json in trips_json {
            // trip key, an [first_departure, trip_id] pair
            let (trip_key_json, events_json) = as_pair(trip_pair_json, "trip pair")?;
            let (first_departure_json, trip_id_json) =
                as_pair(trip_key_json, "orderable trip id")?;
            let first_departure = as_int(first_departure_json, "first departure")?;
            let trip_id = trip_id_json
                .as_str()
                .ok_or_else(|| Error::GtfsFormat("trip id should be a string".to_string()))?;

            let events_json = events_json
                .as_array()
                .ok_or_else(|| Error::GtfsFormat("stop events is not an array".to_string()))?;
            let mut events: Vec<StopEvent> = Vec::with_capacity(events_json.len());
            for event_pair_json in events_json {
                let (arrival_json, departure_json) = as_pair(event_pair_json, "event pair")?;
                events.push((
                    as_int(arrival_json, "arrival")?,
                    as_int(departure_json, "departure")?,
                ));
            }
            route
                .trips
                .insert((first_departure, trip_id.to_string()), events);
        }
        routes.insert(RouteLabel(label.to_string()), route);
    }

    Ok(GtfsParsedData {
        routes,
        ranked_routes,
        route_to_rank,
        ranked_stops,
        stopid_to_rank,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::gtfs::{gtfs_parsed_data_from_rows, FeedStop, FeedStopTime, FeedTrip};

    fn sample_gtfs() -> GtfsParsedData {
        let stops = vec![
            FeedStop {
                stop_id: "A".into(),
                stop_name: "Albert 1er".into(),
                stop_lat: "43.7312345678".into(),
                stop_lon: "7.4212345678".into(),
            },
            FeedStop {
                stop_id: "B".into(),
                stop_name: "Beaumont".into(),
                stop_lat: "43.7322".into(),
                stop_lon: "7.4222".into(),
            },
        ];
        let trips = vec![
            FeedTrip {
                trip_id: "T1".into(),
                ..FeedTrip::default()
            },
            FeedTrip {
                trip_id: "T2".into(),
                ..FeedTrip::default()
            },
        ];
        let row = |trip: &str, stop: &str, seq: u32, arrival: &str, departure: &str| FeedStopTime {
            trip_id: trip.into(),
            arrival_time: arrival.into(),
            departure_time: departure.into(),
            stop_id: stop.into(),
            stop_sequence: seq.to_string(),
        };
        let stop_times = vec![
            row("T1", "A", 1, "08:00:00", "08:01:00"),
            row("T1", "B", 2, "08:10:00", "08:11:00"),
            row("T2", "A", 1, "07:30:00", "07:31:00"),
            row("T2", "B", 2, "07:40:00", "07:41:00"),
        ];
        gtfs_parsed_data_from_rows(stops, &trips, stop_times).unwrap()
    }

    /// Serialize, parse, serialize again: the two dumps are identical and
    /// the parsed structure equals the original.
    #[test]
    fn serialization_round_trips() {
        let gtfs = sample_gtfs();
        check_gtfs_serialization_idempotent(&gtfs).unwrap();

        let dumped = gtfs_to_string(&gtfs).unwrap();
        let reparsed = parse_gtfs(&dumped).unwrap();
        assert_eq!(reparsed, gtfs);
        assert_eq!(gtfs_to_string(&reparsed).unwrap(), dumped);
    }

    #[test]
    fn document_shape_preserves_map_order() {
        let gtfs = sample_gtfs();
        let doc: Value = serde_json::from_str(&gtfs_to_string(&gtfs).unwrap()).unwrap();

        assert_eq!(doc["ranked_routes"], json!(["A+B"]));
        assert_eq!(doc["ranked_stops"][0]["id"], "A");
        assert_eq!(doc["ranked_stops"][0]["name"], "Albert 1er");

        let route = &doc["routes"][0];
        assert_eq!(route[0], "A+B");
        // T2 leaves earlier, so it comes first in the trips array
        let trips = route[1].as_array().unwrap();
        assert_eq!(trips[0][0][1], "T2");
        assert_eq!(trips[1][0][1], "T1");
        // events are [arrival, departure] pairs
        assert_eq!(trips[0][1][0], json!([27000, 27060]));
    }

    #[test]
    fn schema_violations_name_the_field() {
        let gtfs = sample_gtfs();
        let dumped = gtfs_to_string(&gtfs).unwrap();

        let err = parse_gtfs(&dumped.replace("\"ranked_routes\"", "\"rr\"")).unwrap_err();
        assert!(err.to_string().contains("'ranked_routes'"));

        let err = parse_gtfs(&dumped.replace("\"latitude\"", "\"lat\"")).unwrap_err();
        assert!(err.to_string().contains("'latitude'"));

        let err = parse_gtfs("[]").unwrap_err();
        assert!(err.to_string().contains("doc"));
    }
}
