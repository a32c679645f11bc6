//! Partitioning of GTFS trips into scientific routes, and ranking of the
//! routes and of the stops they use.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use hashbrown::HashMap;
use log::{info, warn};

use super::parser::{deserialize_gtfs_file, parse_time};
use super::raw_types::{FeedStop, FeedStopTime, FeedTrip};
use crate::error::Error;
use crate::model::transit::data::GtfsParsedData;
use crate::model::transit::types::{ParsedRoute, ParsedStop, RouteLabel, StopEvent};

/// Create the parsed transit data from a GTFS directory.
///
/// Only `stops.txt`, `trips.txt` and `stop_times.txt` are read; in
/// particular the GTFS `routes.txt` associations are ignored, as the
/// partitioning rebuilds routes from the actual stop sequences.
pub fn gtfs_parsed_data_from_feed(gtfs_folder: &Path) -> Result<GtfsParsedData, Error> {
    info!("Parsing GTFS folder {}", gtfs_folder.display());
    let stops: Vec<FeedStop> = deserialize_gtfs_file(&gtfs_folder.join("stops.txt"))?;
    let trips: Vec<FeedTrip> = deserialize_gtfs_file(&gtfs_folder.join("trips.txt"))?;
    let stop_times: Vec<FeedStopTime> =
        deserialize_gtfs_file(&gtfs_folder.join("stop_times.txt"))?;
    gtfs_parsed_data_from_rows(stops, &trips, stop_times)
}

/// Same as [`gtfs_parsed_data_from_feed`], from already-deserialized rows.
pub fn gtfs_parsed_data_from_rows(
    stops: Vec<FeedStop>,
    trips: &[FeedTrip],
    stop_times: Vec<FeedStopTime>,
) -> Result<GtfsParsedData, Error> {
    let (routes, nb_trips) = partition_trips_in_routes(trips, stop_times)?;

    #[cfg(debug_assertions)]
    check_route_partition_consistency(nb_trips, &routes)?;
    #[cfg(not(debug_assertions))]
    let _ = nb_trips;

    let (ranked_routes, route_to_rank) = rank_routes(&routes);
    let (ranked_stops, stopid_to_rank) = rank_stops(&routes, stops)?;
    info!(
        "GTFS feed has {} scientific routes over {} used stops",
        ranked_routes.len(),
        ranked_stops.len()
    );

    Ok(GtfsParsedData {
        routes,
        ranked_routes,
        route_to_rank,
        ranked_stops,
        stopid_to_rank,
    })
}

type SequencedStopTimes = Vec<(u32, FeedStopTime)>;

/// Groups the trips of the feed by their stop sequence: all the trips
/// serving exactly the same stops end up in the same scientific route,
/// identified by its label. Returns the partition and the trip count.
fn partition_trips_in_routes(
    trips: &[FeedTrip],
    stop_times: Vec<FeedStopTime>,
) -> Result<(BTreeMap<RouteLabel, ParsedRoute>, usize), Error> {
    let mut trip_stop_times: HashMap<String, SequencedStopTimes> = HashMap::new();
    for row in stop_times {
        let sequence = row.stop_sequence.parse::<u32>().map_err(|e| {
            Error::InvalidGtfs(format!(
                "bad stop_sequence '{}' for trip '{}': {e}",
                row.stop_sequence, row.trip_id
            ))
        })?;
        trip_stop_times
            .entry(row.trip_id.clone())
            .or_default()
            .push((sequence, row));
    }
    for rows in trip_stop_times.values_mut() {
        rows.sort_by_key(|(sequence, _)| *sequence);
    }

    let mut trip_ids: Vec<&str> = trips.iter().map(|trip| trip.trip_id.as_str()).collect();
    trip_ids.sort_unstable();
    trip_ids.dedup();

    let mut routes: BTreeMap<RouteLabel, ParsedRoute> = BTreeMap::new();
    for trip_id in &trip_ids {
        let rows = trip_stop_times.get(*trip_id).ok_or_else(|| {
            Error::InvalidGtfs(format!("trip '{trip_id}' has no stop times"))
        })?;
        let label = trip_route_label(trip_id, rows)?;
        let events = trip_events(trip_id, rows)?;
        let first_stop_departure = events[0].1;
        routes
            .entry(label)
            .or_default()
            .trips
            .insert((first_stop_departure, trip_id.to_string()), events);
    }

    for trip_id in trip_stop_times.keys() {
        if trip_ids.binary_search(&trip_id.as_str()).is_err() {
            warn!("stop_times references unknown trip '{trip_id}', ignored");
        }
    }

    Ok((routes, trip_ids.len()))
}

/// The label of a trip's route: its stop ids joined with '+'.
fn trip_route_label(trip_id: &str, rows: &SequencedStopTimes) -> Result<RouteLabel, Error> {
    if rows.len() < 2 {
        return Err(Error::InvalidGtfs(format!(
            "route is too small ({}) for trip '{trip_id}'",
            rows.len()
        )));
    }
    let mut stop_ids = Vec::with_capacity(rows.len());
    for (_, row) in rows {
        if row.stop_id.contains('+') {
            return Err(Error::InvalidGtfs(format!(
                "stop id '{}' contains the label delimiter '+'",
                row.stop_id
            )));
        }
        stop_ids.push(row.stop_id.as_str());
    }
    Ok(RouteLabel(stop_ids.join("+")))
}

fn trip_events(trip_id: &str, rows: &SequencedStopTimes) -> Result<Vec<StopEvent>, Error> {
    let mut events: Vec<StopEvent> = Vec::with_capacity(rows.len());
    for (_, row) in rows {
        let arrival = parse_time(&row.arrival_time)?;
        let departure = parse_time(&row.departure_time)?;

        // verifying that stop times are properly ordered :
        #[cfg(debug_assertions)]
        if let Some(&(_, previous_departure)) = events.last() {
            if departure <= previous_departure {
                return Err(Error::InvalidGtfs(format!(
                    "stop times of trip '{trip_id}' are not properly ordered"
                )));
            }
        }

        events.push((arrival, departure));
    }
    Ok(events)
}

/// The aggregation of the trips of all routes must have exactly as many
/// trips as the feed.
#[cfg(debug_assertions)]
fn check_route_partition_consistency(
    nb_trips_in_feed: usize,
    partition: &BTreeMap<RouteLabel, ParsedRoute>,
) -> Result<(), Error> {
    let nb_trips_in_partitions: usize = partition.values().map(|route| route.trips.len()).sum();
    if nb_trips_in_feed != nb_trips_in_partitions {
        return Err(Error::InvalidGtfs(format!(
            "number of trips after partitioning by route ({nb_trips_in_partitions}) \
             differs from the number of trips in the feed ({nb_trips_in_feed})"
        )));
    }
    Ok(())
}

/// Ranks the partitioned routes: iteration order of the partition (label
/// order) becomes the rank order.
fn rank_routes(
    routes: &BTreeMap<RouteLabel, ParsedRoute>,
) -> (Vec<RouteLabel>, HashMap<RouteLabel, usize>) {
    let mut ranked_routes = Vec::with_capacity(routes.len());
    let mut route_to_rank = HashMap::with_capacity(routes.len());
    for route_label in routes.keys() {
        route_to_rank.insert(route_label.clone(), ranked_routes.len());
        ranked_routes.push(route_label.clone());
    }
    (ranked_routes, route_to_rank)
}

/// Ranks the stops used by at least one route, in stop id order. Stops of
/// the feed that no route uses are dropped.
fn rank_stops(
    routes: &BTreeMap<RouteLabel, ParsedRoute>,
    stops: Vec<FeedStop>,
) -> Result<(Vec<ParsedStop>, HashMap<String, usize>), Error> {
    let mut useful_stop_ids = BTreeSet::new();
    for route_label in routes.keys() {
        useful_stop_ids.extend(route_label.to_stop_ids());
    }

    let mut stops_by_id: HashMap<String, FeedStop> = stops
        .into_iter()
        .map(|stop| (stop.stop_id.clone(), stop))
        .collect();

    let mut ranked_stops = Vec::with_capacity(useful_stop_ids.len());
    let mut stopid_to_rank = HashMap::with_capacity(useful_stop_ids.len());
    for stop_id in useful_stop_ids {
        let feed_stop = stops_by_id.remove(&stop_id).ok_or_else(|| {
            Error::InvalidGtfs(format!("unable to get stop with id '{stop_id}'"))
        })?;
        let latitude = feed_stop.stop_lat.parse::<f64>().map_err(|e| {
            Error::InvalidGtfs(format!("bad stop_lat for stop '{stop_id}': {e}"))
        })?;
        let longitude = feed_stop.stop_lon.parse::<f64>().map_err(|e| {
            Error::InvalidGtfs(format!("bad stop_lon for stop '{stop_id}': {e}"))
        })?;
        stopid_to_rank.insert(stop_id.clone(), ranked_stops.len());
        ranked_stops.push(ParsedStop::new(
            stop_id,
            feed_stop.stop_name,
            latitude,
            longitude,
        ));
    }
    Ok((ranked_stops, stopid_to_rank))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_stop(id: &str, lat: f64, lon: f64) -> FeedStop {
        FeedStop {
            stop_id: id.to_string(),
            stop_name: format!("name of {id}"),
            stop_lat: lat.to_string(),
            stop_lon: lon.to_string(),
        }
    }

    fn feed_trip(id: &str) -> FeedTrip {
        FeedTrip {
            trip_id: id.to_string(),
            ..FeedTrip::default()
        }
    }

    fn feed_stop_time(trip: &str, stop: &str, sequence: u32, time: &str) -> FeedStopTime {
        FeedStopTime {
            trip_id: trip.to_string(),
            arrival_time: time.to_string(),
            departure_time: time.to_string(),
            stop_id: stop.to_string(),
            stop_sequence: sequence.to_string(),
        }
    }

    fn stops_abcd() -> Vec<FeedStop> {
        vec![
            feed_stop("A", 43.731, 7.421),
            feed_stop("B", 43.732, 7.422),
            feed_stop("C", 43.733, 7.423),
            feed_stop("D", 43.734, 7.424),
            feed_stop("unused", 43.735, 7.425),
        ]
    }

    fn trip_rows(trip: &str, stops: &[&str], start: &str) -> Vec<FeedStopTime> {
        let start_seconds = parse_time(start).unwrap();
        stops
            .iter()
            .enumerate()
            .map(|(i, stop)| {
                let t = start_seconds + 120 * i as i32;
                let time = format!("{:02}:{:02}:{:02}", t / 3600, (t / 60) % 60, t % 60);
                feed_stop_time(trip, stop, 1 + i as u32, &time)
            })
            .collect()
    }

    /// Trips serving the same stop sequence share a route; a different
    /// sequence makes a different route.
    #[test]
    fn trips_with_same_stops_share_a_route() {
        let trips = vec![feed_trip("T1"), feed_trip("T2"), feed_trip("T3")];
        let mut stop_times = trip_rows("T1", &["A", "B", "C"], "08:00:00");
        stop_times.extend(trip_rows("T2", &["A", "B", "C"], "09:00:00"));
        stop_times.extend(trip_rows("T3", &["A", "B", "D"], "08:30:00"));

        let gtfs = gtfs_parsed_data_from_rows(stops_abcd(), &trips, stop_times).unwrap();
        assert_eq!(gtfs.routes.len(), 2);
        let abc = &gtfs.routes[&RouteLabel("A+B+C".into())];
        let abd = &gtfs.routes[&RouteLabel("A+B+D".into())];
        let ids = |route: &ParsedRoute| {
            route
                .trips
                .keys()
                .map(|(_, id)| id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(abc), vec!["T1", "T2"]);
        assert_eq!(ids(abd), vec!["T3"]);

        // every trip keeps one event per stop of its route
        for route in gtfs.routes.values() {
            for events in route.trips.values() {
                assert_eq!(events.len(), 3);
            }
        }
    }

    /// Within a route, trips iterate by departure time of their first
    /// stop, whatever the order of the input rows.
    #[test]
    fn trips_are_ordered_by_first_departure() {
        let trips = vec![feed_trip("T1"), feed_trip("T2")];
        let mut stop_times = trip_rows("T1", &["A", "B", "C"], "08:00:00");
        stop_times.extend(trip_rows("T2", &["A", "B", "C"], "07:30:00"));

        let gtfs = gtfs_parsed_data_from_rows(stops_abcd(), &trips, stop_times).unwrap();
        let route = &gtfs.routes[&RouteLabel("A+B+C".into())];
        let ordered: Vec<_> = route.trips.keys().cloned().collect();
        assert_eq!(ordered[0], (parse_time("07:30:00").unwrap(), "T2".to_string()));
        assert_eq!(ordered[1], (parse_time("08:00:00").unwrap(), "T1".to_string()));
    }

    /// Routes are ranked by label order, stops by id order; unused stops
    /// are dropped; reverse mappings match.
    #[test]
    fn routes_and_stops_are_ranked_consistently() {
        let trips = vec![feed_trip("T1"), feed_trip("T3")];
        let mut stop_times = trip_rows("T1", &["B", "A"], "08:00:00");
        stop_times.extend(trip_rows("T3", &["A", "B", "D"], "08:30:00"));

        let gtfs = gtfs_parsed_data_from_rows(stops_abcd(), &trips, stop_times).unwrap();
        assert_eq!(
            gtfs.ranked_routes,
            vec![RouteLabel("A+B+D".into()), RouteLabel("B+A".into())]
        );
        for (rank, label) in gtfs.ranked_routes.iter().enumerate() {
            assert_eq!(gtfs.route_rank(label), Some(rank));
        }

        let ranked_ids: Vec<_> = gtfs.ranked_stops.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ranked_ids, vec!["A", "B", "D"]);
        for (rank, stop) in gtfs.ranked_stops.iter().enumerate() {
            assert_eq!(gtfs.stop_rank(&stop.id), Some(rank));
        }

        // every ranked stop appears in at least one label
        for stop in &gtfs.ranked_stops {
            assert!(gtfs
                .ranked_routes
                .iter()
                .any(|label| label.to_stop_ids().contains(&stop.id)));
        }
    }

    #[test]
    fn a_trip_with_a_single_stop_is_fatal() {
        let trips = vec![feed_trip("T1")];
        let stop_times = vec![feed_stop_time("T1", "A", 1, "08:00:00")];
        let err = gtfs_parsed_data_from_rows(stops_abcd(), &trips, stop_times).unwrap_err();
        assert!(err.to_string().contains("T1"));
    }

    #[test]
    fn a_route_stop_missing_from_the_feed_is_fatal() {
        let trips = vec![feed_trip("T1")];
        let stop_times = trip_rows("T1", &["A", "Z"], "08:00:00");
        let err = gtfs_parsed_data_from_rows(stops_abcd(), &trips, stop_times).unwrap_err();
        assert!(err.to_string().contains("'Z'"));
    }

    #[test]
    fn a_stop_id_with_the_delimiter_is_fatal() {
        let trips = vec![feed_trip("T1")];
        let stop_times = trip_rows("T1", &["A", "B+C"], "08:00:00");
        let err = gtfs_parsed_data_from_rows(stops_abcd(), &trips, stop_times).unwrap_err();
        assert!(err.to_string().contains("delimiter"));
    }

    #[test]
    fn stop_coordinates_come_out_trimmed() {
        let trips = vec![feed_trip("T1")];
        let mut stops = stops_abcd();
        stops[0].stop_lat = "43.7312345678901".to_string();
        let stop_times = trip_rows("T1", &["A", "B"], "08:00:00");
        let gtfs = gtfs_parsed_data_from_rows(stops, &trips, stop_times).unwrap();
        assert_eq!(gtfs.ranked_stops[0].latitude, 43.731234568);
    }
}
