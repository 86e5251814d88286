//! filters and queries of the trips table.

use std::collections::HashSet;

use itertools::Itertools;

use super::tables::{StopTime, Trip};

/// trip ids using a given shape.
pub fn trip_ids_for_shape_id(trips: &[Trip], shape_id: &str) -> Vec<String> {
    trips
        .iter()
        .filter(|t| t.shape_id == shape_id)
        .map(|t| t.trip_id.clone())
        .collect()
}

/// unique shape ids used by the given trips, in first-seen order.
pub fn shape_ids_for_trip_ids(trips: &[Trip], trip_ids: &[String]) -> Vec<String> {
    let wanted: HashSet<&String> = trip_ids.iter().collect();
    trips
        .iter()
        .filter(|t| wanted.contains(&t.trip_id))
        .map(|t| t.shape_id.clone())
        .unique()
        .collect()
}

/// unique route ids used by the given trips.
pub fn route_ids_for_trip_ids(trips: &[Trip], trip_ids: &[String]) -> Vec<String> {
    let wanted: HashSet<&String> = trip_ids.iter().collect();
    trips
        .iter()
        .filter(|t| wanted.contains(&t.trip_id))
        .map(|t| t.route_id.clone())
        .unique()
        .collect()
}

/// the shape id of a single trip.
pub fn shape_id_for_trip_id(trips: &[Trip], trip_id: &str) -> Option<String> {
    trips
        .iter()
        .find(|t| t.trip_id == trip_id)
        .map(|t| t.shape_id.clone())
}

/// trips referenced by the given stop_times.
pub fn trips_for_stop_times(trips: &[Trip], stop_times: &[StopTime]) -> Vec<Trip> {
    let used: HashSet<&String> = stop_times.iter().map(|st| &st.trip_id).collect();
    trips.iter().filter(|t| used.contains(&t.trip_id)).cloned().collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::feed::testfeed::feed_with_trips;

    #[test]
    fn test_trip_and_shape_lookups() {
        let feed = feed_with_trips(&[
            ("t1", "s1", vec![1, 2, 3]),
            ("t2", "s1", vec![1, 2, 3]),
            ("t3", "s2", vec![3, 4]),
        ]);
        assert_eq!(trip_ids_for_shape_id(feed.trips(), "s1"), vec!["t1", "t2"]);
        assert_eq!(
            shape_ids_for_trip_ids(feed.trips(), &["t1".to_string(), "t3".to_string()]),
            vec!["s1", "s2"]
        );
        assert_eq!(shape_id_for_trip_id(feed.trips(), "t3"), Some("s2".to_string()));
        assert_eq!(shape_id_for_trip_id(feed.trips(), "nope"), None);
    }
}
