//! filters and queries of the stop_times table.

use std::collections::{HashMap, HashSet};

use super::shapes::node_pattern_for_shape_id;
use super::tables::{ShapePoint, StopTime, Trip};
use super::trips::shape_id_for_trip_id;

/// stop_times for a trip, ordered by stop_sequence.
pub fn stop_times_for_trip_id(stop_times: &[StopTime], trip_id: &str) -> Vec<StopTime> {
    let mut rows: Vec<StopTime> = stop_times
        .iter()
        .filter(|st| st.trip_id == trip_id)
        .cloned()
        .collect();
    rows.sort_by_key(|st| st.stop_sequence);
    rows
}

/// the ordered stop node pattern of a trip.
pub fn stop_pattern_for_trip_id(stop_times: &[StopTime], trip_id: &str) -> Vec<i64> {
    stop_times_for_trip_id(stop_times, trip_id)
        .iter()
        .map(|st| st.stop_id)
        .collect()
}

/// stop counts per trip.
pub fn stop_count_by_trip(stop_times: &[StopTime]) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for stop_time in stop_times {
        *counts.entry(stop_time.trip_id.clone()).or_insert(0) += 1;
    }
    counts
}

/// retain only stop_times of trips with at least `min_stops` rows.
pub fn stop_times_for_min_stops(stop_times: &[StopTime], min_stops: usize) -> Vec<StopTime> {
    let counts = stop_count_by_trip(stop_times);
    stop_times
        .iter()
        .filter(|st| counts.get(&st.trip_id).copied().unwrap_or(0) >= min_stops)
        .cloned()
        .collect()
}

/// stop_times at any of the given stops.
pub fn stop_times_for_stops(stop_times: &[StopTime], stop_ids: &HashSet<i64>) -> Vec<StopTime> {
    stop_times
        .iter()
        .filter(|st| stop_ids.contains(&st.stop_id))
        .cloned()
        .collect()
}

/// retain stop_times whose stop node is visited by the trip's (possibly
/// clipped) shape.
pub fn stop_times_for_shapes(
    stop_times: &[StopTime],
    shapes: &[ShapePoint],
    trips: &[Trip],
) -> Vec<StopTime> {
    let mut shape_nodes_by_trip: HashMap<&str, HashSet<i64>> = HashMap::new();
    for trip in trips {
        let nodes: HashSet<i64> =
            node_pattern_for_shape_id(shapes, &trip.shape_id).into_iter().collect();
        shape_nodes_by_trip.insert(&trip.trip_id, nodes);
    }
    stop_times
        .iter()
        .filter(|st| {
            shape_nodes_by_trip
                .get(st.trip_id.as_str())
                .map(|nodes| nodes.contains(&st.stop_id))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// renumber stop_sequence contiguously from 1, preserving row order.
pub fn renumber_stop_sequence(stop_times: &mut [StopTime]) {
    for (i, stop_time) in stop_times.iter_mut().enumerate() {
        stop_time.stop_sequence = i as u32 + 1;
    }
}

/// the shape of a trip, with each point labeled with the trip's stop node if
/// the point is a stop. used for snapping routing bounds to stops.
pub fn shape_with_stops_for_trip_id(
    shapes: &[ShapePoint],
    trips: &[Trip],
    stop_times: &[StopTime],
    trip_id: &str,
) -> Vec<(ShapePoint, bool)> {
    let Some(shape_id) = shape_id_for_trip_id(trips, trip_id) else {
        return vec![];
    };
    let stop_nodes: HashSet<i64> = stop_times
        .iter()
        .filter(|st| st.trip_id == trip_id)
        .map(|st| st.stop_id)
        .collect();
    let mut points: Vec<&ShapePoint> =
        shapes.iter().filter(|p| p.shape_id == shape_id).collect();
    points.sort_by_key(|p| p.shape_pt_sequence);
    points
        .into_iter()
        .map(|p| (p.clone(), stop_nodes.contains(&p.shape_model_node_id)))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::feed::testfeed::feed_with_trips;

    #[test]
    fn test_stop_times_sorted_and_counted() {
        let feed = feed_with_trips(&[("t1", "s1", vec![1, 2, 3]), ("t2", "s2", vec![1, 5])]);
        assert_eq!(stop_pattern_for_trip_id(feed.stop_times(), "t1"), vec![1, 2, 3]);
        assert_eq!(stop_count_by_trip(feed.stop_times())["t2"], 2);
    }

    #[test]
    fn test_min_stops_filter() {
        let feed = feed_with_trips(&[("t1", "s1", vec![1, 2, 3]), ("t2", "s2", vec![1, 5])]);
        let one_stop: Vec<StopTime> = feed
            .stop_times()
            .iter()
            .filter(|st| !(st.trip_id == "t2" && st.stop_id == 5))
            .cloned()
            .collect();
        let kept = stop_times_for_min_stops(&one_stop, 2);
        assert!(kept.iter().all(|st| st.trip_id == "t1"));
    }

    #[test]
    fn test_shape_with_stops_flags_stop_nodes() {
        let feed = feed_with_trips(&[("t1", "s1", vec![1, 2, 3])]);
        let mut shapes = feed.shapes().to_vec();
        // add a pass-through point between 2 and 3
        for point in shapes.iter_mut() {
            if point.shape_pt_sequence == 3 {
                point.shape_pt_sequence = 4;
            }
        }
        shapes.push(ShapePoint {
            shape_id: "s1".to_string(),
            shape_pt_sequence: 3,
            shape_model_node_id: 99,
            shape_pt_lat: None,
            shape_pt_lon: None,
            projects: String::new(),
        });
        let labeled = shape_with_stops_for_trip_id(&shapes, feed.trips(), feed.stop_times(), "t1");
        assert_eq!(labeled.len(), 4);
        assert!(labeled[1].1, "node 2 is a stop");
        assert!(!labeled[2].1, "node 99 is a pass-through");
    }
}
