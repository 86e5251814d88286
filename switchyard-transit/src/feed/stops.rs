//! filters and queries of the stops table.

use std::collections::HashSet;

use super::tables::{Stop, StopTime};

/// stops referenced by the given stop_times.
pub fn stops_for_stop_times(stops: &[Stop], stop_times: &[StopTime]) -> Vec<Stop> {
    let used: HashSet<i64> = stop_times.iter().map(|st| st.stop_id).collect();
    stops.iter().filter(|s| used.contains(&s.stop_id)).cloned().collect()
}

/// true if the node is a stop for the given trip.
pub fn node_is_stop(stop_times: &[StopTime], node_id: i64, trip_id: &str) -> bool {
    stop_times
        .iter()
        .any(|st| st.trip_id == trip_id && st.stop_id == node_id)
}
