//! filters and queries of the frequencies table.

use std::collections::HashSet;

use super::tables::{Frequency, Trip};
use switchyard_core::time::Timespan;

/// frequencies referenced by the given trips.
pub fn frequencies_for_trips(frequencies: &[Frequency], trips: &[Trip]) -> Vec<Frequency> {
    let used: HashSet<&String> = trips.iter().map(|t| &t.trip_id).collect();
    frequencies
        .iter()
        .filter(|f| used.contains(&f.trip_id))
        .cloned()
        .collect()
}

/// true if a frequency's service window overlaps any of the query timespans.
pub fn frequency_overlaps_timespans(frequency: &Frequency, timespans: &[Timespan]) -> bool {
    let window = Timespan::new(frequency.start_time, frequency.end_time);
    timespans.iter().any(|ts| ts.overlaps(&window))
}

/// trip ids with a frequency overlapping any of the query timespans.
pub fn trip_ids_for_timespans(frequencies: &[Frequency], timespans: &[Timespan]) -> HashSet<String> {
    frequencies
        .iter()
        .filter(|f| frequency_overlaps_timespans(f, timespans))
        .map(|f| f.trip_id.clone())
        .collect()
}
