//! filters and queries of the routes table.

use std::collections::HashSet;

use super::tables::{Route, Trip};

/// routes referenced by the given trips.
pub fn routes_for_trips(routes: &[Route], trips: &[Trip]) -> Vec<Route> {
    let used: HashSet<&String> = trips.iter().map(|t| &t.route_id).collect();
    routes.iter().filter(|r| used.contains(&r.route_id)).cloned().collect()
}
