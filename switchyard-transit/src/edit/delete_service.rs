//! deletion of transit service by trip selection.

use std::collections::HashSet;

use crate::error::TransitError;
use crate::feed::trips::{route_ids_for_trip_ids, shape_ids_for_trip_ids};
use crate::feed::{Feed, FeedTables};
use crate::network::TransitNetwork;

/// delete the selected trips and, transitively, their stop_times and
/// frequencies. `clean_shapes` and `clean_routes` additionally drop shapes
/// and routes left unused by any remaining trip.
pub fn apply_transit_service_deletion(
    net: &mut TransitNetwork,
    trip_ids: &[String],
    clean_shapes: bool,
    clean_routes: bool,
) -> Result<(), TransitError> {
    log::debug!("deleting {} trips from feed", trip_ids.len());
    let feed = net.feed();
    let mut tables: FeedTables = feed.to_tables();
    let wanted: HashSet<&String> = trip_ids.iter().collect();

    tables.trips.retain(|t| !wanted.contains(&t.trip_id));
    tables.stop_times.retain(|st| !wanted.contains(&st.trip_id));
    tables.frequencies.retain(|f| !wanted.contains(&f.trip_id));

    if clean_shapes {
        let candidates = shape_ids_for_trip_ids(feed.trips(), trip_ids);
        let still_used: HashSet<&String> = tables.trips.iter().map(|t| &t.shape_id).collect();
        let drop: HashSet<&String> =
            candidates.iter().filter(|id| !still_used.contains(id)).collect();
        tables.shapes.retain(|p| !drop.contains(&p.shape_id));
    }
    if clean_routes {
        let candidates = route_ids_for_trip_ids(feed.trips(), trip_ids);
        let still_used: HashSet<&String> = tables.trips.iter().map(|t| &t.route_id).collect();
        let drop: HashSet<&String> =
            candidates.iter().filter(|id| !still_used.contains(id)).collect();
        tables.routes.retain(|r| !drop.contains(&r.route_id));
    }

    net.set_feed(Feed::new(tables)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::feed::testfeed::feed_with_trips;

    #[test]
    fn test_deletion_cascades_to_stop_times_and_frequencies() {
        let mut net = TransitNetwork::new(feed_with_trips(&[
            ("t1", "s1", vec![1, 2, 3]),
            ("t2", "s2", vec![3, 4]),
        ]));
        apply_transit_service_deletion(&mut net, &["t1".to_string()], false, false).unwrap();
        let feed = net.feed();
        assert_eq!(feed.trips().len(), 1);
        assert!(feed.stop_times().iter().all(|st| st.trip_id == "t2"));
        assert!(feed.frequencies().iter().all(|f| f.trip_id == "t2"));
        // shapes and routes retained without the clean flags
        assert!(feed.shapes().iter().any(|p| p.shape_id == "s1"));
    }

    #[test]
    fn test_clean_flags_drop_orphans() {
        let mut net = TransitNetwork::new(feed_with_trips(&[
            ("t1", "s1", vec![1, 2, 3]),
            ("t2", "s2", vec![3, 4]),
        ]));
        apply_transit_service_deletion(&mut net, &["t1".to_string()], true, true).unwrap();
        let feed = net.feed();
        assert!(feed.shapes().iter().all(|p| p.shape_id == "s2"));
        // the route still serves t2 and survives
        assert_eq!(feed.routes().len(), 1);
    }

    #[test]
    fn test_shared_shape_survives_deletion() {
        let mut net = TransitNetwork::new(feed_with_trips(&[
            ("t1", "s1", vec![1, 2, 3]),
            ("t2", "s1", vec![1, 2, 3]),
        ]));
        apply_transit_service_deletion(&mut net, &["t1".to_string()], true, true).unwrap();
        assert!(net.feed().shapes().iter().any(|p| p.shape_id == "s1"));
    }
}
