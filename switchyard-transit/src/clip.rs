//! clipping a transit feed to a roadway subset or geographic boundary.
//!
//! clipping is a pure function from a feed (plus a selector) to a new,
//! independent feed: trips keep the longest contiguous run of their shape
//! that survives the clip, and are retained only when enough of their stops
//! survive.

use std::collections::HashSet;

use geo::{Intersects, Line, Polygon};

use crate::error::TransitError;
use crate::feed::frequencies::frequencies_for_trips;
use crate::feed::routes::routes_for_trips;
use crate::feed::segments::{shapes_for_road_links, shapes_to_shape_links};
use crate::feed::shapes::shapes_for_trips;
use crate::feed::stop_times::{stop_times_for_min_stops, stop_times_for_shapes, stop_times_for_stops};
use crate::feed::stops::stops_for_stop_times;
use crate::feed::trips::trips_for_stop_times;
use crate::feed::{Feed, FeedTables};
use switchyard_roadway::{RoadNode, RoadwayNetwork};

/// minimum number of stops needed to retain a transit trip within a clipped
/// area.
pub const DEFAULT_MIN_STOPS: usize = 2;

/// clip a feed to a set of roadway node ids. stops outside the set are
/// dropped, trips are retained when at least `min_stops` of their stops
/// survive, and shapes are restricted to the surviving nodes.
pub fn clip_feed_to_nodes(
    feed: &Feed,
    node_ids: &[i64],
    min_stops: usize,
) -> Result<Feed, TransitError> {
    log::info!("clipping transit feed to {} node ids", node_ids.len());
    let keep_nodes: HashSet<i64> = node_ids.iter().copied().collect();

    let kept_stop_ids: HashSet<i64> = feed
        .stops()
        .iter()
        .map(|s| s.stop_id)
        .filter(|id| keep_nodes.contains(id))
        .collect();
    let clipped_stop_times = stop_times_for_stops(feed.stop_times(), &kept_stop_ids);
    let stop_times = stop_times_for_min_stops(&clipped_stop_times, min_stops);
    log::debug!("keeping {}/{} stop_times", stop_times.len(), feed.stop_times().len());

    let stops = stops_for_stop_times(feed.stops(), &stop_times);
    let trips = trips_for_stop_times(feed.trips(), &stop_times);
    let routes = routes_for_trips(feed.routes(), &trips);
    let frequencies = frequencies_for_trips(feed.frequencies(), &trips);
    let shapes: Vec<_> = shapes_for_trips(feed.shapes(), &trips)
        .into_iter()
        .filter(|p| keep_nodes.contains(&p.shape_model_node_id))
        .collect();

    Feed::new(FeedTables {
        agencies: feed.agencies().to_vec(),
        routes,
        trips,
        shapes,
        stops,
        stop_times,
        frequencies,
    })
}

/// clip a feed to a roadway network: each shape keeps its longest contiguous
/// run of consecutive node pairs that exist as roadway links, and trips keep
/// the stops visited by that run.
pub fn clip_feed_to_roadway(
    feed: &Feed,
    roadway_net: &RoadwayNetwork,
    min_stops: usize,
) -> Result<Feed, TransitError> {
    log::info!("clipping transit feed to roadway network");
    let road_links: HashSet<(i64, i64)> =
        roadway_net.links().iter().map(|l| (l.a, l.b)).collect();

    let valid_shapes = shapes_for_road_links(feed.shapes(), &road_links);
    let valid_shape_ids: HashSet<&String> = valid_shapes.iter().map(|p| &p.shape_id).collect();

    let trips_for_valid_shapes: Vec<_> = feed
        .trips()
        .iter()
        .filter(|t| valid_shape_ids.contains(&t.shape_id))
        .cloned()
        .collect();
    let trip_ids: HashSet<&String> =
        trips_for_valid_shapes.iter().map(|t| &t.trip_id).collect();
    let stop_times_for_valid_trips: Vec<_> = feed
        .stop_times()
        .iter()
        .filter(|st| trip_ids.contains(&st.trip_id))
        .cloned()
        .collect();

    let valid_stop_times =
        stop_times_for_shapes(&stop_times_for_valid_trips, &valid_shapes, &trips_for_valid_shapes);
    let stop_times = stop_times_for_min_stops(&valid_stop_times, min_stops);
    log::debug!("keeping {}/{} stop_times", stop_times.len(), feed.stop_times().len());

    // reselect trips and shapes so trips that kept too few stops drop out
    let trips = trips_for_stop_times(&trips_for_valid_shapes, &stop_times);
    let shapes = shapes_for_trips(&valid_shapes, &trips);
    let stops = stops_for_stop_times(feed.stops(), &stop_times);
    let routes = routes_for_trips(feed.routes(), &trips);
    let frequencies = frequencies_for_trips(feed.frequencies(), &trips);

    Feed::new(FeedTables {
        agencies: feed.agencies().to_vec(),
        routes,
        trips,
        shapes,
        stops,
        stop_times,
        frequencies,
    })
}

/// clip a feed to a geographic boundary: shape links intersecting the
/// boundary polygon (located through the reference nodes) select the node
/// set to clip to.
pub fn clip_feed_to_boundary(
    feed: &Feed,
    ref_nodes: &[RoadNode],
    boundary: &Polygon<f64>,
    min_stops: usize,
) -> Result<Feed, TransitError> {
    log::info!("clipping transit feed to boundary");
    let coords: std::collections::HashMap<i64, (f64, f64)> = ref_nodes
        .iter()
        .map(|n| (n.model_node_id, (n.x, n.y)))
        .collect();

    let mut keep_nodes: HashSet<i64> = HashSet::new();
    for link in shapes_to_shape_links(feed.shapes()) {
        let (Some(from), Some(to)) = (coords.get(&link.a), coords.get(&link.b)) else {
            continue;
        };
        let segment = Line::new((from.0, from.1), (to.0, to.1));
        if segment.intersects(boundary) {
            keep_nodes.insert(link.a);
            keep_nodes.insert(link.b);
        }
    }
    if keep_nodes.is_empty() {
        return Err(TransitError::TransitSelectionEmpty(
            "no shape nodes found within the boundary".to_string(),
        ));
    }
    log::debug!("clipping feed to {} nodes within boundary", keep_nodes.len());
    let node_ids: Vec<i64> = keep_nodes.into_iter().collect();
    clip_feed_to_nodes(feed, &node_ids, min_stops)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::feed::testfeed::feed_with_trips;
    use geo::polygon;
    use switchyard_roadway::RoadLink;

    #[test]
    fn test_clip_to_nodes_drops_short_trips() {
        let feed = feed_with_trips(&[("a", "s1", vec![1, 2, 3]), ("b", "s2", vec![1, 5])]);
        let clipped = clip_feed_to_nodes(&feed, &[1, 2, 3], DEFAULT_MIN_STOPS).unwrap();
        assert_eq!(clipped.trips().len(), 1);
        assert_eq!(clipped.trips()[0].trip_id, "a");
        assert_eq!(
            clipped.stop_times().iter().map(|st| st.stop_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        // trip b had only one stop inside the set and is dropped entirely
        assert!(clipped.frequencies().iter().all(|f| f.trip_id == "a"));
        assert!(clipped.stops().iter().all(|s| s.stop_id != 5));
    }

    #[test]
    fn test_clip_to_roadway_keeps_longest_run() {
        let feed = feed_with_trips(&[("a", "s1", vec![1, 2, 3, 4])]);
        let nodes: Vec<RoadNode> = (1..=4)
            .map(|id| RoadNode::new(id, 0.001 * id as f64, 0.0))
            .collect();
        // roadway covers only links 1-2 and 2-3
        let links = vec![RoadLink::test_link(1, 1, 2), RoadLink::test_link(2, 2, 3)];
        let roadway = RoadwayNetwork::new(links, nodes, vec![]).unwrap();

        let clipped = clip_feed_to_roadway(&feed, &roadway, DEFAULT_MIN_STOPS).unwrap();
        assert_eq!(
            clipped
                .shapes()
                .iter()
                .map(|p| p.shape_model_node_id)
                .collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(
            clipped.stop_times().iter().map(|st| st.stop_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_clip_to_boundary() {
        let feed = feed_with_trips(&[("a", "s1", vec![1, 2, 3])]);
        let ref_nodes: Vec<RoadNode> = (1..=3)
            .map(|id| RoadNode::new(id, 0.1 * id as f64, 0.0))
            .collect();
        // boundary covers nodes 1 and 2 only
        let boundary = polygon![
            (x: 0.05, y: -0.05),
            (x: 0.25, y: -0.05),
            (x: 0.25, y: 0.05),
            (x: 0.05, y: 0.05),
        ];
        let clipped = clip_feed_to_boundary(&feed, &ref_nodes, &boundary, DEFAULT_MIN_STOPS).unwrap();
        assert_eq!(
            clipped.stop_times().iter().map(|st| st.stop_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }
}
