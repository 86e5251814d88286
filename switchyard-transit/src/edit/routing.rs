//! transit routing changes: replace a segment (or the whole) of the shapes
//! and stop patterns of the selected trips.
//!
//! routing node lists use a sign convention: a positive id is a stop, a
//! negative id is a pass-through node (travel through, do not stop).
//! arithmetic elsewhere always uses the absolute value.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::TransitError;
use crate::feed::shapes::{find_nearest_stops, node_pattern_for_shape_id, shape_points_for_shape_id};
use crate::feed::stop_times::{renumber_stop_sequence, stop_times_for_trip_id};
use crate::feed::stops::node_is_stop;
use crate::feed::tables::{ShapePoint, Stop, StopTime};
use crate::feed::trips::{shape_ids_for_trip_ids, trip_ids_for_shape_id};
use crate::feed::{Feed, FeedTables};
use crate::network::TransitNetwork;
use crate::validate::shape_links_without_road_links;
use switchyard_core::change::append_project;
use switchyard_core::config::RuntimeConfig;
use switchyard_core::data::segment_by_selection_min_overlap;
use switchyard_core::ids::generate_new_id_from_existing;
use switchyard_roadway::RoadwayNetwork;

/// a routing change: `existing` bounds the segment of the current routing to
/// replace (absent means the whole routing) and `set` is the replacement
/// node sequence. negative ids in `set` are pass-through nodes, not stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingChange {
    #[serde(default)]
    pub existing: Option<Vec<i64>>,
    pub set: Vec<i64>,
}

/// apply a routing change to the selected trips, updating shapes, stops and
/// stop_times while keeping the feed consistent with the roadway network.
pub fn apply_transit_routing_change(
    net: &mut TransitNetwork,
    trip_ids: &[String],
    routing_change: &RoutingChange,
    reference_road_net: Option<&RoadwayNetwork>,
    config: &RuntimeConfig,
    project_name: Option<&str>,
) -> Result<(), TransitError> {
    log::debug!("applying transit routing change to {} trips", trip_ids.len());
    let road_handle = net.road_net_handle();
    let road_net = match reference_road_net.or(road_handle.as_deref()) {
        Some(road_net) => road_net,
        None => return Err(TransitError::MissingRoadNet("update transit routing")),
    };

    let mut tables = net.feed().to_tables();
    let selected: HashSet<&String> = trip_ids.iter().collect();
    for trip in tables.trips.iter_mut().filter(|t| selected.contains(&t.trip_id)) {
        append_project(&mut trip.projects, project_name);
    }

    let shape_ids = shape_ids_for_trip_ids(&tables.trips, trip_ids);
    for shape_id in shape_ids {
        update_shapes_and_trips(
            &mut tables,
            &shape_id,
            trip_ids,
            routing_change,
            config.ids.transit_shape_id_scalar,
            road_net,
            project_name,
        )?;
    }

    update_stops(&mut tables, &routing_change.set, road_net, project_name)?;

    for trip_id in trip_ids {
        update_stop_times_for_trip(&mut tables, trip_id, routing_change, project_name)?;
    }

    net.set_feed(Feed::new(tables)?)
}

/// true when the new routing is already a sub-pattern of the shape with the
/// same extents, i.e. only stop flags change.
fn consistent_routing(
    shapes: &[ShapePoint],
    shape_id: &str,
    existing_routing: &[i64],
    set_routing: &[i64],
) -> bool {
    if existing_routing.is_empty() || set_routing.is_empty() {
        return false;
    }
    let same_extents = set_routing.first() == existing_routing.first()
        && set_routing.last() == existing_routing.last();
    if !same_extents {
        return false;
    }
    let pattern = node_pattern_for_shape_id(shapes, shape_id);
    let pattern_str = pattern.iter().map(|n| n.to_string()).collect::<Vec<_>>().join("|");
    let set_str = set_routing.iter().map(|n| n.to_string()).collect::<Vec<_>>().join("|");
    pattern_str.contains(&set_str)
}

/// shape rows for a node list, with coordinates copied from roadway nodes.
fn create_shape_points(
    node_ids: &[i64],
    shape_id: &str,
    road_net: &RoadwayNetwork,
    project_name: Option<&str>,
) -> Result<Vec<ShapePoint>, TransitError> {
    log::debug!("creating new shape rows for shape_id '{shape_id}'");
    node_ids
        .iter()
        .enumerate()
        .map(|(i, node_id)| {
            let (lon, lat) = road_net.node_coords(*node_id)?;
            let mut point = ShapePoint {
                shape_id: shape_id.to_string(),
                shape_pt_sequence: i as u32 + 1,
                shape_model_node_id: *node_id,
                shape_pt_lat: Some(lat),
                shape_pt_lon: Some(lon),
                projects: String::new(),
            };
            append_project(&mut point.projects, project_name);
            Ok(point)
        })
        .collect()
}

/// replace the segment of a shape bounded by the first and last node of
/// `existing_routing` with the set routing, keeping existing rows where the
/// replacement overlaps the segment bounds.
fn replace_shapes_segment(
    shapes: &[ShapePoint],
    shape_id: &str,
    existing_routing: &[i64],
    set_routing: &[i64],
    road_net: &RoadwayNetwork,
    project_name: Option<&str>,
) -> Result<Vec<ShapePoint>, TransitError> {
    let existing_points = shape_points_for_shape_id(shapes, shape_id);
    let bounds = (existing_routing[0], existing_routing[existing_routing.len() - 1]);
    let (set_remaining, (before, _, after)) = segment_by_selection_min_overlap(
        bounds,
        &existing_points,
        |p| p.shape_model_node_id,
        set_routing,
    )?;
    let middle = create_shape_points(&set_remaining, shape_id, road_net, project_name)?;

    let mut updated: Vec<ShapePoint> = before;
    updated.extend(middle);
    updated.extend(after);
    for (i, point) in updated.iter_mut().enumerate() {
        point.shape_pt_sequence = i as u32 + 1;
    }
    Ok(updated)
}

/// update one shape used by the selected trips, cloning it first when it is
/// shared with unselected trips.
fn update_shapes_and_trips(
    tables: &mut FeedTables,
    shape_id: &str,
    trip_ids: &[String],
    routing_change: &RoutingChange,
    shape_id_scalar: i64,
    road_net: &RoadwayNetwork,
    project_name: Option<&str>,
) -> Result<(), TransitError> {
    log::debug!("updating shape '{shape_id}' for routing change");
    let set_routing: Vec<i64> = routing_change.set.iter().map(|n| n.abs()).collect();
    let existing_routing: Vec<i64> = routing_change
        .existing
        .clone()
        .unwrap_or_default()
        .iter()
        .map(|n| n.abs())
        .collect();

    if consistent_routing(&tables.shapes, shape_id, &existing_routing, &set_routing) {
        log::debug!("no routing change for shape '{shape_id}'; leaving shape as-is");
        return Ok(());
    }

    // clone the shape when trips outside the selection still use it
    let mut shape_id = shape_id.to_string();
    let all_using: HashSet<String> =
        trip_ids_for_shape_id(&tables.trips, &shape_id).into_iter().collect();
    let selected_using: HashSet<&String> =
        trip_ids.iter().filter(|t| all_using.contains(*t)).collect();
    if selected_using.len() != all_using.len() {
        let taken: HashSet<String> = tables.shapes.iter().map(|p| p.shape_id.clone()).collect();
        let new_shape_id = generate_new_id_from_existing(&shape_id, &taken, shape_id_scalar)?;
        log::debug!("shape '{shape_id}' is shared; cloning as '{new_shape_id}'");
        let mut copied = shape_points_for_shape_id(&tables.shapes, &shape_id);
        for point in copied.iter_mut() {
            point.shape_id = new_shape_id.clone();
            append_project(&mut point.projects, project_name);
        }
        tables.shapes.extend(copied);
        for trip in tables.trips.iter_mut() {
            if selected_using.contains(&trip.trip_id) {
                trip.shape_id = new_shape_id.clone();
            }
        }
        shape_id = new_shape_id;
    }

    let updated_shape = if !existing_routing.is_empty() {
        replace_shapes_segment(
            &tables.shapes,
            &shape_id,
            &existing_routing,
            &set_routing,
            road_net,
            project_name,
        )?
    } else {
        create_shape_points(&set_routing, &shape_id, road_net, project_name)?
    };

    let missing = shape_links_without_road_links(&updated_shape, road_net.links());
    if !missing.is_empty() {
        log::error!("new shape links not in road links: {missing:?}");
        return Err(TransitError::TransitRoadwayConsistency(missing));
    }

    tables.shapes.retain(|p| p.shape_id != shape_id);
    tables.shapes.extend(updated_shape);
    Ok(())
}

/// create stop rows for any positive routing node that is not yet a stop,
/// copying coordinates from the roadway nodes.
fn update_stops(
    tables: &mut FeedTables,
    routing_set: &[i64],
    road_net: &RoadwayNetwork,
    project_name: Option<&str>,
) -> Result<(), TransitError> {
    let existing: HashSet<i64> = tables.stops.iter().map(|s| s.stop_id).collect();
    let missing: Vec<i64> = routing_set
        .iter()
        .filter(|n| **n > 0)
        .map(|n| *n)
        .filter(|n| !existing.contains(n))
        .collect::<HashSet<i64>>()
        .into_iter()
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    log::debug!("adding {} stops for transit routing change", missing.len());
    for node_id in missing {
        let (lon, lat) = road_net.node_coords(node_id)?;
        let mut stop = Stop {
            stop_id: node_id,
            stop_id_gtfs: None,
            stop_lat: Some(lat),
            stop_lon: Some(lon),
            stop_name: None,
            projects: String::new(),
        };
        append_project(&mut stop.projects, project_name);
        tables.stops.push(stop);
    }
    Ok(())
}

/// new stop_times rows for a node list.
fn create_stop_times(
    stop_node_ids: &[i64],
    trip_id: &str,
    project_name: Option<&str>,
) -> Vec<StopTime> {
    stop_node_ids
        .iter()
        .enumerate()
        .map(|(i, node_id)| {
            let mut stop_time = StopTime::new(trip_id, i as u32 + 1, *node_id);
            append_project(&mut stop_time.projects, project_name);
            stop_time
        })
        .collect()
}

/// stops at the bounds of the replaced segment that were marked pass-through
/// and should be removed from stop patterns.
fn deletion_candidates(routing_set: &[i64]) -> Vec<i64> {
    let mut candidates = vec![];
    if let Some(first) = routing_set.first() {
        if *first < 0 {
            candidates.push(first.abs());
        }
    }
    if let (Some(first), Some(last)) = (routing_set.first(), routing_set.last()) {
        if *last < 0 && last != first {
            candidates.push(last.abs());
        }
    }
    candidates
}

/// rebuild the stop pattern of one trip around the replaced segment.
fn update_stop_times_for_trip(
    tables: &mut FeedTables,
    trip_id: &str,
    routing_change: &RoutingChange,
    project_name: Option<&str>,
) -> Result<(), TransitError> {
    log::debug!("updating stop times for trip '{trip_id}'");
    let existing_nodes: Vec<i64> = routing_change.existing.clone().unwrap_or_default();
    let set_stop_nodes: Vec<i64> =
        routing_change.set.iter().copied().filter(|n| *n > 0).collect();
    let del_stop_nodes = deletion_candidates(&routing_change.set);

    let mut this_trip = stop_times_for_trip_id(&tables.stop_times, trip_id);

    if !existing_nodes.is_empty() && !set_stop_nodes.is_empty() {
        let mut set_nodes = set_stop_nodes.clone();
        let mut start_n = existing_nodes[0].abs();
        let mut end_n = existing_nodes[existing_nodes.len() - 1].abs();

        // when the segment bounds are not themselves stops, snap to the
        // nearest stops along the shape
        if start_n != 0 && !node_is_stop(&tables.stop_times, start_n, trip_id) {
            let (before, _) =
                find_nearest_stops(&tables.shapes, &tables.trips, &tables.stop_times, trip_id, start_n)?;
            start_n = before;
            if before != 0 {
                set_nodes.insert(0, before);
            }
        }
        if end_n != 0 && !node_is_stop(&tables.stop_times, end_n, trip_id) {
            let (_, after) =
                find_nearest_stops(&tables.shapes, &tables.trips, &tables.stop_times, trip_id, end_n)?;
            end_n = after;
            if after != 0 {
                set_nodes.push(after);
            }
        }
        log::debug!("start/end stop nodes: {start_n}/{end_n}, set stop nodes: {set_nodes:?}");

        let (set_nodes, (before, _, after)) =
            segment_by_selection_min_overlap((start_n, end_n), &this_trip, |st| st.stop_id, &set_nodes)?;
        let middle = create_stop_times(&set_nodes, trip_id, project_name);
        let mut updated = before;
        updated.extend(middle);
        updated.extend(after);
        this_trip = updated;
    }

    if !del_stop_nodes.is_empty() {
        log::debug!("deleting stop times for pass-through nodes {del_stop_nodes:?}");
        this_trip.retain(|st| !del_stop_nodes.contains(&st.stop_id));
    }

    if existing_nodes.is_empty() {
        this_trip = create_stop_times(&set_stop_nodes, trip_id, project_name);
    }

    renumber_stop_sequence(&mut this_trip);
    tables.stop_times.retain(|st| st.trip_id != trip_id);
    tables.stop_times.extend(this_trip);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::feed::stop_times::stop_pattern_for_trip_id;
    use crate::feed::testfeed::{feed_with_patterns, feed_with_trips};
    use std::rc::Rc;
    use switchyard_roadway::{RoadLink, RoadNode};

    /// a roadway grid with a mainline 1-2-3-4 and a detour 2-7-6-3.
    fn road_net() -> Rc<RoadwayNetwork> {
        let pairs = [(1, 2), (2, 3), (3, 4), (2, 7), (7, 6), (6, 3)];
        let node_ids: HashSet<i64> = pairs.iter().flat_map(|(a, b)| [*a, *b]).collect();
        let nodes: Vec<RoadNode> = node_ids
            .into_iter()
            .map(|id| RoadNode::new(id, 0.001 * id as f64, 0.001))
            .collect();
        let links: Vec<RoadLink> = pairs
            .iter()
            .enumerate()
            .map(|(i, (a, b))| RoadLink::test_link(i as i64 + 1, *a, *b))
            .collect();
        Rc::new(RoadwayNetwork::new(links, nodes, vec![]).unwrap())
    }

    fn config() -> RuntimeConfig {
        RuntimeConfig::default()
    }

    #[test]
    fn test_segment_replacement_updates_shape_and_stops() {
        let mut net = TransitNetwork::new(feed_with_trips(&[("t1", "s1", vec![1, 2, 3, 4])]));
        net.set_road_net(road_net()).unwrap();
        let change = RoutingChange {
            existing: Some(vec![2, 3]),
            set: vec![2, 7, 6, 3],
        };
        apply_transit_routing_change(
            &mut net,
            &["t1".to_string()],
            &change,
            None,
            &config(),
            Some("reroute"),
        )
        .unwrap();

        let feed = net.feed();
        assert_eq!(
            node_pattern_for_shape_id(feed.shapes(), "s1"),
            vec![1, 2, 7, 6, 3, 4]
        );
        assert_eq!(
            stop_pattern_for_trip_id(feed.stop_times(), "t1"),
            vec![1, 2, 7, 6, 3, 4]
        );
        let sequences: Vec<u32> = stop_times_for_trip_id(feed.stop_times(), "t1")
            .iter()
            .map(|st| st.stop_sequence)
            .collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5, 6]);
        // stops 6 and 7 created from roadway nodes
        assert!(feed.stops().iter().any(|s| s.stop_id == 6));
        assert!(feed.stops().iter().any(|s| s.stop_id == 7));
        assert_eq!(feed.trips()[0].projects, "reroute,");
    }

    #[test]
    fn test_pass_through_nodes_are_not_stops() {
        let mut net = TransitNetwork::new(feed_with_trips(&[("t1", "s1", vec![1, 2, 3, 4])]));
        net.set_road_net(road_net()).unwrap();
        let change = RoutingChange {
            existing: Some(vec![2, 3]),
            set: vec![2, -7, -6, 3],
        };
        apply_transit_routing_change(&mut net, &["t1".to_string()], &change, None, &config(), None)
            .unwrap();
        let feed = net.feed();
        assert_eq!(
            node_pattern_for_shape_id(feed.shapes(), "s1"),
            vec![1, 2, 7, 6, 3, 4],
            "shape still travels through pass-through nodes"
        );
        assert_eq!(
            stop_pattern_for_trip_id(feed.stop_times(), "t1"),
            vec![1, 2, 3, 4],
            "pass-through nodes are not stops"
        );
    }

    #[test]
    fn test_shared_shape_cloned_for_selected_trips() {
        let mut net = TransitNetwork::new(feed_with_trips(&[
            ("t1", "s1", vec![1, 2, 3, 4]),
            ("t2", "s1", vec![1, 2, 3, 4]),
        ]));
        net.set_road_net(road_net()).unwrap();
        let change = RoutingChange {
            existing: Some(vec![2, 3]),
            set: vec![2, 7, 6, 3],
        };
        apply_transit_routing_change(&mut net, &["t1".to_string()], &change, None, &config(), None)
            .unwrap();

        let feed = net.feed();
        let t1_shape = feed.trips().iter().find(|t| t.trip_id == "t1").unwrap().shape_id.clone();
        let t2_shape = feed.trips().iter().find(|t| t.trip_id == "t2").unwrap().shape_id.clone();
        assert_ne!(t1_shape, t2_shape, "selected trip moves to a cloned shape");
        assert_eq!(t2_shape, "s1");
        assert_eq!(node_pattern_for_shape_id(feed.shapes(), "s1"), vec![1, 2, 3, 4]);
        assert_eq!(
            node_pattern_for_shape_id(feed.shapes(), &t1_shape),
            vec![1, 2, 7, 6, 3, 4]
        );
        assert_eq!(stop_pattern_for_trip_id(feed.stop_times(), "t2"), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_whole_routing_replacement() {
        let mut net = TransitNetwork::new(feed_with_trips(&[("t1", "s1", vec![1, 2, 3, 4])]));
        net.set_road_net(road_net()).unwrap();
        let change = RoutingChange {
            existing: None,
            set: vec![2, 7, 6],
        };
        apply_transit_routing_change(&mut net, &["t1".to_string()], &change, None, &config(), None)
            .unwrap();
        let feed = net.feed();
        assert_eq!(node_pattern_for_shape_id(feed.shapes(), "s1"), vec![2, 7, 6]);
        assert_eq!(stop_pattern_for_trip_id(feed.stop_times(), "t1"), vec![2, 7, 6]);
    }

    #[test]
    fn test_routing_over_missing_road_links_fails() {
        let mut net = TransitNetwork::new(feed_with_trips(&[("t1", "s1", vec![1, 2, 3, 4])]));
        net.set_road_net(road_net()).unwrap();
        let change = RoutingChange {
            existing: Some(vec![2, 3]),
            set: vec![2, 9, 3],
        };
        let result = apply_transit_routing_change(
            &mut net,
            &["t1".to_string()],
            &change,
            None,
            &config(),
            None,
        );
        assert!(result.is_err());
        assert_eq!(
            node_pattern_for_shape_id(net.feed().shapes(), "s1"),
            vec![1, 2, 3, 4],
            "failed change leaves the feed untouched"
        );
    }

    #[test]
    fn test_bounds_snap_to_nearest_stops() {
        // shape travels 1-2-3-4-5 but only 1, 3, 5 are stops; replacing from
        // node 2 snaps the segment start to stop 1
        let mut net = TransitNetwork::new(feed_with_patterns(&[(
            "t1",
            "s1",
            vec![1, 2, 3, 4],
            vec![1, 3, 4],
        )]));
        net.set_road_net(road_net()).unwrap();
        let change = RoutingChange {
            existing: Some(vec![2, 3]),
            set: vec![2, 7, 6, 3],
        };
        apply_transit_routing_change(&mut net, &["t1".to_string()], &change, None, &config(), None)
            .unwrap();
        let feed = net.feed();
        assert_eq!(
            stop_pattern_for_trip_id(feed.stop_times(), "t1"),
            vec![1, 2, 7, 6, 3, 4]
        );
    }
}
