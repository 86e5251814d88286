//! consistency checks between a transit feed and its reference roadway
//! network.

use std::collections::HashSet;

use crate::error::TransitError;
use crate::feed::segments::shapes_to_shape_links;
use crate::feed::tables::{ShapePoint, Stop};
use crate::feed::Feed;
use switchyard_roadway::{RoadLink, RoadwayNetwork};

/// consecutive shape node pairs with no matching transit-permissible roadway
/// link.
pub fn shape_links_without_road_links(
    shapes: &[ShapePoint],
    road_links: &[RoadLink],
) -> Vec<(i64, i64)> {
    let permissible: HashSet<(i64, i64)> = road_links
        .iter()
        .filter(|l| l.is_transit_permissible())
        .map(|l| (l.a, l.b))
        .collect();
    shapes_to_shape_links(shapes)
        .into_iter()
        .map(|link| (link.a, link.b))
        .filter(|ab| !permissible.contains(ab))
        .collect()
}

/// stop ids with no matching roadway node.
pub fn stops_without_road_nodes(stops: &[Stop], road_net: &RoadwayNetwork) -> Vec<i64> {
    let node_ids = road_net.node_ids();
    stops
        .iter()
        .map(|s| s.stop_id)
        .filter(|id| !node_ids.contains(id))
        .collect()
}

/// check the wrangler-flavored invariants binding a feed to a roadway
/// network: stops are roadway nodes, and every consecutive shape pair is an
/// existing transit-permissible link.
pub fn validate_consistency(feed: &Feed, road_net: &RoadwayNetwork) -> Result<(), TransitError> {
    let missing_stops = stops_without_road_nodes(feed.stops(), road_net);
    if !missing_stops.is_empty() {
        return Err(TransitError::MissingStopNodes(missing_stops));
    }
    let missing_links = shape_links_without_road_links(feed.shapes(), road_net.links());
    if !missing_links.is_empty() {
        return Err(TransitError::TransitRoadwayConsistency(missing_links));
    }
    Ok(())
}

/// true when the feed is consistent with the roadway network.
pub fn transit_road_net_consistency(feed: &Feed, road_net: &RoadwayNetwork) -> bool {
    validate_consistency(feed, road_net).is_ok()
}
