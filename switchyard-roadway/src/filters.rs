//! pure filters and derived queries over the links, nodes and shapes tables.

use std::collections::HashSet;

use itertools::Itertools;

use crate::error::RoadwayError;
use crate::model::{Mode, RoadLink, RoadNode, RoadShape};

/// links accessible by any of the given modes.
pub fn filter_links_to_modes<'a>(links: &'a [RoadLink], modes: &[Mode]) -> Vec<&'a RoadLink> {
    if modes.contains(&Mode::Any) {
        return links.iter().collect();
    }
    links
        .iter()
        .filter(|link| modes.iter().any(|mode| mode.link_allows(link)))
        .collect()
}

/// managed lane links.
pub fn filter_links_managed(links: &[RoadLink]) -> Vec<&RoadLink> {
    links.iter().filter(|l| l.managed == 1).collect()
}

/// general purpose links parallel to a managed lane.
pub fn filter_links_parallel_general_purpose(links: &[RoadLink]) -> Vec<&RoadLink> {
    links.iter().filter(|l| l.managed == -1).collect()
}

/// general purpose links with no parallel managed lane.
pub fn filter_links_general_purpose_no_parallel_managed(links: &[RoadLink]) -> Vec<&RoadLink> {
    links.iter().filter(|l| l.managed == 0).collect()
}

/// dummy links providing access to managed lanes.
pub fn filter_links_access_dummy(links: &[RoadLink]) -> Vec<&RoadLink> {
    links.iter().filter(|l| l.roadway == "ml_access_point").collect()
}

/// dummy links providing egress from managed lanes.
pub fn filter_links_egress_dummy(links: &[RoadLink]) -> Vec<&RoadLink> {
    links.iter().filter(|l| l.roadway == "ml_egress_point").collect()
}

/// links that only pedestrians or cyclists can use.
pub fn filter_links_pedbike_only(links: &[RoadLink]) -> Vec<&RoadLink> {
    links
        .iter()
        .filter(|l| (l.walk_access || l.bike_access) && !l.drive_access)
        .collect()
}

/// links that only transit can operate on.
pub fn filter_links_transit_only(links: &[RoadLink]) -> Vec<&RoadLink> {
    links.iter().filter(|l| l.bus_only || l.rail_only).collect()
}

/// links touching any of the given nodes.
pub fn links_with_nodes<'a>(links: &'a [RoadLink], node_ids: &HashSet<i64>) -> Vec<&'a RoadLink> {
    links
        .iter()
        .filter(|l| node_ids.contains(&l.a) || node_ids.contains(&l.b))
        .collect()
}

/// unique node ids touched by the given links.
pub fn node_ids_in_links(links: &[RoadLink]) -> HashSet<i64> {
    links.iter().flat_map(|l| [l.a, l.b]).collect()
}

/// the links along a node sequence, in order. every consecutive node pair
/// must exist as a link unless `ignore_missing` is set, in which case missing
/// pairs are skipped with a warning.
pub fn path_links<'a>(
    links: &'a [RoadLink],
    node_seq: &[i64],
    ignore_missing: bool,
) -> Result<Vec<&'a RoadLink>, RoadwayError> {
    let by_ab: std::collections::HashMap<(i64, i64), &RoadLink> =
        links.iter().map(|l| ((l.a, l.b), l)).collect();
    let mut result = vec![];
    for (a, b) in node_seq.iter().tuple_windows() {
        match by_ab.get(&(*a, *b)) {
            Some(link) => result.push(*link),
            None if ignore_missing => {
                log::warn!("no link between consecutive nodes {a} and {b}; skipping");
            }
            None => return Err(RoadwayError::MissingPathLink(*a, *b)),
        }
    }
    Ok(result)
}

/// nodes not referenced by any link.
pub fn orphan_node_ids(links: &[RoadLink], nodes: &[RoadNode]) -> Vec<i64> {
    let used = node_ids_in_links(links);
    nodes
        .iter()
        .map(|n| n.model_node_id)
        .filter(|id| !used.contains(id))
        .collect()
}

/// shapes not referenced by any link.
pub fn orphan_shape_ids(links: &[RoadLink], shapes: &[RoadShape]) -> Vec<String> {
    let used: HashSet<&String> = links.iter().filter_map(|l| l.shape_id.as_ref()).collect();
    shapes
        .iter()
        .map(|s| s.shape_id.clone())
        .filter(|id| !used.contains(id))
        .collect()
}
