//! add and delete roadway shapes.

use std::collections::HashSet;

use crate::error::RoadwayError;
use crate::model::{RoadLink, RoadShape};
use crate::network::RoadwayNetwork;

/// add shapes to the network. shape ids must not already exist.
pub fn add_shapes(net: &mut RoadwayNetwork, new_shapes: Vec<RoadShape>) -> Result<(), RoadwayError> {
    let existing: HashSet<String> = net.shapes().iter().map(|s| s.shape_id.clone()).collect();
    let duplicates: Vec<String> = new_shapes
        .iter()
        .map(|s| s.shape_id.clone())
        .filter(|id| existing.contains(id))
        .collect();
    if !duplicates.is_empty() {
        return Err(RoadwayError::ShapeAdd(duplicates));
    }
    let mut shapes = net.shapes().to_vec();
    shapes.extend(new_shapes);
    net.commit_shapes(shapes)
}

/// delete shapes from the network. shapes still referenced by links are
/// rejected unless `force`, in which case the references are cleared.
pub fn delete_shapes(
    net: &mut RoadwayNetwork,
    shape_ids: &[String],
    force: bool,
) -> Result<(), RoadwayError> {
    let wanted: HashSet<&String> = shape_ids.iter().collect();
    let referenced: Vec<String> = shape_ids
        .iter()
        .filter(|id| {
            net.links()
                .iter()
                .any(|l| l.shape_id.as_ref() == Some(*id))
        })
        .cloned()
        .collect();
    if !referenced.is_empty() {
        if !force {
            return Err(RoadwayError::ShapeDeletion(referenced));
        }
        log::warn!("force-deleting shapes {referenced:?}; clearing link references");
        let links: Vec<RoadLink> = net
            .links()
            .iter()
            .map(|l| {
                let mut link = l.clone();
                if link
                    .shape_id
                    .as_ref()
                    .map(|id| wanted.contains(id))
                    .unwrap_or(false)
                {
                    link.shape_id = None;
                }
                link
            })
            .collect();
        net.commit_links(links)?;
    }
    let shapes: Vec<RoadShape> = net
        .shapes()
        .iter()
        .filter(|s| !wanted.contains(&s.shape_id))
        .cloned()
        .collect();
    net.commit_shapes(shapes)
}
