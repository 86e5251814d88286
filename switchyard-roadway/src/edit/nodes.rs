//! add, delete and move roadway nodes.

use std::collections::HashSet;

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::error::RoadwayError;
use crate::geo::{replace_endpoint, Endpoint};
use crate::model::RoadNode;
use crate::network::RoadwayNetwork;

/// add nodes to the network. node ids must not already exist.
pub fn add_nodes(net: &mut RoadwayNetwork, new_nodes: Vec<RoadNode>) -> Result<(), RoadwayError> {
    let existing = net.node_ids();
    let duplicates: Vec<i64> = new_nodes
        .iter()
        .map(|n| n.model_node_id)
        .filter(|id| existing.contains(id))
        .collect();
    if !duplicates.is_empty() {
        return Err(RoadwayError::NodeAdd(duplicates));
    }
    let mut nodes = net.nodes().to_vec();
    nodes.extend(new_nodes);
    net.commit_nodes(nodes)
}

/// delete nodes from the network. nodes still referenced by links are
/// rejected unless `force`, in which case the referencing links are deleted
/// as well.
pub fn delete_nodes(
    net: &mut RoadwayNetwork,
    node_ids: &[i64],
    force: bool,
) -> Result<(), RoadwayError> {
    let wanted: HashSet<i64> = node_ids.iter().copied().collect();
    let existing = net.node_ids();
    let missing: Vec<i64> = wanted.iter().copied().filter(|id| !existing.contains(id)).collect();
    if !missing.is_empty() {
        return Err(RoadwayError::NodeNotFound(missing));
    }

    let referenced: Vec<i64> = wanted
        .iter()
        .copied()
        .filter(|id| net.links().iter().any(|l| l.a == *id || l.b == *id))
        .collect();
    if !referenced.is_empty() {
        if !force {
            return Err(RoadwayError::NodeDeletion(referenced));
        }
        log::warn!("force-deleting nodes {referenced:?} and the links that reference them");
        let links: Vec<_> = net
            .links()
            .iter()
            .filter(|l| !wanted.contains(&l.a) && !wanted.contains(&l.b))
            .cloned()
            .collect();
        net.commit_links(links)?;
    }

    let nodes: Vec<RoadNode> = net
        .nodes()
        .iter()
        .filter(|n| !wanted.contains(&n.model_node_id))
        .cloned()
        .collect();
    net.commit_nodes(nodes)
}

/// a node relocation, in lon/lat coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGeometryChange {
    pub model_node_id: i64,
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
}

/// move nodes, updating the node geometry and propagating the change to the
/// endpoints of referencing link geometries and to the first/last vertex of
/// any shape those links reference. interior shape vertices are not updated.
pub fn move_nodes(
    net: &mut RoadwayNetwork,
    changes: &[NodeGeometryChange],
) -> Result<(), RoadwayError> {
    let existing = net.node_ids();
    let missing: Vec<i64> = changes
        .iter()
        .map(|c| c.model_node_id)
        .filter(|id| !existing.contains(id))
        .collect();
    if !missing.is_empty() {
        return Err(RoadwayError::NodeNotFound(missing));
    }
    log::debug!("updating node geometry for {} nodes", changes.len());

    let mut nodes = net.nodes().to_vec();
    for change in changes {
        if let Some(node) = nodes.iter_mut().find(|n| n.model_node_id == change.model_node_id) {
            node.set_xy(change.x, change.y);
        }
    }

    let mut links = net.links().to_vec();
    let mut shapes = net.shapes().to_vec();
    for change in changes {
        let point = Point::new(change.x, change.y);
        for link in links.iter_mut() {
            let endpoint = if link.a == change.model_node_id {
                Endpoint::Start
            } else if link.b == change.model_node_id {
                Endpoint::End
            } else {
                continue;
            };
            link.geometry = replace_endpoint(&link.geometry, endpoint, point);
            if let Some(shape_id) = &link.shape_id {
                if let Some(shape) = shapes.iter_mut().find(|s| &s.shape_id == shape_id) {
                    shape.geometry = replace_endpoint(&shape.geometry, endpoint, point);
                }
            }
        }
    }

    net.commit_nodes(nodes)?;
    net.commit_links(links)?;
    net.commit_shapes(shapes)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{RoadLink, RoadShape};
    use geo::LineString;

    fn net() -> RoadwayNetwork {
        let nodes = vec![
            RoadNode::new(1, 0.0, 0.0),
            RoadNode::new(2, 0.01, 0.0),
            RoadNode::new(3, 0.02, 0.0),
        ];
        let shapes = vec![RoadShape::new(
            "s10",
            LineString::from(vec![(0.0, 0.0), (0.005, 0.001), (0.01, 0.0)]),
        )];
        let mut link_a = RoadLink::test_link(10, 1, 2);
        link_a.shape_id = Some("s10".to_string());
        let links = vec![link_a, RoadLink::test_link(20, 2, 3)];
        RoadwayNetwork::new(links, nodes, shapes).unwrap()
    }

    #[test]
    fn test_add_nodes_rejects_duplicates() {
        let mut net = net();
        assert!(matches!(
            add_nodes(&mut net, vec![RoadNode::new(1, 0.5, 0.5)]),
            Err(RoadwayError::NodeAdd(ids)) if ids == vec![1]
        ));
        add_nodes(&mut net, vec![RoadNode::new(4, 0.5, 0.5)]).unwrap();
        assert_eq!(net.nodes().len(), 4);
    }

    #[test]
    fn test_delete_nodes_blocked_when_referenced() {
        let mut net = net();
        assert!(matches!(
            delete_nodes(&mut net, &[2], false),
            Err(RoadwayError::NodeDeletion(_))
        ));
        delete_nodes(&mut net, &[2], true).unwrap();
        assert_eq!(net.links().len(), 0);
        assert!(net.node(2).is_none());
    }

    #[test]
    fn test_move_node_propagates_to_links_and_shapes() {
        let mut net = net();
        move_nodes(
            &mut net,
            &[NodeGeometryChange {
                model_node_id: 1,
                x: -0.01,
                y: 0.002,
            }],
        )
        .unwrap();
        assert_eq!(net.node_coords(1).unwrap(), (-0.01, 0.002));
        let link = net.link(10).unwrap();
        assert_eq!(link.geometry.0[0].x, -0.01);
        let shape = net.shape("s10").unwrap();
        assert_eq!(shape.geometry.0[0].x, -0.01);
        // interior shape vertices are untouched
        assert_eq!(shape.geometry.0[1].x, 0.005);
    }
}
