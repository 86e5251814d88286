//! resolution of declarative roadway facility selections into concrete link
//! and node sets.

mod segment;
mod subnet;

pub use segment::shortest_path_links;
pub use subnet::{
    generate_subnet_from_link_selection, Subnet, SubnetLink, DEFAULT_MAX_SEARCH_BREADTH,
    DEFAULT_SP_WEIGHT_FACTOR,
};

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::Mode;
use crate::network::RoadwayNetwork;

#[derive(thiserror::Error, Debug, Clone)]
pub enum SelectionError {
    #[error("invalid facility selection format: {0}")]
    SelectionFormat(String),
    #[error("no links found with initial segment selection")]
    SubnetCreation,
    #[error("cannot find nodes {0:?} within maximum subnet expansion iterations ({1})")]
    SubnetExpansion(Vec<i64>, u32),
    #[error("no path found between nodes {0} and {1} in subnet")]
    SegmentSelection(i64, i64),
    #[error("selection references missing ids: {0}")]
    MissingIds(String),
}

fn default_modes() -> Vec<Mode> {
    vec![Mode::Drive]
}

fn default_true() -> bool {
    true
}

/// whether a multi-id selection tolerates partially missing ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Require {
    #[default]
    Any,
    All,
}

/// selection of links in the `facility` section of a project change. either
/// explicit ids, a name/ref search, or `all`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectLinks {
    pub all: bool,
    pub model_link_id: Option<Vec<i64>>,
    pub osm_link_id: Option<Vec<String>>,
    pub name: Option<Vec<String>>,
    #[serde(rename = "ref")]
    pub ref_: Option<Vec<String>>,
    pub modes: Vec<Mode>,
    pub ignore_missing: bool,
}

impl Default for SelectLinks {
    fn default() -> Self {
        SelectLinks {
            all: false,
            model_link_id: None,
            osm_link_id: None,
            name: None,
            ref_: None,
            modes: default_modes(),
            ignore_missing: default_true(),
        }
    }
}

impl SelectLinks {
    /// true when the selection can only be resolved through a subnet search.
    pub fn is_name_search(&self) -> bool {
        self.model_link_id.is_none()
            && self.osm_link_id.is_none()
            && (self.name.is_some() || self.ref_.is_some())
    }
}

/// selection of multiple nodes, e.g. for deletion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectNodes {
    pub all: bool,
    pub model_node_id: Option<Vec<i64>>,
    pub osm_node_id: Option<Vec<String>>,
    pub require: Require,
}

/// selection of a single node, the `from`/`to` ends of a segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectNode {
    pub model_node_id: Option<i64>,
    pub osm_node_id: Option<String>,
}

/// a roadway facility selection: links, nodes, or a segment between two
/// nodes along an initial link search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectFacility {
    pub links: Option<SelectLinks>,
    pub nodes: Option<SelectNodes>,
    #[serde(rename = "from")]
    pub from_: Option<SelectNode>,
    pub to: Option<SelectNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoadwaySelectionType {
    Segment,
    Links,
    Nodes,
}

impl SelectFacility {
    /// derive the selection type: links + from + to is a segment; otherwise
    /// links or nodes.
    pub fn selection_type(&self) -> Result<RoadwaySelectionType, SelectionError> {
        if self.links.is_some() && self.from_.is_some() && self.to.is_some() {
            return Ok(RoadwaySelectionType::Segment);
        }
        if self.links.is_some() {
            return Ok(RoadwaySelectionType::Links);
        }
        if self.nodes.is_some() {
            return Ok(RoadwaySelectionType::Nodes);
        }
        Err(SelectionError::SelectionFormat(
            "facility must have links, nodes, or links with from and to".to_string(),
        ))
    }
}

/// a resolved facility selection. for segments, `link_ids` is in traversal
/// order from the `from` node to the `to` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadwaySelection {
    pub selection_type: RoadwaySelectionType,
    pub link_ids: Vec<i64>,
    pub node_ids: Vec<i64>,
}

/// substring match used for name and ref searches.
fn any_contains(haystack: Option<&str>, needles: &[String]) -> bool {
    match haystack {
        Some(value) => needles.iter().any(|n| value.contains(n.as_str())),
        None => false,
    }
}

fn resolve_single_node(
    net: &RoadwayNetwork,
    select: &SelectNode,
) -> Result<i64, SelectionError> {
    if let Some(id) = select.model_node_id {
        if net.node(id).is_none() {
            return Err(SelectionError::MissingIds(format!("node {id}")));
        }
        return Ok(id);
    }
    if let Some(osm_id) = &select.osm_node_id {
        return net
            .nodes()
            .iter()
            .find(|n| n.osm_node_id.as_deref() == Some(osm_id.as_str()))
            .map(|n| n.model_node_id)
            .ok_or_else(|| SelectionError::MissingIds(format!("osm node {osm_id}")));
    }
    Err(SelectionError::SelectionFormat(
        "segment endpoint must have a model_node_id or osm_node_id".to_string(),
    ))
}

fn resolve_links(
    net: &RoadwayNetwork,
    select: &SelectLinks,
) -> Result<Vec<i64>, SelectionError> {
    let modal = crate::filters::filter_links_to_modes(net.links(), &select.modes);
    if select.all {
        return Ok(modal.iter().map(|l| l.model_link_id).collect());
    }
    if let Some(ids) = &select.model_link_id {
        let present: HashSet<i64> = modal.iter().map(|l| l.model_link_id).collect();
        let (found, missing): (Vec<i64>, Vec<i64>) =
            ids.iter().copied().partition(|id| present.contains(id));
        if !missing.is_empty() && !select.ignore_missing {
            return Err(SelectionError::MissingIds(format!("links {missing:?}")));
        }
        if found.is_empty() {
            return Err(SelectionError::MissingIds(format!("links {ids:?}")));
        }
        return Ok(found);
    }
    if let Some(osm_ids) = &select.osm_link_id {
        let found: Vec<i64> = modal
            .iter()
            .filter(|l| {
                l.osm_link_id
                    .as_ref()
                    .map(|id| osm_ids.contains(id))
                    .unwrap_or(false)
            })
            .map(|l| l.model_link_id)
            .collect();
        if found.is_empty() {
            return Err(SelectionError::MissingIds(format!("osm links {osm_ids:?}")));
        }
        return Ok(found);
    }
    // name / ref search over the full modal table
    let found: Vec<i64> = modal
        .iter()
        .filter(|l| {
            select
                .name
                .as_ref()
                .map(|names| any_contains(Some(l.name.as_str()), names))
                .unwrap_or(false)
                || select
                    .ref_
                    .as_ref()
                    .map(|refs| any_contains(l.ref_.as_deref(), refs))
                    .unwrap_or(false)
        })
        .map(|l| l.model_link_id)
        .collect();
    if found.is_empty() {
        return Err(SelectionError::MissingIds(format!(
            "no links matched name/ref selection {:?}/{:?}",
            select.name, select.ref_
        )));
    }
    Ok(found)
}

fn resolve_nodes(
    net: &RoadwayNetwork,
    select: &SelectNodes,
) -> Result<Vec<i64>, SelectionError> {
    if select.all {
        return Ok(net.nodes().iter().map(|n| n.model_node_id).collect());
    }
    let mut found = vec![];
    let mut missing = vec![];
    if let Some(ids) = &select.model_node_id {
        for id in ids {
            if net.node(*id).is_some() {
                found.push(*id);
            } else {
                missing.push(*id);
            }
        }
    }
    if let Some(osm_ids) = &select.osm_node_id {
        let by_osm: HashMap<&str, i64> = net
            .nodes()
            .iter()
            .filter_map(|n| n.osm_node_id.as_deref().map(|o| (o, n.model_node_id)))
            .collect();
        for osm_id in osm_ids {
            match by_osm.get(osm_id.as_str()) {
                Some(id) if !found.contains(id) => found.push(*id),
                Some(_) => {}
                None => log::warn!("osm node id {osm_id} not found in nodes"),
            }
        }
    }
    if !missing.is_empty() && select.require == Require::All {
        return Err(SelectionError::MissingIds(format!("nodes {missing:?}")));
    }
    if found.is_empty() {
        return Err(SelectionError::MissingIds("no nodes matched selection".to_string()));
    }
    Ok(found)
}

/// resolve a facility selection against a network. segments run the subnet
/// expansion and shortest-path search of [`subnet`] and [`segment`].
pub fn select_facility(
    net: &RoadwayNetwork,
    facility: &SelectFacility,
) -> Result<RoadwaySelection, SelectionError> {
    let selection_type = facility.selection_type()?;
    match selection_type {
        RoadwaySelectionType::Nodes => {
            let node_ids = resolve_nodes(net, facility.nodes.as_ref().expect("nodes present"))?;
            Ok(RoadwaySelection {
                selection_type,
                link_ids: vec![],
                node_ids,
            })
        }
        RoadwaySelectionType::Links => {
            let select = facility.links.as_ref().expect("links present");
            let link_ids = resolve_links(net, select)?;
            Ok(RoadwaySelection {
                selection_type,
                link_ids,
                node_ids: vec![],
            })
        }
        RoadwaySelectionType::Segment => {
            let select = facility.links.as_ref().expect("links present");
            let from_node = resolve_single_node(net, facility.from_.as_ref().expect("from present"))?;
            let to_node = resolve_single_node(net, facility.to.as_ref().expect("to present"))?;
            let mut subnet = generate_subnet_from_link_selection(net, select)?;
            subnet.expand_to_nodes(net, &[from_node, to_node])?;
            let link_ids =
                shortest_path_links(&subnet, from_node, to_node, DEFAULT_SP_WEIGHT_FACTOR)?;
            Ok(RoadwaySelection {
                selection_type,
                link_ids,
                node_ids: vec![from_node, to_node],
            })
        }
    }
}

/// cache of resolved selections, keyed by a canonical hash of the selector.
/// entries are invalidated wholesale when the network hash changes.
#[derive(Debug, Default)]
pub struct SelectionCache {
    net_hash: String,
    entries: HashMap<String, RoadwaySelection>,
}

impl SelectionCache {
    pub fn new() -> SelectionCache {
        SelectionCache::default()
    }

    pub fn selection_key(facility: &SelectFacility) -> String {
        let encoded = serde_json::to_vec(facility).unwrap_or_default();
        hex::encode(Sha256::digest(&encoded))
    }

    pub fn get_or_resolve(
        &mut self,
        net: &RoadwayNetwork,
        facility: &SelectFacility,
    ) -> Result<RoadwaySelection, SelectionError> {
        if self.net_hash != net.hash() {
            self.entries.clear();
            self.net_hash = net.hash().to_string();
        }
        let key = Self::selection_key(facility);
        if let Some(selection) = self.entries.get(&key) {
            return Ok(selection.clone());
        }
        let selection = select_facility(net, facility)?;
        self.entries.insert(key, selection.clone());
        Ok(selection)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{RoadLink, RoadNode};

    fn named_net() -> RoadwayNetwork {
        let nodes: Vec<RoadNode> = (1..=4)
            .map(|id| RoadNode::new(id, 0.01 * id as f64, 0.0))
            .collect();
        let mut links = vec![
            RoadLink::test_link(10, 1, 2),
            RoadLink::test_link(20, 2, 3),
            RoadLink::test_link(30, 3, 4),
        ];
        for link in &mut links {
            link.name = "Main".to_string();
        }
        RoadwayNetwork::new(links, nodes, vec![]).unwrap()
    }

    #[test]
    fn test_select_by_link_ids() {
        let net = named_net();
        let facility = SelectFacility {
            links: Some(SelectLinks {
                model_link_id: Some(vec![20]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let selection = select_facility(&net, &facility).unwrap();
        assert_eq!(selection.selection_type, RoadwaySelectionType::Links);
        assert_eq!(selection.link_ids, vec![20]);
    }

    #[test]
    fn test_select_missing_ids_respects_ignore_missing() {
        let net = named_net();
        let facility = SelectFacility {
            links: Some(SelectLinks {
                model_link_id: Some(vec![20, 99]),
                ignore_missing: false,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            select_facility(&net, &facility),
            Err(SelectionError::MissingIds(_))
        ));
    }

    #[test]
    fn test_select_by_name() {
        let net = named_net();
        let facility = SelectFacility {
            links: Some(SelectLinks {
                name: Some(vec!["Main".to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let selection = select_facility(&net, &facility).unwrap();
        assert_eq!(selection.link_ids.len(), 3);
    }

    #[test]
    fn test_select_nodes_require_all() {
        let net = named_net();
        let facility = SelectFacility {
            nodes: Some(SelectNodes {
                model_node_id: Some(vec![1, 99]),
                require: Require::All,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(select_facility(&net, &facility).is_err());

        let facility = SelectFacility {
            nodes: Some(SelectNodes {
                model_node_id: Some(vec![1, 99]),
                require: Require::Any,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(select_facility(&net, &facility).unwrap().node_ids, vec![1]);
    }

    #[test]
    fn test_segment_selection_end_to_end() {
        let net = named_net();
        let facility = SelectFacility {
            links: Some(SelectLinks {
                name: Some(vec!["Main".to_string()]),
                ..Default::default()
            }),
            from_: Some(SelectNode {
                model_node_id: Some(1),
                ..Default::default()
            }),
            to: Some(SelectNode {
                model_node_id: Some(4),
                ..Default::default()
            }),
            ..Default::default()
        };
        let selection = select_facility(&net, &facility).unwrap();
        assert_eq!(selection.selection_type, RoadwaySelectionType::Segment);
        assert_eq!(selection.link_ids, vec![10, 20, 30]);
    }

    #[test]
    fn test_selection_cache_invalidates_on_network_change() {
        let mut net = named_net();
        let mut cache = SelectionCache::new();
        let facility = SelectFacility {
            links: Some(SelectLinks {
                name: Some(vec!["Main".to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(cache.get_or_resolve(&net, &facility).unwrap().link_ids.len(), 3);
        assert_eq!(cache.entries.len(), 1);

        let mut links = net.links().to_vec();
        links[0].name = "Broadway".to_string();
        net.commit_links(links).unwrap();
        assert_eq!(cache.get_or_resolve(&net, &facility).unwrap().link_ids.len(), 2);
    }

    #[test]
    fn test_selection_type_derivation() {
        let facility = SelectFacility::default();
        assert!(facility.selection_type().is_err());
    }
}
