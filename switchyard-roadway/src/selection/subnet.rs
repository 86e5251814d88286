//! a subnet is a connected, modally-filtered subset of the link graph used
//! to find segments between two nodes.

use std::collections::HashSet;

use super::{SelectLinks, SelectionError};
use crate::filters::filter_links_to_modes;
use crate::model::{Mode, RoadLink};
use crate::network::RoadwayNetwork;

/// maximum breadth expansions after the initial name-based selection.
pub const DEFAULT_MAX_SEARCH_BREADTH: u32 = 10;

/// weight factor multiplied by a link's expansion iteration in the shortest
/// path search, penalizing links that did not match the initial selection.
pub const DEFAULT_SP_WEIGHT_FACTOR: u64 = 100;

/// a link in a subnet, tagged with the expansion iteration that added it.
/// links from the initial selection carry `i == 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubnetLink {
    pub model_link_id: i64,
    pub a: i64,
    pub b: i64,
    pub i: u32,
}

/// a connected selection of links used to identify segments.
#[derive(Debug, Clone)]
pub struct Subnet {
    links: Vec<SubnetLink>,
    modes: Vec<Mode>,
    i: u32,
    max_search_breadth: u32,
}

impl Subnet {
    pub fn new(links: Vec<SubnetLink>, modes: Vec<Mode>) -> Subnet {
        Subnet {
            links,
            modes,
            i: 0,
            max_search_breadth: DEFAULT_MAX_SEARCH_BREADTH,
        }
    }

    pub fn links(&self) -> &[SubnetLink] {
        &self.links
    }

    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    /// node ids currently connected by the subnet.
    pub fn node_ids(&self) -> HashSet<i64> {
        self.links.iter().flat_map(|l| [l.a, l.b]).collect()
    }

    /// expand the subnet until it connects all of `node_ids`, adding one
    /// breadth of adjacent modal links per iteration up to the maximum
    /// search breadth.
    pub fn expand_to_nodes(
        &mut self,
        net: &RoadwayNetwork,
        node_ids: &[i64],
    ) -> Result<(), SelectionError> {
        log::debug!("expanding subnet to include nodes {node_ids:?}");
        let wanted: HashSet<i64> = node_ids.iter().copied().collect();
        while !wanted.is_subset(&self.node_ids()) && self.i < self.max_search_breadth {
            self.expand_breadth(net);
        }
        if !wanted.is_subset(&self.node_ids()) {
            return Err(SelectionError::SubnetExpansion(
                node_ids.to_vec(),
                self.max_search_breadth,
            ));
        }
        Ok(())
    }

    /// add one degree of breadth: inbound links to subnet nodes, outbound
    /// links from subnet nodes, and links bridging two subnet nodes.
    fn expand_breadth(&mut self, net: &RoadwayNetwork) {
        self.i += 1;
        let nodes = self.node_ids();
        let in_subnet: HashSet<i64> = self.links.iter().map(|l| l.model_link_id).collect();
        let modal: Vec<&RoadLink> = filter_links_to_modes(net.links(), &self.modes);

        let added: Vec<SubnetLink> = modal
            .iter()
            .filter(|l| !in_subnet.contains(&l.model_link_id))
            .filter(|l| nodes.contains(&l.a) || nodes.contains(&l.b))
            .map(|l| SubnetLink {
                model_link_id: l.model_link_id,
                a: l.a,
                b: l.b,
                i: self.i,
            })
            .collect();
        log::debug!(
            "subnet breadth {}/{}: adding {} links to {} existing",
            self.i,
            self.max_search_breadth,
            added.len(),
            self.links.len()
        );
        self.links.extend(added);
    }
}

fn matches_selection(link: &RoadLink, names: Option<&Vec<String>>, refs: Option<&Vec<String>>) -> bool {
    let name_hit = names
        .map(|ns| ns.iter().any(|n| link.name.contains(n.as_str())))
        .unwrap_or(false);
    let ref_hit = refs
        .map(|rs| {
            link.ref_
                .as_deref()
                .map(|r| rs.iter().any(|n| r.contains(n.as_str())))
                .unwrap_or(false)
        })
        .unwrap_or(false);
    name_hit || ref_hit
}

/// build the initial subnet from a link selection. tries the selection as
/// given, then with ref values folded into the name search, then with name
/// values searched against the ref field.
pub fn generate_subnet_from_link_selection(
    net: &RoadwayNetwork,
    select: &SelectLinks,
) -> Result<Subnet, SelectionError> {
    let modal: Vec<&RoadLink> = filter_links_to_modes(net.links(), &select.modes);

    let mut options: Vec<(Option<Vec<String>>, Option<Vec<String>>)> =
        vec![(select.name.clone(), select.ref_.clone())];
    if let Some(refs) = &select.ref_ {
        let mut merged = select.name.clone().unwrap_or_default();
        merged.extend(refs.iter().cloned());
        options.push((Some(merged), None));
    }
    if let Some(names) = &select.name {
        options.push((None, Some(names.clone())));
    }

    for (names, refs) in &options {
        let initial: Vec<SubnetLink> = modal
            .iter()
            .filter(|l| matches_selection(l, names.as_ref(), refs.as_ref()))
            .map(|l| SubnetLink {
                model_link_id: l.model_link_id,
                a: l.a,
                b: l.b,
                i: 0,
            })
            .collect();
        if !initial.is_empty() {
            log::debug!("initial subnet has {} links", initial.len());
            return Ok(Subnet::new(initial, select.modes.clone()));
        }
    }
    log::error!("selection didn't return subnet links: {select:?}");
    Err(SelectionError::SubnetCreation)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{RoadLink, RoadNode};

    /// a grid where "Main" runs 1-2-3-4 and a side street connects 2-5.
    fn net_with_side_street() -> RoadwayNetwork {
        let nodes: Vec<RoadNode> = (1..=5)
            .map(|id| RoadNode::new(id, 0.01 * id as f64, 0.0))
            .collect();
        let mut links = vec![
            RoadLink::test_link(10, 1, 2),
            RoadLink::test_link(20, 2, 3),
            RoadLink::test_link(30, 3, 4),
            RoadLink::test_link(40, 2, 5),
        ];
        links[0].name = "Main".to_string();
        links[1].name = "Main".to_string();
        links[2].name = "Main".to_string();
        links[3].name = "Side".to_string();
        RoadwayNetwork::new(links, nodes, vec![]).unwrap()
    }

    #[test]
    fn test_initial_subnet_from_name() {
        let net = net_with_side_street();
        let select = SelectLinks {
            name: Some(vec!["Main".to_string()]),
            ..Default::default()
        };
        let subnet = generate_subnet_from_link_selection(&net, &select).unwrap();
        assert_eq!(subnet.num_links(), 3);
        assert!(subnet.node_ids().contains(&1));
        assert!(!subnet.node_ids().contains(&5));
    }

    #[test]
    fn test_empty_initial_selection_fails() {
        let net = net_with_side_street();
        let select = SelectLinks {
            name: Some(vec!["Nowhere".to_string()]),
            ..Default::default()
        };
        assert!(matches!(
            generate_subnet_from_link_selection(&net, &select),
            Err(SelectionError::SubnetCreation)
        ));
    }

    #[test]
    fn test_ref_fallback_searches_name_field() {
        let net = net_with_side_street();
        let select = SelectLinks {
            ref_: Some(vec!["Main".to_string()]),
            ..Default::default()
        };
        let subnet = generate_subnet_from_link_selection(&net, &select).unwrap();
        assert_eq!(subnet.num_links(), 3);
    }

    #[test]
    fn test_expansion_reaches_off_selection_node() {
        let net = net_with_side_street();
        let select = SelectLinks {
            name: Some(vec!["Main".to_string()]),
            ..Default::default()
        };
        let mut subnet = generate_subnet_from_link_selection(&net, &select).unwrap();
        subnet.expand_to_nodes(&net, &[1, 5]).unwrap();
        assert!(subnet.node_ids().contains(&5));
        let added = subnet
            .links()
            .iter()
            .find(|l| l.model_link_id == 40)
            .unwrap();
        assert_eq!(added.i, 1);
    }

    #[test]
    fn test_expansion_failure_when_unreachable() {
        let nodes = vec![
            RoadNode::new(1, 0.0, 0.0),
            RoadNode::new(2, 0.01, 0.0),
            RoadNode::new(9, 0.5, 0.5),
        ];
        let mut link = RoadLink::test_link(10, 1, 2);
        link.name = "Main".to_string();
        let net = RoadwayNetwork::new(vec![link], nodes, vec![]).unwrap();
        let select = SelectLinks {
            name: Some(vec!["Main".to_string()]),
            ..Default::default()
        };
        let mut subnet = generate_subnet_from_link_selection(&net, &select).unwrap();
        assert!(matches!(
            subnet.expand_to_nodes(&net, &[1, 9]),
            Err(SelectionError::SubnetExpansion(_, _))
        ));
    }
}
