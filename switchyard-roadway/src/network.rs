//! the roadway network: links, nodes and shapes tables bound by foreign keys
//! and a content hash.

use std::collections::{HashMap, HashSet};

use crate::error::RoadwayError;
use crate::model::{RoadLink, RoadNode, RoadShape};
use switchyard_core::config::RuntimeConfig;
use switchyard_core::table::{check_fk_values, db_hash, table_hash, validate_rows, TableError};

/// a roadway network. tables are only replaced through the `commit_*`
/// methods, which validate the incoming table, check foreign keys in both
/// directions, and recompute the content hash. equality is hash equality.
#[derive(Debug, Clone)]
pub struct RoadwayNetwork {
    links: Vec<RoadLink>,
    nodes: Vec<RoadNode>,
    shapes: Vec<RoadShape>,
    hash: String,
    pub config: RuntimeConfig,
}

impl RoadwayNetwork {
    pub fn new(
        links: Vec<RoadLink>,
        nodes: Vec<RoadNode>,
        shapes: Vec<RoadShape>,
    ) -> Result<RoadwayNetwork, RoadwayError> {
        let mut net = RoadwayNetwork {
            links: vec![],
            nodes: vec![],
            shapes: vec![],
            hash: String::new(),
            config: RuntimeConfig::default(),
        };
        // nodes and shapes first so link foreign keys can be checked
        net.commit_nodes(nodes)?;
        net.commit_shapes(shapes)?;
        net.commit_links(links)?;
        Ok(net)
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> RoadwayNetwork {
        self.config = config;
        self
    }

    pub fn links(&self) -> &[RoadLink] {
        &self.links
    }

    pub fn nodes(&self) -> &[RoadNode] {
        &self.nodes
    }

    pub fn shapes(&self) -> &[RoadShape] {
        &self.shapes
    }

    /// content hash over the link, node and shape tables.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn link(&self, model_link_id: i64) -> Option<&RoadLink> {
        self.links.iter().find(|l| l.model_link_id == model_link_id)
    }

    pub fn node(&self, model_node_id: i64) -> Option<&RoadNode> {
        self.nodes.iter().find(|n| n.model_node_id == model_node_id)
    }

    pub fn shape(&self, shape_id: &str) -> Option<&RoadShape> {
        self.shapes.iter().find(|s| s.shape_id == shape_id)
    }

    /// the directed link between two nodes, if one exists.
    pub fn link_between(&self, a: i64, b: i64) -> Option<&RoadLink> {
        self.links.iter().find(|l| l.a == a && l.b == b)
    }

    /// lon/lat coordinates of a node.
    pub fn node_coords(&self, model_node_id: i64) -> Result<(f64, f64), RoadwayError> {
        self.node(model_node_id)
            .map(|n| (n.x, n.y))
            .ok_or_else(|| RoadwayError::NodeNotFound(vec![model_node_id]))
    }

    pub fn node_ids(&self) -> HashSet<i64> {
        self.nodes.iter().map(|n| n.model_node_id).collect()
    }

    /// map of (a, b) node pair to link index, for path walks.
    pub fn links_by_ab(&self) -> HashMap<(i64, i64), usize> {
        self.links
            .iter()
            .enumerate()
            .map(|(i, l)| ((l.a, l.b), i))
            .collect()
    }

    /// replace the links table. validates rows, checks the (a, b) pair
    /// uniqueness invariant and foreign keys to nodes and shapes.
    pub fn commit_links(&mut self, links: Vec<RoadLink>) -> Result<(), RoadwayError> {
        validate_rows(&links)?;
        let mut seen_ab: HashSet<(i64, i64)> = HashSet::with_capacity(links.len());
        let mut dup_ab = 0;
        for link in &links {
            if !seen_ab.insert((link.a, link.b)) {
                dup_ab += 1;
            }
        }
        if dup_ab > 0 {
            return Err(TableError::DuplicateKey {
                table: "links".to_string(),
                key: "(A, B)".to_string(),
                count: dup_ab,
            }
            .into());
        }

        let node_ids = self.node_ids();
        check_fk_values(
            "links",
            "A/B",
            "nodes",
            "model_node_id",
            links.iter().flat_map(|l| [l.a, l.b]),
            &node_ids,
        )?;
        if self.shapes.is_empty() {
            if links.iter().any(|l| l.shape_id.is_some()) {
                log::warn!("links reference shape_ids but no shapes table is set; skipping fk validation");
            }
        } else {
            let shape_ids: HashSet<String> =
                self.shapes.iter().map(|s| s.shape_id.clone()).collect();
            check_fk_values(
                "links",
                "shape_id",
                "shapes",
                "shape_id",
                links.iter().filter_map(|l| l.shape_id.clone()),
                &shape_ids,
            )?;
        }

        self.links = links;
        self.rehash();
        Ok(())
    }

    /// replace the nodes table. every node still referenced by a link must be
    /// present.
    pub fn commit_nodes(&mut self, nodes: Vec<RoadNode>) -> Result<(), RoadwayError> {
        validate_rows(&nodes)?;
        let node_ids: HashSet<i64> = nodes.iter().map(|n| n.model_node_id).collect();
        check_fk_values(
            "links",
            "A/B",
            "nodes",
            "model_node_id",
            self.links.iter().flat_map(|l| [l.a, l.b]),
            &node_ids,
        )?;
        self.nodes = nodes;
        self.rehash();
        Ok(())
    }

    /// replace the shapes table. every shape still referenced by a link must
    /// be present, unless the table is being left empty entirely.
    pub fn commit_shapes(&mut self, shapes: Vec<RoadShape>) -> Result<(), RoadwayError> {
        validate_rows(&shapes)?;
        if shapes.is_empty() {
            if self.links.iter().any(|l| l.shape_id.is_some()) {
                log::warn!("removing shapes table while links reference shape_ids");
            }
        } else {
            let shape_ids: HashSet<String> = shapes.iter().map(|s| s.shape_id.clone()).collect();
            check_fk_values(
                "links",
                "shape_id",
                "shapes",
                "shape_id",
                self.links.iter().filter_map(|l| l.shape_id.clone()),
                &shape_ids,
            )?;
        }
        self.shapes = shapes;
        self.rehash();
        Ok(())
    }

    /// deep copy of the network. all tables are duplicated by value.
    pub fn deepcopy(&self) -> RoadwayNetwork {
        self.clone()
    }

    fn rehash(&mut self) {
        let hashes = [
            table_hash(&self.links),
            table_hash(&self.nodes),
            table_hash(&self.shapes),
        ];
        self.hash = db_hash(hashes.iter().map(|h| h.as_str()));
    }
}

impl PartialEq for RoadwayNetwork {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}
