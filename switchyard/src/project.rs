//! typed project change records. a project card bundles an ordered list of
//! changes applied atomically to a scenario.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use switchyard_core::change::PropertyChange;
use switchyard_roadway::edit::LinkAddition;
use switchyard_roadway::selection::{SelectFacility, SelectLinks, SelectNodes};
use switchyard_roadway::RoadNode;
use switchyard_transit::edit::{RouteAddition, RoutingChange};
use switchyard_transit::selection::SelectService;

/// a node to add to the roadway network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAddition {
    pub model_node_id: i64,
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(default)]
    pub osm_node_id: Option<String>,
}

impl NodeAddition {
    pub fn to_node(&self) -> RoadNode {
        let mut node = RoadNode::new(self.model_node_id, self.x, self.y);
        node.osm_node_id = self.osm_node_id.clone();
        node
    }
}

fn default_true() -> bool {
    true
}

/// one declarative change within a project card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectChange {
    RoadwayPropertyChange {
        facility: SelectFacility,
        property_changes: IndexMap<String, PropertyChange>,
    },
    RoadwayAddition {
        #[serde(default)]
        links: Vec<LinkAddition>,
        #[serde(default)]
        nodes: Vec<NodeAddition>,
    },
    RoadwayDeletion {
        #[serde(default)]
        links: Option<SelectLinks>,
        #[serde(default)]
        nodes: Option<SelectNodes>,
        #[serde(default = "default_true")]
        clean_nodes: bool,
        #[serde(default = "default_true")]
        clean_shapes: bool,
    },
    TransitPropertyChange {
        service: SelectService,
        property_changes: IndexMap<String, PropertyChange>,
    },
    TransitRoutingChange {
        service: SelectService,
        routing: RoutingChange,
    },
    TransitRouteAddition {
        routes: Vec<RouteAddition>,
    },
    TransitServiceDeletion {
        service: SelectService,
        #[serde(default)]
        clean_shapes: bool,
        #[serde(default)]
        clean_routes: bool,
    },
}

/// project names this card depends on or excludes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dependencies {
    pub prerequisites: Vec<String>,
    pub corequisites: Vec<String>,
    pub conflicts: Vec<String>,
}

/// a named, declarative bundle of changes applied atomically to a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCard {
    pub project: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub dependencies: Dependencies,
    pub changes: Vec<ProjectChange>,
}

impl ProjectCard {
    pub fn new(project: &str, changes: Vec<ProjectChange>) -> ProjectCard {
        ProjectCard {
            project: project.to_string(),
            tags: vec![],
            dependencies: Dependencies::default(),
            changes,
        }
    }
}

/// keep only cards whose tag set intersects the filter tags. an empty filter
/// keeps everything.
pub fn filter_cards_by_tags(cards: Vec<ProjectCard>, filter_tags: &[String]) -> Vec<ProjectCard> {
    if filter_tags.is_empty() {
        return cards;
    }
    cards
        .into_iter()
        .filter(|card| card.tags.iter().any(|t| filter_tags.contains(t)))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_project_card_deserializes_from_card_shape() {
        let raw = r#"
        {
            "project": "widen main street",
            "tags": ["roadway"],
            "dependencies": {"prerequisites": ["fix bridge"]},
            "changes": [
                {
                    "roadway_property_change": {
                        "facility": {"links": {"name": ["Main"]}},
                        "property_changes": {"lanes": {"set": 3}}
                    }
                }
            ]
        }"#;
        let card: ProjectCard = serde_json::from_str(raw).unwrap();
        assert_eq!(card.project, "widen main street");
        assert_eq!(card.dependencies.prerequisites, vec!["fix bridge"]);
        assert!(matches!(
            card.changes[0],
            ProjectChange::RoadwayPropertyChange { .. }
        ));
    }

    #[test]
    fn test_transit_routing_change_deserializes() {
        let raw = r#"
        {
            "project": "reroute the blue line",
            "changes": [
                {
                    "transit_routing_change": {
                        "service": {"trip_properties": {"trip_id": ["t1"]}},
                        "routing": {"existing": [2, 3], "set": [2, -7, 6, 3]}
                    }
                }
            ]
        }"#;
        let card: ProjectCard = serde_json::from_str(raw).unwrap();
        match &card.changes[0] {
            ProjectChange::TransitRoutingChange { routing, .. } => {
                assert_eq!(routing.set, vec![2, -7, 6, 3]);
            }
            other => panic!("unexpected change: {other:?}"),
        }
    }

    #[test]
    fn test_tag_filter() {
        let cards = vec![
            ProjectCard {
                tags: vec!["transit".to_string()],
                ..ProjectCard::new("a", vec![])
            },
            ProjectCard::new("b", vec![]),
        ];
        let kept = filter_cards_by_tags(cards.clone(), &["transit".to_string()]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].project, "a");
        assert_eq!(filter_cards_by_tags(cards, &[]).len(), 2);
    }
}
