//! the scenario orchestrator: applies an ordered list of project cards to a
//! base roadway and transit network under prerequisite, corequisite and
//! conflict constraints.

use std::collections::HashMap;

use crate::project::{ProjectCard, ProjectChange};
use switchyard_core::config::RuntimeConfig;
use switchyard_roadway::edit::{
    add_links, add_nodes, delete_links, delete_nodes, edit_link_properties,
};
use switchyard_roadway::selection::{
    select_facility, RoadwaySelectionType, SelectFacility, SelectionCache, SelectionError,
};
use switchyard_roadway::{RoadwayError, RoadwayNetwork};
use switchyard_transit::edit::{
    apply_transit_property_change, apply_transit_route_addition, apply_transit_routing_change,
    apply_transit_service_deletion,
};
use switchyard_transit::selection::{SelectService, TransitSelection, TransitSelectionCache};
use switchyard_transit::validate::validate_consistency;
use switchyard_transit::{TransitError, TransitNetwork};

#[derive(thiserror::Error, Debug)]
pub enum ScenarioError {
    #[error("project '{0}' has already been applied")]
    AlreadyApplied(String),
    #[error("project '{project}' has unapplied prerequisite(s): {missing:?}")]
    Prerequisite { project: String, missing: Vec<String> },
    #[error("project '{project}' conflicts with applied project(s): {conflicts:?}")]
    Conflict {
        project: String,
        conflicts: Vec<String>,
    },
    #[error("project '{project}' has corequisite(s) that are neither applied nor queued: {missing:?}")]
    Corequisite { project: String, missing: Vec<String> },
    #[error(transparent)]
    Roadway(#[from] RoadwayError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Transit(#[from] TransitError),
    #[error("unsupported change in project '{project}': {message}")]
    UnsupportedChange { project: String, message: String },
}

/// a scenario: base networks, the projects applied to them in order, and the
/// queue of projects still to apply. a project either fully applies or the
/// scenario is left at its pre-project state.
#[derive(Debug)]
pub struct Scenario {
    pub road_net: RoadwayNetwork,
    pub transit_net: TransitNetwork,
    pub config: RuntimeConfig,
    applied_projects: Vec<String>,
    queued_projects: Vec<ProjectCard>,
    /// conflicts declared by the base scenario and by applied projects:
    /// project name -> projects it conflicts with.
    conflicts: HashMap<String, Vec<String>>,
    roadway_selections: SelectionCache,
    transit_selections: TransitSelectionCache,
}

impl Scenario {
    pub fn new(road_net: RoadwayNetwork, transit_net: TransitNetwork) -> Scenario {
        let config = road_net.config.clone();
        Scenario {
            road_net,
            transit_net,
            config,
            applied_projects: vec![],
            queued_projects: vec![],
            conflicts: HashMap::new(),
            roadway_selections: SelectionCache::new(),
            transit_selections: TransitSelectionCache::new(),
        }
    }

    /// record projects applied before this scenario was created, along with
    /// the conflicts they declared.
    pub fn with_applied(
        mut self,
        applied_projects: Vec<String>,
        conflicts: HashMap<String, Vec<String>>,
    ) -> Scenario {
        self.applied_projects = applied_projects;
        self.conflicts = conflicts;
        self
    }

    pub fn applied_projects(&self) -> &[String] {
        &self.applied_projects
    }

    pub fn queued_projects(&self) -> &[ProjectCard] {
        &self.queued_projects
    }

    pub fn queue_project(&mut self, card: ProjectCard) {
        self.queued_projects.push(card);
    }

    /// apply all queued projects, in queue order.
    pub fn apply_all_projects(&mut self) -> Result<(), ScenarioError> {
        while !self.queued_projects.is_empty() {
            let card = self.queued_projects.remove(0);
            self.apply_project(&card)?;
        }
        Ok(())
    }

    /// resolve a roadway facility selection against the current network.
    pub fn select_facility(
        &mut self,
        facility: &SelectFacility,
    ) -> Result<switchyard_roadway::selection::RoadwaySelection, ScenarioError> {
        Ok(self.roadway_selections.get_or_resolve(&self.road_net, facility)?)
    }

    /// resolve a transit service selection against the current feed.
    pub fn select_service(
        &mut self,
        service: &SelectService,
    ) -> Result<TransitSelection, ScenarioError> {
        Ok(self
            .transit_selections
            .get_or_resolve(self.transit_net.feed(), service)?)
    }

    fn check_constraints(&self, card: &ProjectCard) -> Result<(), ScenarioError> {
        if self.applied_projects.contains(&card.project) {
            return Err(ScenarioError::AlreadyApplied(card.project.clone()));
        }

        let missing: Vec<String> = card
            .dependencies
            .prerequisites
            .iter()
            .filter(|p| !self.applied_projects.contains(p))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ScenarioError::Prerequisite {
                project: card.project.clone(),
                missing,
            });
        }

        let mut conflicts: Vec<String> = card
            .dependencies
            .conflicts
            .iter()
            .filter(|p| self.applied_projects.contains(p))
            .cloned()
            .collect();
        // conflicts declared against this project by the base scenario or by
        // already-applied projects
        for (project, declared) in &self.conflicts {
            if declared.contains(&card.project) && self.applied_projects.contains(project) {
                conflicts.push(project.clone());
            }
        }
        if !conflicts.is_empty() {
            return Err(ScenarioError::Conflict {
                project: card.project.clone(),
                conflicts,
            });
        }

        let missing: Vec<String> = card
            .dependencies
            .corequisites
            .iter()
            .filter(|p| {
                !self.applied_projects.contains(p)
                    && !self.queued_projects.iter().any(|q| &&q.project == p)
                    && **p != card.project
            })
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ScenarioError::Corequisite {
                project: card.project.clone(),
                missing,
            });
        }
        Ok(())
    }

    /// apply one project card. sub-changes are dispatched in declared order
    /// against copies of the networks; on any failure the scenario is left at
    /// its pre-project state.
    pub fn apply_project(&mut self, card: &ProjectCard) -> Result<(), ScenarioError> {
        log::info!("applying project '{}'", card.project);
        self.check_constraints(card)?;

        let mut road_net = self.road_net.deepcopy();
        let mut transit_net = self.transit_net.deepcopy();

        for change in &card.changes {
            self.apply_change(&mut road_net, &mut transit_net, change, &card.project)?;
        }

        // roadway edits may have invalidated the transit feed
        validate_consistency(transit_net.feed(), &road_net)
            .map_err(ScenarioError::Transit)?;

        self.road_net = road_net;
        self.transit_net = transit_net;
        self.applied_projects.push(card.project.clone());
        if !card.dependencies.conflicts.is_empty() {
            self.conflicts
                .insert(card.project.clone(), card.dependencies.conflicts.clone());
        }
        Ok(())
    }

    fn apply_change(
        &mut self,
        road_net: &mut RoadwayNetwork,
        transit_net: &mut TransitNetwork,
        change: &ProjectChange,
        project: &str,
    ) -> Result<(), ScenarioError> {
        match change {
            ProjectChange::RoadwayPropertyChange {
                facility,
                property_changes,
            } => {
                let selection = select_facility(road_net, facility)?;
                if selection.selection_type == RoadwaySelectionType::Nodes {
                    return Err(ScenarioError::UnsupportedChange {
                        project: project.to_string(),
                        message: "property changes on node selections are limited to geometry moves".to_string(),
                    });
                }
                edit_link_properties(
                    road_net,
                    &selection.link_ids,
                    property_changes,
                    Some(project),
                )?;
            }
            ProjectChange::RoadwayAddition { links, nodes } => {
                if !nodes.is_empty() {
                    add_nodes(road_net, nodes.iter().map(|n| n.to_node()).collect())?;
                }
                if !links.is_empty() {
                    add_links(road_net, links.clone(), Some(project))?;
                }
            }
            ProjectChange::RoadwayDeletion {
                links,
                nodes,
                clean_nodes,
                clean_shapes,
            } => {
                if let Some(select_links) = links {
                    let facility = SelectFacility {
                        links: Some(select_links.clone()),
                        ..Default::default()
                    };
                    let selection = select_facility(road_net, &facility)?;
                    delete_links(road_net, &selection.link_ids, *clean_nodes, *clean_shapes)?;
                }
                if let Some(select_nodes) = nodes {
                    let facility = SelectFacility {
                        nodes: Some(select_nodes.clone()),
                        ..Default::default()
                    };
                    let selection = select_facility(road_net, &facility)?;
                    delete_nodes(road_net, &selection.node_ids, false)?;
                }
            }
            ProjectChange::TransitPropertyChange {
                service,
                property_changes,
            } => {
                let selection = self
                    .transit_selections
                    .get_or_resolve(transit_net.feed(), service)?;
                apply_transit_property_change(
                    transit_net,
                    &selection,
                    property_changes,
                    Some(project),
                )?;
            }
            ProjectChange::TransitRoutingChange { service, routing } => {
                let selection = self
                    .transit_selections
                    .get_or_resolve(transit_net.feed(), service)?;
                apply_transit_routing_change(
                    transit_net,
                    &selection.trip_ids,
                    routing,
                    Some(road_net),
                    &self.config,
                    Some(project),
                )?;
            }
            ProjectChange::TransitRouteAddition { routes } => {
                apply_transit_route_addition(transit_net, routes, Some(road_net), Some(project))?;
            }
            ProjectChange::TransitServiceDeletion {
                service,
                clean_shapes,
                clean_routes,
            } => {
                let selection = self
                    .transit_selections
                    .get_or_resolve(transit_net.feed(), service)?;
                apply_transit_service_deletion(
                    transit_net,
                    &selection.trip_ids,
                    *clean_shapes,
                    *clean_routes,
                )?;
            }
        }
        Ok(())
    }
}
