//! add, delete and edit roadway links, including scoped property edits and
//! managed lane synthesis.

use std::collections::HashSet;

use geo::LineString;
use serde::{Deserialize, Serialize};

use switchyard_core::change::{append_project, ExistingValueConflict, PropertyChange};
use switchyard_core::scope::{
    expand_scoped_property_sets, merge_scoped_values, OverwritePolicy, ScopedValueItem,
};
use switchyard_core::value::PropertyValue;

use crate::error::RoadwayError;
use crate::filters::{orphan_node_ids, orphan_shape_ids};
use crate::geo::{length_miles, linestring_between, offset_linestring_meters};
use crate::model::{RoadLink, RoadNode, RoadShape};
use crate::network::RoadwayNetwork;

/// a link to be added. geometry and distance are synthesized from the
/// endpoint nodes when not provided.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkAddition {
    pub model_link_id: i64,
    #[serde(rename = "A")]
    pub a: i64,
    #[serde(rename = "B")]
    pub b: i64,
    pub name: Option<String>,
    pub roadway: Option<String>,
    pub lanes: Option<i64>,
    pub price: Option<f64>,
    pub distance: Option<f64>,
    pub geometry: Option<LineString<f64>>,
    pub shape_id: Option<String>,
    pub drive_access: Option<bool>,
    pub bike_access: Option<bool>,
    pub walk_access: Option<bool>,
    pub bus_only: Option<bool>,
    pub rail_only: Option<bool>,
    pub truck_access: Option<bool>,
}

impl LinkAddition {
    fn into_link(self, net: &RoadwayNetwork) -> Result<RoadLink, RoadwayError> {
        let geometry = match self.geometry {
            Some(geometry) => geometry,
            None => {
                let from = net.node_coords(self.a)?;
                let to = net.node_coords(self.b)?;
                linestring_between(from, to)
            }
        };
        let distance = self.distance.unwrap_or_else(|| length_miles(&geometry));
        let mut link = RoadLink::new(self.model_link_id, self.a, self.b, geometry, distance);
        if let Some(name) = self.name {
            link.name = name;
        }
        if let Some(roadway) = self.roadway {
            link.roadway = roadway;
        }
        link.lanes = self.lanes.unwrap_or(1);
        link.price = self.price.unwrap_or(0.0);
        link.shape_id = self.shape_id;
        link.drive_access = self.drive_access.unwrap_or(true);
        link.bike_access = self.bike_access.unwrap_or(true);
        link.walk_access = self.walk_access.unwrap_or(true);
        link.bus_only = self.bus_only.unwrap_or(false);
        link.rail_only = self.rail_only.unwrap_or(false);
        link.truck_access = self.truck_access.unwrap_or(true);
        Ok(link)
    }
}

/// add links to the network. link ids and (a, b) pairs must be new, and both
/// endpoint nodes must exist.
pub fn add_links(
    net: &mut RoadwayNetwork,
    additions: Vec<LinkAddition>,
    project_name: Option<&str>,
) -> Result<(), RoadwayError> {
    let existing_ids: HashSet<i64> = net.links().iter().map(|l| l.model_link_id).collect();
    let existing_ab: HashSet<(i64, i64)> = net.links().iter().map(|l| (l.a, l.b)).collect();

    let dup_ids: Vec<i64> = additions
        .iter()
        .map(|a| a.model_link_id)
        .filter(|id| existing_ids.contains(id))
        .collect();
    if !dup_ids.is_empty() {
        return Err(RoadwayError::LinkAdd(format!("link ids already exist: {dup_ids:?}")));
    }
    let dup_ab: Vec<(i64, i64)> = additions
        .iter()
        .map(|a| (a.a, a.b))
        .filter(|ab| existing_ab.contains(ab))
        .collect();
    if !dup_ab.is_empty() {
        return Err(RoadwayError::LinkAdd(format!("(A, B) pairs already exist: {dup_ab:?}")));
    }

    let mut links = net.links().to_vec();
    for addition in additions {
        let mut link = addition.into_link(net)?;
        append_project(&mut link.projects, project_name);
        links.push(link);
    }
    net.commit_links(links)
}

/// delete links from the network, optionally cascading to nodes and shapes
/// orphaned by the deletion.
pub fn delete_links(
    net: &mut RoadwayNetwork,
    link_ids: &[i64],
    clean_nodes: bool,
    clean_shapes: bool,
) -> Result<(), RoadwayError> {
    let wanted: HashSet<i64> = link_ids.iter().copied().collect();
    let existing: HashSet<i64> = net.links().iter().map(|l| l.model_link_id).collect();
    let missing: Vec<i64> = wanted.iter().copied().filter(|id| !existing.contains(id)).collect();
    if !missing.is_empty() {
        return Err(RoadwayError::LinkNotFound(missing));
    }

    let links: Vec<RoadLink> = net
        .links()
        .iter()
        .filter(|l| !wanted.contains(&l.model_link_id))
        .cloned()
        .collect();
    net.commit_links(links)?;

    if clean_nodes {
        let orphans = orphan_node_ids(net.links(), net.nodes());
        if !orphans.is_empty() {
            log::debug!("removing {} orphaned nodes after link deletion", orphans.len());
            let orphan_set: HashSet<i64> = orphans.into_iter().collect();
            let nodes: Vec<RoadNode> = net
                .nodes()
                .iter()
                .filter(|n| !orphan_set.contains(&n.model_node_id))
                .cloned()
                .collect();
            net.commit_nodes(nodes)?;
        }
    }
    if clean_shapes {
        let orphans = orphan_shape_ids(net.links(), net.shapes());
        if !orphans.is_empty() {
            log::debug!("removing {} orphaned shapes after link deletion", orphans.len());
            let orphan_set: HashSet<String> = orphans.into_iter().collect();
            let shapes: Vec<RoadShape> = net
                .shapes()
                .iter()
                .filter(|s| !orphan_set.contains(&s.shape_id))
                .cloned()
                .collect();
            net.commit_shapes(shapes)?;
        }
    }
    Ok(())
}

fn link_property_value(link: &RoadLink, property: &str) -> Option<PropertyValue> {
    match property {
        "lanes" => Some(PropertyValue::Int(link.lanes)),
        "price" => Some(PropertyValue::Float(link.price)),
        "distance" => Some(PropertyValue::Float(link.distance)),
        "name" => Some(PropertyValue::Str(link.name.clone())),
        "roadway" => Some(PropertyValue::Str(link.roadway.clone())),
        "drive_access" => Some(PropertyValue::Bool(link.drive_access)),
        "bike_access" => Some(PropertyValue::Bool(link.bike_access)),
        "walk_access" => Some(PropertyValue::Bool(link.walk_access)),
        "bus_only" => Some(PropertyValue::Bool(link.bus_only)),
        "rail_only" => Some(PropertyValue::Bool(link.rail_only)),
        "truck_access" => Some(PropertyValue::Bool(link.truck_access)),
        "ML_lanes" => link.ml_lanes.map(PropertyValue::Int),
        "ML_price" => link.ml_price.map(PropertyValue::Float),
        "ML_access_point" => Some(PropertyValue::Bool(link.ml_access_point)),
        "ML_egress_point" => Some(PropertyValue::Bool(link.ml_egress_point)),
        _ => None,
    }
}

fn type_error(property: &str, value: &PropertyValue) -> RoadwayError {
    RoadwayError::LinkChange {
        property: property.to_string(),
        message: format!("value '{value}' has the wrong type"),
    }
}

fn set_link_property(
    link: &mut RoadLink,
    property: &str,
    value: &PropertyValue,
) -> Result<(), RoadwayError> {
    match property {
        "lanes" => link.lanes = value.as_i64().ok_or_else(|| type_error(property, value))?,
        "price" => link.price = value.as_f64().ok_or_else(|| type_error(property, value))?,
        "distance" => link.distance = value.as_f64().ok_or_else(|| type_error(property, value))?,
        "name" => {
            link.name = value.as_str().ok_or_else(|| type_error(property, value))?.to_string()
        }
        "roadway" => {
            link.roadway = value.as_str().ok_or_else(|| type_error(property, value))?.to_string()
        }
        "drive_access" => {
            link.drive_access = value.as_bool().ok_or_else(|| type_error(property, value))?
        }
        "bike_access" => {
            link.bike_access = value.as_bool().ok_or_else(|| type_error(property, value))?
        }
        "walk_access" => {
            link.walk_access = value.as_bool().ok_or_else(|| type_error(property, value))?
        }
        "bus_only" => link.bus_only = value.as_bool().ok_or_else(|| type_error(property, value))?,
        "rail_only" => {
            link.rail_only = value.as_bool().ok_or_else(|| type_error(property, value))?
        }
        "truck_access" => {
            link.truck_access = value.as_bool().ok_or_else(|| type_error(property, value))?
        }
        "ML_lanes" => {
            link.ml_lanes = Some(value.as_i64().ok_or_else(|| type_error(property, value))?)
        }
        "ML_price" => {
            link.ml_price = Some(value.as_f64().ok_or_else(|| type_error(property, value))?)
        }
        _ => {
            return Err(RoadwayError::LinkChange {
                property: property.to_string(),
                message: "unknown link property".to_string(),
            })
        }
    }
    Ok(())
}

fn scoped_field<'a>(
    link: &'a mut RoadLink,
    property: &str,
) -> Option<&'a mut Vec<ScopedValueItem>> {
    match property {
        "lanes" => Some(&mut link.sc_lanes),
        "price" => Some(&mut link.sc_price),
        "ML_lanes" => Some(&mut link.sc_ml_lanes),
        "ML_price" => Some(&mut link.sc_ml_price),
        _ => None,
    }
}

/// mark links as managed lanes, synthesizing a managed lane geometry from the
/// base geometry where one is missing.
fn initialize_links_as_managed_lanes(
    links: &mut [RoadLink],
    link_idx: &[usize],
    geometry_offset_meters: f64,
) {
    for idx in link_idx {
        let link = &mut links[*idx];
        link.managed = 1;
        if link.ml_geometry.is_none() {
            link.ml_geometry = Some(offset_linestring_meters(&link.geometry, geometry_offset_meters));
        }
    }
}

/// set ML access or egress points: the value "all" sets true on every
/// selected link; a list of node ids restricts to links whose A (access) or
/// B (egress) node is listed.
fn edit_ml_access_egress_points(
    links: &mut [RoadLink],
    link_idx: &[usize],
    property: &str,
    value: &PropertyValue,
) -> Result<(), RoadwayError> {
    match value {
        PropertyValue::Str(s) if s == "all" => {
            for idx in link_idx {
                match property {
                    "ML_access_point" => links[*idx].ml_access_point = true,
                    _ => links[*idx].ml_egress_point = true,
                }
            }
            Ok(())
        }
        PropertyValue::IntList(node_ids) => {
            for idx in link_idx {
                let link = &mut links[*idx];
                match property {
                    "ML_access_point" if node_ids.contains(&link.a) => {
                        link.ml_access_point = true;
                    }
                    "ML_egress_point" if node_ids.contains(&link.b) => {
                        link.ml_egress_point = true;
                    }
                    _ => {}
                }
            }
            Ok(())
        }
        _ => Err(RoadwayError::LinkChange {
            property: property.to_string(),
            message: format!("must be a list of node ids or 'all': {value}"),
        }),
    }
}

/// check the asserted existing value against all selected links. returns
/// false if the change should be skipped.
fn check_existing_value(
    links: &[RoadLink],
    link_idx: &[usize],
    property: &str,
    change: &PropertyChange,
    policy: ExistingValueConflict,
) -> Result<bool, RoadwayError> {
    let Some(expected) = &change.existing else {
        return Ok(true);
    };
    let all_match = link_idx.iter().all(|idx| {
        link_property_value(&links[*idx], property)
            .map(|current| current.matches(expected))
            .unwrap_or(false)
    });
    if all_match {
        return Ok(true);
    }
    match policy {
        ExistingValueConflict::Error => Err(RoadwayError::ExistingValueConflict(property.to_string())),
        ExistingValueConflict::Skip => {
            log::warn!("skipping change for {property} because of conflict with existing value");
            Ok(false)
        }
        ExistingValueConflict::Warn => {
            log::warn!("changing {property} despite conflict with existing value");
            Ok(true)
        }
    }
}

fn apply_property_change(
    links: &mut Vec<RoadLink>,
    link_idx: &[usize],
    property: &str,
    change: &PropertyChange,
    config: &switchyard_core::config::RuntimeConfig,
) -> Result<(), RoadwayError> {
    log::debug!("editing {property} on {} links", link_idx.len());
    let existing_policy = change
        .existing_value_conflict
        .unwrap_or(config.edits.existing_value_conflict);
    let overwrite_scoped = change.overwrite_scoped.unwrap_or(config.edits.overwrite_scoped);

    if !check_existing_value(links, link_idx, property, change, existing_policy)? {
        return Ok(());
    }

    if property.starts_with("ML_") {
        initialize_links_as_managed_lanes(links, link_idx, config.model_roadway.ml_offset_meters);
    }

    if property == "ML_access_point" || property == "ML_egress_point" {
        if let Some(value) = &change.set {
            edit_ml_access_egress_points(links, link_idx, property, value)?;
        }
    } else if let Some(value) = &change.set {
        for idx in link_idx {
            set_link_property(&mut links[*idx], property, value)?;
        }
    } else if let Some(delta) = &change.change {
        for idx in link_idx {
            let current = link_property_value(&links[*idx], property).ok_or_else(|| {
                RoadwayError::LinkChange {
                    property: property.to_string(),
                    message: "cannot apply a change delta to an unset value".to_string(),
                }
            })?;
            let updated = current.checked_add(delta).ok_or_else(|| RoadwayError::LinkChange {
                property: property.to_string(),
                message: format!("cannot add {delta} to non-numeric value {current}"),
            })?;
            set_link_property(&mut links[*idx], property, &updated)?;
        }
    }

    if let Some(scoped) = &change.scoped {
        let set_items = expand_scoped_property_sets(scoped);
        for idx in link_idx {
            let default_value = link_property_value(&links[*idx], property)
                .unwrap_or(PropertyValue::Str(String::new()));
            let link = &mut links[*idx];
            let field = scoped_field(link, property).ok_or_else(|| RoadwayError::LinkChange {
                property: property.to_string(),
                message: "property does not support scoped values".to_string(),
            })?;
            *field = merge_scoped_values(field, &set_items, &default_value, overwrite_scoped)?;
        }
    }
    Ok(())
}

/// edit one or more properties on the selected links. changes are validated
/// and committed as a whole; on failure the network is unchanged.
pub fn edit_link_properties(
    net: &mut RoadwayNetwork,
    link_ids: &[i64],
    property_changes: &indexmap::IndexMap<String, PropertyChange>,
    project_name: Option<&str>,
) -> Result<(), RoadwayError> {
    let config = net.config.clone();
    let mut links = net.links().to_vec();

    let link_idx: Vec<usize> = link_ids
        .iter()
        .map(|id| {
            links
                .iter()
                .position(|l| l.model_link_id == *id)
                .ok_or_else(|| RoadwayError::LinkNotFound(vec![*id]))
        })
        .collect::<Result<_, _>>()?;

    let ml_property_changes = property_changes.keys().any(|p| p.starts_with("ML_"));
    let no_previously_managed = link_idx.iter().all(|idx| links[*idx].managed != 1);
    let creating_managed_lane = ml_property_changes && no_previously_managed;

    for (property, change) in property_changes {
        apply_property_change(&mut links, &link_idx, property, change, &config)?;
    }

    for idx in &link_idx {
        append_project(&mut links[*idx].projects, project_name);
        if ml_property_changes {
            append_project(&mut links[*idx].ml_projects, project_name);
        }
    }

    // a managed lane created without access or egress points is unusable;
    // open it up for the whole selection
    if creating_managed_lane {
        if link_idx.iter().all(|idx| !links[*idx].ml_access_point) {
            log::warn!("access point not set for a new managed lane; setting ML_access_point on all selected links");
            for idx in &link_idx {
                links[*idx].ml_access_point = true;
            }
        }
        if link_idx.iter().all(|idx| !links[*idx].ml_egress_point) {
            log::warn!("egress point not set for a new managed lane; setting ML_egress_point on all selected links");
            for idx in &link_idx {
                links[*idx].ml_egress_point = true;
            }
        }
    }

    net.commit_links(links)
}

#[cfg(test)]
mod test {
    use super::*;
    use indexmap::IndexMap;
    use switchyard_core::scope::ScopedPropertySet;
    use switchyard_core::time::{Time, Timespan};

    fn net() -> RoadwayNetwork {
        let nodes = vec![
            RoadNode::new(1, 0.0, 0.0),
            RoadNode::new(2, 0.01, 0.0),
            RoadNode::new(3, 0.02, 0.0),
        ];
        let mut link = RoadLink::test_link(10, 1, 2);
        link.lanes = 3;
        RoadwayNetwork::new(vec![link, RoadLink::test_link(20, 2, 3)], nodes, vec![]).unwrap()
    }

    fn changes(property: &str, change: PropertyChange) -> IndexMap<String, PropertyChange> {
        let mut map = IndexMap::new();
        map.insert(property.to_string(), change);
        map
    }

    #[test]
    fn test_add_links_synthesizes_geometry_and_distance() {
        let mut net = net();
        add_links(
            &mut net,
            vec![LinkAddition {
                model_link_id: 30,
                a: 3,
                b: 1,
                ..Default::default()
            }],
            Some("new connector"),
        )
        .unwrap();
        let link = net.link(30).unwrap();
        assert_eq!(link.geometry.0.len(), 2);
        assert!(link.distance > 0.0);
        assert_eq!(link.projects, "new connector,");
    }

    #[test]
    fn test_add_links_rejects_duplicate_ab() {
        let mut net = net();
        let result = add_links(
            &mut net,
            vec![LinkAddition {
                model_link_id: 99,
                a: 1,
                b: 2,
                ..Default::default()
            }],
            None,
        );
        assert!(matches!(result, Err(RoadwayError::LinkAdd(_))));
    }

    #[test]
    fn test_delete_links_cleans_orphans() {
        let mut net = net();
        delete_links(&mut net, &[10], true, false).unwrap();
        assert!(net.link(10).is_none());
        assert!(net.node(1).is_none(), "node 1 should be orphaned and removed");
        assert!(net.node(2).is_some());
    }

    #[test]
    fn test_set_and_change_property() {
        let mut net = net();
        edit_link_properties(
            &mut net,
            &[10],
            &changes("lanes", PropertyChange::set(PropertyValue::Int(2))),
            Some("lane drop"),
        )
        .unwrap();
        assert_eq!(net.link(10).unwrap().lanes, 2);
        assert_eq!(net.link(10).unwrap().projects, "lane drop,");

        edit_link_properties(
            &mut net,
            &[10],
            &changes("lanes", PropertyChange::change(PropertyValue::Int(1))),
            None,
        )
        .unwrap();
        assert_eq!(net.link(10).unwrap().lanes, 3);
    }

    #[test]
    fn test_existing_value_policies() {
        let mut net = net();
        let mut change = PropertyChange::set(PropertyValue::Int(2));
        change.existing = Some(PropertyValue::Int(99));
        let result = edit_link_properties(&mut net, &[10], &changes("lanes", change.clone()), None);
        assert!(matches!(result, Err(RoadwayError::ExistingValueConflict(_))));

        change.existing_value_conflict = Some(ExistingValueConflict::Skip);
        edit_link_properties(&mut net, &[10], &changes("lanes", change.clone()), None).unwrap();
        assert_eq!(net.link(10).unwrap().lanes, 3, "skipped change leaves value");

        change.existing_value_conflict = Some(ExistingValueConflict::Warn);
        edit_link_properties(&mut net, &[10], &changes("lanes", change), None).unwrap();
        assert_eq!(net.link(10).unwrap().lanes, 2);
    }

    #[test]
    fn test_scoped_property_edit() {
        let mut net = net();
        let mut change = PropertyChange::set(PropertyValue::Int(2));
        change.scoped = Some(vec![ScopedPropertySet {
            category: None,
            categories: None,
            timespan: Some(Timespan::new(
                Time::from_hms(6, 0, 0),
                Time::from_hms(9, 0, 0),
            )),
            timespans: None,
            set: Some(PropertyValue::Int(1)),
            change: None,
        }]);
        edit_link_properties(&mut net, &[10], &changes("lanes", change), None).unwrap();
        let link = net.link(10).unwrap();
        assert_eq!(link.lanes, 2);
        assert_eq!(link.sc_lanes.len(), 1);
        assert_eq!(link.sc_lanes[0].value, PropertyValue::Int(1));
    }

    #[test]
    fn test_ml_edit_initializes_managed_lane() {
        let mut net = net();
        edit_link_properties(
            &mut net,
            &[10],
            &changes("ML_lanes", PropertyChange::set(PropertyValue::Int(1))),
            Some("hov"),
        )
        .unwrap();
        let link = net.link(10).unwrap();
        assert_eq!(link.managed, 1);
        assert!(link.ml_geometry.is_some());
        assert_eq!(link.ml_lanes, Some(1));
        // no explicit access/egress: opened up for the selection
        assert!(link.ml_access_point);
        assert!(link.ml_egress_point);
        assert_eq!(link.ml_projects, "hov,");
    }

    #[test]
    fn test_ml_access_points_restricted_by_node_list() {
        let mut net = net();
        let mut property_changes = IndexMap::new();
        property_changes.insert(
            "ML_lanes".to_string(),
            PropertyChange::set(PropertyValue::Int(1)),
        );
        property_changes.insert(
            "ML_access_point".to_string(),
            PropertyChange::set(PropertyValue::IntList(vec![2])),
        );
        edit_link_properties(&mut net, &[10, 20], &property_changes, None).unwrap();
        assert!(!net.link(10).unwrap().ml_access_point, "A node 1 not in list");
        assert!(net.link(20).unwrap().ml_access_point, "A node 2 in list");
    }

    #[test]
    fn test_failed_edit_leaves_network_untouched() {
        let mut net = net();
        let hash = net.hash().to_string();
        let result = edit_link_properties(
            &mut net,
            &[10],
            &changes("lanes", PropertyChange::set(PropertyValue::Str("two".into()))),
            None,
        );
        assert!(result.is_err());
        assert_eq!(net.hash(), hash);
    }
}
