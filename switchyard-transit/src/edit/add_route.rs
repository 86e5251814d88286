//! addition of new transit routes, trips and their service to a feed.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::TransitError;
use crate::feed::tables::{Frequency, Route, ShapePoint, Stop, StopTime, Trip};
use crate::feed::{Feed, FeedTables};
use crate::network::TransitNetwork;
use crate::validate::shape_links_without_road_links;
use switchyard_core::change::append_project;
use switchyard_core::ids::create_str_int_combo_ids;
use switchyard_core::time::Timespan;
use switchyard_roadway::RoadwayNetwork;

/// boarding/alighting flags for a stop in a routing spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopFlags {
    pub stop: bool,
    pub board: bool,
    pub alight: bool,
}

impl Default for StopFlags {
    fn default() -> Self {
        StopFlags {
            stop: false,
            board: true,
            alight: true,
        }
    }
}

/// one node of a new route's routing: either a plain pass-through node id or
/// a node with stop/board/alight flags, keyed by the node id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoutingNode {
    Plain(i64),
    Flagged(HashMap<String, StopFlags>),
}

impl RoutingNode {
    pub fn node_id(&self) -> Result<i64, TransitError> {
        match self {
            RoutingNode::Plain(id) => Ok(*id),
            RoutingNode::Flagged(map) => map
                .keys()
                .next()
                .and_then(|k| k.parse::<i64>().ok())
                .ok_or_else(|| {
                    TransitError::RouteAdd(format!("invalid routing node key: {map:?}"))
                }),
        }
    }

    pub fn flags(&self) -> StopFlags {
        match self {
            RoutingNode::Plain(_) => StopFlags {
                stop: false,
                ..Default::default()
            },
            RoutingNode::Flagged(map) => map.values().next().cloned().unwrap_or_default(),
        }
    }
}

/// a service window with its headway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadwayWindow {
    pub timespan: Timespan,
    pub headway_secs: u32,
}

/// one trip pattern of a new route. a trip row is generated per headway
/// window, each with a single frequencies entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripAddition {
    #[serde(default)]
    pub direction_id: Option<i64>,
    pub headway_secs: Vec<HeadwayWindow>,
    pub routing: Vec<RoutingNode>,
}

/// a new route with its trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAddition {
    pub route_id: String,
    #[serde(default)]
    pub agency_id: Option<String>,
    #[serde(default)]
    pub route_short_name: Option<String>,
    #[serde(default)]
    pub route_long_name: Option<String>,
    pub route_type: i32,
    pub trips: Vec<TripAddition>,
}

/// add routes to the transit network. each trip's routing must traverse
/// existing transit-permissible roadway links; stops are created from
/// roadway nodes as needed.
pub fn apply_transit_route_addition(
    net: &mut TransitNetwork,
    route_additions: &[RouteAddition],
    reference_road_net: Option<&RoadwayNetwork>,
    project_name: Option<&str>,
) -> Result<(), TransitError> {
    log::debug!("adding {} routes to feed", route_additions.len());
    let road_handle = net.road_net_handle();
    let road_net = match reference_road_net.or(road_handle.as_deref()) {
        Some(road_net) => road_net,
        None => return Err(TransitError::MissingRoadNet("add a transit route")),
    };

    let mut tables = net.feed().to_tables();
    for addition in route_additions {
        add_route_to_tables(&mut tables, addition, road_net, project_name)?;
    }
    net.set_feed(Feed::new(tables)?)
}

fn add_route_to_tables(
    tables: &mut FeedTables,
    addition: &RouteAddition,
    road_net: &RoadwayNetwork,
    project_name: Option<&str>,
) -> Result<(), TransitError> {
    if tables.routes.iter().any(|r| r.route_id == addition.route_id) {
        return Err(TransitError::RouteAdd(format!(
            "route_id '{}' already exists",
            addition.route_id
        )));
    }
    let mut route = Route {
        route_id: addition.route_id.clone(),
        agency_id: addition.agency_id.clone(),
        route_short_name: addition.route_short_name.clone(),
        route_long_name: addition.route_long_name.clone(),
        route_type: addition.route_type,
        projects: String::new(),
    };
    append_project(&mut route.projects, project_name);
    tables.routes.push(route);

    log::debug!(
        "adding {} trip patterns for route '{}'",
        addition.trips.len(),
        addition.route_id
    );
    let taken: Vec<String> = tables.shapes.iter().map(|p| p.shape_id.clone()).collect();
    let shape_ids = create_str_int_combo_ids(addition.trips.len(), &taken, "", "");
    for (trip, shape_id) in addition.trips.iter().zip(shape_ids) {
        add_trip_pattern(tables, addition, trip, &shape_id, road_net, project_name)?;
    }
    Ok(())
}

fn add_trip_pattern(
    tables: &mut FeedTables,
    addition: &RouteAddition,
    trip: &TripAddition,
    shape_id: &str,
    road_net: &RoadwayNetwork,
    project_name: Option<&str>,
) -> Result<(), TransitError> {
    // shape rows with coordinates from the roadway nodes
    let mut shape_points = vec![];
    for (i, node) in trip.routing.iter().enumerate() {
        let node_id = node.node_id()?;
        let (lon, lat) = road_net.node_coords(node_id)?;
        let mut point = ShapePoint {
            shape_id: shape_id.to_string(),
            shape_pt_sequence: i as u32 + 1,
            shape_model_node_id: node_id,
            shape_pt_lat: Some(lat),
            shape_pt_lon: Some(lon),
            projects: String::new(),
        };
        append_project(&mut point.projects, project_name);
        shape_points.push(point);
    }
    let missing = shape_links_without_road_links(&shape_points, road_net.links());
    if !missing.is_empty() {
        return Err(TransitError::TransitRoadwayConsistency(missing));
    }
    tables.shapes.extend(shape_points);

    // stops for the routing's stop nodes, created from roadway nodes as
    // needed
    let stop_nodes: Vec<(i64, StopFlags)> = trip
        .routing
        .iter()
        .filter(|n| n.flags().stop)
        .map(|n| n.node_id().map(|id| (id, n.flags())))
        .collect::<Result<_, _>>()?;
    let existing_stops: HashSet<i64> = tables.stops.iter().map(|s| s.stop_id).collect();
    for (node_id, _) in &stop_nodes {
        if !existing_stops.contains(node_id)
            && !tables.stops.iter().any(|s| s.stop_id == *node_id)
        {
            let (lon, lat) = road_net.node_coords(*node_id)?;
            let mut stop = Stop {
                stop_id: *node_id,
                stop_id_gtfs: None,
                stop_lat: Some(lat),
                stop_lon: Some(lon),
                stop_name: None,
                projects: String::new(),
            };
            append_project(&mut stop.projects, project_name);
            tables.stops.push(stop);
        }
    }

    // one trip per headway window, each with a single frequencies row
    for (j, window) in trip.headway_secs.iter().enumerate() {
        let trip_id = format!("trip{j}_shp{shape_id}");
        let mut trip_row = Trip {
            trip_id: trip_id.clone(),
            route_id: addition.route_id.clone(),
            shape_id: shape_id.to_string(),
            service_id: None,
            direction_id: trip.direction_id,
            trip_headsign: None,
            trip_short_name: None,
            projects: String::new(),
        };
        append_project(&mut trip_row.projects, project_name);
        tables.trips.push(trip_row);

        let mut frequency = Frequency {
            trip_id: trip_id.clone(),
            start_time: window.timespan.start,
            end_time: window.timespan.end,
            headway_secs: window.headway_secs,
            projects: String::new(),
        };
        append_project(&mut frequency.projects, project_name);
        tables.frequencies.push(frequency);

        for (i, (node_id, flags)) in stop_nodes.iter().enumerate() {
            let mut stop_time = StopTime::new(&trip_id, i as u32 + 1, *node_id);
            stop_time.pickup_type = if flags.board { 0 } else { 1 };
            stop_time.drop_off_type = if flags.alight { 0 } else { 1 };
            append_project(&mut stop_time.projects, project_name);
            tables.stop_times.push(stop_time);
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::feed::testfeed::feed_with_trips;
    use std::rc::Rc;
    use switchyard_core::time::Time;
    use switchyard_roadway::{RoadLink, RoadNode};

    fn road_net() -> Rc<RoadwayNetwork> {
        let pairs = [(1, 2), (2, 3), (3, 4)];
        let nodes: Vec<RoadNode> = (1..=4)
            .map(|id| RoadNode::new(id, 0.001 * id as f64, 0.001))
            .collect();
        let links: Vec<RoadLink> = pairs
            .iter()
            .enumerate()
            .map(|(i, (a, b))| RoadLink::test_link(i as i64 + 1, *a, *b))
            .collect();
        Rc::new(RoadwayNetwork::new(links, nodes, vec![]).unwrap())
    }

    fn flagged(node_id: i64, stop: bool, board: bool, alight: bool) -> RoutingNode {
        let mut map = HashMap::new();
        map.insert(node_id.to_string(), StopFlags { stop, board, alight });
        RoutingNode::Flagged(map)
    }

    fn addition() -> RouteAddition {
        RouteAddition {
            route_id: "blue".to_string(),
            agency_id: None,
            route_short_name: Some("B".to_string()),
            route_long_name: None,
            route_type: 3,
            trips: vec![TripAddition {
                direction_id: Some(0),
                headway_secs: vec![
                    HeadwayWindow {
                        timespan: Timespan::new(Time::from_hms(6, 0, 0), Time::from_hms(9, 0, 0)),
                        headway_secs: 600,
                    },
                    HeadwayWindow {
                        timespan: Timespan::new(Time::from_hms(15, 0, 0), Time::from_hms(18, 0, 0)),
                        headway_secs: 900,
                    },
                ],
                routing: vec![
                    flagged(1, true, true, true),
                    RoutingNode::Plain(2),
                    flagged(3, true, true, false),
                    flagged(4, true, false, true),
                ],
            }],
        }
    }

    #[test]
    fn test_route_addition_creates_all_tables() {
        let mut net = TransitNetwork::new(feed_with_trips(&[("t1", "s1", vec![1, 2])]));
        net.set_road_net(road_net()).unwrap();
        apply_transit_route_addition(&mut net, &[addition()], None, Some("new blue line"))
            .unwrap();

        let feed = net.feed();
        assert_eq!(feed.routes().len(), 2);
        // one trip per headway window
        let new_trips: Vec<&Trip> =
            feed.trips().iter().filter(|t| t.route_id == "blue").collect();
        assert_eq!(new_trips.len(), 2);
        assert_eq!(feed.frequencies().len(), 3);

        // stops at flagged nodes only, with board/alight mapped to
        // pickup/drop_off types
        let trip_id = &new_trips[0].trip_id;
        let stop_times: Vec<&StopTime> = feed
            .stop_times()
            .iter()
            .filter(|st| &st.trip_id == trip_id)
            .collect();
        assert_eq!(
            stop_times.iter().map(|st| st.stop_id).collect::<Vec<_>>(),
            vec![1, 3, 4]
        );
        assert_eq!(stop_times[1].drop_off_type, 1, "no-alight stop");
        assert_eq!(stop_times[2].pickup_type, 1, "no-board stop");

        // shape includes the pass-through node
        let shape_id = &new_trips[0].shape_id;
        let shape_nodes: Vec<i64> = feed
            .shapes()
            .iter()
            .filter(|p| &p.shape_id == shape_id)
            .map(|p| p.shape_model_node_id)
            .collect();
        assert_eq!(shape_nodes, vec![1, 2, 3, 4]);

        // stop 4 did not exist and was created from the roadway node
        assert!(feed.stops().iter().any(|s| s.stop_id == 4));
    }

    #[test]
    fn test_route_addition_off_network_fails() {
        let mut net = TransitNetwork::new(feed_with_trips(&[("t1", "s1", vec![1, 2])]));
        net.set_road_net(road_net()).unwrap();
        let mut bad = addition();
        bad.trips[0].routing = vec![flagged(1, true, true, true), RoutingNode::Plain(9)];
        let result = apply_transit_route_addition(&mut net, &[bad], None, None);
        assert!(result.is_err());
        assert_eq!(net.feed().routes().len(), 1);
    }

    #[test]
    fn test_duplicate_route_id_rejected() {
        let mut net = TransitNetwork::new(feed_with_trips(&[("t1", "s1", vec![1, 2])]));
        net.set_road_net(road_net()).unwrap();
        let mut dup = addition();
        dup.route_id = "r1".to_string();
        assert!(matches!(
            apply_transit_route_addition(&mut net, &[dup], None, None),
            Err(TransitError::RouteAdd(_))
        ));
    }
}
