//! transit editors. each editor builds a fully validated replacement feed
//! and only then publishes it to the network, so a failed edit leaves the
//! network untouched.

mod add_route;
mod delete_service;
mod property;
mod routing;

pub use add_route::{
    apply_transit_route_addition, HeadwayWindow, RouteAddition, RoutingNode, TripAddition,
};
pub use delete_service::apply_transit_service_deletion;
pub use property::apply_transit_property_change;
pub use routing::{apply_transit_routing_change, RoutingChange};
