//! roadway editors. each editor validates and constructs the replacement
//! table(s) first and only publishes them through the network's commit
//! methods, so a failed edit leaves the network untouched.

mod links;
mod nodes;
mod shapes;

pub use links::{add_links, delete_links, edit_link_properties, LinkAddition};
pub use nodes::{add_nodes, delete_nodes, move_nodes, NodeGeometryChange};
pub use shapes::{add_shapes, delete_shapes};
