pub mod edit;
pub mod error;
pub mod filters;
pub mod geo;
pub mod model;
pub mod network;
pub mod selection;
pub mod summary;

pub use error::RoadwayError;
pub use model::{Mode, RoadLink, RoadNode, RoadShape};
pub use network::RoadwayNetwork;
