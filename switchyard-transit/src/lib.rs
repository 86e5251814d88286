pub mod clip;
pub mod edit;
pub mod error;
pub mod feed;
pub mod network;
pub mod selection;
pub mod validate;

pub use error::TransitError;
pub use feed::Feed;
pub use network::TransitNetwork;
