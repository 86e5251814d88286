use switchyard_core::scope::ScopeError;
use switchyard_core::table::TableError;

#[derive(thiserror::Error, Debug)]
pub enum RoadwayError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error("node id(s) already exist in the network: {0:?}")]
    NodeAdd(Vec<i64>),
    #[error("cannot delete node(s) still referenced by links: {0:?}")]
    NodeDeletion(Vec<i64>),
    #[error("node(s) not found in the network: {0:?}")]
    NodeNotFound(Vec<i64>),
    #[error("cannot add link(s): {0}")]
    LinkAdd(String),
    #[error("link(s) not found in the network: {0:?}")]
    LinkNotFound(Vec<i64>),
    #[error("shape id(s) already exist in the network: {0:?}")]
    ShapeAdd(Vec<String>),
    #[error("cannot delete shape(s) still referenced by links: {0:?}")]
    ShapeDeletion(Vec<String>),
    #[error("error changing property '{property}': {message}")]
    LinkChange { property: String, message: String },
    #[error("existing value does not match asserted value for property '{0}'")]
    ExistingValueConflict(String),
    #[error("no link found between consecutive nodes {0} and {1}")]
    MissingPathLink(i64, i64),
}
