use switchyard_core::data::DataError;
use switchyard_core::ids::IdError;
use switchyard_core::table::TableError;
use switchyard_core::time::TimeError;
use switchyard_roadway::RoadwayError;

#[derive(thiserror::Error, Debug)]
pub enum TransitError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Roadway(#[from] RoadwayError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Id(#[from] IdError),
    #[error(transparent)]
    Time(#[from] TimeError),
    #[error("transit shapes traverse road links that do not exist or are not transit-permissible: {0:?}")]
    TransitRoadwayConsistency(Vec<(i64, i64)>),
    #[error("stop(s) reference roadway nodes that do not exist: {0:?}")]
    MissingStopNodes(Vec<i64>),
    #[error("no transit trips found with selection: {0}")]
    TransitSelectionEmpty(String),
    #[error("error applying transit property change: {0}")]
    PropertyChange(String),
    #[error("error applying transit routing change: {0}")]
    RoutingChange(String),
    #[error("error adding transit route: {0}")]
    RouteAdd(String),
    #[error("must have a reference road network set in order to {0}")]
    MissingRoadNet(&'static str),
}
