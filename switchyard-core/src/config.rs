//! runtime knobs governing id generation, edit conflict handling and managed
//! lane geometry. a scenario config may override any subset; unset fields keep
//! the documented defaults.

use serde::{Deserialize, Serialize};

use crate::change::ExistingValueConflict;
use crate::scope::OverwritePolicy;

/// how new ids are derived from the id of the row being copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdMethod {
    Scalar,
    Range,
}

/// parameters governing how new ids are generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdConfig {
    pub transit_shape_id_scalar: i64,
    pub road_shape_id_scalar: i64,
    pub ml_link_id_method: IdMethod,
    pub ml_link_id_range: (i64, i64),
    pub ml_link_id_scalar: i64,
    pub ml_node_id_method: IdMethod,
    pub ml_node_id_range: (i64, i64),
    pub ml_node_id_scalar: i64,
}

impl Default for IdConfig {
    fn default() -> Self {
        IdConfig {
            transit_shape_id_scalar: 1_000_000,
            road_shape_id_scalar: 1_000,
            ml_link_id_method: IdMethod::Range,
            ml_link_id_range: (950_000, 999_999),
            ml_link_id_scalar: 15_000,
            ml_node_id_method: IdMethod::Range,
            ml_node_id_range: (950_000, 999_999),
            ml_node_id_scalar: 15_000,
        }
    }
}

/// parameters governing how edits are handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditConfig {
    pub existing_value_conflict: ExistingValueConflict,
    pub overwrite_scoped: OverwritePolicy,
}

impl Default for EditConfig {
    fn default() -> Self {
        EditConfig {
            existing_value_conflict: ExistingValueConflict::Error,
            overwrite_scoped: OverwritePolicy::Conflicting,
        }
    }
}

/// parameters governing managed lane synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelRoadwayConfig {
    /// offset applied to the base geometry when synthesizing a managed lane
    /// geometry. the sign follows the offset primitive: negative offsets to
    /// the right-hand side of the direction of travel.
    pub ml_offset_meters: f64,
    pub additional_copy_from_gp_to_ml: Vec<String>,
    pub additional_copy_to_access_egress: Vec<String>,
}

impl Default for ModelRoadwayConfig {
    fn default() -> Self {
        ModelRoadwayConfig {
            ml_offset_meters: -10.0,
            additional_copy_from_gp_to_ml: vec![],
            additional_copy_to_access_egress: vec![],
        }
    }
}

/// the full set of runtime knobs. constructed from a scenario config and
/// cloned per network; there is no process-wide state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub ids: IdConfig,
    pub edits: EditConfig,
    pub model_roadway: ModelRoadwayConfig,
}
