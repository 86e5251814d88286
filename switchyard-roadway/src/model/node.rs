use geo::Point;
use serde::{Deserialize, Serialize};

use switchyard_core::table::{TableError, TableRecord};

/// a roadway node. coordinates are lon/lat (WGS84); the point geometry is
/// derived from `x`/`y`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadNode {
    pub model_node_id: i64,
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    pub geometry: Point<f64>,
    #[serde(default)]
    pub osm_node_id: Option<String>,
    #[serde(default)]
    pub projects: String,
}

impl RoadNode {
    pub fn new(model_node_id: i64, x: f64, y: f64) -> RoadNode {
        RoadNode {
            model_node_id,
            x,
            y,
            geometry: Point::new(x, y),
            osm_node_id: None,
            projects: String::new(),
        }
    }

    /// move the node, keeping the derived geometry in sync.
    pub fn set_xy(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        self.geometry = Point::new(x, y);
    }
}

impl TableRecord for RoadNode {
    const TABLE_NAME: &'static str = "nodes";
    type Key = i64;

    fn primary_key(&self) -> i64 {
        self.model_node_id
    }

    fn validate(&self) -> Result<(), TableError> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(TableError::TableValidation {
                table: Self::TABLE_NAME.to_string(),
                message: format!("node {} has non-finite coordinates", self.model_node_id),
            });
        }
        if !(-90.0..=90.0).contains(&self.y) || !(-180.0..=180.0).contains(&self.x) {
            return Err(TableError::TableValidation {
                table: Self::TABLE_NAME.to_string(),
                message: format!(
                    "node {} coordinates ({}, {}) outside lon/lat bounds",
                    self.model_node_id, self.x, self.y
                ),
            });
        }
        Ok(())
    }
}
