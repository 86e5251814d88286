use geo::LineString;
use serde::{Deserialize, Serialize};

use switchyard_core::table::{TableError, TableRecord};

/// the true geometry of one or more roadway links. shapes are keyed
/// independently of links and may be shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadShape {
    pub shape_id: String,
    pub geometry: LineString<f64>,
    #[serde(default)]
    pub projects: String,
}

impl RoadShape {
    pub fn new(shape_id: &str, geometry: LineString<f64>) -> RoadShape {
        RoadShape {
            shape_id: shape_id.to_string(),
            geometry,
            projects: String::new(),
        }
    }
}

impl TableRecord for RoadShape {
    const TABLE_NAME: &'static str = "shapes";
    type Key = String;

    fn primary_key(&self) -> String {
        self.shape_id.clone()
    }

    fn validate(&self) -> Result<(), TableError> {
        if self.geometry.0.len() < 2 {
            return Err(TableError::TableValidation {
                table: Self::TABLE_NAME.to_string(),
                message: format!("shape '{}' geometry has fewer than two vertices", self.shape_id),
            });
        }
        Ok(())
    }
}
