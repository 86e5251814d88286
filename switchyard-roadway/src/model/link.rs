use geo::LineString;
use serde::{Deserialize, Serialize};

use switchyard_core::scope::{has_conflicting_scopes, ScopedValueItem};
use switchyard_core::table::{TableError, TableRecord};

fn default_name() -> String {
    "unknown".to_string()
}

fn default_roadway() -> String {
    "road".to_string()
}

fn default_true() -> bool {
    true
}

/// a directed roadway link between nodes `a` and `b`.
///
/// the `ml_*` family describes a parallel managed lane and applies when
/// `managed == 1`. `managed` is -1 for a general purpose link parallel to a
/// managed lane, 0 for a plain link, 1 for a managed link. scoped override
/// lists (`sc_*`) sit next to the scalar default they override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadLink {
    pub model_link_id: i64,
    #[serde(rename = "A")]
    pub a: i64,
    #[serde(rename = "B")]
    pub b: i64,
    pub geometry: LineString<f64>,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default, rename = "ref")]
    pub ref_: Option<String>,
    #[serde(default = "default_roadway")]
    pub roadway: String,
    /// length in miles
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub lanes: i64,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_true")]
    pub drive_access: bool,
    #[serde(default = "default_true")]
    pub bike_access: bool,
    #[serde(default = "default_true")]
    pub walk_access: bool,
    #[serde(default)]
    pub bus_only: bool,
    #[serde(default)]
    pub rail_only: bool,
    #[serde(default = "default_true")]
    pub truck_access: bool,
    #[serde(default)]
    pub managed: i8,
    #[serde(default)]
    pub shape_id: Option<String>,
    #[serde(default)]
    pub osm_link_id: Option<String>,
    #[serde(default)]
    pub projects: String,
    #[serde(default)]
    pub sc_lanes: Vec<ScopedValueItem>,
    #[serde(default)]
    pub sc_price: Vec<ScopedValueItem>,
    #[serde(default, rename = "ML_geometry")]
    pub ml_geometry: Option<LineString<f64>>,
    #[serde(default, rename = "ML_lanes")]
    pub ml_lanes: Option<i64>,
    #[serde(default, rename = "ML_price")]
    pub ml_price: Option<f64>,
    #[serde(default, rename = "ML_access_point")]
    pub ml_access_point: bool,
    #[serde(default, rename = "ML_egress_point")]
    pub ml_egress_point: bool,
    #[serde(default, rename = "ML_projects")]
    pub ml_projects: String,
    #[serde(default, rename = "sc_ML_lanes")]
    pub sc_ml_lanes: Vec<ScopedValueItem>,
    #[serde(default, rename = "sc_ML_price")]
    pub sc_ml_price: Vec<ScopedValueItem>,
}

impl RoadLink {
    /// true if transit is allowed to traverse this link.
    pub fn is_transit_permissible(&self) -> bool {
        self.drive_access || self.bus_only || self.rail_only
    }

    pub fn is_managed(&self) -> bool {
        self.managed == 1
    }

    /// a new link with the given identity and geometry; every other column
    /// takes its schema default.
    pub fn new(model_link_id: i64, a: i64, b: i64, geometry: LineString<f64>, distance: f64) -> RoadLink {
        RoadLink {
            model_link_id,
            a,
            b,
            geometry,
            name: default_name(),
            ref_: None,
            roadway: default_roadway(),
            distance,
            lanes: 1,
            price: 0.0,
            drive_access: true,
            bike_access: true,
            walk_access: true,
            bus_only: false,
            rail_only: false,
            truck_access: true,
            managed: 0,
            shape_id: None,
            osm_link_id: None,
            projects: String::new(),
            sc_lanes: vec![],
            sc_price: vec![],
            ml_geometry: None,
            ml_lanes: None,
            ml_price: None,
            ml_access_point: false,
            ml_egress_point: false,
            ml_projects: String::new(),
            sc_ml_lanes: vec![],
            sc_ml_price: vec![],
        }
    }

    /// a drivable link with placeholder geometry, for use in tests.
    pub fn test_link(model_link_id: i64, a: i64, b: i64) -> RoadLink {
        RoadLink::new(
            model_link_id,
            a,
            b,
            LineString::from(vec![(0.0, 0.0), (0.001, 0.001)]),
            0.1,
        )
    }

    fn check_scoped(&self, field: &str, items: &[ScopedValueItem]) -> Result<(), TableError> {
        if has_conflicting_scopes(items) {
            return Err(TableError::TableValidation {
                table: Self::TABLE_NAME.to_string(),
                message: format!(
                    "link {} has conflicting scoped values in {field}",
                    self.model_link_id
                ),
            });
        }
        Ok(())
    }
}

impl TableRecord for RoadLink {
    const TABLE_NAME: &'static str = "links";
    type Key = i64;

    fn primary_key(&self) -> i64 {
        self.model_link_id
    }

    fn validate(&self) -> Result<(), TableError> {
        let fail = |message: String| TableError::TableValidation {
            table: Self::TABLE_NAME.to_string(),
            message,
        };
        if self.geometry.0.len() < 2 {
            return Err(fail(format!(
                "link {} geometry has fewer than two vertices",
                self.model_link_id
            )));
        }
        if self.distance < 0.0 {
            return Err(fail(format!("link {} has negative distance", self.model_link_id)));
        }
        if self.lanes < 0 {
            return Err(fail(format!("link {} has negative lanes", self.model_link_id)));
        }
        if self.price < 0.0 {
            return Err(fail(format!("link {} has negative price", self.model_link_id)));
        }
        if !(-1..=1).contains(&self.managed) {
            return Err(fail(format!(
                "link {} managed flag must be -1, 0 or 1",
                self.model_link_id
            )));
        }
        self.check_scoped("sc_lanes", &self.sc_lanes)?;
        self.check_scoped("sc_price", &self.sc_price)?;
        self.check_scoped("sc_ML_lanes", &self.sc_ml_lanes)?;
        self.check_scoped("sc_ML_price", &self.sc_ml_price)?;
        Ok(())
    }
}
