//! wrangler-flavored GTFS table records. the wrangler flavor binds the feed
//! to a roadway network: stop ids and shape points are roadway node ids.

use serde::{Deserialize, Serialize};

use switchyard_core::table::{TableError, TableRecord};
use switchyard_core::time::Time;

fn validation_error(table: &str, message: String) -> TableError {
    TableError::TableValidation {
        table: table.to_string(),
        message,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agency {
    pub agency_id: String,
    #[serde(default)]
    pub agency_name: Option<String>,
    #[serde(default)]
    pub agency_url: Option<String>,
    #[serde(default)]
    pub agency_timezone: Option<String>,
}

impl TableRecord for Agency {
    const TABLE_NAME: &'static str = "agencies";
    type Key = String;

    fn primary_key(&self) -> String {
        self.agency_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub route_id: String,
    #[serde(default)]
    pub agency_id: Option<String>,
    #[serde(default)]
    pub route_short_name: Option<String>,
    #[serde(default)]
    pub route_long_name: Option<String>,
    pub route_type: i32,
    #[serde(default)]
    pub projects: String,
}

impl TableRecord for Route {
    const TABLE_NAME: &'static str = "routes";
    type Key = String;

    fn primary_key(&self) -> String {
        self.route_id.clone()
    }

    fn validate(&self) -> Result<(), TableError> {
        if !(0..=12).contains(&self.route_type) {
            return Err(validation_error(
                Self::TABLE_NAME,
                format!("route '{}' has invalid route_type {}", self.route_id, self.route_type),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub trip_id: String,
    pub route_id: String,
    pub shape_id: String,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub direction_id: Option<i64>,
    #[serde(default)]
    pub trip_headsign: Option<String>,
    #[serde(default)]
    pub trip_short_name: Option<String>,
    #[serde(default)]
    pub projects: String,
}

impl TableRecord for Trip {
    const TABLE_NAME: &'static str = "trips";
    type Key = String;

    fn primary_key(&self) -> String {
        self.trip_id.clone()
    }
}

/// one point of a transit shape. `shape_model_node_id` is a roadway node id;
/// consecutive points within a shape must be joined by a transit-permissible
/// roadway link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapePoint {
    pub shape_id: String,
    pub shape_pt_sequence: u32,
    pub shape_model_node_id: i64,
    #[serde(default)]
    pub shape_pt_lat: Option<f64>,
    #[serde(default)]
    pub shape_pt_lon: Option<f64>,
    #[serde(default)]
    pub projects: String,
}

impl TableRecord for ShapePoint {
    const TABLE_NAME: &'static str = "shapes";
    type Key = (String, u32);

    fn primary_key(&self) -> (String, u32) {
        (self.shape_id.clone(), self.shape_pt_sequence)
    }
}

/// a transit stop. in the wrangler flavor, `stop_id` IS a roadway node id;
/// the id from the source GTFS data is retained in `stop_id_gtfs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub stop_id: i64,
    #[serde(default, rename = "stop_id_GTFS")]
    pub stop_id_gtfs: Option<String>,
    #[serde(default)]
    pub stop_lat: Option<f64>,
    #[serde(default)]
    pub stop_lon: Option<f64>,
    #[serde(default)]
    pub stop_name: Option<String>,
    #[serde(default)]
    pub projects: String,
}

impl TableRecord for Stop {
    const TABLE_NAME: &'static str = "stops";
    type Key = i64;

    fn primary_key(&self) -> i64 {
        self.stop_id
    }

    fn validate(&self) -> Result<(), TableError> {
        if let Some(lat) = self.stop_lat {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(validation_error(
                    Self::TABLE_NAME,
                    format!("stop {} has latitude {lat} outside bounds", self.stop_id),
                ));
            }
        }
        if let Some(lon) = self.stop_lon {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(validation_error(
                    Self::TABLE_NAME,
                    format!("stop {} has longitude {lon} outside bounds", self.stop_id),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopTime {
    pub trip_id: String,
    pub stop_sequence: u32,
    pub stop_id: i64,
    /// None means unspecified; a 00:00:00 arrival and departure pair on input
    /// is normalized to None.
    #[serde(default)]
    pub arrival_time: Option<Time>,
    #[serde(default)]
    pub departure_time: Option<Time>,
    #[serde(default)]
    pub pickup_type: i64,
    #[serde(default)]
    pub drop_off_type: i64,
    #[serde(default)]
    pub shape_dist_traveled: Option<f64>,
    #[serde(default)]
    pub projects: String,
}

impl StopTime {
    pub fn new(trip_id: &str, stop_sequence: u32, stop_id: i64) -> StopTime {
        StopTime {
            trip_id: trip_id.to_string(),
            stop_sequence,
            stop_id,
            arrival_time: None,
            departure_time: None,
            pickup_type: 0,
            drop_off_type: 0,
            shape_dist_traveled: None,
            projects: String::new(),
        }
    }
}

impl TableRecord for StopTime {
    const TABLE_NAME: &'static str = "stop_times";
    type Key = (String, u32);

    fn primary_key(&self) -> (String, u32) {
        (self.trip_id.clone(), self.stop_sequence)
    }

    fn validate(&self) -> Result<(), TableError> {
        if !(0..=3).contains(&self.pickup_type) || !(0..=3).contains(&self.drop_off_type) {
            return Err(validation_error(
                Self::TABLE_NAME,
                format!(
                    "stop_time ({}, {}) has invalid pickup/drop_off type",
                    self.trip_id, self.stop_sequence
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frequency {
    pub trip_id: String,
    pub start_time: Time,
    pub end_time: Time,
    pub headway_secs: u32,
    #[serde(default)]
    pub projects: String,
}

impl TableRecord for Frequency {
    const TABLE_NAME: &'static str = "frequencies";
    type Key = (String, Time);

    fn primary_key(&self) -> (String, Time) {
        (self.trip_id.clone(), self.start_time)
    }

    fn validate(&self) -> Result<(), TableError> {
        if self.headway_secs < 1 {
            return Err(validation_error(
                Self::TABLE_NAME,
                format!("frequency for trip '{}' has headway below 1 second", self.trip_id),
            ));
        }
        if self.end_time <= self.start_time {
            return Err(validation_error(
                Self::TABLE_NAME,
                format!("frequency for trip '{}' must have end_time after start_time", self.trip_id),
            ));
        }
        Ok(())
    }
}
