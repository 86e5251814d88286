//! rescue conversion from plain GTFS stop_times to the wrangler flavor.
//!
//! plain GTFS keys stop_times by a string stop_id; the wrangler flavor keys
//! them by roadway node id. the conversion joins through the stops table's
//! retained `stop_id_GTFS` column.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::tables::{Stop, StopTime};
use crate::error::TransitError;
use switchyard_core::table::TableError;
use switchyard_core::time::Time;

/// a stop_times row as found in plain GTFS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GtfsStopTime {
    pub trip_id: String,
    pub stop_sequence: u32,
    pub stop_id: String,
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
}

/// convert GTFS stop_times to wrangler stop_times by joining the roadway
/// node id from the stops table on the GTFS stop_id.
pub fn gtfs_stop_times_to_wrangler(
    gtfs_stop_times: &[GtfsStopTime],
    stops: &[Stop],
) -> Result<Vec<StopTime>, TransitError> {
    let node_by_gtfs_id: HashMap<&str, i64> = stops
        .iter()
        .filter_map(|s| s.stop_id_gtfs.as_deref().map(|gtfs_id| (gtfs_id, s.stop_id)))
        .collect();

    gtfs_stop_times
        .iter()
        .map(|st| {
            let stop_id = node_by_gtfs_id.get(st.stop_id.as_str()).copied().ok_or_else(|| {
                TransitError::Table(TableError::TableValidation {
                    table: "stop_times".to_string(),
                    message: format!(
                        "GTFS stop_id '{}' has no stop with a model node id",
                        st.stop_id
                    ),
                })
            })?;
            Ok(StopTime {
                trip_id: st.trip_id.clone(),
                stop_sequence: st.stop_sequence,
                stop_id,
                arrival_time: st.arrival_time,
                departure_time: st.departure_time,
                pickup_type: st.pickup_type,
                drop_off_type: st.drop_off_type,
                shape_dist_traveled: st.shape_dist_traveled,
                projects: String::new(),
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn stop(stop_id: i64, gtfs_id: &str) -> Stop {
        Stop {
            stop_id,
            stop_id_gtfs: Some(gtfs_id.to_string()),
            stop_lat: None,
            stop_lon: None,
            stop_name: None,
            projects: String::new(),
        }
    }

    #[test]
    fn test_conversion_joins_node_ids() {
        let stops = vec![stop(101, "A"), stop(102, "B")];
        let gtfs = vec![
            GtfsStopTime {
                trip_id: "t1".to_string(),
                stop_sequence: 1,
                stop_id: "A".to_string(),
                arrival_time: None,
                departure_time: None,
                pickup_type: 0,
                drop_off_type: 0,
                shape_dist_traveled: None,
            },
            GtfsStopTime {
                trip_id: "t1".to_string(),
                stop_sequence: 2,
                stop_id: "B".to_string(),
                arrival_time: None,
                departure_time: None,
                pickup_type: 0,
                drop_off_type: 0,
                shape_dist_traveled: None,
            },
        ];
        let converted = gtfs_stop_times_to_wrangler(&gtfs, &stops).unwrap();
        assert_eq!(converted[0].stop_id, 101);
        assert_eq!(converted[1].stop_id, 102);
    }

    #[test]
    fn test_conversion_fails_on_unmapped_stop() {
        let stops = vec![stop(101, "A")];
        let gtfs = vec![GtfsStopTime {
            trip_id: "t1".to_string(),
            stop_sequence: 1,
            stop_id: "Z".to_string(),
            arrival_time: None,
            departure_time: None,
            pickup_type: 0,
            drop_off_type: 0,
            shape_dist_traveled: None,
        }];
        assert!(gtfs_stop_times_to_wrangler(&gtfs, &stops).is_err());
    }
}
