//! transit property changes: set or change a property on the rows covered by
//! a service selection.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::TransitError;
use crate::feed::frequencies::frequency_overlaps_timespans;
use crate::feed::tables::{Frequency, StopTime, Trip};
use crate::feed::{Feed, FeedTables};
use crate::network::TransitNetwork;
use crate::selection::TransitSelection;
use switchyard_core::change::{append_project, ExistingValueConflict, PropertyChange};
use switchyard_core::time::Time;
use switchyard_core::value::PropertyValue;

const TRIPS_FIELDS: &[&str] = &[
    "route_id",
    "service_id",
    "direction_id",
    "trip_headsign",
    "trip_short_name",
];
const STOP_TIMES_FIELDS: &[&str] = &[
    "arrival_time",
    "departure_time",
    "pickup_type",
    "drop_off_type",
    "shape_dist_traveled",
];
const FREQUENCIES_FIELDS: &[&str] = &["headway_secs", "start_time", "end_time"];

/// the table a property change is routed to. `headway_secs` always routes to
/// frequencies; other properties route to the unique table carrying them.
fn table_for_property(property: &str) -> Result<&'static str, TransitError> {
    if property == "headway_secs" {
        return Ok("frequencies");
    }
    let mut tables = vec![];
    if TRIPS_FIELDS.contains(&property) {
        tables.push("trips");
    }
    if STOP_TIMES_FIELDS.contains(&property) {
        tables.push("stop_times");
    }
    if FREQUENCIES_FIELDS.contains(&property) {
        tables.push("frequencies");
    }
    match tables.as_slice() {
        [table] => Ok(table),
        [] => Err(TransitError::PropertyChange(format!(
            "property '{property}' not found in any implemented table"
        ))),
        _ => Err(TransitError::PropertyChange(format!(
            "property '{property}' found in multiple tables: {tables:?}"
        ))),
    }
}

fn parse_time(property: &str, value: &PropertyValue) -> Result<Time, TransitError> {
    let text = value.as_str().ok_or_else(|| {
        TransitError::PropertyChange(format!("'{property}' must be a time string, got {value}"))
    })?;
    Ok(Time::parse(text)?)
}

fn numeric(property: &str, value: &PropertyValue) -> Result<i64, TransitError> {
    value.as_i64().ok_or_else(|| {
        TransitError::PropertyChange(format!("'{property}' must be numeric, got {value}"))
    })
}

fn trip_value(trip: &Trip, property: &str) -> Option<PropertyValue> {
    match property {
        "route_id" => Some(PropertyValue::Str(trip.route_id.clone())),
        "service_id" => trip.service_id.clone().map(PropertyValue::Str),
        "direction_id" => trip.direction_id.map(PropertyValue::Int),
        "trip_headsign" => trip.trip_headsign.clone().map(PropertyValue::Str),
        "trip_short_name" => trip.trip_short_name.clone().map(PropertyValue::Str),
        _ => None,
    }
}

fn set_trip_value(trip: &mut Trip, property: &str, value: &PropertyValue) -> Result<(), TransitError> {
    match property {
        "service_id" => trip.service_id = value.as_str().map(|s| s.to_string()),
        "direction_id" => trip.direction_id = Some(numeric(property, value)?),
        "trip_headsign" => trip.trip_headsign = value.as_str().map(|s| s.to_string()),
        "trip_short_name" => trip.trip_short_name = value.as_str().map(|s| s.to_string()),
        _ => {
            return Err(TransitError::PropertyChange(format!(
                "cannot set trips property '{property}'"
            )))
        }
    }
    Ok(())
}

fn stop_time_value(stop_time: &StopTime, property: &str) -> Option<PropertyValue> {
    match property {
        "arrival_time" => stop_time.arrival_time.map(|t| PropertyValue::Str(t.to_string())),
        "departure_time" => stop_time.departure_time.map(|t| PropertyValue::Str(t.to_string())),
        "pickup_type" => Some(PropertyValue::Int(stop_time.pickup_type)),
        "drop_off_type" => Some(PropertyValue::Int(stop_time.drop_off_type)),
        "shape_dist_traveled" => stop_time.shape_dist_traveled.map(PropertyValue::Float),
        _ => None,
    }
}

fn set_stop_time_value(
    stop_time: &mut StopTime,
    property: &str,
    value: &PropertyValue,
) -> Result<(), TransitError> {
    match property {
        "arrival_time" => stop_time.arrival_time = Some(parse_time(property, value)?),
        "departure_time" => stop_time.departure_time = Some(parse_time(property, value)?),
        "pickup_type" => stop_time.pickup_type = numeric(property, value)?,
        "drop_off_type" => stop_time.drop_off_type = numeric(property, value)?,
        "shape_dist_traveled" => {
            stop_time.shape_dist_traveled = value.as_f64();
        }
        _ => {
            return Err(TransitError::PropertyChange(format!(
                "cannot set stop_times property '{property}'"
            )))
        }
    }
    Ok(())
}

fn frequency_value(frequency: &Frequency, property: &str) -> Option<PropertyValue> {
    match property {
        "headway_secs" => Some(PropertyValue::Int(frequency.headway_secs as i64)),
        "start_time" => Some(PropertyValue::Str(frequency.start_time.to_string())),
        "end_time" => Some(PropertyValue::Str(frequency.end_time.to_string())),
        _ => None,
    }
}

fn set_frequency_value(
    frequency: &mut Frequency,
    property: &str,
    value: &PropertyValue,
) -> Result<(), TransitError> {
    match property {
        "headway_secs" => frequency.headway_secs = numeric(property, value)? as u32,
        "start_time" => frequency.start_time = parse_time(property, value)?,
        "end_time" => frequency.end_time = parse_time(property, value)?,
        _ => {
            return Err(TransitError::PropertyChange(format!(
                "cannot set frequencies property '{property}'"
            )))
        }
    }
    Ok(())
}

fn check_existing(
    current: &[Option<PropertyValue>],
    change: &PropertyChange,
    property: &str,
    policy: ExistingValueConflict,
) -> Result<bool, TransitError> {
    let Some(expected) = &change.existing else {
        return Ok(true);
    };
    let all_match = current
        .iter()
        .all(|v| v.as_ref().map(|v| v.matches(expected)).unwrap_or(false));
    if all_match {
        return Ok(true);
    }
    log::warn!("existing {property} values do not all match expected value {expected}");
    match policy {
        ExistingValueConflict::Error => Err(TransitError::PropertyChange(format!(
            "existing '{property}' does not match asserted value"
        ))),
        ExistingValueConflict::Skip => Ok(false),
        ExistingValueConflict::Warn => Ok(true),
    }
}

fn updated_value(
    property: &str,
    current: Option<PropertyValue>,
    change: &PropertyChange,
) -> Result<PropertyValue, TransitError> {
    if let Some(value) = &change.set {
        return Ok(value.clone());
    }
    if let Some(delta) = &change.change {
        let current = current.ok_or_else(|| {
            TransitError::PropertyChange(format!(
                "cannot apply a change delta to unset '{property}'"
            ))
        })?;
        return current.checked_add(delta).ok_or_else(|| {
            TransitError::PropertyChange(format!(
                "cannot add {delta} to non-numeric '{property}' value {current}"
            ))
        });
    }
    Err(TransitError::PropertyChange(format!(
        "property change for '{property}' must include 'set' or 'change'"
    )))
}

/// apply property changes to the rows covered by the selection. properties
/// route to the trips, stop_times or frequencies table; frequency rows are
/// further narrowed by the selection's timespans.
pub fn apply_transit_property_change(
    net: &mut TransitNetwork,
    selection: &TransitSelection,
    property_changes: &IndexMap<String, PropertyChange>,
    project_name: Option<&str>,
) -> Result<(), TransitError> {
    log::debug!("applying transit property change for {} properties", property_changes.len());
    let mut tables: FeedTables = net.feed().to_tables();
    let selected: HashSet<&String> = selection.trip_ids.iter().collect();

    for (property, change) in property_changes {
        let table = table_for_property(property)?;
        log::debug!("...modifying {property} in {table}");
        let policy = change.existing_value_conflict.unwrap_or(ExistingValueConflict::Error);

        match table {
            "trips" => {
                let idx: Vec<usize> = tables
                    .trips
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| selected.contains(&t.trip_id))
                    .map(|(i, _)| i)
                    .collect();
                let current: Vec<Option<PropertyValue>> =
                    idx.iter().map(|i| trip_value(&tables.trips[*i], property)).collect();
                if !check_existing(&current, change, property, policy)? {
                    continue;
                }
                for (i, current) in idx.iter().zip(current) {
                    let value = updated_value(property, current, change)?;
                    set_trip_value(&mut tables.trips[*i], property, &value)?;
                    append_project(&mut tables.trips[*i].projects, project_name);
                }
            }
            "stop_times" => {
                let idx: Vec<usize> = tables
                    .stop_times
                    .iter()
                    .enumerate()
                    .filter(|(_, st)| selected.contains(&st.trip_id))
                    .map(|(i, _)| i)
                    .collect();
                let current: Vec<Option<PropertyValue>> = idx
                    .iter()
                    .map(|i| stop_time_value(&tables.stop_times[*i], property))
                    .collect();
                if !check_existing(&current, change, property, policy)? {
                    continue;
                }
                for (i, current) in idx.iter().zip(current) {
                    let value = updated_value(property, current, change)?;
                    set_stop_time_value(&mut tables.stop_times[*i], property, &value)?;
                    append_project(&mut tables.stop_times[*i].projects, project_name);
                }
            }
            _ => {
                let idx: Vec<usize> = tables
                    .frequencies
                    .iter()
                    .enumerate()
                    .filter(|(_, f)| selected.contains(&f.trip_id))
                    .filter(|(_, f)| {
                        selection
                            .timespans
                            .as_ref()
                            .map(|ts| frequency_overlaps_timespans(f, ts))
                            .unwrap_or(true)
                    })
                    .map(|(i, _)| i)
                    .collect();
                let current: Vec<Option<PropertyValue>> = idx
                    .iter()
                    .map(|i| frequency_value(&tables.frequencies[*i], property))
                    .collect();
                if !check_existing(&current, change, property, policy)? {
                    continue;
                }
                for (i, current) in idx.iter().zip(current) {
                    let value = updated_value(property, current, change)?;
                    set_frequency_value(&mut tables.frequencies[*i], property, &value)?;
                    append_project(&mut tables.frequencies[*i].projects, project_name);
                }
            }
        }
    }

    net.set_feed(Feed::new(tables)?)
}
