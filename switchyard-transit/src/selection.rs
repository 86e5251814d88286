//! resolution of declarative transit service selections into trip sets.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::TransitError;
use crate::feed::frequencies::trip_ids_for_timespans;
use crate::feed::segments::shapes_to_shape_links;
use crate::feed::Feed;
use switchyard_core::time::Timespan;
use switchyard_core::value::PropertyValue;
use switchyard_roadway::selection::Require;

/// a property filter value: a single value or an any-of list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(PropertyValue),
    Many(Vec<PropertyValue>),
}

impl FilterValue {
    fn matches(&self, actual: &Value) -> bool {
        match self {
            FilterValue::One(expected) => value_matches(expected, actual),
            FilterValue::Many(options) => options.iter().any(|v| value_matches(v, actual)),
        }
    }
}

fn value_matches(expected: &PropertyValue, actual: &Value) -> bool {
    match (expected, actual) {
        (PropertyValue::Str(e), Value::String(a)) => e == a,
        (PropertyValue::Bool(e), Value::Bool(a)) => e == a,
        (expected, Value::Number(a)) => {
            expected.as_f64().zip(a.as_f64()).map(|(e, a)| e == a).unwrap_or(false)
        }
        _ => false,
    }
}

/// selection of nodes a trip's shape must visit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectTransitNodes {
    pub node_ids: Vec<i64>,
    pub require: Require,
}

/// a transit service selection: trips narrowed by visited nodes, route
/// properties, trip properties, and service timespan, in that order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectService {
    pub nodes: Option<SelectTransitNodes>,
    pub route_properties: Option<IndexMap<String, FilterValue>>,
    pub trip_properties: Option<IndexMap<String, FilterValue>>,
    pub timespans: Option<Vec<Timespan>>,
}

/// a resolved service selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitSelection {
    pub trip_ids: Vec<String>,
    pub timespans: Option<Vec<Timespan>>,
}

fn record_fields<T: Serialize>(record: &T) -> serde_json::Map<String, Value> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    }
}

/// check the selection's filter fields exist on the tables they filter.
fn validate_filter_fields(
    filters: &IndexMap<String, FilterValue>,
    fields: &serde_json::Map<String, Value>,
    table: &str,
) -> Result<(), TransitError> {
    let missing: Vec<&String> = filters.keys().filter(|k| !fields.contains_key(*k)).collect();
    if !missing.is_empty() {
        return Err(TransitError::TransitSelectionEmpty(format!(
            "fields in selection but not in {table}: {missing:?}"
        )));
    }
    Ok(())
}

fn filter_by_properties<T: Serialize>(
    rows: &[T],
    filters: &IndexMap<String, FilterValue>,
    table: &str,
) -> Result<Vec<usize>, TransitError> {
    if let Some(first) = rows.first() {
        validate_filter_fields(filters, &record_fields(first), table)?;
    }
    Ok(rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            let fields = record_fields(*row);
            filters.iter().all(|(field, filter)| {
                fields.get(field).map(|actual| filter.matches(actual)).unwrap_or(false)
            })
        })
        .map(|(i, _)| i)
        .collect())
}

/// resolve a service selection to the trips it covers, narrowing in order by
/// nodes, route properties, trip properties and timespan. an empty result is
/// an error.
pub fn select_trips(feed: &Feed, selection: &SelectService) -> Result<TransitSelection, TransitError> {
    let mut trip_ids: Vec<String> = feed.trips().iter().map(|t| t.trip_id.clone()).collect();
    let total = trip_ids.len();

    if let Some(nodes) = &selection.nodes {
        let mut shape_nodes: HashMap<String, HashSet<i64>> = HashMap::new();
        for link in shapes_to_shape_links(feed.shapes()) {
            let entry = shape_nodes.entry(link.shape_id.clone()).or_default();
            entry.insert(link.a);
            entry.insert(link.b);
        }
        let keep_shapes: HashSet<&String> = shape_nodes
            .iter()
            .filter(|(_, visited)| match nodes.require {
                Require::All => nodes.node_ids.iter().all(|n| visited.contains(n)),
                Require::Any => nodes.node_ids.iter().any(|n| visited.contains(n)),
            })
            .map(|(shape_id, _)| shape_id)
            .collect();
        trip_ids.retain(|trip_id| {
            feed.trips()
                .iter()
                .find(|t| &t.trip_id == trip_id)
                .map(|t| keep_shapes.contains(&t.shape_id))
                .unwrap_or(false)
        });
    }

    if let Some(route_filters) = &selection.route_properties {
        let route_idx = filter_by_properties(feed.routes(), route_filters, "routes")?;
        let keep_routes: HashSet<&String> =
            route_idx.iter().map(|i| &feed.routes()[*i].route_id).collect();
        trip_ids.retain(|trip_id| {
            feed.trips()
                .iter()
                .find(|t| &t.trip_id == trip_id)
                .map(|t| keep_routes.contains(&t.route_id))
                .unwrap_or(false)
        });
    }

    if let Some(trip_filters) = &selection.trip_properties {
        let trip_idx = filter_by_properties(feed.trips(), trip_filters, "trips")?;
        let keep: HashSet<&String> = trip_idx.iter().map(|i| &feed.trips()[*i].trip_id).collect();
        trip_ids.retain(|trip_id| keep.contains(trip_id));
    }

    if let Some(timespans) = &selection.timespans {
        let keep = trip_ids_for_timespans(feed.frequencies(), timespans);
        trip_ids.retain(|trip_id| keep.contains(trip_id));
    }

    log::debug!("selected {}/{} trips", trip_ids.len(), total);
    if trip_ids.is_empty() {
        return Err(TransitError::TransitSelectionEmpty(format!("{selection:?}")));
    }
    Ok(TransitSelection {
        trip_ids,
        timespans: selection.timespans.clone(),
    })
}

/// cache of resolved service selections, keyed by a canonical hash of the
/// selector. entries are invalidated wholesale when the feed hash changes.
#[derive(Debug, Default)]
pub struct TransitSelectionCache {
    feed_hash: String,
    entries: HashMap<String, TransitSelection>,
}

impl TransitSelectionCache {
    pub fn new() -> TransitSelectionCache {
        TransitSelectionCache::default()
    }

    pub fn get_or_resolve(
        &mut self,
        feed: &Feed,
        selection: &SelectService,
    ) -> Result<TransitSelection, TransitError> {
        if self.feed_hash != feed.hash() {
            self.entries.clear();
            self.feed_hash = feed.hash().to_string();
        }
        let encoded = serde_json::to_vec(selection).unwrap_or_default();
        let key = hex::encode(Sha256::digest(&encoded));
        if let Some(selection) = self.entries.get(&key) {
            return Ok(selection.clone());
        }
        let resolved = select_trips(feed, selection)?;
        self.entries.insert(key, resolved.clone());
        Ok(resolved)
    }
}
