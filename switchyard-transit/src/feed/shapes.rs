//! filters and queries of the shapes table and its node patterns.

use std::collections::HashSet;

use super::stop_times::shape_with_stops_for_trip_id;
use super::tables::{ShapePoint, StopTime, Trip};
use crate::error::TransitError;

/// shape points for a shape, ordered by point sequence.
pub fn shape_points_for_shape_id(shapes: &[ShapePoint], shape_id: &str) -> Vec<ShapePoint> {
    let mut points: Vec<ShapePoint> = shapes
        .iter()
        .filter(|p| p.shape_id == shape_id)
        .cloned()
        .collect();
    points.sort_by_key(|p| p.shape_pt_sequence);
    points
}

/// the ordered node pattern of a shape.
pub fn node_pattern_for_shape_id(shapes: &[ShapePoint], shape_id: &str) -> Vec<i64> {
    shape_points_for_shape_id(shapes, shape_id)
        .iter()
        .map(|p| p.shape_model_node_id)
        .collect()
}

/// shape points of shapes referenced by the given trips.
pub fn shapes_for_trips(shapes: &[ShapePoint], trips: &[Trip]) -> Vec<ShapePoint> {
    let used: HashSet<&String> = trips.iter().map(|t| &t.shape_id).collect();
    let filtered: Vec<ShapePoint> =
        shapes.iter().filter(|p| used.contains(&p.shape_id)).cloned().collect();
    log::debug!(
        "filtered shapes to {}/{} points referenced by {} trips",
        filtered.len(),
        shapes.len(),
        trips.len()
    );
    filtered
}

/// the stop nodes bordering `node_id` in a trip's shape: the last stop before
/// it in the shape sequence and the first stop after it. zero means no stop
/// on that side. a node appearing more than once in the shape resolves to its
/// earliest occurrence.
pub fn find_nearest_stops(
    shapes: &[ShapePoint],
    trips: &[Trip],
    stop_times: &[StopTime],
    trip_id: &str,
    node_id: i64,
) -> Result<(i64, i64), TransitError> {
    let labeled = shape_with_stops_for_trip_id(shapes, trips, stop_times, trip_id);
    let node_idx = labeled
        .iter()
        .position(|(p, _)| p.shape_model_node_id == node_id)
        .ok_or_else(|| {
            TransitError::RoutingChange(format!(
                "node {node_id} is not in the shape for trip '{trip_id}'"
            ))
        })?;

    let before = labeled[..node_idx]
        .iter()
        .rev()
        .find(|(_, is_stop)| *is_stop)
        .map(|(p, _)| p.shape_model_node_id)
        .unwrap_or(0);
    let after = labeled[node_idx + 1..]
        .iter()
        .find(|(_, is_stop)| *is_stop)
        .map(|(p, _)| p.shape_model_node_id)
        .unwrap_or(0);
    Ok((before, after))
}
