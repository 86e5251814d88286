//! geometry helpers over lon/lat linestrings. lengths are computed
//! geodesically (haversine) rather than through a projected CRS.

use geo::{Coord, Haversine, Length, LineString, Point};

pub const METERS_PER_MILE: f64 = 1609.344;

const METERS_PER_DEGREE_LAT: f64 = 110_540.0;
const METERS_PER_DEGREE_LON_EQUATOR: f64 = 111_320.0;

/// geodesic length of a linestring in meters.
pub fn length_meters(geometry: &LineString<f64>) -> f64 {
    Haversine.length(geometry)
}

/// geodesic length of a linestring in miles.
pub fn length_miles(geometry: &LineString<f64>) -> f64 {
    length_meters(geometry) / METERS_PER_MILE
}

/// build a linestring from ordered lon/lat points.
pub fn linestring_from_points(points: &[Point<f64>]) -> LineString<f64> {
    LineString::from(points.iter().map(|p| (p.x(), p.y())).collect::<Vec<_>>())
}

/// build a straight two-point linestring between lon/lat coordinates.
pub fn linestring_between(from: (f64, f64), to: (f64, f64)) -> LineString<f64> {
    LineString::from(vec![from, to])
}

/// offset every vertex of a linestring perpendicular to the direction of
/// travel. positive meters offset to the left of travel, negative to the
/// right, matching the sign convention of the managed lane offset config.
pub fn offset_linestring_meters(geometry: &LineString<f64>, meters: f64) -> LineString<f64> {
    let coords = &geometry.0;
    if coords.len() < 2 || meters == 0.0 {
        return geometry.clone();
    }

    // per-segment unit normals in local meter space
    let normals: Vec<(f64, f64)> = coords
        .windows(2)
        .map(|pair| {
            let lat = (pair[0].y + pair[1].y) / 2.0;
            let meters_per_degree_lon = METERS_PER_DEGREE_LON_EQUATOR * lat.to_radians().cos();
            let dx = (pair[1].x - pair[0].x) * meters_per_degree_lon;
            let dy = (pair[1].y - pair[0].y) * METERS_PER_DEGREE_LAT;
            let len = (dx * dx + dy * dy).sqrt();
            if len == 0.0 {
                (0.0, 0.0)
            } else {
                (-dy / len, dx / len)
            }
        })
        .collect();

    let offset_coords: Vec<Coord<f64>> = coords
        .iter()
        .enumerate()
        .map(|(i, coord)| {
            // vertices between segments take the average of adjacent normals
            let (nx, ny) = match (i.checked_sub(1).and_then(|j| normals.get(j)), normals.get(i)) {
                (Some(prev), Some(next)) => ((prev.0 + next.0) / 2.0, (prev.1 + next.1) / 2.0),
                (Some(prev), None) => *prev,
                (None, Some(next)) => *next,
                (None, None) => (0.0, 0.0),
            };
            let meters_per_degree_lon = METERS_PER_DEGREE_LON_EQUATOR * coord.y.to_radians().cos();
            Coord {
                x: coord.x + nx * meters / meters_per_degree_lon,
                y: coord.y + ny * meters / METERS_PER_DEGREE_LAT,
            }
        })
        .collect();
    LineString::new(offset_coords)
}

/// which end of a linestring to edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    End,
}

/// replace the first or last vertex of a linestring. interior vertices are
/// left intact.
pub fn replace_endpoint(
    geometry: &LineString<f64>,
    endpoint: Endpoint,
    point: Point<f64>,
) -> LineString<f64> {
    let mut coords = geometry.0.clone();
    if coords.is_empty() {
        return geometry.clone();
    }
    let idx = match endpoint {
        Endpoint::Start => 0,
        Endpoint::End => coords.len() - 1,
    };
    coords[idx] = Coord {
        x: point.x(),
        y: point.y(),
    };
    LineString::new(coords)
}
