//! conversion of shape point sequences into links and contiguous segments.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use super::tables::ShapePoint;

/// one consecutive pair of shape points, relatable to a roadway link (a, b).
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeLink {
    pub shape_id: String,
    pub seq_a: u32,
    pub seq_b: u32,
    pub a: i64,
    pub b: i64,
}

/// convert shape points to shape links: one record per consecutive pair of
/// points within each shape, ordered by point sequence.
pub fn shapes_to_shape_links(shapes: &[ShapePoint]) -> Vec<ShapeLink> {
    let mut by_shape: HashMap<&str, Vec<&ShapePoint>> = HashMap::new();
    for point in shapes {
        by_shape.entry(&point.shape_id).or_default().push(point);
    }
    let mut links = vec![];
    for (_, mut points) in by_shape.into_iter().sorted_by(|a, b| a.0.cmp(b.0)) {
        points.sort_by_key(|p| p.shape_pt_sequence);
        for (from, to) in points.iter().tuple_windows() {
            links.push(ShapeLink {
                shape_id: from.shape_id.clone(),
                seq_a: from.shape_pt_sequence,
                seq_b: to.shape_pt_sequence,
                a: from.shape_model_node_id,
                b: to.shape_model_node_id,
            });
        }
    }
    links
}

/// the longest chained run of shape links per shape, as an inclusive
/// (start sequence, end sequence) pair.
pub fn shape_links_to_longest_segments(shape_links: &[ShapeLink]) -> HashMap<String, (u32, u32)> {
    let mut longest: HashMap<String, (u32, u32, usize)> = HashMap::new();
    let mut run: Option<(String, u32, u32, usize)> = None;

    let mut close_run = |run: &mut Option<(String, u32, u32, usize)>| {
        if let Some((shape_id, start, end, len)) = run.take() {
            let entry = longest.entry(shape_id).or_insert((start, end, 0));
            if len > entry.2 {
                *entry = (start, end, len);
            }
        }
    };

    for link in shape_links {
        let continues = matches!(
            &run,
            Some((shape_id, _, end, _)) if shape_id == &link.shape_id && *end == link.seq_a
        );
        if continues {
            if let Some(r) = run.as_mut() {
                r.2 = link.seq_b;
                r.3 += 1;
            }
        } else {
            close_run(&mut run);
            run = Some((link.shape_id.clone(), link.seq_a, link.seq_b, 1));
        }
    }
    close_run(&mut run);

    longest
        .into_iter()
        .map(|(shape_id, (start, end, _))| (shape_id, (start, end)))
        .collect()
}

/// retain only shape points within the given per-shape segment bounds.
/// shapes with no segment are dropped.
pub fn filter_shapes_to_segments(
    shapes: &[ShapePoint],
    segments: &HashMap<String, (u32, u32)>,
) -> Vec<ShapePoint> {
    shapes
        .iter()
        .filter(|p| {
            segments
                .get(&p.shape_id)
                .map(|(start, end)| (*start..=*end).contains(&p.shape_pt_sequence))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// filter shapes to the longest contiguous run of consecutive point pairs
/// that exist in the given roadway (a, b) link set.
pub fn shapes_for_road_links(
    shapes: &[ShapePoint],
    road_links: &HashSet<(i64, i64)>,
) -> Vec<ShapePoint> {
    let shape_links: Vec<ShapeLink> = shapes_to_shape_links(shapes)
        .into_iter()
        .filter(|link| road_links.contains(&(link.a, link.b)))
        .collect();
    let segments = shape_links_to_longest_segments(&shape_links);
    filter_shapes_to_segments(shapes, &segments)
}

#[cfg(test)]
mod test {
    use super::*;

    fn shape_points(shape_id: &str, nodes: &[i64]) -> Vec<ShapePoint> {
        nodes
            .iter()
            .enumerate()
            .map(|(i, node)| ShapePoint {
                shape_id: shape_id.to_string(),
                shape_pt_sequence: i as u32 + 1,
                shape_model_node_id: *node,
                shape_pt_lat: None,
                shape_pt_lon: None,
                projects: String::new(),
            })
            .collect()
    }

    #[test]
    fn test_shapes_to_shape_links() {
        let links = shapes_to_shape_links(&shape_points("s1", &[1, 2, 3]));
        assert_eq!(links.len(), 2);
        assert_eq!((links[0].a, links[0].b), (1, 2));
        assert_eq!((links[1].a, links[1].b), (2, 3));
    }

    #[test]
    fn test_longest_segment_retained_per_shape() {
        // shape visits 1-2-3-4, then wanders off-network, then re-enters at
        // 1-2: only the longer 1..4 run should be retained
        let mut points = shape_points("s2", &[1, 2, 3, 4, 9, 1, 2]);
        let road: HashSet<(i64, i64)> = [(1, 2), (2, 3), (3, 4)].into_iter().collect();
        let retained = shapes_for_road_links(&points, &road);
        assert_eq!(retained.len(), 4);
        assert_eq!(
            retained.iter().map(|p| p.shape_model_node_id).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );

        // drop the middle link so the runs are 1-2 and 3-4; the first of the
        // equal-length runs wins
        points = shape_points("s2", &[1, 2, 9, 3, 4]);
        let retained = shapes_for_road_links(&points, &road);
        assert_eq!(
            retained.iter().map(|p| p.shape_model_node_id).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }
}
