//! deterministic shortest-path search over a subnet graph.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::subnet::Subnet;
use super::SelectionError;

#[derive(Debug, Clone, Copy)]
struct SegmentEdge {
    model_link_id: i64,
    weight: u64,
}

/// search state ordered so that the heap pops the lowest cost first, breaking
/// ties by fewer hops and then by the lowest sum of node ids, making results
/// deterministic.
type Cost = (u64, u32, u64);

/// find the shortest path from `from_node` to `to_node` within the subnet
/// and return the traversed link ids in order.
///
/// edge weights are `1 + i * sp_weight_factor`, where `i` is the expansion
/// iteration that added the link, so links matching the initial selection are
/// strongly preferred.
pub fn shortest_path_links(
    subnet: &Subnet,
    from_node: i64,
    to_node: i64,
    sp_weight_factor: u64,
) -> Result<Vec<i64>, SelectionError> {
    let mut graph: DiGraph<i64, SegmentEdge> = DiGraph::new();
    let mut index: HashMap<i64, NodeIndex> = HashMap::new();
    for link in subnet.links() {
        let a = *index.entry(link.a).or_insert_with(|| graph.add_node(link.a));
        let b = *index.entry(link.b).or_insert_with(|| graph.add_node(link.b));
        graph.add_edge(
            a,
            b,
            SegmentEdge {
                model_link_id: link.model_link_id,
                weight: 1 + link.i as u64 * sp_weight_factor,
            },
        );
    }

    let (start, goal) = match (index.get(&from_node), index.get(&to_node)) {
        (Some(s), Some(g)) => (*s, *g),
        _ => return Err(SelectionError::SegmentSelection(from_node, to_node)),
    };

    let mut best: HashMap<NodeIndex, Cost> = HashMap::new();
    let mut prev: HashMap<NodeIndex, (NodeIndex, i64)> = HashMap::new();
    let mut heap: BinaryHeap<Reverse<(Cost, usize)>> = BinaryHeap::new();

    let start_cost: Cost = (0, 0, from_node as u64);
    best.insert(start, start_cost);
    heap.push(Reverse((start_cost, start.index())));

    while let Some(Reverse((cost, node_idx))) = heap.pop() {
        let node = NodeIndex::new(node_idx);
        if best.get(&node).is_some_and(|known| *known < cost) {
            continue;
        }
        if node == goal {
            break;
        }
        for edge in graph.edges(node) {
            let next = edge.target();
            let next_cost: Cost = (
                cost.0 + edge.weight().weight,
                cost.1 + 1,
                cost.2 + graph[next] as u64,
            );
            if best.get(&next).map(|known| next_cost < *known).unwrap_or(true) {
                best.insert(next, next_cost);
                prev.insert(next, (node, edge.weight().model_link_id));
                heap.push(Reverse((next_cost, next.index())));
            }
        }
    }

    if !best.contains_key(&goal) {
        return Err(SelectionError::SegmentSelection(from_node, to_node));
    }

    let mut link_ids = vec![];
    let mut cursor = goal;
    while cursor != start {
        let (parent, link_id) = prev[&cursor];
        link_ids.push(link_id);
        cursor = parent;
    }
    link_ids.reverse();
    Ok(link_ids)
}
