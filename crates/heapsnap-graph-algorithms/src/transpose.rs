//! Retainer index construction
//!
//! Transposes the containment edge list into a per-node list of incoming
//! edges with a two-pass counting sort: O(V + E) time, O(E) extra space.

use std::ops::Range;

/// Incoming-edge index addressed by node ordinal.
///
/// The retainers of ordinal `n` occupy slots
/// `first_retainer_index[n]..first_retainer_index[n + 1]` of
/// `retaining_nodes` (source ordinal) and `retaining_edges` (edge ordinal).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetainerIndex {
    pub first_retainer_index: Vec<u32>,
    pub retaining_nodes: Vec<u32>,
    pub retaining_edges: Vec<u32>,
}

impl RetainerIndex {
    /// Slot range of the retainers of `ordinal`.
    pub fn slots(&self, ordinal: usize) -> Range<usize> {
        self.first_retainer_index[ordinal] as usize..self.first_retainer_index[ordinal + 1] as usize
    }

    /// Number of retainers of `ordinal`.
    pub fn count(&self, ordinal: usize) -> usize {
        let slots = self.slots(ordinal);
        slots.end - slots.start
    }
}

/// Build the retainer index.
///
/// `edges_of` returns the edge ordinal range of a node and `target_of` the
/// target ordinal of an edge. Targets are expected to be validated by the
/// caller; an out-of-range target panics.
pub fn build_retainer_index<E, T>(
    node_count: usize,
    edge_count: usize,
    edges_of: E,
    target_of: T,
) -> RetainerIndex
where
    E: Fn(usize) -> Range<usize>,
    T: Fn(usize) -> usize,
{
    let mut retaining_nodes = vec![0u32; edge_count];
    let mut retaining_edges = vec![0u32; edge_count];
    let mut first_retainer_index = vec![0u32; node_count + 1];

    // 1. Count incoming edges per target
    for edge in 0..edge_count {
        first_retainer_index[target_of(edge)] += 1;
    }

    // 2. Counts -> starting slots. The first slot of every non-empty run
    //    temporarily holds the number of entries still to be placed.
    let mut first_unused_slot = 0u32;
    for ordinal in 0..node_count {
        let count = first_retainer_index[ordinal];
        first_retainer_index[ordinal] = first_unused_slot;
        if count > 0 {
            retaining_nodes[first_unused_slot as usize] = count;
        }
        first_unused_slot += count;
    }
    first_retainer_index[node_count] = edge_count as u32;

    // 3. Place every edge, walking sources in ordinal order
    for source in 0..node_count {
        for edge in edges_of(source) {
            let first_slot = first_retainer_index[target_of(edge)] as usize;
            retaining_nodes[first_slot] -= 1;
            let slot = first_slot + retaining_nodes[first_slot] as usize;
            retaining_nodes[slot] = source as u32;
            retaining_edges[slot] = edge as u32;
        }
    }

    RetainerIndex {
        first_retainer_index,
        retaining_nodes,
        retaining_edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_for(first_edge: &[usize], targets: &[usize]) -> RetainerIndex {
        let node_count = first_edge.len() - 1;
        build_retainer_index(
            node_count,
            targets.len(),
            |n| first_edge[n]..first_edge[n + 1],
            |e| targets[e],
        )
    }

    #[test]
    fn test_transpose_small_graph() {
        // 0 -> 1, 0 -> 2, 1 -> 2, 2 -> 0
        let first_edge = [0, 2, 3, 4];
        let targets = [1, 2, 2, 0];
        let index = index_for(&first_edge, &targets);

        assert_eq!(index.first_retainer_index, vec![0, 1, 2, 4]);

        let mut of_two: Vec<(u32, u32)> = index
            .slots(2)
            .map(|s| (index.retaining_nodes[s], index.retaining_edges[s]))
            .collect();
        of_two.sort();
        assert_eq!(of_two, vec![(0, 1), (1, 2)]);

        assert_eq!(index.count(0), 1);
        assert_eq!(index.retaining_nodes[index.slots(0).start], 2);
        assert_eq!(index.retaining_edges[index.slots(0).start], 3);
    }

    #[test]
    fn test_transpose_nodes_without_retainers() {
        // 0 -> 3 only; nodes 1 and 2 and the trailing node have no retainers
        let first_edge = [0, 1, 1, 1, 1];
        let targets = [3];
        let index = index_for(&first_edge, &targets);

        assert_eq!(index.first_retainer_index, vec![0, 0, 0, 0, 1]);
        assert_eq!(index.retaining_nodes, vec![0]);
        assert_eq!(index.retaining_edges, vec![0]);
    }

    #[test]
    fn test_first_retainer_index_is_monotonic() {
        let first_edge = [0, 3, 5, 6, 6];
        let targets = [1, 1, 3, 2, 3, 0];
        let index = index_for(&first_edge, &targets);

        for w in index.first_retainer_index.windows(2) {
            assert!(w[0] <= w[1]);
        }
        assert_eq!(*index.first_retainer_index.last().unwrap() as usize, targets.len());
    }
}
