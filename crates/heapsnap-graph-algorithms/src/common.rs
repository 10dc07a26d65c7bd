//! Shared definitions for the graph passes
//!
//! The passes never look at the profiler's flat record layout directly. They
//! address nodes by ordinal and edges by edge ordinal (record number in the
//! edge array), and ask the graph for everything else through
//! [`DominanceGraph`].

use std::ops::Range;

/// Distance value of a node not reached by any BFS pass.
pub const NO_DISTANCE: i32 = -5;

/// Read-only view of a heap graph, sufficient for the analysis passes.
pub trait DominanceGraph {
    /// Number of nodes.
    fn node_count(&self) -> usize;

    /// Ordinal of the root node.
    fn root_ordinal(&self) -> usize;

    /// Edge ordinals of the outgoing edges of `ordinal`.
    fn edges(&self, ordinal: usize) -> Range<usize>;

    /// Target node ordinal of `edge`.
    fn edge_target(&self, edge: usize) -> usize;

    /// Slots of the incoming edges of `ordinal` in the retainer index.
    fn retainer_slots(&self, ordinal: usize) -> Range<usize>;

    /// `(source ordinal, edge ordinal)` stored at retainer `slot`.
    fn retainer(&self, slot: usize) -> (usize, usize);

    /// Weak edges never contribute to distances.
    fn is_weak(&self, edge: usize) -> bool;

    /// Whether `edge` (from `from` to `to`) counts as an ownership path.
    ///
    /// Both the post-order and the dominator pass consult this, so the two
    /// always agree on which edges exist.
    fn is_dominance_edge(&self, from: usize, edge: usize, to: usize) -> bool;
}

#[cfg(test)]
pub(crate) mod test_graph {
    use super::*;

    /// Adjacency-list graph used by the unit tests.
    pub struct TestGraph {
        pub root: usize,
        pub first_edge: Vec<usize>,
        pub targets: Vec<usize>,
        pub weak: Vec<bool>,
        pub first_retainer: Vec<usize>,
        pub retainers: Vec<(usize, usize)>,
    }

    impl TestGraph {
        pub fn new(node_count: usize, edges: &[(usize, usize)]) -> Self {
            Self::with_weak(node_count, edges, &[])
        }

        pub fn with_weak(node_count: usize, edges: &[(usize, usize)], weak: &[(usize, usize)]) -> Self {
            let mut outgoing: Vec<Vec<(usize, bool)>> = vec![Vec::new(); node_count];
            for &(from, to) in edges {
                outgoing[from].push((to, false));
            }
            for &(from, to) in weak {
                outgoing[from].push((to, true));
            }

            let mut first_edge = Vec::with_capacity(node_count + 1);
            let mut targets = Vec::new();
            let mut weak_flags = Vec::new();
            first_edge.push(0);
            for list in &outgoing {
                for &(to, is_weak) in list {
                    targets.push(to);
                    weak_flags.push(is_weak);
                }
                first_edge.push(targets.len());
            }

            let mut incoming: Vec<Vec<(usize, usize)>> = vec![Vec::new(); node_count];
            for from in 0..node_count {
                for edge in first_edge[from]..first_edge[from + 1] {
                    incoming[targets[edge]].push((from, edge));
                }
            }
            let mut first_retainer = Vec::with_capacity(node_count + 1);
            let mut retainers = Vec::new();
            first_retainer.push(0);
            for list in incoming {
                retainers.extend(list);
                first_retainer.push(retainers.len());
            }

            TestGraph {
                root: 0,
                first_edge,
                targets,
                weak: weak_flags,
                first_retainer,
                retainers,
            }
        }
    }

    impl DominanceGraph for TestGraph {
        fn node_count(&self) -> usize {
            self.first_edge.len() - 1
        }

        fn root_ordinal(&self) -> usize {
            self.root
        }

        fn edges(&self, ordinal: usize) -> Range<usize> {
            self.first_edge[ordinal]..self.first_edge[ordinal + 1]
        }

        fn edge_target(&self, edge: usize) -> usize {
            self.targets[edge]
        }

        fn retainer_slots(&self, ordinal: usize) -> Range<usize> {
            self.first_retainer[ordinal]..self.first_retainer[ordinal + 1]
        }

        fn retainer(&self, slot: usize) -> (usize, usize) {
            self.retainers[slot]
        }

        fn is_weak(&self, edge: usize) -> bool {
            self.weak[edge]
        }

        fn is_dominance_edge(&self, _from: usize, _edge: usize, _to: usize) -> bool {
            true
        }
    }
}
