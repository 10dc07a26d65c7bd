//! Dominator tree and retained sizes
//!
//! The dominator pass follows K. Cooper, T. Harvey and K. Kennedy,
//! "A Simple, Fast Dominance Algorithm", working in post-order index space
//! where the root holds the highest index.

use super::common::DominanceGraph;
use super::traversal::PostOrder;
use thiserror::Error;

/// Immediate dominator ordinal of every node. The root dominates itself.
///
/// Nodes the post-order could not reach are attached to the root.
pub fn dominator_tree<G: DominanceGraph>(graph: &G, post_order: &PostOrder) -> Vec<u32> {
    let node_count = post_order.len();
    let index_to_ordinal = &post_order.index_to_ordinal;
    let ordinal_to_index = &post_order.ordinal_to_index;
    let root_post_index = node_count - 1;
    let root_index = root_post_index as u32;
    let no_entry = node_count as u32;

    let mut dominators = vec![no_entry; node_count];
    dominators[root_post_index] = root_index;

    // Entries whose retainers changed and need their dominator recomputed.
    let mut affected = vec![false; node_count];
    let root_ordinal = graph.root_ordinal();
    for edge in graph.edges(root_ordinal) {
        let child = graph.edge_target(edge);
        affected[ordinal_to_index[child] as usize] = true;
    }

    let mut changed = true;
    while changed {
        changed = false;
        for post_index in (0..root_post_index).rev() {
            if !affected[post_index] {
                continue;
            }
            affected[post_index] = false;
            // Already pinned to the root; cannot move any further.
            if dominators[post_index] == root_index {
                continue;
            }

            let ordinal = index_to_ordinal[post_index] as usize;
            let mut new_dominator = no_entry;
            for slot in graph.retainer_slots(ordinal) {
                let (retainer, edge) = graph.retainer(slot);
                if !graph.is_dominance_edge(retainer, edge, ordinal) {
                    continue;
                }
                let mut retainer_index = ordinal_to_index[retainer];
                if dominators[retainer_index as usize] == no_entry {
                    continue;
                }
                if new_dominator == no_entry {
                    new_dominator = retainer_index;
                } else {
                    while retainer_index != new_dominator {
                        while retainer_index < new_dominator {
                            retainer_index = dominators[retainer_index as usize];
                        }
                        while new_dominator < retainer_index {
                            new_dominator = dominators[new_dominator as usize];
                        }
                    }
                }
                if new_dominator == root_index {
                    break;
                }
            }

            if new_dominator != no_entry && dominators[post_index] != new_dominator {
                dominators[post_index] = new_dominator;
                changed = true;
                for edge in graph.edges(ordinal) {
                    let child = graph.edge_target(edge);
                    affected[ordinal_to_index[child] as usize] = true;
                }
            }
        }
    }

    let mut dominators_tree = vec![0u32; node_count];
    for (post_index, &dominator) in dominators.iter().enumerate() {
        let ordinal = index_to_ordinal[post_index] as usize;
        dominators_tree[ordinal] = if dominator == no_entry {
            root_ordinal as u32
        } else {
            index_to_ordinal[dominator as usize]
        };
    }
    dominators_tree
}

/// Retained size of every node: its self size plus the retained sizes of
/// the nodes it immediately dominates.
///
/// Nodes are visited in ascending post-order, so a node is complete before
/// it is added into its dominator.
pub fn retained_sizes<S>(post_order: &PostOrder, dominators_tree: &[u32], self_size: S) -> Vec<u64>
where
    S: Fn(usize) -> u64,
{
    let node_count = post_order.len();
    let mut sizes: Vec<u64> = (0..node_count).map(&self_size).collect();

    // The root sits at the last index and has nothing to propagate into.
    for post_index in 0..node_count.saturating_sub(1) {
        let ordinal = post_order.index_to_ordinal[post_index] as usize;
        let dominator = dominators_tree[ordinal] as usize;
        sizes[dominator] += sizes[ordinal];
    }
    sizes
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("root node ordinal {root_ordinal} is expected to be either first or last of {node_count} nodes")]
pub struct RootPlacementError {
    pub root_ordinal: usize,
    pub node_count: usize,
}

/// Children of every node in the dominator tree, CSR style.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DominatedNodes {
    /// Length `node_count + 1`; node `n` owns
    /// `first_dominated_node_index[n]..first_dominated_node_index[n + 1]`.
    pub first_dominated_node_index: Vec<u32>,
    /// Dominated node ordinals; every node except the root appears once.
    pub dominated_nodes: Vec<u32>,
}

impl DominatedNodes {
    /// Ordinals immediately dominated by `ordinal`.
    pub fn of(&self, ordinal: usize) -> &[u32] {
        let from = self.first_dominated_node_index[ordinal] as usize;
        let to = self.first_dominated_node_index[ordinal + 1] as usize;
        &self.dominated_nodes[from..to]
    }
}

/// Build the dominated-children index from the dominator tree.
pub fn dominated_nodes(
    dominators_tree: &[u32],
    root_ordinal: usize,
) -> Result<DominatedNodes, RootPlacementError> {
    let node_count = dominators_tree.len();

    // Skip the root: it is the only node that dominates itself.
    let (from_ordinal, to_ordinal) = if root_ordinal == 0 {
        (1, node_count)
    } else if root_ordinal + 1 == node_count {
        (0, node_count - 1)
    } else {
        return Err(RootPlacementError {
            root_ordinal,
            node_count,
        });
    };

    let mut first_dominated_node_index = vec![0u32; node_count + 1];
    let mut dominated_nodes = vec![0u32; node_count.saturating_sub(1)];

    for ordinal in from_ordinal..to_ordinal {
        first_dominated_node_index[dominators_tree[ordinal] as usize] += 1;
    }

    // The first slot of each run temporarily holds the count still to fill.
    let mut first_index = 0u32;
    for ordinal in 0..node_count {
        let count = first_dominated_node_index[ordinal];
        if count > 0 {
            dominated_nodes[first_index as usize] = count;
        }
        first_dominated_node_index[ordinal] = first_index;
        first_index += count;
    }
    first_dominated_node_index[node_count] = dominated_nodes.len() as u32;

    for ordinal in from_ordinal..to_ordinal {
        let dominator = dominators_tree[ordinal] as usize;
        let first = first_dominated_node_index[dominator] as usize;
        dominated_nodes[first] -= 1;
        let slot = first + dominated_nodes[first] as usize;
        dominated_nodes[slot] = ordinal as u32;
    }

    Ok(DominatedNodes {
        first_dominated_node_index,
        dominated_nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_graph::TestGraph;
    use crate::traversal::post_order;

    fn analyze(graph: &TestGraph, self_sizes: &[u64]) -> (Vec<u32>, Vec<u64>) {
        let order = post_order(graph);
        let tree = dominator_tree(graph, &order);
        let sizes = retained_sizes(&order, &tree, |o| self_sizes[o]);
        (tree, sizes)
    }

    #[test]
    fn test_chain_and_leaf() {
        // root(0) -> A(1) -> B(2), root -> C(3)
        let graph = TestGraph::new(4, &[(0, 1), (1, 2), (0, 3)]);
        let (tree, sizes) = analyze(&graph, &[10, 10, 10, 10]);

        assert_eq!(tree, vec![0, 0, 1, 0]);
        assert_eq!(sizes[0], 40);
        assert_eq!(sizes[1], 20);
        assert_eq!(sizes[3], 10);
    }

    #[test]
    fn test_diamond() {
        // root -> A, root -> B, A -> C, B -> C
        let graph = TestGraph::new(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let (tree, sizes) = analyze(&graph, &[1, 1, 1, 1]);

        assert_eq!(tree[3], 0);
        assert_eq!(sizes[0], 4);
        assert_eq!(sizes[1], 1);
        assert_eq!(sizes[2], 1);
    }

    #[test]
    fn test_cycle_below_single_owner() {
        // root -> A -> B -> C -> B
        let graph = TestGraph::new(4, &[(0, 1), (1, 2), (2, 3), (3, 2)]);
        let (tree, sizes) = analyze(&graph, &[0, 5, 3, 2]);

        assert_eq!(tree, vec![0, 0, 1, 2]);
        assert_eq!(sizes[1], 10);
        assert_eq!(sizes[2], 5);
    }

    #[test]
    fn test_orphans_attach_to_root() {
        // root -> A; B orphan
        let graph = TestGraph::new(3, &[(0, 1)]);
        let (tree, sizes) = analyze(&graph, &[1, 2, 4]);

        assert_eq!(tree, vec![0, 0, 0]);
        assert_eq!(sizes[0], 7);
    }

    #[test]
    fn test_dominated_nodes_index() {
        let tree = vec![0, 0, 1, 0];
        let dominated = dominated_nodes(&tree, 0).unwrap();

        let mut of_root = dominated.of(0).to_vec();
        of_root.sort();
        assert_eq!(of_root, vec![1, 3]);
        assert_eq!(dominated.of(1), &[2]);
        assert!(dominated.of(2).is_empty());
        assert_eq!(dominated.dominated_nodes.len(), 3);
        assert_eq!(dominated.first_dominated_node_index[4], 3);
    }

    #[test]
    fn test_dominated_nodes_root_last() {
        // root is ordinal 2
        let tree = vec![2, 0, 2];
        let dominated = dominated_nodes(&tree, 2).unwrap();
        assert_eq!(dominated.of(2), &[0]);
        assert_eq!(dominated.of(0), &[1]);
    }

    #[test]
    fn test_dominated_nodes_rejects_middle_root() {
        let tree = vec![1, 1, 1];
        let err = dominated_nodes(&tree, 1).unwrap_err();
        assert_eq!(err.root_ordinal, 1);
        assert_eq!(err.node_count, 3);
    }
}
