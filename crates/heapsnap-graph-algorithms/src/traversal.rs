//! Distance labeling and post-order numbering
//!
//! Both traversals are iterative with array-backed work lists; heap graphs
//! can have millions of nodes and arbitrarily long retainer chains.

use super::common::{DominanceGraph, NO_DISTANCE};

/// Breadth-first distance labeling from a set of seed nodes.
///
/// Seeds that already carry a distance are skipped, so calling this twice
/// (intrinsic roots first, then all roots) never relabels a node. Weak edges
/// are not followed. Returns the number of nodes labeled by this call.
pub fn bfs_distances<G, I>(graph: &G, distances: &mut [i32], seeds: I) -> usize
where
    G: DominanceGraph,
    I: IntoIterator<Item = usize>,
{
    let mut nodes_to_visit: Vec<u32> = Vec::with_capacity(graph.node_count());
    for seed in seeds {
        if distances[seed] != NO_DISTANCE {
            continue;
        }
        distances[seed] = 0;
        nodes_to_visit.push(seed as u32);
    }

    // The vector is the FIFO; `head` is the dequeue cursor.
    let mut head = 0;
    while head < nodes_to_visit.len() {
        let ordinal = nodes_to_visit[head] as usize;
        head += 1;
        let distance = distances[ordinal] + 1;
        for edge in graph.edges(ordinal) {
            if graph.is_weak(edge) {
                continue;
            }
            let child = graph.edge_target(edge);
            if distances[child] != NO_DISTANCE {
                continue;
            }
            distances[child] = distance;
            nodes_to_visit.push(child as u32);
        }
    }

    debug_assert!(nodes_to_visit.len() <= graph.node_count());
    nodes_to_visit.len()
}

/// Post-order numbering of the graph from its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostOrder {
    /// Node ordinal at each post-order index.
    pub index_to_ordinal: Vec<u32>,
    /// Post-order index of each node ordinal.
    pub ordinal_to_index: Vec<u32>,
    /// Ordinals the traversal could not reach, in ordinal order. They are
    /// numbered right before the root so the root keeps the highest index.
    pub unreachable: Vec<u32>,
}

impl PostOrder {
    pub fn len(&self) -> usize {
        self.index_to_ordinal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_to_ordinal.is_empty()
    }

    /// Post-order index of the root.
    pub fn root_index(&self) -> usize {
        self.index_to_ordinal.len() - 1
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Paint {
    White,
    Grey,
    Black,
}

/// Iterative depth-first post-order over dominance edges.
///
/// A node is painted grey when pushed and black when its children have been
/// pushed; it receives its index when it is found black on top of the stack.
pub fn post_order<G: DominanceGraph>(graph: &G) -> PostOrder {
    let node_count = graph.node_count();
    let root = graph.root_ordinal();

    let mut nodes_to_visit: Vec<u32> = Vec::with_capacity(node_count);
    let mut index_to_ordinal: Vec<u32> = Vec::with_capacity(node_count);
    let mut ordinal_to_index = vec![0u32; node_count];
    let mut painted = vec![Paint::White; node_count];

    nodes_to_visit.push(root as u32);
    painted[root] = Paint::Grey;

    while let Some(&top) = nodes_to_visit.last() {
        let ordinal = top as usize;
        if painted[ordinal] == Paint::Grey {
            painted[ordinal] = Paint::Black;
            for edge in graph.edges(ordinal) {
                let child = graph.edge_target(edge);
                if !graph.is_dominance_edge(ordinal, edge, child) {
                    continue;
                }
                if painted[child] == Paint::White {
                    painted[child] = Paint::Grey;
                    nodes_to_visit.push(child as u32);
                }
            }
        } else {
            ordinal_to_index[ordinal] = index_to_ordinal.len() as u32;
            index_to_ordinal.push(ordinal as u32);
            nodes_to_visit.pop();
        }
    }

    let mut unreachable = Vec::new();
    if index_to_ordinal.len() != node_count {
        // The root finished last; lift it off, number the orphans, put it back.
        index_to_ordinal.pop();
        for (ordinal, paint) in painted.iter().enumerate() {
            if *paint != Paint::Black {
                ordinal_to_index[ordinal] = index_to_ordinal.len() as u32;
                index_to_ordinal.push(ordinal as u32);
                unreachable.push(ordinal as u32);
            }
        }
        ordinal_to_index[root] = index_to_ordinal.len() as u32;
        index_to_ordinal.push(root as u32);
    }

    PostOrder {
        index_to_ordinal,
        ordinal_to_index,
        unreachable,
    }
}
