//! Property tests for the dominance passes on random graphs.

use heapsnap_graph_algorithms::{
    bfs_distances, build_retainer_index, dominated_nodes, dominator_tree, post_order,
    retained_sizes, sort_range, DominanceGraph, RetainerIndex, NO_DISTANCE,
};
use proptest::prelude::*;
use std::collections::HashSet;
use std::ops::Range;

struct CsrGraph {
    first_edge: Vec<usize>,
    targets: Vec<usize>,
    retainers: RetainerIndex,
}

impl CsrGraph {
    fn new(node_count: usize, edges: &[(usize, usize)]) -> Self {
        let mut sorted = edges.to_vec();
        sorted.sort_by_key(|&(from, _)| from);
        let mut first_edge = vec![0usize; node_count + 1];
        for &(from, _) in &sorted {
            first_edge[from + 1] += 1;
        }
        for i in 0..node_count {
            first_edge[i + 1] += first_edge[i];
        }
        let targets: Vec<usize> = sorted.iter().map(|&(_, to)| to).collect();
        let retainers = build_retainer_index(
            node_count,
            targets.len(),
            |o| first_edge[o]..first_edge[o + 1],
            |e| targets[e],
        );
        CsrGraph {
            first_edge,
            targets,
            retainers,
        }
    }
}

impl DominanceGraph for CsrGraph {
    fn node_count(&self) -> usize {
        self.first_edge.len() - 1
    }
    fn root_ordinal(&self) -> usize {
        0
    }
    fn edges(&self, ordinal: usize) -> Range<usize> {
        self.first_edge[ordinal]..self.first_edge[ordinal + 1]
    }
    fn edge_target(&self, edge: usize) -> usize {
        self.targets[edge]
    }
    fn retainer_slots(&self, ordinal: usize) -> Range<usize> {
        self.retainers.slots(ordinal)
    }
    fn retainer(&self, slot: usize) -> (usize, usize) {
        (
            self.retainers.retaining_nodes[slot] as usize,
            self.retainers.retaining_edges[slot] as usize,
        )
    }
    fn is_weak(&self, _edge: usize) -> bool {
        false
    }
    fn is_dominance_edge(&self, _from: usize, _edge: usize, _to: usize) -> bool {
        true
    }
}

/// Nodes reachable from the root when `removed` is taken out of the graph.
fn reachable_without(graph: &CsrGraph, removed: usize) -> HashSet<usize> {
    let mut seen = HashSet::new();
    if removed == 0 {
        return seen;
    }
    let mut stack = vec![0];
    seen.insert(0);
    while let Some(node) = stack.pop() {
        for edge in graph.edges(node) {
            let child = graph.edge_target(edge);
            if child != removed && seen.insert(child) {
                stack.push(child);
            }
        }
    }
    seen
}

fn arb_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2usize..12).prop_flat_map(|n| {
        let edge = (0..n, 0..n);
        (Just(n), prop::collection::vec(edge, 0..30))
    })
}

proptest! {
    #[test]
    fn post_order_numbers_every_node_once((n, edges) in arb_graph()) {
        let graph = CsrGraph::new(n, &edges);
        let order = post_order(&graph);

        prop_assert_eq!(order.len(), n);
        prop_assert_eq!(order.index_to_ordinal[n - 1], 0);
        let mut seen = vec![false; n];
        for (index, &ordinal) in order.index_to_ordinal.iter().enumerate() {
            prop_assert!(!seen[ordinal as usize]);
            seen[ordinal as usize] = true;
            prop_assert_eq!(order.ordinal_to_index[ordinal as usize] as usize, index);
        }
    }

    #[test]
    fn dominator_chains_reach_the_root((n, edges) in arb_graph()) {
        let graph = CsrGraph::new(n, &edges);
        let order = post_order(&graph);
        let tree = dominator_tree(&graph, &order);

        prop_assert_eq!(tree[0], 0);
        for start in 0..n {
            let mut node = start;
            let mut steps = 0;
            while node != 0 {
                node = tree[node] as usize;
                steps += 1;
                prop_assert!(steps <= n);
            }
        }
    }

    #[test]
    fn immediate_dominators_match_naive_definition((n, edges) in arb_graph()) {
        let graph = CsrGraph::new(n, &edges);
        let order = post_order(&graph);
        let tree = dominator_tree(&graph, &order);
        let reachable = reachable_without(&graph, usize::MAX);

        for node in 1..n {
            if !reachable.contains(&node) {
                prop_assert_eq!(tree[node], 0);
                continue;
            }
            // d dominates node iff removing d cuts node off from the root.
            let dominators: Vec<usize> = (0..n)
                .filter(|&d| d != node && (d == 0 || !reachable_without(&graph, d).contains(&node)))
                .collect();
            let idom = tree[node] as usize;
            prop_assert!(dominators.contains(&idom));
            // Every other strict dominator must dominate the immediate one.
            for &d in &dominators {
                if d != idom && d != 0 {
                    prop_assert!(!reachable_without(&graph, d).contains(&idom));
                }
            }
        }
    }

    #[test]
    fn root_retains_everything((n, edges) in arb_graph(), sizes in prop::collection::vec(0u64..1000, 12)) {
        let graph = CsrGraph::new(n, &edges);
        let order = post_order(&graph);
        let tree = dominator_tree(&graph, &order);
        let retained = retained_sizes(&order, &tree, |o| sizes[o]);

        let total: u64 = sizes[..n].iter().sum();
        prop_assert_eq!(retained[0], total);
        for node in 0..n {
            prop_assert!(retained[node] >= sizes[node]);
            if node != 0 {
                prop_assert!(retained[tree[node] as usize] >= retained[node]);
            }
        }
    }

    #[test]
    fn dominated_nodes_invert_the_tree((n, edges) in arb_graph()) {
        let graph = CsrGraph::new(n, &edges);
        let order = post_order(&graph);
        let tree = dominator_tree(&graph, &order);
        let dominated = dominated_nodes(&tree, 0).unwrap();

        prop_assert_eq!(dominated.dominated_nodes.len(), n - 1);
        for parent in 0..n {
            for &child in dominated.of(parent) {
                prop_assert_eq!(tree[child as usize] as usize, parent);
            }
        }
    }

    #[test]
    fn distances_are_shortest_hops((n, edges) in arb_graph()) {
        let graph = CsrGraph::new(n, &edges);
        let mut distances = vec![NO_DISTANCE; n];
        bfs_distances(&graph, &mut distances, [0]);

        prop_assert_eq!(distances[0], 0);
        for &(from, to) in &edges {
            if distances[from] != NO_DISTANCE {
                prop_assert!(distances[to] != NO_DISTANCE);
                prop_assert!(distances[to] <= distances[from] + 1);
            }
        }
    }

    #[test]
    fn sorted_window_matches_full_sort(
        mut items in prop::collection::vec(0i32..100, 1..60),
        a in 0usize..60,
        b in 0usize..60,
    ) {
        let len = items.len();
        let (from, to) = (a.min(b) % len, a.max(b) % len);
        let (from, to) = (from.min(to), from.max(to));
        let mut expected = items.clone();
        expected.sort();

        sort_range(&mut items, |x, y| x.cmp(y), 0, len - 1, from, to);
        prop_assert_eq!(&items[from..=to], &expected[from..=to]);
    }
}
