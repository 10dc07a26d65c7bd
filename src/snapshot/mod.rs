//! Heap snapshot model
//!
//! [`HeapSnapshot::load`] runs the whole analysis pipeline once, in a fixed
//! order, over the raw profile:
//!
//! 1. edge index
//! 2. invisible edge marking (format hook)
//! 3. retainer index
//! 4. node flags (format hook)
//! 5. distances: user roots first, then every root child
//! 6. post-order numbering
//! 7. dominator tree
//! 8. retained sizes
//! 9. dominated-node index
//! 10. statistics (format hook)
//!
//! Structural violations abort the load. Nodes the post-order cannot reach
//! are logged with their retainer chain and numbered anyway.

pub mod builder;
pub mod edge;
pub mod format;
pub mod index;
pub mod layout;
pub mod meta;
pub mod node;
pub mod retainer;
pub mod storage;
pub mod v8;

pub use edge::{EdgeIter, EdgeRef, SerializedEdge};
pub use format::{HeapFormat, NodeFlags};
pub use layout::FieldLayout;
pub use meta::{RawHeapSnapshot, SnapshotHeader, SnapshotMeta};
pub use node::{NodeIter, NodeRef, SerializedNode};
pub use retainer::{RetainerIter, RetainerRef};
pub use storage::FlatGraph;
pub use v8::V8Format;

use crate::aggregate::AggregateCache;
use crate::config::{AnalysisConfig, ProgressReporter, TracingProgress};
use crate::error::{SnapshotError, SnapshotResult};
use crate::stats::{live_objects_by_trace_node, LiveObjectStats, Statistics};
use heapsnap_graph_algorithms::{
    bfs_distances, dominated_nodes, dominator_tree, post_order, retained_sizes, DominatedNodes,
    RetainerIndex, NO_DISTANCE,
};
use index::DominanceView;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::{debug, info, warn};

/// Summary numbers of a loaded snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticData {
    pub node_count: usize,
    pub root_node_index: usize,
    pub total_size: u64,
    pub max_js_object_id: u64,
}

/// A fully analyzed heap snapshot
pub struct HeapSnapshot {
    pub(crate) graph: FlatGraph,
    pub(crate) format: Box<dyn HeapFormat>,
    pub(crate) config: AnalysisConfig,
    pub(crate) flags: Option<NodeFlags>,
    pub(crate) distances: Vec<i32>,
    pub(crate) dominators_tree: Vec<u32>,
    pub(crate) retained_sizes: Vec<u64>,
    pub(crate) dominated: DominatedNodes,
    pub(crate) unreachable: Vec<u32>,
    pub(crate) statistics: Statistics,
    pub(crate) live_objects: Option<IndexMap<u64, LiveObjectStats>>,
    pub(crate) cache: RwLock<AggregateCache>,
}

impl HeapSnapshot {
    /// Load a V8 profile with the default configuration.
    pub fn load(raw: RawHeapSnapshot) -> SnapshotResult<Self> {
        Self::load_with_config(raw, AnalysisConfig::default())
    }

    pub fn load_with_config(raw: RawHeapSnapshot, config: AnalysisConfig) -> SnapshotResult<Self> {
        Self::load_with_format(raw, Box::new(V8Format), config, &TracingProgress)
    }

    pub fn from_json_str(json: &str) -> SnapshotResult<Self> {
        Self::load(RawHeapSnapshot::from_json_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> SnapshotResult<Self> {
        Self::load(RawHeapSnapshot::from_reader(reader)?)
    }

    /// Run the analysis pipeline with an explicit format and progress sink.
    pub fn load_with_format(
        raw: RawHeapSnapshot,
        format: Box<dyn HeapFormat>,
        config: AnalysisConfig,
        progress: &dyn ProgressReporter,
    ) -> SnapshotResult<Self> {
        let trace_function_count = raw.snapshot.trace_function_count.unwrap_or(0);

        progress.update_status("Building edge indexes\u{2026}");
        let mut graph = build_flat_graph(raw, config.root_index)?;

        progress.update_status("Marking invisible edges\u{2026}");
        format.mark_invisible_edges(&mut graph);

        progress.update_status("Building retainers\u{2026}");
        graph.retainers = index::build_retainers(&graph);

        progress.update_status("Calculating node flags\u{2026}");
        let flags = format.calculate_flags(&graph);

        let (distances, order, dominators_tree) = {
            let view = DominanceView::new(&graph, flags.as_ref());

            progress.update_status("Calculating distances\u{2026}");
            let distances = calculate_distances(&graph, format.as_ref(), &view);

            progress.update_status("Building postorder index\u{2026}");
            let order = post_order(&view);

            progress.update_status("Building dominator tree\u{2026}");
            let dominators_tree = dominator_tree(&view, &order);
            (distances, order, dominators_tree)
        };

        progress.update_status("Calculating retained sizes\u{2026}");
        let retained = retained_sizes(&order, &dominators_tree, |ordinal| {
            graph.node_self_size(graph.node_index(ordinal))
        });

        progress.update_status("Building dominated nodes\u{2026}");
        let dominated = dominated_nodes(&dominators_tree, graph.root_ordinal())?;

        progress.update_status("Calculating statistics\u{2026}");
        let total_size = retained[graph.root_ordinal()];
        let statistics = format.calculate_statistics(&graph, total_size);

        let live_objects = if trace_function_count > 0 {
            progress.update_status("Building allocation statistics\u{2026}");
            Some(live_objects_by_trace_node(&graph))
        } else {
            None
        };

        progress.update_status("Finished processing.");
        let snapshot = Self {
            graph,
            format,
            config,
            flags,
            distances,
            dominators_tree,
            retained_sizes: retained,
            dominated,
            unreachable: order.unreachable,
            statistics,
            live_objects,
            cache: RwLock::new(AggregateCache::default()),
        };

        if !snapshot.unreachable.is_empty() {
            snapshot.report_unreachable();
        }
        info!(
            "Loaded heap snapshot: {} nodes, {} edges, total size {}",
            snapshot.node_count(),
            snapshot.edge_count(),
            snapshot.total_size()
        );
        Ok(snapshot)
    }

    fn report_unreachable(&self) {
        warn!(
            "Corrupted snapshot: {} nodes are unreachable from the root",
            self.unreachable.len()
        );
        for &ordinal in &self.unreachable {
            let node = self.node_at(ordinal as usize);
            match serde_json::to_string(&node.serialize()) {
                Ok(json) => warn!("{}", json),
                Err(err) => warn!("node {}: {}", node.id(), err),
            }
            let mut current = node;
            for _ in 0..self.config.max_retainer_chain {
                let Some(retainer) = current.retainers().next() else {
                    break;
                };
                let retainer_node = retainer.node();
                warn!(
                    "  edgeName: {} nodeClassName: {}",
                    retainer.name(),
                    retainer_node.class_name()
                );
                current = retainer_node;
            }
        }
    }

    /// Release the snapshot and everything derived from it.
    pub fn dispose(self) {
        debug!("Disposing heap snapshot with {} nodes", self.node_count());
    }

    // Accessors

    pub fn graph(&self) -> &FlatGraph {
        &self.graph
    }

    pub fn format(&self) -> &dyn HeapFormat {
        self.format.as_ref()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn flags(&self) -> Option<&NodeFlags> {
        self.flags.as_ref()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn root_node_index(&self) -> usize {
        self.graph.root_index()
    }

    /// Retained size of the root.
    pub fn total_size(&self) -> u64 {
        self.retained_sizes[self.graph.root_ordinal()]
    }

    pub fn statistics(&self) -> Statistics {
        self.statistics
    }

    /// Live objects per allocation trace node, when allocations were tracked.
    pub fn live_objects(&self) -> Option<&IndexMap<u64, LiveObjectStats>> {
        self.live_objects.as_ref()
    }

    /// Ordinals the post-order reached only through recovery.
    pub fn unreachable_ordinals(&self) -> &[u32] {
        &self.unreachable
    }

    pub fn first_edge_index(&self) -> &[usize] {
        &self.graph.first_edge_index
    }

    pub fn retainer_index(&self) -> &RetainerIndex {
        &self.graph.retainers
    }

    pub fn distances(&self) -> &[i32] {
        &self.distances
    }

    pub fn dominators_tree(&self) -> &[u32] {
        &self.dominators_tree
    }

    pub fn retained_sizes(&self) -> &[u64] {
        &self.retained_sizes
    }

    pub fn dominated_nodes(&self) -> &DominatedNodes {
        &self.dominated
    }

    // Cursors

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef::new(self, self.graph.root_index())
    }

    /// Node at `ordinal`. Panics if the ordinal is out of range.
    pub fn node_at(&self, ordinal: usize) -> NodeRef<'_> {
        assert!(ordinal < self.node_count(), "node ordinal {} out of range", ordinal);
        NodeRef::new(self, self.graph.node_index(ordinal))
    }

    /// Node at record offset `node_index`, if that offset addresses a node.
    pub fn node(&self, node_index: usize) -> Option<NodeRef<'_>> {
        let width = self.graph.layout().node_field_count;
        if node_index % width != 0 || node_index >= self.graph.nodes.len() {
            return None;
        }
        Some(NodeRef::new(self, node_index))
    }

    /// Edge at absolute offset `edge_index`. The offset is not checked.
    pub fn edge_at(&self, edge_index: usize) -> EdgeRef<'_> {
        EdgeRef::new(self, edge_index)
    }

    pub fn nodes(&self) -> NodeIter<'_> {
        NodeIter::new(self)
    }

    // Queries

    pub fn node_for_id(&self, id: u64) -> Option<NodeRef<'_>> {
        self.nodes().find(|node| node.id() == id)
    }

    pub fn node_class_name(&self, id: u64) -> Option<String> {
        self.node_for_id(id).map(|node| node.class_name().into_owned())
    }

    /// Ids on the dominator chain from the node up to, not including, the root.
    pub fn dominator_ids_for_node(&self, id: u64) -> Option<Vec<u64>> {
        let mut node = self.node_for_id(id)?;
        let mut ids = Vec::new();
        while !node.is_root() && ids.len() < self.node_count() {
            ids.push(node.id());
            node = node.dominator();
        }
        Some(ids)
    }

    pub fn ids_of_objects_with_name(&self, name: &str) -> Vec<u64> {
        self.nodes()
            .filter(|node| node.name() == name)
            .map(|node| node.id())
            .collect()
    }

    /// Largest script-visible (odd) id.
    pub fn max_js_object_id(&self) -> u64 {
        self.graph
            .node_indexes()
            .map(|node_index| self.graph.node_id(node_index))
            .filter(|id| id % 2 == 1)
            .max()
            .unwrap_or(0)
    }

    pub fn static_data(&self) -> StaticData {
        StaticData {
            node_count: self.node_count(),
            root_node_index: self.root_node_index(),
            total_size: self.total_size(),
            max_js_object_id: self.max_js_object_id(),
        }
    }
}

/// Resolve the layout, validate the raw arrays and build the edge index.
fn build_flat_graph(raw: RawHeapSnapshot, root_override: Option<usize>) -> SnapshotResult<FlatGraph> {
    let layout = FieldLayout::resolve(&raw.snapshot.meta)?;
    let node_width = layout.node_field_count;
    let edge_width = layout.edge_field_count;

    if raw.nodes.len() % node_width != 0 {
        return Err(SnapshotError::InvalidLength {
            kind: "node",
            len: raw.nodes.len(),
            width: node_width,
        });
    }
    if raw.edges.len() % edge_width != 0 {
        return Err(SnapshotError::InvalidLength {
            kind: "edge",
            len: raw.edges.len(),
            width: edge_width,
        });
    }
    if raw.nodes.is_empty() {
        return Err(SnapshotError::EmptySnapshot);
    }

    let root_index = root_override.or(raw.snapshot.root_index).unwrap_or(0);
    if root_index % node_width != 0 || root_index >= raw.nodes.len() {
        return Err(SnapshotError::InvalidRootIndex(root_index));
    }

    let first_edge_index = index::build_edge_index(&layout, &raw.nodes, raw.edges.len())?;
    let graph = FlatGraph {
        node_count: raw.nodes.len() / node_width,
        edge_count: raw.edges.len() / edge_width,
        layout,
        nodes: raw.nodes,
        edges: raw.edges,
        strings: raw.strings,
        first_edge_index,
        retainers: RetainerIndex::default(),
        root_index,
    };
    index::validate_edge_targets(&graph)?;
    Ok(graph)
}

/// Two BFS passes: from the user roots, then from every root child.
fn calculate_distances(graph: &FlatGraph, format: &dyn HeapFormat, view: &DominanceView<'_>) -> Vec<i32> {
    let mut distances = vec![NO_DISTANCE; graph.node_count()];
    let root_children: Vec<usize> = graph
        .edge_indexes(graph.root_index())
        .map(|edge_index| graph.edge_to_node(edge_index))
        .collect();

    let user_roots = root_children
        .iter()
        .filter(|&&node_index| format.is_user_root(graph, node_index))
        .map(|&node_index| graph.ordinal(node_index));
    let labeled = bfs_distances(view, &mut distances, user_roots);
    debug!("Distances from user roots: {} nodes", labeled);

    let labeled = bfs_distances(
        view,
        &mut distances,
        root_children.iter().map(|&node_index| graph.ordinal(node_index)),
    );
    debug!("Distances from remaining roots: {} nodes", labeled);
    distances
}

#[cfg(test)]
mod tests {
    use super::*;
    use builder::SnapshotBuilder;

    fn chain_snapshot() -> HeapSnapshot {
        // root -> A -> B, root -> C
        let mut b = SnapshotBuilder::new();
        let root = b.node("synthetic", "", 1, 10);
        let a = b.node("object", "A", 3, 10);
        let bb = b.node("object", "B", 5, 10);
        let c = b.node("object", "C", 7, 10);
        b.edge(root, "element", "1", a);
        b.edge(root, "element", "2", c);
        b.edge(a, "property", "b", bb);
        b.build().unwrap()
    }

    #[test]
    fn test_pipeline_sizes_and_distances() {
        let snapshot = chain_snapshot();
        assert_eq!(snapshot.retained_sizes(), &[40, 20, 10, 10]);
        assert_eq!(snapshot.total_size(), 40);
        assert_eq!(snapshot.distances(), &[NO_DISTANCE, 0, 1, 0]);
        assert_eq!(snapshot.dominators_tree(), &[0, 0, 1, 0]);
        assert!(snapshot.unreachable_ordinals().is_empty());
    }

    #[test]
    fn test_queries() {
        let snapshot = chain_snapshot();
        assert_eq!(snapshot.node_class_name(5).as_deref(), Some("B"));
        assert_eq!(snapshot.node_class_name(99), None);
        assert_eq!(snapshot.dominator_ids_for_node(5), Some(vec![5, 3]));
        assert_eq!(snapshot.dominator_ids_for_node(1), Some(vec![]));
        assert_eq!(snapshot.ids_of_objects_with_name("C"), vec![7]);
        assert_eq!(snapshot.max_js_object_id(), 7);

        let data = snapshot.static_data();
        assert_eq!(data.node_count, 4);
        assert_eq!(data.root_node_index, 0);
        assert_eq!(data.total_size, 40);
    }

    #[test]
    fn test_node_lookup_by_offset() {
        let snapshot = chain_snapshot();
        assert!(snapshot.node(6).is_some());
        assert!(snapshot.node(7).is_none());
        assert!(snapshot.node(24).is_none());
    }

    #[test]
    fn test_edge_count_mismatch_is_fatal() {
        let mut b = SnapshotBuilder::new();
        let root = b.node("synthetic", "", 1, 0);
        let a = b.node("object", "A", 3, 0);
        b.edge(root, "element", "1", a);
        let mut raw = b.build_raw().unwrap();
        raw.nodes[4] = 2;
        assert!(matches!(
            HeapSnapshot::load(raw),
            Err(SnapshotError::EdgeCountMismatch {
                declared: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_root_override() {
        let mut b = SnapshotBuilder::new();
        b.node("synthetic", "", 1, 0);
        b.node("synthetic", "", 3, 0);
        let raw = b.build_raw().unwrap();
        let config = AnalysisConfig {
            root_index: Some(7),
            ..Default::default()
        };
        assert!(matches!(
            HeapSnapshot::load_with_config(raw, config),
            Err(SnapshotError::InvalidRootIndex(7))
        ));
    }
}
