//! Format capability interface
//!
//! The pipeline and the query layer are written once against [`HeapFormat`].
//! Everything that depends on what a profiler version means by its type tags
//! (class names, which root children are user roots, invisible edges, node
//! ownership flags, statistics) is answered by an implementation of it.

use super::storage::FlatGraph;
use crate::stats::Statistics;
use std::borrow::Cow;
use std::fmt;

/// Per-node bit flags and the bit selecting user-owned objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFlags {
    pub map: Vec<u32>,
    pub flag: u32,
}

impl NodeFlags {
    #[inline]
    pub fn has(&self, ordinal: usize) -> bool {
        self.map[ordinal] & self.flag != 0
    }
}

pub trait HeapFormat: fmt::Debug + Send + Sync {
    /// Display name of a node.
    fn node_name<'g>(&self, graph: &'g FlatGraph, node_index: usize) -> Cow<'g, str> {
        Cow::Borrowed(graph.node_raw_name(node_index))
    }

    /// Class name used as the aggregation key.
    fn class_name<'g>(&self, graph: &'g FlatGraph, node_index: usize) -> Cow<'g, str>;

    /// Class identity; nodes with equal class indexes aggregate together.
    fn class_index(&self, graph: &FlatGraph, node_index: usize) -> i64;

    /// Whether the edge is named by a string rather than a numeric index.
    fn edge_has_string_name(&self, graph: &FlatGraph, edge_index: usize) -> bool;

    fn edge_name(&self, graph: &FlatGraph, edge_index: usize) -> String;

    /// Root children accepted by the first distance pass.
    fn is_user_root(&self, _graph: &FlatGraph, _node_index: usize) -> bool {
        true
    }

    /// Retype edges that must not show up in user-facing traversals to the
    /// `invisible` edge type.
    fn mark_invisible_edges(&self, graph: &mut FlatGraph);

    /// Ownership flags, or `None` when every node counts as user-owned.
    fn calculate_flags(&self, graph: &FlatGraph) -> Option<NodeFlags>;

    /// Edges shown in an outgoing-edge view.
    fn containment_edge_filter(&self, _graph: &FlatGraph, _edge_index: usize, _show_hidden: bool) -> bool {
        true
    }

    /// Edges shown in a retainer view; `retainer_index` is the source node.
    fn retainer_edge_filter(
        &self,
        _graph: &FlatGraph,
        _retainer_index: usize,
        _edge_index: usize,
        _show_hidden: bool,
    ) -> bool {
        true
    }

    /// Nodes listed by a class view.
    fn class_node_filter(&self, flags: Option<&NodeFlags>, graph: &FlatGraph, node_index: usize) -> bool {
        flags.map_or(true, |flags| flags.has(graph.ordinal(node_index)))
    }

    /// Size-by-category summary, given the root's retained size.
    fn calculate_statistics(&self, graph: &FlatGraph, total_size: u64) -> Statistics;
}
