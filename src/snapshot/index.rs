//! Indexing pass
//!
//! Builds the per-node edge ranges and the retainer index over a
//! [`FlatGraph`], and adapts the graph to the format-agnostic passes of
//! `heapsnap-graph-algorithms`.

use super::format::NodeFlags;
use super::layout::FieldLayout;
use super::storage::FlatGraph;
use crate::error::{SnapshotError, SnapshotResult};
use heapsnap_graph_algorithms::{build_retainer_index, DominanceGraph, RetainerIndex};
use std::ops::Range;

/// Prefix sums of the declared edge counts, scaled to edge offsets.
///
/// The declared counts must account for every edge record exactly.
pub(crate) fn build_edge_index(
    layout: &FieldLayout,
    nodes: &[u64],
    edges_len: usize,
) -> SnapshotResult<Vec<usize>> {
    let node_width = layout.node_field_count;
    let edge_width = layout.edge_field_count;
    let node_count = nodes.len() / node_width;
    let mismatch = || SnapshotError::EdgeCountMismatch {
        declared: declared_edge_count(layout, nodes),
        actual: edges_len / edge_width,
    };

    let mut first_edge_index = Vec::with_capacity(node_count + 1);
    let mut edge_index = 0usize;
    for ordinal in 0..node_count {
        first_edge_index.push(edge_index);
        let edge_count = nodes[ordinal * node_width + layout.node_edge_count_offset];
        edge_index = usize::try_from(edge_count)
            .ok()
            .and_then(|count| count.checked_mul(edge_width))
            .and_then(|span| edge_index.checked_add(span))
            .filter(|&next| next <= edges_len)
            .ok_or_else(mismatch)?;
    }
    if edge_index != edges_len {
        return Err(mismatch());
    }
    first_edge_index.push(edges_len);
    Ok(first_edge_index)
}

/// Sum of the declared edge counts, saturating at `usize::MAX`.
fn declared_edge_count(layout: &FieldLayout, nodes: &[u64]) -> usize {
    let total = nodes
        .iter()
        .skip(layout.node_edge_count_offset)
        .step_by(layout.node_field_count)
        .fold(0u64, |total, &count| total.saturating_add(count));
    usize::try_from(total).unwrap_or(usize::MAX)
}

/// Every `to_node` must be an aligned offset of an existing node record.
pub(crate) fn validate_edge_targets(graph: &FlatGraph) -> SnapshotResult<()> {
    let layout = &graph.layout;
    let nodes_len = graph.nodes.len();
    for edge_index in (0..graph.edges.len()).step_by(layout.edge_field_count) {
        let to_node = graph.edge_to_node(edge_index);
        if to_node % layout.node_field_count != 0 {
            return Err(SnapshotError::MisalignedTargetOffset {
                edge_index,
                to_node: to_node as u64,
            });
        }
        if to_node >= nodes_len {
            return Err(SnapshotError::TargetOutOfRange {
                edge_index,
                to_node: to_node as u64,
            });
        }
    }
    Ok(())
}

/// Transpose the edge list into the retainer index.
pub(crate) fn build_retainers(graph: &FlatGraph) -> RetainerIndex {
    let edge_width = graph.layout.edge_field_count;
    let node_width = graph.layout.node_field_count;
    let to_node_offset = graph.layout.edge_to_node_offset;
    build_retainer_index(
        graph.node_count,
        graph.edge_count,
        |ordinal| {
            graph.first_edge_index[ordinal] / edge_width
                ..graph.first_edge_index[ordinal + 1] / edge_width
        },
        |edge| graph.edges[edge * edge_width + to_node_offset] as usize / node_width,
    )
}

/// Ordinal-space view of a [`FlatGraph`] for the dominance passes.
pub(crate) struct DominanceView<'a> {
    graph: &'a FlatGraph,
    flags: Option<&'a NodeFlags>,
}

impl<'a> DominanceView<'a> {
    pub(crate) fn new(graph: &'a FlatGraph, flags: Option<&'a NodeFlags>) -> Self {
        Self { graph, flags }
    }

    fn edge_index(&self, edge: usize) -> usize {
        edge * self.graph.layout.edge_field_count
    }

    fn is_flagged(&self, ordinal: usize) -> bool {
        self.flags.map_or(true, |flags| flags.has(ordinal))
    }
}

impl DominanceGraph for DominanceView<'_> {
    fn node_count(&self) -> usize {
        self.graph.node_count
    }

    fn root_ordinal(&self) -> usize {
        self.graph.root_ordinal()
    }

    fn edges(&self, ordinal: usize) -> Range<usize> {
        let edge_width = self.graph.layout.edge_field_count;
        self.graph.first_edge_index[ordinal] / edge_width
            ..self.graph.first_edge_index[ordinal + 1] / edge_width
    }

    fn edge_target(&self, edge: usize) -> usize {
        self.graph.ordinal(self.graph.edge_to_node(self.edge_index(edge)))
    }

    fn retainer_slots(&self, ordinal: usize) -> Range<usize> {
        self.graph.retainers.slots(ordinal)
    }

    fn retainer(&self, slot: usize) -> (usize, usize) {
        (
            self.graph.retainers.retaining_nodes[slot] as usize,
            self.graph.retainers.retaining_edges[slot] as usize,
        )
    }

    fn is_weak(&self, edge: usize) -> bool {
        let weak = self.graph.layout.edge_tags.weak;
        self.graph.edge_has_type(self.edge_index(edge), weak)
    }

    fn is_dominance_edge(&self, from: usize, edge: usize, to: usize) -> bool {
        if from == self.graph.root_ordinal() {
            return true;
        }
        let shortcut = self.graph.layout.edge_tags.shortcut;
        if self.graph.edge_has_type(self.edge_index(edge), shortcut) {
            return false;
        }
        // Page-owned nodes are not dominated through non-page-owned ones.
        !(self.is_flagged(to) && !self.is_flagged(from))
    }
}
