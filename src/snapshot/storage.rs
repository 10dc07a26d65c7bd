//! Flat graph storage
//!
//! Owns the raw node and edge records, the string table and the two
//! structural indexes (edge ranges and retainers). All accessors take record
//! offsets ("node index", "edge index"), not ordinals.

use super::layout::FieldLayout;
use heapsnap_graph_algorithms::RetainerIndex;
use std::iter::StepBy;
use std::ops::Range;

#[derive(Debug, Clone)]
pub struct FlatGraph {
    pub(crate) layout: FieldLayout,
    pub(crate) nodes: Vec<u64>,
    pub(crate) edges: Vec<u32>,
    pub(crate) strings: Vec<String>,
    /// Edge offset where each node's edges begin; `node_count + 1` entries.
    pub(crate) first_edge_index: Vec<usize>,
    pub(crate) retainers: RetainerIndex,
    pub(crate) root_index: usize,
    pub(crate) node_count: usize,
    pub(crate) edge_count: usize,
}

impl FlatGraph {
    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn root_index(&self) -> usize {
        self.root_index
    }

    pub fn root_ordinal(&self) -> usize {
        self.root_index / self.layout.node_field_count
    }

    pub fn string(&self, index: u64) -> &str {
        self.strings
            .get(index as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    // Nodes

    #[inline]
    pub fn ordinal(&self, node_index: usize) -> usize {
        node_index / self.layout.node_field_count
    }

    #[inline]
    pub fn node_index(&self, ordinal: usize) -> usize {
        ordinal * self.layout.node_field_count
    }

    /// Node offsets of every node, in ordinal order.
    pub fn node_indexes(&self) -> StepBy<Range<usize>> {
        (0..self.nodes.len()).step_by(self.layout.node_field_count)
    }

    #[inline]
    pub fn node_type(&self, node_index: usize) -> u64 {
        self.nodes[node_index + self.layout.node_type_offset]
    }

    #[inline]
    pub fn node_name_index(&self, node_index: usize) -> u64 {
        self.nodes[node_index + self.layout.node_name_offset]
    }

    /// Name as stored in the string table, without format-specific rewriting.
    pub fn node_raw_name(&self, node_index: usize) -> &str {
        self.string(self.node_name_index(node_index))
    }

    #[inline]
    pub fn node_id(&self, node_index: usize) -> u64 {
        self.nodes[node_index + self.layout.node_id_offset]
    }

    #[inline]
    pub fn node_self_size(&self, node_index: usize) -> u64 {
        self.nodes[node_index + self.layout.node_self_size_offset]
    }

    #[inline]
    pub fn node_edge_count(&self, node_index: usize) -> u64 {
        self.nodes[node_index + self.layout.node_edge_count_offset]
    }

    /// Allocation trace node id; 0 when the format does not record it.
    pub fn node_trace_node_id(&self, node_index: usize) -> u64 {
        self.layout
            .node_trace_node_id_offset
            .map(|offset| self.nodes[node_index + offset])
            .unwrap_or(0)
    }

    pub fn node_has_type(&self, node_index: usize, tag: Option<u64>) -> bool {
        tag == Some(self.node_type(node_index))
    }

    // Edges

    /// Edge offsets of the outgoing edges of the node at `node_index`.
    pub fn edge_indexes(&self, node_index: usize) -> StepBy<Range<usize>> {
        let ordinal = self.ordinal(node_index);
        (self.first_edge_index[ordinal]..self.first_edge_index[ordinal + 1])
            .step_by(self.layout.edge_field_count)
    }

    /// First edge offset of the node at `node_index`.
    pub fn edge_indexes_start(&self, node_index: usize) -> usize {
        self.first_edge_index[self.ordinal(node_index)]
    }

    #[inline]
    pub fn edge_type(&self, edge_index: usize) -> u32 {
        self.edges[edge_index + self.layout.edge_type_offset]
    }

    pub(crate) fn set_edge_type(&mut self, edge_index: usize, value: u32) {
        let offset = edge_index + self.layout.edge_type_offset;
        self.edges[offset] = value;
    }

    #[inline]
    pub fn edge_name_or_index(&self, edge_index: usize) -> u32 {
        self.edges[edge_index + self.layout.edge_name_offset]
    }

    /// Node offset the edge at `edge_index` points to.
    #[inline]
    pub fn edge_to_node(&self, edge_index: usize) -> usize {
        self.edges[edge_index + self.layout.edge_to_node_offset] as usize
    }

    pub fn edge_has_type(&self, edge_index: usize, tag: Option<u32>) -> bool {
        tag == Some(self.edge_type(edge_index))
    }

    // Retainers

    /// Number of edges pointing at the node at `node_index`.
    pub fn retainers_count(&self, node_index: usize) -> usize {
        self.retainers.count(self.ordinal(node_index))
    }
}
