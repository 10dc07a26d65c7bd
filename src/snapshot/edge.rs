//! Edge cursor

use super::node::{NodeRef, SerializedNode};
use super::HeapSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::StepBy;
use std::ops::Range;

/// Wire shape of an outgoing or retaining edge. `node` is the far end: the
/// target for outgoing edges, the retainer for retaining edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedEdge {
    pub name: String,
    pub node: SerializedNode,
    pub node_index: usize,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub distance: i32,
}

/// Cursor over one edge record, addressed by its absolute edge offset.
#[derive(Clone, Copy)]
pub struct EdgeRef<'a> {
    snapshot: &'a HeapSnapshot,
    edge_index: usize,
}

impl<'a> EdgeRef<'a> {
    pub(crate) fn new(snapshot: &'a HeapSnapshot, edge_index: usize) -> Self {
        Self {
            snapshot,
            edge_index,
        }
    }

    pub fn edge_index(&self) -> usize {
        self.edge_index
    }

    pub fn set_edge_index(&mut self, edge_index: usize) {
        self.edge_index = edge_index;
    }

    pub fn raw_type(&self) -> u32 {
        self.snapshot.graph.edge_type(self.edge_index)
    }

    pub fn edge_type(&self) -> &'a str {
        let snapshot = self.snapshot;
        snapshot.graph.layout().edge_type_name(self.raw_type())
    }

    pub fn name(&self) -> String {
        self.snapshot.format.edge_name(&self.snapshot.graph, self.edge_index)
    }

    pub fn has_string_name(&self) -> bool {
        self.snapshot
            .format
            .edge_has_string_name(&self.snapshot.graph, self.edge_index)
    }

    /// Offset of the target node.
    pub fn node_index(&self) -> usize {
        self.snapshot.graph.edge_to_node(self.edge_index)
    }

    pub fn node(&self) -> NodeRef<'a> {
        NodeRef::new(self.snapshot, self.node_index())
    }

    pub fn is_weak(&self) -> bool {
        let graph = &self.snapshot.graph;
        graph.edge_has_type(self.edge_index, graph.layout().edge_tags.weak)
    }

    pub fn is_invisible(&self) -> bool {
        let graph = &self.snapshot.graph;
        graph.edge_has_type(self.edge_index, Some(graph.layout().edge_tags.invisible))
    }

    pub fn serialize(&self) -> SerializedEdge {
        let node = self.node();
        SerializedEdge {
            name: self.name(),
            node: node.serialize(),
            node_index: self.node_index(),
            edge_type: self.edge_type().to_string(),
            distance: node.distance(),
        }
    }
}

impl fmt::Debug for EdgeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeRef")
            .field("edge_index", &self.edge_index)
            .field("type", &self.edge_type())
            .field("name", &self.name())
            .finish()
    }
}

/// Outgoing edges of one node
pub struct EdgeIter<'a> {
    snapshot: &'a HeapSnapshot,
    edge_indexes: StepBy<Range<usize>>,
}

impl<'a> EdgeIter<'a> {
    pub(crate) fn new(snapshot: &'a HeapSnapshot, node_index: usize) -> Self {
        Self {
            snapshot,
            edge_indexes: snapshot.graph.edge_indexes(node_index),
        }
    }
}

impl<'a> Iterator for EdgeIter<'a> {
    type Item = EdgeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.edge_indexes
            .next()
            .map(|edge_index| EdgeRef::new(self.snapshot, edge_index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.edge_indexes.size_hint()
    }
}

impl ExactSizeIterator for EdgeIter<'_> {}
