//! Retainer cursor
//!
//! Addresses the i-th incoming edge of a node through the retainer index.

use super::edge::{EdgeRef, SerializedEdge};
use super::node::NodeRef;
use super::HeapSnapshot;
use std::fmt;
use std::ops::Range;

#[derive(Clone, Copy)]
pub struct RetainerRef<'a> {
    snapshot: &'a HeapSnapshot,
    retained_node_index: usize,
    first_retainer: usize,
    retainer_index: usize,
    node_index: usize,
    edge_index: usize,
}

impl<'a> RetainerRef<'a> {
    /// Cursor on retainer `retainer_index` of the node at `retained_node_index`,
    /// or `None` when the node has fewer retainers.
    pub(crate) fn new(snapshot: &'a HeapSnapshot, retained_node_index: usize, retainer_index: usize) -> Option<Self> {
        let graph = &snapshot.graph;
        let first_retainer = graph.retainers.slots(graph.ordinal(retained_node_index)).start;
        let mut retainer = Self {
            snapshot,
            retained_node_index,
            first_retainer,
            retainer_index,
            node_index: 0,
            edge_index: 0,
        };
        retainer.set_retainer_index(retainer_index).then_some(retainer)
    }

    /// Node and edge offsets of retainer `retainer_index`, if it exists.
    fn locate(&self, retainer_index: usize) -> Option<(usize, usize)> {
        let graph = &self.snapshot.graph;
        if retainer_index >= graph.retainers_count(self.retained_node_index) {
            return None;
        }
        let slot = self.first_retainer + retainer_index;
        let node_index = graph.node_index(graph.retainers.retaining_nodes[slot] as usize);
        let edge_index = graph.retainers.retaining_edges[slot] as usize * graph.layout().edge_field_count;
        Some((node_index, edge_index))
    }

    /// Position among the retainers of the retained node.
    pub fn retainer_index(&self) -> usize {
        self.retainer_index
    }

    /// Move to another retainer of the same node. Returns `false`, leaving
    /// the cursor where it was, when there is no such retainer.
    pub fn set_retainer_index(&mut self, retainer_index: usize) -> bool {
        match self.locate(retainer_index) {
            Some((node_index, edge_index)) => {
                self.retainer_index = retainer_index;
                self.node_index = node_index;
                self.edge_index = edge_index;
                true
            }
            None => false,
        }
    }

    pub fn retained_node_index(&self) -> usize {
        self.retained_node_index
    }

    /// Offset of the retaining node.
    pub fn node_index(&self) -> usize {
        self.node_index
    }

    pub fn node(&self) -> NodeRef<'a> {
        NodeRef::new(self.snapshot, self.node_index)
    }

    /// The retaining edge itself, as seen from the retainer.
    pub fn edge(&self) -> EdgeRef<'a> {
        EdgeRef::new(self.snapshot, self.edge_index)
    }

    pub fn name(&self) -> String {
        self.edge().name()
    }

    pub fn has_string_name(&self) -> bool {
        self.edge().has_string_name()
    }

    pub fn edge_type(&self) -> &'a str {
        self.edge().edge_type()
    }

    pub fn serialize(&self) -> SerializedEdge {
        let node = self.node();
        SerializedEdge {
            name: self.name(),
            node: node.serialize(),
            node_index: self.node_index,
            edge_type: self.edge_type().to_string(),
            distance: node.distance(),
        }
    }
}

impl fmt::Debug for RetainerRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetainerRef")
            .field("retained_node_index", &self.retained_node_index)
            .field("retainer_index", &self.retainer_index)
            .field("node_index", &self.node_index)
            .field("edge_index", &self.edge_index)
            .finish()
    }
}

/// Incoming edges of one node
pub struct RetainerIter<'a> {
    snapshot: &'a HeapSnapshot,
    retained_node_index: usize,
    positions: Range<usize>,
}

impl<'a> RetainerIter<'a> {
    pub(crate) fn new(snapshot: &'a HeapSnapshot, retained_node_index: usize) -> Self {
        Self {
            snapshot,
            retained_node_index,
            positions: 0..snapshot.graph.retainers_count(retained_node_index),
        }
    }
}

impl<'a> Iterator for RetainerIter<'a> {
    type Item = RetainerRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let position = self.positions.next()?;
        RetainerRef::new(self.snapshot, self.retained_node_index, position)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.positions.size_hint()
    }
}

impl ExactSizeIterator for RetainerIter<'_> {}
