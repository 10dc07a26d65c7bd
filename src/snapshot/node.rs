//! Node cursor
//!
//! A [`NodeRef`] is a `Copy` pair of the snapshot and a node record offset.
//! It can be repositioned in place with [`NodeRef::set_node_index`]; copying
//! it is the clone operation.

use super::edge::EdgeIter;
use super::retainer::RetainerIter;
use super::HeapSnapshot;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Wire shape of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedNode {
    pub id: u64,
    pub name: String,
    pub distance: i32,
    pub node_index: usize,
    pub retained_size: u64,
    pub self_size: u64,
    #[serde(rename = "type")]
    pub node_type: String,
}

#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    snapshot: &'a HeapSnapshot,
    node_index: usize,
}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(snapshot: &'a HeapSnapshot, node_index: usize) -> Self {
        Self {
            snapshot,
            node_index,
        }
    }

    pub fn node_index(&self) -> usize {
        self.node_index
    }

    /// Move the cursor to another node record.
    pub fn set_node_index(&mut self, node_index: usize) {
        self.node_index = node_index;
    }

    pub fn ordinal(&self) -> usize {
        self.snapshot.graph.ordinal(self.node_index)
    }

    pub fn id(&self) -> u64 {
        self.snapshot.graph.node_id(self.node_index)
    }

    pub fn name(&self) -> Cow<'a, str> {
        let snapshot = self.snapshot;
        snapshot.format.node_name(&snapshot.graph, self.node_index)
    }

    /// Raw type tag value
    pub fn raw_type(&self) -> u64 {
        self.snapshot.graph.node_type(self.node_index)
    }

    pub fn node_type(&self) -> &'a str {
        let snapshot = self.snapshot;
        let graph = &snapshot.graph;
        graph.layout().node_type_name(graph.node_type(self.node_index))
    }

    pub fn self_size(&self) -> u64 {
        self.snapshot.graph.node_self_size(self.node_index)
    }

    pub fn trace_node_id(&self) -> u64 {
        self.snapshot.graph.node_trace_node_id(self.node_index)
    }

    pub fn class_name(&self) -> Cow<'a, str> {
        let snapshot = self.snapshot;
        snapshot.format.class_name(&snapshot.graph, self.node_index)
    }

    pub fn class_index(&self) -> i64 {
        self.snapshot.format.class_index(&self.snapshot.graph, self.node_index)
    }

    pub fn is_root(&self) -> bool {
        self.node_index == self.snapshot.graph.root_index()
    }

    pub fn distance(&self) -> i32 {
        self.snapshot.distances[self.ordinal()]
    }

    pub fn retained_size(&self) -> u64 {
        self.snapshot.retained_sizes[self.ordinal()]
    }

    /// Offset of the immediate dominator. The root dominates itself.
    pub fn dominator_index(&self) -> usize {
        let dominator = self.snapshot.dominators_tree[self.ordinal()] as usize;
        self.snapshot.graph.node_index(dominator)
    }

    pub fn dominator(&self) -> NodeRef<'a> {
        NodeRef::new(self.snapshot, self.dominator_index())
    }

    pub fn edges_count(&self) -> usize {
        self.snapshot.graph.node_edge_count(self.node_index) as usize
    }

    pub fn edges(&self) -> EdgeIter<'a> {
        EdgeIter::new(self.snapshot, self.node_index)
    }

    pub fn retainers_count(&self) -> usize {
        self.snapshot.graph.retainers_count(self.node_index)
    }

    pub fn retainers(&self) -> RetainerIter<'a> {
        RetainerIter::new(self.snapshot, self.node_index)
    }

    /// Offsets of the nodes this node immediately dominates.
    pub fn dominated_node_indexes(&self) -> Vec<usize> {
        let graph = &self.snapshot.graph;
        self.snapshot
            .dominated
            .of(self.ordinal())
            .iter()
            .map(|&ordinal| graph.node_index(ordinal as usize))
            .collect()
    }

    pub fn dominated_nodes(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let snapshot = self.snapshot;
        snapshot
            .dominated
            .of(self.ordinal())
            .iter()
            .map(move |&ordinal| NodeRef::new(snapshot, snapshot.graph.node_index(ordinal as usize)))
    }

    pub fn serialize(&self) -> SerializedNode {
        SerializedNode {
            id: self.id(),
            name: self.name().into_owned(),
            distance: self.distance(),
            node_index: self.node_index,
            retained_size: self.retained_size(),
            self_size: self.self_size(),
            node_type: self.node_type().to_string(),
        }
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("node_index", &self.node_index)
            .field("id", &self.id())
            .field("type", &self.node_type())
            .finish()
    }
}

/// All nodes in ordinal order
pub struct NodeIter<'a> {
    snapshot: &'a HeapSnapshot,
    next_index: usize,
}

impl<'a> NodeIter<'a> {
    pub(crate) fn new(snapshot: &'a HeapSnapshot) -> Self {
        Self {
            snapshot,
            next_index: 0,
        }
    }
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= self.snapshot.graph.nodes.len() {
            return None;
        }
        let node = NodeRef::new(self.snapshot, self.next_index);
        self.next_index += self.snapshot.graph.layout().node_field_count;
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let width = self.snapshot.graph.layout().node_field_count;
        let remaining = self.snapshot.graph.nodes.len().saturating_sub(self.next_index) / width;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for NodeIter<'_> {}
