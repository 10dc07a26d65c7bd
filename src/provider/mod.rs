//! Paginated item providers
//!
//! A provider lists the items of one domain (a node's edges, a node's
//! retainers, or a set of nodes) in an iteration order that is materialized
//! on first use, optionally filtered. Sorting is incremental: each range
//! request sorts only the requested window and remembers how much of the
//! order is already final at either end.

mod compare;

pub use compare::{ComparatorConfig, SortField};

use crate::aggregate::NodeFilter;
use crate::error::{QueryError, QueryResult};
use crate::snapshot::{HeapSnapshot, NodeRef, RetainerRef, SerializedEdge, SerializedNode};
use heapsnap_graph_algorithms::sort_range;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// One page of serialized items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsRange<T> {
    pub start_position: usize,
    pub end_position: usize,
    pub total_length: usize,
    pub items: Vec<T>,
}

/// What a provider iterates over
pub trait ProviderDomain {
    type Serialized: Serialize;

    /// Item indexes in natural order.
    fn indexes(&self) -> Vec<usize>;

    /// Wire shape of an item, `None` if the index no longer addresses one.
    fn serialize_item(&self, index: usize) -> Option<Self::Serialized>;

    /// Full comparison of two items; ties are broken by index.
    fn compare(&self, comparator: &ComparatorConfig, a: usize, b: usize) -> Ordering;
}

/// Outgoing edges of a node; items are absolute edge offsets.
pub struct EdgeDomain<'a> {
    snapshot: &'a HeapSnapshot,
    node_index: usize,
}

impl ProviderDomain for EdgeDomain<'_> {
    type Serialized = SerializedEdge;

    fn indexes(&self) -> Vec<usize> {
        self.snapshot.graph().edge_indexes(self.node_index).collect()
    }

    fn serialize_item(&self, index: usize) -> Option<SerializedEdge> {
        Some(self.snapshot.edge_at(index).serialize())
    }

    fn compare(&self, comparator: &ComparatorConfig, a: usize, b: usize) -> Ordering {
        let (edge_a, edge_b) = (self.snapshot.edge_at(a), self.snapshot.edge_at(b));
        comparator
            .compare_edges(&edge_a, &edge_b, &edge_a.node(), &edge_b.node())
            .then(a.cmp(&b))
    }
}

/// Incoming edges of a node; items are retainer positions.
pub struct RetainerDomain<'a> {
    snapshot: &'a HeapSnapshot,
    node_index: usize,
}

impl<'a> RetainerDomain<'a> {
    fn retainer(&self, position: usize) -> Option<RetainerRef<'a>> {
        RetainerRef::new(self.snapshot, self.node_index, position)
    }
}

impl ProviderDomain for RetainerDomain<'_> {
    type Serialized = SerializedEdge;

    fn indexes(&self) -> Vec<usize> {
        (0..self.snapshot.graph().retainers_count(self.node_index)).collect()
    }

    fn serialize_item(&self, index: usize) -> Option<SerializedEdge> {
        self.retainer(index).map(|retainer| retainer.serialize())
    }

    fn compare(&self, comparator: &ComparatorConfig, a: usize, b: usize) -> Ordering {
        let (Some(retainer_a), Some(retainer_b)) = (self.retainer(a), self.retainer(b)) else {
            return a.cmp(&b);
        };
        comparator
            .compare_edges(
                &retainer_a.edge(),
                &retainer_b.edge(),
                &retainer_a.node(),
                &retainer_b.node(),
            )
            .then(a.cmp(&b))
    }
}

/// A set of nodes; items are node offsets.
pub struct NodeDomain<'a> {
    snapshot: &'a HeapSnapshot,
    /// Explicit node list; all nodes when `None`.
    node_indexes: Option<Vec<usize>>,
}

impl ProviderDomain for NodeDomain<'_> {
    type Serialized = SerializedNode;

    fn indexes(&self) -> Vec<usize> {
        match &self.node_indexes {
            Some(node_indexes) => node_indexes.clone(),
            None => self.snapshot.graph().node_indexes().collect(),
        }
    }

    fn serialize_item(&self, index: usize) -> Option<SerializedNode> {
        self.snapshot.node(index).map(|node| node.serialize())
    }

    fn compare(&self, comparator: &ComparatorConfig, a: usize, b: usize) -> Ordering {
        let (node_a, node_b) = (NodeRef::new(self.snapshot, a), NodeRef::new(self.snapshot, b));
        comparator.compare_nodes(&node_a, &node_b).then(a.cmp(&b))
    }
}

/// Filtered, lazily ordered, incrementally sorted view over a domain
pub struct ItemProvider<'a, D: ProviderDomain> {
    domain: D,
    filter: Option<Box<dyn Fn(usize) -> bool + 'a>>,
    iteration_order: Option<Vec<usize>>,
    comparator: Option<ComparatorConfig>,
    sorted_prefix_length: usize,
    sorted_suffix_length: usize,
}

pub type EdgesProvider<'a> = ItemProvider<'a, EdgeDomain<'a>>;
pub type RetainersProvider<'a> = ItemProvider<'a, RetainerDomain<'a>>;
pub type NodesProvider<'a> = ItemProvider<'a, NodeDomain<'a>>;

impl<'a, D: ProviderDomain> ItemProvider<'a, D> {
    pub fn new(domain: D, filter: Option<Box<dyn Fn(usize) -> bool + 'a>>) -> Self {
        Self {
            domain,
            filter,
            iteration_order: None,
            comparator: None,
            sorted_prefix_length: 0,
            sorted_suffix_length: 0,
        }
    }

    fn iteration_order(&mut self) -> &mut Vec<usize> {
        let domain = &self.domain;
        let filter = &self.filter;
        self.iteration_order.get_or_insert_with(|| {
            let mut order = domain.indexes();
            if let Some(filter) = filter {
                order.retain(|&index| filter(index));
            }
            order
        })
    }

    /// Number of items after filtering.
    pub fn len(&mut self) -> usize {
        self.iteration_order().len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    /// Set the comparator and forget everything sorted so far.
    pub fn sort_and_rewind(&mut self, comparator: ComparatorConfig) {
        self.comparator = Some(comparator);
        self.sorted_prefix_length = 0;
        self.sorted_suffix_length = 0;
    }

    /// Serialize items `begin..end` of the current order, sorting only what
    /// the request needs.
    pub fn serialize_items_range(&mut self, begin: usize, end: usize) -> QueryResult<ItemsRange<D::Serialized>> {
        if begin > end {
            return Err(QueryError::InvalidRange { begin, end });
        }
        let length = self.len();
        let end = end.min(length);

        if let Some(comparator) = self.comparator {
            if self.sorted_prefix_length < end && begin < length - self.sorted_suffix_length {
                let left = self.sorted_prefix_length;
                let right = length - 1 - self.sorted_suffix_length;
                let domain = &self.domain;
                let order = self.iteration_order.get_or_insert_with(Vec::new);
                sort_range(
                    order,
                    |&a, &b| domain.compare(&comparator, a, b),
                    left,
                    right,
                    begin,
                    end - 1,
                );
                if begin <= self.sorted_prefix_length {
                    self.sorted_prefix_length = end;
                }
                if end >= length - self.sorted_suffix_length {
                    self.sorted_suffix_length = length - begin;
                }
                debug!(
                    "Sorted window {}..{}; prefix {}, suffix {}",
                    begin, end, self.sorted_prefix_length, self.sorted_suffix_length
                );
            }
        }

        let order = self.iteration_order();
        let window = order.get(begin..end).unwrap_or(&[]).to_vec();
        let items = window
            .into_iter()
            .filter_map(|index| self.domain.serialize_item(index))
            .collect();
        Ok(ItemsRange {
            start_position: begin,
            end_position: end,
            total_length: length,
            items,
        })
    }
}

impl<'a> NodesProvider<'a> {
    /// Position the node with `id` takes in the current sort order, or in
    /// the iteration order when no comparator is set.
    pub fn node_position(&mut self, id: u64) -> Option<usize> {
        let snapshot = self.domain.snapshot;
        let comparator = self.comparator;
        let order = self.iteration_order();
        let position = order
            .iter()
            .position(|&index| snapshot.graph().node_id(index) == id)?;
        let Some(comparator) = comparator else {
            return Some(position);
        };
        let target = order[position];
        let order = order.clone();
        Some(
            order
                .iter()
                .filter(|&&index| self.domain.compare(&comparator, index, target) == Ordering::Less)
                .count(),
        )
    }
}

impl HeapSnapshot {
    /// Outgoing edges of the node at `node_index` shown by the format's
    /// containment filter.
    pub fn create_edges_provider(&self, node_index: usize) -> Option<EdgesProvider<'_>> {
        self.node(node_index)?;
        let show_hidden = self.config.show_hidden_data;
        let filter = move |edge_index: usize| {
            self.format
                .containment_edge_filter(&self.graph, edge_index, show_hidden)
        };
        Some(ItemProvider::new(
            EdgeDomain {
                snapshot: self,
                node_index,
            },
            Some(Box::new(filter)),
        ))
    }

    /// Retainers of the node at `node_index` shown by the format's retainer
    /// filter.
    pub fn create_retaining_edges_provider(&self, node_index: usize) -> Option<RetainersProvider<'_>> {
        self.node(node_index)?;
        let show_hidden = self.config.show_hidden_data;
        let filter = move |position: usize| {
            RetainerRef::new(self, node_index, position).map_or(false, |retainer| {
                self.format.retainer_edge_filter(
                    &self.graph,
                    retainer.node_index(),
                    retainer.edge().edge_index(),
                    show_hidden,
                )
            })
        };
        Some(ItemProvider::new(
            RetainerDomain {
                snapshot: self,
                node_index,
            },
            Some(Box::new(filter)),
        ))
    }

    /// Members of `class_name` under `filter`; `None` for an unknown class.
    pub fn create_nodes_provider_for_class(
        &self,
        class_name: &str,
        filter: &NodeFilter,
    ) -> Option<NodesProvider<'_>> {
        let aggregates = self.aggregates_with_filter(filter);
        let node_indexes = aggregates.get(class_name)?.idxs.clone();
        let flags = self.flags.as_ref();
        let class_filter =
            move |node_index: usize| self.format.class_node_filter(flags, &self.graph, node_index);
        Some(ItemProvider::new(
            NodeDomain {
                snapshot: self,
                node_indexes: Some(node_indexes),
            },
            Some(Box::new(class_filter)),
        ))
    }

    /// Nodes immediately dominated by the node at `node_index`.
    pub fn create_nodes_provider_for_dominator(&self, node_index: usize) -> Option<NodesProvider<'_>> {
        let node = self.node(node_index)?;
        Some(ItemProvider::new(
            NodeDomain {
                snapshot: self,
                node_indexes: Some(node.dominated_node_indexes()),
            },
            None,
        ))
    }

    /// Every node accepted by `filter`, and by the ownership flags if any.
    pub fn create_all_nodes_provider(&self, filter: &NodeFilter) -> NodesProvider<'_> {
        let filter = *filter;
        let accepts = move |node_index: usize| {
            let flagged = self
                .flags
                .as_ref()
                .map_or(true, |flags| flags.has(self.graph.ordinal(node_index)));
            flagged && filter.accepts(self.graph.node_id(node_index))
        };
        ItemProvider::new(
            NodeDomain {
                snapshot: self,
                node_indexes: None,
            },
            Some(Box::new(accepts)),
        )
    }

    /// Nodes of `class_name` added since the baseline of an earlier
    /// [`HeapSnapshot::calculate_snapshot_diff`] call.
    pub fn create_added_nodes_provider(&self, baseline_id: &str, class_name: &str) -> QueryResult<NodesProvider<'_>> {
        let diffs = self
            .cache
            .read()
            .diffs
            .get(baseline_id)
            .cloned()
            .ok_or_else(|| QueryError::UnknownBaseline(baseline_id.to_string()))?;
        let diff = diffs
            .get(class_name)
            .ok_or_else(|| QueryError::NoSuchClass(class_name.to_string()))?;
        Ok(ItemProvider::new(
            NodeDomain {
                snapshot: self,
                node_indexes: Some(diff.added_indexes.clone()),
            },
            None,
        ))
    }

    /// Nodes of this snapshot at `node_indexes`, typically the deleted
    /// indexes of a diff computed by a newer snapshot. Offsets that do not
    /// address a node are dropped.
    pub fn create_deleted_nodes_provider(&self, mut node_indexes: Vec<usize>) -> NodesProvider<'_> {
        node_indexes.retain(|&node_index| self.node(node_index).is_some());
        ItemProvider::new(
            NodeDomain {
                snapshot: self,
                node_indexes: Some(node_indexes),
            },
            None,
        )
    }
}
