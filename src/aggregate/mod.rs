//! Class aggregation
//!
//! Groups live nodes by class index, sums their self sizes and computes each
//! class's retained size from the dominator tree. Results are memoized per
//! filter in the snapshot's [`AggregateCache`]; the cache lives as long as
//! the snapshot does.

pub mod diff;

pub use diff::{diff_for_class, Diff};

use crate::snapshot::HeapSnapshot;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Per-class summary of live nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub count: usize,
    /// Smallest distance among the members
    pub distance: i32,
    pub self_size: u64,
    /// Retained size of the class, counting nested members once
    pub max_ret: u64,
    #[serde(rename = "type")]
    pub node_type: String,
    /// Display name, only for object and native classes
    pub name: Option<String>,
    /// Member node offsets
    pub idxs: Vec<usize>,
}

/// Members of a class sorted by id, as exchanged between snapshots for diffing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateForDiff {
    pub indexes: Vec<usize>,
    pub ids: Vec<u64>,
    pub self_sizes: Vec<u64>,
}

/// Node id window; a node passes when `min < id <= max`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFilter {
    pub min_node_id: Option<u64>,
    pub max_node_id: Option<u64>,
}

impl NodeFilter {
    pub fn id_range(min_node_id: u64, max_node_id: u64) -> Self {
        Self {
            min_node_id: Some(min_node_id),
            max_node_id: Some(max_node_id),
        }
    }

    #[inline]
    pub fn accepts(&self, id: u64) -> bool {
        self.min_node_id.map_or(true, |min| id > min) && self.max_node_id.map_or(true, |max| id <= max)
    }

    pub fn key(&self) -> AggregateKey {
        if self.min_node_id.is_none() && self.max_node_id.is_none() {
            AggregateKey::AllObjects
        } else {
            AggregateKey::IdRange {
                min: self.min_node_id,
                max: self.max_node_id,
            }
        }
    }
}

/// Cache key of an aggregate computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKey {
    AllObjects,
    IdRange { min: Option<u64>, max: Option<u64> },
}

#[derive(Debug, Clone)]
struct CachedAggregates {
    by_class: Arc<IndexMap<String, Aggregate>>,
    /// Member lists are sorted by id
    sorted: bool,
}

/// Lazily filled per-snapshot aggregate cache. Concurrent fills of the same
/// key compute identical content; the last write wins.
#[derive(Debug, Default)]
pub struct AggregateCache {
    aggregates: FxHashMap<AggregateKey, CachedAggregates>,
    for_diff: Option<Arc<IndexMap<String, AggregateForDiff>>>,
    pub(crate) diffs: FxHashMap<String, Arc<IndexMap<String, Diff>>>,
}

struct ClassEntry {
    class_name: String,
    aggregate: Aggregate,
}

impl HeapSnapshot {
    /// Class aggregates of the nodes accepted by `filter`.
    pub fn aggregates_with_filter(&self, filter: &NodeFilter) -> Arc<IndexMap<String, Aggregate>> {
        self.aggregates(filter, false)
    }

    /// Per-class ids, offsets and self sizes of all live nodes, sorted by id.
    pub fn aggregates_for_diff(&self) -> Arc<IndexMap<String, AggregateForDiff>> {
        if let Some(cached) = &self.cache.read().for_diff {
            return Arc::clone(cached);
        }

        let aggregates = self.aggregates(&NodeFilter::default(), true);
        let graph = &self.graph;
        let for_diff: IndexMap<String, AggregateForDiff> = aggregates
            .iter()
            .map(|(class_name, aggregate)| {
                let indexes = aggregate.idxs.clone();
                let ids = indexes.iter().map(|&index| graph.node_id(index)).collect();
                let self_sizes = indexes.iter().map(|&index| graph.node_self_size(index)).collect();
                (
                    class_name.clone(),
                    AggregateForDiff {
                        indexes,
                        ids,
                        self_sizes,
                    },
                )
            })
            .collect();

        let for_diff = Arc::new(for_diff);
        self.cache.write().for_diff = Some(Arc::clone(&for_diff));
        for_diff
    }

    /// Diff this snapshot against the baseline aggregates, memoized by
    /// `baseline_id`. Classes without changes are left out.
    pub fn calculate_snapshot_diff(
        &self,
        baseline_id: &str,
        baseline: &IndexMap<String, AggregateForDiff>,
    ) -> Arc<IndexMap<String, Diff>> {
        if let Some(cached) = self.cache.read().diffs.get(baseline_id) {
            return Arc::clone(cached);
        }

        let current = self.aggregates_for_diff();
        let mut snapshot_diff = IndexMap::new();
        for (class_name, base) in baseline {
            if let Some(diff) = diff_for_class(base, current.get(class_name)) {
                snapshot_diff.insert(class_name.clone(), diff);
            }
        }
        let empty = AggregateForDiff::default();
        for (class_name, aggregate) in current.iter() {
            if baseline.contains_key(class_name) {
                continue;
            }
            if let Some(diff) = diff_for_class(&empty, Some(aggregate)) {
                snapshot_diff.insert(class_name.clone(), diff);
            }
        }
        debug!(
            "Diff against {}: {} classes changed",
            baseline_id,
            snapshot_diff.len()
        );

        let snapshot_diff = Arc::new(snapshot_diff);
        self.cache
            .write()
            .diffs
            .insert(baseline_id.to_string(), Arc::clone(&snapshot_diff));
        snapshot_diff
    }

    fn aggregates(&self, filter: &NodeFilter, sorted: bool) -> Arc<IndexMap<String, Aggregate>> {
        let key = filter.key();
        let cached = self.cache.read().aggregates.get(&key).cloned();
        let mut by_class = match cached {
            Some(cached) if cached.sorted || !sorted => return cached.by_class,
            Some(cached) => (*cached.by_class).clone(),
            None => self.build_aggregates(filter),
        };
        if sorted {
            let graph = &self.graph;
            for aggregate in by_class.values_mut() {
                aggregate.idxs.sort_by_key(|&index| graph.node_id(index));
            }
        }

        let by_class = Arc::new(by_class);
        self.cache.write().aggregates.insert(
            key,
            CachedAggregates {
                by_class: Arc::clone(&by_class),
                sorted,
            },
        );
        by_class
    }

    /// Flags and filter decide membership; zero-sized non-native nodes are
    /// bookkeeping and never counted.
    fn is_aggregated(&self, filter: &NodeFilter, node_index: usize) -> bool {
        let graph = &self.graph;
        let ordinal = graph.ordinal(node_index);
        if let Some(flags) = &self.flags {
            if !flags.has(ordinal) {
                return false;
            }
        }
        if !filter.accepts(graph.node_id(node_index)) {
            return false;
        }
        graph.node_self_size(node_index) != 0
            || graph.node_has_type(node_index, graph.layout().node_tags.native)
    }

    fn build_aggregates(&self, filter: &NodeFilter) -> IndexMap<String, Aggregate> {
        let graph = &self.graph;
        let tags = &graph.layout().node_tags;
        let mut slots: FxHashMap<i64, usize> = FxHashMap::default();
        let mut classes: Vec<ClassEntry> = Vec::new();

        for node_index in graph.node_indexes() {
            if !self.is_aggregated(filter, node_index) {
                continue;
            }
            let class_index = self.format.class_index(graph, node_index);
            let distance = self.distances[graph.ordinal(node_index)];
            let self_size = graph.node_self_size(node_index);
            match slots.get(&class_index) {
                Some(&slot) => {
                    let aggregate = &mut classes[slot].aggregate;
                    aggregate.count += 1;
                    aggregate.distance = aggregate.distance.min(distance);
                    aggregate.self_size += self_size;
                    aggregate.idxs.push(node_index);
                }
                None => {
                    let name_matters =
                        graph.node_has_type(node_index, tags.object) || graph.node_has_type(node_index, tags.native);
                    slots.insert(class_index, classes.len());
                    classes.push(ClassEntry {
                        class_name: self.format.class_name(graph, node_index).into_owned(),
                        aggregate: Aggregate {
                            count: 1,
                            distance,
                            self_size,
                            max_ret: 0,
                            node_type: graph.layout().node_type_name(graph.node_type(node_index)).to_string(),
                            name: name_matters.then(|| self.format.node_name(graph, node_index).into_owned()),
                            idxs: vec![node_index],
                        },
                    });
                }
            }
        }

        self.accumulate_class_retained_sizes(filter, &slots, &mut classes);

        let mut by_class = IndexMap::with_capacity(classes.len());
        for entry in classes {
            by_class.insert(entry.class_name, entry.aggregate);
        }
        by_class
    }

    /// Walk the dominator tree from the root. A member adds its retained size
    /// to its class unless an ancestor of the same class already did.
    fn accumulate_class_retained_sizes(
        &self,
        filter: &NodeFilter,
        slots: &FxHashMap<i64, usize>,
        classes: &mut [ClassEntry],
    ) {
        let graph = &self.graph;
        let mut list: Vec<u32> = vec![graph.root_ordinal() as u32];
        // list lengths at which a class was marked, and the marked classes
        let mut sizes: Vec<usize> = Vec::new();
        let mut marked: Vec<usize> = Vec::new();
        let mut seen = vec![false; classes.len()];

        while let Some(ordinal) = list.pop() {
            let ordinal = ordinal as usize;
            let node_index = graph.node_index(ordinal);
            let dominated = self.dominated.of(ordinal);

            let slot = slots.get(&self.format.class_index(graph, node_index)).copied();
            if let Some(slot) = slot {
                if !seen[slot] && self.is_aggregated(filter, node_index) {
                    classes[slot].aggregate.max_ret += self.retained_sizes[ordinal];
                    if !dominated.is_empty() {
                        seen[slot] = true;
                        sizes.push(list.len());
                        marked.push(slot);
                    }
                }
            }

            list.extend_from_slice(dominated);
            while sizes.last() == Some(&list.len()) {
                sizes.pop();
                if let Some(slot) = marked.pop() {
                    seen[slot] = false;
                }
            }
        }
    }
}
