//! Snapshot statistics
//!
//! Self size broken down by category, and per-allocation-site live object
//! counts for snapshots recorded with allocation tracking.

use crate::snapshot::FlatGraph;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Self size by category. `total` is the root's retained size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: u64,
    pub v8heap: u64,
    pub native: u64,
    pub code: u64,
    pub js_arrays: u64,
    pub strings: u64,
    pub system: u64,
}

/// Live objects attributed to one allocation trace node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveObjectStats {
    pub count: u64,
    pub size: u64,
}

/// Walks every node once and sums self sizes into the categories.
///
/// Hidden nodes count as system. Arrays are charged their `elements`
/// backing store when nothing else retains it.
pub fn category_statistics(graph: &FlatGraph, total_size: u64) -> Statistics {
    let tags = &graph.layout().node_tags;
    let mut stats = Statistics {
        total: total_size,
        ..Default::default()
    };

    for node_index in graph.node_indexes() {
        let self_size = graph.node_self_size(node_index);
        let node_type = Some(graph.node_type(node_index));
        if node_type == tags.hidden {
            stats.system += self_size;
        } else if node_type == tags.native {
            stats.native += self_size;
        } else if node_type == tags.code {
            stats.code += self_size;
        } else if node_type == tags.cons_string
            || node_type == tags.sliced_string
            || node_type == tags.string
        {
            stats.strings += self_size;
        } else if graph.node_raw_name(node_index) == "Array" {
            stats.js_arrays += array_size(graph, node_index);
        }
    }

    stats.v8heap = total_size.saturating_sub(stats.native);
    stats
}

fn array_size(graph: &FlatGraph, node_index: usize) -> u64 {
    let mut size = graph.node_self_size(node_index);
    let internal = graph.layout().edge_tags.internal;
    for edge_index in graph.edge_indexes(node_index) {
        if !graph.edge_has_type(edge_index, internal) {
            continue;
        }
        if graph.string(graph.edge_name_or_index(edge_index) as u64) != "elements" {
            continue;
        }
        let elements = graph.edge_to_node(edge_index);
        if graph.retainers_count(elements) == 1 {
            size += graph.node_self_size(elements);
        }
        break;
    }
    size
}

/// Count and self size of live objects per allocation trace node id.
pub fn live_objects_by_trace_node(graph: &FlatGraph) -> IndexMap<u64, LiveObjectStats> {
    let mut live_objects: IndexMap<u64, LiveObjectStats> = IndexMap::new();
    for node_index in graph.node_indexes() {
        let stats = live_objects
            .entry(graph.node_trace_node_id(node_index))
            .or_default();
        stats.count += 1;
        stats.size += graph.node_self_size(node_index);
    }
    live_objects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::builder::SnapshotBuilder;

    #[test]
    fn test_category_statistics() {
        let mut b = SnapshotBuilder::new();
        let root = b.node("synthetic", "", 1, 0);
        let array = b.node("object", "Array", 3, 16);
        let store = b.node("array", "", 5, 64);
        let text = b.node("string", "hello", 7, 24);
        let native = b.node("native", "Blob", 8, 100);
        let hidden = b.node("hidden", "system / Map", 9, 40);
        let code = b.node("code", "f", 11, 12);
        b.edge(root, "shortcut", "window", array);
        b.edge(root, "element", "1", text);
        b.edge(root, "element", "2", native);
        b.edge(root, "element", "3", hidden);
        b.edge(root, "element", "4", code);
        b.edge(array, "internal", "elements", store);

        let snapshot = b.build().unwrap();
        let stats = snapshot.statistics();
        assert_eq!(stats.total, 256);
        assert_eq!(stats.js_arrays, 80);
        assert_eq!(stats.strings, 24);
        assert_eq!(stats.native, 100);
        assert_eq!(stats.system, 40);
        assert_eq!(stats.code, 12);
        assert_eq!(stats.v8heap, 156);
    }

    #[test]
    fn test_shared_backing_store_not_charged() {
        let mut b = SnapshotBuilder::new();
        let root = b.node("synthetic", "", 1, 0);
        let first = b.node("object", "Array", 3, 16);
        let second = b.node("object", "Array", 5, 16);
        let store = b.node("array", "", 7, 64);
        b.edge(root, "element", "1", first);
        b.edge(root, "element", "2", second);
        b.edge(first, "internal", "elements", store);
        b.edge(second, "internal", "elements", store);

        let snapshot = b.build().unwrap();
        assert_eq!(snapshot.statistics().js_arrays, 32);
    }

    #[test]
    fn test_live_objects_by_trace_node() {
        let mut b = SnapshotBuilder::new();
        let root = b.node("synthetic", "", 1, 0);
        let a = b.node_traced("object", "A", 3, 10, 7);
        let c = b.node_traced("object", "A", 5, 30, 7);
        b.edge(root, "element", "1", a);
        b.edge(root, "element", "2", c);

        let snapshot = b.build().unwrap();
        let live = live_objects_by_trace_node(snapshot.graph());
        assert_eq!(live[&7], LiveObjectStats { count: 2, size: 40 });
        assert_eq!(live[&0], LiveObjectStats { count: 1, size: 0 });
    }
}
