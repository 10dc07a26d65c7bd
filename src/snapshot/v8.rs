//! V8 heap profile format

use super::format::{HeapFormat, NodeFlags};
use super::storage::FlatGraph;
use crate::stats::{category_statistics, Statistics};
use rustc_hash::FxHashSet;
use std::borrow::Cow;

/// Node flag bits
pub mod node_flags {
    pub const PAGE_OBJECT: u32 = 4;
    pub const VISITED_MARKER: u32 = 0x10000;
    pub const VISITED_MARKER_MASK: u32 = 0xffff;
}

const DOCUMENT_DOM_TREES_ROOT: &str = "(Document DOM trees)";

/// Longest concatenated-string name assembled before giving up.
const MAX_CONS_STRING_NAME: usize = 1024;

#[derive(Debug, Default, Clone, Copy)]
pub struct V8Format;

/// Integer value of the leading digits of `name`, if it starts with any.
fn leading_integer(name: &str) -> Option<i64> {
    let trimmed = name.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|value| sign * value)
}

impl V8Format {
    fn is_hidden(graph: &FlatGraph, node_index: usize) -> bool {
        graph.node_has_type(node_index, graph.layout().node_tags.hidden)
    }

    fn is_synthetic(graph: &FlatGraph, node_index: usize) -> bool {
        graph.node_has_type(node_index, graph.layout().node_tags.synthetic)
    }

    fn is_document_dom_trees_root(graph: &FlatGraph, node_index: usize) -> bool {
        Self::is_synthetic(graph, node_index) && graph.node_raw_name(node_index) == DOCUMENT_DOM_TREES_ROOT
    }

    fn is_shortcut(graph: &FlatGraph, edge_index: usize) -> bool {
        graph.edge_has_type(edge_index, graph.layout().edge_tags.shortcut)
    }

    /// Element and hidden edges are named by index in the raw record.
    fn has_raw_string_name(graph: &FlatGraph, edge_index: usize) -> bool {
        let tags = &graph.layout().edge_tags;
        !graph.edge_has_type(edge_index, tags.element) && !graph.edge_has_type(edge_index, tags.hidden)
    }

    fn raw_edge_name(graph: &FlatGraph, edge_index: usize) -> String {
        let name_or_index = graph.edge_name_or_index(edge_index);
        if Self::has_raw_string_name(graph, edge_index) {
            graph.string(name_or_index as u64).to_string()
        } else {
            name_or_index.to_string()
        }
    }

    fn duplicated_global_edges(graph: &FlatGraph) -> Vec<usize> {
        let mut duplicates = Vec::new();
        for edge_index in graph.edge_indexes(graph.root_index()) {
            if !Self::is_shortcut(graph, edge_index) {
                continue;
            }
            let global = graph.edge_to_node(edge_index);
            let prop_names: FxHashSet<u32> = graph
                .edge_indexes(global)
                .filter(|&e| Self::is_shortcut(graph, e))
                .map(|e| graph.edge_name_or_index(e))
                .collect();
            for global_edge in graph.edge_indexes(global) {
                if !Self::is_shortcut(graph, global_edge)
                    && Self::is_hidden(graph, graph.edge_to_node(global_edge))
                    && Self::has_raw_string_name(graph, global_edge)
                    && prop_names.contains(&graph.edge_name_or_index(global_edge))
                {
                    duplicates.push(global_edge);
                }
            }
        }
        duplicates
    }

    /// Flattens a concatenated string through its `first`/`second` parts.
    fn cons_string_name(graph: &FlatGraph, node_index: usize) -> String {
        let tags = &graph.layout().node_tags;
        let internal = graph.layout().edge_tags.internal;
        let mut name = String::new();
        let mut nodes_stack = vec![node_index];
        while let Some(current) = nodes_stack.pop() {
            if name.len() >= MAX_CONS_STRING_NAME {
                break;
            }
            if !graph.node_has_type(current, tags.cons_string) {
                name.push_str(graph.node_raw_name(current));
                continue;
            }
            let mut first = None;
            let mut second = None;
            for edge_index in graph.edge_indexes(current) {
                if first.is_some() && second.is_some() {
                    break;
                }
                if !graph.edge_has_type(edge_index, internal) {
                    continue;
                }
                match graph.string(graph.edge_name_or_index(edge_index) as u64) {
                    "first" => first = Some(graph.edge_to_node(edge_index)),
                    "second" => second = Some(graph.edge_to_node(edge_index)),
                    _ => {}
                }
            }
            nodes_stack.extend(second);
            nodes_stack.extend(first);
        }
        name
    }
}

impl HeapFormat for V8Format {
    fn node_name<'g>(&self, graph: &'g FlatGraph, node_index: usize) -> Cow<'g, str> {
        if graph.node_has_type(node_index, graph.layout().node_tags.cons_string) {
            return Cow::Owned(Self::cons_string_name(graph, node_index));
        }
        Cow::Borrowed(graph.node_raw_name(node_index))
    }

    fn class_name<'g>(&self, graph: &'g FlatGraph, node_index: usize) -> Cow<'g, str> {
        let layout = graph.layout();
        match layout.node_type_name(graph.node_type(node_index)) {
            "hidden" => Cow::Borrowed("(system)"),
            "object" | "native" => self.node_name(graph, node_index),
            "code" => Cow::Borrowed("(compiled code)"),
            other => Cow::Owned(format!("({})", other)),
        }
    }

    fn class_index(&self, graph: &FlatGraph, node_index: usize) -> i64 {
        let tags = &graph.layout().node_tags;
        let node_type = graph.node_type(node_index);
        if Some(node_type) == tags.object || Some(node_type) == tags.native {
            return graph.node_name_index(node_index) as i64;
        }
        -1 - node_type as i64
    }

    fn edge_has_string_name(&self, graph: &FlatGraph, edge_index: usize) -> bool {
        if !Self::is_shortcut(graph, edge_index) {
            return Self::has_raw_string_name(graph, edge_index);
        }
        leading_integer(&Self::raw_edge_name(graph, edge_index)).is_none()
    }

    fn edge_name(&self, graph: &FlatGraph, edge_index: usize) -> String {
        let name = Self::raw_edge_name(graph, edge_index);
        if !Self::is_shortcut(graph, edge_index) {
            return name;
        }
        match leading_integer(&name) {
            Some(number) => number.to_string(),
            None => name,
        }
    }

    fn is_user_root(&self, graph: &FlatGraph, node_index: usize) -> bool {
        !Self::is_synthetic(graph, node_index) || Self::is_document_dom_trees_root(graph, node_index)
    }

    /// Hidden edges of global objects that duplicate one of the global's
    /// shortcut names become invisible.
    fn mark_invisible_edges(&self, graph: &mut FlatGraph) {
        let invisible = Self::duplicated_global_edges(graph);
        let invisible_type = graph.layout().edge_tags.invisible;
        for edge_index in invisible {
            graph.set_edge_type(edge_index, invisible_type);
        }
    }

    /// Marks page-owned nodes: everything reachable from the root's
    /// shortcut edges and from the document DOM trees root, not following
    /// weak edges.
    fn calculate_flags(&self, graph: &FlatGraph) -> Option<NodeFlags> {
        use node_flags::*;

        let tags = &graph.layout().edge_tags;
        let mut flags = vec![0u32; graph.node_count()];
        let mut nodes_to_visit: Vec<usize> = Vec::new();

        for edge_index in graph.edge_indexes(graph.root_index()) {
            let node_index = graph.edge_to_node(edge_index);
            if graph.edge_has_type(edge_index, tags.element) {
                if !Self::is_document_dom_trees_root(graph, node_index) {
                    continue;
                }
            } else if !graph.edge_has_type(edge_index, tags.shortcut) {
                continue;
            }
            let ordinal = graph.ordinal(node_index);
            nodes_to_visit.push(ordinal);
            flags[ordinal] |= VISITED_MARKER;
        }
        if nodes_to_visit.is_empty() {
            return None;
        }

        let marker_and_flag = VISITED_MARKER | PAGE_OBJECT;
        while let Some(ordinal) = nodes_to_visit.pop() {
            flags[ordinal] |= PAGE_OBJECT;
            flags[ordinal] &= VISITED_MARKER_MASK;
            for edge_index in graph.edge_indexes(graph.node_index(ordinal)) {
                let child = graph.ordinal(graph.edge_to_node(edge_index));
                if flags[child] & marker_and_flag != 0 {
                    continue;
                }
                if graph.edge_has_type(edge_index, tags.weak) {
                    continue;
                }
                nodes_to_visit.push(child);
                flags[child] |= VISITED_MARKER;
            }
        }

        Some(NodeFlags {
            map: flags,
            flag: PAGE_OBJECT,
        })
    }

    fn containment_edge_filter(&self, graph: &FlatGraph, edge_index: usize, show_hidden: bool) -> bool {
        let tags = &graph.layout().edge_tags;
        if graph.edge_has_type(edge_index, Some(tags.invisible)) {
            return false;
        }
        if show_hidden {
            return true;
        }
        !graph.edge_has_type(edge_index, tags.hidden) && !Self::is_hidden(graph, graph.edge_to_node(edge_index))
    }

    fn retainer_edge_filter(
        &self,
        graph: &FlatGraph,
        retainer_index: usize,
        edge_index: usize,
        show_hidden: bool,
    ) -> bool {
        self.containment_edge_filter(graph, edge_index, show_hidden)
            && retainer_index != graph.root_index()
            && !graph.edge_has_type(edge_index, graph.layout().edge_tags.weak)
    }

    fn calculate_statistics(&self, graph: &FlatGraph, total_size: u64) -> Statistics {
        category_statistics(graph, total_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::builder::SnapshotBuilder;

    #[test]
    fn test_leading_integer() {
        assert_eq!(leading_integer("42"), Some(42));
        assert_eq!(leading_integer("12abc"), Some(12));
        assert_eq!(leading_integer("-3"), Some(-3));
        assert_eq!(leading_integer("window"), None);
        assert_eq!(leading_integer(""), None);
    }

    #[test]
    fn test_class_names() {
        let mut b = SnapshotBuilder::new();
        let root = b.node("synthetic", "", 1, 0);
        let obj = b.node("object", "Foo", 3, 8);
        let hidden = b.node("hidden", "system / Context", 5, 8);
        let code = b.node("code", "bar", 7, 8);
        let closure = b.node("closure", "baz", 9, 8);
        for (i, n) in [obj, hidden, code, closure].iter().enumerate() {
            b.edge(root, "element", &(i + 1).to_string(), *n);
        }
        let snapshot = b.build().unwrap();

        let class_of = |ordinal: usize| snapshot.node_at(ordinal).class_name();
        assert_eq!(class_of(obj), "Foo");
        assert_eq!(class_of(hidden), "(system)");
        assert_eq!(class_of(code), "(compiled code)");
        assert_eq!(class_of(closure), "(closure)");
        assert_eq!(snapshot.node_at(closure).class_index(), -1 - 5);
    }

    #[test]
    fn test_cons_string_name() {
        let mut b = SnapshotBuilder::new();
        let root = b.node("synthetic", "", 1, 0);
        let cons = b.node("concatenated string", "", 3, 8);
        let left = b.node("string", "foo", 5, 8);
        let inner = b.node("concatenated string", "", 7, 8);
        let mid = b.node("string", "bar", 9, 8);
        let right = b.node("string", "baz", 11, 8);
        b.edge(root, "element", "1", cons);
        b.edge(cons, "internal", "first", left);
        b.edge(cons, "internal", "second", inner);
        b.edge(inner, "internal", "second", right);
        b.edge(inner, "internal", "first", mid);
        let snapshot = b.build().unwrap();

        assert_eq!(snapshot.node_at(cons).name(), "foobarbaz");
    }

    #[test]
    fn test_numeric_shortcut_names() {
        let mut b = SnapshotBuilder::new();
        let root = b.node("synthetic", "", 1, 0);
        let a = b.node("object", "A", 3, 8);
        let c = b.node("object", "C", 5, 8);
        b.edge(root, "shortcut", "7", a);
        b.edge(root, "shortcut", "window", c);
        let snapshot = b.build().unwrap();

        let edges: Vec<_> = snapshot.root().edges().collect();
        assert_eq!(edges[0].name(), "7");
        assert!(!edges[0].has_string_name());
        assert_eq!(edges[1].name(), "window");
        assert!(edges[1].has_string_name());
    }

    #[test]
    fn test_global_hidden_duplicates_become_invisible() {
        let mut b = SnapshotBuilder::new();
        let root = b.node("synthetic", "", 1, 0);
        let global = b.node("object", "Window", 3, 8);
        let doc = b.node("object", "HTMLDocument", 5, 8);
        let cell = b.node("hidden", "system / PropertyCell", 7, 8);
        b.edge(root, "shortcut", "window", global);
        b.edge(global, "shortcut", "document", doc);
        b.edge(global, "property", "document", cell);
        b.edge(global, "property", "other", cell);
        let snapshot = b.build().unwrap();

        let types: Vec<String> = snapshot
            .node_at(global)
            .edges()
            .map(|e| e.edge_type().to_string())
            .collect();
        assert_eq!(types, vec!["shortcut", "invisible", "property"]);
    }

    #[test]
    fn test_page_flags_follow_strong_edges() {
        let mut b = SnapshotBuilder::new();
        let root = b.node("synthetic", "", 1, 0);
        let global = b.node("object", "Window", 3, 8);
        let owned = b.node("object", "Owned", 5, 8);
        let weakly = b.node("object", "Weak", 7, 8);
        let outside = b.node("object", "Outside", 9, 8);
        b.edge(root, "shortcut", "window", global);
        b.edge(root, "element", "1", outside);
        b.edge(global, "property", "a", owned);
        b.edge(global, "weak", "w", weakly);
        let snapshot = b.build().unwrap();

        let flags = snapshot.flags().unwrap();
        assert!(flags.has(global));
        assert!(flags.has(owned));
        assert!(!flags.has(weakly));
        assert!(!flags.has(outside));
        assert!(!flags.has(root));
    }
}
