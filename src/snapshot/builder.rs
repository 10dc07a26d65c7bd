//! Programmatic snapshot construction
//!
//! Produces a [`RawHeapSnapshot`] in the V8 record layout from a list of
//! nodes and edges. Used by tests and benchmarks.

use super::meta::{FieldType, RawHeapSnapshot, SnapshotHeader, SnapshotMeta};
use super::HeapSnapshot;
use crate::config::AnalysisConfig;
use crate::error::{SnapshotError, SnapshotResult};
use rustc_hash::FxHashMap;

pub const V8_NODE_FIELDS: [&str; 6] = ["type", "name", "id", "self_size", "edge_count", "trace_node_id"];

pub const V8_NODE_TYPES: [&str; 12] = [
    "hidden",
    "array",
    "string",
    "object",
    "code",
    "closure",
    "regexp",
    "number",
    "native",
    "synthetic",
    "concatenated string",
    "sliced string",
];

pub const V8_EDGE_FIELDS: [&str; 3] = ["type", "name_or_index", "to_node"];

pub const V8_EDGE_TYPES: [&str; 7] = [
    "context", "element", "property", "internal", "hidden", "shortcut", "weak",
];

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Record layout descriptor of the V8 format
pub fn v8_meta() -> SnapshotMeta {
    let mut node_types = vec![FieldType::Enum(to_strings(&V8_NODE_TYPES))];
    node_types.extend(
        ["string", "number", "number", "number", "number"]
            .iter()
            .map(|s| FieldType::Scalar(s.to_string())),
    );
    let edge_types = vec![
        FieldType::Enum(to_strings(&V8_EDGE_TYPES)),
        FieldType::Scalar("string_or_number".to_string()),
        FieldType::Scalar("node".to_string()),
    ];
    SnapshotMeta {
        node_fields: to_strings(&V8_NODE_FIELDS),
        node_types,
        edge_fields: to_strings(&V8_EDGE_FIELDS),
        edge_types,
        ..Default::default()
    }
}

struct PendingNode {
    node_type: u64,
    name: u64,
    id: u64,
    self_size: u64,
    trace_node_id: u64,
}

struct PendingEdge {
    from: usize,
    edge_type: u32,
    name_or_index: u32,
    to: usize,
}

/// Builds a snapshot node by node. Node handles are ordinals.
#[derive(Default)]
pub struct SnapshotBuilder {
    strings: Vec<String>,
    string_ids: FxHashMap<String, u64>,
    nodes: Vec<PendingNode>,
    edges: Vec<PendingEdge>,
    root: Option<usize>,
    trace_function_count: Option<usize>,
    /// First bad input; reported by `build_raw`.
    invalid: Option<InvalidInput>,
}

#[derive(Debug, Clone)]
enum InvalidInput {
    Type { kind: &'static str, name: String },
    EdgeName { edge_type: String, name: String },
}

impl From<InvalidInput> for SnapshotError {
    fn from(input: InvalidInput) -> Self {
        match input {
            InvalidInput::Type { kind, name } => SnapshotError::UnknownType { kind, name },
            InvalidInput::EdgeName { edge_type, name } => {
                SnapshotError::NonNumericEdgeName { edge_type, name }
            }
        }
    }
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        let mut builder = Self::default();
        builder.intern("");
        builder
    }

    fn intern(&mut self, value: &str) -> u64 {
        if let Some(&index) = self.string_ids.get(value) {
            return index;
        }
        let index = self.strings.len() as u64;
        self.strings.push(value.to_string());
        self.string_ids.insert(value.to_string(), index);
        index
    }

    fn reject(&mut self, input: InvalidInput) {
        self.invalid.get_or_insert(input);
    }

    fn type_value(&mut self, types: &[&str], kind: &'static str, name: &str) -> usize {
        match types.iter().position(|t| *t == name) {
            Some(value) => value,
            None => {
                self.reject(InvalidInput::Type {
                    kind,
                    name: name.to_string(),
                });
                0
            }
        }
    }

    pub fn node(&mut self, node_type: &str, name: &str, id: u64, self_size: u64) -> usize {
        self.node_traced(node_type, name, id, self_size, 0)
    }

    /// Add a node. An unknown `node_type` makes the build fail.
    pub fn node_traced(
        &mut self,
        node_type: &str,
        name: &str,
        id: u64,
        self_size: u64,
        trace_node_id: u64,
    ) -> usize {
        let node_type = self.type_value(&V8_NODE_TYPES, "node", node_type) as u64;
        let name = self.intern(name);
        self.nodes.push(PendingNode {
            node_type,
            name,
            id,
            self_size,
            trace_node_id,
        });
        self.nodes.len() - 1
    }

    /// Add an edge. Element and hidden edges take a numeric `name`.
    pub fn edge(&mut self, from: usize, edge_type: &str, name: &str, to: usize) {
        let type_value = self.type_value(&V8_EDGE_TYPES, "edge", edge_type) as u32;
        let name_or_index = match edge_type {
            "element" | "hidden" => name.parse().unwrap_or_else(|_| {
                self.reject(InvalidInput::EdgeName {
                    edge_type: edge_type.to_string(),
                    name: name.to_string(),
                });
                0
            }),
            _ => self.intern(name) as u32,
        };
        self.edges.push(PendingEdge {
            from,
            edge_type: type_value,
            name_or_index,
            to,
        });
    }

    /// Use `node` as the root instead of the first node.
    pub fn root(&mut self, node: usize) -> &mut Self {
        self.root = Some(node);
        self
    }

    pub fn trace_function_count(&mut self, count: usize) -> &mut Self {
        self.trace_function_count = Some(count);
        self
    }

    pub fn build_raw(&self) -> SnapshotResult<RawHeapSnapshot> {
        if let Some(input) = &self.invalid {
            return Err(input.clone().into());
        }
        let node_width = V8_NODE_FIELDS.len();
        let mut edge_counts = vec![0u64; self.nodes.len()];
        let mut ordered: Vec<&PendingEdge> = self.edges.iter().collect();
        ordered.sort_by_key(|edge| edge.from);
        for edge in &ordered {
            edge_counts[edge.from] += 1;
        }

        let mut nodes = Vec::with_capacity(self.nodes.len() * node_width);
        for (node, edge_count) in self.nodes.iter().zip(&edge_counts) {
            nodes.extend_from_slice(&[
                node.node_type,
                node.name,
                node.id,
                node.self_size,
                *edge_count,
                node.trace_node_id,
            ]);
        }
        let mut edges = Vec::with_capacity(ordered.len() * V8_EDGE_FIELDS.len());
        for edge in ordered {
            edges.extend_from_slice(&[
                edge.edge_type,
                edge.name_or_index,
                (edge.to * node_width) as u32,
            ]);
        }

        Ok(RawHeapSnapshot {
            snapshot: SnapshotHeader {
                title: String::new(),
                meta: v8_meta(),
                node_count: self.nodes.len(),
                edge_count: self.edges.len(),
                root_index: self.root.map(|ordinal| ordinal * node_width),
                trace_function_count: self.trace_function_count,
            },
            nodes,
            edges,
            strings: self.strings.clone(),
        })
    }

    pub fn build(&self) -> SnapshotResult<HeapSnapshot> {
        HeapSnapshot::load(self.build_raw()?)
    }

    pub fn build_with_config(&self, config: AnalysisConfig) -> SnapshotResult<HeapSnapshot> {
        HeapSnapshot::load_with_config(self.build_raw()?, config)
    }
}
