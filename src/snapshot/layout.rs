//! Field-offset resolution
//!
//! Resolves, once per snapshot, the position of every named field inside a
//! node or edge record and the numeric value of the well-known type tags.

use super::meta::SnapshotMeta;
use crate::error::{SnapshotError, SnapshotResult};

/// Synthetic edge type appended to the edge type list. It has no wire value.
pub const INVISIBLE_EDGE_TYPE: &str = "invisible";

/// Well-known node type values. A format may omit any of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeTypeTags {
    pub hidden: Option<u64>,
    pub object: Option<u64>,
    pub native: Option<u64>,
    pub synthetic: Option<u64>,
    pub code: Option<u64>,
    pub string: Option<u64>,
    pub cons_string: Option<u64>,
    pub sliced_string: Option<u64>,
}

/// Well-known edge type values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeTypeTags {
    pub element: Option<u32>,
    pub hidden: Option<u32>,
    pub internal: Option<u32>,
    pub shortcut: Option<u32>,
    pub weak: Option<u32>,
    pub invisible: u32,
}

/// Offsets and type tables of the node and edge records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub node_field_count: usize,
    pub node_type_offset: usize,
    pub node_name_offset: usize,
    pub node_id_offset: usize,
    pub node_self_size_offset: usize,
    pub node_edge_count_offset: usize,
    pub node_trace_node_id_offset: Option<usize>,
    pub node_types: Vec<String>,
    pub node_tags: NodeTypeTags,

    pub edge_field_count: usize,
    pub edge_type_offset: usize,
    pub edge_name_offset: usize,
    pub edge_to_node_offset: usize,
    pub edge_types: Vec<String>,
    pub edge_tags: EdgeTypeTags,
}

fn field_offset(fields: &[String], kind: &'static str, name: &'static str) -> SnapshotResult<usize> {
    fields
        .iter()
        .position(|field| field == name)
        .ok_or(SnapshotError::MissingField { kind, name })
}

fn type_index(types: &[String], name: &str) -> Option<usize> {
    types.iter().position(|t| t == name)
}

impl FieldLayout {
    pub fn resolve(meta: &SnapshotMeta) -> SnapshotResult<Self> {
        let fields = &meta.node_fields;
        let node_type_offset = field_offset(fields, "node", "type")?;
        let node_name_offset = field_offset(fields, "node", "name")?;
        let node_id_offset = field_offset(fields, "node", "id")?;
        let node_self_size_offset = field_offset(fields, "node", "self_size")?;
        let node_edge_count_offset = field_offset(fields, "node", "edge_count")?;
        let node_trace_node_id_offset = fields.iter().position(|f| f == "trace_node_id");

        let node_types = meta
            .node_types
            .get(node_type_offset)
            .and_then(|t| t.as_enum())
            .ok_or(SnapshotError::MissingType {
                kind: "node",
                name: "type",
            })?
            .to_vec();
        let node_tag = |name: &str| type_index(&node_types, name).map(|i| i as u64);
        let node_tags = NodeTypeTags {
            hidden: node_tag("hidden"),
            object: node_tag("object"),
            native: node_tag("native"),
            synthetic: node_tag("synthetic"),
            code: node_tag("code"),
            string: node_tag("string"),
            cons_string: node_tag("concatenated string"),
            sliced_string: node_tag("sliced string"),
        };

        let fields = &meta.edge_fields;
        let edge_type_offset = field_offset(fields, "edge", "type")?;
        let edge_name_offset = field_offset(fields, "edge", "name_or_index")?;
        let edge_to_node_offset = field_offset(fields, "edge", "to_node")?;

        let mut edge_types = meta
            .edge_types
            .get(edge_type_offset)
            .and_then(|t| t.as_enum())
            .ok_or(SnapshotError::MissingType {
                kind: "edge",
                name: "type",
            })?
            .to_vec();
        edge_types.push(INVISIBLE_EDGE_TYPE.to_string());
        let edge_tag = |name: &str| type_index(&edge_types, name).map(|i| i as u32);
        let edge_tags = EdgeTypeTags {
            element: edge_tag("element"),
            hidden: edge_tag("hidden"),
            internal: edge_tag("internal"),
            shortcut: edge_tag("shortcut"),
            weak: edge_tag("weak"),
            invisible: (edge_types.len() - 1) as u32,
        };

        Ok(Self {
            node_field_count: meta.node_fields.len(),
            node_type_offset,
            node_name_offset,
            node_id_offset,
            node_self_size_offset,
            node_edge_count_offset,
            node_trace_node_id_offset,
            node_types,
            node_tags,
            edge_field_count: meta.edge_fields.len(),
            edge_type_offset,
            edge_name_offset,
            edge_to_node_offset,
            edge_types,
            edge_tags,
        })
    }

    /// Name of node type `value`, or `"unknown"` for a value outside the list.
    pub fn node_type_name(&self, value: u64) -> &str {
        self.node_types
            .get(value as usize)
            .map(String::as_str)
            .unwrap_or("unknown")
    }

    pub fn edge_type_name(&self, value: u32) -> &str {
        self.edge_types
            .get(value as usize)
            .map(String::as_str)
            .unwrap_or("unknown")
    }
}
