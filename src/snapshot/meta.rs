//! Raw heap profile model
//!
//! Mirrors the JSON document written by the heap profiler: a header with the
//! record layout, followed by the flat `nodes`, `edges` and `strings` arrays.

use crate::error::SnapshotResult;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Type descriptor of one record field.
///
/// Enumerated fields list their value names; other fields carry a scalar type
/// name such as `"string"` or `"number"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldType {
    Enum(Vec<String>),
    Scalar(String),
}

impl FieldType {
    pub fn as_enum(&self) -> Option<&[String]> {
        match self {
            FieldType::Enum(names) => Some(names),
            FieldType::Scalar(_) => None,
        }
    }
}

/// Record layout descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub node_fields: Vec<String>,
    pub node_types: Vec<FieldType>,
    pub edge_fields: Vec<String>,
    pub edge_types: Vec<FieldType>,
    #[serde(default)]
    pub trace_function_info_fields: Vec<String>,
    #[serde(default)]
    pub trace_node_fields: Vec<String>,
    #[serde(default)]
    pub type_strings: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    #[serde(default)]
    pub title: String,
    pub meta: SnapshotMeta,
    #[serde(default)]
    pub node_count: usize,
    #[serde(default)]
    pub edge_count: usize,
    /// Root node index (record offset, not ordinal)
    #[serde(default)]
    pub root_index: Option<usize>,
    #[serde(default)]
    pub trace_function_count: Option<usize>,
}

/// A heap profile as produced by the profiler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHeapSnapshot {
    pub snapshot: SnapshotHeader,
    pub nodes: Vec<u64>,
    pub edges: Vec<u32>,
    pub strings: Vec<String>,
}

impl RawHeapSnapshot {
    pub fn from_json_str(json: &str) -> SnapshotResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> SnapshotResult<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}
