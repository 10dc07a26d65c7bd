//! Error types
//!
//! Construction errors are fatal: a snapshot that fails any structural check
//! is never exposed. Query errors are local to the call that produced them.

use thiserror::Error;

/// Errors raised while loading and analyzing a snapshot
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("required {kind} field `{name}` is missing from snapshot meta")]
    MissingField { kind: &'static str, name: &'static str },

    #[error("{kind} type list has no `{name}` entry")]
    MissingType { kind: &'static str, name: &'static str },

    #[error("invalid to_node offset {to_node} in edge at {edge_index}")]
    MisalignedTargetOffset { edge_index: usize, to_node: u64 },

    #[error("to_node offset {to_node} in edge at {edge_index} is past the last node")]
    TargetOutOfRange { edge_index: usize, to_node: u64 },

    #[error("{kind} array length {len} is not a multiple of record width {width}")]
    InvalidLength { kind: &'static str, len: usize, width: usize },

    #[error("declared edge counts add up to {declared}, edge array holds {actual}")]
    EdgeCountMismatch { declared: usize, actual: usize },

    #[error("root node ordinal {root_ordinal} is expected to be either first or last of {node_count} nodes")]
    RootNotAtBoundary { root_ordinal: usize, node_count: usize },

    #[error("root index {0} does not address a node record")]
    InvalidRootIndex(usize),

    #[error("snapshot contains no nodes")]
    EmptySnapshot,

    #[error("unknown {kind} type `{name}`")]
    UnknownType { kind: &'static str, name: String },

    #[error("{edge_type} edge needs a numeric name, got `{name}`")]
    NonNumericEdgeName { edge_type: String, name: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

impl From<heapsnap_graph_algorithms::RootPlacementError> for SnapshotError {
    fn from(err: heapsnap_graph_algorithms::RootPlacementError) -> Self {
        SnapshotError::RootNotAtBoundary {
            root_ordinal: err.root_ordinal,
            node_count: err.node_count,
        }
    }
}

/// Errors raised by queries against a loaded snapshot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("start position > end position: {begin} > {end}")]
    InvalidRange { begin: usize, end: usize },

    #[error("no class named `{0}`")]
    NoSuchClass(String),

    #[error("no diff computed against baseline `{0}`")]
    UnknownBaseline(String),
}

pub type QueryResult<T> = Result<T, QueryError>;
