//! Heap snapshot analysis engine
//!
//! Loads a heap profile (flat node and edge arrays plus a string table) and
//! derives everything a memory inspector needs to explain it: distances from
//! the roots, the dominator tree, retained sizes, per-class aggregates,
//! snapshot diffs and sortable paginated views over edges, retainers and
//! nodes.
//!
//! # Architecture
//!
//! - `heapsnap-graph-algorithms`: format-agnostic passes over node ordinals
//!   (retainer transposition, BFS, post-order, dominators, partial sort)
//! - [`snapshot`]: raw record storage, field layout, cursors, the
//!   [`HeapFormat`] capability trait with its [`V8Format`] implementation,
//!   and [`HeapSnapshot`], which runs the pipeline and answers queries
//! - [`aggregate`]: class aggregation and diffing, cached per snapshot
//! - [`provider`]: filtered, incrementally sorted item providers
//! - [`stats`]: size-by-category statistics
//!
//! ## Example Usage
//!
//! ```rust
//! use heapsnap::snapshot::builder::SnapshotBuilder;
//! use heapsnap::NodeFilter;
//!
//! let mut b = SnapshotBuilder::new();
//! let root = b.node("synthetic", "", 1, 0);
//! let a = b.node("object", "A", 3, 10);
//! let c = b.node("object", "C", 5, 10);
//! b.edge(root, "element", "1", a);
//! b.edge(a, "property", "c", c);
//!
//! let snapshot = b.build().unwrap();
//! assert_eq!(snapshot.total_size(), 20);
//! assert_eq!(snapshot.dominator_ids_for_node(5), Some(vec![5, 3]));
//!
//! let aggregates = snapshot.aggregates_with_filter(&NodeFilter::default());
//! assert_eq!(aggregates["A"].max_ret, 20);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod config;
pub mod error;
pub mod provider;
pub mod snapshot;
pub mod stats;

// Re-export main types for convenience
pub use aggregate::{Aggregate, AggregateForDiff, AggregateKey, Diff, NodeFilter};

pub use config::{AnalysisConfig, ProgressReporter, TracingProgress};

pub use error::{QueryError, QueryResult, SnapshotError, SnapshotResult};

pub use provider::{
    ComparatorConfig, EdgesProvider, ItemProvider, ItemsRange, NodesProvider, ProviderDomain,
    RetainersProvider, SortField,
};

pub use snapshot::{
    EdgeRef, FlatGraph, HeapFormat, HeapSnapshot, NodeFlags, NodeRef, RawHeapSnapshot,
    RetainerRef, SerializedEdge, SerializedNode, StaticData, V8Format,
};

pub use stats::{LiveObjectStats, Statistics};
