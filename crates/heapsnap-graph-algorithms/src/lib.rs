pub mod common;
pub mod transpose;
pub mod traversal;
pub mod dominators;
pub mod ordering;

pub use common::{DominanceGraph, NO_DISTANCE};
pub use transpose::{build_retainer_index, RetainerIndex};
pub use traversal::{bfs_distances, post_order, PostOrder};
pub use dominators::{
    dominated_nodes, dominator_tree, retained_sizes, DominatedNodes, RootPlacementError,
};
pub use ordering::sort_range;
