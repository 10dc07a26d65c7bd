//! Analysis configuration and progress reporting

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Options applied while building and querying a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Show hidden edges and hidden nodes in edge and retainer views
    pub show_hidden_data: bool,
    /// Longest retainer chain dumped for an unreachable node
    pub max_retainer_chain: usize,
    /// Root node index override; takes precedence over `snapshot.root_index`
    pub root_index: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            show_hidden_data: false,
            max_retainer_chain: 32,
            root_index: None,
        }
    }
}

/// Receives a status line as each load stage starts
pub trait ProgressReporter {
    fn update_status(&self, status: &str);
}

/// Forwards status lines to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn update_status(&self, status: &str) {
        debug!("{}", status);
    }
}
