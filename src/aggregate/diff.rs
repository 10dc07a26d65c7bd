//! Snapshot diffing
//!
//! Both sides are per-class member lists sorted by id. A single merge pass
//! splits them into removed (only in the baseline) and added (only in the
//! current snapshot) members.

use super::AggregateForDiff;
use serde::{Deserialize, Serialize};

/// Changes of one class between a baseline and the current snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diff {
    pub added_count: usize,
    pub removed_count: usize,
    pub added_size: u64,
    pub removed_size: u64,
    /// Offsets in the baseline snapshot
    pub deleted_indexes: Vec<usize>,
    /// Offsets in the current snapshot
    pub added_indexes: Vec<usize>,
    pub added_ids: Vec<u64>,
    pub removed_ids: Vec<u64>,
    pub count_delta: i64,
    pub size_delta: i64,
}

impl Diff {
    fn add(&mut self, current: &AggregateForDiff, j: usize) {
        self.added_count += 1;
        self.added_size += current.self_sizes[j];
        self.added_indexes.push(current.indexes[j]);
        self.added_ids.push(current.ids[j]);
    }

    fn remove(&mut self, base: &AggregateForDiff, i: usize) {
        self.removed_count += 1;
        self.removed_size += base.self_sizes[i];
        self.deleted_indexes.push(base.indexes[i]);
        self.removed_ids.push(base.ids[i]);
    }
}

/// Diff one class. `None` when the class is unchanged.
pub fn diff_for_class(base: &AggregateForDiff, current: Option<&AggregateForDiff>) -> Option<Diff> {
    let empty = AggregateForDiff::default();
    let current = current.unwrap_or(&empty);
    let mut diff = Diff::default();

    let (mut i, mut j) = (0, 0);
    while i < base.ids.len() && j < current.ids.len() {
        let (base_id, current_id) = (base.ids[i], current.ids[j]);
        if base_id < current_id {
            diff.remove(base, i);
            i += 1;
        } else if base_id > current_id {
            diff.add(current, j);
            j += 1;
        } else {
            i += 1;
            j += 1;
        }
    }
    for i in i..base.ids.len() {
        diff.remove(base, i);
    }
    for j in j..current.ids.len() {
        diff.add(current, j);
    }

    if diff.added_count == 0 && diff.removed_count == 0 {
        return None;
    }
    diff.count_delta = diff.added_count as i64 - diff.removed_count as i64;
    diff.size_delta = diff.added_size as i64 - diff.removed_size as i64;
    Some(diff)
}
