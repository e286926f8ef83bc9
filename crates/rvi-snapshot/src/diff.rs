//! Content diff between two snapshots.
//!
//! Only additions and modifications are reported. A path present in the
//! "before" snapshot but missing from "after" is not a change here.

use std::fmt;

use crate::entry::FileEntry;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    /// Path exists only in the "after" snapshot.
    Added,
    /// Path exists in both, content bytes differ.
    Modified,
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
        }
    }
}

/// A single changed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: String,
    pub status: ChangeStatus,
}

/// Entries of `after` that are new or whose content differs from `before`.
///
/// Comparison is on content bytes only. The result keeps `after`'s order.
pub fn modified(before: &Snapshot, after: &Snapshot) -> Snapshot {
    let mut result = after.clone();
    result.retain(|entry| status_of(before, entry).is_some());
    result
}

/// Like [`modified`], but reports each path with its change status.
pub fn changes(before: &Snapshot, after: &Snapshot) -> Vec<Change> {
    after
        .iter()
        .filter_map(|entry| {
            status_of(before, entry).map(|status| Change {
                path: entry.path().to_string(),
                status,
            })
        })
        .collect()
}

fn status_of(before: &Snapshot, entry: &FileEntry) -> Option<ChangeStatus> {
    match before.get(entry.path()) {
        None => Some(ChangeStatus::Added),
        Some(old) if old.bytes() != entry.bytes() => Some(ChangeStatus::Modified),
        Some(_) => None,
    }
}
