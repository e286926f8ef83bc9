//! File snapshots for the RISC-V integration lane.
//!
//! A [`Snapshot`] is a path-keyed, ordered set of classified files. The host
//! captures one from a local directory, the worker restores it into a sandbox,
//! runs the pipeline, captures the after-state and (optionally) reduces it to
//! the files that changed with [`modified`].

mod bridge;
mod diff;
mod entry;
mod error;
mod snapshot;

pub use bridge::{capture, capture_files, restore};
pub use diff::{changes, modified, Change, ChangeStatus};
pub use entry::FileEntry;
pub use error::SnapshotError;
pub use snapshot::Snapshot;

pub use rvi_classifier::{ClassificationTable, FileEncoding};
