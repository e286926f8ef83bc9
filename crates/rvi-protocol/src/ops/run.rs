//! Run operation types.
//!
//! A run ships a snapshot plus an ordered operation list; the worker restores
//! the snapshot into a fresh sandbox, executes the pipeline and returns the
//! after-state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rvi_classifier::ClassificationTable;
use rvi_snapshot::Snapshot;

use crate::Operation;

/// Run request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    /// `(extension, encoding)` pairs used to capture the after-state.
    pub extensions: ClassificationTable,
    /// Files restored into the sandbox before the first operation.
    pub snapshot: Snapshot,
    /// Pipeline, executed in order.
    pub operations: Vec<Operation>,
    /// Return only files added or modified relative to `snapshot`.
    #[serde(default)]
    pub modified_only: bool,
}

/// Run response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResponse {
    /// Whether every operation completed with exit status 0.
    pub succeeded: bool,
    /// Sandbox state after the pipeline (or at the point of failure).
    pub snapshot: Snapshot,
    /// Failure description naming the failing operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
    /// One report per requested operation, in order.
    #[serde(default)]
    pub reports: Vec<OperationReport>,
}

/// Outcome of one pipeline operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Succeeded,
    Failed,
    TimedOut,
    /// Not run because an earlier operation failed.
    Skipped,
}

/// Per-operation execution record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationReport {
    /// 0-based position in the pipeline.
    pub index: usize,
    pub operation: Operation,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl OperationReport {
    /// Report for an operation that never ran.
    pub fn skipped(index: usize, operation: Operation) -> Self {
        Self {
            index,
            operation,
            status: OperationStatus::Skipped,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            started_at: None,
            duration_ms: 0,
        }
    }
}
