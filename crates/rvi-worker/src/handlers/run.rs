//! Run operation handler.
//!
//! Restores the request snapshot into a fresh sandbox, runs the pipeline and
//! captures the sandbox with the request's classification table. The
//! response snapshot holds either everything captured or, with
//! `modified_only`, just the files added or changed by the pipeline.
//! Changes are measured against a capture taken right after restore, so
//! restore-side rewriting (CRLF to LF) never counts as a change.

use rvi_protocol::{
    ops::{RunRequest, RunResponse},
    RpcError, RpcRequest,
};
use rvi_snapshot::{capture, modified, restore};

use crate::config::WorkerConfig;
use crate::pipeline::Pipeline;
use crate::sandbox::Sandbox;

/// Handle the run operation.
pub fn handle(request: &RpcRequest, config: &WorkerConfig) -> Result<serde_json::Value, RpcError> {
    let req: RunRequest = request.parse_payload()?;

    let sandbox = Sandbox::create(&config.work_root, &request.request_id, config.keep_sandboxes)
        .map_err(|e| RpcError::sandbox_failed(e.to_string()))?;
    tracing::info!(
        sandbox = %sandbox.root().display(),
        files = req.snapshot.len(),
        operations = req.operations.len(),
        "starting run"
    );

    restore(sandbox.root(), &req.snapshot)
        .map_err(|e| RpcError::sandbox_failed(format!("failed to restore snapshot: {}", e)))?;
    let baseline = if req.modified_only {
        Some(capture(sandbox.root(), &req.extensions).map_err(capture_failed)?)
    } else {
        None
    };

    let outcome = Pipeline::new(sandbox.root(), config.operation_timeout()).execute(&req.operations);

    let after = capture(sandbox.root(), &req.extensions).map_err(capture_failed)?;
    let snapshot = match baseline {
        Some(baseline) => modified(&baseline, &after),
        None => after,
    };

    for entry in &snapshot {
        tracing::debug!(path = entry.path(), sha256 = %entry.sha256(), "returning file");
    }
    tracing::info!(
        succeeded = outcome.succeeded,
        returned = snapshot.len(),
        digest = %snapshot.digest(),
        "run finished"
    );

    super::to_payload(&RunResponse {
        succeeded: outcome.succeeded,
        snapshot,
        diagnostics: outcome.diagnostics,
        reports: outcome.reports,
    })
}

fn capture_failed(e: rvi_snapshot::SnapshotError) -> RpcError {
    RpcError::sandbox_failed(format!("failed to capture sandbox: {}", e))
}
