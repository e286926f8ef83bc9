//! Probe operation types.

use serde::{Deserialize, Serialize};

use crate::Interpreter;

/// Probe request payload (empty).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeRequest {}

/// Probe response payload: what this worker speaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResponse {
    pub protocol_min: i32,
    pub protocol_max: i32,
    pub lane_version: String,
    /// Operation names the worker dispatches.
    pub operations: Vec<String>,
    /// Shells available for `shell_invocation`.
    pub interpreters: Vec<Interpreter>,
    /// Upper bound on a single request line, in bytes.
    pub max_request_bytes: u64,
}
