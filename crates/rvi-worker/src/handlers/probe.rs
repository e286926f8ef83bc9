//! Probe operation handler.

use rvi_protocol::{
    ops::{names, ProbeResponse},
    Interpreter, RpcError, LANE_VERSION,
};

use crate::config::WorkerConfig;

/// Handle the probe operation.
pub fn handle(config: &WorkerConfig) -> Result<serde_json::Value, RpcError> {
    let response = ProbeResponse {
        protocol_min: config.protocol_min,
        protocol_max: config.protocol_max,
        lane_version: LANE_VERSION.to_string(),
        operations: names::ALL.iter().map(|op| op.to_string()).collect(),
        interpreters: vec![Interpreter::Posix, Interpreter::Native],
        max_request_bytes: config.max_request_bytes,
    };
    super::to_payload(&response)
}
