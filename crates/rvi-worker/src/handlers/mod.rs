//! Operation handlers for the worker RPC.
//!
//! Each handler decodes its payload, does the work and returns the
//! serialized response payload or an [`RpcError`](rvi_protocol::RpcError).

pub mod asm;
pub mod probe;
pub mod run;

use rvi_protocol::RpcError;
use serde::Serialize;

fn to_payload<T: Serialize>(response: &T) -> Result<serde_json::Value, RpcError> {
    serde_json::to_value(response)
        .map_err(|e| RpcError::invalid_request(format!("failed to serialize response: {}", e)))
}
