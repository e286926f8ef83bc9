//! RPC request types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::RpcError;

/// RPC request envelope.
///
/// Every worker operation accepts a single JSON request line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Protocol version. For probe requests, this MUST be 0.
    pub protocol_version: i32,
    /// Operation name.
    pub op: String,
    /// Caller-chosen request ID for correlation.
    pub request_id: String,
    /// Operation-specific payload.
    pub payload: serde_json::Value,
}

impl RpcRequest {
    /// Build a request from a typed payload.
    pub fn new<P: Serialize>(
        protocol_version: i32,
        op: &str,
        request_id: impl Into<String>,
        payload: &P,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            protocol_version,
            op: op.to_string(),
            request_id: request_id.into(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Decode the payload into an operation-specific request type.
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, RpcError> {
        T::deserialize(&self.payload).map_err(|e| {
            RpcError::invalid_request(format!("invalid {} payload: {}", self.op, e))
        })
    }
}
