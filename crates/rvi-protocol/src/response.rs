//! RPC response types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::RpcError;

/// RPC response envelope.
///
/// Every worker operation emits a single JSON response line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Protocol version (echoed from request, or 0 for probe).
    pub protocol_version: i32,
    /// Request ID echoed from the request.
    pub request_id: String,
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Success payload (present when ok=true).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Error details (present when ok=false).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(protocol_version: i32, request_id: String, payload: serde_json::Value) -> Self {
        Self {
            protocol_version,
            request_id,
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(protocol_version: i32, request_id: String, error: RpcError) -> Self {
        Self {
            protocol_version,
            request_id,
            ok: false,
            payload: None,
            error: Some(error),
        }
    }

    /// Turn the envelope into the typed payload or the worker's error.
    ///
    /// A response with `ok=true` but no decodable payload is reported as
    /// an INVALID_REQUEST error, since the worker broke the envelope contract.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, RpcError> {
        if !self.ok {
            return Err(self.error.unwrap_or_else(|| {
                RpcError::invalid_request("error response without error details")
            }));
        }

        let payload = self
            .payload
            .ok_or_else(|| RpcError::invalid_request("success response without payload"))?;
        serde_json::from_value(payload)
            .map_err(|e| RpcError::invalid_request(format!("undecodable response payload: {}", e)))
    }
}
