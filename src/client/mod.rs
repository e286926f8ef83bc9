//! Integration client.
//!
//! Sends run, asm and probe requests to a worker and maps the responses onto
//! [`ClientError`]. One blocking call per request; no retries.

mod transport;

pub use transport::{Endpoint, TcpTransport, Transport, TransportError};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;

use rvi_protocol::ops::{names, AsmRequest, AsmResponse, ProbeRequest, ProbeResponse, RunResponse};
use rvi_protocol::{ErrorCode, RpcError, RpcRequest, PROTOCOL_MAX, PROTOCOL_VERSION_PROBE};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::request::{IntegrationRequest, IntegrationResult};

/// Worker capabilities as reported by `probe`.
pub type Capabilities = ProbeResponse;

/// Client for one worker endpoint.
pub struct IntegrationClient {
    transport: Arc<dyn Transport>,
    request_counter: AtomicU64,
}

impl IntegrationClient {
    /// Create a client over an arbitrary transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            request_counter: AtomicU64::new(0),
        }
    }

    /// Create a TCP client for the configured endpoint.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(Arc::new(config.transport()))
    }

    /// Run a pipeline remotely.
    ///
    /// A pipeline that ran but failed is an error
    /// ([`ClientError::RemoteExecutionFailed`]) carrying the full result.
    pub fn run(&self, request: &IntegrationRequest) -> Result<IntegrationResult, ClientError> {
        tracing::info!(
            files = request.snapshot().len(),
            operations = request.operations().len(),
            modified_only = request.modified_only(),
            "submitting run"
        );

        let response: RunResponse = self.call(names::RUN, PROTOCOL_MAX, &request.to_run_request())?;
        let result = IntegrationResult::from(response);

        if !result.succeeded {
            let diagnostics = result
                .diagnostics
                .clone()
                .unwrap_or_else(|| "pipeline failed without diagnostics".to_string());
            tracing::warn!(%diagnostics, "remote pipeline failed");
            return Err(ClientError::RemoteExecutionFailed {
                diagnostics,
                result: Box::new(result),
            });
        }

        tracing::info!(files = result.result_snapshot.len(), "run succeeded");
        Ok(result)
    }

    /// Assemble RV32I source remotely.
    pub fn asm(&self, source: &str) -> Result<Vec<u32>, ClientError> {
        let request = AsmRequest {
            source: source.to_string(),
        };
        let response: AsmResponse = self.call(names::ASM, PROTOCOL_MAX, &request)?;
        Ok(response.words)
    }

    /// Ask the worker what it supports.
    pub fn probe(&self) -> Result<Capabilities, ClientError> {
        self.call(names::PROBE, PROTOCOL_VERSION_PROBE, &ProbeRequest::default())
    }

    fn call<P, T>(&self, op: &str, protocol_version: i32, payload: &P) -> Result<T, ClientError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let request_id = self.next_request_id();
        let request = RpcRequest::new(protocol_version, op, request_id.clone(), payload)
            .map_err(|e| ClientError::Protocol(format!("failed to encode {} request: {}", op, e)))?;

        let response = self.transport.execute(&request).map_err(|e| {
            if e.is_unreachable() {
                ClientError::EndpointUnreachable {
                    endpoint: self.transport.describe(),
                    source: e,
                }
            } else {
                ClientError::Protocol(e.to_string())
            }
        })?;

        if response.request_id != request_id {
            return Err(ClientError::Protocol(format!(
                "response for request '{}' does not match '{}'",
                response.request_id, request_id
            )));
        }

        if !response.ok {
            let error = response
                .error
                .unwrap_or_else(|| RpcError::invalid_request("error response without details"));
            return Err(map_rpc_error(error));
        }

        let payload = response
            .payload
            .ok_or_else(|| ClientError::Protocol(format!("{} response without payload", op)))?;
        serde_json::from_value(payload)
            .map_err(|e| ClientError::Protocol(format!("undecodable {} response: {}", op, e)))
    }

    /// Generate a unique request ID.
    fn next_request_id(&self) -> String {
        let counter = self.request_counter.fetch_add(1, Ordering::SeqCst);
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        format!("req-{:x}-{:08x}", timestamp, counter)
    }
}

fn map_rpc_error(error: RpcError) -> ClientError {
    match error.code {
        ErrorCode::MalformedAssembly => ClientError::MalformedAssembly {
            line: error.data_u64("line").unwrap_or(0) as usize,
            message: error
                .data_str("message")
                .map(str::to_string)
                .unwrap_or_else(|| error.message.clone()),
        },
        code => ClientError::Rejected {
            code,
            message: error.message,
        },
    }
}
