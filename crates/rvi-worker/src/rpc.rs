//! Worker RPC handler.
//!
//! Reads a single JSON request line, dispatches to the matching operation
//! handler and writes a single JSON response line. Used both by the TCP
//! server (one request per connection) and by `rvi-worker rpc` on
//! stdin/stdout.

use std::io::{self, BufRead, Read, Write};

use rvi_protocol::{
    ops::names, RpcError, RpcRequest, RpcResponse, PROTOCOL_VERSION_PROBE,
};

use crate::config::WorkerConfig;
use crate::handlers;

/// Main RPC handler for the worker.
#[derive(Debug, Clone)]
pub struct RpcHandler {
    config: WorkerConfig,
}

impl RpcHandler {
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run the RPC handler, reading from stdin and writing to stdout.
    pub fn run(&self) -> io::Result<()> {
        self.run_with_io(&mut io::stdin().lock(), &mut io::stdout().lock())
    }

    /// Run the RPC handler with custom I/O.
    pub fn run_with_io<R: BufRead, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
    ) -> io::Result<()> {
        let request = match self.read_request(reader) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(error = %e, "rejecting unreadable request");
                let response = RpcResponse::error(PROTOCOL_VERSION_PROBE, String::new(), e);
                return self.write_response(writer, &response);
            }
        };

        if let Err(e) = self.validate_protocol_version(&request) {
            tracing::warn!(request_id = %request.request_id, error = %e, "protocol mismatch");
            let response =
                RpcResponse::error(request.protocol_version, request.request_id.clone(), e);
            return self.write_response(writer, &response);
        }

        let response = self.dispatch(&request);
        self.write_response(writer, &response)
    }

    fn read_request<R: BufRead>(&self, reader: &mut R) -> Result<RpcRequest, RpcError> {
        let max = self.config.max_request_bytes;
        let mut raw = Vec::new();
        reader
            .take(max.saturating_add(1))
            .read_until(b'\n', &mut raw)
            .map_err(|e| RpcError::invalid_request(format!("failed to read request: {}", e)))?;

        if raw.len() as u64 > max {
            return Err(RpcError::payload_too_large(raw.len() as u64, max));
        }
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(RpcError::invalid_request("empty request"));
        }

        serde_json::from_slice(&raw)
            .map_err(|e| RpcError::invalid_request(format!("invalid JSON: {}", e)))
    }

    fn validate_protocol_version(&self, request: &RpcRequest) -> Result<(), RpcError> {
        // probe is the only operation allowed (and required) to use version 0
        if request.op == names::PROBE {
            if request.protocol_version != PROTOCOL_VERSION_PROBE {
                return Err(RpcError::unsupported_protocol(
                    request.protocol_version,
                    PROTOCOL_VERSION_PROBE,
                    PROTOCOL_VERSION_PROBE,
                ));
            }
            return Ok(());
        }

        if request.protocol_version < self.config.protocol_min
            || request.protocol_version > self.config.protocol_max
        {
            return Err(RpcError::unsupported_protocol(
                request.protocol_version,
                self.config.protocol_min,
                self.config.protocol_max,
            ));
        }

        Ok(())
    }

    fn dispatch(&self, request: &RpcRequest) -> RpcResponse {
        tracing::info!(op = %request.op, request_id = %request.request_id, "dispatching request");

        let result = match request.op.as_str() {
            names::PROBE => handlers::probe::handle(&self.config),
            names::RUN => handlers::run::handle(request, &self.config),
            names::ASM => handlers::asm::handle(request),
            _ => Err(RpcError::unknown_operation(&request.op)),
        };

        match result {
            Ok(payload) => {
                RpcResponse::success(request.protocol_version, request.request_id.clone(), payload)
            }
            Err(e) => {
                tracing::warn!(op = %request.op, request_id = %request.request_id, error = %e, "request failed");
                RpcResponse::error(request.protocol_version, request.request_id.clone(), e)
            }
        }
    }

    fn write_response<W: Write>(&self, writer: &mut W, response: &RpcResponse) -> io::Result<()> {
        let json = serde_json::to_string(response)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{}", json)?;
        writer.flush()
    }
}
