//! Client error types and their CLI exit codes.

use rvi_classifier::ClassifyError;
use rvi_protocol::ErrorCode;
use rvi_snapshot::SnapshotError;

use crate::client::TransportError;
use crate::config::ConfigError;
use crate::request::IntegrationResult;

/// Failure kind for exit code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Bad local input: configuration, request building, file capture.
    Usage = 2,
    /// Worker could not be reached (exit code 20).
    Unreachable = 20,
    /// Worker answered with something this client cannot use (exit code 21).
    Protocol = 21,
    /// Worker refused the request (exit code 30).
    Rejected = 30,
    /// A pipeline operation failed remotely (exit code 40).
    Execution = 40,
    /// Assembly source did not assemble (exit code 41).
    Assembly = 41,
}

/// Errors returned by [`IntegrationClient`](crate::IntegrationClient) and
/// [`RequestBuilder`](crate::RequestBuilder).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("endpoint {endpoint} unreachable: {source}")]
    EndpointUnreachable {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    #[error("remote execution failed: {diagnostics}")]
    RemoteExecutionFailed {
        diagnostics: String,
        result: Box<IntegrationResult>,
    },

    #[error("malformed assembly at line {line}: {message}")]
    MalformedAssembly { line: usize, message: String },

    #[error("worker rejected request: {code}: {message}")]
    Rejected { code: ErrorCode, message: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::EndpointUnreachable { .. } => FailureKind::Unreachable,
            Self::RemoteExecutionFailed { .. } => FailureKind::Execution,
            Self::MalformedAssembly { .. } => FailureKind::Assembly,
            Self::Rejected { .. } => FailureKind::Rejected,
            Self::Protocol(_) => FailureKind::Protocol,
            Self::InvalidRequest(_) | Self::Snapshot(_) | Self::Classify(_) | Self::Config(_) => {
                FailureKind::Usage
            }
        }
    }

    /// Get exit code for this error.
    pub fn exit_code(&self) -> i32 {
        self.failure_kind() as i32
    }

    /// The full result of a failed run, when the pipeline got that far.
    pub fn result(&self) -> Option<&IntegrationResult> {
        match self {
            Self::RemoteExecutionFailed { result, .. } => Some(result),
            _ => None,
        }
    }
}
