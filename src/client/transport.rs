//! Transport layer for the integration client.
//!
//! - [`Transport`]: one request in, one response out
//! - [`TcpTransport`]: line-delimited JSON over a fresh TCP connection per call

use std::fmt;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rvi_protocol::{RpcRequest, RpcResponse};

/// Where the worker listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 15000,
        }
    }
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Transport trait for RPC communication.
pub trait Transport: Send + Sync {
    /// Execute an RPC request and return the response.
    fn execute(&self, request: &RpcRequest) -> Result<RpcResponse, TransportError>;

    /// Human-readable description of the remote side, for errors and logs.
    fn describe(&self) -> String;
}

/// Transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Whether the failure means the worker could not be reached at all (as
    /// opposed to answering with something unusable).
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::ConnectionFailed(_) | Self::ConnectionTimeout => true,
            Self::Io(e) => !matches!(e.kind(), io::ErrorKind::InvalidData),
            Self::Serialization(_) | Self::Protocol(_) => false,
        }
    }
}

/// TCP transport: connects, writes one request line, reads one response line.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    endpoint: Endpoint,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl TcpTransport {
    pub fn new(endpoint: Endpoint, connect_timeout: Duration, io_timeout: Duration) -> Self {
        Self {
            endpoint,
            connect_timeout,
            io_timeout,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn connect(&self) -> Result<TcpStream, TransportError> {
        let addrs = (self.endpoint.host.as_str(), self.endpoint.port)
            .to_socket_addrs()
            .map_err(|e| {
                TransportError::ConnectionFailed(format!("cannot resolve {}: {}", self.endpoint, e))
            })?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.io_timeout))?;
                    stream.set_write_timeout(Some(self.io_timeout))?;
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(match last_error {
            Some(e) if e.kind() == io::ErrorKind::TimedOut => TransportError::ConnectionTimeout,
            Some(e) => TransportError::ConnectionFailed(format!("{}: {}", self.endpoint, e)),
            None => TransportError::ConnectionFailed(format!("{}: no addresses", self.endpoint)),
        })
    }
}

impl Transport for TcpTransport {
    fn execute(&self, request: &RpcRequest) -> Result<RpcResponse, TransportError> {
        let mut stream = self.connect()?;
        tracing::debug!(endpoint = %self.endpoint, op = %request.op, "sending request");

        let line = serde_json::to_string(request)?;
        writeln!(stream, "{}", line)?;
        stream.flush()?;

        let mut reader = BufReader::new(stream);
        let mut response_line = String::new();
        reader.read_line(&mut response_line)?;

        if response_line.trim().is_empty() {
            return Err(TransportError::Protocol(
                "worker closed the connection without a response".to_string(),
            ));
        }

        Ok(serde_json::from_str(&response_line)?)
    }

    fn describe(&self) -> String {
        self.endpoint.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn request() -> RpcRequest {
        RpcRequest::new(0, "probe", "req-1", &serde_json::json!({})).unwrap()
    }

    #[test]
    fn test_endpoint_defaults() {
        let endpoint = Endpoint::default();
        assert_eq!(endpoint.to_string(), "127.0.0.1:15000");
    }

    #[test]
    fn test_round_trip_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let request: RpcRequest = serde_json::from_str(&line).unwrap();
            let response = RpcResponse::success(0, request.request_id, serde_json::json!({"x": 1}));
            let mut stream = stream;
            writeln!(stream, "{}", serde_json::to_string(&response).unwrap()).unwrap();
        });

        let transport = TcpTransport::new(
            Endpoint::new("127.0.0.1", port),
            Duration::from_secs(5),
            Duration::from_secs(5),
        );
        let response = transport.execute(&request()).unwrap();
        assert!(response.ok);
        assert_eq!(response.request_id, "req-1");
    }

    #[test]
    fn test_closed_port_is_unreachable() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let transport = TcpTransport::new(
            Endpoint::new("127.0.0.1", port),
            Duration::from_secs(2),
            Duration::from_secs(2),
        );
        let err = transport.execute(&request()).unwrap_err();
        assert!(err.is_unreachable(), "{}", err);
    }

    #[test]
    fn test_silent_worker_is_protocol_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut line = String::new();
            BufReader::new(&stream).read_line(&mut line).unwrap();
            drop(stream);
        });

        let transport = TcpTransport::new(
            Endpoint::new("127.0.0.1", port),
            Duration::from_secs(2),
            Duration::from_secs(2),
        );
        let err = transport.execute(&request()).unwrap_err();
        assert!(matches!(err, TransportError::Protocol(_)));
        assert!(!err.is_unreachable());
    }
}
