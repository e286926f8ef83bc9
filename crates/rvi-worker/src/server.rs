//! TCP front end.
//!
//! Accepts connections on the configured listen address and serves exactly
//! one request line per connection on its own thread. Each accepted stream
//! gets the configured read/write timeout, so a silent client is answered
//! with an error instead of holding its thread forever.

use std::io::{self, BufReader};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::WorkerConfig;
use crate::rpc::RpcHandler;

/// A bound worker server.
pub struct Server {
    listener: TcpListener,
    handler: Arc<RpcHandler>,
    io_timeout: Duration,
}

impl Server {
    /// Bind to `config.listen`.
    pub fn bind(config: WorkerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(&config.listen)?;
        Ok(Self {
            listener,
            io_timeout: config.io_timeout(),
            handler: Arc::new(RpcHandler::new(config)),
        })
    }

    /// Actual bound address (useful when listening on port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the listener fails.
    pub fn serve(self) -> io::Result<()> {
        tracing::info!(addr = %self.local_addr()?, "worker listening");

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let handler = Arc::clone(&self.handler);
                    let io_timeout = self.io_timeout;
                    thread::spawn(move || handle_connection(&handler, stream, io_timeout));
                }
                Err(e) => tracing::warn!(error = %e, "accept failed"),
            }
        }
        Ok(())
    }
}

fn handle_connection(handler: &RpcHandler, stream: TcpStream, io_timeout: Duration) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    tracing::debug!(%peer, "connection accepted");

    let result = stream
        .set_read_timeout(Some(io_timeout))
        .and_then(|_| stream.set_write_timeout(Some(io_timeout)))
        .and_then(|_| stream.try_clone()).and_then(|read_half| {
        let mut reader = BufReader::new(read_half);
        let mut writer = stream;
        handler.run_with_io(&mut reader, &mut writer)
    });

    if let Err(e) = result {
        tracing::warn!(%peer, error = %e, "connection failed");
    }
}
