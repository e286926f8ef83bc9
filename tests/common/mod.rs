//! Shared helpers: a real worker on an ephemeral port.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rv_integration::{Endpoint, IntegrationClient, TcpTransport};
use rvi_worker::{Server, WorkerConfig};

/// Start a worker on `127.0.0.1:0` with sandboxes under `work_root` and
/// return a client pointed at it. The server thread lives until the test
/// process exits.
pub fn start_worker(work_root: &Path) -> IntegrationClient {
    let server = Server::bind(WorkerConfig {
        listen: "127.0.0.1:0".to_string(),
        work_root: work_root.to_path_buf(),
        operation_timeout_seconds: 30,
        ..WorkerConfig::default()
    })
    .expect("bind worker");
    let port = server.local_addr().expect("local addr").port();
    thread::spawn(move || server.serve());

    client_for(port)
}

pub fn client_for(port: u16) -> IntegrationClient {
    client_with_io_timeout(port, Duration::from_secs(60))
}

pub fn client_with_io_timeout(port: u16, io_timeout: Duration) -> IntegrationClient {
    IntegrationClient::new(Arc::new(TcpTransport::new(
        Endpoint::new("127.0.0.1", port),
        Duration::from_secs(5),
        io_timeout,
    )))
}
