//! RISC-V integration lane client.
//!
//! Ships a classified snapshot of a local folder plus an ordered list of
//! shell operations to a remote worker, and gets back the files the
//! pipeline produced. Also exposes the worker's RV32I assembler.
//!
//! ```no_run
//! use rv_integration::{ClassificationTable, ClientConfig, IntegrationClient, IntegrationRequest, Operation};
//!
//! let request = IntegrationRequest::builder()
//!     .with_extension_classes(ClassificationTable::new().text("c").text("").binary("bin"))
//!     .with_root_folder("firmware")
//!     .with_all_registered_files()
//!     .with_operations([Operation::bash("make firmware.bin")])
//!     .take_modified_files()
//!     .build()?;
//!
//! let client = IntegrationClient::from_config(&ClientConfig::default());
//! let result = client.run(&request)?;
//! let words = result.words("firmware.bin");
//! # Ok::<(), rv_integration::ClientError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod request;

pub use client::{Capabilities, Endpoint, IntegrationClient, TcpTransport, Transport, TransportError};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, FailureKind};
pub use request::{IntegrationRequest, IntegrationResult, RequestBuilder};

pub use rvi_classifier::{ClassificationTable, FileEncoding};
pub use rvi_protocol::ops::{OperationReport, OperationStatus};
pub use rvi_protocol::{Interpreter, Operation};
pub use rvi_snapshot::{capture, capture_files, changes, modified, restore, FileEntry, Snapshot};
