//! RISC-V integration lane worker.
//!
//! Serves the JSON RPC protocol over TCP (`rvi-worker serve`) or a single
//! request on stdin/stdout (`rvi-worker rpc`). Run requests execute in a
//! throwaway sandbox; asm requests go to the built-in RV32I assembler.

pub mod asm;
pub mod config;
pub mod handlers;
pub mod pipeline;
pub mod rpc;
pub mod sandbox;
pub mod server;

pub use asm::{assemble, AsmError};
pub use config::{ConfigError, WorkerConfig};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use rpc::RpcHandler;
pub use sandbox::{Sandbox, SandboxError};
pub use server::Server;
