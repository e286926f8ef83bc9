//! RISC-V integration lane worker entrypoint.
//!
//! Usage:
//!   rvi-worker serve [--config PATH] [--listen ADDR]
//!   rvi-worker rpc [--config PATH]
//!
//! `serve` listens for one-request-per-connection JSON RPC over TCP. `rpc`
//! handles a single request on stdin/stdout. Logs go to stderr; set
//! `RUST_LOG` to adjust verbosity.

use std::path::PathBuf;
use std::process::ExitCode;

use rvi_worker::{RpcHandler, Server, WorkerConfig};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage:
  rvi-worker serve [--config PATH] [--listen ADDR]
  rvi-worker rpc [--config PATH]";

struct Args {
    command: String,
    config: Option<PathBuf>,
    listen: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let command = args.next().ok_or("missing command")?;
    let mut parsed = Args {
        command,
        config: None,
        listen: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                parsed.config = Some(args.next().ok_or("--config needs a path")?.into());
            }
            "--listen" if parsed.command == "serve" => {
                parsed.listen = Some(args.next().ok_or("--listen needs an address")?);
            }
            other => return Err(format!("unexpected argument: {}", other)),
        }
    }
    Ok(parsed)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    let mut config = match &args.config {
        Some(path) => match WorkerConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "failed to load config");
                return ExitCode::FAILURE;
            }
        },
        None => WorkerConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }

    let result = match args.command.as_str() {
        "serve" => Server::bind(config).and_then(Server::serve),
        "rpc" => RpcHandler::new(config).run(),
        other => {
            eprintln!("error: unknown command: {}", other);
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "worker failed");
            ExitCode::FAILURE
        }
    }
}
