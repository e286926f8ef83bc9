//! RISC-V integration lane CLI.
//!
//! Entry point for the `rvi` command-line tool.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rv_integration::{
    restore, ClassificationTable, ClientConfig, ClientError, IntegrationClient,
    IntegrationRequest, IntegrationResult, Operation, OperationStatus,
};

#[derive(Parser)]
#[command(name = "rvi")]
#[command(about = "Remote RISC-V build pipelines and RV32I assembly", version)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Path to client config file (default: .rvi/client.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Worker host, overriding the config file
    #[arg(long, global = true)]
    host: Option<String>,

    /// Worker port, overriding the config file
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ship a folder to the worker and run a pipeline on it
    Run {
        /// Local folder to capture
        #[arg(long)]
        root: PathBuf,

        /// Extension transferred as text ("" for extensionless files)
        #[arg(long = "text", value_name = "EXT")]
        text: Vec<String>,

        /// Extension transferred as binary
        #[arg(long = "binary", value_name = "EXT")]
        binary: Vec<String>,

        /// Ship only these root-relative files instead of every registered one
        #[arg(long = "file", value_name = "PATH")]
        files: Vec<PathBuf>,

        /// Operation, in order: `sh:CMD`, `native:CMD` or `reset`
        #[arg(long = "op", value_name = "OP", required = true, value_parser = parse_operation)]
        operations: Vec<Operation>,

        /// Return only files the pipeline added or changed
        #[arg(long)]
        modified_only: bool,

        /// Write the returned files into this folder
        #[arg(long)]
        out: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Assemble RV32I source (file or stdin) on the worker
    Asm {
        /// Source file; reads stdin when omitted
        file: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show worker capabilities
    Probe {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn parse_operation(value: &str) -> Result<Operation, String> {
    if value == "reset" {
        return Ok(Operation::reset());
    }
    match value.split_once(':') {
        Some(("sh", cmd)) if !cmd.trim().is_empty() => Ok(Operation::bash(cmd)),
        Some(("native", cmd)) if !cmd.trim().is_empty() => Ok(Operation::native(cmd)),
        _ => Err(format!(
            "expected `sh:CMD`, `native:CMD` or `reset`, got `{}`",
            value
        )),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let client = match connect(&cli.connection) {
        Ok(client) => client,
        Err(e) => fail(&e),
    };

    let outcome = match cli.command {
        Commands::Run {
            root,
            text,
            binary,
            files,
            operations,
            modified_only,
            out,
            json,
        } => {
            let mut table = ClassificationTable::new();
            for ext in &text {
                table = table.text(ext);
            }
            for ext in &binary {
                table = table.binary(ext);
            }
            run_pipeline(
                &client,
                RunArgs {
                    root,
                    table,
                    files,
                    operations,
                    modified_only,
                    out,
                    json,
                },
            )
        }
        Commands::Asm { file, json } => run_asm(&client, file, json),
        Commands::Probe { json } => run_probe(&client, json),
    };

    if let Err(e) = outcome {
        fail(&e);
    }
}

fn connect(args: &ConnectionArgs) -> Result<IntegrationClient, ClientError> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut config = ClientConfig::discover(args.config.as_deref(), &cwd)?;
    if let Some(host) = &args.host {
        config.endpoint.host = host.clone();
    }
    if let Some(port) = args.port {
        config.endpoint.port = port;
    }
    Ok(IntegrationClient::from_config(&config))
}

fn fail(error: &ClientError) -> ! {
    eprintln!("Error: {}", error);
    process::exit(error.exit_code());
}

struct RunArgs {
    root: PathBuf,
    table: ClassificationTable,
    files: Vec<PathBuf>,
    operations: Vec<Operation>,
    modified_only: bool,
    out: Option<PathBuf>,
    json: bool,
}

fn run_pipeline(client: &IntegrationClient, args: RunArgs) -> Result<(), ClientError> {
    let mut builder = IntegrationRequest::builder()
        .with_extension_classes(args.table)
        .with_root_folder(&args.root)
        .with_operations(args.operations);
    builder = if args.files.is_empty() {
        builder.with_all_registered_files()
    } else {
        builder.with_files(args.files)
    };
    if args.modified_only {
        builder = builder.take_modified_files();
    }
    let request = builder.build()?;

    match client.run(&request) {
        Ok(result) => report_result(&result, args.out.as_deref(), args.json),
        Err(ClientError::RemoteExecutionFailed {
            diagnostics,
            result,
        }) => {
            // Partial output is still useful for diagnosing the failure.
            report_result(&result, args.out.as_deref(), args.json)?;
            Err(ClientError::RemoteExecutionFailed {
                diagnostics,
                result,
            })
        }
        Err(e) => Err(e),
    }
}

fn report_result(
    result: &IntegrationResult,
    out: Option<&Path>,
    json: bool,
) -> Result<(), ClientError> {
    if let Some(out) = out {
        restore(out, &result.result_snapshot)?;
    }

    if json {
        let value = serde_json::json!({
            "succeeded": result.succeeded,
            "diagnostics": result.diagnostics,
            "files": result.result_snapshot.paths().collect::<Vec<_>>(),
            "reports": result.reports,
        });
        println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
        return Ok(());
    }

    for report in &result.reports {
        let status = match report.status {
            OperationStatus::Succeeded => "ok",
            OperationStatus::Failed => "FAILED",
            OperationStatus::TimedOut => "TIMED OUT",
            OperationStatus::Skipped => "skipped",
        };
        println!(
            "[{}] {} ({} ms): {}",
            report.index, status, report.duration_ms, report.operation
        );
    }
    println!("{} file(s) returned", result.result_snapshot.len());
    for path in result.result_snapshot.paths() {
        println!("  {}", path);
    }
    Ok(())
}

fn run_asm(client: &IntegrationClient, file: Option<PathBuf>, json: bool) -> Result<(), ClientError> {
    let source = match &file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map(|_| buf)
        }
    }
    .map_err(|e| ClientError::InvalidRequest(format!("failed to read assembly source: {}", e)))?;

    let words = client.asm(&source)?;

    if json {
        println!("{}", serde_json::json!({ "words": words }));
    } else {
        for word in words {
            println!("0x{:08X}", word);
        }
    }
    Ok(())
}

fn run_probe(client: &IntegrationClient, json: bool) -> Result<(), ClientError> {
    let caps = client.probe()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&caps).unwrap_or_default());
    } else {
        println!("Lane version: {}", caps.lane_version);
        println!("Protocol:     [{}, {}]", caps.protocol_min, caps.protocol_max);
        println!("Operations:   {}", caps.operations.join(", "));
        println!("Max request:  {} bytes", caps.max_request_bytes);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operation() {
        assert_eq!(parse_operation("sh:make firmware.bin").unwrap(), Operation::bash("make firmware.bin"));
        assert_eq!(parse_operation("native:1.cmd").unwrap(), Operation::native("1.cmd"));
        assert_eq!(parse_operation("reset").unwrap(), Operation::reset());
        assert!(parse_operation("sh:").is_err());
        assert!(parse_operation("make").is_err());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "rvi", "--port", "15001", "run", "--root", "fw", "--text", "c", "--binary", "bin",
            "--op", "sh:make", "--op", "reset", "--modified-only",
        ])
        .unwrap();
        assert_eq!(cli.connection.port, Some(15001));
        match cli.command {
            Commands::Run { operations, modified_only, text, .. } => {
                assert_eq!(operations, vec![Operation::bash("make"), Operation::reset()]);
                assert!(modified_only);
                assert_eq!(text, vec!["c"]);
            }
            _ => panic!("expected run"),
        }
    }
}
