//! End-to-end tests: client ↔ real worker over TCP.

mod common;

use std::fs;
use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

use rv_integration::{
    ClassificationTable, ClientError, FileEntry, IntegrationRequest, Operation, OperationStatus,
};
use tempfile::TempDir;

// =============================================================================
// Assembler
// =============================================================================

#[test]
fn test_asm_reference_words() {
    let work = TempDir::new().unwrap();
    let client = common::start_worker(work.path());

    let words = client.asm("\naddi x1, x0, 10\naddi x1, x0, -10\n").unwrap();
    assert_eq!(words, vec![0x00A0_0093, 0xFF60_0093]);
}

#[test]
fn test_asm_malformed_reports_line() {
    let work = TempDir::new().unwrap();
    let client = common::start_worker(work.path());

    let err = client.asm("nop\nnop\naddi x1, x0, 4096").unwrap_err();
    match err {
        ClientError::MalformedAssembly { line, ref message } => {
            assert_eq!(line, 3);
            assert!(message.contains("out of range"), "{}", message);
        }
        ref other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.exit_code(), 41);
}

// =============================================================================
// Probe
// =============================================================================

#[test]
fn test_probe_reports_operations() {
    let work = TempDir::new().unwrap();
    let client = common::start_worker(work.path());

    let caps = client.probe().unwrap();
    assert_eq!(caps.protocol_min, 1);
    assert_eq!(caps.protocol_max, 1);
    assert!(caps.operations.iter().any(|op| op == "run"));
    assert!(caps.operations.iter().any(|op| op == "asm"));
}

// =============================================================================
// Run
// =============================================================================

#[cfg(unix)]
#[test]
fn test_modified_only_returns_exactly_new_file() {
    let work = TempDir::new().unwrap();
    let client = common::start_worker(work.path());

    let request = IntegrationRequest::builder()
        .with_extension_classes(ClassificationTable::new().text("c").text("txt"))
        .with_file(FileEntry::text("data.c", "int x;"))
        .with_operations([Operation::bash("echo done > out.txt")])
        .take_modified_files()
        .build()
        .unwrap();

    let result = client.run(&request).unwrap();
    assert!(result.succeeded);
    assert_eq!(result.result_snapshot.len(), 1);
    let out = result.result_snapshot.get("out.txt").unwrap();
    assert_eq!(out.as_text(), Some("done\n"));
    assert!(result.result_snapshot.get("data.c").is_none());
}

#[cfg(unix)]
#[test]
fn test_captured_folder_builds_remotely() {
    let work = TempDir::new().unwrap();
    let client = common::start_worker(work.path());

    let src = TempDir::new().unwrap();
    fs::create_dir_all(src.path().join("scripts")).unwrap();
    fs::write(
        src.path().join("scripts/build.sh"),
        "#!/bin/sh\nprintf '\\223\\000\\240\\000' > firmware.bin\n",
    )
    .unwrap();
    fs::write(src.path().join("firmware.c"), "int main(void) { return 0; }\n").unwrap();

    let request = IntegrationRequest::builder()
        .with_extension_classes(
            ClassificationTable::new()
                .text("sh")
                .text("c")
                .binary("bin"),
        )
        .with_root_folder(src.path())
        .with_all_registered_files()
        .with_operations([Operation::reset(), Operation::bash("./scripts/build.sh")])
        .take_modified_files()
        .build()
        .unwrap();

    let result = client.run(&request).unwrap();
    assert_eq!(result.result_snapshot.paths().collect::<Vec<_>>(), vec!["firmware.bin"]);
    assert_eq!(result.words("firmware.bin"), Some(vec![0x00A0_0093]));
    assert_eq!(result.reports.len(), 2);
    assert!(result
        .reports
        .iter()
        .all(|r| r.status == OperationStatus::Succeeded));
}

#[cfg(unix)]
#[test]
fn test_failing_operation_stops_pipeline() {
    let work = TempDir::new().unwrap();
    let client = common::start_worker(work.path());

    let request = IntegrationRequest::builder()
        .with_extension_classes(ClassificationTable::new().text("txt"))
        .with_operations([
            Operation::bash("echo partial > first.txt"),
            Operation::bash("echo 'no rule to make target' >&2; exit 2"),
            Operation::bash("echo never > second.txt"),
        ])
        .take_modified_files()
        .build()
        .unwrap();

    let err = client.run(&request).unwrap_err();
    assert_eq!(err.exit_code(), 40);
    match err {
        ClientError::RemoteExecutionFailed {
            diagnostics,
            result,
        } => {
            assert!(diagnostics.contains("exit 2"), "{}", diagnostics);
            assert!(diagnostics.contains("no rule to make target"), "{}", diagnostics);
            assert!(!result.succeeded);
            assert!(result.result_snapshot.contains("first.txt"));
            assert!(!result.result_snapshot.contains("second.txt"));
            assert_eq!(result.reports[1].status, OperationStatus::Failed);
            assert_eq!(result.reports[2].status, OperationStatus::Skipped);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[cfg(unix)]
#[test]
fn test_sandboxes_cleaned_up() {
    let work = TempDir::new().unwrap();
    let client = common::start_worker(work.path());

    let request = IntegrationRequest::builder()
        .with_operations([Operation::bash("true")])
        .build()
        .unwrap();
    client.run(&request).unwrap();

    let leftovers = fs::read_dir(work.path()).map(|d| d.count()).unwrap_or(0);
    assert_eq!(leftovers, 0);
}

// =============================================================================
// Transport failures
// =============================================================================

#[test]
fn test_closed_port_is_endpoint_unreachable() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = common::client_for(port);

    let err = client.asm("nop").unwrap_err();
    assert!(
        matches!(err, ClientError::EndpointUnreachable { .. }),
        "unexpected error: {:?}",
        err
    );
    assert_eq!(err.exit_code(), 20);
}

#[test]
fn test_silent_endpoint_is_endpoint_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        // Accept and hold the connection without ever answering.
        if let Ok((_stream, _)) = listener.accept() {
            thread::sleep(Duration::from_secs(10));
        }
    });
    let client = common::client_with_io_timeout(port, Duration::from_secs(1));

    let start = Instant::now();
    let err = client.asm("nop").unwrap_err();
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(
        matches!(err, ClientError::EndpointUnreachable { .. }),
        "unexpected error: {:?}",
        err
    );
    assert_eq!(err.exit_code(), 20);
}
