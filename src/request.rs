//! Integration requests and results.
//!
//! A request is assembled with [`RequestBuilder`]: pick the classification
//! table, the root folder and which files to ship, add generated files and
//! the operation list, then `build()` captures the snapshot once. The
//! resulting [`IntegrationRequest`] is immutable.

use std::path::{Path, PathBuf};

use rvi_classifier::ClassificationTable;
use rvi_protocol::ops::{OperationReport, RunRequest, RunResponse};
use rvi_protocol::Operation;
use rvi_snapshot::{capture, capture_files, FileEntry, Snapshot};

use crate::error::ClientError;

/// Everything a run sends to the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationRequest {
    root: Option<PathBuf>,
    extensions: ClassificationTable,
    snapshot: Snapshot,
    operations: Vec<Operation>,
    modified_only: bool,
}

impl IntegrationRequest {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Local folder the snapshot was captured from, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn extensions(&self) -> &ClassificationTable {
        &self.extensions
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn modified_only(&self) -> bool {
        self.modified_only
    }

    pub(crate) fn to_run_request(&self) -> RunRequest {
        RunRequest {
            extensions: self.extensions.clone(),
            snapshot: self.snapshot.clone(),
            operations: self.operations.clone(),
            modified_only: self.modified_only,
        }
    }
}

#[derive(Debug, Clone, Default)]
enum Selection {
    #[default]
    Nothing,
    AllRegistered,
    Files(Vec<PathBuf>),
}

/// Builder for [`IntegrationRequest`].
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    extensions: ClassificationTable,
    root: Option<PathBuf>,
    selection: Selection,
    generated: Vec<FileEntry>,
    operations: Vec<Operation>,
    modified_only: bool,
}

impl RequestBuilder {
    pub fn with_extension_classes(mut self, extensions: ClassificationTable) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_root_folder(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Ship every file under the root whose extension is registered.
    pub fn with_all_registered_files(mut self) -> Self {
        self.selection = Selection::AllRegistered;
        self
    }

    /// Ship only these root-relative files.
    pub fn with_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.selection = Selection::Files(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Add an in-memory file, replacing any captured file at the same path.
    pub fn with_file(mut self, entry: FileEntry) -> Self {
        self.generated.push(entry);
        self
    }

    pub fn with_operations<I>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = Operation>,
    {
        self.operations.extend(operations);
        self
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Return only files the pipeline added or changed.
    pub fn take_modified_files(mut self) -> Self {
        self.modified_only = true;
        self
    }

    /// Capture the selected files and freeze the request.
    pub fn build(self) -> Result<IntegrationRequest, ClientError> {
        let mut snapshot = match (&self.selection, &self.root) {
            (Selection::Nothing, _) => Snapshot::new(),
            (_, None) => {
                return Err(ClientError::InvalidRequest(
                    "a root folder is required to select files".to_string(),
                ))
            }
            (Selection::AllRegistered, Some(root)) => capture(root, &self.extensions)?,
            (Selection::Files(paths), Some(root)) => capture_files(root, &self.extensions, paths)?,
        };

        for entry in self.generated {
            snapshot.upsert(entry)?;
        }

        tracing::debug!(
            files = snapshot.len(),
            bytes = snapshot.total_bytes(),
            operations = self.operations.len(),
            "built integration request"
        );

        Ok(IntegrationRequest {
            root: self.root,
            extensions: self.extensions,
            snapshot,
            operations: self.operations,
            modified_only: self.modified_only,
        })
    }
}

/// What came back from a run.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationResult {
    /// Sandbox state after the pipeline, or only its changes when the request
    /// asked for modified files.
    pub result_snapshot: Snapshot,
    pub succeeded: bool,
    pub diagnostics: Option<String>,
    pub reports: Vec<OperationReport>,
}

impl IntegrationResult {
    /// Decode a binary file of the result (matched by file name) as
    /// little-endian 32-bit words, e.g. a `firmware.bin` memory image.
    /// Trailing bytes that do not fill a word are zero-padded.
    pub fn words(&self, name: &str) -> Option<Vec<u32>> {
        let bytes = self.result_snapshot.find_by_name(name)?.as_binary()?;
        Some(
            bytes
                .chunks(4)
                .map(|chunk| {
                    let mut word = [0u8; 4];
                    word[..chunk.len()].copy_from_slice(chunk);
                    u32::from_le_bytes(word)
                })
                .collect(),
        )
    }
}

impl From<RunResponse> for IntegrationResult {
    fn from(response: RunResponse) -> Self {
        Self {
            result_snapshot: response.snapshot,
            succeeded: response.succeeded,
            diagnostics: response.diagnostics,
            reports: response.reports,
        }
    }
}
