//! Per-request sandbox directories.
//!
//! Each run request gets a fresh directory under the configured work root:
//! `<work_root>/<request_id>-<nanos>-<seq>`. The directory is removed when the
//! [`Sandbox`] is dropped unless the worker is configured to keep it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use thiserror::Error;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to create sandbox {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An isolated working directory for one request.
#[derive(Debug)]
pub struct Sandbox {
    root: PathBuf,
    keep: bool,
}

impl Sandbox {
    /// Create a new empty sandbox under `work_root`.
    pub fn create(work_root: &Path, request_id: &str, keep: bool) -> Result<Self, SandboxError> {
        let nanos = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let root = work_root.join(format!("{}-{}-{}", sanitize(request_id), nanos, seq));

        fs::create_dir_all(work_root)
            .and_then(|_| fs::create_dir(&root))
            .map_err(|source| SandboxError::Create {
                path: root.clone(),
                source,
            })?;

        Ok(Self { root, keep })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        if self.keep {
            tracing::debug!(sandbox = %self.root.display(), "keeping sandbox");
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.root) {
            tracing::warn!(sandbox = %self.root.display(), error = %e, "failed to remove sandbox");
        }
    }
}

/// Request IDs are caller-chosen; keep only characters safe in a file name.
fn sanitize(request_id: &str) -> String {
    let cleaned: String = request_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "request".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sandbox_removed_on_drop() {
        let work = TempDir::new().unwrap();
        let root = {
            let sandbox = Sandbox::create(work.path(), "req-1", false).unwrap();
            assert!(sandbox.root().is_dir());
            fs::write(sandbox.root().join("a.c"), "x").unwrap();
            sandbox.root().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn test_sandbox_kept_when_configured() {
        let work = TempDir::new().unwrap();
        let root = Sandbox::create(work.path(), "req-2", true)
            .unwrap()
            .root()
            .to_path_buf();
        assert!(root.is_dir());
    }

    #[test]
    fn test_sandboxes_are_distinct_and_contained() {
        let work = TempDir::new().unwrap();
        let a = Sandbox::create(work.path(), "../../etc", false).unwrap();
        let b = Sandbox::create(work.path(), "../../etc", false).unwrap();
        assert_ne!(a.root(), b.root());
        assert!(a.root().starts_with(work.path()));
        assert_eq!(a.root().parent().unwrap(), work.path());
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("req-1_a"), "req-1_a");
        assert_eq!(sanitize("a/b c"), "a_b_c");
        assert_eq!(sanitize(""), "request");
    }
}
