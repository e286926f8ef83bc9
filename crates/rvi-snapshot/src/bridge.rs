//! Filesystem bridge: directory tree ⇄ snapshot.
//!
//! Text files are carried with LF line endings in both directions, so a
//! snapshot captured on one platform hashes the same on every other.

use std::borrow::Cow;
use std::fs;
use std::path::{Component, Path};

use walkdir::WalkDir;

use rvi_classifier::{ClassificationTable, FileEncoding};

use crate::entry::{normalize_path, FileEntry};
use crate::error::SnapshotError;
use crate::snapshot::Snapshot;

/// Capture every regular file under `root` whose extension is registered.
///
/// Unregistered extensions are skipped, not rejected. Entries are ordered by
/// a depth-first walk with siblings sorted by name.
pub fn capture(root: &Path, table: &ClassificationTable) -> Result<Snapshot, SnapshotError> {
    ensure_root(root)?;

    let mut snapshot = Snapshot::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let full_path = entry.path();
        let Some(encoding) = table.classify(full_path).ok() else {
            continue;
        };

        let rel_path = relative_path(root, full_path)?;
        snapshot.insert(read_entry(full_path, rel_path, encoding)?)?;
    }

    Ok(snapshot)
}

/// Capture an explicit list of root-relative paths.
///
/// Unlike [`capture`], every listed file must exist and be classified.
pub fn capture_files<I, P>(
    root: &Path,
    table: &ClassificationTable,
    paths: I,
) -> Result<Snapshot, SnapshotError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    ensure_root(root)?;

    let mut snapshot = Snapshot::new();
    for rel in paths {
        let rel = rel.as_ref();
        let rel_path = normalize_path(&rel.to_string_lossy());
        let encoding = table.classify(rel)?;
        let full_path = contained_join(root, &rel_path)?;
        snapshot.insert(read_entry(&full_path, rel_path, encoding)?)?;
    }

    Ok(snapshot)
}

/// Write every entry of `snapshot` under `root`.
///
/// Creates `root` and intermediate directories as needed and overwrites
/// existing files. Files not in the snapshot are left alone.
pub fn restore(root: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    fs::create_dir_all(root).map_err(|e| SnapshotError::io(root, e))?;

    for entry in snapshot {
        let target = contained_join(root, entry.path())?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| SnapshotError::io(parent, e))?;
        }

        let result = match entry {
            FileEntry::Text { content, .. } => fs::write(&target, to_lf(content).as_bytes()),
            FileEntry::Binary { content, .. } => fs::write(&target, content),
        };
        result.map_err(|e| SnapshotError::io(&target, e))?;
    }

    Ok(())
}

fn ensure_root(root: &Path) -> Result<(), SnapshotError> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(SnapshotError::RootNotFound(root.to_path_buf()))
    }
}

fn read_entry(
    full_path: &Path,
    rel_path: String,
    encoding: FileEncoding,
) -> Result<FileEntry, SnapshotError> {
    let bytes = fs::read(full_path).map_err(|e| SnapshotError::io(full_path, e))?;
    match encoding {
        FileEncoding::Binary => Ok(FileEntry::binary(rel_path, bytes)),
        FileEncoding::Text => {
            let text = String::from_utf8(bytes)
                .map_err(|_| SnapshotError::InvalidText(rel_path.clone()))?;
            Ok(FileEntry::text(rel_path, to_lf(&text)))
        }
    }
}

fn relative_path(root: &Path, full_path: &Path) -> Result<String, SnapshotError> {
    let rel = full_path
        .strip_prefix(root)
        .map_err(|_| SnapshotError::PathEscapesRoot(full_path.to_string_lossy().into_owned()))?;

    let parts: Vec<Cow<'_, str>> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Ok(parts.join("/"))
}

fn contained_join(root: &Path, rel: &str) -> Result<std::path::PathBuf, SnapshotError> {
    let rel_path = Path::new(rel);
    let escapes = rel_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(SnapshotError::PathEscapesRoot(rel.to_string()));
    }
    Ok(root.join(rel_path))
}

fn to_lf(text: &str) -> Cow<'_, str> {
    if text.contains("\r\n") {
        Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn table() -> ClassificationTable {
        ClassificationTable::new()
            .text("c")
            .text("h")
            .text("")
            .binary("bin")
    }

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_capture_filters_and_orders() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/main.c", b"int x;");
        write(dir.path(), "src/dma.h", b"#pragma once\n");
        write(dir.path(), "Makefile", b"all:\n");
        write(dir.path(), "firmware.bin", &[0, 1, 2, 0xff]);
        write(dir.path(), "notes.txt", b"skipped");

        let snapshot = capture(dir.path(), &table()).unwrap();
        assert_eq!(
            snapshot.paths().collect::<Vec<_>>(),
            vec!["Makefile", "firmware.bin", "src/dma.h", "src/main.c"]
        );
        assert_eq!(
            snapshot.get("firmware.bin").unwrap().as_binary(),
            Some(&[0u8, 1, 2, 0xff][..])
        );
        assert!(!snapshot.contains("notes.txt"));
    }

    #[test]
    fn test_capture_normalizes_crlf() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.c", b"int x;\r\nint y;\r\n");

        let snapshot = capture(dir.path(), &table()).unwrap();
        assert_eq!(snapshot.get("a.c").unwrap().as_text(), Some("int x;\nint y;\n"));
    }

    #[test]
    fn test_capture_rejects_invalid_utf8_text() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "bad.c", &[0xff, 0xfe, 0x00]);

        let err = capture(dir.path(), &table()).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidText(p) if p == "bad.c"));
    }

    #[test]
    fn test_capture_missing_root() {
        let dir = TempDir::new().unwrap();
        let err = capture(&dir.path().join("missing"), &table()).unwrap_err();
        assert!(matches!(err, SnapshotError::RootNotFound(_)));
    }

    #[test]
    fn test_capture_files_requires_classification() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.c", b"1");
        write(dir.path(), "notes.txt", b"2");

        let snapshot = capture_files(dir.path(), &table(), ["a.c"]).unwrap();
        assert_eq!(snapshot.len(), 1);

        let err = capture_files(dir.path(), &table(), ["notes.txt"]).unwrap_err();
        assert!(matches!(err, SnapshotError::Classify(_)));
    }

    #[test]
    fn test_restore_is_additive_and_overwrites() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "keep.c", b"untouched");
        write(dir.path(), "src/main.c", b"old");

        let snapshot = Snapshot::try_from(vec![
            FileEntry::text("src/main.c", "new\r\n"),
            FileEntry::binary("out/deep/fw.bin", vec![9, 8, 7]),
        ])
        .unwrap();
        restore(dir.path(), &snapshot).unwrap();

        assert_eq!(fs::read(dir.path().join("keep.c")).unwrap(), b"untouched");
        assert_eq!(fs::read(dir.path().join("src/main.c")).unwrap(), b"new\n");
        assert_eq!(fs::read(dir.path().join("out/deep/fw.bin")).unwrap(), vec![9, 8, 7]);
    }

    #[test]
    fn test_capture_restore_capture_round_trip() {
        let source = TempDir::new().unwrap();
        write(source.path(), "Makefile", b"all:\r\n\tmake\r\n");
        write(source.path(), "src/main.c", b"int main() { return 0; }\n");
        write(source.path(), "fw.bin", &[0x93, 0x00, 0xa0, 0x00]);

        let first = capture(source.path(), &table()).unwrap();
        restore(source.path(), &first).unwrap();
        let second = capture(source.path(), &table()).unwrap();
        assert_eq!(first, second);

        let elsewhere = TempDir::new().unwrap();
        restore(elsewhere.path(), &first).unwrap();
        assert_eq!(capture(elsewhere.path(), &table()).unwrap(), first);
    }
}
