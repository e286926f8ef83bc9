//! Path-keyed snapshot collection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::entry::{is_contained, FileEntry};
use crate::error::SnapshotError;

/// Ordered set of files keyed by relative path.
///
/// No two entries share a path, and every path stays inside the root it is
/// restored to. Both rules hold for snapshots built in memory and for those
/// deserialized off the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FileEntry>", into = "Vec<FileEntry>")]
pub struct Snapshot {
    entries: Vec<FileEntry>,
    index: HashMap<String, usize>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Fails if its path is already present or escapes the root.
    ///
    /// The path is normalized first, so `./a.c` and `a.c` are the same file.
    pub fn insert(&mut self, entry: FileEntry) -> Result<(), SnapshotError> {
        let entry = entry.normalized();
        let path = entry.path().to_string();
        if !is_contained(&path) {
            return Err(SnapshotError::PathEscapesRoot(path));
        }
        if self.index.contains_key(&path) {
            return Err(SnapshotError::DuplicatePath(path));
        }
        self.index.insert(path, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Insert or replace in place, returning the replaced entry.
    pub fn upsert(&mut self, entry: FileEntry) -> Result<Option<FileEntry>, SnapshotError> {
        let entry = entry.normalized();
        match self.index.get(entry.path()) {
            Some(&idx) => Ok(Some(std::mem::replace(&mut self.entries[idx], entry))),
            None => self.insert(entry).map(|_| None),
        }
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.index.get(path).map(|&idx| &self.entries[idx])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn remove(&mut self, path: &str) -> Option<FileEntry> {
        let idx = self.index.remove(path)?;
        let removed = self.entries.remove(idx);
        for slot in self.index.values_mut() {
            if *slot > idx {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    /// Keep only the entries for which `keep` returns true, preserving order.
    pub fn retain(&mut self, mut keep: impl FnMut(&FileEntry) -> bool) {
        self.entries.retain(|entry| keep(entry));
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.path().to_string(), idx))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileEntry> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(FileEntry::path)
    }

    /// Find the first entry with the given file name, in any directory.
    pub fn find_by_name(&self, name: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Total content size in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.bytes().len() as u64).sum()
    }

    /// Order-independent SHA-256 over paths, encodings and content.
    pub fn digest(&self) -> String {
        let mut sorted: Vec<&FileEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.path().cmp(b.path()));

        let mut hasher = Sha256::new();
        for entry in sorted {
            hasher.update(entry.path().as_bytes());
            hasher.update([0u8]);
            hasher.update(entry.encoding().to_string().as_bytes());
            hasher.update([0u8]);
            hasher.update((entry.bytes().len() as u64).to_le_bytes());
            hasher.update(entry.bytes());
        }
        hex::encode(hasher.finalize())
    }
}

impl TryFrom<Vec<FileEntry>> for Snapshot {
    type Error = SnapshotError;

    fn try_from(entries: Vec<FileEntry>) -> Result<Self, Self::Error> {
        let mut snapshot = Snapshot::new();
        for entry in entries {
            snapshot.insert(entry)?;
        }
        Ok(snapshot)
    }
}

impl From<Snapshot> for Vec<FileEntry> {
    fn from(snapshot: Snapshot) -> Self {
        snapshot.entries
    }
}

impl IntoIterator for Snapshot {
    type Item = FileEntry;
    type IntoIter = std::vec::IntoIter<FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a FileEntry;
    type IntoIter = std::slice::Iter<'a, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Snapshot {
        Snapshot::try_from(vec![
            FileEntry::text("Makefile", "all:\n"),
            FileEntry::text("src/main.c", "int x;"),
            FileEntry::binary("firmware.bin", vec![1, 2, 3]),
        ])
        .unwrap()
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let mut snapshot = sample();
        let err = snapshot.insert(FileEntry::text("src/main.c", "")).unwrap_err();
        assert!(matches!(err, SnapshotError::DuplicatePath(p) if p == "src/main.c"));
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn test_escaping_path_rejected() {
        let mut snapshot = Snapshot::new();
        let err = snapshot.insert(FileEntry::text("../evil.sh", "")).unwrap_err();
        assert!(matches!(err, SnapshotError::PathEscapesRoot(_)));
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut snapshot = sample();
        let old = snapshot
            .upsert(FileEntry::text("src/main.c", "int y;"))
            .unwrap();
        assert_eq!(old, Some(FileEntry::text("src/main.c", "int x;")));
        assert_eq!(
            snapshot.paths().collect::<Vec<_>>(),
            vec!["Makefile", "src/main.c", "firmware.bin"]
        );
        assert_eq!(snapshot.get("src/main.c").unwrap().as_text(), Some("int y;"));

        assert!(snapshot.upsert(FileEntry::text("new.h", "")).unwrap().is_none());
        assert_eq!(snapshot.len(), 4);
    }

    #[test]
    fn test_remove_keeps_index_consistent() {
        let mut snapshot = sample();
        assert!(snapshot.remove("Makefile").is_some());
        assert!(snapshot.remove("Makefile").is_none());
        assert_eq!(snapshot.get("firmware.bin").unwrap().bytes(), &[1, 2, 3]);
        assert_eq!(snapshot.get("src/main.c").unwrap().as_text(), Some("int x;"));
    }

    #[test]
    fn test_find_by_name() {
        let snapshot = sample();
        assert_eq!(snapshot.find_by_name("main.c").unwrap().path(), "src/main.c");
        assert!(snapshot.find_by_name("missing.c").is_none());
    }

    #[test]
    fn test_digest_is_order_independent() {
        let reversed: Snapshot = Snapshot::try_from(
            Vec::from(sample()).into_iter().rev().collect::<Vec<_>>(),
        )
        .unwrap();
        assert_ne!(reversed, sample());
        assert_eq!(reversed.digest(), sample().digest());
    }

    #[test]
    fn test_deserialize_enforces_unique_paths() {
        let value = json!([
            {"encoding": "text", "path": "a.c", "content": "1"},
            {"encoding": "text", "path": "a.c", "content": "2"}
        ]);
        let result: Result<Snapshot, _> = serde_json::from_value(value);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("duplicate path"), "unexpected error: {}", err);
    }

    #[test]
    fn test_deserialize_normalizes_paths() {
        let value = json!([
            {"encoding": "text", "path": "./a.c", "content": "1"},
            {"encoding": "text", "path": "logs//12:30.txt", "content": "2"}
        ]);
        let snapshot: Snapshot = serde_json::from_value(value).unwrap();
        assert_eq!(snapshot.get("a.c").unwrap().as_text(), Some("1"));
        assert!(snapshot.contains("logs/12:30.txt"));

        let value = json!([
            {"encoding": "text", "path": "a.c", "content": "1"},
            {"encoding": "text", "path": "./a.c", "content": "2"}
        ]);
        assert!(serde_json::from_value::<Snapshot>(value).is_err());
    }

    #[test]
    fn test_retain_rebuilds_index() {
        let mut snapshot = sample();
        snapshot.retain(|e| e.path() != "Makefile");
        assert_eq!(
            snapshot.paths().collect::<Vec<_>>(),
            vec!["src/main.c", "firmware.bin"]
        );
        assert_eq!(snapshot.get("firmware.bin").unwrap().bytes(), &[1, 2, 3]);
        assert!(snapshot.get("Makefile").is_none());
    }

    #[test]
    fn test_serialize_round_trip_preserves_order() {
        let snapshot = sample();
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
