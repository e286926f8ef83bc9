//! Classified file entries.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use rvi_classifier::FileEncoding;

/// One file of a snapshot.
///
/// The content variant is fixed by the file's classification, so text can
/// never be read back as bytes-of-unknown-encoding and vice versa. On the
/// wire this is `{"encoding": "text"|"binary", "path": ..., "content": ...}`
/// with binary content base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "encoding", rename_all = "lowercase")]
pub enum FileEntry {
    Text {
        path: String,
        content: String,
    },
    Binary {
        path: String,
        #[serde(with = "base64_content")]
        content: Vec<u8>,
    },
}

impl FileEntry {
    /// A text entry. Backslash separators in `path` are normalized to `/`.
    pub fn text(path: impl AsRef<str>, content: impl Into<String>) -> Self {
        Self::Text {
            path: normalize_path(path.as_ref()),
            content: content.into(),
        }
    }

    /// A binary entry. Backslash separators in `path` are normalized to `/`.
    pub fn binary(path: impl AsRef<str>, content: impl Into<Vec<u8>>) -> Self {
        Self::Binary {
            path: normalize_path(path.as_ref()),
            content: content.into(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Text { path, .. } | Self::Binary { path, .. } => path,
        }
    }

    pub fn encoding(&self) -> FileEncoding {
        match self {
            Self::Text { .. } => FileEncoding::Text,
            Self::Binary { .. } => FileEncoding::Binary,
        }
    }

    /// Content as it is written to disk.
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Text { content, .. } => content.as_bytes(),
            Self::Binary { content, .. } => content,
        }
    }

    /// Text content, or `None` for a binary entry.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { content, .. } => Some(content),
            Self::Binary { .. } => None,
        }
    }

    /// Binary content, or `None` for a text entry.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Self::Binary { content, .. } => Some(content),
            Self::Text { .. } => None,
        }
    }

    /// File name (last path component).
    pub fn name(&self) -> &str {
        let path = self.path();
        path.rsplit('/').next().unwrap_or(path)
    }

    /// The same entry with its path in normalized form.
    pub(crate) fn normalized(self) -> Self {
        match self {
            Self::Text { path, content } => Self::Text {
                path: normalize_path(&path),
                content,
            },
            Self::Binary { path, content } => Self::Binary {
                path: normalize_path(&path),
                content,
            },
        }
    }

    /// SHA-256 hex digest of the content bytes.
    pub fn sha256(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.bytes());
        hex::encode(hasher.finalize())
    }
}

/// Forward-slash separators, no `./` prefix, no empty components.
pub(crate) fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether a normalized path stays inside the snapshot root.
///
/// `:` is an ordinary file name character; only a leading drive prefix
/// (`C:`) makes a path absolute.
pub(crate) fn is_contained(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !has_drive_prefix(path)
        && path.split('/').all(|c| c != "..")
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

mod base64_content {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
