//! Extension-based transfer classification.
//!
//! Every file that crosses the host↔worker boundary is either text (UTF-8,
//! LF line endings) or binary (raw bytes). The decision is made once per file
//! from its extension, using a table the caller registers up front.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// How file content crosses the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileEncoding {
    /// UTF-8 text, normalized to LF line endings.
    Text,
    /// Raw bytes, carried verbatim.
    Binary,
}

impl fmt::Display for FileEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Classification errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("extension '{extension}' of '{path}' is not registered")]
    UnclassifiedExtension { path: String, extension: String },
}

/// One registered `(extension, encoding)` pair as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionClass {
    pub extension: String,
    pub encoding: FileEncoding,
}

/// Mapping from file extension to [`FileEncoding`].
///
/// Extensions are case-insensitive and stored without a leading dot. The
/// empty string stands for files with no extension at all (`Makefile`).
/// Registering the same extension twice keeps the last encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ExtensionClass>", into = "Vec<ExtensionClass>")]
pub struct ClassificationTable {
    classes: BTreeMap<String, FileEncoding>,
}

impl ClassificationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the encoding for `extension`, overwriting any earlier registration.
    pub fn register(&mut self, extension: &str, encoding: FileEncoding) -> &mut Self {
        self.classes.insert(normalize_extension(extension), encoding);
        self
    }

    /// Register `extension` as text.
    pub fn text(mut self, extension: &str) -> Self {
        self.register(extension, FileEncoding::Text);
        self
    }

    /// Register `extension` as binary.
    pub fn binary(mut self, extension: &str) -> Self {
        self.register(extension, FileEncoding::Binary);
        self
    }

    /// Look up the encoding of `path` by its extension.
    pub fn classify(&self, path: impl AsRef<Path>) -> Result<FileEncoding, ClassifyError> {
        let path = path.as_ref();
        let extension = extension_of(path);
        self.lookup(&extension)
            .ok_or_else(|| ClassifyError::UnclassifiedExtension {
                path: path.to_string_lossy().into_owned(),
                extension,
            })
    }

    /// Encoding registered for an already-extracted extension, if any.
    pub fn lookup(&self, extension: &str) -> Option<FileEncoding> {
        self.classes.get(&normalize_extension(extension)).copied()
    }

    /// Whether `path` would be classified rather than rejected.
    pub fn is_registered(&self, path: impl AsRef<Path>) -> bool {
        self.lookup(&extension_of(path.as_ref())).is_some()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Registered pairs in extension order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, FileEncoding)> {
        self.classes.iter().map(|(ext, enc)| (ext.as_str(), *enc))
    }
}

impl From<Vec<ExtensionClass>> for ClassificationTable {
    fn from(classes: Vec<ExtensionClass>) -> Self {
        let mut table = Self::new();
        for class in classes {
            table.register(&class.extension, class.encoding);
        }
        table
    }
}

impl From<ClassificationTable> for Vec<ExtensionClass> {
    fn from(table: ClassificationTable) -> Self {
        table
            .classes
            .into_iter()
            .map(|(extension, encoding)| ExtensionClass { extension, encoding })
            .collect()
    }
}

/// Extension of the final path component: the text after its last `.`,
/// lower-cased, or the empty string when there is no dot.
pub fn extension_of(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    match name.rfind('.') {
        Some(idx) => name[idx + 1..].to_ascii_lowercase(),
        None => String::new(),
    }
}

fn normalize_extension(extension: &str) -> String {
    extension
        .strip_prefix('.')
        .unwrap_or(extension)
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn firmware_table() -> ClassificationTable {
        ClassificationTable::new()
            .text("")
            .text("lds")
            .text("s")
            .text("c")
            .text("cpp")
            .text("h")
            .binary("bin")
            .binary("elf")
            .text("map")
    }

    #[test]
    fn test_registered_extensions_classify() {
        let table = firmware_table();
        assert_eq!(table.classify("firmware.cpp").unwrap(), FileEncoding::Text);
        assert_eq!(table.classify("out/firmware.bin").unwrap(), FileEncoding::Binary);
        assert_eq!(table.classify("sections.lds").unwrap(), FileEncoding::Text);
    }

    #[test]
    fn test_extensionless_file_uses_empty_key() {
        let table = firmware_table();
        assert_eq!(table.classify("Makefile").unwrap(), FileEncoding::Text);
        // The directory name's dot does not count.
        assert_eq!(table.classify("build.v1/Makefile").unwrap(), FileEncoding::Text);
    }

    #[test]
    fn test_unregistered_extension_fails() {
        let table = firmware_table();
        let err = table.classify("notes.txt").unwrap_err();
        assert_eq!(
            err,
            ClassifyError::UnclassifiedExtension {
                path: "notes.txt".to_string(),
                extension: "txt".to_string(),
            }
        );
    }

    #[test]
    fn test_case_insensitive_and_leading_dot() {
        let mut table = ClassificationTable::new();
        table.register(".BIN", FileEncoding::Binary);
        assert_eq!(table.classify("FIRMWARE.Bin").unwrap(), FileEncoding::Binary);
        assert_eq!(table.lookup("bin"), Some(FileEncoding::Binary));
    }

    #[test]
    fn test_last_registration_wins() {
        let table = ClassificationTable::new().text("dat").binary("dat");
        assert_eq!(table.len(), 1);
        assert_eq!(table.classify("a.dat").unwrap(), FileEncoding::Binary);
    }

    #[test]
    fn test_extension_of_uses_last_dot() {
        assert_eq!(extension_of(Path::new("archive.tar.GZ")), "gz");
        assert_eq!(extension_of(Path::new("dir/noext")), "");
        assert_eq!(extension_of(Path::new(".bashrc")), "bashrc");
    }

    #[test]
    fn test_wire_form_is_pair_list() {
        let table = ClassificationTable::new().text("c").binary("bin");
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"extension": "bin", "encoding": "binary"},
                {"extension": "c", "encoding": "text"}
            ])
        );

        let parsed: ClassificationTable = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, table);
    }
}
