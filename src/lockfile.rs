//! External-reference lockfile: parsing, serialization, and ordering enforcement.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::hasher::external_references_checksum;
use crate::reference::ExternalEntity;

/// File name of the lockfile inside the output directory.
pub const LOCKFILE_NAME: &str = "docweave.lock";

/// A single externally resolved reference recorded by a build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockEntry {
    /// The `doc://` identifier of the external target.
    pub identifier: String,
    /// Node kind reported by the owning bundle.
    pub kind: String,
    /// Display title reported by the owning bundle.
    pub title: String,
    /// Where the owning bundle renders the target.
    pub url: String,
}

impl LockEntry {
    /// Record an external entity.
    pub fn from_entity(entity: &ExternalEntity) -> Self {
        return Self {
            identifier: entity.reference.identifier(),
            kind: entity.kind.clone(),
            title: entity.title.clone(),
            url: entity.url.clone(),
        };
    }
}

impl Ord for LockEntry {
    /// Compare entries by identifier for deterministic ordering.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        return self.identifier.cmp(&other.identifier);
    }
}

impl PartialOrd for LockEntry {
    /// Delegate to `Ord` implementation.
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        return Some(self.cmp(other));
    }
}

/// The lockfile as a whole. Entries are sorted by identifier.
/// Constructed only via `Lockfile::new()`, `Lockfile::from_entities()` or
/// `Lockfile::parse()`, all of which enforce sorting and uniqueness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lockfile {
    /// Determinism checksum over the external entities.
    pub checksum: String,
    /// The ordered list of external references.
    #[serde(default)]
    pub entries: Vec<LockEntry>,
}

impl Lockfile {
    /// Create a new lockfile from unsorted entries. Sorts and deduplicates.
    pub fn new(checksum: impl Into<String>, mut entries: Vec<LockEntry>) -> Self {
        entries.sort();
        entries.dedup_by(|a, b| return a.identifier == b.identifier);
        return Self {
            checksum: checksum.into(),
            entries,
        };
    }

    /// Build the lockfile for a set of externally resolved entities.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if an entity cannot be serialized for the checksum.
    pub fn from_entities(entities: &[&ExternalEntity]) -> Result<Self, Error> {
        let checksum = external_references_checksum(entities)?;
        let entries = entities.iter().map(|e| return LockEntry::from_entity(e)).collect();
        return Ok(Self::new(checksum, entries));
    }

    /// Parse a lockfile from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the content is not valid TOML,
    /// or `Error::LockfileCorrupt` if entries are not sorted.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let lockfile: Self = toml::from_str(content)?;
        enforce_lockfile_entry_ordering(&lockfile.entries)?;
        return Ok(lockfile);
    }

    /// Read and parse a lockfile from disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::LockfileNotFound` if the file doesn't exist,
    /// `Error::Io` for other read failures,
    /// `Error::TomlDe` if the content is invalid TOML,
    /// or `Error::LockfileCorrupt` if entries are not sorted.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::LockfileNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Serialize to TOML.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlSer` if serialization fails.
    pub fn serialize(&self) -> Result<String, Error> {
        return Ok(toml::to_string_pretty(self)?);
    }

    /// Write the lockfile to disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlSer` if serialization fails,
    /// or `Error::Io` if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let content = self.serialize()?;
        std::fs::write(path, content)?;
        return Ok(());
    }
}

/// Validate that lockfile entries are strictly sorted.
///
/// # Errors
///
/// Returns `Error::LockfileCorrupt` if any adjacent pair is out of order or repeated.
fn enforce_lockfile_entry_ordering(entries: &[LockEntry]) -> Result<(), Error> {
    for (first, second) in entries.iter().zip(entries.iter().skip(1)) {
        if first >= second {
            return Err(Error::LockfileCorrupt {
                reason: format!("entries not sorted: {} >= {}", first.identifier, second.identifier),
            });
        }
    }
    return Ok(());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ResolvedReference;

    fn entity(path: &[&str], title: &str) -> ExternalEntity {
        let reference = ResolvedReference::new("org.swift.stdlib", path.iter().map(|p| (*p).to_string()).collect());
        return ExternalEntity {
            abstract_text: String::new(),
            availability: Vec::new(),
            kind: "symbol".into(),
            url: reference.url(false),
            reference,
            role: "protocol".into(),
            title: title.into(),
        };
    }

    #[test]
    fn entries_sorted_and_deduplicated() {
        let b = entity(&["Swift", "Hashable"], "Hashable");
        let a = entity(&["Swift", "Equatable"], "Equatable");
        let lockfile = Lockfile::from_entities(&[&b, &a, &b]).unwrap();
        let ids: Vec<&str> = lockfile.entries.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "doc://org.swift.stdlib/documentation/Swift/Equatable",
                "doc://org.swift.stdlib/documentation/Swift/Hashable",
            ]
        );
    }

    #[test]
    fn checksum_ignores_input_order() {
        let a = entity(&["Swift", "Equatable"], "Equatable");
        let b = entity(&["Swift", "Hashable"], "Hashable");
        let forward = Lockfile::from_entities(&[&a, &b]).unwrap();
        let backward = Lockfile::from_entities(&[&b, &a]).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn serialize_then_parse() {
        let a = entity(&["Swift", "Equatable"], "Equatable");
        let lockfile = Lockfile::from_entities(&[&a]).unwrap();
        let text = lockfile.serialize().unwrap();
        assert!(text.starts_with("checksum = "));
        assert_eq!(Lockfile::parse(&text).unwrap(), lockfile);
    }

    #[test]
    fn unsorted_entries_rejected() {
        let content = r#"
checksum = "abc"

[[entries]]
identifier = "doc://b/documentation/Z"
kind = "symbol"
title = "Z"
url = "/documentation/z"

[[entries]]
identifier = "doc://b/documentation/A"
kind = "symbol"
title = "A"
url = "/documentation/a"
"#;
        assert!(matches!(Lockfile::parse(content), Err(Error::LockfileCorrupt { .. })));
    }

    #[test]
    fn missing_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCKFILE_NAME);
        assert!(matches!(Lockfile::read(&path), Err(Error::LockfileNotFound { .. })));
    }
}
