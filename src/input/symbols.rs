//! Symbol graph input: the machine-extracted API facts for one module.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::semantic::Availability;

/// Symbol kind identifiers the graph knows how to document.
const KNOWN_KINDS: &[&str] = &[
    "associatedtype",
    "case",
    "class",
    "deinit",
    "enum",
    "extension",
    "func",
    "func.op",
    "init",
    "ivar",
    "macro",
    "method",
    "module",
    "property",
    "protocol",
    "struct",
    "subscript",
    "type.method",
    "type.property",
    "type.subscript",
    "typealias",
    "var",
];

/// A symbol graph file as loaded from disk.
#[derive(Debug, Clone)]
pub struct SymbolGraphFile {
    /// The decoded graph.
    pub graph: SymbolGraph,
    /// File the graph was read from, for diagnostics.
    pub path: PathBuf,
}

impl SymbolGraphFile {
    /// Read and decode a `*.symbols.json` file.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the file is missing, `Error::Io` for
    /// other read failures, or `Error::Json` if the content does not decode.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(path, &content);
    }

    /// Decode symbol graph JSON that was read elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if the content does not decode.
    pub fn parse(path: &Path, content: &str) -> Result<Self, Error> {
        let graph: SymbolGraph = serde_json::from_str(content)?;
        return Ok(Self { graph, path: path.to_path_buf() });
    }
}

/// The subset of the symbol graph format the compiler reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolGraph {
    /// Module the symbols belong to.
    pub module: ModuleInfo,
    /// Edges between symbols.
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    /// Declared symbols.
    #[serde(default)]
    pub symbols: Vec<SymbolDescription>,
}

/// Module metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Module name; becomes the first path component of every symbol.
    pub name: String,
}

/// One symbol's extracted facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolDescription {
    /// Per-platform availability.
    #[serde(default)]
    pub availability: Vec<AvailabilityItem>,
    /// Declaration tokens; their spellings concatenate to the declaration.
    #[serde(default)]
    pub declaration_fragments: Vec<DeclarationFragment>,
    /// In-source documentation comment.
    #[serde(default)]
    pub doc_comment: Option<DocComment>,
    /// Unique identity.
    pub identifier: SymbolIdentifier,
    /// Kind of declaration.
    pub kind: SymbolKindInfo,
    /// Display names.
    pub names: SymbolNames,
    /// Path from the module to this symbol, one entry per nesting level.
    #[serde(default)]
    pub path_components: Vec<String>,
}

impl SymbolDescription {
    /// Declaration text in this symbol's interface language.
    pub fn declaration(&self) -> String {
        return self
            .declaration_fragments
            .iter()
            .map(|f| return f.spelling.as_str())
            .collect();
    }

    /// Documentation comment text, one line per source line.
    pub fn doc_comment_text(&self) -> Option<String> {
        let comment = self.doc_comment.as_ref()?;
        let lines: Vec<&str> = comment.lines.iter().map(|l| return l.text.as_str()).collect();
        return Some(lines.join("\n"));
    }

    /// Platform availability in semantic form.
    pub fn availability(&self) -> Vec<Availability> {
        return self
            .availability
            .iter()
            .map(|item| {
                return Availability {
                    deprecated: item.deprecated.clone(),
                    introduced: item.introduced.clone(),
                    platform: item.domain.clone(),
                };
            })
            .collect();
    }

    /// Check that the symbol carries what the graph needs to place it.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedSymbol` for an empty path, empty title, or an
    /// unknown kind.
    pub fn validate(&self, file: &Path) -> Result<(), Error> {
        let reason = if self.path_components.is_empty() {
            Some("symbol has no path components".to_string())
        } else if self.path_components.iter().any(|c| return c.trim().is_empty()) {
            Some("symbol path has an empty component".to_string())
        } else if self.names.title.trim().is_empty() {
            Some("symbol has no title".to_string())
        } else if !KNOWN_KINDS.contains(&self.kind.identifier()) {
            Some(format!("unknown symbol kind `{}`", self.kind.identifier))
        } else {
            None
        };

        return match reason {
            None => Ok(()),
            Some(reason) => Err(Error::MalformedSymbol {
                path: file.to_path_buf(),
                precise: self.identifier.precise.clone(),
                reason,
            }),
        };
    }
}

/// Availability record as written in the symbol graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityItem {
    /// Version that deprecated the symbol.
    #[serde(default)]
    pub deprecated: Option<String>,
    /// Platform name.
    pub domain: String,
    /// Version that introduced the symbol.
    #[serde(default)]
    pub introduced: Option<String>,
}

/// One token of a declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarationFragment {
    /// Token text.
    pub spelling: String,
}

/// Documentation comment lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocComment {
    /// Lines without comment markers.
    #[serde(default)]
    pub lines: Vec<DocCommentLine>,
}

/// A single comment line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocCommentLine {
    /// Line text.
    pub text: String,
}

/// Symbol identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolIdentifier {
    /// Language the symbol is presented in, e.g. `swift` or `occ`.
    pub interface_language: String,
    /// Compiler-unique identifier encoding the full signature.
    pub precise: String,
}

/// Symbol kind as written in the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolKindInfo {
    /// Human-readable kind.
    pub display_name: String,
    /// Kind identifier, possibly language-prefixed (`swift.method`).
    pub identifier: String,
}

impl SymbolKindInfo {
    /// The kind identifier without its language prefix.
    pub fn identifier(&self) -> &str {
        let unprefixed = ["swift.", "objc.", "c.", "cpp."]
            .iter()
            .find_map(|prefix| return self.identifier.strip_prefix(prefix));
        return unprefixed.unwrap_or(&self.identifier);
    }
}

/// Display names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolNames {
    /// Page title.
    pub title: String,
}

/// An edge between two symbols.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    /// Edge kind, e.g. `memberOf`, `conformsTo`, `inheritsFrom`.
    pub kind: String,
    /// Precise identifier of the source symbol.
    pub source: String,
    /// Precise identifier of the target symbol.
    pub target: String,
    /// Human path of the target when it is not in this graph.
    #[serde(default)]
    pub target_fallback: Option<String>,
}
