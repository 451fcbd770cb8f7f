/// Crate-level error types for docweave builds.
use std::path::PathBuf;

/// Errors that stop an operation. Resolution problems are not errors: they are
/// reported as [`crate::diagnostics::Problem`] values and the build continues.
/// Each variant names the file, reference, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-level error type re-exported as docweave::Error")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configured external bundle was declared twice.
    #[error("external bundle `{bundle_id}` is configured more than once")]
    DuplicateExternalBundle {
        /// Bundle identifier declared twice.
        bundle_id: String,
    },

    /// A referenced input file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON (de)serialization failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// Lockfile exists but cannot be parsed.
    #[error("lockfile corrupt: {reason}")]
    LockfileCorrupt {
        /// Description of the corruption.
        reason: String,
    },

    /// Expected lockfile does not exist on disk.
    #[error("lockfile not found: {}", path.display())]
    LockfileNotFound {
        /// Path to the missing lockfile.
        path: PathBuf,
    },

    /// A markup document could not be turned into a page.
    #[error("malformed document {}: {reason}", path.display())]
    MalformedDocument {
        /// Document that was declined.
        path: PathBuf,
        /// Why the document was declined.
        reason: String,
    },

    /// Link text that cannot be parsed as any reference form.
    #[error("malformed reference `{raw}`: {reason}")]
    MalformedReference {
        /// The link text as written.
        raw: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A symbol description is missing a field the graph needs.
    #[error("malformed symbol `{precise}` in {}: {reason}", path.display())]
    MalformedSymbol {
        /// Symbol graph file containing the symbol.
        path: PathBuf,
        /// Precise identifier of the declined symbol.
        precise: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Tree-sitter failed to parse a markup document.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// A variant patch does not fit the node it is applied to.
    #[error("patch failed at `{pointer}`: {reason}")]
    PatchFailed {
        /// JSON pointer of the failing operation.
        pointer: String,
        /// Why the operation could not be applied.
        reason: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// TOML serialization failed.
    #[error("toml serialize: {0}")]
    TomlSer(
        /// The wrapped TOML serialization error.
        #[from]
        toml::ser::Error,
    ),

    /// A page path names no page in the documentation graph.
    #[error("no page at `{path}`")]
    UnknownPage {
        /// The page path as given.
        path: String,
    },
}
