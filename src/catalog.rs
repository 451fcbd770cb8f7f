//! Catalog walking: collect symbol graphs and markup files under a project root.

use std::path::Path;

use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;
use crate::input::{Inputs, MarkupDocument, SymbolGraphFile};

/// Suffix of symbol graph files.
const SYMBOL_GRAPH_SUFFIX: &str = ".symbols.json";

/// Read every symbol graph and markup file under `root`.
/// Applies the config's include/exclude filters. Hidden directories are skipped.
/// Files are returned in path order so builds are reproducible.
///
/// # Errors
///
/// Returns `Error::Io` if a file cannot be read, or `Error::Json` if a
/// symbol graph does not decode.
pub fn load(root: &Path, config: &Config) -> Result<Inputs, Error> {
    let mut inputs = Inputs::default();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| return e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    for entry in walker.filter_map(Result::ok).filter(|e| return e.file_type().is_file()) {
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let relative_str = relative.to_string_lossy();
        if !config.should_include(&relative_str) {
            trace!(path = %relative_str, "excluded by config");
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if name.ends_with(SYMBOL_GRAPH_SUFFIX) {
            inputs.symbol_graphs.push(SymbolGraphFile::load(path)?);
        } else if path.extension().is_some_and(|ext| return ext == "md") {
            inputs.documents.push(MarkupDocument::load(path)?);
        }
    }

    debug!(
        symbol_graphs = inputs.symbol_graphs.len(),
        documents = inputs.documents.len(),
        root = %root.display(),
        "loaded catalog"
    );
    return Ok(inputs);
}
