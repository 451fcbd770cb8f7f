//! Output writer: page JSON, shared references, linkable entities, and the lockfile.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::compiler::{CompilationResult, RenderedPage};
use crate::error::Error;
use crate::graph::NodeKind;
use crate::lockfile::LOCKFILE_NAME;

/// Default output directory, relative to the project root.
pub const DEFAULT_OUTPUT_DIR: &str = ".docweave";

/// File listing every rendered reference of the build.
pub const REFERENCES_FILE: &str = "references.json";

/// File other bundles load to link into this one.
pub const LINKABLE_ENTITIES_FILE: &str = "linkable-entities.json";

/// Where a page's JSON lives below `dir`.
///
/// Components are lowercased and path separators inside them escaped, so an
/// operator page such as `/(_:_:)` stays below `dir`.
pub fn page_path(dir: &Path, page: &RenderedPage) -> PathBuf {
    let root = if page.kind == NodeKind::Tutorial { "tutorials" } else { "documentation" };
    let mut path = dir.join("data").join(root);
    let Some((last, parents)) = page.reference.path.split_last() else {
        return path.with_extension("json");
    };
    for component in parents {
        path.push(file_component(component));
    }
    path.push(format!("{}.json", file_component(last)));
    return path;
}

/// One path component as a single file name.
fn file_component(component: &str) -> String {
    return component.to_lowercase().replace('%', "%25").replace('/', "%2F").replace('\\', "%5C");
}

/// Write everything a build produced to `dir`.
///
/// Identical results write identical bytes: pages and maps are already in
/// canonical order.
///
/// # Errors
///
/// Returns `Error::Io` if a file or directory cannot be written,
/// `Error::Json` if a page fails to serialize,
/// or `Error::TomlSer` if the lockfile fails to serialize.
pub fn write(dir: &Path, result: &CompilationResult) -> Result<(), Error> {
    for page in &result.pages {
        write_json(&page_path(dir, page), &page.node)?;
    }
    write_json(&dir.join(REFERENCES_FILE), &result.references)?;
    write_json(&dir.join(LINKABLE_ENTITIES_FILE), &result.linkable_entities)?;
    result.lockfile()?.write(&dir.join(LOCKFILE_NAME))?;

    debug!(pages = result.pages.len(), dir = %dir.display(), "wrote output");
    return Ok(());
}

/// Pretty-print `value` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns `Error::Io` on write failure or `Error::Json` on serialization failure.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    std::fs::write(path, content)?;
    return Ok(());
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::compiler::Compilation;
    use crate::config::Config;
    use crate::fallback::FallbackRegistry;
    use crate::input::{Inputs, MarkupDocument, SymbolGraphFile};
    use crate::lockfile::Lockfile;

    fn result() -> CompilationResult {
        let inputs = Inputs {
            documents: vec![MarkupDocument {
                path: PathBuf::from("GettingStarted.md"),
                source: "# Getting Started\n\nWelcome.\n".into(),
            }],
            symbol_graphs: Vec::new(),
        };
        let config = Config { display_name: Some("Guide".into()), ..Config::default() };
        return Compilation::new(config, &inputs, FallbackRegistry::new()).run().unwrap();
    }

    #[test]
    fn writes_pages_and_indexes() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), &result()).unwrap();

        let page = dir.path().join("data/documentation/guide/gettingstarted.json");
        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(page).unwrap()).unwrap();
        assert_eq!(json["metadata"]["title"], "Getting Started");
        assert!(dir.path().join(REFERENCES_FILE).exists());
        assert!(dir.path().join(LINKABLE_ENTITIES_FILE).exists());
        let lockfile = Lockfile::read(&dir.path().join(LOCKFILE_NAME)).unwrap();
        assert!(lockfile.entries.is_empty());
    }

    #[test]
    fn operator_pages_stay_inside_the_output_dir() {
        let graph = r#"{
            "module": { "name": "MyKit" },
            "symbols": [
                {
                    "identifier": { "precise": "s:Vector", "interfaceLanguage": "swift" },
                    "kind": { "identifier": "swift.struct", "displayName": "Structure" },
                    "pathComponents": ["Vector"],
                    "names": { "title": "Vector" }
                },
                {
                    "identifier": { "precise": "s:Vector.divide", "interfaceLanguage": "swift" },
                    "kind": { "identifier": "swift.func.op", "displayName": "Operator" },
                    "pathComponents": ["Vector", "/(_:_:)"],
                    "names": { "title": "/(_:_:)" }
                }
            ]
        }"#;
        let inputs = Inputs {
            documents: Vec::new(),
            symbol_graphs: vec![SymbolGraphFile::parse(&PathBuf::from("MyKit.symbols.json"), graph).unwrap()],
        };
        let result = Compilation::new(Config::default(), &inputs, FallbackRegistry::new()).run().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let operator = result
            .pages
            .iter()
            .find(|p| return p.reference.path.last().is_some_and(|c| return c == "/(_:_:)"))
            .unwrap();
        let path = page_path(dir.path(), operator);
        assert!(path.starts_with(dir.path()), "{} escapes the output dir", path.display());
        assert_eq!(path.file_name().and_then(|n| return n.to_str()), Some("%2F(_:_:).json"));

        write(dir.path(), &result).unwrap();
        assert!(dir.path().join("data/documentation/mykit/vector/%2F(_:_:).json").exists());
    }

    #[test]
    fn output_is_byte_stable() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write(first.path(), &result()).unwrap();
        write(second.path(), &result()).unwrap();
        for name in [REFERENCES_FILE, LINKABLE_ENTITIES_FILE, LOCKFILE_NAME] {
            assert_eq!(
                std::fs::read(first.path().join(name)).unwrap(),
                std::fs::read(second.path().join(name)).unwrap(),
                "{name}"
            );
        }
    }
}
