use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;

/// Name of the configuration file looked up in the catalog root.
pub const CONFIG_FILE: &str = ".docweave.toml";

/// Interface language used when a config file does not name one.
const DEFAULT_LANGUAGE: &str = "swift";

/// Bundle identifier used when a config file does not name one.
const DEFAULT_BUNDLE_ID: &str = "com.example.documentation";

/// Project configuration loaded from `.docweave.toml`.
/// Include/exclude patterns are path prefixes applied to catalog files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Identifier of the bundle being built; the host of every local `doc://` identifier.
    #[serde(default = "default_bundle_id")]
    pub bundle_id: String,
    /// Title used for the root page when no symbol graph names a module.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Interface language that becomes primary when a symbol has several.
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Path prefixes relative to the catalog root to exclude.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Other bundles whose pages may be linked.
    #[serde(default)]
    pub external: Vec<ExternalBundle>,
    /// Path prefixes relative to the catalog root to include. Empty means all.
    #[serde(default)]
    pub include: Vec<String>,
    /// Modules that are known to be undocumented here. Links into them get a note
    /// instead of a suggestion.
    #[serde(default)]
    pub unresolvable: Vec<String>,
}

/// Another bundle's published link targets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalBundle {
    /// Media the other bundle serves, as `name = "url"`.
    #[serde(default)]
    pub assets: BTreeMap<String, String>,
    /// Identifier of the other bundle.
    pub bundle_id: String,
    /// Path to that bundle's `linkable-entities.json`, relative to the catalog root.
    pub entities: PathBuf,
    /// Module names the other bundle documents.
    #[serde(default)]
    pub modules: Vec<String>,
}

/// Serde default for `bundle_id`.
fn default_bundle_id() -> String {
    return DEFAULT_BUNDLE_ID.to_string();
}

/// Serde default for `default_language`.
fn default_language() -> String {
    return DEFAULT_LANGUAGE.to_string();
}

impl Default for Config {
    /// Include everything, exclude nothing, no external bundles.
    fn default() -> Self {
        return Self {
            bundle_id: default_bundle_id(),
            display_name: None,
            default_language: default_language(),
            exclude: Vec::new(),
            external: Vec::new(),
            include: Vec::new(),
            unresolvable: Vec::new(),
        };
    }
}

impl Config {
    /// Load config from `.docweave.toml` in the given root directory.
    /// Returns the default if the file doesn't exist. A file that exists but
    /// is malformed is an error, never a silent fallback.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed,
    /// or `Error::DuplicateExternalBundle` if a bundle is listed twice.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
        };
        return Self::parse(&content);
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed,
    /// or `Error::DuplicateExternalBundle` if a bundle is listed twice.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(content)?;
        let mut seen = HashSet::new();
        for external in &config.external {
            if !seen.insert(external.bundle_id.as_str()) {
                return Err(Error::DuplicateExternalBundle {
                    bundle_id: external.bundle_id.clone(),
                });
            }
        }
        return Ok(config);
    }

    /// Title of the root page when no module supplies one.
    pub fn display_name(&self) -> &str {
        return self.display_name.as_deref().unwrap_or(&self.bundle_id);
    }

    /// Check whether a catalog file should be read.
    ///
    /// A path is included if no include patterns are set,
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_include(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }

    /// Whether links into `module` are expected to fail.
    pub fn is_unresolvable(&self, module: &str) -> bool {
        return self.unresolvable.iter().any(|m| return m == module);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.should_include("anything.md"));
    }

    #[test]
    fn parses_externals_and_filters() {
        let config = Config::parse(
            r#"
bundle_id = "com.example.MyKit"
display_name = "MyKit"
include = ["Docs/"]
exclude = ["Docs/Drafts/"]
unresolvable = ["Foundation"]

[[external]]
bundle_id = "com.example.Other"
entities = "other/linkable-entities.json"
modules = ["Other"]

[external.assets]
"logo.png" = "/images/other/logo.png"
"#,
        )
        .unwrap();
        assert_eq!(config.bundle_id, "com.example.MyKit");
        assert_eq!(config.default_language, "swift");
        assert!(config.should_include("Docs/Guide.md"));
        assert!(!config.should_include("Docs/Drafts/Wip.md"));
        assert!(!config.should_include("Other/Guide.md"));
        assert!(config.is_unresolvable("Foundation"));
        let external = config.external.first().unwrap();
        assert_eq!(external.modules, vec!["Other"]);
        assert_eq!(external.assets.get("logo.png").map(String::as_str), Some("/images/other/logo.png"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "include = 3").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(Error::TomlDe(_))));
    }

    #[test]
    fn duplicate_external_bundle_is_an_error() {
        let result = Config::parse(
            r#"
[[external]]
bundle_id = "a"
entities = "a.json"

[[external]]
bundle_id = "a"
entities = "b.json"
"#,
        );
        assert!(matches!(result, Err(Error::DuplicateExternalBundle { .. })));
    }
}
