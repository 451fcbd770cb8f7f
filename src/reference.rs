//! Reference model: unresolved link syntax, resolved identities, and resolution outcomes.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::semantic::Availability;

/// URL scheme used for topic identifiers.
pub const TOPIC_SCHEME: &str = "doc";

/// Path root that topic identifiers carry for reference documentation.
const DOCUMENTATION_ROOT: &str = "documentation";

/// Path root that topic identifiers carry for tutorials.
const TUTORIALS_ROOT: &str = "tutorials";

/// Which surface syntax a link was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceSyntax {
    /// A single bare symbol name such as ``` ``MyClass`` ```.
    Symbol,
    /// A module-qualified or slash-separated path such as ``` ``MyKit/MyClass/init()`` ```.
    Path,
    /// A topic identifier: `doc://bundle/documentation/...` or `<doc:Article>`.
    Topic,
    /// An absolute web URL. Never resolved, only carried through to rendering.
    Url,
}

/// One slash-separated component of a link path, as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathComponent {
    /// The component text including any disambiguation suffix.
    pub raw: String,
}

impl PathComponent {
    /// Every way this component can be read as `name` plus optional suffix.
    ///
    /// The full text comes first so names that contain hyphens (article
    /// slugs, operators) are matched before any split is attempted. Splits
    /// follow from the rightmost hyphen leftwards, which means `init()-method-33vaw`
    /// is tried as `init()-method` + `33vaw` before `init()` + `method-33vaw`.
    pub fn interpretations(&self) -> Vec<(&str, Option<&str>)> {
        let mut readings = vec![(self.raw.as_str(), None)];
        let mut depth = 0_u32;
        let mut split_points = Vec::new();
        for (index, ch) in self.raw.char_indices() {
            match ch {
                '(' | '<' | '[' => depth = depth.saturating_add(1),
                ')' | '>' | ']' => depth = depth.saturating_sub(1),
                '-' if depth == 0 && index > 0 => split_points.push(index),
                _ => {},
            }
        }

        for index in split_points.into_iter().rev() {
            let (name, rest) = self.raw.split_at(index);
            let suffix = rest.trim_start_matches('-');
            if is_disambiguation_suffix(suffix) && !name.is_empty() {
                readings.push((name, Some(suffix)));
            }
        }
        return readings;
    }

    /// The component as a human typed it.
    pub fn display_name(&self) -> &str {
        return self.raw.as_str();
    }
}

/// A cross-reference exactly as written in markup, parsed but not resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnresolvedReference {
    /// True for `/`-prefixed paths and `doc://` identifiers.
    pub absolute: bool,
    /// Bundle named by a `doc://` identifier.
    pub bundle_id: Option<String>,
    /// Path components after scheme and root prefixes are stripped.
    pub components: Vec<PathComponent>,
    /// Heading anchor after `#`, as written.
    pub fragment: Option<String>,
    /// The link text as written, used as the cache key.
    pub raw: String,
    /// Surface syntax of the link.
    pub syntax: ReferenceSyntax,
}

impl UnresolvedReference {
    /// Parse link text into a reference.
    ///
    /// Accepts bare names, slash paths (optionally `/`-prefixed), `doc:` and
    /// `doc://bundle/...` topic identifiers, and absolute URLs.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedReference` for empty links, topic identifiers
    /// without a bundle, or paths without any named component.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(malformed(raw, "empty link"));
        }

        if let Some(rest) = text.strip_prefix("doc://") {
            return parse_topic_identifier(text, rest);
        }

        if let Some(rest) = text.strip_prefix("doc:") {
            let (path, fragment) = split_fragment(rest);
            let components = split_path(path);
            if components.is_empty() {
                return Err(malformed(raw, "topic link names no page"));
            }
            return Ok(Self {
                absolute: path.starts_with('/'),
                bundle_id: None,
                components,
                fragment,
                raw: text.to_string(),
                syntax: ReferenceSyntax::Topic,
            });
        }

        if text.contains("://") || text.starts_with("mailto:") {
            return Ok(Self {
                absolute: true,
                bundle_id: None,
                components: Vec::new(),
                fragment: None,
                raw: text.to_string(),
                syntax: ReferenceSyntax::Url,
            });
        }

        let (path, fragment) = split_fragment(text);
        let components = split_path(path);
        if components.is_empty() {
            return Err(malformed(raw, "link names no symbol"));
        }
        let absolute = path.starts_with('/');
        let syntax = if components.len() == 1 && !absolute {
            ReferenceSyntax::Symbol
        } else {
            ReferenceSyntax::Path
        };

        return Ok(Self {
            absolute,
            bundle_id: None,
            components,
            fragment,
            raw: text.to_string(),
            syntax,
        });
    }

    /// The path as written, without the fragment.
    pub fn display_path(&self) -> String {
        return self
            .components
            .iter()
            .map(PathComponent::display_name)
            .collect::<Vec<_>>()
            .join("/");
    }

    /// First path component, which names a module for qualified links.
    pub fn first_component(&self) -> Option<&str> {
        return self.components.first().map(|c| return c.raw.as_str());
    }

    /// True when the link is a web URL that needs no resolution.
    pub fn is_url(&self) -> bool {
        return self.syntax == ReferenceSyntax::Url;
    }
}

/// Parse the part of a `doc://` identifier after the scheme.
///
/// # Errors
///
/// Returns `Error::MalformedReference` if the bundle identifier is missing.
fn parse_topic_identifier(text: &str, rest: &str) -> Result<UnresolvedReference, Error> {
    let (location, fragment) = split_fragment(rest);
    let (bundle, path) = location.split_once('/').unwrap_or((location, ""));
    if bundle.is_empty() {
        return Err(malformed(text, "topic identifier has no bundle"));
    }

    let mut components = split_path(path);
    let is_root = components
        .first()
        .is_some_and(|c| return c.raw == DOCUMENTATION_ROOT || c.raw == TUTORIALS_ROOT);
    if is_root {
        components.remove(0);
    }

    return Ok(UnresolvedReference {
        absolute: true,
        bundle_id: Some(bundle.to_string()),
        components,
        fragment,
        raw: text.to_string(),
        syntax: ReferenceSyntax::Topic,
    });
}

/// Split `path#fragment`, dropping an empty fragment.
fn split_fragment(text: &str) -> (&str, Option<String>) {
    return match text.split_once('#') {
        None => (text, None),
        Some((path, fragment)) if fragment.is_empty() => (path, None),
        Some((path, fragment)) => (path, Some(fragment.to_string())),
    };
}

/// Split a link path on `/`, ignoring slashes nested in parentheses so operator
/// names such as `/(_:_:)` survive. A slash right after a separator that is
/// followed by an operator character starts an operator name (`Vector//(_:_:)`).
fn split_path(path: &str) -> Vec<PathComponent> {
    let mut components = Vec::new();
    let mut current = String::new();
    let mut depth = 0_u32;
    let mut after_separator = false;
    let mut chars = path.chars().peekable();

    while let Some(ch) = chars.next() {
        let separator = ch == '/' && depth == 0;
        let operator_start =
            separator && after_separator && current.is_empty() && chars.peek().is_some_and(|c| return is_operator_char(*c));
        match ch {
            '(' => {
                depth = depth.saturating_add(1);
                current.push(ch);
            },
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            },
            '/' if operator_start => current.push(ch),
            '/' if separator => {
                if !current.is_empty() {
                    components.push(PathComponent { raw: std::mem::take(&mut current) });
                }
            },
            _ => current.push(ch),
        }
        after_separator = separator && current.is_empty();
    }
    if !current.is_empty() {
        components.push(PathComponent { raw: current });
    }
    return components;
}

/// Characters that can follow the first `/` of an operator name, or open its signature.
fn is_operator_char(ch: char) -> bool {
    return matches!(ch, '(' | '/' | '=' | '<' | '>' | '!' | '&' | '|' | '^' | '~' | '%' | '*' | '+' | '-' | '.' | '?');
}

/// Whether text after a hyphen can be a hash, a kind, or `kind-hash`.
fn is_disambiguation_suffix(suffix: &str) -> bool {
    return !suffix.is_empty()
        && !suffix.starts_with('-')
        && !suffix.ends_with('-')
        && suffix
            .chars()
            .all(|c| return c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');
}

/// Build a malformed-reference error.
fn malformed(raw: &str, reason: &str) -> Error {
    return Error::MalformedReference {
        raw: raw.to_string(),
        reason: reason.to_string(),
    };
}

/// The unique identity of a documentation target after resolution.
///
/// The path is the target's canonical path, so two links that spell a
/// disambiguation suffix differently but select the same node produce equal
/// references. Ordering is by bundle, then path, then fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedReference {
    /// Bundle the target belongs to.
    pub bundle_id: String,
    /// Normalized heading anchor within the target page.
    pub fragment: Option<String>,
    /// Canonical path components, module first.
    pub path: Vec<String>,
}

impl ResolvedReference {
    /// A reference to a whole page.
    pub fn new(bundle_id: impl Into<String>, path: Vec<String>) -> Self {
        return Self {
            bundle_id: bundle_id.into(),
            fragment: None,
            path,
        };
    }

    /// Parse a `doc://` identifier back into a reference.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedReference` if the text is not a topic identifier.
    pub fn from_identifier(identifier: &str) -> Result<Self, Error> {
        let parsed = UnresolvedReference::parse(identifier)?;
        let Some(bundle_id) = parsed.bundle_id else {
            return Err(malformed(identifier, "not a doc:// identifier"));
        };
        let reference = Self::new(
            bundle_id,
            parsed.components.into_iter().map(|c| return c.raw).collect(),
        );
        return Ok(match parsed.fragment {
            Some(fragment) => reference.with_fragment(&fragment),
            None => reference,
        });
    }

    /// The same page with a normalized fragment.
    pub fn with_fragment(&self, fragment: &str) -> Self {
        let slug = slugify(fragment);
        return Self {
            bundle_id: self.bundle_id.clone(),
            fragment: (!slug.is_empty()).then_some(slug),
            path: self.path.clone(),
        };
    }

    /// The containing page when this reference names a fragment.
    pub fn page(&self) -> Self {
        return Self::new(self.bundle_id.clone(), self.path.clone());
    }

    /// The lexical container, or `None` at the module level.
    pub fn parent(&self) -> Option<Self> {
        let (_, ancestors) = self.path.split_last()?;
        if ancestors.is_empty() {
            return None;
        }
        return Some(Self::new(self.bundle_id.clone(), ancestors.to_vec()));
    }

    /// The `/`-joined canonical path.
    pub fn path_string(&self) -> String {
        return self.path.join("/");
    }

    /// The canonical `doc://` identifier used as the identity in rendered output.
    pub fn identifier(&self) -> String {
        let mut id = format!(
            "{TOPIC_SCHEME}://{}/{DOCUMENTATION_ROOT}/{}",
            self.bundle_id,
            self.path_string()
        );
        if let Some(fragment) = &self.fragment {
            id.push('#');
            id.push_str(fragment);
        }
        return id;
    }

    /// The site-relative URL for this reference. Tutorials live under their own root.
    pub fn url(&self, tutorial: bool) -> String {
        let root = if tutorial { TUTORIALS_ROOT } else { DOCUMENTATION_ROOT };
        let mut url = format!("/{root}/{}", self.path_string().to_lowercase());
        if let Some(fragment) = &self.fragment {
            url.push('#');
            url.push_str(fragment);
        }
        return url;
    }
}

impl Ord for ResolvedReference {
    /// Compare by (bundle, path, fragment) for deterministic output ordering.
    fn cmp(&self, other: &Self) -> Ordering {
        return (&self.bundle_id, &self.path, &self.fragment).cmp(&(
            &other.bundle_id,
            &other.path,
            &other.fragment,
        ));
    }
}

impl PartialOrd for ResolvedReference {
    /// Delegate to `Ord` implementation.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl fmt::Display for ResolvedReference {
    /// Display as the canonical identifier.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.identifier());
    }
}

/// Why a reference did not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// More than one target matched at the same scope.
    Ambiguous {
        /// Every matching target, sorted.
        candidates: Vec<ResolvedReference>,
    },
    /// Resolution re-entered itself for the same reference.
    Cyclic,
    /// An external resolver reported the failure.
    External {
        /// Bundle of the resolver that answered.
        bundle_id: String,
    },
    /// No target matched.
    Unresolved,
}

/// A failed resolution. Informational: rendering continues with a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable explanation.
    pub message: String,
    /// Allow-list notice when the target is outside the documented project by design.
    pub note: Option<String>,
    /// The link text as written.
    pub reference: String,
    /// Closest known path, if any is close enough to be useful.
    pub suggestion: Option<String>,
}

impl ResolutionFailure {
    /// A plain "not found" failure.
    pub fn unresolved(reference: &str, message: impl Into<String>) -> Self {
        return Self {
            kind: FailureKind::Unresolved,
            message: message.into(),
            note: None,
            reference: reference.to_string(),
            suggestion: None,
        };
    }

    /// A failure listing the targets that made the reference ambiguous.
    pub fn ambiguous(reference: &str, mut candidates: Vec<ResolvedReference>) -> Self {
        candidates.sort();
        let names = candidates
            .iter()
            .map(ResolvedReference::path_string)
            .collect::<Vec<_>>()
            .join(", ");
        return Self {
            kind: FailureKind::Ambiguous { candidates },
            message: format!("`{reference}` is ambiguous, candidates: {names}"),
            note: None,
            reference: reference.to_string(),
            suggestion: None,
        };
    }

    /// A failure for a reference whose resolution depends on itself.
    pub fn cyclic(reference: &str) -> Self {
        return Self {
            kind: FailureKind::Cyclic,
            message: format!("cyclic resolution of `{reference}`"),
            note: None,
            reference: reference.to_string(),
            suggestion: None,
        };
    }
}

/// Outcome of resolving one reference. Cached as-is, including failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionResult {
    /// The reference names this unique target.
    Success(ResolvedReference),
    /// The reference did not resolve.
    Failure(ResolutionFailure),
}

impl ResolutionResult {
    /// The resolved target, if resolution succeeded.
    pub const fn success(&self) -> Option<&ResolvedReference> {
        return match self {
            Self::Success(reference) => Some(reference),
            Self::Failure(_) => None,
        };
    }
}

/// Rendering-sufficient summary of a target that lives outside the local graph.
///
/// Owned by the resolver that produced it and shared by `Arc`; the graph and
/// the translator never keep their own copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalEntity {
    /// One-sentence summary as plain text.
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    /// Platforms the target is available on.
    #[serde(default)]
    pub availability: Vec<Availability>,
    /// Node kind, e.g. `symbol` or `article`.
    pub kind: String,
    /// Canonical identity of the target.
    pub reference: ResolvedReference,
    /// Finer classification, e.g. the symbol kind.
    #[serde(default)]
    pub role: String,
    /// Display title.
    pub title: String,
    /// Where the rendered target lives.
    pub url: String,
}

/// Convert heading text to a URL-compatible slug.
/// Lowercase, spaces/non-alphanumeric to hyphens, collapse runs, trim edges.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut result = String::with_capacity(lowered.len());
    let mut prev_hyphen = true; // Start true to trim leading hyphens.

    for c in lowered.chars() {
        if c.is_alphanumeric() {
            result.push(c);
            prev_hyphen = false;
            continue;
        }
        if prev_hyphen {
            continue;
        }
        result.push('-');
        prev_hyphen = true;
    }

    if result.ends_with('-') {
        result.pop();
    }
    return result;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_symbol() {
        let reference = UnresolvedReference::parse("MyClass").unwrap();
        assert_eq!(reference.syntax, ReferenceSyntax::Symbol);
        assert!(!reference.absolute);
        assert_eq!(reference.first_component(), Some("MyClass"));
    }

    #[test]
    fn parses_absolute_path_with_fragment() {
        let reference = UnresolvedReference::parse("/MyKit/MyClass#Overview").unwrap();
        assert_eq!(reference.syntax, ReferenceSyntax::Path);
        assert!(reference.absolute);
        assert_eq!(reference.components.len(), 2);
        assert_eq!(reference.fragment.as_deref(), Some("Overview"));
    }

    #[test]
    fn parses_topic_identifier_and_strips_root() {
        let reference =
            UnresolvedReference::parse("doc://com.example.Other/documentation/Other/Thing").unwrap();
        assert_eq!(reference.syntax, ReferenceSyntax::Topic);
        assert_eq!(reference.bundle_id.as_deref(), Some("com.example.Other"));
        assert_eq!(reference.display_path(), "Other/Thing");
    }

    #[test]
    fn operator_slash_stays_inside_component() {
        let reference = UnresolvedReference::parse("Vector//(_:_:)").unwrap();
        let raw: Vec<&str> = reference.components.iter().map(|c| c.raw.as_str()).collect();
        assert_eq!(raw, vec!["Vector", "/(_:_:)"]);
    }

    #[test]
    fn operator_slash_after_absolute_path() {
        let reference = UnresolvedReference::parse("/MyKit/Vector//=(_:_:)").unwrap();
        let raw: Vec<&str> = reference.components.iter().map(|c| c.raw.as_str()).collect();
        assert_eq!(raw, vec!["MyKit", "Vector", "/=(_:_:)"]);
        assert!(reference.absolute);
    }

    #[test]
    fn doubled_separator_before_a_name_is_one_separator() {
        let reference = UnresolvedReference::parse("MyKit//MyClass").unwrap();
        let raw: Vec<&str> = reference.components.iter().map(|c| c.raw.as_str()).collect();
        assert_eq!(raw, vec!["MyKit", "MyClass"]);
    }

    #[test]
    fn urls_are_not_paths() {
        let reference = UnresolvedReference::parse("https://swift.org/documentation").unwrap();
        assert!(reference.is_url());
        assert!(reference.components.is_empty());
    }

    #[test]
    fn empty_link_is_malformed() {
        assert!(matches!(
            UnresolvedReference::parse("  "),
            Err(Error::MalformedReference { .. })
        ));
        assert!(UnresolvedReference::parse("doc:///documentation/Thing").is_err());
    }

    #[test]
    fn component_interpretations_try_full_name_first() {
        let component = PathComponent { raw: "init()-method-33vaw".to_string() };
        let readings = component.interpretations();
        assert_eq!(readings.first(), Some(&("init()-method-33vaw", None)));
        assert!(readings.contains(&("init()-method", Some("33vaw"))));
        assert!(readings.contains(&("init()", Some("method-33vaw"))));
    }

    #[test]
    fn hyphens_inside_parentheses_do_not_split() {
        let component = PathComponent { raw: "-(_:_:)".to_string() };
        assert_eq!(component.interpretations(), vec![("-(_:_:)", None)]);
    }

    #[test]
    fn identifier_round_trips() {
        let reference =
            ResolvedReference::new("com.example.MyKit", vec!["MyKit".into(), "MyClass".into()])
                .with_fragment("Getting Started");
        let parsed = ResolvedReference::from_identifier(&reference.identifier()).unwrap();
        assert_eq!(parsed, reference);
        assert_eq!(reference.url(false), "/documentation/mykit/myclass#getting-started");
    }

    #[test]
    fn parent_stops_at_module() {
        let reference = ResolvedReference::new("b", vec!["M".into(), "A".into()]);
        assert_eq!(reference.parent(), Some(ResolvedReference::new("b", vec!["M".into()])));
        assert_eq!(ResolvedReference::new("b", vec!["M".into()]).parent(), None);
    }

    #[test]
    fn slug_simple_heading() {
        assert_eq!(slugify("Architecture"), "architecture");
    }

    #[test]
    fn slug_special_chars() {
        assert_eq!(slugify("What's New?"), "what-s-new");
    }

    #[test]
    fn slug_consecutive_spaces() {
        assert_eq!(slugify("  Hello   World  "), "hello-world");
    }
}
