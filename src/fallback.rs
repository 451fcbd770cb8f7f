//! Fallback resolvers: answer links into bundles this build does not contain.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::Error;
use crate::reference::{
    ExternalEntity, FailureKind, ResolutionFailure, ResolutionResult, ResolvedReference,
    UnresolvedReference,
};

/// A media or download file another bundle provides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    /// Name the asset was requested by.
    pub name: String,
    /// Where the asset is served.
    pub url: String,
}

/// Resolves references into one external bundle.
///
/// Implementations must be pure for a given input: the link resolver may call
/// `resolve` for the same reference from two threads at once and keeps
/// whichever result it caches first.
pub trait FallbackResolver: Send + Sync {
    /// The bundle this resolver answers for.
    fn bundle_id(&self) -> &str;

    /// Whether links whose first component is `module` belong to this bundle.
    fn covers_module(&self, _module: &str) -> bool {
        return false;
    }

    /// Resolve a reference that local resolution could not.
    fn resolve(&self, reference: &UnresolvedReference) -> ResolutionResult;

    /// Summary of a reference this resolver resolved earlier. Never resolves.
    fn entity_if_previously_resolved(&self, reference: &ResolvedReference) -> Option<Arc<ExternalEntity>>;

    /// Look up a media asset by name.
    fn resolve_asset(&self, _name: &str) -> Option<Asset> {
        return None;
    }
}

/// Registered fallback resolvers, in registration order.
#[derive(Default, Clone)]
pub struct FallbackRegistry {
    /// Resolvers; earlier registrations win when two claim the same link.
    resolvers: Vec<Arc<dyn FallbackResolver>>,
}

impl std::fmt::Debug for FallbackRegistry {
    /// List the bundle identifiers.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bundles: Vec<&str> = self.resolvers.iter().map(|r| return r.bundle_id()).collect();
        return f.debug_struct("FallbackRegistry").field("bundles", &bundles).finish();
    }
}

impl FallbackRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Add a resolver after every existing one.
    pub fn register(&mut self, resolver: Arc<dyn FallbackResolver>) {
        debug!(bundle = resolver.bundle_id(), "registered fallback resolver");
        self.resolvers.push(resolver);
    }

    /// Whether no resolver is registered.
    pub fn is_empty(&self) -> bool {
        return self.resolvers.is_empty();
    }

    /// The first resolver that claims `reference`, by bundle identifier for
    /// topic links or by module name for paths. It is authoritative.
    pub fn claimant(&self, reference: &UnresolvedReference) -> Option<&dyn FallbackResolver> {
        let claimed = match (&reference.bundle_id, reference.first_component()) {
            (Some(bundle), _) => self.resolvers.iter().find(|r| return r.bundle_id() == bundle),
            (None, Some(module)) => self.resolvers.iter().find(|r| return r.covers_module(module)),
            (None, None) => None,
        };
        return claimed.map(|r| return r.as_ref());
    }

    /// The resolver for a bundle identifier.
    pub fn for_bundle(&self, bundle_id: &str) -> Option<&dyn FallbackResolver> {
        return self
            .resolvers
            .iter()
            .find(|r| return r.bundle_id() == bundle_id)
            .map(|r| return r.as_ref());
    }

    /// Summary of an external reference resolved earlier in this build.
    pub fn entity(&self, reference: &ResolvedReference) -> Option<Arc<ExternalEntity>> {
        return self
            .for_bundle(&reference.bundle_id)
            .and_then(|r| return r.entity_if_previously_resolved(reference));
    }

    /// The first asset any resolver provides for `name`.
    pub fn asset(&self, name: &str) -> Option<Asset> {
        return self.resolvers.iter().find_map(|r| return r.resolve_asset(name));
    }
}

/// A fallback backed by another build's `linkable-entities.json`.
///
/// Links must name the other bundle's canonical paths, suffixes included.
#[derive(Debug)]
pub struct LinkableEntitiesResolver {
    /// Media the other bundle publishes, by name.
    assets: BTreeMap<String, Asset>,
    /// Bundle the entities belong to.
    bundle_id: String,
    /// Calls to `resolve`, for tests and logging.
    calls: AtomicUsize,
    /// Every published entity by canonical path.
    entities: BTreeMap<Vec<String>, Arc<ExternalEntity>>,
    /// Module names this bundle documents.
    modules: Vec<String>,
    /// Entities handed out by `resolve`.
    resolved: RwLock<BTreeMap<ResolvedReference, Arc<ExternalEntity>>>,
}

impl LinkableEntitiesResolver {
    /// A resolver over entities already in memory. Entities from other
    /// bundles are ignored.
    pub fn new(bundle_id: impl Into<String>, modules: Vec<String>, entities: Vec<ExternalEntity>) -> Self {
        let bundle_id = bundle_id.into();
        let entities = entities
            .into_iter()
            .filter(|e| return e.reference.bundle_id == bundle_id)
            .map(|e| return (e.reference.path.clone(), Arc::new(e)))
            .collect();
        return Self {
            assets: BTreeMap::new(),
            bundle_id,
            calls: AtomicUsize::new(0),
            entities,
            modules,
            resolved: RwLock::new(BTreeMap::new()),
        };
    }

    /// Read a `linkable-entities.json` file.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the file is missing, `Error::Io` for
    /// other read failures, or `Error::Json` if it does not decode.
    pub fn load(bundle_id: &str, modules: Vec<String>, path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        let entities: Vec<ExternalEntity> = serde_json::from_str(&content)?;
        debug!(bundle = bundle_id, count = entities.len(), path = %path.display(), "loaded linkable entities");
        return Ok(Self::new(bundle_id, modules, entities));
    }

    /// Add media the other bundle serves, as `name -> url` pairs.
    #[must_use]
    pub fn with_assets(mut self, assets: impl IntoIterator<Item = (String, String)>) -> Self {
        for (name, url) in assets {
            self.assets.insert(name.clone(), Asset { name, url });
        }
        return self;
    }

    /// How many times `resolve` has been called.
    pub fn calls(&self) -> usize {
        return self.calls.load(Ordering::Relaxed);
    }

    /// Failure reported by this resolver.
    fn failure(&self, reference: &UnresolvedReference) -> ResolutionResult {
        return ResolutionResult::Failure(ResolutionFailure {
            kind: FailureKind::External { bundle_id: self.bundle_id.clone() },
            message: format!("`{}` doesn't exist in {}", reference.display_path(), self.bundle_id),
            note: None,
            reference: reference.raw.clone(),
            suggestion: None,
        });
    }
}

impl FallbackResolver for LinkableEntitiesResolver {
    fn bundle_id(&self) -> &str {
        return &self.bundle_id;
    }

    fn covers_module(&self, module: &str) -> bool {
        return self.modules.iter().any(|m| return m == module);
    }

    fn resolve(&self, reference: &UnresolvedReference) -> ResolutionResult {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let path: Vec<String> = reference.components.iter().map(|c| return c.raw.clone()).collect();
        let Some(entity) = self.entities.get(&path) else {
            trace!(bundle = %self.bundle_id, path = %reference.display_path(), "external miss");
            return self.failure(reference);
        };

        let page = entity.reference.clone();
        self.resolved.write().entry(page.clone()).or_insert_with(|| return Arc::clone(entity));
        return ResolutionResult::Success(match &reference.fragment {
            Some(fragment) => page.with_fragment(fragment),
            None => page,
        });
    }

    fn entity_if_previously_resolved(&self, reference: &ResolvedReference) -> Option<Arc<ExternalEntity>> {
        return self.resolved.read().get(&reference.page()).cloned();
    }

    fn resolve_asset(&self, name: &str) -> Option<Asset> {
        return self.assets.get(name).cloned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(path: &[&str]) -> ExternalEntity {
        let reference =
            ResolvedReference::new("com.example.Other", path.iter().map(|p| (*p).to_string()).collect());
        return ExternalEntity {
            abstract_text: "Other things.".into(),
            availability: Vec::new(),
            kind: "symbol".into(),
            url: reference.url(false),
            reference,
            role: "class".into(),
            title: (*path.last().unwrap()).to_string(),
        };
    }

    fn resolver() -> LinkableEntitiesResolver {
        return LinkableEntitiesResolver::new(
            "com.example.Other",
            vec!["Other".into()],
            vec![entity(&["Other"]), entity(&["Other", "Thing"])],
        );
    }

    #[test]
    fn resolves_known_path_and_remembers_entity() {
        let resolver = resolver();
        let reference = UnresolvedReference::parse("Other/Thing#Usage").unwrap();
        let ResolutionResult::Success(resolved) = resolver.resolve(&reference) else {
            panic!("expected success");
        };
        assert_eq!(resolved.fragment.as_deref(), Some("usage"));
        assert_eq!(resolver.entity_if_previously_resolved(&resolved).unwrap().title, "Thing");
        assert_eq!(resolver.calls(), 1);
    }

    #[test]
    fn unknown_path_is_an_external_failure() {
        let resolver = resolver();
        let reference = UnresolvedReference::parse("Other/Nope").unwrap();
        let ResolutionResult::Failure(failure) = resolver.resolve(&reference) else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::External { bundle_id: "com.example.Other".into() });
    }

    #[test]
    fn entity_is_not_available_before_resolution() {
        let resolver = resolver();
        let reference = ResolvedReference::new("com.example.Other", vec!["Other".into(), "Thing".into()]);
        assert!(resolver.entity_if_previously_resolved(&reference).is_none());
    }

    #[test]
    fn registry_claims_by_bundle_then_module() {
        let mut registry = FallbackRegistry::new();
        registry.register(Arc::new(resolver()));
        let topic = UnresolvedReference::parse("doc://com.example.Other/documentation/Other/Thing").unwrap();
        assert!(registry.claimant(&topic).is_some());
        let path = UnresolvedReference::parse("Other/Thing").unwrap();
        assert!(registry.claimant(&path).is_some());
        let local = UnresolvedReference::parse("MyKit/MyClass").unwrap();
        assert!(registry.claimant(&local).is_none());
        assert!(registry.asset("logo.png").is_none());
    }

    #[test]
    fn assets_come_from_the_first_resolver_that_has_them() {
        let mut registry = FallbackRegistry::new();
        registry.register(Arc::new(
            resolver().with_assets([("logo.png".to_string(), "/images/other/logo.png".to_string())]),
        ));
        let stdlib = LinkableEntitiesResolver::new("org.swift.stdlib", vec!["Swift".into()], Vec::new())
            .with_assets([
                ("logo.png".to_string(), "/images/swift/logo.png".to_string()),
                ("swift.svg".to_string(), "/images/swift/swift.svg".to_string()),
            ]);
        registry.register(Arc::new(stdlib));

        assert_eq!(registry.asset("logo.png").map(|a| a.url), Some("/images/other/logo.png".to_string()));
        assert_eq!(registry.asset("swift.svg").map(|a| a.name), Some("swift.svg".to_string()));
        assert!(registry.asset("missing.png").is_none());
    }

    #[test]
    fn load_reads_linkable_entities_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linkable-entities.json");
        std::fs::write(&path, serde_json::to_string(&vec![entity(&["Other"])]).unwrap()).unwrap();
        let resolver = LinkableEntitiesResolver::load("com.example.Other", Vec::new(), &path).unwrap();
        assert!(matches!(
            resolver.resolve(&UnresolvedReference::parse("doc://com.example.Other/documentation/Other").unwrap()),
            ResolutionResult::Success(_)
        ));
        assert!(LinkableEntitiesResolver::load("x", Vec::new(), &dir.path().join("missing.json")).is_err());
    }
}
