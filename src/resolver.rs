//! Link resolution: turn link text into a canonical reference, once per build.
//!
//! Order for a cache miss: local scopes from the referring page outwards, then
//! the module roots, then the one fallback resolver that claims the link.

use tracing::{debug, trace};

use crate::cache::{CacheKey, ResolutionCache};
use crate::diagnostics::closest_matches;
use crate::fallback::FallbackRegistry;
use crate::graph::{DocumentationGraph, DocumentationNode, Lookup};
use crate::reference::{
    ResolutionFailure, ResolutionResult, ResolvedReference, UnresolvedReference, slugify,
};
use crate::semantic::{LinkDestination, SemanticContent};

/// Where a link was written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolutionContext {
    /// The page containing the link; `None` resolves from the module roots.
    pub referrer: Option<ResolvedReference>,
}

impl ResolutionContext {
    /// A link written on `referrer`.
    pub fn at(referrer: ResolvedReference) -> Self {
        return Self { referrer: Some(referrer.page()) };
    }

    /// A link with no referring page.
    pub fn root() -> Self {
        return Self::default();
    }
}

/// Resolves links against one graph, its fallbacks, and a per-build cache.
#[derive(Debug)]
pub struct LinkResolver<'g> {
    /// Modules that are expected to fail; failures into them get a note.
    allow_list: Vec<String>,
    /// Outcomes for this build.
    cache: ResolutionCache,
    /// External bundles in registration order.
    fallbacks: FallbackRegistry,
    /// The local bundle.
    graph: &'g DocumentationGraph,
}

impl<'g> LinkResolver<'g> {
    /// A resolver with an empty cache.
    pub fn new(graph: &'g DocumentationGraph, fallbacks: FallbackRegistry, allow_list: Vec<String>) -> Self {
        return Self {
            allow_list,
            cache: ResolutionCache::new(),
            fallbacks,
            graph,
        };
    }

    /// The graph links resolve against.
    pub const fn graph(&self) -> &'g DocumentationGraph {
        return self.graph;
    }

    /// The per-build cache.
    pub const fn cache(&self) -> &ResolutionCache {
        return &self.cache;
    }

    /// Registered fallbacks.
    pub const fn fallbacks(&self) -> &FallbackRegistry {
        return &self.fallbacks;
    }

    /// Resolve `reference` as written on the context's page.
    ///
    /// The first outcome stored for a key is returned for every later call,
    /// failures included. Re-entering the same key on the same thread yields
    /// a cyclic failure.
    pub fn resolve(&self, reference: &UnresolvedReference, context: &ResolutionContext) -> ResolutionResult {
        if reference.is_url() {
            return ResolutionResult::Failure(ResolutionFailure::unresolved(
                &reference.raw,
                format!("`{}` is a web URL, not a documentation link", reference.raw),
            ));
        }

        let key = self.cache_key(reference, context);
        if let Some(hit) = self.cache.get(&key) {
            trace!(raw = %reference.raw, "cache hit");
            return hit;
        }

        let Some(_guard) = self.cache.begin(&key) else {
            debug!(raw = %reference.raw, "cyclic resolution");
            return ResolutionResult::Failure(ResolutionFailure::cyclic(&reference.raw));
        };

        let outcome = self.resolve_uncached(reference, context);
        trace!(raw = %reference.raw, resolved = outcome.success().is_some(), "resolved");
        return self.cache.insert(key, outcome);
    }

    /// Resolve every unresolved link of a page in place.
    ///
    /// Web URLs become URL destinations. Returns the failures, in reading order.
    pub fn resolve_page_links(
        &self,
        content: &mut SemanticContent,
        referrer: &ResolvedReference,
    ) -> Vec<ResolutionFailure> {
        let context = ResolutionContext::at(referrer.clone());
        let mut failures = Vec::new();
        content.for_each_link_mut(&mut |link| {
            let LinkDestination::Unresolved(reference) = &link.destination else {
                return;
            };
            link.destination = if reference.is_url() {
                LinkDestination::Url(reference.raw.clone())
            } else {
                match self.resolve(reference, &context) {
                    ResolutionResult::Success(resolved) => LinkDestination::Resolved(resolved),
                    ResolutionResult::Failure(failure) => {
                        failures.push(failure.clone());
                        LinkDestination::Failed(failure)
                    },
                }
            };
        });
        return failures;
    }

    /// Cache key: absolute and topic-identifier links ignore the referrer.
    fn cache_key(&self, reference: &UnresolvedReference, context: &ResolutionContext) -> CacheKey {
        let scope = if reference.absolute || reference.bundle_id.is_some() {
            None
        } else {
            context.referrer.clone()
        };
        return CacheKey {
            bundle_id: self.graph.bundle_id().to_string(),
            raw: reference.raw.clone(),
            scope,
        };
    }

    /// Local lookup, then the claiming fallback, then a not-found failure.
    fn resolve_uncached(&self, reference: &UnresolvedReference, context: &ResolutionContext) -> ResolutionResult {
        let local_bundle = reference
            .bundle_id
            .as_deref()
            .is_none_or(|bundle| return bundle == self.graph.bundle_id());

        let local = if local_bundle { self.resolve_locally(reference, context) } else { None };
        if let Some(outcome) = local {
            return outcome;
        }

        let foreign = !local_bundle
            || reference
                .first_component()
                .is_some_and(|first| return !self.graph.is_local_module(first));
        let claimant = if foreign { self.fallbacks.claimant(reference) } else { None };
        if let Some(fallback) = claimant {
            // One entry per fallback bundle and link text, whatever page wrote it.
            let key = CacheKey {
                bundle_id: fallback.bundle_id().to_string(),
                raw: reference.raw.clone(),
                scope: None,
            };
            return self.cache.get_or_resolve(key, || {
                debug!(raw = %reference.raw, bundle = fallback.bundle_id(), "delegating to fallback");
                return fallback.resolve(reference);
            });
        }

        return self.not_found(reference);
    }

    /// Try each scope from the referrer outwards. `None` when nothing matched anywhere.
    fn resolve_locally(&self, reference: &UnresolvedReference, context: &ResolutionContext) -> Option<ResolutionResult> {
        for scope in self.scopes(reference, context) {
            match self.graph.lookup_components(scope.as_ref(), &reference.components) {
                Lookup::Found(node) => return Some(self.finish(reference, node)),
                Lookup::Ambiguous(candidates) => {
                    return Some(ResolutionResult::Failure(ResolutionFailure::ambiguous(
                        &reference.raw,
                        candidates,
                    )));
                },
                Lookup::NotFound => {},
            }
        }
        return None;
    }

    /// Referrer, each ancestor up to its module, then the roots.
    /// Absolute links skip the referrer chain. A link with no referrer, or an
    /// absolute link that does not start with a module name, also looks inside
    /// each module.
    fn scopes(&self, reference: &UnresolvedReference, context: &ResolutionContext) -> Vec<Option<ResolvedReference>> {
        let mut scopes = Vec::new();
        if !reference.absolute {
            let mut current = context.referrer.clone();
            while let Some(scope) = current {
                current = self.graph.node(&scope).and_then(|n| return n.parent.clone());
                scopes.push(Some(scope));
            }
        }
        scopes.push(None);
        let inside_modules = if reference.absolute {
            reference
                .first_component()
                .is_some_and(|first| return !self.graph.is_local_module(first))
        } else {
            context.referrer.is_none()
        };
        if inside_modules {
            scopes.extend(self.graph.roots().iter().cloned().map(Some));
        }
        return scopes;
    }

    /// Follow redirects and check the fragment of a matched node.
    fn finish(&self, reference: &UnresolvedReference, node: &DocumentationNode) -> ResolutionResult {
        let target = if let SemanticContent::Redirect(redirect) = &node.content {
            trace!(from = %node.reference, to = %redirect.target.raw, "following redirect");
            let context = ResolutionContext::at(node.reference.clone());
            match self.resolve(&redirect.target, &context) {
                ResolutionResult::Success(target) => target.page(),
                failure @ ResolutionResult::Failure(_) => return failure,
            }
        } else {
            node.reference.clone()
        };

        let Some(fragment) = &reference.fragment else {
            return ResolutionResult::Success(target);
        };
        let anchors = self.graph.node(&target).map(|n| return n.content.anchors());
        let known = anchors.is_none_or(|anchors| return anchors.contains(&slugify(fragment)));
        if !known {
            return ResolutionResult::Failure(ResolutionFailure::unresolved(
                &reference.raw,
                format!("`#{fragment}` isn't a heading on `{}`", target.path_string()),
            ));
        }
        return ResolutionResult::Success(target.with_fragment(fragment));
    }

    /// A not-found failure with a note for allow-listed modules, otherwise a suggestion.
    fn not_found(&self, reference: &UnresolvedReference) -> ResolutionResult {
        let written = reference.display_path();
        let mut failure = ResolutionFailure::unresolved(&reference.raw, format!("`{written}` doesn't exist"));

        let allow_listed = reference
            .first_component()
            .filter(|first| return self.allow_list.iter().any(|m| return m == first));
        if let Some(module) = allow_listed {
            failure.note = Some(format!("`{module}` is listed as unresolvable for this project"));
            return ResolutionResult::Failure(failure);
        }

        let depth = reference.components.len();
        let candidates: Vec<String> = self
            .graph
            .human_paths()
            .map(|path| {
                let parts: Vec<&str> = path.split('/').collect();
                let start = parts.len().saturating_sub(depth);
                return parts.get(start..).unwrap_or_default().join("/");
            })
            .collect();
        failure.suggestion = closest_matches(&written, candidates.iter().map(String::as_str))
            .into_iter()
            .next();
        return ResolutionResult::Failure(failure);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::fallback::LinkableEntitiesResolver;
    use crate::hasher::disambiguation_hash;
    use crate::input::{Inputs, MarkupDocument, SymbolGraphFile};
    use crate::reference::{ExternalEntity, FailureKind};

    const GRAPH: &str = r###"{
        "module": { "name": "MyKit" },
        "symbols": [
            {
                "identifier": { "precise": "s:MyClass", "interfaceLanguage": "swift" },
                "kind": { "identifier": "swift.class", "displayName": "Class" },
                "pathComponents": ["MyClass"],
                "names": { "title": "MyClass" },
                "docComment": { "lines": [{ "text": "A class." }, { "text": "" }, { "text": "## Usage" }, { "text": "" }, { "text": "Use it." }] }
            },
            {
                "identifier": { "precise": "s:init.a", "interfaceLanguage": "swift" },
                "kind": { "identifier": "swift.init", "displayName": "Initializer" },
                "pathComponents": ["MyClass", "init()"],
                "names": { "title": "init()" }
            },
            {
                "identifier": { "precise": "s:init.b", "interfaceLanguage": "swift" },
                "kind": { "identifier": "swift.init", "displayName": "Initializer" },
                "pathComponents": ["MyClass", "init()"],
                "names": { "title": "init()" }
            }
        ]
    }"###;

    fn graph(documents: &[(&str, &str)]) -> DocumentationGraph {
        let inputs = Inputs {
            documents: documents
                .iter()
                .map(|(path, source)| MarkupDocument { path: Path::new(path).to_path_buf(), source: (*source).into() })
                .collect(),
            symbol_graphs: vec![SymbolGraphFile::parse(Path::new("MyKit.symbols.json"), GRAPH).unwrap()],
        };
        let config = Config { bundle_id: "com.example.MyKit".into(), ..Config::default() };
        return DocumentationGraph::build(&config, &inputs).0;
    }

    fn parse(raw: &str) -> UnresolvedReference {
        return UnresolvedReference::parse(raw).unwrap();
    }

    fn class_context(graph: &DocumentationGraph) -> ResolutionContext {
        return ResolutionContext::at(graph.node_by_precise("s:MyClass").unwrap().reference.clone());
    }

    #[test]
    fn resolves_relative_then_outward() {
        let graph = graph(&[]);
        let resolver = LinkResolver::new(&graph, FallbackRegistry::new(), Vec::new());
        let context = class_context(&graph);
        let result = resolver.resolve(&parse("MyClass"), &context);
        assert_eq!(result.success().map(ResolvedReference::path_string).as_deref(), Some("MyKit/MyClass"));
    }

    #[test]
    fn overload_needs_suffix() {
        let graph = graph(&[]);
        let resolver = LinkResolver::new(&graph, FallbackRegistry::new(), Vec::new());
        let context = class_context(&graph);

        let ResolutionResult::Failure(failure) = resolver.resolve(&parse("init()"), &context) else {
            panic!("bare overload must be ambiguous");
        };
        assert!(matches!(failure.kind, FailureKind::Ambiguous { ref candidates } if candidates.len() == 2));

        let hash = disambiguation_hash("s:init.b");
        let picked = resolver.resolve(&parse(&format!("init()-{hash}")), &context);
        assert_eq!(picked.success().and_then(|r| r.path.last().cloned()), Some(format!("init()-{hash}")));
    }

    #[test]
    fn fragment_must_name_a_heading() {
        let graph = graph(&[]);
        let resolver = LinkResolver::new(&graph, FallbackRegistry::new(), Vec::new());
        let ok = resolver.resolve(&parse("/MyKit/MyClass#Usage"), &ResolutionContext::root());
        assert_eq!(ok.success().and_then(|r| r.fragment.clone()).as_deref(), Some("usage"));
        let bad = resolver.resolve(&parse("/MyKit/MyClass#Nowhere"), &ResolutionContext::root());
        assert!(bad.success().is_none());
    }

    #[test]
    fn repeated_resolution_hits_the_cache() {
        let graph = graph(&[]);
        let resolver = LinkResolver::new(&graph, FallbackRegistry::new(), Vec::new());
        let first = resolver.resolve(&parse("/MyKit/Nope"), &ResolutionContext::root());
        let second = resolver.resolve(&parse("/MyKit/Nope"), &ResolutionContext::root());
        assert_eq!(first, second);
        assert_eq!(resolver.cache().stats().hits, 1);
    }

    #[test]
    fn suggestion_and_allow_list() {
        let graph = graph(&[]);
        let resolver = LinkResolver::new(&graph, FallbackRegistry::new(), vec!["Foundation".into()]);
        let context = class_context(&graph);

        let ResolutionResult::Failure(typo) = resolver.resolve(&parse("MyClas"), &context) else {
            panic!("typo must fail");
        };
        assert_eq!(typo.suggestion.as_deref(), Some("MyClass"));

        let ResolutionResult::Failure(allowed) = resolver.resolve(&parse("Foundation/URL"), &context) else {
            panic!("allow-listed module must fail");
        };
        assert!(allowed.note.is_some());
        assert!(allowed.suggestion.is_none());
    }

    #[test]
    fn redirect_cycle_terminates() {
        let graph = graph(&[
            ("A.md", "# A\n\n@Redirect(<doc:B>)\n"),
            ("B.md", "# B\n\n@Redirect(<doc:A>)\n"),
        ]);
        let resolver = LinkResolver::new(&graph, FallbackRegistry::new(), Vec::new());
        let ResolutionResult::Failure(failure) = resolver.resolve(&parse("doc:A"), &ResolutionContext::root()) else {
            panic!("redirect loop must fail");
        };
        assert_eq!(failure.kind, FailureKind::Cyclic);
    }

    #[test]
    fn redirect_lands_on_target() {
        let graph = graph(&[
            ("Old.md", "# Old\n\n@Redirect(<doc:New>)\n"),
            ("New.md", "# New\n\nThe new page.\n"),
        ]);
        let resolver = LinkResolver::new(&graph, FallbackRegistry::new(), Vec::new());
        let result = resolver.resolve(&parse("doc:Old"), &ResolutionContext::root());
        assert_eq!(result.success().map(ResolvedReference::path_string).as_deref(), Some("MyKit/New"));
    }

    #[test]
    fn foreign_links_go_to_the_claiming_fallback() {
        let graph = graph(&[("Guide.md", "# Guide\n\nSee ``Other/Thing``.\n")]);
        let reference = ResolvedReference::new("com.example.Other", vec!["Other".into(), "Thing".into()]);
        let entity = ExternalEntity {
            abstract_text: String::new(),
            availability: Vec::new(),
            kind: "symbol".into(),
            url: reference.url(false),
            reference,
            role: "class".into(),
            title: "Thing".into(),
        };
        let other = Arc::new(LinkableEntitiesResolver::new("com.example.Other", vec!["Other".into()], vec![entity]));
        let mut fallbacks = FallbackRegistry::new();
        fallbacks.register(other.clone());
        let resolver = LinkResolver::new(&graph, fallbacks, Vec::new());

        let guide = ResolutionContext::at(ResolvedReference::new(
            "com.example.MyKit",
            vec!["MyKit".into(), "Guide".into()],
        ));
        for context in [class_context(&graph), guide, ResolutionContext::root()] {
            let result = resolver.resolve(&parse("Other/Thing"), &context);
            assert_eq!(result.success().map(|r| r.bundle_id.as_str()), Some("com.example.Other"));
        }
        assert_eq!(other.calls(), 1, "one fallback call per link text, whatever page wrote it");
    }

    #[test]
    fn absolute_link_without_module_looks_inside_modules() {
        let graph = graph(&[("Guide.md", "# Guide\n")]);
        let resolver = LinkResolver::new(&graph, FallbackRegistry::new(), Vec::new());
        let hash = disambiguation_hash("s:init.a");
        let context = ResolutionContext::at(ResolvedReference::new(
            "com.example.MyKit",
            vec!["MyKit".into(), "Guide".into()],
        ));

        let result = resolver.resolve(&parse(&format!("/MyClass/init()-{hash}")), &context);
        let expected = format!("MyKit/MyClass/init()-{hash}");
        assert_eq!(result.success().map(ResolvedReference::path_string), Some(expected));

        let qualified = resolver.resolve(&parse("/MyKit/MyClass"), &context);
        assert_eq!(qualified.success().map(ResolvedReference::path_string).as_deref(), Some("MyKit/MyClass"));
    }
}
