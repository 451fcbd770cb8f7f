//! Compilation driver: graph, then every page resolved and translated in parallel.

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info_span, trace, warn};

use crate::cache::CacheStats;
use crate::config::Config;
use crate::diagnostics::Problem;
use crate::error::Error;
use crate::fallback::FallbackRegistry;
use crate::graph::{DocumentationGraph, DocumentationNode, NodeKind};
use crate::input::Inputs;
use crate::lockfile::Lockfile;
use crate::reference::{ExternalEntity, ResolvedReference};
use crate::render::node::{RenderNode, RenderReference, RenderReferenceIdentifier};
use crate::render::store::ReferenceStore;
use crate::render::translator::RenderTranslator;
use crate::render::variant;
use crate::resolver::LinkResolver;
use crate::semantic::{LinkDestination, SemanticContent};

/// One rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Node category; decides the output directory.
    pub kind: NodeKind,
    /// Page JSON.
    pub node: RenderNode,
    /// Canonical identity of the page.
    pub reference: ResolvedReference,
}

/// Everything a build produces.
#[derive(Debug, Clone)]
pub struct CompilationResult {
    /// Resolution cache counters for the whole build.
    pub cache_stats: CacheStats,
    /// Determinism checksum over externally resolved references.
    pub checksum: String,
    /// Summaries of every external target pages link to, by reference.
    pub external_entities: Vec<Arc<ExternalEntity>>,
    /// Summaries other bundles use to link into this one.
    pub linkable_entities: Vec<ExternalEntity>,
    /// Rendered pages in canonical order. Redirects are not rendered.
    pub pages: Vec<RenderedPage>,
    /// Graph problems first, then page problems in page order.
    pub problems: Vec<Problem>,
    /// The reference store's final contents.
    pub references: BTreeMap<RenderReferenceIdentifier, RenderReference>,
}

impl CompilationResult {
    /// The page rendered for `reference`.
    pub fn page(&self, reference: &ResolvedReference) -> Option<&RenderedPage> {
        return self.pages.iter().find(|p| return &p.reference == reference);
    }

    /// The lockfile recording this build's external references.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if an entity cannot be serialized for the checksum.
    pub fn lockfile(&self) -> Result<Lockfile, Error> {
        let entities: Vec<&ExternalEntity> = self.external_entities.iter().map(AsRef::as_ref).collect();
        return Lockfile::from_entities(&entities);
    }
}

/// Output of one page build.
struct PageOutput {
    /// External targets the page links to.
    external: Vec<ResolvedReference>,
    /// The rendered page.
    page: RenderedPage,
    /// Link failures and patch errors.
    problems: Vec<Problem>,
}

/// A build over one bundle's inputs.
#[derive(Debug)]
pub struct Compilation {
    /// Build configuration.
    config: Config,
    /// External bundles, registered before the build.
    fallbacks: FallbackRegistry,
    /// The bundle's pages; read-only once built.
    graph: DocumentationGraph,
    /// Problems found while building the graph.
    problems: Vec<Problem>,
}

impl Compilation {
    /// Build the documentation graph for `inputs`.
    pub fn new(config: Config, inputs: &Inputs, fallbacks: FallbackRegistry) -> Self {
        let (graph, problems) = DocumentationGraph::build(&config, inputs);
        return Self { config, fallbacks, graph, problems };
    }

    /// The documentation graph.
    pub const fn graph(&self) -> &DocumentationGraph {
        return &self.graph;
    }

    /// Problems found while building the graph.
    pub fn graph_problems(&self) -> &[Problem] {
        return &self.problems;
    }

    /// A link resolver over this build's graph and fallbacks with a fresh cache.
    pub fn resolver(&self) -> LinkResolver<'_> {
        return LinkResolver::new(&self.graph, self.fallbacks.clone(), self.config.unresolvable.clone());
    }

    /// Resolve and translate every page.
    ///
    /// Pages build in parallel and share one resolution cache and one
    /// reference store. Output order is canonical regardless of scheduling.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if the external reference checksum cannot be computed.
    pub fn run(&self) -> Result<CompilationResult, Error> {
        let _span = info_span!("compile", bundle = self.graph.bundle_id()).entered();
        let resolver = self.resolver();
        let store = ReferenceStore::new();
        let translator =
            RenderTranslator::new(&self.graph, resolver.fallbacks(), &store, &self.config.default_language);

        let nodes: Vec<&DocumentationNode> =
            self.graph.nodes().filter(|n| return n.kind != NodeKind::Redirect).collect();
        debug!(pages = nodes.len(), "translating pages");

        let outputs: Vec<PageOutput> = nodes
            .par_iter()
            .map(|node| return build_page(&resolver, &translator, node))
            .collect();

        let mut problems = self.problems.clone();
        let mut pages = Vec::with_capacity(outputs.len());
        let mut external: BTreeMap<ResolvedReference, Arc<ExternalEntity>> = BTreeMap::new();
        for output in outputs {
            problems.extend(output.problems);
            for reference in output.external {
                if let Some(entity) = resolver.fallbacks().entity(&reference) {
                    external.entry(reference).or_insert(entity);
                }
            }
            pages.push(output.page);
        }

        let external_entities: Vec<Arc<ExternalEntity>> = external.into_values().collect();
        let entity_refs: Vec<&ExternalEntity> = external_entities.iter().map(AsRef::as_ref).collect();
        let checksum = crate::hasher::external_references_checksum(&entity_refs)?;

        let cache_stats = resolver.cache().stats();
        debug!(
            pages = pages.len(),
            problems = problems.len(),
            references = store.len(),
            external = external_entities.len(),
            hits = cache_stats.hits,
            misses = cache_stats.misses,
            "compiled bundle"
        );

        return Ok(CompilationResult {
            cache_stats,
            checksum,
            external_entities,
            linkable_entities: self.graph.linkable_entities(),
            pages,
            problems,
            references: store.snapshot(),
        });
    }
}

/// Resolve one page's links, translate it, and attach its language variants.
fn build_page(resolver: &LinkResolver<'_>, translator: &RenderTranslator<'_>, node: &DocumentationNode) -> PageOutput {
    let identifier = node.reference.identifier();
    let mut content = node.content.clone();
    let failures = resolver.resolve_page_links(&mut content, &node.reference);
    let mut problems: Vec<Problem> = failures
        .iter()
        .map(|failure| {
            let problem = Problem::from_failure(failure, identifier.clone());
            return match &node.source {
                Some(source) => problem.with_source(source),
                None => problem,
            };
        })
        .collect();

    let external = external_targets(&mut content, resolver.graph().bundle_id());
    let mut render = translator.translate(node, &content);

    if let SemanticContent::Symbol(symbol) = &content {
        match variant::language_overrides(&render, symbol) {
            Ok(overrides) => render.variant_overrides = overrides,
            Err(e) => {
                warn!(page = %identifier, error = %e, "dropping language variants");
                problems.push(Problem::warning(format!("language variants dropped: {e}")).with_page(identifier.clone()));
            },
        }
    }

    trace!(page = %identifier, failures = failures.len(), "built page");
    return PageOutput {
        external,
        page: RenderedPage {
            kind: node.kind,
            node: render,
            reference: node.reference.clone(),
        },
        problems,
    };
}

/// Resolved link targets outside the local bundle, as page references.
fn external_targets(content: &mut SemanticContent, local_bundle: &str) -> Vec<ResolvedReference> {
    let mut found = Vec::new();
    content.for_each_link_mut(&mut |link| {
        let LinkDestination::Resolved(reference) = &link.destination else {
            return;
        };
        if reference.bundle_id != local_bundle {
            found.push(reference.page());
        }
    });
    return found;
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::fallback::LinkableEntitiesResolver;
    use crate::input::{MarkupDocument, SymbolGraphFile};

    const GRAPH: &str = r#"{
        "module": { "name": "MyKit" },
        "symbols": [
            {
                "identifier": { "precise": "c:objc(cs)MyClass", "interfaceLanguage": "swift" },
                "kind": { "identifier": "swift.class", "displayName": "Class" },
                "pathComponents": ["MyClass"],
                "names": { "title": "MyClass" },
                "declarationFragments": [{ "spelling": "class MyClass" }],
                "docComment": { "lines": [{ "text": "A class. See <doc:Swift/Equatable>." }] }
            },
            {
                "identifier": { "precise": "c:objc(cs)MyClass", "interfaceLanguage": "occ" },
                "kind": { "identifier": "swift.class", "displayName": "Class" },
                "pathComponents": ["MyClass"],
                "names": { "title": "MYClass" },
                "declarationFragments": [{ "spelling": "@interface MYClass" }]
            }
        ]
    }"#;

    fn inputs() -> Inputs {
        return Inputs {
            documents: vec![MarkupDocument {
                path: PathBuf::from("Guide.md"),
                source: "# Guide\n\nUse ``MyClass`` or <doc:Missing>.\n".into(),
            }],
            symbol_graphs: vec![SymbolGraphFile::parse(&PathBuf::from("MyKit.symbols.json"), GRAPH).unwrap()],
        };
    }

    fn stdlib() -> Arc<LinkableEntitiesResolver> {
        let reference = ResolvedReference::new("org.swift.stdlib", vec!["Swift".into(), "Equatable".into()]);
        return Arc::new(LinkableEntitiesResolver::new(
            "org.swift.stdlib",
            vec!["Swift".into()],
            vec![ExternalEntity {
                abstract_text: "A type that can be compared for equality.".into(),
                availability: Vec::new(),
                kind: "symbol".into(),
                url: "/documentation/swift/equatable".into(),
                reference,
                role: "protocol".into(),
                title: "Equatable".into(),
            }],
        ));
    }

    fn compile() -> CompilationResult {
        let mut fallbacks = FallbackRegistry::new();
        fallbacks.register(stdlib());
        return Compilation::new(Config::default(), &inputs(), fallbacks).run().unwrap();
    }

    #[test]
    fn pages_in_canonical_order() {
        let result = compile();
        let paths: Vec<String> = result.pages.iter().map(|p| p.reference.path_string()).collect();
        assert_eq!(paths, vec!["MyKit", "MyKit/Guide", "MyKit/MyClass"]);
    }

    #[test]
    fn unresolved_link_is_a_page_problem() {
        let result = compile();
        let problem = result.problems.iter().find(|p| p.message.contains("Missing")).unwrap();
        assert_eq!(problem.page.as_deref(), Some("doc://com.example.documentation/documentation/MyKit/Guide"));
        assert_eq!(problem.source, Some(PathBuf::from("Guide.md")));
    }

    #[test]
    fn external_links_are_recorded_for_the_lockfile() {
        let result = compile();
        assert_eq!(result.external_entities.len(), 1);
        let lockfile = result.lockfile().unwrap();
        assert_eq!(lockfile.checksum, result.checksum);
        assert_eq!(
            lockfile.entries.first().unwrap().identifier,
            "doc://org.swift.stdlib/documentation/Swift/Equatable"
        );
    }

    #[test]
    fn symbol_variants_become_overrides() {
        let result = compile();
        let class = ResolvedReference::new("com.example.documentation", vec!["MyKit".into(), "MyClass".into()]);
        let page = result.page(&class).unwrap();
        let overrides = &page.node.variant_overrides;
        assert_eq!(overrides.len(), 1);
        let patched = variant::apply_to_node(&page.node, &overrides.first().unwrap().patch).unwrap();
        assert_eq!(patched.metadata.title, "MYClass");
        assert_eq!(patched.identifier.interface_language, "occ");
    }

    #[test]
    fn repeated_builds_agree() {
        let first = compile();
        let second = compile();
        assert_eq!(first.checksum, second.checksum);
        assert_eq!(first.pages, second.pages);
        assert_eq!(first.references, second.references);
    }
}
