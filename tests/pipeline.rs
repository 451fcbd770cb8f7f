use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use docweave::compiler::{Compilation, CompilationResult};
use docweave::config::Config;
use docweave::fallback::{FallbackRegistry, LinkableEntitiesResolver};
use docweave::graph::NodeKind;
use docweave::hasher::disambiguation_hash;
use docweave::input::{Inputs, MarkupDocument, SymbolGraphFile};
use docweave::reference::{
    ExternalEntity, FailureKind, ResolutionResult, ResolvedReference, UnresolvedReference,
};
use docweave::render::{ReferenceStore, RenderReference, RenderTranslator};
use docweave::render::variant::{apply_to_node, diff_nodes};
use docweave::resolver::ResolutionContext;

const BUNDLE: &str = "com.example.MyKit";
const INIT_A: &str = "s:5MyKit7MyClassCACycfc";
const INIT_B: &str = "s:5MyKit7MyClassC4nameACSS_tcfc";

fn symbol_graph() -> String {
    return format!(
        r#"{{
        "module": {{ "name": "MyKit" }},
        "symbols": [
            {{
                "identifier": {{ "precise": "s:5MyKit7MyClassC", "interfaceLanguage": "swift" }},
                "kind": {{ "identifier": "swift.class", "displayName": "Class" }},
                "pathComponents": ["MyClass"],
                "names": {{ "title": "MyClass" }},
                "declarationFragments": [{{ "spelling": "class MyClass" }}],
                "docComment": {{ "lines": [{{ "text": "A class that conforms to ``Swift/Equatable``." }}] }}
            }},
            {{
                "identifier": {{ "precise": "s:5MyKit7MyClassC", "interfaceLanguage": "occ" }},
                "kind": {{ "identifier": "swift.class", "displayName": "Class" }},
                "pathComponents": ["MyClass"],
                "names": {{ "title": "MYClass" }},
                "declarationFragments": [{{ "spelling": "@interface MYClass : NSObject" }}]
            }},
            {{
                "identifier": {{ "precise": "{INIT_A}", "interfaceLanguage": "swift" }},
                "kind": {{ "identifier": "swift.init", "displayName": "Initializer" }},
                "pathComponents": ["MyClass", "init()"],
                "names": {{ "title": "init()" }},
                "declarationFragments": [{{ "spelling": "init()" }}]
            }},
            {{
                "identifier": {{ "precise": "{INIT_B}", "interfaceLanguage": "swift" }},
                "kind": {{ "identifier": "swift.init", "displayName": "Initializer" }},
                "pathComponents": ["MyClass", "init()"],
                "names": {{ "title": "init()" }},
                "declarationFragments": [{{ "spelling": "init(name: String)" }}]
            }}
        ],
        "relationships": [
            {{ "kind": "conformsTo", "source": "s:5MyKit7MyClassC", "target": "s:SQ", "targetFallback": "Swift.Equatable" }}
        ]
    }}"#
    );
}

fn guide() -> String {
    let h1 = disambiguation_hash(INIT_A);
    let h2 = disambiguation_hash(INIT_B);
    return format!(
        "# Getting Started\n\nCreate one with ``MyClass/init()-{h1}`` or ``/MyClass/init()-{h2}``.\n\n\
         Compare with ``Swift/Equatable``, then read <doc:Loop> and ``MyClass/init()``.\n"
    );
}

fn inputs() -> Inputs {
    let documents = [
        ("GettingStarted.md", guide()),
        ("Loop.md", "# Loop\n\n@Redirect(<doc:Back>)\n".to_string()),
        ("Back.md", "# Back\n\n@Redirect(<doc:Loop>)\n".to_string()),
        ("Reference.md", "# Reference\n\nSee ``Swift/Equatable`` and ``MyClass``.\n".to_string()),
    ];
    return Inputs {
        documents: documents
            .into_iter()
            .map(|(path, source)| MarkupDocument { path: PathBuf::from(path), source })
            .collect(),
        symbol_graphs: vec![SymbolGraphFile::parse(&PathBuf::from("MyKit.symbols.json"), &symbol_graph()).unwrap()],
    };
}

fn stdlib() -> Arc<LinkableEntitiesResolver> {
    let reference = ResolvedReference::new("org.swift.stdlib", vec!["Swift".into(), "Equatable".into()]);
    let entity = ExternalEntity {
        abstract_text: "A type that can be compared for value equality.".into(),
        availability: Vec::new(),
        kind: "symbol".into(),
        url: "/documentation/swift/equatable".into(),
        reference,
        role: "protocol".into(),
        title: "Equatable".into(),
    };
    return Arc::new(LinkableEntitiesResolver::new("org.swift.stdlib", vec!["Swift".into()], vec![entity]));
}

fn config() -> Config {
    return Config { bundle_id: BUNDLE.into(), ..Config::default() };
}

fn compile_with(stdlib: Arc<LinkableEntitiesResolver>) -> CompilationResult {
    let mut fallbacks = FallbackRegistry::new();
    fallbacks.register(stdlib);
    return Compilation::new(config(), &inputs(), fallbacks).run().unwrap();
}

fn compile() -> CompilationResult {
    return compile_with(stdlib());
}

fn init_reference(precise: &str) -> String {
    return format!("doc://{BUNDLE}/documentation/MyKit/MyClass/init()-{}", disambiguation_hash(precise));
}

#[test]
fn overload_links_resolve_to_distinct_targets() {
    let result = compile();
    let first = init_reference(INIT_A);
    let second = init_reference(INIT_B);
    assert_ne!(first, second);

    let guide = result
        .page(&ResolvedReference::new(BUNDLE, vec!["MyKit".into(), "GettingStarted".into()]))
        .unwrap();
    let topics: BTreeSet<&str> = guide.node.references.keys().map(|k| k.as_str()).collect();
    assert!(topics.contains(first.as_str()));
    assert!(topics.contains(second.as_str()));

    let stored: Vec<&str> = result
        .references
        .keys()
        .map(|k| k.as_str())
        .filter(|k| k.contains("/MyClass/init()"))
        .collect();
    let expected: BTreeSet<&str> = [first.as_str(), second.as_str()].into_iter().collect();
    assert_eq!(stored.into_iter().collect::<BTreeSet<_>>(), expected);
}

#[test]
fn bare_overload_link_is_ambiguous() {
    let result = compile();
    let problem = result
        .problems
        .iter()
        .find(|p| p.message.contains("init()") && p.page.as_deref().is_some_and(|p| p.ends_with("GettingStarted")))
        .unwrap();
    assert!(problem.message.contains("ambiguous"), "{}", problem.message);
}

#[test]
fn redirect_loop_is_reported_not_hung() {
    let result = compile();
    assert!(result.problems.iter().any(|p| {
        return p.message.starts_with("cyclic") && p.page.as_deref().is_some_and(|page| page.ends_with("GettingStarted"));
    }));
    assert!(result.pages.iter().all(|p| p.reference.path_string() != "MyKit/Loop"));
}

#[test]
fn fallback_consulted_once_per_link() {
    let resolver = stdlib();
    let result = compile_with(Arc::clone(&resolver));
    // Written on MyClass twice (abstract and relationship), GettingStarted and Reference.
    assert_eq!(resolver.calls(), 1, "pages share one fallback outcome per link text");
    assert_eq!(result.external_entities.len(), 1);
}

#[test]
fn resolution_is_idempotent() {
    let compilation = Compilation::new(config(), &inputs(), FallbackRegistry::new());
    let resolver = compilation.resolver();
    let reference = UnresolvedReference::parse("MyClass").unwrap();
    let context = ResolutionContext::root();

    let first = resolver.resolve(&reference, &context);
    let entries = resolver.cache().len();
    let second = resolver.resolve(&reference, &context);
    assert_eq!(first, second);
    assert_eq!(resolver.cache().len(), entries);
    assert!(matches!(first, ResolutionResult::Success(_)));
}

#[test]
fn cached_failures_stay_failures() {
    let compilation = Compilation::new(config(), &inputs(), FallbackRegistry::new());
    let resolver = compilation.resolver();
    let reference = UnresolvedReference::parse("MyClass/init()").unwrap();
    let context = ResolutionContext::root();
    for _ in 0..2 {
        let ResolutionResult::Failure(failure) = resolver.resolve(&reference, &context) else {
            panic!("overloads must not be guessed");
        };
        assert!(matches!(failure.kind, FailureKind::Ambiguous { .. }));
    }
}

#[test]
fn checksum_is_stable_across_builds() {
    let first = compile();
    let second = compile();
    assert_eq!(first.checksum, second.checksum);
    assert_eq!(first.lockfile().unwrap(), second.lockfile().unwrap());
}

#[test]
fn store_holds_each_topic_once() {
    let result = compile();
    let used: BTreeSet<String> = result
        .pages
        .iter()
        .flat_map(|page| page.node.references.values())
        .filter(|r| matches!(r, RenderReference::Topic { .. }))
        .map(|r| r.identifier().as_str().to_string())
        .collect();
    let stored: BTreeSet<String> = result.references.keys().map(|k| k.as_str().to_string()).collect();
    assert_eq!(used, stored);
}

const SHAPES: &str = r#"{
    "module": { "name": "MyKit" },
    "symbols": [
        {
            "identifier": { "precise": "s:Alpha", "interfaceLanguage": "swift" },
            "kind": { "identifier": "swift.class", "displayName": "Class" },
            "pathComponents": ["Alpha"],
            "names": { "title": "Alpha" }
        },
        {
            "identifier": { "precise": "s:Beta", "interfaceLanguage": "swift" },
            "kind": { "identifier": "swift.class", "displayName": "Class" },
            "pathComponents": ["Beta"],
            "names": { "title": "Beta" }
        },
        {
            "identifier": { "precise": "s:Gamma", "interfaceLanguage": "swift" },
            "kind": { "identifier": "swift.class", "displayName": "Class" },
            "pathComponents": ["Gamma"],
            "names": { "title": "Gamma" }
        }
    ]
}"#;

/// Store identifiers after translating only the articles of `documents`.
fn article_store(documents: &[(&str, &str)]) -> BTreeSet<String> {
    let inputs = Inputs {
        documents: documents
            .iter()
            .map(|(path, source)| MarkupDocument { path: PathBuf::from(path), source: (*source).to_string() })
            .collect(),
        symbol_graphs: vec![SymbolGraphFile::parse(&PathBuf::from("MyKit.symbols.json"), SHAPES).unwrap()],
    };
    let compilation = Compilation::new(config(), &inputs, FallbackRegistry::new());
    let graph = compilation.graph();
    let resolver = compilation.resolver();
    let store = ReferenceStore::new();
    let translator = RenderTranslator::new(graph, resolver.fallbacks(), &store, "swift");

    for node in graph.nodes().filter(|n| n.kind == NodeKind::Article) {
        let mut content = node.content.clone();
        let failures = resolver.resolve_page_links(&mut content, &node.reference);
        assert!(failures.is_empty(), "{failures:?}");
        translator.translate(node, &content);
    }
    return store.snapshot().into_keys().map(|k| k.as_str().to_string()).collect();
}

#[test]
fn store_has_one_entry_per_distinct_link_target() {
    // Three pages, seven links, three distinct targets.
    let linking = [
        ("One.md", "# One\n\nSee ``Alpha`` and ``Beta``.\n"),
        ("Two.md", "# Two\n\nSee ``Beta``, ``Alpha`` and ``Gamma``.\n"),
        ("Three.md", "# Three\n\nSee ``Gamma`` and ``Alpha``.\n"),
    ];
    let plain = [
        ("One.md", "# One\n\nNo links.\n"),
        ("Two.md", "# Two\n\nNo links.\n"),
        ("Three.md", "# Three\n\nNo links.\n"),
    ];

    // Breadcrumbs alone.
    let structural = article_store(&plain);
    let linked = article_store(&linking);
    assert!(structural.is_subset(&linked));

    let authored: BTreeSet<String> = linked.difference(&structural).cloned().collect();
    let expected: BTreeSet<String> = ["Alpha", "Beta", "Gamma"]
        .into_iter()
        .map(|name| format!("doc://{BUNDLE}/documentation/MyKit/{name}"))
        .collect();
    assert_eq!(authored, expected);
    assert_eq!(linked.len(), structural.len() + 3);
}

#[test]
fn language_variant_patch_reproduces_the_variant() {
    let result = compile();
    let class = result
        .page(&ResolvedReference::new(BUNDLE, vec!["MyKit".into(), "MyClass".into()]))
        .unwrap();
    let overrides = &class.node.variant_overrides;
    assert_eq!(overrides.len(), 1);

    let variant = apply_to_node(&class.node, &overrides[0].patch).unwrap();
    assert_eq!(variant.metadata.title, "MYClass");
    assert_eq!(diff_nodes(&class.node, &variant).unwrap(), overrides[0].patch);
}

#[test]
fn relationship_outside_the_graph_resolves_through_fallback() {
    let result = compile();
    let class = result
        .page(&ResolvedReference::new(BUNDLE, vec!["MyKit".into(), "MyClass".into()]))
        .unwrap();
    let section = class.node.relationships_sections.first().unwrap();
    assert_eq!(section.title, "Conforms To");
    let ids: Vec<&str> = section.identifiers.iter().map(|i| i.as_str()).collect();
    assert_eq!(ids, vec!["doc://org.swift.stdlib/documentation/Swift/Equatable"]);
}
