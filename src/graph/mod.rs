//! Documentation graph: every page of one bundle, keyed by canonical reference.
//!
//! Built once, single-threaded, from symbol graphs and markup documents. After
//! [`DocumentationGraph::build`] returns, the graph is read-only and shared by
//! reference across page builds.

pub mod disambiguation;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

pub use self::disambiguation::Disambiguation;
use crate::config::Config;
use crate::diagnostics::Problem;
use crate::input::Inputs;
use crate::input::markup::{self, MarkupDocument, ParsedDocument};
use crate::input::symbols::{SymbolDescription, SymbolGraphFile};
use crate::reference::{ExternalEntity, PathComponent, ResolvedReference, UnresolvedReference};
use crate::semantic::{
    ArticleContent, LanguageVariant, Link, LinkDestination, Markup, RedirectContent,
    RelationshipKind, SemanticContent, SymbolContent, SymbolKind, SymbolRelationship, plain_text,
};

/// Category of a documentation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// Free-form article.
    Article,
    /// A module's root page.
    Module,
    /// Forwarding stub; resolvable but never rendered.
    Redirect,
    /// API symbol below a module.
    Symbol,
    /// Step-by-step tutorial.
    Tutorial,
}

impl NodeKind {
    /// Lowercase name used in rendered output.
    pub const fn name(self) -> &'static str {
        return match self {
            Self::Article => "article",
            Self::Module => "module",
            Self::Redirect => "redirect",
            Self::Symbol => "symbol",
            Self::Tutorial => "tutorial",
        };
    }
}

/// One page of documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentationNode {
    /// Semantic content; mutated only while the graph is built.
    pub content: SemanticContent,
    /// Overload data for symbols; `None` for other kinds.
    pub disambiguation: Option<Disambiguation>,
    /// Path of base names with no disambiguation suffixes.
    pub human_path: Vec<String>,
    /// Node category.
    pub kind: NodeKind,
    /// Base name: the last human path component.
    pub name: String,
    /// Lexical container; `None` for module roots.
    pub parent: Option<ResolvedReference>,
    /// Canonical identity.
    pub reference: ResolvedReference,
    /// Input file the node came from.
    pub source: Option<PathBuf>,
}

impl DocumentationNode {
    /// Page title.
    pub fn title(&self) -> &str {
        return self.content.title();
    }

    /// Human path joined with `/`, as shown in suggestions.
    pub fn human_path_string(&self) -> String {
        return self.human_path.join("/");
    }

    /// Finer classification: the symbol kind for symbols, otherwise the node kind.
    pub fn role(&self) -> String {
        return match (self.kind, &self.content) {
            (NodeKind::Symbol, SemanticContent::Symbol(symbol)) => symbol.kind.identifier.clone(),
            (NodeKind::Module, _) => "collection".to_string(),
            (NodeKind::Tutorial, _) => "project".to_string(),
            (NodeKind::Article | NodeKind::Redirect | NodeKind::Symbol, _) => self.kind.name().to_string(),
        };
    }

    /// Site-relative URL of the rendered page.
    pub fn url(&self) -> String {
        return self.reference.url(self.kind == NodeKind::Tutorial);
    }

    /// Symbol content, for symbol and module nodes.
    pub fn as_symbol(&self) -> Option<&SymbolContent> {
        return match &self.content {
            SemanticContent::Symbol(symbol) => Some(symbol),
            SemanticContent::Article(_) | SemanticContent::Redirect(_) | SemanticContent::Tutorial(_) => None,
        };
    }

    /// Summary other bundles use to link here.
    pub fn linkable_entity(&self) -> ExternalEntity {
        return ExternalEntity {
            abstract_text: plain_text(self.content.abstract_inlines()),
            availability: self.as_symbol().map(|s| return s.availability.clone()).unwrap_or_default(),
            kind: self.kind.name().to_string(),
            reference: self.reference.clone(),
            role: self.role(),
            title: self.title().to_string(),
            url: self.url(),
        };
    }
}

/// Outcome of a graph lookup. The graph never guesses between candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// Several nodes match; sorted.
    Ambiguous(Vec<ResolvedReference>),
    /// Exactly one node matches.
    Found(&'a DocumentationNode),
    /// Nothing matches.
    NotFound,
}

/// All pages of one bundle plus the indexes used to find them.
///
/// Every reference stored in a secondary index names a node in `nodes`.
#[derive(Debug, Clone, Default)]
pub struct DocumentationGraph {
    /// Bundle the graph documents.
    bundle_id: String,
    /// Human path (base names joined by `/`) to every node with that path.
    by_human_path: HashMap<String, Vec<ResolvedReference>>,
    /// Precise symbol identifier to node.
    by_precise: HashMap<String, ResolvedReference>,
    /// Parent to children, children in insertion order.
    children: BTreeMap<ResolvedReference, Vec<ResolvedReference>>,
    /// Primary map.
    nodes: BTreeMap<ResolvedReference, DocumentationNode>,
    /// Module roots.
    roots: Vec<ResolvedReference>,
}

impl DocumentationGraph {
    /// Build the graph from loaded inputs.
    ///
    /// Malformed symbols, untitled documents, duplicate pages and unmatched
    /// extensions are declined with a warning; the build always completes.
    pub fn build(config: &Config, inputs: &Inputs) -> (Self, Vec<Problem>) {
        let mut builder = GraphBuilder::new(config);
        builder.add_symbol_graphs(&inputs.symbol_graphs);
        let primary = builder.primary_module();

        let mut documents: Vec<&MarkupDocument> = inputs.documents.iter().collect();
        documents.sort_by(|a, b| return a.path.cmp(&b.path));
        builder.add_documents(&documents, &primary);

        let GraphBuilder { graph, problems, .. } = builder;
        debug_assert!(graph.verify_indexes().is_empty(), "graph indexes out of sync");
        debug!(nodes = graph.nodes.len(), problems = problems.len(), "built documentation graph");
        return (graph, problems);
    }

    /// Bundle identifier.
    pub fn bundle_id(&self) -> &str {
        return &self.bundle_id;
    }

    /// Node count.
    pub fn len(&self) -> usize {
        return self.nodes.len();
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        return self.nodes.is_empty();
    }

    /// The node with this canonical reference. Fragments are ignored.
    pub fn node(&self, reference: &ResolvedReference) -> Option<&DocumentationNode> {
        if reference.fragment.is_some() {
            return self.nodes.get(&reference.page());
        }
        return self.nodes.get(reference);
    }

    /// The node for a precise symbol identifier.
    pub fn node_by_precise(&self, precise: &str) -> Option<&DocumentationNode> {
        return self.by_precise.get(precise).and_then(|r| return self.nodes.get(r));
    }

    /// All nodes in canonical order.
    pub fn nodes(&self) -> impl Iterator<Item = &DocumentationNode> {
        return self.nodes.values();
    }

    /// Children of a node in insertion order.
    pub fn children(&self, reference: &ResolvedReference) -> &[ResolvedReference] {
        return self.children.get(reference).map_or(&[], Vec::as_slice);
    }

    /// Module root references.
    pub fn roots(&self) -> &[ResolvedReference] {
        return &self.roots;
    }

    /// Whether `name` is a module this graph documents.
    pub fn is_local_module(&self, name: &str) -> bool {
        return self
            .roots
            .iter()
            .any(|r| return r.path.first().is_some_and(|first| return first == name));
    }

    /// Every human path, for suggestions.
    pub fn human_paths(&self) -> impl Iterator<Item = &str> {
        return self.by_human_path.keys().map(String::as_str);
    }

    /// Summaries of every page other bundles may link to, in canonical order.
    pub fn linkable_entities(&self) -> Vec<ExternalEntity> {
        return self
            .nodes
            .values()
            .filter(|n| return n.kind != NodeKind::Redirect)
            .map(DocumentationNode::linkable_entity)
            .collect();
    }

    /// Look up a human path from the root, with an optional suffix for the last component.
    pub fn lookup(&self, path: &str, disambiguator: Option<&str>) -> Lookup<'_> {
        let Ok(parsed) = UnresolvedReference::parse(path) else {
            return Lookup::NotFound;
        };
        let mut components = parsed.components;
        if let (Some(suffix), Some(last)) = (disambiguator, components.last_mut()) {
            last.raw = format!("{}-{suffix}", last.raw);
        }
        return self.lookup_components(None, &components);
    }

    /// Look up parsed components below `scope`, or from the module roots when
    /// `scope` is `None`. Suffixes are honored on every component.
    ///
    /// Each component is read in every way it can be split into name and
    /// suffix, full name first; the first reading that matches anything is
    /// used. Several matches carry forward to the next component, so an
    /// ambiguous prefix may still end in a unique node.
    pub fn lookup_components(
        &self,
        scope: Option<&ResolvedReference>,
        components: &[PathComponent],
    ) -> Lookup<'_> {
        if components.is_empty() {
            return Lookup::NotFound;
        }

        let mut current: BTreeSet<&ResolvedReference> = BTreeSet::new();
        for (index, component) in components.iter().enumerate() {
            let candidates: Vec<&ResolvedReference> = if index == 0 {
                match scope {
                    Some(scope) => self.children(scope).iter().collect(),
                    None => self.roots.iter().collect(),
                }
            } else {
                current.iter().flat_map(|r| return self.children(r).iter()).collect()
            };

            let matched = self.match_component(&candidates, component);
            if matched.is_empty() {
                trace!(component = %component.raw, "no match");
                return Lookup::NotFound;
            }
            current = matched;
        }

        let mut found = current.into_iter();
        return match (found.next(), found.next()) {
            (None, _) => Lookup::NotFound,
            (Some(only), None) => self.nodes.get(only).map_or(Lookup::NotFound, Lookup::Found),
            (Some(first), Some(second)) => {
                let mut all = vec![first.clone(), second.clone()];
                all.extend(found.cloned());
                Lookup::Ambiguous(all)
            },
        };
    }

    /// Candidates matching one component under its first successful reading.
    fn match_component<'a>(
        &'a self,
        candidates: &[&'a ResolvedReference],
        component: &PathComponent,
    ) -> BTreeSet<&'a ResolvedReference> {
        for (name, suffix) in component.interpretations() {
            let matched: BTreeSet<&ResolvedReference> = candidates
                .iter()
                .copied()
                .filter(|reference| {
                    let Some(node) = self.nodes.get(*reference) else {
                        return false;
                    };
                    if node.name != name {
                        return false;
                    }
                    return match suffix {
                        None => true,
                        Some(suffix) => node.disambiguation.as_ref().is_some_and(|d| return d.matches(suffix)),
                    };
                })
                .collect();
            if !matched.is_empty() {
                return matched;
            }
        }
        return BTreeSet::new();
    }

    /// Every secondary index entry that does not name a node. Empty when consistent.
    pub fn verify_indexes(&self) -> Vec<String> {
        let mut dangling = Vec::new();
        let mut check = |index: &str, reference: &ResolvedReference| {
            if !self.nodes.contains_key(reference) {
                dangling.push(format!("{index}: {reference}"));
            }
        };
        for references in self.by_human_path.values() {
            for reference in references {
                check("by_human_path", reference);
            }
        }
        for reference in self.by_precise.values() {
            check("by_precise", reference);
        }
        for (parent, children) in &self.children {
            check("children (parent)", parent);
            for child in children {
                check("children", child);
            }
        }
        for root in &self.roots {
            check("roots", root);
        }
        return dangling;
    }

    /// Insert a node and index it. Declines a canonical path that is taken.
    fn insert(&mut self, node: DocumentationNode) -> Result<(), DocumentationNode> {
        if self.nodes.contains_key(&node.reference) {
            return Err(node);
        }
        let reference = node.reference.clone();
        self.by_human_path
            .entry(node.human_path_string())
            .or_default()
            .push(reference.clone());
        if let Some(symbol) = node.as_symbol() {
            self.by_precise.insert(symbol.precise.clone(), reference.clone());
        }
        match &node.parent {
            Some(parent) => self.children.entry(parent.clone()).or_default().push(reference.clone()),
            None => self.roots.push(reference.clone()),
        }
        self.nodes.insert(reference, node);
        return Ok(());
    }
}

/// A validated symbol waiting for its place in the hierarchy.
struct PendingSymbol {
    /// Content with variants merged.
    content: SymbolContent,
    /// Overload data.
    disambiguation: Disambiguation,
    /// Module followed by the symbol's path components.
    human_path: Vec<String>,
    /// Precise identifier of the declaring type, from a `memberOf` edge.
    member_of: Option<String>,
    /// Symbol graph the symbol came from.
    source: PathBuf,
}

/// A `conformsTo` or `inheritsFrom` edge collected from a symbol graph.
struct PendingRelationship {
    /// Edge category.
    kind: RelationshipKind,
    /// Precise identifier of the source symbol.
    source: String,
    /// Precise identifier of the target symbol.
    target: String,
    /// Dotted human path of a target outside this graph.
    target_fallback: Option<String>,
}

/// Mutable state while the graph is built.
struct GraphBuilder<'c> {
    /// Configuration: bundle identity and primary language.
    config: &'c Config,
    /// Graph under construction.
    graph: DocumentationGraph,
    /// Module names in first-seen order.
    modules: Vec<String>,
    /// Declined inputs.
    problems: Vec<Problem>,
}

impl<'c> GraphBuilder<'c> {
    /// An empty builder.
    fn new(config: &'c Config) -> Self {
        return Self {
            config,
            graph: DocumentationGraph {
                bundle_id: config.bundle_id.clone(),
                ..DocumentationGraph::default()
            },
            modules: Vec::new(),
            problems: Vec::new(),
        };
    }

    /// Record a declined input.
    fn decline(&mut self, problem: Problem) {
        warn!(message = %problem.message, "declined input");
        self.problems.push(problem);
    }

    /// Add every symbol graph: modules, symbols, variants and relationships.
    fn add_symbol_graphs(&mut self, files: &[SymbolGraphFile]) {
        let mut pending: BTreeMap<String, PendingSymbol> = BTreeMap::new();
        let mut relationships = Vec::new();

        for file in files {
            let module = file.graph.module.name.clone();
            if !self.modules.contains(&module) {
                self.modules.push(module.clone());
            }
            for symbol in &file.graph.symbols {
                self.collect_symbol(&mut pending, file, &module, symbol);
            }
            for relationship in &file.graph.relationships {
                let kind = match relationship.kind.as_str() {
                    "memberOf" => {
                        if let Some(member) = pending.get_mut(&relationship.source) {
                            member.member_of.get_or_insert_with(|| return relationship.target.clone());
                        }
                        continue;
                    },
                    "conformsTo" => RelationshipKind::ConformsTo,
                    "inheritsFrom" => RelationshipKind::InheritsFrom,
                    _ => continue,
                };
                relationships.push(PendingRelationship {
                    kind,
                    source: relationship.source.clone(),
                    target: relationship.target.clone(),
                    target_fallback: relationship.target_fallback.clone(),
                });
            }
        }

        for module in self.modules.clone() {
            self.add_module(&module);
        }
        self.place_symbols(pending.into_values().collect());
        self.attach_relationships(relationships);
    }

    /// Validate one symbol and either queue it or merge it as a language variant.
    fn collect_symbol(
        &mut self,
        pending: &mut BTreeMap<String, PendingSymbol>,
        file: &SymbolGraphFile,
        module: &str,
        symbol: &SymbolDescription,
    ) {
        if let Err(e) = symbol.validate(&file.path) {
            self.decline(Problem::warning(e.to_string()).with_source(&file.path));
            return;
        }

        let precise = &symbol.identifier.precise;
        let language = &symbol.identifier.interface_language;
        if let Some(existing) = pending.get_mut(precise) {
            let known_language = existing.content.interface_language == *language
                || existing.content.variants.iter().any(|v| return v.interface_language == *language);
            if known_language {
                self.decline(
                    Problem::warning(format!("duplicate symbol `{precise}` in {language}"))
                        .with_source(&file.path),
                );
                return;
            }
            existing.content.variants.push(LanguageVariant {
                declaration: symbol.declaration(),
                interface_language: language.clone(),
                title: symbol.names.title.clone(),
            });
            self.prefer_default_language(&mut existing.content);
            return;
        }

        let docs = match symbol.doc_comment_text() {
            None => Markup::default(),
            Some(text) => markup::parse_documentation(&file.path, &text).unwrap_or_else(|e| {
                self.decline(Problem::warning(e.to_string()).with_source(&file.path));
                return Markup::default();
            }),
        };

        let mut human_path = vec![module.to_string()];
        human_path.extend(symbol.path_components.iter().cloned());
        let mut content = SymbolContent {
            availability: symbol.availability(),
            declaration: symbol.declaration(),
            docs,
            interface_language: language.clone(),
            kind: SymbolKind {
                display_name: symbol.kind.display_name.clone(),
                identifier: symbol.kind.identifier().to_string(),
            },
            module: module.to_string(),
            precise: precise.clone(),
            relationships: Vec::new(),
            title: symbol.names.title.clone(),
            variants: Vec::new(),
        };
        self.prefer_default_language(&mut content);

        pending.insert(
            precise.clone(),
            PendingSymbol {
                disambiguation: Disambiguation::for_symbol(precise, symbol.kind.identifier()),
                content,
                human_path,
                member_of: None,
                source: file.path.clone(),
            },
        );
    }

    /// Make the configured default language primary when the symbol has it as a variant.
    fn prefer_default_language(&self, content: &mut SymbolContent) {
        let default = &self.config.default_language;
        if content.interface_language == *default {
            return;
        }
        let Some(variant) = content.variants.iter_mut().find(|v| return v.interface_language == *default) else {
            return;
        };
        std::mem::swap(&mut content.interface_language, &mut variant.interface_language);
        std::mem::swap(&mut content.declaration, &mut variant.declaration);
        std::mem::swap(&mut content.title, &mut variant.title);
    }

    /// Add a module root page unless it exists.
    fn add_module(&mut self, module: &str) {
        let reference = ResolvedReference::new(self.config.bundle_id.clone(), vec![module.to_string()]);
        if self.graph.nodes.contains_key(&reference) {
            return;
        }
        let content = SymbolContent {
            availability: Vec::new(),
            declaration: String::new(),
            docs: Markup::default(),
            interface_language: self.config.default_language.clone(),
            kind: SymbolKind {
                display_name: "Framework".to_string(),
                identifier: "module".to_string(),
            },
            module: module.to_string(),
            precise: module.to_string(),
            relationships: Vec::new(),
            title: module.to_string(),
            variants: Vec::new(),
        };
        let node = DocumentationNode {
            content: SemanticContent::Symbol(Box::new(content)),
            disambiguation: None,
            human_path: vec![module.to_string()],
            kind: NodeKind::Module,
            name: module.to_string(),
            parent: None,
            reference,
            source: None,
        };
        let _ = self.graph.insert(node);
    }

    /// The module articles are placed under, created from the display name
    /// when no symbol graph supplied one.
    fn primary_module(&mut self) -> ResolvedReference {
        let module = match self.modules.first() {
            Some(module) => module.clone(),
            None => {
                let name = self.config.display_name().to_string();
                self.modules.push(name.clone());
                self.add_module(&name);
                name
            },
        };
        return ResolvedReference::new(self.config.bundle_id.clone(), vec![module]);
    }

    /// Place symbols level by level so every parent has its canonical path
    /// before its children are named.
    fn place_symbols(&mut self, mut pending: Vec<PendingSymbol>) {
        pending.sort_by(|a, b| {
            return (a.human_path.len(), &a.human_path, &a.content.precise).cmp(&(
                b.human_path.len(),
                &b.human_path,
                &b.content.precise,
            ));
        });

        let mut levels: BTreeMap<usize, Vec<PendingSymbol>> = BTreeMap::new();
        for symbol in pending {
            levels.entry(symbol.human_path.len()).or_default().push(symbol);
        }

        for (_, level) in levels {
            let mut groups: BTreeMap<(ResolvedReference, String), Vec<PendingSymbol>> = BTreeMap::new();
            for symbol in level {
                let Some(parent) = self.parent_of(&symbol) else {
                    continue;
                };
                let name = symbol.human_path.last().cloned().unwrap_or_default();
                groups.entry((parent, name)).or_default().push(symbol);
            }
            for ((parent, name), members) in groups {
                self.insert_overload_group(&parent, &name, members);
            }
        }
    }

    /// The canonical parent of a pending symbol, declining it when there is none.
    fn parent_of(&mut self, symbol: &PendingSymbol) -> Option<ResolvedReference> {
        if let Some(owner) = symbol.member_of.as_ref().and_then(|p| return self.graph.by_precise.get(p)) {
            return Some(owner.clone());
        }

        let prefix = symbol.human_path.split_last().map(|(_, prefix)| return prefix.join("/"));
        let candidates = prefix
            .as_ref()
            .and_then(|p| return self.graph.by_human_path.get(p))
            .cloned()
            .unwrap_or_default();
        return match candidates.as_slice() {
            [only] => Some(only.clone()),
            [] => {
                self.decline(
                    Problem::warning(format!(
                        "symbol `{}` has no parent at `{}`",
                        symbol.content.precise,
                        prefix.unwrap_or_default()
                    ))
                    .with_source(&symbol.source),
                );
                None
            },
            _ => {
                self.decline(
                    Problem::warning(format!(
                        "symbol `{}` has an ambiguous parent at `{}`",
                        symbol.content.precise,
                        prefix.unwrap_or_default()
                    ))
                    .with_source(&symbol.source),
                );
                None
            },
        };
    }

    /// Insert siblings sharing a base name under their canonical components.
    fn insert_overload_group(&mut self, parent: &ResolvedReference, name: &str, members: Vec<PendingSymbol>) {
        let disambiguations: Vec<&Disambiguation> = members.iter().map(|m| return &m.disambiguation).collect();
        let components = disambiguation::canonical_components(name, &disambiguations);
        if members.len() > 1 {
            trace!(name, parent = %parent, count = members.len(), "disambiguated overloads");
        }

        for (member, component) in members.into_iter().zip(components) {
            let mut path = parent.path.clone();
            path.push(component);
            let node = DocumentationNode {
                reference: ResolvedReference::new(self.config.bundle_id.clone(), path),
                content: SemanticContent::Symbol(Box::new(member.content)),
                disambiguation: Some(member.disambiguation),
                human_path: member.human_path,
                kind: NodeKind::Symbol,
                name: name.to_string(),
                parent: Some(parent.clone()),
                source: Some(member.source),
            };
            if let Err(node) = self.graph.insert(node) {
                self.decline(duplicate_page(&node));
            }
        }
    }

    /// Attach relationship edges to their source symbols.
    fn attach_relationships(&mut self, relationships: Vec<PendingRelationship>) {
        for relationship in relationships {
            let target = if let Some(local) = self.graph.by_precise.get(&relationship.target) {
                Link {
                    destination: LinkDestination::Resolved(local.clone()),
                    title: None,
                }
            } else if let Some(fallback) = &relationship.target_fallback {
                let title = fallback.rsplit('.').next().map(str::to_string);
                match UnresolvedReference::parse(&fallback.replace('.', "/")) {
                    Ok(reference) => Link::unresolved(reference, title),
                    Err(_) => continue,
                }
            } else {
                continue;
            };

            let Some(source) = self.graph.by_precise.get(&relationship.source).cloned() else {
                continue;
            };
            if let Some(SemanticContent::Symbol(symbol)) =
                self.graph.nodes.get_mut(&source).map(|n| return &mut n.content)
            {
                symbol.relationships.push(SymbolRelationship { kind: relationship.kind, target });
            }
        }
    }

    /// Add articles, tutorials and redirects, then merge extensions.
    fn add_documents(&mut self, documents: &[&MarkupDocument], primary: &ResolvedReference) {
        let mut extensions = Vec::new();
        for document in documents {
            let parsed = match markup::parse_document(document) {
                Ok(parsed) => parsed,
                Err(e) => {
                    self.decline(Problem::warning(e.to_string()).with_source(&document.path));
                    continue;
                },
            };
            let (kind, content) = match parsed {
                ParsedDocument::Article { docs, title } => {
                    (NodeKind::Article, SemanticContent::Article(ArticleContent { docs, title }))
                },
                ParsedDocument::Extension { docs, target } => {
                    extensions.push((document.path.clone(), target, docs));
                    continue;
                },
                ParsedDocument::Redirect { target, title } => {
                    (NodeKind::Redirect, SemanticContent::Redirect(RedirectContent { target, title }))
                },
                ParsedDocument::Tutorial(tutorial) => (NodeKind::Tutorial, SemanticContent::Tutorial(tutorial)),
            };
            self.add_page(document, primary, kind, content);
        }

        for (source, target, docs) in extensions {
            self.merge_extension(&source, primary, &target, docs);
        }
    }

    /// Add one article, tutorial or redirect under the primary module.
    fn add_page(
        &mut self,
        document: &MarkupDocument,
        primary: &ResolvedReference,
        kind: NodeKind,
        content: SemanticContent,
    ) {
        let name = document.name();
        let mut path = primary.path.clone();
        path.push(name.clone());
        let node = DocumentationNode {
            content,
            disambiguation: None,
            human_path: path.clone(),
            kind,
            name,
            parent: Some(primary.clone()),
            reference: ResolvedReference::new(self.config.bundle_id.clone(), path),
            source: Some(document.path.clone()),
        };
        if let Err(node) = self.graph.insert(node) {
            self.decline(duplicate_page(&node));
        }
    }

    /// Merge an extension file into the symbol its title names.
    fn merge_extension(&mut self, source: &Path, primary: &ResolvedReference, target: &UnresolvedReference, docs: Markup) {
        let found = match self.graph.lookup_components(None, &target.components) {
            Lookup::NotFound if !target.absolute => self.graph.lookup_components(Some(primary), &target.components),
            other => other,
        };
        let reference = match found {
            Lookup::Found(node) if node.as_symbol().is_some() => node.reference.clone(),
            Lookup::Found(node) => {
                let message = format!("extension target `{}` is a {}, not a symbol", target.raw, node.kind.name());
                self.decline(Problem::warning(message).with_source(source));
                return;
            },
            Lookup::Ambiguous(candidates) => {
                let names: Vec<String> = candidates.iter().map(ResolvedReference::path_string).collect();
                let message = format!("extension target `{}` is ambiguous: {}", target.raw, names.join(", "));
                self.decline(Problem::warning(message).with_source(source));
                return;
            },
            Lookup::NotFound => {
                let message = format!("extension target `{}` doesn't exist", target.raw);
                self.decline(Problem::warning(message).with_source(source));
                return;
            },
        };

        if let Some(SemanticContent::Symbol(symbol)) = self.graph.nodes.get_mut(&reference).map(|n| return &mut n.content) {
            symbol.docs.merge_extension(docs);
            trace!(target = %reference, "merged documentation extension");
        }
    }
}

/// Problem for a node whose canonical path is already taken.
fn duplicate_page(node: &DocumentationNode) -> Problem {
    let problem = Problem::warning(format!("duplicate page `{}`", node.reference.path_string()));
    return match &node.source {
        Some(source) => problem.with_source(source),
        None => problem,
    };
}
