//! Render translation: one resolved page in, one self-contained render node out.
//!
//! Every resolved link becomes a reference identifier. The matching rendered
//! reference comes from the shared store, built on first use from the local
//! graph or from the fallback that resolved it earlier. Links are never
//! re-resolved here.

use std::collections::{BTreeMap, BTreeSet};

use crate::fallback::FallbackRegistry;
use crate::graph::{DocumentationGraph, DocumentationNode, NodeKind};
use crate::reference::ResolvedReference;
use crate::render::node::{
    Declaration, Hierarchy, Metadata, PrimarySection, RelationshipsSection, RenderBlock, RenderInline,
    RenderNode, RenderNodeIdentifier, RenderReference, RenderReferenceIdentifier, RenderTutorialSection,
    TaskGroup,
};
use crate::render::store::ReferenceStore;
use crate::semantic::{
    Block, Inline, Link, LinkDestination, RelationshipKind, SemanticContent, SymbolContent, TopicGroup,
    plain_text,
};

/// Group titles for automatic curation, in display order.
const CURATION_ORDER: &[(&str, &str)] = &[
    ("article", "Articles"),
    ("project", "Tutorials"),
    ("class", "Classes"),
    ("protocol", "Protocols"),
    ("struct", "Structures"),
    ("enum", "Enumerations"),
    ("typealias", "Type Aliases"),
    ("associatedtype", "Associated Types"),
    ("case", "Enumeration Cases"),
    ("init", "Initializers"),
    ("deinit", "Deinitializers"),
    ("property", "Instance Properties"),
    ("method", "Instance Methods"),
    ("subscript", "Subscripts"),
    ("type.property", "Type Properties"),
    ("type.method", "Type Methods"),
    ("type.subscript", "Type Subscripts"),
    ("func.op", "Operators"),
    ("func", "Functions"),
    ("var", "Variables"),
    ("ivar", "Instance Variables"),
    ("macro", "Macros"),
    ("extension", "Extensions"),
];

/// Translates resolved pages of one build.
#[derive(Debug, Clone, Copy)]
pub struct RenderTranslator<'a> {
    /// Interface language of non-symbol pages.
    default_language: &'a str,
    /// Fallbacks consulted for external reference summaries.
    fallbacks: &'a FallbackRegistry,
    /// The local bundle.
    graph: &'a DocumentationGraph,
    /// Build-wide reference store.
    store: &'a ReferenceStore,
}

impl<'a> RenderTranslator<'a> {
    /// A translator writing references into `store`.
    pub const fn new(
        graph: &'a DocumentationGraph,
        fallbacks: &'a FallbackRegistry,
        store: &'a ReferenceStore,
        default_language: &'a str,
    ) -> Self {
        return Self { default_language, fallbacks, graph, store };
    }

    /// Translate `node`, whose links in `content` are already resolved.
    pub fn translate(&self, node: &DocumentationNode, content: &SemanticContent) -> RenderNode {
        let mut page = PageTranslation { references: BTreeMap::new(), translator: *self };

        let symbol = match content {
            SemanticContent::Symbol(symbol) => Some(symbol.as_ref()),
            SemanticContent::Article(_) | SemanticContent::Redirect(_) | SemanticContent::Tutorial(_) => None,
        };

        let mut render = RenderNode {
            abstract_content: page.inlines(content.abstract_inlines()),
            hierarchy: page.hierarchy(node),
            identifier: RenderNodeIdentifier {
                interface_language: symbol
                    .map_or_else(|| return self.default_language.to_string(), |s| return s.interface_language.clone()),
                url: node.reference.identifier(),
            },
            kind: render_kind(node.kind).to_string(),
            metadata: metadata(node, symbol),
            primary_content_sections: Vec::new(),
            references: BTreeMap::new(),
            relationships_sections: Vec::new(),
            sections: Vec::new(),
            see_also_sections: Vec::new(),
            topic_sections: Vec::new(),
            variant_overrides: Vec::new(),
        };

        match content {
            SemanticContent::Article(article) => {
                render.primary_content_sections = page.discussion(&article.docs.discussion);
                render.topic_sections = page.topic_sections(node, &article.docs.topics);
                render.see_also_sections = page.groups(&article.docs.see_also);
            },
            SemanticContent::Redirect(_) => {},
            SemanticContent::Symbol(symbol) => {
                if !symbol.declaration.is_empty() {
                    render.primary_content_sections.push(PrimarySection::Declarations {
                        declarations: vec![Declaration {
                            languages: vec![symbol.interface_language.clone()],
                            text: symbol.declaration.clone(),
                        }],
                    });
                }
                render.primary_content_sections.extend(page.discussion(&symbol.docs.discussion));
                render.topic_sections = page.topic_sections(node, &symbol.docs.topics);
                render.relationships_sections = page.relationships(symbol);
                render.see_also_sections = page.groups(&symbol.docs.see_also);
            },
            SemanticContent::Tutorial(tutorial) => {
                render.sections = tutorial
                    .sections
                    .iter()
                    .map(|section| {
                        return RenderTutorialSection {
                            anchor: section.anchor.clone(),
                            content: page.blocks(&section.content),
                            steps: section.steps.iter().map(|step| return page.inlines(step)).collect(),
                            title: section.title.clone(),
                        };
                    })
                    .collect();
            },
        }

        render.references = page.references;
        return render;
    }

    /// The rendered reference for a resolved target, built once per build.
    fn topic_reference(&self, reference: &ResolvedReference) -> Option<RenderReference> {
        let identifier = RenderReferenceIdentifier(reference.identifier());
        return self.store.get_or_insert_with(&identifier, || {
            if reference.bundle_id == self.graph.bundle_id() {
                let node = self.graph.node(reference)?;
                return Some(RenderReference::Topic {
                    abstract_content: flatten(node.content.abstract_inlines()),
                    identifier: identifier.clone(),
                    kind: render_kind(node.kind).to_string(),
                    role: node.role(),
                    title: node.title().to_string(),
                    url: reference.url(node.kind == NodeKind::Tutorial),
                });
            }
            let entity = self.fallbacks.entity(reference)?;
            let url = match &reference.fragment {
                Some(fragment) => format!("{}#{fragment}", entity.url),
                None => entity.url.clone(),
            };
            return Some(RenderReference::Topic {
                abstract_content: if entity.abstract_text.is_empty() {
                    Vec::new()
                } else {
                    vec![RenderInline::Text { text: entity.abstract_text.clone() }]
                },
                identifier: identifier.clone(),
                kind: entity.kind.clone(),
                role: entity.role.clone(),
                title: entity.title.clone(),
                url,
            });
        });
    }
}

/// State for one page: the references it uses.
struct PageTranslation<'a> {
    /// Every reference used so far.
    references: BTreeMap<RenderReferenceIdentifier, RenderReference>,
    /// Shared translator.
    translator: RenderTranslator<'a>,
}

impl PageTranslation<'_> {
    /// Record a reference the page uses and return its identifier.
    fn use_reference(&mut self, reference: RenderReference) -> RenderReferenceIdentifier {
        let identifier = reference.identifier().clone();
        self.references.entry(identifier.clone()).or_insert(reference);
        return identifier;
    }

    /// Identifier for a resolved target, or a placeholder when no summary exists.
    fn resolved(&mut self, reference: &ResolvedReference, fallback_title: &str) -> (RenderReferenceIdentifier, bool) {
        return match self.translator.topic_reference(reference) {
            Some(topic) => (self.use_reference(topic), true),
            None => {
                let placeholder = RenderReference::Unresolved {
                    identifier: RenderReferenceIdentifier(reference.identifier()),
                    title: fallback_title.to_string(),
                };
                (self.use_reference(placeholder), false)
            },
        };
    }

    /// Identifier for any link plus whether it is live.
    fn link(&mut self, link: &Link) -> (RenderReferenceIdentifier, bool) {
        let text = link.fallback_text();
        return match &link.destination {
            LinkDestination::Resolved(reference) => self.resolved(reference, &text),
            LinkDestination::Url(url) => {
                let reference = RenderReference::Link {
                    identifier: RenderReferenceIdentifier(url.clone()),
                    title: text,
                    url: url.clone(),
                };
                (self.use_reference(reference), true)
            },
            LinkDestination::Failed(failure) => {
                let reference = RenderReference::Unresolved {
                    identifier: RenderReferenceIdentifier(failure.reference.clone()),
                    title: text,
                };
                (self.use_reference(reference), false)
            },
            LinkDestination::Unresolved(reference) => {
                let reference = RenderReference::Unresolved {
                    identifier: RenderReferenceIdentifier(reference.raw.clone()),
                    title: text,
                };
                (self.use_reference(reference), false)
            },
        };
    }

    /// Render inline content.
    fn inlines(&mut self, inlines: &[Inline]) -> Vec<RenderInline> {
        return inlines
            .iter()
            .map(|inline| {
                return match inline {
                    Inline::CodeVoice(code) => RenderInline::CodeVoice { code: code.clone() },
                    Inline::Link(link) => {
                        let (identifier, is_active) = self.link(link);
                        RenderInline::Reference {
                            identifier,
                            is_active,
                            override_title: link.title.clone(),
                        }
                    },
                    Inline::Text(text) => RenderInline::Text { text: text.clone() },
                };
            })
            .collect();
    }

    /// Render blocks.
    fn blocks(&mut self, blocks: &[Block]) -> Vec<RenderBlock> {
        return blocks
            .iter()
            .map(|block| {
                return match block {
                    Block::CodeListing { code, language } => RenderBlock::CodeListing {
                        code: code.lines().map(str::to_string).collect(),
                        syntax: language.clone(),
                    },
                    Block::Heading { anchor, level, text } => RenderBlock::Heading {
                        anchor: anchor.clone(),
                        level: *level,
                        text: text.clone(),
                    },
                    Block::List { items, ordered: true } => RenderBlock::OrderedList {
                        items: items.iter().map(|item| return self.inlines(item)).collect(),
                    },
                    Block::List { items, ordered: false } => RenderBlock::UnorderedList {
                        items: items.iter().map(|item| return self.inlines(item)).collect(),
                    },
                    Block::Paragraph(inlines) => RenderBlock::Paragraph { inline_content: self.inlines(inlines) },
                };
            })
            .collect();
    }

    /// The discussion as a content section, when there is any.
    fn discussion(&mut self, blocks: &[Block]) -> Vec<PrimarySection> {
        if blocks.is_empty() {
            return Vec::new();
        }
        return vec![PrimarySection::Content { content: self.blocks(blocks) }];
    }

    /// Authored groups with only live links kept.
    fn groups(&mut self, groups: &[TopicGroup]) -> Vec<TaskGroup> {
        return groups
            .iter()
            .filter_map(|group| {
                let identifiers: Vec<RenderReferenceIdentifier> = group
                    .links
                    .iter()
                    .filter_map(|link| {
                        let LinkDestination::Resolved(reference) = &link.destination else {
                            return None;
                        };
                        let (identifier, live) = self.resolved(reference, &link.fallback_text());
                        return live.then_some(identifier);
                    })
                    .collect();
                if identifiers.is_empty() {
                    return None;
                }
                return Some(TaskGroup { generated: false, identifiers, title: group.title.clone() });
            })
            .collect();
    }

    /// Authored topic groups, then every uncurated child grouped by kind.
    fn topic_sections(&mut self, node: &DocumentationNode, authored: &[TopicGroup]) -> Vec<TaskGroup> {
        let mut sections = self.groups(authored);
        let curated: BTreeSet<String> = sections
            .iter()
            .flat_map(|g| return g.identifiers.iter().map(|i| return i.as_str().to_string()))
            .collect();

        let graph = self.translator.graph;
        let mut by_group: BTreeMap<(usize, String), Vec<&DocumentationNode>> = BTreeMap::new();
        for child in graph.children(&node.reference).iter().filter_map(|r| return graph.node(r)) {
            if child.kind == NodeKind::Redirect || curated.contains(&child.reference.identifier()) {
                continue;
            }
            let role = child.role();
            let key = CURATION_ORDER
                .iter()
                .position(|(r, _)| return *r == role)
                .map_or_else(
                    || return (CURATION_ORDER.len(), role.clone()),
                    |index| return (index, String::new()),
                );
            by_group.entry(key).or_default().push(child);
        }

        for ((index, role), mut children) in by_group {
            children.sort_by(|a, b| return (a.title(), &a.reference).cmp(&(b.title(), &b.reference)));
            let title = CURATION_ORDER
                .get(index)
                .map_or_else(|| return role.clone(), |(_, title)| return (*title).to_string());
            let identifiers = children
                .iter()
                .filter_map(|child| {
                    let (identifier, live) = self.resolved(&child.reference, child.title());
                    return live.then_some(identifier);
                })
                .collect();
            sections.push(TaskGroup { generated: true, identifiers, title });
        }
        return sections;
    }

    /// One section per relationship kind, targets in source order.
    fn relationships(&mut self, symbol: &SymbolContent) -> Vec<RelationshipsSection> {
        let mut by_kind: BTreeMap<RelationshipKind, Vec<RenderReferenceIdentifier>> = BTreeMap::new();
        for relationship in &symbol.relationships {
            let (identifier, _) = self.link(&relationship.target);
            by_kind.entry(relationship.kind).or_default().push(identifier);
        }
        return by_kind
            .into_iter()
            .map(|(kind, identifiers)| {
                return RelationshipsSection {
                    identifiers,
                    kind: relationship_key(kind).to_string(),
                    title: kind.title().to_string(),
                };
            })
            .collect();
    }

    /// Breadcrumbs from the module root to the parent.
    fn hierarchy(&mut self, node: &DocumentationNode) -> Hierarchy {
        let graph = self.translator.graph;
        let mut ancestors = Vec::new();
        let mut current = node.parent.as_ref().and_then(|p| return graph.node(p));
        while let Some(ancestor) = current {
            ancestors.push(ancestor);
            current = ancestor.parent.as_ref().and_then(|p| return graph.node(p));
        }
        let path: Vec<RenderReferenceIdentifier> = ancestors
            .iter()
            .rev()
            .map(|ancestor| return self.resolved(&ancestor.reference, ancestor.title()).0)
            .collect();
        return Hierarchy { paths: vec![path] };
    }
}

/// Page kind in rendered output.
const fn render_kind(kind: NodeKind) -> &'static str {
    return match kind {
        NodeKind::Article => "article",
        NodeKind::Module | NodeKind::Redirect | NodeKind::Symbol => "symbol",
        NodeKind::Tutorial => "project",
    };
}

/// Key used for a relationship section.
const fn relationship_key(kind: RelationshipKind) -> &'static str {
    return match kind {
        RelationshipKind::ConformsTo => "conformsTo",
        RelationshipKind::InheritsFrom => "inheritsFrom",
    };
}

/// Page metadata.
fn metadata(node: &DocumentationNode, symbol: Option<&SymbolContent>) -> Metadata {
    let role_heading = match (node.kind, symbol) {
        (NodeKind::Symbol | NodeKind::Module, Some(symbol)) => symbol.kind.display_name.clone(),
        (NodeKind::Tutorial, _) => "Tutorial".to_string(),
        (NodeKind::Article | NodeKind::Module | NodeKind::Redirect | NodeKind::Symbol, _) => "Article".to_string(),
    };
    return Metadata {
        module: symbol.map(|s| return s.module.clone()),
        platforms: symbol.map(|s| return s.availability.clone()).unwrap_or_default(),
        role: node.role(),
        role_heading,
        symbol_kind: symbol
            .filter(|_| return node.kind == NodeKind::Symbol)
            .map(|s| return s.kind.identifier.clone()),
        title: node.title().to_string(),
    };
}

/// Link-free copy of inline content for reference summaries.
fn flatten(inlines: &[Inline]) -> Vec<RenderInline> {
    if inlines.is_empty() {
        return Vec::new();
    }
    return vec![RenderInline::Text { text: plain_text(inlines) }];
}
