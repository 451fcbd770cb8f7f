//! Semantic tree: the resolved-or-not content of one documentation node.
//!
//! Every node category is a closed variant of [`SemanticContent`]. Passes over
//! the tree (link resolution, render translation) match on the variant rather
//! than dispatching through trait objects, so a new category is a compile
//! error everywhere it is not handled.

use serde::{Deserialize, Serialize};

use crate::reference::{ResolutionFailure, ResolvedReference, UnresolvedReference};

/// Availability of a symbol on one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    /// Version that deprecated the symbol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    /// Version that introduced the symbol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introduced: Option<String>,
    /// Platform name, e.g. `macOS`.
    pub platform: String,
}

/// Where a link points, at each stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDestination {
    /// Resolution was attempted and failed.
    Failed(ResolutionFailure),
    /// Resolution selected this unique target.
    Resolved(ResolvedReference),
    /// Parsed from markup, not resolved yet.
    Unresolved(UnresolvedReference),
    /// A web URL, carried through unchanged.
    Url(String),
}

/// A link in running text or in a topic group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Target of the link.
    pub destination: LinkDestination,
    /// Authored link text; `None` means "use the target's title".
    pub title: Option<String>,
}

impl Link {
    /// A link awaiting resolution.
    pub const fn unresolved(reference: UnresolvedReference, title: Option<String>) -> Self {
        return Self {
            destination: LinkDestination::Unresolved(reference),
            title,
        };
    }

    /// Text to show for this link when it must be flattened to plain text.
    pub fn fallback_text(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        return match &self.destination {
            LinkDestination::Failed(failure) => failure.reference.clone(),
            LinkDestination::Resolved(reference) => {
                reference.path.last().cloned().unwrap_or_default()
            },
            LinkDestination::Unresolved(reference) => reference
                .components
                .last()
                .map_or_else(|| return reference.raw.clone(), |c| return c.raw.clone()),
            LinkDestination::Url(url) => url.clone(),
        };
    }
}

/// Inline content inside a paragraph, heading, or list item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    /// Code span.
    CodeVoice(String),
    /// Cross-reference or web link.
    Link(Link),
    /// Plain text.
    Text(String),
}

/// Block-level content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Fenced code.
    CodeListing {
        /// Source text.
        code: String,
        /// Info string, if the fence named one.
        language: Option<String>,
    },
    /// Section heading inside the discussion.
    Heading {
        /// Slug used for `#fragment` links.
        anchor: String,
        /// 2 for `##`, and so on.
        level: u8,
        /// Heading text.
        text: String,
    },
    /// Bulleted or numbered list; each item is one run of inline content.
    List {
        /// Items in source order.
        items: Vec<Vec<Inline>>,
        /// True for numbered lists.
        ordered: bool,
    },
    /// A paragraph.
    Paragraph(Vec<Inline>),
}

/// A titled group of links, as authored under `## Topics` or `## See Also`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicGroup {
    /// Links in authored order.
    pub links: Vec<Link>,
    /// Group heading.
    pub title: String,
}

/// Prose shared by symbols and articles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup {
    /// First paragraph.
    pub abstract_text: Vec<Inline>,
    /// Everything after the abstract that is not a topic or see-also section.
    pub discussion: Vec<Block>,
    /// Authored see-also groups.
    pub see_also: Vec<TopicGroup>,
    /// Authored topic groups.
    pub topics: Vec<TopicGroup>,
}

impl Markup {
    /// Merge a documentation extension into in-source documentation.
    /// An empty abstract is replaced; discussion and groups are appended.
    pub fn merge_extension(&mut self, extension: Self) {
        if self.abstract_text.is_empty() {
            self.abstract_text = extension.abstract_text;
        }
        self.discussion.extend(extension.discussion);
        self.topics.extend(extension.topics);
        self.see_also.extend(extension.see_also);
    }

    /// Visit every link in reading order.
    fn for_each_link_mut(&mut self, visit: &mut dyn FnMut(&mut Link)) {
        inlines_links_mut(&mut self.abstract_text, visit);
        blocks_links_mut(&mut self.discussion, visit);
        for group in self.topics.iter_mut().chain(self.see_also.iter_mut()) {
            for link in &mut group.links {
                visit(link);
            }
        }
    }

    /// Heading anchors available as link fragments.
    fn anchors(&self) -> Vec<String> {
        return block_anchors(&self.discussion);
    }
}

/// Kind of a symbol, as reported by the symbol graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolKind {
    /// Human-readable kind, e.g. `Instance Method`.
    pub display_name: String,
    /// Kind identifier without language prefix, e.g. `method`.
    pub identifier: String,
}

/// The same symbol as seen from another interface language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageVariant {
    /// Declaration in that language.
    pub declaration: String,
    /// Interface language identifier, e.g. `occ`.
    pub interface_language: String,
    /// Title in that language.
    pub title: String,
}

/// Category of a rendered relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationshipKind {
    /// Protocol conformance.
    ConformsTo,
    /// Class inheritance.
    InheritsFrom,
}

impl RelationshipKind {
    /// Section title for this relationship.
    pub const fn title(self) -> &'static str {
        return match self {
            Self::ConformsTo => "Conforms To",
            Self::InheritsFrom => "Inherits From",
        };
    }
}

/// A typed edge from a symbol to another symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRelationship {
    /// Relationship category.
    pub kind: RelationshipKind,
    /// Target, resolved at graph build time when local.
    pub target: Link,
}

/// Content of a symbol page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolContent {
    /// Platforms the symbol is available on.
    pub availability: Vec<Availability>,
    /// Declaration in the primary language.
    pub declaration: String,
    /// In-source documentation, merged with any extension file.
    pub docs: Markup,
    /// Primary interface language.
    pub interface_language: String,
    /// Symbol kind.
    pub kind: SymbolKind,
    /// Module that declares the symbol.
    pub module: String,
    /// Precise (compiler-unique) identifier.
    pub precise: String,
    /// Outgoing relationships.
    pub relationships: Vec<SymbolRelationship>,
    /// Title in the primary language.
    pub title: String,
    /// Other-language presentations of the same symbol.
    pub variants: Vec<LanguageVariant>,
}

/// Content of a free-form article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleContent {
    /// Article prose.
    pub docs: Markup,
    /// Article title.
    pub title: String,
}

/// One section of a tutorial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorialSection {
    /// Slug of the section title.
    pub anchor: String,
    /// Introductory blocks of the section.
    pub content: Vec<Block>,
    /// Numbered steps, one inline run each.
    pub steps: Vec<Vec<Inline>>,
    /// Section title.
    pub title: String,
}

/// Content of a tutorial page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorialContent {
    /// First paragraph.
    pub abstract_text: Vec<Inline>,
    /// Sections in order.
    pub sections: Vec<TutorialSection>,
    /// Tutorial title.
    pub title: String,
}

/// A page that forwards to another page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectContent {
    /// Where links to this page should land instead.
    pub target: UnresolvedReference,
    /// Title of the stub.
    pub title: String,
}

/// The content of one documentation node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticContent {
    /// Free-form article.
    Article(ArticleContent),
    /// Forwarding stub; never rendered.
    Redirect(RedirectContent),
    /// API symbol, including modules.
    Symbol(Box<SymbolContent>),
    /// Step-by-step tutorial.
    Tutorial(TutorialContent),
}

impl SemanticContent {
    /// Page title.
    pub fn title(&self) -> &str {
        return match self {
            Self::Article(article) => &article.title,
            Self::Redirect(redirect) => &redirect.title,
            Self::Symbol(symbol) => &symbol.title,
            Self::Tutorial(tutorial) => &tutorial.title,
        };
    }

    /// Abstract inline content; empty for redirects.
    pub fn abstract_inlines(&self) -> &[Inline] {
        return match self {
            Self::Article(article) => &article.docs.abstract_text,
            Self::Redirect(_) => &[],
            Self::Symbol(symbol) => &symbol.docs.abstract_text,
            Self::Tutorial(tutorial) => &tutorial.abstract_text,
        };
    }

    /// Heading anchors a `#fragment` may name.
    pub fn anchors(&self) -> Vec<String> {
        return match self {
            Self::Article(article) => article.docs.anchors(),
            Self::Redirect(_) => Vec::new(),
            Self::Symbol(symbol) => symbol.docs.anchors(),
            Self::Tutorial(tutorial) => tutorial
                .sections
                .iter()
                .flat_map(|section| {
                    let mut anchors = vec![section.anchor.clone()];
                    anchors.extend(block_anchors(&section.content));
                    return anchors;
                })
                .collect(),
        };
    }

    /// Visit every link that the page renders, in reading order.
    pub fn for_each_link_mut(&mut self, visit: &mut dyn FnMut(&mut Link)) {
        match self {
            Self::Article(article) => article.docs.for_each_link_mut(visit),
            Self::Redirect(_) => {},
            Self::Symbol(symbol) => {
                symbol.docs.for_each_link_mut(visit);
                for relationship in &mut symbol.relationships {
                    visit(&mut relationship.target);
                }
            },
            Self::Tutorial(tutorial) => {
                inlines_links_mut(&mut tutorial.abstract_text, visit);
                for section in &mut tutorial.sections {
                    blocks_links_mut(&mut section.content, visit);
                    for step in &mut section.steps {
                        inlines_links_mut(step, visit);
                    }
                }
            },
        }
    }
}

/// Visit links in a run of inline content.
fn inlines_links_mut(inlines: &mut [Inline], visit: &mut dyn FnMut(&mut Link)) {
    for inline in inlines {
        if let Inline::Link(link) = inline {
            visit(link);
        }
    }
}

/// Visit links in block content.
fn blocks_links_mut(blocks: &mut [Block], visit: &mut dyn FnMut(&mut Link)) {
    for block in blocks {
        match block {
            Block::CodeListing { .. } | Block::Heading { .. } => {},
            Block::List { items, .. } => {
                for item in items {
                    inlines_links_mut(item, visit);
                }
            },
            Block::Paragraph(inlines) => inlines_links_mut(inlines, visit),
        }
    }
}

/// Anchors of every heading block.
fn block_anchors(blocks: &[Block]) -> Vec<String> {
    return blocks
        .iter()
        .filter_map(|block| {
            return match block {
                Block::Heading { anchor, .. } => Some(anchor.clone()),
                Block::CodeListing { .. } | Block::List { .. } | Block::Paragraph(_) => None,
            };
        })
        .collect();
}

/// Flatten inline content to plain text, replacing links with their text.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut text = String::new();
    for inline in inlines {
        match inline {
            Inline::CodeVoice(code) => text.push_str(code),
            Inline::Link(link) => text.push_str(&link.fallback_text()),
            Inline::Text(plain) => text.push_str(plain),
        }
    }
    return text;
}
