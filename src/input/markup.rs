//! Markup documents: block structure via tree-sitter-md, inline links via regex.
//!
//! Only the structure the compiler needs is read: headings, paragraphs, fenced
//! code, lists, the `## Topics` and `## See Also` sections, and the
//! `@Tutorial` and `@Redirect(...)` directives on lines of their own.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tree_sitter::{Language, Node, Parser};

use crate::error::Error;
use crate::reference::{UnresolvedReference, slugify};
use crate::semantic::{
    Block, Inline, Link, LinkDestination, Markup, TopicGroup, TutorialContent, TutorialSection,
};

/// Inline link forms, tried left to right at each position:
/// double-backtick symbol links, `<doc:...>` topic links, `[text](destination)`
/// links, and single-backtick code voice.
static INLINE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    return Regex::new(
        r"``(?P<symbol>[^`]+)``|<(?P<topic>doc:[^>\s]+)>|\[(?P<text>[^\]]+)\]\((?P<dest>[^)\s]+)\)|`(?P<code>[^`]+)`",
    )
    .ok();
});

/// A markup file as loaded from disk.
#[derive(Debug, Clone)]
pub struct MarkupDocument {
    /// File the document was read from; its stem names articles.
    pub path: PathBuf,
    /// Raw markdown.
    pub source: String,
}

impl MarkupDocument {
    /// Read a markup file.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the file is missing or `Error::Io` for
    /// other read failures.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let source = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(s) => s,
        };
        return Ok(Self { path: path.to_path_buf(), source });
    }

    /// File stem, used as the article name.
    pub fn name(&self) -> String {
        return self
            .path
            .file_stem()
            .and_then(|s| return s.to_str())
            .unwrap_or_default()
            .to_string();
    }
}

/// What a markup document turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedDocument {
    /// A free-form article.
    Article {
        /// Prose.
        docs: Markup,
        /// Title from the level-1 heading.
        title: String,
    },
    /// Additional documentation for a symbol named by the title link.
    Extension {
        /// Prose to merge.
        docs: Markup,
        /// The symbol the extension documents.
        target: UnresolvedReference,
    },
    /// A forwarding stub.
    Redirect {
        /// Where to forward to.
        target: UnresolvedReference,
        /// Title, or the file stem when the stub has none.
        title: String,
    },
    /// A tutorial.
    Tutorial(TutorialContent),
}

/// Block structure before inline parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RawBlock {
    /// Fenced code.
    Code {
        /// Code text.
        code: String,
        /// Info string.
        language: Option<String>,
    },
    /// Heading with level 1..=6.
    Heading {
        /// Level.
        level: u8,
        /// Text with whitespace normalized.
        text: String,
    },
    /// List with one text run per item.
    List {
        /// Item texts.
        items: Vec<String>,
        /// Numbered list.
        ordered: bool,
    },
    /// Paragraph text with whitespace normalized.
    Paragraph(String),
}

/// Parse a markup document into a page description.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if tree-sitter cannot parse the source, or
/// `Error::MalformedDocument` if the document has no title or a directive is
/// unusable.
pub fn parse_document(document: &MarkupDocument) -> Result<ParsedDocument, Error> {
    let blocks = parse_blocks(&document.path, &document.source)?;
    let (directives, blocks): (Vec<RawBlock>, Vec<RawBlock>) = blocks
        .into_iter()
        .partition(|b| return matches!(b, RawBlock::Paragraph(text) if is_directive(text)));
    let directives: Vec<String> = directives
        .into_iter()
        .filter_map(|b| {
            return match b {
                RawBlock::Paragraph(text) => Some(text),
                RawBlock::Code { .. } | RawBlock::Heading { .. } | RawBlock::List { .. } => None,
            };
        })
        .collect();

    let (title, body) = split_title(blocks);

    if let Some(target) = directives.iter().find_map(|d| return redirect_target(d)) {
        let target = UnresolvedReference::parse(&target).map_err(|e| {
            return malformed_document(&document.path, &format!("bad redirect target: {e}"));
        })?;
        return Ok(ParsedDocument::Redirect {
            target,
            title: title.unwrap_or_else(|| return document.name()),
        });
    }

    let Some(title) = title else {
        return Err(malformed_document(&document.path, "document has no level-1 title"));
    };

    if directives.iter().any(|d| return d.starts_with("@Tutorial")) {
        return Ok(ParsedDocument::Tutorial(assemble_tutorial(title, body)));
    }

    if let Some(symbol) = title.strip_prefix("``").and_then(|t| return t.strip_suffix("``")) {
        let target = UnresolvedReference::parse(symbol).map_err(|e| {
            return malformed_document(&document.path, &format!("bad extension title: {e}"));
        })?;
        return Ok(ParsedDocument::Extension { docs: assemble_markup(body), target });
    }

    return Ok(ParsedDocument::Article { docs: assemble_markup(body), title });
}

/// Parse untitled documentation, such as a symbol's doc comment.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if tree-sitter cannot parse the source.
pub fn parse_documentation(origin: &Path, source: &str) -> Result<Markup, Error> {
    let blocks = parse_blocks(origin, source)?;
    return Ok(assemble_markup(blocks));
}

/// Parse markdown into a flat list of raw blocks.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the language cannot be set or parsing fails.
fn parse_blocks(file_path: &Path, source: &str) -> Result<Vec<RawBlock>, Error> {
    let language: Language = tree_sitter_md::LANGUAGE.into();
    let mut parser = Parser::new();
    parser.set_language(&language).map_err(|e| {
        return Error::ParseFailed {
            file: file_path.to_path_buf(),
            reason: e.to_string(),
        };
    })?;

    let tree = parser.parse(source, None).ok_or_else(|| {
        return Error::ParseFailed {
            file: file_path.to_path_buf(),
            reason: "tree-sitter returned None".to_string(),
        };
    })?;

    let mut blocks = Vec::new();
    collect_blocks(tree.root_node(), source, &mut blocks);
    return Ok(blocks);
}

/// Walk container nodes and collect the blocks they hold, in source order.
fn collect_blocks(node: Node<'_>, source: &str, blocks: &mut Vec<RawBlock>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "section" | "block_quote" => collect_blocks(child, source, blocks),
            "atx_heading" | "setext_heading" => {
                if let Some(heading) = heading_block(child, source) {
                    blocks.push(heading);
                }
            },
            "paragraph" => {
                let text = normalized_text(child, source);
                blocks.extend(split_directive_lines(&text));
            },
            "fenced_code_block" => blocks.push(code_block(child, source)),
            "list" => blocks.push(list_block(child, source)),
            _ => {},
        }
    }
}

/// Whether a paragraph is one of the directives the compiler understands.
fn is_directive(text: &str) -> bool {
    return text.starts_with("@Tutorial") || text.starts_with("@Redirect(");
}

/// Directives written on consecutive lines end up in one paragraph; split them.
fn split_directive_lines(text: &str) -> Vec<RawBlock> {
    if !is_directive(text) {
        return vec![RawBlock::Paragraph(text.to_string())];
    }
    return text
        .split(" @")
        .map(|part| {
            let directive = if part.starts_with('@') { part.to_string() } else { format!("@{part}") };
            return RawBlock::Paragraph(directive);
        })
        .collect();
}

/// Read an ATX or setext heading.
fn heading_block(node: Node<'_>, source: &str) -> Option<RawBlock> {
    let mut level = None;
    let mut text = None;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let kind = child.kind();
        if let Some(digit) = kind
            .strip_prefix("atx_h")
            .or_else(|| return kind.strip_prefix("setext_h"))
            .and_then(|rest| return rest.split('_').next())
        {
            level = digit.parse::<u8>().ok();
        }
        if kind == "inline" || kind == "heading_content" || kind == "paragraph" {
            text = Some(normalized_text(child, source));
        }
    }

    let text = text.or_else(|| {
        let raw = node.utf8_text(source.as_bytes()).ok()?;
        return Some(raw.trim_start_matches('#').trim().to_string());
    })?;
    if text.is_empty() {
        return None;
    }
    return Some(RawBlock::Heading { level: level.unwrap_or(1), text });
}

/// Read a fenced code block.
fn code_block(node: Node<'_>, source: &str) -> RawBlock {
    let mut language = None;
    let mut code = String::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "info_string" => {
                language = child
                    .utf8_text(source.as_bytes())
                    .ok()
                    .map(|s| return s.trim().to_string())
                    .filter(|s| return !s.is_empty());
            },
            "code_fence_content" => {
                code = child.utf8_text(source.as_bytes()).unwrap_or_default().to_string();
            },
            _ => {},
        }
    }
    return RawBlock::Code {
        code: code.trim_end_matches('\n').to_string(),
        language,
    };
}

/// Read a list; each item's paragraphs become one text run.
fn list_block(node: Node<'_>, source: &str) -> RawBlock {
    let mut items = Vec::new();
    let mut ordered = false;
    let mut cursor = node.walk();
    for item in node.children(&mut cursor) {
        if item.kind() != "list_item" {
            continue;
        }
        let mut parts = Vec::new();
        let mut item_cursor = item.walk();
        for child in item.children(&mut item_cursor) {
            match child.kind() {
                "list_marker_dot" | "list_marker_parenthesis" => ordered = true,
                "paragraph" => parts.push(normalized_text(child, source)),
                _ => {},
            }
        }
        items.push(parts.join(" "));
    }
    return RawBlock::List { items, ordered };
}

/// Node text with line breaks and indentation collapsed to single spaces.
fn normalized_text(node: Node<'_>, source: &str) -> String {
    let raw = node.utf8_text(source.as_bytes()).unwrap_or_default();
    return raw
        .lines()
        .map(str::trim)
        .filter(|line| return !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
}

/// Take the first level-1 heading as the title; the rest is the body.
fn split_title(blocks: Vec<RawBlock>) -> (Option<String>, Vec<RawBlock>) {
    let mut title = None;
    let mut body = Vec::with_capacity(blocks.len());
    for block in blocks {
        match block {
            RawBlock::Heading { level: 1, text } if title.is_none() => title = Some(text),
            other => body.push(other),
        }
    }
    return (title, body);
}

/// The link inside `@Redirect(...)`, without `<doc:>` or backtick wrappers.
fn redirect_target(directive: &str) -> Option<String> {
    let inner = directive
        .strip_prefix("@Redirect(")?
        .trim_end()
        .strip_suffix(')')?
        .trim();
    let unwrapped = inner
        .strip_prefix('<')
        .and_then(|s| return s.strip_suffix('>'))
        .or_else(|| return inner.strip_prefix("``").and_then(|s| return s.strip_suffix("``")))
        .unwrap_or(inner);
    return Some(unwrapped.to_string());
}

/// Where the assembler is routing blocks.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    /// Ordinary prose.
    Discussion,
    /// Inside `## See Also`.
    SeeAlso,
    /// Inside `## Topics`.
    Topics,
}

/// Sort raw blocks into abstract, discussion, topics, and see-also.
fn assemble_markup(blocks: Vec<RawBlock>) -> Markup {
    let mut markup = Markup::default();
    let mut section = Section::Discussion;
    let mut first_block = true;

    for block in blocks {
        let is_first = std::mem::replace(&mut first_block, false);
        match block {
            RawBlock::Heading { level: 2, text } if text.eq_ignore_ascii_case("topics") => {
                section = Section::Topics;
            },
            RawBlock::Heading { level: 2, text } if text.eq_ignore_ascii_case("see also") => {
                section = Section::SeeAlso;
            },
            RawBlock::Heading { level, text } if section != Section::Discussion && level >= 3 => {
                group_list(&mut markup, section).push(TopicGroup { links: Vec::new(), title: text });
            },
            RawBlock::List { items, .. } if section != Section::Discussion => {
                let default_title = if section == Section::Topics { "Topics" } else { "See Also" };
                let groups = group_list(&mut markup, section);
                if groups.is_empty() {
                    groups.push(TopicGroup { links: Vec::new(), title: default_title.to_string() });
                }
                if let Some(group) = groups.last_mut() {
                    group.links.extend(items.iter().flat_map(|item| return links_in(item)));
                }
            },
            RawBlock::Paragraph(text) if section != Section::Discussion => {
                tracing::debug!(paragraph = %text, "ignoring prose inside a topic section");
            },
            RawBlock::Paragraph(text) if is_first => markup.abstract_text = parse_inlines(&text),
            other => {
                section = Section::Discussion;
                markup.discussion.push(to_block(other));
            },
        }
    }
    return markup;
}

/// The topic or see-also group list for the current section.
fn group_list(markup: &mut Markup, section: Section) -> &mut Vec<TopicGroup> {
    return match section {
        Section::SeeAlso => &mut markup.see_also,
        Section::Discussion | Section::Topics => &mut markup.topics,
    };
}

/// Build a tutorial: each level-2 heading opens a section, numbered lists are steps.
fn assemble_tutorial(title: String, blocks: Vec<RawBlock>) -> TutorialContent {
    let mut tutorial = TutorialContent {
        abstract_text: Vec::new(),
        sections: Vec::new(),
        title,
    };

    for (index, block) in blocks.into_iter().enumerate() {
        match block {
            RawBlock::Heading { level: 2, text } => tutorial.sections.push(TutorialSection {
                anchor: slugify(&text),
                content: Vec::new(),
                steps: Vec::new(),
                title: text,
            }),
            RawBlock::Paragraph(text) if index == 0 => tutorial.abstract_text = parse_inlines(&text),
            other => {
                let Some(section) = tutorial.sections.last_mut() else {
                    tracing::debug!("ignoring tutorial content before the first section");
                    continue;
                };
                match other {
                    RawBlock::List { items, ordered: true } => {
                        section.steps.extend(items.iter().map(|item| return parse_inlines(item)));
                    },
                    block => section.content.push(to_block(block)),
                }
            },
        }
    }
    return tutorial;
}

/// Convert a raw block into semantic content.
fn to_block(block: RawBlock) -> Block {
    return match block {
        RawBlock::Code { code, language } => Block::CodeListing { code, language },
        RawBlock::Heading { level, text } => Block::Heading {
            anchor: slugify(&text),
            level,
            text,
        },
        RawBlock::List { items, ordered } => Block::List {
            items: items.iter().map(|item| return parse_inlines(item)).collect(),
            ordered,
        },
        RawBlock::Paragraph(text) => Block::Paragraph(parse_inlines(&text)),
    };
}

/// The links in a list item; other text is dropped.
fn links_in(text: &str) -> Vec<Link> {
    return parse_inlines(text)
        .into_iter()
        .filter_map(|inline| {
            return match inline {
                Inline::Link(link) => Some(link),
                Inline::CodeVoice(_) | Inline::Text(_) => None,
            };
        })
        .collect();
}

/// Split text into plain runs, code voice, and links.
pub fn parse_inlines(text: &str) -> Vec<Inline> {
    let Some(pattern) = INLINE_PATTERN.as_ref() else {
        return vec![Inline::Text(text.to_string())];
    };

    let mut inlines = Vec::new();
    let mut last = 0;
    for caps in pattern.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last {
            inlines.push(Inline::Text(text.get(last..whole.start()).unwrap_or_default().to_string()));
        }
        inlines.push(inline_from_capture(&caps));
        last = whole.end();
    }
    if last < text.len() {
        inlines.push(Inline::Text(text.get(last..).unwrap_or_default().to_string()));
    }
    return inlines;
}

/// Turn one regex match into an inline element.
/// Link text that does not parse as a reference falls back to code or text.
fn inline_from_capture(caps: &Captures<'_>) -> Inline {
    if let Some(symbol) = caps.name("symbol") {
        return match UnresolvedReference::parse(symbol.as_str()) {
            Ok(reference) => Inline::Link(Link::unresolved(reference, None)),
            Err(_) => Inline::CodeVoice(symbol.as_str().to_string()),
        };
    }
    if let Some(topic) = caps.name("topic") {
        return match UnresolvedReference::parse(topic.as_str()) {
            Ok(reference) => Inline::Link(Link::unresolved(reference, None)),
            Err(_) => Inline::Text(topic.as_str().to_string()),
        };
    }
    if let (Some(text), Some(dest)) = (caps.name("text"), caps.name("dest")) {
        let title = Some(text.as_str().to_string());
        return match UnresolvedReference::parse(dest.as_str()) {
            Ok(reference) if reference.is_url() => Inline::Link(Link {
                destination: LinkDestination::Url(reference.raw),
                title,
            }),
            Ok(reference) => Inline::Link(Link::unresolved(reference, title)),
            Err(_) => Inline::Text(text.as_str().to_string()),
        };
    }
    let code = caps.name("code").map(|m| return m.as_str()).unwrap_or_default();
    return Inline::CodeVoice(code.to_string());
}

/// Build a malformed-document error.
fn malformed_document(path: &Path, reason: &str) -> Error {
    return Error::MalformedDocument {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
}
