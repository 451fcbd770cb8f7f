//! Render node types: the self-contained JSON a page is written as.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::render::variant::PatchOperation;
use crate::semantic::Availability;

/// Identity of a rendered reference. One per resolved target; equal to the
/// target's `doc://` identifier, or to the link text for placeholders.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderReferenceIdentifier(pub String);

impl RenderReferenceIdentifier {
    /// The identifier text.
    pub fn as_str(&self) -> &str {
        return &self.0;
    }
}

/// Inline content with links replaced by reference identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RenderInline {
    /// Code span.
    CodeVoice {
        /// Code text.
        code: String,
    },
    /// A link; the target is described by the page's `references`.
    #[serde(rename_all = "camelCase")]
    Reference {
        /// Key into the page's references.
        identifier: RenderReferenceIdentifier,
        /// False for placeholders of links that did not resolve.
        is_active: bool,
        /// Authored link text replacing the target's title.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        override_title: Option<String>,
    },
    /// Plain text.
    Text {
        /// Text.
        text: String,
    },
}

/// Block content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RenderBlock {
    /// Fenced code, one entry per line.
    CodeListing {
        /// Lines of code.
        code: Vec<String>,
        /// Info string.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        syntax: Option<String>,
    },
    /// Heading.
    Heading {
        /// Fragment anchor.
        anchor: String,
        /// Heading level.
        level: u8,
        /// Heading text.
        text: String,
    },
    /// Numbered list.
    OrderedList {
        /// Items, one inline run each.
        items: Vec<Vec<RenderInline>>,
    },
    /// Paragraph.
    #[serde(rename_all = "camelCase")]
    Paragraph {
        /// Inline content.
        inline_content: Vec<RenderInline>,
    },
    /// Bulleted list.
    UnorderedList {
        /// Items, one inline run each.
        items: Vec<Vec<RenderInline>>,
    },
}

/// A declaration in one or more languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    /// Interface languages the declaration applies to.
    pub languages: Vec<String>,
    /// Declaration text.
    pub text: String,
}

/// Main body sections of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PrimarySection {
    /// Discussion prose.
    Content {
        /// Blocks in order.
        content: Vec<RenderBlock>,
    },
    /// Symbol declarations.
    Declarations {
        /// One per language group.
        declarations: Vec<Declaration>,
    },
}

/// A titled list of linked pages: topics or see-also.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskGroup {
    /// True for groups made by automatic curation.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub generated: bool,
    /// Linked pages in order.
    pub identifiers: Vec<RenderReferenceIdentifier>,
    /// Group title.
    pub title: String,
}

/// Symbols a page conforms to or inherits from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipsSection {
    /// Target pages.
    pub identifiers: Vec<RenderReferenceIdentifier>,
    /// Relationship kind, e.g. `conformsTo`.
    pub kind: String,
    /// Section title.
    pub title: String,
}

/// A rendered tutorial section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderTutorialSection {
    /// Fragment anchor.
    pub anchor: String,
    /// Introductory blocks.
    pub content: Vec<RenderBlock>,
    /// Numbered steps.
    pub steps: Vec<Vec<RenderInline>>,
    /// Section title.
    pub title: String,
}

/// Identity of a rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNodeIdentifier {
    /// Language the page is presented in.
    pub interface_language: String,
    /// The page's `doc://` identifier.
    pub url: String,
}

/// Page metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Declaring module, for symbols.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Platform availability.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<Availability>,
    /// Page role: the symbol kind for symbols, otherwise `article`, `collection` or `project`.
    pub role: String,
    /// Eyebrow text above the title.
    pub role_heading: String,
    /// Symbol kind identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_kind: Option<String>,
    /// Page title.
    pub title: String,
}

/// Breadcrumbs: identifiers from the module root down to the parent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hierarchy {
    /// One path per way the page is reached.
    pub paths: Vec<Vec<RenderReferenceIdentifier>>,
}

/// Trait a variant applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantTrait {
    /// Interface language of the variant.
    pub interface_language: String,
}

/// A language variant of a page as a patch on the base page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOverride {
    /// Operations turning the base page into the variant.
    pub patch: Vec<PatchOperation>,
    /// When the patch applies.
    pub traits: Vec<VariantTrait>,
}

/// A rendered reference: link-free summary of a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RenderReference {
    /// A web URL.
    Link {
        /// Identifier, equal to the URL.
        identifier: RenderReferenceIdentifier,
        /// Link text.
        title: String,
        /// Destination.
        url: String,
    },
    /// A documentation page, local or external.
    Topic {
        /// Abstract with links flattened to text.
        #[serde(rename = "abstract")]
        abstract_content: Vec<RenderInline>,
        /// Identifier.
        identifier: RenderReferenceIdentifier,
        /// Page kind.
        kind: String,
        /// Page role.
        role: String,
        /// Page title.
        title: String,
        /// Page URL.
        url: String,
    },
    /// Placeholder for a link that did not resolve.
    Unresolved {
        /// Identifier, equal to the link text.
        identifier: RenderReferenceIdentifier,
        /// Text to show instead of a link.
        title: String,
    },
}

impl RenderReference {
    /// The reference's identifier.
    pub const fn identifier(&self) -> &RenderReferenceIdentifier {
        return match self {
            Self::Link { identifier, .. } | Self::Topic { identifier, .. } | Self::Unresolved { identifier, .. } => {
                identifier
            },
        };
    }
}

/// A rendered page. Self-contained: `references` holds every reference the
/// page uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNode {
    /// Abstract.
    #[serde(rename = "abstract")]
    pub abstract_content: Vec<RenderInline>,
    /// Breadcrumbs.
    pub hierarchy: Hierarchy,
    /// Page identity.
    pub identifier: RenderNodeIdentifier,
    /// Page kind: `symbol`, `article`, or `project`.
    pub kind: String,
    /// Metadata.
    pub metadata: Metadata,
    /// Declarations and discussion.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primary_content_sections: Vec<PrimarySection>,
    /// Every reference the page uses.
    #[serde(default)]
    pub references: BTreeMap<RenderReferenceIdentifier, RenderReference>,
    /// Conformances and superclasses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships_sections: Vec<RelationshipsSection>,
    /// Tutorial sections.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<RenderTutorialSection>,
    /// Related pages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub see_also_sections: Vec<TaskGroup>,
    /// Child pages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topic_sections: Vec<TaskGroup>,
    /// Patches for other interface languages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variant_overrides: Vec<VariantOverride>,
}
