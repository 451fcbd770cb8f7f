//! Build inputs. Partial input sets are legal: a single page's data may be
//! compiled without the rest of the project.

pub mod markup;
pub mod symbols;

pub use markup::MarkupDocument;
pub use symbols::SymbolGraphFile;

/// Everything one compilation reads, already loaded into memory.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    /// Markup documents: articles, extensions, tutorials, redirects.
    pub documents: Vec<MarkupDocument>,
    /// One symbol graph per module and interface language.
    pub symbol_graphs: Vec<SymbolGraphFile>,
}
