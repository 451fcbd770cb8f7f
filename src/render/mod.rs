//! Render output: page JSON, the shared reference store, and language variant patches.

pub mod node;
pub mod store;
pub mod translator;
pub mod variant;

pub use self::node::{RenderNode, RenderReference, RenderReferenceIdentifier};
pub use self::store::ReferenceStore;
pub use self::translator::RenderTranslator;
pub use self::variant::PatchOperation;
