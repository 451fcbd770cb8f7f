//! docweave: a documentation compiler.
//!
//! Symbol graphs and markup build one [`graph::DocumentationGraph`] per bundle.
//! Every page's links are resolved through [`resolver::LinkResolver`], which
//! memoizes outcomes in a [`cache::ResolutionCache`] and delegates links into
//! other bundles to [`fallback::FallbackResolver`]s. Resolved pages are
//! translated into render JSON with shared references kept once in a
//! [`render::ReferenceStore`] and language variants reduced to patches.

pub mod cache;
pub mod catalog;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fallback;
pub mod graph;
pub mod hasher;
pub mod input;
pub mod lockfile;
pub mod output;
pub mod reference;
pub mod render;
pub mod resolver;
pub mod semantic;

pub use crate::error::Error;
