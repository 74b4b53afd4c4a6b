//! Position queries over checked modules
//!
//! Every feature here is a pure function of a parsed [`SourceModule`], its
//! checked [`Module`] and a position. Freshness is the caller's concern: the
//! workspace runs [`AnalysisCache::ensure_fresh`] before dispatching here.
//!
//! # Architecture Overview
//!
//! ```text
//! Workspace query (hover, completion, ...)
//!       ↓
//! node_finder ── position → node / expression / local / ancestry
//!       ↓
//! feature module ── types, scopes, documentation → LSP value
//! ```
//!
//! - `node_finder.rs` - Position-to-node resolution shared by all features
//! - `hover.rs` - Type tooltips with documentation
//! - `signature_help.rs` - Signatures of the call around the cursor
//! - `goto_definition.rs` - Declaration and type alias locations
//! - `document_links.rs` - Links on top-level `require` calls
//! - `completion.rs` - Rendering of engine autocomplete entries
//!
//! [`SourceModule`]: crate::engine::SourceModule
//! [`Module`]: crate::engine::Module
//! [`AnalysisCache::ensure_fresh`]: crate::lsp::workspace::cache::AnalysisCache::ensure_fresh

pub mod completion;
pub mod document_links;
pub mod goto_definition;
pub mod hover;
pub mod node_finder;
pub mod signature_help;

pub use completion::completion_items;
pub use document_links::document_links;
pub use goto_definition::{goto_definition, goto_type_definition};
pub use hover::hover;
pub use signature_help::signature_help;
