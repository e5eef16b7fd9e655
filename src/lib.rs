//! # diffctx: Change-context engine for Java sources
//!
//! Extracts the structural and temporal context around a focal method change:
//! the members of the classes it touches, their inheritance chain, and the
//! diff windows at the places the method is used.
//!
//! ## Architecture
//!
//! - **[`syntax`]**: Tree-sitter Java parsing, node kinds, structural queries and text cleanup
//! - **[`position`]**: Line/character positions, offsets and relocation between texts
//! - **[`splitter`]**: Per-member declaration units, nested types, parent type recursion
//! - **[`diff`]**: Myers line diff, target hunk alignment and bounded context windows
//! - **[`metadata`]**: Method metadata, signatures and signature-level diffs
//! - **[`operations`]**: What a test does with the arguments and result of a focal call
//! - **[`collab`]**: Traits for definition lookup, references, revisions, canonicalization, ranking
//! - **[`collector`]**: Combines all of the above for one method change
//! - **[`config`]**: JSON configuration loading and validation
//! - **[`error`]**: The library error type

pub mod collab;
pub mod collector;
pub mod config;
pub mod diff;
pub mod error;
pub mod metadata;
pub mod operations;
pub mod position;
pub mod splitter;
pub mod syntax;

pub use diff::{ContextPolicy, ContextRadius, ContextWindow, diff_and_window, locate_and_extract, window};
pub use error::{ContextError, Result};
pub use metadata::{MethodMetadata, extract_metadata, render_signature};
pub use position::{Position, relocate, to_offset, to_position};
pub use splitter::{DeclarationUnit, split};
pub use syntax::SyntaxTree;
