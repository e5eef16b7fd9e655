//! Contracts for the external services the engine calls into.
//!
//! The engine never touches the file system, a version-control repository or a
//! language server itself. Everything it needs from them goes through these
//! traits, which are called synchronously and treated as blocking, fallible
//! operations. Retry and timeout policy belong to the implementation.
pub mod memory;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::position::Position;

/// The two revisions a change is observed between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Revision {
    Before,
    After,
}

/// A span inside a repository-relative file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    pub start: Position,
    pub end: Position,
}

impl Location {
    #[must_use]
    pub fn new(path: impl Into<String>, start: Position, end: Position) -> Self {
        Self {
            path: path.into(),
            start,
            end,
        }
    }
}

/// Resolves a name reference to its declaration site.
pub trait DefinitionResolver: Send + Sync {
    /// `Ok(None)` for names declared outside the repository (library types).
    fn find_definition(&self, path: &str, position: Position) -> Result<Option<Location>>;
}

/// Resolves every usage site of a declaration.
pub trait ReferenceFinder: Send + Sync {
    fn find_references(&self, path: &str, position: Position) -> Result<Vec<Location>>;
}

/// File content at one of the two revisions.
pub trait RevisionReader: Send + Sync {
    /// Empty text when the file does not exist at `revision`.
    fn read_file(&self, path: &str, revision: Revision) -> Result<String>;
}

/// Output of a [`Canonicalizer`]: reformatted text and the relocated cursor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Canonical {
    pub text: String,
    pub cursor: Option<usize>,
}

/// Reformats source into a stable one-statement-per-line layout.
pub trait Canonicalizer: Send + Sync {
    /// Reformat `text`, carrying the byte offset `cursor` through the rewrite.
    ///
    /// An empty result text signals that the input could not be formatted.
    fn canonicalize(&self, text: &str, cursor: Option<usize>) -> Result<Canonical>;
}

/// Scores free-text candidates against a query.
pub trait Ranker: Send + Sync {
    /// The best `top_k` candidates, best first.
    fn rank(&self, query: &str, candidates: &[String], top_k: usize) -> Result<Vec<String>>;
}
