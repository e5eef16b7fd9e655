/// Error types shared by every component of the extraction engine.
use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, ContextError>;

/// Errors that can occur while indexing, translating positions or collecting context.
#[derive(Error, Debug)]
pub enum ContextError {
    /// The parser could not run at all. Malformed source is not an error:
    /// it produces a tree flagged with `has_error`.
    #[error("parse error: {0}")]
    Parse(String),

    /// A required substring, position or declaration is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Position arithmetic exceeded the bounds of a buffer.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// A referenced type does not resolve to an in-repository declaration.
    #[error("unresolved type: {0}")]
    UnresolvedType(String),

    /// An external collaborator (definition lookup, file reader, ...) failed.
    #[error("collaborator failed: {0}")]
    Collaborator(String),
}

impl ContextError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Self::OutOfRange(msg.into())
    }

    pub fn collaborator(msg: impl Into<String>) -> Self {
        Self::Collaborator(msg.into())
    }

    /// Whether this error only signals that recursion over a type hierarchy ends here.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::UnresolvedType(_) | Self::NotFound(_))
    }
}
