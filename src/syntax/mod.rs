//! Syntax indexer: parses Java source into a concrete syntax tree and answers
//! the structural queries the rest of the engine needs.
//!
//! A [`SyntaxTree`] owns both the text it was built from and the tree-sitter
//! tree, so every position it hands out refers to that exact buffer. Trees are
//! built per request and never cached.
mod kind;
mod text;
mod walk;

pub use kind::{NodeKind, Role};
pub use text::{clean_code, collapse_whitespace, has_parse_error, strip_comments, strip_file_noise};
pub use walk::{Preorder, TypeIdentifiers, comment_spans};

use tree_sitter::{Language, Node, Parser, Tree};

use crate::error::{ContextError, Result};
use crate::position::{self, Position};

pub(crate) fn java_language() -> Language {
    tree_sitter_java::LANGUAGE.into()
}

/// An owned parse of one text buffer.
pub struct SyntaxTree {
    source: String,
    tree: Tree,
}

impl SyntaxTree {
    /// Parse `text` as Java.
    ///
    /// Invalid source still yields a tree; check [`SyntaxTree::has_error`]
    /// before trusting structural queries.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&java_language())
            .map_err(|e| ContextError::Parse(format!("failed to load Java grammar: {e}")))?;
        let tree = parser
            .parse(text, None)
            .ok_or_else(|| ContextError::Parse("parser returned no tree".to_string()))?;
        Ok(Self {
            source: text.to_string(),
            tree,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Whether the parse contains syntax errors anywhere.
    pub fn has_error(&self) -> bool {
        self.root().has_error()
    }

    /// Raw source text covered by `node`.
    pub fn text(&self, node: Node<'_>) -> &str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }

    /// Node text with every whitespace run collapsed to one space.
    pub fn normalized_text(&self, node: Node<'_>) -> String {
        collapse_whitespace(self.text(node))
    }

    pub fn preorder(&self) -> Preorder<'_> {
        Preorder::new(self.root())
    }

    /// Innermost declaration of one of `kinds` whose span contains `position`.
    pub fn enclosing_declaration(&self, position: Position, kinds: &[NodeKind]) -> Result<Option<Node<'_>>> {
        let offset = position::to_offset(&self.source, position)?;
        let mut current = self.root().descendant_for_byte_range(offset, offset);
        while let Some(node) = current {
            if kinds.contains(&NodeKind::of(node)) {
                return Ok(Some(node));
            }
            current = node.parent();
        }
        Ok(None)
    }

    /// Text of `node` with every comment inside it removed.
    ///
    /// A newline directly following a removed comment is dropped with it.
    pub fn text_without_comments(&self, node: Node<'_>) -> String {
        let bytes = self.source.as_bytes();
        let end = node.end_byte();
        let mut kept = Vec::with_capacity(end - node.start_byte());
        let mut cursor = node.start_byte();
        for span in comment_spans(node) {
            if span.start > cursor {
                kept.extend_from_slice(&bytes[cursor..span.start]);
            }
            cursor = cursor.max(span.end);
            if bytes.get(cursor) == Some(&b'\n') && cursor < end {
                cursor += 1;
            }
        }
        if cursor < end {
            kept.extend_from_slice(&bytes[cursor..end]);
        }
        String::from_utf8_lossy(&kept).into_owned()
    }

    /// Modifier tokens of a declaration (`public`, `static`, `@Override`, ...).
    pub fn modifier_tokens(&self, node: Node<'_>) -> Vec<String> {
        let Some(modifiers) = named_child(node, Role::Modifiers) else {
            return Vec::new();
        };
        let mut cursor = modifiers.walk();
        modifiers
            .children(&mut cursor)
            .filter(|c| !NodeKind::of(*c).is_comment())
            .map(|c| self.normalized_text(c))
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Annotation names (with a leading `@`) attached to a declaration.
    pub fn annotation_names(&self, node: Node<'_>) -> Vec<String> {
        let Some(modifiers) = named_child(node, Role::Modifiers) else {
            return Vec::new();
        };
        let mut cursor = modifiers.walk();
        modifiers
            .named_children(&mut cursor)
            .filter(|c| NodeKind::of(*c).is_annotation())
            .filter_map(|c| c.child_by_field_name("name"))
            .map(|name| format!("@{}", self.normalized_text(name)))
            .collect()
    }
}

/// Direct child of `node` playing `role`, or `None` when absent.
pub fn named_child<'t>(node: Node<'t>, role: Role) -> Option<Node<'t>> {
    match (role, NodeKind::of(node)) {
        (Role::Modifiers, _) => first_child_of_kind(node, NodeKind::Modifiers),
        (Role::Interfaces, NodeKind::InterfaceDeclaration) => first_child_of_kind(node, NodeKind::ExtendsInterfaces),
        _ => role.field_name().and_then(|field| node.child_by_field_name(field)),
    }
}

fn first_child_of_kind(node: Node<'_>, kind: NodeKind) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).find(|c| NodeKind::of(*c) == kind)
}

/// Simple type names referenced under `node`; see [`TypeIdentifiers`].
pub fn type_identifiers(node: Node<'_>, top_level_only: bool) -> TypeIdentifiers<'_> {
    TypeIdentifiers::new(node, top_level_only)
}

/// Lazy pre-order walk of the subtree rooted at `node`.
pub fn preorder(node: Node<'_>) -> Preorder<'_> {
    Preorder::new(node)
}
