use std::ops::Range;

use tree_sitter::{Node, TreeCursor};

use super::kind::NodeKind;

/// Lazy pre-order walk over a subtree, driven by a single tree cursor.
pub struct Preorder<'t> {
    cursor: TreeCursor<'t>,
    descended: bool,
    done: bool,
}

impl<'t> Preorder<'t> {
    pub fn new(node: Node<'t>) -> Self {
        Self {
            cursor: node.walk(),
            descended: false,
            done: false,
        }
    }
}

impl<'t> Iterator for Preorder<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Node<'t>> {
        loop {
            if self.done {
                return None;
            }
            if !self.descended {
                let node = self.cursor.node();
                if !self.cursor.goto_first_child() {
                    self.descended = true;
                }
                return Some(node);
            }
            if self.cursor.goto_next_sibling() {
                self.descended = false;
            } else if !self.cursor.goto_parent() {
                self.done = true;
            }
        }
    }
}

/// Lazy sequence of the simple type names referenced under a node.
///
/// With `top_level_only`, generic arguments are not entered, so `Map<K, V>`
/// yields only `Map`. A scoped name such as `java.util.List` yields its
/// trailing simple name.
pub struct TypeIdentifiers<'t> {
    stack: Vec<Node<'t>>,
    top_level_only: bool,
}

impl<'t> TypeIdentifiers<'t> {
    pub fn new(node: Node<'t>, top_level_only: bool) -> Self {
        Self {
            stack: vec![node],
            top_level_only,
        }
    }
}

impl<'t> Iterator for TypeIdentifiers<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Node<'t>> {
        while let Some(node) = self.stack.pop() {
            match NodeKind::of(node) {
                NodeKind::TypeIdentifier => return Some(node),
                NodeKind::ScopedTypeIdentifier => {
                    let mut cursor = node.walk();
                    let trailing = node
                        .named_children(&mut cursor)
                        .filter(|c| NodeKind::of(*c) == NodeKind::TypeIdentifier)
                        .last();
                    if let Some(name) = trailing {
                        return Some(name);
                    }
                }
                NodeKind::TypeArguments if self.top_level_only => {}
                _ => {
                    let mut cursor = node.walk();
                    let children: Vec<_> = node.named_children(&mut cursor).collect();
                    self.stack.extend(children.into_iter().rev());
                }
            }
        }
        None
    }
}

/// Byte ranges of every comment under `node`.
pub fn comment_spans(node: Node<'_>) -> impl Iterator<Item = Range<usize>> + '_ {
    Preorder::new(node)
        .filter(|n| NodeKind::of(*n).is_comment())
        .map(|n| n.byte_range())
}
