use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;
use tree_sitter::Node;

use super::SyntaxTree;
use super::kind::NodeKind;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Whether `text` contains Java syntax errors.
pub fn has_parse_error(text: &str) -> bool {
    SyntaxTree::parse(text).map_or(true, |tree| tree.has_error())
}

/// Collapse every whitespace run (newlines and tabs included) to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// Remove every comment from `text`.
pub fn strip_comments(text: &str) -> String {
    match SyntaxTree::parse(text) {
        Ok(tree) => tree.text_without_comments(tree.root()).trim().to_string(),
        Err(e) => {
            warn!("Keeping comments, parse failed: {e}");
            text.trim().to_string()
        }
    }
}

/// Comment-free, single-line rendition of a code fragment.
pub fn clean_code(text: &str) -> String {
    collapse_whitespace(&strip_comments(text))
}

/// Remove comments, package and import declarations from a whole file, and
/// `@Test` methods too when `clean_tests` is set.
pub fn strip_file_noise(text: &str, clean_tests: bool) -> String {
    let tree = match SyntaxTree::parse(text) {
        Ok(tree) => tree,
        Err(e) => {
            warn!("Keeping file noise, parse failed: {e}");
            return text.trim().to_string();
        }
    };

    let mut excluded = Vec::new();
    collect_noise(&tree, tree.root(), clean_tests, &mut excluded);

    let bytes = text.as_bytes();
    let mut kept = Vec::with_capacity(bytes.len());
    let mut cursor = 0;
    for span in excluded {
        if span.start > cursor {
            kept.extend_from_slice(&bytes[cursor..span.start]);
        }
        cursor = cursor.max(span.end);
        if bytes.get(cursor) == Some(&b'\n') && starts_line(bytes, span.start) {
            cursor += 1;
        }
    }
    if cursor < bytes.len() {
        kept.extend_from_slice(&bytes[cursor..]);
    }
    String::from_utf8_lossy(&kept).trim().to_string()
}

/// Only whitespace precedes `offset` on its line.
fn starts_line(bytes: &[u8], offset: usize) -> bool {
    bytes[..offset]
        .iter()
        .rev()
        .take_while(|b| **b != b'\n')
        .all(u8::is_ascii_whitespace)
}

fn collect_noise(tree: &SyntaxTree, node: Node<'_>, clean_tests: bool, out: &mut Vec<Range<usize>>) {
    let kind = NodeKind::of(node);
    let excluded = match kind {
        NodeKind::LineComment
        | NodeKind::BlockComment
        | NodeKind::PackageDeclaration
        | NodeKind::ImportDeclaration => true,
        NodeKind::MethodDeclaration if clean_tests => is_test_method(tree, node),
        _ => false,
    };
    if excluded {
        out.push(node.byte_range());
        return;
    }

    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    for child in children {
        collect_noise(tree, child, clean_tests, out);
    }
}

fn is_test_method(tree: &SyntaxTree, node: Node<'_>) -> bool {
    tree.annotation_names(node).iter().any(|a| a == "@Test")
}
