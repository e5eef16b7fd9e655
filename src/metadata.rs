//! Method metadata extraction and signature rendering.
//!
//! A method fragment is parsed inside a synthetic class body so constructors and
//! methods are recognized regardless of what the grammar accepts at top level.
//! Positions reported here are relative to the fragment itself.
use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::warn;
use tree_sitter::{Node, Query, QueryCursor, StreamingIterator};

use crate::position::Position;
use crate::syntax::{self, NodeKind, Role, SyntaxTree, named_child, type_identifiers};

const MEMBER_PREFIX: &str = "class __Member {\n";
const MEMBER_SUFFIX: &str = "\n}";

const SIGNATURE_QUERY: &str = r#"
[
  (method_declaration) @callable
  (constructor_declaration) @callable
]
"#;

/// Structural signature of a method or constructor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MethodMetadata {
    pub modifiers: BTreeSet<String>,
    /// Declared type parameters in order, unique by declared name.
    pub type_parameters: Vec<String>,
    /// Empty for constructors.
    pub return_type: String,
    pub name: String,
    pub parameter_types: Vec<String>,
    pub parameter_names: Vec<String>,
    pub thrown_types: BTreeSet<String>,
}

impl MethodMetadata {
    /// Key used to deduplicate members across an inheritance chain: `name(T1, T2)`.
    #[must_use]
    pub fn unique_key(&self) -> String {
        format!("{}({})", self.name, self.parameter_types.join(", "))
    }
}

impl fmt::Display for MethodMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.modifiers.iter().cloned().collect();
        if !self.type_parameters.is_empty() {
            parts.push(format!("<{}>", self.type_parameters.join(", ")));
        }
        if !self.return_type.is_empty() {
            parts.push(self.return_type.clone());
        }
        let params: Vec<String> = self
            .parameter_types
            .iter()
            .zip(&self.parameter_names)
            .map(|(ty, name)| format!("{ty} {name}"))
            .collect();
        parts.push(format!("{}({})", self.name, params.join(", ")));
        if !self.thrown_types.is_empty() {
            let thrown: Vec<&str> = self.thrown_types.iter().map(String::as_str).collect();
            parts.push(format!("throws {}", thrown.join(", ")));
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// Which signature components differ between two revisions of a method.
///
/// Parameter names are deliberately not compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyntacticDiff {
    pub modifiers: bool,
    pub type_parameters: bool,
    pub return_type: bool,
    pub name: bool,
    pub parameter_types: bool,
    pub thrown_types: bool,
}

impl SyntacticDiff {
    /// Compare two method fragments; `None` when either is not a method.
    pub fn between(before: &str, after: &str) -> Option<Self> {
        let before = extract_metadata(before)?;
        let after = extract_metadata(after)?;
        let unordered = |a: &[String], b: &[String]| {
            a.len() == b.len() && a.iter().collect::<HashSet<_>>() == b.iter().collect::<HashSet<_>>()
        };
        Some(Self {
            modifiers: before.modifiers != after.modifiers,
            type_parameters: !unordered(&before.type_parameters, &after.type_parameters),
            return_type: before.return_type != after.return_type,
            name: before.name != after.name,
            parameter_types: before.parameter_types != after.parameter_types,
            thrown_types: before.thrown_types != after.thrown_types,
        })
    }

    /// Number of changed components.
    #[must_use]
    pub fn overall(&self) -> usize {
        [
            self.modifiers,
            self.type_parameters,
            self.return_type,
            self.name,
            self.parameter_types,
            self.thrown_types,
        ]
        .iter()
        .filter(|&&changed| changed)
        .count()
    }
}

/// Type positions that appear only in the newer revision of a method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTypePositions {
    pub parameters: Vec<Position>,
    pub return_type: Vec<Position>,
}

/// A method fragment parsed inside a synthetic class body.
pub(crate) struct MemberSource {
    pub(crate) tree: SyntaxTree,
}

impl MemberSource {
    pub(crate) fn parse(method_text: &str) -> Option<Self> {
        let wrapped = format!("{MEMBER_PREFIX}{method_text}{MEMBER_SUFFIX}");
        match SyntaxTree::parse(&wrapped) {
            Ok(tree) => Some(Self { tree }),
            Err(e) => {
                warn!("Failed to parse method fragment: {e}");
                None
            }
        }
    }

    /// The first member of the synthetic body, if it is a method or constructor.
    fn callable(&self) -> Option<Node<'_>> {
        let class = self
            .tree
            .root()
            .named_child(0)
            .filter(|n| NodeKind::of(*n) == NodeKind::ClassDeclaration)?;
        let body = named_child(class, Role::Body)?;
        let mut cursor = body.walk();
        let member = body
            .named_children(&mut cursor)
            .find(|n| !NodeKind::of(*n).is_comment())?;
        NodeKind::of(member).is_callable().then_some(member)
    }

    /// Map a point of the wrapped text back to the fragment.
    fn unwrap_position(position: Position) -> Position {
        Position {
            line: position.line.saturating_sub(1),
            character: position.character,
        }
    }

    fn byte_in_fragment(offset: usize) -> usize {
        offset.saturating_sub(MEMBER_PREFIX.len())
    }
}

/// Extract the structural signature of a method or constructor fragment.
///
/// Returns `None` (with a warning) when the fragment is not a callable declaration.
pub fn extract_metadata(method_text: &str) -> Option<MethodMetadata> {
    let source = MemberSource::parse(method_text)?;
    let Some(method) = source.callable() else {
        warn!("The code is not a method declaration");
        return None;
    };
    let tree = &source.tree;

    let mut modifiers = BTreeSet::new();
    let mut thrown_types = BTreeSet::new();
    let mut cursor = method.walk();
    for child in method.named_children(&mut cursor) {
        match NodeKind::of(child) {
            NodeKind::Modifiers => modifiers.extend(tree.modifier_tokens(method)),
            NodeKind::Throws => {
                let mut inner = child.walk();
                thrown_types.extend(
                    child
                        .named_children(&mut inner)
                        .filter(|t| !NodeKind::of(*t).is_comment())
                        .map(|t| tree.normalized_text(t)),
                );
            }
            _ => {}
        }
    }

    let mut type_parameters = Vec::new();
    if let Some(params) = named_child(method, Role::TypeParameters) {
        let mut declared = HashSet::new();
        let mut inner = params.walk();
        for param in params.named_children(&mut inner) {
            if NodeKind::of(param) != NodeKind::TypeParameter {
                continue;
            }
            let mut name_cursor = param.walk();
            let name = param
                .named_children(&mut name_cursor)
                .find(|n| NodeKind::of(*n) == NodeKind::TypeIdentifier)
                .map(|n| tree.text(n).to_string())
                .unwrap_or_default();
            if declared.insert(name) {
                type_parameters.push(tree.normalized_text(param));
            }
        }
    }

    let name = named_child(method, Role::Name)
        .map(|n| tree.normalized_text(n))
        .unwrap_or_default();
    let return_type = named_child(method, Role::Type)
        .map(|n| tree.normalized_text(n))
        .unwrap_or_default();

    let mut parameter_types = Vec::new();
    let mut parameter_names = Vec::new();
    if let Some(params) = named_child(method, Role::Parameters) {
        for (ty, name) in parameters(tree, params) {
            parameter_types.push(ty);
            parameter_names.push(name);
        }
    }

    Some(MethodMetadata {
        modifiers,
        type_parameters,
        return_type,
        name,
        parameter_types,
        parameter_names,
        thrown_types,
    })
}

/// `(type, name)` of every declared parameter, varargs types ending in `...`.
pub(crate) fn parameters(tree: &SyntaxTree, params: Node<'_>) -> Vec<(String, String)> {
    let mut cursor = params.walk();
    params
        .named_children(&mut cursor)
        .filter_map(|param| match NodeKind::of(param) {
            NodeKind::FormalParameter => {
                let ty = param.child_by_field_name("type").map(|t| tree.normalized_text(t));
                let name = param.child_by_field_name("name").map(|n| tree.normalized_text(n));
                Some((ty.unwrap_or_default(), name.unwrap_or_default()))
            }
            NodeKind::SpreadParameter => {
                let mut inner = param.walk();
                let children: Vec<_> = param.named_children(&mut inner).collect();
                let ty = children
                    .iter()
                    .find(|c| !matches!(NodeKind::of(**c), NodeKind::Modifiers | NodeKind::VariableDeclarator))
                    .map(|t| format!("{}...", tree.normalized_text(*t)));
                let name = children
                    .iter()
                    .find(|c| NodeKind::of(**c) == NodeKind::VariableDeclarator)
                    .and_then(|d| d.child_by_field_name("name"))
                    .map(|n| tree.normalized_text(n));
                Some((ty.unwrap_or_default(), name.unwrap_or_default()))
            }
            _ => None,
        })
        .collect()
}

/// Signature-only rendition of a method: the single-line declaration up to the
/// body, terminated by `;` in place of the opening brace.
pub fn render_signature(method_text: &str) -> Option<String> {
    let clean = syntax::clean_code(method_text);
    let source = MemberSource::parse(&clean)?;
    let Some(method) = source.callable() else {
        warn!("The code is not a method declaration:\n{method_text}");
        return None;
    };
    match named_child(method, Role::Body) {
        Some(body) => {
            let end = MemberSource::byte_in_fragment(body.start_byte());
            let head = clean.get(..end)?.trim();
            Some(format!("{head};"))
        }
        None => Some(clean.trim().to_string()),
    }
}

/// Name of the method and the position of its last character within the fragment.
pub fn method_name_position(method_text: &str) -> Option<(String, Position)> {
    let source = MemberSource::parse(method_text)?;
    let method = source.callable()?;
    let name = named_child(method, Role::Name)?;
    let position = MemberSource::unwrap_position(Position::last_char_before(name.end_position()));
    Some((source.tree.text(name).to_string(), position))
}

/// Indices of parameters that disappeared from `before` and appeared in `after`.
pub fn param_index_diff(before: &[String], after: &[String]) -> (Vec<usize>, Vec<usize>) {
    let obsolete = before
        .iter()
        .enumerate()
        .filter(|(_, ty)| !after.contains(ty))
        .map(|(i, _)| i)
        .collect();
    let new = after
        .iter()
        .enumerate()
        .filter(|(_, ty)| !before.contains(ty))
        .map(|(i, _)| i)
        .collect();
    (obsolete, new)
}

/// Positions of the type names used by the selected parameters, each name once.
pub fn param_type_positions(method_text: &str, indices: &[usize]) -> Vec<Position> {
    let Some(source) = MemberSource::parse(method_text) else {
        return Vec::new();
    };
    let Some(params) = source.callable().and_then(|m| named_child(m, Role::Parameters)) else {
        return Vec::new();
    };
    let mut cursor = params.walk();
    let declared: Vec<_> = params
        .named_children(&mut cursor)
        .filter(|p| matches!(NodeKind::of(*p), NodeKind::FormalParameter | NodeKind::SpreadParameter))
        .collect();

    let mut seen = HashSet::new();
    let mut positions = Vec::new();
    for &idx in indices {
        let Some(param) = declared.get(idx) else {
            continue;
        };
        for id in type_identifiers(*param, false) {
            if seen.insert(source.tree.text(id).to_string()) {
                positions.push(MemberSource::unwrap_position(Position::last_char_before(id.end_position())));
            }
        }
    }
    positions
}

/// Positions of the type names in the declared return type, each name once.
pub fn return_type_positions(method_text: &str) -> Vec<Position> {
    let Some(source) = MemberSource::parse(method_text) else {
        return Vec::new();
    };
    let Some(ty) = source.callable().and_then(|m| named_child(m, Role::Type)) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    type_identifiers(ty, false)
        .filter(|id| seen.insert(source.tree.text(*id).to_string()))
        .map(|id| MemberSource::unwrap_position(Position::last_char_before(id.end_position())))
        .collect()
}

/// Positions in `after` of parameter and return type names absent from `before`.
pub fn new_type_positions(before: &str, after: &str) -> Option<NewTypePositions> {
    let src = MemberSource::parse(before)?;
    let tgt = MemberSource::parse(after)?;
    let src_method = src.callable()?;
    let tgt_method = tgt.callable()?;

    let fresh = |role: Role| -> Vec<Position> {
        let known: HashSet<String> = named_child(src_method, role)
            .map(|n| type_identifiers(n, false).map(|id| src.tree.text(id).to_string()).collect())
            .unwrap_or_default();
        let mut reported = HashSet::new();
        named_child(tgt_method, role)
            .map(|n| {
                type_identifiers(n, false)
                    .filter(|id| {
                        let name = tgt.tree.text(*id);
                        !known.contains(name) && reported.insert(name.to_string())
                    })
                    .map(|id| MemberSource::unwrap_position(Position::last_char_before(id.end_position())))
                    .collect()
            })
            .unwrap_or_default()
    };

    Some(NewTypePositions {
        parameters: fresh(Role::Parameters),
        return_type: fresh(Role::Type),
    })
}

/// Full text of the method or constructor whose span covers `line` of `file`.
pub fn method_at_line(file: &str, line: usize) -> Option<String> {
    let tree = SyntaxTree::parse(file).ok()?;
    let found = tree.preorder().find(|n| {
        NodeKind::of(*n).is_callable() && n.start_position().row <= line && line <= n.end_position().row
    });
    match found {
        Some(method) => Some(tree.text(method).to_string()),
        None => {
            warn!("Method with line number #{line} not found in file");
            None
        }
    }
}

/// Every line occupied by a method or constructor signature (body excluded).
pub fn signature_lines(file: &str) -> BTreeSet<usize> {
    let mut lines = BTreeSet::new();
    let Ok(tree) = SyntaxTree::parse(file) else {
        return lines;
    };
    let query = match Query::new(&syntax::java_language(), SIGNATURE_QUERY) {
        Ok(q) => q,
        Err(e) => {
            warn!("Invalid signature query: {e}");
            return lines;
        }
    };

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, tree.root(), file.as_bytes());
    while let Some(m) = matches.next() {
        for cap in m.captures {
            let node = cap.node;
            let start = node.start_position().row;
            let end = match named_child(node, Role::Body) {
                Some(body) => body.start_position().row,
                None => node.end_position().row,
            };
            lines.extend(start..=end);
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERIC: &str = "public static synchronized <T extends Comparable<T>, U, V extends List<U>> Map<T, V> processElements(Collection<T> collection, Function<T, V> function) throws IOException, IllegalArgumentException {\n    return null;\n}";

    #[test]
    fn test_extract_metadata_generic_method() {
        let md = extract_metadata(GENERIC).expect("method metadata");
        assert_eq!(
            md.modifiers.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["public", "static", "synchronized"]
        );
        assert_eq!(
            md.type_parameters,
            vec!["T extends Comparable<T>", "U", "V extends List<U>"]
        );
        assert_eq!(md.return_type, "Map<T, V>");
        assert_eq!(md.name, "processElements");
        assert_eq!(md.parameter_types, vec!["Collection<T>", "Function<T, V>"]);
        assert_eq!(md.parameter_names, vec!["collection", "function"]);
        assert_eq!(
            md.thrown_types.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["IOException", "IllegalArgumentException"]
        );
        assert_eq!(md.unique_key(), "processElements(Collection<T>, Function<T, V>)");
    }

    #[test]
    fn test_extract_metadata_constructor_and_varargs() {
        let md = extract_metadata("public Point(int x, String... labels) { this.x = x; }").unwrap();
        assert_eq!(md.name, "Point");
        assert!(md.return_type.is_empty());
        assert_eq!(md.parameter_types, vec!["int", "String..."]);
        assert_eq!(md.parameter_names, vec!["x", "labels"]);
        assert_eq!(md.parameter_types.len(), md.parameter_names.len());
    }

    #[test]
    fn test_extract_metadata_rejects_fields() {
        assert!(extract_metadata("private int count = 0;").is_none());
    }

    #[test]
    fn test_display_is_canonical() {
        let md = extract_metadata("public int add(int a, int b) throws E { return a + b; }").unwrap();
        assert_eq!(md.to_string(), "public int add(int a, int b) throws E");
    }

    #[test]
    fn test_render_signature() {
        let method = "/** Adds. */\npublic int add(int a,\n        int b) {\n    return a + b;\n}";
        assert_eq!(render_signature(method).unwrap(), "public int add(int a, int b);");
        assert_eq!(render_signature("abstract void run();").unwrap(), "abstract void run();");
        assert!(render_signature("int x = 1;").is_none());
    }

    #[test]
    fn test_syntactic_diff() {
        let before = "public void mount(AlluxioURI path, MountOptions options) throws IOException {}";
        let after = "public void mount(AlluxioURI path, MountPOptions options) throws IOException {}";
        let diff = SyntacticDiff::between(before, after).unwrap();
        assert!(diff.parameter_types);
        assert!(!diff.return_type);
        assert_eq!(diff.overall(), 1);

        let renamed_param = "public void mount(AlluxioURI p, MountOptions o) throws IOException {}";
        assert_eq!(SyntacticDiff::between(before, renamed_param).unwrap().overall(), 0);
        assert!(SyntacticDiff::between(before, "int x;").is_none());
    }

    #[test]
    fn test_param_index_diff() {
        let before = vec!["int".to_string(), "String".to_string()];
        let after = vec!["int".to_string(), "Options".to_string(), "long".to_string()];
        assert_eq!(param_index_diff(&before, &after), (vec![1], vec![1, 2]));
    }

    #[test]
    fn test_method_name_position() {
        let (name, pos) = method_name_position("@Override\npublic void runAll() {}").unwrap();
        assert_eq!(name, "runAll");
        assert_eq!(pos, Position::new(1, 17));
    }

    #[test]
    fn test_type_positions() {
        let method = "Map<Key, Key> load(Pair<Key, Value> p, int n) { return null; }";
        assert_eq!(
            param_type_positions(method, &[0, 1]),
            vec![Position::new(0, 22), Position::new(0, 26), Position::new(0, 33)]
        );
        assert_eq!(return_type_positions(method), vec![Position::new(0, 2), Position::new(0, 6)]);
    }

    #[test]
    fn test_new_type_positions() {
        let before = "Result run(Options o) { return null; }";
        let after = "Outcome run(Options o, Context c) { return null; }";
        let found = new_type_positions(before, after).unwrap();
        assert_eq!(found.parameters, vec![Position::new(0, 29)]);
        assert_eq!(found.return_type, vec![Position::new(0, 6)]);
    }

    #[test]
    fn test_method_at_line_and_signature_lines() {
        let file = "class A {\n  public int f(\n      int x) {\n    return x;\n  }\n  abstract void g();\n}\n";
        let method = method_at_line(file, 3).unwrap();
        assert!(method.starts_with("public int f("));
        assert!(method_at_line(file, 0).is_none());

        let lines: Vec<usize> = signature_lines(file).into_iter().collect();
        assert_eq!(lines, vec![1, 2, 5]);
    }
}
