//! Declaration splitter: turns a class or interface body into one normalized
//! text unit per externally observable member, then follows the type's
//! superclass and interfaces through the repository.
mod unit;

pub use unit::{DeclarationUnit, MemberKind, SplitAccumulator, partition_by_type};

use std::collections::BTreeSet;

use tracing::{debug, info, warn};
use tree_sitter::Node;

use crate::collab::{DefinitionResolver, Revision, RevisionReader};
use crate::config::SplitterConfig;
use crate::error::{ContextError, Result};
use crate::metadata;
use crate::position::Position;
use crate::syntax::{NodeKind, Role, SyntaxTree, collapse_whitespace, named_child, type_identifiers};

pub struct DeclarationSplitter {
    accessor_annotations: BTreeSet<String>,
}

impl DeclarationSplitter {
    #[must_use]
    pub fn new(config: &SplitterConfig) -> Self {
        Self {
            accessor_annotations: config.accessor_annotations.iter().cloned().collect(),
        }
    }

    /// Members of the class or interface whose name starts on `class_position.line`.
    pub fn split(&self, text: &str, class_position: Position) -> Result<Vec<DeclarationUnit>> {
        let mut acc = SplitAccumulator::new();
        self.split_into(text, class_position, &mut acc)?;
        Ok(acc.into_units())
    }

    /// Deduplicating form of [`split`](Self::split); returns how many units were added.
    pub fn split_into(&self, text: &str, class_position: Position, acc: &mut SplitAccumulator) -> Result<usize> {
        let tree = SyntaxTree::parse(text)?;
        if tree.has_error() {
            debug!("Splitting a class from a file with syntax errors");
        }
        let class = class_named_on_line(&tree, class_position.line).ok_or_else(|| {
            ContextError::not_found(format!("no class or interface named on line {}", class_position.line))
        })?;

        let before = acc.len();
        self.collect_members(&tree, class, "", acc);
        Ok(acc.len() - before)
    }

    fn collect_members(&self, tree: &SyntaxTree, class: Node<'_>, path: &str, acc: &mut SplitAccumulator) {
        let Some(body) = named_child(class, Role::Body) else {
            warn!("Class declaration without a body at line {}", class.start_position().row);
            return;
        };
        let inherited = self.accessor_markers(tree, class);

        let mut cursor = body.walk();
        let members: Vec<_> = body.named_children(&mut cursor).collect();
        for member in members {
            match NodeKind::of(member) {
                NodeKind::MethodDeclaration | NodeKind::ConstructorDeclaration => {
                    if !is_private(tree, member) {
                        acc.push(callable_unit(tree, member, path));
                    }
                }
                NodeKind::FieldDeclaration | NodeKind::ConstantDeclaration => {
                    if let Some((unit, names)) = self.field_unit(tree, member, path, &inherited) {
                        acc.push_with_aliases(unit, names);
                    }
                }
                NodeKind::InterfaceDeclaration if is_private(tree, member) => {}
                NodeKind::ClassDeclaration | NodeKind::InterfaceDeclaration => {
                    let Some(name) = named_child(member, Role::Name) else {
                        continue;
                    };
                    let nested = qualified(path, tree.text(name));
                    self.collect_members(tree, member, &nested, acc);
                }
                _ => {}
            }
        }
    }

    /// Recognized accessor annotations carried by a declaration.
    fn accessor_markers(&self, tree: &SyntaxTree, node: Node<'_>) -> BTreeSet<String> {
        tree.annotation_names(node)
            .into_iter()
            .filter(|a| self.accessor_annotations.contains(a))
            .collect()
    }

    fn field_unit(
        &self,
        tree: &SyntaxTree,
        field: Node<'_>,
        path: &str,
        inherited: &BTreeSet<String>,
    ) -> Option<(DeclarationUnit, Vec<String>)> {
        let line = field.start_position().row;
        let Some(ty) = named_child(field, Role::Type) else {
            warn!("Skipping field without a type at line {line}");
            return None;
        };
        let mut cursor = field.walk();
        let names: Vec<String> = field
            .children_by_field_name("declarator", &mut cursor)
            .filter_map(|d| d.child_by_field_name("name"))
            .map(|name| qualified(path, tree.text(name)))
            .collect();
        if names.is_empty() {
            warn!("Skipping field without a declarator at line {line}");
            return None;
        }

        let own = self.accessor_markers(tree, field);
        let generated_accessors = !own.is_empty() || !inherited.is_empty();
        if !generated_accessors && is_private(tree, field) {
            return None;
        }

        let declaration = collapse_whitespace(&tree.text_without_comments(field));
        let prefix: Vec<&str> = inherited.difference(&own).map(String::as_str).collect();
        let text = if prefix.is_empty() {
            declaration
        } else {
            format!("{} {declaration}", prefix.join(" "))
        };

        let unit = DeclarationUnit {
            class_path: path.to_string(),
            kind: MemberKind::Field,
            key: names.join(", "),
            text,
            declared_type: Some(tree.normalized_text(ty)),
        };
        Some((unit, names))
    }

    /// Merge members of every in-repository superclass and interface of the
    /// class at `class_position` into `acc`, transitively.
    ///
    /// Types that do not resolve inside the repository end the recursion on that
    /// branch. Each declaration is expanded at most once per accumulator.
    pub fn recurse_parents(
        &self,
        definitions: &dyn DefinitionResolver,
        files: &dyn RevisionReader,
        rel_path: &str,
        text: &str,
        class_position: Position,
        acc: &mut SplitAccumulator,
    ) -> Result<()> {
        acc.visit(rel_path, class_position.line);

        let tree = SyntaxTree::parse(text)?;
        for parent in parent_type_positions(&tree, class_position)? {
            let location = match definitions.find_definition(rel_path, parent) {
                Ok(Some(location)) => location,
                Ok(None) => {
                    debug!("Parent type at {parent} in {rel_path} is outside the repository");
                    continue;
                }
                Err(e) if e.is_terminal() => {
                    debug!("Parent type at {parent} in {rel_path} not resolved: {e}");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if !acc.visit_location(&location) {
                debug!("{}:{} already expanded", location.path, location.start);
                continue;
            }

            let parent_text = files.read_file(&location.path, Revision::After)?;
            if parent_text.is_empty() {
                warn!("Parent type file {} is empty", location.path);
                continue;
            }
            match self.split_into(&parent_text, location.start, acc) {
                Ok(added) => info!("Found {added} members in parent type at {}", location.path),
                Err(e) if e.is_terminal() => {
                    warn!("Skipping parent type at {}: {e}", location.path);
                    continue;
                }
                Err(e) => return Err(e),
            }
            self.recurse_parents(definitions, files, &location.path, &parent_text, location.start, acc)?;
        }
        Ok(())
    }
}

/// Split with the default accessor annotations.
pub fn split(text: &str, class_position: Position) -> Result<Vec<DeclarationUnit>> {
    DeclarationSplitter::new(&SplitterConfig::default()).split(text, class_position)
}

/// Positions of the superclass and interface names of the class or interface
/// enclosing `position`, each on the last character of the simple name.
///
/// Generic arguments are not included: `extends Base<Foo>` yields only `Base`.
pub fn parent_type_positions(tree: &SyntaxTree, position: Position) -> Result<Vec<Position>> {
    let kinds = [NodeKind::ClassDeclaration, NodeKind::InterfaceDeclaration];
    let Some(class) = tree.enclosing_declaration(position, &kinds)? else {
        warn!("No classes at #{} in the given file", position.line);
        return Ok(Vec::new());
    };

    let clauses: &[Role] = match NodeKind::of(class) {
        NodeKind::ClassDeclaration => &[Role::Superclass, Role::Interfaces],
        _ => &[Role::Interfaces],
    };
    Ok(clauses
        .iter()
        .filter_map(|role| named_child(class, *role))
        .flat_map(|clause| type_identifiers(clause, true))
        .map(|id| Position::last_char_before(id.end_position()))
        .collect())
}

fn class_named_on_line<'t>(tree: &'t SyntaxTree, line: usize) -> Option<Node<'t>> {
    tree.preorder().find(|node| {
        NodeKind::of(*node).is_type_declaration()
            && named_child(*node, Role::Name).is_some_and(|name| name.start_position().row == line)
    })
}

fn is_private(tree: &SyntaxTree, node: Node<'_>) -> bool {
    tree.modifier_tokens(node).iter().any(|m| m == "private")
}

fn qualified(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn callable_unit(tree: &SyntaxTree, member: Node<'_>, path: &str) -> DeclarationUnit {
    let source = tree.text_without_comments(member);
    let text = metadata::render_signature(&source).unwrap_or_else(|| {
        let clean = collapse_whitespace(&source);
        let head = clean.split('{').next().unwrap_or(&clean);
        format!("{};", head.trim())
    });

    let name = named_child(member, Role::Name).map(|n| tree.text(n)).unwrap_or_default();
    let types: Vec<String> = named_child(member, Role::Parameters)
        .map(|params| metadata::parameters(tree, params).into_iter().map(|(ty, _)| ty).collect())
        .unwrap_or_default();
    let kind = if NodeKind::of(member) == NodeKind::ConstructorDeclaration {
        MemberKind::Constructor
    } else {
        MemberKind::Method
    };

    DeclarationUnit {
        class_path: path.to_string(),
        kind,
        key: qualified(path, &format!("{name}({})", types.join(", "))),
        text,
        declared_type: named_child(member, Role::Type).map(|t| tree.normalized_text(t)),
    }
}
