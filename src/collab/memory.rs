/// In-memory collaborators.
///
/// [`MemoryWorkspace`] holds both revisions of a small set of files and answers
/// definition and reference queries by name with the syntax indexer. It is
/// enough to drive the collector in tests and from the command line without a
/// language server or repository.
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use tree_sitter::Node;

use super::{Canonical, Canonicalizer, DefinitionResolver, Location, Ranker, ReferenceFinder, Revision, RevisionReader};
use crate::error::{ContextError, Result};
use crate::position::{self, Position};
use crate::syntax::{NodeKind, Role, SyntaxTree, named_child};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("valid regex"));

/// Two revisions of a file map.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkspace {
    before: BTreeMap<String, String>,
    after: BTreeMap<String, String>,
}

impl MemoryWorkspace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with its content at both revisions.
    #[must_use]
    pub fn with_file(mut self, path: &str, before: &str, after: &str) -> Self {
        self.insert(path, Revision::Before, before);
        self.insert(path, Revision::After, after);
        self
    }

    pub fn insert(&mut self, path: &str, revision: Revision, text: &str) {
        let files = match revision {
            Revision::Before => &mut self.before,
            Revision::After => &mut self.after,
        };
        files.insert(path.to_string(), text.to_string());
    }

    fn parsed_after(&self, path: &str) -> Result<SyntaxTree> {
        let text = self
            .after
            .get(path)
            .ok_or_else(|| ContextError::collaborator(format!("unknown file: {path}")))?;
        SyntaxTree::parse(text)
    }

    /// Every parsed file of the after revision, in path order.
    fn after_trees(&self) -> impl Iterator<Item = (&str, SyntaxTree)> + '_ {
        self.after
            .iter()
            .filter_map(|(path, text)| SyntaxTree::parse(text).ok().map(|tree| (path.as_str(), tree)))
    }
}

/// Identifier (or type identifier) covering `position`.
fn identifier_at<'t>(tree: &'t SyntaxTree, position: Position) -> Result<Option<Node<'t>>> {
    let offset = position::to_offset(tree.source(), position)?;
    Ok(tree
        .root()
        .descendant_for_byte_range(offset, offset)
        .filter(|n| matches!(NodeKind::of(*n), NodeKind::Identifier | NodeKind::TypeIdentifier)))
}

fn name_location(path: &str, name: Node<'_>) -> Location {
    Location::new(path, name.start_position().into(), name.end_position().into())
}

impl DefinitionResolver for MemoryWorkspace {
    fn find_definition(&self, path: &str, position: Position) -> Result<Option<Location>> {
        let tree = self.parsed_after(path)?;
        let Some(ident) = identifier_at(&tree, position)? else {
            return Ok(None);
        };
        let wanted = tree.text(ident);

        for (file, candidate) in self.after_trees() {
            let declaration = candidate.preorder().find_map(|node| {
                if !matches!(
                    NodeKind::of(node),
                    NodeKind::ClassDeclaration
                        | NodeKind::InterfaceDeclaration
                        | NodeKind::EnumDeclaration
                        | NodeKind::RecordDeclaration
                ) {
                    return None;
                }
                named_child(node, Role::Name).filter(|name| candidate.text(*name) == wanted)
            });
            if let Some(name) = declaration {
                return Ok(Some(name_location(file, name)));
            }
        }
        debug!("No in-repository declaration of {wanted}");
        Ok(None)
    }
}

impl ReferenceFinder for MemoryWorkspace {
    fn find_references(&self, path: &str, position: Position) -> Result<Vec<Location>> {
        let tree = self.parsed_after(path)?;
        let Some(ident) = identifier_at(&tree, position)? else {
            return Ok(Vec::new());
        };
        let wanted = tree.text(ident);

        let mut found = Vec::new();
        for (file, candidate) in self.after_trees() {
            found.extend(
                candidate
                    .preorder()
                    .filter(|n| NodeKind::of(*n) == NodeKind::MethodInvocation)
                    .filter_map(|call| named_child(call, Role::Name))
                    .filter(|name| candidate.text(*name) == wanted)
                    .map(|name| name_location(file, name)),
            );
        }
        Ok(found)
    }
}

impl RevisionReader for MemoryWorkspace {
    fn read_file(&self, path: &str, revision: Revision) -> Result<String> {
        let files = match revision {
            Revision::Before => &self.before,
            Revision::After => &self.after,
        };
        Ok(files.get(path).cloned().unwrap_or_default())
    }
}

/// Canonicalizer that leaves text and cursor untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCanonicalizer;

impl Canonicalizer for IdentityCanonicalizer {
    fn canonicalize(&self, text: &str, cursor: Option<usize>) -> Result<Canonical> {
        Ok(Canonical {
            text: text.to_string(),
            cursor,
        })
    }
}

/// Ranks candidates by how many distinct identifiers they share with the query.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlapRanker;

fn identifiers(text: &str) -> HashSet<String> {
    IDENTIFIER
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

impl Ranker for OverlapRanker {
    fn rank(&self, query: &str, candidates: &[String], top_k: usize) -> Result<Vec<String>> {
        let wanted = identifiers(query);
        let mut scored: Vec<(usize, &String)> = candidates
            .iter()
            .map(|c| (identifiers(c).intersection(&wanted).count(), c))
            .collect();
        // Stable: ties keep candidate order.
        scored.sort_by_key(|(score, _)| Reverse(*score));
        Ok(scored.into_iter().take(top_k).map(|(_, c)| c.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE: &str = "public class Service {\n    public int call(Options o) { return 1; }\n}\n";
    const OPTIONS: &str = "public class Options {\n    public int size;\n}\n";
    const CLIENT: &str = "class Client {\n    void go(Service s) {\n        s.call(null);\n        s.call(new Options());\n    }\n}\n";

    fn workspace() -> MemoryWorkspace {
        MemoryWorkspace::new()
            .with_file("Service.java", SERVICE, SERVICE)
            .with_file("Options.java", OPTIONS, OPTIONS)
            .with_file("Client.java", "", CLIENT)
    }

    #[test]
    fn test_find_definition() {
        let ws = workspace();
        // `Options` in the parameter list of `call`
        let loc = ws
            .find_definition("Service.java", Position::new(1, 26))
            .unwrap()
            .expect("Options is declared in the workspace");
        assert_eq!(loc.path, "Options.java");
        assert_eq!(loc.start, Position::new(0, 13));
        assert_eq!(loc.end, Position::new(0, 20));

        // `int` is not an identifier
        assert!(ws.find_definition("Service.java", Position::new(1, 12)).unwrap().is_none());
    }

    #[test]
    fn test_find_references() {
        let ws = workspace();
        let refs = ws.find_references("Service.java", Position::new(1, 18)).unwrap();
        let lines: Vec<usize> = refs.iter().map(|l| l.start.line).collect();
        assert_eq!(lines, vec![2, 3]);
        assert!(refs.iter().all(|l| l.path == "Client.java"));
    }

    #[test]
    fn test_read_file_missing_revision_is_empty() {
        let ws = workspace();
        assert_eq!(ws.read_file("Client.java", Revision::Before).unwrap(), "");
        assert_eq!(ws.read_file("Nope.java", Revision::After).unwrap(), "");
        assert!(ws.read_file("Client.java", Revision::After).unwrap().contains("s.call"));
    }

    #[test]
    fn test_overlap_ranker() {
        let candidates = vec![
            "a.close();".to_string(),
            "opts.setShared(true);".to_string(),
            "opts.setShared(false); mount(opts);".to_string(),
        ];
        let ranked = OverlapRanker.rank("mount opts setShared", &candidates, 2).unwrap();
        assert_eq!(ranked, vec![candidates[2].clone(), candidates[1].clone()]);
    }
}
