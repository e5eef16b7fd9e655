//! Context collection for one focal method change.
//!
//! Combines the structural side (declaration splitting over the type
//! hierarchy) with the temporal side (diff windows at usage sites and
//! file-level change items), talking to the outside world only through the
//! collaborator traits.
use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::collab::memory::{IdentityCanonicalizer, MemoryWorkspace, OverlapRanker};
use crate::collab::{
    Canonical, Canonicalizer, DefinitionResolver, Location, Ranker, ReferenceFinder, Revision, RevisionReader,
};
use crate::config::Config;
use crate::diff::{ContextPolicy, ContextWindow, diff_texts, locate_and_extract, window};
use crate::error::{ContextError, Result};
use crate::metadata::{self, SyntacticDiff};
use crate::position::{self, Position};
use crate::splitter::{DeclarationSplitter, DeclarationUnit, SplitAccumulator, parent_type_positions, partition_by_type};
use crate::syntax::{SyntaxTree, strip_file_noise};

/// The external services a collector calls.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub definitions: &'a dyn DefinitionResolver,
    pub references: &'a dyn ReferenceFinder,
    pub files: &'a dyn RevisionReader,
    pub canonicalizer: &'a dyn Canonicalizer,
    pub ranker: &'a dyn Ranker,
}

impl<'a> Collaborators<'a> {
    /// Everything served from an in-memory workspace, without reformatting.
    #[must_use]
    pub fn in_memory(workspace: &'a MemoryWorkspace) -> Self {
        Self {
            definitions: workspace,
            references: workspace,
            files: workspace,
            canonicalizer: &IdentityCanonicalizer,
            ranker: &OverlapRanker,
        }
    }
}

/// A method as it appears at both revisions of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodChange {
    pub rel_path: String,
    pub before: String,
    pub after: String,
    /// The test method updated together with the focal method, if any. Its own
    /// call sites are not usage examples.
    pub test: Option<TestSite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSite {
    pub rel_path: String,
    /// Method text at the after revision.
    pub method: String,
}

/// Members of one in-repository type, inherited ones included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassContext {
    pub class_type: String,
    pub rel_path: String,
    /// Constructors and members declared with the class's own type.
    pub instantiating: Vec<DeclarationUnit>,
    pub members: Vec<DeclarationUnit>,
}

pub struct ContextCollector<'a> {
    collab: Collaborators<'a>,
    config: &'a Config,
    splitter: DeclarationSplitter,
}

impl<'a> ContextCollector<'a> {
    #[must_use]
    pub fn new(collab: Collaborators<'a>, config: &'a Config) -> Self {
        Self {
            collab,
            config,
            splitter: DeclarationSplitter::new(&config.splitter),
        }
    }

    // ── Usage windows ────────────────────────────────────────────────

    /// Diff window around `position` of the after revision of `rel_path`.
    ///
    /// Both revisions are canonicalized first; the position is carried through
    /// the reformat of the after revision.
    pub fn diff_context_at(&self, rel_path: &str, position: Position, policy: ContextPolicy) -> Result<ContextWindow> {
        let before = self.collab.files.read_file(rel_path, Revision::Before)?;
        let after = self.collab.files.read_file(rel_path, Revision::After)?;

        let cursor = position::to_offset(&after, position)?;
        let canon_before = self.canonicalize(&before, None)?;
        let canon_after = self.canonicalize(&after, Some(cursor))?;

        let (before, after, target) = match canon_after.cursor {
            Some(offset) => {
                let target = position::to_position(&canon_after.text, offset)?;
                (canon_before.text, canon_after.text, target)
            }
            None => {
                warn!("Cursor lost while formatting {rel_path}, diffing unformatted text");
                (before, after, position)
            }
        };

        let clean = locate_and_extract(&before, &after, target, &self.config.diff);
        Ok(window(&clean, policy, policy.max_lines(&self.config.window)))
    }

    fn canonicalize(&self, text: &str, cursor: Option<usize>) -> Result<Canonical> {
        let canonical = self.collab.canonicalizer.canonicalize(text, cursor)?;
        if canonical.text.is_empty() && !text.is_empty() {
            debug!("Formatter rejected input, keeping original text");
            return Ok(Canonical {
                text: text.to_string(),
                cursor,
            });
        }
        Ok(canonical)
    }

    fn canonical_text(&self, text: &str) -> Result<String> {
        Ok(self.canonicalize(text, None)?.text)
    }

    /// Rendered diff windows at every call site of the changed method.
    ///
    /// Windows look backward when parameter types changed and forward when the
    /// return type changed. With more than `rerank_threshold` results and a
    /// non-empty `query`, only the best `rerank_top_k` are kept.
    pub fn usage_contexts(&self, change: &MethodChange, query: Option<&str>) -> Result<Vec<String>> {
        let file = self.collab.files.read_file(&change.rel_path, Revision::After)?;
        let (name, name_position) = metadata::method_name_position(&change.after)
            .ok_or_else(|| ContextError::not_found("name of the changed method"))?;
        let position = position::relocate(&file, &change.after, name_position)?;

        let references = self.collab.references.find_references(&change.rel_path, position)?;
        info!("Found {} usages for {name}", references.len());

        let excluded = change.test.as_ref().map(|t| self.test_span(t)).transpose()?;
        let policy = SyntacticDiff::between(&change.before, &change.after)
            .map_or(ContextPolicy::StatementScope, |d| {
                ContextPolicy::from_flags(d.parameter_types, d.return_type)
            });

        let mut texts = BTreeSet::new();
        for usage in references {
            if self.config.collector.clean_tests && usage.path.to_lowercase().contains("test") {
                continue;
            }
            if let Some((path, first, last)) = &excluded {
                if usage.path == *path && (*first..=*last).contains(&usage.start.line) {
                    continue;
                }
            }
            match self.diff_context_at(&usage.path, usage.start, policy) {
                Ok(w) if !w.is_empty() => {
                    texts.insert(w.render());
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping usage at {}:{}: {e}", usage.path, usage.start),
            }
        }

        let texts: Vec<String> = texts.into_iter().collect();
        info!("Found {} diff texts for usages", texts.len());
        if texts.len() <= self.config.collector.rerank_threshold {
            return Ok(texts);
        }
        match query.filter(|q| !q.trim().is_empty()) {
            Some(q) => self.collab.ranker.rank(q, &texts, self.config.collector.rerank_top_k),
            None => Ok(texts),
        }
    }

    /// First and last line of the co-evolved test method.
    fn test_span(&self, test: &TestSite) -> Result<(String, usize, usize)> {
        let file = self.collab.files.read_file(&test.rel_path, Revision::After)?;
        let start = file
            .find(&test.method)
            .ok_or_else(|| ContextError::not_found(format!("test method in {}", test.rel_path)))?;
        let end = start + test.method.len().saturating_sub(1);
        Ok((
            test.rel_path.clone(),
            position::to_position(&file, start)?.line,
            position::to_position(&file, end)?.line,
        ))
    }

    // ── Class contexts ───────────────────────────────────────────────

    /// Definition of the name at `position`, or `None` outside the repository.
    fn resolve(&self, rel_path: &str, position: Position) -> Result<Option<Location>> {
        match self.collab.definitions.find_definition(rel_path, position) {
            Ok(found) => Ok(found),
            Err(e) if e.is_terminal() => {
                debug!("No definition for {rel_path}:{position}: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Split the type declared at `location` and merge its inherited members.
    pub fn class_context(&self, location: &Location) -> Result<ClassContext> {
        let text = self.collab.files.read_file(&location.path, Revision::After)?;
        let start = position::to_offset(&text, location.start)?;
        let end = position::to_offset(&text, location.end)?;
        let class_type = text
            .get(start..end)
            .ok_or_else(|| ContextError::out_of_range(format!("class name span in {}", location.path)))?
            .to_string();
        info!("Collecting class context for {class_type}");

        let mut acc = SplitAccumulator::new();
        self.splitter.split_into(&text, location.start, &mut acc)?;
        let (instantiating, mut members) = partition_by_type(acc.take_units(), &class_type);
        self.splitter.recurse_parents(
            self.collab.definitions,
            self.collab.files,
            &location.path,
            &text,
            location.start,
            &mut acc,
        )?;
        members.extend(acc.into_units());

        info!(
            "Collected {} members and {} instantiating members for {class_type}",
            members.len(),
            instantiating.len()
        );
        Ok(ClassContext {
            class_type,
            rel_path: location.path.clone(),
            instantiating,
            members,
        })
    }

    /// Class contexts of every in-repository type named at `positions` of `rel_path`.
    pub fn class_contexts(&self, rel_path: &str, positions: &[Position]) -> Result<Vec<ClassContext>> {
        let mut seen = HashSet::new();
        let mut contexts = Vec::new();
        for &position in positions {
            let Some(location) = self.resolve(rel_path, position)? else {
                continue;
            };
            if !seen.insert((location.path.clone(), location.start)) {
                continue;
            }
            match self.class_context(&location) {
                Ok(ctx) => contexts.push(ctx),
                Err(e) if e.is_terminal() => warn!("Skipping type at {}: {e}", location.path),
                Err(e) => return Err(e),
            }
        }
        Ok(contexts)
    }

    // ── File-level change items ──────────────────────────────────────

    /// Change items of `rel_path` outside the focal method, plus those of every
    /// in-repository superclass and interface file.
    pub fn file_diff_contexts(&self, rel_path: &str, method_before: &str, method_after: &str) -> Result<BTreeSet<String>> {
        let file_before = self.collab.files.read_file(rel_path, Revision::Before)?;
        let file_after = self.collab.files.read_file(rel_path, Revision::After)?;

        let rest_before = if method_before.is_empty() {
            file_before
        } else {
            file_before.replace(method_before, "")
        };
        let method_start = file_after
            .find(method_after)
            .ok_or_else(|| ContextError::not_found(format!("changed method in {rel_path}")))?;
        let rest_after = format!(
            "{}{}",
            &file_after[..method_start],
            &file_after[method_start + method_after.len()..]
        );

        let clean_tests = self.config.collector.clean_tests;
        let mut texts = diff_texts(
            &self.canonical_text(&strip_file_noise(&rest_before, clean_tests))?,
            &self.canonical_text(&strip_file_noise(&rest_after, clean_tests))?,
            self.config.collector.diff_line_limit,
            true,
        );
        info!("Found {} diff texts in {rel_path}", texts.len());

        let class_position = position::to_position(&file_after, method_start)?;
        let mut visited = HashSet::from([rel_path.to_string()]);
        self.parent_diff_texts(rel_path, &file_after, class_position, &mut visited, &mut texts)?;
        Ok(texts)
    }

    fn parent_diff_texts(
        &self,
        rel_path: &str,
        text: &str,
        position: Position,
        visited: &mut HashSet<String>,
        texts: &mut BTreeSet<String>,
    ) -> Result<()> {
        let tree = SyntaxTree::parse(text)?;
        for parent in parent_type_positions(&tree, position)? {
            let Some(location) = self.resolve(rel_path, parent)? else {
                continue;
            };
            if !visited.insert(location.path.clone()) {
                continue;
            }

            let before = self.collab.files.read_file(&location.path, Revision::Before)?;
            let after = self.collab.files.read_file(&location.path, Revision::After)?;
            let found = diff_texts(
                &self.canonical_text(&strip_file_noise(&before, false))?,
                &self.canonical_text(&strip_file_noise(&after, false))?,
                self.config.collector.diff_line_limit,
                true,
            );
            info!("Found {} diff texts in {}", found.len(), location.path);
            texts.extend(found);

            self.parent_diff_texts(&location.path, &after, location.start, visited, texts)?;
        }
        Ok(())
    }
}
