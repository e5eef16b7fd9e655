use serde::{Deserialize, Serialize};

use super::{CleanHunk, DiffLine, LineTag};
use crate::config::WindowConfig;

/// Which part of a clean hunk surrounds the target line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextPolicy {
    /// Lines up to and including the target.
    BeforeOnly,
    /// The target and everything after it.
    AfterOnly,
    /// The whole clean hunk.
    Both,
    /// The statement ending at the target: the run of changes since the last
    /// addition that precedes a non-added line.
    #[default]
    StatementScope,
}

impl ContextPolicy {
    #[must_use]
    pub fn from_flags(before: bool, after: bool) -> Self {
        match (before, after) {
            (true, false) => Self::BeforeOnly,
            (false, true) => Self::AfterOnly,
            (true, true) => Self::Both,
            (false, false) => Self::StatementScope,
        }
    }

    #[must_use]
    pub fn default_max_lines(self) -> usize {
        self.max_lines(&WindowConfig::default())
    }

    #[must_use]
    pub fn max_lines(self, config: &WindowConfig) -> usize {
        match self {
            Self::BeforeOnly => config.before_only,
            Self::AfterOnly => config.after_only,
            Self::Both => config.both,
            Self::StatementScope => config.statement_scope,
        }
    }
}

/// A contiguous slice of a clean hunk around the target line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextWindow {
    pub lines: Vec<DiffLine>,
    /// Index of the target inside `lines`.
    pub target: Option<usize>,
}

impl ContextWindow {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Diff-prefixed lines joined with `\n`.
    #[must_use]
    pub fn render(&self) -> String {
        self.lines.iter().map(DiffLine::render).collect::<Vec<_>>().join("\n")
    }
}

/// Cut the window selected by `policy` out of `clean`, capped at `max_lines`.
///
/// The cap keeps the target: the window is centered on it and shifted inward
/// when it would cross either end, so it holds exactly
/// `min(selected, max_lines)` lines.
pub fn window(clean: &CleanHunk, policy: ContextPolicy, max_lines: usize) -> ContextWindow {
    let Some(t) = clean.target.filter(|&t| t < clean.lines.len()) else {
        return ContextWindow::default();
    };
    let lines = &clean.lines;

    let (selected, target) = match policy {
        ContextPolicy::BeforeOnly => (&lines[..=t], t),
        ContextPolicy::AfterOnly => (&lines[t..], 0),
        ContextPolicy::Both => (&lines[..], t),
        ContextPolicy::StatementScope => {
            let start = statement_start(lines, t);
            (&lines[start..=t], t - start)
        }
    };
    cap(selected, target, max_lines)
}

/// Scan backward from `t` over the additions adjacent to it, then over the
/// non-added lines before them; the statement starts after the next addition.
fn statement_start(lines: &[DiffLine], t: usize) -> usize {
    let mut skipping_additions = true;
    for idx in (0..=t).rev() {
        if lines[idx].tag == LineTag::Added {
            if !skipping_additions {
                return idx + 1;
            }
        } else {
            skipping_additions = false;
        }
    }
    0
}

fn cap(lines: &[DiffLine], target: usize, max_lines: usize) -> ContextWindow {
    if max_lines == 0 {
        return ContextWindow::default();
    }
    if lines.len() <= max_lines {
        return ContextWindow {
            lines: lines.to_vec(),
            target: Some(target),
        };
    }
    let lower = target.saturating_sub(max_lines / 2).min(lines.len() - max_lines);
    ContextWindow {
        lines: lines[lower..lower + max_lines].to_vec(),
        target: Some(target - lower),
    }
}
