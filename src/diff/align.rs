use std::collections::BTreeSet;

use tracing::debug;

use super::{ContextPolicy, ContextRadius, ContextWindow, DiffLine, LineTag, diff, window};
use crate::config::DiffConfig;
use crate::position::Position;

/// A hunk reduced to the lines that carry code, with the target line's index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanHunk {
    pub lines: Vec<DiffLine>,
    /// `None` when the target line is not part of the clean sequence (for
    /// example a comment-only line).
    pub target: Option<usize>,
}

impl CleanHunk {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.target.is_none()
    }
}

fn is_comment(content: &str, markers: &[String]) -> bool {
    markers.iter().any(|m| content.starts_with(m.as_str()))
}

/// Find the hunk of `diff(before, after)` covering `target.line` of `after` and
/// reduce it to a [`CleanHunk`].
///
/// Blank lines are dropped. Changed lines are kept unless they are comment-only.
/// Unchanged lines are kept only when they are the target itself, so a call
/// site whose surroundings changed still anchors the window.
pub fn locate_and_extract(before: &str, after: &str, target: Position, config: &DiffConfig) -> CleanHunk {
    let unified = diff(before, after, ContextRadius::Lines(config.context_radius));
    let Some(hunk) = unified.hunks.iter().find(|h| h.covers_new_line(target.line)) else {
        debug!("No hunk covers line {} of the after revision", target.line);
        return CleanHunk::default();
    };

    let mut clean = CleanHunk::default();
    for line in &hunk.lines {
        let content = line.text.trim_start();
        if content.is_empty() {
            continue;
        }
        let comment = is_comment(content, &config.comment_markers);
        if line.tag != LineTag::Context && !comment {
            clean.lines.push(line.clone());
        }
        if line.new_line == Some(target.line) && !comment {
            if line.tag == LineTag::Context {
                clean.lines.push(line.clone());
            }
            clean.target = Some(clean.lines.len() - 1);
        }
    }
    clean
}

/// Locate the target hunk and cut a window of at most `max_lines` around it,
/// using the default diff settings.
pub fn diff_and_window(
    before: &str,
    after: &str,
    position: Position,
    policy: ContextPolicy,
    max_lines: usize,
) -> ContextWindow {
    let clean = locate_and_extract(before, after, position, &DiffConfig::default());
    window(&clean, policy, max_lines)
}

/// Zero-context change items between two texts.
///
/// Each hunk becomes one or more items of at most `line_limit` lines (0 means
/// unlimited). With `require_addition`, items made only of removals are skipped.
pub fn diff_texts(before: &str, after: &str, line_limit: usize, require_addition: bool) -> BTreeSet<String> {
    let unified = diff(before, after, ContextRadius::Lines(0));
    let chunk = if line_limit == 0 { usize::MAX } else { line_limit };

    unified
        .hunks
        .iter()
        .flat_map(|hunk| hunk.lines.chunks(chunk))
        .filter(|item| !require_addition || item.iter().any(|l| l.tag == LineTag::Added))
        .map(|item| item.iter().map(DiffLine::render).collect::<Vec<_>>().join("\n"))
        .collect()
}
