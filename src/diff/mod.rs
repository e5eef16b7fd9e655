//! Line-level unified diff between two revisions, target-hunk alignment and
//! context windowing.
//!
//! [`diff`] produces hunks from a Myers edit script. [`locate_and_extract`]
//! finds the hunk covering a position of the after revision and reduces it to a
//! [`CleanHunk`] without blank or comment-only lines. [`window`] then cuts a
//! bounded [`ContextWindow`] around the target line under a [`ContextPolicy`].
mod align;
mod myers;
mod window;

pub use align::{CleanHunk, diff_and_window, diff_texts, locate_and_extract};
pub use window::{ContextPolicy, ContextWindow, window};

use std::fmt;

use serde::Serialize;

use myers::OpTag;

/// Lines of context kept around each change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextRadius {
    Lines(usize),
    /// Enough context to cover both texts entirely, giving a single hunk.
    Full,
}

impl From<i64> for ContextRadius {
    /// Negative values select [`ContextRadius::Full`].
    fn from(value: i64) -> Self {
        usize::try_from(value).map_or(Self::Full, Self::Lines)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LineTag {
    Added,
    Removed,
    Context,
}

impl LineTag {
    #[must_use]
    pub fn prefix(self) -> char {
        match self {
            Self::Added => '+',
            Self::Removed => '-',
            Self::Context => ' ',
        }
    }
}

/// One tagged line of a hunk with its 0-based line numbers in each revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub tag: LineTag,
    pub text: String,
    /// `None` for added lines.
    pub old_line: Option<usize>,
    /// `None` for removed lines.
    pub new_line: Option<usize>,
}

impl DiffLine {
    /// The line as it appears in a unified diff, prefix included.
    #[must_use]
    pub fn render(&self) -> String {
        format!("{}{}", self.tag.prefix(), self.text)
    }
}

/// A contiguous diff region. Starts are 0-based line indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    /// `@@ -a,b +c,d @@` with 1-based starts.
    #[must_use]
    pub fn header(&self) -> String {
        format!(
            "@@ -{} +{} @@",
            format_range(self.old_start, self.old_len),
            format_range(self.new_start, self.new_len)
        )
    }

    /// Whether `line` of the after revision lies in this hunk.
    #[must_use]
    pub fn covers_new_line(&self, line: usize) -> bool {
        self.new_start <= line && line < self.new_start + self.new_len
    }
}

fn format_range(start: usize, len: usize) -> String {
    match len {
        1 => format!("{}", start + 1),
        0 => format!("{start},0"),
        _ => format!("{},{len}", start + 1),
    }
}

impl fmt::Display for DiffHunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header())?;
        for line in &self.lines {
            write!(f, "\n{}", line.render())?;
        }
        Ok(())
    }
}

/// Every hunk between two texts, in order and without overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnifiedDiff {
    pub hunks: Vec<DiffHunk>,
}

impl UnifiedDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }
}

impl fmt::Display for UnifiedDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, hunk) in self.hunks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{hunk}")?;
        }
        Ok(())
    }
}

/// Unified line diff of `before` against `after`.
pub fn diff(before: &str, after: &str, radius: ContextRadius) -> UnifiedDiff {
    let old: Vec<&str> = before.lines().collect();
    let new: Vec<&str> = after.lines().collect();
    let radius = match radius {
        ContextRadius::Lines(n) => n,
        ContextRadius::Full => old.len().max(new.len()),
    };

    let script = myers::edit_script(&old, &new);
    let groups = myers::grouped_opcodes(myers::opcodes(&script), radius);

    let hunks = groups
        .into_iter()
        .filter_map(|group| {
            let first = group.first()?;
            let last = group.last()?;
            let mut lines = Vec::new();
            for code in &group {
                if code.tag == OpTag::Equal {
                    lines.extend(code.old.clone().zip(code.new.clone()).map(|(i, j)| DiffLine {
                        tag: LineTag::Context,
                        text: old[i].to_string(),
                        old_line: Some(i),
                        new_line: Some(j),
                    }));
                    continue;
                }
                lines.extend(code.old.clone().map(|i| DiffLine {
                    tag: LineTag::Removed,
                    text: old[i].to_string(),
                    old_line: Some(i),
                    new_line: None,
                }));
                lines.extend(code.new.clone().map(|j| DiffLine {
                    tag: LineTag::Added,
                    text: new[j].to_string(),
                    old_line: None,
                    new_line: Some(j),
                }));
            }
            Some(DiffHunk {
                old_start: first.old.start,
                old_len: last.old.end - first.old.start,
                new_start: first.new.start,
                new_len: last.new.end - first.new.start,
                lines,
            })
        })
        .collect();

    UnifiedDiff { hunks }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_from_sentinel() {
        assert_eq!(ContextRadius::from(-1), ContextRadius::Full);
        assert_eq!(ContextRadius::from(3), ContextRadius::Lines(3));
    }

    #[test]
    fn test_diff_single_line_change() {
        let d = diff("class C { void m() {} }", "class C { void m(int x) {} }", ContextRadius::Lines(0));
        assert_eq!(d.hunks.len(), 1);
        assert_eq!(
            d.to_string(),
            "@@ -1 +1 @@\n-class C { void m() {} }\n+class C { void m(int x) {} }"
        );
    }

    #[test]
    fn test_diff_identical_is_empty() {
        assert!(diff("a\nb\n", "a\nb\n", ContextRadius::Lines(3)).is_empty());
        assert!(diff("", "", ContextRadius::Full).is_empty());
    }

    #[test]
    fn test_diff_headers_for_pure_insert_and_delete() {
        let d = diff("a\nc", "a\nb\nc", ContextRadius::Lines(0));
        assert_eq!(d.hunks[0].header(), "@@ -1,0 +2 @@");
        let d = diff("a\nb\nc", "a\nc", ContextRadius::Lines(0));
        assert_eq!(d.hunks[0].header(), "@@ -2 +1,0 @@");
    }

    #[test]
    fn test_diff_line_numbers_are_monotonic() {
        let before = "1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n11\n12";
        let after = "1\nX\n3\n4\n5\n6\n7\n8\n9\n10\nY\n12";
        let d = diff(before, after, ContextRadius::Lines(1));
        assert_eq!(d.hunks.len(), 2);
        assert_eq!(d.hunks[0].header(), "@@ -1,3 +1,3 @@");
        assert_eq!(d.hunks[1].header(), "@@ -10,3 +10,3 @@");
        let new_lines: Vec<usize> = d
            .hunks
            .iter()
            .flat_map(|h| h.lines.iter().filter_map(|l| l.new_line))
            .collect();
        assert!(new_lines.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_full_radius_is_one_hunk() {
        let before = "a\nb\nc\nd\ne\nf\ng\nh";
        let after = "A\nb\nc\nd\ne\nf\ng\nH";
        let d = diff(before, after, ContextRadius::Full);
        assert_eq!(d.hunks.len(), 1);
        assert_eq!(d.hunks[0].lines.len(), 10);
        assert!(d.hunks[0].covers_new_line(7));
    }

    #[test]
    fn test_fully_rewritten_file_is_one_hunk() {
        let before: String = (0..10_000).map(|i| format!("a{i}\n")).collect();
        let after: String = (0..10_000).map(|i| format!("b{i}\n")).collect();
        let d = diff(&before, &after, ContextRadius::Lines(3));
        assert_eq!(d.hunks.len(), 1);
        let hunk = &d.hunks[0];
        assert_eq!(hunk.lines.len(), 20_000);
        assert!(hunk.lines[..10_000].iter().all(|l| l.tag == LineTag::Removed));
        assert!(hunk.lines[10_000..].iter().all(|l| l.tag == LineTag::Added));
        assert_eq!(hunk.lines[10_000].text, "b0");
    }
}
