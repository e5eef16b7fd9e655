/// Position translation between `(line, character)` pairs and byte offsets.
///
/// This is the only place where line/column bookkeeping happens. Lines and
/// characters are 0-indexed; a character counts UTF-8 code units (bytes) inside
/// its line, which is the same unit the syntax tree reports in its points.
use std::fmt;

use serde::{Deserialize, Serialize};
use tree_sitter::Point;

use crate::error::{ContextError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    #[must_use]
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }

    /// Position of the last character of a span ending at `end`.
    ///
    /// Definition and reference lookups are issued on the final character of an
    /// identifier, so type positions are reported this way.
    #[must_use]
    pub fn last_char_before(end: Point) -> Self {
        Self {
            line: end.row,
            character: end.column.saturating_sub(1),
        }
    }
}

impl From<Point> for Position {
    fn from(point: Point) -> Self {
        Self {
            line: point.row,
            character: point.column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.character)
    }
}

/// Convert a position into a byte offset of `text`.
pub fn to_offset(text: &str, position: Position) -> Result<usize> {
    let bytes = text.as_bytes();
    let mut line_start = 0;
    for _ in 0..position.line {
        match bytes[line_start..].iter().position(|&b| b == b'\n') {
            Some(idx) => line_start += idx + 1,
            None => {
                return Err(ContextError::out_of_range(format!(
                    "line {} exceeds a buffer of {} lines",
                    position.line,
                    text.lines().count()
                )));
            }
        }
    }

    let line_len = bytes[line_start..]
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(bytes.len() - line_start);
    if position.character > line_len {
        return Err(ContextError::out_of_range(format!(
            "character {} exceeds line {} of length {line_len}",
            position.character, position.line
        )));
    }

    Ok(line_start + position.character)
}

/// Convert a byte offset of `text` into a position.
pub fn to_position(text: &str, offset: usize) -> Result<Position> {
    if offset > text.len() {
        return Err(ContextError::out_of_range(format!(
            "offset {offset} exceeds a buffer of {} bytes",
            text.len()
        )));
    }

    let prefix = &text.as_bytes()[..offset];
    let line = prefix.iter().filter(|&&b| b == b'\n').count();
    let line_start = prefix
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |idx| idx + 1);

    Ok(Position {
        line,
        character: offset - line_start,
    })
}

/// Map a position found inside `inner` to the same spot inside `outer`.
///
/// `inner` must occur in `outer`; the first occurrence is used. A missing
/// substring is reported as `NotFound` because every later position-based query
/// would otherwise target the wrong code.
pub fn relocate(outer: &str, inner: &str, inner_position: Position) -> Result<Position> {
    let start = find_substring(outer, inner)?;
    let inner_offset = to_offset(inner, inner_position)?;
    to_position(outer, start + inner_offset)
}

/// Relocate several positions of the same substring with a single search.
pub fn relocate_all(outer: &str, inner: &str, positions: &[Position]) -> Result<Vec<Position>> {
    let start = find_substring(outer, inner)?;
    positions
        .iter()
        .map(|&pos| to_position(outer, start + to_offset(inner, pos)?))
        .collect()
}

/// Map a position of `outer` into the first occurrence of `inner`.
pub fn localize(outer: &str, inner: &str, outer_position: Position) -> Result<Position> {
    let start = find_substring(outer, inner)?;
    let offset = to_offset(outer, outer_position)?;
    if offset < start || offset > start + inner.len() {
        return Err(ContextError::out_of_range(format!(
            "position {outer_position} lies outside the substring at bytes {start}..{}",
            start + inner.len()
        )));
    }
    to_position(inner, offset - start)
}

fn find_substring(outer: &str, inner: &str) -> Result<usize> {
    outer.find(inner).ok_or_else(|| {
        let preview: String = inner.chars().take(40).collect();
        ContextError::not_found(format!("substring not present in outer text: {preview:?}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_to_offset_counts_newline_as_one_unit() {
        assert_eq!(to_offset("ab\ncd", Position::new(1, 1)).unwrap(), 4);
        assert_eq!(to_offset("ab\ncd", Position::new(0, 0)).unwrap(), 0);
        assert_eq!(to_offset("ab\ncd", Position::new(1, 2)).unwrap(), 5);
    }

    #[test]
    fn test_to_offset_out_of_range() {
        assert!(matches!(
            to_offset("ab\ncd", Position::new(2, 0)),
            Err(ContextError::OutOfRange(_))
        ));
        assert!(matches!(
            to_offset("ab\ncd", Position::new(0, 3)),
            Err(ContextError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_to_position() {
        assert_eq!(to_position("ab\ncd", 4).unwrap(), Position::new(1, 1));
        assert_eq!(to_position("ab\ncd", 2).unwrap(), Position::new(0, 2));
        assert_eq!(to_position("ab\ncd", 3).unwrap(), Position::new(1, 0));
        assert_eq!(to_position("", 0).unwrap(), Position::new(0, 0));
        assert!(to_position("ab", 3).is_err());
    }

    #[test]
    fn test_relocate_method_into_file() {
        let file = "class A {\n  void m() {\n    int x = 1;\n  }\n}\n";
        let method = "void m() {\n    int x = 1;\n  }";
        let pos = relocate(file, method, Position::new(1, 8)).unwrap();
        assert_eq!(pos, Position::new(2, 8));
        let back = localize(file, method, pos).unwrap();
        assert_eq!(back, Position::new(1, 8));
    }

    #[test]
    fn test_relocate_missing_substring() {
        let err = relocate("class A {}", "void m() {}", Position::new(0, 0)).unwrap_err();
        assert!(matches!(err, ContextError::NotFound(_)));
    }

    #[test]
    fn test_relocate_all_shares_search() {
        let outer = "xx\nhello\nworld";
        let inner = "hello\nworld";
        let got = relocate_all(outer, inner, &[Position::new(0, 1), Position::new(1, 4)]).unwrap();
        assert_eq!(got, vec![Position::new(1, 1), Position::new(2, 4)]);
    }

    #[test]
    fn test_localize_outside_span() {
        let err = localize("abc\ndef", "def", Position::new(0, 1)).unwrap_err();
        assert!(matches!(err, ContextError::OutOfRange(_)));
    }

    proptest! {
        #[test]
        fn proptest_offset_position_round_trip(text in "[a-z \n]{0,80}", seed in 0usize..1000) {
            let offset = if text.is_empty() { 0 } else { seed % (text.len() + 1) };
            let pos = to_position(&text, offset).unwrap();
            prop_assert_eq!(to_offset(&text, pos).unwrap(), offset);
            let again = to_position(&text, to_offset(&text, pos).unwrap()).unwrap();
            prop_assert_eq!(again, pos);
        }

        #[test]
        fn proptest_relocate_matches_find(
            prefix in "[a-z\n]{0,30}",
            inner in "[A-Z][A-Z\n]{0,20}",
            suffix in "[a-z\n]{0,30}",
            seed in 0usize..1000,
        ) {
            let outer = format!("{prefix}{inner}{suffix}");
            let inner_offset = seed % (inner.len() + 1);
            let inner_pos = to_position(&inner, inner_offset).unwrap();
            let pos = relocate(&outer, &inner, inner_pos).unwrap();
            let expected = outer.find(&inner).unwrap() + to_offset(&inner, inner_pos).unwrap();
            prop_assert_eq!(to_offset(&outer, pos).unwrap(), expected);
        }
    }
}
