//! Line-level diff of two snapshots.
//!
//! Lines keep their terminators while being compared, so `"a"` and `"a\n"`
//! differ, but are reported without them.

use serde::{Deserialize, Serialize};

use crate::cleanup::{script, Op};

/// The result of comparing two snapshots.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub has_changes: bool,
    pub lines: Vec<DiffLine>,
    pub stats: DiffStats,
}

/// Summary counts of a diff.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub lines_added: usize,
    pub lines_removed: usize,
    /// `min(lines_added, lines_removed)`: the smaller side is counted as
    /// replaced lines. No pairwise matching is attempted.
    pub lines_changed: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Context,
    Added,
    Removed,
}

impl LineKind {
    /// Prefix used in unified text output.
    pub fn marker(&self) -> char {
        match self {
            Self::Context => ' ',
            Self::Added => '+',
            Self::Removed => '-',
        }
    }
}

/// A single line of a diff.
///
/// Line numbers are 1-based and present only on the side the line exists on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    #[serde(rename = "type")]
    pub kind: LineKind,
    #[serde(rename = "old_line_num", skip_serializing_if = "Option::is_none", default)]
    pub old_line: Option<usize>,
    #[serde(rename = "new_line_num", skip_serializing_if = "Option::is_none", default)]
    pub new_line: Option<usize>,
    pub content: String,
}

impl DiffResult {
    /// Lines of the given kind.
    pub fn lines_of(&self, kind: LineKind) -> impl Iterator<Item = &DiffLine> {
        self.lines.iter().filter(move |l| l.kind == kind)
    }
}

/// Compute a line diff between two texts.
///
/// Identical inputs short-circuit to an empty result.
pub fn diff_text(old: &str, new: &str) -> DiffResult {
    if old == new {
        return DiffResult::default();
    }

    let old_lines: Vec<&str> = old.split_inclusive('\n').collect();
    let new_lines: Vec<&str> = new.split_inclusive('\n').collect();

    let mut builder = Builder::default();
    for edit in script(&old_lines, &new_lines) {
        let kind = match edit.op {
            Op::Equal => LineKind::Context,
            Op::Delete => LineKind::Removed,
            Op::Insert => LineKind::Added,
        };
        for line in edit.lines {
            builder.push(kind, strip_terminator(line));
        }
    }
    builder.finish()
}

/// Compute a diff between two stored byte contents.
///
/// Content that is not valid UTF-8 on either side is reported as a single
/// synthetic `(binary content, N bytes)` line per non-empty side.
pub fn diff_bytes(old: &[u8], new: &[u8]) -> DiffResult {
    if old == new {
        return DiffResult::default();
    }
    match (std::str::from_utf8(old), std::str::from_utf8(new)) {
        (Ok(old), Ok(new)) => diff_text(old, new),
        _ => {
            let mut builder = Builder::default();
            if !old.is_empty() {
                builder.push(LineKind::Removed, &binary_placeholder(old));
            }
            if !new.is_empty() {
                builder.push(LineKind::Added, &binary_placeholder(new));
            }
            builder.finish()
        }
    }
}

fn binary_placeholder(content: &[u8]) -> String {
    format!("(binary content, {} bytes)", content.len())
}

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Assigns line numbers and tallies stats while lines are appended.
#[derive(Default)]
struct Builder {
    lines: Vec<DiffLine>,
    old_next: usize,
    new_next: usize,
    stats: DiffStats,
}

impl Builder {
    fn push(&mut self, kind: LineKind, content: &str) {
        let mut old_line = None;
        let mut new_line = None;
        if kind != LineKind::Added {
            self.old_next += 1;
            old_line = Some(self.old_next);
        }
        if kind != LineKind::Removed {
            self.new_next += 1;
            new_line = Some(self.new_next);
        }
        match kind {
            LineKind::Added => self.stats.lines_added += 1,
            LineKind::Removed => self.stats.lines_removed += 1,
            LineKind::Context => {}
        }
        self.lines.push(DiffLine {
            kind,
            old_line,
            new_line,
            content: content.to_string(),
        });
    }

    fn finish(mut self) -> DiffResult {
        self.stats.lines_changed = self.stats.lines_added.min(self.stats.lines_removed);
        DiffResult {
            has_changes: true,
            lines: self.lines,
            stats: self.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn contents(result: &DiffResult, kinds: &[LineKind]) -> Vec<String> {
        result
            .lines
            .iter()
            .filter(|l| kinds.contains(&l.kind))
            .map(|l| l.content.clone())
            .collect()
    }

    fn side(text: &str) -> Vec<String> {
        text.split_inclusive('\n')
            .map(|l| strip_terminator(l).to_string())
            .collect()
    }

    #[test]
    fn identical_text_has_no_changes() {
        let result = diff_text("x: 1\n", "x: 1\n");
        assert!(!result.has_changes);
        assert!(result.lines.is_empty());
        assert_eq!(result.stats, DiffStats::default());
    }

    #[test]
    fn single_value_change() {
        let result = diff_text("x: 1\n", "x: 2\n");
        assert!(result.has_changes);
        assert_eq!(
            result.lines,
            vec![
                DiffLine {
                    kind: LineKind::Removed,
                    old_line: Some(1),
                    new_line: None,
                    content: "x: 1".into(),
                },
                DiffLine {
                    kind: LineKind::Added,
                    old_line: None,
                    new_line: Some(1),
                    content: "x: 2".into(),
                },
            ]
        );
        assert_eq!(
            result.stats,
            DiffStats {
                lines_added: 1,
                lines_removed: 1,
                lines_changed: 1,
            }
        );
    }

    #[test]
    fn line_numbers_advance_per_side() {
        let result = diff_text("a\nb\nc\nd\n", "a\nc\nd\ne\nf\n");
        let numbered: Vec<_> = result
            .lines
            .iter()
            .map(|l| (l.kind, l.old_line, l.new_line))
            .collect();
        assert_eq!(
            numbered,
            vec![
                (LineKind::Context, Some(1), Some(1)),
                (LineKind::Removed, Some(2), None),
                (LineKind::Context, Some(3), Some(2)),
                (LineKind::Context, Some(4), Some(3)),
                (LineKind::Added, None, Some(4)),
                (LineKind::Added, None, Some(5)),
            ]
        );
        assert_eq!(result.stats.lines_changed, 1);
    }

    #[test]
    fn trailing_newline_counts_as_a_change() {
        let result = diff_text("x: 1", "x: 1\n");
        assert!(result.has_changes);
        assert_eq!(contents(&result, &[LineKind::Removed]), vec!["x: 1"]);
        assert_eq!(contents(&result, &[LineKind::Added]), vec!["x: 1"]);
    }

    #[test]
    fn empty_sides() {
        let created = diff_text("", "a\nb\n");
        assert_eq!(created.stats.lines_added, 2);
        assert_eq!(created.stats.lines_removed, 0);
        assert_eq!(created.stats.lines_changed, 0);

        let deleted = diff_text("a\nb\n", "");
        assert_eq!(deleted.stats.lines_removed, 2);
        assert!(deleted.lines.iter().all(|l| l.new_line.is_none()));
    }

    #[test]
    fn crlf_terminators_are_stripped() {
        let result = diff_text("a\r\nb\r\n", "a\r\nc\r\n");
        assert_eq!(contents(&result, &[LineKind::Context]), vec!["a"]);
        assert_eq!(contents(&result, &[LineKind::Added]), vec!["c"]);
    }

    #[test]
    fn rewritten_block_reads_as_one_replacement() {
        let old = "a: 1\nb: 2\n---\nc: 3\nd: 4\n";
        let new = "a: 9\nb: 8\n---\nc: 7\nd: 6\n";
        let result = diff_text(old, new);
        let kinds: Vec<_> = result.lines.iter().map(|l| l.kind).collect();
        assert_eq!(kinds[..5], [LineKind::Removed; 5]);
        assert_eq!(kinds[5..], [LineKind::Added; 5]);
    }

    #[test]
    fn binary_content_uses_placeholder() {
        let result = diff_bytes(&[0xff, 0xfe, 0x00], b"text\n");
        assert!(result.has_changes);
        assert_eq!(
            contents(&result, &[LineKind::Removed]),
            vec!["(binary content, 3 bytes)"]
        );
        assert_eq!(
            contents(&result, &[LineKind::Added]),
            vec!["(binary content, 5 bytes)"]
        );

        let gone = diff_bytes(&[0xff], b"");
        assert_eq!(gone.stats.lines_added, 0);
        assert_eq!(gone.stats.lines_removed, 1);
    }

    #[test]
    fn bytes_delegate_to_text_diff() {
        assert_eq!(diff_bytes(b"x: 1\n", b"x: 2\n"), diff_text("x: 1\n", "x: 2\n"));
        assert!(!diff_bytes(&[0xff], &[0xff]).has_changes);
    }

    #[test]
    fn serializes_with_wire_names() {
        let json = serde_json::to_value(diff_text("a\n", "b\n")).unwrap();
        assert_eq!(json["has_changes"], true);
        assert_eq!(json["lines"][0]["type"], "removed");
        assert_eq!(json["lines"][0]["old_line_num"], 1);
        assert!(json["lines"][0].get("new_line_num").is_none());
        assert_eq!(json["stats"]["lines_changed"], 1);
    }

    fn text() -> impl Strategy<Value = String> {
        prop::collection::vec("[abc}]{0,2}", 0..12).prop_map(|lines| {
            let mut text = lines.join("\n");
            if !text.is_empty() {
                text.push('\n');
            }
            text
        })
    }

    proptest! {
        #[test]
        fn diff_with_itself_is_empty(t in text()) {
            let result = diff_text(&t, &t);
            prop_assert!(!result.has_changes);
            prop_assert!(result.lines.is_empty());
            prop_assert_eq!(result.stats, DiffStats::default());
        }

        #[test]
        fn swapping_inputs_swaps_counts(a in text(), b in text()) {
            let forward = diff_text(&a, &b);
            let backward = diff_text(&b, &a);
            prop_assert_eq!(forward.stats.lines_added, backward.stats.lines_removed);
            prop_assert_eq!(forward.stats.lines_removed, backward.stats.lines_added);
            prop_assert_eq!(forward.stats.lines_changed, backward.stats.lines_changed);
        }

        #[test]
        fn both_sides_are_reconstructible(a in text(), b in text()) {
            let result = diff_text(&a, &b);
            if a != b {
                prop_assert_eq!(contents(&result, &[LineKind::Context, LineKind::Removed]), side(&a));
                prop_assert_eq!(contents(&result, &[LineKind::Context, LineKind::Added]), side(&b));
            }
        }

        #[test]
        fn stats_match_line_kinds(a in text(), b in text()) {
            let result = diff_text(&a, &b);
            prop_assert_eq!(result.lines_of(LineKind::Added).count(), result.stats.lines_added);
            prop_assert_eq!(result.lines_of(LineKind::Removed).count(), result.stats.lines_removed);
            prop_assert_eq!(
                result.stats.lines_changed,
                result.stats.lines_added.min(result.stats.lines_removed)
            );
        }
    }
}
