//! Projections over a [`DiffResult`]: split rows, hunks, unified text.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::line_diff::{DiffLine, DiffResult, LineKind};

/// One side of a split-view row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitCell {
    pub line_num: usize,
    pub kind: LineKind,
    pub content: String,
}

/// One row of the side-by-side view. An absent cell renders empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRow {
    pub old: Option<SplitCell>,
    pub new: Option<SplitCell>,
}

/// A changed region plus surrounding context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    /// `@@ -old_start,old_count +new_start,new_count @@`
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_count, self.new_start, self.new_count
        )
    }
}

fn cell(line: &DiffLine, number: Option<usize>) -> Option<SplitCell> {
    number.map(|line_num| SplitCell {
        line_num,
        kind: line.kind,
        content: line.content.clone(),
    })
}

fn write_line(out: &mut String, line: &DiffLine) {
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{}{}", line.kind.marker(), line.content);
}

impl DiffResult {
    /// Side-by-side rows.
    ///
    /// Context lines fill both cells. A removed line directly followed by an
    /// added line shares one row; any other change gets a row of its own.
    pub fn split_rows(&self) -> Vec<SplitRow> {
        let mut rows = Vec::with_capacity(self.lines.len());
        let mut iter = self.lines.iter().peekable();
        while let Some(line) = iter.next() {
            let row = match line.kind {
                LineKind::Context => SplitRow {
                    old: cell(line, line.old_line),
                    new: cell(line, line.new_line),
                },
                LineKind::Removed => {
                    let paired = iter.next_if(|next| next.kind == LineKind::Added);
                    SplitRow {
                        old: cell(line, line.old_line),
                        new: paired.and_then(|added| cell(added, added.new_line)),
                    }
                }
                LineKind::Added => SplitRow {
                    old: None,
                    new: cell(line, line.new_line),
                },
            };
            rows.push(row);
        }
        rows
    }

    /// Plain-text unified rendering of every line, with `---`/`+++` headers.
    ///
    /// Empty when there are no changes.
    pub fn unified(&self, old_label: &str, new_label: &str) -> String {
        if !self.has_changes {
            return String::new();
        }
        let mut out = format!("--- {old_label}\n+++ {new_label}\n");
        for line in &self.lines {
            write_line(&mut out, line);
        }
        out
    }

    /// Group the lines into hunks with `context` lines around each change.
    /// Changes whose context would touch or overlap share a hunk.
    pub fn hunks(&self, context: usize) -> Vec<Hunk> {
        let changes: Vec<usize> = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.kind != LineKind::Context)
            .map(|(i, _)| i)
            .collect();

        let mut ranges: Vec<(usize, usize)> = Vec::new();
        for &i in &changes {
            let start = i.saturating_sub(context);
            let end = i.saturating_add(context).saturating_add(1).min(self.lines.len());
            match ranges.last_mut() {
                Some(last) if start <= last.1 => last.1 = end,
                _ => ranges.push((start, end)),
            }
        }

        ranges
            .into_iter()
            .map(|(start, end)| {
                let before = &self.lines[..start];
                let lines = &self.lines[start..end];
                let old_count = lines.iter().filter(|l| l.old_line.is_some()).count();
                let new_count = lines.iter().filter(|l| l.new_line.is_some()).count();
                let old_before = before.iter().filter(|l| l.old_line.is_some()).count();
                let new_before = before.iter().filter(|l| l.new_line.is_some()).count();
                Hunk {
                    old_start: if old_count == 0 { old_before } else { old_before + 1 },
                    old_count,
                    new_start: if new_count == 0 { new_before } else { new_before + 1 },
                    new_count,
                    lines: lines.to_vec(),
                }
            })
            .collect()
    }

    /// Unified rendering restricted to hunks, as `diff -u` prints it.
    pub fn unified_hunks(&self, old_label: &str, new_label: &str, context: usize) -> String {
        if !self.has_changes {
            return String::new();
        }
        let mut out = format!("--- {old_label}\n+++ {new_label}\n");
        for hunk in self.hunks(context) {
            out.push_str(&hunk.header());
            out.push('\n');
            for line in &hunk.lines {
                write_line(&mut out, line);
            }
        }
        out
    }
}
