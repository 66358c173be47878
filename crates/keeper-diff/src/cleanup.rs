//! Line-level edit scripts and semantic cleanup.
//!
//! Myers produces a minimal script, which for config files often interleaves
//! single shared lines (`}`, blank lines) between unrelated edits. The
//! cleanup pass folds such short equalities into the surrounding edits so a
//! rewritten block reads as one removal followed by one addition.

use similar::{capture_diff_slices, Algorithm, DiffOp};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Op {
    Equal,
    Delete,
    Insert,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Edit<'a> {
    pub op: Op,
    pub lines: Vec<&'a str>,
}

impl<'a> Edit<'a> {
    fn new(op: Op, lines: &[&'a str]) -> Self {
        Self {
            op,
            lines: lines.to_vec(),
        }
    }
}

/// Cleaned-up edit script turning `old` into `new`.
///
/// Scripts are computed in a fixed orientation and mirrored when the inputs
/// arrive swapped, so `script(b, a)` is always the mirror of `script(a, b)`.
pub(crate) fn script<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<Edit<'a>> {
    let swapped = old > new;
    let (a, b) = if swapped { (new, old) } else { (old, new) };

    let mut edits = myers(a, b);
    cleanup_semantic(&mut edits);
    if swapped {
        for edit in &mut edits {
            edit.op = match edit.op {
                Op::Equal => Op::Equal,
                Op::Delete => Op::Insert,
                Op::Insert => Op::Delete,
            };
        }
        merge(&mut edits);
    }
    edits
}

fn myers<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<Edit<'a>> {
    let mut edits = Vec::new();
    for op in capture_diff_slices(Algorithm::Myers, old, new) {
        match op {
            DiffOp::Equal {
                old_index, len, ..
            } => edits.push(Edit::new(Op::Equal, &old[old_index..old_index + len])),
            DiffOp::Delete {
                old_index, old_len, ..
            } => edits.push(Edit::new(Op::Delete, &old[old_index..old_index + old_len])),
            DiffOp::Insert {
                new_index, new_len, ..
            } => edits.push(Edit::new(Op::Insert, &new[new_index..new_index + new_len])),
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                edits.push(Edit::new(Op::Delete, &old[old_index..old_index + old_len]));
                edits.push(Edit::new(Op::Insert, &new[new_index..new_index + new_len]));
            }
        }
    }
    merge(&mut edits);
    edits
}

/// Eliminate equalities no longer than the edits on both of their sides.
///
/// An eliminated equality becomes a deletion plus an insertion of the same
/// lines. After an elimination the scan resumes from the equality before the
/// previous one, since that equality may now qualify too.
pub(crate) fn cleanup_semantic(edits: &mut Vec<Edit<'_>>) {
    let mut changed = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<usize> = None;
    let (mut inserted_before, mut deleted_before) = (0usize, 0usize);
    let (mut inserted_after, mut deleted_after) = (0usize, 0usize);

    let mut i = 0;
    while i < edits.len() {
        if edits[i].op == Op::Equal {
            equalities.push(i);
            inserted_before = inserted_after;
            deleted_before = deleted_after;
            inserted_after = 0;
            deleted_after = 0;
            last_equality = Some(edits[i].lines.len());
            i += 1;
            continue;
        }

        let len = edits[i].lines.len();
        if edits[i].op == Op::Insert {
            inserted_after += len;
        } else {
            deleted_after += len;
        }

        let eliminate = match (last_equality, equalities.last()) {
            (Some(eq_len), Some(&at)) => {
                let fits = eq_len <= inserted_before.max(deleted_before)
                    && eq_len <= inserted_after.max(deleted_after);
                fits.then_some(at)
            }
            _ => None,
        };

        match eliminate {
            Some(at) => {
                let lines = edits[at].lines.clone();
                edits[at].op = Op::Insert;
                edits.insert(at, Edit { op: Op::Delete, lines });
                equalities.pop();
                equalities.pop();
                i = equalities.last().map_or(0, |&e| e + 1);
                inserted_before = 0;
                deleted_before = 0;
                inserted_after = 0;
                deleted_after = 0;
                last_equality = None;
                changed = true;
            }
            None => i += 1,
        }
    }

    if changed {
        merge(edits);
    }
}

/// Normalise a script: adjacent edits of one kind are joined, every change
/// run becomes one deletion followed by one insertion, and lines common to
/// both ends of a run are moved into the neighbouring equalities.
pub(crate) fn merge<'a>(edits: &mut Vec<Edit<'a>>) {
    let mut out: Vec<Edit<'a>> = Vec::with_capacity(edits.len());
    let mut deleted: Vec<&'a str> = Vec::new();
    let mut inserted: Vec<&'a str> = Vec::new();

    for edit in edits.drain(..) {
        match edit.op {
            Op::Delete => deleted.extend(edit.lines),
            Op::Insert => inserted.extend(edit.lines),
            Op::Equal => {
                flush(&mut out, &mut deleted, &mut inserted);
                push_equal(&mut out, edit.lines);
            }
        }
    }
    flush(&mut out, &mut deleted, &mut inserted);
    *edits = out;
}

fn flush<'a>(out: &mut Vec<Edit<'a>>, deleted: &mut Vec<&'a str>, inserted: &mut Vec<&'a str>) {
    let prefix = deleted
        .iter()
        .zip(inserted.iter())
        .take_while(|(d, i)| d == i)
        .count();
    if prefix > 0 {
        push_equal(out, deleted.drain(..prefix).collect());
        inserted.drain(..prefix);
    }

    let suffix = deleted
        .iter()
        .rev()
        .zip(inserted.iter().rev())
        .take_while(|(d, i)| d == i)
        .count();
    let common_tail = deleted.split_off(deleted.len() - suffix);
    inserted.truncate(inserted.len() - suffix);

    if !deleted.is_empty() {
        out.push(Edit {
            op: Op::Delete,
            lines: std::mem::take(deleted),
        });
    }
    if !inserted.is_empty() {
        out.push(Edit {
            op: Op::Insert,
            lines: std::mem::take(inserted),
        });
    }
    push_equal(out, common_tail);
}

fn push_equal<'a>(out: &mut Vec<Edit<'a>>, lines: Vec<&'a str>) {
    if lines.is_empty() {
        return;
    }
    match out.last_mut() {
        Some(last) if last.op == Op::Equal => last.lines.extend(lines),
        _ => out.push(Edit {
            op: Op::Equal,
            lines,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit<'a>(op: Op, lines: &[&'a str]) -> Edit<'a> {
        Edit::new(op, lines)
    }

    #[test]
    fn merge_orders_runs_and_joins_neighbours() {
        let mut edits = vec![
            edit(Op::Insert, &["b"]),
            edit(Op::Delete, &["a"]),
            edit(Op::Insert, &["c"]),
            edit(Op::Equal, &["x"]),
            edit(Op::Equal, &["y"]),
        ];
        merge(&mut edits);
        assert_eq!(
            edits,
            vec![
                edit(Op::Delete, &["a"]),
                edit(Op::Insert, &["b", "c"]),
                edit(Op::Equal, &["x", "y"]),
            ]
        );
    }

    #[test]
    fn merge_factors_common_prefix_and_suffix() {
        let mut edits = vec![
            edit(Op::Delete, &["k", "a", "z"]),
            edit(Op::Insert, &["k", "b", "z"]),
        ];
        merge(&mut edits);
        assert_eq!(
            edits,
            vec![
                edit(Op::Equal, &["k"]),
                edit(Op::Delete, &["a"]),
                edit(Op::Insert, &["b"]),
                edit(Op::Equal, &["z"]),
            ]
        );
    }

    #[test]
    fn short_equality_between_edits_is_folded() {
        let mut edits = vec![
            edit(Op::Delete, &["a1", "a2"]),
            edit(Op::Insert, &["b1", "b2"]),
            edit(Op::Equal, &["}"]),
            edit(Op::Delete, &["c1", "c2"]),
            edit(Op::Insert, &["d1", "d2"]),
        ];
        cleanup_semantic(&mut edits);
        assert_eq!(
            edits,
            vec![
                edit(Op::Delete, &["a1", "a2", "}", "c1", "c2"]),
                edit(Op::Insert, &["b1", "b2", "}", "d1", "d2"]),
            ]
        );
    }

    #[test]
    fn long_equality_is_kept() {
        let original = vec![
            edit(Op::Delete, &["a"]),
            edit(Op::Equal, &["x", "y"]),
            edit(Op::Insert, &["b"]),
        ];
        let mut edits = original.clone();
        cleanup_semantic(&mut edits);
        assert_eq!(edits, original);
    }

    #[test]
    fn swapped_inputs_produce_mirrored_scripts() {
        let old = ["a", "b", "c", "d"];
        let new = ["a", "x", "c", "y", "z"];
        let forward = script(&old, &new);
        let backward = script(&new, &old);

        let count = |edits: &[Edit<'_>], op| -> usize {
            edits.iter().filter(|e| e.op == op).map(|e| e.lines.len()).sum()
        };
        assert_eq!(count(&forward, Op::Insert), count(&backward, Op::Delete));
        assert_eq!(count(&forward, Op::Delete), count(&backward, Op::Insert));
    }
}
