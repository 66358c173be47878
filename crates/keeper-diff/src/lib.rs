//! Diff engine for Keeper.
//!
//! A pure function from two stored snapshots to a structured line diff. One
//! [`DiffResult`] drives every rendering: the unified line list, the
//! side-by-side split view, compact hunks, and plain-text unified output.
//!
//! # Key Types
//!
//! - [`DiffResult`] / [`DiffLine`] / [`DiffStats`] -- Line-level diff with summary statistics
//! - [`SplitRow`] / [`SplitCell`] -- Side-by-side projection
//! - [`Hunk`] -- Changed region with surrounding context

mod cleanup;
pub mod line_diff;
pub mod render;

pub use line_diff::{diff_bytes, diff_text, DiffLine, DiffResult, DiffStats, LineKind};
pub use render::{Hunk, SplitCell, SplitRow};
