//! Text rendering for command output.

use std::fmt::Write as _;

use colored::Colorize;

use keeper_diff::{DiffResult, LineKind, SplitCell};
use keeper_ledger::ValidationReport;
use keeper_scan::CycleReport;
use keeper_sdk::{ChangeKind, FileSummary, Version, VersionDiff};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

fn change_label(kind: ChangeKind) -> colored::ColoredString {
    match kind {
        ChangeKind::Created => kind.as_str().green(),
        ChangeKind::Modified => kind.as_str().yellow(),
        ChangeKind::Deleted => kind.as_str().red(),
    }
}

pub fn files(files: &[FileSummary]) -> String {
    if files.is_empty() {
        return "No tracked files.\n".into();
    }
    let mut out = String::new();
    for summary in files {
        let state = if summary.file.is_deleted {
            "deleted".red()
        } else {
            "live".green()
        };
        let latest = summary
            .latest_change_type
            .map(change_label)
            .unwrap_or_else(|| "-".normal());
        let _ = writeln!(
            out,
            "{}  {}  {} versions, last {} at {}",
            summary.file.path.to_string().bold(),
            state,
            summary.version_count,
            latest,
            summary.latest_change.format(TIME_FORMAT),
        );
    }
    out
}

pub fn log(versions: &[Version]) -> String {
    let mut out = String::new();
    for version in versions {
        let _ = writeln!(
            out,
            "{}  {}  {:<8}  {}  {} bytes",
            format!("v{}", version.id).yellow().bold(),
            version.captured_at.format(TIME_FORMAT),
            change_label(version.change),
            version.content_hash.short_hex().dimmed(),
            version.content.len(),
        );
    }
    out
}

pub fn version(version: &Version, with_content: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", "version".bold(), format!("v{}", version.id).yellow());
    let _ = writeln!(out, "path:     {}", version.path);
    let _ = writeln!(out, "change:   {}", change_label(version.change));
    let _ = writeln!(out, "captured: {}", version.captured_at.format(TIME_FORMAT));
    let _ = writeln!(out, "hash:     {}", version.content_hash);
    if let Some(previous) = &version.previous_hash {
        let _ = writeln!(out, "previous: {previous}");
    }
    if let Some(token) = &version.upstream_token {
        let _ = writeln!(out, "token:    {token}");
    }
    if with_content && !version.content.is_empty() {
        out.push('\n');
        out.push_str(&version.text());
        if !version.content.ends_with(b"\n") {
            out.push('\n');
        }
    }
    out
}

/// Coloured `diff -u` output with `context` lines around each change.
pub fn unified(diff: &VersionDiff, context: usize) -> String {
    if !diff.result.has_changes {
        return "No changes.\n".into();
    }
    let mut out = String::new();
    let _ = writeln!(out, "{}", format!("--- {}", diff.old_label).bold());
    let _ = writeln!(out, "{}", format!("+++ {}", diff.new_label).bold());
    for hunk in diff.result.hunks(context) {
        let _ = writeln!(out, "{}", hunk.header().cyan());
        for line in &hunk.lines {
            let text = format!("{}{}", line.kind.marker(), line.content);
            let _ = match line.kind {
                LineKind::Added => writeln!(out, "{}", text.green()),
                LineKind::Removed => writeln!(out, "{}", text.red()),
                LineKind::Context => writeln!(out, "{text}"),
            };
        }
    }
    out.push_str(&stats(&diff.result));
    out
}

fn stats(result: &DiffResult) -> String {
    format!(
        "{} added, {} removed, {} changed\n",
        result.stats.lines_added.to_string().green(),
        result.stats.lines_removed.to_string().red(),
        result.stats.lines_changed,
    )
}

fn split_cell(cell: Option<&SplitCell>, width: usize) -> String {
    let Some(cell) = cell else {
        return format!("{:>4} {:width$}", "", "");
    };
    let content: String = cell.content.chars().take(width).collect();
    let text = format!("{:>4} {content:<width$}", cell.line_num);
    match cell.kind {
        LineKind::Added => text.green().to_string(),
        LineKind::Removed => text.red().to_string(),
        LineKind::Context => text,
    }
}

/// Side-by-side view; each side is cut to `width` characters.
pub fn split(diff: &VersionDiff, width: usize) -> String {
    if !diff.result.has_changes {
        return "No changes.\n".into();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} | {}",
        format!("{:<w$}", diff.old_label, w = width + 5).bold(),
        diff.new_label.bold()
    );
    for row in diff.result.split_rows() {
        let _ = writeln!(
            out,
            "{} | {}",
            split_cell(row.old.as_ref(), width),
            split_cell(row.new.as_ref(), width).trim_end()
        );
    }
    out.push_str(&stats(&diff.result));
    out
}

pub fn cycle_report(report: &CycleReport) -> String {
    let mut out = String::new();
    let status = if report.is_clean() {
        "clean".green()
    } else {
        "with failures".yellow()
    };
    let _ = writeln!(out, "{} cycle {} {}", "scan".bold(), report.cycle, status);
    let _ = writeln!(
        out,
        "  scopes listed: {}, objects seen: {}",
        report.scopes_listed, report.objects_seen
    );
    let _ = writeln!(
        out,
        "  created {}, modified {}, deleted {}, metadata only {}, unchanged {}",
        report.created, report.modified, report.deleted, report.metadata_only, report.unchanged
    );
    for failure in &report.scope_failures {
        let _ = writeln!(out, "  {} {}: {}", "scope failed".red(), failure.scope, failure.error);
    }
    for failure in &report.object_failures {
        let _ = writeln!(out, "  {} {}: {}", "object failed".red(), failure.path, failure.error);
    }
    out
}

pub fn integrity(report: &ValidationReport) -> String {
    let mut out = String::new();
    if report.is_valid() {
        let _ = writeln!(
            out,
            "{} ledger integrity verified ({} files, {} versions)",
            "✓".green().bold(),
            report.files_checked,
            report.versions_checked
        );
        return out;
    }
    let _ = writeln!(
        out,
        "{} {} violations in {} files, {} versions",
        "✗".red().bold(),
        report.violations.len(),
        report.files_checked,
        report.versions_checked
    );
    for violation in &report.violations {
        let version = violation
            .version
            .map(|id| format!(" v{id}"))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {}{}: {:?}: {}",
            violation.path, version, violation.kind, violation.description
        );
    }
    out
}
