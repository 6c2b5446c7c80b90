//! Short human-readable summary of a report for the terminal.

use bytesize::ByteSize;
use std::fmt::Write as _;
use yansi::Paint;

use super::json::Report;
use crate::config::Mode;
use crate::error::RunStatus;
use crate::plan::{ActionKind, Outcome};

/// How many actions the summary lists before eliding the rest.
pub const DEFAULT_ACTION_LIMIT: usize = 20;

/// Render `report` as a few lines of text.
///
/// At most `action_limit` REMOVE/MOVE actions are listed.
#[must_use]
pub fn render_summary(report: &Report, action_limit: usize) -> String {
    let s = &report.summary;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} {} ({})",
        "treetidy".bold(),
        report.root.display(),
        report.mode
    );
    let _ = writeln!(
        out,
        "  Files:      {} ({}), {} unreadable",
        s.total_files,
        ByteSize::b(s.total_bytes),
        s.unreadable_files
    );
    let _ = writeln!(
        out,
        "  Duplicates: {} groups, {} files, {} reclaimable",
        s.duplicate_groups,
        s.duplicate_files,
        ByteSize::b(s.reclaimable_bytes).green()
    );

    let truncated = if s.similarity_truncated {
        format!(" {}", "(truncated)".yellow())
    } else {
        String::new()
    };
    let _ = writeln!(
        out,
        "  Similar:    {} pairs from {} comparisons{}",
        s.similar_pairs, s.comparisons, truncated
    );
    let _ = writeln!(
        out,
        "  Policy:     {} misplaced, {} suspicious",
        s.misplaced, s.suspicious
    );
    let _ = writeln!(
        out,
        "  Actions:    {} keep, {} remove, {} move",
        s.actions.keep, s.actions.remove, s.actions.r#move
    );
    if report.mode == Mode::Live {
        let _ = writeln!(
            out,
            "  Applied:    {} removed, {} moved, {} failed, {} skipped",
            ByteSize::b(s.bytes_removed),
            ByteSize::b(s.bytes_moved),
            s.actions.failed,
            s.actions.skipped
        );
    }
    if s.cache_hits > 0 {
        let _ = writeln!(out, "  Cache:      {} hits, {} misses", s.cache_hits, s.cache_misses);
    }
    if s.scan_errors > 0 {
        let _ = writeln!(out, "  {}", format!("{} scan errors", s.scan_errors).yellow());
    }

    let mutating: Vec<_> = report
        .actions
        .iter()
        .filter(|a| a.kind != ActionKind::Keep)
        .collect();
    if !mutating.is_empty() {
        let _ = writeln!(out);
        for action in mutating.iter().take(action_limit) {
            let kind = match action.kind {
                ActionKind::Remove => format!("{:<6}", action.kind).red().to_string(),
                _ => format!("{:<6}", action.kind).cyan().to_string(),
            };
            let marker = match &action.outcome {
                Outcome::Planned | Outcome::Applied => String::new(),
                Outcome::Failed { error } => format!(" [failed: {error}]"),
                Outcome::Skipped { reason } => format!(" [skipped: {reason}]"),
            };
            match &action.target {
                Some(target) => {
                    let _ = writeln!(
                        out,
                        "  {} {} -> {}{}",
                        kind,
                        action.source.display(),
                        target.display(),
                        marker
                    );
                }
                None => {
                    let _ = writeln!(
                        out,
                        "  {} {} ({}){}",
                        kind,
                        action.source.display(),
                        action.reason,
                        marker
                    );
                }
            }
        }
        if mutating.len() > action_limit {
            let _ = writeln!(out, "  ... and {} more", mutating.len() - action_limit);
        }
    }

    let status = match report.status {
        RunStatus::Success => report.status.to_string().green().to_string(),
        RunStatus::PartialFailure => report.status.to_string().yellow().to_string(),
        RunStatus::Failure => report.status.to_string().red().to_string(),
    };
    let interrupted = if report.interrupted { " (interrupted)" } else { "" };
    let _ = writeln!(
        out,
        "\nStatus: {}{} in {} ms",
        status, interrupted, s.duration_ms
    );
    out
}
