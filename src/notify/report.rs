//! Human-readable run reports.

use chrono::SecondsFormat;

use crate::domain::{OverallStatus, RunSummary, TargetOutcome, TargetStatus};

const RULE_WIDTH: usize = 50;

/// One-line subject for a run.
pub fn render_subject(summary: &RunSummary) -> String {
    let status = match summary.overall_status {
        OverallStatus::AllSuccess => "all succeeded",
        OverallStatus::PartialFailure => "partial failure",
        OverallStatus::AllFailed => "all failed",
    };
    format!("Profile refresh: {}", status)
}

/// Plain-text body listing every target.
pub fn render_text(summary: &RunSummary) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    out.push_str(&format!("PROFILE REFRESH SUMMARY ({})\n{}\n", summary.overall_status, rule));
    out.push_str(&format!("Run: {}\n", summary.run_id));
    out.push_str(&format!(
        "Start: {}\n",
        summary.start_time.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    out.push_str(&format!(
        "End: {}\n",
        summary.end_time.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    out.push_str(&format!(
        "Total duration: {:.2}s\n",
        summary.total_duration_ms() as f64 / 1000.0
    ));
    out.push_str(&format!(
        "Succeeded: {}  Skipped: {}  Failed: {}\n\n",
        summary.count(TargetStatus::Success),
        summary.count(TargetStatus::Skipped),
        summary.count(TargetStatus::Failed)
    ));

    out.push_str("TARGETS:\n");
    for outcome in &summary.outcomes {
        out.push_str(&render_outcome(outcome));
    }

    out.push_str(&format!("{}\nThis is an automated notification.\n", rule));
    out
}

fn render_outcome(outcome: &TargetOutcome) -> String {
    let mut line = format!(
        "- {}: {} ({}ms, {} attempts)\n",
        outcome.target_id, outcome.status, outcome.duration_ms, outcome.attempts
    );
    match (&outcome.error_kind, &outcome.error_message) {
        (Some(kind), Some(message)) => line.push_str(&format!("    {}: {}\n", kind, message)),
        (Some(kind), None) => line.push_str(&format!("    {}\n", kind)),
        (None, Some(message)) => line.push_str(&format!("    {}\n", message)),
        (None, None) => {}
    }
    line
}
