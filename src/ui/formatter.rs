//! Formatting functions for UI output.
//!
//! `format_*` functions build the text and are pure; `display_*` functions
//! print it. Styling goes through `console`, which drops colors when the
//! output is not a terminal.

use console::style;

use crate::deploy::{DeployReport, RetentionPlan};
use crate::domain::Retention;
use crate::warning::DeployWarning;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a non-fatal deployment warning.
pub fn display_warning(warning: &DeployWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// Summary of a finished deployment.
///
/// One line for the upload, one per pruned version, and the site entry point.
pub fn format_deploy_report(report: &DeployReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Deployed {} ({} files) to bucket '{}'",
        report.version,
        report.uploaded.len(),
        report.bucket
    )];

    for outcome in report.removed.iter().filter(|o| !o.was_empty()) {
        lines.push(format!(
            "Removed version {} ({} objects)",
            outcome.tag, outcome.removed
        ));
    }

    lines.push(format!("Site entry point: {}/index.html", report.version));
    lines
}

/// Print the deployment summary and its warnings.
pub fn display_deploy_report(report: &DeployReport) {
    for warning in &report.warnings {
        display_warning(warning);
    }
    for line in format_deploy_report(report) {
        display_success(&line);
    }
}

fn retention_label(retention: Retention) -> String {
    match retention {
        Retention::Remove => style(retention).red().to_string(),
        Retention::Current => style(retention).green().to_string(),
        _ => retention.to_string(),
    }
}

/// One line per tagged version: tag, short hash, commit date, decision.
pub fn format_retention_plan(plan: &RetentionPlan) -> Vec<String> {
    plan.entries
        .iter()
        .map(|(record, retention)| {
            let short_hash: String = record.hash.chars().take(7).collect();
            format!(
                "{:<16} {:<8} {}  {}",
                record.tag,
                short_hash,
                record.timestamp.format("%Y-%m-%d %H:%M"),
                retention_label(*retention)
            )
        })
        .collect()
}

/// Display the tagged versions and what a pruning pass would do with them.
pub fn display_retention_plan(plan: &RetentionPlan) {
    if plan.is_empty() {
        display_status("No tagged versions found");
        return;
    }

    println!(
        "{}",
        style(format!("Tagged versions (deploying {}):", plan.current_version)).bold()
    );
    for line in format_retention_plan(plan) {
        println!("  {}", line);
    }

    let removable = plan.removable().count();
    if removable == 0 {
        display_status("Nothing to remove");
    } else {
        display_status(&format!("{} version(s) would be removed", removable));
    }
}
