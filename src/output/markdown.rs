//! Markdown summary generation
//!
//! This module renders a human-readable markdown summary of one run: counts,
//! failures with their errors, and groups of targets that share icon bytes.

use crate::output::{OutputResult, RunReport};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Failures listed in full before the table is truncated
const MAX_LISTED_FAILURES: usize = 200;

/// Writes the markdown summary of `report` to `output_path`
pub fn generate_markdown_summary(report: &RunReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(report);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run report as markdown
pub fn format_markdown_summary(report: &RunReport) -> String {
    let mut md = String::new();

    md.push_str("# Favicon Harvest Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", report.run.id));
    md.push_str(&format!("- **Started**: {}\n", report.run.started_at));
    if let Some(finished) = &report.run.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    md.push_str(&format!("- **Status**: {}\n", report.run.status.to_db_string()));
    md.push_str(&format!("- **Config Hash**: {}\n\n", report.run.config_hash));

    md.push_str("## Results\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Succeeded | {} |\n", report.succeeded));
    md.push_str(&format!("| Failed | {} |\n", report.failed));
    md.push_str(&format!("| Total | {} |\n\n", report.total()));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        report.success_rate()
    ));

    if !report.failures.is_empty() {
        md.push_str("## Failures\n\n");
        md.push_str("| Target | URL | Error |\n");
        md.push_str("|--------|-----|-------|\n");

        for failure in report.failures.iter().take(MAX_LISTED_FAILURES) {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                escape_cell(&failure.target_id),
                escape_cell(&failure.url),
                escape_cell(failure.error.as_deref().unwrap_or("-"))
            ));
        }
        if report.failures.len() > MAX_LISTED_FAILURES {
            md.push_str(&format!(
                "\n... and {} more\n",
                report.failures.len() - MAX_LISTED_FAILURES
            ));
        }
        md.push('\n');
    }

    if !report.duplicate_groups.is_empty() {
        md.push_str("## Duplicate Icons\n\n");
        md.push_str("Targets whose downloaded icons are byte-identical:\n\n");
        for (hash, targets) in &report.duplicate_groups {
            let short = hash.get(..12).unwrap_or(hash);
            md.push_str(&format!("- `{}`: {}\n", short, targets.join(", ")));
        }
        md.push('\n');
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
