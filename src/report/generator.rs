//! Build report generation.
//!
//! This module renders the round sequence of a build as Markdown or JSON.

use crate::models::{BuildReport, ReportMetadata, RoundSummary, Signal};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &BuildReport) -> String {
    let mut output = String::new();

    output.push_str("# modindex Build Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata, report));
    output.push_str(&generate_rounds_section(&report.rounds));
    output.push_str(&generate_artifacts_section(report));

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata, report: &BuildReport) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Source Directory:** `{}`\n",
        metadata.source_dir.display()
    ));
    section.push_str(&format!(
        "- **Output Directory:** `{}`\n",
        metadata.output_dir.display()
    ));
    section.push_str(&format!(
        "- **Build Date:** {}\n",
        metadata.build_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Rounds:** {}\n", report.rounds.len()));
    section.push_str(&format!(
        "- **Artifacts Written:** {}\n",
        report.artifacts().len()
    ));
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the per-round table.
fn generate_rounds_section(rounds: &[RoundSummary]) -> String {
    let mut section = String::new();

    section.push_str("## Rounds\n\n");
    section.push_str("| Round | Marked Units | Signal | Artifacts |\n");
    section.push_str("|:---:|:---|:---:|:---|\n");

    for round in rounds {
        let units = if round.marked_units.is_empty() {
            "-".to_string()
        } else {
            round
                .marked_units
                .iter()
                .map(|u| format!("`{}`", u))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let artifacts = if round.artifacts.is_empty() {
            "-".to_string()
        } else {
            round
                .artifacts
                .iter()
                .map(|a| format!("`{}`", file_name(a)))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let signal = match round.signal {
            Signal::Continue => "Continue",
            Signal::Done => "Done",
        };

        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            round.round, units, signal, artifacts
        ));
    }
    section.push('\n');

    section
}

/// Generate the artifact list.
fn generate_artifacts_section(report: &BuildReport) -> String {
    let mut section = String::new();

    section.push_str("## Generated Artifacts\n\n");

    let artifacts = report.artifacts();
    if artifacts.is_empty() {
        section.push_str("No artifacts were generated.\n\n");
        return section;
    }

    for path in artifacts {
        section.push_str(&format!("- `{}`\n", path.display()));
    }
    section.push('\n');

    section
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Generate a JSON report.
pub fn generate_json_report(report: &BuildReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
