//! Markdown report generation
//!
//! One `##` section per top-level branch, each holding a table of its rows,
//! preceded by the run information.

use crate::output::export::{ExportSection, RowKind};
use crate::output::traits::{OutputResult, ReportWriter, RunSummary};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes the report as a markdown file
#[derive(Debug, Clone)]
pub struct MarkdownReport {
    path: PathBuf,
}

impl MarkdownReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportWriter for MarkdownReport {
    fn write(&self, summary: &RunSummary, sections: &[ExportSection]) -> OutputResult<PathBuf> {
        let markdown = format_markdown_report(summary, sections);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = File::create(&self.path)?;
        file.write_all(markdown.as_bytes())?;

        Ok(self.path.clone())
    }
}

/// Formats the report as markdown
pub fn format_markdown_report(summary: &RunSummary, sections: &[ExportSection]) -> String {
    let mut md = String::new();

    md.push_str("# Catalog-Ripple Category Report\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!(
        "- **Started**: {}\n",
        summary.started_at.to_rfc3339()
    ));
    md.push_str(&format!(
        "- **Finished**: {}\n",
        summary.finished_at.to_rfc3339()
    ));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        summary.elapsed.as_secs_f64()
    ));
    md.push_str(&format!("- **Config Hash**: {}\n", summary.config_hash));
    md.push_str(&format!("- **Top-level Categories**: {}\n", summary.roots));
    md.push_str(&format!(
        "- **Peak Open Sessions**: {}\n\n",
        summary.peak_active
    ));

    md.push_str("| Status | Nodes |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Expanded | {} |\n", summary.counts.expanded));
    md.push_str(&format!("| No children | {} |\n", summary.counts.no_children));
    md.push_str(&format!("| Failed | {} |\n", summary.counts.failed));
    md.push_str(&format!(
        "| **Success Rate** | {:.2}% |\n\n",
        summary.success_rate()
    ));

    for section in sections {
        md.push_str(&format!("## {}\n\n", escape_cell(&section.name)));
        md.push_str("| Category | Level | Path |\n");
        md.push_str("|----------|-------|------|\n");

        for row in &section.rows {
            let label = match row.kind {
                RowKind::Failed => format!(
                    "FAILED: {} ({})",
                    row.label,
                    row.detail.as_deref().unwrap_or("unknown error")
                ),
                RowKind::NoChildren => format!("_{}_", row.label),
                _ => row.label.clone(),
            };
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                escape_cell(&label),
                row.level,
                escape_cell(&row.path)
            ));
        }
        md.push('\n');
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
