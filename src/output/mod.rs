//! Output module for exporting the discovered category tree
//!
//! This module handles:
//! - Flattening the tree into leveled, path-annotated rows per top-level branch
//! - Writing a markdown report
//! - Recording runs and rows in SQLite
//! - Choosing non-clobbering output file names

mod export;
mod markdown;
mod paths;
mod sqlite_output;
mod traits;

pub use export::{
    export_sections, sanitize_section_name, ExportRow, ExportSection, RowKind,
    NO_CHILDREN_LABEL, PATH_SEPARATOR, SECTION_NAME_MAX,
};
pub use markdown::{format_markdown_report, MarkdownReport};
pub use paths::unique_output_path;
pub use sqlite_output::{initialize_schema, insert_report, SqliteReport};
pub use traits::{OutputError, OutputResult, ReportWriter, RunSummary};

use crate::config::OutputConfig;
use crate::crawler::CrawlReport;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Exports a finished crawl to every configured sink
///
/// # Arguments
///
/// * `report` - The drained crawl
/// * `output` - Output settings
/// * `config_hash` - Hash of the configuration file, recorded with the run
/// * `started_at` - Wall-clock start of the run
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - Files written, markdown first
/// * `Err(OutputError)` - A sink failed
pub fn write_reports(
    report: &CrawlReport,
    output: &OutputConfig,
    config_hash: &str,
    started_at: DateTime<Utc>,
) -> OutputResult<Vec<PathBuf>> {
    let summary = RunSummary::from_report(report, config_hash, started_at);
    let sections = export_sections(&report.roots, output.exclude_root_from_path);

    let mut written = Vec::new();

    let markdown_path = if output.unique_filenames {
        unique_output_path(Path::new(&output.report_path))
    } else {
        PathBuf::from(&output.report_path)
    };
    written.push(MarkdownReport::new(markdown_path).write(&summary, &sections)?);

    if let Some(database_path) = &output.database_path {
        written.push(SqliteReport::new(database_path).write(&summary, &sections)?);
    }

    let rows: usize = sections.iter().map(|s| s.rows.len()).sum();
    tracing::info!(
        "Exported {} rows in {} sections to {}",
        rows,
        sections.len(),
        written
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(written)
}
