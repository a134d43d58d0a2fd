//! Report writer trait and run summary
//!
//! This module defines the trait interface for report writers and the run
//! metadata every writer receives alongside the exported sections.

use crate::crawler::CrawlReport;
use crate::output::export::ExportSection;
use crate::tree::StatusCounts;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Run metadata written next to the rows
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config_hash: String,
    pub roots: usize,
    pub counts: StatusCounts,
    pub peak_active: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Builds the summary of a finished run
    ///
    /// # Arguments
    ///
    /// * `report` - The drained crawl
    /// * `config_hash` - Hash of the configuration file the run used
    /// * `started_at` - Wall-clock start of the run
    pub fn from_report(report: &CrawlReport, config_hash: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            config_hash: config_hash.to_string(),
            roots: report.roots.len(),
            counts: report.counts,
            peak_active: report.peak_active,
            elapsed: report.elapsed,
        }
    }

    /// Share of attempted nodes that did not fail, as a percentage
    pub fn success_rate(&self) -> f64 {
        let terminal = self.counts.expanded + self.counts.no_children + self.counts.failed;
        if terminal == 0 {
            return 0.0;
        }
        ((terminal - self.counts.failed) as f64 / terminal as f64) * 100.0
    }
}

/// Trait for report writers
///
/// A writer receives the whole export at once, after the crawl has drained.
pub trait ReportWriter {
    /// Writes the report
    ///
    /// # Returns
    ///
    /// The location the report was written to
    fn write(&self, summary: &RunSummary, sections: &[ExportSection]) -> OutputResult<PathBuf>;
}
