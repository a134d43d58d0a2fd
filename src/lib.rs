//! Catalog-Ripple: a concurrent category-tree cartographer
//!
//! This crate drives a page probe (a headless browser tab or a static HTML
//! fetcher) across an e-commerce catalog, classifying each category page by
//! layout, extracting its children, and assembling the discovered hierarchy
//! into an ordered tree that can be exported as a leveled report.

pub mod config;
pub mod crawler;
pub mod output;
pub mod probe;
pub mod tree;
pub mod url;

use thiserror::Error;

/// Main error type for Catalog-Ripple operations
#[derive(Debug, Error)]
pub enum RippleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("Root listing is empty after applying exclusions")]
    EmptyRootListing,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised by a page probe session
///
/// Every variant is treated as retryable by the crawl engine; the distinction
/// only matters for logging and for mapping timeouts onto
/// [`NodeError::NavigationTimeout`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Navigation to {url} timed out")]
    NavigationTimeout { url: String },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Invalid marker '{0}'")]
    InvalidMarker(String),

    #[error("Element handle {0} is stale")]
    StaleElement(usize),

    #[error("No page loaded")]
    NotNavigated,

    #[error("Driver error: {0}")]
    Driver(String),
}

/// Per-node failure taxonomy
///
/// `NavigationTimeout`, `ClassificationInconclusive`, `ExtractionEmpty` and
/// `Extraction` are retryable. `CycleDetected` is resolved locally and
/// `PermanentNodeFailure` is terminal; neither ever reaches the scheduler as
/// an error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NodeError {
    #[error("navigation timed out: {0}")]
    NavigationTimeout(String),

    #[error("classification inconclusive: {0}")]
    ClassificationInconclusive(String),

    #[error("strategy {0} matched but yielded no usable entries")]
    ExtractionEmpty(crate::crawler::StrategyKind),

    #[error("url {0} repeats an ancestor")]
    CycleDetected(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("gave up after {attempts} attempts: {cause}")]
    PermanentNodeFailure {
        attempts: u32,
        cause: Box<NodeError>,
    },
}

impl NodeError {
    /// Returns true if another attempt may produce a different outcome
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NavigationTimeout(_)
                | Self::ClassificationInconclusive(_)
                | Self::ExtractionEmpty(_)
                | Self::Extraction(_)
        )
    }
}

impl From<ProbeError> for NodeError {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::NavigationTimeout { url } => Self::NavigationTimeout(url),
            other => Self::Extraction(other.to_string()),
        }
    }
}

/// Result type alias for Catalog-Ripple operations
pub type Result<T> = std::result::Result<T, RippleError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for probe operations
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Result type alias for a single node attempt
pub type NodeResult<T> = std::result::Result<T, NodeError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, CrawlReport, StrategyKind};
pub use tree::{CategoryNode, NodeStatus};
