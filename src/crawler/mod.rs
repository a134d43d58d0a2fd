//! Crawl engine
//!
//! This module contains the recursive category discovery logic, including:
//! - Root listing and exclusions
//! - Page layout classification and per-layout extraction
//! - Stability polling for lazily loaded lists
//! - Retry with capped backoff
//! - The work queue and bounded worker pool

mod classifier;
mod expander;
mod poll;
mod retry;
mod roots;
mod scheduler;

pub use classifier::{classify, classify_page, observe_layout, LayoutMarkers, LayoutObservation};
pub use expander::{Expansion, NodeExpander};
pub use poll::{settle, PollStep, StabilityPoll, StabilityTracker};
pub use retry::{Attempted, RetryPolicy};
pub use roots::{apply_exclusions, resolve_roots, MenuRoots, RootEntry, RootListing, StaticRoots};
pub use scheduler::{
    ActivityGauge, ActivityGuard, NodeEvent, Scheduler, SchedulerSettings, WorkQueue,
};

use crate::config::Config;
use crate::probe::ProbeFactory;
use crate::tree::{CategoryNode, StatusCounts};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Extraction strategy matched to a page layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Nested subcategory menu
    NestedMenuA,

    /// Nested category list with section headers
    NestedMenuB,

    /// Category filter dropdown of non-navigable labels
    FlatFilterCategory,

    /// Burger filter list whose entries are further categories
    FilterBurgerList,

    /// No known layout
    None,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NestedMenuA => "nested_menu_a",
            Self::NestedMenuB => "nested_menu_b",
            Self::FlatFilterCategory => "flat_filter_category",
            Self::FilterBurgerList => "filter_burger_list",
            Self::None => "none",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a drained crawl run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Top-level categories in listing order, with everything below them
    pub roots: Vec<CategoryNode>,

    pub counts: StatusCounts,

    /// Highest number of probe sessions open at the same time
    pub peak_active: usize,

    pub elapsed: Duration,
}

impl CrawlReport {
    /// Every node of the tree, parents before children
    pub fn nodes(&self) -> Vec<&CategoryNode> {
        let mut nodes = Vec::new();
        for root in &self.roots {
            root.walk(&mut |node| nodes.push(node));
        }
        nodes
    }

    /// Finds a node by its full name path, root name first
    pub fn find(&self, path: &[&str]) -> Option<&CategoryNode> {
        let (root, rest) = path.split_first()?;
        self.roots
            .iter()
            .find(|node| node.name == *root)
            .and_then(|node| node.find(rest))
    }
}

/// Runs a complete crawl
///
/// This is the main entry point for starting a crawl. It will:
/// 1. List the root categories and drop excluded ones
/// 2. Expand every root and every discovered child on `config.crawler.workers` sessions
/// 3. Return the assembled tree once the queue has drained
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `factory` - Opens probe sessions
/// * `listing` - Source of the root categories
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The run completed; failed nodes are marked in the tree
/// * `Err(RippleError)` - No roots were left to crawl, or a worker panicked
pub async fn crawl(
    config: &Config,
    factory: Arc<dyn ProbeFactory>,
    listing: &dyn RootListing,
) -> crate::Result<CrawlReport> {
    let roots = resolve_roots(listing, &config.site.excluded_roots).await?;
    let settings = SchedulerSettings::from_config(config)?;
    Scheduler::new(settings, factory).run(roots).await
}
