use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Catalog-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub poll: PollConfig,
    pub site: SiteConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub markers: MarkerConfig,
}

/// Crawl engine behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of concurrent workers, each holding at most one probe session
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Total attempts per node before it is marked failed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt (milliseconds), doubled per attempt
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Upper bound on the retry delay (milliseconds)
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Timeout handed to the probe for a single navigation (milliseconds)
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Budget for one whole attempt: navigate, classify, extract (milliseconds)
    #[serde(default = "default_node_timeout_ms")]
    pub node_timeout_ms: u64,

    /// Wait per layout marker while classifying a page (milliseconds)
    #[serde(default = "default_probe_wait_ms")]
    pub probe_wait_ms: u64,

    /// Deepest level that is still expanded; deeper nodes are kept as leaves
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Whether a strategy that matched but yielded nothing is retried
    #[serde(default = "default_true")]
    pub retry_empty_extraction: bool,

    /// Log a progress line after this many finished nodes
    #[serde(default = "default_progress_every")]
    pub progress_every: u32,
}

impl CrawlerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn node_timeout(&self) -> Duration {
        Duration::from_millis(self.node_timeout_ms)
    }

    pub fn probe_wait(&self) -> Duration {
        Duration::from_millis(self.probe_wait_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            node_timeout_ms: default_node_timeout_ms(),
            probe_wait_ms: default_probe_wait_ms(),
            max_depth: None,
            retry_empty_extraction: true,
            progress_every: default_progress_every(),
        }
    }
}

/// Stability poll configuration for incrementally loading filter lists
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PollConfig {
    /// Pause between two observations (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    /// Consecutive equal observations that count as "fully loaded"
    #[serde(default = "default_stable_reads")]
    pub stable_reads: u32,

    /// Hard cap on observations
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            stable_reads: default_stable_reads(),
            max_polls: default_max_polls(),
        }
    }
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Absolute base URL that category hrefs are resolved against
    pub base_url: String,

    /// User agent sent by the HTTP probe
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Top-level category names that are never enqueued (case-insensitive)
    #[serde(default)]
    pub excluded_roots: Vec<String>,

    /// Fixed root categories; when empty the root menu is probed instead
    #[serde(default, rename = "root")]
    pub roots: Vec<RootEntryConfig>,
}

/// A configured top-level category
#[derive(Debug, Clone, Deserialize)]
pub struct RootEntryConfig {
    pub name: String,
    pub url: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the markdown report
    pub report_path: String,

    /// Optional SQLite export of the report rows
    #[serde(default)]
    pub database_path: Option<String>,

    /// Drop the top-level branch name from every row path
    #[serde(default = "default_true")]
    pub exclude_root_from_path: bool,

    /// Never overwrite an existing report; append `_N` instead
    #[serde(default = "default_true")]
    pub unique_filenames: bool,
}

/// CSS markers for every page layout the classifier knows about
///
/// The defaults match the storefront markup the tool was first written for;
/// every field can be overridden from the `[markers]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MarkerConfig {
    /// Container of nested menu layout A
    pub menu_a_container: String,
    /// Entry of nested menu layout A
    pub menu_a_item: String,
    /// Link inside an entry of layout A
    pub menu_a_link: String,

    /// Container of nested menu layout B
    pub menu_b_container: String,
    /// Entry of nested menu layout B
    pub menu_b_item: String,
    /// Link inside an entry of layout B
    pub menu_b_link: String,
    /// Section header inside an entry of layout B (entry is skipped)
    pub menu_b_header: String,

    /// Dropdown that opens the flat category filter
    pub flat_filter_trigger: String,
    /// "Show all" control inside the flat filter
    pub flat_filter_show_all: String,
    /// One entry of the flat filter list
    pub flat_filter_item: String,
    /// Label inside a flat filter entry
    pub flat_filter_label: String,

    /// Burger-style filter button
    pub burger_trigger: String,
    /// One entry of the burger filter list
    pub burger_item: String,
    /// Link inside a burger filter entry
    pub burger_link: String,

    /// Button that opens the site's main menu
    pub root_menu_button: String,
    /// One entry of the main menu
    pub root_menu_item: String,
    /// Link inside a main menu entry
    pub root_menu_link: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            menu_a_container: "ul.menu-category__subcategory".to_string(),
            menu_a_item: "li.menu-category__subcategory-item".to_string(),
            menu_a_link: "a.menu-category__subcategory-link".to_string(),
            menu_b_container: "ul.menu-category__list".to_string(),
            menu_b_item: "li.menu-category__item".to_string(),
            menu_b_link: "a.menu-category__link".to_string(),
            menu_b_header: "p.menu-category__item".to_string(),
            flat_filter_trigger: "div.dropdown-filter--category".to_string(),
            flat_filter_show_all: "button.filter__show-all".to_string(),
            flat_filter_item: "li.filter__item".to_string(),
            flat_filter_label: "span.checkbox-with-text__text".to_string(),
            burger_trigger: "button.dropdown-filter__btn--burger".to_string(),
            burger_item: "ul.filter-category__list > li.filter-category__item".to_string(),
            burger_link: "a.filter-category__link".to_string(),
            root_menu_button: "button.nav-element__burger".to_string(),
            root_menu_item: "ul.menu-burger__main-list > li.menu-burger__main-list-item"
                .to_string(),
            root_menu_link: "a.menu-burger__main-list-link".to_string(),
        }
    }
}

impl MarkerConfig {
    /// Returns every marker with its config key, for validation
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("menu-a-container", &self.menu_a_container),
            ("menu-a-item", &self.menu_a_item),
            ("menu-a-link", &self.menu_a_link),
            ("menu-b-container", &self.menu_b_container),
            ("menu-b-item", &self.menu_b_item),
            ("menu-b-link", &self.menu_b_link),
            ("menu-b-header", &self.menu_b_header),
            ("flat-filter-trigger", &self.flat_filter_trigger),
            ("flat-filter-show-all", &self.flat_filter_show_all),
            ("flat-filter-item", &self.flat_filter_item),
            ("flat-filter-label", &self.flat_filter_label),
            ("burger-trigger", &self.burger_trigger),
            ("burger-item", &self.burger_item),
            ("burger-link", &self.burger_link),
            ("root-menu-button", &self.root_menu_button),
            ("root-menu-item", &self.root_menu_item),
            ("root-menu-link", &self.root_menu_link),
        ]
    }
}

fn default_workers() -> u32 {
    3
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    5_000
}

fn default_navigation_timeout_ms() -> u64 {
    120_000
}

fn default_node_timeout_ms() -> u64 {
    180_000
}

fn default_probe_wait_ms() -> u64 {
    300
}

fn default_progress_every() -> u32 {
    25
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_stable_reads() -> u32 {
    2
}

fn default_max_polls() -> u32 {
    50
}

fn default_user_agent() -> String {
    format!("catalog-ripple/{}", env!("CARGO_PKG_VERSION"))
}

fn default_true() -> bool {
    true
}
