//! In-memory page graph
//!
//! [`MemorySite`] serves synthetic catalog pages rendered with the default
//! marker set. Pages can be slow, fail a number of times before succeeding,
//! or reveal their entries in batches on hover/click, which is enough to
//! drive the crawl engine through every branch without a browser.
//!
//! The site also records per-URL navigation counts and the number of open
//! sessions so callers can check visit-once and concurrency properties.

use crate::probe::{ElementHandle, HtmlPage, Marker, PageProbe, ProbeFactory};
use crate::{ProbeError, ProbeResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One entry of a menu-style listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryEntry {
    /// A navigable category link
    Link { name: String, url: String },

    /// A section heading interleaved with links
    Header(String),

    /// A link element without an href
    Unlinked(String),
}

impl MemoryEntry {
    pub fn link(name: &str, url: &str) -> Self {
        Self::Link {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// Layout a synthetic page is rendered with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLayout {
    /// Nested subcategory menu
    MenuA(Vec<MemoryEntry>),

    /// Nested category list with section headers
    MenuB(Vec<MemoryEntry>),

    /// Category filter dropdown of plain labels
    ///
    /// `batch` labels are shown at first and each hover/click reveals
    /// `batch` more; 0 shows everything at once.
    FlatFilter { labels: Vec<String>, batch: usize },

    /// Burger-style filter list of links, revealed like `FlatFilter`
    Burger {
        entries: Vec<MemoryEntry>,
        batch: usize,
    },

    /// No known structure
    Blank,
}

/// A page plus its scripted behavior
#[derive(Debug, Clone)]
pub struct MemoryPage {
    pub layout: PageLayout,
    /// Load time of every navigation
    pub delay: Duration,
    /// Number of initial navigations that fail with a driver error
    pub fail_first: u32,
    /// Number of initial navigations rendered with an empty container
    pub empty_first: u32,
}

impl MemoryPage {
    pub fn new(layout: PageLayout) -> Self {
        Self {
            layout,
            delay: Duration::ZERO,
            fail_first: 0,
            empty_first: 0,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_first(mut self, attempts: u32) -> Self {
        self.fail_first = attempts;
        self
    }

    /// Makes every navigation exceed its timeout
    pub fn timing_out(mut self) -> Self {
        self.delay = Duration::MAX;
        self
    }

    pub fn empty_first(mut self, attempts: u32) -> Self {
        self.empty_first = attempts;
        self
    }
}

/// Counters collected while the site is being crawled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteStats {
    /// Navigations per requested URL
    pub navigations: HashMap<String, u32>,
    pub sessions_opened: usize,
    pub open_sessions: usize,
    pub peak_sessions: usize,
}

impl SiteStats {
    pub fn navigations_to(&self, url: &str) -> u32 {
        self.navigations.get(url).copied().unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct SiteInner {
    pages: HashMap<String, MemoryPage>,
    root_menu: Vec<MemoryEntry>,
    stats: Mutex<SiteStats>,
}

/// A synthetic catalog served from memory
#[derive(Debug, Clone, Default)]
pub struct MemorySite {
    inner: Arc<SiteInner>,
}

/// Builder for [`MemorySite`]
#[derive(Debug, Default)]
pub struct MemorySiteBuilder {
    pages: HashMap<String, MemoryPage>,
    root_menu: Vec<MemoryEntry>,
}

impl MemorySiteBuilder {
    /// Adds the burger menu served at `/`
    pub fn root_menu(mut self, entries: Vec<MemoryEntry>) -> Self {
        self.root_menu = entries;
        self
    }

    pub fn page(mut self, url: &str, page: MemoryPage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn layout(self, url: &str, layout: PageLayout) -> Self {
        self.page(url, MemoryPage::new(layout))
    }

    pub fn build(self) -> MemorySite {
        MemorySite {
            inner: Arc::new(SiteInner {
                pages: self.pages,
                root_menu: self.root_menu,
                stats: Mutex::new(SiteStats::default()),
            }),
        }
    }
}

impl MemorySite {
    pub fn builder() -> MemorySiteBuilder {
        MemorySiteBuilder::default()
    }

    /// Returns a copy of the counters collected so far
    pub fn stats(&self) -> SiteStats {
        self.lock_stats().clone()
    }

    fn lock_stats(&self) -> MutexGuard<'_, SiteStats> {
        self.inner
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a navigation and returns how many times `url` was requested
    fn count_navigation(&self, url: &str) -> u32 {
        let mut stats = self.lock_stats();
        let count = stats.navigations.entry(url.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn session_opened(&self) {
        let mut stats = self.lock_stats();
        stats.sessions_opened += 1;
        stats.open_sessions += 1;
        stats.peak_sessions = stats.peak_sessions.max(stats.open_sessions);
    }

    fn session_closed(&self) {
        let mut stats = self.lock_stats();
        stats.open_sessions = stats.open_sessions.saturating_sub(1);
    }
}

#[async_trait]
impl ProbeFactory for MemorySite {
    async fn open(&self) -> ProbeResult<Box<dyn PageProbe>> {
        self.session_opened();
        Ok(Box::new(MemoryProbe {
            site: self.clone(),
            current: None,
            closed: false,
        }))
    }
}

/// The page currently loaded in a session
struct LoadedPage {
    layout: PageLayout,
    empty: bool,
    revealed: usize,
    html: HtmlPage,
}

impl LoadedPage {
    fn new(layout: PageLayout, empty: bool) -> Self {
        let revealed = match &layout {
            PageLayout::FlatFilter { batch, .. } | PageLayout::Burger { batch, .. } => *batch,
            _ => 0,
        };
        let mut page = Self {
            layout,
            empty,
            revealed,
            html: HtmlPage::default(),
        };
        page.html = HtmlPage::new(page.render());
        page
    }

    /// Reveals the next batch of a lazily loaded list
    fn reveal_more(&mut self) {
        let batch = match &self.layout {
            PageLayout::FlatFilter { batch, .. } | PageLayout::Burger { batch, .. } => *batch,
            _ => return,
        };
        if batch == 0 {
            return;
        }
        self.revealed += batch;
        let markup = self.render();
        self.html.update_markup(markup);
    }

    fn visible<'a, T>(&self, items: &'a [T], batch: usize) -> &'a [T] {
        if self.empty {
            return &[];
        }
        if batch == 0 {
            return items;
        }
        &items[..self.revealed.min(items.len())]
    }

    fn render(&self) -> String {
        let mut body = String::new();
        match &self.layout {
            PageLayout::MenuA(entries) => {
                body.push_str("<ul class=\"menu-category__subcategory\">");
                for entry in self.visible(entries, 0) {
                    render_entry(
                        &mut body,
                        entry,
                        "menu-category__subcategory-item",
                        "menu-category__subcategory-link",
                    );
                }
                body.push_str("</ul>");
            }
            PageLayout::MenuB(entries) => {
                body.push_str("<ul class=\"menu-category__list\">");
                for entry in self.visible(entries, 0) {
                    render_entry(
                        &mut body,
                        entry,
                        "menu-category__item",
                        "menu-category__link",
                    );
                }
                body.push_str("</ul>");
            }
            PageLayout::FlatFilter { labels, batch } => {
                body.push_str("<div class=\"dropdown-filter dropdown-filter--category\">");
                body.push_str("<button class=\"filter__show-all\">Show all</button><ul>");
                for label in self.visible(labels, *batch) {
                    let _ = write!(
                        body,
                        "<li class=\"filter__item\"><label><span class=\"checkbox-with-text__text\">{}</span></label></li>",
                        escape(label)
                    );
                }
                body.push_str("</ul></div>");
            }
            PageLayout::Burger { entries, batch } => {
                body.push_str(
                    "<button class=\"dropdown-filter__btn dropdown-filter__btn--burger\">Categories</button>",
                );
                body.push_str("<ul class=\"filter-category__list\">");
                for entry in self.visible(entries, *batch) {
                    render_entry(
                        &mut body,
                        entry,
                        "filter-category__item",
                        "filter-category__link",
                    );
                }
                body.push_str("</ul>");
            }
            PageLayout::Blank => body.push_str("<p>Nothing to see here</p>"),
        }
        format!("<html><body><main>{}</main></body></html>", body)
    }
}

fn render_root_menu(entries: &[MemoryEntry]) -> String {
    let mut body = String::from(
        "<button class=\"nav-element__burger\">Menu</button><ul class=\"menu-burger__main-list\">",
    );
    for entry in entries {
        render_entry(
            &mut body,
            entry,
            "menu-burger__main-list-item",
            "menu-burger__main-list-link",
        );
    }
    body.push_str("</ul>");
    format!("<html><body><nav>{}</nav></body></html>", body)
}

fn render_entry(out: &mut String, entry: &MemoryEntry, item_class: &str, link_class: &str) {
    let _ = match entry {
        MemoryEntry::Link { name, url } => write!(
            out,
            "<li class=\"{}\"><a class=\"{}\" href=\"{}\">{}</a></li>",
            item_class,
            link_class,
            escape(url),
            escape(name)
        ),
        MemoryEntry::Unlinked(name) => write!(
            out,
            "<li class=\"{}\"><a class=\"{}\">{}</a></li>",
            item_class,
            link_class,
            escape(name)
        ),
        MemoryEntry::Header(name) => write!(
            out,
            "<li class=\"{}\"><p class=\"{}\">{}</p></li>",
            item_class,
            item_class,
            escape(name)
        ),
    };
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// One session on a [`MemorySite`]
struct MemoryProbe {
    site: MemorySite,
    current: Option<LoadedPage>,
    closed: bool,
}

impl MemoryProbe {
    fn loaded(&mut self) -> ProbeResult<&mut LoadedPage> {
        self.current.as_mut().ok_or(ProbeError::NotNavigated)
    }
}

impl Drop for MemoryProbe {
    fn drop(&mut self) {
        if !self.closed {
            self.site.session_closed();
        }
    }
}

#[async_trait]
impl PageProbe for MemoryProbe {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> ProbeResult<()> {
        self.current = None;
        let visit = self.site.count_navigation(url);

        if url == "/" {
            let markup = render_root_menu(&self.site.inner.root_menu);
            self.current = Some(LoadedPage {
                layout: PageLayout::Blank,
                empty: false,
                revealed: 0,
                html: HtmlPage::new(markup),
            });
            return Ok(());
        }

        let Some(page) = self.site.inner.pages.get(url).cloned() else {
            return Err(ProbeError::Navigation {
                url: url.to_string(),
                message: "HTTP 404".to_string(),
            });
        };

        if page.delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(ProbeError::NavigationTimeout {
                url: url.to_string(),
            });
        }
        if !page.delay.is_zero() {
            tokio::time::sleep(page.delay).await;
        }

        if visit <= page.fail_first {
            return Err(ProbeError::Driver(format!(
                "scripted failure {} of {} for {}",
                visit, page.fail_first, url
            )));
        }

        let empty = visit <= page.fail_first + page.empty_first;
        self.current = Some(LoadedPage::new(page.layout, empty));
        Ok(())
    }

    async fn find_all(
        &mut self,
        marker: &Marker,
        _timeout: Duration,
    ) -> ProbeResult<Vec<ElementHandle>> {
        self.loaded()?.html.select(marker)
    }

    async fn find_in(
        &mut self,
        scope: ElementHandle,
        marker: &Marker,
    ) -> ProbeResult<Vec<ElementHandle>> {
        self.loaded()?.html.select_in(scope, marker)
    }

    async fn attribute(
        &mut self,
        element: ElementHandle,
        name: &str,
    ) -> ProbeResult<Option<String>> {
        self.loaded()?.html.attribute(element, name)
    }

    async fn text(&mut self, element: ElementHandle) -> ProbeResult<String> {
        self.loaded()?.html.text(element)
    }

    async fn hover(&mut self, element: ElementHandle) -> ProbeResult<()> {
        let page = self.loaded()?;
        page.html.check(element)?;
        page.reveal_more();
        Ok(())
    }

    async fn click(&mut self, element: ElementHandle) -> ProbeResult<()> {
        let page = self.loaded()?;
        page.html.check(element)?;
        page.reveal_more();
        Ok(())
    }

    async fn wait_visible(&mut self, marker: &Marker, _timeout: Duration) -> ProbeResult<bool> {
        self.loaded()?.html.has_visible(marker)
    }

    async fn close(&mut self) -> ProbeResult<()> {
        if !self.closed {
            self.closed = true;
            self.current = None;
            self.site.session_closed();
        }
        Ok(())
    }
}
