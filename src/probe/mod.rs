//! Page probe boundary
//!
//! The crawl engine never talks to a browser directly. It opens probe
//! sessions through a [`ProbeFactory`] and drives them through the
//! [`PageProbe`] trait: navigate, query by marker, read text and attributes,
//! and hover/click to reveal lazily loaded content.
//!
//! Two drivers ship with the crate:
//! - [`HttpProbe`]: fetches pages with `reqwest` and queries the static DOM
//! - [`MemorySite`]: an in-memory page graph for tests and offline replays

mod html;
mod http;
mod memory;

pub use html::HtmlPage;
pub use http::{build_http_client, HttpProbe, HttpProbeFactory};
pub use memory::{MemoryEntry, MemoryPage, MemorySite, MemorySiteBuilder, PageLayout, SiteStats};

use crate::ProbeResult;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// A structural marker, expressed as a CSS selector
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Marker(String);

impl Marker {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Marker {
    fn from(selector: &str) -> Self {
        Self::new(selector)
    }
}

impl From<&String> for Marker {
    fn from(selector: &String) -> Self {
        Self::new(selector.as_str())
    }
}

/// Opaque reference to an element of the currently loaded page
///
/// Handles are invalidated by the next navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub usize);

/// One open page session (a browser tab)
#[async_trait]
pub trait PageProbe: Send {
    /// Loads `url`, relative to the site base
    async fn navigate(&mut self, url: &str, timeout: Duration) -> ProbeResult<()>;

    /// Returns every element matching `marker`, in document order
    async fn find_all(&mut self, marker: &Marker, timeout: Duration)
        -> ProbeResult<Vec<ElementHandle>>;

    /// Returns the elements matching `marker` inside `scope`, in document order
    async fn find_in(
        &mut self,
        scope: ElementHandle,
        marker: &Marker,
    ) -> ProbeResult<Vec<ElementHandle>>;

    async fn attribute(&mut self, element: ElementHandle, name: &str)
        -> ProbeResult<Option<String>>;

    async fn text(&mut self, element: ElementHandle) -> ProbeResult<String>;

    async fn hover(&mut self, element: ElementHandle) -> ProbeResult<()>;

    async fn click(&mut self, element: ElementHandle) -> ProbeResult<()>;

    /// Waits up to `timeout` for `marker` to be present and visible
    async fn wait_visible(&mut self, marker: &Marker, timeout: Duration) -> ProbeResult<bool>;

    /// Releases the session
    async fn close(&mut self) -> ProbeResult<()>;
}

/// Opens probe sessions; each open session is one unit of browser resource
#[async_trait]
pub trait ProbeFactory: Send + Sync {
    async fn open(&self) -> ProbeResult<Box<dyn PageProbe>>;
}
