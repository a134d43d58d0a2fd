//! Static DOM query engine shared by the HTTP and in-memory probes
//!
//! `scraper::Html` is not `Send`, so the page keeps its markup as text and
//! re-parses it per query. Every matched element is snapshotted (outer HTML,
//! text, attributes) and addressed by an [`ElementHandle`] index, which keeps
//! handles valid across async calls until the page is replaced.

use crate::probe::{ElementHandle, Marker};
use crate::{ProbeError, ProbeResult};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct ElementSnapshot {
    outer_html: String,
    text: String,
    attributes: HashMap<String, String>,
}

impl ElementSnapshot {
    fn capture(element: ElementRef<'_>) -> Self {
        Self {
            outer_html: element.html(),
            text: element.text().collect::<String>(),
            attributes: element
                .value()
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }

    fn is_visible(&self) -> bool {
        if self.attributes.contains_key("hidden") {
            return false;
        }
        !self
            .attributes
            .get("style")
            .map(|style| style.replace(' ', "").contains("display:none"))
            .unwrap_or(false)
    }
}

/// A loaded page whose elements can be queried by marker
#[derive(Debug, Clone, Default)]
pub struct HtmlPage {
    markup: String,
    elements: Vec<ElementSnapshot>,
}

impl HtmlPage {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            elements: Vec::new(),
        }
    }

    /// Replaces the markup while keeping previously issued handles readable
    ///
    /// Used when a hover or click reveals more content on the same page.
    pub fn update_markup(&mut self, markup: impl Into<String>) {
        self.markup = markup.into();
    }

    /// Returns handles for every element matching `marker`
    pub fn select(&mut self, marker: &Marker) -> ProbeResult<Vec<ElementHandle>> {
        let selector = parse_selector(marker)?;
        let document = Html::parse_document(&self.markup);
        let snapshots: Vec<ElementSnapshot> = document
            .select(&selector)
            .map(ElementSnapshot::capture)
            .collect();
        Ok(self.register(snapshots))
    }

    /// Returns handles for elements matching `marker` inside `scope`
    pub fn select_in(
        &mut self,
        scope: ElementHandle,
        marker: &Marker,
    ) -> ProbeResult<Vec<ElementHandle>> {
        let selector = parse_selector(marker)?;
        let fragment = Html::parse_fragment(&self.snapshot(scope)?.outer_html);
        let snapshots: Vec<ElementSnapshot> = fragment
            .select(&selector)
            .map(ElementSnapshot::capture)
            .collect();
        Ok(self.register(snapshots))
    }

    /// Returns true if at least one visible element matches `marker`
    pub fn has_visible(&self, marker: &Marker) -> ProbeResult<bool> {
        let selector = parse_selector(marker)?;
        let document = Html::parse_document(&self.markup);
        let visible = document
            .select(&selector)
            .any(|element| ElementSnapshot::capture(element).is_visible());
        Ok(visible)
    }

    pub fn attribute(&self, element: ElementHandle, name: &str) -> ProbeResult<Option<String>> {
        Ok(self.snapshot(element)?.attributes.get(name).cloned())
    }

    pub fn text(&self, element: ElementHandle) -> ProbeResult<String> {
        Ok(self.snapshot(element)?.text.clone())
    }

    /// Fails with `StaleElement` if the handle does not belong to this page
    pub fn check(&self, element: ElementHandle) -> ProbeResult<()> {
        self.snapshot(element).map(|_| ())
    }

    fn snapshot(&self, element: ElementHandle) -> ProbeResult<&ElementSnapshot> {
        self.elements
            .get(element.0)
            .ok_or(ProbeError::StaleElement(element.0))
    }

    fn register(&mut self, snapshots: Vec<ElementSnapshot>) -> Vec<ElementHandle> {
        let start = self.elements.len();
        self.elements.extend(snapshots);
        (start..self.elements.len()).map(ElementHandle).collect()
    }
}

fn parse_selector(marker: &Marker) -> ProbeResult<Selector> {
    Selector::parse(marker.as_str()).map_err(|_| ProbeError::InvalidMarker(marker.to_string()))
}
