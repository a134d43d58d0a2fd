//! Top-level category listing
//!
//! The crawl starts from a list of root categories. They either come straight
//! from configuration ([`StaticRoots`]) or are read from the site's main
//! burger menu ([`MenuRoots`]). Excluded names are removed before anything
//! is enqueued.

use crate::config::{MarkerConfig, SiteConfig};
use crate::probe::{Marker, PageProbe, ProbeFactory};
use crate::url::clean_label;
use crate::{ProbeResult, RippleError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// One top-level category to start crawling from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootEntry {
    pub name: String,
    pub url: String,
}

impl RootEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Produces the initial root categories of a crawl
#[async_trait]
pub trait RootListing: Send + Sync {
    async fn list(&self) -> crate::Result<Vec<RootEntry>>;

    /// Short description used in logs
    fn source(&self) -> String;
}

/// Roots given explicitly
#[derive(Debug, Clone, Default)]
pub struct StaticRoots {
    entries: Vec<RootEntry>,
}

impl StaticRoots {
    pub fn new(entries: Vec<RootEntry>) -> Self {
        Self { entries }
    }

    pub fn from_config(site: &SiteConfig) -> Self {
        Self::new(
            site.roots
                .iter()
                .map(|root| RootEntry::new(clean_label(&root.name), root.url.trim()))
                .collect(),
        )
    }
}

#[async_trait]
impl RootListing for StaticRoots {
    async fn list(&self) -> crate::Result<Vec<RootEntry>> {
        Ok(self.entries.clone())
    }

    fn source(&self) -> String {
        format!("{} configured roots", self.entries.len())
    }
}

/// Roots read from the site's main menu
pub struct MenuRoots {
    factory: Arc<dyn ProbeFactory>,
    button: Marker,
    item: Marker,
    link: Marker,
    navigation_timeout: Duration,
    wait: Duration,
}

impl MenuRoots {
    pub fn new(
        factory: Arc<dyn ProbeFactory>,
        markers: &MarkerConfig,
        navigation_timeout: Duration,
        wait: Duration,
    ) -> Self {
        Self {
            factory,
            button: Marker::from(&markers.root_menu_button),
            item: Marker::from(&markers.root_menu_item),
            link: Marker::from(&markers.root_menu_link),
            navigation_timeout,
            wait,
        }
    }

    async fn read_menu(&self, probe: &mut dyn PageProbe) -> ProbeResult<Vec<RootEntry>> {
        probe.navigate("/", self.navigation_timeout).await?;

        if probe.wait_visible(&self.button, self.wait).await? {
            if let Some(button) = probe.find_all(&self.button, self.wait).await?.first() {
                probe.click(*button).await?;
            }
        }

        if !probe.wait_visible(&self.item, self.navigation_timeout).await? {
            tracing::warn!("Main menu entries ({}) never became visible", self.item);
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for item in probe.find_all(&self.item, self.wait).await? {
            let Some(link) = probe.find_in(item, &self.link).await?.first().copied() else {
                continue;
            };
            let Some(href) = probe.attribute(link, "href").await? else {
                continue;
            };
            let name = clean_label(&probe.text(link).await?);
            if !name.is_empty() && !href.trim().is_empty() {
                entries.push(RootEntry::new(name, href.trim()));
            }
        }

        Ok(entries)
    }
}

#[async_trait]
impl RootListing for MenuRoots {
    async fn list(&self) -> crate::Result<Vec<RootEntry>> {
        let mut probe = self.factory.open().await?;
        let result = self.read_menu(probe.as_mut()).await;
        if let Err(e) = probe.close().await {
            tracing::debug!("Failed to close root menu session: {}", e);
        }
        Ok(result?)
    }

    fn source(&self) -> String {
        "site main menu".to_string()
    }
}

/// Removes roots whose names appear in `excluded`
///
/// Names are compared trimmed and case-insensitively.
pub fn apply_exclusions(entries: Vec<RootEntry>, excluded: &[String]) -> Vec<RootEntry> {
    let excluded: HashSet<String> = excluded
        .iter()
        .map(|name| name.trim().to_lowercase())
        .collect();

    entries
        .into_iter()
        .filter(|entry| {
            let skip = excluded.contains(&entry.name.trim().to_lowercase());
            if skip {
                tracing::info!("Excluding root category {}", entry.name);
            }
            !skip
        })
        .collect()
}

/// Lists roots and applies exclusions
///
/// # Returns
///
/// * `Ok(Vec<RootEntry>)` - At least one root remains
/// * `Err(RippleError::EmptyRootListing)` - Nothing left to crawl
pub async fn resolve_roots(
    listing: &dyn RootListing,
    excluded: &[String],
) -> crate::Result<Vec<RootEntry>> {
    let listed = listing.list().await?;
    tracing::info!("Found {} roots from {}", listed.len(), listing.source());

    let roots = apply_exclusions(listed, excluded);
    if roots.is_empty() {
        return Err(RippleError::EmptyRootListing);
    }
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{MemoryEntry, MemorySite};

    #[test]
    fn test_exclusions_are_case_insensitive() {
        let entries = vec![
            RootEntry::new("Shoes", "/shoes"),
            RootEntry::new("Gift Cards", "/gifts"),
            RootEntry::new("Brands", "/brands"),
        ];
        let excluded = vec![" gift cards".to_string(), "BRANDS".to_string()];

        let kept = apply_exclusions(entries, &excluded);
        assert_eq!(kept, vec![RootEntry::new("Shoes", "/shoes")]);
    }

    #[tokio::test]
    async fn test_empty_listing_is_fatal() {
        let listing = StaticRoots::new(vec![RootEntry::new("Brands", "/brands")]);
        let result = resolve_roots(&listing, &["brands".to_string()]).await;
        assert!(matches!(result, Err(RippleError::EmptyRootListing)));

        let result = resolve_roots(&StaticRoots::default(), &[]).await;
        assert!(matches!(result, Err(RippleError::EmptyRootListing)));
    }

    #[tokio::test]
    async fn test_menu_roots_read_from_site() {
        let site = MemorySite::builder()
            .root_menu(vec![
                MemoryEntry::link("Women", "/women"),
                MemoryEntry::Unlinked("Promo".into()),
                MemoryEntry::link(" / Men ", "/men"),
            ])
            .build();

        let listing = MenuRoots::new(
            Arc::new(site.clone()),
            &MarkerConfig::default(),
            Duration::from_millis(50),
            Duration::from_millis(10),
        );

        let roots = listing.list().await.unwrap();
        assert_eq!(
            roots,
            vec![RootEntry::new("Women", "/women"), RootEntry::new("Men", "/men")]
        );
        assert_eq!(site.stats().open_sessions, 0);
    }
}
