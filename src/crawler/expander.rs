//! Strategy execution
//!
//! Given the strategy chosen for a page, the expander reads the page's
//! entries in DOM order and turns them into child descriptors or flat labels.

use crate::crawler::classifier::LayoutMarkers;
use crate::crawler::poll::{settle, StabilityPoll};
use crate::crawler::StrategyKind;
use crate::probe::{ElementHandle, Marker, PageProbe};
use crate::tree::{ChildDescriptor, NodeTask};
use crate::url::clean_label;
use crate::{NodeError, NodeResult};
use std::time::Duration;

/// What one successful expansion produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    Children(Vec<ChildDescriptor>),
    Flat(Vec<String>),
    NoChildren,
}

/// Runs extraction strategies against a loaded page
#[derive(Debug, Clone)]
pub struct NodeExpander {
    markers: LayoutMarkers,
    wait: Duration,
    poll: StabilityPoll,
}

/// Marker triple describing a list of link entries
struct LinkList<'a> {
    item: &'a Marker,
    link: &'a Marker,
    header: Option<&'a Marker>,
}

impl NodeExpander {
    pub fn new(markers: LayoutMarkers, wait: Duration, poll: StabilityPoll) -> Self {
        Self {
            markers,
            wait,
            poll,
        }
    }

    /// Expands `task` with `strategy` on the page currently loaded in `probe`
    ///
    /// A strategy that matched but yields nothing returns
    /// [`NodeError::ExtractionEmpty`] so the retry policy can re-navigate.
    pub async fn expand(
        &self,
        task: &NodeTask,
        strategy: StrategyKind,
        probe: &mut dyn PageProbe,
    ) -> NodeResult<Expansion> {
        let expansion = match strategy {
            StrategyKind::NestedMenuA => {
                let list = LinkList {
                    item: &self.markers.menu_a_item,
                    link: &self.markers.menu_a_link,
                    header: None,
                };
                let children = self
                    .read_menu(task, probe, &self.markers.menu_a_container, &list)
                    .await?;
                Expansion::Children(children)
            }
            StrategyKind::NestedMenuB => {
                let list = LinkList {
                    item: &self.markers.menu_b_item,
                    link: &self.markers.menu_b_link,
                    header: Some(&self.markers.menu_b_header),
                };
                let children = self
                    .read_menu(task, probe, &self.markers.menu_b_container, &list)
                    .await?;
                Expansion::Children(children)
            }
            StrategyKind::FlatFilterCategory => Expansion::Flat(self.read_flat_filter(probe).await?),
            StrategyKind::FilterBurgerList => {
                Expansion::Children(self.read_burger(task, probe).await?)
            }
            StrategyKind::None => return Ok(Expansion::NoChildren),
        };

        let empty = match &expansion {
            Expansion::Children(children) => children.is_empty(),
            Expansion::Flat(labels) => labels.is_empty(),
            Expansion::NoChildren => false,
        };
        if empty {
            return Err(NodeError::ExtractionEmpty(strategy));
        }

        Ok(expansion)
    }

    async fn read_menu(
        &self,
        task: &NodeTask,
        probe: &mut dyn PageProbe,
        container: &Marker,
        list: &LinkList<'_>,
    ) -> NodeResult<Vec<ChildDescriptor>> {
        let mut children = Vec::new();
        for scope in probe.find_all(container, self.wait).await? {
            let items = probe.find_in(scope, list.item).await?;
            children.extend(read_links(task, probe, items, list).await?);
        }
        Ok(children)
    }

    async fn read_flat_filter(&self, probe: &mut dyn PageProbe) -> NodeResult<Vec<String>> {
        let markers = &self.markers;

        if let Some(trigger) = probe
            .find_all(&markers.flat_filter_trigger, self.wait)
            .await?
            .first()
        {
            probe.hover(*trigger).await?;
        }

        if probe
            .wait_visible(&markers.flat_filter_show_all, self.wait)
            .await?
        {
            if let Some(button) = probe
                .find_all(&markers.flat_filter_show_all, self.wait)
                .await?
                .first()
            {
                probe.click(*button).await?;
            }
        }

        settle(probe, &markers.flat_filter_item, &self.poll, self.wait).await?;

        let mut labels = Vec::new();
        for item in probe.find_all(&markers.flat_filter_item, self.wait).await? {
            let raw = match probe
                .find_in(item, &markers.flat_filter_label)
                .await?
                .first()
            {
                Some(label) => probe.text(*label).await?,
                None => probe.text(item).await?,
            };

            let label = clean_label(&raw);
            if !label.is_empty() {
                labels.push(label);
            }
        }

        Ok(labels)
    }

    async fn read_burger(
        &self,
        task: &NodeTask,
        probe: &mut dyn PageProbe,
    ) -> NodeResult<Vec<ChildDescriptor>> {
        let markers = &self.markers;

        if let Some(trigger) = probe
            .find_all(&markers.burger_trigger, self.wait)
            .await?
            .first()
        {
            probe.click(*trigger).await?;
        }

        settle(probe, &markers.burger_item, &self.poll, self.wait).await?;

        let items = probe.find_all(&markers.burger_item, self.wait).await?;
        let list = LinkList {
            item: &markers.burger_item,
            link: &markers.burger_link,
            header: None,
        };
        read_links(task, probe, items, &list).await
    }
}

/// Reads one child per item that carries a link with an href
///
/// Items holding a section header are skipped, as are links without an href
/// or with an empty label.
async fn read_links(
    task: &NodeTask,
    probe: &mut dyn PageProbe,
    items: Vec<ElementHandle>,
    list: &LinkList<'_>,
) -> NodeResult<Vec<ChildDescriptor>> {
    let mut children = Vec::with_capacity(items.len());

    for item in items {
        if let Some(header) = list.header {
            if !probe.find_in(item, header).await?.is_empty() {
                continue;
            }
        }

        let Some(link) = probe.find_in(item, list.link).await?.first().copied() else {
            continue;
        };

        let href = match probe.attribute(link, "href").await? {
            Some(href) if !href.trim().is_empty() => href.trim().to_string(),
            _ => continue,
        };

        let name = clean_label(&probe.text(link).await?);
        if name.is_empty() {
            tracing::debug!("Skipping unnamed entry {} under {}", href, task.name);
            continue;
        }

        children.push(task.child(name, href));
    }

    Ok(children)
}
