//! Page layout classification
//!
//! Classification happens in two steps. [`observe_layout`] asks the probe
//! which structural markers are visible, in priority order, stopping at the
//! first hit. [`classify`] is a pure function from that observation to a
//! [`StrategyKind`]. Splitting them keeps the priority rules testable without
//! a page.

use crate::config::MarkerConfig;
use crate::crawler::StrategyKind;
use crate::probe::{Marker, PageProbe};
use crate::{NodeError, NodeResult};
use std::time::Duration;

/// Structural markers for every known layout, parsed from configuration
#[derive(Debug, Clone)]
pub struct LayoutMarkers {
    pub menu_a_container: Marker,
    pub menu_a_item: Marker,
    pub menu_a_link: Marker,

    pub menu_b_container: Marker,
    pub menu_b_item: Marker,
    pub menu_b_link: Marker,
    pub menu_b_header: Marker,

    pub flat_filter_trigger: Marker,
    pub flat_filter_show_all: Marker,
    pub flat_filter_item: Marker,
    pub flat_filter_label: Marker,

    pub burger_trigger: Marker,
    pub burger_item: Marker,
    pub burger_link: Marker,
}

impl LayoutMarkers {
    pub fn from_config(config: &MarkerConfig) -> Self {
        Self {
            menu_a_container: Marker::from(&config.menu_a_container),
            menu_a_item: Marker::from(&config.menu_a_item),
            menu_a_link: Marker::from(&config.menu_a_link),
            menu_b_container: Marker::from(&config.menu_b_container),
            menu_b_item: Marker::from(&config.menu_b_item),
            menu_b_link: Marker::from(&config.menu_b_link),
            menu_b_header: Marker::from(&config.menu_b_header),
            flat_filter_trigger: Marker::from(&config.flat_filter_trigger),
            flat_filter_show_all: Marker::from(&config.flat_filter_show_all),
            flat_filter_item: Marker::from(&config.flat_filter_item),
            flat_filter_label: Marker::from(&config.flat_filter_label),
            burger_trigger: Marker::from(&config.burger_trigger),
            burger_item: Marker::from(&config.burger_item),
            burger_link: Marker::from(&config.burger_link),
        }
    }

    /// Layout markers in classification priority order
    fn probes(&self) -> [(StrategyKind, &Marker); 4] {
        [
            (StrategyKind::NestedMenuA, &self.menu_a_container),
            (StrategyKind::NestedMenuB, &self.menu_b_container),
            (StrategyKind::FlatFilterCategory, &self.flat_filter_trigger),
            (StrategyKind::FilterBurgerList, &self.burger_trigger),
        ]
    }
}

impl Default for LayoutMarkers {
    fn default() -> Self {
        Self::from_config(&MarkerConfig::default())
    }
}

/// Which layout markers were seen on a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutObservation {
    pub menu_a: bool,
    pub menu_b: bool,
    pub flat_filter: bool,
    pub burger: bool,
}

impl LayoutObservation {
    fn mark(&mut self, kind: StrategyKind) {
        match kind {
            StrategyKind::NestedMenuA => self.menu_a = true,
            StrategyKind::NestedMenuB => self.menu_b = true,
            StrategyKind::FlatFilterCategory => self.flat_filter = true,
            StrategyKind::FilterBurgerList => self.burger = true,
            StrategyKind::None => {}
        }
    }
}

/// Picks the extraction strategy for an observation
///
/// A page can transiently carry several markers while it renders; the fixed
/// priority order resolves those ties.
pub fn classify(observation: &LayoutObservation) -> StrategyKind {
    if observation.menu_a {
        StrategyKind::NestedMenuA
    } else if observation.menu_b {
        StrategyKind::NestedMenuB
    } else if observation.flat_filter {
        StrategyKind::FlatFilterCategory
    } else if observation.burger {
        StrategyKind::FilterBurgerList
    } else {
        StrategyKind::None
    }
}

/// Probes the loaded page for layout markers, highest priority first
///
/// Each marker gets up to `wait` to become visible. Probing stops at the
/// first visible marker. A probe failure makes the whole classification
/// inconclusive, which is retryable; finding nothing is not an error.
pub async fn observe_layout(
    probe: &mut dyn PageProbe,
    markers: &LayoutMarkers,
    wait: Duration,
) -> NodeResult<LayoutObservation> {
    let mut observation = LayoutObservation::default();

    for (kind, marker) in markers.probes() {
        let visible = probe.wait_visible(marker, wait).await.map_err(|e| {
            NodeError::ClassificationInconclusive(format!("probing {}: {}", marker, e))
        })?;

        if visible {
            observation.mark(kind);
            break;
        }
    }

    Ok(observation)
}

/// Observes and classifies the loaded page
pub async fn classify_page(
    probe: &mut dyn PageProbe,
    markers: &LayoutMarkers,
    wait: Duration,
) -> NodeResult<StrategyKind> {
    let observation = observe_layout(probe, markers, wait).await?;
    Ok(classify(&observation))
}
