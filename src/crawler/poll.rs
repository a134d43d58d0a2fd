//! Stability polling for incrementally loaded lists
//!
//! Filter lists load in batches as the user scrolls or hovers. A list is
//! considered fully loaded once its element count reads the same a number of
//! times in a row; a cap on the number of reads bounds pages that never settle.

use crate::config::PollConfig;
use crate::probe::{Marker, PageProbe};
use crate::NodeResult;
use std::time::Duration;

/// Parameters of a stability poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilityPoll {
    /// Pause between two reads
    pub interval: Duration,

    /// Consecutive equal reads required to call the list stable
    pub stable_reads: u32,

    /// Hard cap on reads
    pub max_polls: u32,
}

impl StabilityPoll {
    pub fn from_config(config: &PollConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms),
            stable_reads: config.stable_reads.max(2),
            max_polls: config.max_polls.max(1),
        }
    }

    pub fn tracker(&self) -> StabilityTracker {
        StabilityTracker::new(*self)
    }
}

/// What to do after one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// Keep polling
    Continue,

    /// The count repeated often enough
    Stable(usize),

    /// The read cap was hit; carries the last observed count
    Exhausted(usize),
}

/// Pure state machine behind [`settle`]
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    poll: StabilityPoll,
    last: Option<usize>,
    streak: u32,
    reads: u32,
}

impl StabilityTracker {
    pub fn new(poll: StabilityPoll) -> Self {
        Self {
            poll,
            last: None,
            streak: 0,
            reads: 0,
        }
    }

    /// Feeds one count observation
    pub fn observe(&mut self, count: usize) -> PollStep {
        self.reads += 1;
        if self.last == Some(count) {
            self.streak += 1;
        } else {
            self.streak = 1;
            self.last = Some(count);
        }

        if self.streak >= self.poll.stable_reads {
            PollStep::Stable(count)
        } else if self.reads >= self.poll.max_polls {
            PollStep::Exhausted(count)
        } else {
            PollStep::Continue
        }
    }

    pub fn reads(&self) -> u32 {
        self.reads
    }
}

/// Polls the number of elements matching `marker` until it stops changing
///
/// Between reads the last observed element is hovered, which is what makes
/// lazily loaded lists fetch their next batch. Returns the settled count.
pub async fn settle(
    probe: &mut dyn PageProbe,
    marker: &Marker,
    poll: &StabilityPoll,
    wait: Duration,
) -> NodeResult<usize> {
    let mut tracker = poll.tracker();

    loop {
        let elements = probe.find_all(marker, wait).await?;

        match tracker.observe(elements.len()) {
            PollStep::Stable(count) => {
                tracing::trace!(
                    "{} settled at {} after {} reads",
                    marker,
                    count,
                    tracker.reads()
                );
                return Ok(count);
            }
            PollStep::Exhausted(count) => {
                tracing::warn!(
                    "{} did not settle within {} reads, using last count {}",
                    marker,
                    poll.max_polls,
                    count
                );
                return Ok(count);
            }
            PollStep::Continue => {
                if let Some(last) = elements.last() {
                    probe.hover(*last).await?;
                }
                tokio::time::sleep(poll.interval).await;
            }
        }
    }
}
