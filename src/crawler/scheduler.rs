//! Work queue and worker pool
//!
//! This module handles:
//! - A FIFO queue of pending nodes whose drain check counts in-flight work
//! - A fixed pool of workers, each holding at most one probe session
//! - Per-node retry, timeout and outcome recording
//! - Structured per-node events and periodic progress logging

use crate::config::Config;
use crate::crawler::classifier::{classify_page, LayoutMarkers};
use crate::crawler::expander::{Expansion, NodeExpander};
use crate::crawler::poll::StabilityPoll;
use crate::crawler::retry::RetryPolicy;
use crate::crawler::roots::RootEntry;
use crate::crawler::{CrawlReport, StrategyKind};
use crate::probe::{PageProbe, ProbeFactory};
use crate::tree::{LeafReason, NodeOutcome, NodeRecord, NodeStatus, NodeTask, TreeAssembler};
use crate::{ConfigError, NodeError, NodeResult, RippleError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify, Semaphore};
use tokio::task::JoinSet;
use url::Url;

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<NodeTask>,
    in_flight: usize,
}

/// FIFO queue of nodes awaiting expansion
///
/// [`WorkQueue::next`] returns `None` only once the queue is empty **and** no
/// task handed out earlier is still running, since a running task may still
/// enqueue children.
#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_all(&self, tasks: impl IntoIterator<Item = NodeTask>) {
        let pushed = {
            let mut state = self.lock();
            let before = state.pending.len();
            state.pending.extend(tasks);
            state.pending.len() - before
        };
        if pushed > 0 {
            self.notify.notify_waiters();
        }
    }

    /// Waits for the next task, or `None` once the queue has drained
    ///
    /// Every task returned must be followed by exactly one call to
    /// [`WorkQueue::task_done`].
    pub async fn next(&self) -> Option<NodeTask> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a wake-up between check and await is not lost
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(task) = state.pending.pop_front() {
                    state.in_flight += 1;
                    return Some(task);
                }
                if state.in_flight == 0 {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Marks one task returned by [`WorkQueue::next`] as finished
    pub fn task_done(&self) {
        let drained = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.in_flight == 0 && state.pending.is_empty()
        };
        if drained {
            self.notify.notify_waiters();
        }
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }
}

/// Calls [`WorkQueue::task_done`] on drop, so a panicking worker cannot
/// leave the other workers waiting forever
struct InFlight<'a>(&'a WorkQueue);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.task_done();
    }
}

/// Tracks how many probe sessions are active and the highest value seen
#[derive(Debug, Default)]
pub struct ActivityGauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ActivityGauge {
    pub fn enter(&self) -> ActivityGuard<'_> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ActivityGuard(self)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub struct ActivityGuard<'a>(&'a ActivityGauge);

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Structured result of one node, for progress observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEvent {
    pub name: String,
    pub url: String,
    pub path: Vec<String>,
    pub depth: u32,
    pub status: NodeStatus,
    pub strategy: Option<StrategyKind>,
    pub attempts: u32,
    pub elapsed: Duration,
    /// Children or flat labels produced
    pub produced: usize,
    pub error: Option<String>,
}

/// Knobs of one crawl run, resolved from [`Config`]
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub base_url: Url,
    pub workers: usize,
    pub retry: RetryPolicy,
    pub navigation_timeout: Duration,
    pub node_timeout: Duration,
    pub probe_wait: Duration,
    pub poll: StabilityPoll,
    pub markers: LayoutMarkers,
    pub max_depth: Option<u32>,
    pub progress_every: usize,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> crate::ConfigResult<Self> {
        let base_url = Url::parse(&config.site.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("{}: {}", config.site.base_url, e))
        })?;
        let crawler = &config.crawler;

        Ok(Self {
            base_url,
            workers: crawler.workers.max(1) as usize,
            retry: RetryPolicy::from_config(crawler),
            navigation_timeout: crawler.navigation_timeout(),
            node_timeout: crawler.node_timeout(),
            probe_wait: crawler.probe_wait(),
            poll: StabilityPoll::from_config(&config.poll),
            markers: LayoutMarkers::from_config(&config.markers),
            max_depth: crawler.max_depth,
            progress_every: crawler.progress_every.max(1) as usize,
        })
    }
}

/// State shared by every worker of one run
struct Shared {
    settings: SchedulerSettings,
    factory: Arc<dyn ProbeFactory>,
    expander: NodeExpander,
    assembler: TreeAssembler,
    queue: WorkQueue,
    sessions: Semaphore,
    gauge: ActivityGauge,
    completed: AtomicUsize,
    events: Option<mpsc::UnboundedSender<NodeEvent>>,
    started: Instant,
}

/// Drives one crawl run over a fixed pool of workers
pub struct Scheduler {
    settings: SchedulerSettings,
    factory: Arc<dyn ProbeFactory>,
    events: Option<mpsc::UnboundedSender<NodeEvent>>,
}

impl Scheduler {
    pub fn new(settings: SchedulerSettings, factory: Arc<dyn ProbeFactory>) -> Self {
        Self {
            settings,
            factory,
            events: None,
        }
    }

    /// Sends a [`NodeEvent`] for every node that reaches a terminal status
    pub fn with_events(mut self, events: mpsc::UnboundedSender<NodeEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Crawls every root and everything reachable below it
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The run drained; individual nodes may have failed
    /// * `Err(RippleError::EmptyRootListing)` - There was nothing to crawl
    /// * `Err(RippleError::Worker)` - A worker task panicked
    pub async fn run(self, roots: Vec<RootEntry>) -> crate::Result<CrawlReport> {
        if roots.is_empty() {
            return Err(RippleError::EmptyRootListing);
        }

        let settings = self.settings;
        let workers = settings.workers;
        let expander = NodeExpander::new(
            settings.markers.clone(),
            settings.probe_wait,
            settings.poll,
        );
        let assembler = TreeAssembler::new(settings.base_url.clone(), settings.max_depth);

        let tasks: Vec<NodeTask> = roots
            .iter()
            .filter_map(|root| assembler.add_root(&root.name, &root.url))
            .collect();

        tracing::info!(
            "Starting crawl: {} roots, {} workers, {} attempts per node",
            tasks.len(),
            workers,
            settings.retry.max_attempts
        );

        let shared = Arc::new(Shared {
            sessions: Semaphore::new(workers),
            settings,
            factory: self.factory,
            expander,
            assembler,
            queue: WorkQueue::new(),
            gauge: ActivityGauge::default(),
            completed: AtomicUsize::new(0),
            events: self.events,
            started: Instant::now(),
        });
        shared.queue.push_all(tasks);

        let mut pool = JoinSet::new();
        for worker in 0..workers {
            let shared = Arc::clone(&shared);
            pool.spawn(async move { shared.work(worker).await });
        }

        let mut panicked = Vec::new();
        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
                panicked.push(e.to_string());
            }
        }
        if !panicked.is_empty() {
            return Err(RippleError::Worker(panicked.join("; ")));
        }

        let report = CrawlReport {
            roots: shared.assembler.snapshot(),
            counts: shared.assembler.counts(),
            peak_active: shared.gauge.peak(),
            elapsed: shared.started.elapsed(),
        };

        tracing::info!(
            "Crawl completed: {} nodes ({} expanded, {} leaves, {} failed) in {:?}",
            report.counts.total(),
            report.counts.expanded,
            report.counts.no_children,
            report.counts.failed,
            report.elapsed
        );

        Ok(report)
    }
}

/// Returns the strategy if every attempt matched a layout but found nothing
///
/// Such a node is a leaf, not a failure.
fn exhausted_on_empty(error: &NodeError) -> Option<StrategyKind> {
    match error {
        NodeError::PermanentNodeFailure { cause, .. } => match cause.as_ref() {
            NodeError::ExtractionEmpty(strategy) => Some(*strategy),
            _ => None,
        },
        NodeError::ExtractionEmpty(strategy) => Some(*strategy),
        _ => None,
    }
}

impl Shared {
    async fn work(&self, worker: usize) {
        tracing::debug!("Worker {} started", worker);

        while let Some(task) = self.queue.next().await {
            let done = InFlight(&self.queue);

            let record = self.expand_node(&task).await;
            self.emit(&task, &record);

            let children = self.assembler.record(task.id, record);
            self.queue.push_all(children);
            drop(done);

            self.report_progress();
        }

        tracing::debug!("Worker {} finished", worker);
    }

    /// Runs every attempt for one node and folds the result into a record
    async fn expand_node(&self, task: &NodeTask) -> NodeRecord {
        let started = Instant::now();
        tracing::debug!("Expanding {} ({}) at depth {}", task.name, task.url, task.depth);

        let attempted = self
            .settings
            .retry
            .run(&task.url, move |attempt| self.attempt(task, attempt))
            .await;

        let outcome = match attempted.result {
            Ok((strategy, Expansion::Children(children))) => {
                NodeOutcome::Children { strategy, children }
            }
            Ok((strategy, Expansion::Flat(labels))) => NodeOutcome::Flat { strategy, labels },
            Ok((strategy, Expansion::NoChildren)) => NodeOutcome::Leaf {
                strategy: Some(strategy),
                reason: LeafReason::NoStructure,
            },
            Err(error) => match exhausted_on_empty(&error) {
                Some(strategy) => NodeOutcome::Leaf {
                    strategy: Some(strategy),
                    reason: LeafReason::EmptyExtraction,
                },
                None => {
                    tracing::error!("Giving up on {} ({}): {}", task.name, task.url, error);
                    NodeOutcome::Failed { cause: error }
                }
            },
        };

        NodeRecord {
            outcome,
            attempts: attempted.attempts,
            elapsed: started.elapsed(),
        }
    }

    /// One attempt: open a session, load the page, classify and extract
    async fn attempt(
        &self,
        task: &NodeTask,
        attempt: u32,
    ) -> NodeResult<(StrategyKind, Expansion)> {
        let _permit = self
            .sessions
            .acquire()
            .await
            .map_err(|_| NodeError::Extraction("session pool closed".to_string()))?;
        let _active = self.gauge.enter();

        tracing::trace!("Attempt {} for {}", attempt, task.url);
        let mut probe = self.factory.open().await?;

        let result = tokio::time::timeout(
            self.settings.node_timeout,
            self.probe_node(probe.as_mut(), task),
        )
        .await
        .unwrap_or_else(|_| Err(NodeError::NavigationTimeout(task.url.clone())));

        if let Err(e) = probe.close().await {
            tracing::debug!("Failed to close session for {}: {}", task.url, e);
        }

        result
    }

    async fn probe_node(
        &self,
        probe: &mut dyn PageProbe,
        task: &NodeTask,
    ) -> NodeResult<(StrategyKind, Expansion)> {
        probe
            .navigate(&task.url, self.settings.navigation_timeout)
            .await?;

        let strategy =
            classify_page(probe, &self.settings.markers, self.settings.probe_wait).await?;
        tracing::debug!("{} classified as {}", task.url, strategy);

        let expansion = self.expander.expand(task, strategy, probe).await?;
        Ok((strategy, expansion))
    }

    fn emit(&self, task: &NodeTask, record: &NodeRecord) {
        let Some(events) = &self.events else {
            return;
        };

        let (status, strategy, produced, error) = match &record.outcome {
            NodeOutcome::Children { strategy, children } => (
                NodeStatus::Expanded,
                Some(*strategy),
                children.len(),
                None,
            ),
            NodeOutcome::Flat { strategy, labels } => {
                (NodeStatus::Expanded, Some(*strategy), labels.len(), None)
            }
            NodeOutcome::Leaf { strategy, .. } => (NodeStatus::NoChildren, *strategy, 0, None),
            NodeOutcome::Failed { cause } => {
                (NodeStatus::Failed, None, 0, Some(cause.to_string()))
            }
        };

        let mut path = task.parent_path.clone();
        path.push(task.name.clone());

        // A dropped receiver only means nobody is listening anymore
        let _ = events.send(NodeEvent {
            name: task.name.clone(),
            url: task.url.clone(),
            path,
            depth: task.depth,
            status,
            strategy,
            attempts: record.attempts,
            elapsed: record.elapsed,
            produced,
            error,
        });
    }

    fn report_progress(&self) {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if completed % self.settings.progress_every != 0 {
            return;
        }

        let elapsed = self.started.elapsed();
        let rate = completed as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
        tracing::info!(
            "Progress: {} nodes done, {} queued, {} in flight, {} sessions open, {:.2} nodes/sec",
            completed,
            self.queue.len(),
            self.queue.in_flight(),
            self.gauge.active(),
            rate
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeId;

    fn task(id: usize) -> NodeTask {
        NodeTask {
            id: NodeId(id),
            name: format!("Node {}", id),
            url: format!("/node/{}", id),
            parent_path: Vec::new(),
            depth: 1,
            lineage: Arc::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn test_queue_is_fifo() {
        let queue = WorkQueue::new();
        queue.push_all(vec![task(1), task(2), task(3)]);

        assert_eq!(queue.next().await.unwrap().id, NodeId(1));
        assert_eq!(queue.next().await.unwrap().id, NodeId(2));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.in_flight(), 2);
    }

    #[tokio::test]
    async fn test_empty_queue_drains_immediately() {
        let queue = WorkQueue::new();
        assert!(queue.next().await.is_none());
    }

    #[tokio::test]
    async fn test_drain_waits_for_in_flight_work() {
        let queue = Arc::new(WorkQueue::new());
        queue.push_all(vec![task(1)]);
        let first = queue.next().await.unwrap();
        assert_eq!(first.id, NodeId(1));

        // Queue is empty but a task is in flight: the waiter must block
        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.next().await.map(|t| t.id) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        // The in-flight task produces a child before finishing
        queue.push_all(vec![task(2)]);
        queue.task_done();
        assert_eq!(waiter.await.unwrap(), Some(NodeId(2)));

        queue.task_done();
        assert!(queue.next().await.is_none());
    }

    #[tokio::test]
    async fn test_waiters_released_when_drained() {
        let queue = Arc::new(WorkQueue::new());
        queue.push_all(vec![task(1)]);
        let _first = queue.next().await.unwrap();

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move { queue.next().await.is_none() })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(20)).await;

        queue.task_done();
        for waiter in waiters {
            assert!(waiter.await.unwrap());
        }
    }

    #[test]
    fn test_gauge_tracks_peak() {
        let gauge = ActivityGauge::default();
        {
            let _a = gauge.enter();
            let _b = gauge.enter();
            assert_eq!(gauge.active(), 2);
        }
        let _c = gauge.enter();
        assert_eq!(gauge.active(), 1);
        assert_eq!(gauge.peak(), 2);
    }
}
