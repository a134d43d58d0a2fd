//! Run-scoped tree assembly
//!
//! Workers finish nodes in any order; the assembler attaches each result to
//! the node's fixed position so the exported tree keeps page order. Nodes
//! live in an arena indexed by [`NodeId`] behind one mutex. Each node is
//! owned by a single worker while it is being expanded, so the lock is only
//! held for the short bookkeeping step in [`TreeAssembler::record`].

use crate::crawler::StrategyKind;
use crate::tree::node::{CategoryNode, ChildDescriptor, LeafReason, NodeFailure, NodeStatus};
use crate::url::category_key;
use crate::NodeError;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use url::Url;

/// Index of a node inside the assembler's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Everything a worker needs to expand one node
#[derive(Debug, Clone)]
pub struct NodeTask {
    pub id: NodeId,
    pub name: String,
    pub url: String,
    pub parent_path: Vec<String>,
    pub depth: u32,
    /// Normalized URL keys of every ancestor and of this node itself
    pub lineage: Arc<Vec<String>>,
}

impl NodeTask {
    /// Builds the descriptor of a child found on this node's page
    pub fn child(&self, name: String, url: String) -> ChildDescriptor {
        let mut parent_path = self.parent_path.clone();
        parent_path.push(self.name.clone());
        ChildDescriptor {
            name,
            url,
            parent_path,
            depth: self.depth + 1,
        }
    }
}

/// Final result of expanding one node
#[derive(Debug, Clone)]
pub enum NodeOutcome {
    Children {
        strategy: StrategyKind,
        children: Vec<ChildDescriptor>,
    },
    Flat {
        strategy: StrategyKind,
        labels: Vec<String>,
    },
    Leaf {
        strategy: Option<StrategyKind>,
        reason: LeafReason,
    },
    Failed {
        cause: NodeError,
    },
}

/// A node outcome plus the bookkeeping of how it was reached
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub outcome: NodeOutcome,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Node counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub expanded: usize,
    pub no_children: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.expanded + self.no_children + self.failed
    }
}

#[derive(Debug)]
struct ArenaNode {
    name: String,
    url: Option<String>,
    parent_path: Vec<String>,
    depth: u32,
    lineage: Arc<Vec<String>>,
    children: Vec<NodeId>,
    flat_categories: Option<Vec<String>>,
    status: NodeStatus,
    strategy: Option<StrategyKind>,
    leaf_reason: Option<LeafReason>,
    failure: Option<NodeFailure>,
    attempts: u32,
    elapsed: Duration,
}

impl ArenaNode {
    fn task(&self, id: NodeId) -> NodeTask {
        NodeTask {
            id,
            name: self.name.clone(),
            url: self.url.clone().unwrap_or_default(),
            parent_path: self.parent_path.clone(),
            depth: self.depth,
            lineage: Arc::clone(&self.lineage),
        }
    }
}

#[derive(Debug, Default)]
struct Arena {
    nodes: Vec<ArenaNode>,
    roots: Vec<NodeId>,
    /// Identities already placed: (normalized url, parent path)
    seen: HashSet<(String, Vec<String>)>,
}

/// Accumulates expansion results into the category tree
pub struct TreeAssembler {
    base: Url,
    max_depth: Option<u32>,
    inner: Mutex<Arena>,
}

impl TreeAssembler {
    /// Creates an empty assembler
    ///
    /// `base` resolves relative hrefs for cycle detection; nodes deeper than
    /// `max_depth` are kept as `NoChildren` leaves and never handed out.
    pub fn new(base: Url, max_depth: Option<u32>) -> Self {
        Self {
            base,
            max_depth,
            inner: Mutex::new(Arena::default()),
        }
    }

    fn arena(&self) -> MutexGuard<'_, Arena> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a top-level category at depth 1
    ///
    /// Returns `None` when a root with the same URL was already added.
    pub fn add_root(&self, name: &str, url: &str) -> Option<NodeTask> {
        let key = category_key(&self.base, url);
        let mut arena = self.arena();

        if !arena.seen.insert((key.clone(), Vec::new())) {
            tracing::debug!("Skipping duplicate root {} ({})", name, url);
            return None;
        }

        let id = NodeId(arena.nodes.len());
        arena.nodes.push(ArenaNode {
            name: name.to_string(),
            url: Some(url.to_string()),
            parent_path: Vec::new(),
            depth: 1,
            lineage: Arc::new(vec![key]),
            children: Vec::new(),
            flat_categories: None,
            status: NodeStatus::Pending,
            strategy: None,
            leaf_reason: None,
            failure: None,
            attempts: 0,
            elapsed: Duration::ZERO,
        });
        arena.roots.push(id);

        Some(arena.nodes[id.0].task(id))
    }

    /// Attaches a node's final outcome and returns the children to expand next
    ///
    /// Children whose URL repeats an ancestor become `NoChildren` leaves with
    /// [`LeafReason::CycleDetected`]; children that repeat a sibling's identity
    /// are dropped. Recording a node that is no longer `Pending` is ignored.
    pub fn record(&self, id: NodeId, record: NodeRecord) -> Vec<NodeTask> {
        let mut arena = self.arena();

        let Some(node) = arena.nodes.get(id.0) else {
            tracing::warn!("Ignoring result for unknown node {:?}", id);
            return Vec::new();
        };
        if node.status.is_terminal() {
            tracing::warn!(
                "Ignoring second result for {} (already {})",
                node.name,
                node.status
            );
            return Vec::new();
        }

        let mut ready = Vec::new();

        match record.outcome {
            NodeOutcome::Children { strategy, children } => {
                let child_ids = self.attach_children(&mut arena, id, children, &mut ready);
                let node = &mut arena.nodes[id.0];
                node.strategy = Some(strategy);
                if child_ids.is_empty() {
                    node.status = NodeStatus::NoChildren;
                    node.leaf_reason = Some(LeafReason::EmptyExtraction);
                } else {
                    node.status = NodeStatus::Expanded;
                    node.children = child_ids;
                }
            }
            NodeOutcome::Flat { strategy, labels } => {
                let node = &mut arena.nodes[id.0];
                node.strategy = Some(strategy);
                if labels.is_empty() {
                    node.status = NodeStatus::NoChildren;
                    node.leaf_reason = Some(LeafReason::EmptyExtraction);
                } else {
                    node.status = NodeStatus::Expanded;
                    node.flat_categories = Some(labels);
                }
            }
            NodeOutcome::Leaf { strategy, reason } => {
                let node = &mut arena.nodes[id.0];
                node.strategy = strategy;
                node.status = NodeStatus::NoChildren;
                node.leaf_reason = Some(reason);
            }
            NodeOutcome::Failed { cause } => {
                let node = &mut arena.nodes[id.0];
                node.status = NodeStatus::Failed;
                node.failure = Some(NodeFailure {
                    attempts: record.attempts,
                    cause,
                });
            }
        }

        let node = &mut arena.nodes[id.0];
        node.attempts = record.attempts;
        node.elapsed = record.elapsed;

        ready
    }

    fn attach_children(
        &self,
        arena: &mut Arena,
        parent: NodeId,
        children: Vec<ChildDescriptor>,
        ready: &mut Vec<NodeTask>,
    ) -> Vec<NodeId> {
        let parent_depth = arena.nodes[parent.0].depth;
        let parent_lineage = Arc::clone(&arena.nodes[parent.0].lineage);
        let mut ids = Vec::with_capacity(children.len());

        for child in children {
            let key = category_key(&self.base, &child.url);

            if !arena.seen.insert((key.clone(), child.parent_path.clone())) {
                tracing::debug!(
                    "Dropping repeated child {} under {}",
                    child.name,
                    child.parent_path.join(" / ")
                );
                continue;
            }

            let depth = parent_depth + 1;
            let cycle = parent_lineage.contains(&key);
            let too_deep = self.max_depth.is_some_and(|max| depth > max);

            let mut lineage = parent_lineage.as_ref().clone();
            lineage.push(key);

            let (status, leaf_reason) = if cycle {
                tracing::debug!("Cycle at {} ({}): forcing leaf", child.name, child.url);
                (NodeStatus::NoChildren, Some(LeafReason::CycleDetected))
            } else if too_deep {
                (NodeStatus::NoChildren, Some(LeafReason::DepthLimit))
            } else {
                (NodeStatus::Pending, None)
            };

            let id = NodeId(arena.nodes.len());
            arena.nodes.push(ArenaNode {
                name: child.name,
                url: Some(child.url),
                parent_path: child.parent_path,
                depth,
                lineage: Arc::new(lineage),
                children: Vec::new(),
                flat_categories: None,
                status,
                strategy: None,
                leaf_reason,
                failure: None,
                attempts: 0,
                elapsed: Duration::ZERO,
            });

            if status == NodeStatus::Pending {
                ready.push(arena.nodes[id.0].task(id));
            }
            ids.push(id);
        }

        ids
    }

    /// Returns the tree of nodes that are already in a terminal status
    ///
    /// Pending nodes (and therefore their empty subtrees) are left out, so
    /// this is safe to export while workers are still running.
    pub fn snapshot(&self) -> Vec<CategoryNode> {
        let arena = self.arena();
        arena
            .roots
            .iter()
            .filter_map(|id| build_node(&arena, *id))
            .collect()
    }

    /// Counts nodes by status
    pub fn counts(&self) -> StatusCounts {
        let arena = self.arena();
        let mut counts = StatusCounts::default();
        for node in &arena.nodes {
            match node.status {
                NodeStatus::Pending => counts.pending += 1,
                NodeStatus::Expanded => counts.expanded += 1,
                NodeStatus::NoChildren => counts.no_children += 1,
                NodeStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}

fn build_node(arena: &Arena, id: NodeId) -> Option<CategoryNode> {
    let node = &arena.nodes[id.0];
    if !node.status.is_terminal() {
        return None;
    }

    Some(CategoryNode {
        name: node.name.clone(),
        url: node.url.clone(),
        parent_path: node.parent_path.clone(),
        depth: node.depth,
        children: node
            .children
            .iter()
            .filter_map(|child| build_node(arena, *child))
            .collect(),
        flat_categories: node.flat_categories.clone(),
        status: node.status,
        strategy: node.strategy,
        leaf_reason: node.leaf_reason,
        failure: node.failure.clone(),
        attempts: node.attempts,
        elapsed: node.elapsed,
    })
}
