//! Category node definitions
//!
//! A [`CategoryNode`] is both the unit of work handed to a worker and the unit
//! of the exported tree.

use crate::crawler::StrategyKind;
use crate::NodeError;
use std::fmt;
use std::time::Duration;

/// Lifecycle state of a category node
///
/// A node leaves `Pending` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    /// Discovered, not yet attempted to completion
    Pending,

    /// Produced children or a flat category list
    Expanded,

    /// Terminal leaf; see [`LeafReason`] for why
    NoChildren,

    /// Every attempt failed
    Failed,
}

impl NodeStatus {
    /// Returns true if this node will not be touched again in this run
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Expanded => "expanded",
            Self::NoChildren => "no_children",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "expanded" => Some(Self::Expanded),
            "no_children" => Some(Self::NoChildren),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Why a node ended as a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafReason {
    /// No known layout marker was found on the page
    NoStructure,

    /// A layout matched but yielded no usable entries on every attempt
    EmptyExtraction,

    /// The node's URL repeats one of its ancestors
    CycleDetected,

    /// The node sits below the configured maximum depth
    DepthLimit,
}

impl LeafReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoStructure => "no_structure",
            Self::EmptyExtraction => "empty_extraction",
            Self::CycleDetected => "cycle_detected",
            Self::DepthLimit => "depth_limit",
        }
    }
}

impl fmt::Display for LeafReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A child category as read from its parent's page, before it joins the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildDescriptor {
    pub name: String,
    pub url: String,
    pub parent_path: Vec<String>,
    pub depth: u32,
}

/// Failure details kept on a node that ended `Failed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFailure {
    pub attempts: u32,
    pub cause: NodeError,
}

/// One category in the discovered tree
#[derive(Debug, Clone)]
pub struct CategoryNode {
    /// Display label, already cleaned
    pub name: String,

    /// Relative path to navigate to
    pub url: Option<String>,

    /// Ancestor names from the root down to this node's parent
    pub parent_path: Vec<String>,

    /// 1 for top-level categories, parent depth + 1 otherwise
    pub depth: u32,

    /// Child categories in page order
    pub children: Vec<CategoryNode>,

    /// Non-navigable labels harvested from a filter list, in observed order
    pub flat_categories: Option<Vec<String>>,

    pub status: NodeStatus,

    /// Strategy used by the final attempt, if the page was classified
    pub strategy: Option<StrategyKind>,

    /// Set when `status` is `NoChildren`
    pub leaf_reason: Option<LeafReason>,

    /// Set when `status` is `Failed`
    pub failure: Option<NodeFailure>,

    /// Attempts spent on this node
    pub attempts: u32,

    /// Wall time of all attempts, including retry delays
    pub elapsed: Duration,
}

impl CategoryNode {
    /// Full path including this node's own name
    pub fn path(&self) -> Vec<String> {
        let mut path = self.parent_path.clone();
        path.push(self.name.clone());
        path
    }

    /// Visits this node and all descendants depth-first, parents before children
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a CategoryNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Number of nodes in this subtree, this node included
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }

    /// Finds a descendant (or this node) by name path relative to this node
    pub fn find(&self, names: &[&str]) -> Option<&CategoryNode> {
        match names.split_first() {
            None => Some(self),
            Some((head, rest)) => self
                .children
                .iter()
                .find(|child| child.name == *head)
                .and_then(|child| child.find(rest)),
        }
    }
}
