//! Category tree model and run-scoped assembly
//!
//! # Components
//!
//! - `CategoryNode`: one category with its children or flat labels
//! - `NodeStatus` / `LeafReason`: lifecycle and leaf causes
//! - `TreeAssembler`: order-preserving accumulation of out-of-order results

mod assembler;
mod node;

pub use assembler::{NodeId, NodeOutcome, NodeRecord, NodeTask, StatusCounts, TreeAssembler};
pub use node::{CategoryNode, ChildDescriptor, LeafReason, NodeFailure, NodeStatus};
