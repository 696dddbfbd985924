//! # Join Tree
//!
//! The join tree describes how one root entity and its related entities are
//! fetched by a single select: every node is one SQL join and knows what to
//! build (or complete) from the columns it adds to the select clause.
//!
//! Trees are built once by mapping configuration and then treated as
//! read-only: query building and hydration only borrow them.

pub mod errors;
pub mod node;
mod tree;

pub use errors::JoinTreeError;
pub use node::{
    JoinKind, JoinLink, JoinNode, JoinNodeName, JoinType, MergeJoin, MergeJoinSpec, NodeId,
    PassiveJoin, PassiveJoinSpec, RelationJoin, RelationJoinSpec, RootJoin,
};
pub use tree::{BreadthFirst, JoinTree};
