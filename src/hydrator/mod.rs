//! # Hydrator
//!
//! Rebuilds the object graph from the flat rows of a join tree select.
//!
//! Each row is consumed top-down along a consumer tree that mirrors the join
//! tree. A per-call [`TreeInflationContext`] guarantees at most one bean per
//! (type, identifier) and at most one wiring per relation edge, however often
//! one-to-many fan-out repeats them in the result.

mod consumer;
pub mod context;
pub mod errors;
pub mod row;
mod tree_inflater;

pub use context::{RelationIdentifier, TreatedRelation, TreeInflationContext};
pub use errors::HydrationError;
pub use row::{ColumnDecoder, ColumnValues, Row, RowDecoder, RowView};
pub use tree_inflater::TreeInflater;
