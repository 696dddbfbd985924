//! # Query Builder
//!
//! Renders a join tree as one flat select. Every node contributes its
//! selectable columns and one join clause; column aliases are derived from the
//! node's table alias so that the hydrator can read each node's columns back
//! even when a table is joined several times.

mod builder;
pub mod errors;
pub mod select;

pub use builder::{build_select_query, where_root_identifier_in, QueryMapping};
pub use errors::QueryBuildError;
pub use select::{
    ColumnRef, FromClause, JoinClause, PreparedStatement, Query, SelectItem, ToSql, WhereInClause,
};
