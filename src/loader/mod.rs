//! Top-level load operation: build a tree's select once, run it through a
//! [`SqlExecutor`], decode the raw cells and hydrate them into beans.

pub mod errors;
pub mod executor;
mod graph_loader;

pub use errors::LoadError;
pub use executor::{ExecutorError, InMemoryExecutor, RawRow, ResultSet, SqlExecutor};
pub use graph_loader::EntityGraphLoader;
