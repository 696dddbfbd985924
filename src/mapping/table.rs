//! Table and column model.
//!
//! Columns carry a process-unique [`ColumnId`]. Cloning a [`Column`] value keeps
//! its id (it is a handle to the same column), while [`Table::clone_table`]
//! creates a distinct table whose columns get fresh ids. Maps that must tell
//! two clones of one table apart key on [`ColumnId`], never on names.

use super::binder::SqlType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_COLUMN_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnId(u64);

impl ColumnId {
    fn next() -> Self {
        ColumnId(NEXT_COLUMN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(u64);

impl TableId {
    fn next() -> Self {
        TableId(NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    id: ColumnId,
    table_name: String,
    name: String,
    sql_type: SqlType,
    primary_key: bool,
}

impl Column {
    pub fn id(&self) -> ColumnId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table_name, self.name)
    }
}

/// A relational table. Shared between join nodes through `Arc<Table>`.
#[derive(Debug, PartialEq, Eq)]
pub struct Table {
    id: TableId,
    name: String,
    columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TableId::next(),
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column and return a handle to it
    pub fn add_column(&mut self, name: impl Into<String>, sql_type: SqlType) -> Column {
        self.push_column(name.into(), sql_type, false)
    }

    /// Add a primary key column and return a handle to it
    pub fn add_primary_key(&mut self, name: impl Into<String>, sql_type: SqlType) -> Column {
        self.push_column(name.into(), sql_type, true)
    }

    fn push_column(&mut self, name: String, sql_type: SqlType, primary_key: bool) -> Column {
        let column = Column {
            id: ColumnId::next(),
            table_name: self.name.clone(),
            name,
            sql_type,
            primary_key,
        };
        self.columns.push(column.clone());
        column
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> Vec<Column> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .cloned()
            .collect()
    }

    /// Create a structurally identical table with fresh table and column ids.
    /// Used to join the same table twice (self-referencing relations).
    pub fn clone_table(&self) -> Table {
        let mut clone = Table::new(self.name.clone());
        for column in &self.columns {
            clone.push_column(column.name.clone(), column.sql_type, column.primary_key);
        }
        clone
    }

    pub fn into_shared(self) -> Arc<Table> {
        Arc::new(self)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
