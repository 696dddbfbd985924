//! Query execution seam: the crate hands SQL and parameters to a
//! [`SqlExecutor`] and reads rows back from a forward-only [`ResultSet`].

use crate::mapping::value::Value;
use crate::query_builder::PreparedStatement;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use thiserror::Error;

/// Raw driver row: column label -> undecoded cell
pub type RawRow = HashMap<String, Value>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutorError {
    #[error("Statement rejected: {0}")]
    Rejected(String),

    #[error("Cursor failure: {0}")]
    Cursor(String),
}

/// Forward-only cursor over raw rows
pub struct ResultSet {
    rows: Box<dyn Iterator<Item = Result<RawRow, ExecutorError>>>,
}

impl ResultSet {
    pub fn new(rows: impl Iterator<Item = Result<RawRow, ExecutorError>> + 'static) -> Self {
        Self {
            rows: Box::new(rows),
        }
    }

    pub fn from_rows(rows: Vec<RawRow>) -> Self {
        Self::new(rows.into_iter().map(Ok))
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }
}

impl Iterator for ResultSet {
    type Item = Result<RawRow, ExecutorError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResultSet")
    }
}

pub trait SqlExecutor {
    fn execute(&self, statement: &PreparedStatement) -> Result<ResultSet, ExecutorError>;
}

/// Executor answering every statement with the same preset rows
#[derive(Debug, Default)]
pub struct InMemoryExecutor {
    rows: Vec<RawRow>,
    executed: Mutex<Vec<PreparedStatement>>,
}

impl InMemoryExecutor {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self {
            rows,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Read rows from a JSON array of `{ "alias": scalar }` objects
    pub fn from_json(json: &serde_json::Value) -> Result<Self, ExecutorError> {
        let array = json
            .as_array()
            .ok_or_else(|| ExecutorError::Rejected("rows must be a JSON array".to_string()))?;
        let mut rows = Vec::with_capacity(array.len());
        for (index, item) in array.iter().enumerate() {
            let object = item.as_object().ok_or_else(|| {
                ExecutorError::Rejected(format!("row {} is not a JSON object", index))
            })?;
            let mut row = RawRow::with_capacity(object.len());
            for (label, cell) in object {
                let value = Value::from_json(cell).ok_or_else(|| {
                    ExecutorError::Rejected(format!(
                        "row {} column '{}' is not a scalar",
                        index, label
                    ))
                })?;
                row.insert(label.clone(), value);
            }
            rows.push(row);
        }
        Ok(Self::new(rows))
    }

    /// Statements executed so far
    pub fn executed(&self) -> Vec<PreparedStatement> {
        match self.executed.lock() {
            Ok(executed) => executed.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SqlExecutor for InMemoryExecutor {
    fn execute(&self, statement: &PreparedStatement) -> Result<ResultSet, ExecutorError> {
        match self.executed.lock() {
            Ok(mut executed) => executed.push(statement.clone()),
            Err(poisoned) => poisoned.into_inner().push(statement.clone()),
        }
        Ok(ResultSet::from_rows(self.rows.clone()))
    }
}
