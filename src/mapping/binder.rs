//! Column binders: decode driver cells into typed values and encode parameters.

use super::table::{Column, ColumnId};
use super::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BindError {
    #[error("Cannot convert {value:?} to {sql_type}")]
    Incompatible { value: Value, sql_type: SqlType },

    #[error("No binder registered for column '{column}' of type {sql_type}")]
    NoBinder { column: String, sql_type: SqlType },
}

/// Semantic type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    Integer,
    Float,
    Text,
    Boolean,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlType::Integer => "INTEGER",
            SqlType::Float => "FLOAT",
            SqlType::Text => "TEXT",
            SqlType::Boolean => "BOOLEAN",
        };
        write!(f, "{}", name)
    }
}

/// Reader/writer used for one column type
pub trait ColumnBinder: Send + Sync + fmt::Debug {
    fn sql_type(&self) -> SqlType;

    /// Decode a raw cell coming from the driver
    fn read(&self, raw: &Value) -> Result<Value, BindError>;

    /// Encode a value bound as a statement parameter
    fn write(&self, value: &Value) -> Result<Value, BindError> {
        self.read(value)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IntegerBinder;

impl ColumnBinder for IntegerBinder {
    fn sql_type(&self) -> SqlType {
        SqlType::Integer
    }

    fn read(&self, raw: &Value) -> Result<Value, BindError> {
        match raw {
            Value::Null => Ok(Value::Null),
            Value::Integer(i) => Ok(Value::Integer(*i)),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Ok(Value::Integer(*f as i64)),
            Value::Text(s) => s.trim().parse::<i64>().map(Value::Integer).map_err(|_| {
                BindError::Incompatible {
                    value: raw.clone(),
                    sql_type: SqlType::Integer,
                }
            }),
            _ => Err(BindError::Incompatible {
                value: raw.clone(),
                sql_type: SqlType::Integer,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FloatBinder;

impl ColumnBinder for FloatBinder {
    fn sql_type(&self) -> SqlType {
        SqlType::Float
    }

    fn read(&self, raw: &Value) -> Result<Value, BindError> {
        match raw {
            Value::Null => Ok(Value::Null),
            Value::Float(f) => Ok(Value::Float(*f)),
            Value::Integer(i) => Ok(Value::Float(*i as f64)),
            Value::Text(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                BindError::Incompatible {
                    value: raw.clone(),
                    sql_type: SqlType::Float,
                }
            }),
            Value::Boolean(_) => Err(BindError::Incompatible {
                value: raw.clone(),
                sql_type: SqlType::Float,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextBinder;

impl ColumnBinder for TextBinder {
    fn sql_type(&self) -> SqlType {
        SqlType::Text
    }

    fn read(&self, raw: &Value) -> Result<Value, BindError> {
        match raw {
            Value::Null => Ok(Value::Null),
            Value::Text(s) => Ok(Value::Text(s.clone())),
            other => Ok(Value::Text(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BooleanBinder;

impl ColumnBinder for BooleanBinder {
    fn sql_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn read(&self, raw: &Value) -> Result<Value, BindError> {
        match raw {
            Value::Null => Ok(Value::Null),
            Value::Boolean(b) => Ok(Value::Boolean(*b)),
            Value::Integer(0) => Ok(Value::Boolean(false)),
            Value::Integer(1) => Ok(Value::Boolean(true)),
            Value::Text(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Boolean(true)),
            Value::Text(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Boolean(false)),
            _ => Err(BindError::Incompatible {
                value: raw.clone(),
                sql_type: SqlType::Boolean,
            }),
        }
    }
}

/// Maps column types (and optionally single columns) to binders
#[derive(Debug, Clone)]
pub struct ColumnBinderRegistry {
    by_type: HashMap<SqlType, Arc<dyn ColumnBinder>>,
    by_column: HashMap<ColumnId, Arc<dyn ColumnBinder>>,
}

impl Default for ColumnBinderRegistry {
    fn default() -> Self {
        let mut by_type: HashMap<SqlType, Arc<dyn ColumnBinder>> = HashMap::new();
        by_type.insert(SqlType::Integer, Arc::new(IntegerBinder));
        by_type.insert(SqlType::Float, Arc::new(FloatBinder));
        by_type.insert(SqlType::Text, Arc::new(TextBinder));
        by_type.insert(SqlType::Boolean, Arc::new(BooleanBinder));
        Self {
            by_type,
            by_column: HashMap::new(),
        }
    }
}

impl ColumnBinderRegistry {
    /// Registry without any binder
    pub fn empty() -> Self {
        Self {
            by_type: HashMap::new(),
            by_column: HashMap::new(),
        }
    }

    pub fn register_type(&mut self, binder: Arc<dyn ColumnBinder>) {
        self.by_type.insert(binder.sql_type(), binder);
    }

    /// Override the binder of one specific column
    pub fn register_column(&mut self, column: &Column, binder: Arc<dyn ColumnBinder>) {
        self.by_column.insert(column.id(), binder);
    }

    pub fn binder_for(&self, column: &Column) -> Result<Arc<dyn ColumnBinder>, BindError> {
        self.by_column
            .get(&column.id())
            .or_else(|| self.by_type.get(&column.sql_type()))
            .cloned()
            .ok_or_else(|| BindError::NoBinder {
                column: column.to_string(),
                sql_type: column.sql_type(),
            })
    }
}
