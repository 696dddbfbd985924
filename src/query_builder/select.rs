//! Flat select statement model and its SQL rendering.

use crate::join_tree::JoinType;
use crate::mapping::value::Value;
use serde::Serialize;

pub trait ToSql {
    fn to_sql(&self) -> String;
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct SelectItem {
    pub table_alias: String,
    pub column: String,
    pub col_alias: String,
}

impl ToSql for SelectItem {
    fn to_sql(&self) -> String {
        format!("{}.{} AS {}", self.table_alias, self.column, self.col_alias)
    }
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct FromClause {
    pub table_name: String,
    pub table_alias: String,
}

impl ToSql for FromClause {
    fn to_sql(&self) -> String {
        format!("FROM {}", table_reference(&self.table_name, &self.table_alias))
    }
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct ColumnRef {
    pub table_alias: String,
    pub column: String,
}

impl ToSql for ColumnRef {
    fn to_sql(&self) -> String {
        format!("{}.{}", self.table_alias, self.column)
    }
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct JoinClause {
    pub table_name: String,
    pub table_alias: String,
    pub join_type: JoinType,
    pub left: ColumnRef,
    pub right: ColumnRef,
}

impl ToSql for JoinClause {
    fn to_sql(&self) -> String {
        let keyword = match self.join_type {
            JoinType::Inner => "INNER JOIN",
            JoinType::Outer => "LEFT OUTER JOIN",
        };
        format!(
            "{} {} ON {} = {}",
            keyword,
            table_reference(&self.table_name, &self.table_alias),
            self.left.to_sql(),
            self.right.to_sql()
        )
    }
}

/// `column IN (?, ...)`, or the tuple form for composite keys
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct WhereInClause {
    pub columns: Vec<ColumnRef>,
    pub tuple_count: usize,
}

impl ToSql for WhereInClause {
    fn to_sql(&self) -> String {
        let placeholder = if self.columns.len() == 1 {
            "?".to_string()
        } else {
            format!("({})", vec!["?"; self.columns.len()].join(", "))
        };
        let target = if self.columns.len() == 1 {
            self.columns[0].to_sql()
        } else {
            let cols: Vec<String> = self.columns.iter().map(ToSql::to_sql).collect();
            format!("({})", cols.join(", "))
        };
        format!(
            "WHERE {} IN ({})",
            target,
            vec![placeholder; self.tuple_count].join(", ")
        )
    }
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Query {
    pub select: Vec<SelectItem>,
    pub from: FromClause,
    pub joins: Vec<JoinClause>,
    pub where_in: Option<WhereInClause>,
}

impl ToSql for Query {
    fn to_sql(&self) -> String {
        let select: Vec<String> = self.select.iter().map(ToSql::to_sql).collect();
        let mut sql = format!("SELECT {} {}", select.join(", "), self.from.to_sql());
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.to_sql());
        }
        if let Some(where_in) = &self.where_in {
            sql.push(' ');
            sql.push_str(&where_in.to_sql());
        }
        sql
    }
}

/// SQL text plus positional parameters already encoded by their binders
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct PreparedStatement {
    pub sql: String,
    pub parameters: Vec<Value>,
}

impl PreparedStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }
}

fn table_reference(name: &str, alias: &str) -> String {
    if name == alias {
        name.to_string()
    } else {
        format!("{} AS {}", name, alias)
    }
}
