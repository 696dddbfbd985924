//! Decoded rows and the per-node column lookups over them.

use super::errors::HydrationError;
use crate::join_tree::JoinNodeName;
use crate::mapping::binder::ColumnBinder;
use crate::mapping::table::{Column, ColumnId};
use crate::mapping::value::Value;
use crate::query_builder::QueryMapping;
use std::collections::HashMap;
use std::sync::Arc;

static NULL: Value = Value::Null;

/// One decoded result row: column alias -> value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: HashMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, alias: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(alias.into(), value.into());
        self
    }

    pub fn insert(&mut self, alias: impl Into<String>, value: Value) {
        self.values.insert(alias.into(), value);
    }

    pub fn get(&self, alias: &str) -> Option<&Value> {
        self.values.get(alias)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Decode raw driver cells through the alias binders. Cells absent from the
    /// raw row decode as null.
    pub fn decode(
        raw: &HashMap<String, Value>,
        binders: &HashMap<String, Arc<dyn ColumnBinder>>,
    ) -> Result<Row, HydrationError> {
        let mut values = HashMap::with_capacity(binders.len());
        for (alias, binder) in binders {
            let cell = raw.get(alias).unwrap_or(&NULL);
            let value = binder.read(cell).map_err(|source| HydrationError::Decode {
                alias: alias.clone(),
                source,
            })?;
            values.insert(alias.clone(), value);
        }
        Ok(Row { values })
    }
}

/// Reads the columns of one join node out of a row
#[derive(Debug, Clone)]
pub struct ColumnDecoder {
    node: JoinNodeName,
    aliases: Arc<HashMap<ColumnId, String>>,
}

impl ColumnDecoder {
    pub fn new(node: JoinNodeName, aliases: HashMap<ColumnId, String>) -> Self {
        Self {
            node,
            aliases: Arc::new(aliases),
        }
    }

    pub fn node_name(&self) -> &JoinNodeName {
        &self.node
    }

    pub fn alias_of(&self, column: &Column) -> Option<&str> {
        self.aliases.get(&column.id()).map(String::as_str)
    }

    /// Value of the column in this row; null when the node does not select it
    pub fn get<'r>(&self, row: &'r Row, column: &Column) -> &'r Value {
        self.alias_of(column)
            .and_then(|alias| row.get(alias))
            .unwrap_or(&NULL)
    }
}

/// Column lookups for every join node of one query
#[derive(Debug, Clone, Default)]
pub struct RowDecoder {
    nodes: HashMap<JoinNodeName, ColumnDecoder>,
}

impl RowDecoder {
    pub fn from_mapping(mapping: &QueryMapping) -> Self {
        let nodes = mapping
            .node_aliases
            .iter()
            .map(|(name, aliases)| (name.clone(), ColumnDecoder::new(name.clone(), aliases.clone())))
            .collect();
        Self { nodes }
    }

    pub fn known_nodes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.nodes.keys().map(|n| n.to_string()).collect();
        names.sort();
        names
    }

    pub fn decoder_for(&self, node: &JoinNodeName) -> Result<&ColumnDecoder, HydrationError> {
        self.nodes
            .get(node)
            .ok_or_else(|| HydrationError::UnknownJoinNode {
                name: node.to_string(),
                known: self.known_nodes(),
            })
    }

    pub fn get<'r>(
        &self,
        row: &'r Row,
        node: &JoinNodeName,
        column: &Column,
    ) -> Result<&'r Value, HydrationError> {
        Ok(self.decoder_for(node)?.get(row, column))
    }
}

/// The current row seen from one join node, with access to the other nodes
pub struct RowView<'a> {
    row: &'a Row,
    decoder: &'a ColumnDecoder,
    row_decoder: &'a RowDecoder,
}

impl<'a> RowView<'a> {
    pub(crate) fn new(row: &'a Row, decoder: &'a ColumnDecoder, row_decoder: &'a RowDecoder) -> Self {
        Self {
            row,
            decoder,
            row_decoder,
        }
    }

    pub fn row(&self) -> &'a Row {
        self.row
    }

    pub fn node_name(&self) -> &JoinNodeName {
        self.decoder.node_name()
    }

    /// Column of the node this view belongs to
    pub fn value(&self, column: &Column) -> &'a Value {
        self.decoder.get(self.row, column)
    }

    /// Column of any node of the query, located by node name
    pub fn value_of(&self, node: &JoinNodeName, column: &Column) -> Result<&'a Value, HydrationError> {
        self.row_decoder.get(self.row, node, column)
    }
}

/// Values of a passive join's columns for one row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnValues {
    values: Vec<(Column, Value)>,
}

impl ColumnValues {
    pub(crate) fn read(columns: &[Column], row: &Row, decoder: &ColumnDecoder) -> Self {
        Self {
            values: columns
                .iter()
                .map(|c| (c.clone(), decoder.get(row, c).clone()))
                .collect(),
        }
    }

    pub fn get(&self, column: &Column) -> Option<&Value> {
        self.values
            .iter()
            .find(|(c, _)| c.id() == column.id())
            .map(|(_, v)| v)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(c, _)| c.name() == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Column, &Value)> {
        self.values.iter().map(|(c, v)| (c, v))
    }
}
