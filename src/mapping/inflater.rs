//! Row-to-bean contracts supplied by the mapping layer, and record-based
//! implementations of them.

use super::entity::{Entity, EntityRef};
use super::table::{Column, Table};
use super::value::EntityIdentifier;
use crate::hydrator::errors::HydrationError;
use crate::hydrator::row::{ColumnDecoder, Row};
use std::fmt;
use std::sync::Arc;

/// Builds or completes beans from rows, bound to one join node's column aliases
pub trait RowTransformer: Send + Sync {
    /// Create a new bean from the row
    fn transform(&self, row: &Row) -> Result<EntityRef, HydrationError>;

    /// Copy the row's values onto an existing bean
    fn apply_row_to_bean(&self, row: &Row, bean: &EntityRef) -> Result<(), HydrationError>;
}

/// Knows how to identify and build beans of one mapped entity type
pub trait EntityInflater: Send + Sync + fmt::Debug {
    fn entity_type(&self) -> &str;

    /// Identifier of the bean carried by this row, `None` if the row has none
    /// (typically an outer join without match)
    fn extract_identifier(&self, row: &Row, decoder: &ColumnDecoder) -> Option<EntityIdentifier>;

    /// Columns the identifier is read from, in identifier order
    fn identifier_columns(&self) -> &[Column];

    fn row_transformer(&self, decoder: ColumnDecoder) -> Box<dyn RowTransformer>;

    fn selectable_columns(&self) -> Vec<Column>;
}

/// Completes an existing bean with columns of another table (inheritance, secondary tables)
pub trait EntityMerger: Send + Sync + fmt::Debug {
    fn row_transformer(&self, decoder: ColumnDecoder) -> Box<dyn RowTransformer>;

    fn selectable_columns(&self) -> Vec<Column>;
}

#[derive(Debug, Clone)]
struct RecordShape {
    entity_type: String,
    identifier: Vec<Column>,
    properties: Vec<(String, Column)>,
}

impl RecordShape {
    fn identifier(&self, row: &Row, decoder: &ColumnDecoder) -> Option<EntityIdentifier> {
        let values = self
            .identifier
            .iter()
            .map(|column| decoder.get(row, column).clone())
            .collect();
        EntityIdentifier::from_values(values)
    }

    fn apply(&self, row: &Row, decoder: &ColumnDecoder, entity: &mut Entity) {
        for (property, column) in &self.properties {
            entity.set_property(property.clone(), decoder.get(row, column).clone());
        }
    }
}

/// Inflater producing [`Entity`] records: one property per mapped column
#[derive(Debug, Clone)]
pub struct RecordInflater {
    shape: Arc<RecordShape>,
}

impl RecordInflater {
    /// Map every column of the table to a same-named property, identified by
    /// the table's primary key
    pub fn for_table(entity_type: impl Into<String>, table: &Table) -> Self {
        Self::new(
            entity_type,
            table.primary_key(),
            table
                .columns()
                .iter()
                .map(|c| (c.name().to_string(), c.clone()))
                .collect(),
        )
    }

    pub fn new(
        entity_type: impl Into<String>,
        identifier: Vec<Column>,
        properties: Vec<(String, Column)>,
    ) -> Self {
        Self {
            shape: Arc::new(RecordShape {
                entity_type: entity_type.into(),
                identifier,
                properties,
            }),
        }
    }
}

impl EntityInflater for RecordInflater {
    fn entity_type(&self) -> &str {
        &self.shape.entity_type
    }

    fn extract_identifier(&self, row: &Row, decoder: &ColumnDecoder) -> Option<EntityIdentifier> {
        self.shape.identifier(row, decoder)
    }

    fn identifier_columns(&self) -> &[Column] {
        &self.shape.identifier
    }

    fn row_transformer(&self, decoder: ColumnDecoder) -> Box<dyn RowTransformer> {
        Box::new(RecordRowTransformer {
            shape: Arc::clone(&self.shape),
            decoder,
        })
    }

    fn selectable_columns(&self) -> Vec<Column> {
        let mut columns: Vec<Column> = self.shape.identifier.clone();
        for (_, column) in &self.shape.properties {
            if !columns.iter().any(|c| c.id() == column.id()) {
                columns.push(column.clone());
            }
        }
        columns
    }
}

/// Merger copying mapped columns onto an already built [`Entity`]
#[derive(Debug, Clone)]
pub struct RecordMerger {
    shape: Arc<RecordShape>,
}

impl RecordMerger {
    pub fn new(properties: Vec<(String, Column)>) -> Self {
        Self {
            shape: Arc::new(RecordShape {
                entity_type: String::new(),
                identifier: Vec::new(),
                properties,
            }),
        }
    }

    /// Map every non primary key column of the table to a same-named property
    pub fn for_table(table: &Table) -> Self {
        Self::new(
            table
                .columns()
                .iter()
                .filter(|c| !c.is_primary_key())
                .map(|c| (c.name().to_string(), c.clone()))
                .collect(),
        )
    }
}

impl EntityMerger for RecordMerger {
    fn row_transformer(&self, decoder: ColumnDecoder) -> Box<dyn RowTransformer> {
        Box::new(RecordRowTransformer {
            shape: Arc::clone(&self.shape),
            decoder,
        })
    }

    fn selectable_columns(&self) -> Vec<Column> {
        self.shape
            .properties
            .iter()
            .map(|(_, column)| column.clone())
            .collect()
    }
}

struct RecordRowTransformer {
    shape: Arc<RecordShape>,
    decoder: ColumnDecoder,
}

impl RowTransformer for RecordRowTransformer {
    fn transform(&self, row: &Row) -> Result<EntityRef, HydrationError> {
        let identifier = self.shape.identifier(row, &self.decoder).ok_or_else(|| {
            HydrationError::RowTransform {
                entity_type: self.shape.entity_type.clone(),
                message: "row carries no identifier".to_string(),
            }
        })?;
        let mut entity = Entity::new(self.shape.entity_type.clone()).with_identifier(identifier);
        self.shape.apply(row, &self.decoder, &mut entity);
        Ok(EntityRef::new(entity))
    }

    fn apply_row_to_bean(&self, row: &Row, bean: &EntityRef) -> Result<(), HydrationError> {
        let mut entity = bean
            .try_borrow_mut()
            .map_err(|_| HydrationError::RowTransform {
                entity_type: self.shape.entity_type.clone(),
                message: "bean is already borrowed".to_string(),
            })?;
        self.shape.apply(row, &self.decoder, &mut entity);
        Ok(())
    }
}
