//! YAML mapping configuration.
//!
//! A mapping declares tables, the entities read from them and the join tree
//! rooted at one entity:
//!
//! ```yaml
//! tables:
//!   - name: Order
//!     columns:
//!       - { name: id, type: integer, primary_key: true }
//!       - { name: label, type: text }
//!   - name: LineItem
//!     columns:
//!       - { name: id, type: integer, primary_key: true }
//!       - { name: orderId, type: integer }
//! entities:
//!   - { name: Order, table: Order }
//!   - name: LineItem
//!     table: LineItem
//!     properties: { order_id: orderId }
//! root: Order
//! joins:
//!   - type: relation
//!     label: lines
//!     parent: root
//!     entity: LineItem
//!     left: id
//!     right: orderId
//!     collection: lines
//!     back_reference: order
//! ```
//!
//! Entities default to their table's primary key as identifier and to one
//! property per column. Joins reference their parent by label, `root` being
//! the root node; a join must come after its parent in the list.

use super::binder::SqlType;
use super::errors::MappingError;
use super::inflater::{RecordInflater, RecordMerger};
use super::relation::RelationFixer;
use super::table::{Column, Table};
use crate::join_tree::{
    JoinNodeName, JoinTree, JoinType, MergeJoinSpec, PassiveJoinSpec, RelationJoinSpec,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use validator::Validate;

/// Label of the root node in `parent` references
pub const ROOT_LABEL: &str = "root";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MappingConfig {
    #[validate(length(min = 1, message = "at least one table is required"), nested)]
    pub tables: Vec<TableConfig>,

    #[validate(length(min = 1, message = "at least one entity is required"), nested)]
    pub entities: Vec<EntityConfig>,

    /// Entity at the root of the join tree
    #[validate(length(min = 1, message = "root entity cannot be empty"))]
    pub root: String,

    #[serde(default)]
    pub root_alias: Option<String>,

    #[serde(default)]
    pub joins: Vec<JoinConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TableConfig {
    #[validate(length(min = 1, message = "table name cannot be empty"))]
    pub name: String,

    #[validate(length(min = 1, message = "a table needs at least one column"))]
    pub columns: Vec<ColumnConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: SqlType,
    #[serde(default)]
    pub primary_key: bool,
}

/// Single or composite identifier columns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum IdentifierConfig {
    Single(String),
    Composite(Vec<String>),
}

impl IdentifierConfig {
    pub fn columns(&self) -> Vec<&str> {
        match self {
            IdentifierConfig::Single(column) => vec![column.as_str()],
            IdentifierConfig::Composite(columns) => columns.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EntityConfig {
    #[validate(length(min = 1, message = "entity name cannot be empty"))]
    pub name: String,
    pub table: String,
    #[serde(default)]
    pub id: Option<IdentifierConfig>,
    /// property -> column; all columns when absent
    #[serde(default)]
    pub properties: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JoinConfig {
    Relation(RelationJoinConfig),
    Merge(MergeJoinConfig),
    Passive(PassiveJoinConfig),
}

impl JoinConfig {
    pub fn label(&self) -> &str {
        match self {
            JoinConfig::Relation(join) => &join.label,
            JoinConfig::Merge(join) => &join.label,
            JoinConfig::Passive(join) => &join.label,
        }
    }

    pub fn parent(&self) -> &str {
        match self {
            JoinConfig::Relation(join) => &join.parent,
            JoinConfig::Merge(join) => &join.parent,
            JoinConfig::Passive(join) => &join.parent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationJoinConfig {
    pub label: String,
    pub parent: String,
    pub entity: String,
    pub left: String,
    pub right: String,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub property: Option<String>,
    #[serde(default)]
    pub back_reference: Option<String>,
    #[serde(default = "default_outer")]
    pub join_type: JoinType,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub exclude_from_ddl: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeJoinConfig {
    pub label: String,
    pub parent: String,
    pub table: String,
    pub left: String,
    pub right: String,
    /// property -> column; all non key columns when absent
    #[serde(default)]
    pub properties: Option<HashMap<String, String>>,
    #[serde(default = "default_inner")]
    pub join_type: JoinType,
    #[serde(default)]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassiveJoinConfig {
    pub label: String,
    pub parent: String,
    pub table: String,
    pub left: String,
    pub right: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default = "default_outer")]
    pub join_type: JoinType,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub exclude_from_ddl: bool,
}

fn default_outer() -> JoinType {
    JoinType::Outer
}

fn default_inner() -> JoinType {
    JoinType::Inner
}

/// A built mapping: shared tables, the join tree and the node name behind
/// each join label
#[derive(Debug)]
pub struct Mapping {
    pub tables: HashMap<String, Arc<Table>>,
    pub tree: JoinTree,
    pub labels: HashMap<String, JoinNodeName>,
}

impl Mapping {
    pub fn node(&self, label: &str) -> Option<&JoinNodeName> {
        self.labels.get(label)
    }
}

impl MappingConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, MappingError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, MappingError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn build(&self) -> Result<Mapping, MappingError> {
        let tables = self.build_tables()?;
        let entities: HashMap<&str, &EntityConfig> =
            self.entities.iter().map(|e| (e.name.as_str(), e)).collect();

        let root_entity = lookup_entity(&entities, &self.root)?;
        let root_table = lookup_table(&tables, &root_entity.table)?;
        let mut tree = JoinTree::new(
            Arc::clone(root_table),
            Arc::new(record_inflater(root_entity, root_table)?),
            self.root_alias.clone(),
        );

        let mut labels = HashMap::new();
        labels.insert(ROOT_LABEL.to_string(), JoinNodeName::root());

        for join in &self.joins {
            if labels.contains_key(join.label()) {
                return Err(MappingError::DuplicateLabel {
                    label: join.label().to_string(),
                });
            }
            let parent = labels
                .get(join.parent())
                .cloned()
                .ok_or_else(|| MappingError::UnknownParent {
                    label: join.label().to_string(),
                    parent: join.parent().to_string(),
                })?;
            let parent_table = Arc::clone(tree.node(&parent).map(|n| n.table()).ok_or_else(
                || MappingError::UnknownParent {
                    label: join.label().to_string(),
                    parent: join.parent().to_string(),
                },
            )?);

            let name = match join {
                JoinConfig::Relation(relation) => {
                    let entity = lookup_entity(&entities, &relation.entity)?;
                    let table = &table_for_join(&tree, lookup_table(&tables, &entity.table)?);
                    let mut spec = RelationJoinSpec::new(
                        Arc::clone(table),
                        Arc::new(record_inflater(entity, table)?),
                        lookup_column(&parent_table, &relation.left)?,
                        lookup_column(table, &relation.right)?,
                        relation_fixer(relation)?,
                    )
                    .join_type(relation.join_type);
                    if let Some(alias) = &relation.alias {
                        spec = spec.alias(alias.clone());
                    }
                    let name = tree.add_relation_join(&parent, spec)?;
                    if relation.exclude_from_ddl {
                        tree.mark_excluded_from_ddl(&name)?;
                    }
                    name
                }
                JoinConfig::Merge(merge) => {
                    let table = &table_for_join(&tree, lookup_table(&tables, &merge.table)?);
                    let merger = match &merge.properties {
                        Some(properties) => RecordMerger::new(property_columns(table, properties)?),
                        None => RecordMerger::for_table(table),
                    };
                    let mut spec = MergeJoinSpec::new(
                        Arc::clone(table),
                        Arc::new(merger),
                        lookup_column(&parent_table, &merge.left)?,
                        lookup_column(table, &merge.right)?,
                    )
                    .join_type(merge.join_type);
                    if let Some(alias) = &merge.alias {
                        spec = spec.alias(alias.clone());
                    }
                    tree.add_merge_join(&parent, spec)?
                }
                JoinConfig::Passive(passive) => {
                    let table = &table_for_join(&tree, lookup_table(&tables, &passive.table)?);
                    let columns = passive
                        .columns
                        .iter()
                        .map(|column| lookup_column(table, column))
                        .collect::<Result<Vec<_>, _>>()?;
                    let mut spec = PassiveJoinSpec::new(
                        Arc::clone(table),
                        lookup_column(&parent_table, &passive.left)?,
                        lookup_column(table, &passive.right)?,
                    )
                    .join_type(passive.join_type)
                    .columns(columns);
                    if let Some(alias) = &passive.alias {
                        spec = spec.alias(alias.clone());
                    }
                    let name = tree.add_passive_join(&parent, spec)?;
                    if passive.exclude_from_ddl {
                        tree.mark_excluded_from_ddl(&name)?;
                    }
                    name
                }
            };
            log::debug!("Mapped join '{}' as node {}", join.label(), name);
            labels.insert(join.label().to_string(), name);
        }

        Ok(Mapping {
            tables,
            tree,
            labels,
        })
    }

    fn build_tables(&self) -> Result<HashMap<String, Arc<Table>>, MappingError> {
        let mut tables = HashMap::with_capacity(self.tables.len());
        for config in &self.tables {
            let mut table = Table::new(config.name.clone());
            for column in &config.columns {
                if column.primary_key {
                    table.add_primary_key(column.name.clone(), column.sql_type);
                } else {
                    table.add_column(column.name.clone(), column.sql_type);
                }
            }
            if tables
                .insert(config.name.clone(), table.into_shared())
                .is_some()
            {
                return Err(MappingError::DuplicateTable {
                    name: config.name.clone(),
                });
            }
        }
        Ok(tables)
    }
}

fn lookup_entity<'c>(
    entities: &HashMap<&str, &'c EntityConfig>,
    name: &str,
) -> Result<&'c EntityConfig, MappingError> {
    entities
        .get(name)
        .copied()
        .ok_or_else(|| MappingError::UnknownEntity {
            name: name.to_string(),
        })
}

fn lookup_table<'t>(
    tables: &'t HashMap<String, Arc<Table>>,
    name: &str,
) -> Result<&'t Arc<Table>, MappingError> {
    tables.get(name).ok_or_else(|| MappingError::UnknownTable {
        name: name.to_string(),
    })
}

/// The table a new join reads; a table already read by a node of `tree` is
/// cloned so every node owns distinct columns
fn table_for_join(tree: &JoinTree, table: &Arc<Table>) -> Arc<Table> {
    if tree.iter_breadth_first().any(|node| node.table().id() == table.id()) {
        log::debug!("Table {} already joined, reading it through a clone", table.name());
        table.clone_table().into_shared()
    } else {
        Arc::clone(table)
    }
}

fn lookup_column(table: &Table, name: &str) -> Result<Column, MappingError> {
    table
        .find_column(name)
        .cloned()
        .ok_or_else(|| MappingError::UnknownColumn {
            table: table.name().to_string(),
            column: name.to_string(),
        })
}

/// Property/column pairs sorted by property name
fn property_columns(
    table: &Table,
    properties: &HashMap<String, String>,
) -> Result<Vec<(String, Column)>, MappingError> {
    let mut pairs = properties
        .iter()
        .map(|(property, column)| Ok((property.clone(), lookup_column(table, column)?)))
        .collect::<Result<Vec<_>, MappingError>>()?;
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(pairs)
}

fn record_inflater(entity: &EntityConfig, table: &Table) -> Result<RecordInflater, MappingError> {
    let identifier = match &entity.id {
        Some(id) => id
            .columns()
            .into_iter()
            .map(|column| lookup_column(table, column))
            .collect::<Result<Vec<_>, _>>()?,
        None => table.primary_key(),
    };
    let properties = match &entity.properties {
        Some(properties) => property_columns(table, properties)?,
        None => table
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.clone()))
            .collect(),
    };
    Ok(RecordInflater::new(entity.name.clone(), identifier, properties))
}

fn relation_fixer(relation: &RelationJoinConfig) -> Result<RelationFixer, MappingError> {
    let fixer = match (&relation.collection, &relation.property) {
        (Some(collection), None) => RelationFixer::to_collection(collection.clone()),
        (None, Some(property)) => RelationFixer::to_property(property.clone()),
        _ => {
            return Err(MappingError::AmbiguousFixer {
                label: relation.label.clone(),
            })
        }
    };
    Ok(match &relation.back_reference {
        Some(back_reference) => fixer.with_back_reference(back_reference.clone()),
        None => fixer,
    })
}
