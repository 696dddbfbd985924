use super::errors::QueryBuildError;
use super::select::{
    ColumnRef, FromClause, JoinClause, PreparedStatement, Query, SelectItem, ToSql, WhereInClause,
};
use crate::join_tree::{JoinLink, JoinNode, JoinNodeName, JoinTree};
use crate::mapping::binder::{ColumnBinder, ColumnBinderRegistry};
use crate::mapping::table::{Column, ColumnId};
use crate::mapping::value::EntityIdentifier;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Select statement of a join tree plus the alias metadata needed to read
/// its rows back.
///
/// Aliases follow a table-per-node scheme: a node's table alias is its
/// explicit alias or its table name (suffixed when already taken), and each
/// column alias is `<table alias>_<column name>`. Lookups must go through
/// `node_aliases`, keyed by node name, because two nodes may select columns of
/// the same table.
#[derive(Debug, Clone)]
pub struct QueryMapping {
    pub query: Query,
    /// Column alias -> binder reading it
    pub column_binders: HashMap<String, Arc<dyn ColumnBinder>>,
    /// Column identity -> alias, first occurrence wins
    pub column_aliases: HashMap<ColumnId, String>,
    /// Join node -> (column identity -> alias)
    pub node_aliases: HashMap<JoinNodeName, HashMap<ColumnId, String>>,
    pub table_aliases: HashMap<JoinNodeName, String>,
}

impl QueryMapping {
    pub fn alias_of(&self, node: &JoinNodeName, column: &Column) -> Option<&str> {
        self.node_aliases
            .get(node)
            .and_then(|aliases| aliases.get(&column.id()))
            .map(String::as_str)
    }

    pub fn table_alias_of(&self, node: &JoinNodeName) -> Option<&str> {
        self.table_aliases.get(node).map(String::as_str)
    }

    pub fn sql(&self) -> String {
        self.query.to_sql()
    }
}

/// Build the flat select of a join tree
pub fn build_select_query(
    tree: &JoinTree,
    binders: &ColumnBinderRegistry,
) -> Result<QueryMapping, QueryBuildError> {
    let mut builder = QueryBuilder::default();
    let root = tree.root();
    let root_alias = builder.table_alias(root)?;
    builder.select_columns(root, &root_alias, binders)?;

    let from = FromClause {
        table_name: root.table().name().to_string(),
        table_alias: root_alias,
    };

    let mut joins = Vec::with_capacity(tree.len() - 1);
    for node in tree.iter_breadth_first().skip(1) {
        if let Some(link) = node.link() {
            joins.push(builder.join(tree, node, link, binders)?);
        }
    }

    let query = Query {
        select: builder.select,
        from,
        joins,
        where_in: None,
    };
    log::debug!(
        "Built select over {} nodes: {} columns, {} joins",
        tree.len(),
        query.select.len(),
        query.joins.len()
    );
    Ok(QueryMapping {
        query,
        column_binders: builder.column_binders,
        column_aliases: builder.column_aliases,
        node_aliases: builder.node_aliases,
        table_aliases: builder.table_aliases,
    })
}

/// Restrict a tree select to the given root identifiers.
///
/// `identifier_columns` are root table columns, in identifier order.
pub fn where_root_identifier_in(
    mapping: &QueryMapping,
    identifier_columns: &[Column],
    identifiers: &[EntityIdentifier],
    binders: &ColumnBinderRegistry,
) -> Result<PreparedStatement, QueryBuildError> {
    if identifiers.is_empty() {
        return Err(QueryBuildError::EmptyIdentifiers);
    }
    let root = JoinNodeName::root();
    let root_alias = mapping.query.from.table_alias.clone();

    let mut columns = Vec::with_capacity(identifier_columns.len());
    for column in identifier_columns {
        if mapping.alias_of(&root, column).is_none() {
            return Err(QueryBuildError::UnknownRootColumn {
                column: column.to_string(),
            });
        }
        columns.push(ColumnRef {
            table_alias: root_alias.clone(),
            column: column.name().to_string(),
        });
    }

    let mut parameters = Vec::with_capacity(identifiers.len() * identifier_columns.len());
    for identifier in identifiers {
        if identifier.values().len() != identifier_columns.len() {
            return Err(QueryBuildError::IdentifierArity {
                expected: identifier_columns.len(),
                actual: identifier.values().len(),
            });
        }
        for (value, column) in identifier.values().iter().zip(identifier_columns) {
            parameters.push(binders.binder_for(column)?.write(value)?);
        }
    }

    let mut query = mapping.query.clone();
    query.where_in = Some(WhereInClause {
        columns,
        tuple_count: identifiers.len(),
    });
    Ok(PreparedStatement {
        sql: query.to_sql(),
        parameters,
    })
}

#[derive(Default)]
struct QueryBuilder {
    select: Vec<SelectItem>,
    used_table_aliases: HashSet<String>,
    column_binders: HashMap<String, Arc<dyn ColumnBinder>>,
    column_aliases: HashMap<ColumnId, String>,
    node_aliases: HashMap<JoinNodeName, HashMap<ColumnId, String>>,
    table_aliases: HashMap<JoinNodeName, String>,
}

impl QueryBuilder {
    /// Explicit alias or table name; a default alias already in use gets a numeric suffix
    fn table_alias(&mut self, node: &JoinNode) -> Result<String, QueryBuildError> {
        let alias = match node.alias() {
            Some(alias) => {
                if !self.used_table_aliases.insert(alias.to_string()) {
                    return Err(QueryBuildError::DuplicateAlias {
                        alias: alias.to_string(),
                        node: node.name().to_string(),
                    });
                }
                alias.to_string()
            }
            None => {
                let base = node.table().name();
                if self.used_table_aliases.insert(base.to_string()) {
                    base.to_string()
                } else {
                    let mut counter = 1;
                    loop {
                        let candidate = format!("{}_{}", base, counter);
                        if self.used_table_aliases.insert(candidate.clone()) {
                            log::warn!(
                                "Table alias collision: join node '{}' uses '{}' instead of '{}'",
                                node.name(),
                                candidate,
                                base
                            );
                            break candidate;
                        }
                        counter += 1;
                    }
                }
            }
        };
        self.table_aliases.insert(node.name().clone(), alias.clone());
        Ok(alias)
    }

    fn select_columns(
        &mut self,
        node: &JoinNode,
        table_alias: &str,
        binders: &ColumnBinderRegistry,
    ) -> Result<(), QueryBuildError> {
        let node_aliases = self.node_aliases.entry(node.name().clone()).or_default();
        for column in node.selectable_columns() {
            let col_alias = format!("{}_{}", table_alias, column.name());
            if self.column_binders.contains_key(&col_alias) {
                return Err(QueryBuildError::DuplicateColumnAlias { alias: col_alias });
            }
            let binder = binders.binder_for(&column)?;
            self.column_binders.insert(col_alias.clone(), binder);
            self.column_aliases
                .entry(column.id())
                .or_insert_with(|| col_alias.clone());
            node_aliases.insert(column.id(), col_alias.clone());
            self.select.push(SelectItem {
                table_alias: table_alias.to_string(),
                column: column.name().to_string(),
                col_alias,
            });
        }
        Ok(())
    }

    fn join(
        &mut self,
        tree: &JoinTree,
        node: &JoinNode,
        link: &JoinLink,
        binders: &ColumnBinderRegistry,
    ) -> Result<JoinClause, QueryBuildError> {
        // parents are visited first, so their alias is known
        let parent_alias = node
            .parent()
            .and_then(|parent| tree.get(parent))
            .and_then(|parent| self.table_aliases.get(parent.name()))
            .cloned()
            .unwrap_or_else(|| tree.root().table().name().to_string());

        let table_alias = self.table_alias(node)?;
        self.select_columns(node, &table_alias, binders)?;

        Ok(JoinClause {
            table_name: node.table().name().to_string(),
            table_alias: table_alias.clone(),
            join_type: link.join_type,
            left: ColumnRef {
                table_alias: parent_alias,
                column: link.left_column.name().to_string(),
            },
            right: ColumnRef {
                table_alias,
                column: link.right_column.name().to_string(),
            },
        })
    }
}
