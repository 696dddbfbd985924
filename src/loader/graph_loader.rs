use super::errors::LoadError;
use super::executor::SqlExecutor;
use crate::config::LoaderConfig;
use crate::hydrator::{Row, TreeInflater};
use crate::join_tree::JoinTree;
use crate::mapping::binder::ColumnBinderRegistry;
use crate::mapping::entity::EntitySet;
use crate::mapping::inflater::EntityInflater;
use crate::mapping::value::EntityIdentifier;
use crate::query_builder::{
    build_select_query, where_root_identifier_in, PreparedStatement, QueryBuildError, QueryMapping,
};
use std::sync::Arc;

/// Loads bean graphs of one join tree: builds the select once, then runs it
/// through an executor and hydrates the rows.
pub struct EntityGraphLoader {
    tree: Arc<JoinTree>,
    binders: ColumnBinderRegistry,
    config: LoaderConfig,
    mapping: QueryMapping,
    inflater: TreeInflater,
}

impl EntityGraphLoader {
    pub fn new(
        tree: Arc<JoinTree>,
        binders: ColumnBinderRegistry,
        config: LoaderConfig,
    ) -> Result<Self, LoadError> {
        let mapping = build_select_query(&tree, &binders)?;
        let inflater = TreeInflater::new(&tree, &mapping)?;
        Ok(Self {
            tree,
            binders,
            config,
            mapping,
            inflater,
        })
    }

    pub fn tree(&self) -> &Arc<JoinTree> {
        &self.tree
    }

    pub fn mapping(&self) -> &QueryMapping {
        &self.mapping
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load every root bean reachable by the tree query
    pub fn select_all(&self, executor: &dyn SqlExecutor) -> Result<EntitySet, LoadError> {
        let statement = PreparedStatement::new(self.mapping.sql());
        self.load(
            executor,
            vec![statement],
            self.config.default_expected_size,
        )
    }

    /// Load the root beans with the given identifiers. Ids are split into
    /// `in_operator_max_size` chunks, one query each, all hydrated together.
    pub fn select_by_ids(
        &self,
        executor: &dyn SqlExecutor,
        ids: &[EntityIdentifier],
    ) -> Result<EntitySet, LoadError> {
        if ids.is_empty() {
            return Ok(EntitySet::default());
        }
        let root_inflater = self.tree.root_inflater();
        let identifier_columns = root_inflater.identifier_columns();
        if identifier_columns.is_empty() {
            return Err(QueryBuildError::MissingIdentifierColumns {
                entity: root_inflater.entity_type().to_string(),
            }
            .into());
        }

        let statements = ids
            .chunks(self.config.in_operator_max_size.max(1))
            .map(|chunk| {
                where_root_identifier_in(&self.mapping, identifier_columns, chunk, &self.binders)
            })
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!(
            "Loading {} ids of '{}' in {} chunks",
            ids.len(),
            root_inflater.entity_type(),
            statements.len()
        );
        self.load(executor, statements, ids.len())
    }

    fn load(
        &self,
        executor: &dyn SqlExecutor,
        statements: Vec<PreparedStatement>,
        expected_size: usize,
    ) -> Result<EntitySet, LoadError> {
        // one inflation context for every chunk
        self.inflater
            .try_transform(self.rows(executor, statements), expected_size)
    }

    fn rows<'a>(
        &'a self,
        executor: &'a dyn SqlExecutor,
        statements: Vec<PreparedStatement>,
    ) -> impl Iterator<Item = Result<Row, LoadError>> + 'a {
        statements.into_iter().flat_map(move |statement| {
            if self.config.log_sql {
                log::debug!("{} {:?}", statement.sql, statement.parameters);
            }
            let cursor: Box<dyn Iterator<Item = Result<Row, LoadError>> + 'a> =
                match executor.execute(&statement) {
                    Ok(result_set) => {
                        let sql = statement.sql;
                        Box::new(result_set.map(move |raw| -> Result<Row, LoadError> {
                            let raw = raw.map_err(|source| LoadError::Execution {
                                sql: sql.clone(),
                                source,
                            })?;
                            Ok(Row::decode(&raw, &self.mapping.column_binders)?)
                        }))
                    }
                    Err(source) => Box::new(std::iter::once(Err(LoadError::Execution {
                        sql: statement.sql,
                        source,
                    }))),
                };
            cursor
        })
    }
}
