use crate::mapping::binder::BindError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryBuildError {
    #[error("Binder error: {0}")]
    Binder(#[from] BindError),

    #[error("Table alias '{alias}' of join node '{node}' is already used in the query")]
    DuplicateAlias { alias: String, node: String },

    #[error("Column alias '{alias}' is produced by two different columns")]
    DuplicateColumnAlias { alias: String },

    #[error("Column '{column}' is not selected by the root node")]
    UnknownRootColumn { column: String },

    #[error("Root entity '{entity}' has no identifier columns to filter on")]
    MissingIdentifierColumns { entity: String },

    #[error("Identifier has {actual} values but {expected} identifier columns were given")]
    IdentifierArity { expected: usize, actual: usize },

    #[error("Cannot filter on an empty identifier list")]
    EmptyIdentifiers,
}
