use crate::join_tree::JoinTreeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Failed to read mapping file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse mapping YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid mapping: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Table '{name}' is declared twice")]
    DuplicateTable { name: String },

    #[error("Table '{name}' is not declared")]
    UnknownTable { name: String },

    #[error("Entity '{name}' is not declared")]
    UnknownEntity { name: String },

    #[error("Join '{label}' refers to unknown parent '{parent}'")]
    UnknownParent { label: String, parent: String },

    #[error("Join label '{label}' is used twice")]
    DuplicateLabel { label: String },

    #[error("Column '{column}' not found in table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Join '{label}' must set exactly one of `collection` or `property`")]
    AmbiguousFixer { label: String },

    #[error("Join tree error: {0}")]
    JoinTree(#[from] JoinTreeError),
}
