use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum JoinTreeError {
    #[error("Join node '{name}' not found. Known nodes: {known:?}")]
    UnknownNode { name: String, known: Vec<String> },

    #[error("Table '{table}' has no column named '{column}' to join on")]
    MissingJoinColumn { table: String, column: String },

    #[error("Column '{column}' does not belong to table '{table}' of join node '{node}'")]
    ColumnNotInTable {
        column: String,
        table: String,
        node: String,
    },

    #[error("Join node name '{name}' is already registered in the target tree")]
    DuplicateNodeName { name: String },
}
