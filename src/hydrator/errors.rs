use crate::mapping::binder::BindError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum HydrationError {
    /// The join tree and the alias metadata describe different trees
    #[error("No column aliases for join node '{name}'. Known join nodes: {known:?}")]
    UnknownJoinNode { name: String, known: Vec<String> },

    #[error("Cannot build {entity_type} from row: {message}")]
    RowTransform {
        entity_type: String,
        message: String,
    },

    /// A join kind the hydrator has no consumer for
    #[error("Join node '{name}' of kind '{kind}' cannot be hydrated")]
    UnsupportedJoin { name: String, kind: String },

    #[error("Cannot decode column '{alias}': {source}")]
    Decode {
        alias: String,
        #[source]
        source: BindError,
    },
}
