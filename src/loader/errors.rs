use super::executor::ExecutorError;
use crate::hydrator::HydrationError;
use crate::query_builder::QueryBuildError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LoadError {
    #[error("Query build error: {0}")]
    Query(#[from] QueryBuildError),

    #[error("Execution of `{sql}` failed: {source}")]
    Execution {
        sql: String,
        #[source]
        source: ExecutorError,
    },

    #[error("Hydration error: {0}")]
    Hydration(#[from] HydrationError),
}
