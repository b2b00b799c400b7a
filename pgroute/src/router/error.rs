//! Router errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("empty query")]
    EmptyQuery,

    #[error("{0}")]
    PgQuery(#[from] pg_query::Error),

    #[error("cluster has no shards")]
    NoShards,

    #[error("{0}")]
    Net(#[from] crate::net::Error),
}
