//! Commonly used structs and re-exports.

pub use crate::pg_query;
pub use crate::{
    ast::PrParseResult,
    macros::{fini, init, route},
    parameters::{Parameter, ParameterFormat, ParameterValue, Parameters},
    Context, ReadWrite, Route, Shard,
};
