//! Wrapper around `pg_query` protobuf-generated statement.
//!
//! The host passes the statements it parsed without copying them. Reading them
//! is safe as long as two conditions hold:
//!
//! 1. The version of the **Rust compiler** used to build the plugin is the same used to build the host
//! 2. The version of the **`pg_query` library** used by the plugin is the same used by the host
//!
//! Both are checked by the host when the plugin is loaded. On top of that, every
//! statement carries the parser version it was produced by, and
//! [`PrStatement::parse_result`] refuses to interpret a statement tagged with
//! a version this library doesn't recognize.
//!
use std::{ffi::c_void, slice::from_raw_parts};

use once_cell::sync::Lazy;
use pg_query::{
    protobuf::{ParseResult, RawStmt},
    NodeEnum,
};
use tracing::error;

use crate::bindings::PrStatement;

static PARSER_VERSION: Lazy<i32> = Lazy::new(|| {
    match pg_query::parse("SELECT 1") {
        Ok(result) => result.protobuf.version,
        Err(err) => {
            error!("pg_query is unusable, statements won't be readable: {}", err);
            0
        }
    }
});

/// Version tag `pg_query` puts on the statements it parses,
/// as linked into this library.
pub fn parser_version() -> i32 {
    *PARSER_VERSION
}

impl PrStatement {
    /// Create FFI binding from `pg_query` output.
    ///
    /// # Safety
    ///
    /// The reference must live for the entire time
    /// this struct is used. This is _not_ checked by the compiler,
    /// and is the responsibility of the caller.
    ///
    pub unsafe fn from_proto(value: &ParseResult) -> Self {
        Self {
            data: value.stmts.as_ptr() as *mut c_void,
            version: value.version,
            len: value.stmts.len() as u64,
        }
    }

    /// Borrow the statements without copying them.
    ///
    /// Returns `None` if the statement was produced by a parser version
    /// this library doesn't understand, or if it's missing.
    ///
    /// # Safety
    ///
    /// The memory must be valid for `'a`. Inside a plugin, that's the duration
    /// of the call that received the context. Use [`crate::context::Statement::protobuf`] instead.
    ///
    pub unsafe fn parse_result<'a>(&self) -> Option<PrParseResult<'a>> {
        if self.version == 0 || self.version != parser_version() {
            return None;
        }

        let stmts: &[RawStmt] = if self.len == 0 {
            &[]
        } else if self.data.is_null() {
            return None;
        } else {
            from_raw_parts(self.data as *const RawStmt, self.len as usize)
        };

        Some(PrParseResult {
            version: self.version,
            stmts,
        })
    }
}

/// Borrowed view of [`pg_query::protobuf::ParseResult`].
///
/// It doesn't own the statements and can't outlive the context it came from.
/// Use [`PrParseResult::to_parse_result`] to keep a copy.
#[derive(Debug, Clone, Copy)]
pub struct PrParseResult<'a> {
    /// Parser version.
    pub version: i32,
    /// Top-level statements.
    pub stmts: &'a [RawStmt],
}

impl<'a> PrParseResult<'a> {
    /// Root node of the first statement. Clients rarely send more than one,
    /// and when they do, routing is decided by the first.
    pub fn root(&self) -> Option<&'a NodeEnum> {
        self.stmts.first()?.stmt.as_ref()?.node.as_ref()
    }

    /// Copy the statements into an owned [`ParseResult`].
    pub fn to_parse_result(&self) -> ParseResult {
        ParseResult {
            version: self.version,
            stmts: self.stmts.to_vec(),
        }
    }
}
