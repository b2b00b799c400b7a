//! What a plugin sees when the host asks it to route a statement,
//! and what it hands back.
//!
//! Everything in [`Context`] borrows host memory that is only valid while
//! the route function runs. Nothing here may be stored past that call.

use std::{marker::PhantomData, ops::Deref};

use crate::{
    ast::PrParseResult, bindings::PrRouterContext, parameters::Parameters, PrParameters, PrRoute,
    PrStatement,
};

/// Statement tagged with the version of the parser that produced it.
///
/// The tree is only exposed when that version matches the `pg_query` this
/// crate was built with:
///
/// ```no_run
/// # use pgroute_plugin::Context;
/// # let context = unsafe { Context::doc_test() };
/// use pgroute_plugin::pg_query::NodeEnum;
///
/// let statement = context.statement();
/// match statement.protobuf() {
///     Some(ast) => {
///         if let Some(NodeEnum::SelectStmt(_)) = ast.root() {
///             // read
///         }
///     }
///     None => eprintln!("unknown parser version {}", statement.version()),
/// }
/// ```
pub struct Statement<'a> {
    ffi: PrStatement,
    _context: PhantomData<&'a Context>,
}

impl Deref for Statement<'_> {
    type Target = PrStatement;

    fn deref(&self) -> &Self::Target {
        &self.ffi
    }
}

impl<'a> Statement<'a> {
    /// Parse tree, borrowed from the host.
    ///
    /// `None` when the version tag is not ours. The plugin should
    /// then answer with [`Route::unknown`].
    pub fn protobuf(&self) -> Option<PrParseResult<'a>> {
        // SAFETY: The host keeps the AST alive until the plugin returns,
        // and the result can't outlive the context.
        unsafe { self.ffi.parse_result() }
    }

    /// Parser version tag.
    pub fn version(&self) -> i32 {
        self.ffi.version
    }
}

/// Router context, as received by `#[route]` functions.
///
/// Flags are decoded from their `0`/`1` wire form. The statement and its
/// parameters are borrowed views, see [`Context::statement`] and
/// [`Context::parameters`].
///
/// ```
/// use pgroute_plugin::prelude::*;
///
/// #[route]
/// fn route(context: Context) -> Route {
///     if context.write_override() || context.read_only() {
///         return Route::unknown();
///     }
///
///     let shard = if context.sharded() { Shard::All } else { Shard::Direct(0) };
///     Route::new(shard, ReadWrite::Read)
/// }
/// ```
pub struct Context {
    ffi: PrRouterContext,
}

impl From<PrRouterContext> for Context {
    fn from(value: PrRouterContext) -> Self {
        Self { ffi: value }
    }
}

impl Context {
    /// The statement being routed.
    pub fn statement(&self) -> Statement<'_> {
        Statement {
            ffi: self.ffi.query,
            _context: PhantomData,
        }
    }

    /// No primary is configured. Writes have nowhere to go.
    pub fn read_only(&self) -> bool {
        self.ffi.has_primary == 0
    }

    /// At least one replica is configured.
    pub fn has_replicas(&self) -> bool {
        self.ffi.has_replicas == 1
    }

    pub fn has_primary(&self) -> bool {
        !self.read_only()
    }

    /// Shard count. Valid shard numbers are `0..shards()`.
    pub fn shards(&self) -> usize {
        self.ffi.shards as usize
    }

    /// More than one shard.
    pub fn sharded(&self) -> bool {
        self.shards() > 1
    }

    /// Client has an open transaction.
    pub fn in_transaction(&self) -> bool {
        self.ffi.in_transaction == 1
    }

    /// Host will send this statement to a primary no matter what.
    ///
    /// Set for anything that isn't a plain `SELECT`, for `SELECT ... FOR UPDATE`
    /// and data-modifying CTEs, and for every statement inside a transaction
    /// when the host routes conservatively. Returning [`ReadWrite::Read`] has
    /// no effect then, though the shard is still used.
    pub fn write_override(&self) -> bool {
        self.ffi.write_override == 1
    }

    /// Parameters bound with the extended protocol. Empty for simple queries.
    ///
    /// ```
    /// use pgroute_plugin::prelude::*;
    /// # let context = unsafe { Context::doc_test() };
    /// let params = context.parameters();
    /// let first = params
    ///     .get(0)
    ///     .and_then(|param| param.decode(params.parameter_format(0)));
    /// assert!(first.is_none());
    /// ```
    pub fn parameters(&self) -> Parameters<'_> {
        // SAFETY: Host-owned memory, valid while the plugin is executing.
        unsafe { Parameters::from_ffi(&self.ffi.params) }
    }
}

impl Context {
    /// Single-shard context with no statement data, for doc examples.
    ///
    /// # Safety
    ///
    /// The statement tag claims our parser version but there is no tree
    /// behind it. Calling [`Statement::protobuf`] on it is undefined behavior.
    pub unsafe fn doc_test() -> Context {
        use std::ptr::null_mut;

        Context {
            ffi: PrRouterContext {
                shards: 1,
                has_replicas: 1,
                has_primary: 1,
                in_transaction: 0,
                write_override: 0,
                query: PrStatement {
                    version: crate::ast::parser_version(),
                    len: 0,
                    data: null_mut(),
                },
                params: PrParameters::default(),
            },
        }
    }
}

/// Shard opinion. Encoded as `0..` for a shard, `-1` for all, `-2` for none.
///
/// ```
/// use pgroute_plugin::Shard;
///
/// assert_eq!(i64::from(Shard::All), -1);
/// assert_eq!(Shard::try_from(-2), Ok(Shard::Unknown));
/// assert_eq!(Shard::try_from(-7), Err(-7));
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Shard {
    /// One shard.
    Direct(usize),
    /// Every shard.
    All,
    /// No opinion.
    Unknown,
}

impl From<Shard> for i64 {
    fn from(value: Shard) -> Self {
        match value {
            Shard::Direct(value) => value as i64,
            Shard::All => -1,
            Shard::Unknown => -2,
        }
    }
}

impl TryFrom<i64> for Shard {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Shard::All),
            -2 => Ok(Shard::Unknown),
            value if value >= 0 => Ok(Shard::Direct(value as usize)),
            value => Err(value),
        }
    }
}

/// Role opinion. Encoded as `0` write, `1` read, `2` none.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadWrite {
    /// Replica, if there is one.
    Read,
    /// Primary.
    Write,
    /// No opinion.
    Unknown,
}

impl From<ReadWrite> for u8 {
    fn from(value: ReadWrite) -> Self {
        match value {
            ReadWrite::Write => 0,
            ReadWrite::Read => 1,
            ReadWrite::Unknown => 2,
        }
    }
}

impl TryFrom<u8> for ReadWrite {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ReadWrite::Write),
            1 => Ok(ReadWrite::Read),
            2 => Ok(ReadWrite::Unknown),
            value => Err(value),
        }
    }
}

impl Default for PrRoute {
    fn default() -> Self {
        Route::unknown().ffi
    }
}

/// Answer returned from a `#[route]` function.
///
/// Each half is independent: a plugin can pick the shard and leave the role
/// to the host, or the other way around. [`Route::unknown`] leaves both, and
/// the host moves on to the next plugin.
///
/// ```
/// use pgroute_plugin::{ReadWrite, Route, Shard};
///
/// let replicas_everywhere = Route::new(Shard::All, ReadWrite::Read);
/// assert_eq!(replicas_everywhere.shard, -1);
/// assert_eq!(replicas_everywhere.read_write, 1);
///
/// let pass = Route::unknown();
/// assert_eq!(pass.shard(), Ok(Shard::Unknown));
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Route {
    ffi: PrRoute,
}

impl Default for Route {
    fn default() -> Self {
        Self::unknown()
    }
}

impl Deref for Route {
    type Target = PrRoute;

    fn deref(&self) -> &Self::Target {
        &self.ffi
    }
}

impl From<PrRoute> for Route {
    fn from(value: PrRoute) -> Self {
        Self { ffi: value }
    }
}

impl From<Route> for PrRoute {
    fn from(value: Route) -> Self {
        value.ffi
    }
}

impl Route {
    pub fn new(shard: Shard, read_write: ReadWrite) -> Route {
        Self {
            ffi: PrRoute {
                shard: shard.into(),
                read_write: read_write.into(),
            },
        }
    }

    /// No opinion on either half.
    pub fn unknown() -> Route {
        Self::new(Shard::Unknown, ReadWrite::Unknown)
    }

    /// Decoded shard, or the raw value if it's not a documented one.
    pub fn shard(&self) -> Result<Shard, i64> {
        self.ffi.shard.try_into()
    }

    /// Decoded read/write intent, or the raw value if it's not a documented one.
    pub fn read_write(&self) -> Result<ReadWrite, u8> {
        self.ffi.read_write.try_into()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sentinels() {
        assert_eq!(Shard::try_from(-1), Ok(Shard::All));
        assert_eq!(Shard::try_from(-2), Ok(Shard::Unknown));
        assert_eq!(Shard::try_from(3), Ok(Shard::Direct(3)));
        assert_eq!(Shard::try_from(-3), Err(-3));
        assert_eq!(Shard::try_from(i64::MIN), Err(i64::MIN));

        assert_eq!(ReadWrite::try_from(0), Ok(ReadWrite::Write));
        assert_eq!(ReadWrite::try_from(1), Ok(ReadWrite::Read));
        assert_eq!(ReadWrite::try_from(2), Ok(ReadWrite::Unknown));
        assert_eq!(ReadWrite::try_from(3), Err(3));
    }

    #[test]
    fn test_unknown_route() {
        let route = PrRoute::default();
        assert_eq!(route.shard, -2);
        assert_eq!(route.read_write, 2);

        let route = Route::new(Shard::Direct(5), ReadWrite::Read);
        assert_eq!(route.shard(), Ok(Shard::Direct(5)));
        assert_eq!(route.read_write(), Ok(ReadWrite::Read));
    }

    #[test]
    fn test_context() {
        let proto = pg_query::parse("SELECT * FROM users").unwrap().protobuf;
        let context = Context::from(PrRouterContext {
            shards: 4,
            has_replicas: 0,
            has_primary: 1,
            in_transaction: 1,
            write_override: 1,
            query: unsafe { PrStatement::from_proto(&proto) },
            params: PrParameters::default(),
        });

        assert!(context.sharded());
        assert!(context.has_primary());
        assert!(!context.has_replicas());
        assert!(context.in_transaction());
        assert!(context.write_override());
        assert!(context.parameters().is_empty());

        let statement = context.statement();
        assert_eq!(statement.version(), proto.version);
        assert_eq!(statement.protobuf().unwrap().stmts.len(), 1);
    }
}
