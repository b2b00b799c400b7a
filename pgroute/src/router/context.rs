//! Everything the router knows about a statement.

use pgroute_plugin::{PrParameters, PrRouterContext, PrStatement};

use super::parser::Ast;
use crate::backend::Cluster;
use crate::config::ReadWriteStrategy;
use crate::net::Bind;

/// Statement context.
///
/// Borrows the parsed statement and its parameters, which plugins
/// read in place while they are being called.
#[derive(Debug, Clone, Copy)]
pub struct RouterContext<'a> {
    /// Cluster the statement is for.
    pub(crate) cluster: &'a Cluster,
    /// Parsed statement.
    pub(crate) ast: &'a Ast,
    /// Bound parameters, if sent using the extended protocol.
    pub(crate) bind: Option<&'a Bind>,
    /// Client is inside a transaction.
    pub(crate) in_transaction: bool,
    /// Host's own read/write heuristic.
    read: bool,
}

impl<'a> RouterContext<'a> {
    pub fn new(
        cluster: &'a Cluster,
        ast: &'a Ast,
        bind: Option<&'a Bind>,
        in_transaction: bool,
    ) -> Self {
        Self {
            cluster,
            ast,
            bind,
            in_transaction,
            read: ast.read(),
        }
    }

    /// The statement looks like a read.
    pub fn read(&self) -> bool {
        self.read
    }

    /// Statement has to go to a primary, no matter what plugins say.
    pub fn write_override(&self) -> bool {
        !self.read
            || (self.in_transaction
                && self.cluster.read_write_strategy() == ReadWriteStrategy::Conservative)
    }

    pub fn shards(&self) -> usize {
        self.cluster.shards()
    }

    /// Create plugin context.
    ///
    /// The result points into `self` and is only valid while `self` is.
    pub fn plugin_context(&self, write_override: bool) -> PrRouterContext {
        let params = match self.bind {
            Some(bind) => bind.ffi(),
            None => PrParameters::default(),
        };

        PrRouterContext {
            shards: self.cluster.shards() as u64,
            has_replicas: self.cluster.has_replicas() as u8,
            has_primary: self.cluster.has_primary() as u8,
            in_transaction: self.in_transaction as u8,
            write_override: write_override as u8,
            // SAFETY: The AST is borrowed for 'a, longer than any plugin call using this.
            query: unsafe { PrStatement::from_proto(self.ast.protobuf()) },
            params,
        }
    }
}

#[cfg(test)]
mod test {
    use pgroute_plugin::parameters::ParameterValue;
    use pgroute_plugin::pg_query::NodeEnum;
    use pgroute_plugin::Context;

    use super::*;
    use crate::backend::cluster::test::cluster;
    use crate::config::{Database, Role};

    #[test]
    fn test_plugin_context() {
        let cluster = cluster(4, 1);
        let ast = Ast::parse("SELECT * FROM users WHERE id = $1").unwrap();
        let bind = Bind::text(["25"]).unwrap();
        let context = RouterContext::new(&cluster, &ast, Some(&bind), false);

        assert!(context.read());
        assert!(!context.write_override());

        let ffi = context.plugin_context(context.write_override());
        assert_eq!(ffi.shards, 4);
        assert_eq!(ffi.has_replicas, 1);
        assert_eq!(ffi.has_primary, 1);
        assert_eq!(ffi.in_transaction, 0);
        assert_eq!(ffi.write_override, 0);

        let plugin_context = Context::from(ffi);
        let statement = plugin_context.statement();
        let proto = statement.protobuf().unwrap();
        assert!(matches!(proto.root(), Some(NodeEnum::SelectStmt(_))));

        let params = plugin_context.parameters();
        assert_eq!(
            params.get(0).unwrap().decode(params.parameter_format(0)),
            Some(ParameterValue::Text("25"))
        );
    }

    #[test]
    fn test_write_override() {
        let mut cluster_config = vec![Database {
            name: "primary".into(),
            host: "127.0.0.1".into(),
            port: 5432,
            shard: 0,
            role: Role::Primary,
        }];
        let conservative = Cluster::new(&cluster_config, ReadWriteStrategy::Conservative);
        cluster_config[0].role = Role::Replica;
        let aggressive = Cluster::new(&cluster_config, ReadWriteStrategy::Aggressive);

        let select = Ast::parse("SELECT 1").unwrap();
        let insert = Ast::parse("INSERT INTO users VALUES (1)").unwrap();

        assert!(!RouterContext::new(&conservative, &select, None, false).write_override());
        assert!(RouterContext::new(&conservative, &select, None, true).write_override());
        assert!(!RouterContext::new(&aggressive, &select, None, true).write_override());
        assert!(RouterContext::new(&aggressive, &insert, None, false).write_override());

        let context = RouterContext::new(&aggressive, &select, None, true);
        let ffi = context.plugin_context(true);
        assert_eq!(ffi.has_primary, 0);
        assert_eq!(ffi.has_replicas, 1);
        assert_eq!(ffi.in_transaction, 1);
        assert_eq!(ffi.write_override, 1);
        assert_eq!(ffi.params.num_params, 0);
    }
}
