//! Query router.
//!
//! Decides which shard and which role (primary or replica) a statement
//! is sent to. Plugins get the first say; whatever they don't decide
//! is filled in from the host's defaults.

pub mod context;
pub mod error;
pub mod parser;
pub mod plugins;
pub mod route;

pub use context::RouterContext;
pub use error::Error;
pub use parser::Ast;
pub use plugins::{InvalidRoute, PluginOutput};
pub use route::{Route, Shard};

use std::sync::atomic::{AtomicUsize, Ordering};

use pgroute_plugin::Plugin;
use tracing::{debug, warn};

use crate::backend::Cluster;
use crate::config::DefaultShard;
use crate::net::Bind;
use crate::stats::PluginCounters;

/// Query router.
#[derive(Debug, Default)]
pub struct Router {
    round_robin: AtomicUsize,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a statement.
    ///
    /// Plugins run in order and the first one with an opinion on either
    /// the shard or the role wins. The others aren't called.
    pub fn route(&self, context: &RouterContext, plugins: &[Plugin<'_>]) -> Result<Route, Error> {
        let shards = context.shards();
        if shards == 0 {
            return Err(Error::NoShards);
        }

        let write_override = context.write_override();
        let read = !write_override;

        if !plugins.iter().any(|plugin| plugin.routes()) {
            return Ok(Route::new(self.default_shard(context.cluster), read));
        }

        debug!("executing {} router plugins", plugins.len());

        let ffi = context.plugin_context(write_override);

        for plugin in plugins {
            let Some(route) = plugin.route(ffi) else {
                continue;
            };

            let output = PluginOutput::decode(&route, shards);
            PluginCounters::get(plugin.name()).record(&output);

            for invalid in &output.invalid {
                warn!(
                    "plugin \"{}\" returned an invalid route: {}",
                    plugin.name(),
                    invalid
                );
            }

            if output.provided() {
                debug!("plugin \"{}\" returned route [{}]", plugin.name(), output);
                let shard = match output.shard {
                    Some(shard) => shard,
                    None => self.default_shard(context.cluster),
                };
                return Ok(output.apply(&Route::new(shard, read), write_override));
            }
        }

        Ok(Route::new(self.default_shard(context.cluster), read))
    }

    /// Parse and route a query.
    pub fn query(
        &self,
        cluster: &Cluster,
        query: &str,
        bind: Option<&Bind>,
        in_transaction: bool,
        plugins: &[Plugin<'_>],
    ) -> Result<Route, Error> {
        let ast = Ast::parse(query)?;
        let context = RouterContext::new(cluster, &ast, bind, in_transaction);
        self.route(&context, plugins)
    }

    /// Shard used when no plugin picked one. Round robin
    /// only advances when it's actually used.
    fn default_shard(&self, cluster: &Cluster) -> Shard {
        if cluster.shards() == 1 {
            return Shard::Direct(0);
        }

        match cluster.default_shard() {
            DefaultShard::All => Shard::All,
            DefaultShard::RoundRobin => {
                Shard::Direct(self.round_robin.fetch_add(1, Ordering::Relaxed) % cluster.shards())
            }
        }
    }
}
