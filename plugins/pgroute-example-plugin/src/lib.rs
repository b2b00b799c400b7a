//! Example pgroute plugin.
//!
//! Sends reads to replicas once a table hasn't been written to for a few seconds,
//! and routes `WHERE id = $1` statements on sharded clusters to `id % shards`.

use pgroute_plugin::prelude::*;

pub mod plugin;

pgroute_plugin::macros::plugin!();

/// Perform any plugin initialization routines here.
/// These are running sync on boot, so make these fast.
#[init]
fn init() {}

/// Called on every single query going through the host.
#[route]
fn route(context: Context) -> Route {
    // This function can't return errors.
    plugin::route_query(context).unwrap_or_default()
}
