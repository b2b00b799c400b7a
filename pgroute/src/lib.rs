//! pgroute, a PostgreSQL query router.
//!
//! Statements are parsed with `pg_query` and routed to a shard and a role
//! (primary or replica). Routing decisions can be delegated to plugins,
//! shared libraries built with the `pgroute-plugin` crate.

pub mod backend;
pub mod cli;
pub mod config;
pub mod net;
pub mod plugin;
pub mod router;
pub mod stats;

use std::io::IsTerminal;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Setup the logger, so `info!`, `debug!`
/// and other macros actually output something.
///
/// Can be called more than once.
pub fn logger() {
    let format = fmt::layer()
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .with_file(false);

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(format)
        .with(filter)
        .try_init();
}
