use std::fmt::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use clap::{Parser, Subcommand};
use pgroute_plugin::Plugin;
use thiserror::Error;

use crate::config::{self, Config};
use crate::net::{self, Bind};
use crate::plugin;
use crate::router::{self, Router, Shard};
use crate::stats::PluginStats;

/// pgroute routes PostgreSQL statements to shards and replicas.
#[derive(Parser, Debug)]
#[command(name = "pgroute", version)]
pub struct Cli {
    /// Path to the configuration file. Default: "pgroute.toml"
    #[arg(short, long, default_value = "pgroute.toml")]
    pub config: PathBuf,
    /// Subcommand.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Check configuration and plugins.
    Check,

    /// Route a statement and print where it would be sent.
    Route {
        /// Statement text.
        #[arg(short, long)]
        query: String,
        /// Bound parameter value, in order.
        #[arg(short, long)]
        param: Vec<String>,
        /// Send parameters in binary format, as 8-byte integers.
        #[arg(short, long)]
        binary: bool,
        /// Route as if a transaction was open.
        #[arg(long)]
        in_transaction: bool,
    },

    /// Print plugin metrics.
    Metrics,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Config(#[from] config::Error),

    #[error("{0}")]
    Plugin(#[from] plugin::Error),

    #[error("{0}")]
    Router(#[from] router::Error),

    #[error("{0}")]
    Net(#[from] net::Error),

    #[error("parameter \"{0}\" is not an integer")]
    BinaryParameter(String),
}

/// Load configuration and plugins.
fn load(path: &Path) -> Result<Config, Error> {
    let config = config::load(path)?;
    plugin::load_from_config()?;
    Ok(config)
}

fn loaded_plugins() -> &'static [Plugin<'static>] {
    plugin::plugins().map(|plugins| plugins.as_slice()).unwrap_or(&[])
}

/// Check configuration and plugins.
pub fn check(path: &Path) -> Result<String, Error> {
    let config = load(path)?;
    let cluster = config.cluster();
    let plugins = loaded_plugins();

    let mut report = String::new();
    let _ = writeln!(
        report,
        "{} shards, {} databases",
        cluster.shards(),
        config.databases.len()
    );
    let _ = writeln!(
        report,
        "{} of {} plugins loaded",
        plugins.len(),
        config.plugins.len()
    );
    for plugin in plugins {
        let _ = writeln!(
            report,
            "  {} (v{})",
            plugin.name(),
            plugin.version().unwrap_or_default().to_string_lossy()
        );
    }

    Ok(report)
}

/// Route a statement using the configured plugins.
pub fn route(
    path: &Path,
    query: &str,
    params: &[String],
    binary: bool,
    in_transaction: bool,
) -> Result<String, Error> {
    let config = load(path)?;
    route_query(
        &config,
        loaded_plugins(),
        query,
        params,
        binary,
        in_transaction,
    )
}

/// Route a statement and describe the decision.
pub fn route_query(
    config: &Config,
    plugins: &[Plugin<'_>],
    query: &str,
    params: &[String],
    binary: bool,
    in_transaction: bool,
) -> Result<String, Error> {
    let cluster = config.cluster();
    let bind = bind(params, binary)?;

    let route = Router::new().query(&cluster, query, bind.as_ref(), in_transaction, plugins)?;

    let shards = match route.shard() {
        Shard::Direct(shard) => vec![shard],
        Shard::All => (0..cluster.shards()).collect(),
    };

    let mut output = format!("{}\n", route);
    for shard in shards {
        if let Some(pool) = cluster.pool(shard, route.is_read()) {
            let _ = writeln!(output, "  {}", pool);
        }
    }

    Ok(output)
}

/// Print plugin metrics.
pub fn metrics(path: &Path) -> Result<String, Error> {
    load(path)?;

    Ok(PluginStats::load()
        .metrics()
        .iter()
        .map(|metric| metric.to_string())
        .collect())
}

fn bind(params: &[String], binary: bool) -> Result<Option<Bind>, Error> {
    if params.is_empty() {
        return Ok(None);
    }

    if !binary {
        return Ok(Some(Bind::text(params.iter().map(|param| param.as_str()))?));
    }

    let mut values = vec![];
    for param in params {
        let value: i64 = param
            .parse()
            .map_err(|_| Error::BinaryParameter(param.clone()))?;
        values.push(Some(Bytes::copy_from_slice(&value.to_be_bytes())));
    }

    Ok(Some(Bind::new(values, vec![1])?))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{Database, Role};

    fn config() -> Config {
        let mut databases = vec![];
        for shard in 0..2 {
            databases.push(Database {
                name: format!("shard_{}", shard),
                host: "127.0.0.1".into(),
                port: 5432 + shard as u16,
                shard,
                role: Role::Primary,
            });
            databases.push(Database {
                name: format!("shard_{}_replica", shard),
                host: "127.0.0.2".into(),
                port: 5432 + shard as u16,
                shard,
                role: Role::Replica,
            });
        }

        Config {
            databases,
            ..Default::default()
        }
    }

    #[test]
    fn test_route_without_plugins() {
        let output = route_query(&config(), &[], "SELECT 1", &[], false, false).unwrap();
        assert_eq!(
            output,
            "shard=all, role=replica\n  shard 0 replica [127.0.0.2:5432]\n  shard 1 replica [127.0.0.2:5433]\n"
        );

        let output = route_query(
            &config(),
            &[],
            "UPDATE users SET name = $1",
            &["alice".into()],
            false,
            false,
        )
        .unwrap();
        assert!(output.starts_with("shard=all, role=primary\n"));
    }

    #[test]
    fn test_bind() {
        assert!(bind(&[], true).unwrap().is_none());

        let text = bind(&["5".into()], false).unwrap().unwrap();
        assert!(text.format_codes().is_empty());
        assert_eq!(text.parameter(0), Some(Some(&b"5"[..])));

        let binary = bind(&["5".into(), "6".into()], true).unwrap().unwrap();
        assert_eq!(binary.format_codes(), &[1, 1]);
        assert_eq!(binary.parameter(1), Some(Some(&6_i64.to_be_bytes()[..])));

        assert!(matches!(
            bind(&["five".into()], true),
            Err(Error::BinaryParameter(_))
        ));
    }

    #[test]
    fn test_parse_cli() {
        let cli = Cli::parse_from([
            "pgroute",
            "--config",
            "router.toml",
            "route",
            "--query",
            "SELECT 1",
            "--param",
            "1",
            "--param",
            "2",
            "--in-transaction",
        ]);

        assert_eq!(cli.config, PathBuf::from("router.toml"));
        match cli.command {
            Some(Commands::Route {
                query,
                param,
                binary,
                in_transaction,
            }) => {
                assert_eq!(query, "SELECT 1");
                assert_eq!(param, vec!["1", "2"]);
                assert!(!binary);
                assert!(in_transaction);
            }
            command => panic!("unexpected command: {:?}", command),
        }
    }
}
