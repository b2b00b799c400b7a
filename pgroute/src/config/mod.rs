//! Configuration.

pub mod error;

pub use error::Error;

use std::collections::HashSet;
use std::fs::read_to_string;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend::Cluster;

static CONFIG: Lazy<ArcSwap<Config>> = Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// Current configuration.
pub fn config() -> Arc<Config> {
    CONFIG.load().clone()
}

/// Load the configuration file from disk.
pub fn load(path: &Path) -> Result<Config, Error> {
    let config = Config::load(path)?;
    set(config)
}

/// Validate and store the configuration.
pub fn set(config: Config) -> Result<Config, Error> {
    config.check()?;
    CONFIG.store(Arc::new(config.clone()));
    Ok(config)
}

/// pgroute.toml
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: General,
    /// Databases the router sends statements to.
    #[serde(default)]
    pub databases: Vec<Database>,
    /// Router plugins, consulted in this order.
    #[serde(default)]
    pub plugins: Vec<Plugin>,
}

impl Config {
    /// Load configuration from disk or use defaults.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let source = match read_to_string(path) {
            Ok(source) => source,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(
                    "\"{}\" doesn't exist, loading defaults instead",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };

        let config = Self::parse(&source)?;
        info!("loaded \"{}\"", path.display());

        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn parse(source: &str) -> Result<Self, Error> {
        toml::from_str(source).map_err(|err| Error::config(source, err))
    }

    /// Shards must be numbered without gaps and have at most one primary each.
    pub fn check(&self) -> Result<(), Error> {
        let shards = self
            .databases
            .iter()
            .map(|database| database.shard + 1)
            .max()
            .unwrap_or(0);

        for shard in 0..shards {
            let primaries = self
                .databases
                .iter()
                .filter(|database| database.shard == shard && database.role == Role::Primary)
                .count();
            let replicas = self
                .databases
                .iter()
                .filter(|database| database.shard == shard && database.role == Role::Replica)
                .count();

            if primaries + replicas == 0 {
                return Err(Error::MissingShard(shard));
            }

            if primaries > 1 {
                return Err(Error::MultiplePrimaries(shard));
            }
        }

        let mut names = HashSet::new();
        for plugin in &self.plugins {
            if !names.insert(plugin.name.as_str()) {
                return Err(Error::DuplicatePlugin(plugin.name.clone()));
            }
        }

        Ok(())
    }

    /// Cluster topology described by `[[databases]]`.
    pub fn cluster(&self) -> Cluster {
        Cluster::new(&self.databases, self.general.read_write_strategy)
            .with_default_shard(self.general.default_shard)
    }

    /// Configured plugin names, in order.
    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins
            .iter()
            .map(|plugin| plugin.name.as_str())
            .collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct General {
    /// How aggressively reads are sent to replicas.
    #[serde(default)]
    pub read_write_strategy: ReadWriteStrategy,
    /// Where statements go when nobody picked a shard.
    #[serde(default)]
    pub default_shard: DefaultShard,
    /// Prefix added to every metric name.
    #[serde(default = "General::openmetrics_namespace")]
    pub openmetrics_namespace: Option<String>,
}

impl General {
    fn openmetrics_namespace() -> Option<String> {
        Some("pgroute_".into())
    }
}

impl Default for General {
    fn default() -> Self {
        Self {
            read_write_strategy: ReadWriteStrategy::default(),
            default_shard: DefaultShard::default(),
            openmetrics_namespace: Self::openmetrics_namespace(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ReadWriteStrategy {
    /// Every statement inside a transaction is a write.
    #[default]
    Conservative,
    /// Reads inside transactions can go to replicas.
    Aggressive,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Copy)]
#[serde(rename_all = "snake_case")]
pub enum DefaultShard {
    /// Broadcast to every shard.
    #[default]
    All,
    /// Pick shards in turn.
    RoundRobin,
}

/// Database server the router sends statements to.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Database {
    /// Database name.
    pub name: String,
    /// Database role, e.g. primary.
    #[serde(default)]
    pub role: Role,
    /// Database host or IP address, e.g. 127.0.0.1.
    pub host: String,
    /// Database port, e.g. 5432.
    #[serde(default = "Database::port")]
    pub port: u16,
    /// Shard.
    #[serde(default)]
    pub shard: usize,
}

impl Database {
    fn port() -> u16 {
        5432
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, Hash, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Primary,
    Replica,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Replica => write!(f, "replica"),
        }
    }
}

/// Router plugin.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Plugin {
    /// Library name or path.
    pub name: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        let config = Config::parse(
            r#"
[general]
read_write_strategy = "aggressive"
default_shard = "round_robin"

[[databases]]
name = "shard_0"
host = "127.0.0.1"

[[databases]]
name = "shard_0_replica"
host = "127.0.0.2"
role = "replica"

[[databases]]
name = "shard_1"
host = "127.0.0.3"
port = 6432
shard = 1

[[plugins]]
name = "pgroute_example_plugin"
"#,
        )
        .unwrap();

        assert_eq!(
            config.general.read_write_strategy,
            ReadWriteStrategy::Aggressive
        );
        assert_eq!(config.general.default_shard, DefaultShard::RoundRobin);
        assert_eq!(config.databases.len(), 3);
        assert_eq!(config.databases[0].port, 5432);
        assert_eq!(config.databases[1].role, Role::Replica);
        assert_eq!(config.databases[2].port, 6432);
        assert_eq!(config.plugin_names(), vec!["pgroute_example_plugin"]);
        assert!(config.check().is_ok());

        let cluster = config.cluster();
        assert_eq!(cluster.shards(), 2);
        assert!(cluster.has_replicas());
    }

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(
            config.general.read_write_strategy,
            ReadWriteStrategy::Conservative
        );
        assert_eq!(config.general.default_shard, DefaultShard::All);
        assert_eq!(
            config.general.openmetrics_namespace.as_deref(),
            Some("pgroute_")
        );
    }

    #[test]
    fn test_syntax_error_line() {
        let err = Config::parse("[general]\nread_write_strategy = \"sometimes\"\n").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 2, .. }), "{}", err);
    }

    #[test]
    fn test_unknown_field() {
        assert!(Config::parse("[general]\nworkers = 2\n").is_err());
        assert!(Config::parse("[[databases]]\nname = \"a\"\nhost = \"b\"\nrole = \"leader\"\n").is_err());
    }

    #[test]
    fn test_check() {
        let database = |shard, role| Database {
            name: format!("shard_{}", shard),
            host: "127.0.0.1".into(),
            port: 5432,
            shard,
            role,
        };

        let config = Config {
            databases: vec![database(0, Role::Primary), database(2, Role::Primary)],
            ..Default::default()
        };
        assert!(matches!(config.check(), Err(Error::MissingShard(1))));

        let config = Config {
            databases: vec![database(0, Role::Primary), database(0, Role::Primary)],
            ..Default::default()
        };
        assert!(matches!(config.check(), Err(Error::MultiplePrimaries(0))));

        let plugin = Plugin {
            name: "router".into(),
        };
        let config = Config {
            plugins: vec![plugin.clone(), plugin],
            ..Default::default()
        };
        assert!(matches!(config.check(), Err(Error::DuplicatePlugin(name)) if name == "router"));
    }

    #[test]
    fn test_sample_config() {
        let config = Config::parse(include_str!("../../../pgroute.toml")).unwrap();
        assert!(config.check().is_ok());
        assert_eq!(config.cluster().shards(), 2);
        assert_eq!(config.plugin_names(), vec!["pgroute_example_plugin"]);
    }

    #[test]
    fn test_missing_file() {
        let config = Config::load(Path::new("/definitely/not/here/pgroute.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
