//! Cluster topology, as seen by the query router.

use std::fmt::Display;

use crate::config::{Database, DefaultShard, ReadWriteStrategy, Role};

/// Database address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Database name from the configuration.
    pub name: String,
    /// Host name or IP.
    pub host: String,
    /// Port.
    pub port: u16,
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<&Database> for Address {
    fn from(database: &Database) -> Self {
        Self {
            name: database.name.clone(),
            host: database.host.clone(),
            port: database.port,
        }
    }
}

/// Databases serving one shard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shard {
    primary: Option<Address>,
    replicas: Vec<Address>,
}

impl Shard {
    pub fn primary(&self) -> Option<&Address> {
        self.primary.as_ref()
    }

    pub fn replicas(&self) -> &[Address] {
        &self.replicas
    }
}

/// Databases a route resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool<'a> {
    pub shard: usize,
    pub role: Role,
    pub addresses: Vec<&'a Address>,
}

impl Display for Pool<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let addresses = self
            .addresses
            .iter()
            .map(|address| address.to_string())
            .collect::<Vec<_>>();
        write!(
            f,
            "shard {} {} [{}]",
            self.shard,
            self.role,
            addresses.join(", ")
        )
    }
}

/// Sharded cluster.
#[derive(Debug, Clone, Default)]
pub struct Cluster {
    shards: Vec<Shard>,
    rw_strategy: ReadWriteStrategy,
    default_shard: DefaultShard,
}

impl Cluster {
    /// Group databases by shard.
    pub fn new(databases: &[Database], rw_strategy: ReadWriteStrategy) -> Self {
        let count = databases
            .iter()
            .map(|database| database.shard + 1)
            .max()
            .unwrap_or(0);
        let mut shards = vec![Shard::default(); count];

        for database in databases {
            let shard = &mut shards[database.shard];
            match database.role {
                Role::Primary => shard.primary = Some(database.into()),
                Role::Replica => shard.replicas.push(database.into()),
            }
        }

        Self {
            shards,
            rw_strategy,
            default_shard: DefaultShard::default(),
        }
    }

    /// Set the shard used when no one picked one.
    pub fn with_default_shard(mut self, default_shard: DefaultShard) -> Self {
        self.default_shard = default_shard;
        self
    }

    /// Number of shards.
    pub fn shards(&self) -> usize {
        self.shards.len()
    }

    /// Get shard by number.
    pub fn shard(&self, shard: usize) -> Option<&Shard> {
        self.shards.get(shard)
    }

    /// Every shard has a primary.
    pub fn has_primary(&self) -> bool {
        !self.shards.is_empty() && self.shards.iter().all(|shard| shard.primary.is_some())
    }

    /// At least one shard has a replica.
    pub fn has_replicas(&self) -> bool {
        self.shards.iter().any(|shard| !shard.replicas.is_empty())
    }

    /// Cluster can't accept writes.
    pub fn read_only(&self) -> bool {
        self.shards.iter().all(|shard| shard.primary.is_none())
    }

    /// Cluster has no replicas, only primaries.
    pub fn write_only(&self) -> bool {
        !self.has_replicas()
    }

    pub fn read_write_strategy(&self) -> ReadWriteStrategy {
        self.rw_strategy
    }

    pub fn default_shard(&self) -> DefaultShard {
        self.default_shard
    }

    /// Databases that serve a statement sent to this shard.
    ///
    /// Reads go to replicas when the shard has any. Writes go to the primary,
    /// unless the shard doesn't have one.
    pub fn pool(&self, shard: usize, read: bool) -> Option<Pool<'_>> {
        let databases = self.shards.get(shard)?;

        let replicas = || Pool {
            shard,
            role: Role::Replica,
            addresses: databases.replicas.iter().collect(),
        };

        if read && !databases.replicas.is_empty() {
            return Some(replicas());
        }

        match databases.primary {
            Some(ref primary) => Some(Pool {
                shard,
                role: Role::Primary,
                addresses: vec![primary],
            }),
            None if !databases.replicas.is_empty() => Some(replicas()),
            None => None,
        }
    }
}
