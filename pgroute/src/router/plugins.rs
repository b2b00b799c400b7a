//! Route returned by a plugin, translated into routing decisions.

use std::fmt::Display;

use pgroute_plugin::{PrRoute, ReadWrite, Shard as PrShard};

use super::route::{Route, Shard};

/// Route value the host can't act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidRoute {
    /// Shard doesn't exist, or isn't a documented sentinel.
    Shard { shard: i64, shards: usize },
    /// Not one of read, write or unknown.
    ReadWrite(u8),
}

impl Display for InvalidRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shard { shard, shards } => {
                write!(f, "shard {} is invalid, cluster has {} shards", shard, shards)
            }
            Self::ReadWrite(read_write) => write!(f, "read_write {} is invalid", read_write),
        }
    }
}

/// Output by one of the plugins.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct PluginOutput {
    /// Shard opinion.
    pub shard: Option<Shard>,
    /// Read/write opinion.
    pub read: Option<bool>,
    /// Values that were ignored.
    pub invalid: Vec<InvalidRoute>,
}

impl PluginOutput {
    /// Decode the plugin's route. Invalid values are recorded and treated
    /// as no opinion.
    pub fn decode(route: &PrRoute, shards: usize) -> Self {
        let mut output = Self::default();

        match route.shard.try_into() {
            Ok(PrShard::All) => output.shard = Some(Shard::All),
            Ok(PrShard::Direct(shard)) if shard < shards => {
                output.shard = Some(Shard::Direct(shard))
            }
            Ok(PrShard::Unknown) => (),
            Ok(PrShard::Direct(_)) | Err(_) => output.invalid.push(InvalidRoute::Shard {
                shard: route.shard,
                shards,
            }),
        }

        match route.read_write.try_into() {
            Ok(ReadWrite::Read) => output.read = Some(true),
            Ok(ReadWrite::Write) => output.read = Some(false),
            Ok(ReadWrite::Unknown) => (),
            Err(read_write) => output.invalid.push(InvalidRoute::ReadWrite(read_write)),
        }

        output
    }

    /// Plugin has an opinion on at least one axis.
    pub fn provided(&self) -> bool {
        self.shard.is_some() || self.read.is_some()
    }

    /// Merge with the host's own route. A write override
    /// turns every read into a write.
    pub fn apply(&self, defaults: &Route, write_override: bool) -> Route {
        let shard = self.shard.unwrap_or(defaults.shard());
        let read = self.read.unwrap_or(defaults.is_read()) && !write_override;

        Route::new(shard, read)
    }
}

impl Display for PluginOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.shard {
            Some(shard) => write!(f, "shard={}", shard)?,
            None => write!(f, "shard=unknown")?,
        }

        match self.read {
            Some(read) => write!(f, ", role={}", if read { "replica" } else { "primary" }),
            None => write!(f, ", role=unknown"),
        }
    }
}
