//! Where a statement goes.

use std::fmt::Display;

/// Shard selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shard {
    /// One shard.
    Direct(usize),
    /// Every shard.
    All,
}

impl Display for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct(shard) => write!(f, "{}", shard),
            Self::All => write!(f, "all"),
        }
    }
}

/// Routing decision for a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    shard: Shard,
    read: bool,
}

impl Route {
    pub fn new(shard: Shard, read: bool) -> Self {
        Self { shard, read }
    }

    /// Read from a replica.
    pub fn read(shard: Shard) -> Self {
        Self::new(shard, true)
    }

    /// Write to a primary.
    pub fn write(shard: Shard) -> Self {
        Self::new(shard, false)
    }

    pub fn shard(&self) -> Shard {
        self.shard
    }

    pub fn is_read(&self) -> bool {
        self.read
    }

    pub fn is_write(&self) -> bool {
        !self.read
    }

    /// Statement goes to every shard.
    pub fn is_all_shards(&self) -> bool {
        self.shard == Shard::All
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "shard={}, role={}",
            self.shard,
            if self.read { "replica" } else { "primary" }
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            Route::read(Shard::Direct(2)).to_string(),
            "shard=2, role=replica"
        );
        assert_eq!(Route::write(Shard::All).to_string(), "shard=all, role=primary");
        assert!(Route::write(Shard::All).is_all_shards());
    }
}
