//! Databases behind the router.

pub mod cluster;

pub use cluster::{Address, Cluster, Pool, Shard};
