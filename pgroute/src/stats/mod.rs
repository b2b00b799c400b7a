//! Router statistics.

pub mod open_metric;
pub mod plugins;

pub use open_metric::*;
pub use plugins::{PluginCounters, PluginStats};
