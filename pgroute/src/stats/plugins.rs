//! Per-plugin routing counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::{Measurement, Metric, OpenMetric};
use crate::router::plugins::PluginOutput;

static COUNTERS: Lazy<RwLock<HashMap<String, Arc<PluginCounters>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Counters for one plugin.
#[derive(Debug, Default)]
pub struct PluginCounters {
    routes: AtomicU64,
    opinions: AtomicU64,
    invalid: AtomicU64,
}

impl PluginCounters {
    /// Counters for the plugin, created on first use.
    pub fn get(plugin: &str) -> Arc<PluginCounters> {
        if let Some(counters) = COUNTERS.read().get(plugin) {
            return counters.clone();
        }

        COUNTERS
            .write()
            .entry(plugin.to_owned())
            .or_default()
            .clone()
    }

    /// Count one call to the plugin's route function.
    pub fn record(&self, output: &PluginOutput) {
        self.routes.fetch_add(1, Ordering::Relaxed);
        if output.provided() {
            self.opinions.fetch_add(1, Ordering::Relaxed);
        }
        if !output.invalid.is_empty() {
            self.invalid.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn routes(&self) -> u64 {
        self.routes.load(Ordering::Relaxed)
    }

    pub fn opinions(&self) -> u64 {
        self.opinions.load(Ordering::Relaxed)
    }

    pub fn invalid(&self) -> u64 {
        self.invalid.load(Ordering::Relaxed)
    }
}

struct PluginMetric {
    name: String,
    help: String,
    values: Vec<(String, u64)>,
}

impl OpenMetric for PluginMetric {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn metric_type(&self) -> String {
        "counter".into()
    }

    fn help(&self) -> Option<String> {
        Some(self.help.clone())
    }

    fn measurements(&self) -> Vec<Measurement> {
        self.values
            .iter()
            .map(|(plugin, value)| Measurement {
                labels: vec![("plugin".into(), plugin.clone())],
                measurement: (*value).into(),
            })
            .collect()
    }
}

/// Snapshot of all plugin counters.
pub struct PluginStats {
    counters: Vec<(String, u64, u64, u64)>,
}

impl PluginStats {
    pub fn load() -> Self {
        let mut counters = COUNTERS
            .read()
            .iter()
            .map(|(name, counters)| {
                (
                    name.clone(),
                    counters.routes(),
                    counters.opinions(),
                    counters.invalid(),
                )
            })
            .collect::<Vec<_>>();
        counters.sort_by(|a, b| a.0.cmp(&b.0));

        Self { counters }
    }

    pub fn metrics(&self) -> Vec<Metric> {
        let values = |value: fn(&(String, u64, u64, u64)) -> u64| {
            self.counters
                .iter()
                .map(|counter| (counter.0.clone(), value(counter)))
                .collect::<Vec<_>>()
        };

        vec![
            Metric::new(PluginMetric {
                name: "plugin_routes_total".into(),
                help: "Statements routed through the plugin".into(),
                values: values(|counter| counter.1),
            }),
            Metric::new(PluginMetric {
                name: "plugin_opinions_total".into(),
                help: "Statements the plugin picked a shard or a role for".into(),
                values: values(|counter| counter.2),
            }),
            Metric::new(PluginMetric {
                name: "plugin_invalid_total".into(),
                help: "Routes with values the router couldn't use".into(),
                values: values(|counter| counter.3),
            }),
        ]
    }
}

#[cfg(test)]
mod test {
    use pgroute_plugin::PrRoute;

    use super::*;

    #[test]
    fn test_counters() {
        let counters = PluginCounters::get("test_counters");
        assert!(Arc::ptr_eq(&counters, &PluginCounters::get("test_counters")));

        let opinion = PluginOutput::decode(
            &PrRoute {
                shard: 1,
                read_write: 2,
            },
            2,
        );
        let invalid = PluginOutput::decode(
            &PrRoute {
                shard: 5,
                read_write: 2,
            },
            2,
        );
        counters.record(&opinion);
        counters.record(&invalid);
        counters.record(&PluginOutput::default());

        assert_eq!(counters.routes(), 3);
        assert_eq!(counters.opinions(), 1);
        assert_eq!(counters.invalid(), 1);

        let rendered = PluginStats::load()
            .metrics()
            .iter()
            .map(|metric| metric.to_string())
            .collect::<String>();
        assert!(rendered.contains("plugin_routes_total{plugin=\"test_counters\"} 3"));
        assert!(rendered.contains("plugin_opinions_total{plugin=\"test_counters\"} 1"));
        assert!(rendered.contains("plugin_invalid_total{plugin=\"test_counters\"} 1"));
    }
}
