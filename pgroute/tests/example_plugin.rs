use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::fs::read_dir;
use std::path::PathBuf;

use pgroute::config::{Config, Database, Role};
use pgroute::plugin;
use pgroute::router::{Route, Router, Shard};
use pgroute::stats::{PluginCounters, PluginStats};
use pgroute_plugin::abi::AbiRevision;

/// Shared library of `pgroute-example-plugin`, built by cargo as a dev-dependency.
fn example_plugin() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let deps = exe.parent()?;
    let prefix = format!("{}pgroute_example_plugin", DLL_PREFIX);

    [deps, deps.parent()?]
        .into_iter()
        .filter_map(|dir| read_dir(dir).ok())
        .flatten()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(DLL_SUFFIX))
        })
}

fn config() -> Config {
    Config {
        databases: vec![
            Database {
                name: "primary".into(),
                host: "127.0.0.1".into(),
                port: 5432,
                shard: 0,
                role: Role::Primary,
            },
            Database {
                name: "replica".into(),
                host: "127.0.0.2".into(),
                port: 5432,
                shard: 0,
                role: Role::Replica,
            },
        ],
        ..Default::default()
    }
}

#[test]
fn test_example_plugin() {
    let path = example_plugin().expect("example plugin library not found next to the test binary");
    let name = path.to_str().unwrap();

    plugin::load(&[name]).unwrap();

    let plugins = plugin::plugins().unwrap();
    assert_eq!(plugins.len(), 1);

    let loaded = plugin::plugin(name).unwrap();
    assert_eq!(plugin::check(loaded), Ok(()));
    assert!(loaded.routes());
    assert_eq!(loaded.abi_revision(), Ok(AbiRevision::CURRENT));
    assert_eq!(loaded.version().unwrap().to_str(), Ok("0.1.0"));

    let cluster = config().cluster();
    let route = Router::new()
        .query(&cluster, "SELECT * FROM users", None, false, plugins)
        .unwrap();
    assert_eq!(route, Route::read(Shard::Direct(0)));

    let counters = PluginCounters::get(name);
    assert_eq!(counters.routes(), 1);
    assert_eq!(counters.opinions(), 1);

    let rendered = PluginStats::load()
        .metrics()
        .iter()
        .map(|metric| metric.to_string())
        .collect::<String>();
    assert!(rendered.contains(&format!("plugin_routes_total{{plugin=\"{}\"}} 1", name)));

    // Already loaded.
    plugin::load(&[name]).unwrap();
    assert_eq!(plugin::plugins().unwrap().len(), 1);

    plugin::shutdown();
}
