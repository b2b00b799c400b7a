//! Router plugins.

pub mod error;

pub use error::Error;

use std::fmt::Display;
use std::time::Instant;

use once_cell::sync::OnceCell;
use pgroute_plugin::abi::AbiRevision;
use pgroute_plugin::comp;
use pgroute_plugin::libloading::Library;
use pgroute_plugin::Plugin;
use tracing::{debug, error, info, warn};

use crate::stats::PluginCounters;

static LIBS: OnceCell<Vec<(String, Library)>> = OnceCell::new();
pub static PLUGINS: OnceCell<Vec<Plugin<'static>>> = OnceCell::new();

/// `pg_query` version the router was built with.
const PG_QUERY_VERSION: Option<&str> = option_env!("PGROUTE_PGQUERY_VERSION");

/// Reason a plugin can't be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    /// Plugin doesn't say which compiler built it.
    MissingRustcVersion,
    /// Built with another compiler.
    RustcVersion(String),
    /// Built with another `pg_query`.
    PgQueryVersion(String),
    /// Built against another router context layout.
    AbiRevision(u32),
}

impl Skip {
    /// Plugin can't be skipped, loading has to stop.
    pub fn fatal(&self) -> bool {
        matches!(self, Self::AbiRevision(_))
    }
}

impl Display for Skip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRustcVersion => write!(f, "it doesn't expose its Rust compiler version"),
            Self::RustcVersion(version) => write!(
                f,
                "it was compiled with different compiler version ({})",
                version
            ),
            Self::PgQueryVersion(version) => {
                write!(f, "it was compiled with different pg_query version ({})", version)
            }
            Self::AbiRevision(revision) => write!(
                f,
                "it was built against ABI revision {}, expected revision {}",
                revision,
                u32::from(AbiRevision::CURRENT)
            ),
        }
    }
}

/// Check that the plugin was built the same way as the router.
///
/// Versions are compared byte for byte. Plugins written in other
/// languages don't have to return UTF-8.
pub fn check(plugin: &Plugin<'_>) -> Result<(), Skip> {
    match plugin.abi_revision() {
        Ok(revision) if revision.compatible(AbiRevision::CURRENT) => (),
        Ok(revision) => return Err(Skip::AbiRevision(revision.into())),
        Err(revision) => return Err(Skip::AbiRevision(revision)),
    }

    match plugin.rustc_version() {
        Some(version) if version.as_bytes() == comp::rustc_version().as_bytes() => (),
        Some(version) => {
            return Err(Skip::RustcVersion(
                version.to_string_lossy().into_owned(),
            ))
        }
        None => return Err(Skip::MissingRustcVersion),
    }

    if let (Some(version), Some(expected)) = (plugin.pg_query_version(), PG_QUERY_VERSION) {
        if !version.as_bytes().is_empty() && version.as_bytes() != expected.as_bytes() {
            return Err(Skip::PgQueryVersion(
                version.to_string_lossy().into_owned(),
            ));
        }
    }

    Ok(())
}

/// Check plugins and run their init hooks.
///
/// Incompatible plugins are skipped, unless they were built against
/// another ABI revision. That's a configuration error and none of the
/// plugins are initialized.
pub fn prepare<'a>(
    plugins: impl IntoIterator<Item = Plugin<'a>>,
) -> Result<Vec<Plugin<'a>>, Error> {
    let mut compatible = vec![];

    for plugin in plugins {
        match check(&plugin) {
            Ok(()) => compatible.push(plugin),
            Err(Skip::AbiRevision(revision)) => {
                error!(
                    "plugin \"{}\" can't be loaded because {}",
                    plugin.name(),
                    Skip::AbiRevision(revision)
                );
                return Err(Error::AbiRevision {
                    name: plugin.name().to_owned(),
                    revision,
                });
            }
            Err(skip) => warn!("skipping plugin \"{}\" because {}", plugin.name(), skip),
        }
    }

    for plugin in &compatible {
        let now = Instant::now();

        if plugin.init() {
            debug!("plugin \"{}\" initialized", plugin.name());
        }
        PluginCounters::get(plugin.name());

        info!(
            "loaded \"{}\" plugin (v{}) [{:.4}ms]",
            plugin.name(),
            plugin.version().unwrap_or_default().to_string_lossy(),
            now.elapsed().as_secs_f64() * 1000.0
        );
    }

    Ok(compatible)
}

/// Load plugins.
///
/// Libraries that can't be opened are skipped. Call this once, before routing
/// any statements. Until plugins load successfully, calling this again
/// repeats the checks and returns the same error.
pub fn load(names: &[&str]) -> Result<(), Error> {
    let libs = LIBS.get_or_init(|| {
        let mut libs = vec![];
        for name in names {
            match Plugin::library(name) {
                Ok(lib) => libs.push((name.to_string(), lib)),
                Err(err) => {
                    error!("plugin \"{}\" failed to load: {:#?}", name, err);
                }
            }
        }
        libs
    });

    install(
        &PLUGINS,
        libs.iter().map(|(name, lib)| Plugin::load(name, lib)),
    )
}

/// Prepare plugins and store them, unless that already happened.
fn install<'a>(
    cell: &OnceCell<Vec<Plugin<'a>>>,
    plugins: impl IntoIterator<Item = Plugin<'a>>,
) -> Result<(), Error> {
    if cell.get().is_some() {
        return Ok(());
    }

    let plugins = prepare(plugins)?;
    let _ = cell.set(plugins);

    Ok(())
}

/// Shutdown plugins.
pub fn shutdown() {
    if let Some(plugins) = plugins() {
        for plugin in plugins {
            plugin.fini();
        }
    }
}

/// Get plugin by name.
pub fn plugin(name: &str) -> Option<&'static Plugin<'static>> {
    PLUGINS.get()?.iter().find(|plugin| plugin.name() == name)
}

/// Get all loaded plugins.
pub fn plugins() -> Option<&'static Vec<Plugin<'static>>> {
    PLUGINS.get()
}

/// Load plugins from config.
pub fn load_from_config() -> Result<(), Error> {
    let config = crate::config::config();
    load(&config.plugin_names())
}
