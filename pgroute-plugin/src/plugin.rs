//! Plugin interface.
//!
//! This loads the shared library using [`libloading`] and exposes
//! a safe interface to the plugin's methods.
//!

use std::{marker::PhantomData, path::Path};

use libloading::{library_filename, Library};

use crate::{abi::AbiRevision, PrRoute, PrRouterContext, PrStr};

/// `pgroute_route`.
pub type RouteFn = unsafe extern "C" fn(PrRouterContext, *mut PrRoute);
/// `pgroute_init` and `pgroute_fini`.
pub type HookFn = unsafe extern "C" fn();
/// `pgroute_rustc_version`, `pgroute_pg_query_version` and `pgroute_plugin_version`.
pub type VersionFn = unsafe extern "C" fn(*mut PrStr);
/// `pgroute_abi_revision`.
pub type RevisionFn = unsafe extern "C" fn() -> u32;

/// Functions exported by a plugin. All of them are optional.
#[derive(Debug, Default, Copy, Clone)]
pub struct PluginSymbols {
    /// Initialization routine.
    pub init: Option<HookFn>,
    /// Shutdown routine.
    pub fini: Option<HookFn>,
    /// Route query.
    pub route: Option<RouteFn>,
    /// Compiler version.
    pub rustc_version: Option<VersionFn>,
    /// `pg_query` version.
    pub pg_query_version: Option<VersionFn>,
    /// Plugin version.
    pub plugin_version: Option<VersionFn>,
    /// ABI revision.
    pub abi_revision: Option<RevisionFn>,
}

/// Plugin interface.
///
/// Methods are loaded using `libloading`. If required methods aren't found,
/// the plugin isn't loaded. All optional methods are checked first, before being
/// executed.
///
/// Using this interface is reasonably safe.
///
#[derive(Debug)]
pub struct Plugin<'a> {
    /// Plugin name.
    name: String,
    /// Exported functions.
    symbols: PluginSymbols,
    /// Symbols are only valid while the library is loaded.
    _library: PhantomData<&'a Library>,
}

impl<'a> Plugin<'a> {
    /// Load plugin's shared library using a cross-platform naming convention.
    ///
    /// Plugin has to be in `LD_LIBRARY_PATH`, in a standard location
    /// for the operating system, or be provided as an absolute or relative path,
    /// including the platform-specific extension.
    ///
    /// ### Example
    ///
    /// ```no_run
    /// use pgroute_plugin::Plugin;
    ///
    /// let plugin_lib = Plugin::library("/home/pgroute/plugin.so").unwrap();
    /// let plugin_lib = Plugin::library("plugin.so").unwrap();
    /// ```
    ///
    pub fn library<P: AsRef<Path>>(name: P) -> Result<Library, libloading::Error> {
        if name.as_ref().exists() {
            let name = name.as_ref().display().to_string();
            unsafe { Library::new(&name) }
        } else {
            let name = library_filename(name.as_ref());
            unsafe { Library::new(name) }
        }
    }

    /// Load standard plugin methods from the plugin library.
    ///
    /// ### Arguments
    ///
    /// * `name`: Plugin name. Can be any name you want, it's only used for logging.
    /// * `library`: `libloading::Library` reference. Must have the same, ideally static, lifetime as the plugin.
    ///
    pub fn load(name: &str, library: &'a Library) -> Self {
        // SAFETY: Signatures are part of the ABI. Whether the plugin was built
        // against the same revision is checked before any of them are called.
        let symbols = unsafe {
            PluginSymbols {
                init: library.get::<HookFn>(b"pgroute_init\0").ok().map(|f| *f),
                fini: library.get::<HookFn>(b"pgroute_fini\0").ok().map(|f| *f),
                route: library.get::<RouteFn>(b"pgroute_route\0").ok().map(|f| *f),
                rustc_version: library
                    .get::<VersionFn>(b"pgroute_rustc_version\0")
                    .ok()
                    .map(|f| *f),
                pg_query_version: library
                    .get::<VersionFn>(b"pgroute_pg_query_version\0")
                    .ok()
                    .map(|f| *f),
                plugin_version: library
                    .get::<VersionFn>(b"pgroute_plugin_version\0")
                    .ok()
                    .map(|f| *f),
                abi_revision: library
                    .get::<RevisionFn>(b"pgroute_abi_revision\0")
                    .ok()
                    .map(|f| *f),
            }
        };

        Self {
            name: name.to_owned(),
            symbols,
            _library: PhantomData,
        }
    }

    /// Execute plugin's initialization routine.
    /// Returns true if the route exists and was executed, false otherwise.
    pub fn init(&self) -> bool {
        if let Some(init) = self.symbols.init {
            unsafe {
                init();
            }
            true
        } else {
            false
        }
    }

    /// Execute plugin's shutdown routine.
    pub fn fini(&self) {
        if let Some(fini) = self.symbols.fini {
            unsafe { fini() }
        }
    }

    /// Plugin exports a route function.
    pub fn routes(&self) -> bool {
        self.symbols.route.is_some()
    }

    /// Execute plugin's route routine. Determines where a statement should be sent.
    /// Returns a route if the routine is defined, or `None` if not.
    ///
    /// The context must not be used once this returns.
    ///
    /// ### Arguments
    ///
    /// * `context`: Statement context created by the host's query router.
    ///
    pub fn route(&self, context: PrRouterContext) -> Option<PrRoute> {
        if let Some(route) = self.symbols.route {
            let mut output = PrRoute::default();
            unsafe {
                route(context, &mut output as *mut PrRoute);
            }
            Some(output)
        } else {
            None
        }
    }

    /// Returns plugin's name. This  is the same name as what
    /// is passed to [`Plugin::load`] function.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the Rust compiler version used to build the plugin.
    /// This version must match the compiler version used to build
    /// the host, or the plugin won't be loaded.
    pub fn rustc_version(&self) -> Option<PrStr> {
        self.version_symbol(self.symbols.rustc_version)
    }

    /// Returns the `pg_query` version the plugin was built with, if it
    /// exported one.
    pub fn pg_query_version(&self) -> Option<PrStr> {
        self.version_symbol(self.symbols.pg_query_version)
    }

    /// Get plugin version. It's set in plugin's
    /// `Cargo.toml`.
    pub fn version(&self) -> Option<PrStr> {
        self.version_symbol(self.symbols.plugin_version)
    }

    /// ABI revision the plugin was built against.
    ///
    /// Plugins that don't export it predate revision 2. Unknown
    /// revisions are returned as-is.
    pub fn abi_revision(&self) -> Result<AbiRevision, u32> {
        match self.symbols.abi_revision {
            Some(revision) => AbiRevision::try_from(unsafe { revision() }),
            None => Ok(AbiRevision::V1),
        }
    }

    fn version_symbol(&self, func: Option<VersionFn>) -> Option<PrStr> {
        func.map(|func| {
            let mut output = PrStr::default();
            unsafe {
                func(&mut output as *mut PrStr);
            }
            output
        })
    }
}

impl Plugin<'static> {
    /// Create a plugin from functions linked into this binary.
    ///
    /// ### Example
    ///
    /// ```
    /// use pgroute_plugin::{Plugin, PluginSymbols, PrRoute, PrRouterContext};
    ///
    /// unsafe extern "C" fn route(_context: PrRouterContext, output: *mut PrRoute) {
    ///     unsafe { (*output).shard = -1 };
    /// }
    ///
    /// let plugin = Plugin::from_symbols("broadcast", PluginSymbols {
    ///     route: Some(route),
    ///     ..Default::default()
    /// });
    /// assert!(plugin.routes());
    /// ```
    pub fn from_symbols(name: &str, symbols: PluginSymbols) -> Self {
        Self {
            name: name.to_owned(),
            symbols,
            _library: PhantomData,
        }
    }
}
