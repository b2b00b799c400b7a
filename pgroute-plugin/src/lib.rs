//! pgroute plugins library.
//!
//! Implements data types and methods plugins can use to interact with the pgroute host at runtime.
//!
//! # Getting started
//!
//! Create a Rust library package with Cargo:
//!
//! ```bash
//! cargo init --lib my_plugin
//! ```
//!
//! The plugin needs to be built as a C ABI-compatible shared library. Add the following to Cargo.toml in the new plugin directory:
//!
//! ```toml
//! [lib]
//! crate-type = ["rlib", "cdylib"]
//! ```
//!
//! ## Dependencies
//!
//! The host is using [`pg_query`] to parse SQL. It produces an Abstract Syntax Tree (AST) which plugins can use to inspect queries
//! and make statement routing decisions.
//!
//! The AST is computed by the host at runtime. It then passes it down to plugins, using a FFI interface, without copying it. To make this safe, plugins must follow the
//! following 2 requirements:
//!
//! 1. Plugins must be compiled with the **same version of the Rust compiler** as the host. This is automatically checked at runtime and plugins that don't do this are not loaded.
//! 2. Plugins must use the **same version of [`pg_query`] crate** as the host. This happens automatically when using `pg_query` structs re-exported by this crate.
//!
//! Every statement is tagged with the parser version that produced it. [`Statement::protobuf`] returns `None`
//! for versions this crate doesn't recognize and plugins are expected to return [`Route::unknown`] in that case.
//!
//! #### Configure dependencies
//!
//! Add the following to your plugin's `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! pgroute-plugin = "0.2.0"
//!
//! [build-dependencies]
//! pgroute-plugin-build = "0.2.0"
//! ```
//!
//! # Required methods
//!
//! All plugins need to implement a set of functions that the host calls at runtime to load the plugin. You can implement them automatically
//! using a macro. Inside the plugin's `src/lib.rs` file, add the following code:
//!
//! ```
//! // src/lib.rs
//! use pgroute_plugin::macros;
//!
//! macros::plugin!();
//! ```
//!
//! Among other things, this exports the ABI revision the plugin was built against. The host refuses to load
//! plugins built against a different revision of [`PrRouterContext`].
//!
//! # Routing queries
//!
//! Plugins are most commonly used to route queries. To do this, they need to implement a function that reads
//! the [`Context`] passed in by the host, and returns a [`Route`] that indicates which database the query should be sent to.
//!
//! ### Example
//!
//! ```no_run
//! use pgroute_plugin::prelude::*;
//! use pg_query::NodeEnum;
//!
//! #[route]
//! fn route(context: Context) -> Route {
//!     let proto = match context.statement().protobuf() {
//!         Some(proto) => proto,
//!         None => return Route::unknown(),
//!     };
//!
//!     if let Some(NodeEnum::SelectStmt(_)) = proto.root() {
//!         return Route::new(Shard::Unknown, ReadWrite::Read);
//!     }
//!
//!     Route::new(Shard::Unknown, ReadWrite::Write)
//! }
//! ```
//!
//! The [`macros::route`] macro wraps the function into a safe FFI interface which the host calls at runtime.
//!
//! ### Parsing parameters
//!
//! If your clients are using prepared statements (or the extended protocol), query parameters will be sent separately
//! from query text. They are stored in the [`crate::parameters::Parameters`] struct, passed down from the host's query parser:
//!
//! ```
//! # use pgroute_plugin::prelude::*;
//! # let context = unsafe { Context::doc_test() };
//! let params = context.parameters();
//! if let Some(param) = params
//!     .get(0)
//!     .and_then(|p| p.decode(params.parameter_format(0))) {
//!         println!("param $1 = {:?}", param);
//! }
//! ```
//!
//! ### Errors
//!
//! Plugin functions cannot return errors. To handle errors, you can log them to `stderr` and return a default route,
//! which the host will ignore. If the function panics, the panic is caught at the FFI boundary and the host receives
//! [`Route::unknown`].
//!
//! # Enabling plugins
//!
//! Plugins are shared libraries, loaded by the host at runtime using `dlopen(3)`. If specifying only its name, make sure to place the plugin's shared library
//! into one of the following locations:
//!
//! - Any of the system default paths, e.g.: `/lib`, `/usr/lib`, `/lib64`, `/usr/lib64`, etc.
//! - Path specified by the `LD_LIBRARY_PATH` (on Linux) or `DYLD_LIBRARY_PATH` (Mac OS) environment variables.
//!
//! Alternatively, specify the relative or absolute path to the shared library as the plugin name. Plugins aren't loaded automatically. For each plugin you want to enable, add it to `pgroute.toml`:
//!
//! ```toml
//! [[plugins]]
//! # Plugin should be in /usr/lib or in LD_LIBRARY_PATH.
//! name = "my_plugin"
//!
//! [[plugins]]
//! # Absolute path to the plugin.
//! name = "/usr/local/lib/libmy_plugin.so"
//! ```
//!

pub mod bindings;

pub mod abi;
pub mod ast;
pub mod comp;
pub mod context;
pub mod parameters;
pub mod plugin;
pub mod prelude;
pub mod string;

pub use bindings::*;
pub use context::*;
pub use plugin::*;

pub use libloading;

pub use pg_query;
pub use pgroute_macros as macros;
