//! Macros used by pgroute plugins.
//!
//! Required and exported by the `pgroute-plugin` crate. You don't have to add this crate separately.
//!
use proc_macro::TokenStream;
use proc_macro2::{Ident, Span};
use quote::quote;
use syn::{FnArg, ItemFn, Pat, parse_macro_input, spanned::Spanned};

/// Generates required methods for the host to run at plugin load time.
///
/// ### Methods
///
/// * `pgroute_rustc_version`: Returns the version of the Rust compiler used to build the plugin.
/// * `pgroute_pg_query_version`: Returns the version of the pg_query library used by the plugin.
/// * `pgroute_plugin_version`: Returns the version of the plugin itself, taken from Cargo.toml.
/// * `pgroute_abi_revision`: Returns the router context revision the plugin was built against.
///
#[proc_macro]
pub fn plugin(_input: TokenStream) -> TokenStream {
    let expanded = quote! {
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn pgroute_rustc_version(output: *mut pgroute_plugin::PrStr) {
            let version = pgroute_plugin::comp::rustc_version();
            unsafe {
                *output = version;
            }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn pgroute_pg_query_version(output: *mut pgroute_plugin::PrStr) {
            let version: pgroute_plugin::PrStr = option_env!("PGROUTE_PGQUERY_VERSION")
                .unwrap_or_default()
                .into();
            unsafe {
                *output = version;
            }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn pgroute_plugin_version(output: *mut pgroute_plugin::PrStr) {
            let version: pgroute_plugin::PrStr = env!("CARGO_PKG_VERSION").into();
            unsafe {
                *output = version;
            }
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn pgroute_abi_revision() -> u32 {
            pgroute_plugin::comp::abi_revision()
        }
    };
    TokenStream::from(expanded)
}

fn hook(symbol: &str, input_fn: ItemFn) -> proc_macro2::TokenStream {
    let symbol = Ident::new(symbol, Span::call_site());
    let fn_name = &input_fn.sig.ident;

    quote! {
        #[unsafe(no_mangle)]
        pub extern "C" fn #symbol() {
            #input_fn

            #fn_name();
        }
    }
}

/// Generate the `pgroute_init` method that's executed at plugin load time.
#[proc_macro_attribute]
pub fn init(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(item as ItemFn);
    TokenStream::from(hook("pgroute_init", input_fn))
}

/// Generate the `pgroute_fini` method that runs at host shutdown.
#[proc_macro_attribute]
pub fn fini(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(item as ItemFn);
    TokenStream::from(hook("pgroute_fini", input_fn))
}

/// Generates the `pgroute_route` method for routing queries.
///
/// Panics inside the function don't cross the FFI boundary: they are caught
/// and the host receives a route without an opinion.
#[proc_macro_attribute]
pub fn route(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(item as ItemFn);
    let fn_name = &input_fn.sig.ident;
    let fn_inputs = &input_fn.sig.inputs;

    // Extract the first parameter name for the pgroute_route function signature
    let first_param_name = fn_inputs
        .iter()
        .filter_map(|input| {
            if let FnArg::Typed(pat_type) = input {
                if let Pat::Ident(pat_ident) = &*pat_type.pat {
                    Some(pat_ident.ident.clone())
                } else {
                    None
                }
            } else {
                None
            }
        })
        .next();

    let Some(first_param_name) = first_param_name else {
        return syn::Error::new(
            input_fn.sig.span(),
            "Route function must have at least one named parameter",
        )
        .to_compile_error()
        .into();
    };

    let expanded = quote! {
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn pgroute_route(#first_param_name: pgroute_plugin::PrRouterContext, output: *mut pgroute_plugin::PrRoute) {
            #input_fn

            let route = ::std::panic::catch_unwind(move || {
                let pgroute_context: pgroute_plugin::Context = #first_param_name.into();
                let route: pgroute_plugin::PrRoute = #fn_name(pgroute_context).into();
                route
            })
            .unwrap_or_default();

            unsafe {
                *output = route;
            }
        }
    };

    TokenStream::from(expanded)
}
