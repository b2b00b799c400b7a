//! pgroute, PostgreSQL query router.

use std::ops::Deref;
use std::process::exit;

use clap::Parser;
use pgroute::cli::{self, Cli, Commands};
use pgroute::plugin;
use tracing::info;

fn main() {
    let args = Cli::parse();

    pgroute::logger();

    info!(
        "pgroute v{} ({})",
        env!("CARGO_PKG_VERSION"),
        pgroute_plugin::comp::rustc_version().deref()
    );

    let result = match args.command.unwrap_or(Commands::Check) {
        Commands::Check => cli::check(&args.config),
        Commands::Route {
            query,
            param,
            binary,
            in_transaction,
        } => cli::route(&args.config, &query, &param, binary, in_transaction),
        Commands::Metrics => cli::metrics(&args.config),
    };

    plugin::shutdown();

    match result {
        Ok(output) => print!("{}", output),
        Err(err) => {
            eprintln!("error: {}", err);
            exit(1);
        }
    }
}
