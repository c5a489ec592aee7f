//! pinrun - A version-pinned tool launcher
//!
//! pinrun provides:
//! - Project config discovery (`.pinrun`, with per-architecture overrides)
//! - A per-user archive cache keyed by project directory
//! - Checksum-token invalidation and retention sweeps
//! - In-place execution of the cached tool

use clap::Parser;
use colored::Colorize;

mod backends;
mod cache;
mod cli;
mod config;
mod core;
mod flows;

fn main() {
    let mut argv = std::env::args_os();
    let argv0 = argv.next().unwrap_or_default();

    let parsed = if cli::is_shim(&argv0) {
        cli::Cli::try_parse_from(cli::shim_args(argv))
    } else {
        cli::Cli::try_parse()
    };
    let cli = match parsed {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    cli::init_logging(&cli);
    let no_color = cli.no_color;

    match cli::run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let prefix = if no_color {
                "error:".normal()
            } else {
                "error:".red().bold()
            };
            eprintln!("{} {:#}", prefix, e);
            std::process::exit(1);
        }
    }
}
