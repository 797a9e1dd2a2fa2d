#![forbid(unsafe_code)]

//! dsentry — Disk Sentry CLI entry point.

use clap::Parser;

fn main() {
    let args = disk_sentry::cli_app::Cli::parse();
    if let Err(e) = disk_sentry::cli_app::run(&args) {
        eprintln!("dsentry: {e}");
        std::process::exit(1);
    }
}
