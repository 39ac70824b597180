#![forbid(unsafe_code)]

//! storage-space — run a storage-space sensor and print its rendered ticks.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run(&args) {
        eprintln!("storage-space: {e}");
        std::process::exit(1);
    }
}
