// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

mod cache;
mod cmd;
mod config;
mod engine;
mod error;
mod generator;
mod logging;
mod output;
mod schema;
mod value;

use clap::Parser;
use cmd::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cmd::run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
