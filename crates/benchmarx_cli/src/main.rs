//! `benchmarx` operator CLI.
//!
//! # Responsibility
//! - Parse arguments, load configuration and open the store.
//! - Dispatch to core services and render their results.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    commands::run(cli)
}
