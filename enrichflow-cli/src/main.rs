//! Enrichflow CLI.
//!
//! Runs the product enrichment chain against a local image and manages the
//! obfuscated API key kept in the configuration file.

mod commands;

use anyhow::Result;
use clap::Parser;

use commands::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
