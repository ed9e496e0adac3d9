//! Packstream CLI: archive directories to a file or stdout.

use anyhow::Result;
use clap::Parser;
use packstream::engine::arg_parser::Cli;
use packstream::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
