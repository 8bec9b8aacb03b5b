//! `poolkit` demo binary

mod cli;
mod config;
mod demo;
mod logging;

use std::io;

use anyhow::{Context, Result};
use clap::Parser;

use crate::cli::Cli;
use crate::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli).context("failed to load configuration")?;
    logging::init(&config)?;
    tracing::debug!(?config, "configuration resolved");

    demo::run(config.count, io::stdout().lock()).context("demo failed")
}
