//! Log subscriber setup
//!
//! Events go to stderr so stdout carries only the demo output.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, LogFormat};

/// Environment variables whose filter directive beats the configured level
const FILTER_ENV_VARS: [&str; 2] = ["POOLKIT_LOG", "RUST_LOG"];

/// Filter directive in effect: `POOLKIT_LOG`, then `RUST_LOG`, then config
fn resolve_level(config: &Config) -> String {
    FILTER_ENV_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|value| !value.is_empty()))
        .unwrap_or_else(|| config.log_level.clone())
}

/// Installs the global subscriber
pub fn init(config: &Config) -> Result<()> {
    let level = resolve_level(config);
    let filter =
        EnvFilter::try_new(&level).with_context(|| format!("invalid log filter `{level}`"))?;
    let ansi = io::stderr().is_terminal();
    let registry = Registry::default().with(filter);

    match config.log_format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_ansi(ansi)
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_ansi(ansi)
                    .with_writer(io::stderr),
            )
            .try_init(),
    }
    .context("failed to install log subscriber")
}
