//! Layered configuration
//!
//! Sources, lowest to highest precedence:
//! 1. built-in defaults
//! 2. `poolkit.toml` in the working directory, or the file given by `--config`
//! 3. `POOLKIT_*` environment variables (`POOLKIT_COUNT`, `POOLKIT_LOG_LEVEL`, ...)
//! 4. command-line flags

use std::path::Path;

use anyhow::{Context, Result, ensure};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "poolkit.toml";

/// Prefix of the environment variables read as config keys
pub const ENV_PREFIX: &str = "POOLKIT_";

/// Largest key count whose factorial table fits in `u64` (keys `0..=20`)
pub const MAX_COUNT: usize = 21;

/// Output style of the log layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line events
    #[default]
    Compact,
    /// Multi-line, human-oriented events
    Pretty,
}

/// Resolved driver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of keys and values each container receives
    pub count: usize,
    /// `EnvFilter` directive used when no log env var is set
    pub log_level: String,
    /// Log layer style
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            count: 10,
            log_level: "warn".to_string(),
            log_format: LogFormat::Compact,
        }
    }
}

/// Flag values that take precedence over every other source
#[derive(Debug, Default, Serialize)]
struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_format: Option<LogFormat>,
}

impl Config {
    /// Resolves the configuration for this invocation and validates it
    pub fn load(cli: &Cli) -> Result<Self> {
        let config: Self = Self::figment(cli)?
            .extract()
            .context("invalid configuration value")?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the provider stack without extracting it
    pub fn figment(cli: &Cli) -> Result<Figment> {
        let file = match &cli.config {
            Some(path) => {
                ensure!(
                    path.is_file(),
                    "config file `{}` does not exist",
                    path.display()
                );
                Toml::file(path)
            }
            None => Toml::file(Path::new(DEFAULT_CONFIG_FILE)),
        };

        let overrides = Overrides {
            count: cli.count,
            log_level: cli.log_level.clone(),
            log_format: cli.log_format,
        };

        Ok(Figment::from(Serialized::defaults(Self::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides)))
    }

    /// Rejects values the driver cannot run with
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.count <= MAX_COUNT,
            "count must be at most {MAX_COUNT} ({}! overflows u64), got {}",
            MAX_COUNT,
            self.count
        );
        ensure!(
            !self.log_level.trim().is_empty(),
            "log_level must not be empty"
        );
        Ok(())
    }
}
