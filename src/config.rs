//! Configuration
//!
//! Sources, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. TOML file: `CADENCE_CONFIG_PATH` if set (must exist), else `cadence.toml`
//!    in the working directory (optional)
//! 3. Environment: `CADENCE__<SECTION>__<KEY>`, e.g.
//!    `CADENCE__SCHEDULER__MAX_DELEGATION_DEPTH=64`
//!
//! A `.env` file in the working directory is loaded into the environment
//! first, so its entries behave like real environment variables.

use anyhow::{Context, Result};
use config::{Config as Loader, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "cadence.toml";
pub const CONFIG_PATH_ENV: &str = "CADENCE_CONFIG_PATH";
pub const ENV_PREFIX: &str = "CADENCE";

pub const DEFAULT_MAX_DELEGATION_DEPTH: usize = 1024;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub log: LogConfig,
}

/// Scheduler limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of frames on one delegation stack
    pub max_delegation_depth: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_delegation_depth: DEFAULT_MAX_DELEGATION_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load() -> Result<Self> {
        // Missing .env is fine
        let _ = dotenvy::dotenv();

        let file = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => File::with_name(&path).required(true),
            Err(_) => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let builder = defaults()?.add_source(file).add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        build(builder)
    }

    /// Parse configuration from TOML text layered over the defaults.
    ///
    /// The environment is not consulted.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        build(defaults()?.add_source(File::from_str(source, FileFormat::Toml)))
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration as TOML")
    }
}

fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>> {
    Loader::builder()
        .set_default(
            "scheduler.max_delegation_depth",
            DEFAULT_MAX_DELEGATION_DEPTH as i64,
        )?
        .set_default("log.filter", DEFAULT_LOG_FILTER)
        .context("Failed to set configuration defaults")
}

fn build(builder: ConfigBuilder<config::builder::DefaultState>) -> Result<Config> {
    let config: Config = builder
        .build()
        .context("Failed to load configuration")?
        .try_deserialize()
        .context("Invalid configuration")?;

    if config.scheduler.max_delegation_depth == 0 {
        anyhow::bail!("scheduler.max_delegation_depth must be at least 1");
    }

    Ok(config)
}
