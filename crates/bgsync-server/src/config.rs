//! Board Server Configuration
//!
//! Configuration is layered with figment, in increasing priority:
//! - built-in defaults
//! - a TOML file given with `--config`
//! - environment variables (`BGSYNC_*`, nested keys joined by `__`, e.g.
//!   `BGSYNC_SYNC__NAVIGATION__SLOW_STEP_LIMIT`)
//! - command line flags (`--bind`, `--port`, `--data-file`, `--server-id`)

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use bgsync_core::SyncConfig;

use crate::cli::Cli;
use crate::error::{Result, ServerError};

/// Prefix of the environment variables read into the configuration
pub const ENV_PREFIX: &str = "BGSYNC_";

// ----------------------------------------------------------------------------
// Application Configuration
// ----------------------------------------------------------------------------

/// Where the WebSocket listener binds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5001,
        }
    }
}

impl ListenConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Complete configuration for the `bgsync` binary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub listen: ListenConfig,
    pub sync: SyncConfig,
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(Self::existing(path.as_ref())?));

        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then `--config`, then `BGSYNC_*` variables, then flags
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = &cli.config {
            figment = figment.merge(Toml::file(Self::existing(path)?));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        // Apply command line overrides
        if let Some(bind) = &cli.bind {
            figment = figment.merge(("listen.bind", bind));
        }
        if let Some(port) = cli.port {
            figment = figment.merge(("listen.port", port));
        }
        if let Some(data_file) = &cli.data_file {
            figment = figment.merge(("sync.data_file", data_file));
        }
        if let Some(server_id) = &cli.server_id {
            figment = figment.merge(("sync.server_id", server_id));
        }

        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// figment skips missing files silently; an explicit path must exist
    fn existing(path: &Path) -> Result<&Path> {
        if path.is_file() {
            Ok(path)
        } else {
            Err(ServerError::Config(format!(
                "Configuration file {} not found",
                path.display()
            )))
        }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<()> {
        if self.listen.bind.trim().is_empty() {
            return Err(ServerError::Config("listen.bind must not be empty".to_string()));
        }
        self.sync.validate()?;
        Ok(())
    }

    /// Render the defaults as a TOML file
    pub fn example_config() -> Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }
}
