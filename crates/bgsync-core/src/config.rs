//! Centralized Configuration Management
//!
//! Settings shared by the engine and the binary: where the ledger is
//! persisted, how fast navigation traverses history, and channel sizing.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{SyncError, SyncResult};

// ----------------------------------------------------------------------------
// Navigation Configuration
// ----------------------------------------------------------------------------

/// Timing of history traversals and the animation hints sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Delay between steps of `back_all` / `fwd_all`
    pub fast_step_delay_ms: u64,
    /// Delay between steps of `back2` / `fwd2`
    pub slow_step_delay_ms: u64,
    /// Step limit of `back2` / `fwd2`; 0 walks until the stack is exhausted
    pub slow_step_limit: usize,
    /// Suggested client animation for single and limited steps
    pub step_animation_secs: f64,
    /// Suggested client animation after `new`
    pub new_game_animation_secs: f64,
    /// Upper bound on waiting for a cancelled traversal to stop
    pub cancel_wait_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            fast_step_delay_ms: 100,
            slow_step_delay_ms: 500,
            slow_step_limit: 0,
            step_animation_secs: 0.3,
            new_game_animation_secs: 1.0,
            cancel_wait_ms: 1000,
        }
    }
}

impl NavigationConfig {
    pub fn fast_step_delay(&self) -> Duration {
        Duration::from_millis(self.fast_step_delay_ms)
    }

    pub fn slow_step_delay(&self) -> Duration {
        Duration::from_millis(self.slow_step_delay_ms)
    }

    pub fn cancel_wait(&self) -> Duration {
        Duration::from_millis(self.cancel_wait_ms)
    }
}

// ----------------------------------------------------------------------------
// Channel Configuration
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Capacity of the engine command queue shared by all connections
    pub command_buffer_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            command_buffer_size: 256,
        }
    }
}

// ----------------------------------------------------------------------------
// Sync Configuration
// ----------------------------------------------------------------------------

/// Complete configuration of one synchronization server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Key of this server's record inside the data file
    pub server_id: String,
    /// Version string stamped into fresh game states
    pub server_version: String,
    /// Data file holding the persisted ledger
    pub data_file: PathBuf,
    pub navigation: NavigationConfig,
    pub channels: ChannelConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_id: "bgsync".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            data_file: PathBuf::from("bgsync.json"),
            navigation: NavigationConfig::default(),
            channels: ChannelConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Short delays for tests, persisting to the given file
    pub fn testing<P: Into<PathBuf>>(data_file: P) -> Self {
        Self {
            server_id: "test".to_string(),
            data_file: data_file.into(),
            navigation: NavigationConfig {
                fast_step_delay_ms: 5,
                slow_step_delay_ms: 20,
                slow_step_limit: 0,
                step_animation_secs: 0.3,
                new_game_animation_secs: 1.0,
                cancel_wait_ms: 500,
            },
            channels: ChannelConfig {
                command_buffer_size: 32,
            },
            ..Self::default()
        }
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> SyncResult<()> {
        if self.server_id.trim().is_empty() {
            return Err(SyncError::config_error("server_id must not be empty"));
        }

        if self.data_file.as_os_str().is_empty() {
            return Err(SyncError::config_error("data_file must not be empty"));
        }

        if self.channels.command_buffer_size == 0 {
            return Err(SyncError::config_error(
                "command_buffer_size must be greater than 0",
            ));
        }

        let nav = &self.navigation;
        for (name, secs) in [
            ("step_animation_secs", nav.step_animation_secs),
            ("new_game_animation_secs", nav.new_game_animation_secs),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(SyncError::config_error(format!(
                    "{name} must be a non-negative number, got {secs}"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.navigation.slow_step_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();
        config.server_id = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.channels.command_buffer_size = 0;
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.navigation.step_animation_secs = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.navigation.new_game_animation_secs = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{"server_id": "table-2", "navigation": {"slow_step_limit": 10}}"#;
        let config: SyncConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.server_id, "table-2");
        assert_eq!(config.navigation.slow_step_limit, 10);
        assert_eq!(config.navigation.fast_step_delay_ms, 100);
        assert_eq!(config.data_file, PathBuf::from("bgsync.json"));
    }
}
