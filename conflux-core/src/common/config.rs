/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Conflux runtime.
///
/// All configurable values are loaded from a TOML file in an XDG-compliant
/// directory, with every field falling back to a built-in default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ConfluxConfig {
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Limits and capacity configuration
    pub limits: LimitsConfig,
    /// Default values configuration
    pub defaults: DefaultsConfig,
}

/// Timeout-related configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// System-wide shutdown timeout in milliseconds
    pub shutdown_timeout_ms: u64,
}

/// Limits and capacity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Default agent mailbox capacity; 0 means unbounded
    pub mailbox_capacity: usize,
    /// Default worker pool parallelism; 0 means the number of available cores
    pub pool_parallelism: usize,
}

/// Default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Default agent name when none provided
    pub agent_name: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_ms: 10_000,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 0,
            pool_parallelism: 0,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            agent_name: "agent".to_string(),
        }
    }
}

impl ConfluxConfig {
    /// Convert the system shutdown timeout to a Duration
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.shutdown_timeout_ms)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// This function attempts to load `conflux/config.toml` from the XDG
    /// config search path. If no configuration file is found, it returns the
    /// default configuration. If a configuration file exists but is
    /// malformed, it logs an error and uses defaults.
    pub fn load() -> Self {
        use tracing::{error, info};

        let xdg_dirs = match xdg::BaseDirectories::with_prefix("conflux") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        let config_path = xdg_dirs.find_config_file("config.toml");

        if let Some(path) = config_path {
            info!("Loading configuration from: {}", path.display());
            match std::fs::read_to_string(&path) {
                Ok(config_str) => match toml::from_str::<Self>(&config_str) {
                    Ok(config) => config,
                    Err(e) => {
                        error!("Failed to parse configuration file {}: {}", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    error!("Failed to read configuration file {}: {}", path.display(), e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        }
    }
}

lazy_static! {
    /// Global configuration instance loaded from XDG-compliant locations
    pub static ref CONFIG: ConfluxConfig = ConfluxConfig::load();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unbounded_and_core_sized() {
        let config = ConfluxConfig::default();
        assert_eq!(config.limits.mailbox_capacity, 0);
        assert_eq!(config.limits.pool_parallelism, 0);
        assert_eq!(config.timeouts.shutdown_timeout_ms, 10_000);
        assert_eq!(config.defaults.agent_name, "agent");
    }

    #[test]
    fn partial_toml_fills_missing_sections() {
        let config: ConfluxConfig = toml::from_str(
            r#"
            [limits]
            mailbox_capacity = 128
            "#,
        )
        .expect("partial config should parse");
        assert_eq!(config.limits.mailbox_capacity, 128);
        // untouched sections keep their defaults
        assert_eq!(config.limits.pool_parallelism, 0);
        assert_eq!(config.defaults.agent_name, "agent");
    }

    #[test]
    fn shutdown_timeout_converts_to_duration() {
        let config = ConfluxConfig::default();
        assert_eq!(config.shutdown_timeout(), Duration::from_millis(10_000));
    }
}
