// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airquality project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Application configuration
//!
//! YAML-backed configuration for the daemon: the polling engine parameters
//! and the sensors to register at startup. Every field has a default, so an
//! empty file (or no file at all) yields a runnable configuration with no
//! sensors.

pub mod polling;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub use polling::{PollingConfig, SensorConfig};

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Polling engine parameters
    #[serde(default)]
    pub polling: PollingConfig,

    /// Sensors registered at startup
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
}

impl Config {
    /// Load and validate a configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

        let config: Config = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.polling.scan_interval_secs == 0 {
            return Err(anyhow!("polling.scan_interval_secs must be greater than 0"));
        }

        if self.polling.fetch_timeout_secs >= self.polling.scan_interval_secs {
            return Err(anyhow!(
                "polling.fetch_timeout_secs ({}) must be shorter than polling.scan_interval_secs ({})",
                self.polling.fetch_timeout_secs,
                self.polling.scan_interval_secs
            ));
        }

        let mut seen = HashSet::new();
        for sensor in &self.sensors {
            if sensor.id.is_empty() {
                return Err(anyhow!("sensor id must not be empty"));
            }
            if sensor.address.is_empty() {
                return Err(anyhow!("sensor '{}' has an empty address", sensor.id));
            }
            if !seen.insert(sensor.id.as_str()) {
                return Err(anyhow!("duplicate sensor id '{}'", sensor.id));
            }
        }

        Ok(())
    }

    /// Apply command line overrides on top of the file configuration
    pub fn apply_args(&mut self, scan_interval_secs: Option<u64>) {
        if let Some(interval) = scan_interval_secs {
            self.polling.scan_interval_secs = interval;
        }
    }
}
