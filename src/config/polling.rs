// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airquality project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration for the polling engine
//!
//! Scheduling and correction parameters for the poller, plus the list of
//! sensors registered at startup.

use serde::{Deserialize, Serialize};

/// Polling engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Wall-clock interval between poll ticks, in seconds
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Per-fetch HTTP timeout in seconds; must stay below the scan
    /// interval so one slow device cannot starve a tick
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Firmware version at or above which the humidity-dependent EPA
    /// correction is applied to raw PM2.5.
    ///
    /// TODO: confirm the exact cutoff against the vendor's published
    /// correction spec; "7.00" matches the observed device fleet.
    #[serde(default = "default_epa_firmware_cutoff")]
    pub epa_firmware_cutoff: String,

    /// Capacity of the tick-notification broadcast channel
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            epa_firmware_cutoff: default_epa_firmware_cutoff(),
            notification_capacity: default_notification_capacity(),
        }
    }
}

/// One sensor device registered at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Stable sensor identifier (the device's SensorId)
    pub id: String,

    /// Network address of the device (IP or host, optionally with port)
    pub address: String,

    /// Signed temperature offset in °F
    #[serde(default = "default_temp_offset")]
    pub temp_offset: i64,

    /// Signed humidity offset in percent
    #[serde(default = "default_humidity_offset")]
    pub humidity_offset: i64,
}

fn default_scan_interval_secs() -> u64 {
    30
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_epa_firmware_cutoff() -> String {
    "7.00".to_string()
}

fn default_notification_capacity() -> usize {
    16
}

/// Vendor's own on-device temperature display correction
fn default_temp_offset() -> i64 {
    -8
}

/// Vendor's own on-device humidity display correction
fn default_humidity_offset() -> i64 {
    4
}
