// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airquality project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Device fetcher
//!
//! Performs one HTTP round trip to a sensor device's local JSON endpoint
//! (`GET http://{address}/json?live=false`) and parses the response into a
//! [`RawReading`]. Failures are classified so the poller can log and count
//! them; retry policy belongs to the poller, not this layer.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching one reading from one device
#[derive(Error, Debug)]
pub enum FetchError {
    /// The device could not be reached (connection error or timeout)
    #[error("device unreachable: {0}")]
    Unreachable(String),
    /// The device answered with a non-success HTTP status
    #[error("device returned HTTP status {0}")]
    BadStatus(u16),
    /// The response body was not valid JSON or lacked mandatory keys
    #[error("malformed device response: {0}")]
    MalformedBody(String),
}

/// A sensor device's reported fields, verbatim.
///
/// Only the device identity is mandatory at parse time; the transformer
/// decides which of the remaining fields a derived reading requires.
/// Dual-channel devices report a second particulate sensor through the
/// `_b`-suffixed fields.
#[derive(Debug, Clone, Deserialize)]
pub struct RawReading {
    /// Stable sensor identifier
    #[serde(rename = "SensorId")]
    pub sensor_id: String,
    /// User-assigned location label
    pub place: Option<String>,
    /// Firmware version string (e.g. "7.00")
    pub version: Option<String>,
    /// Hardware revision string
    #[serde(rename = "hardwareversion")]
    pub hardware_version: Option<String>,
    /// Detected hardware inventory (e.g. "2.0+BME280+PMSX003-B+PMSX003-A")
    #[serde(rename = "hardwarediscovered")]
    pub hardware_discovered: Option<String>,
    /// Temperature in °F as measured on the board
    #[serde(rename = "current_temp_f")]
    pub current_temp: Option<f64>,
    /// Relative humidity in percent as measured on the board
    pub current_humidity: Option<f64>,
    /// The device's own dewpoint estimate in °F (diagnostic only, the
    /// transformer always recomputes dewpoint from corrected values)
    #[serde(rename = "current_dewpoint_f")]
    pub current_dewpoint: Option<f64>,
    /// Barometric pressure in hPa
    pub pressure: Option<f64>,
    /// Channel A particulates (µg/m³, atmospheric calibration)
    pub pm1_0_atm: Option<f64>,
    pub pm2_5_atm: Option<f64>,
    pub pm10_0_atm: Option<f64>,
    /// Channel B particulates, present on dual-channel devices only
    pub pm1_0_atm_b: Option<f64>,
    pub pm2_5_atm_b: Option<f64>,
    pub pm10_0_atm_b: Option<f64>,
    /// The device's own AQI estimate for channel A
    #[serde(rename = "pm2.5_aqi")]
    pub pm2_5_aqi: Option<f64>,
    /// The device's own AQI estimate for channel B
    #[serde(rename = "pm2.5_aqi_b")]
    pub pm2_5_aqi_b: Option<f64>,
    /// Channel agreement confidence, when the firmware reports one
    pub pm2_5_atm_conf: Option<f64>,
    /// WiFi signal strength in dBm
    pub rssi: Option<i64>,
}

impl RawReading {
    /// Classify the hardware model from the detected hardware inventory.
    ///
    /// A single PMS particulate sensor is a PA-I; more than one BME
    /// environmental sensor is a PA-II-FLEX; everything else (including an
    /// absent inventory string) is reported as a PA-II.
    pub fn model_name(&self) -> &'static str {
        let discovered = self.hardware_discovered.as_deref().unwrap_or("");
        if discovered.matches("PMS").count() == 1 {
            return "PA-I";
        }
        if discovered.matches("BME").count() > 1 {
            return "PA-II-FLEX";
        }
        "PA-II"
    }
}

/// Build the local status URL for a device address
pub(crate) fn device_url(address: &str) -> String {
    format!("http://{}/json?live=false", address)
}

/// HTTP client for polling sensor devices on the local network
#[derive(Debug, Clone)]
pub struct DeviceFetcher {
    /// Shared connection pool across all polled devices
    client: reqwest::Client,
    /// Per-request timeout; must stay comfortably below the poll interval
    /// so one slow device cannot starve a tick
    timeout: Duration,
}

impl DeviceFetcher {
    /// Create a new fetcher with the given per-request timeout
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Fetch and parse one reading from the device at `address`.
    ///
    /// Performs a single GET with a bounded timeout and no retries. The
    /// result is either a parsed [`RawReading`] or a classified
    /// [`FetchError`].
    pub async fn fetch(&self, address: &str) -> Result<RawReading, FetchError> {
        let url = device_url(address);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus(status.as_u16()));
        }

        response
            .json::<RawReading>()
            .await
            .map_err(|e| FetchError::MalformedBody(e.to_string()))
    }
}
