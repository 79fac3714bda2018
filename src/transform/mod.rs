// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airquality project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Derived-metrics transformer
//!
//! Turns one [`RawReading`] plus a node's fixed temperature/humidity
//! offsets into one [`DerivedReading`]: offset correction, Magnus dewpoint,
//! dual-channel averaging, and the EPA/LRAPA AQI values. The transform is
//! all-or-nothing; a missing required raw field fails the whole reading and
//! a partial derived reading is never produced.

use thiserror::Error;

use crate::aqi::{epa_corrected_pm, lrapa_corrected_pm, pm_to_aqi};
use crate::fetcher::RawReading;

/// Errors that can occur while deriving metrics from a raw reading
#[derive(Error, Debug)]
pub enum TransformError {
    /// The raw payload parsed but lacks a field the derivation needs
    #[error("raw reading is missing required field '{0}'")]
    MalformedReading(&'static str),
}

/// One node's corrected and standardized reading.
///
/// Overwritten wholesale in the cache on every successful poll; never
/// partially mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedReading {
    /// PM1.0 in µg/m³ (channel mean when dual)
    pub pm1_0: f64,
    /// PM2.5 in µg/m³ (channel mean when dual)
    pub pm2_5: f64,
    /// PM10.0 in µg/m³ (channel mean when dual)
    pub pm10_0: f64,
    /// Channel agreement confidence, when the firmware reports one
    pub pm2_5_confidence: Option<f64>,
    /// AQI after the EPA correction of raw PM2.5
    pub aqi_epa: u16,
    /// AQI after the LRAPA correction of raw PM2.5
    pub aqi_lrapa: u16,
    /// Humidity in percent after the user offset, clamped at 100
    pub corrected_humidity: f64,
    /// Temperature in °F after the user offset
    pub corrected_temperature: f64,
    /// Magnus dewpoint in °F over the corrected values; `None` when the
    /// corrected humidity is non-positive and the dewpoint is undefined
    pub dewpoint: Option<f64>,
    /// Barometric pressure in hPa, passed through
    pub pressure: f64,
    /// WiFi signal strength in dBm, passed through
    pub rssi: i64,
    /// Whether the device reports a second particulate channel
    pub is_dual: bool,
    /// The device's own channel A AQI estimate, passed through unmodified
    pub pm2_5_aqi_raw: f64,
    /// The device's own channel B AQI estimate, present only when dual
    pub pm2_5_aqi_raw_b: Option<f64>,
}

fn require<T>(value: Option<T>, field: &'static str) -> Result<T, TransformError> {
    value.ok_or(TransformError::MalformedReading(field))
}

/// Derive the corrected reading for one node.
///
/// `temp_offset`/`humidity_offset` are the node's fixed signed-integer
/// offsets (vendor defaults −8 / +4). `epa_firmware_cutoff` is the firmware
/// version at or above which the humidity-dependent EPA correction applies
/// to the raw PM2.5 average before the AQI lookup.
pub fn derive_reading(
    raw: &RawReading,
    temp_offset: i64,
    humidity_offset: i64,
    epa_firmware_cutoff: &str,
) -> Result<DerivedReading, TransformError> {
    let raw_temp = require(raw.current_temp, "current_temp_f")?;
    let raw_humidity = require(raw.current_humidity, "current_humidity")?;
    let pressure = require(raw.pressure, "pressure")?;
    let rssi = require(raw.rssi, "rssi")?;
    let pm2_5_aqi_raw = require(raw.pm2_5_aqi, "pm2.5_aqi")?;

    let is_dual = raw.pm2_5_atm_b.is_some();

    let pm1_0 = channel_value(raw.pm1_0_atm, raw.pm1_0_atm_b, is_dual, "pm1_0_atm")?;
    let pm2_5 = channel_value(raw.pm2_5_atm, raw.pm2_5_atm_b, is_dual, "pm2_5_atm")?;
    let pm10_0 = channel_value(raw.pm10_0_atm, raw.pm10_0_atm_b, is_dual, "pm10_0_atm")?;

    // Vendor on-device display corrections: temperature is shifted, the
    // humidity is shifted and clamped at 100 with no lower clamp
    let corrected_temperature = raw_temp + temp_offset as f64;
    let corrected_humidity = (raw_humidity + humidity_offset as f64).min(100.0);

    let dewpoint = magnus_dewpoint_f(corrected_temperature, corrected_humidity);

    // Both AQI scales correct the raw, uncorrected PM2.5 channel average.
    // The EPA humidity term only applies at or above the firmware cutoff.
    let epa_pm = if firmware_at_least(raw.version.as_deref(), epa_firmware_cutoff) {
        epa_corrected_pm(pm2_5, raw_humidity)
    } else {
        pm2_5
    };
    let aqi_epa = pm_to_aqi(epa_pm);
    let aqi_lrapa = pm_to_aqi(lrapa_corrected_pm(pm2_5));

    Ok(DerivedReading {
        pm1_0,
        pm2_5,
        pm10_0,
        pm2_5_confidence: raw.pm2_5_atm_conf,
        aqi_epa,
        aqi_lrapa,
        corrected_humidity,
        corrected_temperature,
        dewpoint,
        pressure,
        rssi,
        is_dual,
        pm2_5_aqi_raw,
        pm2_5_aqi_raw_b: if is_dual { raw.pm2_5_aqi_b } else { None },
    })
}

/// Exposed particulate value for one size: channel mean when dual, channel
/// A alone otherwise. A dual device missing one of its B channels is a
/// malformed reading.
fn channel_value(
    channel_a: Option<f64>,
    channel_b: Option<f64>,
    is_dual: bool,
    field: &'static str,
) -> Result<f64, TransformError> {
    let a = require(channel_a, field)?;
    if !is_dual {
        return Ok(a);
    }
    let b = channel_b.ok_or(TransformError::MalformedReading(field))?;
    Ok((a + b) / 2.0)
}

/// Magnus-formula dewpoint over Fahrenheit inputs.
///
/// Returns `None` when the relative humidity is non-positive, where the
/// logarithm (and the dewpoint itself) is undefined.
fn magnus_dewpoint_f(temp_f: f64, humidity: f64) -> Option<f64> {
    if humidity <= 0.0 {
        return None;
    }
    let temp_c = (temp_f - 32.0) / 1.8;
    let gamma = (17.62 * temp_c) / (243.12 + temp_c) + (humidity / 100.0).ln();
    let dewpoint_c = 243.12 * gamma / (17.62 - gamma);
    Some(dewpoint_c * 1.8 + 32.0)
}

/// Compare a device firmware version against the configured cutoff by
/// numeric dotted-component ordering ("7.02" >= "7.00", "10.0" >= "9.9").
fn firmware_at_least(version: Option<&str>, cutoff: &str) -> bool {
    let version = match version {
        Some(v) => v,
        // An unreported firmware version is treated as pre-cutoff
        None => return false,
    };

    let mut ours = version.split('.').map(parse_component);
    let mut theirs = cutoff.split('.').map(parse_component);
    loop {
        match (ours.next(), theirs.next()) {
            (Some(a), Some(b)) if a == b => continue,
            (Some(a), Some(b)) => return a > b,
            (Some(_), None) => return true,
            (None, Some(b)) => return b == 0 && theirs.all(|c| c == 0),
            (None, None) => return true,
        }
    }
}

fn parse_component(component: &str) -> u64 {
    component.trim().parse().unwrap_or(0)
}
