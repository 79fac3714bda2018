// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airquality project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! AQI calculator
//!
//! Converts a PM2.5 concentration into an AQI value by linear interpolation
//! over the breakpoint table, plus the two standardized pre-corrections
//! (EPA, LRAPA) that are applied to the raw concentration before lookup.
//! The EPA and LRAPA variants share the same table and formula and differ
//! only in how the input concentration is corrected.

use super::breakpoints::{BreakpointRow, PM2_5_BREAKPOINTS};

/// Convert a PM2.5 concentration (µg/m³) into an AQI value.
///
/// Rows are checked from the highest `pm_low` downward so that values above
/// the top row's `pm_high` still land in the top row instead of failing.
/// Concentrations below the lowest row's `pm_low` (i.e. negative readings)
/// are clamped into the lowest row, so any `c < 0` behaves exactly like
/// `c = 0`.
///
/// The standard interpolation is applied within the selected row:
/// `aqi = round((aqi_high - aqi_low) / (pm_high - pm_low) * (c - pm_low) + aqi_low)`
pub fn pm_to_aqi(concentration: f64) -> u16 {
    // The lowest row starts at 0, so only negative concentrations miss;
    // they clamp into that row
    let row = PM2_5_BREAKPOINTS
        .iter()
        .find(|row| concentration >= row.pm_low)
        .unwrap_or(&PM2_5_BREAKPOINTS[PM2_5_BREAKPOINTS.len() - 1]);

    let concentration = concentration.max(row.pm_low);
    interpolate(row, concentration)
}

fn interpolate(row: &BreakpointRow, concentration: f64) -> u16 {
    let slope = (row.aqi_high - row.aqi_low) / (row.pm_high - row.pm_low);
    (slope * (concentration - row.pm_low) + row.aqi_low).round() as u16
}

/// Apply the US EPA correction for PurpleAir sensors to a raw PM2.5 value.
///
/// `epa_pm = 0.534 * pm - 0.0844 * humidity + 5.604`, floored at zero. The
/// humidity term uses the device's raw (uncorrected) relative humidity.
/// Only firmware versions at or above the configured cutoff report data
/// that requires this correction; the caller owns that decision.
pub fn epa_corrected_pm(raw_pm2_5: f64, raw_humidity: f64) -> f64 {
    (0.534 * raw_pm2_5 - 0.0844 * raw_humidity + 5.604).max(0.0)
}

/// Apply the fixed LRAPA linear correction to a raw PM2.5 value.
///
/// `lrapa_pm = 0.5 * pm - 0.66`, floored at zero.
pub fn lrapa_corrected_pm(raw_pm2_5: f64) -> f64 {
    (0.5 * raw_pm2_5 - 0.66).max(0.0)
}
