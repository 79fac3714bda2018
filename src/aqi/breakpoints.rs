// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airquality project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! AQI breakpoint table
//!
//! Piecewise-linear lookup table mapping a PM2.5 concentration band onto an
//! AQI band. The values are the EPA-published breakpoints and must not be
//! altered; rows are ordered by descending concentration so that a lookup
//! can scan from the top row downward.

/// One row of the breakpoint table: a closed concentration interval mapped
/// onto a closed AQI interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakpointRow {
    /// Lower bound of the PM concentration band (µg/m³)
    pub pm_low: f64,
    /// Upper bound of the PM concentration band (µg/m³)
    pub pm_high: f64,
    /// AQI value at the lower bound
    pub aqi_low: f64,
    /// AQI value at the upper bound
    pub aqi_high: f64,
}

/// PM2.5 breakpoint rows, descending by concentration.
///
/// Consecutive rows are contiguous: each row's `pm_high` is immediately
/// below the next-higher row's `pm_low`, and together the rows cover
/// `[0, +inf)` (concentrations above the top row clamp into it).
pub const PM2_5_BREAKPOINTS: &[BreakpointRow] = &[
    BreakpointRow { pm_low: 500.5, pm_high: 999.9, aqi_low: 501.0, aqi_high: 999.0 },
    BreakpointRow { pm_low: 350.5, pm_high: 500.4, aqi_low: 401.0, aqi_high: 500.0 },
    BreakpointRow { pm_low: 250.5, pm_high: 350.4, aqi_low: 301.0, aqi_high: 400.0 },
    BreakpointRow { pm_low: 150.5, pm_high: 250.4, aqi_low: 201.0, aqi_high: 300.0 },
    BreakpointRow { pm_low: 55.5, pm_high: 150.4, aqi_low: 151.0, aqi_high: 200.0 },
    BreakpointRow { pm_low: 35.5, pm_high: 55.4, aqi_low: 101.0, aqi_high: 150.0 },
    BreakpointRow { pm_low: 12.1, pm_high: 35.4, aqi_low: 51.0, aqi_high: 100.0 },
    BreakpointRow { pm_low: 0.0, pm_high: 12.0, aqi_low: 0.0, aqi_high: 50.0 },
];
