// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airquality project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Air Quality Index computation
//!
//! This module provides the static PM2.5 breakpoint table and the pure
//! conversion functions that turn a particulate concentration into an AQI
//! value, including the EPA and LRAPA pre-corrections applied to raw PM2.5
//! before the breakpoint lookup.

pub mod breakpoints;
pub mod calculator;

pub use breakpoints::{BreakpointRow, PM2_5_BREAKPOINTS};
pub use calculator::{epa_corrected_pm, lrapa_corrected_pm, pm_to_aqi};
