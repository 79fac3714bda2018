// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airquality project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Local air quality sensor polling and AQI derivation engine
//!
//! This crate polls PurpleAir-style particulate sensors on the local
//! network, derives corrected and standardized metrics from each raw
//! reading (offset correction, Magnus dewpoint, EPA and LRAPA AQI,
//! dual-channel averaging), caches the latest reading per device, and
//! broadcasts a notification once per completed poll tick.

pub mod aqi;
pub mod cache;
pub mod config;
pub mod fetcher;
pub mod poller;
pub mod registry;
pub mod transform;
