// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airquality project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Reading cache
//!
//! Mapping from node id to its latest [`DerivedReading`]. Written only by
//! the poller, one node's entry at a time and always wholesale, so readers
//! observe either the previous complete reading or the new complete one.
//! There is no history; last value wins, and a node's entry is dropped when
//! the node leaves the registry.
//!
//! The presentation layer reads individual metrics through string keys, the
//! same keys the original integration exposed per sensor entity.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::transform::DerivedReading;

/// Latest derived reading per node id
#[derive(Debug, Default)]
pub struct ReadingCache {
    readings: HashMap<String, DerivedReading>,
}

impl ReadingCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            readings: HashMap::new(),
        }
    }

    /// Replace the cached reading for a node
    pub fn insert(&mut self, id: &str, reading: DerivedReading) {
        self.readings.insert(id.to_string(), reading);
    }

    /// Drop the cached reading for a node, if any
    pub fn remove(&mut self, id: &str) {
        self.readings.remove(id);
    }

    /// The full cached reading for a node, if one exists
    pub fn get(&self, id: &str) -> Option<&DerivedReading> {
        self.readings.get(id)
    }

    /// Read one metric of a node's cached reading by key.
    ///
    /// Returns `None` when the node has no cached reading, the key is
    /// unknown, or the metric is unavailable for this reading (undefined
    /// dewpoint, single-channel device asked for a B-channel value,
    /// firmware without a confidence field).
    pub fn get_metric(&self, id: &str, metric_key: &str) -> Option<Value> {
        let reading = self.readings.get(id)?;
        match metric_key {
            "pm1_0_atm" => Some(json!(reading.pm1_0)),
            "pm2_5_atm" => Some(json!(reading.pm2_5)),
            "pm10_0_atm" => Some(json!(reading.pm10_0)),
            "pm2_5_atm_conf" => reading.pm2_5_confidence.map(|v| json!(v)),
            "aqi_epa" => Some(json!(reading.aqi_epa)),
            "aqi_lrapa" => Some(json!(reading.aqi_lrapa)),
            "current_humidity" => Some(json!(reading.corrected_humidity)),
            "current_temp" => Some(json!(reading.corrected_temperature)),
            "current_dewpoint" => reading.dewpoint.map(|v| json!(v)),
            "pressure" => Some(json!(reading.pressure)),
            "rssi" => Some(json!(reading.rssi)),
            "pm2_5_aqi_raw" => Some(json!(reading.pm2_5_aqi_raw)),
            "pm2_5_aqi_b_raw" => reading.pm2_5_aqi_raw_b.map(|v| json!(v)),
            _ => None,
        }
    }

    /// Number of cached readings
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Type alias for the cache wrapped in Arc<RwLock<>>
pub type SharedReadingCache = Arc<RwLock<ReadingCache>>;

/// Create a new shared reading cache instance
pub fn create_shared_reading_cache() -> SharedReadingCache {
    Arc::new(RwLock::new(ReadingCache::new()))
}
