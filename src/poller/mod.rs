// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airquality project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Poller (scheduler)
//!
//! The interval-driven engine that ties the other modules together: on each
//! tick it fetches every registered node concurrently, derives the corrected
//! reading, updates the cache, and broadcasts a single tick notification.

mod daemon;

pub use daemon::PollerDaemon;
