// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airquality project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Polling daemon
//!
//! Runs the fixed-interval poll loop over all registered nodes. Within a
//! tick every node is fetched concurrently; a failure on one node never
//! delays or cancels the others, and the tick's duration is bounded by the
//! slowest individual fetch timeout rather than the sum of all fetches.
//!
//! The per-node state machine is `Idle -> Fetching -> {Updated, Failed} ->
//! Idle`: on success the node's cache entry is replaced wholesale and
//! `last_success` is set; on failure `last_success` is cleared and the
//! previous cached reading (if any) is left untouched, so consumers keep a
//! stale-but-available value until the next successful tick. One broadcast
//! notification is published per tick that updated at least one node.

use anyhow::Result;
use futures::future::join_all;
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time;

use crate::cache::{create_shared_reading_cache, SharedReadingCache};
use crate::config::PollingConfig;
use crate::fetcher::DeviceFetcher;
use crate::registry::{create_shared_node_registry, RegisteredNode, SharedNodeRegistry};
use crate::transform::derive_reading;

/// Interval-driven poller over all registered sensor nodes
pub struct PollerDaemon {
    /// Polling parameters (interval, fetch timeout, EPA firmware cutoff)
    config: PollingConfig,
    /// Registered devices, shared with the poll task
    registry: SharedNodeRegistry,
    /// Latest derived reading per node, shared with the poll task
    cache: SharedReadingCache,
    /// HTTP client for the per-node fetches
    fetcher: Arc<DeviceFetcher>,
    /// Broadcast sender for the once-per-tick notification
    notifier: broadcast::Sender<()>,
    /// Running flag shared with the poll task
    running: Arc<AtomicBool>,
    /// Handle of the spawned poll loop
    task_handle: Option<JoinHandle<Result<()>>>,
    /// Wakes the poll loop out of its interval wait on shutdown
    stop_sender: Option<mpsc::UnboundedSender<()>>,
}

impl PollerDaemon {
    /// Create a new poller for the given configuration.
    ///
    /// The poller starts with an empty registry and cache; call
    /// [`register_node`](Self::register_node) and then
    /// [`start`](Self::start).
    pub fn new(config: PollingConfig) -> Self {
        let fetcher = DeviceFetcher::new(Duration::from_secs(config.fetch_timeout_secs));
        let (notifier, _) = broadcast::channel(config.notification_capacity);

        Self {
            config,
            registry: create_shared_node_registry(),
            cache: create_shared_reading_cache(),
            fetcher: Arc::new(fetcher),
            notifier,
            running: Arc::new(AtomicBool::new(true)),
            task_handle: None,
            stop_sender: None,
        }
    }

    /// Register a consumer for a node; the node joins the next tick's scan
    pub async fn register_node(
        &self,
        id: &str,
        address: &str,
        temp_offset: i64,
        humidity_offset: i64,
    ) {
        let mut registry = self.registry.write().await;
        registry.register(id, address, temp_offset, humidity_offset);
        debug!(
            "Registered node '{}' at {} (offsets {}/{})",
            id, address, temp_offset, humidity_offset
        );
    }

    /// Release one consumer's reference to a node.
    ///
    /// When the last reference goes, the node leaves the registry and its
    /// cached reading is dropped; an in-flight fetch for it will have its
    /// result discarded on completion.
    pub async fn unregister_node(&self, id: &str) {
        let removed = {
            let mut registry = self.registry.write().await;
            registry.unregister(id)
        };

        if removed {
            self.cache.write().await.remove(id);
            info!("Node '{}' fully unregistered, cached reading dropped", id);
        }
    }

    /// True iff the node is currently registered
    pub async fn is_registered(&self, id: &str) -> bool {
        self.registry.read().await.is_registered(id)
    }

    /// Read one metric of a node's latest cached reading.
    ///
    /// `None` means unavailable: the node has no successful poll yet, was
    /// unregistered, or the metric is undefined for the cached reading.
    pub async fn get_reading(&self, id: &str, metric_key: &str) -> Option<Value> {
        self.cache.read().await.get_metric(id, metric_key)
    }

    /// Subscribe to the once-per-tick "readings updated" notification.
    ///
    /// The notification carries no payload; subscribers re-read the metrics
    /// they care about through [`get_reading`](Self::get_reading).
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.notifier.subscribe()
    }

    /// Shared registry handle (poll bookkeeping, tests)
    pub fn registry(&self) -> SharedNodeRegistry {
        self.registry.clone()
    }

    /// Shared cache handle (presentation layer, tests)
    pub fn cache(&self) -> SharedReadingCache {
        self.cache.clone()
    }

    /// Run one poll tick immediately, outside the scheduled interval.
    ///
    /// Returns the number of nodes whose cache entry was updated.
    pub async fn poll_once(&self) -> usize {
        poll_tick(
            &self.registry,
            &self.cache,
            &self.fetcher,
            &self.notifier,
            &self.config.epa_firmware_cutoff,
        )
        .await
    }

    /// Start the poll loop in a background task
    pub fn start(&mut self) {
        let interval_duration = Duration::from_secs(self.config.scan_interval_secs);
        info!("Starting poller with interval {:?}", interval_duration);

        let (stop_tx, mut stop_rx) = mpsc::unbounded_channel::<()>();
        self.stop_sender = Some(stop_tx);

        let registry = self.registry.clone();
        let cache = self.cache.clone();
        let fetcher = self.fetcher.clone();
        let notifier = self.notifier.clone();
        let running = self.running.clone();
        let epa_cutoff = self.config.epa_firmware_cutoff.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(interval_duration);
            // The first interval tick fires immediately, giving nodes a
            // reading right after startup instead of one interval later

            while running.load(Ordering::Relaxed) {
                tokio::select! {
                    _ = interval.tick() => {
                        let updated =
                            poll_tick(&registry, &cache, &fetcher, &notifier, &epa_cutoff).await;
                        debug!("Poll tick complete, {} node(s) updated", updated);
                    }
                    _ = stop_rx.recv() => {
                        break;
                    }
                }
            }

            info!("Poller stopped");
            Ok(())
        });

        self.task_handle = Some(handle);
    }

    /// Signal the poll loop to stop after the current tick
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(ref sender) = self.stop_sender {
            let _ = sender.send(());
        }
    }

    /// Wait for the poll loop to finish
    pub async fn join(&mut self) -> Result<()> {
        if let Some(handle) = self.task_handle.take() {
            handle.await??;
        }
        Ok(())
    }
}

/// Execute one poll tick over every currently registered node.
///
/// All fetches run concurrently with no ordering guarantee. Results for
/// nodes unregistered while their fetch was in flight are discarded before
/// any cache write. Returns the number of cache entries updated; when that
/// is non-zero, a single notification is broadcast after all nodes have
/// been processed.
async fn poll_tick(
    registry: &SharedNodeRegistry,
    cache: &SharedReadingCache,
    fetcher: &DeviceFetcher,
    notifier: &broadcast::Sender<()>,
    epa_firmware_cutoff: &str,
) -> usize {
    let nodes: Vec<RegisteredNode> = registry.read().await.snapshot();
    if nodes.is_empty() {
        return 0;
    }

    let fetches = nodes.iter().map(|node| {
        let address = node.address.clone();
        async move { fetcher.fetch(&address).await }
    });
    let results = join_all(fetches).await;

    let mut updated = 0;
    for (node, result) in nodes.iter().zip(results) {
        let derived = result.map_err(anyhow::Error::from).and_then(|raw| {
            derive_reading(
                &raw,
                node.temp_offset,
                node.humidity_offset,
                epa_firmware_cutoff,
            )
            .map_err(anyhow::Error::from)
        });

        match derived {
            Ok(reading) => {
                let mut reg = registry.write().await;
                if !reg.is_registered(&node.id) {
                    debug!(
                        "Discarding late reading for node '{}' unregistered mid-tick",
                        node.id
                    );
                    continue;
                }
                reg.mark_result(&node.id, true);

                // The registry lock stays held across the cache write so
                // an unregistration cannot land between the registration
                // check and the insert and leave an orphaned cache entry.
                // Lock order is registry then cache, matching unregister.
                cache.write().await.insert(&node.id, reading);
                updated += 1;
            }
            Err(e) => {
                // Keep any previous cached reading; the next scheduled
                // tick is the retry mechanism
                warn!("Poll failed for node '{}' at {}: {}", node.id, node.address, e);
                registry.write().await.mark_result(&node.id, false);
            }
        }
    }

    if updated > 0 {
        // Subscribers pull fresh state from the cache, so the signal
        // carries no payload; send fails only when nobody listens
        let _ = notifier.send(());
    }

    updated
}
