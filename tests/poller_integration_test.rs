// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airquality project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Integration tests for the polling engine
//!
//! These tests run the full register -> fetch -> transform -> cache ->
//! notify path against a mock HTTP device, including:
//! - Cache and notification behavior of a successful tick
//! - Per-node failure isolation within a mixed tick
//! - Stale-but-available semantics after a node starts failing
//! - Discarding of in-flight results for nodes unregistered mid-tick
//! - Reference-counted registration and cache cleanup

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::timeout;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rust_airquality::config::PollingConfig;
use rust_airquality::poller::PollerDaemon;

/// Raw payload of the reference dual-channel device
fn device_payload() -> serde_json::Value {
    json!({
        "SensorId": "12345",
        "place": "Test Location",
        "version": "7.00",
        "hardwareversion": "2.0",
        "hardwarediscovered": "2.0+BME280+PMSX003-B+PMSX003-A",
        "current_temp_f": 75,
        "current_humidity": 50,
        "current_dewpoint_f": 55,
        "pressure": 1013.25,
        "pm1_0_atm": 5.0,
        "pm2_5_atm": 10.0,
        "pm10_0_atm": 15.0,
        "pm2.5_aqi": 42,
        "pm2.5_aqi_b": 41,
        "pm1_0_atm_b": 5.1,
        "pm2_5_atm_b": 10.1,
        "pm10_0_atm_b": 15.1,
        "rssi": -45,
    })
}

async fn mock_device(response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .and(query_param("live", "false"))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_successful_tick_updates_cache_and_notifies() {
    let server = mock_device(ResponseTemplate::new(200).set_body_json(device_payload())).await;

    let daemon = PollerDaemon::new(PollingConfig::default());
    daemon
        .register_node("12345", &server.address().to_string(), -8, 4)
        .await;
    let mut subscriber = daemon.subscribe();

    assert_eq!(daemon.poll_once().await, 1);
    assert!(subscriber.try_recv().is_ok());

    assert_eq!(
        daemon.get_reading("12345", "current_temp").await,
        Some(json!(67.0))
    );
    assert_eq!(
        daemon.get_reading("12345", "current_humidity").await,
        Some(json!(54.0))
    );
    assert_eq!(
        daemon.get_reading("12345", "pm2_5_atm").await,
        Some(json!(10.05))
    );
    assert_eq!(daemon.get_reading("12345", "aqi_epa").await, Some(json!(28)));
    assert_eq!(
        daemon.get_reading("12345", "aqi_lrapa").await,
        Some(json!(18))
    );
    assert_eq!(
        daemon.get_reading("12345", "pm2_5_aqi_raw").await,
        Some(json!(42.0))
    );
    assert_eq!(
        daemon.get_reading("12345", "pm2_5_aqi_b_raw").await,
        Some(json!(41.0))
    );
    assert_eq!(daemon.get_reading("12345", "rssi").await, Some(json!(-45)));
    assert!(daemon.get_reading("12345", "current_dewpoint").await.is_some());

    let registry = daemon.registry();
    assert_eq!(registry.read().await.last_success("12345"), Some(true));
}

#[tokio::test]
async fn test_failing_node_does_not_affect_others() {
    let server = mock_device(ResponseTemplate::new(200).set_body_json(device_payload())).await;

    let daemon = PollerDaemon::new(PollingConfig::default());
    daemon
        .register_node("good", &server.address().to_string(), -8, 4)
        .await;
    // Discard port: connection refused, classified Unreachable
    daemon.register_node("bad", "127.0.0.1:9", -8, 4).await;
    let mut subscriber = daemon.subscribe();

    assert_eq!(daemon.poll_once().await, 1);

    assert!(daemon.get_reading("good", "pm2_5_atm").await.is_some());
    assert_eq!(daemon.get_reading("bad", "pm2_5_atm").await, None);

    let registry = daemon.registry();
    assert_eq!(registry.read().await.last_success("good"), Some(true));
    assert_eq!(registry.read().await.last_success("bad"), Some(false));

    // The tick-completion notification still fires, exactly once
    assert!(subscriber.try_recv().is_ok());
    assert!(matches!(subscriber.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_failed_poll_keeps_stale_reading() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_payload()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let daemon = PollerDaemon::new(PollingConfig::default());
    daemon
        .register_node("12345", &server.address().to_string(), -8, 4)
        .await;
    let mut subscriber = daemon.subscribe();

    assert_eq!(daemon.poll_once().await, 1);
    assert!(subscriber.try_recv().is_ok());

    // Second tick hits the 500 fallback: nothing is updated, no
    // notification fires, and the previous reading stays exposed
    assert_eq!(daemon.poll_once().await, 0);
    assert!(matches!(subscriber.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(
        daemon.get_reading("12345", "pm2_5_atm").await,
        Some(json!(10.05))
    );

    let registry = daemon.registry();
    assert_eq!(registry.read().await.last_success("12345"), Some(false));
}

#[tokio::test]
async fn test_malformed_body_counts_as_failure() {
    let server = mock_device(ResponseTemplate::new(200).set_body_string("not json")).await;

    let daemon = PollerDaemon::new(PollingConfig::default());
    daemon
        .register_node("12345", &server.address().to_string(), -8, 4)
        .await;

    assert_eq!(daemon.poll_once().await, 0);
    assert_eq!(daemon.get_reading("12345", "pm2_5_atm").await, None);

    let registry = daemon.registry();
    assert_eq!(registry.read().await.last_success("12345"), Some(false));
}

#[tokio::test]
async fn test_unregister_mid_tick_discards_in_flight_result() {
    let server = mock_device(
        ResponseTemplate::new(200)
            .set_body_json(device_payload())
            .set_delay(Duration::from_millis(300)),
    )
    .await;

    let daemon = Arc::new(PollerDaemon::new(PollingConfig::default()));
    daemon
        .register_node("12345", &server.address().to_string(), -8, 4)
        .await;

    let poller = daemon.clone();
    let tick = tokio::spawn(async move { poller.poll_once().await });

    // Unregister while the fetch is still sleeping inside the mock device
    tokio::time::sleep(Duration::from_millis(50)).await;
    daemon.unregister_node("12345").await;
    assert!(!daemon.is_registered("12345").await);

    // The late result must be discarded, never written to the cache
    assert_eq!(tick.await.unwrap(), 0);
    assert_eq!(daemon.get_reading("12345", "pm2_5_atm").await, None);
    assert!(daemon.cache().read().await.is_empty());
}

#[tokio::test]
async fn test_unregister_racing_tick_never_leaves_orphaned_cache_entry() {
    let server = mock_device(
        ResponseTemplate::new(200)
            .set_body_json(device_payload())
            .set_delay(Duration::from_millis(25)),
    )
    .await;

    let daemon = Arc::new(PollerDaemon::new(PollingConfig::default()));
    let address = server.address().to_string();

    // Sweep the unregistration across the whole response window, including
    // the instant the tick is about to write the cache. Whatever the
    // interleaving, an unregistered node must never retain (or regain) a
    // cached reading.
    for step in 0..12u64 {
        daemon.register_node("12345", &address, -8, 4).await;

        let poller = daemon.clone();
        let tick = tokio::spawn(async move { poller.poll_once().await });

        tokio::time::sleep(Duration::from_millis(step * 5)).await;
        daemon.unregister_node("12345").await;
        assert!(!daemon.is_registered("12345").await);

        tick.await.unwrap();
        assert_eq!(
            daemon.get_reading("12345", "pm2_5_atm").await,
            None,
            "unregistered node exposed a reading at step {}",
            step
        );
        assert!(daemon.cache().read().await.is_empty());
    }
}

#[tokio::test]
async fn test_reference_counted_unregistration_clears_cache_at_zero() {
    let server = mock_device(ResponseTemplate::new(200).set_body_json(device_payload())).await;

    let daemon = PollerDaemon::new(PollingConfig::default());
    let address = server.address().to_string();
    daemon.register_node("12345", &address, -8, 4).await;
    daemon.register_node("12345", &address, -8, 4).await;

    assert_eq!(daemon.poll_once().await, 1);

    // First unregistration keeps the node and its reading
    daemon.unregister_node("12345").await;
    assert!(daemon.is_registered("12345").await);
    assert!(daemon.get_reading("12345", "pm2_5_atm").await.is_some());

    // Second one removes the node and clears its cached reading
    daemon.unregister_node("12345").await;
    assert!(!daemon.is_registered("12345").await);
    assert_eq!(daemon.get_reading("12345", "pm2_5_atm").await, None);
}

#[tokio::test]
async fn test_scheduled_loop_polls_and_shuts_down() {
    let server = mock_device(ResponseTemplate::new(200).set_body_json(device_payload())).await;

    let mut config = PollingConfig::default();
    config.scan_interval_secs = 1;
    let mut daemon = PollerDaemon::new(config);
    daemon
        .register_node("12345", &server.address().to_string(), -8, 4)
        .await;
    let mut subscriber = daemon.subscribe();

    daemon.start();

    // The first interval tick fires immediately after start
    timeout(Duration::from_secs(5), subscriber.recv())
        .await
        .expect("tick notification within the poll interval")
        .expect("notification channel open");
    assert!(daemon.get_reading("12345", "pm2_5_atm").await.is_some());

    daemon.shutdown();
    timeout(Duration::from_secs(5), daemon.join())
        .await
        .expect("poller joins promptly after shutdown")
        .unwrap();
}
