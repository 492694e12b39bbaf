// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests: simulated sensor and input, real log, mocked chart.

mod common;

use std::fs;
use std::time::Duration;

use thermostat_monitor::input::EdgeWatcher;
use thermostat_monitor::logger::ReadingLog;
use thermostat_monitor::monitor::{Monitor, Trigger};
use thermostat_monitor::publish::{ChartConfig, Publisher, RetryPolicy, spawn_publisher};
use thermostat_monitor::sensor::codec::{CONFIG_ONE_SHOT, CONFIG_ONE_SPS};
use thermostat_monitor::sensor::{AcquisitionMode, Adt7410};
use thermostat_monitor::types::HvacState;
use tokio::sync::{mpsc, oneshot, watch};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{SimulatedAdt7410, SimulatedPin, temp_file, traces};

async fn wait_for_requests(server: &MockServer, count: usize) -> usize {
    let mut seen = 0;
    for _ in 0..200 {
        seen = server.received_requests().await.unwrap().len();
        if seen >= count {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    seen
}

#[tokio::test]
async fn tick_then_edge_are_logged_and_uploaded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "https://plot.ly/~someone/12",
            "error": ""
        })))
        .mount(&server)
        .await;

    let log_path = temp_file("pipeline.log");
    let sensor_sim = SimulatedAdt7410::new(320);
    // High is OFF with the default active-low polarity.
    let pin = SimulatedPin::new(true);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let chart = ChartConfig::new("someone", "secret")
        .with_endpoint(format!("{}/clientresp", server.uri()))
        .into_client()
        .unwrap();
    let (handle, publisher_task) = spawn_publisher(
        Publisher::new(chart, RetryPolicy::no_retry()),
        16,
        shutdown_rx.clone(),
    );

    let mut monitor = Monitor::new(
        Adt7410::new(sensor_sim.clone()),
        pin.clone(),
        ReadingLog::open(&log_path).unwrap(),
    )
    .with_publisher(handle);

    let (edge_tx, edge_rx) = mpsc::channel(16);
    let watcher = EdgeWatcher::new().spawn(pin.clone(), edge_tx, shutdown_rx);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let driver = async {
        assert_eq!(wait_for_requests(&server, 1).await, 1);
        // Thermostat starts calling.
        pin.script(&[false]);
        assert_eq!(wait_for_requests(&server, 2).await, 2);
        let _ = stop_tx.send(());
    };

    tokio::join!(
        monitor.run(edge_rx, Duration::from_secs(3600), async {
            let _ = stop_rx.await;
        }),
        driver
    );

    shutdown_tx.send(true).unwrap();
    watcher.await.unwrap();
    publisher_task.await.unwrap();

    assert_eq!(monitor.last_hvac_state(), Some(HvacState::On));
    assert_eq!(sensor_sim.config(), CONFIG_ONE_SPS);

    let (_, _, log) = monitor.into_parts();
    log.close().unwrap();
    let contents = fs::read_to_string(&log_path).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(",0,68.0000"));
    assert!(lines[1].ends_with(",1,68.0000"));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(traces(&requests[0])[0]["y"], serde_json::json!([0]));
    assert_eq!(traces(&requests[1])[0]["y"], serde_json::json!([0, 1]));

    fs::remove_file(&log_path).unwrap();
}

#[tokio::test(start_paused = true)]
async fn one_shot_sensor_not_ready_still_logs() {
    let log_path = temp_file("one-shot.log");
    let sensor_sim = SimulatedAdt7410::new(0);
    sensor_sim.set_ready(false);

    let mut monitor = Monitor::new(
        Adt7410::new(sensor_sim.clone()),
        SimulatedPin::new(false),
        ReadingLog::open(&log_path).unwrap(),
    )
    .with_mode(AcquisitionMode::OneShot);

    let reading = monitor.observe(Trigger::Tick).await.unwrap();

    assert_eq!(reading.hvac_state(), HvacState::On);
    assert_eq!(reading.temperature(), None);
    assert_eq!(sensor_sim.config(), CONFIG_ONE_SHOT);

    let contents = fs::read_to_string(&log_path).unwrap();
    assert!(contents.ends_with(",1,\n"));

    monitor.into_parts().2.close().unwrap();
    fs::remove_file(&log_path).unwrap();
}

#[tokio::test]
async fn log_survives_unreachable_chart() {
    let log_path = temp_file("offline.log");
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let chart = ChartConfig::new("someone", "secret")
        .with_endpoint("http://127.0.0.1:9/clientresp")
        .with_timeout(Duration::from_millis(200))
        .into_client()
        .unwrap();
    // Long backoff keeps the upload task busy with the first reading.
    let policy = RetryPolicy::default().with_initial_delay(Duration::from_secs(3600));
    let (handle, publisher_task) =
        spawn_publisher(Publisher::new(chart, policy), 1, shutdown_rx);

    let pin = SimulatedPin::new(true);
    let mut monitor = Monitor::new(
        Adt7410::new(SimulatedAdt7410::new(480)),
        pin.clone(),
        ReadingLog::open(&log_path).unwrap(),
    )
    .with_publisher(handle);

    for level in [true, false, true, false, true] {
        pin.script(&[level]);
        monitor.observe(Trigger::Tick).await.unwrap();
    }

    let contents = fs::read_to_string(&log_path).unwrap();
    assert_eq!(contents.lines().count(), 5);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), publisher_task)
        .await
        .unwrap()
        .unwrap();

    monitor.into_parts().2.close().unwrap();
    fs::remove_file(&log_path).unwrap();
}
