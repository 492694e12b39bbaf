// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Thermostat monitor daemon.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::Level;

use thermostat_monitor::input::{EdgeWatcher, SysfsPin};
use thermostat_monitor::logger::ReadingLog;
use thermostat_monitor::monitor::Monitor;
use thermostat_monitor::publish::{
    DEFAULT_QUEUE_CAPACITY, Publisher, RetryPolicy, spawn_publisher,
};
use thermostat_monitor::sensor::{Adt7410, RegisterBus};
use thermostat_monitor::{MonitorConfig, Result};

/// Pending edge notifications before new ones are dropped.
const EDGE_QUEUE_CAPACITY: usize = 16;

/// Log HVAC thermostat activity and indoor temperature
#[derive(Parser, Debug)]
#[command(name = "thermostat-monitor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(
        short = 'c',
        long = "config",
        value_name = "PATH",
        default_value = MonitorConfig::DEFAULT_PATH
    )]
    config: PathBuf,

    /// Debug verbosity level (0=info, 1=debug, 2=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0")]
    debug: u8,

    /// Reading log file, overriding the configuration
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.debug {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting thermostat monitor");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = MonitorConfig::load(&cli.config)?;
    if let Some(path) = cli.log_file {
        config.log_file = path;
    }

    let mut sensor = Adt7410::new(config.bus());
    self_check(&mut sensor).await;

    let chart_client = config
        .chart_config()
        .map(|chart| chart.into_client())
        .transpose()?;

    let pin = SysfsPin::open(config.hcpl3700)?;
    let log = match ReadingLog::open(&config.log_file) {
        Ok(log) => log,
        Err(e) => {
            release_pin(pin);
            return Err(e.into());
        }
    };
    tracing::info!(path = %log.path().display(), "Started logging");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (publisher, publisher_task) = match chart_client {
        Some(client) => {
            let publisher = Publisher::new(client, RetryPolicy::default());
            let (handle, task) =
                spawn_publisher(publisher, DEFAULT_QUEUE_CAPACITY, shutdown_rx.clone());
            tracing::info!(chart = %config.chart_name, "Chart upload enabled");
            (Some(handle), Some(task))
        }
        None => (None, None),
    };

    let mut monitor = Monitor::new(sensor, pin.clone(), log)
        .with_polarity(config.polarity())
        .with_mode(config.acquisition_mode());
    if let Some(handle) = publisher {
        monitor = monitor.with_publisher(handle);
    }

    let (edge_tx, edge_rx) = mpsc::channel(EDGE_QUEUE_CAPACITY);
    let watcher = EdgeWatcher::new().spawn(pin, edge_tx, shutdown_rx);
    tracing::info!(line = config.hcpl3700, "Added edge detection on thermostat input");

    monitor.run(edge_rx, config.nap(), shutdown_signal()).await;

    let _ = shutdown_tx.send(true);
    if let Err(e) = watcher.await {
        tracing::warn!(error = %e, "Edge watcher ended abnormally");
    }
    if let Some(task) = publisher_task
        && let Err(e) = task.await
    {
        tracing::warn!(error = %e, "Upload task ended abnormally");
    }

    let (_, pin, log) = monitor.into_parts();
    if let Err(e) = log.close() {
        tracing::error!(error = %e, "Failed to close reading log");
    }
    release_pin(pin);

    tracing::info!("Stopped");
    Ok(())
}

/// Logs the sensor identity and mode. Failures are reported, not fatal.
async fn self_check<B: RegisterBus>(sensor: &mut Adt7410<B>) {
    match sensor.device_id().await {
        Ok(id) => tracing::info!(
            manufacturer_id = id.manufacturer_id,
            silicon_revision = id.silicon_revision,
            "ADT7410 identified"
        ),
        Err(e) => tracing::warn!(error = %e, "Failed to read ADT7410 id"),
    }

    match sensor.operation_mode().await {
        Ok(mode) => tracing::info!(?mode, "ADT7410 current configuration"),
        Err(e) => tracing::warn!(error = %e, "Failed to read ADT7410 configuration"),
    }
}

fn release_pin(pin: SysfsPin) {
    let line = pin.line();
    if let Err(e) = pin.release() {
        tracing::warn!(line, error = %e, "Failed to release GPIO line");
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Interrupt received, shutting down");
}
