// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Thermostat Monitor - log HVAC thermostat activity and indoor temperature.
//!
//! The monitor watches the thermostat call line through an optocoupler on a
//! GPIO input and reads an ADT7410 temperature sensor over I2C. Every input
//! edge and every periodic tick produce one reading, which is appended to a
//! local CSV log and optionally uploaded to a remote chart.
//!
//! # Features
//!
//! - **Sensor**: 13-bit ADT7410 reads in continuous or one-shot mode
//! - **Input**: debounced edge detection plus periodic sampling
//! - **Log**: one flushed line per reading, never torn
//! - **Upload**: step-interpolated chart segments with bounded exponential
//!   backoff, decoupled from the log
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use thermostat_monitor::input::{EdgeWatcher, SysfsPin};
//! use thermostat_monitor::logger::ReadingLog;
//! use thermostat_monitor::monitor::Monitor;
//! use thermostat_monitor::sensor::{Adt7410, HipiI2cBus};
//! use tokio::sync::{mpsc, watch};
//!
//! #[tokio::main]
//! async fn main() -> thermostat_monitor::Result<()> {
//!     let pin = SysfsPin::open(17)?;
//!     let (shutdown_tx, shutdown_rx) = watch::channel(false);
//!     let (edge_tx, edge_rx) = mpsc::channel(16);
//!     let watcher = EdgeWatcher::new().spawn(pin.clone(), edge_tx, shutdown_rx);
//!
//!     let sensor = Adt7410::new(HipiI2cBus::new(1, 0x48));
//!     let mut monitor = Monitor::new(sensor, pin, ReadingLog::open("thermostat.log")?);
//!     monitor
//!         .run(edge_rx, Duration::from_secs(300), async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await;
//!
//!     let _ = shutdown_tx.send(true);
//!     let _ = watcher.await;
//!     let (_, pin, log) = monitor.into_parts();
//!     log.close()?;
//!     pin.release()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod input;
pub mod logger;
pub mod monitor;
pub mod publish;
pub mod sensor;
pub mod types;

pub use config::MonitorConfig;
pub use error::{
    ConfigError, Error, PersistenceError, PublishError, Result, SensorError, TransportError,
};
pub use input::{DigitalInput, EdgeEvent, EdgeWatcher, HalInputPin, SysfsPin};
pub use logger::ReadingLog;
pub use monitor::{Monitor, Trigger};
pub use publish::{
    ChartClient, ChartConfig, ChartPoint, Interpolator, Publisher, PublisherHandle, RetryPolicy,
};
pub use sensor::{AcquisitionMode, Adt7410, HalRegisterBus, HipiI2cBus, RegisterBus};
pub use types::{HvacState, InputPolarity, Reading};
