// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The monitoring loop.
//!
//! Every trigger, whether an input edge or the periodic timer, runs the same
//! cycle: sample the input, read the temperature, append to the log, then
//! queue the reading for upload. One loop consumes all triggers, so two
//! cycles never overlap.

use std::future::Future;
use std::time::Duration;

use chrono::Local;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::error::{Error, Result};
use crate::input::{DigitalInput, EdgeEvent};
use crate::logger::ReadingLog;
use crate::publish::PublisherHandle;
use crate::sensor::{AcquisitionMode, Adt7410, RegisterBus};
use crate::types::{HvacState, InputPolarity, Reading};

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The periodic timer fired.
    Tick,
    /// The input changed level.
    Edge(EdgeEvent),
}

/// Owns the sensor, the input, the log and the upload handle.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use thermostat_monitor::input::SysfsPin;
/// use thermostat_monitor::logger::ReadingLog;
/// use thermostat_monitor::monitor::Monitor;
/// use thermostat_monitor::sensor::{Adt7410, HipiI2cBus};
///
/// # async fn example() -> thermostat_monitor::Result<()> {
/// let sensor = Adt7410::new(HipiI2cBus::new(1, 0x48));
/// let pin = SysfsPin::open(17)?;
/// let log = ReadingLog::open("thermostat.log")?;
///
/// let (_edge_tx, edge_rx) = tokio::sync::mpsc::channel(16);
/// let mut monitor = Monitor::new(sensor, pin, log);
/// monitor
///     .run(edge_rx, Duration::from_secs(300), async {
///         let _ = tokio::signal::ctrl_c().await;
///     })
///     .await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Monitor<B, P> {
    sensor: Adt7410<B>,
    input: P,
    polarity: InputPolarity,
    mode: AcquisitionMode,
    log: ReadingLog,
    publisher: Option<PublisherHandle>,
    last_hvac_state: Option<HvacState>,
}

impl<B: RegisterBus, P: DigitalInput> Monitor<B, P> {
    /// Creates a monitor with active-low polarity, continuous acquisition
    /// and no upload.
    pub fn new(sensor: Adt7410<B>, input: P, log: ReadingLog) -> Self {
        Self {
            sensor,
            input,
            polarity: InputPolarity::default(),
            mode: AcquisitionMode::default(),
            log,
            publisher: None,
            last_hvac_state: None,
        }
    }

    /// Sets which input level means ON.
    #[must_use]
    pub fn with_polarity(mut self, polarity: InputPolarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// Sets the sensor acquisition mode.
    #[must_use]
    pub fn with_mode(mut self, mode: AcquisitionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Queues every logged reading for upload through `handle`.
    #[must_use]
    pub fn with_publisher(mut self, handle: PublisherHandle) -> Self {
        self.publisher = Some(handle);
        self
    }

    /// State recorded by the last completed cycle.
    #[must_use]
    pub fn last_hvac_state(&self) -> Option<HvacState> {
        self.last_hvac_state
    }

    /// Returns the reading log.
    #[must_use]
    pub fn log(&self) -> &ReadingLog {
        &self.log
    }

    /// Runs one cycle.
    ///
    /// A sensor failure is logged and leaves the temperature empty. The
    /// reading is queued for upload only after it has been written to the
    /// log.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` if the input cannot be read and
    /// `Error::Persistence` if the log append fails. Neither queues an
    /// upload nor updates [`Monitor::last_hvac_state`].
    pub async fn observe(&mut self, trigger: Trigger) -> Result<Reading> {
        let timestamp = Local::now();

        let level = self.input.read_level().await?;
        let hvac_state = self.polarity.state_for(level);

        let temperature = match self.sensor.read_temperature(self.mode).await {
            Ok(fahrenheit) => Some(fahrenheit),
            Err(e) => {
                tracing::warn!(error = %e, "Couldn't get temperature");
                None
            }
        };

        let reading = Reading::new(timestamp, hvac_state, temperature);
        self.log.append(&reading)?;

        if let Some(publisher) = &self.publisher {
            publisher.offer(reading);
        }
        self.last_hvac_state = Some(hvac_state);

        tracing::info!(
            ?trigger,
            hvac = %hvac_state,
            temperature = ?temperature,
            "Recorded reading"
        );
        Ok(reading)
    }

    /// Runs cycles until `shutdown` resolves.
    ///
    /// The first timer cycle runs immediately, then every `nap`. Edge events
    /// from `edges` are handled in arrival order between timer cycles. Once
    /// the edge channel closes the loop continues on the timer alone.
    ///
    /// A cycle still waiting on the input or the sensor when `shutdown`
    /// resolves is abandoned. Nothing is logged for it.
    pub async fn run<F>(
        &mut self,
        mut edges: mpsc::Receiver<EdgeEvent>,
        nap: Duration,
        shutdown: F,
    ) where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(nap);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut edges_open = true;

        tracing::info!(?nap, mode = ?self.mode, polarity = ?self.polarity, "Monitoring started");

        loop {
            let trigger = tokio::select! {
                biased;
                () = &mut shutdown => break,
                edge = edges.recv(), if edges_open => match edge {
                    Some(edge) => Trigger::Edge(edge),
                    None => {
                        tracing::warn!("Edge notifications stopped, continuing on timer");
                        edges_open = false;
                        continue;
                    }
                },
                _ = ticker.tick() => Trigger::Tick,
            };

            let outcome = tokio::select! {
                biased;
                () = &mut shutdown => break,
                outcome = self.observe(trigger) => outcome,
            };

            if let Err(e) = outcome {
                match &e {
                    Error::Persistence(_) => {
                        tracing::error!(error = %e, "Failed to write log entry");
                    }
                    _ => tracing::warn!(error = %e, ?trigger, "Cycle skipped"),
                }
            }
        }

        tracing::info!("Monitoring stopped");
    }

    /// Splits the monitor back into its owned resources.
    pub fn into_parts(self) -> (Adt7410<B>, P, ReadingLog) {
        (self.sensor, self.input, self.log)
    }
}
