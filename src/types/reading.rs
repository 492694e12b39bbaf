// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The reading record produced on every observation.

use chrono::{DateTime, Local};

use super::HvacState;

/// Format used for timestamps in the log file and on the chart x-axis.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One observation of the thermostat line and the indoor temperature.
///
/// Readings are immutable; the monitor builds one per trigger and hands
/// copies to the log and the publisher.
///
/// # Examples
///
/// ```
/// use chrono::Local;
/// use thermostat_monitor::types::{HvacState, Reading};
///
/// let reading = Reading::new(Local::now(), HvacState::On, Some(68.5));
/// assert_eq!(reading.hvac_state(), HvacState::On);
/// assert_eq!(reading.temperature(), Some(68.5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    timestamp: DateTime<Local>,
    hvac_state: HvacState,
    temperature: Option<f64>,
}

impl Reading {
    /// Creates a reading.
    ///
    /// `temperature` is in degrees Fahrenheit, `None` when the sensor could
    /// not be read.
    #[must_use]
    pub const fn new(
        timestamp: DateTime<Local>,
        hvac_state: HvacState,
        temperature: Option<f64>,
    ) -> Self {
        Self {
            timestamp,
            hvac_state,
            temperature,
        }
    }

    /// Creates a reading stamped with the current local time.
    #[must_use]
    pub fn now(hvac_state: HvacState, temperature: Option<f64>) -> Self {
        Self::new(Local::now(), hvac_state, temperature)
    }

    /// When the observation was made.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// The HVAC state observed.
    #[must_use]
    pub const fn hvac_state(&self) -> HvacState {
        self.hvac_state
    }

    /// Indoor temperature in degrees Fahrenheit, if it could be read.
    #[must_use]
    pub const fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    /// Timestamp rendered with [`TIMESTAMP_FORMAT`].
    #[must_use]
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}
