// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Step interpolation for the thermostat status trace.
//!
//! Plotted as a line, the status would ramp between two readings. Inserting
//! a point one second before each reading that still carries the previous
//! status turns the ramp into a step.

use chrono::{DateTime, Local, TimeDelta};

use crate::types::{HvacState, Reading};

/// Offset of the synthetic point before each true reading.
pub const INTERPOLATION_OFFSET: TimeDelta = TimeDelta::seconds(1);

/// One point sent to the chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    /// X coordinate.
    pub timestamp: DateTime<Local>,
    /// Thermostat status trace value.
    pub hvac_state: HvacState,
    /// Indoor temperature trace value.
    pub temperature: Option<f64>,
}

impl From<&Reading> for ChartPoint {
    fn from(reading: &Reading) -> Self {
        Self {
            timestamp: reading.timestamp(),
            hvac_state: reading.hvac_state(),
            temperature: reading.temperature(),
        }
    }
}

/// Remembers the previous reading's state and turns readings into chart
/// segments.
///
/// Starts empty on every process start; nothing is persisted.
#[derive(Debug, Clone, Default)]
pub struct Interpolator {
    previous: Option<HvacState>,
}

impl Interpolator {
    /// Creates an interpolator with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State of the last reading seen, if any.
    #[must_use]
    pub fn previous(&self) -> Option<HvacState> {
        self.previous
    }

    /// Builds the points for `reading` and records its state.
    ///
    /// The first reading yields one point. Later readings yield the
    /// synthetic point (previous state, current temperature) followed by
    /// the true point.
    pub fn segment(&mut self, reading: &Reading) -> Vec<ChartPoint> {
        let point = ChartPoint::from(reading);
        let segment = match self.previous {
            Some(previous) => vec![
                ChartPoint {
                    timestamp: point.timestamp - INTERPOLATION_OFFSET,
                    hvac_state: previous,
                    temperature: point.temperature,
                },
                point,
            ],
            None => vec![point],
        };
        self.previous = Some(reading.hvac_state());
        segment
    }
}
