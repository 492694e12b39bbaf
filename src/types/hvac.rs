// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HVAC call state and the input polarity that maps pin levels onto it.

use std::fmt;

/// Whether the thermostat is currently calling for heating or cooling.
///
/// # Examples
///
/// ```
/// use thermostat_monitor::types::HvacState;
///
/// assert_eq!(HvacState::On.as_num(), 1);
/// assert_eq!(HvacState::Off.as_num(), 0);
/// assert_eq!(HvacState::from(true), HvacState::On);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HvacState {
    /// No call for heat or cooling.
    Off,
    /// The thermostat is calling.
    On,
}

impl HvacState {
    /// Returns the label used in log output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
        }
    }

    /// Returns the numeric value written to the log and plotted on the chart.
    #[must_use]
    pub const fn as_num(&self) -> u8 {
        match self {
            Self::Off => 0,
            Self::On => 1,
        }
    }
}

impl fmt::Display for HvacState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<bool> for HvacState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

/// Which input level means the HVAC is on.
///
/// The HCPL-3700 opto-isolator pulls its output low while the 24 VAC call
/// line is energised, so the usual wiring is [`InputPolarity::ActiveLow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputPolarity {
    /// Logic low means ON.
    #[default]
    ActiveLow,
    /// Logic high means ON.
    ActiveHigh,
}

impl InputPolarity {
    /// Builds the polarity from the `active_low` configuration flag.
    #[must_use]
    pub const fn from_active_low(active_low: bool) -> Self {
        if active_low {
            Self::ActiveLow
        } else {
            Self::ActiveHigh
        }
    }

    /// Maps a raw pin level (`true` = high) to an HVAC state.
    #[must_use]
    pub const fn state_for(&self, level: bool) -> HvacState {
        match (self, level) {
            (Self::ActiveLow, false) | (Self::ActiveHigh, true) => HvacState::On,
            (Self::ActiveLow, true) | (Self::ActiveHigh, false) => HvacState::Off,
        }
    }
}
