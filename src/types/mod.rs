// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared by the monitor, the log, and the publisher.
//!
//! # Types
//!
//! - [`HvacState`] - On/Off state of the thermostat call line
//! - [`InputPolarity`] - Which pin level means ON
//! - [`Reading`] - One timestamped observation

mod hvac;
mod reading;

pub use hvac::{HvacState, InputPolarity};
pub use reading::{Reading, TIMESTAMP_FORMAT};
