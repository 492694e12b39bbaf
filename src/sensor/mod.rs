// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ADT7410 temperature sensor support.
//!
//! - [`codec`]: register map and pure byte-to-temperature conversions
//! - [`RegisterBus`]: the byte-oriented transport the driver talks through
//! - [`Adt7410`]: the driver exposing [`Adt7410::read_temperature`]

pub mod codec;

mod bus;
mod driver;

pub use bus::{HalRegisterBus, HipiI2cBus, RegisterBus};
pub use codec::{DeviceId, OperationMode};
pub use driver::{AcquisitionMode, Adt7410};
