// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ADT7410 driver: configuration, readiness check, and temperature reads.

use std::time::Duration;

use crate::error::SensorError;

use super::bus::RegisterBus;
use super::codec::{
    self, DeviceId, OperationMode, REG_CONFIG, REG_ID, REG_STATUS, REG_TEMP_LSB, REG_TEMP_MSB,
};

/// How the driver asks the sensor for a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquisitionMode {
    /// Free-running at one sample per second.
    #[default]
    Continuous,
    /// A single conversion per read, with a settling delay.
    OneShot,
}

impl AcquisitionMode {
    /// Maps the `adt7410_mode` configuration value: 0 is continuous,
    /// anything else is one-shot.
    #[must_use]
    pub const fn from_config(value: i64) -> Self {
        if value == 0 {
            Self::Continuous
        } else {
            Self::OneShot
        }
    }
}

/// Driver for an ADT7410 in 13-bit mode.
///
/// The driver holds no cached device state: readiness is decoded from the
/// status register on every read.
///
/// # Examples
///
/// ```no_run
/// use thermostat_monitor::sensor::{AcquisitionMode, Adt7410, HipiI2cBus};
///
/// # async fn example() -> Result<(), thermostat_monitor::error::SensorError> {
/// let mut sensor = Adt7410::new(HipiI2cBus::new(1, 0x48));
/// let fahrenheit = sensor.read_temperature(AcquisitionMode::Continuous).await?;
/// println!("{fahrenheit:.1} F");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Adt7410<B> {
    bus: B,
}

impl<B: RegisterBus> Adt7410<B> {
    /// Minimum wait between triggering a one-shot conversion and reading it.
    pub const ONE_SHOT_SETTLE: Duration = Duration::from_millis(240);

    /// Creates a driver over `bus`.
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Releases the underlying bus.
    pub fn release(self) -> B {
        self.bus
    }

    /// Reads the temperature in degrees Fahrenheit.
    ///
    /// In [`AcquisitionMode::Continuous`] the configuration register is set
    /// to one sample per second first. In [`AcquisitionMode::OneShot`] a
    /// conversion is triggered and the driver waits
    /// [`Self::ONE_SHOT_SETTLE`] before reading. A failed configuration
    /// write is logged and the read goes ahead, since the power-on default
    /// already converts continuously.
    ///
    /// # Errors
    ///
    /// Returns `SensorError::NotReady` if the status register reports no
    /// result, or `SensorError::Bus` if a read fails.
    pub async fn read_temperature(&mut self, mode: AcquisitionMode) -> Result<f64, SensorError> {
        match mode {
            AcquisitionMode::Continuous => {
                self.configure(OperationMode::OneSps).await;
            }
            AcquisitionMode::OneShot => {
                self.configure(OperationMode::OneShot).await;
                tokio::time::sleep(Self::ONE_SHOT_SETTLE).await;
            }
        }

        let ticks = self.read_ticks().await?;
        let fahrenheit = codec::ticks_to_fahrenheit(ticks);
        tracing::debug!(ticks, fahrenheit, ?mode, "Read temperature");
        Ok(fahrenheit)
    }

    /// Reads the raw signed tick count after checking readiness.
    ///
    /// The MSB register is read before the LSB register.
    ///
    /// # Errors
    ///
    /// Returns `SensorError::NotReady` or `SensorError::Bus`.
    pub async fn read_ticks(&mut self) -> Result<i16, SensorError> {
        let status = self.bus.read_register(REG_STATUS).await?;
        if !codec::decode_status(status) {
            tracing::warn!(status, "Temperature registers not ready");
            return Err(SensorError::NotReady);
        }

        let msb = self.bus.read_register(REG_TEMP_MSB).await?;
        let lsb = self.bus.read_register(REG_TEMP_LSB).await?;
        tracing::trace!(msb, lsb, "Raw temperature bytes");

        Ok(codec::decode_temperature_ticks(msb, lsb))
    }

    /// Reads the manufacturer id and silicon revision.
    ///
    /// # Errors
    ///
    /// Returns `SensorError::Bus` if the read fails.
    pub async fn device_id(&mut self) -> Result<DeviceId, SensorError> {
        let id = self.bus.read_register(REG_ID).await?;
        Ok(codec::decode_device_id(id))
    }

    /// Reads the current conversion mode from the configuration register.
    ///
    /// # Errors
    ///
    /// Returns `SensorError::Bus` if the read fails.
    pub async fn operation_mode(&mut self) -> Result<OperationMode, SensorError> {
        let config = self.bus.read_register(REG_CONFIG).await?;
        Ok(codec::decode_operation_mode(config))
    }

    async fn configure(&mut self, mode: OperationMode) {
        if let Err(e) = self.bus.write_register(REG_CONFIG, mode.config_value()).await {
            tracing::warn!(error = %e, ?mode, "Failed to write sensor configuration, reading anyway");
        }
    }
}
