// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Byte-oriented register bus used to talk to the sensor.
//!
//! Every call is an independent bus transaction. No repeated-start support is
//! assumed: a register read is a pointer write followed by a separate read.
//! Transactions are async so a slow helper process never holds a runtime
//! worker thread.
//!
//! # Transports
//!
//! - [`HipiI2cBus`]: runs the `hipi-i2c` helper once per transaction. The
//!   Raspberry Pi's kernel I2C driver cannot issue repeated starts, and the
//!   helper drives the controller directly instead.
//! - [`HalRegisterBus`]: any [`embedded_hal::i2c::I2c`] implementation.

use std::future::Future;
use std::path::{Path, PathBuf};

use embedded_hal::i2c::I2c;
use tokio::process::Command;

use crate::error::TransportError;

/// A device on a byte-oriented bus, addressed by register number.
///
/// The bus identifier and device address are fixed when the transport is
/// built, so callers only name registers.
pub trait RegisterBus {
    /// Reads one byte from `register`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the transaction fails or returns no data.
    fn read_register(
        &mut self,
        register: u8,
    ) -> impl Future<Output = Result<u8, TransportError>> + Send;

    /// Writes one byte to `register`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the transaction fails.
    fn write_register(
        &mut self,
        register: u8,
        value: u8,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

impl<T: RegisterBus + Send + ?Sized> RegisterBus for &mut T {
    async fn read_register(&mut self, register: u8) -> Result<u8, TransportError> {
        (**self).read_register(register).await
    }

    async fn write_register(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
        (**self).write_register(register, value).await
    }
}

// ============================================================================
// HipiI2cBus
// ============================================================================

/// Register bus backed by the `hipi-i2c` command-line helper.
///
/// # Examples
///
/// ```no_run
/// use thermostat_monitor::sensor::{HipiI2cBus, RegisterBus};
///
/// # async fn example() -> Result<(), thermostat_monitor::error::TransportError> {
/// let mut bus = HipiI2cBus::new(1, 0x48);
/// let status = bus.read_register(0x02).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HipiI2cBus {
    program: PathBuf,
    bus: u8,
    address: u8,
}

impl HipiI2cBus {
    /// Default location of the helper.
    pub const DEFAULT_PROGRAM: &'static str = "/usr/local/bin/hipi-i2c";

    /// Creates a transport for the device at `address` on bus `bus`.
    #[must_use]
    pub fn new(bus: u8, address: u8) -> Self {
        Self {
            program: PathBuf::from(Self::DEFAULT_PROGRAM),
            bus,
            address,
        }
    }

    /// Uses a different helper executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Returns the helper executable.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Returns the bus identifier.
    #[must_use]
    pub fn bus(&self) -> u8 {
        self.bus
    }

    /// Returns the device address.
    #[must_use]
    pub fn address(&self) -> u8 {
        self.address
    }

    fn read_args(&self, register: u8) -> Vec<String> {
        vec![
            "r".to_string(),
            self.bus.to_string(),
            format!("0x{:02X}", self.address),
            format!("0x{register:02X}"),
        ]
    }

    fn write_args(&self, register: u8, value: u8) -> Vec<String> {
        vec![
            "w".to_string(),
            self.bus.to_string(),
            format!("0x{:02X}", self.address),
            format!("0x{register:02X}"),
            format!("0x{value:02X}"),
        ]
    }

    async fn run(&self, args: &[String]) -> Result<String, TransportError> {
        tracing::trace!(program = %self.program.display(), ?args, "Running bus helper");

        let output = Command::new(&self.program).args(args).output().await?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(TransportError::Command {
                code: output.status.code(),
                output: combined.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl RegisterBus for HipiI2cBus {
    async fn read_register(&mut self, register: u8) -> Result<u8, TransportError> {
        let args = self.read_args(register);
        let stdout = self.run(&args).await?;
        parse_byte(&stdout)
    }

    async fn write_register(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
        let args = self.write_args(register, value);
        self.run(&args).await.map(|_| ())
    }
}

/// Parses a byte printed by the helper, in decimal or `0x` hex.
fn parse_byte(output: &str) -> Result<u8, TransportError> {
    let text = output.trim();
    if text.is_empty() {
        return Err(TransportError::NoData);
    }

    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => text.parse::<u8>(),
    };

    parsed.map_err(|_| TransportError::InvalidOutput(text.to_string()))
}

// ============================================================================
// HalRegisterBus
// ============================================================================

/// Register bus over an `embedded-hal` I2C implementation.
#[derive(Debug)]
pub struct HalRegisterBus<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> HalRegisterBus<I> {
    /// Wraps `i2c`, talking to the device at `address`.
    pub fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Releases the underlying bus.
    pub fn release(self) -> I {
        self.i2c
    }
}

fn hal_error<E: embedded_hal::i2c::Error>(err: &E) -> TransportError {
    TransportError::Hal(format!("{:?}", err.kind()))
}

impl<I: I2c + Send> RegisterBus for HalRegisterBus<I> {
    async fn read_register(&mut self, register: u8) -> Result<u8, TransportError> {
        self.i2c
            .write(self.address, &[register])
            .map_err(|e| hal_error(&e))?;
        let mut buf = [0u8; 1];
        self.i2c
            .read(self.address, &mut buf)
            .map_err(|e| hal_error(&e))?;
        Ok(buf[0])
    }

    async fn write_register(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(|e| hal_error(&e))
    }
}
