// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ADT7410 register map and pure conversions from register bytes.
//!
//! Nothing in here touches the bus. The driver reads bytes and hands them to
//! these functions, so both acquisition modes share one decoding path.
//!
//! # Temperature format (13-bit mode)
//!
//! ```text
//!  T_MSB                       T_LSB
//!  15 14 13 12 11 10  9  8  |  7  6  5  4  3 | 2  1  0
//!  S  <---------- 12-bit magnitude ---------> | fault flags
//! ```
//!
//! One tick is 0.0625 °C.

/// Temperature value, most significant byte.
pub const REG_TEMP_MSB: u8 = 0x00;
/// Temperature value, least significant byte.
pub const REG_TEMP_LSB: u8 = 0x01;
/// Status register.
pub const REG_STATUS: u8 = 0x02;
/// Configuration register.
pub const REG_CONFIG: u8 = 0x03;
/// T_HIGH setpoint, most significant byte.
pub const REG_T_HIGH_MSB: u8 = 0x04;
/// T_HIGH setpoint, least significant byte.
pub const REG_T_HIGH_LSB: u8 = 0x05;
/// T_LOW setpoint, most significant byte.
pub const REG_T_LOW_MSB: u8 = 0x06;
/// T_LOW setpoint, least significant byte.
pub const REG_T_LOW_LSB: u8 = 0x07;
/// T_CRIT setpoint, most significant byte.
pub const REG_T_CRIT_MSB: u8 = 0x08;
/// T_CRIT setpoint, least significant byte.
pub const REG_T_CRIT_LSB: u8 = 0x09;
/// T_HYST setpoint.
pub const REG_T_HYST: u8 = 0x0A;
/// Manufacturer and silicon revision.
pub const REG_ID: u8 = 0x0B;
/// Software reset.
pub const REG_RESET: u8 = 0x2F;

/// Configuration value: continuous conversion (power-on default).
pub const CONFIG_CONTINUOUS: u8 = 0x00;
/// Configuration value: one-shot conversion.
pub const CONFIG_ONE_SHOT: u8 = 0x20;
/// Configuration value: one sample per second.
pub const CONFIG_ONE_SPS: u8 = 0x40;
/// Configuration value: shutdown.
pub const CONFIG_SHUTDOWN: u8 = 0x60;

/// Degrees Celsius per tick in 13-bit mode.
pub const CELSIUS_PER_TICK_13: f64 = 0.0625;
/// Degrees Celsius per tick in 16-bit mode.
pub const CELSIUS_PER_TICK_16: f64 = 0.0078;

/// Smallest tick count a 13-bit reading can decode to.
pub const MIN_TICKS: i16 = -4096;
/// Largest tick count a 13-bit reading can decode to.
pub const MAX_TICKS: i16 = 4095;

const FIELD_MASK: u16 = 0x1FFF;
const SIGN_BIT: u16 = 0x1000;
const FAULT_BITS: u32 = 3;

/// Manufacturer and silicon revision from the ID register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId {
    /// Top five bits of the ID register.
    pub manufacturer_id: u8,
    /// Bottom three bits of the ID register.
    pub silicon_revision: u8,
}

/// Conversion mode held in bits 6..5 of the configuration register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    /// Converts back to back.
    Continuous,
    /// Converts once, then idles.
    OneShot,
    /// One conversion per second.
    OneSps,
    /// Powered down.
    Shutdown,
}

impl OperationMode {
    /// Returns the configuration register value selecting this mode.
    #[must_use]
    pub const fn config_value(&self) -> u8 {
        match self {
            Self::Continuous => CONFIG_CONTINUOUS,
            Self::OneShot => CONFIG_ONE_SHOT,
            Self::OneSps => CONFIG_ONE_SPS,
            Self::Shutdown => CONFIG_SHUTDOWN,
        }
    }
}

/// Returns true if the status register says the temperature is ready.
///
/// The device clears bit 7 (`/RDY`) when a conversion result is available;
/// the other bits are threshold flags and do not matter here.
///
/// # Examples
///
/// ```
/// use thermostat_monitor::sensor::codec::decode_status;
///
/// assert!(decode_status(0x00));
/// assert!(decode_status(0x70));
/// assert!(!decode_status(0x80));
/// ```
#[must_use]
pub const fn decode_status(status: u8) -> bool {
    status & 0x80 == 0
}

/// Splits the ID register into manufacturer id and silicon revision.
#[must_use]
pub const fn decode_device_id(id: u8) -> DeviceId {
    DeviceId {
        manufacturer_id: id >> 3,
        silicon_revision: id & 0x07,
    }
}

/// Extracts the conversion mode from the configuration register.
#[must_use]
pub const fn decode_operation_mode(config: u8) -> OperationMode {
    match (config >> 5) & 0b11 {
        0b00 => OperationMode::Continuous,
        0b01 => OperationMode::OneShot,
        0b10 => OperationMode::OneSps,
        _ => OperationMode::Shutdown,
    }
}

/// Interprets a 13-bit field as two's complement.
///
/// Bits above bit 12 are ignored.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn twos_complement_13(field: u16) -> i16 {
    let field = field & FIELD_MASK;
    if field & SIGN_BIT == 0 {
        // At most 0x0FFF here.
        field as i16
    } else {
        -(((!field & FIELD_MASK) + 1) as i16)
    }
}

/// Combines the two temperature bytes into signed ticks.
///
/// The 16-bit word is shifted right by three to drop the fault flags, then
/// read as 13-bit two's complement.
///
/// # Examples
///
/// ```
/// use thermostat_monitor::sensor::codec::decode_temperature_ticks;
///
/// assert_eq!(decode_temperature_ticks(0x19, 0x00), 800);
/// assert_eq!(decode_temperature_ticks(0xE7, 0x00), -800);
/// ```
#[must_use]
pub fn decode_temperature_ticks(msb: u8, lsb: u8) -> i16 {
    let word = (u16::from(msb) << 8) | u16::from(lsb);
    twos_complement_13(word >> FAULT_BITS)
}

/// Encodes signed ticks back into the 13-bit register field.
///
/// Values outside [`MIN_TICKS`]..=[`MAX_TICKS`] wrap, the way the hardware
/// field would.
#[must_use]
pub fn encode_temperature_ticks(ticks: i16) -> u16 {
    #[allow(clippy::cast_sign_loss)]
    let bits = ticks as u16;
    bits & FIELD_MASK
}

/// Encodes signed ticks as the `(msb, lsb)` pair the device would return,
/// with the fault flags clear.
#[must_use]
pub fn encode_temperature_bytes(ticks: i16) -> (u8, u8) {
    let word = encode_temperature_ticks(ticks) << FAULT_BITS;
    let [msb, lsb] = word.to_be_bytes();
    (msb, lsb)
}

/// Converts ticks to degrees Celsius.
#[must_use]
pub fn ticks_to_celsius(ticks: i16) -> f64 {
    f64::from(ticks) * CELSIUS_PER_TICK_13
}

/// Converts ticks to degrees Fahrenheit.
///
/// # Examples
///
/// ```
/// use thermostat_monitor::sensor::codec::ticks_to_fahrenheit;
///
/// assert_eq!(ticks_to_fahrenheit(0), 32.0);
/// assert_eq!(ticks_to_fahrenheit(800), 122.0);
/// ```
#[must_use]
pub fn ticks_to_fahrenheit(ticks: i16) -> f64 {
    ticks_to_celsius(ticks) * 1.8 + 32.0
}
