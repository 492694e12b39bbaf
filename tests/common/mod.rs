// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use thermostat_monitor::input::DigitalInput;
use thermostat_monitor::sensor::RegisterBus;
use thermostat_monitor::sensor::codec::{
    REG_CONFIG, REG_ID, REG_STATUS, REG_TEMP_LSB, REG_TEMP_MSB, encode_temperature_bytes,
};
use thermostat_monitor::TransportError;
use wiremock::Request;

/// In-memory ADT7410 register file.
#[derive(Debug, Clone)]
pub struct SimulatedAdt7410 {
    registers: Arc<Mutex<[u8; 0x30]>>,
}

impl SimulatedAdt7410 {
    pub fn new(ticks: i16) -> Self {
        let sim = Self {
            registers: Arc::new(Mutex::new([0; 0x30])),
        };
        sim.registers.lock()[usize::from(REG_ID)] = 0xCB;
        sim.set_ticks(ticks);
        sim
    }

    pub fn set_ticks(&self, ticks: i16) {
        let (msb, lsb) = encode_temperature_bytes(ticks);
        let mut regs = self.registers.lock();
        regs[usize::from(REG_TEMP_MSB)] = msb;
        regs[usize::from(REG_TEMP_LSB)] = lsb;
    }

    pub fn set_ready(&self, ready: bool) {
        self.registers.lock()[usize::from(REG_STATUS)] = if ready { 0x00 } else { 0x80 };
    }

    pub fn config(&self) -> u8 {
        self.registers.lock()[usize::from(REG_CONFIG)]
    }
}

impl RegisterBus for SimulatedAdt7410 {
    async fn read_register(&mut self, register: u8) -> Result<u8, TransportError> {
        self.registers
            .lock()
            .get(usize::from(register))
            .copied()
            .ok_or(TransportError::NoData)
    }

    async fn write_register(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
        let mut regs = self.registers.lock();
        let slot = regs
            .get_mut(usize::from(register))
            .ok_or(TransportError::NoData)?;
        *slot = value;
        Ok(())
    }
}

/// Digital input whose level the test controls.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPin {
    levels: Arc<Mutex<VecDeque<bool>>>,
}

impl SimulatedPin {
    pub fn new(level: bool) -> Self {
        Self {
            levels: Arc::new(Mutex::new(VecDeque::from([level]))),
        }
    }

    /// Queues levels returned by successive reads; the last one sticks.
    pub fn script(&self, levels: &[bool]) {
        let mut queue = self.levels.lock();
        queue.clear();
        queue.extend(levels);
    }
}

impl DigitalInput for SimulatedPin {
    async fn read_level(&mut self) -> Result<bool, TransportError> {
        let mut queue = self.levels.lock();
        let level = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().copied()
        };
        level.ok_or(TransportError::NoData)
    }
}

pub fn temp_file(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{prefix}-{}", uuid::Uuid::new_v4()))
}

/// Decodes one field of an `application/x-www-form-urlencoded` body.
pub fn form_field(request: &Request, name: &str) -> Option<String> {
    let body = String::from_utf8_lossy(&request.body);
    body.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (decode_component(key) == name).then(|| decode_component(value))
    })
}

fn decode_component(text: &str) -> String {
    urlencoding::decode(&text.replace('+', " "))
        .unwrap()
        .into_owned()
}

/// Parses the `args` field into its two traces.
pub fn traces(request: &Request) -> serde_json::Value {
    serde_json::from_str(&form_field(request, "args").unwrap()).unwrap()
}
