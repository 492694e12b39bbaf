// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Startup configuration.
//!
//! Loaded once from a JSON file and never changed afterwards:
//!
//! ```json
//! {
//!     "i2c_bus": 1,
//!     "i2c_addr": "0x48",
//!     "adt7410_mode": 0,
//!     "hcpl3700": 17,
//!     "nap": 300,
//!     "upload_graph": true,
//!     "plotly_userid": "someone",
//!     "plotly_apikey": "secret"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::publish::ChartConfig;
use crate::sensor::{AcquisitionMode, HipiI2cBus};
use crate::types::InputPolarity;

/// Monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonitorConfig {
    // --- Sensor ---
    /// Bus identifier passed to the bus helper.
    pub i2c_bus: u8,
    /// 7-bit sensor address. Accepts a hex string (`"0x48"` or `"48"`) or an
    /// integer.
    #[serde(deserialize_with = "deserialize_address")]
    pub i2c_addr: u8,
    /// 0 for continuous conversion, anything else for one-shot.
    pub adt7410_mode: i64,
    /// Bus helper executable.
    #[serde(default = "default_hipi_i2c")]
    pub hipi_i2c: PathBuf,

    // --- Input ---
    /// GPIO line wired to the optocoupler output.
    #[serde(alias = "HCPL3700")]
    pub hcpl3700: u32,
    /// Whether a low level means the thermostat is calling.
    #[serde(default = "default_active_low")]
    pub active_low: bool,

    // --- Timing and storage ---
    /// Seconds between periodic readings.
    pub nap: u64,
    /// Reading log path.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    // --- Upload ---
    /// Whether readings are uploaded to the chart.
    pub upload_graph: bool,
    /// Chart service user name.
    #[serde(default)]
    pub plotly_userid: Option<String>,
    /// Chart service API key.
    #[serde(default)]
    pub plotly_apikey: Option<String>,
    /// Chart name.
    #[serde(default = "default_chart_name")]
    pub chart_name: String,
    /// Upload endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_hipi_i2c() -> PathBuf {
    PathBuf::from(HipiI2cBus::DEFAULT_PROGRAM)
}

fn default_active_low() -> bool {
    true
}

fn default_log_file() -> PathBuf {
    PathBuf::from(MonitorConfig::DEFAULT_LOG_FILE)
}

fn default_chart_name() -> String {
    ChartConfig::DEFAULT_CHART_NAME.to_string()
}

fn default_endpoint() -> String {
    ChartConfig::DEFAULT_ENDPOINT.to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAddress {
    Int(u64),
    Text(String),
}

/// Parses an address written in hex, with or without a `0x` prefix.
fn parse_hex_address(text: &str) -> Result<u64, String> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u64::from_str_radix(digits, 16).map_err(|_| format!("i2c_addr {text:?} is not a hex number"))
}

fn deserialize_address<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match RawAddress::deserialize(deserializer)? {
        RawAddress::Int(value) => value,
        RawAddress::Text(text) => parse_hex_address(&text).map_err(de::Error::custom)?,
    };

    u8::try_from(value)
        .ok()
        .filter(|addr| *addr <= 0x7F)
        .ok_or_else(|| de::Error::custom(format!("i2c_addr {value:#x} is not a 7-bit address")))
}

impl MonitorConfig {
    /// Configuration file read when none is given.
    pub const DEFAULT_PATH: &'static str = "thermostat_monitor.json";

    /// Reading log written when none is configured.
    pub const DEFAULT_LOG_FILE: &'static str = "thermostat.log";

    /// Loads and validates the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read, and the
    /// errors of [`MonitorConfig::from_json`] otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_json(&contents)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parses and validates a configuration document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON, a missing key or an
    /// out-of-range address, and the errors of [`MonitorConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `nap` is zero and
    /// `ConfigError::MissingCredentials` if upload is enabled without both
    /// credentials.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nap == 0 {
            return Err(ConfigError::InvalidValue {
                key: "nap",
                message: "must be at least one second".to_string(),
            });
        }

        if self.upload_graph && self.credentials().is_none() {
            return Err(ConfigError::MissingCredentials);
        }

        Ok(())
    }

    /// Interval between periodic readings.
    #[must_use]
    pub fn nap(&self) -> Duration {
        Duration::from_secs(self.nap)
    }

    /// Input polarity.
    #[must_use]
    pub fn polarity(&self) -> InputPolarity {
        InputPolarity::from_active_low(self.active_low)
    }

    /// Sensor acquisition mode.
    #[must_use]
    pub fn acquisition_mode(&self) -> AcquisitionMode {
        AcquisitionMode::from_config(self.adt7410_mode)
    }

    /// Chart credentials, if both are set and non-empty.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let user = self.plotly_userid.as_deref().filter(|s| !s.is_empty())?;
        let key = self.plotly_apikey.as_deref().filter(|s| !s.is_empty())?;
        Some((user, key))
    }

    /// Bus transport for the sensor.
    #[must_use]
    pub fn bus(&self) -> HipiI2cBus {
        HipiI2cBus::new(self.i2c_bus, self.i2c_addr).with_program(&self.hipi_i2c)
    }

    /// Chart settings, when upload is enabled.
    #[must_use]
    pub fn chart_config(&self) -> Option<ChartConfig> {
        if !self.upload_graph {
            return None;
        }
        let (user, key) = self.credentials()?;
        Some(
            ChartConfig::new(user, key)
                .with_endpoint(&self.endpoint)
                .with_chart_name(&self.chart_name),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "i2c_bus": 1,
        "i2c_addr": "0x48",
        "adt7410_mode": 0,
        "hcpl3700": 17,
        "nap": 300,
        "upload_graph": false
    }"#;

    fn with(key: &str, value: &str) -> String {
        let mut doc: serde_json::Value = serde_json::from_str(MINIMAL).unwrap();
        doc[key] = serde_json::from_str(value).unwrap();
        doc.to_string()
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = MonitorConfig::from_json(MINIMAL).unwrap();

        assert_eq!(config.i2c_bus, 1);
        assert_eq!(config.i2c_addr, 0x48);
        assert_eq!(config.hcpl3700, 17);
        assert_eq!(config.nap(), Duration::from_secs(300));
        assert_eq!(config.acquisition_mode(), AcquisitionMode::Continuous);
        assert_eq!(config.polarity(), InputPolarity::ActiveLow);
        assert_eq!(config.log_file, PathBuf::from("thermostat.log"));
        assert_eq!(config.chart_name, "thermostat");
        assert_eq!(config.endpoint, "https://plot.ly/clientresp");
        assert_eq!(config.hipi_i2c, PathBuf::from("/usr/local/bin/hipi-i2c"));
        assert!(config.chart_config().is_none());
    }

    #[test]
    fn address_forms() {
        for (raw, expected) in [("\"0x48\"", 0x48), ("\"0X4b\"", 0x4B), ("\"48\"", 0x48), ("72", 72)] {
            let config = MonitorConfig::from_json(&with("i2c_addr", raw)).unwrap();
            assert_eq!(config.i2c_addr, expected, "for {raw}");
        }
    }

    #[test]
    fn address_out_of_range() {
        for raw in ["\"0x80\"", "\"0x1FF\"", "300"] {
            let result = MonitorConfig::from_json(&with("i2c_addr", raw));
            assert!(matches!(result, Err(ConfigError::Parse(_))), "for {raw}");
        }
    }

    #[test]
    fn address_not_hex() {
        let result = MonitorConfig::from_json(&with("i2c_addr", "\"forty\""));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn one_shot_mode() {
        let config = MonitorConfig::from_json(&with("adt7410_mode", "1")).unwrap();
        assert_eq!(config.acquisition_mode(), AcquisitionMode::OneShot);
    }

    #[test]
    fn upper_case_pin_key_is_accepted() {
        let json = MINIMAL.replace("hcpl3700", "HCPL3700");
        let config = MonitorConfig::from_json(&json).unwrap();
        assert_eq!(config.hcpl3700, 17);
    }

    #[test]
    fn zero_nap_is_rejected() {
        match MonitorConfig::from_json(&with("nap", "0")) {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "nap"),
            other => panic!("expected invalid nap, got {other:?}"),
        }
    }

    #[test]
    fn missing_key_is_rejected() {
        let json = MINIMAL.replace("\"nap\": 300,", "");
        assert!(matches!(
            MonitorConfig::from_json(&json),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn upload_requires_credentials() {
        let json = with("upload_graph", "true");
        assert!(matches!(
            MonitorConfig::from_json(&json),
            Err(ConfigError::MissingCredentials)
        ));

        let mut doc: serde_json::Value = serde_json::from_str(&json).unwrap();
        doc["plotly_userid"] = "someone".into();
        doc["plotly_apikey"] = "".into();
        assert!(matches!(
            MonitorConfig::from_json(&doc.to_string()),
            Err(ConfigError::MissingCredentials)
        ));
    }

    #[test]
    fn upload_with_credentials_builds_chart_config() {
        let mut doc: serde_json::Value = serde_json::from_str(MINIMAL).unwrap();
        doc["upload_graph"] = true.into();
        doc["plotly_userid"] = "someone".into();
        doc["plotly_apikey"] = "secret".into();
        doc["chart_name"] = "upstairs".into();

        let config = MonitorConfig::from_json(&doc.to_string()).unwrap();
        let chart = config.chart_config().unwrap();

        assert_eq!(chart.chart_name(), "upstairs");
        assert_eq!(chart.endpoint(), ChartConfig::DEFAULT_ENDPOINT);
    }

    #[test]
    fn bus_uses_configured_helper() {
        let config = MonitorConfig::from_json(&with("hipi_i2c", "\"/opt/hipi-i2c\"")).unwrap();
        let bus = config.bus();
        assert_eq!(bus.program(), Path::new("/opt/hipi-i2c"));
        assert_eq!(bus.bus(), 1);
        assert_eq!(bus.address(), 0x48);
    }

    #[test]
    fn missing_file_is_read_error() {
        let path = std::env::temp_dir().join(format!("absent-{}.json", uuid::Uuid::new_v4()));
        match MonitorConfig::load(&path) {
            Err(ConfigError::Read { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected read error, got {other:?}"),
        }
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!("config-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, MINIMAL).unwrap();

        let config = MonitorConfig::load(&path).unwrap();
        assert_eq!(config.i2c_addr, 0x48);

        fs::remove_file(&path).unwrap();
    }
}
