// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the thermostat monitor.
//!
//! One enum per failure domain. Only [`ConfigError`], and failing to open
//! the log or the input at startup, stop the process; everything else is
//! logged and the monitor carries on.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Bus or digital-input I/O failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The temperature sensor could not produce a reading.
    #[error("sensor error: {0}")]
    Sensor(#[from] SensorError),

    /// Writing the local log failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Uploading to the remote chart failed.
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// Startup configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by the bus and digital-input transports.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The bus helper exited unsuccessfully.
    #[error("bus helper failed with exit code {code:?}: {output}")]
    Command {
        /// Exit code of the helper, if it exited normally.
        code: Option<i32>,
        /// Captured output of the helper.
        output: String,
    },

    /// A read completed but returned no data.
    #[error("no data returned")]
    NoData,

    /// Output from the transport could not be interpreted.
    #[error("unexpected transport output: {0}")]
    InvalidOutput(String),

    /// An `embedded-hal` bus or pin reported an error.
    #[error("hardware error: {0}")]
    Hal(String),

    /// Underlying operating-system I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the temperature sensor driver.
#[derive(Debug, Error)]
pub enum SensorError {
    /// A bus transaction failed.
    #[error("bus failure: {0}")]
    Bus(#[from] TransportError),

    /// The status register reports that no conversion result is available.
    #[error("temperature registers not ready")]
    NotReady,
}

/// Errors raised while writing the local reading log.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The log file could not be opened.
    #[error("cannot open log file {path}: {source}")]
    Open {
        /// Path of the log file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Appending or flushing a line failed.
    #[error("cannot append to log file: {0}")]
    Write(#[from] std::io::Error),
}

/// Errors raised while publishing to the remote chart.
#[derive(Debug, Error)]
pub enum PublishError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("endpoint returned HTTP {status}")]
    Status {
        /// The HTTP status code.
        status: u16,
    },

    /// The endpoint rejected the credentials.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The endpoint accepted the request but reported an error.
    #[error("chart update rejected: {0}")]
    Rejected(String),

    /// Credentials are empty, so no request is attempted.
    #[error("remote credentials are missing")]
    MissingCredentials,

    /// The chart payload could not be encoded.
    #[error("cannot encode chart payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// Nothing was given to publish.
    #[error("no chart points to publish")]
    EmptySegment,

    /// Every attempt allowed by the retry policy failed.
    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The error from the final attempt.
        last: Box<PublishError>,
    },
}

impl PublishError {
    /// Returns true if trying the same request again could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::AuthenticationFailed | Self::Rejected(_)
        )
    }
}

/// Errors raised while loading the startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read configuration file {path}: {source}")]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON or lacks a key.
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is present but out of range.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// The offending key.
        key: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// Upload is enabled but credentials are missing.
    #[error("upload_graph is enabled but plotly_userid/plotly_apikey are not set")]
    MissingCredentials,
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
