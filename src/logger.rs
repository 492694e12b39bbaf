// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Append-only CSV log of readings.
//!
//! Each line is `timestamp,state,temperature`:
//!
//! ```text
//! 2024-01-15 14:03:07.123456,1,68.5375
//! 2024-01-15 14:08:07.124001,0,
//! ```
//!
//! State is `1` for ON and `0` for OFF. The temperature has four decimals
//! and is left empty when the sensor could not be read.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::PersistenceError;
use crate::types::Reading;

/// Formats one log line, including the trailing newline.
#[must_use]
pub fn format_line(reading: &Reading) -> String {
    let temperature = reading
        .temperature()
        .map(|t| format!("{t:.4}"))
        .unwrap_or_default();
    format!(
        "{},{},{}\n",
        reading.formatted_timestamp(),
        reading.hvac_state().as_num(),
        temperature
    )
}

/// The durable reading log.
///
/// The file is opened once in append mode and kept open. Each line goes out
/// in a single write under a lock and is flushed before [`ReadingLog::append`]
/// returns, so concurrent appends never interleave inside a line.
#[derive(Debug)]
pub struct ReadingLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ReadingLog {
    /// Opens `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Open` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| PersistenceError::Open {
                path: path.clone(),
                source,
            })?;

        tracing::info!(path = %path.display(), "Opened reading log");

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Returns the log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one reading.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Write` if the write or flush fails. The
    /// line is not retried.
    pub fn append(&self, reading: &Reading) -> Result<(), PersistenceError> {
        let line = format_line(reading);
        let mut file = self.file.lock();
        file.write_all(line.as_bytes())?;
        file.flush()?;
        tracing::trace!(line = line.trim_end(), "Appended log line");
        Ok(())
    }

    /// Syncs the file to disk and closes it.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Write` if the sync fails.
    pub fn close(self) -> Result<(), PersistenceError> {
        let file = self.file.into_inner();
        file.sync_all()?;
        tracing::debug!(path = %self.path.display(), "Closed reading log");
        Ok(())
    }
}
