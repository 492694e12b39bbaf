// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Digital input carrying the thermostat call signal.
//!
//! The monitor samples the level through [`DigitalInput`]. Edge
//! notifications come from an [`EdgeWatcher`], which samples the same input
//! on its own task and reports debounced transitions over a channel.
//!
//! # Inputs
//!
//! - [`SysfsPin`]: a GPIO line under `/sys/class/gpio`
//! - [`HalInputPin`]: any [`embedded_hal::digital::InputPin`]

mod edge;

pub use edge::{Debouncer, EdgeEvent, EdgeWatcher};

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use embedded_hal::digital::{Error as _, InputPin};
use tokio::sync::Mutex;

use crate::error::TransportError;

/// A readable digital level.
pub trait DigitalInput {
    /// Returns `true` when the input is high.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the level cannot be read.
    fn read_level(&mut self) -> impl Future<Output = Result<bool, TransportError>> + Send;
}

impl<P: DigitalInput + Send + ?Sized> DigitalInput for &mut P {
    async fn read_level(&mut self) -> Result<bool, TransportError> {
        (**self).read_level().await
    }
}

/// Shares one input between the monitor and the edge watcher.
impl<P: DigitalInput + Send + ?Sized> DigitalInput for Arc<Mutex<P>> {
    async fn read_level(&mut self) -> Result<bool, TransportError> {
        self.lock().await.read_level().await
    }
}

// ============================================================================
// SysfsPin
// ============================================================================

/// GPIO line exposed through the Linux sysfs interface.
///
/// Opening a line that is not exported yet exports it and sets it as an
/// input; [`SysfsPin::release`] unexports it again. Bias (pull-up) cannot
/// be configured through sysfs and must come from the board or device tree.
///
/// Clones read the same line. Only call [`SysfsPin::release`] once.
#[derive(Debug, Clone)]
pub struct SysfsPin {
    root: PathBuf,
    line: u32,
    exported_here: bool,
}

impl SysfsPin {
    /// Default sysfs GPIO directory.
    pub const DEFAULT_ROOT: &'static str = "/sys/class/gpio";

    /// Opens GPIO `line` under [`Self::DEFAULT_ROOT`].
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Io` if the line cannot be exported or
    /// configured.
    pub fn open(line: u32) -> Result<Self, TransportError> {
        Self::open_at(Self::DEFAULT_ROOT, line)
    }

    /// Opens GPIO `line` under a custom sysfs root.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Io` if the line cannot be exported or
    /// configured. A line exported by this call is unexported again before
    /// the error is returned.
    pub fn open_at(root: impl AsRef<Path>, line: u32) -> Result<Self, TransportError> {
        let root = root.as_ref().to_path_buf();
        let dir = root.join(format!("gpio{line}"));

        let exported_here = if dir.exists() {
            false
        } else {
            fs::write(root.join("export"), line.to_string())?;
            tracing::debug!(line, "Exported GPIO line");
            true
        };

        // The kernel creates the line directory on export.
        let direction = dir.join("direction");
        if (exported_here || direction.exists())
            && let Err(e) = fs::write(&direction, "in")
        {
            if exported_here
                && let Err(unexport) = fs::write(root.join("unexport"), line.to_string())
            {
                tracing::warn!(line, error = %unexport, "Failed to unexport GPIO line");
            }
            return Err(e.into());
        }

        Ok(Self {
            root,
            line,
            exported_here,
        })
    }

    /// Returns the GPIO line number.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    fn value_path(&self) -> PathBuf {
        self.root.join(format!("gpio{}", self.line)).join("value")
    }

    /// Unexports the line if this process exported it.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Io` if the unexport write fails.
    pub fn release(self) -> Result<(), TransportError> {
        if self.exported_here {
            fs::write(self.root.join("unexport"), self.line.to_string())?;
            tracing::debug!(line = self.line, "Unexported GPIO line");
        }
        Ok(())
    }
}

impl DigitalInput for SysfsPin {
    async fn read_level(&mut self) -> Result<bool, TransportError> {
        let raw = tokio::fs::read_to_string(self.value_path()).await?;
        match raw.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            "" => Err(TransportError::NoData),
            other => Err(TransportError::InvalidOutput(other.to_string())),
        }
    }
}

// ============================================================================
// HalInputPin
// ============================================================================

/// Digital input over an `embedded-hal` input pin.
#[derive(Debug)]
pub struct HalInputPin<P> {
    pin: P,
}

impl<P: InputPin> HalInputPin<P> {
    /// Wraps `pin`.
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Releases the underlying pin.
    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: InputPin + Send> DigitalInput for HalInputPin<P> {
    async fn read_level(&mut self) -> Result<bool, TransportError> {
        self.pin
            .is_high()
            .map_err(|e| TransportError::Hal(format!("{:?}", e.kind())))
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use embedded_hal::digital::ErrorType;

    use super::*;

    fn temp_root() -> PathBuf {
        let root = std::env::temp_dir().join(format!("gpio-test-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&root).unwrap();
        root
    }

    #[tokio::test]
    async fn sysfs_reads_existing_line() {
        let root = temp_root();
        let dir = root.join("gpio17");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("value"), "1\n").unwrap();
        fs::write(dir.join("direction"), "out\n").unwrap();

        let mut pin = SysfsPin::open_at(&root, 17).unwrap();
        assert!(pin.read_level().await.unwrap());
        assert_eq!(fs::read_to_string(dir.join("direction")).unwrap(), "in");

        fs::write(dir.join("value"), "0\n").unwrap();
        assert!(!pin.read_level().await.unwrap());

        pin.release().unwrap();
        assert!(!root.join("unexport").exists());
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn release_unexports_line_exported_here() {
        let root = temp_root();
        let pin = SysfsPin {
            root: root.clone(),
            line: 27,
            exported_here: true,
        };

        pin.release().unwrap();
        assert_eq!(fs::read_to_string(root.join("unexport")).unwrap(), "27");
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn failed_configuration_unexports_line_exported_here() {
        // No gpio27 directory appears after the export write, so setting
        // the direction fails.
        let root = temp_root();

        let result = SysfsPin::open_at(&root, 27);

        assert!(matches!(result, Err(TransportError::Io(_))));
        assert_eq!(fs::read_to_string(root.join("export")).unwrap(), "27");
        assert_eq!(fs::read_to_string(root.join("unexport")).unwrap(), "27");
        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn sysfs_rejects_garbage_value() {
        let root = temp_root();
        let dir = root.join("gpio4");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("value"), "x\n").unwrap();

        let mut pin = SysfsPin::open_at(&root, 4).unwrap();
        assert!(matches!(
            pin.read_level().await,
            Err(TransportError::InvalidOutput(_))
        ));
        fs::remove_dir_all(&root).unwrap();
    }

    struct StaticPin(bool);

    impl ErrorType for StaticPin {
        type Error = Infallible;
    }

    impl InputPin for StaticPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.0)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.0)
        }
    }

    #[tokio::test]
    async fn hal_pin_reads_level() {
        let mut pin = HalInputPin::new(StaticPin(true));
        assert!(pin.read_level().await.unwrap());
        let mut pin = HalInputPin::new(StaticPin(false));
        assert!(!pin.read_level().await.unwrap());
    }

    #[tokio::test]
    async fn shared_pin_reads_through_lock() {
        let mut shared = Arc::new(Mutex::new(HalInputPin::new(StaticPin(true))));
        let mut other = Arc::clone(&shared);
        assert!(shared.read_level().await.unwrap());
        assert!(other.read_level().await.unwrap());
    }
}
