// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Best-effort upload of readings to a remote chart.
//!
//! - [`Interpolator`] turns readings into step-shaped [`ChartPoint`] segments
//! - [`ChartClient`] appends a segment with one HTTP request
//! - [`RetryPolicy`] bounds and spaces the attempts
//! - [`Publisher`] ties them together and runs behind a [`PublisherHandle`]
//!
//! Nothing here reports back to the monitor: an upload that fails for good
//! is logged and dropped.

mod chart;
mod interpolate;
mod retry;
mod worker;

pub use chart::{ChartClient, ChartConfig};
pub use interpolate::{ChartPoint, INTERPOLATION_OFFSET, Interpolator};
pub use retry::RetryPolicy;
pub use worker::{DEFAULT_QUEUE_CAPACITY, Publisher, PublisherHandle, spawn_publisher};
