// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Background upload task.
//!
//! The monitor hands readings to a [`PublisherHandle`] without waiting. A
//! single task drains the queue, interpolates, and uploads with retries, so
//! a slow or unreachable chart service never delays the local log.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::PublishError;
use crate::types::Reading;

use super::chart::ChartClient;
use super::interpolate::{ChartPoint, Interpolator};
use super::retry::RetryPolicy;

/// Default number of readings waiting for upload.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Uploads readings to the chart.
#[derive(Debug)]
pub struct Publisher {
    client: ChartClient,
    policy: RetryPolicy,
    interpolator: Interpolator,
}

impl Publisher {
    /// Creates a publisher with no reading history.
    #[must_use]
    pub fn new(client: ChartClient, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            interpolator: Interpolator::new(),
        }
    }

    /// Uploads `points` under the retry policy and returns the chart URL.
    ///
    /// # Errors
    ///
    /// Returns a non-retryable `PublishError` as soon as it occurs, or
    /// `PublishError::RetriesExhausted` once the budget is spent.
    pub async fn publish(&self, points: &[ChartPoint]) -> Result<String, PublishError> {
        let client = &self.client;
        self.policy
            .run(move |attempt| {
                tracing::debug!(attempt, points = points.len(), "Uploading chart segment");
                client.append(points)
            })
            .await
    }

    /// Interpolates `reading` against the previous one and uploads the
    /// resulting segment.
    ///
    /// The previous state is updated before the upload, whatever its
    /// outcome.
    ///
    /// # Errors
    ///
    /// See [`Publisher::publish`].
    pub async fn submit(&mut self, reading: &Reading) -> Result<String, PublishError> {
        let segment = self.interpolator.segment(reading);
        self.publish(&segment).await
    }
}

/// Sending side of the upload queue.
#[derive(Debug, Clone)]
pub struct PublisherHandle {
    tx: mpsc::Sender<Reading>,
}

impl PublisherHandle {
    /// Creates a detached queue; the caller owns the receiving end.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Reading>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Queues `reading` for upload without waiting.
    ///
    /// Returns `false` if the reading was dropped because the queue is full
    /// or the upload task has stopped.
    pub fn offer(&self, reading: Reading) -> bool {
        match self.tx.try_send(reading) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Upload queue full, reading kept in log only");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("Upload task stopped, reading kept in log only");
                false
            }
        }
    }
}

/// Spawns the upload task.
///
/// The task ends when every handle is dropped or `shutdown` becomes `true`.
/// Shutdown also abandons an upload that is waiting out a backoff.
pub fn spawn_publisher(
    publisher: Publisher,
    capacity: usize,
    shutdown: watch::Receiver<bool>,
) -> (PublisherHandle, JoinHandle<()>) {
    let (handle, rx) = PublisherHandle::channel(capacity);
    let task = tokio::spawn(run_publisher(publisher, rx, shutdown));
    (handle, task)
}

async fn run_publisher(
    mut publisher: Publisher,
    mut rx: mpsc::Receiver<Reading>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::debug!(chart = %publisher.client.config().chart_name(), "Upload task started");

    loop {
        let reading = tokio::select! {
            biased;
            () = shutdown_requested(&mut shutdown) => break,
            reading = rx.recv() => match reading {
                Some(reading) => reading,
                None => break,
            },
        };

        tokio::select! {
            biased;
            () = shutdown_requested(&mut shutdown) => {
                tracing::info!("Shutdown requested, abandoning pending upload");
                break;
            }
            result = publisher.submit(&reading) => match result {
                Ok(url) => tracing::info!(url = %url, "Chart updated"),
                Err(e) => tracing::warn!(error = %e, "Chart update failed, reading dropped from upload"),
            },
        }
    }

    tracing::debug!("Upload task stopped");
}

/// Resolves once `shutdown` is `true` or its sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
