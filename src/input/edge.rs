// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Debounced edge detection on a polled digital input.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::DigitalInput;

/// A debounced level change on the watched input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    /// Level after the change.
    pub level: bool,
    /// When the change was observed.
    pub at: Instant,
}

/// Suppresses level changes that follow the last accepted change too
/// closely.
///
/// A suppressed change leaves the tracked level untouched, so a level that
/// is still different once the spacing has elapsed is reported then.
#[derive(Debug, Clone)]
pub struct Debouncer {
    level: bool,
    last_accepted: Option<Instant>,
    min_spacing: Duration,
}

impl Debouncer {
    /// Starts tracking from `initial_level`.
    #[must_use]
    pub fn new(initial_level: bool, min_spacing: Duration) -> Self {
        Self {
            level: initial_level,
            last_accepted: None,
            min_spacing,
        }
    }

    /// Returns the last accepted level.
    #[must_use]
    pub fn level(&self) -> bool {
        self.level
    }

    /// Feeds one sample taken at `now`; returns an event if it is an
    /// accepted change.
    pub fn sample(&mut self, level: bool, now: Instant) -> Option<EdgeEvent> {
        if level == self.level {
            return None;
        }

        if let Some(last) = self.last_accepted
            && now.saturating_duration_since(last) < self.min_spacing
        {
            return None;
        }

        self.level = level;
        self.last_accepted = Some(now);
        Some(EdgeEvent { level, at: now })
    }
}

/// Polls an input on its own task and reports debounced edges.
///
/// Events are offered with `try_send`. When the receiver is behind, the
/// event is dropped; the periodic timer still records the level.
#[derive(Debug, Clone)]
pub struct EdgeWatcher {
    poll_interval: Duration,
    debounce: Duration,
}

impl Default for EdgeWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeWatcher {
    /// Minimum spacing between two reported edges.
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

    /// Sampling period.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

    /// Creates a watcher with default timings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            debounce: Self::DEFAULT_DEBOUNCE,
        }
    }

    /// Sets the sampling period.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the debounce spacing.
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Spawns the polling task.
    ///
    /// The task stops when `shutdown` flips to `true` (or its sender is
    /// dropped) or when `events` is closed, and hands the input back.
    pub fn spawn<P>(
        self,
        input: P,
        events: mpsc::Sender<EdgeEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<P>
    where
        P: DigitalInput + Send + 'static,
    {
        tokio::spawn(self.watch(input, events, shutdown))
    }

    async fn watch<P: DigitalInput>(
        self,
        mut input: P,
        events: mpsc::Sender<EdgeEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> P {
        // Edges are only reported relative to a level actually read.
        let mut debouncer = match input.read_level().await {
            Ok(level) => Some(Debouncer::new(level, self.debounce)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read initial input level");
                None
            }
        };

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::debug!(
            initial = ?debouncer.as_ref().map(Debouncer::level),
            debounce = ?self.debounce,
            "Edge watcher started"
        );

        while !*shutdown.borrow() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            let level = match input.read_level().await {
                Ok(level) => level,
                Err(e) => {
                    tracing::trace!(error = %e, "Input sample failed");
                    continue;
                }
            };

            let sampled = match debouncer.as_mut() {
                Some(debouncer) => debouncer.sample(level, Instant::now()),
                None => {
                    tracing::debug!(level, "Initial input level established");
                    debouncer = Some(Debouncer::new(level, self.debounce));
                    continue;
                }
            };
            let Some(event) = sampled else {
                continue;
            };

            tracing::debug!(level, "Input edge");
            match events.try_send(event) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(level, "Edge queue full, dropping edge");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => break,
            }
        }

        tracing::debug!("Edge watcher stopped");
        input
    }
}
