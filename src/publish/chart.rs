// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client for the remote chart service.
//!
//! Points are appended to a named, persistent chart through the
//! Plotly-style `clientresp` endpoint: a form POST carrying the credentials,
//! the trace data (`args`) and the chart options (`kwargs`), both as JSON.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::PublishError;
use crate::types::TIMESTAMP_FORMAT;

use super::interpolate::ChartPoint;

// ============================================================================
// ChartConfig
// ============================================================================

/// Connection and presentation settings for the remote chart.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use thermostat_monitor::publish::ChartConfig;
///
/// let config = ChartConfig::new("someone", "api-key")
///     .with_chart_name("upstairs")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.chart_name(), "upstairs");
/// assert_eq!(config.endpoint(), ChartConfig::DEFAULT_ENDPOINT);
/// ```
#[derive(Debug, Clone)]
pub struct ChartConfig {
    endpoint: String,
    username: String,
    api_key: String,
    chart_name: String,
    world_readable: bool,
    timeout: Duration,
}

impl ChartConfig {
    /// Default upload endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://plot.ly/clientresp";
    /// Default chart name.
    pub const DEFAULT_CHART_NAME: &'static str = "thermostat";
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a configuration with the given credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            username: username.into(),
            api_key: api_key.into(),
            chart_name: Self::DEFAULT_CHART_NAME.to_string(),
            world_readable: true,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets the upload endpoint URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the chart name.
    #[must_use]
    pub fn with_chart_name(mut self, name: impl Into<String>) -> Self {
        self.chart_name = name.into();
        self
    }

    /// Sets whether the chart is publicly readable.
    #[must_use]
    pub fn with_world_readable(mut self, world_readable: bool) -> Self {
        self.world_readable = world_readable;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the chart name.
    #[must_use]
    pub fn chart_name(&self) -> &str {
        &self.chart_name
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Creates a [`ChartClient`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns `PublishError::Http` if the HTTP client cannot be created.
    pub fn into_client(self) -> Result<ChartClient, PublishError> {
        let client = Client::builder().timeout(self.timeout).build()?;
        Ok(ChartClient {
            config: self,
            client,
        })
    }
}

// ============================================================================
// Wire payloads
// ============================================================================

#[derive(Debug, Serialize)]
struct Trace<'a, Y> {
    x: &'a [String],
    y: Vec<Y>,
    name: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    yaxis: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct Axis {
    title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<[i32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    overlaying: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    side: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct Layout {
    title: &'static str,
    xaxis: Axis,
    yaxis: Axis,
    yaxis2: Axis,
}

impl Layout {
    fn thermostat() -> Self {
        Self {
            title: "Indoor Temperature and Thermostat Status",
            xaxis: Axis {
                title: "Date and Time",
                range: None,
                overlaying: None,
                side: None,
            },
            yaxis: Axis {
                title: "Thermostat Status",
                range: Some([-1, 2]),
                overlaying: None,
                side: None,
            },
            yaxis2: Axis {
                title: "Indoor Temperature",
                range: Some([55, 85]),
                overlaying: Some("y"),
                side: Some("right"),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Kwargs<'a> {
    filename: &'a str,
    fileopt: &'static str,
    world_readable: bool,
    layout: Layout,
}

/// Body returned by the endpoint.
///
/// Absent, `null` and empty fields are all treated as unset.
#[derive(Debug, Default, Deserialize)]
struct ClientResponse {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warning: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.is_empty())
}

/// Credential pair checked before each upload.
struct SignIn<'a> {
    username: &'a str,
    api_key: &'a str,
}

// ============================================================================
// ChartClient
// ============================================================================

/// Appends points to the configured chart.
///
/// # Examples
///
/// ```no_run
/// use thermostat_monitor::publish::{ChartConfig, Interpolator};
/// use thermostat_monitor::types::{HvacState, Reading};
///
/// # async fn example() -> Result<(), thermostat_monitor::error::PublishError> {
/// let client = ChartConfig::new("someone", "api-key").into_client()?;
/// let points = Interpolator::new().segment(&Reading::now(HvacState::On, Some(68.0)));
/// let url = client.append(&points).await?;
/// println!("chart at {url}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChartClient {
    config: ChartConfig,
    client: Client,
}

impl ChartClient {
    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    fn sign_in(&self) -> Result<SignIn<'_>, PublishError> {
        if self.config.username.is_empty() || self.config.api_key.is_empty() {
            return Err(PublishError::MissingCredentials);
        }
        Ok(SignIn {
            username: &self.config.username,
            api_key: &self.config.api_key,
        })
    }

    fn form(
        &self,
        sign_in: &SignIn<'_>,
        points: &[ChartPoint],
    ) -> Result<Vec<(&'static str, String)>, PublishError> {
        let x: Vec<String> = points
            .iter()
            .map(|p| p.timestamp.format(TIMESTAMP_FORMAT).to_string())
            .collect();

        let status = Trace {
            x: &x,
            y: points.iter().map(|p| p.hvac_state.as_num()).collect(),
            name: "Thermostat Status",
            kind: "scatter",
            yaxis: None,
        };
        let temperature = Trace {
            x: &x,
            y: points.iter().map(|p| p.temperature).collect(),
            name: "Indoor Temperature",
            kind: "scatter",
            yaxis: Some("y2"),
        };

        let args = serde_json::to_string(&(status, temperature))?;
        let kwargs = serde_json::to_string(&Kwargs {
            filename: &self.config.chart_name,
            fileopt: "extend",
            world_readable: self.config.world_readable,
            layout: Layout::thermostat(),
        })?;

        Ok(vec![
            ("un", sign_in.username.to_string()),
            ("key", sign_in.api_key.to_string()),
            ("origin", "plot".to_string()),
            ("platform", "rust".to_string()),
            ("version", env!("CARGO_PKG_VERSION").to_string()),
            ("args", args),
            ("kwargs", kwargs),
        ])
    }

    /// Appends `points` to the chart and returns its URL.
    ///
    /// Signs in on every call. A single request is made; retries belong to
    /// the caller.
    ///
    /// # Errors
    ///
    /// - `PublishError::EmptySegment` if `points` is empty
    /// - `PublishError::MissingCredentials` if a credential is empty
    /// - `PublishError::AuthenticationFailed` on HTTP 401 or 403
    /// - `PublishError::Status` on any other non-success status
    /// - `PublishError::Rejected` if the service reports an error or
    ///   returns no chart URL
    /// - `PublishError::Http` if the request or body decoding fails
    pub async fn append(&self, points: &[ChartPoint]) -> Result<String, PublishError> {
        if points.is_empty() {
            return Err(PublishError::EmptySegment);
        }

        let sign_in = self.sign_in()?;
        let form = self.form(&sign_in, points)?;

        tracing::debug!(
            endpoint = %self.config.endpoint,
            chart = %self.config.chart_name,
            points = points.len(),
            "Appending to chart"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PublishError::AuthenticationFailed);
        }
        if !status.is_success() {
            return Err(PublishError::Status {
                status: status.as_u16(),
            });
        }

        let body: ClientResponse = response.json().await?;

        if let Some(error) = non_empty(body.error) {
            return Err(PublishError::Rejected(error));
        }
        if let Some(warning) = non_empty(body.warning) {
            tracing::warn!(warning = %warning, "Chart service warning");
        }
        if let Some(message) = non_empty(body.message) {
            tracing::debug!(message = %message, "Chart service message");
        }

        non_empty(body.url)
            .ok_or_else(|| PublishError::Rejected("no chart URL in response".to_string()))
    }
}
