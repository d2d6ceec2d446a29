//! Shared plumbing for the JSON-over-HTTP service clients.
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::NetworkSettings;
use crate::error::{Error, Result};

const MAX_ERROR_BODY: usize = 512;

/// A reqwest client bound to one external service. Transport timeouts become
/// [`Error::Timeout`]; every other failure is wrapped into the service's own
/// error kind by `wrap`.
#[derive(Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    service: &'static str,
    timeout: Duration,
    wrap: fn(String) -> Error,
}

impl ServiceClient {
    pub fn new(service: &'static str, network: &NetworkSettings, wrap: fn(String) -> Error) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(network.timeout())
            .connect_timeout(network.connect_timeout())
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client for {service}: {e}")))?;
        Ok(Self { http, service, timeout: network.timeout(), wrap })
    }

    pub fn http(&self) -> &reqwest::Client { &self.http }

    /// An error of this service's kind.
    pub fn error(&self, message: impl std::fmt::Display) -> Error { (self.wrap)(format!("{}: {}", self.service, message)) }

    /// Send `request` and decode a JSON body, failing on non-2xx statuses.
    pub async fn send_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(|e| self.transport(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport(e))?;
        debug!(service = self.service, %status, bytes = body.len(), "response received");
        if !status.is_success() {
            return Err(self.error(format!("API error {}: {}", status, truncate(&body, MAX_ERROR_BODY))));
        }
        serde_json::from_str(&body).map_err(|e| self.error(format!("malformed response: {e}")))
    }

    fn transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout { service: self.service, after: self.timeout }
        } else {
            self.error(format!("request failed: {err}"))
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
