//! Client for the external browser discovery service
//!
//! Remote-attach mode does not launch a browser; it asks a small HTTP
//! service for the remote-debugging port of a browser that service owns.
//! One POST per call, no caching: every discovery call may start a fresh
//! externally managed instance.

use std::fmt;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::error::DiscoveryError;

/// Connectable debugging endpoint returned by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// HTTP client for the discovery protocol.
pub struct RemoteBrowserClient {
    http: reqwest::Client,
    url: String,
}

impl RemoteBrowserClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Ask the service to start (or return) a debuggable browser and yield
    /// its endpoint. Blocks on network I/O bounded by `timeout`; a service
    /// that never answers surfaces as `DiscoveryError::Timeout` rather
    /// than hanging the caller. Retry policy belongs to the caller.
    pub async fn discover(&self, timeout: Duration) -> Result<Endpoint, DiscoveryError> {
        debug!("requesting browser endpoint from {}", self.url);

        let response = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(r#"{"frpConfig": null}"#)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| self.map_transport(e, timeout))?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(DiscoveryError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport(e, timeout))?;

        // The service may attach extra metadata; only the port is
        // contractual, and it must be a connectable TCP port. A present
        // but non-numeric or out-of-range value is as unusable as an
        // absent one.
        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| DiscoveryError::Decode(e.to_string()))?;
        let port = value
            .get("port")
            .and_then(serde_json::Value::as_u64)
            .and_then(|port| u16::try_from(port).ok())
            .filter(|port| *port != 0)
            .ok_or(DiscoveryError::MissingPort { body })?;

        let endpoint = Endpoint {
            host: "127.0.0.1".to_string(),
            port,
        };
        debug!("discovery service returned endpoint {}", endpoint);
        Ok(endpoint)
    }

    fn map_transport(&self, error: reqwest::Error, timeout: Duration) -> DiscoveryError {
        if error.is_timeout() {
            DiscoveryError::Timeout {
                url: self.url.clone(),
                timeout,
            }
        } else {
            DiscoveryError::Network {
                url: self.url.clone(),
                message: error.to_string(),
            }
        }
    }
}
