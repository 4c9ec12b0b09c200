//! Error types for the E2E harness
//!
//! Each failure domain carries its own enum so callers can tell a fatal
//! suite-start problem from a single-test provisioning failure or a
//! non-fatal capture problem. `HarnessError` aggregates them at the
//! lifecycle boundary.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::config::BrowserKind;

/// Bad value for a known configuration key. Fatal to suite start.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value `{value}` for config key `{key}` (expected {expected})")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: &str, expected: &'static str) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected,
        }
    }
}

/// Failure talking to the remote browser discovery service.
/// Fatal to that test's provisioning, never to the suite.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("discovery request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("discovery request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("discovery service returned HTTP {status}")]
    Status { status: u16 },

    #[error("discovery response is not valid JSON: {0}")]
    Decode(String),

    #[error("discovery response has no usable `port` field: {body}")]
    MissingPort { body: String },
}

/// Failure on the WebDriver wire while a session is (or is being made) live.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("webdriver transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webdriver command `{command}` failed: {message}")]
    Command { command: String, message: String },

    #[error("webdriver response could not be decoded: {0}")]
    Decode(String),
}

/// Failure to produce a ready-to-use browser session. Fails the one test
/// that asked for it; provisioning never retries on its own.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("browser discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("webdriver endpoint {url} is unavailable: {message}")]
    DriverUnavailable { url: String, message: String },

    #[error("{browser} cannot be used in remote-attach mode (remote debugging is chromium-only)")]
    UnsupportedBrowser { browser: BrowserKind },

    #[error("session startup timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("session setup failed: {0}")]
    Session(#[from] SessionError),
}

/// Failure to capture a diagnostic artifact. Non-fatal: logged, and the
/// outcome is recorded without an artifact.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("screenshot failed: {0}")]
    Screenshot(#[source] SessionError),

    #[error("failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failure in the outcome log or while writing the aggregate report.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("outcome log was already flushed")]
    AlreadyFlushed,

    #[error("failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level harness error, surfaced from suite start and suite end.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    #[error("report error: {0}")]
    Report(#[from] ReportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
