//! W3C WebDriver wire client
//!
//! Concrete `DriverBackend` speaking the WebDriver JSON-over-HTTP protocol
//! against a running driver server (chromedriver, geckodriver,
//! msedgedriver, or a Selenium standalone). Only the commands the harness
//! needs are implemented; page-level interaction lives upstream.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::SessionError;
use crate::session::DriverBackend;

pub struct WebDriverBackend {
    http: reqwest::Client,
    base: String,
    session_id: String,
}

impl WebDriverBackend {
    /// Create a new WebDriver session with the given `alwaysMatch`
    /// capabilities.
    pub async fn new_session(
        webdriver_url: &str,
        capabilities: Value,
    ) -> Result<Self, SessionError> {
        let http = reqwest::Client::new();
        let base = webdriver_url.trim_end_matches('/').to_string();

        let body = json!({ "capabilities": { "alwaysMatch": capabilities } });
        let value = send(&http, &base, Method::POST, "session", Some(body)).await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SessionError::Decode("new session response carries no sessionId".to_string())
            })?
            .to_string();

        debug!("webdriver session {} created at {}", session_id, base);
        Ok(Self {
            http,
            base,
            session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn command(
        &self,
        method: Method,
        suffix: &str,
        body: Option<Value>,
    ) -> Result<Value, SessionError> {
        let path = if suffix.is_empty() {
            format!("session/{}", self.session_id)
        } else {
            format!("session/{}/{}", self.session_id, suffix)
        };
        send(&self.http, &self.base, method, &path, body).await
    }
}

#[async_trait]
impl DriverBackend for WebDriverBackend {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>, SessionError> {
        let value = self.command(Method::GET, "screenshot", None).await?;
        let encoded = value.as_str().ok_or_else(|| {
            SessionError::Decode("screenshot response is not a base64 string".to_string())
        })?;
        BASE64
            .decode(encoded)
            .map_err(|e| SessionError::Decode(format!("screenshot is not valid base64: {e}")))
    }

    async fn set_timeouts(
        &self,
        implicit: Duration,
        page_load: Duration,
    ) -> Result<(), SessionError> {
        let body = json!({
            "implicit": implicit.as_millis() as u64,
            "pageLoad": page_load.as_millis() as u64,
        });
        self.command(Method::POST, "timeouts", Some(body)).await?;
        Ok(())
    }

    async fn set_window_rect(&self, width: u32, height: u32) -> Result<(), SessionError> {
        let body = json!({ "x": 0, "y": 0, "width": width, "height": height });
        self.command(Method::POST, "window/rect", Some(body)).await?;
        Ok(())
    }

    async fn quit(&self) -> Result<(), SessionError> {
        self.command(Method::DELETE, "", None).await?;
        debug!("webdriver session {} deleted", self.session_id);
        Ok(())
    }
}

/// One wire round trip. Every WebDriver response wraps its payload in a
/// `value` field; error responses put `error`/`message` there instead.
async fn send(
    http: &reqwest::Client,
    base: &str,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> Result<Value, SessionError> {
    let url = format!("{base}/{path}");
    let mut request = http.request(method.clone(), &url);
    if let Some(body) = &body {
        request = request.json(body);
    }

    let response = request.send().await?;
    let status = response.status();
    let payload: Value = response
        .json()
        .await
        .map_err(|e| SessionError::Decode(e.to_string()))?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if !status.is_success() {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| value.get("error").and_then(Value::as_str))
            .unwrap_or("unknown webdriver error")
            .to_string();
        return Err(SessionError::Command {
            command: format!("{method} /{path}"),
            message,
        });
    }

    Ok(value)
}
