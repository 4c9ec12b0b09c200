//! Live browser session handles
//!
//! A `BrowserSession` is the handle one test drives for its whole run.
//! The actual automation capability sits behind the `DriverBackend` trait
//! so the lifecycle machinery can be exercised with spies.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::BrowserKind;
use crate::error::SessionError;

/// Who owns the underlying browser process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// The harness launched the browser and must quit it on release.
    Local,
    /// The browser belongs to an external service; release drops only the
    /// local reference and leaves the process untouched.
    RemoteAttached,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Local => f.write_str("local"),
            SessionMode::RemoteAttached => f.write_str("remote-attached"),
        }
    }
}

/// The browser-automation surface the harness needs. Navigation and
/// element interaction beyond this belong to the page objects built on
/// top, not to the harness.
#[async_trait]
pub trait DriverBackend: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    /// PNG bytes of the current viewport.
    async fn screenshot_png(&self) -> Result<Vec<u8>, SessionError>;

    async fn set_timeouts(
        &self,
        implicit: Duration,
        page_load: Duration,
    ) -> Result<(), SessionError>;

    async fn set_window_rect(&self, width: u32, height: u32) -> Result<(), SessionError>;

    /// Tear down the underlying browser session.
    async fn quit(&self) -> Result<(), SessionError>;
}

/// Handle to one live browser-automation connection.
///
/// Exactly one session exists per running test; release consumes the
/// handle, so a session cannot be released twice or reused afterwards.
pub struct BrowserSession {
    backend: Box<dyn DriverBackend>,
    kind: BrowserKind,
    mode: SessionMode,
}

impl fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserSession")
            .field("kind", &self.kind)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl BrowserSession {
    pub fn new(backend: Box<dyn DriverBackend>, kind: BrowserKind, mode: SessionMode) -> Self {
        Self {
            backend,
            kind,
            mode,
        }
    }

    pub fn kind(&self) -> BrowserKind {
        self.kind
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.backend.navigate(url).await
    }

    pub async fn screenshot_png(&self) -> Result<Vec<u8>, SessionError> {
        self.backend.screenshot_png().await
    }

    pub async fn apply_timeouts(
        &self,
        implicit: Duration,
        page_load: Duration,
    ) -> Result<(), SessionError> {
        self.backend.set_timeouts(implicit, page_load).await
    }

    pub async fn set_viewport(&self, width: u32, height: u32) -> Result<(), SessionError> {
        self.backend.set_window_rect(width, height).await
    }

    /// Release the session. Mode decides ownership: a local session is
    /// quit; a remote-attached session only drops this handle.
    pub async fn release(self) -> Result<(), SessionError> {
        self.quit_shared().await
    }

    /// Release through a still-shared handle. The handle stays alive but
    /// the session behind it is gone; the lifecycle uses this when a test
    /// body leaked a clone and the local browser still has to go down.
    pub(crate) async fn quit_shared(&self) -> Result<(), SessionError> {
        match self.mode {
            SessionMode::Local => {
                debug!("quitting local {} session", self.kind);
                self.backend.quit().await
            }
            SessionMode::RemoteAttached => {
                debug!("detaching from remote {} session", self.kind);
                Ok(())
            }
        }
    }
}
