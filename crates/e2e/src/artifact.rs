//! Failure screenshot capture

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::debug;

use crate::error::CaptureError;
use crate::session::BrowserSession;

/// Persists diagnostic screenshots for failing tests.
pub struct ArtifactCapture {
    dir: PathBuf,
}

impl ArtifactCapture {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Pull a screenshot from the still-live session and write it to
    /// `{dir}/{label}_{yyyyMMdd_HHmmss}.png`. Second-level stamps can
    /// collide when tests fail in the same second, so an existing path
    /// gets a numeric suffix.
    pub async fn capture(
        &self,
        session: &BrowserSession,
        label: &str,
    ) -> Result<PathBuf, CaptureError> {
        let png = session
            .screenshot_png()
            .await
            .map_err(CaptureError::Screenshot)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let mut path = self.dir.join(format!("{label}_{stamp}.png"));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("{label}_{stamp}_{n}.png"));
            n += 1;
        }

        std::fs::write(&path, &png).map_err(|source| CaptureError::Write {
            path: path.clone(),
            source,
        })?;

        debug!("captured {} ({} bytes)", path.display(), png.len());
        Ok(path)
    }
}
