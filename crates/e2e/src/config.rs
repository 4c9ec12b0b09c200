//! Suite configuration loaded once at suite start

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::error::ConfigError;

/// Browser engine the suite drives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Edge,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Edge => "edge",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            // "chrome" kept for configs written against the old suite
            "chromium" | "chrome" => Some(BrowserKind::Chromium),
            "firefox" => Some(BrowserKind::Firefox),
            "edge" => Some(BrowserKind::Edge),
            _ => None,
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable per-run configuration.
///
/// Loaded once at suite start from a flat `key=value` properties file and
/// shared read-only across test workers. A missing file is not an error:
/// every key has a documented default.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Browser engine to provision (`browser`)
    pub browser: BrowserKind,

    /// Run local-launch browsers headless (`headless`)
    pub headless: bool,

    /// Implicit element-lookup wait applied to every session (`implicit.wait`)
    pub implicit_wait: Duration,

    /// Page load timeout applied to every session (`page.load.timeout`)
    pub page_load_timeout: Duration,

    /// Attach to an externally managed browser instead of launching one
    /// (`devin.browser.enabled`)
    pub remote_attach: bool,

    /// Discovery service that hands out remote debugging ports
    /// (`devin.browser.service.url`)
    pub discovery_url: String,

    /// Bound on one discovery call (`discovery.timeout`)
    pub discovery_timeout: Duration,

    /// Bound on session startup (`provision.timeout`)
    pub provision_timeout: Duration,

    /// Application under test (`base.url`)
    pub base_url: String,

    /// WebDriver server endpoint (`webdriver.url`)
    pub webdriver_url: String,

    /// Viewport for local-launch sessions (`viewport.width` / `viewport.height`)
    pub viewport: (u32, u32),

    /// Directory for failure screenshots (`artifact.dir`)
    pub artifact_dir: PathBuf,

    /// Path of the final JSON aggregate (`report.path`)
    pub report_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chromium,
            headless: false,
            implicit_wait: Duration::from_secs(5),
            page_load_timeout: Duration::from_secs(15),
            remote_attach: false,
            discovery_url: "http://localhost:3000/browser/start_browser".to_string(),
            discovery_timeout: Duration::from_secs(10),
            provision_timeout: Duration::from_secs(30),
            base_url: "http://localhost:8080".to_string(),
            webdriver_url: "http://localhost:4444".to_string(),
            viewport: (1920, 1080),
            artifact_dir: PathBuf::from("test-results/screenshots"),
            report_path: PathBuf::from("test-results/report.json"),
        }
    }
}

impl SessionConfig {
    /// Load configuration from a properties file.
    ///
    /// A missing file yields the defaults; only an unreadable file or a
    /// value that does not parse into its expected type is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_properties(&text)
    }

    /// Parse configuration from in-memory properties text.
    pub fn from_properties(text: &str) -> Result<Self, ConfigError> {
        let props = parse_properties(text);
        let mut config = Self::default();

        if let Some(value) = props.get("browser") {
            config.browser = BrowserKind::parse(value).ok_or_else(|| ConfigError::invalid(
                "browser",
                value,
                "one of chromium, firefox, edge",
            ))?;
        }
        if let Some(value) = props.get("headless") {
            config.headless = parse_bool("headless", value)?;
        }
        if let Some(value) = props.get("implicit.wait") {
            config.implicit_wait = parse_secs("implicit.wait", value)?;
        }
        if let Some(value) = props.get("page.load.timeout") {
            config.page_load_timeout = parse_secs("page.load.timeout", value)?;
        }
        if let Some(value) = props.get("devin.browser.enabled") {
            config.remote_attach = parse_bool("devin.browser.enabled", value)?;
        }
        if let Some(value) = props.get("devin.browser.service.url") {
            config.discovery_url = value.clone();
        }
        if let Some(value) = props.get("discovery.timeout") {
            config.discovery_timeout = parse_secs("discovery.timeout", value)?;
        }
        if let Some(value) = props.get("provision.timeout") {
            config.provision_timeout = parse_secs("provision.timeout", value)?;
        }
        if let Some(value) = props.get("base.url") {
            config.base_url = value.clone();
        }
        if let Some(value) = props.get("webdriver.url") {
            config.webdriver_url = value.clone();
        }
        if let Some(value) = props.get("viewport.width") {
            config.viewport.0 = parse_u32("viewport.width", value)?;
        }
        if let Some(value) = props.get("viewport.height") {
            config.viewport.1 = parse_u32("viewport.height", value)?;
        }
        if let Some(value) = props.get("artifact.dir") {
            config.artifact_dir = PathBuf::from(value);
        }
        if let Some(value) = props.get("report.path") {
            config.report_path = PathBuf::from(value);
        }

        Ok(config)
    }
}

/// Flat `key=value` lines; `#` comments and blank lines are skipped.
/// Unknown keys are kept so callers decide what they care about.
fn parse_properties(text: &str) -> HashMap<String, String> {
    let mut props = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            props.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    props
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::invalid(key, value, "true or false")),
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::invalid(key, value, "whole seconds"))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::invalid(key, value, "a positive integer"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::load(dir.path().join("nope.properties")).unwrap();
        assert_eq!(config.browser, BrowserKind::Chromium);
        assert!(!config.headless);
        assert_eq!(config.implicit_wait, Duration::from_secs(5));
        assert_eq!(config.page_load_timeout, Duration::from_secs(15));
        assert!(!config.remote_attach);
    }

    #[test]
    fn parses_known_keys() {
        let config = SessionConfig::from_properties(
            r#"
# suite config
browser = firefox
headless = true
implicit.wait = 8
page.load.timeout = 30
devin.browser.enabled = true
devin.browser.service.url = http://127.0.0.1:9999/browser/start_browser
base.url = http://127.0.0.1:8080
viewport.width = 1600
"#,
        )
        .unwrap();

        assert_eq!(config.browser, BrowserKind::Firefox);
        assert!(config.headless);
        assert_eq!(config.implicit_wait, Duration::from_secs(8));
        assert_eq!(config.page_load_timeout, Duration::from_secs(30));
        assert!(config.remote_attach);
        assert_eq!(
            config.discovery_url,
            "http://127.0.0.1:9999/browser/start_browser"
        );
        assert_eq!(config.viewport, (1600, 1080));
    }

    #[test]
    fn chrome_is_accepted_as_chromium() {
        let config = SessionConfig::from_properties("browser=chrome").unwrap();
        assert_eq!(config.browser, BrowserKind::Chromium);
    }

    #[test]
    fn bad_timeout_names_the_key() {
        let err = SessionConfig::from_properties("implicit.wait = soon").unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "implicit.wait");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_browser_is_rejected() {
        let err = SessionConfig::from_properties("browser=safari").unwrap_err();
        assert!(err.to_string().contains("browser"));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let config = SessionConfig::from_properties("report.theme=dark").unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
    }
}
