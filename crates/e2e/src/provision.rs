//! Session provisioning: local-launch vs remote-attach
//!
//! One acquire call produces one ready-to-use `BrowserSession`. The branch
//! is picked by configuration, never by runtime fallback: a remote-attach
//! request that cannot be discovered fails closed, because the remote
//! browser's lifecycle belongs to whoever asked for remote-attach.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::{BrowserKind, SessionConfig};
use crate::discovery::{Endpoint, RemoteBrowserClient};
use crate::error::{ProvisionError, SessionError};
use crate::session::{BrowserSession, DriverBackend, SessionMode};
use crate::webdriver::WebDriverBackend;

/// Fixed flag set for headless chromium sessions. Downstream tests depend
/// on consistent rendering, so this list is part of the provisioning
/// contract rather than an implementation detail.
pub const HEADLESS_CHROMIUM_ARGS: &[&str] = &[
    "--headless=new",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--window-size=1920,1080",
    "--disable-blink-features=AutomationControlled",
];

/// Viewport applied to remote-attached sessions, matching the managed
/// browser's own configuration.
pub const REMOTE_ATTACH_VIEWPORT: (u32, u32) = (1550, 1122);

/// User agent applied when attaching, matching the managing service's.
pub const REMOTE_ATTACH_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36; \
     Devin/1.0; +devin.ai";

/// Seam between the lifecycle machinery and real provisioning.
#[async_trait]
pub trait Provision: Send + Sync {
    async fn acquire(&self) -> Result<BrowserSession, ProvisionError>;
}

/// Produces browser sessions according to the suite configuration.
pub struct DriverProvisioner {
    config: Arc<SessionConfig>,
    discovery: RemoteBrowserClient,
}

impl DriverProvisioner {
    pub fn new(config: Arc<SessionConfig>) -> Self {
        let discovery = RemoteBrowserClient::new(config.discovery_url.clone());
        Self { config, discovery }
    }

    async fn launch_local(&self) -> Result<BrowserSession, ProvisionError> {
        let capabilities = local_capabilities(self.config.browser, self.config.headless);
        debug!(
            "launching local {} session (headless: {})",
            self.config.browser, self.config.headless
        );

        let backend = self
            .connect(capabilities, self.config.provision_timeout)
            .await?;
        Ok(BrowserSession::new(
            Box::new(backend),
            self.config.browser,
            SessionMode::Local,
        ))
    }

    async fn attach_remote(&self) -> Result<BrowserSession, ProvisionError> {
        if self.config.browser != BrowserKind::Chromium {
            return Err(ProvisionError::UnsupportedBrowser {
                browser: self.config.browser,
            });
        }

        let endpoint = self.discovery.discover(self.config.discovery_timeout).await?;
        info!("attaching to externally managed browser at {}", endpoint);

        let capabilities = remote_capabilities(&endpoint);
        let backend = self
            .connect(capabilities, self.config.provision_timeout)
            .await?;
        backend
            .set_window_rect(REMOTE_ATTACH_VIEWPORT.0, REMOTE_ATTACH_VIEWPORT.1)
            .await
            .map_err(ProvisionError::Session)?;

        Ok(BrowserSession::new(
            Box::new(backend),
            self.config.browser,
            SessionMode::RemoteAttached,
        ))
    }

    /// Session startup is bounded; a driver binary that never answers is a
    /// timeout, a refused connection means no driver is listening at all.
    async fn connect(
        &self,
        capabilities: Value,
        timeout: Duration,
    ) -> Result<WebDriverBackend, ProvisionError> {
        let url = &self.config.webdriver_url;
        let connect = WebDriverBackend::new_session(url, capabilities);

        match tokio::time::timeout(timeout, connect).await {
            Err(_) => Err(ProvisionError::Timeout { timeout }),
            Ok(Err(SessionError::Transport(e))) if e.is_connect() => {
                Err(ProvisionError::DriverUnavailable {
                    url: url.clone(),
                    message: e.to_string(),
                })
            }
            Ok(Err(e)) => Err(ProvisionError::Session(e)),
            Ok(Ok(backend)) => Ok(backend),
        }
    }
}

#[async_trait]
impl Provision for DriverProvisioner {
    async fn acquire(&self) -> Result<BrowserSession, ProvisionError> {
        if self.config.remote_attach {
            self.attach_remote().await
        } else {
            self.launch_local().await
        }
    }
}

/// W3C capabilities for a locally launched browser.
pub(crate) fn local_capabilities(browser: BrowserKind, headless: bool) -> Value {
    match browser {
        BrowserKind::Chromium => {
            let args: Vec<&str> = if headless {
                HEADLESS_CHROMIUM_ARGS.to_vec()
            } else {
                Vec::new()
            };
            json!({
                "browserName": "chrome",
                "goog:chromeOptions": {
                    "args": args,
                    "excludeSwitches": ["enable-automation"],
                    "useAutomationExtension": false,
                }
            })
        }
        BrowserKind::Firefox => {
            let args: Vec<&str> = if headless { vec!["-headless"] } else { Vec::new() };
            json!({
                "browserName": "firefox",
                "moz:firefoxOptions": { "args": args }
            })
        }
        BrowserKind::Edge => {
            let args: Vec<&str> = if headless {
                HEADLESS_CHROMIUM_ARGS.to_vec()
            } else {
                Vec::new()
            };
            json!({
                "browserName": "MicrosoftEdge",
                "ms:edgeOptions": { "args": args }
            })
        }
    }
}

/// Capabilities for attaching to an already-running browser via its
/// remote-debugging endpoint.
pub(crate) fn remote_capabilities(endpoint: &Endpoint) -> Value {
    json!({
        "browserName": "chrome",
        "goog:chromeOptions": {
            "debuggerAddress": endpoint.to_string(),
            "args": [format!("--user-agent={REMOTE_ATTACH_USER_AGENT}")],
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(BrowserKind::Chromium, "chrome", "goog:chromeOptions")]
    #[test_case(BrowserKind::Firefox, "firefox", "moz:firefoxOptions")]
    #[test_case(BrowserKind::Edge, "MicrosoftEdge", "ms:edgeOptions")]
    fn local_capabilities_name_the_browser(kind: BrowserKind, name: &str, options_key: &str) {
        let caps = local_capabilities(kind, false);
        assert_eq!(caps["browserName"], name);
        assert!(caps.get(options_key).is_some());
    }

    #[test]
    fn headless_chromium_applies_the_fixed_flag_set() {
        let caps = local_capabilities(BrowserKind::Chromium, true);
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        for flag in HEADLESS_CHROMIUM_ARGS {
            assert!(
                args.iter().any(|a| a == flag),
                "missing headless flag {flag}"
            );
        }
        assert_eq!(
            caps["goog:chromeOptions"]["excludeSwitches"][0],
            "enable-automation"
        );
    }

    #[test]
    fn headed_chromium_has_no_headless_flags() {
        let caps = local_capabilities(BrowserKind::Chromium, false);
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.is_empty());
    }

    #[test]
    fn remote_capabilities_target_the_debugger_address() {
        let endpoint = Endpoint {
            host: "127.0.0.1".to_string(),
            port: 32500,
        };
        let caps = remote_capabilities(&endpoint);
        assert_eq!(
            caps["goog:chromeOptions"]["debuggerAddress"],
            "127.0.0.1:32500"
        );
    }

    #[tokio::test]
    async fn remote_attach_rejects_non_chromium_browsers() {
        let config = SessionConfig {
            browser: BrowserKind::Firefox,
            remote_attach: true,
            ..SessionConfig::default()
        };
        let provisioner = DriverProvisioner::new(Arc::new(config));
        let err = provisioner.acquire().await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::UnsupportedBrowser {
                browser: BrowserKind::Firefox
            }
        ));
    }
}
