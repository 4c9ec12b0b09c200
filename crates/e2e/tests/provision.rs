//! Provisioning branch selection and failure-path tests

mod common;

use std::sync::Arc;
use std::time::Duration;

use conduit_e2e::error::ProvisionError;
use conduit_e2e::{BrowserKind, DriverProvisioner, Provision, SessionConfig};

fn config(remote_attach: bool, discovery_url: String, webdriver_url: String) -> SessionConfig {
    SessionConfig {
        browser: BrowserKind::Chromium,
        remote_attach,
        discovery_url,
        webdriver_url,
        discovery_timeout: Duration::from_secs(2),
        provision_timeout: Duration::from_secs(2),
        ..SessionConfig::default()
    }
}

#[tokio::test]
async fn local_launch_never_touches_discovery() {
    let discovery = common::spawn_service(200, r#"{"port": 32500}"#).await;
    let provisioner = DriverProvisioner::new(Arc::new(config(
        false,
        discovery.url.clone(),
        common::refused_url(),
    )));

    let err = provisioner.acquire().await.unwrap_err();
    assert!(matches!(err, ProvisionError::DriverUnavailable { .. }), "got {err}");
    assert_eq!(discovery.hits(), 0);
}

#[tokio::test]
async fn remote_attach_fails_closed_on_discovery_error() {
    let discovery = common::spawn_service(500, r#"{"error": "none left"}"#).await;
    // A working webdriver endpoint must not be used as a fallback; point
    // the config at a live mock to prove no local launch happens.
    let webdriver = common::spawn_service(200, r#"{"value": {"sessionId": "s1"}}"#).await;
    let provisioner = DriverProvisioner::new(Arc::new(config(
        true,
        discovery.url.clone(),
        webdriver.url.clone(),
    )));

    let err = provisioner.acquire().await.unwrap_err();
    assert!(matches!(err, ProvisionError::Discovery(_)), "got {err}");
    assert_eq!(discovery.hits(), 1);
    assert_eq!(webdriver.hits(), 0);
}

#[tokio::test]
async fn remote_attach_discovers_exactly_once_per_acquire() {
    let discovery = common::spawn_service(200, r#"{"port": 32500}"#).await;
    let provisioner = DriverProvisioner::new(Arc::new(config(
        true,
        discovery.url.clone(),
        common::refused_url(),
    )));

    let err = provisioner.acquire().await.unwrap_err();
    assert!(matches!(err, ProvisionError::DriverUnavailable { .. }), "got {err}");
    assert_eq!(discovery.hits(), 1);

    // No response caching: a second acquire asks the service again.
    let _ = provisioner.acquire().await.unwrap_err();
    assert_eq!(discovery.hits(), 2);
}

#[tokio::test]
async fn unresponsive_webdriver_endpoint_is_a_startup_timeout() {
    let webdriver = common::spawn_unresponsive().await;
    let provisioner = DriverProvisioner::new(Arc::new(config(
        false,
        common::refused_url(),
        webdriver.url.clone(),
    )));

    let start = std::time::Instant::now();
    let err = provisioner.acquire().await.unwrap_err();
    assert!(matches!(err, ProvisionError::Timeout { .. }), "got {err}");
    assert!(start.elapsed() < Duration::from_secs(4));
}
