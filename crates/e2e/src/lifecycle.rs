//! Suite and per-test lifecycle orchestration
//!
//! Per test: acquire a session, run the body against it, capture a
//! screenshot on failure, release the session, record the outcome. The
//! release step runs on every exit path, including a panicking test body,
//! so acquire and release always pair up.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::artifact::ArtifactCapture;
use crate::config::SessionConfig;
use crate::error::HarnessResult;
use crate::provision::{DriverProvisioner, Provision};
use crate::report::{AggregateReport, OutcomeReporter, TestOutcome, TestStatus};
use crate::session::BrowserSession;

/// Bound on the release step; a release that hangs is reported as a
/// warning, not retried.
const RELEASE_TIMEOUT: Duration = Duration::from_secs(10);

/// Early exit from a test body.
#[derive(Debug)]
pub enum TestAbort {
    Failed(String),
    Skipped(String),
}

impl TestAbort {
    pub fn failed(message: impl Into<String>) -> Self {
        TestAbort::Failed(message.into())
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        TestAbort::Skipped(reason.into())
    }
}

/// What a test body resolves to.
pub type TestResult = Result<(), TestAbort>;

/// Owns the suite-wide pieces and drives each test through its lifecycle.
pub struct LifecycleManager {
    config: Arc<SessionConfig>,
    provisioner: Arc<dyn Provision>,
    reporter: Arc<OutcomeReporter>,
    capture: ArtifactCapture,
}

impl LifecycleManager {
    /// Suite start: resolve directories and wire up the provisioner and
    /// reporter. Directory creation is idempotent. Errors here are fatal
    /// to the run; no test executes without a valid configuration.
    pub fn suite_start(config: SessionConfig) -> HarnessResult<Self> {
        let config = Arc::new(config);
        let provisioner: Arc<dyn Provision> = Arc::new(DriverProvisioner::new(Arc::clone(&config)));
        Self::assemble(config, provisioner)
    }

    /// Same wiring with an injected provisioner. This is how tests drive
    /// the lifecycle with fakes, and how embedders swap in pooled or
    /// instrumented provisioning.
    pub fn with_provisioner(
        config: SessionConfig,
        provisioner: Arc<dyn Provision>,
    ) -> HarnessResult<Self> {
        Self::assemble(Arc::new(config), provisioner)
    }

    fn assemble(
        config: Arc<SessionConfig>,
        provisioner: Arc<dyn Provision>,
    ) -> HarnessResult<Self> {
        std::fs::create_dir_all(&config.artifact_dir)?;
        if let Some(parent) = config.report_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!(
            "suite starting: browser={} remote_attach={} base_url={}",
            config.browser, config.remote_attach, config.base_url
        );

        Ok(Self {
            capture: ArtifactCapture::new(config.artifact_dir.clone()),
            reporter: Arc::new(OutcomeReporter::new()),
            provisioner,
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn reporter(&self) -> &Arc<OutcomeReporter> {
        &self.reporter
    }

    /// Run one test body against a freshly acquired session.
    ///
    /// The session handle is shared into the body for its duration; once
    /// the body resolves (or panics) the lifecycle reclaims the handle and
    /// releases it, so acquire and release pair up on every exit path. A
    /// provisioning failure is recorded as a failed outcome with the
    /// provisioning error as its message and aborts only this test.
    pub async fn run_test<F, Fut>(&self, name: &str, body: F) -> TestStatus
    where
        F: FnOnce(Arc<BrowserSession>) -> Fut,
        Fut: Future<Output = TestResult>,
    {
        let started_at = Utc::now();
        debug!("acquiring session for {name}");

        let session = match self.provisioner.acquire().await {
            Ok(session) => Arc::new(session),
            Err(e) => {
                error!("✗ {name} - session provisioning failed: {e}");
                self.record(TestOutcome {
                    name: name.to_string(),
                    status: TestStatus::Failed,
                    message: Some(format!("session provisioning failed: {e}")),
                    artifacts: Vec::new(),
                    started_at,
                    finished_at: Utc::now(),
                });
                return TestStatus::Failed;
            }
        };

        if let Err(e) = session
            .apply_timeouts(self.config.implicit_wait, self.config.page_load_timeout)
            .await
        {
            error!("✗ {name} - applying session timeouts failed: {e}");
            self.release(session, name).await;
            self.record(TestOutcome {
                name: name.to_string(),
                status: TestStatus::Failed,
                message: Some(format!("applying session timeouts failed: {e}")),
                artifacts: Vec::new(),
                started_at,
                finished_at: Utc::now(),
            });
            return TestStatus::Failed;
        }

        let result = AssertUnwindSafe(async { body(Arc::clone(&session)).await })
            .catch_unwind()
            .await;

        let (status, message) = match result {
            Ok(Ok(())) => (TestStatus::Passed, None),
            Ok(Err(TestAbort::Failed(message))) => (TestStatus::Failed, Some(message)),
            Ok(Err(TestAbort::Skipped(reason))) => (TestStatus::Skipped, Some(reason)),
            Err(payload) => (TestStatus::Failed, Some(panic_message(payload))),
        };

        let mut artifacts = Vec::new();
        if status == TestStatus::Failed {
            match self.capture.capture(&session, name).await {
                Ok(path) => artifacts.push(path),
                Err(e) => warn!("screenshot capture for {name} failed: {e}"),
            }
        }

        self.release(session, name).await;

        match status {
            TestStatus::Passed => info!("✓ {name}"),
            TestStatus::Failed => {
                error!("✗ {name} - {}", message.as_deref().unwrap_or("failed"))
            }
            TestStatus::Skipped => {
                info!("- {name} skipped: {}", message.as_deref().unwrap_or(""))
            }
        }

        self.record(TestOutcome {
            name: name.to_string(),
            status,
            message,
            artifacts,
            started_at,
            finished_at: Utc::now(),
        });
        status
    }

    /// Suite end: seal the outcome log, write the JSON aggregate, and
    /// return it. Called exactly once per run.
    pub fn suite_end(&self) -> HarnessResult<AggregateReport> {
        let report = self.reporter.flush()?;
        info!(
            "suite finished: {} passed, {} failed, {} skipped",
            report.passed, report.failed, report.skipped
        );
        report.write_json(&self.config.report_path)?;
        Ok(report)
    }

    async fn release(&self, session: Arc<BrowserSession>, name: &str) {
        // The body's clones are normally gone once its future resolves.
        // A clone stashed past that point keeps the handle shared, but a
        // local browser still gets quit; only the handle stays alive.
        let result = match Arc::try_unwrap(session) {
            Ok(session) => tokio::time::timeout(RELEASE_TIMEOUT, session.release()).await,
            Err(shared) => {
                warn!("session handle for {name} is still shared at release");
                tokio::time::timeout(RELEASE_TIMEOUT, shared.quit_shared()).await
            }
        };
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("releasing session for {name} failed: {e}"),
            Err(_) => warn!(
                "releasing session for {name} timed out after {:?}",
                RELEASE_TIMEOUT
            ),
        }
    }

    fn record(&self, outcome: TestOutcome) {
        if let Err(e) = self.reporter.record(outcome) {
            warn!("outcome could not be recorded: {e}");
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("test body panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("test body panicked: {message}")
    } else {
        "test body panicked".to_string()
    }
}
