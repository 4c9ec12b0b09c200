//! Conduit E2E harness
//!
//! Browser-session provisioning and test-lifecycle management for the
//! Conduit blogging application's end-to-end suite. Page objects and the
//! test cases themselves build on top of this crate; the harness owns
//! acquiring, observing, and releasing the browser session each test runs
//! against.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     LifecycleManager                         │
//! │   suite_start() ── load SessionConfig, create dirs           │
//! │   run_test(name, body)                                       │
//! │     ├── Provision::acquire() ─► BrowserSession               │
//! │     │     ├── local-launch: WebDriverBackend + capabilities  │
//! │     │     └── remote-attach: RemoteBrowserClient::discover() │
//! │     ├── body(&session)  (panics are captured)                │
//! │     ├── on failure: ArtifactCapture::capture()               │
//! │     ├── release: quit local / detach remote                  │
//! │     └── OutcomeReporter::record()                            │
//! │   suite_end() ── OutcomeReporter::flush() ─► JSON report     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! One session per running test, never shared, never reused. The
//! configuration and the outcome log are the only suite-wide state; the
//! former is read-only after suite start and the latter is internally
//! synchronized.

pub mod artifact;
pub mod config;
pub mod discovery;
pub mod error;
pub mod lifecycle;
pub mod provision;
pub mod report;
pub mod session;
pub mod wait;
pub mod webdriver;

pub use artifact::ArtifactCapture;
pub use config::{BrowserKind, SessionConfig};
pub use discovery::{Endpoint, RemoteBrowserClient};
pub use error::{HarnessError, HarnessResult};
pub use lifecycle::{LifecycleManager, TestAbort, TestResult};
pub use provision::{DriverProvisioner, Provision};
pub use report::{AggregateReport, OutcomeReporter, TestOutcome, TestStatus};
pub use session::{BrowserSession, DriverBackend, SessionMode};
