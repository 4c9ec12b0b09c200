//! Outcome accumulation and the final aggregate report

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ReportError;

/// Final status of one test execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

/// Recorded result of one test. Append-only once handed to the reporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutcome {
    pub name: String,
    pub status: TestStatus,
    /// Failure or skip message, if any.
    pub message: Option<String>,
    /// Artifacts captured for this test (failure screenshots).
    pub artifacts: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TestOutcome {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Summary of a whole suite run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcomes: Vec<TestOutcome>,
}

impl AggregateReport {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Write the aggregate as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("report written to {}", path.display());
        Ok(())
    }
}

struct OutcomeLog {
    outcomes: Vec<TestOutcome>,
    flushed: bool,
}

/// Thread-safe, append-only log of test outcomes.
///
/// Parallel workers record concurrently; `flush` is called exactly once at
/// suite end. Recording after the flush is a caller bug and is rejected
/// instead of silently accepted.
pub struct OutcomeReporter {
    log: Mutex<OutcomeLog>,
}

impl OutcomeReporter {
    pub fn new() -> Self {
        Self {
            log: Mutex::new(OutcomeLog {
                outcomes: Vec::new(),
                flushed: false,
            }),
        }
    }

    pub fn record(&self, outcome: TestOutcome) -> Result<(), ReportError> {
        let mut log = self.log.lock();
        if log.flushed {
            return Err(ReportError::AlreadyFlushed);
        }
        log.outcomes.push(outcome);
        Ok(())
    }

    /// Number of outcomes recorded so far.
    pub fn recorded(&self) -> usize {
        self.log.lock().outcomes.len()
    }

    /// Seal the log and produce the aggregate.
    pub fn flush(&self) -> Result<AggregateReport, ReportError> {
        let mut log = self.log.lock();
        if log.flushed {
            return Err(ReportError::AlreadyFlushed);
        }
        log.flushed = true;

        let outcomes = log.outcomes.clone();
        let passed = count(&outcomes, TestStatus::Passed);
        let failed = count(&outcomes, TestStatus::Failed);
        let skipped = count(&outcomes, TestStatus::Skipped);

        Ok(AggregateReport {
            total: outcomes.len(),
            passed,
            failed,
            skipped,
            outcomes,
        })
    }
}

impl Default for OutcomeReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn count(outcomes: &[TestOutcome], status: TestStatus) -> usize {
    outcomes.iter().filter(|o| o.status == status).count()
}
