//! Mock failure reporter.

use std::sync::{Arc, Mutex};

use scansrv_core::FailureKind;

use super::lock;
use crate::traits::FailureReporter;

/// Mock recovery module that records every reported failure.
#[derive(Debug)]
pub struct MockFailureReporter {
    reports: Arc<Mutex<Vec<FailureKind>>>,
}

impl MockFailureReporter {
    /// Create a new mock reporter and its inspection handle.
    pub fn new() -> (Self, MockFailureReporterHandle) {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let handle = MockFailureReporterHandle {
            reports: Arc::clone(&reports),
        };
        (Self { reports }, handle)
    }
}

impl FailureReporter for MockFailureReporter {
    fn report_failure(&mut self, kind: FailureKind) {
        lock(&self.reports).push(kind);
    }
}

/// Handle for inspecting a [`MockFailureReporter`].
#[derive(Debug, Clone)]
pub struct MockFailureReporterHandle {
    reports: Arc<Mutex<Vec<FailureKind>>>,
}

impl MockFailureReporterHandle {
    /// All failures reported so far, oldest first.
    pub fn reports(&self) -> Vec<FailureKind> {
        lock(&self.reports).clone()
    }

    /// Number of failures reported so far.
    pub fn report_count(&self) -> usize {
        lock(&self.reports).len()
    }
}
