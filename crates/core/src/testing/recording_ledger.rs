//! Ledger wrapper that logs writes and can be told to fail.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::ledger::{LedgerError, Task, TaskLedger, TaskStatus};

use super::CallLog;

/// Wraps a real ledger, recording status changes into a [`CallLog`].
///
/// Entries look like `status:<id>:<status>`, which lets tests check that
/// a task was archived between its local delete and the batch removal.
pub struct RecordingLedger {
    inner: Arc<dyn TaskLedger>,
    calls: CallLog,
    fail_prune: AtomicBool,
    /// Target statuses whose `set_status` calls fail.
    failing_statuses: Mutex<HashSet<TaskStatus>>,
}

impl RecordingLedger {
    pub fn new(inner: Arc<dyn TaskLedger>, calls: CallLog) -> Self {
        Self {
            inner,
            calls,
            fail_prune: AtomicBool::new(false),
            failing_statuses: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_prune(&self) {
        self.fail_prune.store(true, Ordering::SeqCst);
    }

    /// Make every move to `status` fail with a database error.
    pub fn fail_status(&self, status: TaskStatus) {
        if let Ok(mut failing) = self.failing_statuses.lock() {
            failing.insert(status);
        }
    }

    fn status_fails(&self, status: TaskStatus) -> bool {
        self.failing_statuses
            .lock()
            .map(|failing| failing.contains(&status))
            .unwrap_or(false)
    }
}

impl TaskLedger for RecordingLedger {
    fn register(&self, id: &str, name: &str) -> Result<(), LedgerError> {
        self.calls.record(format!("register:{}", id));
        self.inner.register(id, name)
    }

    fn set_status(
        &self,
        id: &str,
        status: TaskStatus,
        message: &str,
    ) -> Result<bool, LedgerError> {
        self.calls.record(format!("status:{}:{}", id, status));
        if self.status_fails(status) {
            return Err(LedgerError::Database("database is locked".to_string()));
        }
        self.inner.set_status(id, status, message)
    }

    fn get(&self, id: &str) -> Result<Option<Task>, LedgerError> {
        self.inner.get(id)
    }

    fn list_by_status(&self, status: TaskStatus) -> Result<HashSet<String>, LedgerError> {
        self.inner.list_by_status(status)
    }

    fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, LedgerError> {
        self.calls.record("prune");
        if self.fail_prune.load(Ordering::SeqCst) {
            return Err(LedgerError::Database("disk I/O error".to_string()));
        }
        self.inner.prune_before(cutoff)
    }
}
