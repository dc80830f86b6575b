//! Ledger storage trait.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use super::{LedgerError, Task, TaskStatus};

/// Trait for task ledger backends.
pub trait TaskLedger: Send + Sync {
    /// Insert a `pending` row unless one already exists for `id`.
    fn register(&self, id: &str, name: &str) -> Result<(), LedgerError>;

    /// Move a task to `status`, refreshing `updated_at`.
    ///
    /// Returns `Ok(false)` when no row exists for `id`; callers must not
    /// treat that as proof of existence either way. Illegal lifecycle steps
    /// fail with [`LedgerError::InvalidTransition`].
    fn set_status(&self, id: &str, status: TaskStatus, message: &str)
        -> Result<bool, LedgerError>;

    /// Get a task by id.
    fn get(&self, id: &str) -> Result<Option<Task>, LedgerError>;

    /// Ids of every task currently in `status`.
    fn list_by_status(&self, status: TaskStatus) -> Result<HashSet<String>, LedgerError>;

    /// Delete archived tasks whose `updated_at` is strictly before `cutoff`.
    fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, LedgerError>;

    /// Delete archived tasks older than `max_age_days`.
    /// A value of zero or below disables pruning.
    fn prune(&self, max_age_days: i64) -> Result<u64, LedgerError> {
        if max_age_days <= 0 {
            return Ok(0);
        }
        // Ages too large to represent cannot match any row.
        match Duration::try_days(max_age_days).and_then(|age| Utc::now().checked_sub_signed(age))
        {
            Some(cutoff) => self.prune_before(cutoff),
            None => Ok(0),
        }
    }
}
