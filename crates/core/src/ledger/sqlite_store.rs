//! SQLite-backed task ledger implementation.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;

use super::{LedgerError, Task, TaskLedger, TaskStatus};

/// Format SQLite's `CURRENT_TIMESTAMP` produces; text comparison follows time order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SELECT_TASK: &str = "SELECT info_hash, torrent_name, upload_status, message, created_at, updated_at FROM tasks";

/// SQLite-backed task ledger.
pub struct SqliteTaskLedger {
    conn: Mutex<Connection>,
}

impl SqliteTaskLedger {
    /// Open (or create) the ledger database at `path`.
    ///
    /// The upload and cleanup entry points may run at the same time, so the
    /// file is opened in WAL mode and writers wait up to `busy_timeout` for a lock.
    pub fn new(path: &Path, busy_timeout: Duration) -> Result<Self, LedgerError> {
        debug!("Opening task ledger at {}", path.display());
        let conn = Connection::open(path).map_err(db_err)?;
        conn.busy_timeout(busy_timeout).map_err(db_err)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory ledger (useful for testing).
    pub fn in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), LedgerError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                info_hash     TEXT PRIMARY KEY,
                torrent_name  TEXT,
                upload_status TEXT NOT NULL DEFAULT 'pending',
                message       TEXT,
                created_at    TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at    TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(upload_status);

            CREATE TRIGGER IF NOT EXISTS update_tasks_updated_at
            AFTER UPDATE OF upload_status, message ON tasks FOR EACH ROW
            BEGIN
                UPDATE tasks SET updated_at = CURRENT_TIMESTAMP WHERE info_hash = OLD.info_hash;
            END;
            "#,
        )
        .map_err(db_err)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, LedgerError> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::Database("ledger connection lock poisoned".to_string()))
    }

    fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        let status_str: String = row.get(2)?;
        let status = status_str
            .parse::<TaskStatus>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?;

        Ok(Task {
            id: row.get(0)?,
            name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            status,
            message: row.get(3)?,
            created_at: parse_timestamp(row, 4)?,
            updated_at: parse_timestamp(row, 5)?,
        })
    }
}

fn db_err(e: rusqlite::Error) -> LedgerError {
    LedgerError::Database(e.to_string())
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

impl TaskLedger for SqliteTaskLedger {
    fn register(&self, id: &str, name: &str) -> Result<(), LedgerError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO tasks (info_hash, torrent_name) VALUES (?, ?)",
            params![id, name],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn set_status(
        &self,
        id: &str,
        status: TaskStatus,
        message: &str,
    ) -> Result<bool, LedgerError> {
        let mut conn = self.lock()?;
        // IMMEDIATE takes the write lock up front so the check and the update
        // see the same row even with another process writing.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        let current: Option<String> = tx
            .query_row(
                "SELECT upload_status FROM tasks WHERE info_hash = ?",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        let Some(current) = current else {
            return Ok(false);
        };
        let current = current
            .parse::<TaskStatus>()
            .map_err(LedgerError::Database)?;

        if !current.can_transition_to(status) {
            return Err(LedgerError::InvalidTransition {
                task_id: id.to_string(),
                from: current,
                to: status,
            });
        }

        tx.execute(
            "UPDATE tasks SET upload_status = ?, message = ? WHERE info_hash = ?",
            params![status.as_str(), message, id],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;

        Ok(true)
    }

    fn get(&self, id: &str) -> Result<Option<Task>, LedgerError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("{} WHERE info_hash = ?", SELECT_TASK),
            params![id],
            Self::row_to_task,
        )
        .optional()
        .map_err(db_err)
    }

    fn list_by_status(&self, status: TaskStatus) -> Result<HashSet<String>, LedgerError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT info_hash FROM tasks WHERE upload_status = ?")
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![status.as_str()], |row| row.get::<_, String>(0))
            .map_err(db_err)?;

        rows.collect::<Result<HashSet<_>, _>>().map_err(db_err)
    }

    fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, LedgerError> {
        let conn = self.lock()?;
        let removed = conn
            .execute(
                "DELETE FROM tasks WHERE upload_status = ? AND updated_at < ?",
                params![TaskStatus::Archived.as_str(), format_timestamp(cutoff)],
            )
            .map_err(db_err)?;
        Ok(removed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn backdate(ledger: &SqliteTaskLedger, id: &str, updated_at: DateTime<Utc>) {
        let conn = ledger.conn.lock().unwrap();
        conn.execute(
            "UPDATE tasks SET updated_at = ? WHERE info_hash = ?",
            params![format_timestamp(updated_at), id],
        )
        .unwrap();
    }

    fn archived(ledger: &SqliteTaskLedger, id: &str) {
        ledger.register(id, id).unwrap();
        ledger.set_status(id, TaskStatus::Uploading, "started").unwrap();
        ledger.set_status(id, TaskStatus::Success, "uploaded").unwrap();
        ledger.set_status(id, TaskStatus::Archived, "archived").unwrap();
    }

    #[test]
    fn test_register_is_idempotent() {
        let ledger = SqliteTaskLedger::in_memory().unwrap();
        ledger.register("h1", "Foo").unwrap();
        ledger.set_status("h1", TaskStatus::Uploading, "started").unwrap();

        ledger.register("h1", "Renamed").unwrap();

        let task = ledger.get("h1").unwrap().unwrap();
        assert_eq!(task.name, "Foo");
        assert_eq!(task.status, TaskStatus::Uploading);
        assert_eq!(task.message.as_deref(), Some("started"));
    }

    #[test]
    fn test_new_task_is_pending_without_message() {
        let ledger = SqliteTaskLedger::in_memory().unwrap();
        ledger.register("h1", "Foo").unwrap();

        let task = ledger.get("h1").unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.message.is_none());
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let ledger = SqliteTaskLedger::in_memory().unwrap();
        assert!(ledger.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_set_status_on_missing_row_touches_nothing() {
        let ledger = SqliteTaskLedger::in_memory().unwrap();
        let updated = ledger
            .set_status("ghost", TaskStatus::Uploading, "started")
            .unwrap();
        assert!(!updated);
        assert!(ledger.get("ghost").unwrap().is_none());
    }

    #[test]
    fn test_set_status_rejects_illegal_transition() {
        let ledger = SqliteTaskLedger::in_memory().unwrap();
        ledger.register("h1", "Foo").unwrap();

        let err = ledger
            .set_status("h1", TaskStatus::Archived, "archived")
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidTransition {
                from: TaskStatus::Pending,
                to: TaskStatus::Archived,
                ..
            }
        ));
        assert_eq!(
            ledger.get("h1").unwrap().unwrap().status,
            TaskStatus::Pending
        );
    }

    #[test]
    fn test_status_write_refreshes_updated_at() {
        let ledger = SqliteTaskLedger::in_memory().unwrap();
        ledger.register("h1", "Foo").unwrap();
        let long_ago = Utc::now() - ChronoDuration::days(10);
        backdate(&ledger, "h1", long_ago);
        assert!(ledger.get("h1").unwrap().unwrap().updated_at < Utc::now() - ChronoDuration::days(9));

        ledger.set_status("h1", TaskStatus::Uploading, "started").unwrap();

        let task = ledger.get("h1").unwrap().unwrap();
        assert!(task.updated_at > Utc::now() - ChronoDuration::minutes(1));
    }

    #[test]
    fn test_list_by_status() {
        let ledger = SqliteTaskLedger::in_memory().unwrap();
        for id in ["a", "b", "c"] {
            ledger.register(id, id).unwrap();
            ledger.set_status(id, TaskStatus::Uploading, "started").unwrap();
        }
        ledger.set_status("a", TaskStatus::Success, "uploaded").unwrap();
        ledger.set_status("b", TaskStatus::Failed, "boom").unwrap();
        ledger.set_status("c", TaskStatus::Success, "uploaded").unwrap();

        let success = ledger.list_by_status(TaskStatus::Success).unwrap();
        assert_eq!(success, HashSet::from(["a".to_string(), "c".to_string()]));
        assert_eq!(ledger.list_by_status(TaskStatus::Failed).unwrap().len(), 1);
        assert!(ledger.list_by_status(TaskStatus::Archived).unwrap().is_empty());
    }

    #[test]
    fn test_prune_boundary_is_exclusive() {
        let ledger = SqliteTaskLedger::in_memory().unwrap();
        archived(&ledger, "h1");
        let cutoff = Utc::now() - ChronoDuration::days(30);
        let cutoff = NaiveDateTime::parse_from_str(&format_timestamp(cutoff), TIMESTAMP_FORMAT)
            .unwrap()
            .and_utc();
        backdate(&ledger, "h1", cutoff);

        assert_eq!(ledger.prune_before(cutoff).unwrap(), 0);
        assert!(ledger.get("h1").unwrap().is_some());

        assert_eq!(
            ledger.prune_before(cutoff + ChronoDuration::days(1)).unwrap(),
            1
        );
        assert!(ledger.get("h1").unwrap().is_none());
    }

    #[test]
    fn test_prune_by_age_only_removes_old_archived_rows() {
        let ledger = SqliteTaskLedger::in_memory().unwrap();
        archived(&ledger, "old");
        archived(&ledger, "recent");
        ledger.register("old-success", "x").unwrap();
        ledger
            .set_status("old-success", TaskStatus::Uploading, "started")
            .unwrap();
        ledger
            .set_status("old-success", TaskStatus::Success, "uploaded")
            .unwrap();

        let now = Utc::now();
        backdate(&ledger, "old", now - ChronoDuration::days(31));
        backdate(&ledger, "recent", now - ChronoDuration::days(29));
        backdate(&ledger, "old-success", now - ChronoDuration::days(90));

        assert_eq!(ledger.prune(30).unwrap(), 1);
        assert!(ledger.get("old").unwrap().is_none());
        assert!(ledger.get("recent").unwrap().is_some());
        assert!(ledger.get("old-success").unwrap().is_some());
    }

    #[test]
    fn test_prune_disabled_for_non_positive_age() {
        let ledger = SqliteTaskLedger::in_memory().unwrap();
        archived(&ledger, "h1");
        backdate(&ledger, "h1", Utc::now() - ChronoDuration::days(365));

        assert_eq!(ledger.prune(0).unwrap(), 0);
        assert_eq!(ledger.prune(-3).unwrap(), 0);
        assert!(ledger.get("h1").unwrap().is_some());
    }

    #[test]
    fn test_file_ledger_persists_between_handles() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");
        {
            let ledger = SqliteTaskLedger::new(&path, Duration::from_millis(500)).unwrap();
            ledger.register("h1", "Foo").unwrap();
        }
        let ledger = SqliteTaskLedger::new(&path, Duration::from_millis(500)).unwrap();
        assert_eq!(ledger.get("h1").unwrap().unwrap().name, "Foo");
    }
}
