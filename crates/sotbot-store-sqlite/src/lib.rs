//! SQLite persistence for the bot: known users, the status-change history
//! behind the analytics section, and uploaded-attachment records.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sotbot_core::{AnalyticsSummary, Mark, StatusChange, StatusField, StatusTally};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

const LATEST_SCHEMA_VERSION: i64 = 1;

const CREATE_SCHEMA_MIGRATIONS_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at TEXT NOT NULL
);
";

const MIGRATION_001_SQL: &str = r"
CREATE TABLE IF NOT EXISTS users (
  user_id INTEGER PRIMARY KEY,
  username TEXT NOT NULL DEFAULT '',
  first_seen TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS status_history (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  sheet_row INTEGER NOT NULL,
  fire TEXT CHECK (fire IN ('да','нет')),
  fire_registry TEXT CHECK (fire_registry IN ('да','нет')),
  architecture TEXT CHECK (architecture IN ('да','нет')),
  electrical TEXT CHECK (electrical IN ('да','нет')),
  updated_by_id INTEGER NOT NULL,
  updated_by_username TEXT NOT NULL DEFAULT '',
  updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS attachments (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  sheet_row INTEGER NOT NULL,
  drive_url TEXT NOT NULL,
  file_name TEXT NOT NULL,
  uploaded_by INTEGER NOT NULL,
  uploaded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS schedule_approvals (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  approver TEXT NOT NULL,
  decision TEXT NOT NULL,
  comment TEXT,
  decided_at TEXT NOT NULL,
  version INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_status_history_sheet_row ON status_history(sheet_row);
CREATE INDEX IF NOT EXISTS idx_status_history_updated_at ON status_history(updated_at);
CREATE INDEX IF NOT EXISTS idx_attachments_sheet_row ON attachments(sheet_row);
";

pub struct SqliteStore {
    conn: Connection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaStatus {
    pub current_version: i64,
    pub target_version: i64,
    pub pending_versions: Vec<i64>,
}

impl SqliteStore {
    /// Open the bot database and configure required runtime pragmas.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened or pragmas cannot
    /// be applied.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to configure sqlite pragmas")?;

        Ok(Self { conn })
    }

    /// Report current and target schema versions plus pending migrations.
    ///
    /// # Errors
    /// Returns an error when schema metadata cannot be read or initialized.
    pub fn schema_status(&self) -> Result<SchemaStatus> {
        self.conn
            .execute_batch(CREATE_SCHEMA_MIGRATIONS_SQL)
            .context("failed to apply schema_migrations table")?;
        let current_version = current_schema_version(&self.conn)?;
        let pending_versions = if current_version < LATEST_SCHEMA_VERSION {
            ((current_version + 1)..=LATEST_SCHEMA_VERSION).collect::<Vec<_>>()
        } else {
            Vec::new()
        };

        Ok(SchemaStatus {
            current_version,
            target_version: LATEST_SCHEMA_VERSION,
            pending_versions,
        })
    }

    /// Apply all forward migrations up to the latest supported schema version.
    ///
    /// # Errors
    /// Returns an error when migration bootstrapping or any migration step
    /// fails.
    pub fn migrate(&mut self) -> Result<()> {
        self.conn
            .execute_batch(CREATE_SCHEMA_MIGRATIONS_SQL)
            .context("failed to apply schema_migrations table")?;

        let mut version = current_schema_version(&self.conn)?;

        if version < 1 {
            let tx = self.conn.transaction().context("failed to start migration transaction")?;
            tx.execute_batch(MIGRATION_001_SQL).context("failed to apply migration v1")?;
            let now = rfc3339(OffsetDateTime::now_utc())?;
            tx.execute(
                "INSERT OR IGNORE INTO schema_migrations(version, applied_at) VALUES (?1, ?2)",
                params![1_i64, now],
            )
            .context("failed to record migration version 1")?;
            tx.commit().context("failed to commit migration v1")?;
            version = current_schema_version(&self.conn)?;
        }

        if version != LATEST_SCHEMA_VERSION {
            return Err(anyhow!(
                "unsupported schema version {version}; expected {LATEST_SCHEMA_VERSION}"
            ));
        }

        Ok(())
    }

    /// Register a user on first contact. Returns `true` when the user was
    /// not previously known.
    ///
    /// # Errors
    /// Returns an error when the insert fails.
    pub fn ensure_user(
        &self,
        user_id: i64,
        username: &str,
        first_seen: OffsetDateTime,
    ) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO users(user_id, username, first_seen) VALUES (?1, ?2, ?3)",
                params![user_id, username, rfc3339(first_seen)?],
            )
            .context("failed to insert user")?;
        Ok(inserted > 0)
    }

    /// Append one status change to the history. Only the changed field's
    /// column is populated; a single button press never reveals the other
    /// three marks.
    ///
    /// # Errors
    /// Returns an error when the insert fails.
    pub fn record_status_change(
        &self,
        sheet_row: u32,
        field: StatusField,
        mark: Mark,
        updated_by_id: i64,
        updated_by_username: &str,
        updated_at: OffsetDateTime,
    ) -> Result<()> {
        let value = mark.as_str();
        let (fire, fire_registry, architecture, electrical) = match field {
            StatusField::FireSafety => (Some(value), None, None, None),
            StatusField::FireRegistry => (None, Some(value), None, None),
            StatusField::Architecture => (None, None, Some(value), None),
            StatusField::Electrical => (None, None, None, Some(value)),
        };

        self.conn
            .execute(
                "INSERT INTO status_history(
                    sheet_row, fire, fire_registry, architecture, electrical,
                    updated_by_id, updated_by_username, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    i64::from(sheet_row),
                    fire,
                    fire_registry,
                    architecture,
                    electrical,
                    updated_by_id,
                    updated_by_username,
                    rfc3339(updated_at)?,
                ],
            )
            .context("failed to insert status change")?;
        Ok(())
    }

    /// Record a file uploaded to Drive for a worksheet row.
    ///
    /// # Errors
    /// Returns an error when the insert fails.
    pub fn record_attachment(
        &self,
        sheet_row: u32,
        drive_url: &str,
        file_name: &str,
        uploaded_by: i64,
        uploaded_at: OffsetDateTime,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO attachments(sheet_row, drive_url, file_name, uploaded_by, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    i64::from(sheet_row),
                    drive_url,
                    file_name,
                    uploaded_by,
                    rfc3339(uploaded_at)?,
                ],
            )
            .context("failed to insert attachment")?;
        Ok(())
    }

    /// Build the aggregates behind the analytics section: yes/no tallies per
    /// discipline, the attachment total and the ten latest changes.
    ///
    /// # Errors
    /// Returns an error when any of the aggregate queries fails.
    pub fn analytics_summary(&self) -> Result<AnalyticsSummary> {
        let tally = |column: &str| -> Result<StatusTally> {
            let sql = format!(
                "SELECT
                    COALESCE(SUM(CASE WHEN {column} = 'да' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN {column} = 'нет' THEN 1 ELSE 0 END), 0)
                 FROM status_history"
            );
            let (yes, no): (u32, u32) = self
                .conn
                .query_row(&sql, [], |row| Ok((row.get(0)?, row.get(1)?)))
                .with_context(|| format!("failed to tally {column} statuses"))?;
            Ok(StatusTally { yes, no })
        };

        let attachments_total: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM attachments", [], |row| row.get(0))
            .context("failed to count attachments")?;

        Ok(AnalyticsSummary {
            fire: tally("fire")?,
            fire_registry: tally("fire_registry")?,
            architecture: tally("architecture")?,
            electrical: tally("electrical")?,
            attachments_total,
            recent: self.recent_status_changes(10)?,
        })
    }

    /// The latest status changes, newest first.
    ///
    /// # Errors
    /// Returns an error when rows cannot be read or decoded.
    pub fn recent_status_changes(&self, limit: u32) -> Result<Vec<StatusChange>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT sheet_row, fire, fire_registry, architecture, electrical,
                        updated_by_id, updated_by_username, updated_at
                 FROM status_history
                 ORDER BY datetime(updated_at) DESC, id DESC
                 LIMIT ?1",
            )
            .context("failed to prepare history query")?;

        let mut rows = stmt.query(params![i64::from(limit)])?;
        let mut changes = Vec::new();

        while let Some(row) = rows.next()? {
            let sheet_row: i64 = row.get(0)?;
            let updated_at_raw: String = row.get(7)?;
            changes.push(StatusChange {
                sheet_row: u32::try_from(sheet_row)
                    .map_err(|_| anyhow!("negative sheet_row in status_history: {sheet_row}"))?,
                fire: stored_mark(row.get(1)?),
                fire_registry: stored_mark(row.get(2)?),
                architecture: stored_mark(row.get(3)?),
                electrical: stored_mark(row.get(4)?),
                updated_by_id: row.get(5)?,
                updated_by_username: row.get(6)?,
                updated_at: OffsetDateTime::parse(&updated_at_raw, &Rfc3339).with_context(|| {
                    format!("invalid updated_at in status_history: {updated_at_raw}")
                })?,
            });
        }

        Ok(changes)
    }

    /// Attachment count for a single worksheet row.
    ///
    /// # Errors
    /// Returns an error when the query fails.
    pub fn attachment_count_for_row(&self, sheet_row: u32) -> Result<u64> {
        let count: Option<u64> = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM attachments WHERE sheet_row = ?1",
                params![i64::from(sheet_row)],
                |row| row.get(0),
            )
            .optional()
            .context("failed to count row attachments")?;
        Ok(count.unwrap_or(0))
    }
}

fn stored_mark(value: Option<String>) -> Option<Mark> {
    match value.as_deref() {
        Some("да") => Some(Mark::Yes),
        Some("нет") => Some(Mark::No),
        _ => None,
    }
}

fn current_schema_version(conn: &Connection) -> Result<i64> {
    let version: Option<i64> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
        .context("failed to read schema version")?;
    Ok(version.unwrap_or(0))
}

fn rfc3339(at: OffsetDateTime) -> Result<String> {
    at.format(&Rfc3339).context("failed to format timestamp")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn unique_temp_db_path() -> PathBuf {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|err| panic!("clock should be >= UNIX_EPOCH: {err}"))
            .as_nanos();
        std::env::temp_dir().join(format!("sotbot-store-{now}.sqlite3"))
    }

    fn open_migrated() -> (SqliteStore, PathBuf) {
        let path = unique_temp_db_path();
        let mut store = match SqliteStore::open(&path) {
            Ok(store) => store,
            Err(err) => panic!("failed to open store: {err}"),
        };
        if let Err(err) = store.migrate() {
            panic!("failed to migrate store: {err}");
        }
        (store, path)
    }

    fn at(unix: i64) -> OffsetDateTime {
        match OffsetDateTime::from_unix_timestamp(unix) {
            Ok(at) => at,
            Err(err) => panic!("bad timestamp in test fixture: {err}"),
        }
    }

    #[test]
    fn migrate_reaches_latest_schema_version() {
        let (store, path) = open_migrated();
        let status = match store.schema_status() {
            Ok(status) => status,
            Err(err) => panic!("failed to read schema status: {err}"),
        };
        assert_eq!(status.current_version, LATEST_SCHEMA_VERSION);
        assert!(status.pending_versions.is_empty());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn fresh_database_reports_pending_migration() {
        let path = unique_temp_db_path();
        let store = match SqliteStore::open(&path) {
            Ok(store) => store,
            Err(err) => panic!("failed to open store: {err}"),
        };
        let status = match store.schema_status() {
            Ok(status) => status,
            Err(err) => panic!("failed to read schema status: {err}"),
        };
        assert_eq!(status.current_version, 0);
        assert_eq!(status.pending_versions, vec![1]);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn ensure_user_is_idempotent() {
        let (store, path) = open_migrated();
        let first = store.ensure_user(42, "inspector", at(1_700_000_000));
        let second = store.ensure_user(42, "inspector", at(1_700_000_100));
        assert_eq!(first.ok(), Some(true));
        assert_eq!(second.ok(), Some(false));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn status_changes_feed_analytics_tallies() {
        let (store, path) = open_migrated();

        for (field, mark, unix) in [
            (StatusField::FireSafety, Mark::Yes, 1_700_000_000),
            (StatusField::FireSafety, Mark::Yes, 1_700_000_010),
            (StatusField::FireSafety, Mark::No, 1_700_000_020),
            (StatusField::Electrical, Mark::No, 1_700_000_030),
        ] {
            if let Err(err) = store.record_status_change(25, field, mark, 7, "inspector", at(unix)) {
                panic!("failed to record status change: {err}");
            }
        }

        let summary = match store.analytics_summary() {
            Ok(summary) => summary,
            Err(err) => panic!("failed to build analytics summary: {err}"),
        };
        assert_eq!(summary.fire, StatusTally { yes: 2, no: 1 });
        assert_eq!(summary.electrical, StatusTally { yes: 0, no: 1 });
        assert_eq!(summary.fire_registry, StatusTally::default());
        assert_eq!(summary.attachments_total, 0);
        assert_eq!(summary.recent.len(), 4);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn recent_changes_come_back_newest_first() {
        let (store, path) = open_migrated();

        for (row, unix) in [(10, 1_700_000_000), (20, 1_700_000_100), (30, 1_700_000_050)] {
            if let Err(err) = store.record_status_change(
                row,
                StatusField::Architecture,
                Mark::Yes,
                7,
                "inspector",
                at(unix),
            ) {
                panic!("failed to record status change: {err}");
            }
        }

        let recent = match store.recent_status_changes(2) {
            Ok(recent) => recent,
            Err(err) => panic!("failed to read history: {err}"),
        };
        let rows: Vec<u32> = recent.iter().map(|change| change.sheet_row).collect();
        assert_eq!(rows, vec![20, 30]);
        assert_eq!(recent[0].architecture, Some(Mark::Yes));
        assert_eq!(recent[0].fire, None);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn attachments_are_counted_per_row_and_in_total() {
        let (store, path) = open_migrated();

        for (row, name) in [(25, "act.pdf"), (25, "photo.jpg"), (40, "notes.docx")] {
            if let Err(err) = store.record_attachment(
                row,
                "https://drive.google.com/uc?id=x&export=download",
                name,
                7,
                at(1_700_000_000),
            ) {
                panic!("failed to record attachment: {err}");
            }
        }

        assert_eq!(store.attachment_count_for_row(25).ok(), Some(2));
        assert_eq!(store.attachment_count_for_row(99).ok(), Some(0));
        let summary = match store.analytics_summary() {
            Ok(summary) => summary,
            Err(err) => panic!("failed to build analytics summary: {err}"),
        };
        assert_eq!(summary.attachments_total, 3);
        let _ = std::fs::remove_file(path);
    }
}
