use super::{RowCursor, Storage, StorageResult, WriteOutcome};
use crate::config::SessionConfig;
use crate::core::{SqlValue, StorageError};
use log::{debug, info};
use rusqlite::{Connection, params_from_iter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed storage over a single connection.
///
/// SQLite allows one writer at a time; the mutex serializes every call on
/// this handle.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open(config: &SessionConfig) -> StorageResult<Self> {
        info!("Opening SQLite database at {}", config.database);
        let conn = if config.is_memory() {
            Connection::open_in_memory()?
        } else {
            Connection::open(Path::new(&config.database))?
        };

        if config.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }
        conn.busy_timeout(config.busy_timeout)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn memory() -> StorageResult<Self> {
        Self::open(&SessionConfig::memory())
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|err| StorageError::Backend(format!("connection lock poisoned: {}", err)))
    }
}

impl Storage for SqliteStorage {
    fn execute_write(&self, sql: &str, args: &[SqlValue]) -> StorageResult<WriteOutcome> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(sql)?;
        let rows_affected = stmt.execute(params_from_iter(args.iter()))?;
        Ok(WriteOutcome {
            rows_affected,
            last_insert_id: conn.last_insert_rowid(),
        })
    }

    fn query(&self, sql: &str, args: &[SqlValue]) -> StorageResult<RowCursor> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let width = columns.len();

        let mut rows = stmt.query(params_from_iter(args.iter()))?;
        let mut collected = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for index in 0..width {
                values.push(SqlValue::from(row.get_ref(index)?));
            }
            collected.push(values);
        }

        Ok(RowCursor::new(columns, collected))
    }

    fn execute_batch(&self, sql: &str) -> StorageResult<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    fn begin_transaction(&self) -> StorageResult<()> {
        debug!("BEGIN");
        self.lock()?.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&self) -> StorageResult<()> {
        debug!("COMMIT");
        self.lock()?.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self) -> StorageResult<()> {
        debug!("ROLLBACK");
        self.lock()?.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn in_transaction(&self) -> StorageResult<bool> {
        Ok(!self.lock()?.is_autocommit())
    }

    fn reset_sequence(&self, table: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        let has_sequence: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence')",
            [],
            |row| row.get(0),
        )?;
        if has_sequence {
            conn.execute("DELETE FROM sqlite_sequence WHERE name = ?", [table])?;
        }
        Ok(())
    }
}
