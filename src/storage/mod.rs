//! The storage collaborator: a relational engine exposing prepare/execute,
//! prepare/query and transaction control.

mod sqlite;

pub use sqlite::SqliteStorage;

use crate::core::{SqlValue, StorageError};
use std::sync::Arc;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub rows_affected: usize,
    pub last_insert_id: i64,
}

/// One result row. Column names are shared by every row of a cursor.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Position of the first column with this name. Joins can yield the
    /// same name twice; the first occurrence wins.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&SqlValue> {
        self.column_index(name).and_then(|i| self.values.get(i))
    }

    pub fn is_null(&self, index: usize) -> bool {
        self.values.get(index).is_none_or(SqlValue::is_null)
    }

    pub fn get_i64(&self, index: usize) -> Option<i64> {
        self.get(index).and_then(SqlValue::as_i64)
    }

    pub fn get_f64(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(SqlValue::as_f64)
    }

    pub fn get_str(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(SqlValue::as_str)
    }

    pub fn get_blob(&self, index: usize) -> Option<&[u8]> {
        self.get(index).and_then(SqlValue::as_blob)
    }

    pub fn take(&mut self, index: usize) -> SqlValue {
        self.values
            .get_mut(index)
            .map(std::mem::take)
            .unwrap_or(SqlValue::Null)
    }
}

/// Finite, forward-only sequence of rows.
#[derive(Debug)]
pub struct RowCursor {
    columns: Arc<[String]>,
    rows: std::vec::IntoIter<Vec<SqlValue>>,
}

impl RowCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns: columns.into(),
            rows: rows.into_iter(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl Iterator for RowCursor {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.rows
            .next()
            .map(|values| Row::new(self.columns.clone(), values))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

/// Capabilities the mapping core needs from a relational engine.
///
/// Implementations serialize writers internally; the core adds no write
/// lock of its own and performs no retries.
pub trait Storage: Send + Sync {
    fn execute_write(&self, sql: &str, args: &[SqlValue]) -> StorageResult<WriteOutcome>;

    fn query(&self, sql: &str, args: &[SqlValue]) -> StorageResult<RowCursor>;

    /// Runs parameterless statements such as DDL.
    fn execute_batch(&self, sql: &str) -> StorageResult<()>;

    fn begin_transaction(&self) -> StorageResult<()>;

    fn commit(&self) -> StorageResult<()>;

    fn rollback(&self) -> StorageResult<()>;

    fn in_transaction(&self) -> StorageResult<bool>;

    /// Resets the auto-increment counter of a table, where the engine has one.
    fn reset_sequence(&self, _table: &str) -> StorageResult<()> {
        Ok(())
    }
}
