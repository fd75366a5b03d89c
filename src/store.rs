//! Record store capability
//!
//! Cross-record rules ("does this id exist", "is this value unique") query
//! persistence through [`RecordStore`]. The engine never owns a connection:
//! the caller injects a store through [`crate::Capabilities`].
//!
//! [`MemoryStore`] is a small in-memory implementation used by the CLI
//! fixtures and by tests.

use std::collections::BTreeMap;
use std::sync::RwLock;

use thiserror::Error;

use crate::value::{params_from_json, Params, Value};

/// Primary key of a stored record.
pub type RecordId = i64;

/// Column holding the primary key in [`MemoryStore`] records.
pub const ID_COLUMN: &str = "id";

/// Store errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Table is not known to the store
    #[error("Unknown table '{0}'")]
    UnknownTable(String),

    /// Store could not be read
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Fixture data is malformed
    #[error("Invalid fixture: {0}")]
    InvalidFixture(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Read access to persisted records.
///
/// Calls are blocking and sequential within one validation pass.
pub trait RecordStore: Send + Sync {
    /// Returns whether a record with the given id exists in `table`.
    fn exists(&self, table: &str, id: RecordId) -> StoreResult<bool>;

    /// Counts records in `table` whose `column` equals `value`, skipping the
    /// record `except` (if any) and requiring every `(column, value)` filter.
    fn count_matching(
        &self,
        table: &str,
        column: &str,
        value: &Value,
        except: Option<RecordId>,
        filters: &[(&str, Value)],
    ) -> StoreResult<u64>;
}

/// In-memory record store
///
/// Tables must be declared (via [`MemoryStore::with_tables`], an insert or a
/// fixture) before they are queried; querying an undeclared table is an error.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<String, BTreeMap<RecordId, Params>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with the given (empty) tables.
    pub fn with_tables(tables: &[&str]) -> Self {
        let store = Self::new();
        if let Ok(mut guard) = store.tables.write() {
            for table in tables {
                guard.entry((*table).to_string()).or_default();
            }
        }
        store
    }

    /// Loads a store from a fixture document:
    /// `{ "<table>": [ { "id": 1, "<column>": <value>, ... }, ... ] }`.
    pub fn from_json(fixture: serde_json::Value) -> StoreResult<Self> {
        let tables = match fixture {
            serde_json::Value::Object(tables) => tables,
            _ => return Err(StoreError::InvalidFixture("expected an object of tables".into())),
        };

        let store = Self::new();
        for (table, rows) in tables {
            let rows = match rows {
                serde_json::Value::Array(rows) => rows,
                _ => {
                    return Err(StoreError::InvalidFixture(format!(
                        "table '{}' must be an array of records",
                        table
                    )))
                }
            };
            store.declare(&table)?;
            for row in rows {
                let record = params_from_json(row).ok_or_else(|| {
                    StoreError::InvalidFixture(format!("table '{}' has a non-object record", table))
                })?;
                let id = record.get(ID_COLUMN).and_then(Value::as_i64).ok_or_else(|| {
                    StoreError::InvalidFixture(format!(
                        "table '{}' has a record without an integer '{}'",
                        table, ID_COLUMN
                    ))
                })?;
                store.insert(&table, id, record)?;
            }
        }
        Ok(store)
    }

    /// Declares an empty table.
    pub fn declare(&self, table: &str) -> StoreResult<()> {
        let mut tables = self.write()?;
        tables.entry(table.to_string()).or_default();
        Ok(())
    }

    /// Inserts or replaces a record. The id is also stored under [`ID_COLUMN`].
    pub fn insert(&self, table: &str, id: RecordId, mut record: Params) -> StoreResult<()> {
        record.insert(ID_COLUMN.to_string(), Value::Int(id));
        let mut tables = self.write()?;
        tables.entry(table.to_string()).or_default().insert(id, record);
        Ok(())
    }

    /// Number of records in a table.
    pub fn len(&self, table: &str) -> StoreResult<usize> {
        let tables = self.read()?;
        tables
            .get(table)
            .map(BTreeMap::len)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }

    fn read(
        &self,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, BTreeMap<String, BTreeMap<RecordId, Params>>>>
    {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }

    fn write(
        &self,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'_, BTreeMap<String, BTreeMap<RecordId, Params>>>>
    {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }
}

impl RecordStore for MemoryStore {
    fn exists(&self, table: &str, id: RecordId) -> StoreResult<bool> {
        let tables = self.read()?;
        let rows = tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        Ok(rows.contains_key(&id))
    }

    fn count_matching(
        &self,
        table: &str,
        column: &str,
        value: &Value,
        except: Option<RecordId>,
        filters: &[(&str, Value)],
    ) -> StoreResult<u64> {
        let tables = self.read()?;
        let rows = tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        let count = rows
            .iter()
            .filter(|(id, _)| Some(**id) != except)
            .filter(|(_, record)| record.get(column) == Some(value))
            .filter(|(_, record)| {
                filters
                    .iter()
                    .all(|(col, expected)| record.get(*col) == Some(expected))
            })
            .count();
        Ok(count as u64)
    }
}
