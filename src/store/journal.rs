//! Durable log of applied transformations, backed by redb.
//!
//! Each committed transformation is appended under the next sequence number
//! as a bincode-encoded [`JournalEntry`]. Undo pops the newest entry.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::change::Transformation;
use crate::error::JournalError;

/// Sequence number → bincode-encoded entry.
const JOURNAL_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("journal");

/// File name of the journal inside the data directory.
pub const JOURNAL_FILE: &str = "journal.redb";

pub type JournalResult<T> = std::result::Result<T, JournalError>;

/// One applied transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub transformation: Transformation,
    pub label: Option<String>,
}

fn redb_err(context: &str, e: impl std::fmt::Display) -> JournalError {
    JournalError::Redb {
        message: format!("{context} failed: {e}"),
    }
}

/// Append-only transformation journal.
pub struct Journal {
    db: Arc<Database>,
}

impl Journal {
    /// Open or create `journal.redb` in the given directory.
    pub fn open(data_dir: &Path) -> JournalResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| JournalError::Redb {
            message: format!("failed to create {}: {e}", data_dir.display()),
        })?;
        let db_path = data_dir.join(JOURNAL_FILE);
        let db = Database::create(&db_path).map_err(|e| JournalError::Redb {
            message: format!("failed to open redb at {}: {e}", db_path.display()),
        })?;

        // Create the table up front so read transactions can always open it.
        let txn = db
            .begin_write()
            .map_err(|e| redb_err("begin_write", e))?;
        txn.open_table(JOURNAL_TABLE)
            .map_err(|e| redb_err("open_table", e))?;
        txn.commit()
            .map_err(|e| redb_err("commit", e))?;

        tracing::debug!(path = %db_path.display(), "opened journal");
        Ok(Self { db: Arc::new(db) })
    }

    /// Append a transformation; returns its sequence number.
    pub fn append(
        &self,
        transformation: &Transformation,
        label: Option<&str>,
    ) -> JournalResult<u64> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| redb_err("begin_write", e))?;
        let seq = {
            let mut table = txn
                .open_table(JOURNAL_TABLE)
                .map_err(|e| redb_err("open_table", e))?;
            let next = table
                .last()
                .map_err(|e| redb_err("last", e))?
                .map(|(k, _)| k.value() + 1)
                .unwrap_or(1);
            let entry = JournalEntry {
                seq: next,
                transformation: transformation.clone(),
                label: label.map(str::to_string),
            };
            let bytes = bincode::serialize(&entry).map_err(|e| JournalError::Serialization {
                message: e.to_string(),
            })?;
            table
                .insert(next, bytes.as_slice())
                .map_err(|e| redb_err("insert", e))?;
            next
        };
        txn.commit()
            .map_err(|e| redb_err("commit", e))?;
        tracing::info!(seq, operations = transformation.operation_count(), "journal entry appended");
        Ok(seq)
    }

    /// The newest entry, if any.
    pub fn last(&self) -> JournalResult<Option<JournalEntry>> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| redb_err("begin_read", e))?;
        let table = txn
            .open_table(JOURNAL_TABLE)
            .map_err(|e| redb_err("open_table", e))?;
        let last = table
            .last()
            .map_err(|e| redb_err("last", e))?;
        last.map(|(_, v)| decode(v.value())).transpose()
    }

    /// Remove and return the newest entry.
    pub fn pop_last(&self) -> JournalResult<JournalEntry> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| redb_err("begin_write", e))?;
        let entry = {
            let mut table = txn
                .open_table(JOURNAL_TABLE)
                .map_err(|e| redb_err("open_table", e))?;
            let (seq, bytes) = {
                let last = table
                    .last()
                    .map_err(|e| redb_err("last", e))?
                    .ok_or(JournalError::Empty)?;
                (last.0.value(), last.1.value().to_vec())
            };
            table
                .remove(seq)
                .map_err(|e| redb_err("remove", e))?;
            decode(&bytes)?
        };
        txn.commit()
            .map_err(|e| redb_err("commit", e))?;
        tracing::info!(seq = entry.seq, "journal entry popped");
        Ok(entry)
    }

    /// Put a popped entry back under its own sequence number.
    pub fn restore(&self, entry: &JournalEntry) -> JournalResult<()> {
        let bytes = bincode::serialize(entry).map_err(|e| JournalError::Serialization {
            message: e.to_string(),
        })?;
        let txn = self
            .db
            .begin_write()
            .map_err(|e| redb_err("begin_write", e))?;
        {
            let mut table = txn
                .open_table(JOURNAL_TABLE)
                .map_err(|e| redb_err("open_table", e))?;
            table
                .insert(entry.seq, bytes.as_slice())
                .map_err(|e| redb_err("insert", e))?;
        }
        txn.commit()
            .map_err(|e| redb_err("commit", e))?;
        tracing::info!(seq = entry.seq, "journal entry restored");
        Ok(())
    }

    /// Drop the entry with sequence number `seq`. Returns whether it existed.
    pub fn remove(&self, seq: u64) -> JournalResult<bool> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| redb_err("begin_write", e))?;
        let existed = {
            let mut table = txn
                .open_table(JOURNAL_TABLE)
                .map_err(|e| redb_err("open_table", e))?;
            let removed = table
                .remove(seq)
                .map_err(|e| redb_err("remove", e))?;
            removed.is_some()
        };
        txn.commit()
            .map_err(|e| redb_err("commit", e))?;
        tracing::info!(seq, existed, "journal entry removed");
        Ok(existed)
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> JournalResult<Vec<JournalEntry>> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| redb_err("begin_read", e))?;
        let table = txn
            .open_table(JOURNAL_TABLE)
            .map_err(|e| redb_err("open_table", e))?;
        let mut entries = Vec::new();
        for item in table
            .iter()
            .map_err(|e| redb_err("iter", e))?
        {
            let (_, v) = item.map_err(|e| redb_err("iter", e))?;
            entries.push(decode(v.value())?);
        }
        Ok(entries)
    }

    /// Number of entries.
    pub fn len(&self) -> JournalResult<usize> {
        self.entries().map(|e| e.len())
    }

    pub fn is_empty(&self) -> JournalResult<bool> {
        self.last().map(|e| e.is_none())
    }
}

fn decode(bytes: &[u8]) -> JournalResult<JournalEntry> {
    bincode::deserialize(bytes).map_err(|e| JournalError::Serialization {
        message: e.to_string(),
    })
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal").finish()
    }
}
