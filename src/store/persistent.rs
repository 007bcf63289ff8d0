//! redb-backed event store.
//!
//! # Layout
//!
//! One database file holds up to [`SHARD_COUNT`] tables, one per shard, named
//! by the hex of the shard's 8-byte big-endian index. Each table maps an
//! 8-byte big-endian sequence number to a JSON-encoded [`VisitEvent`].
//!
//! Shard tables are created lazily on first write. Sequence numbers start at
//! 1 and are assigned as `last key + 1` inside the write transaction, so they
//! stay monotonic per shard.
//!
//! redb allows one write transaction at a time and gives readers MVCC
//! snapshots: a count never observes a half-applied write, and a count can
//! run while the worker is writing.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition, TableError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::StorageError;

use super::backend::EventStore;
use super::event::{QueryEvent, VisitEvent};
use super::shard::{decode_key, encode_key, shard_for, table_name, SHARD_COUNT};

type ShardTable<'a> = TableDefinition<'a, &'static [u8], &'static [u8]>;

fn shard_table(name: &str) -> ShardTable<'_> {
    TableDefinition::new(name)
}

fn sequence_of(shard: u64, key: &[u8]) -> Result<u64, StorageError> {
    let bytes: [u8; 8] = key.try_into().map_err(|_| StorageError::Decode {
        shard,
        sequence: 0,
        message: format!("malformed sequence key of {} bytes", key.len()),
    })?;
    Ok(decode_key(bytes))
}

/// Persistent [`EventStore`] backed by a single redb file.
#[derive(Clone)]
pub struct RedbEventStore {
    db: Arc<Database>,
}

impl RedbEventStore {
    /// Open the store at `path`, creating the file if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path).map_err(StorageError::database)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Create a store that lives only in memory.
    pub fn in_memory() -> Result<Self, StorageError> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(StorageError::database)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Number of records stored in a shard (0 if the shard was never written).
    pub fn shard_len(&self, shard: u64) -> Result<u64, StorageError> {
        let name = table_name(shard);
        let txn = self.db.begin_read().map_err(StorageError::database)?;
        let table = match txn.open_table(shard_table(&name)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(0),
            Err(e) => return Err(StorageError::database(e)),
        };
        table.len().map_err(StorageError::database)
    }

    /// Record counts for every shard, indexed by shard.
    pub fn shard_sizes(&self) -> Result<Vec<u64>, StorageError> {
        (0..SHARD_COUNT).map(|shard| self.shard_len(shard)).collect()
    }
}

fn write_blocking(
    db: &Database,
    shard: u64,
    payload: &[u8],
    cancel: &CancellationToken,
) -> Result<u64, StorageError> {
    let name = table_name(shard);
    let txn = db.begin_write().map_err(StorageError::database)?;

    let sequence = {
        let mut table = txn
            .open_table(shard_table(&name))
            .map_err(StorageError::database)?;

        let next = match table.last().map_err(StorageError::database)? {
            Some((key, _)) => sequence_of(shard, key.value())? + 1,
            None => 1,
        };

        table
            .insert(encode_key(next).as_slice(), payload)
            .map_err(StorageError::database)?;
        next
    };

    // Last chance to back out: after commit the write is durable.
    if cancel.is_cancelled() {
        txn.abort().map_err(StorageError::database)?;
        return Err(StorageError::Cancelled);
    }

    txn.commit().map_err(StorageError::database)?;
    Ok(sequence)
}

fn count_blocking(
    db: &Database,
    shard: u64,
    domain: &str,
    cancel: &CancellationToken,
) -> Result<u64, StorageError> {
    let name = table_name(shard);
    let txn = db.begin_read().map_err(StorageError::database)?;

    let table = match txn.open_table(shard_table(&name)) {
        Ok(table) => table,
        // Nothing was ever written for any domain hashing here.
        Err(TableError::TableDoesNotExist(_)) => return Ok(0),
        Err(e) => return Err(StorageError::database(e)),
    };

    let mut count = 0;
    for entry in table.iter().map_err(StorageError::database)? {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }

        let (key, value) = entry.map_err(StorageError::database)?;
        let event: VisitEvent =
            serde_json::from_slice(value.value()).map_err(|e| StorageError::Decode {
                shard,
                sequence: sequence_of(shard, key.value()).unwrap_or(0),
                message: e.to_string(),
            })?;

        // Shards are shared by colliding domains; match exactly.
        if event.domain == domain {
            count += 1;
        }
    }

    Ok(count)
}

#[async_trait]
impl EventStore for RedbEventStore {
    async fn write(
        &self,
        event: &VisitEvent,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }

        let payload =
            serde_json::to_vec(event).map_err(|e| StorageError::Encode(e.to_string()))?;
        let shard = shard_for(&event.domain);

        let db = Arc::clone(&self.db);
        let token = cancel.clone();
        let sequence =
            tokio::task::spawn_blocking(move || write_blocking(&db, shard, &payload, &token))
                .await
                .map_err(|e| StorageError::TaskFailed(e.to_string()))??;

        debug!(
            domain = %event.domain,
            shard,
            sequence,
            "Persisted visit event"
        );
        Ok(())
    }

    async fn count(
        &self,
        query: &QueryEvent,
        cancel: &CancellationToken,
    ) -> Result<u64, StorageError> {
        if query.domain.is_empty() {
            return Err(StorageError::EmptyDomain);
        }
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }

        let shard = shard_for(&query.domain);
        let domain = query.domain.clone();
        let db = Arc::clone(&self.db);
        let token = cancel.clone();

        tokio::task::spawn_blocking(move || count_blocking(&db, shard, &domain, &token))
            .await
            .map_err(|e| StorageError::TaskFailed(e.to_string()))?
    }
}
