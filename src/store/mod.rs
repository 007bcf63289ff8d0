//! Event store layer.
//!
//! Visits are appended to one of [`SHARD_COUNT`] shards chosen by a stable
//! hash of the domain. Counting a domain scans its whole shard and filters by
//! exact domain match:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         EventStore trait                │
//! │   write(event, cancel)                  │
//! │   count(query, cancel)                  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           RedbEventStore                │
//! │  shard = crc32(domain) % 10             │
//! │  shard-00..09 tables: seq → JSON event  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The count is O(events in shard), not O(events for domain). Writes stay a
//! single append with no secondary index to maintain.

mod backend;
mod event;
mod persistent;
mod shard;

pub use backend::EventStore;
pub use event::{QueryEvent, VisitEvent};
pub use persistent::RedbEventStore;
pub use shard::{decode_key, encode_key, shard_for, table_name, SHARD_COUNT};
