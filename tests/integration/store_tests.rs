//! Event store integration tests.
//!
//! Tests verify:
//! - Visits survive closing and reopening the database
//! - A domain always lands in the same shard
//! - Domains sharing a shard are counted independently
//! - Rejected visits leave every shard untouched

use std::net::{IpAddr, Ipv4Addr};

use tokio_util::sync::CancellationToken;

use visit_counter::store::shard_for;
use visit_counter::{
    EventStore, QueryEvent, RedbEventStore, ValidationError, VisitCounter, VisitEvent, SHARD_COUNT,
};

use super::test_utils::test_registry;

fn visitor() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(198, 51, 100, 4))
}

async fn record(store: &RedbEventStore, domain: &str, times: usize) {
    let cancel = CancellationToken::new();
    for _ in 0..times {
        store
            .write(&VisitEvent::new(domain, visitor()), &cancel)
            .await
            .unwrap();
    }
}

async fn count(store: &RedbEventStore, domain: &str) -> u64 {
    store
        .count(&QueryEvent::new(domain), &CancellationToken::new())
        .await
        .unwrap()
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_counts_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counter.db");

    {
        let store = RedbEventStore::open(&path).unwrap();
        record(&store, "example.com", 3).await;
        record(&store, "other.org", 1).await;
    }

    let store = RedbEventStore::open(&path).unwrap();
    assert_eq!(count(&store, "example.com").await, 3);
    assert_eq!(count(&store, "other.org").await, 1);
    assert_eq!(count(&store, "never-seen.net").await, 0);

    // Appending after reopen continues the same shard.
    record(&store, "example.com", 2).await;
    assert_eq!(count(&store, "example.com").await, 5);
}

#[tokio::test]
async fn test_domain_stays_in_its_shard() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counter.db");
    let shard = shard_for("example.com");

    {
        let store = RedbEventStore::open(&path).unwrap();
        record(&store, "example.com", 4).await;
    }

    let store = RedbEventStore::open(&path).unwrap();
    record(&store, "example.com", 1).await;

    let sizes = store.shard_sizes().unwrap();
    assert_eq!(sizes.len() as u64, SHARD_COUNT);
    for (index, size) in sizes.iter().enumerate() {
        if index as u64 == shard {
            assert_eq!(*size, 5);
        } else {
            assert_eq!(*size, 0, "shard {} should be empty", index);
        }
    }
}

// =============================================================================
// Shard Collisions
// =============================================================================

#[tokio::test]
async fn test_colliding_domains_counted_separately() {
    let first = "example.com";
    let second = (0..1000)
        .map(|i| format!("site{}.example", i))
        .find(|d| shard_for(d) == shard_for(first))
        .expect("some domain shares a shard with example.com");

    let store = RedbEventStore::in_memory().unwrap();
    record(&store, first, 2).await;
    record(&store, &second, 5).await;

    assert_eq!(count(&store, first).await, 2);
    assert_eq!(count(&store, &second).await, 5);
    assert_eq!(store.shard_len(shard_for(first)).unwrap(), 7);
}

#[tokio::test]
async fn test_count_is_exact_match() {
    let store = RedbEventStore::in_memory().unwrap();
    record(&store, "example.com", 1).await;

    assert_eq!(count(&store, "example.com").await, 1);
    assert_eq!(count(&store, "EXAMPLE.COM").await, 0);
    assert_eq!(count(&store, "www.example.com").await, 0);
}

// =============================================================================
// Rejected Visits
// =============================================================================

#[tokio::test]
async fn test_invalid_add_leaves_store_unchanged() {
    let store = RedbEventStore::in_memory().unwrap();
    let counter = VisitCounter::new(store, test_registry());

    assert_eq!(
        counter.add(Some(visitor()), "").await,
        Err(ValidationError::EmptyDomain)
    );
    assert_eq!(
        counter.add(None, "example.com").await,
        Err(ValidationError::MissingAddress)
    );

    counter.flush().await;
    let sizes = counter.store().shard_sizes().unwrap();
    assert!(sizes.iter().all(|&size| size == 0));
    assert_eq!(counter.count("example.com").await, 0);

    counter.shutdown().await;
}
