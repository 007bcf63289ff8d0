//! Visit and query records.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded visit to a domain.
///
/// Events are immutable once created; the store appends them and never
/// rewrites or deletes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitEvent {
    /// When the visit was recorded (UTC)
    pub timestamp: DateTime<Utc>,

    /// The referring domain the visit is counted against
    pub domain: String,

    /// Address of the visitor
    pub source_address: IpAddr,
}

impl VisitEvent {
    /// Create an event timestamped now.
    pub fn new(domain: impl Into<String>, source_address: IpAddr) -> Self {
        Self {
            timestamp: Utc::now(),
            domain: domain.into(),
            source_address,
        }
    }

    /// Create an event with an explicit timestamp.
    pub fn at(timestamp: DateTime<Utc>, domain: impl Into<String>, source_address: IpAddr) -> Self {
        Self {
            timestamp,
            domain: domain.into(),
            source_address,
        }
    }
}

/// Describes which events to count. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryEvent {
    /// Exact domain to match
    pub domain: String,
}

impl QueryEvent {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }
}
