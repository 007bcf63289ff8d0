//! Shard placement and key encoding.
//!
//! A domain's shard is `crc32(domain) % SHARD_COUNT`. The hash must never
//! change: shard placement of existing records depends on it.

/// Number of fixed shards in a store.
pub const SHARD_COUNT: u64 = 10;

/// Shard index for a domain.
#[inline]
pub fn shard_for(domain: &str) -> u64 {
    u64::from(crc32fast::hash(domain.as_bytes())) % SHARD_COUNT
}

/// 8-byte big-endian encoding of a shard index or sequence number.
///
/// Big-endian keeps lexicographic key order equal to numeric order.
#[inline]
pub fn encode_key(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

#[inline]
pub fn decode_key(key: [u8; 8]) -> u64 {
    u64::from_be_bytes(key)
}

/// Table name for a shard: `shard-` followed by the hex of its 8-byte key.
pub fn table_name(shard: u64) -> String {
    format!("shard-{}", hex::encode(encode_key(shard)))
}
