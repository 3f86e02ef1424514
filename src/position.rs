//! Positional handles into a `BucketHashMap` and the errors raised when one
//! no longer lines up with the map.

use crate::bucket_hash_map::BucketHashMap;

/// A `(bucket, ordinal)` pair naming one entry of a `BucketHashMap`.
///
/// A position is not an identity: it names "the entry `ordinal` links down
/// the chain of `bucket`". It also carries the bucket's generation stamp as
/// of when it was produced. Any push into or removal from that bucket issues
/// a new stamp, after which the position is stale and every map method
/// rejects it. Mutations of other buckets, and in-place value updates, leave
/// it valid. Positions from before a `clear()` never resolve afterwards.
///
/// Stamps are drawn from a counter shared by every map on the thread, so a
/// position handed to a map other than the one that produced it fails the
/// stamp check instead of reaching a foreign entry.
/// The one exception is a bucket index the other map does not have, which
/// reports `PositionError::BucketOutOfRange`. `PositionError::OrdinalOutOfRange`
/// backs up the stamp check and is not reachable through positions the map
/// itself handed out.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Position {
    bucket: usize,
    ordinal: usize,
    generation: u64,
}

impl Position {
    pub(crate) fn new(bucket: usize, ordinal: usize, generation: u64) -> Self {
        Position {
            bucket,
            ordinal,
            generation,
        }
    }

    /// Index of the bucket holding the entry, in `[0, N)`.
    pub fn primary_index(&self) -> usize {
        self.bucket
    }

    /// Zero-based distance of the entry from the head of its chain.
    pub fn secondary_index(&self) -> usize {
        self.ordinal
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub fn key<'a, K, V, const N: usize, S>(
        &self,
        map: &'a BucketHashMap<K, V, N, S>,
    ) -> Option<&'a K> {
        map.key_at(*self)
    }

    pub fn value<'a, K, V, const N: usize, S>(
        &self,
        map: &'a BucketHashMap<K, V, N, S>,
    ) -> Option<&'a V> {
        map.value_at(*self)
    }

    pub fn value_mut<'a, K, V, const N: usize, S>(
        &self,
        map: &'a mut BucketHashMap<K, V, N, S>,
    ) -> Option<&'a mut V> {
        map.value_at_mut(*self)
    }
}

/// Why a `Position` could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("map has no bucket array (never pushed to, or cleared)")]
    Unallocated,
    #[error("bucket {bucket} is out of range for a map with {buckets} buckets")]
    BucketOutOfRange { bucket: usize, buckets: usize },
    #[error("bucket {bucket} was modified after the position was taken")]
    Stale { bucket: usize },
    #[error("ordinal {ordinal} is past the end of a chain of length {len}")]
    OrdinalOutOfRange { ordinal: usize, len: usize },
}
