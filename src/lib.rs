//! bucket-hashmap: a single-threaded hash map with a fixed number of
//! buckets, separate chaining, and positional handles that can be reused to
//! reach an entry again without re-hashing.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a small building block for networking code that maps identifiers
//!   (peer GUIDs, addresses) to per-peer data, where the table size is known
//!   up front and entries are frequently re-visited.
//! - Layers:
//!   - `Table` (private): the bucket array and a `slotmap` arena of nodes.
//!     Knows nothing about hashing.
//!   - `BucketHashMap<K, V, N, S>`: hashes keys with `S: BuildHasher`, picks
//!     `hash % N`, and drives `Table` under a debug reentrancy check.
//!   - `Position`: `(bucket, ordinal)` plus the bucket generation it was read
//!     at; resolved by walking `ordinal` links from the bucket head.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (no atomics, no locks).
//! - `N` is fixed for the map's lifetime; there is no rehashing, so the load
//!   factor grows without bound as entries are pushed. `load_factor()` and
//!   `longest_chain()` make that observable.
//! - Duplicate keys are allowed; key-based operations act on the first match
//!   in chain order, which is the most recently pushed among duplicates.
//! - The bucket array is allocated by the first `push` and released by
//!   `clear()`. Failed lookups never allocate.
//!
//! Positions
//! - A `Position` is positional, not an identity. Every push into a bucket and
//!   every removal from it issues a new generation stamp for that bucket, and
//!   positions carrying an older stamp are rejected (`None`, `false`, or a
//!   `PositionError`). Stamps come from a thread-wide counter shared by all
//!   maps and never reset, so old positions never alias new entries, and a
//!   position never resolves on a map other than its own.
//!
//! Failure semantics
//! - Absence is reported with `Option`/`bool`. The only error type,
//!   `PositionError`, explains why a position did not resolve.
//!
//! Reentrancy policy
//! - The map calls user code only through `K: Hash` and `K: Eq` while
//!   walking a chain. A debug-only check at each entry point panics if that
//!   code re-enters the same map. Removed keys and values are handed back
//!   (or dropped) only after the structure is consistent again.

pub mod bucket_hash_map;
mod bucket_hash_map_proptest;
pub mod identity;
pub mod position;
mod reentrancy;

// Public surface
pub use bucket_hash_map::{BucketHashMap, Iter, IterMut};
pub use identity::{IdentityBuildHasher, IdentityHasher};
pub use position::{Position, PositionError};
