//! chain-dict: a single-threaded hash table keyed by byte strings, with
//! separate chaining, size-class growth and a rewindable cursor.
//!
//! Internal Design:
//!
//! Summary
//! - `Dict<V, S>` owns a bucket array of chain heads and a generational
//!   node arena (`slotmap::SlotMap`). Chains are intrusive: each node
//!   stores the arena key of its successor, so no node is shared and no
//!   chain can form a cycle.
//! - `Cursor` walks bucket index then chain position and can be rewound
//!   for another full pass.
//! - Hashing defaults to Jenkins' one-at-a-time function (`hash` module);
//!   any `BuildHasher` can be plugged in.
//!
//! Constraints
//! - Single-threaded; no interior mutability, no atomics. Callers needing
//!   shared access serialize externally.
//! - Keys are copied into owned `Box<[u8]>` on insert; callers do not have
//!   to keep key buffers alive.
//! - Values are owned and never inspected. Lookups return `Option`, so a
//!   stored value can never be mistaken for "not found".
//! - Every node lives in bucket `hash % capacity`. Each node keeps the hash
//!   computed at insertion, so resizing never calls the hasher.
//!
//! Growth
//! - Capacity is always one entry of a fixed ascending size-class sequence
//!   (`Config`). `set` checks `capacity * load_limit < len + 1` before
//!   anything else and, if crossed, moves one class up with a full relink
//!   of every node. There is no shrink; `pop` and `clear` keep the class.
//! - Running past the last class yields `DictError::CapacityExhausted`.
//!   Allocation failures surface as `DictError::OutOfMemory`. On either
//!   error no entry is added, replaced or removed. A failed resize leaves
//!   the size class unchanged; an `OutOfMemory` on the key copy can follow
//!   a resize that already succeeded.
//!
//! Notes and non-goals
//! - Iteration order is bucket order then chain order; it is not stable
//!   across resizes.
//! - The cursor borrows the table, so mutation during iteration is
//!   rejected at compile time.
//! - No persistence, no concurrent access, no incremental rehash.

mod config;
mod dict;
mod dict_proptest;
mod error;
pub mod hash;

// Public surface
pub use config::{Config, DEFAULT_LOAD_LIMIT, DEFAULT_SIZE_CLASSES};
pub use dict::{Cursor, Dict, Stats};
pub use error::DictError;
pub use hash::{jenkins_hash, key_equals, JenkinsHasher, JenkinsState};
