//! Fast hash map and hash set type aliases.
//!
//! Every table in the resolution engine is keyed by class or token identity,
//! which hashes down to a single `u64`. The Fx hash function from
//! `rustc-hash` is a good fit for that: it is cheap for small integer keys
//! and denial-of-service resistance is irrelevant for test tooling.
//!
//! # Examples
//!
//! ```
//! use nm_core::{FxHashMap, FxHashSet, fx_hash_map, fx_hash_set};
//!
//! let mut map: FxHashMap<u64, &str> = fx_hash_map();
//! map.insert(7, "AppModule");
//!
//! let set: FxHashSet<u64> = fx_hash_set();
//! assert!(set.is_empty());
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new empty [`FxHashMap`].
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxHashSet`].
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}
