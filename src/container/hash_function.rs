use std::hash::{Hash, Hasher};
use xxhash_rust::xxh3;

/// A hash function over index keys. The table downcasts the 64-bit result
/// to 32 bits for directory indexing.
pub trait KeyHasher<K> {
    fn get_hash(&self, key: &K) -> u64;
}

/// The production hash function, backed by xxh3.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashFunction;

impl HashFunction {
    pub fn new() -> Self {
        Self
    }
}

impl<K: Hash> KeyHasher<K> for HashFunction {
    fn get_hash(&self, key: &K) -> u64 {
        let mut hasher = xxh3::Xxh3::new();
        key.hash(&mut hasher);
        hasher.finish()
    }
}

/// Hashes an integer key to itself. Useful for scripting exact directory
/// layouts, e.g. in tests that steer keys into chosen buckets.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityHashFunction;

impl IdentityHashFunction {
    pub fn new() -> Self {
        Self
    }
}

impl KeyHasher<i32> for IdentityHashFunction {
    fn get_hash(&self, key: &i32) -> u64 {
        *key as u32 as u64
    }
}

impl KeyHasher<u32> for IdentityHashFunction {
    fn get_hash(&self, key: &u32) -> u64 {
        u64::from(*key)
    }
}
