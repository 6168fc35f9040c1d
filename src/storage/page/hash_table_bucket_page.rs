use crate::common::config::PageData;
use crate::storage::index::generic_key::Comparator;
use crate::storage::page::hash_table_page_defs::{
    bucket_array_size, bucket_bitmap_bytes, MappingType,
};
use log::debug;
use std::cmp::Ordering;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::mem::size_of;
use zerocopy::{FromBytes, Immutable, IntoBytes};

/// Bucket page for the extendible hash table. Stores indexed key/value pairs
/// together with two bitmaps; non-unique keys are supported.
///
/// Bucket page format (sizes in bytes, `N = BUCKET_ARRAY_SIZE`):
/// ---------------------------------------------------------------------
/// | Occupied ((N+7)/8) | Readable ((N+7)/8) | KEY(1)+VALUE(1) | ... |
/// ---------------------------------------------------------------------
///
/// A slot with its occupied bit set has held a pair at some point; only the
/// readable bit says whether the pair is live. Clearing readable while
/// leaving occupied behind is how removals tombstone a slot.
///
/// This is a zero-copy view over the raw bytes of a buffer pool page. The
/// capacity is derived from the page and pair sizes but can be capped by the
/// caller to force small buckets in tests.
pub struct HashTableBucketPage<'a, K, V> {
    data: &'a mut PageData,
    max_size: usize,
    _marker: PhantomData<(K, V)>,
}

impl<'a, K, V> HashTableBucketPage<'a, K, V>
where
    K: FromBytes + IntoBytes + Immutable + Copy + Debug,
    V: FromBytes + IntoBytes + Immutable + Copy + Debug + PartialEq,
{
    const BITMAP_BYTES: usize = bucket_bitmap_bytes::<K, V>();
    const PAIR_SIZE: usize = size_of::<K>() + size_of::<V>();

    /// Wraps a page buffer. `bucket_max_size` caps the usable slot count;
    /// zero selects the full derived capacity.
    pub fn new(data: &'a mut PageData, bucket_max_size: u32) -> Self {
        let derived = bucket_array_size::<K, V>();
        let max_size = if bucket_max_size == 0 {
            derived
        } else {
            derived.min(bucket_max_size as usize)
        };
        Self {
            data,
            max_size,
            _marker: PhantomData,
        }
    }

    /// Scans the bucket and collects all values stored under `key`.
    ///
    /// Returns true if at least one value was collected.
    pub fn get_value<C: Comparator<K>>(&self, key: &K, cmp: &C, result: &mut Vec<V>) -> bool {
        let mut found = false;
        for i in 0..self.max_size {
            if self.is_readable(i) && cmp.compare(&self.key_at(i), key) == Ordering::Equal {
                result.push(self.value_at(i));
                found = true;
            }
        }
        found
    }

    /// Attempts to insert a key/value pair.
    ///
    /// Fails if the exact pair is already present, or if no slot with a
    /// clear readable bit remains (tombstoned slots are reused). Distinct
    /// values under the same key are allowed.
    pub fn insert<C: Comparator<K>>(&mut self, key: &K, value: &V, cmp: &C) -> bool {
        let mut free_slot = None;
        for i in 0..self.max_size {
            if self.is_readable(i) {
                if cmp.compare(&self.key_at(i), key) == Ordering::Equal
                    && self.value_at(i) == *value
                {
                    debug!("Duplicate pair for key {:?} rejected", key);
                    return false;
                }
            } else if free_slot.is_none() {
                free_slot = Some(i);
            }
        }
        match free_slot {
            Some(i) => {
                self.put_pair(i, key, value);
                self.set_occupied(i);
                self.set_readable(i);
                true
            }
            None => {
                debug!("Bucket is full, cannot insert key {:?}", key);
                false
            }
        }
    }

    /// Removes the first slot holding exactly `(key, value)`, leaving a
    /// tombstone (occupied stays set). Returns true if a pair was removed.
    pub fn remove<C: Comparator<K>>(&mut self, key: &K, value: &V, cmp: &C) -> bool {
        for i in 0..self.max_size {
            if self.is_readable(i)
                && cmp.compare(&self.key_at(i), key) == Ordering::Equal
                && self.value_at(i) == *value
            {
                self.clear_readable(i);
                return true;
            }
        }
        false
    }

    /// Gets the key at a slot. The slot must hold data, live or tombstoned.
    pub fn key_at(&self, bucket_idx: usize) -> K {
        let start = self.pair_offset(bucket_idx);
        K::read_from_bytes(&self.data[start..start + size_of::<K>()])
            .expect("slot range matches key size")
    }

    /// Gets the value at a slot.
    pub fn value_at(&self, bucket_idx: usize) -> V {
        let start = self.pair_offset(bucket_idx) + size_of::<K>();
        V::read_from_bytes(&self.data[start..start + size_of::<V>()])
            .expect("slot range matches value size")
    }

    /// Returns the live pairs in slot order.
    pub fn get_kv_pairs(&self) -> Vec<MappingType<K, V>> {
        (0..self.max_size)
            .filter(|&i| self.is_readable(i))
            .map(|i| (self.key_at(i), self.value_at(i)))
            .collect()
    }

    /// Clears both bitmaps, discarding every pair and every tombstone.
    pub fn reset(&mut self) {
        self.data[..2 * Self::BITMAP_BYTES].fill(0);
    }

    /// Returns whether the slot has ever held a pair.
    pub fn is_occupied(&self, bucket_idx: usize) -> bool {
        self.data[bucket_idx / 8] & (1 << (bucket_idx % 8)) != 0
    }

    /// Returns whether the slot holds a live pair.
    pub fn is_readable(&self, bucket_idx: usize) -> bool {
        self.data[Self::BITMAP_BYTES + bucket_idx / 8] & (1 << (bucket_idx % 8)) != 0
    }

    /// Returns the number of live pairs.
    pub fn num_readable(&self) -> usize {
        (0..self.max_size).filter(|&i| self.is_readable(i)).count()
    }

    /// Returns whether every usable slot holds a live pair.
    pub fn is_full(&self) -> bool {
        self.num_readable() == self.max_size
    }

    /// Returns whether no slot holds a live pair.
    pub fn is_empty(&self) -> bool {
        self.num_readable() == 0
    }

    /// Returns the number of usable slots.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Prints the bucket's occupancy information, one row per slot.
    pub fn print_bucket(&self) {
        println!(
            "======== BUCKET (size: {} | max_size: {}) ========",
            self.num_readable(),
            self.max_size
        );
        for i in 0..self.max_size {
            if self.is_occupied(i) {
                println!(
                    "| {:>4} | occupied: {} | readable: {} | key: {:?} |",
                    i,
                    self.is_occupied(i),
                    self.is_readable(i),
                    self.key_at(i)
                );
            }
        }
        println!("================ END BUCKET ================");
    }

    fn pair_offset(&self, bucket_idx: usize) -> usize {
        2 * Self::BITMAP_BYTES + bucket_idx * Self::PAIR_SIZE
    }

    fn put_pair(&mut self, bucket_idx: usize, key: &K, value: &V) {
        let start = self.pair_offset(bucket_idx);
        key.write_to(&mut self.data[start..start + size_of::<K>()])
            .expect("slot range matches key size");
        let start = start + size_of::<K>();
        value
            .write_to(&mut self.data[start..start + size_of::<V>()])
            .expect("slot range matches value size");
    }

    fn set_occupied(&mut self, bucket_idx: usize) {
        self.data[bucket_idx / 8] |= 1 << (bucket_idx % 8);
    }

    fn set_readable(&mut self, bucket_idx: usize) {
        self.data[Self::BITMAP_BYTES + bucket_idx / 8] |= 1 << (bucket_idx % 8);
    }

    fn clear_readable(&mut self, bucket_idx: usize) {
        self.data[Self::BITMAP_BYTES + bucket_idx / 8] &= !(1 << (bucket_idx % 8));
    }
}
