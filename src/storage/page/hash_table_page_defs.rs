use crate::common::config::DB_PAGE_SIZE;
use std::mem::size_of;

/// A key/value pair as stored inside a bucket page.
pub type MappingType<K, V> = (K, V);

/// Number of key/value slots a bucket page can hold.
///
/// Each slot costs `size_of::<K>() + size_of::<V>()` bytes of payload plus
/// one bit in each of the occupied and readable bitmaps, i.e. a quarter byte
/// per slot in total:
///
/// `4 * DB_PAGE_SIZE = slots * (4 * pair_size + 1)`
pub const fn bucket_array_size<K, V>() -> usize {
    (4 * DB_PAGE_SIZE) / (4 * (size_of::<K>() + size_of::<V>()) + 1)
}

/// Byte length of one bucket bitmap (occupied or readable).
pub const fn bucket_bitmap_bytes<K, V>() -> usize {
    (bucket_array_size::<K, V>() + 7) / 8
}
