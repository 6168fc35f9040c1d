use std::cmp::Ordering;
use std::fmt;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Three-way comparator over index keys. Implementations are passed into the
/// hash table and forwarded to the bucket pages; `Ordering::Equal` means the
/// keys match.
pub trait Comparator<K> {
    fn compare(&self, lhs: &K, rhs: &K) -> Ordering;
}

/// A fixed-size key holding opaque bytes, for indexing values whose native
/// representation has been serialized by the caller.
#[repr(transparent)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenericKey<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> GenericKey<N> {
    /// Creates a new `GenericKey` with zeroed data.
    pub fn new() -> Self {
        Self { data: [0; N] }
    }

    /// Sets the key data from a slice of bytes, truncating or zero-padding
    /// to the key width.
    pub fn set_from_bytes(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(N);
        self.data[..len].copy_from_slice(&bytes[..len]);
        self.data[len..].fill(0);
    }

    /// Returns a reference to the key's byte data.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl<const N: usize> Default for GenericKey<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> From<&[u8]> for GenericKey<N> {
    fn from(bytes: &[u8]) -> Self {
        let mut key = Self::new();
        key.set_from_bytes(bytes);
        key
    }
}

impl<const N: usize> fmt::Debug for GenericKey<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GenericKey{:?}", &self.data)
    }
}

/// Comparator for `GenericKey`, byte-wise.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericComparator<const N: usize>;

impl<const N: usize> GenericComparator<N> {
    pub fn new() -> Self {
        Self
    }
}

impl<const N: usize> Comparator<GenericKey<N>> for GenericComparator<N> {
    fn compare(&self, lhs: &GenericKey<N>, rhs: &GenericKey<N>) -> Ordering {
        lhs.data.cmp(&rhs.data)
    }
}
