use crate::buffer::buffer_pool_manager::BufferPoolManager;
use crate::common::config::{PageId, HASH_TABLE_MAX_DEPTH};
use crate::common::exception::{BufferPoolError, HashTableError};
use crate::concurrency::transaction::Transaction;
use crate::container::hash_function::KeyHasher;
use crate::storage::index::generic_key::Comparator;
use crate::storage::page::hash_table_bucket_page::HashTableBucketPage;
use crate::storage::page::hash_table_directory_page::HashTableDirectoryPage;
use crate::storage::page::page::Page;
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use zerocopy::{FromBytes, Immutable, IntoBytes};

/// Implementation of an extendible hash table backed by a buffer pool
/// manager. Non-unique keys are supported; the exact (key, value) pair must
/// be unique. The table grows and shrinks dynamically as buckets fill up and
/// empty out.
///
/// All structure lives in pages: one directory page owning the mapping from
/// hash prefixes to bucket page ids, and one page per bucket. Every
/// operation fetches the pages it needs from the buffer pool and unpins them
/// before returning, so the table itself carries no cached page state.
pub struct DiskExtendibleHashTable<K, V, C, H> {
    index_name: String,
    bpm: Arc<BufferPoolManager>,
    cmp: C,
    hash_fn: H,
    directory_page_id: PageId,
    bucket_max_size: u32,
    /// Structural modifications take this latch exclusively; lookups share
    /// it.
    table_latch: RwLock<()>,
    _marker: PhantomData<(K, V)>,
}

impl<K, V, C, H> DiskExtendibleHashTable<K, V, C, H>
where
    K: FromBytes + IntoBytes + Immutable + Copy + Debug,
    V: FromBytes + IntoBytes + Immutable + Copy + Debug + PartialEq,
    C: Comparator<K>,
    H: KeyHasher<K>,
{
    /// Creates a new `DiskExtendibleHashTable` with a fresh directory page
    /// and a single empty bucket at depth zero.
    pub fn new(
        name: String,
        bpm: Arc<BufferPoolManager>,
        cmp: C,
        hash_fn: H,
    ) -> Result<Self, HashTableError> {
        Self::with_bucket_max_size(name, bpm, cmp, hash_fn, 0)
    }

    /// Like [`new`](Self::new), but caps every bucket at `bucket_max_size`
    /// slots (zero keeps the capacity derived from the page size). Small
    /// buckets make splits easy to trigger in tests.
    pub fn with_bucket_max_size(
        name: String,
        bpm: Arc<BufferPoolManager>,
        cmp: C,
        hash_fn: H,
        bucket_max_size: u32,
    ) -> Result<Self, HashTableError> {
        let dir_page = bpm.new_page()?;
        let directory_page_id = dir_page.read().get_page_id();

        let bucket_page = match bpm.new_page() {
            Ok(page) => page,
            Err(e) => {
                bpm.unpin_page(directory_page_id, false);
                return Err(e.into());
            }
        };
        let bucket_page_id = bucket_page.read().get_page_id();

        {
            let mut dir_guard = dir_page.write();
            let dir = HashTableDirectoryPage::view_mut(dir_guard.get_data_mut());
            dir.set_page_id(directory_page_id);
            dir.set_bucket_page_id(0, bucket_page_id);
            dir.set_local_depth(0, 0);
        }
        // a fresh page is all zeroes, which is exactly an empty bucket
        bpm.unpin_page(directory_page_id, true);
        bpm.unpin_page(bucket_page_id, false);

        info!(
            "Created extendible hash table '{}' with directory page {}",
            name, directory_page_id
        );
        Ok(Self {
            index_name: name,
            bpm,
            cmp,
            hash_fn,
            directory_page_id,
            bucket_max_size,
            table_latch: RwLock::new(()),
            _marker: PhantomData,
        })
    }

    /// Collects into `result` every value stored under `key`. Returns true
    /// if at least one value was found.
    pub fn get_value(
        &self,
        _transaction: Option<&Transaction>,
        key: &K,
        result: &mut Vec<V>,
    ) -> Result<bool, HashTableError> {
        let _guard = self.table_latch.read();

        let dir_page = self.bpm.fetch_page(self.directory_page_id)?;
        let bucket_page_id = {
            let dir_guard = dir_page.read();
            let dir = HashTableDirectoryPage::view(dir_guard.get_data());
            dir.get_bucket_page_id(self.key_to_directory_index(key, dir))
        };

        let bucket_page = self.fetch_bucket_page(bucket_page_id)?;
        let found = {
            let mut bucket_guard = bucket_page.write();
            let bucket =
                HashTableBucketPage::<K, V>::new(bucket_guard.get_data_mut(), self.bucket_max_size);
            bucket.get_value(key, &self.cmp, result)
        };

        self.unpin(self.directory_page_id, false);
        self.unpin(bucket_page_id, false);
        Ok(found)
    }

    /// Inserts a (key, value) pair. Returns false if the exact pair already
    /// exists, or if the target bucket can no longer split because the
    /// directory is at maximum depth.
    pub fn insert(
        &self,
        _transaction: Option<&Transaction>,
        key: &K,
        value: &V,
    ) -> Result<bool, HashTableError> {
        let _guard = self.table_latch.write();

        // Splitting may need to repeat when every rehashed pair lands back
        // in the overflowing half, so the whole insert runs as a loop under
        // one latch acquisition.
        loop {
            let dir_page = self.bpm.fetch_page(self.directory_page_id)?;
            let (bucket_idx, bucket_page_id) = {
                let dir_guard = dir_page.read();
                let dir = HashTableDirectoryPage::view(dir_guard.get_data());
                let bucket_idx = self.key_to_directory_index(key, dir);
                (bucket_idx, dir.get_bucket_page_id(bucket_idx))
            };

            let bucket_page = self.fetch_bucket_page(bucket_page_id)?;
            {
                let mut bucket_guard = bucket_page.write();
                let mut bucket = HashTableBucketPage::<K, V>::new(
                    bucket_guard.get_data_mut(),
                    self.bucket_max_size,
                );
                if !bucket.is_full() {
                    let inserted = bucket.insert(key, value, &self.cmp);
                    drop(bucket_guard);
                    self.unpin(self.directory_page_id, false);
                    self.unpin(bucket_page_id, inserted);
                    return Ok(inserted);
                }
            }

            // The bucket is full: split it and try again.
            if !self.split_insert(&dir_page, &bucket_page, bucket_idx, bucket_page_id)? {
                return Ok(false);
            }
        }
    }

    /// Removes the exact (key, value) pair. Returns true if a pair was
    /// removed. A bucket left empty by the removal is merged with its split
    /// image when possible.
    pub fn remove(
        &self,
        _transaction: Option<&Transaction>,
        key: &K,
        value: &V,
    ) -> Result<bool, HashTableError> {
        let _guard = self.table_latch.write();

        let dir_page = self.bpm.fetch_page(self.directory_page_id)?;
        let bucket_page_id = {
            let dir_guard = dir_page.read();
            let dir = HashTableDirectoryPage::view(dir_guard.get_data());
            dir.get_bucket_page_id(self.key_to_directory_index(key, dir))
        };

        let bucket_page = self.fetch_bucket_page(bucket_page_id)?;
        let (removed, now_empty) = {
            let mut bucket_guard = bucket_page.write();
            let mut bucket =
                HashTableBucketPage::<K, V>::new(bucket_guard.get_data_mut(), self.bucket_max_size);
            let removed = bucket.remove(key, value, &self.cmp);
            (removed, bucket.is_empty())
        };

        self.unpin(self.directory_page_id, false);
        self.unpin(bucket_page_id, removed);

        if removed && now_empty {
            self.merge(key)?;
        }
        Ok(removed)
    }

    /// Returns the global depth of the directory.
    pub fn get_global_depth(&self) -> Result<u32, HashTableError> {
        let _guard = self.table_latch.read();

        let dir_page = self.bpm.fetch_page(self.directory_page_id)?;
        let global_depth = {
            let dir_guard = dir_page.read();
            HashTableDirectoryPage::view(dir_guard.get_data()).get_global_depth()
        };
        self.unpin(self.directory_page_id, false);
        Ok(global_depth)
    }

    /// Checks the directory's depth invariants, panicking on violation.
    pub fn verify_integrity(&self) -> Result<(), HashTableError> {
        let _guard = self.table_latch.read();

        let dir_page = self.bpm.fetch_page(self.directory_page_id)?;
        {
            let dir_guard = dir_page.read();
            HashTableDirectoryPage::view(dir_guard.get_data()).verify_integrity();
        }
        self.unpin(self.directory_page_id, false);
        Ok(())
    }

    fn hash(&self, key: &K) -> u32 {
        self.hash_fn.get_hash(key) as u32
    }

    fn key_to_directory_index(&self, key: &K, dir: &HashTableDirectoryPage) -> usize {
        (self.hash(key) & dir.get_global_depth_mask()) as usize
    }

    /// Splits the full bucket at `bucket_idx`, raising its local depth and
    /// redistributing its pairs between itself and a freshly allocated split
    /// image. Grows the directory when the new local depth exceeds the
    /// global depth. Consumes the directory and bucket pins on every path.
    ///
    /// Returns false when the bucket sits at the maximum depth and cannot
    /// split, which surfaces as a failed insert.
    fn split_insert(
        &self,
        dir_page: &Arc<RwLock<Page>>,
        bucket_page: &Arc<RwLock<Page>>,
        bucket_idx: usize,
        bucket_page_id: PageId,
    ) -> Result<bool, HashTableError> {
        let mut dir_guard = dir_page.write();

        let local_depth = {
            let dir = HashTableDirectoryPage::view(dir_guard.get_data());
            u32::from(dir.get_local_depth(bucket_idx))
        };
        if local_depth >= HASH_TABLE_MAX_DEPTH {
            warn!(
                "[{}] bucket {} is full at maximum depth {}, insert fails",
                self.index_name, bucket_idx, HASH_TABLE_MAX_DEPTH
            );
            drop(dir_guard);
            self.unpin(self.directory_page_id, false);
            self.unpin(bucket_page_id, false);
            return Ok(false);
        }

        // Allocate the image page before touching the directory so that a
        // failed allocation leaves the table unchanged.
        let image_page = match self.bpm.new_page() {
            Ok(page) => page,
            Err(e) => {
                drop(dir_guard);
                self.unpin(self.directory_page_id, false);
                self.unpin(bucket_page_id, false);
                return Err(e.into());
            }
        };
        let image_page_id = image_page.read().get_page_id();

        let dir = HashTableDirectoryPage::view_mut(dir_guard.get_data_mut());
        dir.incr_local_depth(bucket_idx);
        if u32::from(dir.get_local_depth(bucket_idx)) > dir.get_global_depth() {
            dir.incr_global_depth();
        }
        let new_local_depth = dir.get_local_depth(bucket_idx);
        let image_idx = dir.get_split_image_index(bucket_idx);
        dir.set_bucket_page_id(image_idx, image_page_id);
        dir.set_local_depth(image_idx, new_local_depth);

        // Rehash every live pair: the bit at position new_local_depth - 1
        // decides which half of the old prefix each pair belongs to.
        let mut bucket_guard = bucket_page.write();
        let mut bucket =
            HashTableBucketPage::<K, V>::new(bucket_guard.get_data_mut(), self.bucket_max_size);
        let mut image_guard = image_page.write();
        let mut image =
            HashTableBucketPage::<K, V>::new(image_guard.get_data_mut(), self.bucket_max_size);

        let pairs = bucket.get_kv_pairs();
        bucket.reset();
        let mask = dir.get_local_depth_mask(image_idx);
        for (k, v) in pairs {
            let rehoused = if self.hash(&k) & mask == image_idx as u32 & mask {
                image.insert(&k, &v, &self.cmp)
            } else {
                bucket.insert(&k, &v, &self.cmp)
            };
            assert!(rehoused, "rehashed pair must fit in a freshly split bucket");
        }

        // Redirect every slot that pointed at the old bucket: slots agreeing
        // with the image on the new distinguishing bit move to the image,
        // the rest keep the old page. Both halves get the new local depth.
        let low_bits = u32::from(new_local_depth) - 1;
        let stride_mask = (1usize << low_bits) - 1;
        let image_bit = (image_idx >> low_bits) & 1;
        for slot in 0..dir.size() {
            if slot & stride_mask == bucket_idx & stride_mask {
                if (slot >> low_bits) & 1 == image_bit {
                    dir.set_bucket_page_id(slot, image_page_id);
                } else {
                    dir.set_bucket_page_id(slot, bucket_page_id);
                }
                dir.set_local_depth(slot, new_local_depth);
            }
        }

        debug!(
            "[{}] split bucket {} (page {}) into image {} (page {}) at local depth {}",
            self.index_name, bucket_idx, bucket_page_id, image_idx, image_page_id, new_local_depth
        );

        drop(image_guard);
        drop(bucket_guard);
        drop(dir_guard);
        self.unpin(self.directory_page_id, true);
        self.unpin(bucket_page_id, true);
        self.unpin(image_page_id, true);
        Ok(true)
    }

    /// Fuses the now-empty bucket holding `key` into its split image: the
    /// empty page is deleted, all directory slots that pointed at it are
    /// redirected, and the directory shrinks while every bucket sits below
    /// the global depth.
    ///
    /// The merge aborts without touching anything if the bucket has been
    /// refilled, sits at depth zero, or its image has a different depth.
    /// Only the triggering bucket is merged; an empty image is left for the
    /// next removal to clean up.
    fn merge(&self, key: &K) -> Result<(), HashTableError> {
        let dir_page = self.bpm.fetch_page(self.directory_page_id)?;
        let mut dir_guard = dir_page.write();

        let premise = {
            let dir = HashTableDirectoryPage::view(dir_guard.get_data());
            let bucket_idx = self.key_to_directory_index(key, dir);
            let local_depth = dir.get_local_depth(bucket_idx);
            if local_depth == 0 {
                None // a lone depth-0 bucket has no buddy
            } else {
                let image_idx = dir.get_split_image_index(bucket_idx);
                if dir.get_local_depth(image_idx) != local_depth {
                    None // the buddy has been split further
                } else {
                    Some((bucket_idx, dir.get_bucket_page_id(bucket_idx), image_idx))
                }
            }
        };
        let Some((bucket_idx, bucket_page_id, image_idx)) = premise else {
            drop(dir_guard);
            self.unpin(self.directory_page_id, false);
            return Ok(());
        };

        let bucket_page = match self.bpm.fetch_page(bucket_page_id) {
            Ok(page) => page,
            Err(e) => {
                drop(dir_guard);
                self.unpin(self.directory_page_id, false);
                return Err(e.into());
            }
        };
        let bucket_is_empty = {
            let mut bucket_guard = bucket_page.write();
            let bucket =
                HashTableBucketPage::<K, V>::new(bucket_guard.get_data_mut(), self.bucket_max_size);
            bucket.is_empty()
        };
        if !bucket_is_empty {
            // an insert between the removal and this merge refilled it
            drop(dir_guard);
            self.unpin(self.directory_page_id, false);
            self.unpin(bucket_page_id, false);
            return Ok(());
        }

        // All premises hold. Free the empty page first; the directory is
        // only rewritten once the page is gone.
        self.unpin(bucket_page_id, false);
        if !self.bpm.delete_page(bucket_page_id) {
            drop(dir_guard);
            self.unpin(self.directory_page_id, false);
            return Err(BufferPoolError::PagePinned(bucket_page_id).into());
        }

        let dir = HashTableDirectoryPage::view_mut(dir_guard.get_data_mut());
        let image_page_id = dir.get_bucket_page_id(image_idx);
        dir.set_bucket_page_id(bucket_idx, image_page_id);
        dir.decr_local_depth(bucket_idx);
        dir.decr_local_depth(image_idx);

        // At the decremented depth the old bucket and its image share a
        // prefix, so one congruence sweep repoints every affected slot.
        let new_local_depth = dir.get_local_depth(image_idx);
        let fuse_mask = (1usize << new_local_depth) - 1;
        for slot in 0..dir.size() {
            if slot & fuse_mask == bucket_idx & fuse_mask {
                dir.set_bucket_page_id(slot, image_page_id);
                dir.set_local_depth(slot, new_local_depth);
            }
        }

        // A merge can leave every bucket below the global depth, possibly
        // several levels below it.
        while dir.can_shrink() {
            dir.decr_global_depth();
        }

        debug!(
            "[{}] merged bucket {} (page {}) into image {} (page {}), global depth now {}",
            self.index_name,
            bucket_idx,
            bucket_page_id,
            image_idx,
            image_page_id,
            dir.get_global_depth()
        );

        drop(dir_guard);
        self.unpin(self.directory_page_id, true);
        Ok(())
    }

    /// Fetches a bucket page, releasing the directory pin when the fetch
    /// fails.
    fn fetch_bucket_page(
        &self,
        bucket_page_id: PageId,
    ) -> Result<Arc<RwLock<Page>>, HashTableError> {
        match self.bpm.fetch_page(bucket_page_id) {
            Ok(page) => Ok(page),
            Err(e) => {
                self.unpin(self.directory_page_id, false);
                Err(e.into())
            }
        }
    }

    fn unpin(&self, page_id: PageId, is_dirty: bool) {
        if !self.bpm.unpin_page(page_id, is_dirty) {
            warn!(
                "[{}] buffer pool rejected unpin of page {}",
                self.index_name, page_id
            );
        }
    }
}
