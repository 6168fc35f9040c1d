use crate::common::config::{PageId, DIRECTORY_ARRAY_SIZE, HASH_TABLE_MAX_DEPTH};
use log::warn;
use std::collections::HashMap;
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Directory page for the extendible hash table.
///
/// Directory format (size in bytes):
/// ---------------------------------------------------------------------------
/// | GlobalDepth (4) | PageId (4) | BucketPageIds (2048) | LocalDepths (512) |
/// ---------------------------------------------------------------------------
///
/// The struct is a zero-copy view: it is never constructed directly, only
/// obtained through [`view`](Self::view) / [`view_mut`](Self::view_mut) over
/// the raw bytes of a page held by the buffer pool.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
pub struct HashTableDirectoryPage {
    global_depth: U32,
    directory_page_id: U32,
    bucket_page_ids: [U32; DIRECTORY_ARRAY_SIZE],
    local_depths: [u8; DIRECTORY_ARRAY_SIZE],
}

impl HashTableDirectoryPage {
    /// Reinterprets the leading bytes of a page buffer as a directory page.
    pub fn view(data: &[u8]) -> &Self {
        Self::ref_from_prefix(data)
            .expect("page buffer holds a directory page")
            .0
    }

    pub fn view_mut(data: &mut [u8]) -> &mut Self {
        Self::mut_from_prefix(data)
            .expect("page buffer holds a directory page")
            .0
    }

    /// Returns the page id of this directory page.
    pub fn get_page_id(&self) -> PageId {
        self.directory_page_id.get()
    }

    pub fn set_page_id(&mut self, page_id: PageId) {
        self.directory_page_id.set(page_id);
    }

    /// Looks up the bucket page id stored at a directory index.
    pub fn get_bucket_page_id(&self, bucket_idx: usize) -> PageId {
        self.bucket_page_ids[bucket_idx].get()
    }

    /// Updates the directory entry at `bucket_idx` to point at
    /// `bucket_page_id`.
    pub fn set_bucket_page_id(&mut self, bucket_idx: usize, bucket_page_id: PageId) {
        self.bucket_page_ids[bucket_idx].set(bucket_page_id);
    }

    /// Gets the split image of an index: the buddy slot obtained by toggling
    /// the highest bit covered by the slot's local depth.
    ///
    /// Callers must ensure the local depth at `bucket_idx` is nonzero.
    pub fn get_split_image_index(&self, bucket_idx: usize) -> usize {
        let local_depth = u32::from(self.local_depths[bucket_idx]);
        debug_assert!(local_depth > 0, "split image undefined at local depth 0");
        bucket_idx ^ (1 << (local_depth - 1))
    }

    /// Returns a mask of global-depth 1's and the rest 0's.
    pub fn get_global_depth_mask(&self) -> u32 {
        (1 << self.global_depth.get()) - 1
    }

    /// Returns a mask of local-depth 1's for the bucket at `bucket_idx`.
    pub fn get_local_depth_mask(&self, bucket_idx: usize) -> u32 {
        (1u32 << self.local_depths[bucket_idx]) - 1
    }

    /// Returns the global depth of the directory.
    pub fn get_global_depth(&self) -> u32 {
        self.global_depth.get()
    }

    /// Increments the global depth, doubling the directory. The new upper
    /// half duplicates the existing entries so that every slot keeps pointing
    /// at the bucket its low bits select.
    pub fn incr_global_depth(&mut self) {
        let global_depth = self.global_depth.get();
        assert!(
            global_depth < HASH_TABLE_MAX_DEPTH,
            "directory cannot grow past max depth {HASH_TABLE_MAX_DEPTH}"
        );
        let old_size = self.size();
        for i in 0..old_size {
            self.bucket_page_ids[old_size + i] = self.bucket_page_ids[i];
            self.local_depths[old_size + i] = self.local_depths[i];
        }
        self.global_depth.set(global_depth + 1);
    }

    /// Decrements the global depth, halving the directory.
    pub fn decr_global_depth(&mut self) {
        let global_depth = self.global_depth.get();
        if global_depth == 0 {
            warn!("Global depth is already at zero");
        } else {
            self.global_depth.set(global_depth - 1);
        }
    }

    /// Returns true if the directory can be shrunk: the global depth is
    /// positive and no bucket sits at the maximum (global) depth.
    pub fn can_shrink(&self) -> bool {
        let global_depth = self.global_depth.get();
        if global_depth == 0 {
            return false;
        }
        self.local_depths[..self.size()]
            .iter()
            .all(|&local_depth| u32::from(local_depth) < global_depth)
    }

    /// Returns the current directory size, `2^global_depth`.
    pub fn size(&self) -> usize {
        1 << self.global_depth.get()
    }

    /// Gets the local depth of the bucket at `bucket_idx`.
    pub fn get_local_depth(&self, bucket_idx: usize) -> u8 {
        self.local_depths[bucket_idx]
    }

    /// Sets the local depth of the bucket at `bucket_idx`.
    pub fn set_local_depth(&mut self, bucket_idx: usize, local_depth: u8) {
        self.local_depths[bucket_idx] = local_depth;
    }

    /// Increments the local depth of the bucket at `bucket_idx`.
    pub fn incr_local_depth(&mut self, bucket_idx: usize) {
        self.local_depths[bucket_idx] += 1;
    }

    /// Decrements the local depth of the bucket at `bucket_idx`.
    pub fn decr_local_depth(&mut self, bucket_idx: usize) {
        self.local_depths[bucket_idx] -= 1;
    }

    /// Verifies the integrity of the directory:
    ///
    /// 1. All local depths are less than or equal to the global depth.
    /// 2. Each bucket has precisely `2^(global_depth - local_depth)` pointers
    ///    pointing to it.
    /// 3. The local depth is the same at each index with the same bucket
    ///    page id.
    ///
    /// Panics on violation; a broken directory is a programming error, not a
    /// runtime condition.
    pub fn verify_integrity(&self) {
        let size = self.size();
        let global_depth = self.global_depth.get();
        assert_eq!(size, 1 << global_depth);

        let mut page_id_counts: HashMap<PageId, usize> = HashMap::new();
        let mut page_id_depths: HashMap<PageId, u8> = HashMap::new();

        for bucket_idx in 0..size {
            let local_depth = self.local_depths[bucket_idx];
            assert!(
                u32::from(local_depth) <= global_depth,
                "local depth {local_depth} exceeds global depth {global_depth} at index {bucket_idx}"
            );

            let page_id = self.get_bucket_page_id(bucket_idx);
            *page_id_counts.entry(page_id).or_insert(0) += 1;
            match page_id_depths.get(&page_id) {
                Some(&depth) => assert_eq!(
                    depth, local_depth,
                    "local depth mismatch for page {page_id} at index {bucket_idx}"
                ),
                None => {
                    page_id_depths.insert(page_id, local_depth);
                }
            }
        }

        for (page_id, count) in &page_id_counts {
            let local_depth = u32::from(page_id_depths[page_id]);
            let expected = 1usize << (global_depth - local_depth);
            assert_eq!(
                *count, expected,
                "page {page_id} is referenced {count} times, expected {expected}"
            );
        }
    }

    /// Prints the current directory, one row per slot.
    pub fn print_directory(&self) {
        println!(
            "======== DIRECTORY (size: {} | global_depth: {}) ========",
            self.size(),
            self.global_depth.get()
        );
        println!("| bucket_idx | page_id | local_depth |");
        for bucket_idx in 0..self.size() {
            println!(
                "| {:>10} | {:>7} | {:>11} |",
                bucket_idx,
                self.get_bucket_page_id(bucket_idx),
                self.local_depths[bucket_idx]
            );
        }
        println!("================ END DIRECTORY ================");
    }
}
