use crate::buffer::lru_k_replacer::{AccessType, LRUKReplacer};
use crate::common::config::{FrameId, PageData, PageId, DB_PAGE_SIZE, INVALID_PAGE_ID};
use crate::common::exception::BufferPoolError;
use crate::storage::disk::disk_scheduler::DiskScheduler;
use crate::storage::page::page::Page;
use log::{debug, trace};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// The `BufferPoolManager` caches disk pages in a fixed set of in-memory
/// frames. Pages are pinned while in use; an unpinned page becomes a
/// candidate for eviction through the LRU-K replacer. Dirty pages are
/// written back before their frame is reused.
pub struct BufferPoolManager {
    pool_size: usize,
    next_page_id: AtomicU32,
    /// One entry per frame; a frame's page id is `INVALID_PAGE_ID` while the
    /// frame is unused.
    frames: Vec<Arc<RwLock<Page>>>,
    /// Page table plus free list, guarded together.
    inner: Mutex<BufferPoolInner>,
    replacer: Arc<Mutex<LRUKReplacer>>,
    disk_scheduler: Arc<DiskScheduler>,
}

struct BufferPoolInner {
    page_table: HashMap<PageId, FrameId>,
    free_list: Vec<FrameId>,
}

impl BufferPoolManager {
    /// Creates a new `BufferPoolManager`.
    ///
    /// # Arguments
    ///
    /// * `pool_size`: the number of frames in the buffer pool
    /// * `disk_scheduler`: the disk scheduler used for all page I/O
    /// * `replacer`: the LRU-K replacer deciding eviction victims
    pub fn new(
        pool_size: usize,
        disk_scheduler: Arc<DiskScheduler>,
        replacer: Arc<Mutex<LRUKReplacer>>,
    ) -> Self {
        let frames = (0..pool_size)
            .map(|_| Arc::new(RwLock::new(Page::new(INVALID_PAGE_ID))))
            .collect();
        let free_list: Vec<FrameId> = (0..pool_size).rev().collect();
        Self {
            pool_size,
            next_page_id: AtomicU32::new(0),
            frames,
            inner: Mutex::new(BufferPoolInner {
                page_table: HashMap::new(),
                free_list,
            }),
            replacer,
            disk_scheduler,
        }
    }

    pub fn get_pool_size(&self) -> usize {
        self.pool_size
    }

    /// Creates a new page in the buffer pool, pinned once. Fails with
    /// `PoolExhausted` when every frame is pinned.
    pub fn new_page(&self) -> Result<Arc<RwLock<Page>>, BufferPoolError> {
        let mut inner = self.inner.lock();
        let frame_id = self.acquire_frame(&mut inner)?;

        let page_id = self.next_page_id.fetch_add(1, Ordering::SeqCst);
        {
            let mut page = self.frames[frame_id].write();
            page.reset_for(page_id);
            page.set_pin_count(1);
        }
        inner.page_table.insert(page_id, frame_id);
        drop(inner);

        let mut replacer = self.replacer.lock();
        replacer.record_access(frame_id, AccessType::Lookup);
        replacer.set_evictable(frame_id, false);
        drop(replacer);

        debug!("Created new page {} in frame {}", page_id, frame_id);
        Ok(Arc::clone(&self.frames[frame_id]))
    }

    /// Fetches the requested page, pinning it. The page is read from disk if
    /// it is not resident.
    pub fn fetch_page(&self, page_id: PageId) -> Result<Arc<RwLock<Page>>, BufferPoolError> {
        let mut inner = self.inner.lock();

        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            self.frames[frame_id].write().increment_pin_count();
            drop(inner);

            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id, AccessType::Lookup);
            replacer.set_evictable(frame_id, false);
            drop(replacer);

            trace!("Fetched resident page {} from frame {}", page_id, frame_id);
            return Ok(Arc::clone(&self.frames[frame_id]));
        }

        let frame_id = self.acquire_frame(&mut inner)?;
        let data = self
            .disk_scheduler
            .schedule_read(page_id)
            .blocking_recv()
            .map_err(|_| BufferPoolError::SchedulerDisconnected(page_id))??;

        {
            let mut page = self.frames[frame_id].write();
            page.reset_for(page_id);
            page.get_data_mut().copy_from_slice(&data[..]);
            page.set_pin_count(1);
        }
        inner.page_table.insert(page_id, frame_id);
        drop(inner);

        let mut replacer = self.replacer.lock();
        replacer.record_access(frame_id, AccessType::Lookup);
        replacer.set_evictable(frame_id, false);
        drop(replacer);

        debug!("Fetched page {} from disk into frame {}", page_id, frame_id);
        Ok(Arc::clone(&self.frames[frame_id]))
    }

    /// Unpins a page, recording dirtiness. Returns false if the page is not
    /// resident or not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let inner = self.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return false;
        };

        let mut page = self.frames[frame_id].write();
        if page.get_pin_count() == 0 {
            return false;
        }
        page.decrement_pin_count();
        if is_dirty {
            page.set_dirty(true);
        }
        let unpinned = page.get_pin_count() == 0;
        drop(page);
        drop(inner);

        if unpinned {
            self.replacer.lock().set_evictable(frame_id, true);
        }
        true
    }

    /// Deletes a page from the buffer pool, releasing its frame. Deleting a
    /// page that is not resident is a no-op returning true; a pinned page
    /// cannot be deleted.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let mut inner = self.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return true;
        };

        let mut page = self.frames[frame_id].write();
        if page.get_pin_count() > 0 {
            debug!("Cannot delete pinned page {}", page_id);
            return false;
        }
        page.reset();
        drop(page);

        inner.page_table.remove(&page_id);
        inner.free_list.push(frame_id);
        drop(inner);

        self.replacer.lock().remove(frame_id);
        debug!("Deleted page {} from frame {}", page_id, frame_id);
        true
    }

    /// Writes a page back to disk regardless of its pin count and clears its
    /// dirty flag. Returns false if the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool, BufferPoolError> {
        let inner = self.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(false);
        };
        let mut page = self.frames[frame_id].write();
        self.write_back(page_id, page.get_data())?;
        page.set_dirty(false);
        Ok(true)
    }

    /// Flushes every resident page.
    pub fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        let page_ids: Vec<PageId> = {
            let inner = self.inner.lock();
            inner.page_table.keys().copied().collect()
        };
        for page_id in page_ids {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Returns the pin count of a resident page, for pin-parity checks.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let inner = self.inner.lock();
        let &frame_id = inner.page_table.get(&page_id)?;
        Some(self.frames[frame_id].read().get_pin_count())
    }

    /// Returns the number of resident pages with a nonzero pin count.
    pub fn pinned_page_count(&self) -> usize {
        let inner = self.inner.lock();
        inner
            .page_table
            .values()
            .filter(|&&frame_id| self.frames[frame_id].read().get_pin_count() > 0)
            .count()
    }

    /// Finds a usable frame: the free list first, then an eviction victim.
    /// A dirty victim is written back before the frame is handed out.
    fn acquire_frame(&self, inner: &mut BufferPoolInner) -> Result<FrameId, BufferPoolError> {
        if let Some(frame_id) = inner.free_list.pop() {
            return Ok(frame_id);
        }

        let frame_id = self
            .replacer
            .lock()
            .evict()
            .ok_or(BufferPoolError::PoolExhausted)?;

        let mut page = self.frames[frame_id].write();
        let old_page_id = page.get_page_id();
        if old_page_id != INVALID_PAGE_ID {
            if page.is_dirty() {
                self.write_back(old_page_id, page.get_data())?;
            }
            inner.page_table.remove(&old_page_id);
            page.reset();
            debug!("Evicted page {} from frame {}", old_page_id, frame_id);
        }
        Ok(frame_id)
    }

    fn write_back(&self, page_id: PageId, data: &PageData) -> Result<(), BufferPoolError> {
        let mut buffer = Box::new([0u8; DB_PAGE_SIZE]);
        buffer.copy_from_slice(data);
        self.disk_scheduler
            .schedule_write(page_id, buffer)
            .blocking_recv()
            .map_err(|_| BufferPoolError::SchedulerDisconnected(page_id))??;
        Ok(())
    }
}
