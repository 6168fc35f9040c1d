use crate::common::config::{PageData, PageId, DB_PAGE_SIZE, INVALID_PAGE_ID};
use log::error;

/// Page is the basic unit of storage within the system. It wraps the raw byte
/// buffer that is read from and written to disk, together with the
/// book-keeping information used by the buffer pool manager: pin count, dirty
/// flag and page id.
#[derive(Debug)]
pub struct Page {
    /// The actual data held by this page.
    data: Box<PageData>,
    /// The ID of this page, `INVALID_PAGE_ID` while the frame is unused.
    page_id: PageId,
    /// The pin count of this page.
    pin_count: u32,
    /// True if the in-memory bytes differ from what is on disk.
    is_dirty: bool,
}

impl Page {
    /// Constructor. Zeroes out the page data.
    pub fn new(page_id: PageId) -> Self {
        Self {
            data: Box::new([0; DB_PAGE_SIZE]),
            page_id,
            pin_count: 0,
            is_dirty: false,
        }
    }

    /// Returns the page id of this page.
    pub fn get_page_id(&self) -> PageId {
        self.page_id
    }

    pub fn set_page_id(&mut self, page_id: PageId) {
        self.page_id = page_id;
    }

    /// Returns true if the page has been modified since it was last flushed.
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn set_dirty(&mut self, is_dirty: bool) {
        self.is_dirty = is_dirty;
    }

    /// Returns the pin count of this page.
    pub fn get_pin_count(&self) -> u32 {
        self.pin_count
    }

    pub fn set_pin_count(&mut self, pin_count: u32) {
        self.pin_count = pin_count;
    }

    pub fn increment_pin_count(&mut self) {
        self.pin_count += 1;
    }

    pub fn decrement_pin_count(&mut self) {
        if self.pin_count > 0 {
            self.pin_count -= 1;
        } else {
            error!(
                "Attempted to decrement pin count below 0 for page {}",
                self.page_id
            );
        }
    }

    /// Returns an immutable reference to the page data.
    pub fn get_data(&self) -> &PageData {
        &self.data
    }

    /// Returns a mutable reference to the page data.
    pub fn get_data_mut(&mut self) -> &mut PageData {
        &mut self.data
    }

    /// Zeroes out the data held within the page.
    pub fn reset_memory(&mut self) {
        self.data.fill(0);
    }

    /// Reinitializes the frame for a new resident page: zeroed data, clean,
    /// unpinned.
    pub fn reset_for(&mut self, page_id: PageId) {
        self.reset_memory();
        self.page_id = page_id;
        self.pin_count = 0;
        self.is_dirty = false;
    }

    /// Releases the frame back to an unused state.
    pub fn reset(&mut self) {
        self.reset_for(INVALID_PAGE_ID);
    }
}
