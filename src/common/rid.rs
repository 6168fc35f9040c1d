use crate::common::config::PageId;
use std::fmt;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Record identifier: the location of a tuple, used as the fixed-size value
/// stored in index buckets.
#[repr(C)]
#[derive(
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
    Unaligned,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
)]
pub struct RID {
    page_id: zerocopy::little_endian::U32,
    slot_num: zerocopy::little_endian::U32,
}

impl RID {
    pub fn new(page_id: PageId, slot_num: u32) -> Self {
        Self {
            page_id: page_id.into(),
            slot_num: slot_num.into(),
        }
    }

    pub fn get_page_id(&self) -> PageId {
        self.page_id.get()
    }

    pub fn get_slot_num(&self) -> u32 {
        self.slot_num.get()
    }
}

impl fmt::Display for RID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_id.get(), self.slot_num.get())
    }
}
