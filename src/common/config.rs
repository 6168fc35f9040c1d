pub const DB_PAGE_SIZE: usize = 4096; // size of a data page in bytes
pub const BUFFER_POOL_SIZE: usize = 64; // default size of the buffer pool
pub const LRUK_REPLACER_K: usize = 2; // lookback window for the lru-k replacer

pub const INVALID_PAGE_ID: PageId = PageId::MAX; // invalid page id
pub const INVALID_TXN_ID: TxnId = TxnId::MAX; // invalid transaction id

/// Maximum directory depth of the extendible hash table. The directory never
/// holds more than `2^HASH_TABLE_MAX_DEPTH` entries.
pub const HASH_TABLE_MAX_DEPTH: u32 = 9;
pub const DIRECTORY_ARRAY_SIZE: usize = 1 << HASH_TABLE_MAX_DEPTH;

pub type FrameId = usize; // frame id type
pub type PageId = u32; // page id type
pub type TxnId = u64; // transaction id type

/// Raw byte buffer of a single page.
pub type PageData = [u8; DB_PAGE_SIZE];
