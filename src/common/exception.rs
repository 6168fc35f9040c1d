use crate::common::config::PageId;
use thiserror::Error;

/// Errors surfaced by the buffer pool manager.
#[derive(Error, Debug)]
pub enum BufferPoolError {
    #[error("no evictable frame available in the buffer pool")]
    PoolExhausted,
    #[error("page {0} is not resident in the buffer pool")]
    PageNotFound(PageId),
    #[error("page {0} is still pinned")]
    PagePinned(PageId),
    #[error("disk i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("disk scheduler dropped the request for page {0}")]
    SchedulerDisconnected(PageId),
}

/// Errors surfaced by the extendible hash table.
#[derive(Error, Debug)]
pub enum HashTableError {
    #[error(transparent)]
    BufferPool(#[from] BufferPoolError),
    #[error("directory is at maximum depth, bucket cannot split further")]
    DirectoryFull,
}
