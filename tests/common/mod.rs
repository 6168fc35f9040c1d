use exthash::buffer::buffer_pool_manager::BufferPoolManager;
use exthash::buffer::lru_k_replacer::LRUKReplacer;
use exthash::common::logger::initialize_logger;
use exthash::storage::disk::disk_manager::FileDiskManager;
use exthash::storage::disk::disk_scheduler::DiskScheduler;
use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::TempDir;

pub const DEFAULT_POOL_SIZE: usize = 50;
pub const DEFAULT_K: usize = 2;

/// Per-test fixture wiring a disk manager, scheduler, replacer and buffer
/// pool over a temporary database file.
pub struct TestContext {
    pub bpm: Arc<BufferPoolManager>,
    _temp_dir: TempDir,
}

impl TestContext {
    pub fn new(test_name: &str) -> Self {
        Self::with_pool_size(test_name, DEFAULT_POOL_SIZE)
    }

    pub fn with_pool_size(test_name: &str, pool_size: usize) -> Self {
        initialize_logger();

        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join(format!("{test_name}.db"));
        let disk_manager = Arc::new(FileDiskManager::new(db_path).unwrap());
        let disk_scheduler = Arc::new(DiskScheduler::new(disk_manager));
        let replacer = Arc::new(Mutex::new(LRUKReplacer::new(pool_size, DEFAULT_K)));
        let bpm = Arc::new(BufferPoolManager::new(pool_size, disk_scheduler, replacer));

        Self {
            bpm,
            _temp_dir: temp_dir,
        }
    }
}
