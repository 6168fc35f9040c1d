use crate::common::config::{PageData, PageId, DB_PAGE_SIZE};
use log::{info, trace};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Result as IoResult;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

/// The `DiskIO` trait defines the basic operations for interacting with disk
/// storage. Implementers must provide page-granular reads and writes.
pub trait DiskIO: Send + Sync {
    fn write_page(&self, page_id: PageId, page_data: &PageData) -> IoResult<()>;
    fn read_page(&self, page_id: PageId, page_data: &mut PageData) -> IoResult<()>;
}

/// The `FileDiskManager` performs page-granular I/O against a single
/// database file. Page `n` lives at byte offset `n * DB_PAGE_SIZE`.
pub struct FileDiskManager {
    file_name: PathBuf,
    db_io: Mutex<File>,
    num_writes: AtomicU32,
    num_reads: AtomicU32,
}

impl FileDiskManager {
    /// Opens (or creates) the database file at `db_file`.
    pub fn new(db_file: impl AsRef<Path>) -> IoResult<Self> {
        let db_io = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(db_file.as_ref())?;

        info!("Opened database file {}", db_file.as_ref().display());
        Ok(Self {
            file_name: db_file.as_ref().to_path_buf(),
            db_io: Mutex::new(db_io),
            num_writes: AtomicU32::new(0),
            num_reads: AtomicU32::new(0),
        })
    }

    /// Flushes buffered writes to the file.
    pub fn shut_down(&self) -> IoResult<()> {
        let mut db_io = self.db_io.lock();
        db_io.flush()?;
        info!("Shutdown complete for {}", self.file_name.display());
        Ok(())
    }

    /// Returns the number of pages written so far.
    pub fn get_num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::SeqCst)
    }

    /// Returns the number of pages read so far.
    pub fn get_num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::SeqCst)
    }

    /// Retrieves the current size of the database file.
    pub fn get_file_size(&self) -> IoResult<u64> {
        Ok(self.file_name.metadata()?.len())
    }
}

impl DiskIO for FileDiskManager {
    fn write_page(&self, page_id: PageId, page_data: &PageData) -> IoResult<()> {
        let offset = page_id as u64 * DB_PAGE_SIZE as u64;
        trace!("Writing page {} at offset {}", page_id, offset);

        let mut db_io = self.db_io.lock();
        db_io.seek(SeekFrom::Start(offset))?;
        db_io.write_all(page_data)?;
        db_io.flush()?;
        self.num_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_page(&self, page_id: PageId, page_data: &mut PageData) -> IoResult<()> {
        let offset = page_id as u64 * DB_PAGE_SIZE as u64;
        trace!("Reading page {} at offset {}", page_id, offset);

        let mut db_io = self.db_io.lock();
        db_io.seek(SeekFrom::Start(offset))?;

        // A page past the end of the file reads as zeroes; short reads are
        // zero-filled the same way.
        let mut bytes_read = 0;
        while bytes_read < page_data.len() {
            match db_io.read(&mut page_data[bytes_read..])? {
                0 => break,
                n => bytes_read += n,
            }
        }
        page_data[bytes_read..].fill(0);
        self.num_reads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
