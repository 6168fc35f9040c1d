use crate::common::config::{PageData, PageId, DB_PAGE_SIZE};
use crate::storage::disk::disk_manager::DiskIO;
use log::debug;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io::Result as IoResult;
use std::sync::Arc;
use std::thread;
use tokio::sync::oneshot;

/// A single disk request queued for the worker thread. Completion is
/// signalled through the oneshot sender.
enum DiskRequest {
    Read {
        page_id: PageId,
        done: oneshot::Sender<IoResult<Box<PageData>>>,
    },
    Write {
        page_id: PageId,
        data: Box<PageData>,
        done: oneshot::Sender<IoResult<()>>,
    },
}

/// The `DiskScheduler` serializes page I/O through a background worker
/// thread. Requests are queued and executed in submission order; callers
/// block on the returned receiver when they need the result.
pub struct DiskScheduler {
    queue: Arc<(Mutex<SchedulerState>, Condvar)>,
    worker_thread: Option<thread::JoinHandle<()>>,
}

struct SchedulerState {
    requests: VecDeque<DiskRequest>,
    shutdown: bool,
}

impl DiskScheduler {
    pub fn new(disk_manager: Arc<dyn DiskIO>) -> Self {
        let queue = Arc::new((
            Mutex::new(SchedulerState {
                requests: VecDeque::new(),
                shutdown: false,
            }),
            Condvar::new(),
        ));

        let worker_queue = Arc::clone(&queue);
        let worker_thread = thread::spawn(move || {
            Self::run_worker(worker_queue, disk_manager);
        });

        Self {
            queue,
            worker_thread: Some(worker_thread),
        }
    }

    /// Schedules a page read. The receiver resolves to the page bytes.
    pub fn schedule_read(&self, page_id: PageId) -> oneshot::Receiver<IoResult<Box<PageData>>> {
        let (done, receiver) = oneshot::channel();
        self.enqueue(DiskRequest::Read { page_id, done });
        receiver
    }

    /// Schedules a page write of `data`.
    pub fn schedule_write(
        &self,
        page_id: PageId,
        data: Box<PageData>,
    ) -> oneshot::Receiver<IoResult<()>> {
        let (done, receiver) = oneshot::channel();
        self.enqueue(DiskRequest::Write {
            page_id,
            data,
            done,
        });
        receiver
    }

    /// Stops the worker thread once the queue drains.
    pub fn shut_down(&self) {
        let (lock, cvar) = &*self.queue;
        lock.lock().shutdown = true;
        cvar.notify_all();
    }

    fn enqueue(&self, request: DiskRequest) {
        let (lock, cvar) = &*self.queue;
        lock.lock().requests.push_back(request);
        cvar.notify_one();
    }

    fn run_worker(queue: Arc<(Mutex<SchedulerState>, Condvar)>, disk_manager: Arc<dyn DiskIO>) {
        let (lock, cvar) = &*queue;
        loop {
            let request = {
                let mut state = lock.lock();
                while state.requests.is_empty() && !state.shutdown {
                    cvar.wait(&mut state);
                }
                match state.requests.pop_front() {
                    Some(request) => request,
                    None => break, // shutdown with an empty queue
                }
            };

            match request {
                DiskRequest::Read { page_id, done } => {
                    let mut data = Box::new([0u8; DB_PAGE_SIZE]);
                    let result = disk_manager.read_page(page_id, &mut data).map(|_| data);
                    let _ = done.send(result);
                }
                DiskRequest::Write {
                    page_id,
                    data,
                    done,
                } => {
                    let _ = done.send(disk_manager.write_page(page_id, &data));
                }
            }
        }
        debug!("Disk scheduler worker exiting");
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        self.shut_down();
        if let Some(handle) = self.worker_thread.take() {
            let _ = handle.join();
        }
    }
}
