use crate::common::config::FrameId;
use log::{debug, trace};
use std::collections::{HashMap, VecDeque};

/// Access types, recorded for the lru-k algorithm.
#[derive(Clone, Copy, Debug)]
pub enum AccessType {
    Unknown,
    Lookup,
    Scan,
    Index,
}

#[derive(Debug)]
struct FrameEntry {
    /// The most recent access timestamps, at most `k` of them.
    access_times: VecDeque<u64>,
    is_evictable: bool,
}

/// LRU-K replacer: evicts the evictable frame with the largest backward
/// k-distance. Frames with fewer than `k` recorded accesses have infinite
/// distance and are preferred victims, tie-broken by their earliest access.
pub struct LRUKReplacer {
    frame_store: HashMap<FrameId, FrameEntry>,
    current_timestamp: u64,
    replacer_size: usize,
    k: usize,
}

impl LRUKReplacer {
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(k > 0, "lru-k needs k > 0");
        Self {
            frame_store: HashMap::with_capacity(num_frames),
            current_timestamp: 0,
            replacer_size: num_frames,
            k,
        }
    }

    /// Picks a victim frame, removes it from the replacer and returns it.
    /// Returns `None` when no frame is evictable.
    pub fn evict(&mut self) -> Option<FrameId> {
        let mut victim: Option<(FrameId, bool, u64)> = None; // (frame, has_infinite_distance, key_ts)

        for (&frame_id, entry) in &self.frame_store {
            if !entry.is_evictable {
                continue;
            }
            let infinite = entry.access_times.len() < self.k;
            // For frames with full history the victim has the oldest k-th
            // recent access; for the rest, the oldest first access.
            let key_ts = if infinite {
                entry.access_times.front().copied().unwrap_or(0)
            } else {
                entry.access_times[entry.access_times.len() - self.k]
            };

            let better = match victim {
                None => true,
                Some((_, best_infinite, best_ts)) => {
                    (infinite && !best_infinite) || (infinite == best_infinite && key_ts < best_ts)
                }
            };
            if better {
                victim = Some((frame_id, infinite, key_ts));
            }
        }

        let (frame_id, _, _) = victim?;
        self.frame_store.remove(&frame_id);
        debug!("Evicting frame {}", frame_id);
        Some(frame_id)
    }

    /// Records an access to a frame, creating its history if necessary.
    pub fn record_access(&mut self, frame_id: FrameId, _access_type: AccessType) {
        self.current_timestamp += 1;
        let now = self.current_timestamp;
        let k = self.k;

        let entry = self.frame_store.entry(frame_id).or_insert(FrameEntry {
            access_times: VecDeque::with_capacity(k),
            is_evictable: false,
        });
        if entry.access_times.len() == k {
            entry.access_times.pop_front();
        }
        entry.access_times.push_back(now);
        trace!("Recorded access for frame {} at {}", frame_id, now);
    }

    /// Marks a frame evictable or not.
    pub fn set_evictable(&mut self, frame_id: FrameId, set_evictable: bool) {
        let entry = self.frame_store.entry(frame_id).or_insert(FrameEntry {
            access_times: VecDeque::new(),
            is_evictable: false,
        });
        entry.is_evictable = set_evictable;
    }

    /// Drops a frame from the replacer regardless of its access history.
    /// Panics if the frame is present but pinned; that is a caller bug.
    pub fn remove(&mut self, frame_id: FrameId) {
        if let Some(entry) = self.frame_store.get(&frame_id) {
            assert!(
                entry.is_evictable,
                "attempt to remove non-evictable frame {frame_id}"
            );
            self.frame_store.remove(&frame_id);
        }
    }

    /// Returns the number of evictable frames.
    pub fn size(&self) -> usize {
        self.frame_store
            .values()
            .filter(|entry| entry.is_evictable)
            .count()
    }

    pub fn replacer_size(&self) -> usize {
        self.replacer_size
    }
}
