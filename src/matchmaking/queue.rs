//! Shared waiting-player queue.
//!
//! One instance lives in the server's application state and every session
//! holds a clone. Expired entries are pruned lazily on each read. A searching
//! host restamps its entry on every poll, so only an entry whose session
//! vanished ages out.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const QUEUE_TTL: Duration = Duration::from_secs(60);

/// Milliseconds since the Unix epoch.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    })
}

/// A player waiting for an opponent. `id` is the match id the host will honor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: String,
    pub created_at: u64,
    pub label: String,
}

/// The contract the coordinator needs from the queue.
pub trait MatchQueue {
    /// Live entries, oldest first
    fn entries(&self) -> Vec<QueueEntry>;

    fn enqueue(&self, entry: QueueEntry);

    fn remove(&self, id: &str);

    /// Restamp a live entry with the current time. Returns false when the
    /// entry is gone, either taken by a guest or already expired.
    fn touch(&self, id: &str) -> bool;

    /// Remove and return the oldest live entry whose id is not `own_id`.
    fn take_other(&self, own_id: Option<&str>) -> Option<QueueEntry>;

    fn now_millis(&self) -> u64;

    fn count_others(&self, own_id: Option<&str>) -> usize {
        self.entries()
            .iter()
            .filter(|entry| Some(entry.id.as_str()) != own_id)
            .count()
    }
}

/// In-process queue shared between sessions of one server.
#[derive(Clone)]
pub struct SharedQueue {
    entries: Arc<Mutex<Vec<QueueEntry>>>,
    ttl: Duration,
    clock: Clock,
}

impl Default for SharedQueue {
    fn default() -> Self {
        Self::new(QUEUE_TTL)
    }
}

impl SharedQueue {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, system_clock())
    }

    pub fn with_clock(ttl: Duration, clock: Clock) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            ttl,
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<QueueEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Lock the collection with expired entries already dropped.
    fn live(&self) -> MutexGuard<'_, Vec<QueueEntry>> {
        let now = (self.clock)();
        let ttl = self.ttl.as_millis() as u64;
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|entry| now.saturating_sub(entry.created_at) < ttl);
        if entries.len() != before {
            log::debug!("Pruned {} expired queue entries", before - entries.len());
        }
        entries
    }
}

impl MatchQueue for SharedQueue {
    fn entries(&self) -> Vec<QueueEntry> {
        self.live().clone()
    }

    fn enqueue(&self, entry: QueueEntry) {
        let mut entries = self.live();
        entries.retain(|existing| existing.id != entry.id);
        entries.push(entry);
    }

    fn remove(&self, id: &str) {
        self.live().retain(|entry| entry.id != id);
    }

    fn touch(&self, id: &str) -> bool {
        let now = (self.clock)();
        match self.live().iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.created_at = now;
                true
            }
            None => false,
        }
    }

    fn take_other(&self, own_id: Option<&str>) -> Option<QueueEntry> {
        let mut entries = self.live();
        let index = entries
            .iter()
            .position(|entry| Some(entry.id.as_str()) != own_id)?;
        Some(entries.remove(index))
    }

    fn now_millis(&self) -> u64 {
        (self.clock)()
    }
}
