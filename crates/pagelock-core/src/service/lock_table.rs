// Concurrent page lock table
// First-come-first-served test-and-set over a sharded map, no waiting, no expiry

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::model::LockRecord;

/// Authoritative mapping of page id to its current lock
///
/// Each operation is atomic for its key. Hooks passed to the `*_with` variants
/// run while the key's shard is still held, so anything they do is ordered with
/// respect to every other mutation of the same page. Hooks must not call back
/// into the table.
#[derive(Default)]
pub struct LockTable {
    locks: DashMap<String, LockRecord>,
}

impl LockTable {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Lock `page_id` for `holder` if nobody holds it.
    ///
    /// Returns the new record, or `None` if the page is already locked.
    pub fn try_acquire(&self, page_id: &str, holder: &str) -> Option<LockRecord> {
        self.try_acquire_with(page_id, holder, |_| {})
    }

    /// Like [`try_acquire`](Self::try_acquire), running `on_acquired` before the
    /// key is unlocked for other callers.
    pub fn try_acquire_with<F>(&self, page_id: &str, holder: &str, on_acquired: F) -> Option<LockRecord>
    where
        F: FnOnce(&LockRecord),
    {
        match self.locks.entry(page_id.to_string()) {
            Entry::Occupied(existing) => {
                debug!(
                    page_id = %page_id,
                    holder = %holder,
                    locked_by = %existing.get().locked_by,
                    "Page already locked"
                );
                None
            }
            Entry::Vacant(slot) => {
                let inserted = slot.insert(LockRecord::new(page_id, holder));
                on_acquired(inserted.value());
                debug!(page_id = %page_id, holder = %holder, "Page locked");
                Some(inserted.value().clone())
            }
        }
    }

    /// Remove the lock on `page_id`.
    ///
    /// Returns the removed record, or `None` if the page was not locked.
    pub fn release(&self, page_id: &str) -> Option<LockRecord> {
        self.release_with(page_id, |_| {})
    }

    /// Like [`release`](Self::release), running `on_released` before the key is
    /// unlocked for other callers.
    pub fn release_with<F>(&self, page_id: &str, on_released: F) -> Option<LockRecord>
    where
        F: FnOnce(&LockRecord),
    {
        let removed = self
            .locks
            .remove_if(page_id, |_, record| {
                on_released(record);
                true
            })
            .map(|(_, record)| record);

        if removed.is_some() {
            debug!(page_id = %page_id, "Page unlocked");
        }
        removed
    }

    /// Point-in-time copy of every live lock, in no particular order.
    pub fn snapshot(&self) -> Vec<LockRecord> {
        self.locks
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Visit every live lock while its shard is held.
    ///
    /// A mutation of a page that has not been visited yet completes either
    /// before the visit or after the whole shard has been visited.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&LockRecord),
    {
        for entry in self.locks.iter() {
            visit(entry.value());
        }
    }

    pub fn get(&self, page_id: &str) -> Option<LockRecord> {
        self.locks.get(page_id).map(|entry| entry.value().clone())
    }

    pub fn is_locked(&self, page_id: &str) -> bool {
        self.locks.contains_key(page_id)
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
