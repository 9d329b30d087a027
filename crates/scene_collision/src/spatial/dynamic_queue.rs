//! Budgeted re-insertion of primitives into the broad phase
//!
//! Primitives that are not (or no longer) stored in the spatial structure
//! wait here, each entry stamped with the primitive's move sequence number
//! at the time it was queued. Every frame a bounded number of entries is
//! retried. An entry whose primitive has moved again since it was queued is
//! stale: a newer entry for the same primitive is further back in the
//! queue, so the old one is dropped without costing any budget.

use std::collections::VecDeque;

use log::debug;

use crate::foundation::collections::ComponentKey;
use crate::physics::collision::AABB;
use super::spatial_query::SpatialQuery;

/// A queued re-insertion request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicEntry {
    /// Primitive to insert
    pub key: ComponentKey,
    /// Move sequence number when the entry was queued
    pub move_stamp: u64,
}

/// Outcome of one [`DynamicPrimitiveQueue::process`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReinsertStats {
    /// Entries that cost budget (insert attempted)
    pub attempted: usize,
    /// Entries now stored in the spatial structure
    pub inserted: usize,
    /// Entries that failed and went back on the queue
    pub requeued: usize,
    /// Entries dropped because their primitive moved again or was destroyed
    pub discarded: usize,
}

/// FIFO of primitives awaiting insertion
#[derive(Debug, Clone, Default)]
pub struct DynamicPrimitiveQueue {
    entries: VecDeque<DynamicEntry>,
}

impl DynamicPrimitiveQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `key` as of move `move_stamp`
    pub fn push(&mut self, key: ComponentKey, move_stamp: u64) {
        self.entries.push_back(DynamicEntry { key, move_stamp });
    }

    /// Number of queued entries, stale ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queued entries in retry order
    pub fn entries(&self) -> impl Iterator<Item = &DynamicEntry> {
        self.entries.iter()
    }

    /// Retry up to `budget` live entries against `spatial`
    ///
    /// `current` resolves a key to its latest move stamp and world bounds,
    /// or `None` once the primitive is gone. Each entry is looked at no more
    /// than once per pass; failed inserts go to the back of the queue with
    /// their stamp unchanged.
    pub fn process(
        &mut self,
        budget: usize,
        spatial: &mut dyn SpatialQuery,
        mut current: impl FnMut(ComponentKey) -> Option<(u64, AABB)>,
    ) -> ReinsertStats {
        let mut stats = ReinsertStats::default();
        let mut requeue = Vec::new();
        let mut remaining = self.entries.len();

        while remaining > 0 && stats.attempted < budget {
            remaining -= 1;
            let Some(entry) = self.entries.pop_front() else {
                break;
            };

            let Some((latest_stamp, bounds)) = current(entry.key) else {
                stats.discarded += 1;
                continue;
            };
            if latest_stamp > entry.move_stamp {
                stats.discarded += 1;
                continue;
            }

            stats.attempted += 1;
            if spatial.update(entry.key, bounds) {
                stats.inserted += 1;
            } else {
                stats.requeued += 1;
                requeue.push(entry);
            }
        }

        self.entries.extend(requeue);

        if stats != ReinsertStats::default() {
            debug!(
                "Re-insertion pass: {} attempted, {} inserted, {} requeued, {} discarded, {} pending",
                stats.attempted,
                stats.inserted,
                stats.requeued,
                stats.discarded,
                self.entries.len()
            );
        }

        stats
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
