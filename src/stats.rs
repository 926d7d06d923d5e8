//! Per-strategy sharing statistics (SPEC_FULL.md §11), ported from
//! `sharing/SharingStatistics.h`. Counters are relaxed atomics since a
//! strategy's `stats()` may be read by a monitoring thread while the Sharer
//! thread keeps incrementing them.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct SharingStatistics {
    pub received_clauses: AtomicU64,
    pub shared_clauses: AtomicU64,
    pub received_duplicates: AtomicU64,
    pub shared_duplicates_avoided: AtomicU64,
}

impl SharingStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_received(&self, n: u64) {
        self.received_clauses.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_shared(&self, n: u64) {
        self.shared_clauses.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_received_duplicate(&self, n: u64) {
        self.received_duplicates.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_shared_duplicate_avoided(&self, n: u64) {
        self.shared_duplicates_avoided.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SharingStatisticsSnapshot {
        SharingStatisticsSnapshot {
            received_clauses: self.received_clauses.load(Ordering::Relaxed),
            shared_clauses: self.shared_clauses.load(Ordering::Relaxed),
            received_duplicates: self.received_duplicates.load(Ordering::Relaxed),
            shared_duplicates_avoided: self.shared_duplicates_avoided.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SharingStatisticsSnapshot {
    pub received_clauses: u64,
    pub shared_clauses: u64,
    pub received_duplicates: u64,
    pub shared_duplicates_avoided: u64,
}

/// Extra counters kept by global (inter-node) strategies, ported from
/// `GlobalSharingStatistics` (a subclass of `SharingStatistics` in the
/// original).
#[derive(Default)]
pub struct GlobalSharingStatistics {
    pub base: SharingStatistics,
    pub messages_sent: AtomicU64,
}

impl GlobalSharingStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }
}
