//! Size-bucketed clause database (C3): clauses grouped by literal count,
//! with admission control and budgeted selection (§3.3, §4.2).

use std::sync::atomic::{AtomicU64, Ordering};

use crate::clause::ClauseRef;
use crate::error::{PainlessError, Result};
use crate::queue::ClauseBufferAlpha;

/// Default maximum clause size accepted, matching
/// `ClauseDatabaseLockFree`'s hardcoded default in the original.
pub const DEFAULT_MAX_SIZE: usize = 50;

/// Default admission cap for an unbounded-style database (the `< 10000`
/// constant in `ClauseDatabaseLockFree::addClause`).
pub const DEFAULT_ADMISSION_CAP: u64 = 10_000;

/// Admission cap used by the bounded/global-side database (the `< 1000`
/// constant in `ClauseDatabaseVector::addClause`).
pub const GATEWAY_ADMISSION_CAP: u64 = 1_000;

/// Array of clause queues indexed `0..maxSize-1`; bucket `i` holds clauses
/// of size `i+1` (§3.3). Not internally locked: concurrent `give_selection`
/// calls from two strategies over the same database are unsupported, per
/// §5's shared-resource policy — callers must ensure one owning strategy
/// drives selection.
pub struct ClauseDatabase {
    max_size: usize,
    admission_cap: u64,
    buckets: Vec<ClauseBufferAlpha>,
    cumulative: Vec<AtomicU64>,
}

impl ClauseDatabase {
    pub fn new(max_size: usize, admission_cap: u64) -> Self {
        let max_size = if max_size == 0 { DEFAULT_MAX_SIZE } else { max_size };
        ClauseDatabase {
            max_size,
            admission_cap,
            buckets: (0..max_size).map(|_| ClauseBufferAlpha::new()).collect(),
            cumulative: (0..max_size).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_SIZE, DEFAULT_ADMISSION_CAP)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Admits a clause into its size bucket, refusing oversize clauses and
    /// enforcing the per-bucket admission cap that bounds one size from
    /// eating the whole literal budget under bursty producers (§4.2).
    pub fn add_clause(&self, clause: ClauseRef) -> bool {
        let size = clause.size();
        if size == 0 || size > self.max_size {
            log::warn!(
                "refusing clause of size {} (max admitted size is {})",
                size,
                self.max_size
            );
            return false;
        }
        let bucket = &self.buckets[size - 1];
        let projected = (bucket.size() as u64 + 1) * size as u64;
        if projected >= self.admission_cap {
            log::warn!(
                "admission cap reached for bucket {} ({} literals projected >= cap {})",
                size,
                projected,
                self.admission_cap
            );
            return false;
        }
        bucket.add_clause(clause);
        self.cumulative[size - 1].fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Fills `out` against a literal budget, favouring shorter clauses
    /// first (§4.2). Returns the number of literals used. Mirrors the
    /// original's race-tolerant bookkeeping: the "used" tally for a
    /// partially drained bucket is computed from the intended quota before
    /// draining, so under concurrent consumption it may slightly
    /// overcount versus clauses actually pushed into `out`.
    pub fn give_selection(&self, out: &mut Vec<ClauseRef>, total_size_in_literals: usize) -> usize {
        let mut used = 0usize;
        for (i, bucket) in self.buckets.iter().enumerate() {
            let cls_size = i + 1;
            let remaining = total_size_in_literals.saturating_sub(used);
            if remaining < cls_size {
                return used;
            }
            let bucket_len = bucket.size().max(0) as usize;
            if remaining >= cls_size * bucket_len {
                let mut drained = 0;
                while let Some(c) = bucket.pop_front() {
                    out.push(c);
                    drained += 1;
                }
                used += cls_size * drained;
            } else {
                let quota = remaining / cls_size;
                used += cls_size * quota;
                for _ in 0..quota {
                    match bucket.pop_front() {
                        Some(c) => out.push(c),
                        None => break,
                    }
                }
            }
        }
        used
    }

    /// Drains any single clause from the smallest non-empty bucket.
    pub fn give_one_clause(&self) -> Option<ClauseRef> {
        self.buckets.iter().find_map(|bucket| bucket.pop_front())
    }

    /// Drains every bucket into `out`, with no budget.
    pub fn get_clauses(&self, out: &mut Vec<ClauseRef>) {
        for bucket in &self.buckets {
            while let Some(c) = bucket.pop_front() {
                out.push(c);
            }
        }
    }

    /// Live clause count per bucket (index `i` -> clauses of size `i+1`).
    pub fn get_sizes(&self) -> Vec<usize> {
        self.buckets.iter().map(|b| b.size().max(0) as usize).collect()
    }

    /// Total live clause count across all buckets.
    pub fn get_size(&self) -> usize {
        self.get_sizes().iter().sum()
    }

    /// Cumulative admissions per bucket, for statistics (§11 of SPEC_FULL).
    pub fn get_total_sizes(&self) -> Vec<u64> {
        self.cumulative.iter().map(|c| c.load(Ordering::Relaxed)).collect()
    }

    /// Empties every bucket with clause-size >= `size`.
    pub fn delete_from(&self, size: i32) -> Result<()> {
        if size <= 0 {
            return Err(PainlessError::InvalidDeleteSize(size));
        }
        let start = (size - 1) as usize;
        for bucket in self.buckets.iter().skip(start) {
            bucket.clear();
        }
        Ok(())
    }
}
