//! Clause records (C1): immutable-after-construction learned clauses shared
//! between solvers and sharing strategies.

use std::sync::Arc;

use crate::error::{PainlessError, Result};

/// Origin of a learned clause: either a numbered solver, or clauses that
/// arrived from outside this process (a peer node, via the global gateway).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Solver(u32),
    External,
}

/// A learned clause, immutable once constructed and shared by reference
/// among every sharing entity that holds it (§3.1). `lbd` may only be
/// lowered by a promotion event, and only while the strategy performing the
/// promotion is the sole holder — see `ClauseRecord::promote`.
#[derive(Debug)]
pub struct ClauseRecord {
    literals: Vec<i32>,
    lbd: std::sync::atomic::AtomicU32,
    origin: Origin,
    checksum: u64,
}

/// Shared handle to a clause record. Destroyed when the last holder drops
/// its reference, per §3.1's shared-ownership invariant.
pub type ClauseRef = Arc<ClauseRecord>;

impl ClauseRecord {
    /// Builds a new clause record, rejecting empty clauses and clauses that
    /// contain duplicate or complementary literals so that the invariant of
    /// §3.1 holds for every `ClauseRecord` by construction (see SPEC_FULL.md
    /// §12 on the duplicate-literal open question).
    pub fn new(literals: Vec<i32>, lbd: u32, origin: Origin) -> Result<ClauseRef> {
        if literals.is_empty() {
            return Err(PainlessError::MalformedClause(0));
        }
        let mut seen = std::collections::HashSet::with_capacity(literals.len());
        for &lit in &literals {
            if lit == 0 {
                return Err(PainlessError::MalformedClause(literals.len()));
            }
            if !seen.insert(lit) || seen.contains(&-lit) {
                return Err(PainlessError::DuplicateLiteral(lit));
            }
        }
        let checksum = checksum_of(&literals);
        Ok(Arc::new(ClauseRecord {
            literals,
            lbd: std::sync::atomic::AtomicU32::new(lbd.max(1)),
            origin,
            checksum,
        }))
    }

    pub fn literals(&self) -> &[i32] {
        &self.literals
    }

    pub fn size(&self) -> usize {
        self.literals.len()
    }

    pub fn lbd(&self) -> u32 {
        self.lbd.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn checksum(&self) -> u64 {
        self.checksum
    }

    /// Downgrades (lowers) the clause's lbd in place, per the promotion rule
    /// of §4.3/§4.6.1. Callers must only do this before the record is handed
    /// to any consumer; `ClauseRecord` itself cannot enforce exclusivity
    /// (that discipline lives in the caller, as in the original), but it
    /// will never *raise* the lbd so a racing reader sees a monotonically
    /// improving quality estimate at worst.
    pub fn promote(&self, new_lbd: u32) {
        let mut current = self.lbd();
        while new_lbd < current {
            match self.lbd.compare_exchange_weak(
                current,
                new_lbd,
                std::sync::atomic::Ordering::Relaxed,
                std::sync::atomic::Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }
}

/// Jenkins lookup3 integer mix, ported from `utils/BloomFilter.h`'s
/// `lookup3_hash`.
fn lookup3_hash(mut key: u64) -> u64 {
    let mut s1: u64 = 0xdeadbeef;
    let mut s2: u64 = 0xdeadbeef;
    s2 ^= s1;
    s2 = s2.wrapping_sub(s1.rotate_left(14));
    key ^= s2;
    key = key.wrapping_sub(s2.rotate_left(11));
    s1 ^= key;
    s1 = s1.wrapping_sub(key.rotate_left(25));
    s2 ^= s1;
    s2 = s2.wrapping_sub(s1.rotate_left(16));
    key ^= s2;
    key = key.wrapping_sub(s2.rotate_left(4));
    s1 ^= key;
    s1 = s1.wrapping_sub(key.rotate_left(14));
    s2 ^= s1;
    s2 = s2.wrapping_sub(s1.rotate_left(24));
    s2
}

/// Commutative checksum over a literal set: XOR of the per-literal lookup3
/// hash, so any permutation of the same literals yields the same checksum
/// (§3.1, tested in §8.1 as `checksum(pi(c)) == checksum(c)`).
pub fn checksum_of(literals: &[i32]) -> u64 {
    literals
        .iter()
        .map(|&lit| lookup3_hash(lit as i64 as u64))
        .fold(0u64, |acc, h| acc ^ h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_clause() {
        assert!(ClauseRecord::new(vec![], 2, Origin::External).is_err());
    }

    #[test]
    fn rejects_complementary_literals() {
        assert!(ClauseRecord::new(vec![1, -1, 2], 2, Origin::External).is_err());
    }

    #[test]
    fn rejects_duplicate_literals() {
        assert!(ClauseRecord::new(vec![1, 2, 1], 2, Origin::External).is_err());
    }

    #[test]
    fn checksum_is_permutation_invariant() {
        let a = checksum_of(&[1, -2, 3, -4]);
        let b = checksum_of(&[-4, 3, -2, 1]);
        let c = checksum_of(&[3, 1, -4, -2]);
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn checksum_differs_for_different_clauses() {
        let a = checksum_of(&[1, 2, 3]);
        let b = checksum_of(&[1, 2, 4]);
        assert_ne!(a, b);
    }

    #[test]
    fn promote_only_lowers_lbd() {
        let cls = ClauseRecord::new(vec![1, 2, 3], 8, Origin::Solver(0)).unwrap();
        cls.promote(6);
        assert_eq!(cls.lbd(), 6);
        cls.promote(9); // higher value must not regress the record upward
        assert_eq!(cls.lbd(), 6);
        cls.promote(2);
        assert_eq!(cls.lbd(), 2);
    }
}
