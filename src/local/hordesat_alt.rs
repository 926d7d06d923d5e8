//! HordeSatAlt (§4.6.2): a single pooled round across every producer
//! instead of HordeSat's one-bucket-database-per-producer scheme. Units are
//! precious and always broadcast; the rest of the budget is filled from a
//! single selection sorted by `(size asc, lbd asc)`.

use std::sync::Arc;

use crate::bloom::{classify, BloomFilter, DuplicatePolicy, LOCAL_SATURATION_LIMIT};
use crate::clause::{ClauseRef, Origin};
use crate::entity::Entity;
use crate::local::{LocalSharingStrategy, Membership};
use crate::stats::SharingStatistics;
use crate::termination::TerminationContext;

pub struct HordeSatAltStrategy {
    membership: Arc<Membership>,
    bloom: Option<BloomFilter>,
    shr_lit: usize,
    horde_init_round: u32,
    pub stats: SharingStatistics,
}

impl HordeSatAltStrategy {
    pub fn new(membership: Arc<Membership>, shr_lit: usize, dup_detection: bool, horde_init_round: u32) -> Self {
        HordeSatAltStrategy {
            membership,
            bloom: dup_detection.then(BloomFilter::with_default_size),
            shr_lit,
            horde_init_round,
            stats: SharingStatistics::new(),
        }
    }

    fn filter(&self, unfiltered: Vec<ClauseRef>) -> Vec<ClauseRef> {
        let Some(bloom) = &self.bloom else {
            return unfiltered;
        };
        unfiltered
            .into_iter()
            .filter_map(|c| {
                let count = bloom.test_and_insert(c.checksum(), LOCAL_SATURATION_LIMIT);
                match classify(count, c.lbd()) {
                    DuplicatePolicy::Share => Some(c),
                    DuplicatePolicy::Promote(new_lbd) => {
                        c.promote(new_lbd);
                        Some(c)
                    }
                    DuplicatePolicy::Drop => None,
                }
            })
            .collect()
    }

    /// Delivers `clauses` to every consumer except the one matching the
    /// clause's own originating solver id (no self-feedback, §4.6.1 step 5).
    fn broadcast(&self, clauses: &[ClauseRef]) {
        for consumer in self.membership.consumers() {
            for c in clauses {
                if let Origin::Solver(origin_id) = c.origin() {
                    if origin_id == consumer.id() {
                        continue;
                    }
                }
                consumer.import_clause(c.clone());
            }
        }
    }
}

impl LocalSharingStrategy for HordeSatAltStrategy {
    fn do_sharing(&mut self, round: u64, ctx: &TerminationContext) -> bool {
        self.membership.apply_pending();

        let producers = self.membership.producers();
        let mut pool = Vec::new();
        for producer in &producers {
            let mut unfiltered = Vec::new();
            producer.export_clauses(&mut unfiltered);
            pool.extend(self.filter(unfiltered));
        }
        if pool.is_empty() {
            return ctx.is_ending();
        }

        pool.sort_by(|a, b| a.size().cmp(&b.size()).then(a.lbd().cmp(&b.lbd())));

        let split = pool.partition_point(|c| c.size() == 1);
        let (units, rest) = pool.split_at(split);

        if !units.is_empty() {
            self.broadcast(units);
            for u in units {
                self.membership.save_unit(u.clone());
            }
        }

        let budget = self.shr_lit * producers.len().max(1);
        let mut used = 0usize;
        let mut selection = Vec::new();
        for c in rest {
            if used + c.size() > budget {
                break;
            }
            used += c.size();
            selection.push(c.clone());
        }
        if !selection.is_empty() {
            self.broadcast(&selection);
        }

        self.stats.add_shared((units.len() + selection.len()) as u64);

        if round as u32 >= self.horde_init_round {
            let ratio = used as f64 / budget.max(1) as f64;
            for producer in &producers {
                if let Entity::Solver(_) = producer {
                    if ratio < 0.75 {
                        producer.increase_clause_production();
                    } else if ratio > 0.98 {
                        producer.decrease_clause_production();
                    }
                }
            }
        }

        ctx.is_ending()
    }
}
