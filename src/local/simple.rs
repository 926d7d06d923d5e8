//! SimpleSharing (§4.6.3): one shared bucket database for every producer,
//! no per-solver feedback. Suitable for small portfolios.

use std::sync::Arc;

use crate::bloom::{classify, BloomFilter, DuplicatePolicy, LOCAL_SATURATION_LIMIT};
use crate::clause::ClauseRef;
use crate::database::ClauseDatabase;
use crate::local::{LocalSharingStrategy, Membership};
use crate::stats::SharingStatistics;
use crate::termination::TerminationContext;

pub struct SimpleSharingStrategy {
    membership: Arc<Membership>,
    database: ClauseDatabase,
    bloom: Option<BloomFilter>,
    shr_lit: usize,
    pub stats: SharingStatistics,
}

impl SimpleSharingStrategy {
    pub fn new(membership: Arc<Membership>, shr_lit: usize, dup_detection: bool) -> Self {
        SimpleSharingStrategy {
            membership,
            database: ClauseDatabase::with_defaults(),
            bloom: dup_detection.then(BloomFilter::with_default_size),
            shr_lit,
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
}

impl LocalSharingStrategy for SimpleSharingStrategy {
    fn do_sharing(&mut self, _round: u64, ctx: &TerminationContext) -> bool {
        self.membership.apply_pending();

        for producer in self.membership.producers() {
            let mut unfiltered = Vec::new();
            producer.export_clauses(&mut unfiltered);
            if unfiltered.is_empty() {
                continue;
            }
            for c in self.filter(unfiltered) {
                self.database.add_clause(c);
            }
        }

        let mut selection = Vec::new();
        self.database.give_selection(&mut selection, self.shr_lit);
        if !selection.is_empty() {
            self.stats.add_shared(selection.len() as u64);
            for consumer in self.membership.consumers() {
                for c in &selection {
                    if let crate::clause::Origin::Solver(origin_id) = c.origin() {
                        if origin_id == consumer.id() {
                            continue;
                        }
                    }
                    consumer.import_clause(c.clone());
                }
            }
        }

        ctx.is_ending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{ClauseRecord, Origin};
    use crate::entity::SolverEntity;
    use crate::solver::mock::MockSolver;
    use crate::solver::SolveResult;

    fn solver(id: u32) -> crate::entity::Entity {
        crate::entity::Entity::Solver(SolverEntity::new(id, Box::new(MockSolver::new(SolveResult::Unknown)), 10))
    }

    #[test]
    fn pooled_selection_reaches_every_other_consumer() {
        let a = solver(0);
        let b = solver(1);
        let membership = Arc::new(Membership::new(vec![a.clone(), b.clone()], vec![a.clone(), b.clone()]));
        if let crate::entity::Entity::Solver(s) = &a {
            s.export_clause_callback(ClauseRecord::new(vec![1, 2], 2, Origin::Solver(0)).unwrap());
        }
        let mut strategy = SimpleSharingStrategy::new(membership, 1500, false);
        let ctx = TerminationContext::new();
        strategy.do_sharing(0, &ctx);

        if let crate::entity::Entity::Solver(s) = &a {
            assert!(s.import_clause_callback().is_none(), "producer must not receive its own clause");
        }
        if let crate::entity::Entity::Solver(s) = &b {
            assert!(s.import_clause_callback().is_some());
        }
    }
}
