//! HordeSat-style local sharing (§4.6.1): one bucket database per producer,
//! Bloom-filter duplicate detection, per-solver adaptive production-rate
//! feedback based on how full the per-round budget ran.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::bloom::{classify, BloomFilter, DuplicatePolicy, LOCAL_SATURATION_LIMIT};
use crate::clause::ClauseRef;
use crate::database::ClauseDatabase;
use crate::entity::Entity;
use crate::local::{LocalSharingStrategy, Membership};
use crate::stats::SharingStatistics;
use crate::termination::TerminationContext;

pub struct HordeSatStrategy {
    membership: Arc<Membership>,
    databases: Mutex<HashMap<u32, ClauseDatabase>>,
    bloom: Option<BloomFilter>,
    shr_lit: usize,
    horde_init_round: u32,
    pub stats: SharingStatistics,
}

impl HordeSatStrategy {
    pub fn new(membership: Arc<Membership>, shr_lit: usize, dup_detection: bool, horde_init_round: u32) -> Self {
        HordeSatStrategy {
            membership,
            databases: Mutex::new(HashMap::new()),
            bloom: dup_detection.then(BloomFilter::with_default_size),
            shr_lit,
            horde_init_round,
            stats: SharingStatistics::new(),
        }
    }

    /// Runs §4.3's duplicate policy over a producer's freshly-exported
    /// clauses; `None` for untouched filters passes everything through.
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

impl LocalSharingStrategy for HordeSatStrategy {
    fn do_sharing(&mut self, round: u64, ctx: &TerminationContext) -> bool {
        self.membership.apply_pending();

        for producer in self.membership.producers() {
            let mut unfiltered = Vec::new();
            producer.export_clauses(&mut unfiltered);
            if unfiltered.is_empty() {
                continue;
            }
            let kept = self.filter(unfiltered);
            if kept.is_empty() {
                continue;
            }

            {
                let mut dbs = self.databases.lock().unwrap();
                let db = dbs.entry(producer.id()).or_insert_with(ClauseDatabase::with_defaults);
                for c in kept {
                    db.add_clause(c);
                }
            }

            let mut selection = Vec::new();
            let used = {
                let dbs = self.databases.lock().unwrap();
                let db = dbs.get(&producer.id()).expect("database created above");
                db.give_selection(&mut selection, self.shr_lit)
            };

            if let Entity::Solver(_) = &producer {
                if round as u32 >= self.horde_init_round {
                    let ratio = used as f64 / self.shr_lit.max(1) as f64;
                    if ratio < 0.75 {
                        producer.increase_clause_production();
                    } else if ratio > 0.98 {
                        producer.decrease_clause_production();
                    }
                }
            }

            if selection.is_empty() {
                continue;
            }
            self.stats.add_shared(selection.len() as u64);
            self.membership.broadcast_excluding(producer.id(), &selection);
        }

        ctx.is_ending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::Origin;
    use crate::entity::SolverEntity;
    use crate::solver::mock::MockSolver;
    use crate::solver::SolveResult;

    fn solver(id: u32) -> Entity {
        Entity::Solver(SolverEntity::new(id, Box::new(MockSolver::new(SolveResult::Unknown)), 10))
    }

    #[test]
    fn single_producer_single_consumer_round_trips_learned_clauses() {
        let producer = solver(0);
        let consumer = solver(1);
        let membership = Arc::new(Membership::new(vec![producer.clone()], vec![consumer.clone()]));

        if let Entity::Solver(s) = &producer {
            for i in 1..=10 {
                let cls = crate::clause::ClauseRecord::new(vec![i, i + 100, i + 200], 2, Origin::Solver(0)).unwrap();
                s.export_clause_callback(cls);
            }
        }

        let mut strategy = HordeSatStrategy::new(membership, 1500, false, 1);
        let ctx = TerminationContext::new();
        strategy.do_sharing(0, &ctx);

        if let Entity::Solver(s) = &consumer {
            let mut received = Vec::new();
            while let Some(c) = s.import_clause_callback() {
                received.push(c);
            }
            assert_eq!(received.len(), 10);
        }
    }

    #[test]
    fn low_fill_ratio_increases_production() {
        let producer = solver(0);
        let membership = Arc::new(Membership::new(vec![producer.clone()], Vec::new()));
        if let Entity::Solver(s) = &producer {
            let cls = crate::clause::ClauseRecord::new(vec![1, 2], 2, Origin::Solver(0)).unwrap();
            s.export_clause_callback(cls);
        }
        let mut strategy = HordeSatStrategy::new(membership, 1500, false, 0);
        let ctx = TerminationContext::new();
        strategy.do_sharing(0, &ctx);
        if let Entity::Solver(s) = &producer {
            assert_eq!(s.production_rate(), 1);
        }
    }

    #[test]
    fn does_not_feed_clauses_back_to_the_originating_producer() {
        let producer = solver(0);
        let membership = Arc::new(Membership::new(vec![producer.clone()], vec![producer.clone()]));
        if let Entity::Solver(s) = &producer {
            let cls = crate::clause::ClauseRecord::new(vec![1, 2], 2, Origin::Solver(0)).unwrap();
            s.export_clause_callback(cls);
        }
        let mut strategy = HordeSatStrategy::new(membership, 1500, false, 1);
        let ctx = TerminationContext::new();
        strategy.do_sharing(0, &ctx);
        if let Entity::Solver(s) = &producer {
            assert!(s.import_clause_callback().is_none());
        }
    }
}
