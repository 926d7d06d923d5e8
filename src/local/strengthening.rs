//! StrengtheningSharing (§4.6.4): before broadcasting, queries an auxiliary
//! CDCL solver (the reducer) with each size >= 8 clause's negated literals
//! as assumptions; an UNSAT answer's final conflict analysis yields a
//! strictly-shorter clause that replaces the original.

use std::sync::Arc;

use crate::bloom::{classify, BloomFilter, DuplicatePolicy, LOCAL_SATURATION_LIMIT};
use crate::clause::{ClauseRecord, ClauseRef, Origin};
use crate::database::ClauseDatabase;
use crate::entity::ReducerEntity;
use crate::local::{LocalSharingStrategy, Membership};
use crate::solver::SolveResult;
use crate::stats::SharingStatistics;
use crate::termination::TerminationContext;

/// Clauses at or above this size are worth querying the reducer over
/// (§4.6.4); shorter clauses are already as tight as strengthening could
/// plausibly make them.
const STRENGTHEN_MIN_SIZE: usize = 8;

pub struct StrengtheningSharingStrategy {
    membership: Arc<Membership>,
    database: ClauseDatabase,
    bloom: Option<BloomFilter>,
    shr_lit: usize,
    reducer: Arc<ReducerEntity>,
    pub stats: SharingStatistics,
}

impl StrengtheningSharingStrategy {
    pub fn new(membership: Arc<Membership>, reducer: Arc<ReducerEntity>, shr_lit: usize, dup_detection: bool) -> Self {
        StrengtheningSharingStrategy {
            membership,
            database: ClauseDatabase::with_defaults(),
            bloom: dup_detection.then(BloomFilter::with_default_size),
            shr_lit,
            reducer,
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

    /// Queries the reducer with `clause`'s negated literals; on UNSAT,
    /// substitutes the final analysis if it is strictly shorter.
    fn strengthen(&self, clause: ClauseRef) -> ClauseRef {
        if clause.size() < STRENGTHEN_MIN_SIZE {
            return clause;
        }
        let assumptions: Vec<i32> = clause.literals().iter().map(|&lit| -lit).collect();
        if self.reducer.solve_with_assumptions(&assumptions) != SolveResult::Unsat {
            return clause;
        }
        let Some(final_lits) = self.reducer.final_analysis() else {
            return clause;
        };
        if final_lits.is_empty() || final_lits.len() >= clause.size() {
            return clause;
        }
        ClauseRecord::new(final_lits, clause.lbd(), clause.origin()).unwrap_or(clause)
    }
}

impl LocalSharingStrategy for StrengtheningSharingStrategy {
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
        if selection.is_empty() {
            return ctx.is_ending();
        }

        let strengthened: Vec<ClauseRef> = selection.into_iter().map(|c| self.strengthen(c)).collect();
        self.stats.add_shared(strengthened.len() as u64);
        for consumer in self.membership.consumers() {
            for c in &strengthened {
                if let Origin::Solver(origin_id) = c.origin() {
                    if origin_id == consumer.id() {
                        continue;
                    }
                }
                consumer.import_clause(c.clone());
            }
        }

        ctx.is_ending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, SolverEntity};
    use crate::solver::mock::MockSolver;

    fn solver(id: u32, result: SolveResult) -> Entity {
        Entity::Solver(SolverEntity::new(id, Box::new(MockSolver::new(result)), 10))
    }

    #[test]
    fn short_clauses_bypass_the_reducer_untouched() {
        let producer = solver(0, SolveResult::Sat);
        let consumer = solver(1, SolveResult::Sat);
        let membership = Arc::new(Membership::new(vec![producer.clone()], vec![consumer.clone()]));
        if let Entity::Solver(s) = &producer {
            s.export_clause_callback(ClauseRecord::new(vec![1, 2], 2, Origin::Solver(0)).unwrap());
        }
        let reducer = ReducerEntity::new(99, Box::new(MockSolver::new(SolveResult::Sat)));
        let mut strategy = StrengtheningSharingStrategy::new(membership, reducer, 1500, false);
        let ctx = TerminationContext::new();
        strategy.do_sharing(0, &ctx);
        if let Entity::Solver(s) = &consumer {
            let c = s.import_clause_callback().unwrap();
            assert_eq!(c.size(), 2);
        }
    }

    #[test]
    fn unsat_reducer_replaces_long_clause_with_final_analysis() {
        let producer = solver(0, SolveResult::Sat);
        let consumer = solver(1, SolveResult::Sat);
        let membership = Arc::new(Membership::new(vec![producer.clone()], vec![consumer.clone()]));
        let long: Vec<i32> = (1..=9).collect();
        if let Entity::Solver(s) = &producer {
            s.export_clause_callback(ClauseRecord::new(long, 5, Origin::Solver(0)).unwrap());
        }
        let mut reducer_solver = MockSolver::new(SolveResult::Unsat);
        reducer_solver.final_analysis = Some(vec![1, 2, 3]);
        let reducer = ReducerEntity::new(99, Box::new(reducer_solver));
        let mut strategy = StrengtheningSharingStrategy::new(membership, reducer, 1500, false);
        let ctx = TerminationContext::new();
        strategy.do_sharing(0, &ctx);
        if let Entity::Solver(s) = &consumer {
            let c = s.import_clause_callback().unwrap();
            assert_eq!(c.size(), 3);
        }
    }
}
