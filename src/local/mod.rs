//! Local sharing strategies (C6, §4.6): share the same outer loop (drain
//! producers → filter → select → broadcast) and the same dynamic
//! producer/consumer membership scheme (§4.6.5).

pub mod hordesat;
pub mod hordesat_alt;
pub mod simple;
pub mod strengthening;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::entity::Entity;

/// One round of a local sharing strategy (§4.6): drains, filters, selects,
/// and broadcasts. Returns `true` when the Sharer driving this strategy
/// should stop. An alias of the same trait the global strategies implement
/// (`sharer::SharingStrategy`), so a `Sharer` can round-robin over a mix of
/// local and global strategies without a second trait object type.
pub use crate::sharer::SharingStrategy as LocalSharingStrategy;

/// Dynamic producer/consumer membership (§4.6.5): `addProducer` /
/// `addConsumer` / `removeProducer` / `removeConsumer` enqueue changes
/// under a mutex; the next round begins by draining the add/remove queues,
/// holding the lock only during the splice.
#[derive(Default)]
pub struct Membership {
    producers: Mutex<Vec<Entity>>,
    consumers: Mutex<Vec<Entity>>,
    pending_add_producers: Mutex<Vec<Entity>>,
    pending_remove_producers: Mutex<Vec<u32>>,
    pending_add_consumers: Mutex<Vec<Entity>>,
    pending_remove_consumers: Mutex<Vec<u32>>,
    /// Checked at the start of every round instead of unconditionally
    /// locking both pending queues, per §5's "atomic must-act flags".
    dirty: AtomicBool,
    /// Unit clauses broadcast by HordeSatAlt's pooled round (§4.6.2),
    /// replayed into any consumer added after the fact so it isn't missed
    /// (§4.6.5).
    saved_units: Mutex<Vec<crate::clause::ClauseRef>>,
}

impl Membership {
    pub fn new(producers: Vec<Entity>, consumers: Vec<Entity>) -> Self {
        Membership {
            producers: Mutex::new(producers),
            consumers: Mutex::new(consumers),
            pending_add_producers: Mutex::new(Vec::new()),
            pending_remove_producers: Mutex::new(Vec::new()),
            pending_add_consumers: Mutex::new(Vec::new()),
            pending_remove_consumers: Mutex::new(Vec::new()),
            dirty: AtomicBool::new(false),
            saved_units: Mutex::new(Vec::new()),
        }
    }

    /// Records a unit clause broadcast this round so it can be replayed into
    /// consumers added afterwards (§4.6.5).
    pub fn save_unit(&self, clause: crate::clause::ClauseRef) {
        self.saved_units.lock().unwrap().push(clause);
    }

    pub fn add_producer(&self, entity: Entity) {
        self.pending_add_producers.lock().unwrap().push(entity);
        self.dirty.store(true, Ordering::Release);
    }

    pub fn remove_producer(&self, id: u32) {
        self.pending_remove_producers.lock().unwrap().push(id);
        self.dirty.store(true, Ordering::Release);
    }

    pub fn add_consumer(&self, entity: Entity) {
        self.pending_add_consumers.lock().unwrap().push(entity);
        self.dirty.store(true, Ordering::Release);
    }

    pub fn remove_consumer(&self, id: u32) {
        self.pending_remove_consumers.lock().unwrap().push(id);
        self.dirty.store(true, Ordering::Release);
    }

    /// Splices in/out the pending membership changes. Call once at the
    /// start of every round.
    pub fn apply_pending(&self) {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return;
        }
        {
            let mut adds = self.pending_add_producers.lock().unwrap();
            if !adds.is_empty() {
                self.producers.lock().unwrap().extend(adds.drain(..));
            }
        }
        {
            let mut removes = self.pending_remove_producers.lock().unwrap();
            if !removes.is_empty() {
                let mut producers = self.producers.lock().unwrap();
                producers.retain(|e| !removes.contains(&e.id()));
                removes.clear();
            }
        }
        {
            let mut adds = self.pending_add_consumers.lock().unwrap();
            if !adds.is_empty() {
                let saved = self.saved_units.lock().unwrap();
                for entity in adds.iter() {
                    for unit in saved.iter() {
                        entity.import_clause(unit.clone());
                    }
                }
                drop(saved);
                self.consumers.lock().unwrap().extend(adds.drain(..));
            }
        }
        {
            let mut removes = self.pending_remove_consumers.lock().unwrap();
            if !removes.is_empty() {
                let mut consumers = self.consumers.lock().unwrap();
                consumers.retain(|e| !removes.contains(&e.id()));
                removes.clear();
            }
        }
    }

    pub fn producers(&self) -> Vec<Entity> {
        self.producers.lock().unwrap().clone()
    }

    pub fn consumers(&self) -> Vec<Entity> {
        self.consumers.lock().unwrap().clone()
    }

    /// Broadcasts `clauses` to every consumer whose id differs from
    /// `origin_id` (no self-feedback, §4.6.1 step 5).
    pub fn broadcast_excluding(&self, origin_id: u32, clauses: &[crate::clause::ClauseRef]) {
        for consumer in self.consumers.lock().unwrap().iter() {
            if consumer.id() == origin_id {
                continue;
            }
            for clause in clauses {
                consumer.import_clause(clause.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::mock::MockSolver;
    use crate::solver::SolveResult;
    use crate::entity::SolverEntity;

    #[test]
    fn pending_membership_changes_apply_on_next_round() {
        let m = Membership::new(Vec::new(), Vec::new());
        let entity = Entity::Solver(SolverEntity::new(0, Box::new(MockSolver::new(SolveResult::Unknown)), 2));
        m.add_consumer(entity);
        assert_eq!(m.consumers().len(), 0);
        m.apply_pending();
        assert_eq!(m.consumers().len(), 1);
        m.remove_consumer(0);
        m.apply_pending();
        assert_eq!(m.consumers().len(), 0);
    }
}
