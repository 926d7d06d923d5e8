//! Global gateway database (C7): the pair of size-bucketed databases shared
//! between the local sharing strategies and the global (inter-node)
//! strategies (§3.6, §4.7).

use std::sync::atomic::{AtomicU32, Ordering};

use crate::clause::ClauseRef;
use crate::database::ClauseDatabase;

/// Acts as one of the local sharing entities (§4.5) on the local side, and
/// as the port the global strategy reads/writes on the network side
/// (§4.7). `toSend` holds locally produced clauses awaiting emission;
/// `received` holds clauses delivered from peers awaiting injection into
/// local consumers.
pub struct GatewayDatabase {
    id: u32,
    to_send: ClauseDatabase,
    received: ClauseDatabase,
    /// Outbound clauses touching a variable above this cap are silently
    /// dropped (0 = no cap), so preprocessor-introduced variables unknown
    /// to peers never leak onto the wire (§3.6).
    max_var: AtomicU32,
}

impl GatewayDatabase {
    pub fn new(id: u32, max_size: usize, admission_cap: u64) -> Self {
        GatewayDatabase {
            id,
            to_send: ClauseDatabase::new(max_size, admission_cap),
            received: ClauseDatabase::new(max_size, admission_cap),
            max_var: AtomicU32::new(0),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn set_max_var(&self, max_var: u32) {
        self.max_var.store(max_var, Ordering::Relaxed);
    }

    pub fn max_var(&self) -> u32 {
        self.max_var.load(Ordering::Relaxed)
    }

    /// Local-side import (§4.7): drops clauses mentioning a variable beyond
    /// `max_var`, otherwise admits to `toSend`.
    pub fn import_clause(&self, clause: ClauseRef) -> bool {
        let cap = self.max_var();
        if cap > 0 && clause.literals().iter().any(|&lit| lit.unsigned_abs() > cap) {
            log::warn!(
                "gateway {}: dropping outbound clause referencing a variable beyond maxVar={}",
                self.id,
                cap
            );
            return false;
        }
        self.to_send.add_clause(clause)
    }

    pub fn import_clauses(&self, clauses: impl IntoIterator<Item = ClauseRef>) {
        for clause in clauses {
            self.import_clause(clause);
        }
    }

    /// Local-side export (§4.7): draws from `received`, unlimited.
    pub fn export_clauses(&self, out: &mut Vec<ClauseRef>) {
        self.received.get_clauses(out);
    }

    /// Local-side export against a literal budget.
    pub fn export_clauses_budgeted(&self, out: &mut Vec<ClauseRef>, budget: usize) -> usize {
        self.received.give_selection(out, budget)
    }

    /// Network-side drain (§4.7's `getClausesToSend`).
    pub fn get_clauses_to_send(&self, out: &mut Vec<ClauseRef>, budget: usize) -> usize {
        self.to_send.give_selection(out, budget)
    }

    pub fn get_clause_to_send(&self) -> Option<ClauseRef> {
        self.to_send.give_one_clause()
    }

    /// Network-side fill (§4.7's `addReceivedClauses`).
    pub fn add_received_clauses(&self, clauses: impl IntoIterator<Item = ClauseRef>) {
        for clause in clauses {
            self.received.add_clause(clause);
        }
    }

    pub fn add_received_clause(&self, clause: ClauseRef) -> bool {
        self.received.add_clause(clause)
    }

    pub fn clear(&self) {
        let _ = self.to_send.delete_from(1);
        let _ = self.received.delete_from(1);
    }

    pub fn to_send_size(&self) -> usize {
        self.to_send.get_size()
    }

    pub fn received_size(&self) -> usize {
        self.received.get_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{ClauseRecord, Origin};

    #[test]
    fn drops_clauses_above_max_var() {
        let gw = GatewayDatabase::new(0, 10, 10_000);
        gw.set_max_var(5);
        let allowed = ClauseRecord::new(vec![1, 2], 2, Origin::Solver(0)).unwrap();
        let rejected = ClauseRecord::new(vec![1, 9], 2, Origin::Solver(0)).unwrap();
        assert!(gw.import_clause(allowed));
        assert!(!gw.import_clause(rejected));
        assert_eq!(gw.to_send_size(), 1);
    }

    #[test]
    fn roundtrip_through_received() {
        let gw = GatewayDatabase::new(0, 10, 10_000);
        let cls = ClauseRecord::new(vec![1, 2], 2, Origin::External).unwrap();
        assert!(gw.add_received_clause(cls));
        let mut out = Vec::new();
        gw.export_clauses(&mut out);
        assert_eq!(out.len(), 1);
    }
}
