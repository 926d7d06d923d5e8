//! Ring strategy (§4.8.2): each rank exchanges a fresh batch with both its
//! ring neighbours every round, propagating any clause around the ring in
//! O(N) rounds.

use std::sync::Arc;

use crate::bloom::BloomFilter;
use crate::clause::Origin;
use crate::global::database::GatewayDatabase;
use crate::global::termination_protocol::TerminationProtocol;
use crate::global::transport::{InProcessTransport, MessageTag};
use crate::global::wire;
use crate::global::GlobalSharingStrategy;
use crate::stats::GlobalSharingStatistics;
use crate::termination::TerminationContext;

pub struct RingStrategy {
    transport: InProcessTransport,
    termination: TerminationProtocol,
    gateway: Arc<GatewayDatabase>,
    capacity: usize,
    left: usize,
    right: usize,
    bootstrapped: bool,
    /// Tracks every clause checksum this rank has already forwarded, so a
    /// clause making its way back around the ring is dropped instead of
    /// circulating forever.
    seen: BloomFilter,
    pub stats: GlobalSharingStatistics,
}

impl RingStrategy {
    pub fn new(transport: InProcessTransport, gateway: Arc<GatewayDatabase>, capacity: usize, root: usize) -> Self {
        let n = transport.size();
        let rank = transport.rank();
        let left = (rank + 1) % n;
        let right = (rank + n - 1) % n;
        RingStrategy {
            termination: TerminationProtocol::new(transport.clone(), root),
            transport,
            gateway,
            capacity,
            left,
            right,
            bootstrapped: false,
            seen: BloomFilter::with_default_size(),
            stats: GlobalSharingStatistics::new(),
        }
    }

    /// Drains every waiting message from `neighbour`, relaying any clause
    /// not seen before into both `received` (for local consumption) and
    /// back into `toSend` (so it keeps propagating to the next hop).
    fn drain_neighbour(&mut self, neighbour: usize) {
        while let Some(msg) = self.transport.try_receive(neighbour, MessageTag::Ring) {
            if msg.is_empty() {
                continue; // the zero-length bootstrap send
            }
            let clauses = wire::deserialize(&msg, Origin::External);
            let fresh: Vec<_> = clauses
                .into_iter()
                .filter(|c| {
                    let new = !self.seen.contains(c.literals());
                    if new {
                        self.seen.test_and_insert(c.checksum(), 1);
                    }
                    new
                })
                .collect();
            if !fresh.is_empty() {
                self.stats.base.add_received(fresh.len() as u64);
                self.gateway.add_received_clauses(fresh.iter().cloned());
                self.gateway.import_clauses(fresh);
            }
        }
    }
}

impl GlobalSharingStrategy for RingStrategy {
    fn do_sharing(&mut self, round: u64, ctx: &TerminationContext) -> bool {
        if !self.bootstrapped {
            self.transport.send_tagged(self.left, MessageTag::Ring, Vec::new());
            self.transport.send_tagged(self.right, MessageTag::Ring, Vec::new());
            self.bootstrapped = true;
        }

        let mut batch = Vec::new();
        self.gateway.get_clauses_to_send(&mut batch, self.capacity);
        if !batch.is_empty() {
            // Mark everything leaving this rank as seen, so it is dropped
            // rather than re-relayed if it comes back around the ring.
            for c in &batch {
                self.seen.test_and_insert(c.checksum(), 1);
            }
            let buf = wire::serialize(&mut batch, self.capacity);
            if !batch.is_empty() {
                // Didn't fit: hand the remainder back to `toSend` for the
                // next round, per §4.8.
                self.gateway.import_clauses(batch.drain(..));
            }
            self.stats.base.add_shared(1);
            self.stats.add_message_sent();
            self.transport.send_tagged(self.left, MessageTag::Ring, buf.clone());
            self.stats.add_message_sent();
            self.transport.send_tagged(self.right, MessageTag::Ring, buf);
        }

        // Every rank posts this round's sends before any rank starts
        // draining, so a clause relayed this round is guaranteed visible
        // to its next hop in the very next round rather than racing an
        // arbitrary number of rounds depending on thread scheduling.
        let _ = self.transport.all_gather_split(round, Some(0), Vec::new());

        self.drain_neighbour(self.left);
        self.drain_neighbour(self.right);

        self.termination.round(round, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{ClauseRecord, Origin as ClauseOrigin};
    use crate::global::transport::InProcessTransport;
    use std::thread;

    /// Rank 0 submits a clause; by round 3 every other rank has it in
    /// `received` (§8.3 scenario 4).
    #[test]
    fn clause_reaches_every_rank_within_n_minus_one_rounds() {
        let transports = InProcessTransport::cluster(4);
        let gateways: Vec<_> = (0..4).map(|id| Arc::new(GatewayDatabase::new(id, 50, 10_000))).collect();

        let cls = ClauseRecord::new(vec![1, 2, 3], 2, ClauseOrigin::Solver(0)).unwrap();
        gateways[0].import_clause(cls);

        let handles: Vec<_> = transports
            .into_iter()
            .zip(gateways.iter().cloned())
            .map(|(t, gw)| {
                thread::spawn(move || {
                    let ctx = TerminationContext::new();
                    let mut strategy = RingStrategy::new(t, gw.clone(), 64, 0);
                    for round in 0..3u64 {
                        strategy.do_sharing(round, &ctx);
                    }
                    gw.received_size()
                })
            })
            .collect();

        let sizes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(sizes[1], 1);
        assert_eq!(sizes[2], 1);
        assert_eq!(sizes[3], 1);
    }
}
