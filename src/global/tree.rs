//! Tree-aggregated ("Mallob") strategy (§4.8.4): a binary heap topology
//! over the rank space. Each round, clauses flow up the tree through a
//! k-way merge under a sub-linear budget, and the root's merged pool is
//! broadcast back down so every rank converges on the same deduplicated
//! set.

use std::collections::HashSet;
use std::sync::Arc;

use crate::bloom::BloomFilter;
use crate::clause::{ClauseRef, Origin};
use crate::global::database::GatewayDatabase;
use crate::global::termination_protocol::TerminationProtocol;
use crate::global::transport::{InProcessTransport, MessageTag};
use crate::global::wire;
use crate::global::GlobalSharingStrategy;
use crate::stats::GlobalSharingStatistics;
use crate::termination::TerminationContext;

pub struct TreeStrategy {
    transport: InProcessTransport,
    termination: TerminationProtocol,
    gateway: Arc<GatewayDatabase>,
    base_size: usize,
    max_cls_size: usize,
    parent: Option<usize>,
    children: Vec<usize>,
    /// Drops clauses already delivered in a previous round's broadcast
    /// (§4.8.4's "separate Bloom filter"), tracked independently per rank.
    final_seen: BloomFilter,
    pub stats: GlobalSharingStatistics,
}

impl TreeStrategy {
    /// `root` is always rank 0: the heap-index formulas of §4.8.4
    /// (`parent = (rank-1)/2`) assume the root occupies index 0.
    pub fn new(transport: InProcessTransport, gateway: Arc<GatewayDatabase>, base_size: usize, max_cls_size: usize) -> Self {
        let rank = transport.rank();
        let n = transport.size();
        let parent = if rank == 0 { None } else { Some((rank - 1) / 2) };
        let mut children = Vec::new();
        let left = 2 * rank + 1;
        let right = 2 * rank + 2;
        if left < n {
            children.push(left);
        }
        if right < n {
            children.push(right);
        }
        TreeStrategy {
            termination: TerminationProtocol::new(transport.clone(), 0),
            transport,
            gateway,
            base_size,
            max_cls_size,
            parent,
            children,
            final_seen: BloomFilter::with_default_size(),
            stats: GlobalSharingStatistics::new(),
        }
    }

    /// The sub-linear budget of §4.8.4: `aggregated * 0.875^log2(aggregated) * baseSize`.
    fn budget(&self, aggregated: u64) -> usize {
        let aggregated = aggregated.max(1) as f64;
        (aggregated * 0.875f64.powf(aggregated.log2()) * self.base_size as f64) as usize
    }

    /// Filters duplicates and clauses above `max-cls-size`, sorts by
    /// `(size, lbd)` ascending, then truncates to fit `budget` literals,
    /// keeping the best (smallest/lowest-lbd) prefix.
    fn merge(&self, mut pool: Vec<ClauseRef>, budget: usize) -> Vec<ClauseRef> {
        pool.retain(|c| c.size() <= self.max_cls_size);
        pool.sort_by(|a, b| a.size().cmp(&b.size()).then(a.lbd().cmp(&b.lbd())));
        let mut seen = HashSet::new();
        pool.retain(|c| seen.insert(c.checksum()));

        let mut used = 0usize;
        let mut keep = 0usize;
        for c in &pool {
            if used + c.size() > budget {
                break;
            }
            used += c.size();
            keep += 1;
        }
        let overflow: Vec<_> = pool.split_off(keep);
        if !overflow.is_empty() {
            self.gateway.import_clauses(overflow);
        }
        pool
    }

    /// Installs a broadcast payload locally: deduplicates against
    /// `final_seen`, feeds genuinely new clauses into `received`.
    fn install_final(&mut self, buf: &[i32]) {
        let clauses = wire::deserialize(buf, Origin::External);
        let mut new_count = 0u64;
        for c in clauses {
            if !self.final_seen.contains(c.literals()) {
                self.final_seen.test_and_insert(c.checksum(), 1);
                self.gateway.add_received_clause(c);
                new_count += 1;
            }
        }
        self.stats.base.add_received(new_count);
    }
}

impl GlobalSharingStrategy for TreeStrategy {
    fn do_sharing(&mut self, round: u64, ctx: &TerminationContext) -> bool {
        let mut own = Vec::new();
        self.gateway.get_clauses_to_send(&mut own, self.base_size);
        // Mark this rank's own contribution as already seen, so the
        // identical content coming back down through the root's broadcast
        // doesn't get reinstalled into this rank's own `received`.
        for c in &own {
            self.final_seen.test_and_insert(c.checksum(), 1);
        }
        let mut pool = own;
        let mut aggregated: u64 = 1;

        for &child in &self.children {
            let msg = self.transport.receive(child, MessageTag::Tree);
            let leaf_count = msg.last().copied().unwrap_or(1).max(1) as u64;
            let payload = &msg[..msg.len().saturating_sub(1)];
            pool.extend(wire::deserialize(payload, Origin::External));
            aggregated += leaf_count;
        }

        let budget = self.budget(aggregated);
        let merged = self.merge(pool, budget);

        if let Some(parent) = self.parent {
            let mut outgoing = merged.clone();
            let capacity = outgoing.iter().map(|c| c.size() + 2).sum::<usize>().max(1);
            let mut buf = wire::serialize(&mut outgoing, capacity);
            buf.push(aggregated as i32);
            self.transport.send_tagged(parent, MessageTag::Tree, buf);
            self.stats.add_message_sent();

            let final_buf = self.transport.receive(parent, MessageTag::TreeBroadcast);
            for &child in &self.children {
                self.transport
                    .send_tagged(child, MessageTag::TreeBroadcast, final_buf.clone());
            }
            self.install_final(&final_buf);
        } else {
            let mut broadcast_pool = merged;
            broadcast_pool.retain(|c| !self.final_seen.contains(c.literals()));
            let capacity = broadcast_pool.iter().map(|c| c.size() + 2).sum::<usize>().max(1);
            let final_buf = wire::serialize(&mut broadcast_pool, capacity);
            for &child in &self.children {
                self.transport
                    .send_tagged(child, MessageTag::TreeBroadcast, final_buf.clone());
            }
            self.install_final(&final_buf);
        }

        self.termination.round(round, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{ClauseRecord, Origin as ClauseOrigin};
    use crate::global::transport::InProcessTransport;
    use std::thread;

    #[test]
    fn clause_submitted_at_a_leaf_reaches_every_rank() {
        // Heap of 5 ranks: 0 is root; children 1,2; 2's children 3 doesn't
        // exist since 2*2+1=5 is out of range for N=5... use N=7 (a
        // complete binary tree of depth 2) so every node has two children
        // except the leaves.
        let n = 7;
        let transports = InProcessTransport::cluster(n);
        let gateways: Vec<_> = (0..n).map(|id| Arc::new(GatewayDatabase::new(id as u32, 50, 10_000))).collect();

        // Rank 5 (a leaf) learns a clause.
        let cls = ClauseRecord::new(vec![1, -2], 2, ClauseOrigin::Solver(5)).unwrap();
        gateways[5].import_clause(cls);

        let handles: Vec<_> = transports
            .into_iter()
            .zip(gateways.iter().cloned())
            .map(|(t, gw)| {
                thread::spawn(move || {
                    let ctx = TerminationContext::new();
                    let mut strategy = TreeStrategy::new(t, gw.clone(), 64, 50);
                    strategy.do_sharing(0, &ctx);
                    gw.received_size()
                })
            })
            .collect();

        let sizes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for (rank, size) in sizes.iter().enumerate() {
            if rank == 5 {
                continue; // the originator never re-adds its own clause into `received`
            }
            assert_eq!(*size, 1, "rank {rank} did not receive the broadcast clause");
        }
    }
}
