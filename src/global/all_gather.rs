//! All-gather strategy (§4.8.3): ranks with something to share split off
//! into a sub-communicator by `color = hasClauses` and exchange fixed
//! capacity buffers in one collective; ranks with nothing to share sit the
//! round out.

use std::sync::Arc;

use crate::bloom::BloomFilter;
use crate::clause::Origin;
use crate::global::database::GatewayDatabase;
use crate::global::termination_protocol::TerminationProtocol;
use crate::global::transport::InProcessTransport;
use crate::global::wire;
use crate::global::GlobalSharingStrategy;
use crate::stats::GlobalSharingStatistics;
use crate::termination::TerminationContext;

const SHARING_COLOUR: u64 = 1;

pub struct AllGatherStrategy {
    transport: InProcessTransport,
    termination: TerminationProtocol,
    gateway: Arc<GatewayDatabase>,
    capacity: usize,
    /// Avoids re-sending clauses gathered in a previous round and avoids
    /// inserting duplicates into the local `received` database (§4.8.3).
    seen: BloomFilter,
    pub stats: GlobalSharingStatistics,
}

impl AllGatherStrategy {
    pub fn new(transport: InProcessTransport, gateway: Arc<GatewayDatabase>, capacity: usize, root: usize) -> Self {
        AllGatherStrategy {
            termination: TerminationProtocol::new(transport.clone(), root),
            transport,
            gateway,
            capacity,
            seen: BloomFilter::with_default_size(),
            stats: GlobalSharingStatistics::new(),
        }
    }
}

impl GlobalSharingStrategy for AllGatherStrategy {
    fn do_sharing(&mut self, round: u64, ctx: &TerminationContext) -> bool {
        let mut batch = Vec::new();
        self.gateway.get_clauses_to_send(&mut batch, self.capacity);
        let has_clauses = !batch.is_empty();

        let buf = if has_clauses {
            for c in &batch {
                self.seen.test_and_insert(c.checksum(), 1);
            }
            let buf = wire::serialize(&mut batch, self.capacity);
            if !batch.is_empty() {
                self.gateway.import_clauses(batch.drain(..));
            }
            self.stats.add_message_sent();
            buf
        } else {
            Vec::new()
        };

        let color = if has_clauses { Some(SHARING_COLOUR) } else { None };
        let peer_buffers = self.transport.all_gather_split(round, color, buf);

        if has_clauses {
            for peer_buf in &peer_buffers {
                let clauses = wire::deserialize(peer_buf, Origin::External);
                for c in clauses {
                    if !self.seen.contains(c.literals()) {
                        self.seen.test_and_insert(c.checksum(), 1);
                        self.gateway.add_received_clause(c);
                        self.stats.base.add_received(1);
                    } else {
                        self.stats.base.add_received_duplicate(1);
                    }
                }
            }
        }

        self.termination.round(round, ctx)
    }
}
