//! Termination sub-protocol (§4.8.1, §6.3): a single distinguished root
//! rank collects END messages from every other rank and broadcasts the
//! packed `(result_code | winner_rank << 16)` word each round. Shared by
//! every global strategy so ring/all-gather/tree all converge the same way.

use crate::global::transport::{InProcessTransport, MessageTag};
use crate::solver::SolveResult;
use crate::termination::TerminationContext;

pub struct TerminationProtocol {
    transport: InProcessTransport,
    root: usize,
}

impl TerminationProtocol {
    pub fn new(transport: InProcessTransport, root: usize) -> Self {
        TerminationProtocol { transport, root }
    }

    pub fn root(&self) -> usize {
        self.root
    }

    /// One round: non-root ranks forward a declared outcome to root (kept
    /// idempotent by resending every round until convergence, since
    /// `TerminationContext::declare` is itself a first-call-wins no-op on
    /// repeats — this tolerates a message landing after root has already
    /// polled for this round rather than requiring a stricter in-order
    /// handshake); root drains its non-blocking end-receives; every rank
    /// (root included) then takes part in the collective broadcast of the
    /// current result word. Returns `true` once a non-zero result has been
    /// observed anywhere, i.e. the calling Sharer should stop.
    pub fn round(&self, round: u64, ctx: &TerminationContext) -> bool {
        let my_rank = self.transport.rank();

        if my_rank != self.root {
            if ctx.is_ending() {
                if let Some(result) = ctx.result() {
                    let winner = ctx.winner_rank().unwrap_or(my_rank as i32);
                    self.transport
                        .send_tagged(self.root, MessageTag::End, vec![result.code() as i32, winner]);
                }
            }
        } else {
            for peer in 0..self.transport.size() {
                if peer == self.root {
                    continue;
                }
                if let Some(msg) = self.transport.try_receive(peer, MessageTag::End) {
                    if msg.len() == 2 {
                        if let Some(result) = SolveResult::from_code(msg[0] as u16) {
                            ctx.declare(result, msg[1], None);
                        }
                    }
                }
            }
        }

        let payload = if my_rank == self.root {
            Some(vec![ctx.broadcast_word() as i32])
        } else {
            None
        };
        let word = self.transport.broadcast(round, self.root, payload);
        if let Some(&w) = word.first() {
            ctx.adopt_broadcast(w as i64);
        }
        ctx.is_ending()
    }
}
