//! Inter-process transport (§4.8): non-blocking send, probe, blocking
//! receive, and the two collectives (all-gather, broadcast) every global
//! strategy is built on. Per §4.8's explicit note ("An implementation may
//! use any inter-process message transport; the contracts below do not
//! require [MPI]"), this crate ships an in-process simulation — every
//! "rank" is a thread in the same process, exchanging messages through
//! shared queues — so the ring/all-gather/tree strategies and their
//! termination sub-protocol can be exercised without a real cluster.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

/// Message channels are kept separate per logical purpose so a probe for
/// one kind of traffic never observes another's payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTag {
    Ring,
    AllGather,
    Tree,
    TreeBroadcast,
    End,
}

const TAG_COUNT: usize = 5;

fn tag_index(tag: MessageTag) -> usize {
    match tag {
        MessageTag::Ring => 0,
        MessageTag::AllGather => 1,
        MessageTag::Tree => 2,
        MessageTag::TreeBroadcast => 3,
        MessageTag::End => 4,
    }
}

struct Inbox {
    /// `[to][from]`: point-to-point mailboxes, so `probe(from, tag)` only
    /// observes messages actually sent by that neighbour.
    queues: Vec<Vec<Mutex<VecDeque<Vec<i32>>>>>,
}

impl Inbox {
    fn new(size: usize) -> Self {
        Inbox {
            queues: (0..size)
                .map(|_| (0..size).map(|_| Mutex::new(VecDeque::new())).collect())
                .collect(),
        }
    }
}

struct RoundSlot {
    round: u64,
    /// `None` until a rank submits; ranks that opt out (no colour, or not a
    /// broadcast root) still occupy a slot so the barrier completes.
    submissions: Vec<Option<Submission>>,
    count: usize,
}

#[derive(Clone)]
enum Submission {
    Gather { color: Option<u64>, payload: Vec<i32> },
    Broadcast { payload: Vec<i32> },
}

struct Collective {
    size: usize,
    mutex: Mutex<RoundSlot>,
    cond: Condvar,
}

impl Collective {
    fn new(size: usize) -> Self {
        Collective {
            size,
            mutex: Mutex::new(RoundSlot {
                round: 0,
                submissions: vec![None; size],
                count: 0,
            }),
            cond: Condvar::new(),
        }
    }

    /// Collective barrier over every rank: each rank submits once per
    /// `round` and blocks until all `size` ranks have submitted, then reads
    /// back the full submission table. Mirrors a collective communicator
    /// operation (e.g. `MPI_Comm_split` followed by gather/bcast) where
    /// every rank in the parent group must call in, even ranks that end up
    /// contributing nothing.
    fn rendezvous(&self, rank: usize, round: u64, submission: Submission) -> Vec<Option<Submission>> {
        let mut slot = self.mutex.lock().unwrap();
        while slot.round < round {
            slot = self.cond.wait(slot).unwrap();
        }
        slot.submissions[rank] = Some(submission);
        slot.count += 1;
        if slot.count == self.size {
            self.cond.notify_all();
        } else {
            while slot.count < self.size {
                slot = self.cond.wait(slot).unwrap();
            }
        }
        let result = slot.submissions.clone();
        // The last rank out resets the slot for the next round. A rank
        // lagging behind simply waits again at `slot.round < round`.
        if slot.round == round {
            slot.round = round + 1;
            slot.submissions = vec![None; self.size];
            slot.count = 0;
            self.cond.notify_all();
        }
        result
    }
}

struct TransportState {
    size: usize,
    inbox: Inbox,
    all_gather: Collective,
    broadcast: Collective,
}

/// One rank's handle onto a shared in-process transport. Cheap to clone.
#[derive(Clone)]
pub struct InProcessTransport {
    rank: usize,
    state: Arc<TransportState>,
}

impl InProcessTransport {
    /// Builds `size` connected handles, one per simulated rank.
    pub fn cluster(size: usize) -> Vec<InProcessTransport> {
        let state = Arc::new(TransportState {
            size,
            inbox: Inbox::new(size),
            all_gather: Collective::new(size),
            broadcast: Collective::new(size),
        });
        (0..size)
            .map(|rank| InProcessTransport {
                rank,
                state: Arc::clone(&state),
            })
            .collect()
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.state.size
    }

    /// Posts a message to `to` on channel `tag`. Delivery is synchronous in
    /// this simulation, so the "non-blocking send" of §4.8 always completes
    /// immediately; `test_sent` exists purely so strategy code reads the
    /// same as it would against an asynchronous transport.
    pub fn send(&self, to: usize, tag: MessageTag, payload: Vec<i32>) {
        let idx = tag_index(tag);
        self.state.inbox.queues[idx][to].lock().unwrap().push_back(payload);
    }

    pub fn test_sent(&self) -> bool {
        true
    }

    /// Non-blocking: true iff a message from `from` on `tag` is waiting.
    pub fn probe(&self, from: usize, tag: MessageTag) -> bool {
        let idx = tag_index(tag);
        self.state.inbox.queues[idx][self.rank]
            .lock()
            .unwrap()
            .iter()
            .any(|msg| msg.first().copied() == Some(from as i32))
    }

    /// Non-blocking receive; `None` if nothing is queued from `from`.
    ///
    /// Senders address mailboxes by `to` only, so several neighbours can
    /// land messages in the same deque; each payload is tagged with its
    /// origin rank (see `send_tagged`), and this scans for the first entry
    /// matching `from` rather than assuming FIFO order across senders.
    pub fn try_receive(&self, from: usize, tag: MessageTag) -> Option<Vec<i32>> {
        let idx = tag_index(tag);
        let mut q = self.state.inbox.queues[idx][self.rank].lock().unwrap();
        let pos = q.iter().position(|msg| msg.first().copied() == Some(from as i32))?;
        let mut msg = q.remove(pos).unwrap();
        msg.remove(0);
        Some(msg)
    }

    /// Blocking receive: spins until a message from `from` on `tag` is
    /// available. Used where §4.8 calls for a genuinely blocking receive
    /// (e.g. deserializing a probed ring message).
    pub fn receive(&self, from: usize, tag: MessageTag) -> Vec<i32> {
        loop {
            if let Some(msg) = self.try_receive(from, tag) {
                return msg;
            }
            thread::sleep(Duration::from_micros(50));
        }
    }

    /// Posts `payload` to `to`, tagging it with this rank's id so the
    /// receiver's `try_receive`/`receive` can filter by sender.
    pub fn send_tagged(&self, to: usize, tag: MessageTag, mut payload: Vec<i32>) {
        payload.insert(0, self.rank as i32);
        self.send(to, tag, payload);
    }

    /// Collective split + all-gather (§4.8.3): every rank in the cluster
    /// calls in for `round`; ranks that pass `color = Some(_)` exchange
    /// `payload` with every other rank sharing that colour. Ranks passing
    /// `None` (ranks without clauses to share "sit out" per §4.8.3)
    /// contribute nothing and get an empty result back.
    pub fn all_gather_split(&self, round: u64, color: Option<u64>, payload: Vec<i32>) -> Vec<Vec<i32>> {
        let submission = Submission::Gather { color, payload };
        let table = self.state.all_gather.rendezvous(self.rank, round, submission);
        let my_color = color;
        match my_color {
            None => Vec::new(),
            Some(c) => table
                .into_iter()
                .filter_map(|s| match s {
                    Some(Submission::Gather { color: Some(oc), payload }) if oc == c => Some(payload),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Collective broadcast (§4.8.4's root-down broadcast): every rank
    /// calls in for `round`; only `root` passes `Some(payload)`, everyone
    /// receives the root's payload back.
    pub fn broadcast(&self, round: u64, root: usize, payload: Option<Vec<i32>>) -> Vec<i32> {
        let submission = Submission::Broadcast {
            payload: payload.unwrap_or_default(),
        };
        let table = self.state.broadcast.rendezvous(self.rank, round, submission);
        match &table[root] {
            Some(Submission::Broadcast { payload }) => payload.clone(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn point_to_point_send_receive() {
        let cluster = InProcessTransport::cluster(2);
        cluster[0].send_tagged(1, MessageTag::Ring, vec![42]);
        assert!(cluster[1].probe(0, MessageTag::Ring));
        let msg = cluster[1].receive(0, MessageTag::Ring);
        assert_eq!(msg, vec![42]);
    }

    #[test]
    fn all_gather_exchanges_same_colour_only() {
        let cluster = InProcessTransport::cluster(4);
        let handles: Vec<_> = cluster
            .into_iter()
            .enumerate()
            .map(|(rank, t)| {
                thread::spawn(move || {
                    // Even ranks opt in with colour 1, odd ranks sit out.
                    let color = if rank % 2 == 0 { Some(1u64) } else { None };
                    t.all_gather_split(0, color, vec![rank as i32])
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results[0].len(), 2); // ranks 0 and 2
        assert!(results[1].is_empty());
        assert_eq!(results[2].len(), 2);
        assert!(results[3].is_empty());
    }

    #[test]
    fn broadcast_delivers_root_payload_to_all() {
        let cluster = InProcessTransport::cluster(3);
        let handles: Vec<_> = cluster
            .into_iter()
            .enumerate()
            .map(|(rank, t)| {
                thread::spawn(move || {
                    let payload = if rank == 1 { Some(vec![7, 8, 9]) } else { None };
                    t.broadcast(0, 1, payload)
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), vec![7, 8, 9]);
        }
    }
}
