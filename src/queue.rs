//! Lock-free MPMC clause queue (C2): a Michael-Scott queue with a dummy
//! sentinel, built on `crossbeam_epoch` for safe memory reclamation instead
//! of the naive "delete after dequeue" pattern the original implementation
//! used (see DESIGN NOTES in spec.md, "Lock-free queue lifetime").
//!
//! `ClauseQueue` is the plain FIFO (enqueue / try_dequeue / size). The
//! `ClauseBufferAlpha` variant adds the non-destructive peek operations used
//! by global strategies that need to inspect pending clauses without
//! draining them.

use std::sync::atomic::{AtomicIsize, Ordering};

use crossbeam_epoch::{self as epoch, Atomic, Owned, Shared};

use crate::clause::ClauseRef;

struct Node {
    /// `None` only for the sentinel node.
    data: Option<ClauseRef>,
    next: Atomic<Node>,
}

/// Shared guts of both queue variants: an atomic singly-linked list with
/// head/tail pointers, always containing a sentinel at the head, per §3.2.
struct RawList {
    head: Atomic<Node>,
    tail: Atomic<Node>,
    size: AtomicIsize,
}

impl RawList {
    fn new() -> Self {
        let guard = &epoch::pin();
        let sentinel = Owned::new(Node {
            data: None,
            next: Atomic::null(),
        })
        .into_shared(guard);
        RawList {
            head: Atomic::from(sentinel),
            tail: Atomic::from(sentinel),
            size: AtomicIsize::new(0),
        }
    }

    fn enqueue(&self, clause: ClauseRef) {
        let guard = &epoch::pin();
        let new_node = Owned::new(Node {
            data: Some(clause),
            next: Atomic::null(),
        })
        .into_shared(guard);

        loop {
            let tail = self.tail.load(Ordering::Acquire, guard);
            let tail_ref = unsafe { tail.deref() };
            let next = tail_ref.next.load(Ordering::Acquire, guard);

            if tail != self.tail.load(Ordering::Acquire, guard) {
                continue;
            }

            if next.is_null() {
                if tail_ref
                    .next
                    .compare_exchange(next, new_node, Ordering::Release, Ordering::Relaxed, guard)
                    .is_ok()
                {
                    let _ = self.tail.compare_exchange(
                        tail,
                        new_node,
                        Ordering::Release,
                        Ordering::Relaxed,
                        guard,
                    );
                    self.size.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            } else {
                let _ =
                    self.tail
                        .compare_exchange(tail, next, Ordering::Release, Ordering::Relaxed, guard);
            }
        }
    }

    /// Dequeues the value stored in the node *after* the sentinel, advancing
    /// `head` past the old sentinel. The retired sentinel is reclaimed
    /// through the epoch guard rather than freed immediately, so a
    /// concurrent reader that still holds a pointer to it cannot observe a
    /// dangling node.
    fn try_dequeue(&self) -> Option<ClauseRef> {
        let guard = &epoch::pin();
        loop {
            let head = self.head.load(Ordering::Acquire, guard);
            let tail = self.tail.load(Ordering::Acquire, guard);
            let head_ref = unsafe { head.deref() };
            let next = head_ref.next.load(Ordering::Acquire, guard);

            if head != self.head.load(Ordering::Acquire, guard) {
                continue;
            }

            if head == tail {
                if next.is_null() {
                    return None;
                }
                let _ =
                    self.tail
                        .compare_exchange(tail, next, Ordering::Release, Ordering::Relaxed, guard);
                continue;
            }

            let next_ref = unsafe { next.deref() };
            let value = next_ref.data.clone();

            if self
                .head
                .compare_exchange(head, next, Ordering::Release, Ordering::Relaxed, guard)
                .is_ok()
            {
                self.size.fetch_sub(1, Ordering::Relaxed);
                unsafe { guard.defer_destroy(head) };
                return value;
            }
        }
    }

    /// Non-destructive traversal from the first live node. May race with
    /// concurrent enqueues/dequeues; it is guaranteed to terminate and never
    /// dereferences reclaimed memory because the epoch guard keeps every
    /// node it visits alive for the duration of the call.
    fn read_all(&self) -> Vec<ClauseRef> {
        let guard = &epoch::pin();
        let mut out = Vec::new();
        let mut current = self.head.load(Ordering::Acquire, guard);
        loop {
            let current_ref = unsafe { current.deref() };
            let next = current_ref.next.load(Ordering::Acquire, guard);
            if next.is_null() {
                break;
            }
            let next_ref = unsafe { next.deref() };
            if let Some(clause) = &next_ref.data {
                out.push(clause.clone());
            }
            current = next;
        }
        out
    }

    fn size(&self) -> isize {
        self.size.load(Ordering::Relaxed)
    }
}

impl Drop for RawList {
    fn drop(&mut self) {
        // Single-threaded at this point: no concurrent access, so a plain
        // pointer walk without deferred reclamation is correct.
        unsafe {
            let guard = epoch::unprotected();
            let mut node = self.head.load(Ordering::Relaxed, guard);
            while !node.is_null() {
                let next = node.deref().next.load(Ordering::Relaxed, guard);
                drop(node.into_owned());
                node = next;
            }
        }
    }
}

/// Lock-free MPMC FIFO of clause records (§4.1). Never blocks; `size()` is
/// advisory and must not be relied on for correctness (§5's ordering
/// guarantees only promise per-producer FIFO order, nothing about `size`).
pub struct ClauseQueue {
    list: RawList,
}

impl ClauseQueue {
    pub fn new() -> Self {
        ClauseQueue { list: RawList::new() }
    }

    pub fn enqueue(&self, clause: ClauseRef) {
        self.list.enqueue(clause);
    }

    pub fn try_dequeue(&self) -> Option<ClauseRef> {
        self.list.try_dequeue()
    }

    pub fn size(&self) -> isize {
        self.list.size()
    }
}

impl Default for ClauseQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// `ClauseBufferAlpha` (§4.1 Variant): the same lock-free list, plus
/// non-destructive peeking and a bulk drain, used by global strategies that
/// need to inspect `toSend`/`received` contents without consuming them.
pub struct ClauseBufferAlpha {
    list: RawList,
}

impl ClauseBufferAlpha {
    pub fn new() -> Self {
        ClauseBufferAlpha { list: RawList::new() }
    }

    pub fn add_clause(&self, clause: ClauseRef) {
        self.list.enqueue(clause);
    }

    pub fn add_clauses(&self, clauses: impl IntoIterator<Item = ClauseRef>) {
        for clause in clauses {
            self.list.enqueue(clause);
        }
    }

    /// Destructive: dequeues and returns one clause.
    pub fn pop_front(&self) -> Option<ClauseRef> {
        self.list.try_dequeue()
    }

    /// Non-destructive: returns the first pending clause, if any, without
    /// removing it.
    pub fn read_clause(&self) -> Option<ClauseRef> {
        self.list.read_all().into_iter().next()
    }

    /// Non-destructive: returns every pending clause without removing any.
    pub fn read_clauses(&self) -> Vec<ClauseRef> {
        self.list.read_all()
    }

    /// Destructive: drains every pending clause.
    pub fn clear(&self) {
        while self.list.try_dequeue().is_some() {}
    }

    pub fn size(&self) -> isize {
        self.list.size()
    }
}

impl Default for ClauseBufferAlpha {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for ClauseQueue {}
unsafe impl Sync for ClauseQueue {}
unsafe impl Send for ClauseBufferAlpha {}
unsafe impl Sync for ClauseBufferAlpha {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{ClauseRecord, Origin};
    use std::sync::Arc;
    use std::thread;

    fn cls(n: i32) -> ClauseRef {
        ClauseRecord::new(vec![n], 2, Origin::Solver(0)).unwrap()
    }

    #[test]
    fn fifo_single_thread() {
        let q = ClauseQueue::new();
        for i in 1..=5 {
            q.enqueue(cls(i));
        }
        assert_eq!(q.size(), 5);
        for i in 1..=5 {
            let c = q.try_dequeue().unwrap();
            assert_eq!(c.literals()[0], i);
        }
        assert!(q.try_dequeue().is_none());
    }

    #[test]
    fn buffer_alpha_read_does_not_consume() {
        let b = ClauseBufferAlpha::new();
        b.add_clause(cls(1));
        b.add_clause(cls(2));
        let peeked = b.read_clauses();
        assert_eq!(peeked.len(), 2);
        assert_eq!(b.size(), 2);
        b.clear();
        assert_eq!(b.size(), 0);
        assert!(b.read_clause().is_none());
    }

    /// Exercises many producers and consumers concurrently to shake out ABA
    /// / use-after-free bugs in the reclamation scheme, per the DESIGN
    /// NOTES' guidance in spec.md.
    #[test]
    fn mpmc_stress() {
        let q = Arc::new(ClauseQueue::new());
        const PRODUCERS: i32 = 4;
        const PER_PRODUCER: i32 = 25_000;

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        q.enqueue(cls(p * PER_PRODUCER + i));
                    }
                })
            })
            .collect();

        let consumed = Arc::new(std::sync::atomic::AtomicI64::new(0));
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let q = Arc::clone(&q);
                let consumed = Arc::clone(&consumed);
                thread::spawn(move || {
                    let mut local = 0i64;
                    loop {
                        match q.try_dequeue() {
                            Some(_) => local += 1,
                            None => {
                                if consumed.load(Ordering::Relaxed) + local
                                    >= (PRODUCERS * PER_PRODUCER) as i64
                                {
                                    break;
                                }
                                thread::yield_now();
                            }
                        }
                    }
                    consumed.fetch_add(local, Ordering::Relaxed);
                })
            })
            .collect();

        for p in producers {
            p.join().unwrap();
        }
        for c in consumers {
            c.join().unwrap();
        }

        // Drain any stragglers a consumer might have missed right at the end.
        let mut total = consumed.load(Ordering::Relaxed);
        while let Some(_) = q.try_dequeue() {
            total += 1;
        }
        assert_eq!(total, (PRODUCERS * PER_PRODUCER) as i64);
    }
}
