//! Termination barrier (C10): a process-wide atomic flag, condition
//! variable, and rank-tagged result, bundled into one context handle instead
//! of the original's file-scope globals (`globalEnding`, `finalResult`,
//! `finalModel`), per the DESIGN NOTES in spec.md ("Global state").

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::solver::SolveResult;

struct Outcome {
    result: SolveResult,
    winner_rank: i32,
    model: Option<Vec<i32>>,
}

/// Shared by every Sharer thread, every local and global strategy, and
/// every solver worker in a process. Cheap to clone (it's an `Arc`).
#[derive(Clone)]
pub struct TerminationContext {
    inner: Arc<Inner>,
}

struct Inner {
    ending: AtomicBool,
    mutex: Mutex<()>,
    condvar: Condvar,
    outcome: Mutex<Option<Outcome>>,
    /// Packed `(result_code << 16) | winner_rank` for the wire broadcast of
    /// §4.8.1/§6.3; `0` means "no result yet" (matching `UNKNOWN` never
    /// being broadcast as a real value other than 0 from a non-ending rank).
    broadcast_word: AtomicI64,
}

impl Default for TerminationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminationContext {
    pub fn new() -> Self {
        TerminationContext {
            inner: Arc::new(Inner {
                ending: AtomicBool::new(false),
                mutex: Mutex::new(()),
                condvar: Condvar::new(),
                outcome: Mutex::new(None),
                broadcast_word: AtomicI64::new(0),
            }),
        }
    }

    pub fn is_ending(&self) -> bool {
        self.inner.ending.load(Ordering::Acquire)
    }

    /// Declares the process-wide outcome once, waking every suspended
    /// Sharer thread. Subsequent calls are no-ops: the first rank/solver to
    /// report a result wins, matching §4.8.1's "any rank observing a
    /// non-zero broadcast sets the end flag" semantics collapsed to a
    /// single process.
    pub fn declare(&self, result: SolveResult, winner_rank: i32, model: Option<Vec<i32>>) {
        if self.inner.ending.swap(true, Ordering::AcqRel) {
            return;
        }
        *self.inner.outcome.lock().unwrap() = Some(Outcome { result, winner_rank, model });
        let word = (result.code() as i64) | ((winner_rank as i64) << 16);
        self.inner.broadcast_word.store(word, Ordering::Release);
        let _guard = self.inner.mutex.lock().unwrap();
        self.inner.condvar.notify_all();
    }

    /// Sets the flag without a winner (used when a transport-level error or
    /// local failure must still make every Sharer converge); broadcasts
    /// `UNKNOWN` per §7's error propagation rule.
    pub fn declare_unknown(&self) {
        self.declare(SolveResult::Unknown, -1, None);
    }

    /// Cancellable wait: sleeps up to `timeout` unless woken by
    /// `declare`/`interrupt`, tolerating spurious wake-ups (§4.4, §5).
    pub fn wait_timeout(&self, timeout: Duration) {
        if self.is_ending() {
            return;
        }
        let guard = self.inner.mutex.lock().unwrap();
        let _ = self.inner.condvar.wait_timeout(guard, timeout);
    }

    /// Wakes every waiting Sharer without declaring an outcome (`setInterrupt()`).
    pub fn interrupt(&self) {
        let _guard = self.inner.mutex.lock().unwrap();
        self.inner.condvar.notify_all();
    }

    pub fn result(&self) -> Option<SolveResult> {
        self.inner.outcome.lock().unwrap().as_ref().map(|o| o.result)
    }

    pub fn winner_rank(&self) -> Option<i32> {
        self.inner.outcome.lock().unwrap().as_ref().map(|o| o.winner_rank)
    }

    pub fn model(&self) -> Option<Vec<i32>> {
        self.inner.outcome.lock().unwrap().as_ref().and_then(|o| o.model.clone())
    }

    /// The packed 32-bit broadcast word of §6.3 (low 16 bits result code,
    /// high 16 bits winning rank), as used by global strategies.
    pub fn broadcast_word(&self) -> i64 {
        self.inner.broadcast_word.load(Ordering::Acquire)
    }

    /// Applies a broadcast word received from a peer (§4.8.1): if non-zero
    /// and this context hasn't already declared an outcome, adopts it.
    pub fn adopt_broadcast(&self, word: i64) {
        if word == 0 {
            return;
        }
        let code = (word & 0xFFFF) as u16;
        let winner = ((word >> 16) & 0xFFFF) as i32;
        if let Some(result) = SolveResult::from_code(code) {
            self.declare(result, winner, None);
        }
    }
}
