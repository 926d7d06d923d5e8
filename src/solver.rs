//! Solver plugin contract (§6.1). The CDCL/local-search solvers themselves
//! are external collaborators (§1's Non-goals); this module only specifies
//! the interface the framework drives them through.

/// Outcome of a `solve()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveResult {
    Sat,
    Unsat,
    Unknown,
    Timeout,
}

/// Encodes the low-16-bit result code used on the termination wire
/// (§4.8.1, §6.3): SAT=10, UNSAT=20, UNKNOWN=0, TIMEOUT=30.
impl SolveResult {
    pub fn code(self) -> u16 {
        match self {
            SolveResult::Unknown => 0,
            SolveResult::Sat => 10,
            SolveResult::Unsat => 20,
            SolveResult::Timeout => 30,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(SolveResult::Unknown),
            10 => Some(SolveResult::Sat),
            20 => Some(SolveResult::Unsat),
            30 => Some(SolveResult::Timeout),
            _ => None,
        }
    }
}

/// A pluggable CDCL (or local-search) solver backend. The framework only
/// ever calls these methods; it never inspects the solver's internals.
pub trait CdclSolver: Send + Sync {
    fn add_initial_clauses(&mut self, clauses: &[Vec<i32>], var_count: u32);

    fn solve(&mut self, cube: &[i32]) -> SolveResult;

    fn set_solver_interrupt(&self);
    fn unset_solver_interrupt(&self);

    /// Valid only after `solve` returned `Sat`.
    fn get_model(&self) -> Option<Vec<i32>>;

    /// Valid only after `solve` returned `Unsat`: the final conflict's
    /// literals, used by the strengthening strategy's reducer (§4.6.4).
    fn get_final_analysis(&self) -> Option<Vec<i32>>;
}

#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    //! A trivial in-memory solver used by tests and by the integration
    //! scenarios in `tests/scenarios.rs`. Not part of the public API.
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    pub struct MockSolver {
        pub clauses: Vec<Vec<i32>>,
        pub interrupted: AtomicBool,
        pub next_result: SolveResult,
        pub model: Option<Vec<i32>>,
        pub final_analysis: Option<Vec<i32>>,
    }

    impl MockSolver {
        pub fn new(next_result: SolveResult) -> Self {
            MockSolver {
                clauses: Vec::new(),
                interrupted: AtomicBool::new(false),
                next_result,
                model: None,
                final_analysis: None,
            }
        }
    }

    impl CdclSolver for MockSolver {
        fn add_initial_clauses(&mut self, clauses: &[Vec<i32>], _var_count: u32) {
            self.clauses.extend_from_slice(clauses);
        }

        fn solve(&mut self, _cube: &[i32]) -> SolveResult {
            if self.interrupted.load(Ordering::Relaxed) {
                return SolveResult::Unknown;
            }
            self.next_result
        }

        fn set_solver_interrupt(&self) {
            self.interrupted.store(true, Ordering::Relaxed);
        }

        fn unset_solver_interrupt(&self) {
            self.interrupted.store(false, Ordering::Relaxed);
        }

        fn get_model(&self) -> Option<Vec<i32>> {
            self.model.clone()
        }

        fn get_final_analysis(&self) -> Option<Vec<i32>> {
            self.final_analysis.clone()
        }
    }
}
