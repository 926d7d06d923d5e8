//! Lock-free clause-exchange substrate for a parallel portfolio SAT solver
//! (PaInleSS-style): a lock-free clause queue, a size-bucketed clause
//! database, a Bloom-filter duplicate detector, local and global sharing
//! strategies, and the Sharer runtime and termination barrier that drive
//! them. The CDCL/local-search solvers themselves, DIMACS parsing,
//! preprocessing, and the command-line front-end are out of scope — only
//! the `solver::CdclSolver` plugin contract is specified.

pub mod bloom;
pub mod clause;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod global;
pub mod local;
pub mod queue;
pub mod sharer;
pub mod solver;
pub mod stats;
pub mod termination;
