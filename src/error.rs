//! Crate-wide error type.
//!
//! Routine outcomes (admission refused, duplicate dropped, database
//! empty) are not errors — they are `bool`/`Option` returns, matching
//! the original implementation's error taxonomy (see SPEC_FULL.md §10.2).
//! `PainlessError` is reserved for caller misuse and malformed input.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PainlessError {
    #[error("clause has {0} literals, which is not a supported size (must be >= 1)")]
    MalformedClause(usize),

    #[error("clause contains duplicate or complementary literal {0}")]
    DuplicateLiteral(i32),

    #[error("deleteFrom requires size >= 1, got {0}")]
    InvalidDeleteSize(i32),

    #[error("bloom filter requires a non-zero number of bits")]
    EmptyBloomFilter,

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("serialized clause batch exceeds capacity ({0} > {1})")]
    BatchOverflow(usize, usize),

    #[error("transport operation failed: {0}")]
    Transport(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PainlessError>;
