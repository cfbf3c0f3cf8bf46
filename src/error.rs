//! Typed error conditions for the core.
//!
//! Decode failures and out-of-range access are conditions a caller needs
//! to match on, so they get a `thiserror` enum here rather than a
//! stringly-typed error type. Programmer errors (allocation failure,
//! "cannot happen" branches) stay as `panic!`/`assert!` at the call site -
//! no `Result` laundering of invariant violations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("block decode error: {reason}")]
    BlockDecode { reason: String },

    #[error("block meta decode error: {reason}")]
    MetaDecode { reason: String },

    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("dereferenced an end or invalid iterator")]
    IteratorOutOfRange,

    #[error("compared iterators of different concrete kinds")]
    IteratorKindMismatch,
}

pub type Result<T> = std::result::Result<T, CoreError>;
