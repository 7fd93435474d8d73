// This module defines the error types for irframe using the thiserror crate for idiomatic
// Rust error handling. BuilderError covers the contract violations of the arena node builder:
// a node type too large for one arena, a checkpoint handed to a builder that did not create
// it, and a checkpoint restored or committed out of LIFO order. RegisterError covers the
// register placement table: an out-of-range entry index. Each variant carries the context
// needed to diagnose the calling compiler stage. The infallible APIs panic with these
// messages; the try_* variants return them so callers can surface them as they see fit.

//! Error types for irframe.
//!
//! Using thiserror for more idiomatic error handling.

use super::node_builder::Checkpoint;
use thiserror::Error;

/// Contract violations reported by the node builder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuilderError {
    #[error("node of {size} bytes (align {align}) does not fit in a {capacity}-byte arena")]
    OutOfArenaCapacity {
        size: usize,
        align: usize,
        capacity: usize,
    },

    #[error("checkpoint belongs to builder #{owner}, not builder #{builder}")]
    ForeignCheckpoint { owner: u32, builder: u32 },

    #[error("checkpoint at depth {depth} is not the innermost open checkpoint ({open} open)")]
    CheckpointOutOfOrder { depth: usize, open: usize },
}

/// A checkpoint that could not be restored or committed, handed back to
/// the caller together with the reason.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("{error}")]
pub struct RejectedCheckpoint {
    pub checkpoint: Checkpoint,
    pub error: BuilderError,
}

impl RejectedCheckpoint {
    pub fn into_checkpoint(self) -> Checkpoint {
        self.checkpoint
    }
}

/// Errors reported by register placement tables.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("register index {index} out of range for table of {count} entries")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("offset {offset} shifted by {delta} does not fit in 32 bits")]
    OffsetOverflow { offset: i32, delta: i32 },
}

/// Result type alias for node builder operations.
pub type BuilderResult<T> = Result<T, BuilderError>;

/// Result of closing a checkpoint.
pub type CheckpointResult = Result<(), RejectedCheckpoint>;

/// Result type alias for register table operations.
pub type RegisterResult<T> = Result<T, RegisterError>;
