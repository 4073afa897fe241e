//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use vellum_core::Ptr;

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// No memory for a new chunk: the system allocator refused, or the
    /// configured `memory_limit` would be exceeded.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
        /// The configured limit, if one applied.
        limit: Option<usize>,
    },
    /// A pointer passed to `realloc` or `write` was not issued by this arena.
    ForeignPointer {
        /// The offending address.
        ptr: Ptr,
    },
    /// Invalid configuration parameters.
    InvalidConfig {
        /// Description of the validation failure.
        reason: String,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                limit: Some(limit),
            } => write!(
                f,
                "arena out of memory: requested {requested} bytes, limit {limit} bytes"
            ),
            Self::OutOfMemory {
                requested,
                limit: None,
            } => write!(f, "arena out of memory: requested {requested} bytes"),
            Self::ForeignPointer { ptr } => {
                write!(f, "pointer {ptr} was not issued by this arena")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid arena config: {reason}")
            }
        }
    }
}

impl Error for ArenaError {}
