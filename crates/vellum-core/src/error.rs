//! Errors raised while decoding arena-resident payloads.

use std::error::Error;
use std::fmt;

use crate::id::Ptr;
use crate::value::ValueKind;

/// Errors from reading a payload through a [`Heap`](crate::Heap).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessError {
    /// The pointer does not resolve in any searched arena.
    Unresolved {
        /// The address that failed to resolve.
        ptr: Ptr,
    },
    /// The value has a different kind than the accessor expects.
    KindMismatch {
        /// Kind the accessor requires.
        expected: ValueKind,
        /// Kind actually found.
        found: ValueKind,
    },
    /// A tagged slot holds a tag outside the kind table.
    UnknownTag {
        /// The raw tag byte.
        tag: u8,
    },
    /// An index past the end of a container.
    OutOfBounds {
        /// Requested index.
        index: usize,
        /// Container length.
        len: usize,
    },
    /// Payload bytes are structurally invalid (bad UTF-8, inconsistent header).
    Malformed {
        /// What was wrong.
        reason: String,
    },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved { ptr } => write!(f, "pointer {ptr} does not resolve"),
            Self::KindMismatch { expected, found } => {
                write!(f, "expected {expected} value, found {found}")
            }
            Self::UnknownTag { tag } => write!(f, "unknown value tag {tag:#04x}"),
            Self::OutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for length {len}")
            }
            Self::Malformed { reason } => write!(f, "malformed payload: {reason}"),
        }
    }
}

impl Error for AccessError {}
