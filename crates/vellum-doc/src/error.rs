//! Errors for building, editing and copying values.

use std::error::Error;
use std::fmt;

use vellum_arena::ArenaError;
use vellum_core::{AccessError, ValueKind};

/// Errors from builders and mutation primitives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildError {
    /// The arena could not provide memory.
    Alloc(ArenaError),
    /// An existing payload could not be read.
    Access(AccessError),
    /// Text passed to the decimal builder is not a decimal number.
    InvalidDecimal {
        /// The rejected input.
        text: String,
    },
    /// A value (or the container being edited) is not owned where it needs
    /// to be. Copy it in first with `deep_copy`.
    NotOwned {
        /// Kind of the offending value.
        kind: ValueKind,
    },
    /// A value of the wrong kind was passed.
    WrongKind {
        /// Kind the operation requires.
        expected: ValueKind,
        /// Kind actually passed.
        found: ValueKind,
    },
    /// Invalid configuration parameters.
    InvalidConfig {
        /// Description of the validation failure.
        reason: String,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alloc(e) => write!(f, "allocation failed: {e}"),
            Self::Access(e) => write!(f, "read failed: {e}"),
            Self::InvalidDecimal { text } => write!(f, "invalid decimal literal {text:?}"),
            Self::NotOwned { kind } => {
                write!(f, "{kind} value is not owned by this context")
            }
            Self::WrongKind { expected, found } => {
                write!(f, "expected {expected} value, found {found}")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid context config: {reason}"),
        }
    }
}

impl Error for BuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Alloc(e) => Some(e),
            Self::Access(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArenaError> for BuildError {
    fn from(e: ArenaError) -> Self {
        Self::Alloc(e)
    }
}

impl From<AccessError> for BuildError {
    fn from(e: AccessError) -> Self {
        Self::Access(e)
    }
}

/// Errors from [`Context::deep_copy`](crate::Context::deep_copy).
///
/// Unreadable or unsupported sub-values are not errors; they become null.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CopyError {
    /// Rebuilding in the target failed.
    Build(BuildError),
    /// The value nests deeper than the configured limit (or is cyclic).
    DepthExceeded {
        /// The configured `max_depth`.
        limit: usize,
    },
}

impl fmt::Display for CopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build(e) => write!(f, "deep copy failed: {e}"),
            Self::DepthExceeded { limit } => {
                write!(f, "deep copy exceeded nesting limit of {limit}")
            }
        }
    }
}

impl Error for CopyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Build(e) => Some(e),
            Self::DepthExceeded { .. } => None,
        }
    }
}

impl From<BuildError> for CopyError {
    fn from(e: BuildError) -> Self {
        Self::Build(e)
    }
}

impl From<ArenaError> for CopyError {
    fn from(e: ArenaError) -> Self {
        Self::Build(BuildError::Alloc(e))
    }
}
