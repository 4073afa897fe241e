//! Virtual addresses and context identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A virtual address inside some arena chunk.
///
/// Addresses are handed out from disjoint, never-reused intervals, so two
/// arenas can never issue the same `Ptr`. A `Ptr` is only a number: turning
/// it into bytes always goes through a [`Heap`](crate::Heap), which checks
/// that the address range belongs to one of its live chunks first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ptr(u64);

impl Ptr {
    /// The null address. Never owned by any arena.
    pub const NULL: Ptr = Ptr(0);

    /// Wrap a raw address.
    pub const fn from_addr(addr: u64) -> Self {
        Self(addr)
    }

    /// The raw address.
    pub const fn addr(self) -> u64 {
        self.0
    }

    /// Whether this is [`Ptr::NULL`].
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The address `bytes` past this one, or `None` on overflow.
    pub fn offset(self, bytes: u64) -> Option<Ptr> {
        self.0.checked_add(bytes).map(Ptr)
    }
}

impl fmt::Display for Ptr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Counter for unique [`ContextId`] allocation.
static CONTEXT_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a document context.
///
/// Allocated from a monotonic atomic counter via [`ContextId::next`]. Used
/// for diagnostics: log lines and errors name contexts by this ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate a fresh, unique context ID. Thread-safe.
    pub fn next() -> Self {
        Self(CONTEXT_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_default() {
        assert_eq!(Ptr::default(), Ptr::NULL);
        assert!(Ptr::NULL.is_null());
        assert!(!Ptr::from_addr(16).is_null());
    }

    #[test]
    fn offset_detects_overflow() {
        assert_eq!(Ptr::from_addr(16).offset(8), Some(Ptr::from_addr(24)));
        assert_eq!(Ptr::from_addr(u64::MAX).offset(1), None);
    }

    #[test]
    fn context_ids_are_unique() {
        let a = ContextId::next();
        let b = ContextId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }
}
