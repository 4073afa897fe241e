//! Name interning cache.

use indexmap::{IndexMap, IndexSet};
use vellum_core::Ptr;

/// Content cache for one context's interned names.
///
/// Maps name bytes to the arena pointer holding them. Lookups through a
/// context chain consult each ancestor's pool read-only; inserts only ever
/// land in the pool of the context doing the interning.
#[derive(Debug, Default)]
pub struct NamePool {
    entries: IndexMap<Box<[u8]>, Ptr>,
    issued: IndexSet<Ptr>,
}

impl NamePool {
    /// An empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer previously interned for `bytes`.
    pub fn get(&self, bytes: &[u8]) -> Option<Ptr> {
        self.entries.get(bytes).copied()
    }

    pub(crate) fn insert(&mut self, bytes: &[u8], ptr: Ptr) {
        self.entries.insert(bytes.into(), ptr);
        self.issued.insert(ptr);
    }

    /// Whether this pool handed out `ptr`.
    pub fn issued(&self, ptr: Ptr) -> bool {
        self.issued.contains(&ptr)
    }

    /// Number of interned names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is interned.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], Ptr)> {
        self.entries.iter().map(|(k, &p)| (&**k, p))
    }
}
