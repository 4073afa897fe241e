//! Read access to arena-resident payloads.

use crate::id::Ptr;

/// Read-only access to memory issued by one or more arenas.
///
/// Implemented by a single arena and by a document context (which searches
/// its own arena, then its ancestors'). Implementations must decide both
/// methods by comparing addresses against chunk bounds only; a pointer that
/// is not theirs yields `None` / `false`.
pub trait Heap {
    /// Resolve `len` bytes starting at `ptr`.
    ///
    /// Returns `None` unless the whole range lies inside the used region of
    /// one live chunk.
    fn resolve(&self, ptr: Ptr, len: usize) -> Option<&[u8]>;

    /// Whether `ptr` falls inside the used region of a live chunk.
    fn owns(&self, ptr: Ptr) -> bool;
}

impl<H: Heap + ?Sized> Heap for &H {
    fn resolve(&self, ptr: Ptr, len: usize) -> Option<&[u8]> {
        (**self).resolve(ptr, len)
    }

    fn owns(&self, ptr: Ptr) -> bool {
        (**self).owns(ptr)
    }
}

/// Two heaps searched in order.
///
/// Used when a value's parts may live in either of two places, e.g. a
/// container whose header is local but whose children are foreign.
#[derive(Clone, Copy)]
pub struct Layered<'a> {
    first: &'a dyn Heap,
    second: &'a dyn Heap,
}

impl<'a> Layered<'a> {
    /// Search `first`, then `second`.
    pub fn new(first: &'a dyn Heap, second: &'a dyn Heap) -> Self {
        Self { first, second }
    }
}

impl Heap for Layered<'_> {
    fn resolve(&self, ptr: Ptr, len: usize) -> Option<&[u8]> {
        self.first
            .resolve(ptr, len)
            .or_else(|| self.second.resolve(ptr, len))
    }

    fn owns(&self, ptr: Ptr) -> bool {
        self.first.owns(ptr) || self.second.owns(ptr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One fake chunk at a fixed base.
    struct Fixed {
        base: u64,
        bytes: Vec<u8>,
    }

    impl Heap for Fixed {
        fn resolve(&self, ptr: Ptr, len: usize) -> Option<&[u8]> {
            let start = usize::try_from(ptr.addr().checked_sub(self.base)?).ok()?;
            self.bytes.get(start..start.checked_add(len)?)
        }

        fn owns(&self, ptr: Ptr) -> bool {
            ptr.addr() >= self.base && ptr.addr() < self.base + self.bytes.len() as u64
        }
    }

    #[test]
    fn layered_searches_both() {
        let a = Fixed { base: 0x1000, bytes: vec![1; 16] };
        let b = Fixed { base: 0x2000, bytes: vec![2; 16] };
        let both = Layered::new(&a, &b);
        assert_eq!(both.resolve(Ptr::from_addr(0x1000), 4), Some(&[1u8; 4][..]));
        assert_eq!(both.resolve(Ptr::from_addr(0x2004), 4), Some(&[2u8; 4][..]));
        assert!(both.owns(Ptr::from_addr(0x200F)));
        assert!(!both.owns(Ptr::from_addr(0x3000)));
        assert!(both.resolve(Ptr::from_addr(0x100E), 4).is_none());
    }
}
