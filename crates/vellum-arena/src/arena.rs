//! The arena allocator: bump allocation with size-classed block reuse.

use std::fmt;

use vellum_core::{Heap, Ptr};

use crate::chunk::ChunkList;
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::free_list::{FreeBins, ALIGN, MIN_BLOCK};

/// Round a request up to the block size the arena actually hands out.
fn block_size(size: usize) -> Result<usize, ArenaError> {
    let rounded = size
        .checked_add(ALIGN - 1)
        .map(|s| s & !(ALIGN - 1))
        .ok_or(ArenaError::OutOfMemory {
            requested: size,
            limit: None,
        })?;
    Ok(rounded.max(MIN_BLOCK))
}

/// Descriptor of one chunk: the interval `[base, base + used)` is owned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkInfo {
    /// First address of the chunk.
    pub base: Ptr,
    /// Bytes handed out so far.
    pub used: usize,
    /// Total bytes reserved.
    pub capacity: usize,
}

impl ChunkInfo {
    /// Whether `ptr` falls in the used region.
    pub fn contains(&self, ptr: Ptr) -> bool {
        ptr.addr() >= self.base.addr() && ptr.addr() - self.base.addr() < self.used as u64
    }
}

/// Point-in-time allocator statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Number of chunks.
    pub chunk_count: usize,
    /// Total bytes reserved across chunks.
    pub capacity_bytes: usize,
    /// Bytes handed out by bump allocation (including blocks now free).
    pub used_bytes: usize,
    /// Bytes parked in the free lists.
    pub free_bytes: usize,
    /// Blocks parked in the free lists.
    pub free_blocks: usize,
    /// Successful `alloc` calls, including those made on behalf of `realloc`.
    pub alloc_count: u64,
    /// Allocations served from a free list.
    pub reuse_count: u64,
    /// `realloc` growths satisfied by extending the current chunk's tail.
    pub in_place_grow_count: u64,
}

/// A chunked bump allocator with free-list reuse.
///
/// Every block is at least 16 bytes, a multiple of 8, and zeroed when handed
/// out. Addresses are virtual (see [`Ptr`]); they stay unique across every
/// arena in the process, so [`Arena::owns`] never confuses a sibling's
/// pointer for its own.
///
/// ```
/// use vellum_arena::{Arena, ArenaConfig};
///
/// let mut arena = Arena::new(ArenaConfig::default()).unwrap();
/// let p = arena.alloc(24).unwrap();
/// arena.write(p, b"hello").unwrap();
/// assert!(arena.owns(p));
/// assert_eq!(arena.bytes(p, 5), Some(&b"hello"[..]));
/// ```
pub struct Arena {
    config: ArenaConfig,
    chunks: ChunkList,
    free: FreeBins,
    alloc_count: u64,
    reuse_count: u64,
    in_place_grow_count: u64,
}

impl Arena {
    /// Create an arena with one pre-allocated chunk.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        let chunks = ChunkList::new(&config)?;
        Ok(Self {
            config,
            chunks,
            free: FreeBins::new(),
            alloc_count: 0,
            reuse_count: 0,
            in_place_grow_count: 0,
        })
    }

    /// Allocate a zeroed block of at least `size` bytes.
    ///
    /// Tries the free lists first, then bumps the current chunk, then grows a
    /// new chunk.
    pub fn alloc(&mut self, size: usize) -> Result<Ptr, ArenaError> {
        let size = block_size(size)?;
        let addr = match self.free.take(&mut self.chunks, size) {
            Some((addr, granted)) => {
                if let Some(block) = self.chunks.slice_mut(addr, granted) {
                    block.fill(0);
                }
                self.reuse_count += 1;
                addr
            }
            None => self.chunks.bump(size)?,
        };
        self.alloc_count += 1;
        Ok(Ptr::from_addr(addr))
    }

    /// Resize the block at `ptr` from `old_size` to `new_size` bytes.
    ///
    /// - null `ptr`: same as [`Arena::alloc`].
    /// - `new_size == 0`: frees the block and returns [`Ptr::NULL`].
    /// - same rounded size: returns `ptr`.
    /// - shrink: the cut-off tail goes to the free lists if it is big enough.
    /// - grow: extends in place when the block is the current chunk's tail,
    ///   otherwise allocates, copies `old_size` bytes and frees the old block.
    ///
    /// The prefix `min(old_size, new_size)` is preserved; new bytes are zero.
    pub fn realloc(&mut self, ptr: Ptr, old_size: usize, new_size: usize) -> Result<Ptr, ArenaError> {
        if ptr.is_null() {
            return self.alloc(new_size);
        }
        if !self.owns(ptr) {
            return Err(ArenaError::ForeignPointer { ptr });
        }
        if new_size == 0 {
            self.free(ptr, old_size);
            return Ok(Ptr::NULL);
        }

        let old_block = block_size(old_size)?;
        let new_block = block_size(new_size)?;
        let addr = ptr.addr();

        if new_block == old_block {
            return Ok(ptr);
        }
        if new_block < old_block {
            self.free
                .push(&mut self.chunks, addr + new_block as u64, old_block - new_block);
            return Ok(ptr);
        }
        if self.chunks.try_extend_tail(addr, old_block, new_block) {
            self.in_place_grow_count += 1;
            return Ok(ptr);
        }

        let prefix = self
            .chunks
            .slice(addr, old_size)
            .ok_or(ArenaError::ForeignPointer { ptr })?
            .to_vec();
        let fresh = self.alloc(new_block)?;
        self.write(fresh, &prefix)?;
        self.free(ptr, old_block);
        Ok(fresh)
    }

    /// Return a block to the free lists.
    ///
    /// Blocks smaller than 16 bytes are not tracked. A pointer this arena
    /// did not issue, or a block that is already free, is ignored with a
    /// warning.
    pub fn free(&mut self, ptr: Ptr, size: usize) {
        if size < MIN_BLOCK {
            return;
        }
        let size = size.next_multiple_of(ALIGN);
        if !self.free.push(&mut self.chunks, ptr.addr(), size) {
            tracing::warn!(%ptr, size, "ignoring free of a foreign or already free block");
        }
    }

    /// Whether `ptr` lies inside the used region of one of this arena's
    /// chunks. Pure address comparison; nothing is read.
    pub fn owns(&self, ptr: Ptr) -> bool {
        self.chunks.owns(ptr.addr())
    }

    /// Read `len` bytes at `ptr`.
    pub fn bytes(&self, ptr: Ptr, len: usize) -> Option<&[u8]> {
        self.chunks.slice(ptr.addr(), len)
    }

    /// Mutable view of `len` bytes at `ptr`.
    pub fn bytes_mut(&mut self, ptr: Ptr, len: usize) -> Option<&mut [u8]> {
        self.chunks.slice_mut(ptr.addr(), len)
    }

    /// Copy `bytes` into the arena at `ptr`.
    pub fn write(&mut self, ptr: Ptr, bytes: &[u8]) -> Result<(), ArenaError> {
        let dst = self
            .bytes_mut(ptr, bytes.len())
            .ok_or(ArenaError::ForeignPointer { ptr })?;
        dst.copy_from_slice(bytes);
        Ok(())
    }

    /// Drop every allocation at once.
    ///
    /// Chunks are kept but move to fresh address intervals, so pointers
    /// issued before the reset are no longer owned.
    pub fn reset(&mut self) -> Result<(), ArenaError> {
        self.chunks.reset()?;
        self.free.clear();
        tracing::debug!(
            chunk_count = self.chunks.len(),
            capacity = self.chunks.capacity_bytes(),
            "arena reset"
        );
        Ok(())
    }

    /// Current statistics.
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            chunk_count: self.chunks.len(),
            capacity_bytes: self.chunks.capacity_bytes(),
            used_bytes: self.chunks.used_bytes(),
            free_bytes: self.free.free_bytes(),
            free_blocks: self.free.blocks(),
            alloc_count: self.alloc_count,
            reuse_count: self.reuse_count,
            in_place_grow_count: self.in_place_grow_count,
        }
    }

    /// Chunk descriptors, in allocation order.
    pub fn chunks(&self) -> impl Iterator<Item = ChunkInfo> + '_ {
        self.chunks.iter().map(|c| ChunkInfo {
            base: Ptr::from_addr(c.base()),
            used: c.used(),
            capacity: c.capacity(),
        })
    }

    /// Total bytes reserved from the system allocator.
    pub fn memory_bytes(&self) -> usize {
        self.chunks.capacity_bytes()
    }

    /// The configuration this arena was built with.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }
}

impl Heap for Arena {
    fn resolve(&self, ptr: Ptr, len: usize) -> Option<&[u8]> {
        self.bytes(ptr, len)
    }

    fn owns(&self, ptr: Ptr) -> bool {
        Arena::owns(self, ptr)
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_arena() -> Arena {
        Arena::new(ArenaConfig::new(1024)).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = Arena::new(ArenaConfig::new(1000)).unwrap_err();
        assert!(matches!(err, ArenaError::InvalidConfig { .. }));
    }

    #[test]
    fn sizes_round_to_granularity() {
        assert_eq!(block_size(0).unwrap(), 16);
        assert_eq!(block_size(1).unwrap(), 16);
        assert_eq!(block_size(17).unwrap(), 24);
        assert_eq!(block_size(24).unwrap(), 24);
        assert!(block_size(usize::MAX).is_err());
    }

    #[test]
    fn alloc_is_owned_and_aligned() {
        let mut arena = small_arena();
        let a = arena.alloc(3).unwrap();
        let b = arena.alloc(40).unwrap();
        assert!(arena.owns(a));
        assert!(arena.owns(b));
        assert_eq!(a.addr() % 8, 0);
        assert_eq!(b.addr() - a.addr(), 16);
    }

    #[test]
    fn sibling_pointers_are_foreign() {
        let mut a = small_arena();
        let mut b = small_arena();
        let pa = a.alloc(16).unwrap();
        let pb = b.alloc(16).unwrap();
        assert!(!a.owns(pb));
        assert!(!b.owns(pa));
        assert!(!a.owns(Ptr::NULL));
    }

    #[test]
    fn unused_capacity_is_not_owned() {
        let mut arena = small_arena();
        let p = arena.alloc(16).unwrap();
        assert!(!arena.owns(Ptr::from_addr(p.addr() + 16)));
    }

    #[test]
    fn freed_block_is_reused_and_zeroed() {
        let mut arena = small_arena();
        let p = arena.alloc(64).unwrap();
        arena.write(p, &[0xAB; 64]).unwrap();
        arena.free(p, 64);
        let q = arena.alloc(64).unwrap();
        assert_eq!(p, q);
        assert!(arena.bytes(q, 64).unwrap().iter().all(|&b| b == 0));
        assert_eq!(arena.stats().reuse_count, 1);
    }

    #[test]
    fn double_free_is_ignored() {
        let mut arena = small_arena();
        let p = arena.alloc(64).unwrap();
        arena.free(p, 64);
        arena.free(p, 64);
        assert_eq!(arena.stats().free_bytes, 64);
        let q = arena.alloc(100).unwrap();
        assert_ne!(q, p);
        assert_eq!(arena.alloc(64).unwrap(), p);
    }

    #[test]
    fn reuse_does_not_grow_chunks() {
        let mut arena = small_arena();
        let p = arena.alloc(1000).unwrap();
        arena.free(p, 1000);
        let chunks = arena.stats().chunk_count;
        arena.alloc(1000).unwrap();
        assert_eq!(arena.stats().chunk_count, chunks);
    }

    #[test]
    fn tiny_free_is_ignored() {
        let mut arena = small_arena();
        let p = arena.alloc(8).unwrap();
        arena.free(p, 8);
        assert_eq!(arena.stats().free_blocks, 0);
    }

    #[test]
    fn foreign_free_is_ignored() {
        let mut a = small_arena();
        let mut b = small_arena();
        let pb = b.alloc(32).unwrap();
        a.free(pb, 32);
        assert_eq!(a.stats().free_blocks, 0);
    }

    #[test]
    fn realloc_null_allocates() {
        let mut arena = small_arena();
        let p = arena.realloc(Ptr::NULL, 0, 32).unwrap();
        assert!(arena.owns(p));
    }

    #[test]
    fn realloc_to_zero_frees() {
        let mut arena = small_arena();
        let p = arena.alloc(32).unwrap();
        assert_eq!(arena.realloc(p, 32, 0).unwrap(), Ptr::NULL);
        assert_eq!(arena.stats().free_bytes, 32);
    }

    #[test]
    fn realloc_same_size_is_noop() {
        let mut arena = small_arena();
        let p = arena.alloc(20).unwrap();
        assert_eq!(arena.realloc(p, 20, 24).unwrap(), p);
    }

    #[test]
    fn realloc_shrink_returns_tail() {
        let mut arena = small_arena();
        let p = arena.alloc(128).unwrap();
        assert_eq!(arena.realloc(p, 128, 32).unwrap(), p);
        assert_eq!(arena.stats().free_bytes, 96);
    }

    #[test]
    fn realloc_shrink_drops_small_tail() {
        let mut arena = small_arena();
        let p = arena.alloc(32).unwrap();
        assert_eq!(arena.realloc(p, 32, 24).unwrap(), p);
        assert_eq!(arena.stats().free_bytes, 0);
    }

    #[test]
    fn realloc_grows_tail_in_place() {
        let mut arena = small_arena();
        let p = arena.alloc(32).unwrap();
        arena.write(p, b"prefix").unwrap();
        let q = arena.realloc(p, 32, 256).unwrap();
        assert_eq!(p, q);
        assert_eq!(arena.stats().in_place_grow_count, 1);
        assert_eq!(arena.bytes(q, 6), Some(&b"prefix"[..]));
    }

    #[test]
    fn realloc_moves_when_not_tail() {
        let mut arena = small_arena();
        let p = arena.alloc(32).unwrap();
        arena.alloc(16).unwrap();
        arena.write(p, b"keep me").unwrap();
        let q = arena.realloc(p, 32, 64).unwrap();
        assert_ne!(p, q);
        assert_eq!(arena.bytes(q, 7), Some(&b"keep me"[..]));
        assert!(arena.bytes(q, 64).unwrap()[32..].iter().all(|&b| b == 0));
        assert_eq!(arena.stats().free_bytes, 32);
    }

    #[test]
    fn realloc_rejects_foreign_pointer() {
        let mut a = small_arena();
        let mut b = small_arena();
        let pb = b.alloc(32).unwrap();
        assert_eq!(
            a.realloc(pb, 32, 64),
            Err(ArenaError::ForeignPointer { ptr: pb })
        );
    }

    #[test]
    fn write_outside_used_region_fails() {
        let mut arena = small_arena();
        let p = arena.alloc(16).unwrap();
        assert!(arena.write(p, &[1; 17]).is_err());
    }

    #[test]
    fn growth_adds_chunks() {
        let mut arena = Arena::new(ArenaConfig::new(256)).unwrap();
        for _ in 0..64 {
            arena.alloc(64).unwrap();
        }
        let stats = arena.stats();
        assert!(stats.chunk_count > 1);
        assert_eq!(stats.used_bytes, 64 * 64);
        assert_eq!(arena.chunks().count(), stats.chunk_count);
    }

    #[test]
    fn memory_limit_surfaces_as_error() {
        let mut arena = Arena::new(ArenaConfig::new(256).with_memory_limit(256)).unwrap();
        arena.alloc(256).unwrap();
        let err = arena.alloc(16).unwrap_err();
        assert!(matches!(err, ArenaError::OutOfMemory { limit: Some(256), .. }));
    }

    #[test]
    fn reset_disowns_old_pointers() {
        let mut arena = small_arena();
        let p = arena.alloc(64).unwrap();
        arena.write(p, &[7; 64]).unwrap();
        let scratch = arena.alloc(32).unwrap();
        arena.free(scratch, 32);
        arena.reset().unwrap();
        assert!(!arena.owns(p));
        assert_eq!(arena.stats().free_blocks, 0);
        let q = arena.alloc(64).unwrap();
        assert!(arena.bytes(q, 64).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn chunk_descriptors_match_ownership() {
        let mut arena = small_arena();
        let p = arena.alloc(48).unwrap();
        let info: Vec<_> = arena.chunks().collect();
        assert_eq!(info.len(), 1);
        assert!(info[0].contains(p));
        assert_eq!(info[0].used, 48);
        assert_eq!(info[0].capacity, 1024);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn every_allocation_stays_owned(
                sizes in proptest::collection::vec(1usize..600, 1..60),
            ) {
                let mut arena = Arena::new(ArenaConfig::new(256)).unwrap();
                let ptrs: Vec<_> = sizes.iter().map(|&s| arena.alloc(s).unwrap()).collect();
                for p in &ptrs {
                    prop_assert!(arena.owns(*p));
                }
                let other = Arena::new(ArenaConfig::new(256)).unwrap();
                for p in &ptrs {
                    prop_assert!(!other.owns(*p));
                }
            }

            #[test]
            fn shrink_then_grow_preserves_prefix(
                data in proptest::collection::vec(any::<u8>(), 16..300),
                cut in 1usize..16,
            ) {
                let mut arena = Arena::new(ArenaConfig::new(1024)).unwrap();
                let len = data.len();
                let p = arena.alloc(len).unwrap();
                arena.write(p, &data).unwrap();
                // Something after the block so growth cannot just extend the tail.
                arena.alloc(16).unwrap();

                let short = len - cut;
                let p = arena.realloc(p, len, short).unwrap();
                let p = arena.realloc(p, short, len).unwrap();
                prop_assert_eq!(arena.bytes(p, short).unwrap(), &data[..short]);
            }

            #[test]
            fn free_then_same_class_alloc_does_not_grow(
                size in 16usize..4096,
            ) {
                let mut arena = Arena::new(ArenaConfig::new(8192)).unwrap();
                let p = arena.alloc(size).unwrap();
                arena.free(p, size);
                let chunks = arena.stats().chunk_count;
                let q = arena.alloc(size).unwrap();
                prop_assert_eq!(arena.stats().chunk_count, chunks);
                prop_assert_eq!(p, q);
            }

            #[test]
            fn free_bytes_account_for_pushes_and_takes(
                ops in proptest::collection::vec((16usize..512, any::<bool>()), 1..40),
            ) {
                let mut arena = Arena::new(ArenaConfig::new(4096)).unwrap();
                let mut live: Vec<(Ptr, usize)> = Vec::new();
                for (size, release) in ops {
                    if release {
                        if let Some((p, s)) = live.pop() {
                            arena.free(p, s);
                        }
                    } else {
                        live.push((arena.alloc(size).unwrap(), size));
                    }
                }
                let stats = arena.stats();
                prop_assert!(stats.free_bytes <= stats.used_bytes);
                for (p, _) in &live {
                    prop_assert!(arena.owns(*p));
                }
            }
        }
    }
}
