//! Contiguous memory chunks and growable chunk lists.
//!
//! A [`Chunk`] is a zero-initialised `Vec<u8>` with bump allocation, mapped
//! onto a private interval of the virtual address space. A [`ChunkList`] is
//! the growable collection of chunks behind one arena; when the current chunk
//! is full a new, geometrically larger one is appended.

use std::sync::atomic::{AtomicU64, Ordering};

use vellum_core::Ptr;

use crate::config::ArenaConfig;
use crate::error::ArenaError;

/// Alignment of every chunk base. The first interval starts one page in, so
/// address 0 is never issued.
pub(crate) const CHUNK_ALIGN: u64 = 4096;

/// Next unreserved virtual address.
static NEXT_BASE: AtomicU64 = AtomicU64::new(CHUNK_ALIGN);

/// Reserve a fresh interval of at least `capacity` bytes.
///
/// Intervals are never reused, which is what lets `owns` be a pure range
/// check: an address from a dropped or reset arena cannot land in a live chunk.
fn reserve_interval(capacity: usize) -> Option<u64> {
    let span = u64::try_from(capacity).ok()?.checked_add(CHUNK_ALIGN - 1)? & !(CHUNK_ALIGN - 1);
    // One empty page between intervals keeps one-past-the-end addresses foreign too.
    let span = span.checked_add(CHUNK_ALIGN)?;
    let base = NEXT_BASE.fetch_add(span, Ordering::Relaxed);
    base.checked_add(span)?;
    Some(base)
}

/// A single contiguous chunk with bump allocation.
pub(crate) struct Chunk {
    /// First virtual address of the chunk.
    base: u64,
    /// Backing storage. Allocated to full capacity at creation.
    data: Vec<u8>,
    /// Bump pointer: bytes handed out so far.
    used: usize,
}

impl Chunk {
    /// Create a zeroed chunk, reporting allocator refusal as an error.
    pub(crate) fn new(capacity: usize) -> Result<Self, ArenaError> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| ArenaError::OutOfMemory {
                requested: capacity,
                limit: None,
            })?;
        data.resize(capacity, 0);
        let base = reserve_interval(capacity).ok_or(ArenaError::OutOfMemory {
            requested: capacity,
            limit: None,
        })?;
        Ok(Self {
            base,
            data,
            used: 0,
        })
    }

    /// Bump-allocate `size` bytes. Returns the address, or `None` if full.
    pub(crate) fn bump(&mut self, size: usize) -> Option<u64> {
        let new_used = self.used.checked_add(size)?;
        if new_used > self.data.len() {
            return None;
        }
        let addr = self.base + self.used as u64;
        self.used = new_used;
        Some(addr)
    }

    /// Whether `addr` lies inside the used region.
    pub(crate) fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.used as u64
    }

    /// Translate an address range into a byte range of `data`.
    fn span(&self, addr: u64, len: usize) -> Option<std::ops::Range<usize>> {
        let start = usize::try_from(addr.checked_sub(self.base)?).ok()?;
        let end = start.checked_add(len)?;
        (end <= self.used).then_some(start..end)
    }

    pub(crate) fn slice(&self, addr: u64, len: usize) -> Option<&[u8]> {
        let range = self.span(addr, len)?;
        Some(&self.data[range])
    }

    pub(crate) fn slice_mut(&mut self, addr: u64, len: usize) -> Option<&mut [u8]> {
        let range = self.span(addr, len)?;
        Some(&mut self.data[range])
    }

    /// Whether a block of `len` bytes at `addr` ends exactly at the bump pointer.
    pub(crate) fn is_tail(&self, addr: u64, len: usize) -> bool {
        self.span(addr, len)
            .is_some_and(|range| range.end == self.used)
    }

    /// Extend the used region by `delta` bytes in place. Returns `false`
    /// without changing anything if capacity is insufficient.
    pub(crate) fn extend(&mut self, delta: usize) -> bool {
        match self.used.checked_add(delta) {
            Some(new_used) if new_used <= self.data.len() => {
                self.data[self.used..new_used].fill(0);
                self.used = new_used;
                true
            }
            _ => false,
        }
    }

    /// Forget all allocations and move to a fresh, zeroed address interval.
    pub(crate) fn rebase(&mut self) -> Result<(), ArenaError> {
        self.base = reserve_interval(self.data.len()).ok_or(ArenaError::OutOfMemory {
            requested: self.data.len(),
            limit: None,
        })?;
        self.data[..self.used].fill(0);
        self.used = 0;
        Ok(())
    }

    pub(crate) fn base(&self) -> u64 {
        self.base
    }

    pub(crate) fn used(&self) -> usize {
        self.used
    }

    pub(crate) fn capacity(&self) -> usize {
        self.data.len()
    }
}

/// A growable list of [`Chunk`]s with overflow-based bump allocation.
///
/// Chunk bases increase monotonically in list order, so address lookup is a
/// binary search. Allocations never span chunks.
pub(crate) struct ChunkList {
    chunks: Vec<Chunk>,
    max_chunk_size: usize,
    memory_limit: Option<usize>,
}

impl ChunkList {
    /// Create a chunk list with one pre-allocated chunk.
    pub(crate) fn new(config: &ArenaConfig) -> Result<Self, ArenaError> {
        let first = Chunk::new(config.initial_chunk_size)?;
        Ok(Self {
            chunks: vec![first],
            max_chunk_size: config.max_chunk_size,
            memory_limit: config.memory_limit,
        })
    }

    /// Bump-allocate `size` bytes, growing into a new chunk if needed.
    pub(crate) fn bump(&mut self, size: usize) -> Result<u64, ArenaError> {
        if let Some(addr) = self.chunks.last_mut().and_then(|c| c.bump(size)) {
            return Ok(addr);
        }
        self.grow(size)?;
        let current = self.chunks.last_mut().ok_or(ArenaError::OutOfMemory {
            requested: size,
            limit: self.memory_limit,
        })?;
        current.bump(size).ok_or(ArenaError::OutOfMemory {
            requested: size,
            limit: self.memory_limit,
        })
    }

    /// Append a chunk able to hold at least `min` bytes.
    fn grow(&mut self, min: usize) -> Result<(), ArenaError> {
        let last = self.chunks.last().map_or(0, Chunk::capacity);
        let doubled = last.saturating_mul(2).min(self.max_chunk_size);
        let mut capacity = doubled.max(min);

        if let Some(limit) = self.memory_limit {
            let reserved = self.capacity_bytes();
            if reserved.saturating_add(capacity) > limit {
                // Settle for an exact fit before giving up.
                capacity = min;
                if reserved.saturating_add(capacity) > limit {
                    return Err(ArenaError::OutOfMemory {
                        requested: min,
                        limit: Some(limit),
                    });
                }
            }
        }

        let chunk = Chunk::new(capacity)?;
        tracing::debug!(
            base = %Ptr::from_addr(chunk.base()),
            capacity,
            chunk_count = self.chunks.len() + 1,
            "arena grew a new chunk"
        );
        self.chunks.push(chunk);
        Ok(())
    }

    fn find(&self, addr: u64) -> Option<&Chunk> {
        let idx = self.chunks.partition_point(|c| c.base() <= addr);
        let chunk = self.chunks.get(idx.checked_sub(1)?)?;
        chunk.contains(addr).then_some(chunk)
    }

    fn find_mut(&mut self, addr: u64) -> Option<&mut Chunk> {
        let idx = self.chunks.partition_point(|c| c.base() <= addr);
        let chunk = self.chunks.get_mut(idx.checked_sub(1)?)?;
        chunk.contains(addr).then_some(chunk)
    }

    pub(crate) fn owns(&self, addr: u64) -> bool {
        self.find(addr).is_some()
    }

    pub(crate) fn slice(&self, addr: u64, len: usize) -> Option<&[u8]> {
        self.find(addr)?.slice(addr, len)
    }

    pub(crate) fn slice_mut(&mut self, addr: u64, len: usize) -> Option<&mut [u8]> {
        self.find_mut(addr)?.slice_mut(addr, len)
    }

    /// Grow the block `[addr, addr + old)` to `new` bytes in place, if it is
    /// the tail of the current chunk and the chunk has room.
    pub(crate) fn try_extend_tail(&mut self, addr: u64, old: usize, new: usize) -> bool {
        let Some(current) = self.chunks.last_mut() else {
            return false;
        };
        if !current.is_tail(addr, old) {
            return false;
        }
        current.extend(new - old)
    }

    /// Drop every allocation; chunks move to fresh address intervals.
    pub(crate) fn reset(&mut self) -> Result<(), ArenaError> {
        for chunk in &mut self.chunks {
            chunk.rebase()?;
        }
        Ok(())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.chunks.len()
    }

    pub(crate) fn capacity_bytes(&self) -> usize {
        self.chunks.iter().map(Chunk::capacity).sum()
    }

    pub(crate) fn used_bytes(&self) -> usize {
        self.chunks.iter().map(Chunk::used).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_bump_is_sequential() {
        let mut chunk = Chunk::new(1024).unwrap();
        let a = chunk.bump(100).unwrap();
        let b = chunk.bump(200).unwrap();
        assert_eq!(b - a, 100);
        assert_eq!(chunk.used(), 300);
    }

    #[test]
    fn chunk_bump_fails_when_full() {
        let mut chunk = Chunk::new(256).unwrap();
        assert!(chunk.bump(256).is_some());
        assert!(chunk.bump(1).is_none());
    }

    #[test]
    fn chunk_contains_only_used_region() {
        let mut chunk = Chunk::new(256).unwrap();
        let a = chunk.bump(16).unwrap();
        assert!(chunk.contains(a));
        assert!(chunk.contains(a + 15));
        assert!(!chunk.contains(a + 16));
        assert!(!chunk.contains(a - 1));
    }

    #[test]
    fn chunks_get_disjoint_intervals() {
        let a = Chunk::new(4096).unwrap();
        let b = Chunk::new(4096).unwrap();
        assert!(a.base() + 4096 < b.base() || b.base() + 4096 < a.base());
        assert_eq!(a.base() % CHUNK_ALIGN, 0);
    }

    #[test]
    fn rebase_moves_interval() {
        let mut chunk = Chunk::new(256).unwrap();
        let a = chunk.bump(16).unwrap();
        chunk.rebase().unwrap();
        assert_eq!(chunk.used(), 0);
        assert!(!chunk.contains(a));
        let b = chunk.bump(16).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn list_grows_geometrically() {
        let config = ArenaConfig::new(256);
        let mut list = ChunkList::new(&config).unwrap();
        list.bump(256).unwrap();
        list.bump(16).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.capacity_bytes(), 256 + 512);
    }

    #[test]
    fn oversized_request_gets_own_chunk() {
        let mut config = ArenaConfig::new(256);
        config.max_chunk_size = 1024;
        let mut list = ChunkList::new(&config).unwrap();
        let addr = list.bump(5000).unwrap();
        assert!(list.owns(addr));
        assert!(list.owns(addr + 4999));
    }

    #[test]
    fn limit_is_enforced() {
        let config = ArenaConfig::new(256).with_memory_limit(512);
        let mut list = ChunkList::new(&config).unwrap();
        list.bump(256).unwrap();
        list.bump(256).unwrap();
        let err = list.bump(16).unwrap_err();
        assert!(matches!(err, ArenaError::OutOfMemory { limit: Some(512), .. }));
    }

    #[test]
    fn tail_extension_only_at_tail() {
        let config = ArenaConfig::new(1024);
        let mut list = ChunkList::new(&config).unwrap();
        let a = list.bump(32).unwrap();
        let b = list.bump(32).unwrap();
        assert!(!list.try_extend_tail(a, 32, 64));
        assert!(list.try_extend_tail(b, 32, 64));
        assert_eq!(list.used_bytes(), 96);
    }

    #[test]
    fn slice_rejects_ranges_past_used() {
        let config = ArenaConfig::new(1024);
        let mut list = ChunkList::new(&config).unwrap();
        let a = list.bump(32).unwrap();
        assert!(list.slice(a, 32).is_some());
        assert!(list.slice(a, 33).is_none());
        assert!(list.slice(a + 40, 1).is_none());
    }
}
