//! Size-classed free lists with in-place block headers.
//!
//! A freed block stores its own bookkeeping: the first 16 bytes of the block
//! hold `(size: u64, next: u64)`. Blocks are binned by power-of-two size
//! class: bin `i` holds blocks in `[16 << i, 16 << (i + 1))`, and the last bin
//! is open-ended. Pushes are LIFO.

use crate::chunk::ChunkList;

/// Smallest block that can carry a free-list header.
pub const MIN_BLOCK: usize = 16;

/// Allocation granularity. Every block size and address is a multiple of this.
pub const ALIGN: usize = 8;

/// Number of size-class bins (16, 32, ..., 1024, 2048+).
pub const NUM_BINS: usize = 8;

/// Bin index for a block of `size` bytes (`size >= MIN_BLOCK`).
pub(crate) fn bin_index(size: usize) -> usize {
    let class = (size / MIN_BLOCK).max(1).ilog2() as usize;
    class.min(NUM_BINS - 1)
}

/// Free-list heads and accounting for one arena.
pub(crate) struct FreeBins {
    /// Head address per bin; 0 is the empty list.
    heads: [u64; NUM_BINS],
    /// Bytes currently parked in the bins.
    free_bytes: usize,
    /// Blocks currently parked in the bins.
    blocks: usize,
}

impl FreeBins {
    pub(crate) fn new() -> Self {
        Self {
            heads: [0; NUM_BINS],
            free_bytes: 0,
            blocks: 0,
        }
    }

    /// Push a block. Blocks smaller than [`MIN_BLOCK`] are dropped; so is a
    /// block whose header cannot be written (not inside `chunks`) and a block
    /// already parked in its bin.
    pub(crate) fn push(&mut self, chunks: &mut ChunkList, addr: u64, size: usize) -> bool {
        if size < MIN_BLOCK {
            return false;
        }
        let bin = bin_index(size);
        if self.parked(chunks, bin, addr) {
            return false;
        }
        let Some(header) = chunks.slice_mut(addr, MIN_BLOCK) else {
            return false;
        };
        header[..8].copy_from_slice(&(size as u64).to_le_bytes());
        header[8..16].copy_from_slice(&self.heads[bin].to_le_bytes());
        self.heads[bin] = addr;
        self.free_bytes += size;
        self.blocks += 1;
        true
    }

    /// Take a block of at least `size` bytes.
    ///
    /// Searches the request's own bin first-fit, then the larger bins. A
    /// block with at least [`MIN_BLOCK`] bytes to spare is split and the
    /// remainder is re-binned. Returns the address and the number of bytes
    /// handed out (which exceeds `size` when the spare tail was too small to
    /// keep).
    pub(crate) fn take(&mut self, chunks: &mut ChunkList, size: usize) -> Option<(u64, usize)> {
        for bin in bin_index(size)..NUM_BINS {
            let mut prev: Option<u64> = None;
            let mut cur = self.heads[bin];
            // A bin never holds more than `blocks` entries; a longer walk
            // means a header was overwritten through `bytes_mut`.
            for _ in 0..self.blocks {
                if cur == 0 {
                    break;
                }
                let (block_size, next) = read_header(chunks, cur)?;
                if block_size >= size {
                    match prev {
                        None => self.heads[bin] = next,
                        Some(p) => write_next(chunks, p, next)?,
                    }
                    self.free_bytes -= block_size;
                    self.blocks -= 1;

                    let spare = block_size - size;
                    if spare >= MIN_BLOCK {
                        self.push(chunks, cur + size as u64, spare);
                        return Some((cur, size));
                    }
                    return Some((cur, block_size));
                }
                prev = Some(cur);
                cur = next;
            }
        }
        None
    }

    /// Whether `addr` is already on the list of `bin`.
    fn parked(&self, chunks: &ChunkList, bin: usize, addr: u64) -> bool {
        let mut cur = self.heads[bin];
        for _ in 0..self.blocks {
            if cur == 0 {
                return false;
            }
            if cur == addr {
                return true;
            }
            match read_header(chunks, cur) {
                Some((_, next)) => cur = next,
                None => return false,
            }
        }
        false
    }

    /// Forget every parked block.
    pub(crate) fn clear(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn free_bytes(&self) -> usize {
        self.free_bytes
    }

    pub(crate) fn blocks(&self) -> usize {
        self.blocks
    }
}

fn read_header(chunks: &ChunkList, addr: u64) -> Option<(usize, u64)> {
    let header = chunks.slice(addr, MIN_BLOCK)?;
    let size = u64::from_le_bytes(header[..8].try_into().ok()?);
    let next = u64::from_le_bytes(header[8..16].try_into().ok()?);
    Some((usize::try_from(size).ok()?, next))
}

fn write_next(chunks: &mut ChunkList, addr: u64, next: u64) -> Option<()> {
    let header = chunks.slice_mut(addr, MIN_BLOCK)?;
    header[8..16].copy_from_slice(&next.to_le_bytes());
    Some(())
}
