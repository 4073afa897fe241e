//! Arena configuration parameters.

use crate::error::ArenaError;

/// Configuration for the arena allocator.
///
/// Controls chunk sizing and the optional memory ceiling. Validated by
/// [`Arena::new`](crate::Arena::new); immutable after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Capacity of the first chunk in bytes.
    ///
    /// Default: 65_536. Must be a power of two and at least 256.
    pub initial_chunk_size: usize,

    /// Upper bound for geometric chunk growth in bytes.
    ///
    /// Each new chunk doubles the previous capacity up to this size. A single
    /// request larger than this still gets a chunk of its own size.
    /// Default: 8 MiB.
    pub max_chunk_size: usize,

    /// Total chunk capacity the arena may reserve, in bytes.
    ///
    /// `None` means limited only by the system allocator. When growth would
    /// exceed the limit, allocation fails with
    /// [`ArenaError::OutOfMemory`].
    pub memory_limit: Option<usize>,
}

impl ArenaConfig {
    /// Default first-chunk capacity: 64 KiB.
    pub const DEFAULT_INITIAL_CHUNK_SIZE: usize = 64 * 1024;

    /// Default growth ceiling: 8 MiB.
    pub const DEFAULT_MAX_CHUNK_SIZE: usize = 8 * 1024 * 1024;

    /// Smallest accepted `initial_chunk_size`.
    pub const MIN_CHUNK_SIZE: usize = 256;

    /// Create a config with the given first-chunk capacity and defaults elsewhere.
    pub fn new(initial_chunk_size: usize) -> Self {
        Self {
            initial_chunk_size,
            max_chunk_size: Self::DEFAULT_MAX_CHUNK_SIZE.max(initial_chunk_size),
            memory_limit: None,
        }
    }

    /// Builder-style setter for [`ArenaConfig::memory_limit`].
    pub fn with_memory_limit(mut self, limit: usize) -> Self {
        self.memory_limit = Some(limit);
        self
    }

    /// Check the documented constraints.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if !self.initial_chunk_size.is_power_of_two()
            || self.initial_chunk_size < Self::MIN_CHUNK_SIZE
        {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "initial_chunk_size must be a power of two and >= {} (got {})",
                    Self::MIN_CHUNK_SIZE,
                    self.initial_chunk_size,
                ),
            });
        }
        if self.max_chunk_size < self.initial_chunk_size {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "max_chunk_size ({}) must be >= initial_chunk_size ({})",
                    self.max_chunk_size, self.initial_chunk_size,
                ),
            });
        }
        if let Some(limit) = self.memory_limit {
            if limit < self.initial_chunk_size {
                return Err(ArenaError::InvalidConfig {
                    reason: format!(
                        "memory_limit ({limit}) cannot hold the first chunk ({})",
                        self.initial_chunk_size,
                    ),
                });
            }
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INITIAL_CHUNK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = ArenaConfig::default();
        assert_eq!(config.initial_chunk_size, 64 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_power_of_two() {
        let config = ArenaConfig::new(1000);
        assert!(matches!(config.validate(), Err(ArenaError::InvalidConfig { .. })));
    }

    #[test]
    fn rejects_tiny_chunks() {
        assert!(ArenaConfig::new(64).validate().is_err());
    }

    #[test]
    fn rejects_inverted_growth_bounds() {
        let mut config = ArenaConfig::new(4096);
        config.max_chunk_size = 1024;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_limit_below_first_chunk() {
        let config = ArenaConfig::new(4096).with_memory_limit(1024);
        assert!(config.validate().is_err());
    }

    #[test]
    fn large_initial_chunk_raises_ceiling() {
        let config = ArenaConfig::new(16 * 1024 * 1024);
        assert_eq!(config.max_chunk_size, 16 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }
}
