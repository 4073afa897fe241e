//! Context configuration.

use vellum_arena::ArenaConfig;

use crate::error::BuildError;

/// Configuration for a document [`Context`](crate::Context).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextConfig {
    /// Settings for the context's own arena.
    pub arena: ArenaConfig,

    /// Whether deep copy re-interns symbols through the name pool.
    ///
    /// When `false`, copied symbols get a fresh allocation each. Field names
    /// and element tags are always interned. Default: `true`.
    pub intern_names: bool,

    /// Maximum nesting depth walked by the ownership oracle and deep copy.
    ///
    /// Beyond it the oracle answers `false` and deep copy fails with
    /// [`CopyError::DepthExceeded`](crate::CopyError::DepthExceeded).
    /// Default: 1024.
    pub max_depth: usize,
}

impl ContextConfig {
    /// Default nesting limit.
    pub const DEFAULT_MAX_DEPTH: usize = 1024;

    /// Config with the given arena settings and defaults elsewhere.
    pub fn new(arena: ArenaConfig) -> Self {
        Self {
            arena,
            intern_names: true,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }

    /// Builder-style setter for [`ContextConfig::max_depth`].
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Builder-style setter for [`ContextConfig::intern_names`].
    pub fn with_intern_names(mut self, intern_names: bool) -> Self {
        self.intern_names = intern_names;
        self
    }

    /// Check the documented constraints, including the arena's.
    pub fn validate(&self) -> Result<(), BuildError> {
        self.arena
            .validate()
            .map_err(|e| BuildError::InvalidConfig {
                reason: e.to_string(),
            })?;
        if self.max_depth == 0 {
            return Err(BuildError::InvalidConfig {
                reason: "max_depth must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self::new(ArenaConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = ContextConfig::default();
        assert!(config.intern_names);
        assert_eq!(config.max_depth, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_depth_is_rejected() {
        let config = ContextConfig::default().with_max_depth(0);
        assert!(matches!(config.validate(), Err(BuildError::InvalidConfig { .. })));
    }

    #[test]
    fn arena_errors_surface() {
        let config = ContextConfig::new(ArenaConfig::new(100));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("initial_chunk_size"));
    }
}
