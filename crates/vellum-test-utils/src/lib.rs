//! Test utilities for Vellum development.
//!
//! - [`fixtures`]: ready-made value trees covering every kind.
//! - [`strategy`]: a proptest strategy producing [`ValueSpec`] trees that
//!   can be built into any context.
//! - [`ContextSnapshot`]: a byte-level capture of a context's arena and
//!   pools, for asserting that an operation left a context untouched.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod strategy;

pub use strategy::{value_spec, ValueSpec};

use vellum_arena::ArenaStats;
use vellum_core::{FieldKind, Ptr};
use vellum_doc::Context;

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Everything a context has written: chunk bytes and pool entries.
///
/// Two snapshots of the same context compare equal iff nothing was
/// allocated, written, or interned in between.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub chunks: Vec<(Ptr, Vec<u8>)>,
    pub names: Vec<(Vec<u8>, Ptr)>,
    pub shapes: Vec<(Vec<(Ptr, FieldKind)>, Ptr)>,
    pub stats: ArenaStats,
}

impl ContextSnapshot {
    pub fn capture(ctx: &Context) -> Self {
        let arena = ctx.arena();
        let chunks = arena
            .chunks()
            .map(|c| {
                let bytes = arena
                    .bytes(c.base, c.used)
                    .map(<[u8]>::to_vec)
                    .unwrap_or_default();
                (c.base, bytes)
            })
            .collect();
        let names = ctx
            .names()
            .iter()
            .map(|(bytes, ptr)| (bytes.to_vec(), ptr))
            .collect();
        let shapes = ctx
            .shapes()
            .iter()
            .map(|(fields, ptr)| (fields.to_vec(), ptr))
            .collect();
        Self {
            chunks,
            names,
            shapes,
            stats: arena.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_doc::ContextConfig;

    #[test]
    fn snapshot_detects_writes() {
        let mut ctx = Context::new(ContextConfig::default()).unwrap();
        ctx.intern_name("a").unwrap();
        let before = ContextSnapshot::capture(&ctx);
        assert_eq!(before, ContextSnapshot::capture(&ctx));
        ctx.string("b").unwrap();
        assert_ne!(before, ContextSnapshot::capture(&ctx));
    }
}
