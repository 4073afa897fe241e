//! Vellum: ownership-aware arena storage for a document-processing runtime.
//!
//! This is the facade crate that re-exports the public API of the Vellum
//! sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use vellum::prelude::*;
//!
//! // A shared schema context, then a document that reads through it.
//! let mut schema = Context::new(ContextConfig::default()).unwrap();
//! schema.intern_name("name").unwrap();
//! let schema = schema.into_shared();
//!
//! let mut doc = Context::with_parent(schema, ContextConfig::default()).unwrap();
//! let alice = doc.string("Alice").unwrap();
//! let person = doc
//!     .map()
//!     .field("name", alice).unwrap()
//!     .field("age", Value::Int(30)).unwrap()
//!     .finish()
//!     .unwrap();
//! doc.set_root(person).unwrap();
//!
//! // Copy into an unrelated context; names are re-interned there.
//! let mut other = Context::new(ContextConfig::default()).unwrap();
//! let copy = other.deep_copy(person, &doc).unwrap();
//! assert!(deep_eq(person, &doc, copy, &other));
//! assert_eq!(other.reader().map_get(copy, "age").unwrap(), Some(Value::Int(30)));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `vellum-core` | `Ptr`, `ContextId`, `Value`, `ValueKind`, `FieldKind`, `Heap` |
//! | [`arena`] | `vellum-arena` | The chunked allocator and its configuration |
//! | [`doc`] | `vellum-doc` | Contexts, pools, builders, `Reader`, deep copy, `deep_eq` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Value model, pointers and heap traits (`vellum-core`).
pub use vellum_core as types;

/// Chunked bump allocator with free-list reuse (`vellum-arena`).
///
/// Most users never touch [`arena::Arena`] directly; each
/// [`doc::Context`] owns one.
pub use vellum_arena as arena;

/// Document contexts (`vellum-doc`).
///
/// [`doc::Context`] is the entry point: it builds values, interns names
/// and shapes, answers [`doc::Context::is_owned`], and performs
/// [`doc::Context::deep_copy`].
pub use vellum_doc as doc;

/// Common imports for typical Vellum usage.
///
/// ```rust
/// use vellum::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use vellum_core::{FieldKind, Heap, Ptr, Value, ValueKind};

    // Configuration
    pub use vellum_arena::ArenaConfig;
    pub use vellum_doc::ContextConfig;

    // Contexts and access
    pub use vellum_doc::{deep_eq, Context, Reader, SharedContext, TypeDesc};

    // Errors
    pub use vellum_arena::ArenaError;
    pub use vellum_core::AccessError;
    pub use vellum_doc::{BuildError, CopyError};
}
