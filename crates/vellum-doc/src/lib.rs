//! Document contexts for Vellum.
//!
//! A [`Context`] owns one arena plus the name and shape pools that intern
//! into it, and optionally reads through a published parent. Everything a
//! document holds is built through the context's builders, read back
//! through [`Reader`], and checked with [`Context::is_owned`] before it is
//! linked into a container.
//!
//! ```text
//! Context ──parent──▶ Arc<Context> ──parent──▶ …
//!   ├── Arena        (vellum-arena)
//!   ├── NamePool     name bytes → Ptr
//!   ├── ShapePool    [(name, FieldKind)] → Ptr
//!   └── root: Value
//! ```
//!
//! Moving a value between unrelated contexts goes through
//! [`Context::deep_copy`], which leaves already-owned values alone.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod access;
pub mod builder;
pub mod config;
pub mod context;
mod copy;
mod decimal;
pub mod desc;
pub mod equal;
pub mod error;
mod layout;
mod oracle;
pub mod pool;
pub mod shape;

pub use access::{Field, Reader, Record};
pub use builder::{ArrayFloatBuilder, ArrayIntBuilder, ElementBuilder, MapBuilder, SeqBuilder};
pub use config::ContextConfig;
pub use context::{Context, SharedContext};
pub use desc::TypeDesc;
pub use equal::deep_eq;
pub use error::{BuildError, CopyError};
pub use pool::NamePool;
pub use shape::{FieldSlot, Shape, ShapeKey, ShapePool};
