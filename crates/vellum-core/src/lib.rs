//! Core types and traits for the Vellum document runtime.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the allocator and the document layer: virtual
//! addresses ([`Ptr`]), context identity, the closed [`Value`] sum type and
//! its kind discriminants, and the [`Heap`] trait through which arena-resident
//! payloads are read.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod traits;
pub mod value;

pub use error::AccessError;
pub use id::{ContextId, Ptr};
pub use traits::{Heap, Layered};
pub use value::{FieldKind, Value, ValueKind};
