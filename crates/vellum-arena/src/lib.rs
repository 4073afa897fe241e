//! Chunked bump allocation with free-list reuse for Vellum documents.
//!
//! # Architecture
//!
//! ```text
//! Arena
//! ├── ChunkList → Chunk[] (zeroed Vec<u8>, each on its own address interval)
//! └── FreeBins  (8 size classes, 16..2048+ bytes, headers stored in-place)
//! ```
//!
//! Allocation checks the free lists, then bumps the current chunk, then
//! grows a new chunk at twice the previous capacity. Every chunk occupies a
//! private, never-reused interval of a process-wide virtual address space,
//! so ownership is an interval-containment test and a stale or sibling
//! pointer can never be mistaken for a live one.
//!
//! All storage is `Vec<u8>`; there is no `unsafe`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
mod chunk;
pub mod config;
pub mod error;
pub mod free_list;

pub use arena::{Arena, ArenaStats, ChunkInfo};
pub use config::ArenaConfig;
pub use error::ArenaError;
pub use free_list::{ALIGN, MIN_BLOCK};
