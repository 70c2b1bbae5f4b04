//! Crucible context retrieval
//!
//! Queries a vector index for passages relevant to a request:
//! - `VectorIndex` is the boundary to the external backing store
//! - `ContextRetriever` wraps it with a timeout and degrades to empty
//!   context instead of failing the workflow
//! - `InMemoryIndex` is a deterministic reference implementation
//!
//! Retrieval is read-only and idempotent: identical requests against an
//! unchanged index return identical ordered results.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod chunk;
pub mod context;
pub mod index;
pub mod retriever;

pub use chunk::chunk_document;
pub use context::{ContextOrigin, Passage, RetrievedContext, SourceId};
pub use index::{InMemoryIndex, IndexError, VectorIndex};
pub use retriever::ContextRetriever;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
