//! In-memory index buffer for the lease index.
//!
//! The whole index region is read once when an index is opened. Lookups
//! search this copy; each mutation rewrites one record in memory and
//! flushes only the block that contains it.

mod index_buffer;

pub use index_buffer::IndexBuffer;
