//! Block storage access for the lease index.
//!
//! This crate provides:
//! - Aligned heap buffers suitable for direct I/O
//! - A direct I/O file with aligned read, write and sync primitives

#[cfg(not(unix))]
compile_error!("xlease-storage supports only unix platforms.");

mod aligned;
mod direct;

pub use aligned::AlignedBuf;
pub use direct::DirectFile;
