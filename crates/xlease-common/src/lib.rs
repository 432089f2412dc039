//! Lease index common types, errors, and the on-disk record format.
//!
//! This crate provides shared definitions used across all lease index components.

pub mod config;
pub mod error;
pub mod layout;
pub mod lease_id;
pub mod record;

pub use config::IndexConfig;
pub use error::{LeaseError, Result};
pub use layout::{
    Geometry, RecordNumber, BLANK_UUID, BLOCK_SIZE, INDEX_SIZE, LEASE_BASE, LEASE_SIZE,
    MAX_RECORDS, RECORD_BASE, RECORD_SIZE,
};
pub use lease_id::validate_lease_id;
pub use record::{Record, RecordState};
