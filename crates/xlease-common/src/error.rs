//! Error types for the lease index.

use thiserror::Error;

/// Result type alias using LeaseError.
pub type Result<T> = std::result::Result<T, LeaseError>;

/// Errors that can occur in lease index operations.
#[derive(Debug, Error)]
pub enum LeaseError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Lease errors
    #[error("No such lease {lease_id}")]
    NoSuchLease { lease_id: String },

    #[error("Lease {lease_id} exists since {modified}")]
    LeaseExists { lease_id: String, modified: u64 },

    #[error("Lease {lease_id} is stale since {modified}")]
    StaleLease { lease_id: String, modified: u64 },

    #[error("No space to add lease {lease_id}")]
    NoSpace { lease_id: String },

    #[error("Invalid lease id {lease_id:?}")]
    InvalidLeaseId { lease_id: String },

    // Storage format errors
    #[error("Invalid record ({reason}): {record:?}")]
    InvalidFormat { reason: String, record: String },

    // Access errors
    #[error("Index for lockspace {lockspace} is open read-only")]
    ReadOnly { lockspace: String },

    #[error("Writer role is held for lockspace {actual}, not {expected}")]
    NotWriter { expected: String, actual: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LeaseError {
    /// Builds an InvalidFormat error from the raw record bytes.
    pub fn invalid_format(reason: impl Into<String>, record: &[u8]) -> Self {
        LeaseError::InvalidFormat {
            reason: reason.into(),
            record: String::from_utf8_lossy(record).into_owned(),
        }
    }
}
