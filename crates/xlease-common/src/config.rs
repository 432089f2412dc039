//! Configuration for opening a lease index.

use crate::error::{LeaseError, Result};
use crate::layout::{Geometry, BLOCK_SIZE, BLOCK_SIZE_4K};
use serde::{Deserialize, Serialize};

/// Configuration for opening a lease index volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Logical block size of the device, matching the lock manager alignment.
    pub block_size: usize,
    /// Open the volume with direct I/O (bypass OS page cache).
    pub direct_io: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            direct_io: true,
        }
    }
}

impl IndexConfig {
    /// Validates the configuration and returns the volume geometry.
    pub fn geometry(&self) -> Result<Geometry> {
        match self.block_size {
            BLOCK_SIZE | BLOCK_SIZE_4K => Ok(Geometry::new(self.block_size)),
            other => Err(LeaseError::ConfigError(format!(
                "unsupported block size {}, expected {} or {}",
                other, BLOCK_SIZE, BLOCK_SIZE_4K
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_config_defaults() {
        let config = IndexConfig::default();
        assert_eq!(config.block_size, 512);
        assert!(config.direct_io);
        assert_eq!(config.geometry().unwrap(), Geometry::default());
    }

    #[test]
    fn test_index_config_4k() {
        let config = IndexConfig {
            block_size: 4096,
            ..Default::default()
        };
        let geometry = config.geometry().unwrap();
        assert_eq!(geometry.block_size(), 4096);
    }

    #[test]
    fn test_index_config_invalid_block_size() {
        for block_size in [0, 100, 1024, 8192] {
            let config = IndexConfig {
                block_size,
                direct_io: false,
            };
            let err = config.geometry().unwrap_err();
            assert!(matches!(err, LeaseError::ConfigError(_)));
        }
    }

    #[test]
    fn test_index_config_serde_roundtrip() {
        let original = IndexConfig {
            block_size: 4096,
            direct_io: false,
        };
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: IndexConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_index_config_serde_missing_fields() {
        let config: IndexConfig = serde_json::from_str(r#"{"direct_io": false}"#).unwrap();
        assert_eq!(config.block_size, 512);
        assert!(!config.direct_io);
    }
}
