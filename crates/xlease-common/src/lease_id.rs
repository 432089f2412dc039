//! Lease id validation.

use crate::error::{LeaseError, Result};
use uuid::Uuid;

/// Length of a hyphenated UUID string.
pub const LEASE_ID_LEN: usize = 36;

/// Checks that `lease_id` is a lowercase hyphenated UUID other than the
/// blank placeholder used by free records.
pub fn validate_lease_id(lease_id: &str) -> Result<()> {
    let invalid = || LeaseError::InvalidLeaseId {
        lease_id: lease_id.to_string(),
    };

    if lease_id.len() != LEASE_ID_LEN {
        return Err(invalid());
    }
    let uuid = Uuid::try_parse(lease_id).map_err(|_| invalid())?;
    if uuid.is_nil() {
        return Err(invalid());
    }
    // Uppercase ids would never match the stored lowercase records.
    let mut canonical = Uuid::encode_buffer();
    if uuid.hyphenated().encode_lower(&mut canonical) != lease_id {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BLANK_UUID;

    #[test]
    fn test_valid_lease_ids() {
        for id in [
            "34e5a2a8-1a4d-45a0-a4b2-c88157f7a5a9",
            "11111111-1111-1111-1111-111111111111",
            "ffffffff-ffff-ffff-ffff-ffffffffffff",
        ] {
            validate_lease_id(id).unwrap();
        }
    }

    #[test]
    fn test_blank_uuid_rejected() {
        let err = validate_lease_id(BLANK_UUID).unwrap_err();
        assert!(matches!(err, LeaseError::InvalidLeaseId { .. }));
    }

    #[test]
    fn test_invalid_lease_ids() {
        for id in [
            "",
            "not-a-uuid",
            "34E5A2A8-1A4D-45A0-A4B2-C88157F7A5A9",
            "34e5a2a81a4d45a0a4b2c88157f7a5a9",
            "{34e5a2a8-1a4d-45a0-a4b2-c88157f7a5a9}",
            "34e5a2a8-1a4d-45a0-a4b2-c88157f7a5a9:",
            "34e5a2a8:1a4d-45a0-a4b2-c88157f7a5a9",
        ] {
            let err = validate_lease_id(id).unwrap_err();
            assert!(
                matches!(err, LeaseError::InvalidLeaseId { ref lease_id } if lease_id == id),
                "accepted {id:?}"
            );
        }
    }
}
