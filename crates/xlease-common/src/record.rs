//! Lease record format.
//!
//! Records are plain text so the index can be inspected with standard tools
//! like `less` and `grep`, but fixed width so a record number maps directly
//! to a byte offset.
//!
//! ```text
//! <lease-id>:<state>:<timestamp>:<padding>\n
//!
//! 34e5a2a8-1a4d-45a0-a4b2-c88157f7a5a9:U:1479914506:0000000000000\n
//! cce4623a-6229-447f-8156-c8d61d826085:S:1479914511:0000000000000\n
//! 00000000-0000-0000-0000-000000000000:F:1479914552:0000000000000\n
//! ```

use crate::error::{LeaseError, Result};
use crate::layout::{BLANK_UUID, RECORD_SIZE};
use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// Field separator.
pub const RECORD_SEP: u8 = b':';

/// Record terminator.
pub const RECORD_TERM: u8 = b'\n';

/// Padding byte between the last separator and the terminator.
pub const RECORD_PAD: u8 = b'0';

/// Minimum width of the timestamp field.
pub const TIMESTAMP_WIDTH: usize = 10;

/// State of a lease record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordState {
    /// A lock manager resource exists for this record.
    Used,
    /// The slot is available.
    Free,
    /// An add or remove was interrupted; the record must be rebuilt from storage.
    Stale,
}

impl RecordState {
    /// Returns the on-disk state byte.
    pub fn as_byte(&self) -> u8 {
        match self {
            RecordState::Used => b'U',
            RecordState::Free => b'F',
            RecordState::Stale => b'S',
        }
    }

    /// Returns the state name reported to callers.
    pub fn name(&self) -> &'static str {
        match self {
            RecordState::Used => "USED",
            RecordState::Free => "FREE",
            RecordState::Stale => "STALE",
        }
    }
}

impl TryFrom<u8> for RecordState {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            b'U' => Ok(RecordState::Used),
            b'F' => Ok(RecordState::Free),
            b'S' => Ok(RecordState::Stale),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for RecordState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single slot descriptor in the record table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Lease id, or [`BLANK_UUID`] for free records.
    pub lease_id: String,
    /// Record state.
    pub state: RecordState,
    /// Modification time in seconds since the epoch.
    pub modified: u64,
}

impl Record {
    /// Creates a new record.
    pub fn new(lease_id: impl Into<String>, state: RecordState, modified: u64) -> Self {
        Self {
            lease_id: lease_id.into(),
            state,
            modified,
        }
    }

    /// Creates a free record.
    pub fn free(modified: u64) -> Self {
        Self::new(BLANK_UUID, RecordState::Free, modified)
    }

    /// Serializes this record to its storage format.
    ///
    /// # Panics
    ///
    /// Panics if the fields do not fit in [`RECORD_SIZE`] bytes.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let timestamp = format!("{:0width$}", self.modified, width = TIMESTAMP_WIDTH);
        let used = self.lease_id.len() + timestamp.len() + 4;
        assert!(
            used < RECORD_SIZE,
            "record fields too long: {} bytes",
            used
        );

        let mut data = [0u8; RECORD_SIZE];
        let mut buf = &mut data[..];
        buf.put_slice(self.lease_id.as_bytes());
        buf.put_u8(RECORD_SEP);
        buf.put_u8(self.state.as_byte());
        buf.put_u8(RECORD_SEP);
        buf.put_slice(timestamp.as_bytes());
        buf.put_u8(RECORD_SEP);
        buf.put_bytes(RECORD_PAD, RECORD_SIZE - used - 1);
        buf.put_u8(RECORD_TERM);
        debug_assert!(buf.is_empty());

        data
    }

    /// Parses a record from storage.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != RECORD_SIZE {
            return Err(LeaseError::invalid_format("incorrect length", data));
        }

        let fields: Vec<&[u8]> = data.splitn(5, |b| *b == RECORD_SEP).collect();
        let [lease_id, state, modified, _padding] = fields[..] else {
            return Err(LeaseError::invalid_format("incorrect number of fields", data));
        };

        let lease_id = match std::str::from_utf8(lease_id) {
            Ok(s) if s.is_ascii() => s.to_string(),
            _ => {
                return Err(LeaseError::invalid_format(
                    format!("cannot decode lease id {:?}", String::from_utf8_lossy(lease_id)),
                    data,
                ))
            }
        };

        let state = match state {
            [byte] => RecordState::try_from(*byte).ok(),
            _ => None,
        }
        .ok_or_else(|| {
            LeaseError::invalid_format(
                format!("invalid state {:?}", String::from_utf8_lossy(state)),
                data,
            )
        })?;

        let modified = parse_timestamp(modified).ok_or_else(|| {
            LeaseError::invalid_format(
                format!("cannot parse timestamp {:?}", String::from_utf8_lossy(modified)),
                data,
            )
        })?;

        Ok(Self {
            lease_id,
            state,
            modified,
        })
    }
}

/// Parses a non-negative decimal timestamp.
fn parse_timestamp(field: &[u8]) -> Option<u64> {
    if field.is_empty() || !field.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(field).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEASE_ID: &str = "34e5a2a8-1a4d-45a0-a4b2-c88157f7a5a9";

    fn padded(text: &[u8]) -> Vec<u8> {
        let mut data = text.to_vec();
        data.resize(RECORD_SIZE - 1, RECORD_PAD);
        data.push(RECORD_TERM);
        data
    }

    #[test]
    fn test_record_state_bytes() {
        assert_eq!(RecordState::try_from(b'U').unwrap(), RecordState::Used);
        assert_eq!(RecordState::try_from(b'F').unwrap(), RecordState::Free);
        assert_eq!(RecordState::try_from(b'S').unwrap(), RecordState::Stale);
        assert_eq!(RecordState::try_from(b'X'), Err(b'X'));

        for state in [RecordState::Used, RecordState::Free, RecordState::Stale] {
            assert_eq!(RecordState::try_from(state.as_byte()).unwrap(), state);
        }
    }

    #[test]
    fn test_record_state_names() {
        assert_eq!(RecordState::Used.to_string(), "USED");
        assert_eq!(RecordState::Free.to_string(), "FREE");
        assert_eq!(RecordState::Stale.to_string(), "STALE");
    }

    #[test]
    fn test_record_state_serde() {
        assert_eq!(serde_json::to_string(&RecordState::Stale).unwrap(), "\"STALE\"");
        let state: RecordState = serde_json::from_str("\"USED\"").unwrap();
        assert_eq!(state, RecordState::Used);
    }

    #[test]
    fn test_record_exact_bytes() {
        let record = Record::new(LEASE_ID, RecordState::Used, 1479914506);
        assert_eq!(
            &record.to_bytes()[..],
            b"34e5a2a8-1a4d-45a0-a4b2-c88157f7a5a9:U:1479914506:0000000000000\n"
        );

        let free = Record::free(1479914552);
        assert_eq!(
            &free.to_bytes()[..],
            b"00000000-0000-0000-0000-000000000000:F:1479914552:0000000000000\n"
        );
    }

    #[test]
    fn test_record_timestamp_zero_padded() {
        let record = Record::new(LEASE_ID, RecordState::Stale, 0);
        let data = record.to_bytes();
        assert_eq!(&data[36..50], b":S:0000000000:");
        assert_eq!(data.len(), RECORD_SIZE);
        assert_eq!(data[RECORD_SIZE - 1], RECORD_TERM);
    }

    #[test]
    fn test_record_roundtrip_states_and_boundaries() {
        for state in [RecordState::Used, RecordState::Free, RecordState::Stale] {
            for modified in [0, 1479914506, 9_999_999_999, 10_000_000_000, u64::MAX] {
                let record = Record::new(LEASE_ID, state, modified);
                let data = record.to_bytes();
                assert_eq!(data.len(), RECORD_SIZE);
                assert_eq!(data[RECORD_SIZE - 1], RECORD_TERM);
                assert_eq!(Record::from_bytes(&data).unwrap(), record);
            }
        }
    }

    #[test]
    #[should_panic(expected = "record fields too long")]
    fn test_record_oversized_lease_id() {
        let record = Record::new("x".repeat(60), RecordState::Used, 0);
        let _ = record.to_bytes();
    }

    #[test]
    fn test_decode_incorrect_length() {
        let data = Record::free(0).to_bytes();
        for len in [0, 1, RECORD_SIZE - 1] {
            let err = Record::from_bytes(&data[..len]).unwrap_err();
            assert!(matches!(
                err,
                LeaseError::InvalidFormat { ref reason, .. }
                    if reason == "incorrect length"
            ));
        }

        let mut long = data.to_vec();
        long.push(b'0');
        assert!(matches!(
            Record::from_bytes(&long),
            Err(LeaseError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_decode_missing_field() {
        let data = padded(format!("{LEASE_ID}:U:1479914506").as_bytes());
        let err = Record::from_bytes(&data).unwrap_err();
        assert!(matches!(
            err,
            LeaseError::InvalidFormat { ref reason, .. }
                if reason == "incorrect number of fields"
        ));
    }

    #[test]
    fn test_decode_extra_field() {
        let data = padded(format!("{LEASE_ID}:U:1479914506:00:00").as_bytes());
        let err = Record::from_bytes(&data).unwrap_err();
        assert!(matches!(
            err,
            LeaseError::InvalidFormat { ref reason, .. }
                if reason == "incorrect number of fields"
        ));
    }

    #[test]
    fn test_decode_zeroed_block() {
        // An unformatted volume reads back as zeros.
        let err = Record::from_bytes(&[0u8; RECORD_SIZE]).unwrap_err();
        assert!(matches!(err, LeaseError::InvalidFormat { .. }));
    }

    #[test]
    fn test_decode_non_ascii_lease_id() {
        let mut data = padded(format!("{LEASE_ID}:U:1479914506:").as_bytes());
        data[0] = 0xff;
        let err = Record::from_bytes(&data).unwrap_err();
        assert!(matches!(
            err,
            LeaseError::InvalidFormat { ref reason, .. }
                if reason.starts_with("cannot decode lease id")
        ));
    }

    #[test]
    fn test_decode_unknown_state() {
        for state in ["X", "u", "UU", ""] {
            let data = padded(format!("{LEASE_ID}:{state}:1479914506:").as_bytes());
            let err = Record::from_bytes(&data).unwrap_err();
            assert!(matches!(
                err,
                LeaseError::InvalidFormat { ref reason, .. }
                    if reason.starts_with("invalid state")
            ));
        }
    }

    #[test]
    fn test_decode_bad_timestamp() {
        for timestamp in ["", "12ab", "-1", " 123", "+123", "99999999999999999999999"] {
            let data = padded(format!("{LEASE_ID}:U:{timestamp}:").as_bytes());
            let err = Record::from_bytes(&data).unwrap_err();
            assert!(matches!(
                err,
                LeaseError::InvalidFormat { ref reason, .. }
                    if reason.starts_with("cannot parse timestamp")
            ));
        }
    }

    #[test]
    fn test_decode_ignores_padding_content() {
        let data = padded(format!("{LEASE_ID}:U:1479914506:xyz").as_bytes());
        let record = Record::from_bytes(&data).unwrap();
        assert_eq!(record.lease_id, LEASE_ID);
        assert_eq!(record.modified, 1479914506);
    }
}
