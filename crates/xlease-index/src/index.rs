//! Lease index stored at the start of the lease volume.

use crate::clock::{Clock, SystemClock};
use crate::role::WriterRole;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use xlease_buffer::IndexBuffer;
use xlease_common::{
    validate_lease_id, Geometry, IndexConfig, LeaseError, Record, RecordNumber, RecordState,
    Result, BLANK_UUID,
};
use xlease_storage::DirectFile;

/// Location of a lease on storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseInfo {
    /// Lock manager lockspace name.
    pub lockspace: String,
    /// Lock manager resource name.
    pub lease_id: String,
    /// Path to the lease file or block device.
    pub path: PathBuf,
    /// Offset of the lease area in the volume.
    pub offset: u64,
    /// Modification time in seconds since the epoch.
    pub modified: u64,
}

/// A non-free record as reported by [`Index::leases`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseEntry {
    /// Offset of the lease area in the volume.
    pub offset: u64,
    /// Record state, either used or stale.
    pub state: RecordState,
    /// Modification time in seconds since the epoch.
    pub modified: u64,
}

/// Lease index for one lockspace.
///
/// The index is read from storage when it is opened and never read again;
/// to observe changes made by the writer host, open it again. Every change
/// is written to storage before the call returns.
///
/// An `Index` is owned by a single thread. Mutations require an index opened
/// with [`open_writable`](Self::open_writable).
pub struct Index {
    /// Lock manager lockspace name.
    lockspace: String,
    /// The lease volume.
    file: DirectFile,
    /// In-memory copy of the index region.
    buf: IndexBuffer,
    /// Whether this handle was opened with the writer role.
    writable: bool,
    /// Source of record timestamps.
    clock: Box<dyn Clock>,
}

impl Index {
    /// Opens the index at `path` for lookups.
    pub fn open(
        lockspace: impl Into<String>,
        path: impl AsRef<Path>,
        config: &IndexConfig,
    ) -> Result<Self> {
        Self::load(lockspace.into(), path.as_ref(), config, false)
    }

    /// Opens the index at `path` for lookups and changes.
    ///
    /// `role` must have been granted for the same lockspace.
    pub fn open_writable<R: WriterRole + ?Sized>(
        lockspace: impl Into<String>,
        path: impl AsRef<Path>,
        config: &IndexConfig,
        role: &R,
    ) -> Result<Self> {
        let lockspace = lockspace.into();
        if role.lockspace() != lockspace {
            return Err(LeaseError::NotWriter {
                expected: lockspace,
                actual: role.lockspace().to_string(),
            });
        }
        Self::load(lockspace, path.as_ref(), config, true)
    }

    fn load(lockspace: String, path: &Path, config: &IndexConfig, writable: bool) -> Result<Self> {
        debug!("Loading index for lockspace {:?} from {:?}", lockspace, path);
        let geometry = config.geometry()?;
        let mut file = DirectFile::open(path, config, writable)?;
        let buf = IndexBuffer::load(&mut file, geometry)?;

        Ok(Self {
            lockspace,
            file,
            buf,
            writable,
            clock: Box::new(SystemClock),
        })
    }

    /// Replaces the time source used for record timestamps.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Returns the lockspace name.
    pub fn lockspace(&self) -> &str {
        &self.lockspace
    }

    /// Returns the path of the lease volume.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns the volume geometry.
    pub fn geometry(&self) -> Geometry {
        self.buf.geometry()
    }

    /// Returns true if this handle may change the index.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Looks up `lease_id`.
    ///
    /// # Errors
    ///
    /// - `NoSuchLease` if there is no record for the lease
    /// - `StaleLease` if the record is stale
    /// - `InvalidFormat` if the record is corrupted
    pub fn lookup(&self, lease_id: &str) -> Result<LeaseInfo> {
        validate_lease_id(lease_id)?;
        debug!(
            "Looking up lease {:?} in lockspace {:?}",
            lease_id, self.lockspace
        );

        let recnum = self
            .buf
            .find_record(lease_id)
            .ok_or_else(|| LeaseError::NoSuchLease {
                lease_id: lease_id.to_string(),
            })?;

        let record = self.buf.read_record(recnum)?;
        if record.state == RecordState::Stale {
            return Err(LeaseError::StaleLease {
                lease_id: lease_id.to_string(),
                modified: record.modified,
            });
        }

        Ok(self.lease_info(lease_id, recnum, record.modified))
    }

    /// Allocates the first free slot for `lease_id`.
    ///
    /// # Errors
    ///
    /// - `LeaseExists` if the lease is already in the index
    /// - `StaleLease` if the lease record is stale; it must be rebuilt from
    ///   storage before it can be added again
    /// - `NoSpace` if all slots are allocated
    /// - `Io` if the record could not be written; the index is left as it
    ///   was before the call
    pub fn add(&mut self, lease_id: &str) -> Result<LeaseInfo> {
        self.check_writable()?;
        validate_lease_id(lease_id)?;
        info!("Adding lease {:?} in lockspace {:?}", lease_id, self.lockspace);

        if let Some(recnum) = self.buf.find_record(lease_id) {
            let record = self.buf.read_record(recnum)?;
            let lease_id = lease_id.to_string();
            return Err(match record.state {
                RecordState::Stale => LeaseError::StaleLease {
                    lease_id,
                    modified: record.modified,
                },
                _ => LeaseError::LeaseExists {
                    lease_id,
                    modified: record.modified,
                },
            });
        }

        let recnum = self
            .buf
            .find_record(BLANK_UUID)
            .ok_or_else(|| LeaseError::NoSpace {
                lease_id: lease_id.to_string(),
            })?;

        let record = Record::new(lease_id, RecordState::Used, self.clock.now());
        self.buf.commit_record(recnum, &record, &mut self.file)?;

        Ok(self.lease_info(lease_id, recnum, record.modified))
    }

    /// Frees the slot of `lease_id`.
    ///
    /// # Errors
    ///
    /// - `NoSuchLease` if there is no record for the lease
    /// - `Io` if the record could not be written; the index is left as it
    ///   was before the call
    pub fn remove(&mut self, lease_id: &str) -> Result<()> {
        self.check_writable()?;
        validate_lease_id(lease_id)?;
        info!(
            "Removing lease {:?} in lockspace {:?}",
            lease_id, self.lockspace
        );

        let recnum = self
            .buf
            .find_record(lease_id)
            .ok_or_else(|| LeaseError::NoSuchLease {
                lease_id: lease_id.to_string(),
            })?;

        let record = Record::free(self.clock.now());
        self.buf.commit_record(recnum, &record, &mut self.file)
    }

    /// Marks every record free, deleting all existing leases.
    ///
    /// The whole index region is rewritten; this is not atomic. If writing
    /// fails this handle keeps the previous records, but storage may hold
    /// a mix of old and new blocks.
    pub fn format(&mut self) -> Result<()> {
        self.check_writable()?;
        info!("Formatting index for lockspace {:?}", self.lockspace);

        let record = Record::free(self.clock.now());
        self.buf.commit_all(&record, &mut self.file)
    }

    /// Returns every used or stale record keyed by lease id.
    ///
    /// Fails on the first corrupted record.
    pub fn leases(&self) -> Result<HashMap<String, LeaseEntry>> {
        debug!("Getting all leases for lockspace {:?}", self.lockspace);

        let mut leases = HashMap::new();
        for (recnum, record) in self.buf.read_records() {
            let record = record?;
            if record.state == RecordState::Free {
                continue;
            }
            leases.insert(
                record.lease_id,
                LeaseEntry {
                    offset: self.buf.geometry().lease_offset(recnum),
                    state: record.state,
                    modified: record.modified,
                },
            );
        }
        Ok(leases)
    }

    /// Closes the index, releasing the in-memory copy and the volume.
    pub fn close(self) {
        debug!("Closing index for lockspace {:?}", self.lockspace);
        self.file.close();
    }

    fn check_writable(&self) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(LeaseError::ReadOnly {
                lockspace: self.lockspace.clone(),
            })
        }
    }

    fn lease_info(&self, lease_id: &str, recnum: RecordNumber, modified: u64) -> LeaseInfo {
        LeaseInfo {
            lockspace: self.lockspace.clone(),
            lease_id: lease_id.to_string(),
            path: self.file.path().to_path_buf(),
            offset: self.buf.geometry().lease_offset(recnum),
            modified,
        }
    }
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("lockspace", &self.lockspace)
            .field("file", &self.file)
            .field("writable", &self.writable)
            .finish()
    }
}
