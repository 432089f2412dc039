//! External lease index.
//!
//! A lease is a lease-sized area at some offset in the lease volume,
//! associated with a lockspace and a unique name. The lock manager does not
//! track which name lives at which offset; this index does. It is a cache
//! of the resources on storage and can be rebuilt from them.
//!
//! Only the host holding the writer role for a lockspace may add or remove
//! leases. Any host may look up the offset of a lease and use it to acquire
//! the lock manager resource.
//!
//! ```no_run
//! use xlease_index::{Index, IndexConfig, WriterRole};
//!
//! struct Spm;
//!
//! impl WriterRole for Spm {
//!     fn lockspace(&self) -> &str {
//!         "sd-1"
//!     }
//! }
//!
//! # fn main() -> xlease_index::Result<()> {
//! let config = IndexConfig::default();
//! let mut index = Index::open_writable("sd-1", "/dev/sd-1/xleases", &config, &Spm)?;
//! let info = index.add("34e5a2a8-1a4d-45a0-a4b2-c88157f7a5a9")?;
//! println!("lease at offset {}", info.offset);
//! index.close();
//! # Ok(())
//! # }
//! ```

pub mod clock;
mod index;
mod role;

pub use clock::{Clock, FixedClock, SystemClock};
pub use index::{Index, LeaseEntry, LeaseInfo};
pub use role::WriterRole;
pub use xlease_common::{
    Geometry, IndexConfig, LeaseError, RecordState, Result, BLANK_UUID, INDEX_SIZE, LEASE_BASE,
    LEASE_SIZE, MAX_RECORDS, RECORD_SIZE,
};
