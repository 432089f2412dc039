//! Direct I/O access to the lease volume.
//!
//! Reads and writes bypass the OS page cache (O_DIRECT on Linux, F_NOCACHE
//! on macOS), so a completed write has left host memory. Callers must still
//! call [`DirectFile::sync`] before treating the data as durable.
//!
//! Offsets and lengths must be multiples of the block size, and with direct
//! I/O enabled buffers must be block aligned as well. Violations are
//! programming errors and panic.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use tracing::debug;
use xlease_common::{IndexConfig, Result};

/// A volume opened for block-aligned, unbuffered I/O.
pub struct DirectFile {
    /// Path to the lease file or block device.
    path: PathBuf,
    /// The file handle.
    file: File,
    /// Required alignment for offsets, lengths and buffers.
    block_size: usize,
    /// Whether the page cache is bypassed.
    direct_io: bool,
}

impl DirectFile {
    /// Opens an existing volume.
    ///
    /// The volume is opened read-write when `writable` is set, read-only
    /// otherwise. It is never created; volume creation belongs to the caller.
    pub fn open(path: impl AsRef<Path>, config: &IndexConfig, writable: bool) -> Result<Self> {
        let path = path.as_ref();
        let geometry = config.geometry()?;

        let mut options = OpenOptions::new();
        options.read(true).write(writable);

        #[cfg(target_os = "linux")]
        if config.direct_io {
            use std::os::unix::fs::OpenOptionsExt;
            options.custom_flags(libc::O_DIRECT);
        }

        let file = options.open(path)?;

        // macOS doesn't support O_DIRECT; use F_NOCACHE for similar semantics.
        #[cfg(target_os = "macos")]
        if config.direct_io {
            // SAFETY: the descriptor is valid and owned by `file`.
            let result = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_NOCACHE, 1) };
            if result == -1 {
                return Err(io::Error::last_os_error().into());
            }
        }

        debug!(
            "opened {:?} (writable: {}, direct_io: {}, block_size: {})",
            path,
            writable,
            config.direct_io,
            geometry.block_size()
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            block_size: geometry.block_size(),
            direct_io: config.direct_io,
        })
    }

    /// Returns the path this file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the I/O alignment in bytes.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns true if the page cache is bypassed.
    pub fn is_direct(&self) -> bool {
        self.direct_io
    }

    /// Moves the file position to `offset`.
    pub fn seek(&mut self, offset: u64) -> Result<u64> {
        assert!(
            offset % self.block_size as u64 == 0,
            "unaligned offset {} for block size {}",
            offset,
            self.block_size
        );
        Ok(self.file.seek(SeekFrom::Start(offset))?)
    }

    /// Fills `buf` from the current position.
    ///
    /// Partial and interrupted reads are retried. Reaching the end of the
    /// volume before `buf` is full fails with `UnexpectedEof`.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.assert_aligned(buf);

        let mut pos = 0;
        while pos < buf.len() {
            match self.file.read(&mut buf[pos..]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        ErrorKind::UnexpectedEof,
                        format!(
                            "{:?}: read {} of {} bytes before end of volume",
                            self.path,
                            pos,
                            buf.len()
                        ),
                    )
                    .into())
                }
                Ok(n) => pos += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(pos)
    }

    /// Writes all of `buf` at the current position.
    ///
    /// Partial and interrupted writes are retried.
    pub fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.assert_aligned(buf);

        let mut pos = 0;
        while pos < buf.len() {
            match self.file.write(&buf[pos..]) {
                Ok(0) => return Err(io::Error::from(ErrorKind::WriteZero).into()),
                Ok(n) => pos += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Waits until previously written data reaches storage.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Closes the volume without syncing.
    pub fn close(self) {
        debug!("closing {:?}", self.path);
    }

    fn assert_aligned(&self, buf: &[u8]) {
        assert!(
            buf.len() % self.block_size == 0,
            "unaligned length {} for block size {}",
            buf.len(),
            self.block_size
        );
        if self.direct_io {
            assert!(
                buf.as_ptr() as usize % self.block_size == 0,
                "unaligned buffer for direct I/O"
            );
        }
    }
}

impl AsRawFd for DirectFile {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl std::fmt::Debug for DirectFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectFile")
            .field("path", &self.path)
            .field("block_size", &self.block_size)
            .field("direct_io", &self.direct_io)
            .finish()
    }
}
