//! Block-aligned memory for the index image.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Zero-filled heap memory whose start is aligned to a block boundary.
///
/// `Vec<u8>` only guarantees byte alignment, which O_DIRECT rejects, so the
/// memory is allocated with an explicit [`Layout`].
pub struct AlignedBuf {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl AlignedBuf {
    /// Allocates `len` zero bytes aligned to `block_size`.
    ///
    /// Panics if `len` is zero or not a whole number of blocks, or if
    /// `block_size` is not a power of two.
    pub fn new_zeroed(len: usize, block_size: usize) -> Self {
        assert!(len > 0, "empty aligned buffer");
        assert!(
            block_size.is_power_of_two() && len % block_size == 0,
            "length {} is not a multiple of block size {}",
            len,
            block_size
        );
        let layout = match Layout::from_size_align(len, block_size) {
            Ok(layout) => layout,
            Err(e) => panic!("cannot allocate {} bytes: {}", len, e),
        };

        // SAFETY: the layout has a non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).unwrap_or_else(|| alloc::handle_alloc_error(layout));
        Self { ptr, layout }
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `ptr` points to `layout.size()` initialized bytes owned by self.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` makes the borrow unique.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl Drop for AlignedBuf {
    fn drop(&mut self) {
        // SAFETY: allocated in `new_zeroed` with the same layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

impl std::fmt::Debug for AlignedBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuf")
            .field("len", &self.layout.size())
            .field("block_size", &self.layout.align())
            .finish()
    }
}

// SAFETY: the allocation is owned exclusively and never aliased.
unsafe impl Send for AlignedBuf {}
