//! Zero-initialised, aligned backing memory for host arrays

use crate::error::ErrorCode;
use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Alignment of every buffer; enough for `Complex<f64>`
const ALIGN: usize = 16;

/// Owned heap block. The address never changes while the block is alive.
pub(super) struct Storage {
    ptr: NonNull<u8>,
    layout: Layout,
    len: usize,
}

impl Storage {
    pub(super) fn zeroed(len: usize) -> Result<Self, ErrorCode> {
        let layout = Layout::from_size_align(len.max(1), ALIGN).map_err(|_| ErrorCode::MEMORY)?;
        // SAFETY: layout has a non-zero size
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(ErrorCode::MEMORY)?;
        Ok(Storage { ptr, layout, len })
    }

    pub(super) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Size in bytes as requested
    pub(super) fn len(&self) -> usize {
        self.len
    }

    pub(super) fn duplicate(&self) -> Result<Self, ErrorCode> {
        let copy = Storage::zeroed(self.len())?;
        // SAFETY: both blocks are at least `len` bytes and do not overlap
        unsafe {
            std::ptr::copy_nonoverlapping(self.as_ptr(), copy.as_ptr(), self.len());
        }
        Ok(copy)
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        // SAFETY: ptr was allocated with exactly this layout
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}
