//! Typed, non-owning views over host array handles
//!
//! A view is a thin `Copy` reference: a host, a handle, and cached data
//! pointer and length. Many views may alias one handle. Element access goes
//! through `get`/`set`, which read and write single elements through the
//! cached pointer, so aliasing views stay sound without borrowing the host
//! memory. Bulk slice access is `unsafe` and leaves exclusivity to the caller.
//!
//! Views never free anything on drop. A handle is released only by an
//! explicit `free`, or by handing it back to the host.

pub mod image;
pub mod raw;
pub mod shaped;
pub mod sparse;
pub mod tensor;

pub use image::{GenericImageView, Image3DView, ImageView, PixelCursor, PixelIter};
pub use raw::{GenericRawArrayView, RawArrayView};
pub use shaped::{CubeView, MatrixView};
pub use sparse::{Entries, SparseArrayView, SparseCursor, SparseMatrixView};
pub use tensor::TensorView;

use crate::error::{ErrorCode, LibraryError, Result};
use std::ptr::NonNull;

/// Pointer and length of a host element buffer
#[derive(Debug)]
pub(crate) struct Elements<T> {
    data: NonNull<T>,
    len: usize,
}

impl<T> Clone for Elements<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Elements<T> {}

impl<T: Copy> Elements<T> {
    /// Wrap a host data pointer. A null pointer is accepted only for empty buffers.
    pub(crate) fn new(raw: *mut u8, len: usize, what: &'static str) -> Result<Self> {
        let data = match NonNull::new(raw as *mut T) {
            Some(data) => data,
            None if len == 0 => NonNull::dangling(),
            None => {
                return Err(LibraryError::with_message(
                    format!("{}: host returned no data.", what),
                    ErrorCode::FUNCTION,
                ));
            }
        };
        debug_assert_eq!(
            data.as_ptr() as usize % std::mem::align_of::<T>(),
            0,
            "misaligned host buffer"
        );
        Ok(Elements { data, len })
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn as_ptr(&self) -> *mut T {
        self.data.as_ptr()
    }

    #[track_caller]
    pub(crate) fn get(&self, i: usize) -> T {
        assert!(i < self.len, "index {} out of bounds for length {}", i, self.len);
        // SAFETY: in bounds; the host keeps the buffer alive until it is freed
        unsafe { self.data.as_ptr().add(i).read() }
    }

    #[track_caller]
    pub(crate) fn set(&self, i: usize, value: T) {
        assert!(i < self.len, "index {} out of bounds for length {}", i, self.len);
        // SAFETY: as for `get`
        unsafe { self.data.as_ptr().add(i).write(value) }
    }

    /// # Safety
    /// The handle must be live and nothing may write the buffer while the slice exists.
    pub(crate) unsafe fn as_slice<'a>(&self) -> &'a [T] {
        // SAFETY: guaranteed by the caller
        unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }

    /// # Safety
    /// The handle must be live and the slice must be the only access to the buffer.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn as_mut_slice<'a>(&self) -> &'a mut [T] {
        // SAFETY: guaranteed by the caller
        unsafe { std::slice::from_raw_parts_mut(self.data.as_ptr(), self.len) }
    }

    pub(crate) fn copy_from(&self, src: &[T]) -> Result<()> {
        if src.len() != self.len {
            return Err(LibraryError::dimension(format!(
                "source of length {} does not fit {} elements.",
                src.len(),
                self.len
            )));
        }
        // SAFETY: both ranges hold `len` elements; `src` is Rust memory, disjoint from the host buffer
        unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), self.data.as_ptr(), self.len) };
        Ok(())
    }

    pub(crate) fn iter(self) -> impl DoubleEndedIterator<Item = T> + ExactSizeIterator {
        (0..self.len).map(move |i| self.get(i))
    }
}
