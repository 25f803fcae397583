//! ndarray integration for host array views
//!
//! Zero-copy `ndarray` views over dense tensors and raw arrays, owned copies,
//! and factories that build new host arrays from ndarray arrays.
//!
//! Enable with the `ndarray` feature flag.

use crate::error::{LibraryError, Result};
use crate::host::Runtime;
use crate::make;
use crate::types::{RawElement, TensorElement};
use crate::views::{RawArrayView, TensorView};
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, IxDyn};

fn shape_error(what: &str, dims: &[usize], err: ndarray::ShapeError) -> LibraryError {
    LibraryError::dimension(format!("{}: shape {:?} rejected: {}", what, dims, err))
}

// =============================================================================
// From host views to ndarray
// =============================================================================

impl<'h, T: TensorElement> TensorView<'h, T> {
    /// Zero-copy ndarray view of the tensor, row-major.
    ///
    /// # Safety
    /// Same contract as [`as_slice`](Self::as_slice).
    pub unsafe fn as_ndarray(&self) -> Result<ArrayViewD<'_, T>> {
        let dims = self.dimensions();
        // SAFETY: forwarded to the caller
        let data = unsafe { self.as_slice() };
        ArrayViewD::from_shape(IxDyn(&dims), data).map_err(|e| shape_error("TensorView", &dims, e))
    }

    /// Zero-copy mutable ndarray view of the tensor, row-major.
    ///
    /// # Safety
    /// Same contract as [`as_mut_slice`](Self::as_mut_slice).
    pub unsafe fn as_ndarray_mut(&self) -> Result<ArrayViewMutD<'_, T>> {
        let dims = self.dimensions();
        // SAFETY: forwarded to the caller
        let data = unsafe { self.as_mut_slice() };
        ArrayViewMutD::from_shape(IxDyn(&dims), data)
            .map_err(|e| shape_error("TensorView", &dims, e))
    }

    /// Owned copy of the tensor
    pub fn to_ndarray(&self) -> Result<ArrayD<T>> {
        let dims = self.dimensions();
        ArrayD::from_shape_vec(IxDyn(&dims), self.iter().collect())
            .map_err(|e| shape_error("TensorView", &dims, e))
    }
}

impl<'h, T: RawElement> RawArrayView<'h, T> {
    /// Zero-copy ndarray view of the raw array, row-major.
    ///
    /// # Safety
    /// Same contract as [`as_slice`](Self::as_slice).
    pub unsafe fn as_ndarray(&self) -> Result<ArrayViewD<'_, T>> {
        let dims = self.dimensions();
        // SAFETY: forwarded to the caller
        let data = unsafe { self.as_slice() };
        ArrayViewD::from_shape(IxDyn(&dims), data)
            .map_err(|e| shape_error("RawArrayView", &dims, e))
    }

    /// Zero-copy mutable ndarray view of the raw array, row-major.
    ///
    /// # Safety
    /// Same contract as [`as_mut_slice`](Self::as_mut_slice).
    pub unsafe fn as_ndarray_mut(&self) -> Result<ArrayViewMutD<'_, T>> {
        let dims = self.dimensions();
        // SAFETY: forwarded to the caller
        let data = unsafe { self.as_mut_slice() };
        ArrayViewMutD::from_shape(IxDyn(&dims), data)
            .map_err(|e| shape_error("RawArrayView", &dims, e))
    }

    pub fn to_ndarray(&self) -> Result<ArrayD<T>> {
        let dims = self.dimensions();
        ArrayD::from_shape_vec(IxDyn(&dims), self.iter().collect())
            .map_err(|e| shape_error("RawArrayView", &dims, e))
    }
}

// =============================================================================
// From ndarray to new host arrays
// =============================================================================

/// New tensor with the shape and contents of `arr`.
///
/// Elements are copied in logical row-major order, whatever the memory layout of `arr`.
pub fn tensor_from_ndarray<'h, T: TensorElement>(
    host: &'h dyn Runtime,
    arr: &ArrayD<T>,
) -> Result<TensorView<'h, T>> {
    let data: Vec<T> = arr.iter().copied().collect();
    make::tensor_from(host, arr.shape(), &data)
}

/// New raw array with the shape and contents of `arr`, in logical row-major order
pub fn raw_array_from_ndarray<'h, T: RawElement>(
    host: &'h dyn Runtime,
    arr: &ArrayD<T>,
) -> Result<RawArrayView<'h, T>> {
    let data: Vec<T> = arr.iter().copied().collect();
    make::raw_array_from(host, arr.shape(), &data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryRuntime;
    use ndarray::array;

    #[test]
    fn roundtrip_2d_f64() {
        let host = MemoryRuntime::new();
        let arr = array![[1.0f64, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn();
        let t = tensor_from_ndarray(&host, &arr).unwrap();
        assert_eq!(t.dimensions(), vec![2, 3]);
        assert_eq!(t.to_ndarray().unwrap(), arr);
    }

    #[test]
    fn transposed_source_copies_logical_order() {
        let host = MemoryRuntime::new();
        let arr = array![[1i64, 2], [3, 4]].reversed_axes().into_dyn();
        let t = tensor_from_ndarray(&host, &arr).unwrap();
        assert_eq!(t.iter().collect::<Vec<_>>(), vec![1, 3, 2, 4]);
    }

    #[test]
    fn zero_copy_view_sees_writes() {
        let host = MemoryRuntime::new();
        let t = make::matrix::<f64>(&host, 2, 2).unwrap();
        t.set_at(1, 0, 7.5);
        // SAFETY: no other access while the view lives
        let view = unsafe { t.as_ndarray().unwrap() };
        assert_eq!(view[[1, 0]], 7.5);
        assert_eq!(view.shape(), &[2, 2]);
    }

    #[test]
    fn mutable_view_writes_through() {
        let host = MemoryRuntime::new();
        let r = make::raw_vector::<u16>(&host, 3).unwrap();
        {
            // SAFETY: the only access while it lives
            let mut view = unsafe { r.as_ndarray_mut().unwrap() };
            view.fill(9);
        }
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![9, 9, 9]);
    }

    #[test]
    fn raw_roundtrip_3d() {
        let host = MemoryRuntime::new();
        let arr = ArrayD::<u8>::from_shape_fn(IxDyn(&[2, 3, 4]), |idx| {
            (idx[0] * 12 + idx[1] * 4 + idx[2]) as u8
        });
        let r = raw_array_from_ndarray(&host, &arr).unwrap();
        assert_eq!(r.dimensions(), vec![2, 3, 4]);
        assert_eq!(r.get(23), 23);
        assert_eq!(r.to_ndarray().unwrap(), arr);
    }
}
