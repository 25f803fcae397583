//! Dense tensor views

use super::Elements;
use super::sparse::SparseArrayView;
use crate::error::{LibraryError, Result, host_call};
use crate::guard::Release;
use crate::host::{Runtime, TensorHandle};
use crate::types::{TensorElement, TensorKind};
use std::fmt;

/// Non-owning view of a host tensor holding `T` elements.
///
/// Copying the view copies the reference, not the data. Storage is
/// row-major. The view stays valid until any alias frees the handle.
pub struct TensorView<'h, T: TensorElement> {
    host: &'h dyn Runtime,
    handle: TensorHandle,
    elems: Elements<T>,
}

impl<T: TensorElement> Clone for TensorView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: TensorElement> Copy for TensorView<'_, T> {}

impl<T: TensorElement> fmt::Debug for TensorView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorView")
            .field("handle", &self.handle)
            .field("kind", &T::KIND)
            .field("len", &self.len())
            .finish()
    }
}

impl<'h, T: TensorElement> TensorView<'h, T> {
    /// Wrap an existing tensor. Fails with `TypeMismatch` if it does not hold `T`.
    pub fn from_handle(host: &'h dyn Runtime, handle: TensorHandle) -> Result<Self> {
        let received = host.tensor_type(handle);
        if received != T::KIND.tag() {
            return Err(LibraryError::type_mismatch(format!(
                "Tensor of type {} received, {} expected.",
                TensorKind::tag_name(received),
                T::KIND.name()
            )));
        }
        let len = host.tensor_flattened_length(handle);
        let elems = Elements::new(host.tensor_data(handle), len, "TensorView")?;
        Ok(TensorView {
            host,
            handle,
            elems,
        })
    }

    pub fn handle(&self) -> TensorHandle {
        self.handle
    }

    pub fn host(&self) -> &'h dyn Runtime {
        self.host
    }

    pub fn rank(&self) -> usize {
        self.host.tensor_rank(self.handle)
    }

    pub fn dimensions(&self) -> Vec<usize> {
        self.host.tensor_dimensions(self.handle)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    /// Synonym of [`len`](Self::len)
    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> TensorKind {
        T::KIND
    }

    /// Pointer to the host storage
    pub fn data(&self) -> *mut T {
        self.elems.as_ptr()
    }

    /// Element `i` of the flattened tensor. Panics if out of bounds.
    #[track_caller]
    pub fn get(&self, i: usize) -> T {
        self.elems.get(i)
    }

    #[track_caller]
    pub fn set(&self, i: usize, value: T) {
        self.elems.set(i, value)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = T> + ExactSizeIterator + 'h {
        self.elems.iter()
    }

    /// Copy `src` into the tensor; its length must equal [`len`](Self::len)
    pub fn fill_from(&self, src: &[T]) -> Result<()> {
        self.elems.copy_from(src)
    }

    /// Borrow the storage as a slice.
    ///
    /// # Safety
    /// The handle must stay live, and no alias may write the tensor while the slice exists.
    pub unsafe fn as_slice(&self) -> &[T] {
        // SAFETY: forwarded to the caller
        unsafe { self.elems.as_slice() }
    }

    /// Borrow the storage as a mutable slice.
    ///
    /// # Safety
    /// The handle must stay live, and the slice must be the only access to the
    /// tensor while it exists, through this view or any alias.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn as_mut_slice(&self) -> &mut [T] {
        // SAFETY: forwarded to the caller
        unsafe { self.elems.as_mut_slice() }
    }

    /// Free the tensor.
    ///
    /// Tensors made by the library must be freed after use unless they are
    /// returned to the host.
    ///
    /// # Safety
    /// Every view of the handle, this one included, is dangling afterwards
    /// and must not be used again.
    pub unsafe fn free(self) {
        self.host.tensor_free(self.handle);
    }

    pub fn disown(&self) {
        self.host.tensor_disown(self.handle);
    }

    pub fn disown_all(&self) {
        self.host.tensor_disown_all(self.handle);
    }

    pub fn share_count(&self) -> usize {
        self.host.tensor_share_count(self.handle)
    }

    /// Independent copy of the tensor in a new handle
    pub fn duplicate(&self) -> Result<TensorView<'h, T>> {
        let handle = host_call(self.host.tensor_clone(self.handle), "tensor_clone")?;
        adopt(self.host, handle)
    }

    /// New tensor of element type `U` with converted contents
    pub fn convert_to<U: TensorElement>(&self) -> Result<TensorView<'h, U>> {
        let handle = host_call(
            self.host.tensor_convert(self.handle, U::KIND),
            "tensor_convert",
        )?;
        adopt(self.host, handle)
    }

    /// New sparse array holding the same elements, with the host's default implicit value
    pub fn to_sparse(&self) -> Result<SparseArrayView<'h, T>> {
        let handle = host_call(
            self.host.sparse_from_tensor(self.handle, None),
            "sparse_from_tensor",
        )?;
        super::sparse::adopt(self.host, handle)
    }
}

/// View a handle the library just allocated, freeing it if the view cannot be built
pub(crate) fn adopt<'h, T: TensorElement>(
    host: &'h dyn Runtime,
    handle: TensorHandle,
) -> Result<TensorView<'h, T>> {
    let guard = Release::new(host, handle);
    let view = TensorView::from_handle(host, guard.handle())?;
    guard.disarm();
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::host::TensorFunctions;
    use crate::host::memory::MemoryRuntime;
    use num_complex::Complex64;

    fn real_vector<'a>(host: &'a MemoryRuntime, values: &[f64]) -> TensorView<'a, f64> {
        let t = host.tensor_new(TensorKind::Real, &[values.len()]).unwrap();
        let view = TensorView::<f64>::from_handle(host, t).unwrap();
        view.fill_from(values).unwrap();
        view
    }

    #[test]
    fn wraps_without_copying() {
        let host = MemoryRuntime::new();
        let t = host.tensor_new(TensorKind::Integer, &[2, 3]).unwrap();
        let view = TensorView::<i64>::from_handle(&host, t).unwrap();
        assert_eq!(view.rank(), 2);
        assert_eq!(view.dimensions(), vec![2, 3]);
        assert_eq!(view.len(), 6);
        assert_eq!(view.size(), 6);
        assert_eq!(view.data() as *mut u8, host.tensor_data(t));
    }

    #[test]
    fn wrong_kind_is_type_mismatch() {
        let host = MemoryRuntime::new();
        let t = host.tensor_new(TensorKind::Integer, &[2]).unwrap();
        let err = TensorView::<f64>::from_handle(&host, t).unwrap_err();
        assert!(matches!(err, LibraryError::TypeMismatch { .. }));
        assert_eq!(err.code(), ErrorCode::TYPE);
        assert_eq!(
            err.message(),
            Some("Tensor of type Integer received, Real expected.")
        );
    }

    #[test]
    fn aliases_share_storage() {
        let host = MemoryRuntime::new();
        let a = real_vector(&host, &[1.0, 2.0, 3.0]);
        let b = a;
        b.set(1, 20.0);
        assert_eq!(a.get(1), 20.0);
        assert_eq!(a.iter().rev().collect::<Vec<_>>(), vec![3.0, 20.0, 1.0]);
    }

    #[test]
    fn duplicate_is_independent() {
        let host = MemoryRuntime::new();
        let a = real_vector(&host, &[1.0, 2.0]);
        let b = a.duplicate().unwrap();
        assert_ne!(a.handle(), b.handle());
        b.set(0, -1.0);
        assert_eq!(a.get(0), 1.0);
        assert_eq!(b.get(1), 2.0);
    }

    #[test]
    fn convert_to_complex() {
        let host = MemoryRuntime::new();
        let a = real_vector(&host, &[1.5, -2.0]);
        let c = a.convert_to::<Complex64>().unwrap();
        assert_eq!(c.kind(), TensorKind::Complex);
        assert_eq!(c.get(0), Complex64::new(1.5, 0.0));
        assert_eq!(c.get(1), Complex64::new(-2.0, 0.0));
    }

    #[test]
    fn failed_clone_is_allocation_failure() {
        let host = MemoryRuntime::new();
        let a = real_vector(&host, &[1.0]);
        host.set_allocation_budget(Some(0));
        let err = a.duplicate().unwrap_err();
        assert!(matches!(err, LibraryError::AllocationFailure { .. }));
        assert_eq!(err.code(), ErrorCode::MEMORY);
        assert_eq!(err.message(), Some("tensor_clone() failed."));
    }

    #[test]
    fn free_and_share_count() {
        let host = MemoryRuntime::new();
        let a = real_vector(&host, &[0.0; 4]);
        host.share_tensor(a.handle());
        assert_eq!(a.share_count(), 1);
        a.disown();
        assert_eq!(a.share_count(), 0);
        // SAFETY: no view of the handle is used afterwards
        unsafe { a.free() };
        assert_eq!(host.live_handles(), 0);
    }

    #[test]
    fn slices_cover_storage() {
        let host = MemoryRuntime::new();
        let a = real_vector(&host, &[1.0, 2.0, 3.0]);
        // SAFETY: the only access while the slice is alive
        unsafe {
            a.as_mut_slice().reverse();
            assert_eq!(a.as_slice(), &[3.0, 2.0, 1.0]);
        }
    }

    #[test]
    fn to_sparse_keeps_values() {
        let host = MemoryRuntime::new();
        let a = real_vector(&host, &[0.0, 4.0, 0.0, 5.0]);
        let s = a.to_sparse().unwrap();
        assert!(s.has_explicit_values());
        assert_eq!(s.len(), 2);
        assert_eq!(s.implicit_value(), 0.0);
        let dense = s.to_dense().unwrap();
        assert_eq!(dense.iter().collect::<Vec<_>>(), vec![0.0, 4.0, 0.0, 5.0]);
    }

    #[test]
    fn to_sparse_of_scalar_fails_without_leaking() {
        let host = MemoryRuntime::new();
        let t = host.tensor_new(TensorKind::Real, &[]).unwrap();
        let scalar = TensorView::<f64>::from_handle(&host, t).unwrap();
        let before = host.live_handles();
        let err = scalar.to_sparse().unwrap_err();
        assert_eq!(err.code(), ErrorCode::RANK);
        assert_eq!(err.message(), Some("sparse_from_tensor() failed."));
        assert_eq!(host.live_handles(), before);
    }
}
