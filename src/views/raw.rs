//! Flat typed-buffer (raw array) views

use super::Elements;
use crate::error::{LibraryError, Result, host_call};
use crate::guard::Release;
use crate::host::{RawArrayHandle, Runtime};
use crate::types::{DType, RawElement};
use std::fmt;
use std::ops::Deref;

/// Raw array view that does not fix the element type
#[derive(Clone, Copy)]
pub struct GenericRawArrayView<'h> {
    host: &'h dyn Runtime,
    handle: RawArrayHandle,
    len: usize,
}

impl fmt::Debug for GenericRawArrayView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericRawArrayView")
            .field("handle", &self.handle)
            .field("type", &DType::tag_name(self.type_tag()))
            .field("len", &self.len)
            .finish()
    }
}

impl<'h> GenericRawArrayView<'h> {
    pub fn from_handle(host: &'h dyn Runtime, handle: RawArrayHandle) -> Self {
        GenericRawArrayView {
            host,
            handle,
            len: host.raw_flattened_length(handle),
        }
    }

    pub fn handle(&self) -> RawArrayHandle {
        self.handle
    }

    pub fn host(&self) -> &'h dyn Runtime {
        self.host
    }

    /// Host tag of the element type
    pub fn type_tag(&self) -> i32 {
        self.host.raw_type(self.handle)
    }

    /// Element type, `None` if the host reports a type outside [`DType`]
    pub fn dtype(&self) -> Option<DType> {
        DType::from_tag(self.type_tag())
    }

    pub fn rank(&self) -> usize {
        self.host.raw_rank(self.handle)
    }

    pub fn dimensions(&self) -> Vec<usize> {
        self.host.raw_dimensions(self.handle)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn size(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Free the raw array.
    ///
    /// # Safety
    /// Every view of the handle is dangling afterwards.
    pub unsafe fn free(self) {
        self.host.raw_free(self.handle);
    }

    pub fn disown(&self) {
        self.host.raw_disown(self.handle);
    }

    pub fn disown_all(&self) {
        self.host.raw_disown_all(self.handle);
    }

    pub fn share_count(&self) -> usize {
        self.host.raw_share_count(self.handle)
    }

    pub fn duplicate(&self) -> Result<GenericRawArrayView<'h>> {
        let handle = host_call(self.host.raw_clone(self.handle), "raw_clone")?;
        Ok(GenericRawArrayView::from_handle(self.host, handle))
    }

    /// New raw array of element type `U` with converted contents
    pub fn convert_to<U: RawElement>(&self) -> Result<RawArrayView<'h, U>> {
        let handle = host_call(self.host.raw_convert(self.handle, U::DTYPE), "raw_convert")?;
        adopt(self.host, handle)
    }
}

/// Raw array view of `T` elements
pub struct RawArrayView<'h, T: RawElement> {
    generic: GenericRawArrayView<'h>,
    elems: Elements<T>,
}

impl<T: RawElement> Clone for RawArrayView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: RawElement> Copy for RawArrayView<'_, T> {}

impl<T: RawElement> fmt::Debug for RawArrayView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawArrayView")
            .field("handle", &self.generic.handle)
            .field("type", &T::DTYPE)
            .field("len", &self.generic.len)
            .finish()
    }
}

impl<'h, T: RawElement> Deref for RawArrayView<'h, T> {
    type Target = GenericRawArrayView<'h>;

    fn deref(&self) -> &Self::Target {
        &self.generic
    }
}

impl<'h, T: RawElement> RawArrayView<'h, T> {
    /// Fails with `TypeMismatch` unless the raw array holds `T`
    pub fn from_generic(generic: GenericRawArrayView<'h>) -> Result<Self> {
        let received = generic.type_tag();
        if received != T::DTYPE.tag() {
            return Err(LibraryError::type_mismatch(format!(
                "RawArray of type {} received, {} expected.",
                DType::tag_name(received),
                T::DTYPE.name()
            )));
        }
        let elems = Elements::new(
            generic.host.raw_data(generic.handle),
            generic.len,
            "RawArrayView",
        )?;
        Ok(RawArrayView { generic, elems })
    }

    pub fn from_handle(host: &'h dyn Runtime, handle: RawArrayHandle) -> Result<Self> {
        Self::from_generic(GenericRawArrayView::from_handle(host, handle))
    }

    pub fn as_generic(&self) -> GenericRawArrayView<'h> {
        self.generic
    }

    pub fn kind(&self) -> DType {
        T::DTYPE
    }

    pub fn data(&self) -> *mut T {
        self.elems.as_ptr()
    }

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

    pub fn fill_from(&self, src: &[T]) -> Result<()> {
        self.elems.copy_from(src)
    }

    /// # Safety
    /// The handle must stay live, and no alias may write the buffer while the slice exists.
    pub unsafe fn as_slice(&self) -> &[T] {
        // SAFETY: forwarded to the caller
        unsafe { self.elems.as_slice() }
    }

    /// # Safety
    /// The handle must stay live, and the slice must be the only access to the buffer.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn as_mut_slice(&self) -> &mut [T] {
        // SAFETY: forwarded to the caller
        unsafe { self.elems.as_mut_slice() }
    }

    pub fn duplicate(&self) -> Result<RawArrayView<'h, T>> {
        let handle = host_call(self.host.raw_clone(self.handle), "raw_clone")?;
        adopt(self.host, handle)
    }
}

pub(crate) fn adopt<'h, T: RawElement>(
    host: &'h dyn Runtime,
    handle: RawArrayHandle,
) -> Result<RawArrayView<'h, T>> {
    let guard = Release::new(host, handle);
    let view = RawArrayView::from_handle(host, guard.handle())?;
    guard.disarm();
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::host::RawArrayFunctions;
    use crate::host::memory::MemoryRuntime;
    use num_complex::Complex32;

    #[test]
    fn generic_view_reports_type() {
        let host = MemoryRuntime::new();
        let r = host.raw_new(DType::U16, &[4, 5]).unwrap();
        let g = GenericRawArrayView::from_handle(&host, r);
        assert_eq!(g.dtype(), Some(DType::U16));
        assert_eq!(g.rank(), 2);
        assert_eq!(g.dimensions(), vec![4, 5]);
        assert_eq!(g.len(), 20);
    }

    #[test]
    fn typed_view_checks_type() {
        let host = MemoryRuntime::new();
        let r = host.raw_new(DType::I8, &[3]).unwrap();
        let err = RawArrayView::<u8>::from_handle(&host, r).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TYPE);
        assert_eq!(
            err.message(),
            Some("RawArray of type Integer8 received, UnsignedInteger8 expected.")
        );
        assert!(RawArrayView::<i8>::from_handle(&host, r).is_ok());
    }

    #[test]
    fn element_access() {
        let host = MemoryRuntime::new();
        let r = host.raw_new(DType::C32, &[2]).unwrap();
        let v = RawArrayView::<Complex32>::from_handle(&host, r).unwrap();
        v.set(1, Complex32::new(1.0, -1.0));
        assert_eq!(v.iter().collect::<Vec<_>>(), vec![
            Complex32::new(0.0, 0.0),
            Complex32::new(1.0, -1.0)
        ]);
    }

    #[test]
    fn convert_through_generic() {
        let host = MemoryRuntime::new();
        let r = host.raw_new(DType::F64, &[3]).unwrap();
        let v = RawArrayView::<f64>::from_handle(&host, r).unwrap();
        v.fill_from(&[1.4, 300.0, -2.0]).unwrap();
        let bytes = v.as_generic().convert_to::<u8>().unwrap();
        assert_eq!(bytes.kind(), DType::U8);
        assert_eq!(bytes.iter().collect::<Vec<_>>(), vec![1, 255, 0]);
    }

    #[test]
    fn duplicate_is_independent() {
        let host = MemoryRuntime::new();
        let r = host.raw_new(DType::I32, &[2]).unwrap();
        let v = RawArrayView::<i32>::from_handle(&host, r).unwrap();
        v.set(0, 5);
        let d = v.duplicate().unwrap();
        d.set(0, 6);
        assert_eq!(v.get(0), 5);
        assert_eq!(d.get(0), 6);
        // SAFETY: neither view is used afterwards
        unsafe {
            d.as_generic().free();
            v.as_generic().free();
        }
        assert_eq!(host.live_handles(), 0);
    }
}
