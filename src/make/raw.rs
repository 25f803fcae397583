//! Raw array factories

use crate::error::{LibraryError, Result, host_call};
use crate::guard::Release;
use crate::host::Runtime;
use crate::session::check_abort;
use crate::types::RawElement;
use crate::views::RawArrayView;

/// Zero-initialised raw array of `T` with the given dimensions
pub fn raw_array<'h, T: RawElement>(
    host: &'h dyn Runtime,
    dims: &[usize],
) -> Result<RawArrayView<'h, T>> {
    let handle = host_call(host.raw_new(T::DTYPE, dims), "raw_new")?;
    crate::views::raw::adopt(host, handle)
}

/// Raw array of the given dimensions filled from row-major `data`
pub fn raw_array_from<'h, T: RawElement>(
    host: &'h dyn Runtime,
    dims: &[usize],
    data: &[T],
) -> Result<RawArrayView<'h, T>> {
    let expected: usize = dims.iter().product();
    if data.len() != expected {
        return Err(LibraryError::dimension(format!(
            "raw_array_from: {} elements given, {} expected.",
            data.len(),
            expected
        )));
    }
    let handle = host_call(host.raw_new(T::DTYPE, dims), "raw_new")?;
    let guard = Release::new(host, handle);
    let view = RawArrayView::<T>::from_handle(host, guard.handle())?;
    check_abort(host)?;
    view.fill_from(data)?;
    guard.disarm();
    Ok(view)
}

pub fn raw_vector<'h, T: RawElement>(host: &'h dyn Runtime, len: usize) -> Result<RawArrayView<'h, T>> {
    raw_array(host, &[len])
}

pub fn raw_vector_from<'h, T: RawElement>(
    host: &'h dyn Runtime,
    data: &[T],
) -> Result<RawArrayView<'h, T>> {
    raw_array_from(host, &[data.len()], data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::host::memory::MemoryRuntime;
    use crate::types::DType;

    #[test]
    fn typed_by_element() {
        let host = MemoryRuntime::new();
        let r = raw_array::<u16>(&host, &[3, 2]).unwrap();
        assert_eq!(r.dtype(), Some(DType::U16));
        assert_eq!(r.dimensions(), vec![3, 2]);
        assert!(r.iter().all(|v| v == 0));
    }

    #[test]
    fn filled_vector() {
        let host = MemoryRuntime::new();
        let r = raw_vector_from(&host, &[1.5f32, -2.0]).unwrap();
        assert_eq!(r.kind(), DType::F32);
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![1.5, -2.0]);
    }

    #[test]
    fn length_checked() {
        let host = MemoryRuntime::new();
        let err = raw_array_from(&host, &[2, 2], &[1u8, 2, 3]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DIMENSION);
        assert_eq!(host.live_handles(), 0);
    }

    #[test]
    fn abort_frees() {
        let host = MemoryRuntime::new();
        host.set_abort(true);
        assert!(raw_vector_from(&host, &[1i8]).unwrap_err().is_abort());
        assert_eq!(host.live_handles(), 0);
        assert_eq!(raw_vector::<i8>(&host, 2).unwrap().len(), 2);
    }
}
