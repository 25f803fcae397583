//! Dense tensor factories

use crate::error::{LibraryError, Result, host_call};
use crate::guard::Release;
use crate::host::Runtime;
use crate::session::check_abort;
use crate::types::TensorElement;
use crate::views::{CubeView, MatrixView, TensorView};

/// Allocate a tensor, run `fill` on it, and free it again if `fill` fails
fn filled<'h, T: TensorElement>(
    host: &'h dyn Runtime,
    dims: &[usize],
    fill: impl FnOnce(TensorView<'h, T>) -> Result<()>,
) -> Result<TensorView<'h, T>> {
    let handle = host_call(host.tensor_new(T::KIND, dims), "tensor_new")?;
    let guard = Release::new(host, handle);
    let view = TensorView::from_handle(host, guard.handle())?;
    fill(view)?;
    guard.disarm();
    Ok(view)
}

fn expect_len(what: &str, len: usize, expected: usize) -> Result<()> {
    if len != expected {
        return Err(LibraryError::dimension(format!(
            "{}: {} elements given, {} expected.",
            what, len, expected
        )));
    }
    Ok(())
}

/// Zero-initialised tensor of the given dimensions
pub fn tensor<'h, T: TensorElement>(
    host: &'h dyn Runtime,
    dims: &[usize],
) -> Result<TensorView<'h, T>> {
    filled(host, dims, |_| Ok(()))
}

/// Tensor of the given dimensions filled from row-major `data`
pub fn tensor_from<'h, T: TensorElement>(
    host: &'h dyn Runtime,
    dims: &[usize],
    data: &[T],
) -> Result<TensorView<'h, T>> {
    expect_len("tensor_from", data.len(), dims.iter().product())?;
    filled(host, dims, |t| {
        check_abort(host)?;
        t.fill_from(data)
    })
}

pub fn vector<'h, T: TensorElement>(host: &'h dyn Runtime, len: usize) -> Result<TensorView<'h, T>> {
    tensor(host, &[len])
}

pub fn vector_from<'h, T: TensorElement>(
    host: &'h dyn Runtime,
    data: &[T],
) -> Result<TensorView<'h, T>> {
    tensor_from(host, &[data.len()], data)
}

pub fn matrix<'h, T: TensorElement>(
    host: &'h dyn Runtime,
    rows: usize,
    cols: usize,
) -> Result<MatrixView<'h, T>> {
    MatrixView::from_tensor(tensor(host, &[rows, cols])?)
}

/// Matrix filled from row-major `data`
pub fn matrix_from<'h, T: TensorElement>(
    host: &'h dyn Runtime,
    rows: usize,
    cols: usize,
    data: &[T],
) -> Result<MatrixView<'h, T>> {
    MatrixView::from_tensor(tensor_from(host, &[rows, cols], data)?)
}

/// Matrix filled from column-major `data`
pub fn matrix_from_column_major<'h, T: TensorElement>(
    host: &'h dyn Runtime,
    rows: usize,
    cols: usize,
    data: &[T],
) -> Result<MatrixView<'h, T>> {
    expect_len("matrix_from_column_major", data.len(), rows * cols)?;
    let t = filled(host, &[rows, cols], |t| {
        check_abort(host)?;
        // SAFETY: the tensor was just allocated; no other view of it exists
        let to = unsafe { t.as_mut_slice() };
        transposed_copy(data, to, rows, cols);
        Ok(())
    })?;
    MatrixView::from_tensor(t)
}

/// Matrix from nested rows. Fails on ragged input before allocating.
pub fn matrix_from_rows<'h, T, R>(host: &'h dyn Runtime, rows: &[R]) -> Result<MatrixView<'h, T>>
where
    T: TensorElement,
    R: AsRef<[T]>,
{
    let cols = rows.first().map_or(0, |r| r.as_ref().len());
    for (i, row) in rows.iter().enumerate() {
        let len = row.as_ref().len();
        if len != cols {
            return Err(LibraryError::dimension(format!(
                "matrix_from_rows: row {} has length {}, {} expected.",
                i, len, cols
            )));
        }
    }
    let t = filled(host, &[rows.len(), cols], |t| {
        check_abort(host)?;
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.as_ref().iter().enumerate() {
                t.set(i * cols + j, v);
            }
        }
        Ok(())
    })?;
    MatrixView::from_tensor(t)
}

pub fn cube<'h, T: TensorElement>(
    host: &'h dyn Runtime,
    slices: usize,
    rows: usize,
    cols: usize,
) -> Result<CubeView<'h, T>> {
    CubeView::from_tensor(tensor(host, &[slices, rows, cols])?)
}

/// Rank-3 tensor filled from row-major `data`
pub fn cube_from<'h, T: TensorElement>(
    host: &'h dyn Runtime,
    slices: usize,
    rows: usize,
    cols: usize,
    data: &[T],
) -> Result<CubeView<'h, T>> {
    CubeView::from_tensor(tensor_from(host, &[slices, rows, cols], data)?)
}

/// Rank-3 tensor from nested slices of rows. Fails on ragged input before allocating.
pub fn cube_from_slices<'h, T, S, R>(host: &'h dyn Runtime, slices: &[S]) -> Result<CubeView<'h, T>>
where
    T: TensorElement,
    S: AsRef<[R]>,
    R: AsRef<[T]>,
{
    let rows = slices.first().map_or(0, |s| s.as_ref().len());
    let cols = slices
        .first()
        .and_then(|s| s.as_ref().first())
        .map_or(0, |r| r.as_ref().len());
    for (k, slice) in slices.iter().enumerate() {
        let slice = slice.as_ref();
        if slice.len() != rows {
            return Err(LibraryError::dimension(format!(
                "cube_from_slices: slice {} has {} rows, {} expected.",
                k,
                slice.len(),
                rows
            )));
        }
        for (i, row) in slice.iter().enumerate() {
            let len = row.as_ref().len();
            if len != cols {
                return Err(LibraryError::dimension(format!(
                    "cube_from_slices: row {} of slice {} has length {}, {} expected.",
                    i, k, len, cols
                )));
            }
        }
    }
    let t = filled(host, &[slices.len(), rows, cols], |t| {
        check_abort(host)?;
        let values = slices
            .iter()
            .flat_map(|s| s.as_ref().iter())
            .flat_map(|r| r.as_ref().iter());
        for (i, &v) in values.enumerate() {
            t.set(i, v);
        }
        Ok(())
    })?;
    CubeView::from_tensor(t)
}

/// Copy an `nrow x ncol` column-major matrix into row-major storage
pub fn transposed_copy<T, U>(from: &[T], to: &mut [U], nrow: usize, ncol: usize)
where
    T: Copy + Into<U>,
{
    let n = nrow * ncol;
    assert!(
        from.len() >= n && to.len() >= n,
        "transposed_copy: {}x{} matrix needs {} elements, got source {} and destination {}",
        nrow,
        ncol,
        n,
        from.len(),
        to.len()
    );
    for i in 0..ncol {
        for j in 0..nrow {
            to[i + j * ncol] = from[j + i * nrow].into();
        }
    }
}
