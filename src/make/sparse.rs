//! Sparse array factories

use super::tensor::vector_from;
use crate::error::{LibraryError, Result, host_call};
use crate::guard::Release;
use crate::host::Runtime;
use crate::types::TensorElement;
use crate::views::{MatrixView, SparseArrayView, SparseMatrixView, TensorView};
use num_traits::Zero;

/// Sparse array of dimensions `dims` with `values[k]` at the 1-based position
/// in row `k` of `positions`. Every other element reads as `implicit`.
///
/// When a position repeats, the first occurrence wins. The result always
/// carries an explicit-values tensor, even when no positions are given.
pub fn sparse_array<'h, T: TensorElement>(
    host: &'h dyn Runtime,
    positions: MatrixView<'h, i64>,
    values: TensorView<'h, T>,
    dims: TensorView<'h, i64>,
    implicit: T,
) -> Result<SparseArrayView<'h, T>> {
    if values.rank() != 1 || dims.rank() != 1 {
        return Err(LibraryError::rank(
            "sparse_array: values and dimensions must be vectors.",
        ));
    }
    if positions.rows() != values.len() {
        return Err(LibraryError::dimension(format!(
            "sparse_array: {} positions given for {} values.",
            positions.rows(),
            values.len()
        )));
    }
    if positions.cols() != dims.len() {
        return Err(LibraryError::dimension(format!(
            "sparse_array: positions have {} columns, rank {} expected.",
            positions.cols(),
            dims.len()
        )));
    }

    let scalar = host_call(host.tensor_new(T::KIND, &[]), "tensor_new")?;
    let scalar = Release::new(host, scalar);
    TensorView::<T>::from_handle(host, scalar.handle())?.set(0, implicit);

    let handle = host_call(
        host.sparse_from_explicit_positions(
            positions.handle(),
            values.handle(),
            dims.handle(),
            Some(scalar.handle()),
        ),
        "sparse_from_explicit_positions",
    )?;
    let array = Release::new(host, handle);
    if host.sparse_explicit_values(handle).is_none() {
        let ev = host_call(host.tensor_new(T::KIND, &[0]), "tensor_new")?;
        host.sparse_set_explicit_values(handle, ev);
    }
    let view = SparseArrayView::from_handle(host, array.handle())?;
    array.disarm();
    Ok(view)
}

/// `rows x cols` sparse matrix. `positions` is an `n x 2` matrix of 1-based
/// `(row, column)` pairs.
pub fn sparse_matrix<'h, T: TensorElement>(
    host: &'h dyn Runtime,
    positions: MatrixView<'h, i64>,
    values: TensorView<'h, T>,
    rows: usize,
    cols: usize,
    implicit: T,
) -> Result<SparseMatrixView<'h, T>> {
    if positions.cols() != 2 {
        return Err(LibraryError::dimension(format!(
            "sparse_matrix: positions have {} columns, 2 expected.",
            positions.cols()
        )));
    }
    let dims = vector_from(host, &[rows as i64, cols as i64])?;
    let dims = Release::new(host, dims.handle());
    let array = sparse_array(
        host,
        positions,
        values,
        TensorView::from_handle(host, dims.handle())?,
        implicit,
    )?;
    SparseMatrixView::from_array(array)
}

/// [`sparse_array`] with zero as the implicit value
pub fn sparse_array_zero<'h, T: TensorElement>(
    host: &'h dyn Runtime,
    positions: MatrixView<'h, i64>,
    values: TensorView<'h, T>,
    dims: TensorView<'h, i64>,
) -> Result<SparseArrayView<'h, T>> {
    sparse_array(host, positions, values, dims, <T as Zero>::zero())
}

/// [`sparse_matrix`] with zero as the implicit value
pub fn sparse_matrix_zero<'h, T: TensorElement>(
    host: &'h dyn Runtime,
    positions: MatrixView<'h, i64>,
    values: TensorView<'h, T>,
    rows: usize,
    cols: usize,
) -> Result<SparseMatrixView<'h, T>> {
    sparse_matrix(host, positions, values, rows, cols, <T as Zero>::zero())
}
