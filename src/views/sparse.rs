//! Sparse array views over compressed-row storage
//!
//! A host sparse array is four tensors: row pointers (`rows + 1` offsets),
//! 1-based column indices, explicit values, and a rank-0 implicit value.
//! Arrays without explicit values are pattern arrays: every position they
//! store reads as the implicit value.

use super::shaped::MatrixView;
use super::tensor::{self, TensorView};
use crate::error::{LibraryError, Result, host_call};
use crate::guard::Release;
use crate::host::{Runtime, SparseHandle};
use crate::session::host_assert;
use crate::types::{TensorElement, TensorKind};
use std::fmt;
use std::iter::FusedIterator;
use std::ops::Deref;

/// Non-owning view of a host sparse array of `T`
pub struct SparseArrayView<'h, T: TensorElement> {
    host: &'h dyn Runtime,
    handle: SparseHandle,
    row_pointers: TensorView<'h, i64>,
    column_indices: TensorView<'h, i64>,
    explicit_values: Option<TensorView<'h, T>>,
    implicit: TensorView<'h, T>,
}

impl<T: TensorElement> Clone for SparseArrayView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: TensorElement> Copy for SparseArrayView<'_, T> {}

impl<T: TensorElement> fmt::Debug for SparseArrayView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseArrayView")
            .field("handle", &self.handle)
            .field("kind", &T::KIND)
            .field("explicit", &self.len())
            .field("pattern", &self.explicit_values.is_none())
            .finish()
    }
}

impl<'h, T: TensorElement> SparseArrayView<'h, T> {
    /// Wrap an existing sparse array.
    ///
    /// When the host keeps no column-index tensor (an array with no stored
    /// positions), an empty one is created and handed to the sparse array.
    pub fn from_handle(host: &'h dyn Runtime, handle: SparseHandle) -> Result<Self> {
        let iv = host.sparse_implicit_value(handle);
        let received = host.tensor_type(iv);
        if received != T::KIND.tag() {
            return Err(LibraryError::type_mismatch(format!(
                "SparseArray of type {} received, {} expected.",
                TensorKind::tag_name(received),
                T::KIND.name()
            )));
        }
        let implicit = TensorView::from_handle(host, iv)?;
        let row_pointers = TensorView::from_handle(host, host.sparse_row_pointers(handle))?;

        let ci = match host.sparse_column_indices(handle) {
            Some(ci) => ci,
            None => {
                let width = host.sparse_rank(handle).saturating_sub(1).max(1);
                let ci = host_call(
                    host.tensor_new(TensorKind::Integer, &[0, width]),
                    "tensor_new",
                )?;
                log::trace!("synthesised empty column indices for {:?}", handle);
                host.sparse_set_column_indices(handle, ci);
                ci
            }
        };
        let column_indices = TensorView::from_handle(host, ci)?;
        let explicit_values = host
            .sparse_explicit_values(handle)
            .map(|ev| TensorView::from_handle(host, ev))
            .transpose()?;

        let view = SparseArrayView {
            host,
            handle,
            row_pointers,
            column_indices,
            explicit_values,
            implicit,
        };
        view.check_layout()?;
        Ok(view)
    }

    fn check_layout(&self) -> Result<()> {
        let rp = self.row_pointers;
        host_assert!(self.host, !rp.is_empty() && rp.get(0) == 0);
        host_assert!(self.host, rp.iter().zip(rp.iter().skip(1)).all(|(a, b)| a <= b));
        host_assert!(
            self.host,
            self.explicit_values
                .is_none_or(|ev| ev.len() as i64 == rp.get(rp.len() - 1))
        );
        Ok(())
    }

    pub fn handle(&self) -> SparseHandle {
        self.handle
    }

    pub fn host(&self) -> &'h dyn Runtime {
        self.host
    }

    pub fn rank(&self) -> usize {
        self.host.sparse_rank(self.handle)
    }

    pub fn dimensions(&self) -> Vec<usize> {
        self.host.sparse_dimensions(self.handle)
    }

    /// Number of explicitly stored positions
    pub fn len(&self) -> usize {
        self.row_pointers.get(self.row_pointers.len() - 1) as usize
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

    /// Free the sparse array together with its component tensors.
    ///
    /// # Safety
    /// Every view of the handle or of its components is dangling afterwards.
    pub unsafe fn free(self) {
        self.host.sparse_free(self.handle);
    }

    pub fn disown(&self) {
        self.host.sparse_disown(self.handle);
    }

    pub fn disown_all(&self) {
        self.host.sparse_disown_all(self.handle);
    }

    pub fn share_count(&self) -> usize {
        self.host.sparse_share_count(self.handle)
    }

    pub fn duplicate(&self) -> Result<SparseArrayView<'h, T>> {
        let handle = host_call(self.host.sparse_clone(self.handle), "sparse_clone")?;
        adopt(self.host, handle)
    }

    /// Row pointers of the compressed-row layout, 0-based offsets.
    ///
    /// The tensor belongs to the sparse array and dies with it.
    pub fn row_pointers(&self) -> TensorView<'h, i64> {
        self.row_pointers
    }

    /// Column indices of the compressed-row layout, 1-based, one row per
    /// stored position. The tensor belongs to the sparse array.
    pub fn column_indices(&self) -> TensorView<'h, i64> {
        self.column_indices
    }

    /// New `len x rank` integer matrix of the 1-based stored positions.
    ///
    /// The caller owns the result and must free it.
    pub fn explicit_positions(&self) -> Result<MatrixView<'h, i64>> {
        let handle = host_call(
            self.host.sparse_explicit_positions(self.handle),
            "sparse_explicit_positions",
        )?;
        let guard = Release::new(self.host, handle);
        if self.host.tensor_rank(handle) == 0 {
            // empty arrays come back as a rank-0 tensor
            drop(guard);
            return crate::make::matrix::<i64>(self.host, 0, self.rank());
        }
        let view = MatrixView::from_tensor(TensorView::from_handle(self.host, handle)?)?;
        guard.disarm();
        Ok(view)
    }

    /// False for pattern arrays
    pub fn has_explicit_values(&self) -> bool {
        self.explicit_values.is_some()
    }

    /// Explicit values in storage order. The tensor belongs to the sparse array.
    pub fn explicit_values(&self) -> Result<TensorView<'h, T>> {
        self.explicit_values.ok_or_else(|| {
            LibraryError::pattern("SparseArrayView::explicit_values() called on pattern array.")
        })
    }

    /// Background value of every position without an explicit entry
    pub fn implicit_value(&self) -> T {
        self.implicit.get(0)
    }

    /// New sparse array without the explicit entries equal to the implicit value
    pub fn reset_implicit_value(&self) -> Result<SparseArrayView<'h, T>> {
        let handle = host_call(
            self.host.sparse_reset_implicit_value(self.handle, None),
            "sparse_reset_implicit_value",
        )?;
        adopt(self.host, handle)
    }

    /// New sparse array with the same elements over a new implicit value
    pub fn reset_implicit_value_to(&self, implicit: T) -> Result<SparseArrayView<'h, T>> {
        let scalar = host_call(self.host.tensor_new(T::KIND, &[]), "tensor_new")?;
        let scalar = Release::new(self.host, scalar);
        TensorView::<T>::from_handle(self.host, scalar.handle())?.set(0, implicit);
        let handle = host_call(
            self.host
                .sparse_reset_implicit_value(self.handle, Some(scalar.handle())),
            "sparse_reset_implicit_value",
        )?;
        adopt(self.host, handle)
    }

    /// New dense tensor with the same elements
    pub fn to_dense(&self) -> Result<TensorView<'h, T>> {
        let handle = host_call(self.host.sparse_to_tensor(self.handle), "sparse_to_tensor")?;
        tensor::adopt(self.host, handle)
    }
}

pub(crate) fn adopt<'h, T: TensorElement>(
    host: &'h dyn Runtime,
    handle: SparseHandle,
) -> Result<SparseArrayView<'h, T>> {
    let guard = Release::new(host, handle);
    let view = SparseArrayView::from_handle(host, guard.handle())?;
    guard.disarm();
    Ok(view)
}

/// Rank-2 sparse array with random reads and ordered traversal of its entries
pub struct SparseMatrixView<'h, T: TensorElement> {
    array: SparseArrayView<'h, T>,
    rows: usize,
    cols: usize,
}

impl<T: TensorElement> Clone for SparseMatrixView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: TensorElement> Copy for SparseMatrixView<'_, T> {}

impl<T: TensorElement> fmt::Debug for SparseMatrixView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseMatrixView")
            .field("array", &self.array)
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}

impl<'h, T: TensorElement> Deref for SparseMatrixView<'h, T> {
    type Target = SparseArrayView<'h, T>;

    fn deref(&self) -> &Self::Target {
        &self.array
    }
}

impl<'h, T: TensorElement> SparseMatrixView<'h, T> {
    pub fn from_array(array: SparseArrayView<'h, T>) -> Result<Self> {
        let dims = array.dimensions();
        if dims.len() != 2 {
            return Err(LibraryError::rank("SparseMatrixView: matrix expected."));
        }
        Ok(SparseMatrixView {
            array,
            rows: dims[0],
            cols: dims[1],
        })
    }

    pub fn from_handle(host: &'h dyn Runtime, handle: SparseHandle) -> Result<Self> {
        Self::from_array(SparseArrayView::from_handle(host, handle)?)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The underlying untyped-shape view
    pub fn as_array(&self) -> SparseArrayView<'h, T> {
        self.array
    }

    /// Element `(i, j)`, 0-based.
    ///
    /// Binary search over the row's column indices; positions without an
    /// entry read as the implicit value. Fails on pattern arrays.
    pub fn at(&self, i: usize, j: usize) -> Result<T> {
        let ev = self.array.explicit_values.ok_or_else(|| {
            LibraryError::pattern("SparseMatrixView: cannot index into a pattern array.")
        })?;
        let rp = self.array.row_pointers;
        let ci = self.array.column_indices;
        let lower = rp.get(i) as usize;
        let upper = rp.get(i + 1) as usize;
        let key = j as i64 + 1;

        let (mut lo, mut hi) = (lower, upper);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if ci.get(mid) < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo < upper && ci.get(lo) == key {
            Ok(ev.get(lo))
        } else {
            Ok(self.array.implicit_value())
        }
    }

    /// Cursor at the first stored entry
    pub fn cursor_begin(&self) -> SparseCursor<'_, 'h, T> {
        let rp = self.array.row_pointers;
        let mut row = 0;
        while row < self.rows && rp.get(row + 1) == 0 {
            row += 1;
        }
        SparseCursor {
            matrix: self,
            row,
            index: 0,
        }
    }

    /// Cursor one past the last stored entry, at `(rows, len)`
    pub fn cursor_end(&self) -> SparseCursor<'_, 'h, T> {
        SparseCursor {
            matrix: self,
            row: self.rows,
            index: self.array.len(),
        }
    }

    /// Stored entries in row-major storage order
    pub fn entries(&self) -> Entries<'_, 'h, T> {
        Entries {
            front: self.cursor_begin(),
            back: self.cursor_end(),
        }
    }
}

/// Bidirectional position in the stored entries of a sparse matrix.
///
/// Cursors compare equal when they point at the same storage offset.
pub struct SparseCursor<'a, 'h, T: TensorElement> {
    matrix: &'a SparseMatrixView<'h, T>,
    row: usize,
    index: usize,
}

impl<T: TensorElement> Clone for SparseCursor<'_, '_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: TensorElement> Copy for SparseCursor<'_, '_, T> {}

impl<T: TensorElement> PartialEq for SparseCursor<'_, '_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T: TensorElement> fmt::Debug for SparseCursor<'_, '_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseCursor")
            .field("row", &self.row)
            .field("index", &self.index)
            .finish()
    }
}

impl<T: TensorElement> SparseCursor<'_, '_, T> {
    /// Row of the entry, 0-based
    pub fn row(&self) -> usize {
        self.row
    }

    /// Column of the entry, 0-based
    pub fn col(&self) -> usize {
        (self.matrix.array.column_indices.get(self.index) - 1) as usize
    }

    /// Storage offset of the entry
    pub fn index(&self) -> usize {
        self.index
    }

    /// Explicit value at the cursor. Fails on pattern arrays.
    pub fn get(&self) -> Result<T> {
        Ok(self.values()?.get(self.index))
    }

    pub fn set(&self, value: T) -> Result<()> {
        self.values()?.set(self.index, value);
        Ok(())
    }

    fn values(&self) -> Result<TensorView<'_, T>> {
        self.matrix.array.explicit_values.ok_or_else(|| {
            LibraryError::pattern("SparseCursor: pattern array has no explicit values.")
        })
    }

    pub fn advance(&mut self) {
        let rp = self.matrix.array.row_pointers;
        self.index += 1;
        while self.row < self.matrix.rows && rp.get(self.row + 1) as usize == self.index {
            self.row += 1;
        }
    }

    pub fn retreat(&mut self) {
        let rp = self.matrix.array.row_pointers;
        while self.row > 0 && rp.get(self.row) as usize == self.index {
            self.row -= 1;
        }
        self.index -= 1;
    }
}

/// Iterator over the stored entries of a [`SparseMatrixView`], yielding cursors
#[derive(Debug, Clone)]
pub struct Entries<'a, 'h, T: TensorElement> {
    front: SparseCursor<'a, 'h, T>,
    back: SparseCursor<'a, 'h, T>,
}

impl<'a, 'h, T: TensorElement> Iterator for Entries<'a, 'h, T> {
    type Item = SparseCursor<'a, 'h, T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let current = self.front;
        self.front.advance();
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back.index - self.front.index;
        (n, Some(n))
    }
}

impl<T: TensorElement> DoubleEndedIterator for Entries<'_, '_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back.retreat();
        Some(self.back)
    }
}

impl<T: TensorElement> ExactSizeIterator for Entries<'_, '_, T> {}

impl<T: TensorElement> FusedIterator for Entries<'_, '_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::host::memory::MemoryRuntime;
    use crate::host::{SparseFunctions, TensorFunctions, TensorHandle};

    fn int_tensor(host: &MemoryRuntime, dims: &[usize], values: &[i64]) -> TensorHandle {
        let t = host.tensor_new(TensorKind::Integer, dims).unwrap();
        TensorView::<i64>::from_handle(host, t)
            .unwrap()
            .fill_from(values)
            .unwrap();
        t
    }

    fn real_tensor(host: &MemoryRuntime, dims: &[usize], values: &[f64]) -> TensorHandle {
        let t = host.tensor_new(TensorKind::Real, dims).unwrap();
        TensorView::<f64>::from_handle(host, t)
            .unwrap()
            .fill_from(values)
            .unwrap();
        t
    }

    /// 3x4 matrix with entries (0,1)=1, (0,3)=2, (2,0)=3; row 1 is empty
    fn sample(host: &MemoryRuntime) -> SparseHandle {
        let pos = int_tensor(host, &[3, 2], &[1, 2, 1, 4, 3, 1]);
        let vals = real_tensor(host, &[3], &[1.0, 2.0, 3.0]);
        let dims = int_tensor(host, &[2], &[3, 4]);
        host.sparse_from_explicit_positions(pos, vals, dims, None)
            .unwrap()
    }

    #[test]
    fn reads_components() {
        let host = MemoryRuntime::new();
        let s = SparseArrayView::<f64>::from_handle(&host, sample(&host)).unwrap();
        assert_eq!(s.rank(), 2);
        assert_eq!(s.dimensions(), vec![3, 4]);
        assert_eq!(s.len(), 3);
        assert!(s.has_explicit_values());
        assert_eq!(s.row_pointers().iter().collect::<Vec<_>>(), vec![0, 2, 2, 3]);
        assert_eq!(s.column_indices().iter().collect::<Vec<_>>(), vec![2, 4, 1]);
        assert_eq!(
            s.explicit_values().unwrap().iter().collect::<Vec<_>>(),
            vec![1.0, 2.0, 3.0]
        );
        assert_eq!(s.implicit_value(), 0.0);
    }

    #[test]
    fn wrong_kind_is_type_mismatch() {
        let host = MemoryRuntime::new();
        let err = SparseArrayView::<i64>::from_handle(&host, sample(&host)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TYPE);
        assert_eq!(
            err.message(),
            Some("SparseArray of type Real received, Integer expected.")
        );
    }

    #[test]
    fn random_read() {
        let host = MemoryRuntime::new();
        let m = SparseMatrixView::<f64>::from_handle(&host, sample(&host)).unwrap();
        assert_eq!((m.rows(), m.cols()), (3, 4));
        assert_eq!(m.at(0, 1).unwrap(), 1.0);
        assert_eq!(m.at(0, 3).unwrap(), 2.0);
        assert_eq!(m.at(2, 0).unwrap(), 3.0);
        assert_eq!(m.at(0, 0).unwrap(), 0.0);
        assert_eq!(m.at(0, 2).unwrap(), 0.0);
        assert_eq!(m.at(1, 3).unwrap(), 0.0);
        assert_eq!(m.at(2, 3).unwrap(), 0.0);
    }

    #[test]
    fn iteration_skips_empty_rows() {
        let host = MemoryRuntime::new();
        let m = SparseMatrixView::<f64>::from_handle(&host, sample(&host)).unwrap();
        let forward: Vec<_> = m
            .entries()
            .map(|c| (c.row(), c.col(), c.get().unwrap()))
            .collect();
        assert_eq!(forward, vec![(0, 1, 1.0), (0, 3, 2.0), (2, 0, 3.0)]);

        let backward: Vec<_> = m.entries().rev().map(|c| (c.row(), c.col())).collect();
        assert_eq!(backward, vec![(2, 0), (0, 3), (0, 1)]);
        assert_eq!(m.entries().len(), 3);
    }

    #[test]
    fn cursor_walks_both_ways() {
        let host = MemoryRuntime::new();
        let m = SparseMatrixView::<f64>::from_handle(&host, sample(&host)).unwrap();
        let mut c = m.cursor_begin();
        c.advance();
        c.advance();
        assert_eq!((c.row(), c.index()), (2, 2));
        c.advance();
        assert_eq!(c, m.cursor_end());
        assert_eq!(c.row(), 3);
        c.retreat();
        assert_eq!((c.row(), c.col()), (2, 0));
        c.retreat();
        assert_eq!((c.row(), c.col()), (0, 3));
    }

    #[test]
    fn cursor_writes_explicit_value() {
        let host = MemoryRuntime::new();
        let m = SparseMatrixView::<f64>::from_handle(&host, sample(&host)).unwrap();
        let last = m.entries().next_back().unwrap();
        last.set(30.0).unwrap();
        assert_eq!(m.at(2, 0).unwrap(), 30.0);
    }

    #[test]
    fn mixed_ends_meet() {
        let host = MemoryRuntime::new();
        let m = SparseMatrixView::<f64>::from_handle(&host, sample(&host)).unwrap();
        let mut it = m.entries();
        assert_eq!(it.next().map(|c| c.index()), Some(0));
        assert_eq!(it.next_back().map(|c| c.index()), Some(2));
        assert_eq!(it.len(), 1);
        assert_eq!(it.next().map(|c| c.index()), Some(1));
        assert!(it.next().is_none());
        assert!(it.next_back().is_none());
    }

    #[test]
    fn pattern_array() {
        let host = MemoryRuntime::new();
        let pos = int_tensor(&host, &[0, 2], &[]);
        let vals = real_tensor(&host, &[0], &[]);
        let dims = int_tensor(&host, &[2], &[2, 2]);
        let s = host
            .sparse_from_explicit_positions(pos, vals, dims, None)
            .unwrap();
        assert!(host.sparse_column_indices(s).is_none());

        let m = SparseMatrixView::<f64>::from_handle(&host, s).unwrap();
        assert!(host.sparse_column_indices(s).is_some());
        assert_eq!(m.column_indices().len(), 0);
        assert!(!m.has_explicit_values());
        assert!(matches!(
            m.explicit_values(),
            Err(LibraryError::PatternArrayAccess { .. })
        ));
        assert!(matches!(
            m.at(0, 0),
            Err(LibraryError::PatternArrayAccess { .. })
        ));
        assert_eq!(m.entries().count(), 0);
        assert_eq!(m.cursor_begin().row(), 2);
    }

    #[test]
    fn rank_three_is_not_a_matrix() {
        let host = MemoryRuntime::new();
        let t = real_tensor(&host, &[2, 2, 2], &[0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0]);
        let s = host.sparse_from_tensor(t, None).unwrap();
        let array = SparseArrayView::<f64>::from_handle(&host, s).unwrap();
        assert_eq!(array.len(), 2);
        let err = SparseMatrixView::from_array(array).unwrap_err();
        assert_eq!(err.code(), ErrorCode::RANK);
        assert_eq!(err.message(), Some("SparseMatrixView: matrix expected."));
    }

    #[test]
    fn explicit_positions_matrix() {
        let host = MemoryRuntime::new();
        let s = SparseArrayView::<f64>::from_handle(&host, sample(&host)).unwrap();
        let pos = s.explicit_positions().unwrap();
        assert_eq!((pos.rows(), pos.cols()), (3, 2));
        assert_eq!(pos.iter().collect::<Vec<_>>(), vec![1, 2, 1, 4, 3, 1]);
    }

    #[test]
    fn empty_explicit_positions_are_zero_by_rank() {
        let host = MemoryRuntime::new();
        let t = real_tensor(&host, &[2, 3], &[0.0; 6]);
        let s = SparseArrayView::<f64>::from_handle(&host, host.sparse_from_tensor(t, None).unwrap())
            .unwrap();
        let before = host.live_handles();
        let pos = s.explicit_positions().unwrap();
        assert_eq!(pos.dimensions(), vec![0, 2]);
        assert_eq!(host.live_handles(), before + 1);
    }

    #[test]
    fn reset_implicit_value_forms() {
        let host = MemoryRuntime::new();
        let t = real_tensor(&host, &[4], &[0.0, 7.0, 7.0, 1.0]);
        let s = TensorView::<f64>::from_handle(&host, t).unwrap().to_sparse().unwrap();
        assert_eq!(s.len(), 3);

        let sevens = s.reset_implicit_value_to(7.0).unwrap();
        assert_eq!(sevens.implicit_value(), 7.0);
        assert_eq!(sevens.len(), 2);
        assert_eq!(
            sevens.to_dense().unwrap().iter().collect::<Vec<_>>(),
            vec![0.0, 7.0, 7.0, 1.0]
        );
        // the original is untouched
        assert_eq!(s.len(), 3);
        assert_eq!(s.implicit_value(), 0.0);

        let pruned = sevens.reset_implicit_value().unwrap();
        assert_eq!(pruned.len(), 2);
    }

    #[test]
    fn reset_to_frees_temporary_scalar() {
        let host = MemoryRuntime::new();
        let t = real_tensor(&host, &[2], &[1.0, 0.0]);
        let s = TensorView::<f64>::from_handle(&host, t).unwrap().to_sparse().unwrap();
        let before = host.live_handles();
        let r = s.reset_implicit_value_to(1.0).unwrap();
        // one sparse array and its four components
        assert_eq!(host.live_handles(), before + 5);
        // SAFETY: `r` is not used afterwards
        unsafe { r.free() };
        assert_eq!(host.live_handles(), before);
    }

    #[test]
    fn failed_reset_leaks_nothing() {
        let host = MemoryRuntime::new();
        let t = real_tensor(&host, &[2], &[1.0, 0.0]);
        let s = TensorView::<f64>::from_handle(&host, t).unwrap().to_sparse().unwrap();
        let before = host.live_handles();
        host.set_allocation_budget(Some(2));
        let err = s.reset_implicit_value_to(1.0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MEMORY);
        host.set_allocation_budget(None);
        assert_eq!(host.live_handles(), before);
    }
}
