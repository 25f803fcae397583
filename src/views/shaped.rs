//! Rank-2 and rank-3 tensor views with row-major indexing

use super::tensor::TensorView;
use crate::error::{LibraryError, Result};
use crate::host::{Runtime, TensorHandle};
use crate::types::TensorElement;
use std::fmt;
use std::ops::Deref;

/// Tensor view checked to be a matrix. Element `(i, j)` is at `i * cols + j`.
pub struct MatrixView<'h, T: TensorElement> {
    tensor: TensorView<'h, T>,
    rows: usize,
    cols: usize,
}

impl<T: TensorElement> Clone for MatrixView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: TensorElement> Copy for MatrixView<'_, T> {}

impl<T: TensorElement> fmt::Debug for MatrixView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixView")
            .field("tensor", &self.tensor)
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}

impl<'h, T: TensorElement> Deref for MatrixView<'h, T> {
    type Target = TensorView<'h, T>;

    fn deref(&self) -> &Self::Target {
        &self.tensor
    }
}

impl<'h, T: TensorElement> MatrixView<'h, T> {
    pub fn from_tensor(tensor: TensorView<'h, T>) -> Result<Self> {
        let dims = tensor.dimensions();
        if dims.len() != 2 {
            return Err(LibraryError::rank("MatrixView: matrix expected."));
        }
        Ok(MatrixView {
            tensor,
            rows: dims[0],
            cols: dims[1],
        })
    }

    pub fn from_handle(host: &'h dyn Runtime, handle: TensorHandle) -> Result<Self> {
        Self::from_tensor(TensorView::from_handle(host, handle)?)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_tensor(&self) -> TensorView<'h, T> {
        self.tensor
    }

    /// Flat offset of `(i, j)`
    pub fn offset(&self, i: usize, j: usize) -> usize {
        i * self.cols + j
    }

    /// Element `(i, j)`. Indices are not checked per axis; the flat offset must
    /// be in bounds or this panics.
    #[track_caller]
    pub fn at(&self, i: usize, j: usize) -> T {
        self.tensor.get(self.offset(i, j))
    }

    #[track_caller]
    pub fn set_at(&self, i: usize, j: usize, value: T) {
        self.tensor.set(self.offset(i, j), value)
    }

    pub fn duplicate(&self) -> Result<MatrixView<'h, T>> {
        Ok(MatrixView {
            tensor: self.tensor.duplicate()?,
            ..*self
        })
    }
}

/// Tensor view checked to be rank 3. Element `(i, j, k)` is at
/// `i * rows * cols + j * cols + k`.
pub struct CubeView<'h, T: TensorElement> {
    tensor: TensorView<'h, T>,
    slices: usize,
    rows: usize,
    cols: usize,
}

impl<T: TensorElement> Clone for CubeView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: TensorElement> Copy for CubeView<'_, T> {}

impl<T: TensorElement> fmt::Debug for CubeView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CubeView")
            .field("tensor", &self.tensor)
            .field("slices", &self.slices)
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}

impl<'h, T: TensorElement> Deref for CubeView<'h, T> {
    type Target = TensorView<'h, T>;

    fn deref(&self) -> &Self::Target {
        &self.tensor
    }
}

impl<'h, T: TensorElement> CubeView<'h, T> {
    pub fn from_tensor(tensor: TensorView<'h, T>) -> Result<Self> {
        let dims = tensor.dimensions();
        if dims.len() != 3 {
            return Err(LibraryError::rank("CubeView: rank-3 tensor expected."));
        }
        Ok(CubeView {
            tensor,
            slices: dims[0],
            rows: dims[1],
            cols: dims[2],
        })
    }

    pub fn from_handle(host: &'h dyn Runtime, handle: TensorHandle) -> Result<Self> {
        Self::from_tensor(TensorView::from_handle(host, handle)?)
    }

    pub fn slices(&self) -> usize {
        self.slices
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_tensor(&self) -> TensorView<'h, T> {
        self.tensor
    }

    pub fn offset(&self, i: usize, j: usize, k: usize) -> usize {
        i * self.rows * self.cols + j * self.cols + k
    }

    #[track_caller]
    pub fn at(&self, i: usize, j: usize, k: usize) -> T {
        self.tensor.get(self.offset(i, j, k))
    }

    #[track_caller]
    pub fn set_at(&self, i: usize, j: usize, k: usize, value: T) {
        self.tensor.set(self.offset(i, j, k), value)
    }

    pub fn duplicate(&self) -> Result<CubeView<'h, T>> {
        Ok(CubeView {
            tensor: self.tensor.duplicate()?,
            ..*self
        })
    }
}
