//! Host array runtime interface
//!
//! The host owns every array. This module describes the function tables the
//! view layer calls into, one per array family, plus the session services
//! (abort flag and message channel). Views hold a `&dyn Runtime` and never
//! touch host memory except through the pointers these calls hand out.
//!
//! [`memory::MemoryRuntime`] is an in-process implementation of the whole
//! interface.

pub mod memory;

use crate::error::ErrorCode;
use crate::session::Severity;
use crate::types::{ColorSpace, DType, PixelKind, TensorKind};

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        pub struct $name(u64);

        impl $name {
            pub fn from_raw(raw: u64) -> Self {
                $name(raw)
            }

            pub fn into_raw(self) -> u64 {
                self.0
            }
        }
    };
}

handle_type!(
    /// Opaque reference to a host dense tensor
    TensorHandle
);
handle_type!(
    /// Opaque reference to a host sparse array in compressed-row storage
    SparseHandle
);
handle_type!(
    /// Opaque reference to a host flat typed buffer
    RawArrayHandle
);
handle_type!(
    /// Opaque reference to a host image
    ImageHandle
);

/// Abort flag and message channel of the current host session
pub trait Session {
    /// True once the host has asked the running operation to stop
    fn abort_requested(&self) -> bool;

    /// Emit a message tagged with `severity`
    fn message(&self, text: &str, severity: Severity);

    /// Print text through the host's print channel
    fn print(&self, text: &str);
}

/// Dense tensor functions.
///
/// Pointers returned by [`tensor_data`](Self::tensor_data) stay valid until the
/// tensor is freed and are aligned for the tensor's element kind.
pub trait TensorFunctions {
    fn tensor_new(&self, kind: TensorKind, dims: &[usize]) -> Result<TensorHandle, ErrorCode>;
    fn tensor_free(&self, t: TensorHandle);
    fn tensor_clone(&self, t: TensorHandle) -> Result<TensorHandle, ErrorCode>;
    fn tensor_disown(&self, t: TensorHandle);
    fn tensor_disown_all(&self, t: TensorHandle);
    fn tensor_share_count(&self, t: TensorHandle) -> usize;
    /// Host tag of the element kind
    fn tensor_type(&self, t: TensorHandle) -> i32;
    fn tensor_rank(&self, t: TensorHandle) -> usize;
    fn tensor_dimensions(&self, t: TensorHandle) -> Vec<usize>;
    fn tensor_flattened_length(&self, t: TensorHandle) -> usize;
    fn tensor_data(&self, t: TensorHandle) -> *mut u8;
    /// New tensor of `kind` holding the elementwise-converted contents of `t`
    fn tensor_convert(&self, t: TensorHandle, kind: TensorKind)
    -> Result<TensorHandle, ErrorCode>;
}

/// Sparse array functions.
///
/// Component tensors (row pointers, column indices, explicit values, implicit
/// value) belong to the sparse array and are released with it.
pub trait SparseFunctions {
    fn sparse_free(&self, s: SparseHandle);
    fn sparse_clone(&self, s: SparseHandle) -> Result<SparseHandle, ErrorCode>;
    fn sparse_disown(&self, s: SparseHandle);
    fn sparse_disown_all(&self, s: SparseHandle);
    fn sparse_share_count(&self, s: SparseHandle) -> usize;
    fn sparse_rank(&self, s: SparseHandle) -> usize;
    fn sparse_dimensions(&self, s: SparseHandle) -> Vec<usize>;
    /// Rank-1 integer tensor of length `rows + 1`
    fn sparse_row_pointers(&self, s: SparseHandle) -> TensorHandle;
    /// Rank-2 integer tensor of 1-based column indices; `None` when nothing is stored
    fn sparse_column_indices(&self, s: SparseHandle) -> Option<TensorHandle>;
    /// Hand a column-index tensor to the sparse array, which takes ownership
    fn sparse_set_column_indices(&self, s: SparseHandle, ci: TensorHandle);
    /// `None` for pattern arrays
    fn sparse_explicit_values(&self, s: SparseHandle) -> Option<TensorHandle>;
    /// Hand an explicit-values tensor to the sparse array, which takes ownership
    fn sparse_set_explicit_values(&self, s: SparseHandle, ev: TensorHandle);
    /// Rank-0 tensor holding the background value
    fn sparse_implicit_value(&self, s: SparseHandle) -> TensorHandle;
    /// New `n x rank` integer tensor of 1-based positions; may be rank 0 when `n == 0`
    fn sparse_explicit_positions(&self, s: SparseHandle) -> Result<TensorHandle, ErrorCode>;
    fn sparse_from_explicit_positions(
        &self,
        positions: TensorHandle,
        values: TensorHandle,
        dims: TensorHandle,
        implicit: Option<TensorHandle>,
    ) -> Result<SparseHandle, ErrorCode>;
    fn sparse_from_tensor(
        &self,
        t: TensorHandle,
        implicit: Option<TensorHandle>,
    ) -> Result<SparseHandle, ErrorCode>;
    fn sparse_to_tensor(&self, s: SparseHandle) -> Result<TensorHandle, ErrorCode>;
    /// With `None`, drop explicit entries equal to the current implicit value
    fn sparse_reset_implicit_value(
        &self,
        s: SparseHandle,
        implicit: Option<TensorHandle>,
    ) -> Result<SparseHandle, ErrorCode>;
}

/// Raw array (flat typed buffer) functions
pub trait RawArrayFunctions {
    fn raw_new(&self, dtype: DType, dims: &[usize]) -> Result<RawArrayHandle, ErrorCode>;
    fn raw_free(&self, r: RawArrayHandle);
    fn raw_clone(&self, r: RawArrayHandle) -> Result<RawArrayHandle, ErrorCode>;
    fn raw_disown(&self, r: RawArrayHandle);
    fn raw_disown_all(&self, r: RawArrayHandle);
    fn raw_share_count(&self, r: RawArrayHandle) -> usize;
    fn raw_type(&self, r: RawArrayHandle) -> i32;
    fn raw_rank(&self, r: RawArrayHandle) -> usize;
    fn raw_dimensions(&self, r: RawArrayHandle) -> Vec<usize>;
    fn raw_flattened_length(&self, r: RawArrayHandle) -> usize;
    fn raw_data(&self, r: RawArrayHandle) -> *mut u8;
    fn raw_convert(&self, r: RawArrayHandle, dtype: DType) -> Result<RawArrayHandle, ErrorCode>;
}

/// Image functions
pub trait ImageFunctions {
    fn image_new_2d(
        &self,
        width: usize,
        height: usize,
        channels: usize,
        kind: PixelKind,
        color_space: ColorSpace,
        interleaved: bool,
    ) -> Result<ImageHandle, ErrorCode>;
    #[allow(clippy::too_many_arguments)]
    fn image_new_3d(
        &self,
        slices: usize,
        width: usize,
        height: usize,
        channels: usize,
        kind: PixelKind,
        color_space: ColorSpace,
        interleaved: bool,
    ) -> Result<ImageHandle, ErrorCode>;
    fn image_free(&self, im: ImageHandle);
    fn image_clone(&self, im: ImageHandle) -> Result<ImageHandle, ErrorCode>;
    fn image_disown(&self, im: ImageHandle);
    fn image_disown_all(&self, im: ImageHandle);
    fn image_share_count(&self, im: ImageHandle) -> usize;
    fn image_type(&self, im: ImageHandle) -> i32;
    fn image_rank(&self, im: ImageHandle) -> usize;
    fn image_rows(&self, im: ImageHandle) -> usize;
    fn image_columns(&self, im: ImageHandle) -> usize;
    /// 1 for 2-D images
    fn image_slices(&self, im: ImageHandle) -> usize;
    fn image_channels(&self, im: ImageHandle) -> usize;
    fn image_interleaved(&self, im: ImageHandle) -> bool;
    fn image_has_alpha(&self, im: ImageHandle) -> bool;
    fn image_color_space(&self, im: ImageHandle) -> i32;
    fn image_flattened_length(&self, im: ImageHandle) -> usize;
    fn image_data(&self, im: ImageHandle) -> *mut u8;
    fn image_convert(
        &self,
        im: ImageHandle,
        kind: PixelKind,
        interleaved: bool,
    ) -> Result<ImageHandle, ErrorCode>;
}

/// The complete host interface the view layer runs against
pub trait Runtime:
    Session + TensorFunctions + SparseFunctions + RawArrayFunctions + ImageFunctions
{
}

impl<R> Runtime for R where
    R: Session + TensorFunctions + SparseFunctions + RawArrayFunctions + ImageFunctions
{
}
