//! Factories for new host arrays
//!
//! Every factory asks the host for a fresh array and hands back a view of it.
//! The caller owns the new array. If anything fails after allocation, the
//! array is freed before the error is returned.

pub mod image;
pub mod raw;
pub mod sparse;
pub mod tensor;

pub use image::{ImageOptions, image, image_3d};
pub use raw::{raw_array, raw_array_from, raw_vector, raw_vector_from};
pub use sparse::{sparse_array, sparse_array_zero, sparse_matrix, sparse_matrix_zero};
pub use tensor::{
    cube, cube_from, cube_from_slices, matrix, matrix_from, matrix_from_column_major,
    matrix_from_rows, tensor, tensor_from, transposed_copy, vector, vector_from,
};

#[cfg(feature = "ndarray")]
pub use crate::ndarray_ext::{raw_array_from_ndarray, tensor_from_ndarray};
