//! hostview - Typed zero-copy views over host-owned arrays
//!
//! A host runtime owns dense tensors, compressed-row sparse arrays, flat typed
//! buffers and images, and hands them out as opaque handles. This crate wraps
//! those handles in typed views that read and write the host's memory in
//! place, checks element kind and rank when a view is built, and offers
//! factories that allocate new host arrays.
//!
//! # Features
//!
//! - Dense tensor, matrix and cube views with row-major indexing
//! - Sparse array views with random reads and ordered entry traversal
//! - Raw array views over eight integer, two real and two complex element types
//! - 2-D and 3-D image views, interleaved or planar, with per-channel cursors
//! - Cooperative abort checks and the host message channel
//! - An in-process host, [`MemoryRuntime`], for tests and standalone use
//!
//! # Example
//!
//! ```rust
//! use hostview::{MemoryRuntime, make};
//!
//! let host = MemoryRuntime::new();
//!
//! let m = make::matrix_from_rows(&host, &[[1i64, 2, 3], [4, 5, 6]]).unwrap();
//! assert_eq!(m.at(1, 2), 6);
//!
//! let positions = make::matrix_from(&host, 2, 2, &[1i64, 1, 2, 2]).unwrap();
//! let values = make::vector_from(&host, &[1.0, 1.0]).unwrap();
//! let identity = make::sparse_matrix(&host, positions, values, 2, 2, 0.0).unwrap();
//! assert_eq!(identity.at(1, 1).unwrap(), 1.0);
//! assert_eq!(identity.at(0, 1).unwrap(), 0.0);
//! ```

pub mod error;
pub(crate) mod guard;
pub mod host;
pub mod make;
pub mod session;
pub mod types;
pub mod views;

#[cfg(feature = "ndarray")]
pub mod ndarray_ext;

// Re-export common types at crate root
pub use error::{ErrorCode, LibraryError, Result};
pub use host::memory::MemoryRuntime;
pub use host::{
    ImageFunctions, ImageHandle, RawArrayFunctions, RawArrayHandle, Runtime, Session,
    SparseFunctions, SparseHandle, TensorFunctions, TensorHandle,
};
pub use session::{HostOut, Severity, check_abort};
pub use types::{ColorSpace, DType, PixelElement, PixelKind, RawElement, TensorElement, TensorKind};
pub use views::{
    CubeView, Entries, GenericImageView, GenericRawArrayView, Image3DView, ImageView,
    MatrixView, PixelCursor, PixelIter, RawArrayView, SparseArrayView, SparseCursor,
    SparseMatrixView, TensorView,
};
