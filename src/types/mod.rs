//! Kind registries: the closed element-type sets of each array family

mod color;
mod dtype;
mod pixel;
mod tensor_kind;

pub use color::ColorSpace;
pub use dtype::{DType, RawElement};
pub use pixel::{PixelElement, PixelKind};
pub use tensor_kind::{TensorElement, TensorKind};
