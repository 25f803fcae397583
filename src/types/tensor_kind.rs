//! Element kinds for dense tensors and sparse arrays

use num_complex::Complex64;
use num_traits::Zero;
use std::fmt::Debug;

/// Element kind of a tensor, tagged the way the host tags it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TensorKind {
    Integer = 2,
    Real = 3,
    Complex = 4,
}

impl TensorKind {
    /// Size in bytes of a single element
    pub fn element_size(self) -> usize {
        match self {
            TensorKind::Integer | TensorKind::Real => 8,
            TensorKind::Complex => 16,
        }
    }

    /// Host tag for this kind
    pub fn tag(self) -> i32 {
        self as i32
    }

    /// Try to convert from a host tag
    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            2 => Some(TensorKind::Integer),
            3 => Some(TensorKind::Real),
            4 => Some(TensorKind::Complex),
            _ => None,
        }
    }

    /// Name the host uses for this kind
    pub fn name(self) -> &'static str {
        match self {
            TensorKind::Integer => "Integer",
            TensorKind::Real => "Real",
            TensorKind::Complex => "Complex",
        }
    }

    /// Name for a raw host tag, including tags outside the closed set
    pub fn tag_name(tag: i32) -> &'static str {
        match Self::from_tag(tag) {
            Some(kind) => kind.name(),
            None => "Unknown",
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i64 {}
    impl Sealed for f64 {}
    impl Sealed for num_complex::Complex64 {}
}

/// Types that can be stored in a tensor or sparse array: `i64`, `f64` and `Complex64`
pub trait TensorElement: sealed::Sealed + Copy + PartialEq + Debug + Zero + 'static {
    const KIND: TensorKind;
}

impl TensorElement for i64 {
    const KIND: TensorKind = TensorKind::Integer;
}
impl TensorElement for f64 {
    const KIND: TensorKind = TensorKind::Real;
}
impl TensorElement for Complex64 {
    const KIND: TensorKind = TensorKind::Complex;
}
