//! Data types for flat typed buffers (raw arrays)

use num_complex::{Complex32, Complex64};
use std::fmt::Debug;

/// Data type of a raw array, tagged the way the host tags it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DType {
    I8 = 1,
    U8 = 2,
    I16 = 3,
    U16 = 4,
    I32 = 5,
    U32 = 6,
    I64 = 7,
    U64 = 8,
    F32 = 9,
    F64 = 10,
    C32 = 11,
    C64 = 12,
}

impl DType {
    /// Size in bytes of a single element
    pub fn element_size(self) -> usize {
        match self {
            DType::U8 | DType::I8 => 1,
            DType::U16 | DType::I16 => 2,
            DType::U32 | DType::I32 | DType::F32 => 4,
            DType::U64 | DType::I64 | DType::F64 | DType::C32 => 8,
            DType::C64 => 16,
        }
    }

    pub fn tag(self) -> i32 {
        self as i32
    }

    /// Try to convert from a host tag
    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            1 => Some(DType::I8),
            2 => Some(DType::U8),
            3 => Some(DType::I16),
            4 => Some(DType::U16),
            5 => Some(DType::I32),
            6 => Some(DType::U32),
            7 => Some(DType::I64),
            8 => Some(DType::U64),
            9 => Some(DType::F32),
            10 => Some(DType::F64),
            11 => Some(DType::C32),
            12 => Some(DType::C64),
            _ => None,
        }
    }

    /// Name the host prints for this type
    pub fn name(self) -> &'static str {
        match self {
            DType::U8 => "UnsignedInteger8",
            DType::I8 => "Integer8",
            DType::U16 => "UnsignedInteger16",
            DType::I16 => "Integer16",
            DType::U32 => "UnsignedInteger32",
            DType::I32 => "Integer32",
            DType::U64 => "UnsignedInteger64",
            DType::I64 => "Integer64",
            DType::F32 => "Real32",
            DType::F64 => "Real64",
            DType::C32 => "Complex32",
            DType::C64 => "Complex64",
        }
    }

    /// Name for a raw host tag; tag 0 is the host's undefined type
    pub fn tag_name(tag: i32) -> &'static str {
        match (tag, Self::from_tag(tag)) {
            (_, Some(dtype)) => dtype.name(),
            (0, None) => "Undefined",
            _ => "Unknown",
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i8 {}
    impl Sealed for u8 {}
    impl Sealed for i16 {}
    impl Sealed for u16 {}
    impl Sealed for i32 {}
    impl Sealed for u32 {}
    impl Sealed for i64 {}
    impl Sealed for u64 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
    impl Sealed for num_complex::Complex32 {}
    impl Sealed for num_complex::Complex64 {}
}

/// Types that can be stored in a raw array
pub trait RawElement: sealed::Sealed + Copy + PartialEq + Debug + 'static {
    const DTYPE: DType;
}

impl RawElement for i8 {
    const DTYPE: DType = DType::I8;
}
impl RawElement for u8 {
    const DTYPE: DType = DType::U8;
}
impl RawElement for i16 {
    const DTYPE: DType = DType::I16;
}
impl RawElement for u16 {
    const DTYPE: DType = DType::U16;
}
impl RawElement for i32 {
    const DTYPE: DType = DType::I32;
}
impl RawElement for u32 {
    const DTYPE: DType = DType::U32;
}
impl RawElement for i64 {
    const DTYPE: DType = DType::I64;
}
impl RawElement for u64 {
    const DTYPE: DType = DType::U64;
}
impl RawElement for f32 {
    const DTYPE: DType = DType::F32;
}
impl RawElement for f64 {
    const DTYPE: DType = DType::F64;
}
impl RawElement for Complex32 {
    const DTYPE: DType = DType::C32;
}
impl RawElement for Complex64 {
    const DTYPE: DType = DType::C64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_roundtrip() {
        for tag in 1..=12 {
            let dtype = DType::from_tag(tag).unwrap();
            assert_eq!(dtype.tag(), tag);
        }
        assert_eq!(DType::from_tag(13), None);
    }

    #[test]
    fn names() {
        assert_eq!(DType::tag_name(0), "Undefined");
        assert_eq!(DType::tag_name(-4), "Unknown");
        assert_eq!(DType::C32.name(), "Complex32");
        assert_eq!(<u16 as RawElement>::DTYPE.name(), "UnsignedInteger16");
    }

    #[test]
    fn element_sizes_match_rust_types() {
        assert_eq!(DType::C32.element_size(), std::mem::size_of::<Complex32>());
        assert_eq!(DType::C64.element_size(), std::mem::size_of::<Complex64>());
        assert_eq!(DType::I16.element_size(), std::mem::size_of::<i16>());
    }
}
