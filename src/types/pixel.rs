//! Pixel kinds for images

use std::fmt::Debug;

/// Pixel type of an image, tagged the way the host tags it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum PixelKind {
    Bit = 1,
    Byte = 2,
    Bit16 = 3,
    Real32 = 4,
    Real = 5,
}

impl PixelKind {
    pub fn element_size(self) -> usize {
        match self {
            PixelKind::Bit | PixelKind::Byte => 1,
            PixelKind::Bit16 => 2,
            PixelKind::Real32 => 4,
            PixelKind::Real => 8,
        }
    }

    pub fn tag(self) -> i32 {
        self as i32
    }

    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            1 => Some(PixelKind::Bit),
            2 => Some(PixelKind::Byte),
            3 => Some(PixelKind::Bit16),
            4 => Some(PixelKind::Real32),
            5 => Some(PixelKind::Real),
            _ => None,
        }
    }

    /// Image type name as the host prints it
    pub fn name(self) -> &'static str {
        match self {
            PixelKind::Bit => "Bit",
            PixelKind::Byte => "Byte",
            PixelKind::Bit16 => "Bit16",
            PixelKind::Real32 => "Real32",
            PixelKind::Real => "Real",
        }
    }

    /// Name for a raw host tag; tag -1 is the host's undefined type
    pub fn tag_name(tag: i32) -> &'static str {
        match (tag, Self::from_tag(tag)) {
            (_, Some(kind)) => kind.name(),
            (-1, None) => "Undefined",
            _ => "Unknown",
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for bool {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Types that can be stored in an image.
///
/// `bool` is the one-bit kind. The host stores it as one byte holding 0 or 1.
pub trait PixelElement: sealed::Sealed + Copy + PartialEq + Debug + 'static {
    const KIND: PixelKind;
}

impl PixelElement for bool {
    const KIND: PixelKind = PixelKind::Bit;
}
impl PixelElement for u8 {
    const KIND: PixelKind = PixelKind::Byte;
}
impl PixelElement for u16 {
    const KIND: PixelKind = PixelKind::Bit16;
}
impl PixelElement for f32 {
    const KIND: PixelKind = PixelKind::Real32;
}
impl PixelElement for f64 {
    const KIND: PixelKind = PixelKind::Real;
}
