//! Image colour spaces

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum ColorSpace {
    #[default]
    Automatic = -1,
    Gray = 0,
    RGB = 1,
    HSB = 2,
    CMYK = 3,
    XYZ = 4,
    LUV = 5,
    LAB = 6,
    LCH = 7,
}

impl ColorSpace {
    pub fn tag(self) -> i32 {
        self as i32
    }

    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            -1 => Some(ColorSpace::Automatic),
            0 => Some(ColorSpace::Gray),
            1 => Some(ColorSpace::RGB),
            2 => Some(ColorSpace::HSB),
            3 => Some(ColorSpace::CMYK),
            4 => Some(ColorSpace::XYZ),
            5 => Some(ColorSpace::LUV),
            6 => Some(ColorSpace::LAB),
            7 => Some(ColorSpace::LCH),
            _ => None,
        }
    }

    /// Number of colour (non-alpha) channels, or `None` when the space is inferred
    pub fn color_channels(self) -> Option<usize> {
        match self {
            ColorSpace::Automatic => None,
            ColorSpace::Gray => Some(1),
            ColorSpace::CMYK => Some(4),
            ColorSpace::RGB
            | ColorSpace::HSB
            | ColorSpace::XYZ
            | ColorSpace::LUV
            | ColorSpace::LAB
            | ColorSpace::LCH => Some(3),
        }
    }
}
