//! Element loads and stores across every kind the runtime stores

use crate::types::{DType, PixelKind, TensorKind};
use num_complex::{Complex32, Complex64};

/// Storage type of one element, independent of the array family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Elem {
    Bit,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    C32,
    C64,
}

impl From<TensorKind> for Elem {
    fn from(kind: TensorKind) -> Self {
        match kind {
            TensorKind::Integer => Elem::I64,
            TensorKind::Real => Elem::F64,
            TensorKind::Complex => Elem::C64,
        }
    }
}

impl From<DType> for Elem {
    fn from(dtype: DType) -> Self {
        match dtype {
            DType::I8 => Elem::I8,
            DType::U8 => Elem::U8,
            DType::I16 => Elem::I16,
            DType::U16 => Elem::U16,
            DType::I32 => Elem::I32,
            DType::U32 => Elem::U32,
            DType::I64 => Elem::I64,
            DType::U64 => Elem::U64,
            DType::F32 => Elem::F32,
            DType::F64 => Elem::F64,
            DType::C32 => Elem::C32,
            DType::C64 => Elem::C64,
        }
    }
}

impl From<PixelKind> for Elem {
    fn from(kind: PixelKind) -> Self {
        match kind {
            PixelKind::Bit => Elem::Bit,
            PixelKind::Byte => Elem::U8,
            PixelKind::Bit16 => Elem::U16,
            PixelKind::Real32 => Elem::F32,
            PixelKind::Real => Elem::F64,
        }
    }
}

macro_rules! saturate {
    ($v:expr, $t:ty) => {
        $v.clamp(<$t>::MIN as i128, <$t>::MAX as i128) as $t
    };
}

/// A loaded element, wide enough for every stored kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Scalar {
    Int(i128),
    Real(f64),
    Complex(Complex64),
}

impl Scalar {
    fn to_int(self) -> i128 {
        match self {
            Scalar::Int(v) => v,
            Scalar::Real(f) => f.round() as i128,
            Scalar::Complex(c) => c.re.round() as i128,
        }
    }

    pub(super) fn to_real(self) -> f64 {
        match self {
            Scalar::Int(v) => v as f64,
            Scalar::Real(f) => f,
            Scalar::Complex(c) => c.re,
        }
    }

    fn to_complex(self) -> Complex64 {
        match self {
            Scalar::Complex(c) => c,
            other => Complex64::new(other.to_real(), 0.0),
        }
    }

    /// The value `store` would write for `elem`, as `load` would read it back
    pub(super) fn cast(self, elem: Elem) -> Scalar {
        match elem {
            Elem::Bit => Scalar::Int((self.to_int() != 0) as i128),
            Elem::I8 => Scalar::Int(saturate!(self.to_int(), i8) as i128),
            Elem::U8 => Scalar::Int(saturate!(self.to_int(), u8) as i128),
            Elem::I16 => Scalar::Int(saturate!(self.to_int(), i16) as i128),
            Elem::U16 => Scalar::Int(saturate!(self.to_int(), u16) as i128),
            Elem::I32 => Scalar::Int(saturate!(self.to_int(), i32) as i128),
            Elem::U32 => Scalar::Int(saturate!(self.to_int(), u32) as i128),
            Elem::I64 => Scalar::Int(saturate!(self.to_int(), i64) as i128),
            Elem::U64 => Scalar::Int(saturate!(self.to_int(), u64) as i128),
            Elem::F32 => Scalar::Real(self.to_real() as f32 as f64),
            Elem::F64 => Scalar::Real(self.to_real()),
            Elem::C32 => {
                let c = self.to_complex();
                Scalar::Complex(Complex64::new(c.re as f32 as f64, c.im as f32 as f64))
            }
            Elem::C64 => Scalar::Complex(self.to_complex()),
        }
    }
}

/// Read element `i` of a buffer of `elem`s.
///
/// # Safety
/// `base` must point to at least `i + 1` initialised, aligned elements of `elem`.
pub(super) unsafe fn load(base: *const u8, elem: Elem, i: usize) -> Scalar {
    // SAFETY: guaranteed by the caller
    unsafe {
        match elem {
            Elem::Bit => Scalar::Int((*base.add(i) != 0) as i128),
            Elem::I8 => Scalar::Int(*(base as *const i8).add(i) as i128),
            Elem::U8 => Scalar::Int(*base.add(i) as i128),
            Elem::I16 => Scalar::Int(*(base as *const i16).add(i) as i128),
            Elem::U16 => Scalar::Int(*(base as *const u16).add(i) as i128),
            Elem::I32 => Scalar::Int(*(base as *const i32).add(i) as i128),
            Elem::U32 => Scalar::Int(*(base as *const u32).add(i) as i128),
            Elem::I64 => Scalar::Int(*(base as *const i64).add(i) as i128),
            Elem::U64 => Scalar::Int(*(base as *const u64).add(i) as i128),
            Elem::F32 => Scalar::Real(*(base as *const f32).add(i) as f64),
            Elem::F64 => Scalar::Real(*(base as *const f64).add(i)),
            Elem::C32 => {
                let c = *(base as *const Complex32).add(i);
                Scalar::Complex(Complex64::new(c.re as f64, c.im as f64))
            }
            Elem::C64 => Scalar::Complex(*(base as *const Complex64).add(i)),
        }
    }
}

/// Write `value`, converted to `elem`, into element `i`.
///
/// # Safety
/// `base` must point to at least `i + 1` writable, aligned elements of `elem`.
pub(super) unsafe fn store(base: *mut u8, elem: Elem, i: usize, value: Scalar) {
    // SAFETY: guaranteed by the caller
    unsafe {
        match elem {
            Elem::Bit => *base.add(i) = (value.to_int() != 0) as u8,
            Elem::I8 => *(base as *mut i8).add(i) = saturate!(value.to_int(), i8),
            Elem::U8 => *base.add(i) = saturate!(value.to_int(), u8),
            Elem::I16 => *(base as *mut i16).add(i) = saturate!(value.to_int(), i16),
            Elem::U16 => *(base as *mut u16).add(i) = saturate!(value.to_int(), u16),
            Elem::I32 => *(base as *mut i32).add(i) = saturate!(value.to_int(), i32),
            Elem::U32 => *(base as *mut u32).add(i) = saturate!(value.to_int(), u32),
            Elem::I64 => *(base as *mut i64).add(i) = saturate!(value.to_int(), i64),
            Elem::U64 => *(base as *mut u64).add(i) = saturate!(value.to_int(), u64),
            Elem::F32 => *(base as *mut f32).add(i) = value.to_real() as f32,
            Elem::F64 => *(base as *mut f64).add(i) = value.to_real(),
            Elem::C32 => {
                let c = value.to_complex();
                *(base as *mut Complex32).add(i) = Complex32::new(c.re as f32, c.im as f32);
            }
            Elem::C64 => *(base as *mut Complex64).add(i) = value.to_complex(),
        }
    }
}
