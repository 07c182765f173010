//! Element-type tags and type-erased scalar values.

use std::fmt;

use crate::element::Element;

/// Runtime tag for the element type stored in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DType {
    U8,
    I32,
    I64,
    F32,
    F64,
}

impl DType {
    /// Number of distinct tags; registry tables are sized by this.
    pub const COUNT: usize = 5;

    pub const ALL: [DType; DType::COUNT] = [DType::U8, DType::I32, DType::I64, DType::F32, DType::F64];

    /// Dense index of this tag in `0..COUNT`.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::U8 => "u8",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::F32 => "f32",
            DType::F64 => "f64",
        }
    }

    pub fn size_in_bytes(self) -> usize {
        match self {
            DType::U8 => 1,
            DType::I32 | DType::F32 => 4,
            DType::I64 | DType::F64 => 8,
        }
    }

    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    #[inline]
    pub fn is_signed(self) -> bool {
        !matches!(self, DType::U8)
    }

    /// Result type of an arithmetic operation mixing `self` and `other`.
    ///
    /// Floats win over integers and wider types win over narrower ones.
    /// `f32` mixed with a 32/64-bit integer goes to `f64`, since `f32` cannot
    /// hold every value of either.
    pub fn promote(self, other: DType) -> DType {
        use DType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (F64, _) | (_, F64) => F64,
            (F32, I32 | I64) | (I32 | I64, F32) => F64,
            (F32, _) | (_, F32) => F32,
            (I64, _) | (_, I64) => I64,
            (I32, _) | (_, I32) => I32,
            _ => U8,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single value of any supported element type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    U8(u8),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Scalar {
    pub fn dtype(&self) -> DType {
        match self {
            Scalar::U8(_) => DType::U8,
            Scalar::I32(_) => DType::I32,
            Scalar::I64(_) => DType::I64,
            Scalar::F32(_) => DType::F32,
            Scalar::F64(_) => DType::F64,
        }
    }

    /// Convert to `dtype` with Rust `as` semantics (truncating, saturating
    /// float-to-int).
    pub fn cast(self, dtype: DType) -> Scalar {
        crate::with_dtype!(dtype, T => T::from_scalar(self).into_scalar())
    }

    /// Extract the value as `T`, converting if the tags differ.
    pub fn to<T: Element>(self) -> T {
        T::from_scalar(self)
    }

    pub fn to_f64(self) -> f64 {
        self.to::<f64>()
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::U8(v) => write!(f, "{v}"),
            Scalar::I32(v) => write!(f, "{v}"),
            Scalar::I64(v) => write!(f, "{v}"),
            Scalar::F32(v) => write!(f, "{v}"),
            Scalar::F64(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! impl_scalar_from {
    ($($t:ty => $variant:ident),*) => {
        $(impl From<$t> for Scalar {
            #[inline]
            fn from(v: $t) -> Self {
                Scalar::$variant(v)
            }
        })*
    };
}

impl_scalar_from!(u8 => U8, i32 => I32, i64 => I64, f32 => F32, f64 => F64);

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_promote_is_symmetric() {
        for a in DType::ALL {
            for b in DType::ALL {
                assert_eq!(a.promote(b), b.promote(a), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_promote_rules() {
        assert_eq!(DType::U8.promote(DType::I32), DType::I32);
        assert_eq!(DType::I32.promote(DType::I64), DType::I64);
        assert_eq!(DType::U8.promote(DType::F32), DType::F32);
        assert_eq!(DType::I32.promote(DType::F32), DType::F64);
        assert_eq!(DType::F32.promote(DType::F64), DType::F64);
    }

    #[test]
    fn test_index_is_dense() {
        for (i, d) in DType::ALL.iter().enumerate() {
            assert_eq!(d.index(), i);
        }
    }

    #[test]
    fn test_scalar_cast() {
        assert_eq!(Scalar::F64(2.75).cast(DType::I32), Scalar::I32(2));
        assert_eq!(Scalar::I32(-1).cast(DType::U8), Scalar::U8(255));
        assert_eq!(Scalar::F32(300.0).cast(DType::U8), Scalar::U8(255));
        assert_eq!(Scalar::U8(7).cast(DType::F64), Scalar::F64(7.0));
        assert_eq!(Scalar::from(3i64).dtype(), DType::I64);
    }

    #[test]
    fn test_float_widening() {
        // f32 rounding survives the widening cast
        let v = Scalar::F32(0.1).cast(DType::F64).to_f64();
        assert_relative_eq!(v, 0.1, max_relative = 1e-7);
        assert!(v != 0.1);
        assert_relative_eq!(Scalar::I64(3).to::<f32>(), 3.0);
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(Scalar::I64(-4).to_string(), "-4");
        assert_eq!(Scalar::F64(1.5).to_string(), "1.5");
        assert_eq!(DType::F32.to_string(), "f32");
    }
}
