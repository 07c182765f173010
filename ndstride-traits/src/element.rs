//! Scalar type bounds for array elements.

use std::fmt;

use num_traits::{One, Zero};

use crate::buffer::Buffer;
use crate::dtype::{DType, Scalar};

/// A Rust type that can be stored in a [`Buffer`] under a [`DType`] tag.
///
/// Arithmetic goes through the `elem_*` methods rather than the operator
/// traits so that every tag has total behavior: integer arithmetic wraps and
/// integer division by zero yields zero. Floats follow IEEE 754.
pub trait Element:
    Copy
    + Send
    + Sync
    + Default
    + PartialEq
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + Zero
    + One
    + 'static
{
    const DTYPE: DType;

    /// Convert from any scalar with `as` semantics.
    fn from_scalar(s: Scalar) -> Self;

    fn into_scalar(self) -> Scalar;

    fn from_f64(v: f64) -> Self;

    fn to_f64(self) -> f64;

    fn elem_add(self, rhs: Self) -> Self;

    fn elem_sub(self, rhs: Self) -> Self;

    fn elem_mul(self, rhs: Self) -> Self;

    fn elem_div(self, rhs: Self) -> Self;

    /// Borrow the buffer's data if it holds `Self`.
    fn slice(buf: &Buffer) -> Option<&[Self]>;

    fn slice_mut(buf: &mut Buffer) -> Option<&mut [Self]>;

    fn into_buffer(data: Vec<Self>) -> Buffer;
}

macro_rules! impl_element_common {
    ($t:ty, $variant:ident) => {
        const DTYPE: DType = DType::$variant;

        #[inline]
        fn from_scalar(s: Scalar) -> Self {
            match s {
                Scalar::U8(v) => v as $t,
                Scalar::I32(v) => v as $t,
                Scalar::I64(v) => v as $t,
                Scalar::F32(v) => v as $t,
                Scalar::F64(v) => v as $t,
            }
        }

        #[inline]
        fn into_scalar(self) -> Scalar {
            Scalar::$variant(self)
        }

        #[inline]
        fn from_f64(v: f64) -> Self {
            v as $t
        }

        #[inline]
        fn to_f64(self) -> f64 {
            self as f64
        }

        #[inline]
        fn slice(buf: &Buffer) -> Option<&[Self]> {
            match buf {
                Buffer::$variant(data) => Some(data),
                _ => None,
            }
        }

        #[inline]
        fn slice_mut(buf: &mut Buffer) -> Option<&mut [Self]> {
            match buf {
                Buffer::$variant(data) => Some(data),
                _ => None,
            }
        }

        #[inline]
        fn into_buffer(data: Vec<Self>) -> Buffer {
            Buffer::$variant(data)
        }
    };
}

macro_rules! impl_element_int {
    ($($t:ty => $variant:ident),*) => {
        $(impl Element for $t {
            impl_element_common!($t, $variant);

            #[inline(always)]
            fn elem_add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }

            #[inline(always)]
            fn elem_sub(self, rhs: Self) -> Self {
                self.wrapping_sub(rhs)
            }

            #[inline(always)]
            fn elem_mul(self, rhs: Self) -> Self {
                self.wrapping_mul(rhs)
            }

            #[inline(always)]
            fn elem_div(self, rhs: Self) -> Self {
                self.checked_div(rhs).unwrap_or(0)
            }
        })*
    };
}

macro_rules! impl_element_float {
    ($($t:ty => $variant:ident),*) => {
        $(impl Element for $t {
            impl_element_common!($t, $variant);

            #[inline(always)]
            fn elem_add(self, rhs: Self) -> Self {
                self + rhs
            }

            #[inline(always)]
            fn elem_sub(self, rhs: Self) -> Self {
                self - rhs
            }

            #[inline(always)]
            fn elem_mul(self, rhs: Self) -> Self {
                self * rhs
            }

            #[inline(always)]
            fn elem_div(self, rhs: Self) -> Self {
                self / rhs
            }
        })*
    };
}

impl_element_int!(u8 => U8, i32 => I32, i64 => I64);
impl_element_float!(f32 => F32, f64 => F64);
