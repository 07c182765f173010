//! Shared element-type layer for the ndstride crates.
//!
//! This crate holds everything that depends on *which* numeric type an array
//! stores, and nothing that depends on *how* it is laid out:
//!
//! - [`DType`]: runtime element-type tag
//! - [`Element`]: the Rust types a [`DType`] can stand for
//! - [`Scalar`] / [`Buffer`]: type-erased single values and contiguous data
//! - [`PrimitiveRegistry`]: tag-indexed table of scalar primitives
//! - [`is_close`]: the tolerance comparison used by `all_close`
//!
//! Dispatch from a tag to a concrete type happens once per call through
//! [`with_dtype!`], never inside element loops.

pub mod buffer;
pub mod dtype;
pub mod element;
pub mod registry;
pub mod tolerance;

pub use buffer::Buffer;
pub use dtype::{DType, Scalar};
pub use element::Element;
pub use registry::{PrimitiveRegistry, Primitives, ScalarBinaryFn, ScalarConvertFn};
pub use tolerance::{is_close, DEFAULT_ATOL, DEFAULT_RTOL};

/// Resolve a [`DType`] to its Rust type and evaluate `$body` with that type
/// bound to `$T`.
///
/// ```
/// use ndstride_traits::{with_dtype, DType, Element};
///
/// let size = with_dtype!(DType::F32, T => std::mem::size_of::<T>());
/// assert_eq!(size, 4);
/// ```
#[macro_export]
macro_rules! with_dtype {
    ($dtype:expr, $T:ident => $body:expr) => {
        match $dtype {
            $crate::DType::U8 => {
                type $T = u8;
                $body
            }
            $crate::DType::I32 => {
                type $T = i32;
                $body
            }
            $crate::DType::I64 => {
                type $T = i64;
                $body
            }
            $crate::DType::F32 => {
                type $T = f32;
                $body
            }
            $crate::DType::F64 => {
                type $T = f64;
                $body
            }
        }
    };
}
