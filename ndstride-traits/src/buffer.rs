//! Type-erased contiguous element storage.

use num_traits::Zero;

use crate::dtype::{DType, Scalar};
use crate::element::Element;
use crate::with_dtype;

/// Contiguous data of one element type.
///
/// A `Buffer` knows nothing about shape; layouts over it live elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub enum Buffer {
    U8(Vec<u8>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Buffer {
    /// A buffer of `len` zeros.
    pub fn zeros(dtype: DType, len: usize) -> Self {
        with_dtype!(dtype, T => T::into_buffer(vec![T::zero(); len]))
    }

    /// A buffer of `len` copies of `value`, stored as `value.dtype()`.
    pub fn filled(value: Scalar, len: usize) -> Self {
        with_dtype!(value.dtype(), T => T::into_buffer(vec![T::from_scalar(value); len]))
    }

    pub fn from_vec<T: Element>(data: Vec<T>) -> Self {
        T::into_buffer(data)
    }

    pub fn dtype(&self) -> DType {
        match self {
            Buffer::U8(_) => DType::U8,
            Buffer::I32(_) => DType::I32,
            Buffer::I64(_) => DType::I64,
            Buffer::F32(_) => DType::F32,
            Buffer::F64(_) => DType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Buffer::U8(v) => v.len(),
            Buffer::I32(v) => v.len(),
            Buffer::I64(v) => v.len(),
            Buffer::F32(v) => v.len(),
            Buffer::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice(self)
    }

    #[inline]
    pub fn as_slice_mut<T: Element>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(self)
    }

    /// Read one storage slot as a scalar.
    pub fn get(&self, index: usize) -> Option<Scalar> {
        match self {
            Buffer::U8(v) => v.get(index).map(|&x| Scalar::U8(x)),
            Buffer::I32(v) => v.get(index).map(|&x| Scalar::I32(x)),
            Buffer::I64(v) => v.get(index).map(|&x| Scalar::I64(x)),
            Buffer::F32(v) => v.get(index).map(|&x| Scalar::F32(x)),
            Buffer::F64(v) => v.get(index).map(|&x| Scalar::F64(x)),
        }
    }
}
