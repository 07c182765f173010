//! Tag-indexed table of scalar primitives.
//!
//! A [`PrimitiveRegistry`] maps each [`DType`] to a [`Primitives`] record of
//! plain function pointers. It is built once (usually through
//! [`PrimitiveRegistry::builtin`]) and passed by reference to whatever needs
//! it; there is no process-wide instance.

use crate::dtype::{DType, Scalar};
use crate::element::Element;

pub type ScalarBinaryFn = fn(Scalar, Scalar) -> Scalar;
pub type ScalarConvertFn = fn(Scalar) -> Scalar;

/// Scalar arithmetic for one element type.
///
/// Operands of a different tag are converted to `dtype` first, so
/// `(p.add)(a, b)` always returns a scalar tagged `p.dtype`.
#[derive(Debug, Clone, Copy)]
pub struct Primitives {
    pub dtype: DType,
    pub add: ScalarBinaryFn,
    pub sub: ScalarBinaryFn,
    pub mul: ScalarBinaryFn,
    pub div: ScalarBinaryFn,
    pub convert: ScalarConvertFn,
    pub zero: Scalar,
    pub one: Scalar,
}

impl Primitives {
    /// The primitives of a built-in element type.
    pub fn of<T: Element>() -> Self {
        Self {
            dtype: T::DTYPE,
            add: add::<T>,
            sub: sub::<T>,
            mul: mul::<T>,
            div: div::<T>,
            convert: convert::<T>,
            zero: T::zero().into_scalar(),
            one: T::one().into_scalar(),
        }
    }
}

fn add<T: Element>(a: Scalar, b: Scalar) -> Scalar {
    T::from_scalar(a).elem_add(T::from_scalar(b)).into_scalar()
}

fn sub<T: Element>(a: Scalar, b: Scalar) -> Scalar {
    T::from_scalar(a).elem_sub(T::from_scalar(b)).into_scalar()
}

fn mul<T: Element>(a: Scalar, b: Scalar) -> Scalar {
    T::from_scalar(a).elem_mul(T::from_scalar(b)).into_scalar()
}

fn div<T: Element>(a: Scalar, b: Scalar) -> Scalar {
    T::from_scalar(a).elem_div(T::from_scalar(b)).into_scalar()
}

fn convert<T: Element>(a: Scalar) -> Scalar {
    T::from_scalar(a).into_scalar()
}

/// Fixed-size lookup table from [`DType`] to [`Primitives`].
#[derive(Debug, Clone)]
pub struct PrimitiveRegistry {
    table: [Option<Primitives>; DType::COUNT],
}

impl PrimitiveRegistry {
    /// A registry with no entries.
    pub fn empty() -> Self {
        Self {
            table: [None; DType::COUNT],
        }
    }

    /// A registry with every built-in element type registered.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Primitives::of::<u8>());
        registry.register(Primitives::of::<i32>());
        registry.register(Primitives::of::<i64>());
        registry.register(Primitives::of::<f32>());
        registry.register(Primitives::of::<f64>());
        registry
    }

    /// Insert or replace the entry for `primitives.dtype`, returning the
    /// previous entry.
    pub fn register(&mut self, primitives: Primitives) -> Option<Primitives> {
        self.table[primitives.dtype.index()].replace(primitives)
    }

    #[inline]
    pub fn lookup(&self, dtype: DType) -> Option<&Primitives> {
        self.table[dtype.index()].as_ref()
    }

    pub fn contains(&self, dtype: DType) -> bool {
        self.lookup(dtype).is_some()
    }

    /// Registered tags in ascending order.
    pub fn dtypes(&self) -> impl Iterator<Item = DType> + '_ {
        DType::ALL.into_iter().filter(|d| self.contains(*d))
    }
}

impl Default for PrimitiveRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_every_dtype() {
        let registry = PrimitiveRegistry::builtin();
        assert_eq!(registry.dtypes().collect::<Vec<_>>(), DType::ALL.to_vec());
        for dtype in DType::ALL {
            let p = registry.lookup(dtype).unwrap();
            assert_eq!(p.dtype, dtype);
            assert_eq!(p.zero.dtype(), dtype);
            assert_eq!(p.one.dtype(), dtype);
        }
    }

    #[test]
    fn test_empty_lookup() {
        let registry = PrimitiveRegistry::empty();
        assert!(registry.lookup(DType::F64).is_none());
        assert_eq!(registry.dtypes().count(), 0);
    }

    #[test]
    fn test_arithmetic_converts_operands() {
        let registry = PrimitiveRegistry::builtin();
        let p = registry.lookup(DType::I32).unwrap();
        assert_eq!((p.add)(Scalar::F64(2.9), Scalar::U8(3)), Scalar::I32(5));
        assert_eq!((p.sub)(Scalar::I32(2), Scalar::I32(5)), Scalar::I32(-3));
        assert_eq!((p.mul)(Scalar::I32(4), Scalar::I64(6)), Scalar::I32(24));
        assert_eq!((p.div)(Scalar::I32(9), Scalar::I32(0)), Scalar::I32(0));
        assert_eq!((p.convert)(Scalar::F32(-7.5)), Scalar::I32(-7));
    }

    #[test]
    fn test_float_division() {
        let registry = PrimitiveRegistry::builtin();
        let p = registry.lookup(DType::F64).unwrap();
        assert_eq!((p.div)(Scalar::I64(7), Scalar::I64(2)), Scalar::F64(3.5));
    }

    #[test]
    fn test_register_replaces() {
        fn always_zero(_: Scalar, _: Scalar) -> Scalar {
            Scalar::U8(0)
        }
        let mut registry = PrimitiveRegistry::builtin();
        let mut custom = Primitives::of::<u8>();
        custom.add = always_zero;
        let previous = registry.register(custom);
        assert!(previous.is_some());
        let p = registry.lookup(DType::U8).unwrap();
        assert_eq!((p.add)(Scalar::U8(1), Scalar::U8(2)), Scalar::U8(0));
    }
}
