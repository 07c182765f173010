//! Operation tags understood by kernels.

use std::cmp::Ordering;

use ndstride_traits::{DType, Element};

/// Elementwise operation on one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Identity,
    Neg,
    Abs,
    Square,
    Sqrt,
    Exp,
    Ln,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Identity => "identity",
            UnaryOp::Neg => "neg",
            UnaryOp::Abs => "abs",
            UnaryOp::Square => "square",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Exp => "exp",
            UnaryOp::Ln => "ln",
        }
    }

    /// Transcendental ops need a float dtype; negation needs a signed one.
    pub fn supports(self, dtype: DType) -> bool {
        match self {
            UnaryOp::Sqrt | UnaryOp::Exp | UnaryOp::Ln => dtype.is_float(),
            UnaryOp::Neg => dtype.is_signed(),
            UnaryOp::Identity | UnaryOp::Abs | UnaryOp::Square => true,
        }
    }

    #[inline(always)]
    pub fn apply<T: Element>(self, x: T) -> T {
        match self {
            UnaryOp::Identity => x,
            UnaryOp::Neg => T::zero().elem_sub(x),
            UnaryOp::Abs => {
                if x < T::zero() {
                    T::zero().elem_sub(x)
                } else {
                    x
                }
            }
            UnaryOp::Square => x.elem_mul(x),
            UnaryOp::Sqrt => T::from_f64(x.to_f64().sqrt()),
            UnaryOp::Exp => T::from_f64(x.to_f64().exp()),
            UnaryOp::Ln => T::from_f64(x.to_f64().ln()),
        }
    }
}

/// Elementwise operation on two operands of the same dtype.
///
/// Comparisons write a `u8` mask (1 for true, 0 for false).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Maximum,
    Minimum,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Maximum => "maximum",
            BinaryOp::Minimum => "minimum",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
        }
    }

    #[inline]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    /// Arithmetic result. Comparisons map to 1 or 0 in `T`.
    #[inline(always)]
    pub fn apply<T: Element>(self, a: T, b: T) -> T {
        match self {
            BinaryOp::Add => a.elem_add(b),
            BinaryOp::Sub => a.elem_sub(b),
            BinaryOp::Mul => a.elem_mul(b),
            BinaryOp::Div => a.elem_div(b),
            BinaryOp::Maximum => maximum(a, b),
            BinaryOp::Minimum => minimum(a, b),
            _ => {
                if self.compare(a, b) {
                    T::one()
                } else {
                    T::zero()
                }
            }
        }
    }

    /// Comparison result; arithmetic ops return false.
    #[inline(always)]
    pub fn compare<T: Element>(self, a: T, b: T) -> bool {
        match self {
            BinaryOp::Eq => a == b,
            BinaryOp::Ne => a != b,
            BinaryOp::Lt => a < b,
            BinaryOp::Le => a <= b,
            BinaryOp::Gt => a > b,
            BinaryOp::Ge => a >= b,
            _ => false,
        }
    }
}

/// Fold applied along the last axis of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    Sum,
    Prod,
    Max,
    Min,
}

impl ReduceOp {
    pub fn name(self) -> &'static str {
        match self {
            ReduceOp::Sum => "sum",
            ReduceOp::Prod => "prod",
            ReduceOp::Max => "max",
            ReduceOp::Min => "min",
        }
    }

    /// Value of the fold over zero elements, if it has one.
    pub fn identity<T: Element>(self) -> Option<T> {
        match self {
            ReduceOp::Sum => Some(T::zero()),
            ReduceOp::Prod => Some(T::one()),
            ReduceOp::Max | ReduceOp::Min => None,
        }
    }

    #[inline(always)]
    pub fn combine<T: Element>(self, acc: T, x: T) -> T {
        match self {
            ReduceOp::Sum => acc.elem_add(x),
            ReduceOp::Prod => acc.elem_mul(x),
            ReduceOp::Max => maximum(acc, x),
            ReduceOp::Min => minimum(acc, x),
        }
    }
}

/// Larger of `a` and `b`; NaN wins.
#[inline(always)]
fn maximum<T: Element>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Less) => b,
        Some(_) => a,
        None => unordered(a, b),
    }
}

/// Smaller of `a` and `b`; NaN wins.
#[inline(always)]
fn minimum<T: Element>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Greater) => b,
        Some(_) => a,
        None => unordered(a, b),
    }
}

#[inline(always)]
#[allow(clippy::eq_op)]
fn unordered<T: Element>(a: T, b: T) -> T {
    if a != a {
        a
    } else {
        b
    }
}
