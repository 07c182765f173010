//! Elementwise arithmetic, comparison and tolerance checks on [`Array`].

use ndstride_kernel::{BinaryOp, UnaryOp};
use ndstride_traits::{is_close, DType, Scalar};
use ndstride_view::{broadcast_layouts, NdError, Result};

use crate::array::Array;
use crate::prepare::{coerce, convert_into, prepare_elementwise, prepare_elementwise_sources};

macro_rules! unary_methods {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            pub fn $name(&self) -> Result<Array> {
                self.unary(UnaryOp::$op)
            }
        )*
    };
}

macro_rules! binary_methods {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            pub fn $name(&self, rhs: &Array) -> Result<Array> {
                self.binary(BinaryOp::$op, rhs)
            }
        )*
    };
}

macro_rules! assign_methods {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            pub fn $name(&self, rhs: &Array) -> Result<()> {
                self.binary_into(BinaryOp::$op, rhs, self)
            }
        )*
    };
}

impl Array {
    /// Apply `op` to every element into a fresh array of the same dtype.
    pub fn unary(&self, op: UnaryOp) -> Result<Array> {
        let ctx = self.context();
        let prepared = prepare_elementwise(ctx, self.dtype(), &[self.view()], ctx.order())?;
        prepared
            .kernel
            .unary_op(op, &prepared.target, &prepared.operands[0])?;
        Ok(Array::from_parts(prepared.target, prepared.kernel, ctx.clone()))
    }

    unary_methods! {
        neg => Neg,
        abs => Abs,
        square => Square,
        sqrt => Sqrt,
        exp => Exp,
        ln => Ln,
    }

    /// Broadcasting binary operation into a fresh array.
    ///
    /// Operands are converted to their promoted dtype first. Arithmetic
    /// results have that dtype; comparisons produce a `u8` mask.
    pub fn binary(&self, op: BinaryOp, rhs: &Array) -> Result<Array> {
        let ctx = self.context();
        let dtype = self.dtype().promote(rhs.dtype());
        let lhs_view = coerce(ctx, self.view(), dtype)?;
        let rhs_view = coerce(ctx, rhs.view(), dtype)?;
        let out_dtype = if op.is_comparison() { DType::U8 } else { dtype };
        let prepared = prepare_elementwise(ctx, out_dtype, &[&lhs_view, &rhs_view], ctx.order())?;
        prepared.kernel.binary_op(
            op,
            &prepared.target,
            &prepared.operands[0],
            &prepared.operands[1],
        )?;
        Ok(Array::from_parts(prepared.target, prepared.kernel, ctx.clone()))
    }

    binary_methods! {
        add => Add,
        sub => Sub,
        mul => Mul,
        div => Div,
        maximum => Maximum,
        minimum => Minimum,
        eq => Eq,
        ne => Ne,
        lt => Lt,
        le => Le,
        gt => Gt,
        ge => Ge,
    }

    /// `op(self, value)` with `value` converted to this array's dtype.
    pub fn binary_scalar(&self, op: BinaryOp, value: Scalar) -> Result<Array> {
        let rhs = Array::full_in(self.context(), &[], value.cast(self.dtype()))?;
        self.binary(op, &rhs)
    }

    /// Write `op(self, rhs)` into `out`, broadcasting both operands to
    /// `out`'s shape.
    ///
    /// Arithmetic runs in `out`'s dtype. Comparisons run in the promoted
    /// operand dtype and need a `u8` target. `out` may alias either operand.
    pub fn binary_into(&self, op: BinaryOp, rhs: &Array, out: &Array) -> Result<()> {
        let ctx = self.context();
        let dtype = if op.is_comparison() {
            if out.dtype() != DType::U8 {
                return Err(NdError::DTypeMismatch {
                    expected: DType::U8,
                    found: out.dtype(),
                });
            }
            self.dtype().promote(rhs.dtype())
        } else {
            out.dtype()
        };
        let lhs_view = coerce(ctx, self.view(), dtype)?;
        let rhs_view = coerce(ctx, rhs.view(), dtype)?;
        let sources = prepare_elementwise_sources(out.view(), &[&lhs_view, &rhs_view])?;
        out.kernel()
            .binary_op(op, out.view(), &sources[0], &sources[1])
    }

    assign_methods! {
        add_assign => Add,
        sub_assign => Sub,
        mul_assign => Mul,
        div_assign => Div,
    }

    /// Copy `src` into `self`, broadcasting and converting as needed.
    pub fn assign(&self, src: &Array) -> Result<()> {
        let sources = prepare_elementwise_sources(self.view(), &[src.view()])?;
        convert_into(self.context(), self.kernel().as_ref(), self.view(), &sources[0])
    }

    /// Set every element to `value`.
    pub fn fill(&self, value: Scalar) -> Result<()> {
        self.kernel().fill(self.view(), value)
    }

    /// Elementwise `|self - other| <= atol + rtol * |other|` as a `u8` mask.
    ///
    /// `other` is the reference: swapping the arguments can change the
    /// result.
    pub fn is_close(&self, other: &Array, rtol: f64, atol: f64) -> Result<Array> {
        let (shape, layouts) = broadcast_layouts(&[self.layout(), other.layout()])?;
        let a = self.view().with_layout(layouts[0].clone())?.to_scalars()?;
        let b = other.view().with_layout(layouts[1].clone())?.to_scalars()?;
        let mask: Vec<u8> = a
            .iter()
            .zip(&b)
            .map(|(x, y)| is_close(x.to_f64(), y.to_f64(), rtol, atol) as u8)
            .collect();
        Array::from_vec_in(self.context(), mask, &shape)
    }

    /// True when every element of `self` is close to the matching element of
    /// `other` (the reference).
    pub fn all_close(&self, other: &Array, rtol: f64, atol: f64) -> Result<bool> {
        let mask = self.is_close(other, rtol, atol)?;
        Ok(mask.to_vec::<u8>()?.iter().all(|&m| m == 1))
    }
}
