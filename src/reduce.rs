//! Reductions on [`Array`].

use ndstride_kernel::{BinaryOp, ReduceOp};
use ndstride_traits::{DType, Scalar};
use ndstride_view::Result;

use crate::array::Array;
use crate::prepare::prepare_axis_reduce;

impl Array {
    /// Fold `axis` away with `op`. The result keeps this array's dtype.
    pub fn reduce_axis(&self, op: ReduceOp, axis: usize) -> Result<Array> {
        let ctx = self.context();
        let prepared = prepare_axis_reduce(ctx, axis, self.view(), self.dtype(), ctx.order())?;
        prepared
            .kernel
            .reduce_last_axis(op, &prepared.target, &prepared.source)?;
        Ok(Array::from_parts(prepared.target, prepared.kernel, ctx.clone()))
    }

    pub fn sum_axis(&self, axis: usize) -> Result<Array> {
        self.reduce_axis(ReduceOp::Sum, axis)
    }

    pub fn prod_axis(&self, axis: usize) -> Result<Array> {
        self.reduce_axis(ReduceOp::Prod, axis)
    }

    pub fn max_axis(&self, axis: usize) -> Result<Array> {
        self.reduce_axis(ReduceOp::Max, axis)
    }

    pub fn min_axis(&self, axis: usize) -> Result<Array> {
        self.reduce_axis(ReduceOp::Min, axis)
    }

    /// Sum over `axis` divided by its extent, in this array's dtype.
    ///
    /// Integer arrays accumulate in `i64` and use integer division, so the
    /// sum and the count never wrap in a narrow dtype.
    pub fn mean_axis(&self, axis: usize) -> Result<Array> {
        let acc = if self.dtype().is_float() {
            self.dtype()
        } else {
            DType::I64
        };
        let sum = self.astype(acc)?.sum_axis(axis)?;
        let count = Scalar::I64(self.shape()[axis] as i64);
        sum.binary_scalar(BinaryOp::Div, count)?.astype(self.dtype())
    }

    /// Fold every element with `op`.
    pub fn reduce_all(&self, op: ReduceOp) -> Result<Scalar> {
        self.flatten()?.reduce_axis(op, 0)?.item()
    }

    pub fn sum(&self) -> Result<Scalar> {
        self.reduce_all(ReduceOp::Sum)
    }

    pub fn prod(&self) -> Result<Scalar> {
        self.reduce_all(ReduceOp::Prod)
    }

    pub fn max(&self) -> Result<Scalar> {
        self.reduce_all(ReduceOp::Max)
    }

    pub fn min(&self) -> Result<Scalar> {
        self.reduce_all(ReduceOp::Min)
    }

    pub fn mean(&self) -> Result<Scalar> {
        self.flatten()?.mean_axis(0)?.item()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndstride_view::NdError;

    use super::*;

    #[test]
    fn test_sum_axis_shapes() {
        let a = Array::arange(0i32, 8, 1).unwrap().reshape(&[2, 4]).unwrap();
        let rows = a.sum_axis(1).unwrap();
        assert_eq!(rows.shape(), &[2]);
        assert_eq!(rows.to_vec::<i32>().unwrap(), vec![6, 22]);
        let cols = a.sum_axis(0).unwrap();
        assert_eq!(cols.to_vec::<i32>().unwrap(), vec![4, 6, 8, 10]);
    }

    #[test]
    fn test_axis_out_of_range() {
        let a = Array::zeros(DType::F32, &[2, 4]).unwrap();
        assert!(matches!(
            a.sum_axis(2),
            Err(NdError::AxisOutOfRange { axis: 2, rank: 2 })
        ));
        assert!(a.mean_axis(5).is_err());
    }

    #[test]
    fn test_max_min() {
        let a = Array::from_vec(vec![3.0f64, -1.0, 7.0, 2.0], &[2, 2]).unwrap();
        assert_eq!(a.max_axis(0).unwrap().to_vec::<f64>().unwrap(), vec![7.0, 2.0]);
        assert_eq!(a.min_axis(1).unwrap().to_vec::<f64>().unwrap(), vec![-1.0, 2.0]);
        assert_eq!(a.max().unwrap(), Scalar::F64(7.0));
        assert_eq!(a.min().unwrap(), Scalar::F64(-1.0));
    }

    #[test]
    fn test_max_of_empty_fails() {
        let a = Array::zeros(DType::I64, &[0]).unwrap();
        assert_eq!(a.max().unwrap_err(), NdError::EmptyInput("max"));
        assert_eq!(a.sum().unwrap(), Scalar::I64(0));
        assert_eq!(a.prod().unwrap(), Scalar::I64(1));
    }

    #[test]
    fn test_mean() {
        let a = Array::from_vec(vec![1.0f64, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let m = a.mean_axis(0).unwrap();
        assert_eq!(m.to_vec::<f64>().unwrap(), vec![2.0, 3.0]);
        assert_relative_eq!(a.mean().unwrap().to_f64(), 2.5);
        let ints = Array::from_vec(vec![1i32, 2], &[2]).unwrap();
        assert_eq!(ints.mean().unwrap(), Scalar::I32(1));
    }

    #[test]
    fn test_mean_of_narrow_ints_does_not_wrap() {
        let ones = Array::ones(DType::U8, &[256]).unwrap();
        assert_eq!(ones.mean().unwrap(), Scalar::U8(1));
        let big = Array::full(&[2, 300], Scalar::U8(200)).unwrap();
        let m = big.mean_axis(1).unwrap();
        assert_eq!(m.dtype(), DType::U8);
        assert_eq!(m.to_vec::<u8>().unwrap(), vec![200, 200]);
    }

    #[test]
    fn test_reduce_transposed_and_scalar() {
        let a = Array::arange(1i64, 7, 1).unwrap().reshape(&[2, 3]).unwrap();
        let t = a.transpose().unwrap();
        assert_eq!(t.prod_axis(1).unwrap().to_vec::<i64>().unwrap(), vec![4, 10, 18]);
        assert_eq!(t.sum().unwrap(), Scalar::I64(21));
        let s = Array::scalar(Scalar::F32(2.5)).unwrap();
        assert_eq!(s.sum().unwrap(), Scalar::F32(2.5));
    }
}
