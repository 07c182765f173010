//! Reference CPU kernel.

use std::ops::Deref;
use std::sync::RwLockReadGuard;

use log::trace;
use ndstride_traits::{with_dtype, Buffer, DType, Element, Scalar, ScalarConvertFn};
use ndstride_view::{Layout, NdError, Result, View};

use crate::kernel::{contiguous_range, ensure_same_shape, Kernel};
use crate::maybe_sync::MaybeSync;
use crate::ops::{BinaryOp, ReduceOp, UnaryOp};

/// Contiguous fast paths longer than this run on rayon when the `parallel`
/// feature is enabled.
pub const PARALLEL_THRESHOLD: usize = 1 << 15;

/// Kernel that walks views on the calling thread (or rayon, for large
/// contiguous inputs with `parallel`).
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuKernel;

impl CpuKernel {
    pub fn new() -> Self {
        CpuKernel
    }
}

// ============================================================================
// Buffer access
// ============================================================================

/// Read access to a source buffer for the duration of one call.
enum Source<'a> {
    Locked(RwLockReadGuard<'a, Buffer>),
    Snapshot(Buffer),
}

impl Deref for Source<'_> {
    type Target = Buffer;

    fn deref(&self) -> &Buffer {
        match self {
            Source::Locked(guard) => guard,
            Source::Snapshot(buffer) => buffer,
        }
    }
}

/// Lock `source` for reading, or copy it if it shares storage with `target`.
fn acquire<'a>(source: &'a View, target: &View) -> Result<Source<'a>> {
    if source.aliases(target) {
        trace!("source aliases target; reading {} elements from a snapshot", source.storage().len());
        Ok(Source::Snapshot(source.storage().snapshot()?))
    } else {
        Ok(Source::Locked(source.storage().read()?))
    }
}

fn typed<T: Element>(buffer: &Buffer) -> Result<&[T]> {
    buffer.as_slice::<T>().ok_or(NdError::DTypeMismatch {
        expected: T::DTYPE,
        found: buffer.dtype(),
    })
}

fn typed_mut<T: Element>(buffer: &mut Buffer) -> Result<&mut [T]> {
    let found = buffer.dtype();
    buffer.as_slice_mut::<T>().ok_or(NdError::DTypeMismatch {
        expected: T::DTYPE,
        found,
    })
}

fn ensure_dtype(expected: DType, found: DType) -> Result<()> {
    if expected != found {
        return Err(NdError::DTypeMismatch { expected, found });
    }
    Ok(())
}

// ============================================================================
// Inner loops
// ============================================================================

/// `dst[i] = f(src[i])` over two layouts of equal shape.
fn map_into<S, D, F>(dst: &mut [D], dst_layout: &Layout, src: &[S], src_layout: &Layout, f: F)
where
    S: Element,
    D: Element,
    F: Fn(S) -> D + MaybeSync,
{
    if let (Some(dr), Some(sr)) = (contiguous_range(dst_layout), contiguous_range(src_layout)) {
        trace!("map: contiguous fast path over {} elements", dr.len());
        let dst = &mut dst[dr];
        let src = &src[sr];

        #[cfg(feature = "parallel")]
        {
            if dst.len() > PARALLEL_THRESHOLD {
                use rayon::prelude::*;
                dst.par_iter_mut()
                    .zip(src.par_iter())
                    .for_each(|(d, &s)| *d = f(s));
                return;
            }
        }

        for (d, &s) in dst.iter_mut().zip(src) {
            *d = f(s);
        }
        return;
    }

    for (di, si) in dst_layout.offsets().zip(src_layout.offsets()) {
        dst[di as usize] = f(src[si as usize]);
    }
}

/// `dst[i] = f(a[i], b[i])` over three layouts of equal shape.
fn zip_map_into<S, D, F>(
    dst: &mut [D],
    dst_layout: &Layout,
    a: &[S],
    a_layout: &Layout,
    b: &[S],
    b_layout: &Layout,
    f: F,
) where
    S: Element,
    D: Element,
    F: Fn(S, S) -> D + MaybeSync,
{
    if let (Some(dr), Some(ar), Some(br)) = (
        contiguous_range(dst_layout),
        contiguous_range(a_layout),
        contiguous_range(b_layout),
    ) {
        trace!("zip_map: contiguous fast path over {} elements", dr.len());
        let dst = &mut dst[dr];
        let a = &a[ar];
        let b = &b[br];

        #[cfg(feature = "parallel")]
        {
            if dst.len() > PARALLEL_THRESHOLD {
                use rayon::prelude::*;
                dst.par_iter_mut()
                    .zip(a.par_iter().zip(b.par_iter()))
                    .for_each(|(d, (&x, &y))| *d = f(x, y));
                return;
            }
        }

        for ((d, &x), &y) in dst.iter_mut().zip(a).zip(b) {
            *d = f(x, y);
        }
        return;
    }

    let offsets = dst_layout
        .offsets()
        .zip(a_layout.offsets())
        .zip(b_layout.offsets());
    for ((di, ai), bi) in offsets {
        dst[di as usize] = f(a[ai as usize], b[bi as usize]);
    }
}

/// Fold `values` with `op`.
///
/// The caller rejects empty rows for folds without an identity.
#[inline]
fn fold_values<T: Element>(op: ReduceOp, mut values: impl Iterator<Item = T>) -> T {
    let init = match op.identity() {
        Some(v) => v,
        None => match values.next() {
            Some(v) => v,
            None => return T::zero(),
        },
    };
    values.fold(init, |acc, x| op.combine(acc, x))
}

/// Fold `len` elements of `src` starting at `start` with step `stride`.
#[inline]
fn fold_row<T: Element>(op: ReduceOp, src: &[T], start: isize, len: usize, stride: isize) -> T {
    if stride == 1 && start >= 0 {
        let begin = start as usize;
        fold_values(op, src[begin..begin + len].iter().copied())
    } else {
        fold_values(
            op,
            (0..len).map(|k| src[(start + k as isize * stride) as usize]),
        )
    }
}

// ============================================================================
// Kernel implementation
// ============================================================================

impl Kernel for CpuKernel {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn unary_op(&self, op: UnaryOp, target: &View, source: &View) -> Result<()> {
        ensure_same_shape(target.shape(), source.shape())?;
        let dtype = source.dtype();
        ensure_dtype(dtype, target.dtype())?;
        if !op.supports(dtype) {
            return Err(NdError::UnsupportedOp {
                op: op.name(),
                dtype,
            });
        }

        let src = acquire(source, target)?;
        let mut dst = target.storage().write()?;
        with_dtype!(dtype, T => {
            let s = typed::<T>(&src)?;
            let d = typed_mut::<T>(&mut dst)?;
            map_into(d, target.layout(), s, source.layout(), move |x: T| op.apply(x));
        });
        Ok(())
    }

    fn binary_op(&self, op: BinaryOp, target: &View, lhs: &View, rhs: &View) -> Result<()> {
        ensure_same_shape(target.shape(), lhs.shape())?;
        ensure_same_shape(target.shape(), rhs.shape())?;
        let dtype = lhs.dtype();
        ensure_dtype(dtype, rhs.dtype())?;
        let out_dtype = if op.is_comparison() { DType::U8 } else { dtype };
        ensure_dtype(out_dtype, target.dtype())?;

        let lhs_buf = acquire(lhs, target)?;
        // A second read lock on the same buffer from this thread may deadlock.
        let rhs_buf = if rhs.aliases(lhs) {
            None
        } else {
            Some(acquire(rhs, target)?)
        };
        let rhs_ref: &Buffer = rhs_buf.as_deref().unwrap_or(&*lhs_buf);
        let mut dst = target.storage().write()?;

        with_dtype!(dtype, T => {
            let a = typed::<T>(&lhs_buf)?;
            let b = typed::<T>(rhs_ref)?;
            if op.is_comparison() {
                let d = typed_mut::<u8>(&mut dst)?;
                zip_map_into(d, target.layout(), a, lhs.layout(), b, rhs.layout(),
                    move |x: T, y: T| op.compare(x, y) as u8);
            } else {
                let d = typed_mut::<T>(&mut dst)?;
                zip_map_into(d, target.layout(), a, lhs.layout(), b, rhs.layout(),
                    move |x: T, y: T| op.apply(x, y));
            }
        });
        Ok(())
    }

    fn reduce_last_axis(&self, op: ReduceOp, target: &View, source: &View) -> Result<()> {
        let rank = source.ndim();
        if rank == 0 {
            return Err(NdError::AxisOutOfRange { axis: 0, rank: 0 });
        }
        ensure_same_shape(&source.shape()[..rank - 1], target.shape())?;
        let dtype = source.dtype();
        ensure_dtype(dtype, target.dtype())?;

        let axis_len = source.shape()[rank - 1];
        let axis_stride = source.layout().stride()[rank - 1];
        if axis_len == 0 && !target.is_empty() && matches!(op, ReduceOp::Max | ReduceOp::Min) {
            return Err(NdError::EmptyInput(op.name()));
        }
        let rows = source.layout().cut_right()?;

        let src = acquire(source, target)?;
        let mut dst = target.storage().write()?;
        with_dtype!(dtype, T => {
            let s = typed::<T>(&src)?;
            let d = typed_mut::<T>(&mut dst)?;
            for (di, si) in target.layout().offsets().zip(rows.offsets()) {
                d[di as usize] = fold_row(op, s, si, axis_len, axis_stride);
            }
        });
        Ok(())
    }

    fn convert(&self, target: &View, source: &View) -> Result<()> {
        ensure_same_shape(target.shape(), source.shape())?;
        let src = acquire(source, target)?;
        let mut dst = target.storage().write()?;
        with_dtype!(source.dtype(), S => {
            let s = typed::<S>(&src)?;
            with_dtype!(target.dtype(), D => {
                let d = typed_mut::<D>(&mut dst)?;
                map_into(d, target.layout(), s, source.layout(),
                    |x: S| D::from_scalar(x.into_scalar()));
            })
        });
        Ok(())
    }

    fn convert_with(&self, target: &View, source: &View, convert: ScalarConvertFn) -> Result<()> {
        ensure_same_shape(target.shape(), source.shape())?;
        let src = acquire(source, target)?;
        let mut dst = target.storage().write()?;
        with_dtype!(source.dtype(), S => {
            let s = typed::<S>(&src)?;
            with_dtype!(target.dtype(), D => {
                let d = typed_mut::<D>(&mut dst)?;
                map_into(d, target.layout(), s, source.layout(),
                    |x: S| D::from_scalar(convert(x.into_scalar())));
            })
        });
        Ok(())
    }

    fn fill(&self, target: &View, value: Scalar) -> Result<()> {
        let mut dst = target.storage().write()?;
        with_dtype!(target.dtype(), T => {
            let v = T::from_scalar(value);
            let d = typed_mut::<T>(&mut dst)?;
            match contiguous_range(target.layout()) {
                Some(range) => d[range].fill(v),
                None => {
                    for i in target.layout().offsets() {
                        d[i as usize] = v;
                    }
                }
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndstride_view::Storage;

    fn view<T: Element>(data: Vec<T>, shape: &[usize]) -> View {
        View::from_vec(data, shape).unwrap()
    }

    fn zeros(dtype: DType, shape: &[usize]) -> View {
        let layout = Layout::contiguous(shape);
        View::new(Storage::zeros(dtype, layout.len()), layout).unwrap()
    }

    #[test]
    fn test_binary_contiguous() {
        let a = view(vec![1.0f64, 2.0, 3.0], &[3]);
        let b = view(vec![10.0f64, 20.0, 30.0], &[3]);
        let out = zeros(DType::F64, &[3]);
        CpuKernel.binary_op(BinaryOp::Add, &out, &a, &b).unwrap();
        assert_eq!(out.to_vec::<f64>().unwrap(), vec![11.0, 22.0, 33.0]);
    }

    #[test]
    fn test_binary_broadcast_operand() {
        let a = view((0..6).collect::<Vec<i32>>(), &[2, 3]);
        let row = view(vec![100i32, 200, 300], &[3]);
        let row_b = row.map_layout(|l| l.broadcast_to(&[2, 3])).unwrap();
        let out = zeros(DType::I32, &[2, 3]);
        CpuKernel.binary_op(BinaryOp::Add, &out, &a, &row_b).unwrap();
        assert_eq!(
            out.to_vec::<i32>().unwrap(),
            vec![100, 201, 302, 103, 204, 305]
        );
    }

    #[test]
    fn test_comparison_writes_mask() {
        let a = view(vec![1.0f32, 5.0, 3.0], &[3]);
        let b = view(vec![2.0f32, 2.0, 3.0], &[3]);
        let out = zeros(DType::U8, &[3]);
        CpuKernel.binary_op(BinaryOp::Ge, &out, &a, &b).unwrap();
        assert_eq!(out.to_vec::<u8>().unwrap(), vec![0, 1, 1]);

        let wrong = zeros(DType::F32, &[3]);
        assert!(matches!(
            CpuKernel.binary_op(BinaryOp::Ge, &wrong, &a, &b),
            Err(NdError::DTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_binary_checks() {
        let a = view(vec![1i64, 2], &[2]);
        let b = view(vec![1i32, 2], &[2]);
        let out = zeros(DType::I64, &[2]);
        assert!(matches!(
            CpuKernel.binary_op(BinaryOp::Add, &out, &a, &b),
            Err(NdError::DTypeMismatch { .. })
        ));
        let c = view(vec![1i64, 2, 3], &[3]);
        assert!(matches!(
            CpuKernel.binary_op(BinaryOp::Add, &out, &a, &c),
            Err(NdError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_binary_same_storage_operands() {
        let a = view(vec![1i32, 2, 3], &[3]);
        let out = zeros(DType::I32, &[3]);
        CpuKernel.binary_op(BinaryOp::Mul, &out, &a, &a).unwrap();
        assert_eq!(out.to_vec::<i32>().unwrap(), vec![1, 4, 9]);
    }

    #[test]
    fn test_in_place_transpose_add_reads_snapshot() {
        // a += a^T must read the original a everywhere.
        let a = view(vec![1.0f64, 2.0, 3.0, 4.0], &[2, 2]);
        let at = a.map_layout(|l| Ok(l.transpose())).unwrap();
        CpuKernel.binary_op(BinaryOp::Add, &a, &a, &at).unwrap();
        assert_eq!(a.to_vec::<f64>().unwrap(), vec![2.0, 5.0, 5.0, 8.0]);
    }

    #[test]
    fn test_unary_strided_source() {
        let a = view(vec![1.0f64, 4.0, 9.0, 16.0], &[2, 2]);
        let at = a.map_layout(|l| Ok(l.transpose())).unwrap();
        let out = zeros(DType::F64, &[2, 2]);
        CpuKernel.unary_op(UnaryOp::Sqrt, &out, &at).unwrap();
        assert_eq!(out.to_vec::<f64>().unwrap(), vec![1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn test_unary_unsupported() {
        let a = view(vec![1u8, 2], &[2]);
        let out = zeros(DType::U8, &[2]);
        assert_eq!(
            CpuKernel.unary_op(UnaryOp::Neg, &out, &a).unwrap_err(),
            NdError::UnsupportedOp {
                op: "neg",
                dtype: DType::U8
            }
        );
    }

    #[test]
    fn test_reduce_rows() {
        let a = view((0..8).collect::<Vec<i64>>(), &[2, 4]);
        let out = zeros(DType::I64, &[2]);
        CpuKernel.reduce_last_axis(ReduceOp::Sum, &out, &a).unwrap();
        assert_eq!(out.to_vec::<i64>().unwrap(), vec![6, 22]);
    }

    #[test]
    fn test_reduce_strided_axis() {
        let a = view((0..8).collect::<Vec<i64>>(), &[2, 4]);
        let at = a.map_layout(|l| Ok(l.transpose())).unwrap();
        let out = zeros(DType::I64, &[4]);
        CpuKernel.reduce_last_axis(ReduceOp::Max, &out, &at).unwrap();
        assert_eq!(out.to_vec::<i64>().unwrap(), vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_reduce_empty_axis() {
        let a = zeros(DType::F64, &[3, 0]);
        let out = zeros(DType::F64, &[3]);
        CpuKernel.reduce_last_axis(ReduceOp::Prod, &out, &a).unwrap();
        assert_eq!(out.to_vec::<f64>().unwrap(), vec![1.0, 1.0, 1.0]);
        assert_eq!(
            CpuKernel.reduce_last_axis(ReduceOp::Min, &out, &a).unwrap_err(),
            NdError::EmptyInput("min")
        );
    }

    #[test]
    fn test_reduce_shape_check() {
        let a = view(vec![1.0f32; 6], &[2, 3]);
        let out = zeros(DType::F32, &[3]);
        assert!(matches!(
            CpuKernel.reduce_last_axis(ReduceOp::Sum, &out, &a),
            Err(NdError::ShapeMismatch { .. })
        ));
        let scalar = view(vec![1.0f32], &[]);
        assert!(CpuKernel.reduce_last_axis(ReduceOp::Sum, &out, &scalar).is_err());
    }

    #[test]
    fn test_convert_between_dtypes() {
        let a = view(vec![1.9f64, -2.5, 300.0], &[3]);
        let out = zeros(DType::I32, &[3]);
        CpuKernel.convert(&out, &a).unwrap();
        assert_eq!(out.to_vec::<i32>().unwrap(), vec![1, -2, 300]);
        let bytes = zeros(DType::U8, &[3]);
        CpuKernel.convert(&bytes, &out).unwrap();
        assert_eq!(bytes.to_vec::<u8>().unwrap(), vec![1, 254, 44]);
    }

    #[test]
    fn test_convert_with_primitive() {
        fn rounded(v: Scalar) -> Scalar {
            Scalar::I32(v.to_f64().round() as i32)
        }
        let a = view(vec![1.9f64, -2.5, 0.4, 3.5], &[2, 2]);
        let out = zeros(DType::I32, &[2, 2]);
        let source = a.map_layout(|l| Ok(l.transpose())).unwrap();
        CpuKernel.convert_with(&out, &source, rounded).unwrap();
        assert_eq!(out.to_vec::<i32>().unwrap(), vec![2, 0, -3, 4]);
        let short = zeros(DType::I32, &[3]);
        assert!(matches!(
            CpuKernel.convert_with(&short, &a, rounded),
            Err(NdError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_fill_strided_target() {
        let a = zeros(DType::I32, &[3, 3]);
        let diag = a.map_layout(|l| l.diag_axis(0, 1)).unwrap();
        CpuKernel.fill(&diag, Scalar::F64(7.0)).unwrap();
        assert_eq!(
            a.to_vec::<i32>().unwrap(),
            vec![7, 0, 0, 0, 7, 0, 0, 0, 7]
        );
    }
}
