//! Operation preparation.
//!
//! Each `prepare_*` function resolves shapes, allocates the target through
//! the context's allocator when one is needed, and reshapes the operands
//! into views a [`Kernel`] can walk directly. Nothing is cached between
//! calls.

use std::sync::Arc;

use log::debug;
use ndstride_kernel::Kernel;
use ndstride_traits::DType;
use ndstride_view::{
    broadcast_layouts, concat_geometry, fmt_shape, Layout, MemoryOrder, NdError, Result, View,
};

use crate::context::Context;

/// Target and operands of an elementwise operation, all of one shape.
#[derive(Debug, Clone)]
pub struct PreparedElementwise {
    pub target: View,
    pub operands: Vec<View>,
    pub kernel: Arc<dyn Kernel>,
}

/// Target and source of an axis reduction; the reduced axis is the last
/// axis of `source`.
#[derive(Debug, Clone)]
pub struct PreparedReduce {
    pub target: View,
    pub source: View,
    pub kernel: Arc<dyn Kernel>,
}

/// Fresh concatenation target and, per source, the slice of the target it
/// is copied into.
#[derive(Debug, Clone)]
pub struct PreparedConcat {
    pub target: View,
    /// `(target slice, source)` pairs of equal shape.
    pub segments: Vec<(View, View)>,
    pub kernel: Arc<dyn Kernel>,
}

/// Allocate a contiguous view of `shape` through the context's allocator.
pub(crate) fn allocate(
    ctx: &Context,
    dtype: DType,
    shape: &[usize],
    order: MemoryOrder,
) -> Result<(View, Arc<dyn Kernel>)> {
    let layout = Layout::with_order(shape, order);
    let (storage, kernel) = ctx.allocator().allocate(dtype, &layout)?;
    Ok((View::new(storage, layout)?, kernel))
}

/// Broadcast `operands` together and allocate a target of the common shape.
pub fn prepare_elementwise(
    ctx: &Context,
    dtype: DType,
    operands: &[&View],
    order: MemoryOrder,
) -> Result<PreparedElementwise> {
    if operands.is_empty() {
        return Err(NdError::EmptyInput("elementwise operation"));
    }
    let layouts: Vec<&Layout> = operands.iter().map(|v| v.layout()).collect();
    let (shape, broadcast) = broadcast_layouts(&layouts)?;
    let (target, kernel) = allocate(ctx, dtype, &shape, order)?;
    let operands = operands
        .iter()
        .zip(broadcast)
        .map(|(view, layout)| view.with_layout(layout))
        .collect::<Result<Vec<_>>>()?;
    debug!(
        "prepared elementwise: {} operand(s) -> {} {dtype}",
        operands.len(),
        fmt_shape(&shape)
    );
    Ok(PreparedElementwise {
        target,
        operands,
        kernel,
    })
}

/// Broadcast each operand to an existing target's shape.
///
/// Only the operands are reshaped; the target is never extended.
pub fn prepare_elementwise_sources(target: &View, operands: &[&View]) -> Result<Vec<View>> {
    operands
        .iter()
        .enumerate()
        .map(|(i, view)| {
            let layout = view
                .layout()
                .broadcast_to(target.shape())
                .map_err(|_| NdError::ShapeMismatch {
                    operand: Some(i),
                    expected: target.shape().to_vec(),
                    found: view.shape().to_vec(),
                })?;
            view.with_layout(layout)
        })
        .collect()
}

/// Move `axis` of `source` last and allocate a target without it.
pub fn prepare_axis_reduce(
    ctx: &Context,
    axis: usize,
    source: &View,
    dtype: DType,
    order: MemoryOrder,
) -> Result<PreparedReduce> {
    let rank = source.ndim();
    if axis >= rank {
        return Err(NdError::AxisOutOfRange { axis, rank });
    }
    let target_shape = source.layout().remove_axis(axis)?.shape().to_vec();
    let perm: Vec<usize> = (0..rank)
        .filter(|&i| i != axis)
        .chain(std::iter::once(axis))
        .collect();
    let source = source.map_layout(|l| l.permute(&perm))?;
    let (target, kernel) = allocate(ctx, dtype, &target_shape, order)?;
    debug!(
        "prepared reduce over axis {axis}: {} -> {} {dtype}",
        fmt_shape(source.shape()),
        fmt_shape(&target_shape)
    );
    Ok(PreparedReduce {
        target,
        source,
        kernel,
    })
}

/// Allocate the concatenation of `sources` along `axis` and pair each
/// source with its destination slice.
///
/// The target dtype is the promotion of all source dtypes.
pub fn prepare_concat(
    ctx: &Context,
    axis: usize,
    sources: &[&View],
    order: MemoryOrder,
) -> Result<PreparedConcat> {
    let layouts: Vec<&Layout> = sources.iter().map(|v| v.layout()).collect();
    let geometry = concat_geometry(axis, &layouts)?;
    let dtype = sources
        .iter()
        .map(|v| v.dtype())
        .reduce(DType::promote)
        .ok_or(NdError::EmptyInput("concat"))?;
    let (target, kernel) = allocate(ctx, dtype, &geometry.shape, order)?;
    let segments = sources
        .iter()
        .zip(&geometry.ranges)
        .map(|(source, range)| {
            let slot = target.map_layout(|l| l.narrow(axis, range.start, range.len()))?;
            Ok((slot, (*source).clone()))
        })
        .collect::<Result<Vec<_>>>()?;
    debug!(
        "prepared concat of {} source(s) along axis {axis} -> {} {dtype}",
        sources.len(),
        fmt_shape(&geometry.shape)
    );
    Ok(PreparedConcat {
        target,
        segments,
        kernel,
    })
}

/// Copy `source` into `target` with `kernel`.
///
/// A dtype change runs through the conversion primitive the context
/// registers for the target dtype (`UnsupportedDType` if there is none).
pub fn convert_into(ctx: &Context, kernel: &dyn Kernel, target: &View, source: &View) -> Result<()> {
    if target.dtype() == source.dtype() {
        return kernel.convert(target, source);
    }
    let convert = ctx.primitives(target.dtype())?.convert;
    kernel.convert_with(target, source, convert)
}

/// Convert `view` to `dtype`, copying into fresh contiguous storage.
///
/// Returns the view itself when the dtype already matches. The target dtype
/// must be registered in the context.
pub fn coerce(ctx: &Context, view: &View, dtype: DType) -> Result<View> {
    if view.dtype() == dtype {
        return Ok(view.clone());
    }
    let convert = ctx.primitives(dtype)?.convert;
    let (target, kernel) = allocate(ctx, dtype, view.shape(), ctx.order())?;
    debug!(
        "coercing {} {} -> {dtype}",
        fmt_shape(view.shape()),
        view.dtype()
    );
    kernel.convert_with(&target, view, convert)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndstride_kernel::CpuKernel;
    use ndstride_traits::{PrimitiveRegistry, Primitives, Scalar};

    fn view_i32(data: Vec<i32>, shape: &[usize]) -> View {
        View::from_vec(data, shape).unwrap()
    }

    #[test]
    fn test_prepare_elementwise_broadcasts() {
        let ctx = Context::default();
        let a = view_i32(vec![1, 2, 3, 4], &[4, 1]);
        let b = view_i32(vec![10, 20, 30], &[3]);
        let p = prepare_elementwise(&ctx, DType::I32, &[&a, &b], MemoryOrder::RowMajor).unwrap();
        assert_eq!(p.target.shape(), &[4, 3]);
        assert!(p.target.layout().is_c_contiguous());
        assert_eq!(p.operands[0].shape(), &[4, 3]);
        assert_eq!(p.operands[0].layout().stride(), &[1, 0]);
        assert!(p.operands[1].aliases(&b));
        assert!(!p.target.aliases(&a));
    }

    #[test]
    fn test_prepare_elementwise_column_major_target() {
        let ctx = Context::default();
        let a = view_i32(vec![0; 6], &[2, 3]);
        let p = prepare_elementwise(&ctx, DType::F64, &[&a], MemoryOrder::ColMajor).unwrap();
        assert!(p.target.layout().is_f_contiguous());
        assert_eq!(p.target.dtype(), DType::F64);
    }

    #[test]
    fn test_prepare_elementwise_errors() {
        let ctx = Context::default();
        assert_eq!(
            prepare_elementwise(&ctx, DType::I32, &[], MemoryOrder::RowMajor).unwrap_err(),
            NdError::EmptyInput("elementwise operation")
        );
        let a = view_i32(vec![0; 2], &[2]);
        let b = view_i32(vec![0; 3], &[3]);
        assert!(matches!(
            prepare_elementwise(&ctx, DType::I32, &[&a, &b], MemoryOrder::RowMajor),
            Err(NdError::NotBroadcastable(_))
        ));
    }

    #[test]
    fn test_prepare_sources_never_grows_target() {
        let target = view_i32(vec![0; 3], &[3]);
        let small = view_i32(vec![5], &[1]);
        let big = view_i32(vec![0; 6], &[2, 3]);
        let ops = prepare_elementwise_sources(&target, &[&small]).unwrap();
        assert_eq!(ops[0].layout().stride(), &[0]);
        assert_eq!(
            prepare_elementwise_sources(&target, &[&small, &big]).unwrap_err(),
            NdError::ShapeMismatch {
                operand: Some(1),
                expected: vec![3],
                found: vec![2, 3],
            }
        );
    }

    #[test]
    fn test_prepare_axis_reduce_moves_axis_last() {
        let ctx = Context::default();
        let a = view_i32((0..24).collect(), &[2, 3, 4]);
        let p = prepare_axis_reduce(&ctx, 1, &a, DType::I32, MemoryOrder::RowMajor).unwrap();
        assert_eq!(p.target.shape(), &[2, 4]);
        assert_eq!(p.source.shape(), &[2, 4, 3]);
        assert_eq!(p.source.layout().stride(), &[12, 1, 4]);
        assert!(matches!(
            prepare_axis_reduce(&ctx, 3, &a, DType::I32, MemoryOrder::RowMajor),
            Err(NdError::AxisOutOfRange { axis: 3, rank: 3 })
        ));
    }

    #[test]
    fn test_prepare_concat_segments() {
        let ctx = Context::default();
        let a = view_i32(vec![0; 4 * 28], &[4, 28]);
        let b = View::from_vec(vec![0.0f32; 4 * 15], &[4, 15]).unwrap();
        let p = prepare_concat(&ctx, 1, &[&a, &b], MemoryOrder::RowMajor).unwrap();
        assert_eq!(p.target.shape(), &[4, 43]);
        assert_eq!(p.target.dtype(), DType::F64);
        assert_eq!(p.segments[1].0.shape(), &[4, 15]);
        assert_eq!(p.segments[1].0.layout().offset(), 28);
        assert!(p.segments[1].0.aliases(&p.target));
    }

    #[test]
    fn test_coerce() {
        let ctx = Context::default();
        let a = view_i32(vec![1, 2, 3], &[3]);
        assert!(coerce(&ctx, &a, DType::I32).unwrap().aliases(&a));
        let f = coerce(&ctx, &a, DType::F32).unwrap();
        assert_eq!(f.to_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(!f.aliases(&a));

        let bare = Context::builder().registry(PrimitiveRegistry::empty()).build();
        assert_eq!(
            coerce(&bare, &a, DType::F64).unwrap_err(),
            NdError::UnsupportedDType(DType::F64)
        );
    }

    fn seven(_: Scalar) -> Scalar {
        Scalar::F64(7.0)
    }

    fn sevens_context() -> Context {
        let mut registry = PrimitiveRegistry::builtin();
        let mut f64_prims = Primitives::of::<f64>();
        f64_prims.convert = seven;
        registry.register(f64_prims);
        Context::builder().registry(registry).build()
    }

    #[test]
    fn test_coerce_uses_registered_conversion() {
        let ctx = sevens_context();
        let a = view_i32(vec![1, 2], &[2]);
        let f = coerce(&ctx, &a, DType::F64).unwrap();
        assert_eq!(f.to_vec::<f64>().unwrap(), vec![7.0, 7.0]);
        // matching dtypes copy without converting
        let same = View::from_vec(vec![1.5f64], &[1]).unwrap();
        let (target, kernel) = allocate(&ctx, DType::F64, &[1], MemoryOrder::RowMajor).unwrap();
        convert_into(&ctx, kernel.as_ref(), &target, &same).unwrap();
        assert_eq!(target.to_vec::<f64>().unwrap(), vec![1.5]);
    }

    #[test]
    fn test_convert_into_unregistered_target() {
        let bare = Context::builder().registry(PrimitiveRegistry::empty()).build();
        let a = view_i32(vec![1], &[1]);
        let target = View::from_vec(vec![0.0f32], &[1]).unwrap();
        assert_eq!(
            convert_into(&bare, &CpuKernel, &target, &a).unwrap_err(),
            NdError::UnsupportedDType(DType::F32)
        );
    }
}
