//! User-facing N-dimensional array.

use std::fmt;
use std::sync::Arc;

use ndstride_kernel::Kernel;
use ndstride_traits::{DType, Element, Scalar};
use ndstride_view::{Layout, MemoryOrder, NdError, RangeToken, Result, Selector, View};
use num_traits::Zero;

use crate::context::Context;
use crate::prepare::{allocate, coerce, convert_into, prepare_concat};

/// A view over shared storage plus the kernel and context that operate on it.
///
/// View operations (`permute`, `slice`, `broadcast_to`, ...) return arrays
/// that alias the same storage; writes through one are visible through all.
/// Arithmetic always allocates a fresh result unless an `_assign` or
/// `_into` method names the target.
#[derive(Clone)]
pub struct Array {
    view: View,
    kernel: Arc<dyn Kernel>,
    ctx: Arc<Context>,
}

impl Array {
    pub(crate) fn from_parts(view: View, kernel: Arc<dyn Kernel>, ctx: Arc<Context>) -> Self {
        Self { view, kernel, ctx }
    }

    /// Wrap an existing view, using the context's kernel.
    pub fn from_view(ctx: &Arc<Context>, view: View) -> Self {
        Self::from_parts(view, ctx.kernel(), ctx.clone())
    }

    /// Same storage and kernel under a new layout.
    fn derive(&self, layout: Layout) -> Result<Array> {
        Ok(Self::from_parts(
            self.view.with_layout(layout)?,
            self.kernel.clone(),
            self.ctx.clone(),
        ))
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Row-major array over `data` in a default context.
    pub fn from_vec<T: Element>(data: Vec<T>, shape: &[usize]) -> Result<Array> {
        Self::from_vec_in(&Context::shared(), data, shape)
    }

    pub fn from_vec_in<T: Element>(ctx: &Arc<Context>, data: Vec<T>, shape: &[usize]) -> Result<Array> {
        Ok(Self::from_view(ctx, View::from_vec(data, shape)?))
    }

    pub fn zeros(dtype: DType, shape: &[usize]) -> Result<Array> {
        Self::zeros_in(&Context::shared(), dtype, shape)
    }

    pub fn zeros_in(ctx: &Arc<Context>, dtype: DType, shape: &[usize]) -> Result<Array> {
        let zero = ctx.primitives(dtype)?.zero;
        Self::full_in(ctx, shape, zero)
    }

    pub fn ones(dtype: DType, shape: &[usize]) -> Result<Array> {
        Self::ones_in(&Context::shared(), dtype, shape)
    }

    pub fn ones_in(ctx: &Arc<Context>, dtype: DType, shape: &[usize]) -> Result<Array> {
        let one = ctx.primitives(dtype)?.one;
        Self::full_in(ctx, shape, one)
    }

    /// Array of `shape` filled with `value`, stored as `value.dtype()`.
    pub fn full(shape: &[usize], value: Scalar) -> Result<Array> {
        Self::full_in(&Context::shared(), shape, value)
    }

    pub fn full_in(ctx: &Arc<Context>, shape: &[usize], value: Scalar) -> Result<Array> {
        let prims = ctx.primitives(value.dtype())?;
        let (view, kernel) = allocate(ctx, prims.dtype, shape, ctx.order())?;
        kernel.fill(&view, (prims.convert)(value))?;
        Ok(Self::from_parts(view, kernel, ctx.clone()))
    }

    /// Rank-0 array holding `value`.
    pub fn scalar(value: Scalar) -> Result<Array> {
        Self::full(&[], value)
    }

    /// `start, start + step, ...` up to but excluding `stop`.
    pub fn arange<T: Element>(start: T, stop: T, step: T) -> Result<Array> {
        Self::arange_in(&Context::shared(), start, stop, step)
    }

    pub fn arange_in<T: Element>(ctx: &Arc<Context>, start: T, stop: T, step: T) -> Result<Array> {
        if step.is_zero() {
            return Err(NdError::InvalidArgument("arange step must be non-zero".into()));
        }
        let span = (stop.to_f64() - start.to_f64()) / step.to_f64();
        if !span.is_finite() || span.ceil() > isize::MAX as f64 {
            return Err(NdError::InvalidArgument(format!(
                "arange({start}, {stop}, {step}) has no finite length"
            )));
        }
        let count = if span > 0.0 { span.ceil() as usize } else { 0 };
        let data: Vec<T> = if T::DTYPE.is_float() {
            (0..count)
                .map(|i| T::from_f64(start.to_f64() + i as f64 * step.to_f64()))
                .collect()
        } else {
            std::iter::successors(Some(start), |v| Some(v.elem_add(step)))
                .take(count)
                .collect()
        };
        Self::from_vec_in(ctx, data, &[count])
    }

    /// Concatenate along `axis` into a fresh array.
    ///
    /// Sources of different dtypes are converted to their promoted dtype.
    pub fn concat(arrays: &[&Array], axis: usize) -> Result<Array> {
        let first = arrays.first().ok_or(NdError::EmptyInput("concat"))?;
        let ctx = first.ctx.clone();
        let views: Vec<&View> = arrays.iter().map(|a| &a.view).collect();
        let prepared = prepare_concat(&ctx, axis, &views, ctx.order())?;
        for (slot, source) in &prepared.segments {
            convert_into(&ctx, prepared.kernel.as_ref(), slot, source)?;
        }
        Ok(Self::from_parts(prepared.target, prepared.kernel, ctx))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn dtype(&self) -> DType {
        self.view.dtype()
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.view.shape()
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.view.ndim()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.view.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    #[inline]
    pub fn layout(&self) -> &Layout {
        self.view.layout()
    }

    #[inline]
    pub fn view(&self) -> &View {
        &self.view
    }

    #[inline]
    pub fn kernel(&self) -> &Arc<dyn Kernel> {
        &self.kernel
    }

    #[inline]
    pub fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// True when both arrays share storage.
    pub fn aliases(&self, other: &Array) -> bool {
        self.view.aliases(&other.view)
    }

    pub fn is_contiguous(&self) -> bool {
        self.layout().is_c_contiguous()
    }

    // ========================================================================
    // Element access
    // ========================================================================

    pub fn get(&self, coord: &[usize]) -> Result<Scalar> {
        self.view.get(coord)
    }

    /// Write `value`, converted to this array's dtype, at `coord`.
    pub fn set(&self, coord: &[usize], value: Scalar) -> Result<()> {
        self.view.set(coord, value)
    }

    /// The only element of a one-element array.
    pub fn item(&self) -> Result<Scalar> {
        if self.len() != 1 {
            return Err(NdError::shape_mismatch(&[1], self.shape()));
        }
        self.view.get(&vec![0; self.ndim()])
    }

    /// Elements in row-major logical order. `T` must match the dtype.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        self.view.to_vec()
    }

    pub fn to_scalars(&self) -> Result<Vec<Scalar>> {
        self.view.to_scalars()
    }

    // ========================================================================
    // Views (no copy)
    // ========================================================================

    /// Reshape without copying; fails with [`NdError::NotRepresentable`] on
    /// non-contiguous arrays.
    pub fn reshape_view(&self, shape: &[usize]) -> Result<Array> {
        self.derive(self.layout().reshape(shape)?)
    }

    /// Reshape, copying into row-major storage first when the layout cannot
    /// be reshaped in place.
    pub fn reshape(&self, shape: &[usize]) -> Result<Array> {
        match self.reshape_view(shape) {
            Err(NdError::NotRepresentable { .. }) => self.to_contiguous()?.reshape_view(shape),
            other => other,
        }
    }

    pub fn flatten(&self) -> Result<Array> {
        self.reshape(&[self.len()])
    }

    pub fn permute(&self, perm: &[usize]) -> Result<Array> {
        self.derive(self.layout().permute(perm)?)
    }

    pub fn transpose(&self) -> Result<Array> {
        self.derive(self.layout().transpose())
    }

    pub fn swap_axes(&self, a: usize, b: usize) -> Result<Array> {
        self.derive(self.layout().swap_dims(a, b)?)
    }

    /// Reverse the order of elements along `axis`.
    pub fn flip(&self, axis: usize) -> Result<Array> {
        self.derive(self.layout().reverse_axis(axis)?)
    }

    /// Insert a size-1 axis at `axis`.
    pub fn expand_dims(&self, axis: usize) -> Result<Array> {
        self.derive(self.layout().insert_axis(axis)?)
    }

    /// Remove a size-1 axis.
    pub fn squeeze(&self, axis: usize) -> Result<Array> {
        let extent = self.layout().dim(axis)?;
        if extent != 1 {
            return Err(NdError::InvalidArgument(format!(
                "cannot squeeze axis {axis} of extent {extent}"
            )));
        }
        self.derive(self.layout().remove_axis(axis)?)
    }

    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Array> {
        self.derive(self.layout().broadcast_to(shape)?)
    }

    /// Slice with raw tokens, e.g. `a.slice(&s![1.., ELLIPSIS, 0])`.
    pub fn slice(&self, tokens: &[RangeToken]) -> Result<Array> {
        self.derive(self.layout().slice_tokens(tokens)?)
    }

    /// Slice with already-resolved selectors.
    pub fn select(&self, selectors: &[Selector]) -> Result<Array> {
        self.derive(self.layout().slice(selectors)?)
    }

    pub fn diagonal(&self, axis1: usize, axis2: usize) -> Result<Array> {
        self.derive(self.layout().diag_axis(axis1, axis2)?)
    }

    pub fn narrow(&self, axis: usize, start: usize, len: usize) -> Result<Array> {
        self.derive(self.layout().narrow(axis, start, len)?)
    }

    // ========================================================================
    // Copies
    // ========================================================================

    /// Fresh copy in the context's memory order.
    pub fn copy(&self) -> Result<Array> {
        self.copy_with_order(self.ctx.order())
    }

    fn copy_with_order(&self, order: MemoryOrder) -> Result<Array> {
        let (view, kernel) = allocate(&self.ctx, self.dtype(), self.shape(), order)?;
        kernel.convert(&view, &self.view)?;
        Ok(Self::from_parts(view, kernel, self.ctx.clone()))
    }

    /// `self` if already row-major contiguous, else a row-major copy.
    pub fn to_contiguous(&self) -> Result<Array> {
        if self.is_contiguous() {
            return Ok(self.clone());
        }
        self.copy_with_order(MemoryOrder::RowMajor)
    }

    /// Convert to `dtype`. Returns an alias when the dtype already matches.
    pub fn astype(&self, dtype: DType) -> Result<Array> {
        if dtype == self.dtype() {
            return Ok(self.clone());
        }
        Ok(Self::from_view(&self.ctx, coerce(&self.ctx, &self.view, dtype)?))
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("dtype", &self.dtype())
            .field("layout", self.layout())
            .field("kernel", &self.kernel.name())
            .finish()
    }
}
