//! Metadata-only view transformations.
//!
//! Every function here maps a [`Layout`] (plus parameters) to a new
//! [`Layout`] over the same storage.

use std::ops::Range;

use crate::layout::{Dims, Layout, Strides};
use crate::order::row_major_strides;
use crate::{NdError, Result};

impl Layout {
    /// Reinterpret the elements under a new shape.
    ///
    /// Only C-contiguous (or empty) layouts can be reshaped without copying;
    /// anything else fails with [`NdError::NotRepresentable`].
    pub fn reshape(&self, new_shape: &[usize]) -> Result<Layout> {
        let new_len: usize = new_shape.iter().product();
        if new_len != self.len() {
            return Err(NdError::shape_mismatch(self.shape(), new_shape));
        }
        if !self.is_empty() && !self.is_c_contiguous() {
            return Err(NdError::NotRepresentable {
                shape: self.shape().to_vec(),
                new_shape: new_shape.to_vec(),
            });
        }
        Ok(Layout::from_parts(
            Dims::from_slice(new_shape),
            row_major_strides(new_shape),
            self.offset(),
        ))
    }

    /// Reorder axes: axis `i` of the result is axis `perm[i]` of `self`.
    pub fn permute(&self, perm: &[usize]) -> Result<Layout> {
        let rank = self.ndim();
        if perm.len() != rank {
            return Err(NdError::InvalidPermutation {
                perm: perm.to_vec(),
                rank,
            });
        }
        let mut seen: Dims = smallvec::smallvec![0; rank];
        for &p in perm {
            if p >= rank || seen[p] != 0 {
                return Err(NdError::InvalidPermutation {
                    perm: perm.to_vec(),
                    rank,
                });
            }
            seen[p] = 1;
        }
        let shape: Dims = perm.iter().map(|&p| self.shape()[p]).collect();
        let stride: Strides = perm.iter().map(|&p| self.stride()[p]).collect();
        Ok(Layout::from_parts(shape, stride, self.offset()))
    }

    /// Reverse the order of all axes.
    pub fn transpose(&self) -> Layout {
        let shape: Dims = self.shape().iter().rev().copied().collect();
        let stride: Strides = self.stride().iter().rev().copied().collect();
        Layout::from_parts(shape, stride, self.offset())
    }

    pub fn swap_dims(&self, a: usize, b: usize) -> Result<Layout> {
        self.check_axis(a)?;
        self.check_axis(b)?;
        let mut perm: Vec<usize> = (0..self.ndim()).collect();
        perm.swap(a, b);
        self.permute(&perm)
    }

    /// Walk `axis` backwards.
    pub fn reverse_axis(&self, axis: usize) -> Result<Layout> {
        self.check_axis(axis)?;
        let mut out = self.clone();
        let extent = out.shape[axis];
        let stride = out.stride[axis];
        if extent > 0 {
            out.offset = stride
                .checked_mul(extent as isize - 1)
                .and_then(|d| out.offset.checked_add(d))
                .ok_or(NdError::OffsetOverflow)?;
        }
        out.stride[axis] = stride.checked_neg().ok_or(NdError::OffsetOverflow)?;
        Ok(out)
    }

    /// Insert a size-1, stride-0 axis at `pos` (`0..=rank`).
    pub fn insert_axis(&self, pos: usize) -> Result<Layout> {
        if pos > self.ndim() {
            return Err(NdError::AxisOutOfRange {
                axis: pos,
                rank: self.ndim(),
            });
        }
        let mut out = self.clone();
        out.shape.insert(pos, 1);
        out.stride.insert(pos, 0);
        Ok(out)
    }

    pub fn pad_left(&self) -> Layout {
        let mut out = self.clone();
        out.shape.insert(0, 1);
        out.stride.insert(0, 0);
        out
    }

    pub fn pad_right(&self) -> Layout {
        let mut out = self.clone();
        out.shape.push(1);
        out.stride.push(0);
        out
    }

    /// Drop `axis`, keeping the offset (the view is pinned at index 0 of it).
    pub fn remove_axis(&self, axis: usize) -> Result<Layout> {
        self.check_axis(axis)?;
        let mut out = self.clone();
        out.shape.remove(axis);
        out.stride.remove(axis);
        Ok(out)
    }

    /// Drop the first axis, pinned at index 0.
    ///
    /// Meant for size-1 axes, or for callers that step through the dropped
    /// axis themselves (as the reduction kernel does with the last axis).
    /// Any other extent silently loses elements; use
    /// [`Layout::narrow`] or [`Layout::slice`] to pick a position.
    pub fn cut_left(&self) -> Result<Layout> {
        self.remove_axis(0)
    }

    /// Drop the last axis, pinned at index 0. Same contract as
    /// [`Layout::cut_left`].
    pub fn cut_right(&self) -> Result<Layout> {
        self.remove_axis(self.ndim().checked_sub(1).ok_or(NdError::AxisOutOfRange {
            axis: 0,
            rank: 0,
        })?)
    }

    /// Stretch a size-1 axis to `size` with stride 0.
    ///
    /// Broadcasting an axis to its own extent is the identity.
    pub fn broadcast_dim(&self, axis: usize, size: usize) -> Result<Layout> {
        self.check_axis(axis)?;
        let extent = self.shape[axis];
        if extent == size {
            return Ok(self.clone());
        }
        if extent != 1 {
            let mut target = self.shape().to_vec();
            target[axis] = size;
            return Err(NdError::NotBroadcastable(vec![self.shape().to_vec(), target]));
        }
        let mut out = self.clone();
        out.shape[axis] = size;
        out.stride[axis] = 0;
        Ok(out)
    }

    /// Diagonal of two axes of equal extent.
    ///
    /// Both axes are replaced by a single axis at `min(axis1, axis2)` whose
    /// stride is the sum of theirs.
    pub fn diag_axis(&self, axis1: usize, axis2: usize) -> Result<Layout> {
        let rank = self.ndim();
        if axis1 == axis2
            || axis1 >= rank
            || axis2 >= rank
            || self.shape[axis1] != self.shape[axis2]
        {
            return Err(NdError::InvalidAxes {
                axis1,
                axis2,
                shape: self.shape().to_vec(),
            });
        }
        let (lo, hi) = if axis1 < axis2 {
            (axis1, axis2)
        } else {
            (axis2, axis1)
        };
        let mut out = self.clone();
        out.stride[lo] = self.stride[axis1] + self.stride[axis2];
        out.shape.remove(hi);
        out.stride.remove(hi);
        Ok(out)
    }

    /// Restrict `axis` to `start..start + len`.
    pub fn narrow(&self, axis: usize, start: usize, len: usize) -> Result<Layout> {
        self.check_axis(axis)?;
        let extent = self.shape[axis];
        let end = start.checked_add(len).ok_or(NdError::OffsetOverflow)?;
        if end > extent {
            return Err(NdError::IndexOutOfRange {
                index: end as isize,
                axis,
                extent,
            });
        }
        let mut out = self.clone();
        if len > 0 {
            out.offset += out.stride[axis] * start as isize;
        }
        out.shape[axis] = len;
        Ok(out)
    }

    fn check_axis(&self, axis: usize) -> Result<()> {
        if axis >= self.ndim() {
            return Err(NdError::AxisOutOfRange {
                axis,
                rank: self.ndim(),
            });
        }
        Ok(())
    }
}

/// `inv` with `inv[perm[i]] == i`.
pub fn inverse_permutation(perm: &[usize]) -> Result<Vec<usize>> {
    let rank = perm.len();
    let mut inv = vec![usize::MAX; rank];
    for (i, &p) in perm.iter().enumerate() {
        if p >= rank || inv[p] != usize::MAX {
            return Err(NdError::InvalidPermutation {
                perm: perm.to_vec(),
                rank,
            });
        }
        inv[p] = i;
    }
    Ok(inv)
}

/// Result shape of a concatenation and where each input lands in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatGeometry {
    pub shape: Vec<usize>,
    /// `[start, end)` of each input along the concatenation axis.
    pub ranges: Vec<Range<usize>>,
}

/// Validate inputs to a concatenation along `axis` and compute its geometry.
pub fn concat_geometry(axis: usize, layouts: &[&Layout]) -> Result<ConcatGeometry> {
    let first = layouts.first().ok_or(NdError::EmptyInput("concat"))?;
    let rank = first.ndim();
    if axis >= rank {
        return Err(NdError::AxisOutOfRange { axis, rank });
    }
    let mut ranges = Vec::with_capacity(layouts.len());
    let mut total = 0usize;
    for (i, layout) in layouts.iter().enumerate() {
        let compatible = layout.ndim() == rank
            && layout
                .shape()
                .iter()
                .zip(first.shape())
                .enumerate()
                .all(|(ax, (a, b))| ax == axis || a == b);
        if !compatible {
            return Err(NdError::ShapeMismatch {
                operand: Some(i),
                expected: first.shape().to_vec(),
                found: layout.shape().to_vec(),
            });
        }
        let extent = layout.shape()[axis];
        ranges.push(total..total + extent);
        total += extent;
    }
    let mut shape = first.shape().to_vec();
    shape[axis] = total;
    Ok(ConcatGeometry { shape, ranges })
}
