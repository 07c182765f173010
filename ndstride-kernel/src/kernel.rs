//! The kernel interface and shared checks.

use std::fmt;
use std::ops::Range;

use ndstride_traits::{Scalar, ScalarConvertFn};
use ndstride_view::{Layout, NdError, Result, View};

use crate::ops::{BinaryOp, ReduceOp, UnaryOp};

/// Numeric backend over prepared views.
///
/// Callers guarantee nothing beyond what each method checks: shapes and
/// dtypes are validated on entry. Sources may alias the target; a kernel
/// must then behave as if every source was read before the target was
/// written.
pub trait Kernel: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// `target[i] = op(source[i])`. Target and source share a dtype.
    fn unary_op(&self, op: UnaryOp, target: &View, source: &View) -> Result<()>;

    /// `target[i] = op(lhs[i], rhs[i])`.
    ///
    /// `lhs` and `rhs` share a dtype. The target has that dtype too, or `u8`
    /// for comparisons.
    fn binary_op(&self, op: BinaryOp, target: &View, lhs: &View, rhs: &View) -> Result<()>;

    /// Fold the last axis of `source` into `target`, whose shape is the
    /// source shape without that axis.
    fn reduce_last_axis(&self, op: ReduceOp, target: &View, source: &View) -> Result<()>;

    /// Copy `source` into `target`, converting between dtypes.
    fn convert(&self, target: &View, source: &View) -> Result<()>;

    /// Copy `source` into `target`, passing every element through
    /// `convert` (a registered primitive whose output is tagged with the
    /// target dtype).
    fn convert_with(&self, target: &View, source: &View, convert: ScalarConvertFn) -> Result<()>;

    /// Set every element of `target` to `value` (converted to its dtype).
    fn fill(&self, target: &View, value: Scalar) -> Result<()>;
}

/// Check that `found` equals `expected`.
#[inline]
pub fn ensure_same_shape(expected: &[usize], found: &[usize]) -> Result<()> {
    if expected != found {
        return Err(NdError::shape_mismatch(expected, found));
    }
    Ok(())
}

/// The buffer range of a C-contiguous layout with non-negative offset.
///
/// Walking this range in order visits elements in row-major logical order.
pub fn contiguous_range(layout: &Layout) -> Option<Range<usize>> {
    if layout.offset() < 0 || !layout.is_c_contiguous() {
        return None;
    }
    let start = layout.offset() as usize;
    Some(start..start + layout.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_same_shape() {
        assert!(ensure_same_shape(&[2, 3], &[2, 3]).is_ok());
        assert!(matches!(
            ensure_same_shape(&[2, 3], &[3, 2]),
            Err(NdError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_contiguous_range() {
        assert_eq!(contiguous_range(&Layout::contiguous(&[2, 3])), Some(0..6));
        let narrowed = Layout::contiguous(&[4]).narrow(0, 1, 2).unwrap();
        assert_eq!(contiguous_range(&narrowed), Some(1..3));
        assert_eq!(contiguous_range(&Layout::contiguous(&[2, 3]).transpose()), None);
        let reversed = Layout::contiguous(&[3]).reverse_axis(0).unwrap();
        assert_eq!(contiguous_range(&reversed), None);
        assert_eq!(contiguous_range(&Layout::scalar(4)), Some(4..5));
    }
}
