//! numpy-style broadcasting of shapes and layouts.

use crate::layout::Layout;
use crate::{NdError, Result};

/// Common shape of `shapes` after right-aligning them.
///
/// Per aligned axis every extent must be 1 or equal to the others; an
/// extent of 0 broadcasts like any other non-1 extent.
pub fn broadcast_shape(shapes: &[&[usize]]) -> Result<Vec<usize>> {
    let rank = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut out = vec![1usize; rank];
    for (d, slot) in out.iter_mut().enumerate() {
        let mut target = 1usize;
        for shape in shapes {
            let pad = rank - shape.len();
            if d < pad {
                continue;
            }
            let n = shape[d - pad];
            if n == 1 {
                continue;
            }
            if target == 1 {
                target = n;
            } else if target != n {
                return Err(NdError::NotBroadcastable(
                    shapes.iter().map(|s| s.to_vec()).collect(),
                ));
            }
        }
        *slot = target;
    }
    Ok(out)
}

impl Layout {
    /// Expand to `shape` by left-padding and stretching size-1 axes.
    ///
    /// Returns `self` unchanged when `shape` already matches.
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Layout> {
        if self.shape() == shape {
            return Ok(self.clone());
        }
        let not_broadcastable =
            || NdError::NotBroadcastable(vec![self.shape().to_vec(), shape.to_vec()]);
        if self.ndim() > shape.len() {
            return Err(not_broadcastable());
        }
        let mut out = self.clone();
        while out.ndim() < shape.len() {
            out = out.pad_left();
        }
        for (axis, &target) in shape.iter().enumerate() {
            let extent = out.shape()[axis];
            if extent == target {
                continue;
            }
            if extent != 1 {
                return Err(not_broadcastable());
            }
            out = out.broadcast_dim(axis, target)?;
        }
        Ok(out)
    }
}

/// Broadcast every layout to their common shape.
///
/// Returns the shape and one layout per input, each over its original
/// storage.
pub fn broadcast_layouts(layouts: &[&Layout]) -> Result<(Vec<usize>, Vec<Layout>)> {
    let shapes: Vec<&[usize]> = layouts.iter().map(|l| l.shape()).collect();
    let shape = broadcast_shape(&shapes)?;
    let out = layouts
        .iter()
        .map(|l| l.broadcast_to(&shape))
        .collect::<Result<Vec<_>>>()?;
    debug_assert!(out.iter().all(|l| l.shape() == shape.as_slice()));
    Ok((shape, out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_shape() {
        assert_eq!(broadcast_shape(&[&[3, 1], &[1, 4]]).unwrap(), vec![3, 4]);
        assert_eq!(broadcast_shape(&[&[5, 3, 4], &[4]]).unwrap(), vec![5, 3, 4]);
        assert_eq!(broadcast_shape(&[&[], &[2]]).unwrap(), vec![2]);
        assert_eq!(broadcast_shape(&[]).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn test_broadcast_shape_zero_extent() {
        assert_eq!(broadcast_shape(&[&[0], &[1]]).unwrap(), vec![0]);
        assert!(broadcast_shape(&[&[0], &[2]]).is_err());
    }

    #[test]
    fn test_not_broadcastable_names_shapes() {
        let err = broadcast_shape(&[&[2, 3], &[4]]).unwrap_err();
        assert_eq!(err, NdError::NotBroadcastable(vec![vec![2, 3], vec![4]]));
    }

    #[test]
    fn test_broadcast_to() {
        let l = Layout::contiguous(&[3]);
        let b = l.broadcast_to(&[2, 3]).unwrap();
        assert_eq!(b.shape(), &[2, 3]);
        assert_eq!(b.stride(), &[0, 1]);
        assert_eq!(b.offsets().collect::<Vec<_>>(), vec![0, 1, 2, 0, 1, 2]);
        assert!(l.broadcast_to(&[2, 4]).is_err());
        assert!(Layout::contiguous(&[2, 3]).broadcast_to(&[3]).is_err());
    }

    #[test]
    fn test_broadcast_to_own_shape_is_identity() {
        let l = Layout::new(&[2, 1, 3], &[7, 99, -2], 11).unwrap();
        assert_eq!(l.broadcast_to(&[2, 1, 3]).unwrap(), l);
    }

    #[test]
    fn test_broadcast_layouts() {
        let a = Layout::contiguous(&[4, 1]);
        let b = Layout::contiguous(&[3]);
        let (shape, out) = broadcast_layouts(&[&a, &b]).unwrap();
        assert_eq!(shape, vec![4, 3]);
        assert_eq!(out[0].stride(), &[1, 0]);
        assert_eq!(out[1].stride(), &[0, 1]);
        assert_eq!(out[0].offset(), a.offset());
    }
}
