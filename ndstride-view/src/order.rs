//! Memory orders and their canonical strides.

use crate::layout::Strides;

/// Element order of a freshly allocated contiguous buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryOrder {
    /// Last index varies fastest (C order).
    #[default]
    RowMajor,
    /// First index varies fastest (Fortran order).
    ColMajor,
}

impl MemoryOrder {
    pub fn strides(self, dims: &[usize]) -> Strides {
        match self {
            MemoryOrder::RowMajor => row_major_strides(dims),
            MemoryOrder::ColMajor => col_major_strides(dims),
        }
    }
}

/// Compute row-major strides (C default: last index varies fastest).
pub fn row_major_strides(dims: &[usize]) -> Strides {
    let rank = dims.len();
    let mut strides: Strides = smallvec::smallvec![1isize; rank];
    for i in (0..rank.saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * dims[i + 1] as isize;
    }
    strides
}

/// Compute column-major strides (first index varies fastest).
pub fn col_major_strides(dims: &[usize]) -> Strides {
    let rank = dims.len();
    let mut strides: Strides = smallvec::smallvec![1isize; rank];
    for i in 1..rank {
        strides[i] = strides[i - 1] * dims[i - 1] as isize;
    }
    strides
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_strides() {
        assert_eq!(row_major_strides(&[2, 3, 4]).as_slice(), &[12, 4, 1]);
        assert!(row_major_strides(&[]).is_empty());
        assert_eq!(row_major_strides(&[5]).as_slice(), &[1]);
    }

    #[test]
    fn test_col_major_strides() {
        assert_eq!(col_major_strides(&[2, 3, 4]).as_slice(), &[1, 2, 6]);
        assert_eq!(MemoryOrder::ColMajor.strides(&[3, 3]).as_slice(), &[1, 3]);
    }

    #[test]
    fn test_zero_extent() {
        assert_eq!(row_major_strides(&[2, 0, 3]).as_slice(), &[0, 3, 1]);
    }
}
