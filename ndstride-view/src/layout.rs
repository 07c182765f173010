//! Shape, stride and offset of an N-dimensional view.

use std::fmt;

use smallvec::SmallVec;

use crate::order::{row_major_strides, MemoryOrder};
use crate::{NdError, Result};

/// Number of axes stored inline before a layout spills to the heap.
pub const INLINE_RANK: usize = 4;

pub type Dims = SmallVec<[usize; INLINE_RANK]>;
pub type Strides = SmallVec<[isize; INLINE_RANK]>;

/// Mapping from coordinates to flat buffer positions.
///
/// Strides are in elements and may be zero (broadcast axes) or negative
/// (reversed axes). A rank-0 layout addresses exactly one element at
/// `offset`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Layout {
    pub(crate) shape: Dims,
    pub(crate) stride: Strides,
    pub(crate) offset: isize,
}

impl Layout {
    /// Create a layout, checking that `shape` and `stride` have equal length.
    pub fn new(shape: &[usize], stride: &[isize], offset: isize) -> Result<Self> {
        if shape.len() != stride.len() {
            return Err(NdError::RankMismatch(shape.len(), stride.len()));
        }
        Ok(Self::from_parts(
            Dims::from_slice(shape),
            Strides::from_slice(stride),
            offset,
        ))
    }

    pub(crate) fn from_parts(shape: Dims, stride: Strides, offset: isize) -> Self {
        debug_assert_eq!(shape.len(), stride.len());
        Self {
            shape,
            stride,
            offset,
        }
    }

    /// Row-major contiguous layout at offset 0.
    pub fn contiguous(shape: &[usize]) -> Self {
        Self::from_parts(Dims::from_slice(shape), row_major_strides(shape), 0)
    }

    /// Contiguous layout in the given memory order at offset 0.
    pub fn with_order(shape: &[usize], order: MemoryOrder) -> Self {
        Self::from_parts(Dims::from_slice(shape), order.strides(shape), 0)
    }

    /// Rank-0 layout addressing a single element.
    pub fn scalar(offset: isize) -> Self {
        Self::from_parts(Dims::new(), Strides::new(), offset)
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn stride(&self) -> &[isize] {
        &self.stride
    }

    #[inline]
    pub fn offset(&self) -> isize {
        self.offset
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of addressed elements (1 for rank 0).
    #[inline]
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shape.iter().any(|&d| d == 0)
    }

    /// Extent of `axis`.
    pub fn dim(&self, axis: usize) -> Result<usize> {
        self.shape.get(axis).copied().ok_or(NdError::AxisOutOfRange {
            axis,
            rank: self.ndim(),
        })
    }

    /// Storage index of `coord`, checking rank and bounds.
    pub fn index(&self, coord: &[usize]) -> Result<isize> {
        if coord.len() != self.ndim() {
            return Err(NdError::RankMismatch(coord.len(), self.ndim()));
        }
        for (axis, (&c, &extent)) in coord.iter().zip(self.shape.iter()).enumerate() {
            if c >= extent {
                return Err(NdError::IndexOutOfRange {
                    index: c as isize,
                    axis,
                    extent,
                });
            }
        }
        coord
            .iter()
            .zip(self.stride.iter())
            .try_fold(self.offset, |acc, (&c, &s)| {
                (c as isize).checked_mul(s).and_then(|d| acc.checked_add(d))
            })
            .ok_or(NdError::OffsetOverflow)
    }

    /// Storage index of `coord` without bounds checks.
    ///
    /// Only for layouts already checked with [`Layout::validate_bounds`].
    #[inline]
    pub fn index_unchecked(&self, coord: &[usize]) -> isize {
        coord
            .iter()
            .zip(self.stride.iter())
            .fold(self.offset, |acc, (&c, &s)| acc + c as isize * s)
    }

    /// True when logical row-major order is storage order with unit steps.
    ///
    /// Axes of extent 0 or 1 never move the index, so their strides are
    /// ignored.
    pub fn is_c_contiguous(&self) -> bool {
        let mut expected = 1isize;
        for (&dim, &stride) in self.shape.iter().zip(self.stride.iter()).rev() {
            if dim <= 1 {
                continue;
            }
            if stride != expected {
                return false;
            }
            expected *= dim as isize;
        }
        true
    }

    /// Column-major counterpart of [`Layout::is_c_contiguous`].
    pub fn is_f_contiguous(&self) -> bool {
        let mut expected = 1isize;
        for (&dim, &stride) in self.shape.iter().zip(self.stride.iter()) {
            if dim <= 1 {
                continue;
            }
            if stride != expected {
                return false;
            }
            expected *= dim as isize;
        }
        true
    }

    /// True when some axis repeats elements through a zero stride.
    pub fn has_broadcast_axis(&self) -> bool {
        self.shape
            .iter()
            .zip(self.stride.iter())
            .any(|(&d, &s)| d > 1 && s == 0)
    }

    /// Smallest and largest reachable storage index, or `None` if empty.
    pub fn span(&self) -> Result<Option<(isize, isize)>> {
        if self.is_empty() {
            return Ok(None);
        }
        let mut min_offset = self.offset;
        let mut max_offset = self.offset;
        for (&dim, &stride) in self.shape.iter().zip(self.stride.iter()) {
            if dim > 1 {
                let end = stride
                    .checked_mul(dim as isize - 1)
                    .ok_or(NdError::OffsetOverflow)?;
                if end >= 0 {
                    max_offset = max_offset.checked_add(end).ok_or(NdError::OffsetOverflow)?;
                } else {
                    min_offset = min_offset.checked_add(end).ok_or(NdError::OffsetOverflow)?;
                }
            }
        }
        Ok(Some((min_offset, max_offset)))
    }

    /// Validate that every reachable index lies in `[0, len)`.
    pub fn validate_bounds(&self, len: usize) -> Result<()> {
        match self.span()? {
            None => Ok(()),
            Some((min, max)) if min >= 0 && (max as usize) < len => Ok(()),
            Some(_) => Err(NdError::OutOfBounds {
                shape: self.shape.to_vec(),
                len,
            }),
        }
    }

    /// Buffer length needed to back this layout.
    pub fn required_len(&self) -> Result<usize> {
        match self.span()? {
            None => Ok(0),
            Some((min, _)) if min < 0 => Err(NdError::OutOfBounds {
                shape: self.shape.to_vec(),
                len: 0,
            }),
            Some((_, max)) => Ok(max as usize + 1),
        }
    }

    /// Storage indices of every element in row-major logical order.
    pub fn offsets(&self) -> Offsets<'_> {
        Offsets {
            layout: self,
            coord: smallvec::smallvec![0; self.ndim()],
            next: self.offset,
            remaining: self.len(),
        }
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layout")
            .field("shape", &self.shape.as_slice())
            .field("stride", &self.stride.as_slice())
            .field("offset", &self.offset)
            .finish()
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stride={:?} offset={}",
            crate::fmt_shape(&self.shape),
            self.stride.as_slice(),
            self.offset
        )
    }
}

/// Iterator over the storage indices of a [`Layout`], last axis fastest.
pub struct Offsets<'a> {
    layout: &'a Layout,
    coord: Dims,
    next: isize,
    remaining: usize,
}

impl Iterator for Offsets<'_> {
    type Item = isize;

    #[inline]
    fn next(&mut self) -> Option<isize> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next;
        self.remaining -= 1;
        if self.remaining > 0 {
            let shape = &self.layout.shape;
            let stride = &self.layout.stride;
            for axis in (0..shape.len()).rev() {
                self.coord[axis] += 1;
                self.next += stride[axis];
                if self.coord[axis] < shape[axis] {
                    break;
                }
                self.next -= stride[axis] * shape[axis] as isize;
                self.coord[axis] = 0;
            }
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Offsets<'_> {}
