//! Views: a layout over shared storage.

use ndstride_traits::{Element, Scalar};

use crate::layout::Layout;
use crate::storage::Storage;
use crate::{NdError, Result};

/// A [`Layout`] over a [`Storage`].
///
/// Views never own their data exclusively. Every view operation produces a
/// new `View` over the same storage, so writes through one are seen by all.
#[derive(Debug, Clone)]
pub struct View {
    storage: Storage,
    layout: Layout,
}

impl View {
    /// Pair `layout` with `storage`, checking it stays inside the buffer.
    pub fn new(storage: Storage, layout: Layout) -> Result<Self> {
        layout.validate_bounds(storage.len())?;
        Ok(Self { storage, layout })
    }

    /// Row-major view over `data`.
    pub fn from_vec<T: Element>(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        let layout = Layout::contiguous(shape);
        if layout.len() != data.len() {
            return Err(NdError::shape_mismatch(&[data.len()], shape));
        }
        Self::new(Storage::from_vec(data), layout)
    }

    /// Same storage under a different layout.
    pub fn with_layout(&self, layout: Layout) -> Result<View> {
        View::new(self.storage.clone(), layout)
    }

    /// Apply a layout transformation to this view.
    pub fn map_layout<F>(&self, f: F) -> Result<View>
    where
        F: FnOnce(&Layout) -> Result<Layout>,
    {
        self.with_layout(f(&self.layout)?)
    }

    #[inline]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[inline]
    pub fn dtype(&self) -> ndstride_traits::DType {
        self.storage.dtype()
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.layout.ndim()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.layout.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    /// True when both views read or write the same buffer.
    #[inline]
    pub fn aliases(&self, other: &View) -> bool {
        self.storage.ptr_eq(&other.storage)
    }

    pub fn get(&self, coord: &[usize]) -> Result<Scalar> {
        let index = self.layout.index(coord)?;
        let buffer = self.storage.read()?;
        buffer.get(index as usize).ok_or(NdError::OutOfBounds {
            shape: self.shape().to_vec(),
            len: buffer.len(),
        })
    }

    /// Write `value` (converted to this view's dtype) at `coord`.
    pub fn set(&self, coord: &[usize], value: Scalar) -> Result<()> {
        let index = self.layout.index(coord)? as usize;
        let mut buffer = self.storage.write()?;
        ndstride_traits::with_dtype!(self.dtype(), T => {
            let data = buffer.as_slice_mut::<T>().ok_or(NdError::DTypeMismatch {
                expected: self.dtype(),
                found: value.dtype(),
            })?;
            data[index] = T::from_scalar(value);
        });
        Ok(())
    }

    /// Elements in row-major logical order.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if T::DTYPE != self.dtype() {
            return Err(NdError::DTypeMismatch {
                expected: self.dtype(),
                found: T::DTYPE,
            });
        }
        let buffer = self.storage.read()?;
        let data = buffer.as_slice::<T>().ok_or(NdError::DTypeMismatch {
            expected: self.dtype(),
            found: T::DTYPE,
        })?;
        Ok(self.layout.offsets().map(|i| data[i as usize]).collect())
    }

    /// Elements in row-major logical order, type-erased.
    pub fn to_scalars(&self) -> Result<Vec<Scalar>> {
        let buffer = self.storage.read()?;
        self.layout
            .offsets()
            .map(|i| {
                buffer.get(i as usize).ok_or(NdError::OutOfBounds {
                    shape: self.shape().to_vec(),
                    len: buffer.len(),
                })
            })
            .collect()
    }
}
