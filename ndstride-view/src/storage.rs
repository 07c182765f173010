//! Reference-counted shared buffers.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ndstride_traits::{Buffer, DType, Element};

use crate::{NdError, Result};

/// Shared handle to a [`Buffer`].
///
/// Cloning the handle aliases the data; a write through any handle is
/// visible through every other. The element type and length are fixed at
/// construction and cached, so they can be read while a guard is held.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<RwLock<Buffer>>,
    dtype: DType,
    len: usize,
}

impl Storage {
    pub fn new(buffer: Buffer) -> Self {
        let dtype = buffer.dtype();
        let len = buffer.len();
        Self {
            inner: Arc::new(RwLock::new(buffer)),
            dtype,
            len,
        }
    }

    pub fn zeros(dtype: DType, len: usize) -> Self {
        Self::new(Buffer::zeros(dtype, len))
    }

    pub fn from_vec<T: Element>(data: Vec<T>) -> Self {
        Self::new(Buffer::from_vec(data))
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, Buffer>> {
        self.inner.read().map_err(|_| NdError::StoragePoisoned)
    }

    /// Lock for writing. Callers must keep the buffer's variant and length.
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, Buffer>> {
        self.inner.write().map_err(|_| NdError::StoragePoisoned)
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Result<Buffer> {
        Ok(self.read()?.clone())
    }

    /// True when both handles refer to the same buffer.
    #[inline]
    pub fn ptr_eq(&self, other: &Storage) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live handles to this buffer.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("dtype", &self.dtype)
            .field("len", &self.len)
            .field("handles", &self.handle_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_aliases() {
        let a = Storage::from_vec(vec![1.0f64, 2.0, 3.0]);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert_eq!(a.handle_count(), 2);
        b.write().unwrap().as_slice_mut::<f64>().unwrap()[1] = 9.0;
        assert_eq!(a.read().unwrap().as_slice::<f64>().unwrap(), &[1.0, 9.0, 3.0]);
    }

    #[test]
    fn test_distinct_storages() {
        let a = Storage::zeros(DType::I32, 4);
        let b = Storage::zeros(DType::I32, 4);
        assert!(!a.ptr_eq(&b));
        assert_eq!(a.dtype(), DType::I32);
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let a = Storage::from_vec(vec![1u8, 2]);
        let snap = a.snapshot().unwrap();
        a.write().unwrap().as_slice_mut::<u8>().unwrap()[0] = 7;
        assert_eq!(snap, Buffer::U8(vec![1, 2]));
    }
}
