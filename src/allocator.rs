//! Storage allocation.

use std::fmt;
use std::sync::Arc;

use ndstride_kernel::{CpuKernel, Kernel};
use ndstride_traits::DType;
use ndstride_view::{Layout, Result, Storage};

/// Source of fresh storage and of the kernel that operates on it.
pub trait Allocator: Send + Sync + fmt::Debug {
    /// Storage large enough to back `layout`, zero-initialized, paired with
    /// a kernel able to operate on it.
    fn allocate(&self, dtype: DType, layout: &Layout) -> Result<(Storage, Arc<dyn Kernel>)>;

    /// Kernel for storage this allocator did not create (e.g. wrapped
    /// caller vectors).
    fn kernel(&self) -> Arc<dyn Kernel>;
}

/// Heap allocator paired with [`CpuKernel`].
#[derive(Debug, Clone)]
pub struct CpuAllocator {
    kernel: Arc<CpuKernel>,
}

impl CpuAllocator {
    pub fn new() -> Self {
        Self {
            kernel: Arc::new(CpuKernel::new()),
        }
    }
}

impl Default for CpuAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Allocator for CpuAllocator {
    fn allocate(&self, dtype: DType, layout: &Layout) -> Result<(Storage, Arc<dyn Kernel>)> {
        let len = layout.required_len()?;
        Ok((Storage::zeros(dtype, len), self.kernel()))
    }

    fn kernel(&self) -> Arc<dyn Kernel> {
        self.kernel.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndstride_view::MemoryOrder;

    #[test]
    fn test_allocate_contiguous() {
        let alloc = CpuAllocator::new();
        let layout = Layout::with_order(&[3, 4], MemoryOrder::ColMajor);
        let (storage, kernel) = alloc.allocate(DType::F32, &layout).unwrap();
        assert_eq!(storage.len(), 12);
        assert_eq!(storage.dtype(), DType::F32);
        assert_eq!(kernel.name(), "cpu");
    }

    #[test]
    fn test_allocate_empty() {
        let alloc = CpuAllocator::new();
        let (storage, _) = alloc.allocate(DType::U8, &Layout::contiguous(&[0, 5])).unwrap();
        assert!(storage.is_empty());
    }
}
