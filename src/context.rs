//! Runtime configuration shared by arrays.
//!
//! A [`Context`] bundles the primitive registry, the storage allocator and
//! the memory order of freshly allocated results. Nothing here is global:
//! arrays carry an `Arc<Context>` and hand it to the preparer explicitly.

use std::sync::Arc;

use ndstride_kernel::Kernel;
use ndstride_traits::{DType, PrimitiveRegistry, Primitives};
use ndstride_view::{MemoryOrder, NdError, Result};

use crate::allocator::{Allocator, CpuAllocator};

#[derive(Debug, Clone)]
pub struct Context {
    registry: PrimitiveRegistry,
    allocator: Arc<dyn Allocator>,
    order: MemoryOrder,
}

impl Context {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Default context behind an `Arc`, ready to create arrays.
    pub fn shared() -> Arc<Context> {
        Arc::new(Context::default())
    }

    #[inline]
    pub fn registry(&self) -> &PrimitiveRegistry {
        &self.registry
    }

    #[inline]
    pub fn allocator(&self) -> &dyn Allocator {
        self.allocator.as_ref()
    }

    /// Kernel for storage not created by this context's allocator.
    pub fn kernel(&self) -> Arc<dyn Kernel> {
        self.allocator.kernel()
    }

    /// Memory order of newly allocated results.
    #[inline]
    pub fn order(&self) -> MemoryOrder {
        self.order
    }

    /// Registry entry for `dtype`, or [`NdError::UnsupportedDType`].
    pub fn primitives(&self, dtype: DType) -> Result<&Primitives> {
        self.registry
            .lookup(dtype)
            .ok_or(NdError::UnsupportedDType(dtype))
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::builder().build()
    }
}

/// Builder for [`Context`]. Unset fields take their defaults: the built-in
/// registry, [`CpuAllocator`] and row-major order.
#[derive(Debug, Default)]
pub struct ContextBuilder {
    registry: Option<PrimitiveRegistry>,
    allocator: Option<Arc<dyn Allocator>>,
    order: Option<MemoryOrder>,
}

impl ContextBuilder {
    pub fn registry(mut self, registry: PrimitiveRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn allocator(mut self, allocator: Arc<dyn Allocator>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    pub fn order(mut self, order: MemoryOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn build(self) -> Context {
        Context {
            registry: self.registry.unwrap_or_default(),
            allocator: self
                .allocator
                .unwrap_or_else(|| Arc::new(CpuAllocator::new())),
            order: self.order.unwrap_or_default(),
        }
    }
}
