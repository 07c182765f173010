//! N-dimensional strided arrays with zero-copy views and dtype-dispatched
//! kernels.
//!
//! # Core Types
//!
//! - [`Array`]: a view over shared, reference-counted storage plus the
//!   kernel and [`Context`] that operate on it
//! - [`Layout`]: shape, signed strides and offset
//! - [`Selector`] / [`RangeToken`] and the [`s!`] macro: slicing requests
//! - [`Kernel`]: the numeric backend interface ([`CpuKernel`] ships here)
//! - [`Allocator`]: where fresh storage comes from ([`CpuAllocator`])
//!
//! # Operation pipeline
//!
//! Every arithmetic call goes through the same steps, exposed in
//! [`prepare`]:
//!
//! 1. coerce operands to a common dtype ([`prepare::coerce`])
//! 2. broadcast their layouts to a common shape
//! 3. allocate a target through the context's allocator
//! 4. hand the prepared views to the kernel
//!
//! # Example
//!
//! ```rust
//! use ndstride::{s, Array, ELLIPSIS};
//!
//! let a = Array::arange(0i64, 12, 1).unwrap().reshape(&[3, 4]).unwrap();
//! let col = a.slice(&s![ELLIPSIS, 1]).unwrap();
//! assert_eq!(col.to_vec::<i64>().unwrap(), vec![1, 5, 9]);
//!
//! // Broadcast a row over every row of `a`.
//! let row = Array::from_vec(vec![10i64, 20, 30, 40], &[4]).unwrap();
//! let b = a.add(&row).unwrap();
//! assert_eq!(b.get(&[2, 3]).unwrap().to_f64(), 51.0);
//!
//! // Reduce an axis.
//! let sums = a.sum_axis(1).unwrap();
//! assert_eq!(sums.to_vec::<i64>().unwrap(), vec![6, 22, 38]);
//! ```

pub mod allocator;
mod array;
pub mod context;
mod ops;
pub mod prepare;
mod reduce;

pub use allocator::{Allocator, CpuAllocator};
pub use array::Array;
pub use context::{Context, ContextBuilder};
pub use prepare::{
    coerce, convert_into, prepare_axis_reduce, prepare_concat, prepare_elementwise, prepare_elementwise_sources,
    PreparedConcat, PreparedElementwise, PreparedReduce,
};

pub use ndstride_kernel::{BinaryOp, CpuKernel, Kernel, ReduceOp, UnaryOp, PARALLEL_THRESHOLD};
pub use ndstride_traits::{
    is_close, with_dtype, Buffer, DType, Element, PrimitiveRegistry, Primitives, Scalar,
    DEFAULT_ATOL, DEFAULT_RTOL,
};
pub use ndstride_view::{
    broadcast_layouts, broadcast_shape, col_major_strides, concat_geometry, expand_selectors,
    inverse_permutation, resolve, row_major_strides, s, ConcatGeometry, Layout, MemoryOrder,
    NdError, RangeToken, Result, Selector, Storage, View, ELLIPSIS, INLINE_RANK, NEW_AXIS,
};
