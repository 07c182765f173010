//! Numeric kernels over prepared views.
//!
//! The [`Kernel`] trait is the boundary between orchestration (shape
//! resolution, broadcasting, allocation) and arithmetic. A kernel receives
//! views whose shapes already agree and only has to walk them.
//!
//! [`CpuKernel`] is the reference implementation: one `DType` dispatch per
//! call, a contiguous slice fast path, and a strided fallback that follows
//! each view's layout.
//!
//! # Feature flags
//!
//! - `parallel`: run contiguous fast paths above [`PARALLEL_THRESHOLD`]
//!   elements on rayon.

mod cpu;
mod kernel;
pub mod maybe_sync;
mod ops;

pub use cpu::{CpuKernel, PARALLEL_THRESHOLD};
pub use kernel::{contiguous_range, ensure_same_shape, Kernel};
pub use ops::{BinaryOp, ReduceOp, UnaryOp};

pub use ndstride_view::{NdError, Result};
