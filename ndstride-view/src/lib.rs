//! Stride/offset layouts and zero-copy view algebra.
//!
//! A [`Layout`] maps N-dimensional coordinates to positions in a flat buffer:
//! `offset + Σ coord[i] * stride[i]`. Every view transformation here
//! (reshape, permute, slice, diagonal, broadcast) is a pure function from
//! layouts to layouts; none of them touch data.
//!
//! # Core Types
//!
//! - [`Layout`]: shape, signed strides and offset
//! - [`Selector`] / [`RangeToken`]: slicing requests and their resolver
//! - [`Storage`]: reference-counted, lock-protected [`Buffer`](ndstride_traits::Buffer)
//! - [`View`]: a `(Storage, Layout)` pair; cloning a view aliases its data
//!
//! # Metadata Transformations
//!
//! - `reshape`, `permute`, `transpose`, `swap_dims`, `reverse_axis`
//! - `insert_axis`, `pad_left`, `pad_right`, `remove_axis`, `cut_left`, `cut_right`
//! - `broadcast_dim`, `broadcast_to`, `diag_axis`, `narrow`, `slice`

pub mod broadcast;
pub mod layout;
pub mod order;
pub mod selector;
pub mod storage;
pub mod view;
mod view_ops;

pub use broadcast::{broadcast_layouts, broadcast_shape};
pub use layout::{Dims, Layout, Offsets, Strides, INLINE_RANK};
pub use order::{col_major_strides, row_major_strides, MemoryOrder};
pub use selector::{expand_selectors, resolve, RangeToken, Selector, ELLIPSIS, NEW_AXIS};
pub use storage::Storage;
pub use view::View;
pub use view_ops::{concat_geometry, inverse_permutation, ConcatGeometry};

use ndstride_traits::DType;

// ============================================================================
// Error types
// ============================================================================

/// Errors raised by layout, view and dispatch operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NdError {
    /// Shapes that must agree do not. `operand` names the offending input
    /// when the operation takes a list of them.
    #[error("shape mismatch{}: {} vs {}", at_operand(.operand), fmt_shape(.expected), fmt_shape(.found))]
    ShapeMismatch {
        operand: Option<usize>,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// No common broadcast shape exists.
    #[error("shapes {} are not broadcastable", fmt_shapes(.0))]
    NotBroadcastable(Vec<Vec<usize>>),

    #[error("axis {axis} out of range for rank {rank}")]
    AxisOutOfRange { axis: usize, rank: usize },

    /// Diagonal axes are equal, out of range, or of different extent.
    #[error("invalid axes ({axis1}, {axis2}) for shape {}", fmt_shape(.shape))]
    InvalidAxes {
        axis1: usize,
        axis2: usize,
        shape: Vec<usize>,
    },

    #[error("invalid permutation {perm:?} for rank {rank}")]
    InvalidPermutation { perm: Vec<usize>, rank: usize },

    /// A reshape of a non-contiguous layout cannot be expressed with strides.
    #[error("cannot reshape {} to {} without copying", fmt_shape(.shape), fmt_shape(.new_shape))]
    NotRepresentable {
        shape: Vec<usize>,
        new_shape: Vec<usize>,
    },

    #[error("index {index} out of range for axis {axis} of extent {extent}")]
    IndexOutOfRange {
        index: isize,
        axis: usize,
        extent: usize,
    },

    /// Malformed slicing request; carries a rendering of the whole request.
    #[error("invalid selector [{0}]")]
    InvalidSelector(String),

    /// An operation that needs at least one operand received none.
    #[error("{0} requires at least one operand")]
    EmptyInput(&'static str),

    #[error("rank mismatch: {0} vs {1}")]
    RankMismatch(usize, usize),

    /// A layout reaches outside its buffer.
    #[error("layout {} reaches outside storage of length {len}", fmt_shape(.shape))]
    OutOfBounds { shape: Vec<usize>, len: usize },

    #[error("integer overflow while computing storage offsets")]
    OffsetOverflow,

    #[error("dtype mismatch: expected {expected}, found {found}")]
    DTypeMismatch { expected: DType, found: DType },

    /// The primitive registry has no entry for this tag.
    #[error("no primitives registered for dtype {0}")]
    UnsupportedDType(DType),

    #[error("{op} is not supported for dtype {dtype}")]
    UnsupportedOp { op: &'static str, dtype: DType },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A thread panicked while holding a storage lock.
    #[error("storage lock poisoned")]
    StoragePoisoned,
}

impl NdError {
    /// Shape mismatch between two whole shapes.
    pub fn shape_mismatch(expected: &[usize], found: &[usize]) -> Self {
        NdError::ShapeMismatch {
            operand: None,
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}

/// Result type for layout and view operations.
pub type Result<T> = std::result::Result<T, NdError>;

/// Render a shape as `[d0,d1,...]`.
pub fn fmt_shape(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    format!("[{}]", dims.join(","))
}

fn fmt_shapes(shapes: &[Vec<usize>]) -> String {
    let parts: Vec<String> = shapes.iter().map(|s| fmt_shape(s)).collect();
    parts.join(", ")
}

fn at_operand(operand: &Option<usize>) -> String {
    match operand {
        Some(i) => format!(" at operand {i}"),
        None => String::new(),
    }
}
