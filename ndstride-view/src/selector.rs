//! Slicing requests and the resolver that normalizes them.
//!
//! Callers describe a slice as a flat list of [`RangeToken`]s: integer
//! groups (`i`, `(start, stop)`, `(start, stop, step)`) or pre-built
//! [`Selector`]s. [`resolve`] turns the tokens into selectors, and
//! [`Layout::slice`] applies them.
//!
//! ```
//! use ndstride_view::{s, Layout};
//!
//! let l = Layout::contiguous(&[10]);
//! let v = l.slice_tokens(&s![2..8]).unwrap();
//! assert_eq!(v.shape(), &[6]);
//! ```

use std::fmt;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use crate::layout::{Dims, Layout, Strides};
use crate::{NdError, Result};

/// Lone integer token that stands for [`Selector::NewAxis`].
pub const NEW_AXIS: isize = isize::MIN;

/// Lone integer token that stands for [`Selector::Ellipsis`].
pub const ELLIPSIS: isize = isize::MIN + 1;

/// One entry of a slicing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Pick one position and drop the axis. Negative counts from the end.
    Index(isize),
    /// Keep a strided range of the axis. Open bounds run to the end in the
    /// direction of `step`.
    Slice {
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    },
    /// Insert a size-1 axis without consuming a source axis.
    NewAxis,
    /// Stand-in for as many full slices as needed to cover the rank.
    Ellipsis,
}

impl Selector {
    /// The whole axis, `:`.
    pub const fn full() -> Self {
        Selector::Slice {
            start: None,
            stop: None,
            step: 1,
        }
    }

    pub const fn range(start: isize, stop: isize) -> Self {
        Selector::Slice {
            start: Some(start),
            stop: Some(stop),
            step: 1,
        }
    }

    pub const fn stepped(start: isize, stop: isize, step: isize) -> Self {
        Selector::Slice {
            start: Some(start),
            stop: Some(stop),
            step,
        }
    }

    /// Whether this selector uses up one axis of the source.
    #[inline]
    pub fn consumes_axis(&self) -> bool {
        matches!(self, Selector::Index(_) | Selector::Slice { .. })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Selector::Index(i) => write!(f, "{i}"),
            Selector::NewAxis => f.write_str("newaxis"),
            Selector::Ellipsis => f.write_str("..."),
            Selector::Slice { start, stop, step } => {
                if let Some(start) = start {
                    write!(f, "{start}")?;
                }
                f.write_str(":")?;
                if let Some(stop) = stop {
                    write!(f, "{stop}")?;
                }
                if step != 1 {
                    write!(f, ":{step}")?;
                }
                Ok(())
            }
        }
    }
}

/// Raw slicing token before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeToken {
    Ints(Vec<isize>),
    Selector(Selector),
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeToken::Selector(s) => write!(f, "{s}"),
            RangeToken::Ints(ints) => match ints.as_slice() {
                [NEW_AXIS] => f.write_str("newaxis"),
                [ELLIPSIS] => f.write_str("..."),
                [i] => write!(f, "{i}"),
                [a, b] => write!(f, "{a}:{b}"),
                [a, b, c] => write!(f, "{a}:{b}:{c}"),
                other => {
                    let parts: Vec<String> = other.iter().map(|i| i.to_string()).collect();
                    write!(f, "({})", parts.join(", "))
                }
            },
        }
    }
}

impl From<Selector> for RangeToken {
    fn from(s: Selector) -> Self {
        RangeToken::Selector(s)
    }
}

impl From<RangeFull> for RangeToken {
    fn from(_: RangeFull) -> Self {
        RangeToken::Selector(Selector::full())
    }
}

macro_rules! impl_range_token_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for RangeToken {
                fn from(i: $t) -> Self {
                    RangeToken::Ints(vec![i as isize])
                }
            }

            impl From<[$t; 2]> for RangeToken {
                fn from([a, b]: [$t; 2]) -> Self {
                    RangeToken::Ints(vec![a as isize, b as isize])
                }
            }

            impl From<[$t; 3]> for RangeToken {
                fn from([a, b, c]: [$t; 3]) -> Self {
                    RangeToken::Ints(vec![a as isize, b as isize, c as isize])
                }
            }

            impl From<Range<$t>> for RangeToken {
                fn from(r: Range<$t>) -> Self {
                    RangeToken::Ints(vec![r.start as isize, r.end as isize])
                }
            }

            impl From<RangeFrom<$t>> for RangeToken {
                fn from(r: RangeFrom<$t>) -> Self {
                    RangeToken::Selector(Selector::Slice {
                        start: Some(r.start as isize),
                        stop: None,
                        step: 1,
                    })
                }
            }

            impl From<RangeTo<$t>> for RangeToken {
                fn from(r: RangeTo<$t>) -> Self {
                    RangeToken::Selector(Selector::Slice {
                        start: None,
                        stop: Some(r.end as isize),
                        step: 1,
                    })
                }
            }
        )*
    };
}

impl_range_token_from_int!(i32, i64, isize, usize);

/// Build a `Vec<RangeToken>` from anything convertible to a token.
///
/// ```
/// use ndstride_view::{s, RangeToken, Selector};
///
/// let tokens = s![1, 2..8, [0, 10, 2], .., Selector::NewAxis];
/// assert_eq!(tokens.len(), 5);
/// assert_eq!(tokens[1], RangeToken::Ints(vec![2, 8]));
/// ```
#[macro_export]
macro_rules! s {
    ($($token:expr),* $(,)?) => {
        vec![$($crate::RangeToken::from($token)),*]
    };
}

fn fmt_tokens(tokens: &[RangeToken]) -> String {
    let parts: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    parts.join(", ")
}

fn fmt_selectors(selectors: &[Selector]) -> String {
    let parts: Vec<String> = selectors.iter().map(|s| s.to_string()).collect();
    parts.join(", ")
}

/// Turn raw tokens into selectors.
///
/// Fails with [`NdError::InvalidSelector`] on an empty group, a group of four
/// or more integers, a sentinel inside a group, a zero step, or a second
/// ellipsis.
pub fn resolve(tokens: &[RangeToken]) -> Result<Vec<Selector>> {
    let invalid = || NdError::InvalidSelector(fmt_tokens(tokens));
    let is_sentinel = |v: &isize| *v == NEW_AXIS || *v == ELLIPSIS;
    let mut out = Vec::with_capacity(tokens.len());
    let mut seen_ellipsis = false;
    for token in tokens {
        let selector = match token {
            RangeToken::Selector(s) => *s,
            RangeToken::Ints(ints) => match ints.as_slice() {
                [NEW_AXIS] => Selector::NewAxis,
                [ELLIPSIS] => Selector::Ellipsis,
                [i] => Selector::Index(*i),
                [a, b] if !is_sentinel(a) && !is_sentinel(b) => Selector::range(*a, *b),
                [a, b, c] if ![a, b, c].into_iter().any(is_sentinel) => {
                    Selector::stepped(*a, *b, *c)
                }
                _ => return Err(invalid()),
            },
        };
        match selector {
            Selector::Slice { step: 0, .. } => return Err(invalid()),
            Selector::Ellipsis if seen_ellipsis => return Err(invalid()),
            Selector::Ellipsis => seen_ellipsis = true,
            _ => {}
        }
        out.push(selector);
    }
    Ok(out)
}

/// Replace the ellipsis (or the missing tail) with full slices so that the
/// selectors consume exactly `rank` axes.
pub fn expand_selectors(selectors: &[Selector], rank: usize) -> Result<Vec<Selector>> {
    let consumed = selectors.iter().filter(|s| s.consumes_axis()).count();
    let ellipses = selectors
        .iter()
        .filter(|s| matches!(s, Selector::Ellipsis))
        .count();
    if consumed > rank || ellipses > 1 {
        return Err(NdError::InvalidSelector(fmt_selectors(selectors)));
    }
    let fill = rank - consumed;
    let mut out = Vec::with_capacity(selectors.len() + fill);
    for s in selectors {
        if *s == Selector::Ellipsis {
            out.extend(std::iter::repeat(Selector::full()).take(fill));
        } else {
            out.push(*s);
        }
    }
    if ellipses == 0 {
        out.extend(std::iter::repeat(Selector::full()).take(fill));
    }
    Ok(out)
}

/// Normalize an index into `[0, extent)`.
fn normalize_index(pos: isize, axis: usize, extent: usize) -> Result<usize> {
    let n = extent as isize;
    let i = if pos < 0 { pos + n } else { pos };
    if i < 0 || i >= n {
        return Err(NdError::IndexOutOfRange {
            index: pos,
            axis,
            extent,
        });
    }
    Ok(i as usize)
}

/// Normalize a slice bound and check it against `[lo, hi]`.
fn normalize_bound(pos: isize, axis: usize, extent: usize, lo: isize, hi: isize) -> Result<isize> {
    let n = extent as isize;
    let i = if pos < 0 { pos + n } else { pos };
    if i < lo || i > hi {
        return Err(NdError::IndexOutOfRange {
            index: pos,
            axis,
            extent,
        });
    }
    Ok(i)
}

/// First position and length of a slice along an axis of `extent`.
fn resolve_slice(
    start: Option<isize>,
    stop: Option<isize>,
    step: isize,
    axis: usize,
    extent: usize,
) -> Result<(isize, usize)> {
    let n = extent as isize;
    if step > 0 {
        let begin = match start {
            Some(v) => normalize_bound(v, axis, extent, 0, n)?,
            None => 0,
        };
        let end = match stop {
            Some(v) => normalize_bound(v, axis, extent, 0, n)?,
            None => n,
        };
        let len = if end > begin {
            ((end - begin) as usize).div_ceil(step.unsigned_abs())
        } else {
            0
        };
        Ok((begin, len))
    } else {
        let begin = match start {
            Some(v) => normalize_bound(v, axis, extent, 0, n - 1)?,
            None => n - 1,
        };
        let end = match stop {
            Some(v) => normalize_bound(v, axis, extent, 0, n)?,
            None => -1,
        };
        let len = if begin > end {
            ((begin - end) as usize).div_ceil(step.unsigned_abs())
        } else {
            0
        };
        Ok((begin, len))
    }
}

/// `offset + stride * steps`, failing instead of wrapping.
fn shift(offset: isize, stride: isize, steps: isize) -> Result<isize> {
    stride
        .checked_mul(steps)
        .and_then(|d| offset.checked_add(d))
        .ok_or(NdError::OffsetOverflow)
}

impl Layout {
    /// Apply resolved selectors.
    ///
    /// `Index` drops its axis, `Slice` restrides it and `NewAxis` inserts a
    /// size-1 axis. Missing trailing axes are kept whole.
    pub fn slice(&self, selectors: &[Selector]) -> Result<Layout> {
        let expanded = expand_selectors(selectors, self.ndim())?;
        let mut shape = Dims::new();
        let mut stride = Strides::new();
        let mut offset = self.offset;
        let mut axis = 0;
        for selector in &expanded {
            match *selector {
                Selector::Index(pos) => {
                    let i = normalize_index(pos, axis, self.shape[axis])?;
                    offset = shift(offset, self.stride[axis], i as isize)?;
                    axis += 1;
                }
                Selector::Slice { start, stop, step } => {
                    if step == 0 {
                        return Err(NdError::InvalidSelector(fmt_selectors(selectors)));
                    }
                    let (begin, len) = resolve_slice(start, stop, step, axis, self.shape[axis])?;
                    if len > 0 {
                        offset = shift(offset, self.stride[axis], begin)?;
                    }
                    // a step past the extent leaves at most one element,
                    // whose stride is never applied
                    let new_stride = match self.stride[axis].checked_mul(step) {
                        Some(s) => s,
                        None if len <= 1 => self.stride[axis],
                        None => return Err(NdError::OffsetOverflow),
                    };
                    shape.push(len);
                    stride.push(new_stride);
                    axis += 1;
                }
                Selector::NewAxis => {
                    shape.push(1);
                    stride.push(0);
                }
                Selector::Ellipsis => unreachable!("ellipsis survived expansion"),
            }
        }
        debug_assert_eq!(axis, self.ndim());
        Ok(Layout::from_parts(shape, stride, offset))
    }

    /// Resolve `tokens` and apply them.
    pub fn slice_tokens(&self, tokens: &[RangeToken]) -> Result<Layout> {
        self.slice(&resolve(tokens)?)
    }
}
