//! Feature-gated Sync marker for element closures.
//!
//! With the `parallel` feature, [`MaybeSync`] is [`Sync`], so closures can be
//! shared across rayon workers. Without it the trait is blanket-implemented
//! and closures need no thread bounds.

#[cfg(feature = "parallel")]
pub trait MaybeSync: Sync {}
#[cfg(feature = "parallel")]
impl<T: Sync> MaybeSync for T {}

#[cfg(not(feature = "parallel"))]
pub trait MaybeSync {}
#[cfg(not(feature = "parallel"))]
impl<T> MaybeSync for T {}
