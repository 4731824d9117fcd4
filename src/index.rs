//! Type-level alternative indices.
//!
//! An index is a peano-encoded marker type ([`U0`], [`Next<U0>`], ...) that
//! names a position in an alternative list at compile time. Indices never
//! exist as values; they only steer trait resolution and carry their numeric
//! value as an associated const.

use std::marker::PhantomData;

/// Maximum number of alternatives a [`Union`](crate::Union) may carry.
///
/// Dispatch tables are flat arrays of this capacity, so the cap is a hard
/// compile-time limit rather than a soft recommendation.
pub const MAX_ALTS: usize = 16;

/// The index of the first alternative.
pub enum U0 {}

/// The index after `I`.
pub struct Next<I>(PhantomData<I>);

/// A type-level alternative index.
pub trait Index {
    /// The numeric value of this index.
    const VALUE: usize;
}

impl Index for U0 {
    const VALUE: usize = 0;
}

impl<I: Index> Index for Next<I> {
    const VALUE: usize = I::VALUE + 1;
}

pub type U1 = Next<U0>;
pub type U2 = Next<U1>;
pub type U3 = Next<U2>;
pub type U4 = Next<U3>;
pub type U5 = Next<U4>;
pub type U6 = Next<U5>;
pub type U7 = Next<U6>;
pub type U8 = Next<U7>;
pub type U9 = Next<U8>;
pub type U10 = Next<U9>;
pub type U11 = Next<U10>;
pub type U12 = Next<U11>;
pub type U13 = Next<U12>;
pub type U14 = Next<U13>;
pub type U15 = Next<U14>;
