//! Alternative lists and their overlapped storage.
//!
//! An alternative list is a nested tuple `(T0, (T1, (..., ())))`, usually
//! written with the [`Alts!`](crate::Alts) macro. Its storage is the
//! recursive [`Cons`] union: alternative 0 overlapped with the storage of
//! the remaining alternatives. Because [`Cons`] is `#[repr(C)]`, both
//! fields sit at offset 0, so *every* alternative of a list starts at the
//! address of the root storage. All raw accessors in this module rely on
//! that invariant.
//!
//! This layer is completely unchecked: callers guarantee that the tag they
//! pass names the alternative that is actually live. Enforcement happens
//! one level up, in [`Union`](crate::Union).

use std::{
    cmp::Ordering,
    convert::Infallible,
    fmt,
    hash::{Hash, Hasher},
    mem::ManuallyDrop,
    ptr,
};

use crate::index::{Index, Next, U0};

/// Storage for one alternative overlapped with the storage of the rest.
///
/// Fields are `ManuallyDrop` so the union has no drop glue of its own;
/// destruction is driven through [`AltList::drop_at`] by whoever tracks
/// which field is live.
#[repr(C)]
pub union Cons<H, T> {
    // Only ever read through offset-0 pointer casts; the fields exist for
    // layout and to keep auto traits propagating.
    #[allow(dead_code)]
    head: ManuallyDrop<H>,
    #[allow(dead_code)]
    tail: ManuallyDrop<T>,
}

/// Terminator storage of the empty list. Uninhabited.
pub struct Nil(#[allow(dead_code)] Infallible);

/// An ordered, fixed list of alternative types.
///
/// # Safety
///
/// Implementations must guarantee that every alternative of `Repr` lives at
/// offset 0 of the storage, that `LEN` matches the list length, and that
/// [`drop_at`](Self::drop_at) runs exactly the destructor of the
/// alternative named by the tag. Only the two list shapes below implement
/// this trait.
pub unsafe trait AltList {
    /// The overlapped storage region for this list.
    type Repr;

    /// Number of alternatives.
    const LEN: usize;

    /// Runs the destructor of alternative `tag` in place.
    ///
    /// # Safety
    ///
    /// `base` must point to storage in which alternative `tag` is live, and
    /// that alternative must not be used afterwards.
    unsafe fn drop_at(base: *mut u8, tag: usize);
}

unsafe impl AltList for () {
    type Repr = Nil;
    const LEN: usize = 0;

    unsafe fn drop_at(_base: *mut u8, tag: usize) {
        unreachable!("tag {tag} dispatched into an empty alternative list")
    }
}

unsafe impl<H, T: AltList> AltList for (H, T) {
    type Repr = Cons<H, T::Repr>;
    const LEN: usize = 1 + T::LEN;

    unsafe fn drop_at(base: *mut u8, tag: usize) {
        if tag == 0 {
            unsafe { ptr::drop_in_place(base.cast::<H>()) }
        } else {
            unsafe { T::drop_at(base, tag - 1) }
        }
    }
}

/// Relates a list to one of its alternatives and that alternative's index.
///
/// Inference resolves this in either direction: name the type and the index
/// is found (`u.get::<String, _>()`), or name the index and the type is
/// found (`u.get::<_, U1>()`). Type-directed selection over a list that
/// contains the type twice is ambiguous and rejected at compile time;
/// index-directed selection keeps working on such lists.
///
/// ```compile_fail
/// use unitag::{Alts, Union};
///
/// // `u32` appears twice; selecting it by type cannot name a unique index.
/// let u: Union<Alts![u32, u32]> = Union::new(7u32);
/// ```
///
/// # Safety
///
/// Implementations must guarantee that `T` is exactly the alternative of
/// `Self` at position `I`, stored at offset 0 of the list storage.
pub unsafe trait Find<T, I: Index>: AltList {}

unsafe impl<T, Rest: AltList> Find<T, U0> for (T, Rest) {}

unsafe impl<H, Rest, T, I> Find<T, Next<I>> for (H, Rest)
where
    I: Index,
    Rest: Find<T, I>,
{
}

/// Lists whose alternatives are all `Clone`.
///
/// # Safety
///
/// Same layout contract as [`AltList`]; `clone_at` must construct a clone
/// of the live alternative of `src` into `dst`.
pub unsafe trait CloneList: AltList {
    /// # Safety
    ///
    /// Alternative `tag` must be live at `src`; `dst` must be valid,
    /// dead storage for the same list.
    unsafe fn clone_at(src: *const u8, dst: *mut u8, tag: usize);
}

unsafe impl CloneList for () {
    unsafe fn clone_at(_src: *const u8, _dst: *mut u8, tag: usize) {
        unreachable!("tag {tag} dispatched into an empty alternative list")
    }
}

unsafe impl<H: Clone, T: CloneList> CloneList for (H, T) {
    unsafe fn clone_at(src: *const u8, dst: *mut u8, tag: usize) {
        if tag == 0 {
            let value = unsafe { (*src.cast::<H>()).clone() };
            unsafe { dst.cast::<H>().write(value) }
        } else {
            unsafe { T::clone_at(src, dst, tag - 1) }
        }
    }
}

/// Lists whose alternatives are all `PartialEq`.
///
/// # Safety
///
/// Same layout contract as [`AltList`].
pub unsafe trait PartialEqList: AltList {
    /// # Safety
    ///
    /// Alternative `tag` must be live at both `a` and `b`.
    unsafe fn eq_at(a: *const u8, b: *const u8, tag: usize) -> bool;
}

unsafe impl PartialEqList for () {
    unsafe fn eq_at(_a: *const u8, _b: *const u8, tag: usize) -> bool {
        unreachable!("tag {tag} dispatched into an empty alternative list")
    }
}

unsafe impl<H: PartialEq, T: PartialEqList> PartialEqList for (H, T) {
    unsafe fn eq_at(a: *const u8, b: *const u8, tag: usize) -> bool {
        if tag == 0 {
            unsafe { *a.cast::<H>() == *b.cast::<H>() }
        } else {
            unsafe { T::eq_at(a, b, tag - 1) }
        }
    }
}

/// Lists whose alternatives are all `Eq`.
pub unsafe trait EqList: PartialEqList {}

unsafe impl EqList for () {}
unsafe impl<H: Eq, T: EqList> EqList for (H, T) {}

/// Lists whose alternatives are all `PartialOrd`.
///
/// # Safety
///
/// Same layout contract as [`AltList`].
pub unsafe trait PartialOrdList: PartialEqList {
    /// # Safety
    ///
    /// Alternative `tag` must be live at both `a` and `b`.
    unsafe fn partial_cmp_at(a: *const u8, b: *const u8, tag: usize) -> Option<Ordering>;
}

unsafe impl PartialOrdList for () {
    unsafe fn partial_cmp_at(_a: *const u8, _b: *const u8, tag: usize) -> Option<Ordering> {
        unreachable!("tag {tag} dispatched into an empty alternative list")
    }
}

unsafe impl<H: PartialOrd, T: PartialOrdList> PartialOrdList for (H, T) {
    unsafe fn partial_cmp_at(a: *const u8, b: *const u8, tag: usize) -> Option<Ordering> {
        if tag == 0 {
            unsafe { (*a.cast::<H>()).partial_cmp(&*b.cast::<H>()) }
        } else {
            unsafe { T::partial_cmp_at(a, b, tag - 1) }
        }
    }
}

/// Lists whose alternatives are all `Ord`.
///
/// # Safety
///
/// Same layout contract as [`AltList`].
pub unsafe trait OrdList: PartialOrdList + EqList {
    /// # Safety
    ///
    /// Alternative `tag` must be live at both `a` and `b`.
    unsafe fn cmp_at(a: *const u8, b: *const u8, tag: usize) -> Ordering;
}

unsafe impl OrdList for () {
    unsafe fn cmp_at(_a: *const u8, _b: *const u8, tag: usize) -> Ordering {
        unreachable!("tag {tag} dispatched into an empty alternative list")
    }
}

unsafe impl<H: Ord, T: OrdList> OrdList for (H, T) {
    unsafe fn cmp_at(a: *const u8, b: *const u8, tag: usize) -> Ordering {
        if tag == 0 {
            unsafe { (*a.cast::<H>()).cmp(&*b.cast::<H>()) }
        } else {
            unsafe { T::cmp_at(a, b, tag - 1) }
        }
    }
}

/// Lists whose alternatives are all `Debug`.
///
/// # Safety
///
/// Same layout contract as [`AltList`].
pub unsafe trait DebugList: AltList {
    /// # Safety
    ///
    /// Alternative `tag` must be live at `base`.
    unsafe fn fmt_at(base: *const u8, tag: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

unsafe impl DebugList for () {
    unsafe fn fmt_at(_base: *const u8, tag: usize, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        unreachable!("tag {tag} dispatched into an empty alternative list")
    }
}

unsafe impl<H: fmt::Debug, T: DebugList> DebugList for (H, T) {
    unsafe fn fmt_at(base: *const u8, tag: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if tag == 0 {
            unsafe { fmt::Debug::fmt(&*base.cast::<H>(), f) }
        } else {
            unsafe { T::fmt_at(base, tag - 1, f) }
        }
    }
}

/// Lists whose alternatives are all `Hash`.
///
/// # Safety
///
/// Same layout contract as [`AltList`].
pub unsafe trait HashList: AltList {
    /// # Safety
    ///
    /// Alternative `tag` must be live at `base`.
    unsafe fn hash_at(base: *const u8, tag: usize, state: &mut dyn Hasher);
}

unsafe impl HashList for () {
    unsafe fn hash_at(_base: *const u8, tag: usize, _state: &mut dyn Hasher) {
        unreachable!("tag {tag} dispatched into an empty alternative list")
    }
}

unsafe impl<H: Hash, T: HashList> HashList for (H, T) {
    unsafe fn hash_at(base: *const u8, tag: usize, mut state: &mut dyn Hasher) {
        if tag == 0 {
            unsafe { (*base.cast::<H>()).hash(&mut state) }
        } else {
            unsafe { T::hash_at(base, tag - 1, state) }
        }
    }
}

/// Writes an alternative list type: `Alts![A, B, C]` is `(A, (B, (C, ())))`.
#[macro_export]
macro_rules! Alts {
    () => { () };
    ($head:ty $(, $rest:ty)* $(,)?) => {
        ($head, $crate::Alts![$($rest),*])
    };
}
