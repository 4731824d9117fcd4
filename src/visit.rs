//! Visitor dispatch over the live alternative(s).
//!
//! A visitor is a type implementing [`Visit<T>`] (or one of its variants)
//! for every alternative of the list it is dispatched over, with one
//! common `Output`. Dispatch itself is a single indexed load from a flat
//! function-pointer table: for every distinct `(visitor, list, output)`
//! combination the compiler builds, as an associated const, a
//! `[Option<fn>; MAX_ALTS]` array (one table dimension per participating
//! union) whose cell `i` holds a monomorphized thunk that reinterprets the
//! storage as alternative `i` and calls the visitor. The tables live in
//! read-only static memory and are shared process-wide, so concurrent
//! dispatch needs no synchronization.
//!
//! Binary dispatch ([`visit2`]) keys a two-dimensional table by both live
//! indices; its size is the product of the participants' capacities. That
//! combinatorial growth is the deliberate price of O(1) dispatch and is
//! why [`MAX_ALTS`](crate::MAX_ALTS) is a hard cap.

use crate::{
    index::MAX_ALTS,
    list::AltList,
    union::{BadAccess, Union},
};

/// Visits one alternative by shared reference.
///
/// Implement this for every alternative of the list, with the same
/// `Output` in each impl.
pub trait Visit<T> {
    /// Common result type of the visitation.
    type Output;

    fn visit(self, value: &T) -> Self::Output;
}

/// Visits one alternative by mutable reference.
pub trait VisitMut<T> {
    /// Common result type of the visitation.
    type Output;

    fn visit_mut(self, value: &mut T) -> Self::Output;
}

/// [`Visit`], additionally handed the live index.
///
/// The index lets one visitor impl distinguish duplicate alternative
/// types without a second discriminant check.
pub trait VisitIndexed<T> {
    /// Common result type of the visitation.
    type Output;

    fn visit_indexed(self, value: &T, index: usize) -> Self::Output;
}

/// [`VisitMut`], additionally handed the live index.
pub trait VisitIndexedMut<T> {
    /// Common result type of the visitation.
    type Output;

    fn visit_indexed_mut(self, value: &mut T, index: usize) -> Self::Output;
}

/// Visits the live alternatives of two unions at once.
pub trait Visit2<A, B> {
    /// Common result type of the visitation.
    type Output;

    fn visit2(self, a: &A, b: &B) -> Self::Output;
}

/// [`Visit2`], additionally handed both live indices.
pub trait Visit2Indexed<A, B> {
    /// Common result type of the visitation.
    type Output;

    fn visit2_indexed(self, a: &A, b: &B, a_index: usize, b_index: usize) -> Self::Output;
}

// ---------------------------------------------------------------------------
// Raw dispatch layer.
//
// The tables are keyed by a *raw* visitor type so the plain and indexed
// public traits share one table mechanism: `Plain<V>` forwards and drops
// the indices, `WithIndex<V>` forwards and passes them through. Wrapping
// changes the visitor type, so plain and indexed dispatch over the same
// `V` get distinct tables, exactly as if they were distinct visitors.

#[doc(hidden)]
pub struct Plain<V>(pub V);

#[doc(hidden)]
pub struct WithIndex<V>(pub V);

#[doc(hidden)]
pub trait RawVisit<T> {
    type Output;

    fn call(self, value: &T, index: usize) -> Self::Output;
}

#[doc(hidden)]
pub trait RawVisitMut<T> {
    type Output;

    fn call_mut(self, value: &mut T, index: usize) -> Self::Output;
}

#[doc(hidden)]
pub trait RawVisit2<A, B> {
    type Output;

    fn call2(self, a: &A, b: &B, a_index: usize, b_index: usize) -> Self::Output;
}

impl<V: Visit<T>, T> RawVisit<T> for Plain<V> {
    type Output = V::Output;

    fn call(self, value: &T, _index: usize) -> V::Output {
        self.0.visit(value)
    }
}

impl<V: VisitIndexed<T>, T> RawVisit<T> for WithIndex<V> {
    type Output = V::Output;

    fn call(self, value: &T, index: usize) -> V::Output {
        self.0.visit_indexed(value, index)
    }
}

impl<V: VisitMut<T>, T> RawVisitMut<T> for Plain<V> {
    type Output = V::Output;

    fn call_mut(self, value: &mut T, _index: usize) -> V::Output {
        self.0.visit_mut(value)
    }
}

impl<V: VisitIndexedMut<T>, T> RawVisitMut<T> for WithIndex<V> {
    type Output = V::Output;

    fn call_mut(self, value: &mut T, index: usize) -> V::Output {
        self.0.visit_indexed_mut(value, index)
    }
}

impl<V: Visit2<A, B>, A, B> RawVisit2<A, B> for Plain<V> {
    type Output = V::Output;

    fn call2(self, a: &A, b: &B, _a_index: usize, _b_index: usize) -> V::Output {
        self.0.visit2(a, b)
    }
}

impl<V: Visit2Indexed<A, B>, A, B> RawVisit2<A, B> for WithIndex<V> {
    type Output = V::Output;

    fn call2(self, a: &A, b: &B, a_index: usize, b_index: usize) -> V::Output {
        self.0.visit2_indexed(a, b, a_index, b_index)
    }
}

type RefFn<V, O> = unsafe fn(V, *const u8, usize) -> O;
type MutFn<V, O> = unsafe fn(V, *mut u8, usize) -> O;
type PairFn<V, O> = unsafe fn(V, *const u8, *const u8, usize, usize) -> O;

// Cell thunks. Each monomorphization fixes one alternative type (or one
// pair) and reinterprets the storage accordingly; the tag invariant of
// `Union` guarantees the cast is the live type.

unsafe fn ref_thunk<V: RawVisit<T>, T>(visitor: V, base: *const u8, index: usize) -> V::Output {
    visitor.call(unsafe { &*base.cast::<T>() }, index)
}

unsafe fn mut_thunk<V: RawVisitMut<T>, T>(visitor: V, base: *mut u8, index: usize) -> V::Output {
    visitor.call_mut(unsafe { &mut *base.cast::<T>() }, index)
}

unsafe fn pair_thunk<V: RawVisit2<A, B>, A, B>(
    visitor: V,
    a: *const u8,
    b: *const u8,
    a_index: usize,
    b_index: usize,
) -> V::Output {
    visitor.call2(
        unsafe { &*a.cast::<A>() },
        unsafe { &*b.cast::<B>() },
        a_index,
        b_index,
    )
}

/// Lists over which a raw visitor `V` can be dispatched by shared
/// reference, carrying the dispatch table.
///
/// The table is built recursively: the head alternative's thunk in cell 0,
/// the tail's table shifted up by one. Cells past `LEN` stay `None` and
/// are unreachable under the tag invariant.
///
/// # Safety
///
/// Only the two list shapes implement this; the table cell `i` must be a
/// thunk for alternative `i` of the list.
#[doc(hidden)]
pub unsafe trait AcceptRef<V, O>: AltList {
    const TABLE: [Option<RefFn<V, O>>; MAX_ALTS];
}

unsafe impl<V, O> AcceptRef<V, O> for () {
    const TABLE: [Option<RefFn<V, O>>; MAX_ALTS] = [None; MAX_ALTS];
}

unsafe impl<H, T, V, O> AcceptRef<V, O> for (H, T)
where
    V: RawVisit<H, Output = O>,
    T: AcceptRef<V, O>,
{
    const TABLE: [Option<RefFn<V, O>>; MAX_ALTS] = {
        assert!(<Self as AltList>::LEN <= MAX_ALTS, "alternative list exceeds MAX_ALTS");
        let mut table = [None; MAX_ALTS];
        table[0] = Some(ref_thunk::<V, H> as RefFn<V, O>);
        let tail = <T as AcceptRef<V, O>>::TABLE;
        let mut i = 1;
        while i < MAX_ALTS {
            table[i] = tail[i - 1];
            i += 1;
        }
        table
    };
}

/// Mutable-reference counterpart of [`AcceptRef`].
///
/// # Safety
///
/// Same contract as [`AcceptRef`].
#[doc(hidden)]
pub unsafe trait AcceptMut<V, O>: AltList {
    const TABLE: [Option<MutFn<V, O>>; MAX_ALTS];
}

unsafe impl<V, O> AcceptMut<V, O> for () {
    const TABLE: [Option<MutFn<V, O>>; MAX_ALTS] = [None; MAX_ALTS];
}

unsafe impl<H, T, V, O> AcceptMut<V, O> for (H, T)
where
    V: RawVisitMut<H, Output = O>,
    T: AcceptMut<V, O>,
{
    const TABLE: [Option<MutFn<V, O>>; MAX_ALTS] = {
        assert!(<Self as AltList>::LEN <= MAX_ALTS, "alternative list exceeds MAX_ALTS");
        let mut table = [None; MAX_ALTS];
        table[0] = Some(mut_thunk::<V, H> as MutFn<V, O>);
        let tail = <T as AcceptMut<V, O>>::TABLE;
        let mut i = 1;
        while i < MAX_ALTS {
            table[i] = tail[i - 1];
            i += 1;
        }
        table
    };
}

/// One row of a binary table: the first participant's alternative `A` is
/// fixed, the row spans the second participant's list (`Self`).
///
/// # Safety
///
/// Same contract as [`AcceptRef`], per row.
#[doc(hidden)]
pub unsafe trait AcceptRow<V, A, O>: AltList {
    const ROW: [Option<PairFn<V, O>>; MAX_ALTS];
}

unsafe impl<V, A, O> AcceptRow<V, A, O> for () {
    const ROW: [Option<PairFn<V, O>>; MAX_ALTS] = [None; MAX_ALTS];
}

unsafe impl<HB, TB, V, A, O> AcceptRow<V, A, O> for (HB, TB)
where
    V: RawVisit2<A, HB, Output = O>,
    TB: AcceptRow<V, A, O>,
{
    const ROW: [Option<PairFn<V, O>>; MAX_ALTS] = {
        assert!(<Self as AltList>::LEN <= MAX_ALTS, "alternative list exceeds MAX_ALTS");
        let mut row = [None; MAX_ALTS];
        row[0] = Some(pair_thunk::<V, A, HB> as PairFn<V, O>);
        let tail = <TB as AcceptRow<V, A, O>>::ROW;
        let mut i = 1;
        while i < MAX_ALTS {
            row[i] = tail[i - 1];
            i += 1;
        }
        row
    };
}

/// The two-dimensional binary dispatch table: `Self` is the first
/// participant's list, `B` the second's. Built row by row, one row per
/// alternative of `Self`.
///
/// # Safety
///
/// Only the two list shapes implement this; cell `[i][j]` must be a thunk
/// for the pair (alternative `i` of `Self`, alternative `j` of `B`).
#[doc(hidden)]
pub unsafe trait AcceptPair<V, B, O>: AltList {
    const TABLE: [[Option<PairFn<V, O>>; MAX_ALTS]; MAX_ALTS];
}

unsafe impl<V, B, O> AcceptPair<V, B, O> for () {
    const TABLE: [[Option<PairFn<V, O>>; MAX_ALTS]; MAX_ALTS] = [[None; MAX_ALTS]; MAX_ALTS];
}

unsafe impl<HA, TA, V, B, O> AcceptPair<V, B, O> for (HA, TA)
where
    B: AcceptRow<V, HA, O>,
    TA: AcceptPair<V, B, O>,
{
    const TABLE: [[Option<PairFn<V, O>>; MAX_ALTS]; MAX_ALTS] = {
        assert!(<Self as AltList>::LEN <= MAX_ALTS, "alternative list exceeds MAX_ALTS");
        let mut table = [[None; MAX_ALTS]; MAX_ALTS];
        table[0] = <B as AcceptRow<V, HA, O>>::ROW;
        let tail = <TA as AcceptPair<V, B, O>>::TABLE;
        let mut i = 1;
        while i < MAX_ALTS {
            table[i] = tail[i - 1];
            i += 1;
        }
        table
    };
}

impl<L: AltList> Union<L> {
    /// Invokes `visitor` with a shared reference to the live alternative.
    ///
    /// Fails with [`BadAccess::Valueless`] before consulting the table if
    /// no alternative is live.
    pub fn visit<V, O>(&self, visitor: V) -> Result<O, BadAccess>
    where
        L: AcceptRef<Plain<V>, O>,
    {
        let tag = self.index().ok_or(BadAccess::Valueless)?;
        match <L as AcceptRef<Plain<V>, O>>::TABLE[tag] {
            Some(thunk) => Ok(unsafe { thunk(Plain(visitor), self.base_ptr(), tag) }),
            None => unreachable!("live tag {tag} has no dispatch cell"),
        }
    }

    /// Invokes `visitor` with a mutable reference to the live alternative.
    pub fn visit_mut<V, O>(&mut self, visitor: V) -> Result<O, BadAccess>
    where
        L: AcceptMut<Plain<V>, O>,
    {
        let tag = self.index().ok_or(BadAccess::Valueless)?;
        match <L as AcceptMut<Plain<V>, O>>::TABLE[tag] {
            Some(thunk) => Ok(unsafe { thunk(Plain(visitor), self.base_ptr_mut(), tag) }),
            None => unreachable!("live tag {tag} has no dispatch cell"),
        }
    }

    /// Like [`visit`](Union::visit), passing the live index along.
    pub fn visit_indexed<V, O>(&self, visitor: V) -> Result<O, BadAccess>
    where
        L: AcceptRef<WithIndex<V>, O>,
    {
        let tag = self.index().ok_or(BadAccess::Valueless)?;
        match <L as AcceptRef<WithIndex<V>, O>>::TABLE[tag] {
            Some(thunk) => Ok(unsafe { thunk(WithIndex(visitor), self.base_ptr(), tag) }),
            None => unreachable!("live tag {tag} has no dispatch cell"),
        }
    }

    /// Like [`visit_mut`](Union::visit_mut), passing the live index along.
    pub fn visit_indexed_mut<V, O>(&mut self, visitor: V) -> Result<O, BadAccess>
    where
        L: AcceptMut<WithIndex<V>, O>,
    {
        let tag = self.index().ok_or(BadAccess::Valueless)?;
        match <L as AcceptMut<WithIndex<V>, O>>::TABLE[tag] {
            Some(thunk) => Ok(unsafe { thunk(WithIndex(visitor), self.base_ptr_mut(), tag) }),
            None => unreachable!("live tag {tag} has no dispatch cell"),
        }
    }
}

/// Invokes `visitor` with the live alternatives of `a` and `b` through one
/// two-dimensional table lookup.
///
/// Fails with [`BadAccess::Valueless`] before consulting the table if
/// either participant is valueless.
pub fn visit2<V, A, B, O>(visitor: V, a: &Union<A>, b: &Union<B>) -> Result<O, BadAccess>
where
    A: AcceptPair<Plain<V>, B, O>,
    B: AltList,
{
    let (a_tag, b_tag) = match (a.index(), b.index()) {
        (Some(a_tag), Some(b_tag)) => (a_tag, b_tag),
        _ => return Err(BadAccess::Valueless),
    };
    match <A as AcceptPair<Plain<V>, B, O>>::TABLE[a_tag][b_tag] {
        Some(thunk) => {
            Ok(unsafe { thunk(Plain(visitor), a.base_ptr(), b.base_ptr(), a_tag, b_tag) })
        }
        None => unreachable!("live tags ({a_tag}, {b_tag}) have no dispatch cell"),
    }
}

/// [`visit2`], passing both live indices along.
pub fn visit2_indexed<V, A, B, O>(visitor: V, a: &Union<A>, b: &Union<B>) -> Result<O, BadAccess>
where
    A: AcceptPair<WithIndex<V>, B, O>,
    B: AltList,
{
    let (a_tag, b_tag) = match (a.index(), b.index()) {
        (Some(a_tag), Some(b_tag)) => (a_tag, b_tag),
        _ => return Err(BadAccess::Valueless),
    };
    match <A as AcceptPair<WithIndex<V>, B, O>>::TABLE[a_tag][b_tag] {
        Some(thunk) => {
            Ok(unsafe { thunk(WithIndex(visitor), a.base_ptr(), b.base_ptr(), a_tag, b_tag) })
        }
        None => unreachable!("live tags ({a_tag}, {b_tag}) have no dispatch cell"),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Alts, U0, U1, U2};

    type Mixed = Alts![u32, String, f64];

    struct TypeName;

    impl Visit<u32> for TypeName {
        type Output = &'static str;

        fn visit(self, _: &u32) -> &'static str {
            "u32"
        }
    }

    impl Visit<String> for TypeName {
        type Output = &'static str;

        fn visit(self, _: &String) -> &'static str {
            "string"
        }
    }

    impl Visit<f64> for TypeName {
        type Output = &'static str;

        fn visit(self, _: &f64) -> &'static str {
            "f64"
        }
    }

    #[test]
    fn unary_visit_reaches_every_cell() {
        let a = Union::<Mixed>::new(1u32);
        let b = Union::<Mixed>::new("x".to_owned());
        let c = Union::<Mixed>::new(0.5f64);
        assert_eq!(a.visit(TypeName), Ok("u32"));
        assert_eq!(b.visit(TypeName), Ok("string"));
        assert_eq!(c.visit(TypeName), Ok("f64"));
    }

    struct Stretch;

    impl VisitMut<u32> for Stretch {
        type Output = ();

        fn visit_mut(self, value: &mut u32) {
            *value *= 2;
        }
    }

    impl VisitMut<String> for Stretch {
        type Output = ();

        fn visit_mut(self, value: &mut String) {
            let doubled = value.repeat(2);
            *value = doubled;
        }
    }

    impl VisitMut<f64> for Stretch {
        type Output = ();

        fn visit_mut(self, value: &mut f64) {
            *value *= 2.0;
        }
    }

    #[test]
    fn mut_visit_mutates_in_place() {
        let mut u = Union::<Mixed>::new("ab".to_owned());
        u.visit_mut(Stretch).unwrap();
        assert_eq!(u.get::<String, _>().map(String::as_str), Ok("abab"));

        let mut v = Union::<Mixed>::new(21u32);
        v.visit_mut(Stretch).unwrap();
        assert_eq!(v.get::<u32, _>(), Ok(&42));
    }

    struct WhichIndex;

    impl<T> VisitIndexed<T> for WhichIndex {
        type Output = usize;

        fn visit_indexed(self, _: &T, index: usize) -> usize {
            index
        }
    }

    #[test]
    fn indexed_visit_reports_the_live_index() {
        type Dup = Alts![u32, u32, u32];
        for (union, expected) in [
            (Union::<Dup>::new::<_, U0>(1), 0),
            (Union::<Dup>::new::<_, U1>(1), 1),
            (Union::<Dup>::new::<_, U2>(1), 2),
        ] {
            assert_eq!(union.visit_indexed(WhichIndex), Ok(expected));
        }
    }

    struct PairName;

    // All six cells of the 3x2 table.
    macro_rules! pair_name {
        ($($a:ty, $b:ty => $name:literal;)*) => {
            $(impl Visit2<$a, $b> for PairName {
                type Output = &'static str;

                fn visit2(self, _: &$a, _: &$b) -> &'static str {
                    $name
                }
            })*
        };
    }

    type Two = Alts![bool, String];

    pair_name! {
        u32, bool => "u32/bool";
        u32, String => "u32/string";
        String, bool => "string/bool";
        String, String => "string/string";
        f64, bool => "f64/bool";
        f64, String => "f64/string";
    }

    #[test]
    fn binary_visit_reaches_all_six_cells() {
        let firsts = [
            Union::<Mixed>::new(1u32),
            Union::<Mixed>::new("s".to_owned()),
            Union::<Mixed>::new(0.5f64),
        ];
        let seconds = [
            Union::<Two>::new(true),
            Union::<Two>::new("t".to_owned()),
        ];
        let expected = [
            ["u32/bool", "u32/string"],
            ["string/bool", "string/string"],
            ["f64/bool", "f64/string"],
        ];
        for (i, a) in firsts.iter().enumerate() {
            for (j, b) in seconds.iter().enumerate() {
                assert_eq!(visit2(PairName, a, b), Ok(expected[i][j]));
            }
        }
    }

    struct BothIndices;

    impl<A, B> Visit2Indexed<A, B> for BothIndices {
        type Output = (usize, usize);

        fn visit2_indexed(self, _: &A, _: &B, a_index: usize, b_index: usize) -> (usize, usize) {
            (a_index, b_index)
        }
    }

    #[test]
    fn binary_indexed_visit_reports_both_indices() {
        let a = Union::<Mixed>::new(0.5f64);
        let b = Union::<Two>::new("t".to_owned());
        assert_eq!(visit2_indexed(BothIndices, &a, &b), Ok((2, 1)));
    }

    #[test]
    fn valueless_participants_fail_before_dispatch() {
        let mut u = Union::<Mixed>::new(1u32);
        u.try_emplace_with::<u32, U0, _, _>(|| Err(())).unwrap_err();
        assert_eq!(u.visit(TypeName), Err(BadAccess::Valueless));
        assert_eq!(u.visit_indexed(WhichIndex), Err(BadAccess::Valueless));

        let live = Union::<Two>::new(true);
        assert_eq!(
            visit2_indexed(BothIndices, &u, &live),
            Err(BadAccess::Valueless)
        );
        assert_eq!(
            visit2_indexed(BothIndices, &live, &u),
            Err(BadAccess::Valueless)
        );
    }
}
