//! The tagged union value and its discriminant-checked surface.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    mem::{self, ManuallyDrop, MaybeUninit},
};

use thiserror::Error;

use crate::{
    index::Index,
    list::{
        AltList, CloneList, DebugList, EqList, Find, HashList, OrdList, PartialEqList,
        PartialOrdList,
    },
};

// Discriminant sentinel for the valueless state.
const NPOS: usize = usize::MAX;

/// Error returned when an access or a visit names an alternative that is
/// not currently live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BadAccess {
    /// A different alternative is live.
    #[error("alternative {requested} requested but alternative {active} is live")]
    WrongAlternative {
        /// The index the caller asked for.
        requested: usize,
        /// The index that is actually live.
        active: usize,
    },
    /// No alternative is live at all.
    #[error("the union is valueless")]
    Valueless,
}

/// A value holding exactly one alternative out of the fixed list `L`, or
/// none.
///
/// The alternative list is a nested tuple written with
/// [`Alts!`](crate::Alts); storage is a single region that overlaps all
/// alternatives, and a tag records which one is live. The *valueless*
/// state (no live alternative) is well-defined but only reachable through
/// a failed [`try_emplace_with`](Union::try_emplace_with) or a panicking
/// [`emplace_with`](Union::emplace_with) closure, never through ordinary
/// construction.
///
/// ```
/// use unitag::{Alts, Union, U1};
///
/// let mut u: Union<Alts![u32, String]> = Union::new(7u32);
/// assert_eq!(u.index(), Some(0));
/// assert_eq!(u.get::<u32, _>(), Ok(&7));
///
/// u.emplace::<_, U1>("seven".to_owned());
/// assert_eq!(u.get::<String, _>().map(String::as_str), Ok("seven"));
/// ```
pub struct Union<L: AltList> {
    tag: usize,
    repr: MaybeUninit<L::Repr>,
}

impl<L: AltList> Union<L> {
    /// Number of alternatives in the list.
    pub const ALT_COUNT: usize = L::LEN;

    /// Constructs a union holding `value`.
    ///
    /// The target alternative is selected by the value's type; if the list
    /// contains the type more than once the selection is ambiguous and the
    /// call does not compile, but the index can be forced instead:
    /// `Union::new::<_, U1>(value)`.
    ///
    /// ```compile_fail
    /// use unitag::{Alts, Union};
    ///
    /// // `f64` matches no alternative of the list.
    /// let u: Union<Alts![u32, String]> = Union::new(1.5f64);
    /// ```
    pub fn new<T, I: Index>(value: T) -> Self
    where
        L: Find<T, I>,
    {
        let mut union = Self {
            tag: NPOS,
            repr: MaybeUninit::uninit(),
        };
        // Every alternative lives at offset 0 of the overlapped storage.
        unsafe { union.base_ptr_mut().cast::<T>().write(value) };
        union.tag = I::VALUE;
        union
    }

    /// The index of the live alternative, or `None` when valueless.
    pub fn index(&self) -> Option<usize> {
        (self.tag != NPOS).then_some(self.tag)
    }

    /// Whether no alternative is live.
    pub fn is_valueless(&self) -> bool {
        self.tag == NPOS
    }

    /// Whether the alternative `T` is the live one.
    pub fn holds<T, I: Index>(&self) -> bool
    where
        L: Find<T, I>,
    {
        self.tag == I::VALUE
    }

    /// A reference to the live alternative, selected by type or index.
    ///
    /// Fails with [`BadAccess`] when a different alternative (or none) is
    /// live.
    pub fn get<T, I: Index>(&self) -> Result<&T, BadAccess>
    where
        L: Find<T, I>,
    {
        if self.tag == I::VALUE {
            Ok(unsafe { &*self.base_ptr().cast::<T>() })
        } else {
            Err(self.bad_access(I::VALUE))
        }
    }

    /// Mutable variant of [`get`](Union::get).
    pub fn get_mut<T, I: Index>(&mut self) -> Result<&mut T, BadAccess>
    where
        L: Find<T, I>,
    {
        if self.tag == I::VALUE {
            Ok(unsafe { &mut *self.base_ptr_mut().cast::<T>() })
        } else {
            Err(self.bad_access(I::VALUE))
        }
    }

    /// Non-failing probe: a reference to the alternative if it is live.
    pub fn get_if<T, I: Index>(&self) -> Option<&T>
    where
        L: Find<T, I>,
    {
        (self.tag == I::VALUE).then(|| unsafe { &*self.base_ptr().cast::<T>() })
    }

    /// Mutable variant of [`get_if`](Union::get_if).
    pub fn get_if_mut<T, I: Index>(&mut self) -> Option<&mut T>
    where
        L: Find<T, I>,
    {
        (self.tag == I::VALUE).then(|| unsafe { &mut *self.base_ptr_mut().cast::<T>() })
    }

    /// Consumes the union and extracts the alternative, or hands the union
    /// back unchanged when a different alternative (or none) is live.
    pub fn into_inner<T, I: Index>(self) -> Result<T, Self>
    where
        L: Find<T, I>,
    {
        if self.tag != I::VALUE {
            return Err(self);
        }
        let mut this = ManuallyDrop::new(self);
        Ok(unsafe { this.base_ptr_mut().cast::<T>().read() })
    }

    /// Destroys the live alternative (if any) and constructs `value` in
    /// place, switching the live index. Returns a reference to the new
    /// value.
    pub fn emplace<T, I: Index>(&mut self, value: T) -> &mut T
    where
        L: Find<T, I>,
    {
        self.emplace_with::<T, I, _>(|| value)
    }

    /// Like [`emplace`](Union::emplace), but constructs the value inside
    /// the union's "empty" window. If `f` panics, the union is left
    /// valueless rather than holding a stale tag over destroyed storage.
    pub fn emplace_with<T, I: Index, F>(&mut self, f: F) -> &mut T
    where
        L: Find<T, I>,
        F: FnOnce() -> T,
    {
        self.reset();
        // An unwind out of `f` leaves `self` valueless.
        let value = f();
        unsafe { self.base_ptr_mut().cast::<T>().write(value) };
        self.tag = I::VALUE;
        unsafe { &mut *self.base_ptr_mut().cast::<T>() }
    }

    /// Fallible [`emplace_with`](Union::emplace_with): on `Err` the union
    /// is left valueless and the error is propagated.
    pub fn try_emplace_with<T, I: Index, E, F>(&mut self, f: F) -> Result<&mut T, E>
    where
        L: Find<T, I>,
        F: FnOnce() -> Result<T, E>,
    {
        self.reset();
        let value = f()?;
        unsafe { self.base_ptr_mut().cast::<T>().write(value) };
        self.tag = I::VALUE;
        Ok(unsafe { &mut *self.base_ptr_mut().cast::<T>() })
    }

    /// Converting assignment: assigns in place when the selected
    /// alternative is already live, otherwise destroys the live value and
    /// constructs this one.
    pub fn set<T, I: Index>(&mut self, value: T) -> &mut T
    where
        L: Find<T, I>,
    {
        if self.tag == I::VALUE {
            let slot = unsafe { &mut *self.base_ptr_mut().cast::<T>() };
            *slot = value;
            slot
        } else {
            self.emplace::<T, I>(value)
        }
    }

    /// Moves the value out, leaving `self` valueless.
    pub fn take(&mut self) -> Self {
        Self {
            tag: mem::replace(&mut self.tag, NPOS),
            repr: mem::replace(&mut self.repr, MaybeUninit::uninit()),
        }
    }

    /// Swaps the contents of two unions, tags included. Bitwise, so it
    /// cannot fail and needs nothing from the alternatives.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.tag, &mut other.tag);
        mem::swap(&mut self.repr, &mut other.repr);
    }

    pub(crate) fn base_ptr(&self) -> *const u8 {
        self.repr.as_ptr().cast()
    }

    pub(crate) fn base_ptr_mut(&mut self) -> *mut u8 {
        self.repr.as_mut_ptr().cast()
    }

    // Destroys the live alternative. The tag is cleared *before* the
    // destructor runs so an unwinding drop leaves a valueless union, not a
    // tag pointing at destroyed storage.
    fn reset(&mut self) {
        if self.tag != NPOS {
            let tag = mem::replace(&mut self.tag, NPOS);
            unsafe { L::drop_at(self.base_ptr_mut(), tag) };
        }
    }

    fn bad_access(&self, requested: usize) -> BadAccess {
        match self.index() {
            Some(active) => BadAccess::WrongAlternative { requested, active },
            None => BadAccess::Valueless,
        }
    }
}

impl<L: AltList> Drop for Union<L> {
    fn drop(&mut self) {
        self.reset();
    }
}

/// Constructs alternative 0 from its `Default`.
impl<H: Default, T: AltList> Default for Union<(H, T)> {
    fn default() -> Self {
        Self::new::<H, crate::index::U0>(H::default())
    }
}

impl<L: CloneList> Clone for Union<L> {
    fn clone(&self) -> Self {
        let mut union = Self {
            tag: NPOS,
            repr: MaybeUninit::uninit(),
        };
        if let Some(tag) = self.index() {
            unsafe { L::clone_at(self.base_ptr(), union.base_ptr_mut(), tag) };
            union.tag = tag;
        }
        union
    }
}

impl<L: PartialEqList> PartialEq for Union<L> {
    fn eq(&self, other: &Self) -> bool {
        if self.tag != other.tag {
            return false;
        }
        match self.index() {
            // Two valueless unions of the same list are equal.
            None => true,
            Some(tag) => unsafe { L::eq_at(self.base_ptr(), other.base_ptr(), tag) },
        }
    }
}

impl<L: EqList> Eq for Union<L> {}

/// Total order: valueless first, then by live index, then by value.
impl<L: PartialOrdList> PartialOrd for Union<L> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.index(), other.index()) {
            (None, None) => Some(Ordering::Equal),
            (None, Some(_)) => Some(Ordering::Less),
            (Some(_), None) => Some(Ordering::Greater),
            (Some(a), Some(b)) if a != b => Some(a.cmp(&b)),
            (Some(tag), Some(_)) => unsafe {
                L::partial_cmp_at(self.base_ptr(), other.base_ptr(), tag)
            },
        }
    }
}

impl<L: OrdList> Ord for Union<L> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.index(), other.index()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) if a != b => a.cmp(&b),
            (Some(tag), Some(_)) => unsafe { L::cmp_at(self.base_ptr(), other.base_ptr(), tag) },
        }
    }
}

impl<L: DebugList> fmt::Debug for Union<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(tag) => {
                write!(f, "Union[{tag}](")?;
                unsafe { L::fmt_at(self.base_ptr(), tag, f)? };
                f.write_str(")")
            }
            None => f.write_str("Union[valueless]"),
        }
    }
}

impl<L: HashList> Hash for Union<L> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag.hash(state);
        if let Some(tag) = self.index() {
            unsafe { L::hash_at(self.base_ptr(), tag, state) };
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Alts, U0, U1, U2};

    type Mixed = Alts![u32, String, Vec<u8>];

    #[test]
    fn construction_by_type_and_by_index() {
        let a: Union<Mixed> = Union::new("abc".to_owned());
        assert_eq!(a.index(), Some(1));
        assert!(a.holds::<String, _>());
        assert!(!a.holds::<u32, _>());

        let b = Union::<Mixed>::new::<_, U2>(vec![1u8, 2]);
        assert_eq!(b.index(), Some(2));
        assert_eq!(b.get::<Vec<u8>, _>(), Ok(&vec![1u8, 2]));
    }

    #[test]
    fn duplicate_alternatives_by_index() {
        // Type-directed selection over this list would be ambiguous; the
        // index keeps both slots reachable.
        let a = Union::<Alts![u32, u32]>::new::<_, U0>(1);
        let b = Union::<Alts![u32, u32]>::new::<_, U1>(1);
        assert_eq!(a.index(), Some(0));
        assert_eq!(b.index(), Some(1));
    }

    #[test]
    fn default_constructs_the_first_alternative() {
        let u = Union::<Mixed>::default();
        assert_eq!(u.index(), Some(0));
        assert_eq!(u.get::<u32, _>(), Ok(&0));
    }

    #[test]
    fn get_reports_the_live_alternative() {
        let u: Union<Mixed> = Union::new(5u32);
        assert_eq!(u.get::<u32, _>(), Ok(&5));
        assert_eq!(
            u.get::<String, _>(),
            Err(BadAccess::WrongAlternative {
                requested: 1,
                active: 0
            })
        );
        assert_eq!(u.get_if::<String, _>(), None);
        assert_eq!(u.get_if::<u32, _>(), Some(&5));
    }

    #[test]
    fn emplace_switches_the_live_alternative() {
        let mut u: Union<Mixed> = Union::new(5u32);
        u.emplace::<_, U1>("five".to_owned());
        assert_eq!(u.index(), Some(1));
        assert_eq!(u.get_if::<u32, _>(), None);

        // Re-emplacing the same index reconstructs, it does not assign.
        u.emplace::<_, U1>("six".to_owned());
        assert_eq!(u.get::<String, _>().map(String::as_str), Ok("six"));
    }

    #[test]
    fn set_assigns_in_place_or_reconstructs() {
        let mut u: Union<Mixed> = Union::new("one".to_owned());
        u.set("two".to_owned());
        assert_eq!(u.index(), Some(1));
        u.set(3u32);
        assert_eq!(u.get::<u32, _>(), Ok(&3));
    }

    #[test]
    fn failed_construction_leaves_the_union_valueless() {
        let mut u: Union<Mixed> = Union::new(1u32);
        let result = u.try_emplace_with::<String, U1, _, _>(|| Err("nope"));
        assert_eq!(result.unwrap_err(), "nope");
        assert!(u.is_valueless());
        assert_eq!(u.index(), None);
        assert_eq!(u.get::<u32, _>(), Err(BadAccess::Valueless));
        assert_eq!(u.get_if::<u32, _>(), None);

        // A later emplace fully revives it.
        u.emplace::<_, U0>(2u32);
        assert_eq!(u.get::<u32, _>(), Ok(&2));
    }

    #[test]
    fn panicking_construction_leaves_the_union_valueless() {
        let mut u: Union<Mixed> = Union::new("live".to_owned());
        let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            u.emplace_with::<u32, U0, _>(|| panic!("constructor failed"));
        }));
        assert!(panicked.is_err());
        assert!(u.is_valueless());
    }

    #[test]
    fn take_leaves_the_source_valueless() {
        let mut u: Union<Mixed> = Union::new("moved".to_owned());
        let taken = u.take();
        assert!(u.is_valueless());
        assert_eq!(taken.index(), Some(1));
        assert_eq!(taken.get::<String, _>().map(String::as_str), Ok("moved"));
    }

    #[test]
    fn swap_is_its_own_inverse() {
        let mut a: Union<Mixed> = Union::new(1u32);
        let mut b: Union<Mixed> = Union::new("two".to_owned());

        a.swap(&mut b);
        assert_eq!(a.index(), Some(1));
        assert_eq!(b.index(), Some(0));

        a.swap(&mut b);
        assert_eq!(a.get::<u32, _>(), Ok(&1));
        assert_eq!(b.get::<String, _>().map(String::as_str), Ok("two"));

        // Same-index case.
        let mut c: Union<Mixed> = Union::new(10u32);
        let mut d: Union<Mixed> = Union::new(20u32);
        c.swap(&mut d);
        assert_eq!(c.get::<u32, _>(), Ok(&20));
        assert_eq!(d.get::<u32, _>(), Ok(&10));
    }

    #[test]
    fn into_inner_extracts_or_returns_self() {
        let u: Union<Mixed> = Union::new("inner".to_owned());
        let u = u.into_inner::<u32, _>().unwrap_err();
        assert_eq!(u.into_inner::<String, _>().unwrap(), "inner");
    }

    #[test]
    fn clone_replicates_tag_and_value() {
        let u: Union<Mixed> = Union::new("dup".to_owned());
        let v = u.clone();
        assert_eq!(v.get::<String, _>().map(String::as_str), Ok("dup"));
        assert_eq!(u, v);

        let mut w: Union<Mixed> = Union::new(0u32);
        w.try_emplace_with::<u32, U0, _, _>(|| Err(())).unwrap_err();
        let x = w.clone();
        assert!(x.is_valueless());
        assert_eq!(w, x);
    }

    #[test]
    fn equality_requires_matching_index_and_value() {
        type L = Alts![u32, u32];
        let a = Union::<L>::new::<_, U0>(1);
        let b = Union::<L>::new::<_, U1>(1);
        let c = Union::<L>::new::<_, U0>(1);
        let d = Union::<L>::new::<_, U0>(2);
        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn ordering_is_valueless_then_index_then_value() {
        type L = Alts![u32, u32];
        let low_index = Union::<L>::new::<_, U0>(u32::MAX);
        let high_index = Union::<L>::new::<_, U1>(0);
        assert!(low_index < high_index);

        let small = Union::<L>::new::<_, U0>(1);
        let big = Union::<L>::new::<_, U0>(2);
        assert!(small < big);
        assert!(big <= big.clone());

        let mut valueless = Union::<L>::new::<_, U0>(9);
        valueless
            .try_emplace_with::<u32, U0, _, _>(|| Err(()))
            .unwrap_err();
        assert!(valueless < small);
        assert!(high_index > valueless);
    }

    #[test]
    fn drop_runs_once_and_only_for_the_live_alternative() {
        use std::rc::Rc;

        let witness = Rc::new(());
        {
            let _u: Union<Alts![Rc<()>, u32]> = Union::new(Rc::clone(&witness));
            assert_eq!(Rc::strong_count(&witness), 2);
        }
        assert_eq!(Rc::strong_count(&witness), 1);

        let mut u: Union<Alts![Rc<()>, u32]> = Union::new(Rc::clone(&witness));
        u.emplace::<_, U1>(5);
        assert_eq!(Rc::strong_count(&witness), 1);
    }

    #[test]
    fn debug_format_names_the_live_index() {
        let u: Union<Mixed> = Union::new(7u32);
        assert_eq!(format!("{u:?}"), "Union[0](7)");

        let mut v: Union<Mixed> = Union::new(7u32);
        v.try_emplace_with::<u32, U0, _, _>(|| Err(())).unwrap_err();
        assert_eq!(format!("{v:?}"), "Union[valueless]");
    }

    #[test]
    fn hashing_includes_the_tag() {
        use std::collections::HashSet;

        type L = Alts![u32, u32];
        let mut set = HashSet::new();
        set.insert(Union::<L>::new::<_, U0>(1));
        set.insert(Union::<L>::new::<_, U1>(1));
        set.insert(Union::<L>::new::<_, U0>(1));
        assert_eq!(set.len(), 2);
    }
}
