//! A generic tagged union over a fixed, ordered list of alternative types,
//! with O(1) visitor dispatch.
//!
//! [`Union<L>`] holds exactly one value out of the alternative list `L`
//! (written with the [`Alts!`] macro) in a single overlapped storage
//! region, and remembers which one with an integer tag. Alternatives are
//! addressed by type or by compile-time index ([`U0`], [`U1`], ...);
//! wrong-alternative access fails with [`BadAccess`] instead of being
//! undefined. A union whose fallible reconstruction failed is *valueless*:
//! a well-defined, inspectable empty state, never a stale tag over
//! destroyed storage.
//!
//! Visitation ([`Union::visit`], [`visit2`]) goes through function-pointer
//! tables built at compile time, one cell per combination of live indices,
//! so dispatch cost does not grow with the number of alternatives.
//!
//! ```
//! use unitag::{visit2, Alts, Union, Visit2};
//!
//! type Side = Alts![u32, f64];
//!
//! struct Area;
//!
//! impl Visit2<u32, u32> for Area {
//!     type Output = f64;
//!     fn visit2(self, a: &u32, b: &u32) -> f64 {
//!         (a * b) as f64
//!     }
//! }
//! impl Visit2<u32, f64> for Area {
//!     type Output = f64;
//!     fn visit2(self, a: &u32, b: &f64) -> f64 {
//!         *a as f64 * b
//!     }
//! }
//! impl Visit2<f64, u32> for Area {
//!     type Output = f64;
//!     fn visit2(self, a: &f64, b: &u32) -> f64 {
//!         a * *b as f64
//!     }
//! }
//! impl Visit2<f64, f64> for Area {
//!     type Output = f64;
//!     fn visit2(self, a: &f64, b: &f64) -> f64 {
//!         a * b
//!     }
//! }
//!
//! let w: Union<Side> = Union::new(3u32);
//! let h: Union<Side> = Union::new(0.5f64);
//! assert_eq!(visit2(Area, &w, &h), Ok(1.5));
//! ```

pub mod list;

pub mod index;
mod union;
mod visit;

pub use index::{
    Index, Next, MAX_ALTS, U0, U1, U10, U11, U12, U13, U14, U15, U2, U3, U4, U5, U6, U7, U8, U9,
};
pub use list::{
    AltList, CloneList, DebugList, EqList, Find, HashList, OrdList, PartialEqList, PartialOrdList,
};
pub use union::{BadAccess, Union};
pub use visit::{
    visit2, visit2_indexed, Visit, Visit2, Visit2Indexed, VisitIndexed, VisitIndexedMut, VisitMut,
};

// Dispatch machinery that appears in `where` clauses of the public visit
// surface. Reachable so downstream code can write generic bounds over it,
// hidden because it is not meant to be used directly.
#[doc(hidden)]
pub use visit::{
    AcceptMut, AcceptPair, AcceptRef, AcceptRow, Plain, RawVisit, RawVisit2, RawVisitMut,
    WithIndex,
};
