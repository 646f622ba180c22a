//! Ordering utilities for capres.
//!
//! Preference orders are built as cascades: each step either decides the
//! comparison for good or defers to the next step. These helpers make that
//! cascade explicit so the rules stay visible and auditable.

use std::cmp::Ordering;

use crate::errors::{CapresError, CapresResult};

/// Outcome of one step of a comparison cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The comparison is decided.
    Final(Ordering),
    /// Both sides are equivalent for this step; consult the next one.
    Continue,
}

impl Step {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Final(_))
    }
}

/// Presence step: absent values sort after present ones.
///
/// Two absent values are equal and final. Two present values defer.
pub fn compare_present<A, B>(a: Option<A>, b: Option<B>) -> Step {
    match (a.is_some(), b.is_some()) {
        (true, true) => Step::Continue,
        (false, false) => Step::Final(Ordering::Equal),
        (true, false) => Step::Final(Ordering::Less),
        (false, true) => Step::Final(Ordering::Greater),
    }
}

/// Flag step: `true` sorts first.
pub fn prefer_true(a: bool, b: bool) -> Step {
    match b.cmp(&a) {
        Ordering::Equal => Step::Continue,
        o => Step::Final(o),
    }
}

/// Sort with a comparator. `slice::sort_by` is stable, so ties keep insertion order.
pub fn stable_sort_by<T, F>(items: &mut [T], cmp: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    items.sort_by(cmp);
}

/// Ensure a slice is already sorted under `cmp`.
///
/// Returns an error if any adjacent pair is out of order.
pub fn ensure_sorted_by<T, F>(items: &[T], mut cmp: F) -> CapresResult<()>
where
    F: FnMut(&T, &T) -> Ordering,
{
    for w in items.windows(2) {
        if cmp(&w[0], &w[1]) == Ordering::Greater {
            return Err(CapresError::invariant(
                "collection is not sorted under the preference order",
            ));
        }
    }
    Ok(())
}
