//! Deterministic ordering helpers.

pub mod ordering;

pub use ordering::{compare_present, ensure_sorted_by, prefer_true, stable_sort_by, Step};
