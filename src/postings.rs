//! Sorted-sequence primitives shared by index building and querying.
//!
//! Every function here assumes its inputs are sorted ascending. That is a
//! precondition, not something checked at runtime: every writer sorts before
//! persisting and the dictionary reader rejects out-of-order files, so the
//! invariant holds by construction. Debug builds assert it.

use std::cmp::Ordering;

/// Document identifier.
pub type DocId = u64;

/// Ordered document identifiers for one term. Repeated IDs are kept and count
/// occurrences until a query collapses them.
pub type PostingsList = Vec<DocId>;

/// Which side(s) of a key merge a key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    /// Present only in the first sequence.
    Left,
    /// Present only in the second sequence.
    Right,
    /// Present in both sequences.
    Both,
}

impl KeyOrigin {
    /// Whether the key exists in the first sequence.
    pub fn in_left(self) -> bool {
        matches!(self, KeyOrigin::Left | KeyOrigin::Both)
    }

    /// Whether the key exists in the second sequence.
    pub fn in_right(self) -> bool {
        matches!(self, KeyOrigin::Right | KeyOrigin::Both)
    }
}

/// Merge two ascending sequences into one, keeping every element.
///
/// For any value `x`, the count of `x` in the output is its count in `a`
/// plus its count in `b`. Ties take from `a` first.
pub fn merge_sorted<T: Ord + Copy>(a: &[T], b: &[T]) -> Vec<T> {
    debug_assert!(is_sorted(a) && is_sorted(b));

    let mut result = Vec::with_capacity(a.len() + b.len());
    let mut i = 0;
    let mut j = 0;

    while i < a.len() && j < b.len() {
        if b[j] < a[i] {
            result.push(b[j]);
            j += 1;
        } else {
            result.push(a[i]);
            i += 1;
        }
    }
    result.extend_from_slice(&a[i..]);
    result.extend_from_slice(&b[j..]);

    result
}

/// Merge two ascending, duplicate-free key sequences into their sorted union,
/// tagging each key with the side(s) it came from.
///
/// When a key is in both inputs the one from `a` is returned.
pub fn merge_keys<K, A, B>(a: A, b: B) -> Vec<(K, KeyOrigin)>
where
    K: Ord,
    A: IntoIterator<Item = K>,
    B: IntoIterator<Item = K>,
{
    let mut a = a.into_iter();
    let mut b = b.into_iter();
    let mut merged = Vec::with_capacity(a.size_hint().0.max(b.size_hint().0));

    let mut left = a.next();
    let mut right = b.next();

    loop {
        match (left.take(), right.take()) {
            (Some(l), Some(r)) => match l.cmp(&r) {
                Ordering::Less => {
                    merged.push((l, KeyOrigin::Left));
                    left = a.next();
                    right = Some(r);
                }
                Ordering::Greater => {
                    merged.push((r, KeyOrigin::Right));
                    left = Some(l);
                    right = b.next();
                }
                Ordering::Equal => {
                    merged.push((l, KeyOrigin::Both));
                    left = a.next();
                    right = b.next();
                }
            },
            (Some(l), None) => {
                merged.push((l, KeyOrigin::Left));
                merged.extend(a.by_ref().map(|k| (k, KeyOrigin::Left)));
                break;
            }
            (None, Some(r)) => {
                merged.push((r, KeyOrigin::Right));
                merged.extend(b.by_ref().map(|k| (k, KeyOrigin::Right)));
                break;
            }
            (None, None) => break,
        }
    }

    merged
}

/// Ascending, duplicate-free intersection of two ascending sequences.
pub fn intersect_set<T: Ord + Copy>(a: &[T], b: &[T]) -> Vec<T> {
    debug_assert!(is_sorted(a) && is_sorted(b));

    let mut result: Vec<T> = Vec::new();
    let mut i = 0;
    let mut j = 0;

    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                if result.last() != Some(&a[i]) {
                    result.push(a[i]);
                }
                i += 1;
                j += 1;
            }
        }
    }

    result
}

/// Ascending, duplicate-free union of two ascending sequences.
pub fn union_set<T: Ord + Copy>(a: &[T], b: &[T]) -> Vec<T> {
    debug_assert!(is_sorted(a) && is_sorted(b));

    let mut result: Vec<T> = Vec::with_capacity(a.len().max(b.len()));
    let mut push = |value: T| {
        if result.last() != Some(&value) {
            result.push(value);
        }
    };

    let mut i = 0;
    let mut j = 0;
    while i < a.len() && j < b.len() {
        if b[j] < a[i] {
            push(b[j]);
            j += 1;
        } else {
            push(a[i]);
            i += 1;
        }
    }
    a[i..].iter().chain(&b[j..]).for_each(|&value| push(value));

    result
}

/// Number of distinct values in an ascending sequence.
pub fn distinct_count<T: PartialEq>(a: &[T]) -> usize {
    if a.is_empty() {
        return 0;
    }
    1 + a.windows(2).filter(|w| w[0] != w[1]).count()
}

/// Whether a sequence is non-decreasing.
pub fn is_sorted<T: PartialOrd>(a: &[T]) -> bool {
    a.windows(2).all(|w| w[0] <= w[1])
}
