//! Term dictionaries.
//!
//! A [`Dictionary`] maps terms to postings lists and always iterates in
//! ascending term order. The same type holds a single block read back from
//! storage and the merged dictionary of the whole collection.

pub mod format;
pub mod persist;

use std::collections::BTreeMap;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::postings::{DocId, PostingsList, distinct_count};

/// Sorted mapping from term to postings list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    terms: BTreeMap<String, PostingsList>,
}

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the dictionary has no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Postings for `term`, matched byte for byte.
    pub fn get(&self, term: &str) -> Option<&[DocId]> {
        self.terms.get(term).map(Vec::as_slice)
    }

    /// Whether `term` is present.
    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains_key(term)
    }

    /// Terms in ascending order.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(String::as_str)
    }

    /// Entries in ascending term order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DocId])> {
        self.terms.iter().map(|(t, p)| (t.as_str(), p.as_slice()))
    }

    /// Insert or replace the postings of `term`.
    pub fn insert(&mut self, term: String, postings: PostingsList) -> Option<PostingsList> {
        self.terms.insert(term, postings)
    }

    /// Remove the empty-string term if present.
    pub fn remove_empty_term(&mut self) -> Option<PostingsList> {
        self.terms.remove("")
    }

    /// Compute term, token and non-positional posting counts.
    pub fn stats(&self) -> DictionaryStats {
        DictionaryStats::from_entries(self.iter())
    }

    /// Statistics over the terms not in `excluded`.
    pub fn stats_excluding(&self, excluded: &[&str]) -> DictionaryStats {
        let excluded: AHashSet<&str> = excluded.iter().copied().collect();
        DictionaryStats::from_entries(self.iter().filter(|(term, _)| !excluded.contains(term)))
    }
}

impl FromIterator<(String, PostingsList)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (String, PostingsList)>>(iter: I) -> Self {
        Dictionary {
            terms: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Dictionary {
    type Item = (String, PostingsList);
    type IntoIter = std::collections::btree_map::IntoIter<String, PostingsList>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.into_iter()
    }
}

/// Counts used to compare dictionary compression strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryStats {
    /// Number of distinct terms.
    pub terms: usize,
    /// Sum of postings-list lengths, duplicates included.
    pub tokens: u64,
    /// Sum over terms of the number of distinct documents.
    pub non_positional_postings: u64,
}

impl DictionaryStats {
    /// Account for one more term with the given postings.
    pub fn record(&mut self, postings: &[DocId]) {
        self.terms += 1;
        self.tokens += postings.len() as u64;
        self.non_positional_postings += distinct_count(postings) as u64;
    }

    fn from_entries<'a>(entries: impl Iterator<Item = (&'a str, &'a [DocId])>) -> Self {
        entries.fold(DictionaryStats::default(), |mut stats, (_, postings)| {
            stats.record(postings);
            stats
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dictionary {
        [
            ("honda".to_string(), vec![3, 7, 7]),
            ("car".to_string(), vec![7, 9]),
            ("the".to_string(), vec![1, 1, 2, 3]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_iterates_in_term_order() {
        let dict = sample();
        assert_eq!(dict.terms().collect::<Vec<_>>(), vec!["car", "honda", "the"]);
        assert_eq!(dict.get("honda"), Some(&[3, 7, 7][..]));
        assert_eq!(dict.get("Honda"), None);
        assert!(dict.contains("car"));
    }

    #[test]
    fn test_stats() {
        let stats = sample().stats();
        assert_eq!(
            stats,
            DictionaryStats {
                terms: 3,
                tokens: 9,
                non_positional_postings: 7,
            }
        );
    }

    #[test]
    fn test_stats_excluding() {
        let stats = sample().stats_excluding(&["the", "a"]);
        assert_eq!(stats.terms, 2);
        assert_eq!(stats.tokens, 5);
        assert_eq!(stats.non_positional_postings, 4);
    }

    #[test]
    fn test_remove_empty_term() {
        let mut dict = sample();
        dict.insert(String::new(), vec![1]);
        assert_eq!(dict.len(), 4);

        assert_eq!(dict.remove_empty_term(), Some(vec![1]));
        assert!(!dict.contains(""));
        assert_eq!(dict.remove_empty_term(), None);
    }

    #[test]
    fn test_empty_dictionary_stats() {
        assert_eq!(Dictionary::new().stats(), DictionaryStats::default());
    }
}
