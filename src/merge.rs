//! Merging persisted blocks into the collection-wide dictionary.
//!
//! Two strategies produce the same file:
//!
//! - [`MergeStrategy::PairwiseFold`] folds blocks into an in-memory
//!   accumulator one at a time with a merge-join over sorted terms. Each step
//!   costs the size of the two dictionaries, which is fine for a modest number
//!   of blocks.
//! - [`MergeStrategy::KWay`] streams every block at once through a min-heap
//!   keyed by term and writes merged lines as it goes, so memory is bounded by
//!   one entry per block.
//!
//! Either way the dictionary is written to a temporary file and renamed into
//! place only once complete; a failed merge publishes nothing.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::block::{block_file_name, validate_file_stem};
use crate::dictionary::format::DictionaryWriter;
use crate::dictionary::persist::{self, StoredDictionaryReader};
use crate::dictionary::{Dictionary, DictionaryStats};
use crate::error::Result;
use crate::postings::{KeyOrigin, PostingsList, merge_keys, merge_sorted};
use crate::storage::Storage;

/// How blocks are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeStrategy {
    /// Fold blocks into an accumulator in block order.
    #[default]
    #[serde(rename = "fold")]
    PairwiseFold,
    /// Stream all blocks through a min-heap.
    #[serde(rename = "kway")]
    KWay,
}

/// Configuration for merge operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Merge strategy.
    pub strategy: MergeStrategy,

    /// Name of the merged dictionary file.
    pub dictionary_name: String,

    /// Delete block files after a successful merge.
    pub delete_blocks: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            strategy: MergeStrategy::PairwiseFold,
            dictionary_name: "dictionary.txt".to_string(),
            delete_blocks: false,
        }
    }
}

impl MergeConfig {
    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        validate_file_stem("dictionary_name", &self.dictionary_name)
    }
}

/// Result of a merge operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    /// Name of the published dictionary.
    pub dictionary_name: String,
    /// Number of blocks merged.
    pub blocks_merged: usize,
    /// Statistics of the merged dictionary.
    pub stats: DictionaryStats,
    /// Bytes written.
    pub bytes_written: u64,
    /// Time taken for merge (in milliseconds).
    pub merge_time_ms: u64,
}

/// Merge-join two dictionaries.
///
/// Terms present on one side keep their postings; terms present on both sides
/// get the multiset merge of the two lists.
pub fn merge_dictionaries(left: Dictionary, right: Dictionary) -> Dictionary {
    let origins: Vec<KeyOrigin> = merge_keys(left.terms(), right.terms())
        .into_iter()
        .map(|(_, origin)| origin)
        .collect();

    let mut left = left.into_iter();
    let mut right = right.into_iter();
    let mut merged = Vec::with_capacity(origins.len());

    for origin in origins {
        let entry = match origin {
            KeyOrigin::Left => left.next(),
            KeyOrigin::Right => right.next(),
            KeyOrigin::Both => match (left.next(), right.next()) {
                (Some((term, a)), Some((_, b))) => Some((term, merge_sorted(&a, &b))),
                _ => None,
            },
        };
        debug_assert!(entry.is_some(), "key merge out of step with entries");
        merged.extend(entry);
    }

    merged.into_iter().collect()
}

/// Combines numbered blocks into one dictionary file.
#[derive(Debug)]
pub struct BlockMerger {
    storage: Arc<dyn Storage>,
    config: MergeConfig,
}

impl BlockMerger {
    /// Create a merger over `storage`.
    pub fn new(storage: Arc<dyn Storage>, config: MergeConfig) -> Result<Self> {
        config.validate()?;
        Ok(BlockMerger { storage, config })
    }

    /// The merger's configuration.
    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Merge blocks `1..=count` named with `prefix`.
    pub fn merge_numbered(&self, prefix: &str, count: u32) -> Result<MergeResult> {
        let names: Vec<String> = (1..=count).map(|n| block_file_name(prefix, n)).collect();
        self.merge_blocks(&names)
    }

    /// Merge the named blocks, in order, and publish the dictionary.
    pub fn merge_blocks(&self, block_names: &[String]) -> Result<MergeResult> {
        let start_time = Instant::now();
        let storage = self.storage.as_ref();
        let name = self.config.dictionary_name.as_str();

        let (stats, bytes_written) = match self.config.strategy {
            MergeStrategy::PairwiseFold => {
                let dictionary = self.fold_blocks(block_names)?;
                let (_, bytes) = persist::store(storage, name, &dictionary)?;
                (dictionary.stats(), bytes)
            }
            MergeStrategy::KWay => {
                persist::publish(storage, name, |out| self.kway_merge(block_names, out))?
            }
        };

        if self.config.delete_blocks {
            for block in block_names {
                storage.delete_file(block)?;
            }
        }

        let result = MergeResult {
            dictionary_name: name.to_string(),
            blocks_merged: block_names.len(),
            stats,
            bytes_written,
            merge_time_ms: start_time.elapsed().as_millis() as u64,
        };

        tracing::info!(
            blocks = result.blocks_merged,
            terms = stats.terms,
            tokens = stats.tokens,
            non_positional_postings = stats.non_positional_postings,
            "merged dictionary {} in {} ms",
            result.dictionary_name,
            result.merge_time_ms
        );

        Ok(result)
    }

    /// Fold the named blocks into one dictionary without persisting it.
    pub fn fold_blocks(&self, block_names: &[String]) -> Result<Dictionary> {
        let mut accumulator = Dictionary::new();

        for name in block_names {
            let block = persist::load(self.storage.as_ref(), name)?;
            tracing::debug!(
                block = name.as_str(),
                block_terms = block.len(),
                accumulated_terms = accumulator.len(),
                "folding block"
            );
            accumulator = merge_dictionaries(accumulator, block);
        }

        accumulator.remove_empty_term();
        Ok(accumulator)
    }

    fn kway_merge(&self, block_names: &[String], out: &mut dyn Write) -> Result<DictionaryStats> {
        let mut readers = block_names
            .iter()
            .map(|name| persist::open_reader(self.storage.as_ref(), name))
            .collect::<Result<Vec<_>>>()?;

        let mut heap = BinaryHeap::with_capacity(readers.len());
        for source in 0..readers.len() {
            advance(&mut readers, &mut heap, source)?;
        }

        let mut writer = DictionaryWriter::new(out);
        let mut stats = DictionaryStats::default();

        while let Some(HeapEntry {
            term,
            mut postings,
            source,
        }) = heap.pop()
        {
            advance(&mut readers, &mut heap, source)?;

            while heap.peek().is_some_and(|top| top.term == term) {
                if let Some(next) = heap.pop() {
                    postings = merge_sorted(&postings, &next.postings);
                    advance(&mut readers, &mut heap, next.source)?;
                }
            }

            if term.is_empty() {
                continue;
            }
            writer.write_entry(&term, &postings)?;
            stats.record(&postings);
        }

        writer.finish()?;
        Ok(stats)
    }
}

/// Push the next entry of `readers[source]`, if any, onto the heap.
fn advance(
    readers: &mut [StoredDictionaryReader],
    heap: &mut BinaryHeap<HeapEntry>,
    source: usize,
) -> Result<()> {
    if let Some((term, postings)) = readers[source].next().transpose()? {
        heap.push(HeapEntry {
            term,
            postings,
            source,
        });
    }
    Ok(())
}

/// Head entry of one block during a k-way merge.
#[derive(Debug)]
struct HeapEntry {
    term: String,
    postings: PostingsList,
    source: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term && self.source == other.source
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the smallest term, earliest block first.
        other
            .term
            .cmp(&self.term)
            .then_with(|| other.source.cmp(&self.source))
    }
}
