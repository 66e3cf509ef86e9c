//! Block building: the SPIMI-Invert step.
//!
//! A [`BlockBuilder`] pulls records from a shared cursor into an in-memory
//! term → postings map until its [`MemoryBudget`] is spent or the cursor runs
//! dry, then sorts the map and persists it as the next numbered block.
//!
//! The budget is checked once per record, before the next record is pulled,
//! so a block can overshoot its budget by up to one record and a record is
//! never split across two blocks.

use std::mem::size_of;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::dictionary::Dictionary;
use crate::dictionary::persist;
use crate::document::DocumentRecord;
use crate::error::{Result, SpimiError};
use crate::postings::{DocId, PostingsList};
use crate::storage::Storage;

/// Per-entry cost charged the first time a term appears in a block, on top
/// of the term bytes and the key / list headers.
const ENTRY_OVERHEAD: usize = 32;

/// How much a block may accumulate before it is flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBudget {
    /// Flush after this many records.
    Records(usize),
    /// Flush once the estimated in-memory size reaches this many bytes.
    Bytes(usize),
}

impl MemoryBudget {
    /// The budget's limit, whatever its unit.
    pub fn limit(&self) -> usize {
        match *self {
            MemoryBudget::Records(n) | MemoryBudget::Bytes(n) => n,
        }
    }
}

impl Default for MemoryBudget {
    fn default() -> Self {
        MemoryBudget::Bytes(64 * 1024 * 1024) // 64MB
    }
}

/// Block builder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockBuilderConfig {
    /// Flush threshold.
    pub budget: MemoryBudget,

    /// Block file prefix; block `n` is stored as `<prefix><n>.txt`.
    pub block_prefix: String,
}

impl Default for BlockBuilderConfig {
    fn default() -> Self {
        BlockBuilderConfig {
            budget: MemoryBudget::default(),
            block_prefix: "block".to_string(),
        }
    }
}

impl BlockBuilderConfig {
    /// Check the configuration for values that can never produce a block.
    pub fn validate(&self) -> Result<()> {
        if self.budget.limit() == 0 {
            return Err(SpimiError::invalid_config("block budget must be positive"));
        }
        validate_file_stem("block_prefix", &self.block_prefix)
    }
}

pub(crate) fn validate_file_stem(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(SpimiError::invalid_config(format!("{field} must not be empty")));
    }
    if value.contains(['/', '\\', '\0']) {
        return Err(SpimiError::invalid_config(format!(
            "{field} must not contain path separators: {value:?}"
        )));
    }
    Ok(())
}

/// File name of block `sequence` (1-based).
pub fn block_file_name(prefix: &str, sequence: u32) -> String {
    format!("{prefix}{sequence}.txt")
}

/// Summary of one flushed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// 1-based block sequence number.
    pub sequence: u32,
    /// Storage file name.
    pub file_name: String,
    /// Records consumed into this block.
    pub records: usize,
    /// Distinct terms persisted.
    pub terms: usize,
    /// Postings persisted, duplicates included.
    pub postings: u64,
    /// Estimated in-memory size when the block was flushed.
    pub estimated_bytes: usize,
    /// Bytes written to storage.
    pub bytes_written: u64,
}

/// In-memory term → postings map for the block being built.
#[derive(Debug, Default)]
struct BlockAccumulator {
    postings: AHashMap<String, PostingsList>,
    records: usize,
    estimated_bytes: usize,
}

impl BlockAccumulator {
    fn is_full(&self, budget: MemoryBudget) -> bool {
        match budget {
            MemoryBudget::Records(max) => self.records >= max,
            MemoryBudget::Bytes(max) => self.estimated_bytes >= max,
        }
    }

    fn add_record(&mut self, record: DocumentRecord) {
        let doc_id = record.doc_id;
        for term in record.terms {
            self.add_posting(term, doc_id);
        }
        self.records += 1;
    }

    fn add_posting(&mut self, term: String, doc_id: DocId) {
        match self.postings.get_mut(term.as_str()) {
            Some(list) => list.push(doc_id),
            None => {
                self.estimated_bytes += term.len()
                    + size_of::<String>()
                    + size_of::<PostingsList>()
                    + ENTRY_OVERHEAD;
                self.postings.insert(term, vec![doc_id]);
            }
        }
        self.estimated_bytes += size_of::<DocId>();
    }

    /// Sort terms and postings, dropping the empty term.
    fn into_dictionary(mut self) -> Dictionary {
        self.postings.remove("");
        self.postings
            .into_iter()
            .map(|(term, mut list)| {
                list.sort_unstable();
                (term, list)
            })
            .collect()
    }
}

/// Builds and persists blocks from a stream of records.
#[derive(Debug)]
pub struct BlockBuilder {
    storage: Arc<dyn Storage>,
    config: BlockBuilderConfig,
    blocks_written: u32,
}

impl BlockBuilder {
    /// Create a builder writing into `storage`.
    pub fn new(storage: Arc<dyn Storage>, config: BlockBuilderConfig) -> Result<Self> {
        config.validate()?;
        Ok(BlockBuilder {
            storage,
            config,
            blocks_written: 0,
        })
    }

    /// Number of blocks flushed so far; they are numbered `1..=blocks_written`.
    pub fn blocks_written(&self) -> u32 {
        self.blocks_written
    }

    /// The builder's configuration.
    pub fn config(&self) -> &BlockBuilderConfig {
        &self.config
    }

    /// Build one block from `records`.
    ///
    /// Returns `Ok(None)` without writing anything when the cursor yields no
    /// record. A write failure is returned as an error; the block's in-memory
    /// postings are discarded and its sequence number is not consumed.
    pub fn invert<I>(&mut self, records: &mut I) -> Result<Option<BlockInfo>>
    where
        I: Iterator<Item = DocumentRecord>,
    {
        self.try_invert(&mut records.map(Ok))
    }

    /// Like [`invert`](Self::invert) over a fallible cursor.
    ///
    /// A failed record aborts the block before anything is written.
    pub fn try_invert<I>(&mut self, records: &mut I) -> Result<Option<BlockInfo>>
    where
        I: Iterator<Item = Result<DocumentRecord>>,
    {
        let budget = self.config.budget;
        let mut block = BlockAccumulator::default();

        while !block.is_full(budget) {
            match records.next() {
                Some(record) => block.add_record(record?),
                None => break,
            }
        }

        if block.records == 0 {
            return Ok(None);
        }

        self.flush(block).map(Some)
    }

    /// Call [`invert`](Self::invert) until the cursor is exhausted.
    pub fn invert_all<I>(&mut self, records: I) -> Result<Vec<BlockInfo>>
    where
        I: IntoIterator<Item = DocumentRecord>,
    {
        self.try_invert_all(records.into_iter().map(Ok))
    }

    /// Call [`try_invert`](Self::try_invert) until the cursor is exhausted or
    /// yields an error.
    pub fn try_invert_all<I>(&mut self, records: I) -> Result<Vec<BlockInfo>>
    where
        I: IntoIterator<Item = Result<DocumentRecord>>,
    {
        let mut records = records.into_iter();
        let mut blocks = Vec::new();
        while let Some(info) = self.try_invert(&mut records)? {
            blocks.push(info);
        }
        Ok(blocks)
    }

    fn flush(&mut self, block: BlockAccumulator) -> Result<BlockInfo> {
        let sequence = self.blocks_written + 1;
        let file_name = block_file_name(&self.config.block_prefix, sequence);
        let records = block.records;
        let estimated_bytes = block.estimated_bytes;

        let dictionary = block.into_dictionary();
        let stats = dictionary.stats();
        let (terms, bytes_written) = persist::store(self.storage.as_ref(), &file_name, &dictionary)
            .map_err(|e| {
                tracing::warn!("Failed to flush block {}: {}", file_name, e);
                e
            })?;

        self.blocks_written = sequence;

        tracing::debug!(
            block = sequence,
            records,
            terms,
            postings = stats.tokens,
            estimated_bytes,
            "flushed block {}",
            file_name
        );

        Ok(BlockInfo {
            sequence,
            file_name,
            records,
            terms,
            postings: stats.tokens,
            estimated_bytes,
            bytes_written,
        })
    }
}
