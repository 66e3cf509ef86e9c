//! The indexing pipeline: build blocks, merge them, open the result.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::block::{BlockBuilder, BlockInfo};
use crate::collect::RecordCollector;
use crate::config::SpimiConfig;
use crate::dictionary::DictionaryStats;
use crate::dictionary::persist;
use crate::document::DocumentRecord;
use crate::error::Result;
use crate::merge::{BlockMerger, MergeResult};
use crate::query::QueryEngine;
use crate::stopwords;
use crate::storage::{FileStorage, Storage};

/// What one indexing run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    /// Records consumed.
    pub records: usize,
    /// Blocks flushed, in sequence order.
    pub blocks: Vec<BlockInfo>,
    /// Result of merging the blocks.
    pub merge: MergeResult,
    /// Partitions dropped at the collector's join deadline.
    pub timed_out_partitions: Vec<usize>,
    /// Wall time of the whole run (in milliseconds).
    pub elapsed_ms: u64,
}

/// Runs block building and merging against one storage.
#[derive(Debug)]
pub struct SpimiIndexer {
    storage: Arc<dyn Storage>,
    config: SpimiConfig,
}

impl SpimiIndexer {
    /// Create an indexer over `storage`.
    pub fn new(storage: Arc<dyn Storage>, config: SpimiConfig) -> Result<Self> {
        config.validate()?;
        Ok(SpimiIndexer { storage, config })
    }

    /// Create an indexer over a directory, creating it if needed.
    pub fn open_dir<P: AsRef<Path>>(dir: P, config: SpimiConfig) -> Result<Self> {
        let storage = FileStorage::new(dir, config.storage.clone())?;
        Self::new(Arc::new(storage), config)
    }

    /// The storage blocks and the dictionary are written to.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// The indexer's configuration.
    pub fn config(&self) -> &SpimiConfig {
        &self.config
    }

    /// Index `records` in a single pass and publish the merged dictionary.
    pub fn index<I>(&self, records: I) -> Result<IndexReport>
    where
        I: IntoIterator<Item = DocumentRecord>,
    {
        self.run(records, Vec::new())
    }

    /// Like [`index`](Self::index), stopping at the first failed record.
    ///
    /// Blocks completed before the failure stay in storage. The block being
    /// filled when the failure is seen is discarded and no dictionary is
    /// published.
    pub fn index_results<I>(&self, records: I) -> Result<IndexReport>
    where
        I: IntoIterator<Item = Result<DocumentRecord>>,
    {
        let start_time = Instant::now();
        let (records, blocks) = self.build_blocks(records)?;
        self.finish(start_time, records, blocks, Vec::new())
    }

    /// Produce records in parallel with the configured collector, then index
    /// them in partition order.
    pub fn collect_and_index<P, F>(&self, partitions: Vec<P>, producer: F) -> Result<IndexReport>
    where
        P: Send + 'static,
        F: Fn(P) -> Result<Vec<DocumentRecord>> + Send + Sync + 'static,
    {
        let collector = RecordCollector::new(self.config.collector.clone());
        let outcome = collector.collect(partitions, producer)?;
        self.run(outcome.records, outcome.timed_out)
    }

    /// Open a query engine over the published dictionary.
    pub fn query_engine(&self) -> Result<QueryEngine> {
        QueryEngine::open(self.storage.as_ref(), &self.config.merge.dictionary_name)
    }

    /// Statistics of the published dictionary, ignoring the first
    /// `stopword_count` built-in stopwords.
    pub fn stats(&self, stopword_count: usize) -> Result<DictionaryStats> {
        let dictionary = persist::load(self.storage.as_ref(), &self.config.merge.dictionary_name)?;
        Ok(dictionary.stats_excluding(stopwords::top(stopword_count)))
    }

    fn run<I>(&self, records: I, timed_out: Vec<usize>) -> Result<IndexReport>
    where
        I: IntoIterator<Item = DocumentRecord>,
    {
        let start_time = Instant::now();
        let (records, blocks) = self.build_blocks(records.into_iter().map(Ok))?;
        self.finish(start_time, records, blocks, timed_out)
    }

    fn build_blocks<I>(&self, records: I) -> Result<(usize, Vec<BlockInfo>)>
    where
        I: IntoIterator<Item = Result<DocumentRecord>>,
    {
        let mut builder = BlockBuilder::new(self.storage.clone(), self.config.builder.clone())?;
        let blocks = builder.try_invert_all(records)?;
        let records = blocks.iter().map(|b| b.records).sum();
        Ok((records, blocks))
    }

    fn finish(
        &self,
        start_time: Instant,
        records: usize,
        blocks: Vec<BlockInfo>,
        timed_out_partitions: Vec<usize>,
    ) -> Result<IndexReport> {
        let merger = BlockMerger::new(self.storage.clone(), self.config.merge.clone())?;
        let names: Vec<String> = blocks.iter().map(|b| b.file_name.clone()).collect();
        let merge = merger.merge_blocks(&names)?;

        Ok(IndexReport {
            records,
            blocks,
            merge,
            timed_out_partitions,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}
