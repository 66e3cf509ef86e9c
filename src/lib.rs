//! # spimi
//!
//! A blocked, memory-bounded inverted index built with single-pass in-memory
//! indexing (SPIMI), with boolean retrieval over the merged dictionary.
//!
//! ## Pipeline
//!
//! - [`block::BlockBuilder`] turns a stream of tokenized
//!   [`document::DocumentRecord`]s into sorted blocks, each bounded by a
//!   [`block::MemoryBudget`].
//! - [`merge::BlockMerger`] merges the blocks into one dictionary file.
//! - [`query::QueryEngine`] answers keyword, `AND` and `OR` queries.
//!
//! [`index::SpimiIndexer`] runs the first two steps against a
//! [`storage::Storage`] and opens the third. [`collect::RecordCollector`]
//! produces records from several partitions in parallel.
//!
//! ```
//! use std::sync::Arc;
//!
//! use spimi::config::SpimiConfig;
//! use spimi::document::DocumentRecord;
//! use spimi::index::SpimiIndexer;
//! use spimi::storage::MemoryStorage;
//!
//! let indexer = SpimiIndexer::new(Arc::new(MemoryStorage::new_default()), SpimiConfig::default())?;
//! indexer.index(vec![
//!     DocumentRecord::new(3, ["honda", "honda"]),
//!     DocumentRecord::new(7, ["honda", "car"]),
//! ])?;
//!
//! let engine = indexer.query_engine()?;
//! assert_eq!(engine.and("honda AND car"), Some(vec![7]));
//! # Ok::<(), spimi::error::SpimiError>(())
//! ```

pub mod block;
pub mod cli;
pub mod collect;
pub mod config;
pub mod dictionary;
pub mod document;
pub mod error;
pub mod index;
pub mod merge;
pub mod postings;
pub mod query;
pub mod stopwords;
pub mod storage;

pub mod prelude {
    pub use crate::block::{BlockBuilder, BlockBuilderConfig, MemoryBudget};
    pub use crate::collect::{CollectorConfig, RecordCollector};
    pub use crate::config::SpimiConfig;
    pub use crate::dictionary::{Dictionary, DictionaryStats};
    pub use crate::document::DocumentRecord;
    pub use crate::error::{Result, SpimiError};
    pub use crate::index::SpimiIndexer;
    pub use crate::merge::{BlockMerger, MergeConfig, MergeStrategy};
    pub use crate::postings::{DocId, PostingsList};
    pub use crate::query::{BooleanQuery, QueryEngine};
    pub use crate::storage::{FileStorage, MemoryStorage, Storage, StorageConfig};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
