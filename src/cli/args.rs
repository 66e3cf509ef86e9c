//! Command line argument parsing for the spimi CLI using clap.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::merge::MergeStrategy;

/// spimi - build and query a blocked inverted index
#[derive(Parser, Debug, Clone)]
#[command(name = "spimi")]
#[command(about = "Build a SPIMI inverted index and run boolean queries against it")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct SpimiArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE", env = "SPIMI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl SpimiArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build blocks from tokenized records and merge them into a dictionary
    Index(IndexArgs),

    /// Run a keyword, AND or OR query
    Query(QueryArgs),

    /// Show dictionary statistics
    Stats(StatsArgs),
}

/// Arguments for indexing
#[derive(Parser, Debug, Clone)]
pub struct IndexArgs {
    /// Records file, one `{"doc_id": .., "terms": [..]}` object per line
    #[arg(value_name = "RECORDS_FILE")]
    pub records: PathBuf,

    /// Directory receiving blocks and the dictionary
    #[arg(short, long, value_name = "DIR")]
    pub dir: PathBuf,

    /// Flush a block after this many records
    #[arg(long, conflicts_with = "max_bytes")]
    pub max_records: Option<usize>,

    /// Flush a block once its estimated size reaches this many bytes
    #[arg(long)]
    pub max_bytes: Option<usize>,

    /// Block merge strategy
    #[arg(short, long)]
    pub strategy: Option<StrategyArg>,

    /// Delete block files after merging
    #[arg(long)]
    pub delete_blocks: bool,
}

/// Arguments for querying
#[derive(Parser, Debug, Clone)]
pub struct QueryArgs {
    /// Directory holding the dictionary
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Query string, e.g. `honda AND car`
    #[arg(value_name = "QUERY")]
    pub query: String,
}

/// Arguments for statistics
#[derive(Parser, Debug, Clone)]
pub struct StatsArgs {
    /// Directory holding the dictionary
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Exclude the first N built-in English stopwords
    #[arg(long, default_value = "0")]
    pub stopwords: usize,
}

/// Merge strategy as spelled on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    /// Pairwise fold in block order
    Fold,
    /// Streaming k-way heap merge
    Kway,
}

impl From<StrategyArg> for MergeStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Fold => MergeStrategy::PairwiseFold,
            StrategyArg::Kway => MergeStrategy::KWay,
        }
    }
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
