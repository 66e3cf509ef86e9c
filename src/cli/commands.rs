//! Command implementations for the spimi CLI.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::block::MemoryBudget;
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::SpimiConfig;
use crate::document::read_json_lines;
use crate::error::{Result, SpimiError};
use crate::index::SpimiIndexer;
use crate::query::{BooleanQuery, QueryEngine};
use crate::storage::{FileStorage, Storage};
use crate::stopwords;

/// Execute a CLI command.
pub fn execute_command(args: SpimiArgs) -> Result<()> {
    let config = load_config(&args)?;
    match &args.command {
        Command::Index(index_args) => index_records(index_args.clone(), config, &args),
        Command::Query(query_args) => run_query(query_args.clone(), config, &args),
        Command::Stats(stats_args) => show_stats(stats_args.clone(), config, &args),
    }
}

/// The configuration file if given, else defaults.
fn load_config(args: &SpimiArgs) -> Result<SpimiConfig> {
    match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path.display());
            SpimiConfig::from_json_file(path)
        }
        None => Ok(SpimiConfig::default()),
    }
}

/// Apply command line overrides on top of the configuration.
fn apply_index_overrides(mut config: SpimiConfig, args: &IndexArgs) -> Result<SpimiConfig> {
    if let Some(max_records) = args.max_records {
        config.builder.budget = MemoryBudget::Records(max_records);
    }
    if let Some(max_bytes) = args.max_bytes {
        config.builder.budget = MemoryBudget::Bytes(max_bytes);
    }
    if let Some(strategy) = args.strategy {
        config.merge.strategy = strategy.into();
    }
    if args.delete_blocks {
        config.merge.delete_blocks = true;
    }
    config.validate()?;
    Ok(config)
}

/// Build blocks from a records file and merge them.
fn index_records(args: IndexArgs, config: SpimiConfig, cli_args: &SpimiArgs) -> Result<()> {
    let config = apply_index_overrides(config, &args)?;
    tracing::info!(
        budget = ?config.builder.budget,
        strategy = ?config.merge.strategy,
        "Indexing {} into {}",
        args.records.display(),
        args.dir.display()
    );

    let start_time = Instant::now();
    let source = args.records.display().to_string();
    let file = File::open(&args.records).map_err(|e| {
        SpimiError::invalid_argument(format!("cannot open records file {source}: {e}"))
    })?;

    let indexer = SpimiIndexer::open_dir(&args.dir, config)?;
    let report = indexer.index_results(read_json_lines(BufReader::new(file), &source))?;

    output_result(
        "Index built successfully",
        &IndexingResult {
            directory: args.dir.display().to_string(),
            records: report.records,
            blocks: report.blocks.len(),
            dictionary: report.merge.dictionary_name.clone(),
            terms: report.merge.stats.terms,
            tokens: report.merge.stats.tokens,
            non_positional_postings: report.merge.stats.non_positional_postings,
            dictionary_bytes: report.merge.bytes_written,
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

/// Open the storage of an existing index directory.
fn open_existing(dir: &Path, config: &SpimiConfig) -> Result<FileStorage> {
    if !dir.is_dir() {
        return Err(SpimiError::invalid_argument(format!(
            "index directory does not exist: {}",
            dir.display()
        )));
    }
    FileStorage::new(dir, config.storage.clone())
}

/// Run one query.
fn run_query(args: QueryArgs, config: SpimiConfig, cli_args: &SpimiArgs) -> Result<()> {
    let query = BooleanQuery::parse(&args.query)?;
    let storage = open_existing(&args.dir, &config)?;
    let engine = QueryEngine::open(&storage, &config.merge.dictionary_name)?;

    let start_time = Instant::now();
    let doc_ids = engine.evaluate(&query);
    let duration = start_time.elapsed();

    let kind = match &query {
        BooleanQuery::Keyword(_) => "keyword",
        BooleanQuery::And(_) => "and",
        BooleanQuery::Or(_) => "or",
    };

    output_result(
        "Query completed",
        &QueryResult {
            query: query.to_string(),
            kind: kind.to_string(),
            doc_ids,
            duration_ms: duration.as_millis() as u64,
        },
        cli_args,
    )
}

/// Show dictionary statistics.
fn show_stats(args: StatsArgs, config: SpimiConfig, cli_args: &SpimiArgs) -> Result<()> {
    let storage = Arc::new(open_existing(&args.dir, &config)?);
    let dictionary_bytes = storage.file_size(&config.merge.dictionary_name)?;
    let dictionary = config.merge.dictionary_name.clone();
    let indexer = SpimiIndexer::new(storage, config)?;

    let stopwords_excluded = stopwords::top(args.stopwords).len();
    let stats = indexer.stats(args.stopwords)?;

    output_result(
        "Dictionary statistics",
        &StatsResult {
            dictionary,
            dictionary_bytes,
            stopwords_excluded,
            stats,
        },
        cli_args,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> SpimiArgs {
        SpimiArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_index_overrides() {
        let args = parse(&["spimi", "index", "r.jsonl", "--dir", "d", "--max-bytes", "4096"]);
        let Command::Index(index_args) = args.command else {
            panic!("Expected Index command");
        };

        let config = apply_index_overrides(SpimiConfig::default(), &index_args).unwrap();
        assert_eq!(config.builder.budget, MemoryBudget::Bytes(4096));
    }

    #[test]
    fn test_zero_budget_rejected() {
        let args = parse(&["spimi", "index", "r.jsonl", "--dir", "d", "--max-records", "0"]);
        let Command::Index(index_args) = args.command else {
            panic!("Expected Index command");
        };
        assert!(apply_index_overrides(SpimiConfig::default(), &index_args).is_err());
    }

    #[test]
    fn test_index_query_and_stats_commands() {
        let temp_dir = TempDir::new().unwrap();
        let records = temp_dir.path().join("records.jsonl");
        let index_dir = temp_dir.path().join("index");

        let mut file = File::create(&records).unwrap();
        writeln!(file, r#"{{"doc_id": 3, "terms": ["honda", "honda"]}}"#).unwrap();
        writeln!(file, r#"{{"doc_id": 7, "terms": ["honda", "car"]}}"#).unwrap();
        writeln!(file, r#"{{"doc_id": 9, "terms": ["car", "the"]}}"#).unwrap();
        drop(file);

        let records = records.to_str().unwrap();
        let index_dir = index_dir.to_str().unwrap();

        execute_command(parse(&[
            "spimi", "-q", "index", records, "--dir", index_dir, "--max-records", "1",
        ]))
        .unwrap();
        assert!(Path::new(index_dir).join("dictionary.txt").exists());
        assert!(Path::new(index_dir).join("block3.txt").exists());

        execute_command(parse(&["spimi", "-q", "query", index_dir, "honda AND car"])).unwrap();
        execute_command(parse(&["spimi", "-q", "-f", "json", "stats", index_dir, "--stopwords", "10"]))
            .unwrap();
    }

    #[test]
    fn test_query_missing_directory() {
        let err = execute_command(parse(&["spimi", "-q", "query", "/nonexistent/index", "car"]))
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_malformed_query() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_str().unwrap();
        let err = execute_command(parse(&["spimi", "-q", "query", dir, "a AND b OR c"]))
            .unwrap_err();
        assert!(matches!(err, SpimiError::Query(_)));
    }
}
