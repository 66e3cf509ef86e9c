//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, SpimiArgs};
use crate::dictionary::DictionaryStats;
use crate::error::Result;
use crate::postings::DocId;

/// Result structure for an indexing run.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexingResult {
    pub directory: String,
    pub records: usize,
    pub blocks: usize,
    pub dictionary: String,
    pub terms: usize,
    pub tokens: u64,
    pub non_positional_postings: u64,
    pub dictionary_bytes: u64,
    pub duration_ms: u64,
}

/// Result structure for a query.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    pub kind: String,
    /// `None` when the query has no result.
    pub doc_ids: Option<Vec<DocId>>,
    pub duration_ms: u64,
}

/// Result structure for dictionary statistics.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResult {
    pub dictionary: String,
    pub dictionary_bytes: u64,
    pub stopwords_excluded: usize,
    #[serde(flatten)]
    pub stats: DictionaryStats,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &SpimiArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &SpimiArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;
    for line in human_lines(&value) {
        println!("{line}");
    }
    Ok(())
}

fn human_lines(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Object(obj) => obj
            .iter()
            .map(|(key, val)| {
                let formatted_val = if key.ends_with("_bytes") {
                    val.as_u64().map(format_bytes).unwrap_or_else(|| format_value(val))
                } else {
                    format_value(val)
                };
                format!("{key}: {formatted_val}")
            })
            .collect(),
        _ => vec![format_value(value)],
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &SpimiArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Format a JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        serde_json::Value::Object(_) => "[object]".to_string(),
        serde_json::Value::Null => "no result".to_string(),
    }
}

/// Format bytes into human-readable format.
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    let unit = UNITS[unit_index];
    if unit_index == 0 {
        format!("{bytes} {unit}")
    } else {
        format!("{size:.1} {unit}")
    }
}
