//! Tokenized document records fed to the indexer.
//!
//! Records arrive already normalized: extracting text, case folding and
//! stemming happen upstream. The core only reads them.

use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpimiError};
use crate::postings::DocId;

/// One source document: its identifier and its terms in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Document identifier.
    pub doc_id: DocId,
    /// Normalized terms, repeated as often as they occur.
    pub terms: Vec<String>,
}

impl DocumentRecord {
    /// Create a record from anything yielding terms.
    pub fn new<I, S>(doc_id: DocId, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DocumentRecord {
            doc_id,
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }
}

/// Lazily decode one JSON record per line, skipping blank lines.
///
/// Each item is an error if the line cannot be read or decoded; the error
/// names the 1-based line number.
pub fn read_json_lines<R: BufRead>(
    input: R,
    source: &str,
) -> impl Iterator<Item = Result<DocumentRecord>> + use<R> {
    let source = source.to_string();
    input
        .lines()
        .enumerate()
        .filter_map(move |(index, line)| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(serde_json::from_str::<DocumentRecord>(&line).map_err(|e| {
                SpimiError::parse(source.as_str(), index + 1, format!("invalid record: {e}"))
            })),
            Err(e) => Some(Err(SpimiError::from(e))),
        })
}
