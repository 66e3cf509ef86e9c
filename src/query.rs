//! Boolean retrieval over a merged dictionary.
//!
//! Operands are matched byte for byte against dictionary terms. Indexing
//! normalizes terms upstream but queries are not normalized here, so a
//! capitalized operand finds nothing when the index holds the lowercase form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dictionary::Dictionary;
use crate::dictionary::persist;
use crate::error::{Result, SpimiError};
use crate::postings::{PostingsList, intersect_set, union_set};
use crate::storage::Storage;

/// Connector joining the operands of a conjunctive query.
pub const AND: &str = "AND";

/// Connector joining the operands of a disjunctive query.
pub const OR: &str = "OR";

/// Split a query string into operands, dropping `AND` and `OR` connectors.
pub fn parse_operands(query: &str) -> Vec<&str> {
    query
        .split_whitespace()
        .filter(|token| *token != AND && *token != OR)
        .collect()
}

/// A classified query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "terms", rename_all = "snake_case")]
pub enum BooleanQuery {
    /// Single-term lookup.
    Keyword(String),
    /// Documents containing every operand.
    And(Vec<String>),
    /// Documents containing at least one operand.
    Or(Vec<String>),
}

impl BooleanQuery {
    /// Classify `query` by its connectors.
    ///
    /// A single operand without connector is a keyword query. Operands joined
    /// only by `AND` (or only by `OR`) form a conjunctive (disjunctive) query.
    /// Mixing both connectors, or a query without operands, is an error.
    pub fn parse(query: &str) -> Result<Self> {
        let tokens: Vec<&str> = query.split_whitespace().collect();
        let has_and = tokens.contains(&AND);
        let has_or = tokens.contains(&OR);
        let mut operands: Vec<String> = parse_operands(query)
            .into_iter()
            .map(str::to_string)
            .collect();

        if operands.is_empty() {
            return Err(SpimiError::query(format!("no terms in query {query:?}")));
        }

        match (has_and, has_or) {
            (true, true) => Err(SpimiError::query(format!(
                "cannot mix {AND} and {OR} in query {query:?}"
            ))),
            (true, false) => Ok(BooleanQuery::And(operands)),
            (false, true) => Ok(BooleanQuery::Or(operands)),
            (false, false) if operands.len() == 1 => Ok(BooleanQuery::Keyword(operands.remove(0))),
            (false, false) => Err(SpimiError::query(format!(
                "multiple terms without {AND} or {OR} in query {query:?}"
            ))),
        }
    }

    /// The operand terms in query order.
    pub fn terms(&self) -> Vec<&str> {
        match self {
            BooleanQuery::Keyword(term) => vec![term.as_str()],
            BooleanQuery::And(terms) | BooleanQuery::Or(terms) => {
                terms.iter().map(String::as_str).collect()
            }
        }
    }
}

impl fmt::Display for BooleanQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (terms, connector) = match self {
            BooleanQuery::Keyword(term) => return write!(f, "{term}"),
            BooleanQuery::And(terms) => (terms, AND),
            BooleanQuery::Or(terms) => (terms, OR),
        };
        write!(f, "{}", terms.join(format!(" {connector} ").as_str()))
    }
}

/// Evaluates boolean queries against a loaded dictionary.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    dictionary: Dictionary,
}

impl QueryEngine {
    /// Wrap an already loaded dictionary.
    pub fn from_dictionary(dictionary: Dictionary) -> Self {
        QueryEngine { dictionary }
    }

    /// Load the dictionary stored as `name`.
    pub fn open(storage: &dyn Storage, name: &str) -> Result<Self> {
        let dictionary = persist::load(storage, name)?;
        tracing::debug!(dictionary = name, terms = dictionary.len(), "loaded dictionary");
        Ok(Self::from_dictionary(dictionary))
    }

    /// The dictionary queries run against.
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Postings of `term` as stored, duplicates kept.
    pub fn keyword(&self, term: &str) -> Option<PostingsList> {
        self.dictionary.get(term).map(<[_]>::to_vec)
    }

    /// Documents containing every operand of `query`.
    ///
    /// `None` if any operand is absent or there are no operands.
    pub fn and(&self, query: &str) -> Option<PostingsList> {
        self.and_terms(&parse_operands(query))
    }

    /// Documents containing at least one operand of `query`.
    ///
    /// Absent operands contribute nothing, so the result is empty rather than
    /// `None` when no operand is present.
    pub fn or(&self, query: &str) -> Option<PostingsList> {
        self.or_terms(&parse_operands(query))
    }

    /// Run a parsed query.
    pub fn evaluate(&self, query: &BooleanQuery) -> Option<PostingsList> {
        match query {
            BooleanQuery::Keyword(term) => self.keyword(term),
            BooleanQuery::And(terms) => self.and_terms(terms),
            BooleanQuery::Or(terms) => self.or_terms(terms),
        }
    }

    fn and_terms<S: AsRef<str>>(&self, terms: &[S]) -> Option<PostingsList> {
        let (first, rest) = terms.split_first()?;
        // Set semantics even for a lone operand.
        let mut result = union_set(self.dictionary.get(first.as_ref())?, &[]);

        for term in rest {
            let postings = self.dictionary.get(term.as_ref())?;
            result = intersect_set(&result, postings);
        }
        Some(result)
    }

    fn or_terms<S: AsRef<str>>(&self, terms: &[S]) -> Option<PostingsList> {
        Some(
            terms
                .iter()
                .filter_map(|term| self.dictionary.get(term.as_ref()))
                .fold(Vec::new(), |acc, postings| union_set(&acc, postings)),
        )
    }
}
