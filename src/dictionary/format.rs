//! Textual line format for blocks and the merged dictionary.
//!
//! One entry per line, `<term> : [<id1>, <id2>, ..., <idK>]`, terms ascending
//! and IDs ascending within a line. The format has no escaping: a term may not
//! contain the ` : [` delimiter or a line break, and the writer refuses such
//! terms instead of producing a file it could not read back.

use std::io::{self, BufRead, Write};

use crate::dictionary::Dictionary;
use crate::error::{Result, SpimiError};
use crate::postings::{DocId, PostingsList};

/// Separator between a term and its postings.
pub const TERM_DELIMITER: &str = " : [";

/// Separator between two postings.
pub const POSTING_SEPARATOR: &str = ", ";

/// Check that `term` can be written and read back unchanged.
pub fn validate_term(term: &str) -> Result<()> {
    if term.is_empty() {
        return Err(SpimiError::invalid_term(term, "empty term"));
    }
    if term.contains(TERM_DELIMITER) {
        return Err(SpimiError::invalid_term(
            term,
            format!("contains the delimiter {TERM_DELIMITER:?}"),
        ));
    }
    if term.contains(['\n', '\r']) {
        return Err(SpimiError::invalid_term(term, "contains a line break"));
    }
    Ok(())
}

/// Render one entry without the trailing newline.
pub fn format_line(term: &str, postings: &[DocId]) -> String {
    let ids: Vec<String> = postings.iter().map(DocId::to_string).collect();
    format!("{term}{TERM_DELIMITER}{}]", ids.join(POSTING_SEPARATOR))
}

/// Parse one line into a term and its postings.
///
/// Only the term and the ID syntax are checked here; ordering across lines is
/// checked by [`DictionaryReader`].
pub fn parse_line(line: &str) -> std::result::Result<(String, PostingsList), String> {
    let (term, rest) = line
        .split_once(TERM_DELIMITER)
        .ok_or_else(|| format!("missing delimiter {TERM_DELIMITER:?}"))?;

    if term.is_empty() {
        return Err("empty term".to_string());
    }

    let body = rest
        .strip_suffix(']')
        .ok_or_else(|| "missing closing ']'".to_string())?;

    if body.is_empty() {
        return Ok((term.to_string(), Vec::new()));
    }

    let postings = body
        .split(POSTING_SEPARATOR)
        .map(|id| {
            if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("invalid posting {id:?}"));
            }
            id.parse::<DocId>()
                .map_err(|e| format!("invalid posting {id:?}: {e}"))
        })
        .collect::<std::result::Result<PostingsList, String>>()?;

    if let Some(pos) = postings.windows(2).position(|w| w[0] > w[1]) {
        return Err(format!(
            "postings not ascending: {} before {}",
            postings[pos],
            postings[pos + 1]
        ));
    }

    Ok((term.to_string(), postings))
}

/// Streaming writer that enforces term validity and ascending term order.
#[derive(Debug)]
pub struct DictionaryWriter<W: Write> {
    writer: W,
    last_term: Option<String>,
    entries: usize,
}

impl<W: Write> DictionaryWriter<W> {
    /// Wrap `writer`.
    pub fn new(writer: W) -> Self {
        DictionaryWriter {
            writer,
            last_term: None,
            entries: 0,
        }
    }

    /// Append one entry. Terms must arrive in strictly ascending order.
    pub fn write_entry(&mut self, term: &str, postings: &[DocId]) -> Result<()> {
        validate_term(term)?;

        if let Some(last) = &self.last_term {
            if last.as_str() >= term {
                return Err(SpimiError::internal(format!(
                    "dictionary terms written out of order: {last:?} then {term:?}"
                )));
            }
        }
        debug_assert!(crate::postings::is_sorted(postings));

        writeln!(self.writer, "{}", format_line(term, postings))?;
        self.last_term = Some(term.to_string());
        self.entries += 1;
        Ok(())
    }

    /// Number of entries written so far.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Write every entry of `dictionary` in order. Returns the number of lines.
pub fn write_dictionary<W: Write>(dictionary: &Dictionary, writer: W) -> Result<usize> {
    let mut writer = DictionaryWriter::new(writer);
    for (term, postings) in dictionary.iter() {
        writer.write_entry(term, postings)?;
    }
    let entries = writer.entries();
    writer.finish()?;
    Ok(entries)
}

/// Streaming reader yielding one entry per line.
///
/// Any malformed line, any term out of order or repeated, and any read error
/// ends the stream with an error naming the file and line.
#[derive(Debug)]
pub struct DictionaryReader<R: BufRead> {
    input: R,
    file: String,
    line_number: usize,
    last_term: Option<String>,
    buffer: String,
    failed: bool,
}

impl<R: BufRead> DictionaryReader<R> {
    /// Read entries from `input`; `file` names it in error messages.
    pub fn new<S: Into<String>>(input: R, file: S) -> Self {
        DictionaryReader {
            input,
            file: file.into(),
            line_number: 0,
            last_term: None,
            buffer: String::new(),
            failed: false,
        }
    }

    /// Name of the file being read.
    pub fn file(&self) -> &str {
        &self.file
    }

    fn read_entry(&mut self) -> Result<Option<(String, PostingsList)>> {
        self.buffer.clear();
        let read = self.input.read_line(&mut self.buffer).map_err(|e| {
            if e.kind() == io::ErrorKind::InvalidData {
                SpimiError::parse(self.file.as_str(), self.line_number + 1, e.to_string())
            } else {
                SpimiError::storage(format!(
                    "Failed to read {} after line {}: {e}",
                    self.file, self.line_number
                ))
            }
        })?;
        if read == 0 {
            return Ok(None);
        }
        self.line_number += 1;

        let line = self
            .buffer
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(self.buffer.as_str());

        let (term, postings) = parse_line(line)
            .map_err(|msg| SpimiError::parse(self.file.as_str(), self.line_number, msg))?;

        if let Some(last) = &self.last_term {
            if *last >= term {
                return Err(SpimiError::parse(
                    self.file.as_str(),
                    self.line_number,
                    format!("term {term:?} does not sort after {last:?}"),
                ));
            }
        }
        self.last_term = Some(term.clone());

        Ok(Some((term, postings)))
    }
}

impl<R: BufRead> Iterator for DictionaryReader<R> {
    type Item = Result<(String, PostingsList)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_entry() {
            Ok(entry) => entry.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Read a whole dictionary from `input`.
pub fn read_dictionary<R: BufRead>(input: R, file: &str) -> Result<Dictionary> {
    DictionaryReader::new(input, file).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        assert_eq!(format_line("car", &[10, 44, 44, 91]), "car : [10, 44, 44, 91]");
        assert_eq!(format_line("solo", &[5]), "solo : [5]");
        assert_eq!(format_line("none", &[]), "none : []");
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(
            parse_line("car : [10, 44, 44, 91]").unwrap(),
            ("car".to_string(), vec![10, 44, 44, 91])
        );
        assert_eq!(parse_line("none : []").unwrap(), ("none".to_string(), vec![]));
        // Brackets and colons are allowed inside a term as long as " : [" is not.
        assert_eq!(
            parse_line("a]b:c : [1]").unwrap(),
            ("a]b:c".to_string(), vec![1])
        );
    }

    #[test]
    fn test_parse_line_rejects_malformed() {
        assert!(parse_line("car [1, 2]").unwrap_err().contains("missing delimiter"));
        assert!(parse_line("car : [1, 2").unwrap_err().contains("closing"));
        assert!(parse_line("car : [1, x]").unwrap_err().contains("invalid posting"));
        assert!(parse_line("car : [1,2]").unwrap_err().contains("invalid posting"));
        assert!(parse_line("car : [-1]").unwrap_err().contains("invalid posting"));
        assert!(parse_line("car : [+5]").unwrap_err().contains("invalid posting"));
        assert!(parse_line("car : [1, ]").unwrap_err().contains("invalid posting"));
        assert!(parse_line(" : [1]").unwrap_err().contains("empty term"));
        assert!(parse_line("car : [5, 2]").unwrap_err().contains("not ascending"));
        assert!(parse_line("").is_err());
    }

    #[test]
    fn test_validate_term() {
        assert!(validate_term("car").is_ok());
        assert!(validate_term("").is_err());
        assert!(validate_term("bad : [term").is_err());
        assert!(validate_term("two\nlines").is_err());
    }

    #[test]
    fn test_round_trip() {
        let dict: Dictionary = [
            ("car".to_string(), vec![10, 44, 44, 91]),
            ("honda".to_string(), vec![3, 7, 7]),
            ("zürich".to_string(), vec![2]),
        ]
        .into_iter()
        .collect();

        let mut bytes = Vec::new();
        assert_eq!(write_dictionary(&dict, &mut bytes).unwrap(), 3);
        assert_eq!(
            String::from_utf8(bytes.clone()).unwrap(),
            "car : [10, 44, 44, 91]\nhonda : [3, 7, 7]\nzürich : [2]\n"
        );

        let read = read_dictionary(bytes.as_slice(), "dictionary.txt").unwrap();
        assert_eq!(read, dict);
    }

    #[test]
    fn test_writer_rejects_unsorted_terms() {
        let mut writer = DictionaryWriter::new(Vec::new());
        writer.write_entry("b", &[1]).unwrap();
        assert!(writer.write_entry("a", &[1]).is_err());
        assert!(writer.write_entry("b", &[2]).is_err());
    }

    #[test]
    fn test_writer_rejects_invalid_term() {
        let mut writer = DictionaryWriter::new(Vec::new());
        let err = writer.write_entry("x : [y", &[1]).unwrap_err();
        assert!(matches!(err, SpimiError::InvalidTerm { .. }));
        assert_eq!(writer.entries(), 0);
    }

    #[test]
    fn test_reader_reports_line_numbers() {
        let text = "apple : [1]\nbanana : [2, x]\ncherry : [3]\n";
        let err = read_dictionary(text.as_bytes(), "block2.txt").unwrap_err();
        match err {
            SpimiError::Parse { file, line, .. } => {
                assert_eq!(file, "block2.txt");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reader_reports_invalid_utf8_as_parse_error() {
        let bytes: &[u8] = b"apple : [1]\nban\xffana : [2]\n";
        let err = read_dictionary(bytes, "block3.txt").unwrap_err();
        match err {
            SpimiError::Parse { file, line, .. } => {
                assert_eq!(file, "block3.txt");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reader_rejects_unsorted_terms() {
        let text = "banana : [1]\napple : [2]\n";
        let err = read_dictionary(text.as_bytes(), "block1.txt").unwrap_err();
        assert!(err.is_parse_error());

        let text = "apple : [1]\napple : [2]\n";
        assert!(read_dictionary(text.as_bytes(), "block1.txt").is_err());
    }

    #[test]
    fn test_reader_stops_after_error() {
        let text = "apple : [1]\nbroken\ncherry : [3]\n";
        let mut reader = DictionaryReader::new(text.as_bytes(), "block1.txt");
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_reader_accepts_crlf_and_missing_final_newline() {
        let text = "apple : [1]\r\nbanana : [2]";
        let dict = read_dictionary(text.as_bytes(), "block1.txt").unwrap();
        assert_eq!(dict.get("banana"), Some(&[2][..]));
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_empty_input_is_empty_dictionary() {
        let dict = read_dictionary("".as_bytes(), "block1.txt").unwrap();
        assert!(dict.is_empty());
    }
}
