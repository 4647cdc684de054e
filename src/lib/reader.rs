//! Lazy, forward-only reader of sequence records.
//!
//! The input is line based and FASTA-like:
//!
//! ```text
//! >header            optional; starts a multi-line record
//! GGGAAAUCC&GGAUUU   sequence line(s)
//! (((...(((&)))))).  optional structure / constraint line(s)
//! ```
//!
//! Without a header every sequence line is a record of its own. Blank lines are
//! skipped, `#` and `;` start comment lines, and a line starting with `@` ends the
//! input. Every record, including a malformed one, consumes exactly one sequence
//! number so that numbering reflects the position in the input.

use std::io::{self, BufRead};

use crate::record::Record;

/// Characters that may appear in a structure / constraint line.
const STRUCTURE_CHARS: &[u8] = b".()[]{}<>|x&,:";

/// An item produced by the [`RecordReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    /// A well-formed record.
    Record(Record),
    /// A record that could not be interpreted; it still owns a sequence number.
    Malformed(MalformedRecord),
}

/// Description of a malformed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    /// The sequence number consumed by the record.
    pub number: u64,
    /// 1-based line number where the record starts.
    pub line: usize,
    /// What was wrong.
    pub reason: String,
}

/// Reads records from a buffered input, assigning sequence numbers.
pub struct RecordReader<R> {
    reader: R,
    lookahead: Option<String>,
    line_number: usize,
    next_number: u64,
    finished: bool,
}

impl<R: BufRead> RecordReader<R> {
    /// Creates a reader numbering records from zero.
    pub fn new(reader: R) -> Self {
        Self::starting_at(reader, 0)
    }

    /// Creates a reader whose first record receives `first_number`.
    ///
    /// Used to continue numbering across several input files.
    pub fn starting_at(reader: R, first_number: u64) -> Self {
        Self { reader, lookahead: None, line_number: 0, next_number: first_number, finished: false }
    }

    /// The sequence number the next record will receive.
    #[must_use]
    pub fn next_number(&self) -> u64 {
        self.next_number
    }

    /// Reads the next record.
    ///
    /// Returns `Ok(None)` at end of input (or after the `@` quit marker).
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the underlying reader fails; the reader should not be
    /// used afterwards.
    pub fn next_event(&mut self) -> io::Result<Option<ReaderEvent>> {
        loop {
            let Some(line) = self.take_line()? else {
                return Ok(None);
            };
            let trimmed = line.trim();
            if is_skippable(trimmed) {
                continue;
            }
            if trimmed.starts_with('@') {
                self.finished = true;
                return Ok(None);
            }

            let start_line = self.line_number;
            if let Some(header) = trimmed.strip_prefix('>') {
                let id = header.trim().to_string();
                return self.read_fasta_body(id, start_line).map(Some);
            }
            if is_structure_line(trimmed) {
                return Ok(Some(self.malformed(start_line, "structure line without a sequence")));
            }

            let sequence = first_token(trimmed).to_string();
            let rest = self.read_rest_lines()?;
            return Ok(Some(self.record(None, sequence, rest, false)));
        }
    }

    fn read_fasta_body(&mut self, id: String, start_line: usize) -> io::Result<ReaderEvent> {
        let mut sequence = String::new();
        let mut rest = Vec::new();
        while let Some(line) = self.peek_line()? {
            let trimmed = line.trim();
            if trimmed.starts_with('>') || trimmed.starts_with('@') {
                break;
            }
            let trimmed = trimmed.to_string();
            self.lookahead = None;
            if is_skippable(&trimmed) {
                continue;
            }
            if rest.is_empty() && !is_structure_line(&trimmed) {
                sequence.push_str(first_token(&trimmed));
            } else {
                rest.push(trimmed);
            }
        }

        if sequence.is_empty() {
            let reason = format!("header '>{id}' is not followed by a sequence");
            return Ok(self.malformed(start_line, &reason));
        }
        let id = if id.is_empty() { None } else { Some(id) };
        Ok(self.record(id, sequence, rest, true))
    }

    fn read_rest_lines(&mut self) -> io::Result<Vec<String>> {
        let mut rest = Vec::new();
        while let Some(line) = self.peek_line()? {
            let trimmed = line.trim();
            if !is_structure_line(trimmed) {
                break;
            }
            rest.push(trimmed.to_string());
            self.lookahead = None;
        }
        Ok(rest)
    }

    fn record(
        &mut self,
        id: Option<String>,
        sequence: String,
        rest: Vec<String>,
        multiline: bool,
    ) -> ReaderEvent {
        let number = self.claim_number();
        ReaderEvent::Record(Record { number, id_number: 0, id, sequence, rest, multiline })
    }

    fn malformed(&mut self, line: usize, reason: &str) -> ReaderEvent {
        let number = self.claim_number();
        ReaderEvent::Malformed(MalformedRecord { number, line, reason: reason.to_string() })
    }

    fn claim_number(&mut self) -> u64 {
        let number = self.next_number;
        self.next_number += 1;
        number
    }

    fn peek_line(&mut self) -> io::Result<Option<&str>> {
        if self.lookahead.is_none() {
            self.lookahead = self.read_physical_line()?;
        }
        Ok(self.lookahead.as_deref())
    }

    fn take_line(&mut self) -> io::Result<Option<String>> {
        match self.lookahead.take() {
            Some(line) => Ok(Some(line)),
            None => self.read_physical_line(),
        }
    }

    fn read_physical_line(&mut self) -> io::Result<Option<String>> {
        if self.finished {
            return Ok(None);
        }
        let mut buf = String::new();
        if self.reader.read_line(&mut buf)? == 0 {
            self.finished = true;
            return Ok(None);
        }
        self.line_number += 1;
        Ok(Some(buf))
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = io::Result<ReaderEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

fn is_skippable(trimmed: &str) -> bool {
    trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';')
}

fn first_token(trimmed: &str) -> &str {
    trimmed.split_whitespace().next().unwrap_or_default()
}

/// A line is a structure line if its first token only holds structure characters
/// and is not made of `x`/`&` alone (which could be a sequence).
fn is_structure_line(trimmed: &str) -> bool {
    let token = first_token(trimmed).as_bytes();
    !token.is_empty()
        && token.iter().all(|b| STRUCTURE_CHARS.contains(b))
        && token.iter().any(|&b| b != b'x' && b != b'&')
}
