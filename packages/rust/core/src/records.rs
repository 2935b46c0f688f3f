//! Delimited-record parser for the posts and comments inputs.
//!
//! Comma-separated, one record per line, with permissive quoting:
//! - leading whitespace of each field is dropped
//! - a field starting with `"` is quoted; `""` inside it is a literal quote
//! - a quote that does not close the field (not followed by `,` or end of
//!   line) is kept as a literal character
//! - quoted fields may span lines; an unterminated one runs to end of input,
//!   keeping the final line terminator
//! - quotes inside unquoted fields are literal
//! - blank lines are skipped and `\r\n` is treated as `\n`
//!
//! The parser never treats the first record specially; callers that expect a
//! header call [`RecordReader::skip_header`].

use std::io::BufRead;

use post_scorer_shared::{PostScorerError, Result};

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One parsed row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    line: usize,
    fields: Vec<String>,
}

impl Record {
    /// 1-based line number the record starts on.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Take the first `N` fields by position, ignoring any extra columns.
    pub fn into_columns<const N: usize>(self) -> Result<[String; N]> {
        let line = self.line;
        let found = self.fields.len();
        if found < N {
            return Err(PostScorerError::Structural {
                line,
                expected: N,
                found,
            });
        }

        let mut fields = self.fields.into_iter();
        Ok(std::array::from_fn(|_| fields.next().unwrap_or_default()))
    }
}

// ---------------------------------------------------------------------------
// RecordReader
// ---------------------------------------------------------------------------

/// Lazy record iterator over a buffered byte stream.
///
/// Yields at most one error; iteration ends after it.
pub struct RecordReader<R> {
    reader: R,
    min_columns: usize,
    line: usize,
    /// Whether the last physical line read ended with a newline.
    terminated: bool,
    done: bool,
}

impl<R: BufRead> RecordReader<R> {
    /// Create a reader that rejects records with fewer than `min_columns` fields.
    pub fn new(reader: R, min_columns: usize) -> Self {
        Self {
            reader,
            min_columns,
            line: 0,
            terminated: false,
            done: false,
        }
    }

    /// Consume and return the first record. The column minimum is not applied.
    pub fn skip_header(&mut self) -> Result<Record> {
        match self.read_record() {
            Ok(Some(header)) => Ok(header),
            Ok(None) => {
                self.done = true;
                Err(PostScorerError::parse(self.line, "missing header row"))
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }

    /// Read one physical line without its terminator. `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut bytes = Vec::new();
        let read = self
            .reader
            .read_until(b'\n', &mut bytes)
            .map_err(|e| PostScorerError::parse(self.line + 1, format!("read failed: {e}")))?;
        if read == 0 {
            return Ok(None);
        }
        self.line += 1;

        self.terminated = bytes.last() == Some(&b'\n');
        if self.terminated {
            bytes.pop();
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
        }

        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| PostScorerError::parse(self.line, format!("invalid UTF-8: {e}")))
    }

    fn read_record(&mut self) -> Result<Option<Record>> {
        loop {
            let Some(line) = self.read_line()? else {
                return Ok(None);
            };
            if line.is_empty() {
                continue;
            }

            let start = self.line;
            let fields = self.split_fields(line)?;
            return Ok(Some(Record {
                line: start,
                fields,
            }));
        }
    }

    /// Split one record into fields, pulling more lines for multi-line quoted fields.
    fn split_fields(&mut self, mut current: String) -> Result<Vec<String>> {
        let mut fields = Vec::new();
        let mut pos = 0;

        'fields: loop {
            let rest = &current[pos..];
            pos += rest.len() - rest.trim_start().len();

            if !current[pos..].starts_with('"') {
                match current[pos..].find(',') {
                    Some(i) => {
                        fields.push(current[pos..pos + i].to_string());
                        pos += i + 1;
                        continue 'fields;
                    }
                    None => {
                        fields.push(current[pos..].to_string());
                        return Ok(fields);
                    }
                }
            }

            pos += 1;
            let mut field = String::new();
            loop {
                let Some(i) = current[pos..].find('"') else {
                    field.push_str(&current[pos..]);
                    match self.read_line()? {
                        Some(next) => {
                            field.push('\n');
                            current = next;
                            pos = 0;
                            continue;
                        }
                        None => {
                            // The field swallows the final line terminator.
                            if self.terminated {
                                field.push('\n');
                            }
                            fields.push(field);
                            return Ok(fields);
                        }
                    }
                };

                field.push_str(&current[pos..pos + i]);
                pos += i + 1;
                match current[pos..].chars().next() {
                    Some('"') => {
                        field.push('"');
                        pos += 1;
                    }
                    Some(',') => {
                        fields.push(field);
                        pos += 1;
                        continue 'fields;
                    }
                    None => {
                        fields.push(field);
                        return Ok(fields);
                    }
                    // Stray quote inside a quoted field.
                    Some(_) => field.push('"'),
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let min_columns = self.min_columns;
        let outcome = self.read_record().and_then(|record| match record {
            Some(r) if r.len() < min_columns => Err(PostScorerError::Structural {
                line: r.line,
                expected: min_columns,
                found: r.len(),
            }),
            other => Ok(other),
        });

        match outcome {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
