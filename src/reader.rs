//! CSV reader: turns the subscriber export into `ContactRow`s.
//!
//! The first record is always treated as the header and dropped, whatever it
//! contains. Rows are decoded lossily so that every data record yields a row.
//! Completely empty lines are not records; they are skipped and counted.

use std::fs::File;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};
use tracing::warn;

use crate::error::SetupError;

/// One data record of the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRow {
    /// 1-based CSV record number; the header is record 1. Blank lines are not
    /// records, so this is not the physical line once blank lines occur.
    pub record: u64,
    pub email: String,
    pub interests: Vec<String>,
}

impl ContactRow {
    /// Build a row from raw fields: trimmed email, split interests.
    pub fn from_fields(record: u64, email: &str, interests: &str) -> Self {
        Self {
            record,
            email: email.trim().to_string(),
            interests: parse_interests(interests),
        }
    }
}

/// Split a comma-separated interests cell.
///
/// Pieces are trimmed and empty pieces dropped. Order and duplicates are kept.
pub fn parse_interests(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lazy iterator over the data rows of an export.
pub struct ContactReader<R: std::io::Read> {
    inner: csv::Reader<R>,
    record: ByteRecord,
    data_rows: u64,
    /// `\n` bytes seen inside data fields (quoted multi-line cells).
    field_newlines: u64,
    blank_lines: Option<u64>,
}

impl ContactReader<File> {
    /// Open the export at `path`. A missing or unreadable file is fatal.
    pub fn open(path: &Path) -> Result<Self, SetupError> {
        let inner = builder()
            .from_path(path)
            .map_err(|source| SetupError::InputUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::wrap(inner))
    }
}

impl<R: std::io::Read> ContactReader<R> {
    /// Read an export from any reader (used by tests).
    pub fn from_reader(reader: R) -> Self {
        Self::wrap(builder().from_reader(reader))
    }

    fn wrap(inner: csv::Reader<R>) -> Self {
        Self {
            inner,
            record: ByteRecord::new(),
            data_rows: 0,
            field_newlines: 0,
            blank_lines: None,
        }
    }

    /// Empty lines skipped in the input, known once the input is exhausted.
    ///
    /// Every `\n` read belongs to a record terminator, a multi-line cell or a
    /// blank line. A final record without a trailing newline is not told
    /// apart, so the count can be one low in that case.
    pub fn blank_lines(&self) -> Option<u64> {
        self.blank_lines
    }

    fn finish(&mut self) {
        if self.blank_lines.is_some() {
            return;
        }
        let newlines = self.inner.position().line().saturating_sub(1);
        let header = self
            .inner
            .byte_headers()
            .map(|h| (!h.is_empty(), count_newlines(h)))
            .unwrap_or((false, 0));
        let records = self.data_rows + u64::from(header.0);
        let blank = newlines.saturating_sub(records + self.field_newlines + header.1);
        if blank > 0 {
            warn!(blank_lines = blank, "Skipped blank lines in input");
        }
        self.blank_lines = Some(blank);
    }
}

fn builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(true).flexible(true);
    builder
}

impl<R: std::io::Read> Iterator for ContactReader<R> {
    type Item = Result<ContactRow, SetupError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.read_byte_record(&mut self.record) {
            Ok(false) => {
                self.finish();
                None
            }
            Ok(true) => {
                self.data_rows += 1;
                self.field_newlines += count_newlines(&self.record);
                let email = field(&self.record, 0);
                let interests = interests_field(&self.record);
                // Header is record 1.
                let record = self.data_rows + 1;
                Some(Ok(ContactRow::from_fields(record, &email, &interests)))
            }
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                Some(Err(SetupError::InputRead {
                    line,
                    reason: e.to_string(),
                }))
            }
        }
    }
}

fn field(record: &ByteRecord, index: usize) -> String {
    record
        .get(index)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default()
}

/// Everything after the email column. An unquoted multi-value cell arrives as
/// several fields; joining them back makes it read the same as the quoted form.
fn interests_field(record: &ByteRecord) -> String {
    record
        .iter()
        .skip(1)
        .map(String::from_utf8_lossy)
        .collect::<Vec<_>>()
        .join(",")
}

fn count_newlines(record: &ByteRecord) -> u64 {
    record
        .iter()
        .map(|f| f.iter().filter(|&&b| b == b'\n').count() as u64)
        .sum()
}
