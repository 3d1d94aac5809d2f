//! Per-row outcomes and the two CSV logs they are written to.
//!
//! Both logs are truncated and given their header when the run starts, so a
//! run that processes zero rows still leaves two header-only files behind.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::OutcomeLogError;

pub const SKIPPED_HEADER: [&str; 2] = ["Email", "Reason"];
pub const CHANGED_HEADER: [&str; 2] = ["Email", "Updated Interests"];

/// Whether a row's interests were applied remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Updated,
    Skipped,
}

/// Why a row was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    InvalidEmail,
    NotFound { remote: String },
    LookupFailed { cause: String },
    UpdateFailed { status: u16 },
    UpdateNoResponse,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEmail => write!(f, "Invalid email format"),
            Self::NotFound { remote } => write!(f, "Not found in {remote}"),
            Self::LookupFailed { cause } => write!(f, "Lookup failed ({cause})"),
            Self::UpdateFailed { status } => write!(f, "Update failed ({status})"),
            Self::UpdateNoResponse => write!(f, "Update failed (no response)"),
        }
    }
}

/// The result of processing one input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecord {
    pub email: String,
    pub status: OutcomeStatus,
    /// Applied interests (comma-joined) when updated, the reason when skipped.
    pub detail: String,
}

impl OutcomeRecord {
    pub fn updated(email: impl Into<String>, interests: &[String]) -> Self {
        Self {
            email: email.into(),
            status: OutcomeStatus::Updated,
            detail: interests.join(","),
        }
    }

    pub fn skipped(email: impl Into<String>, reason: &SkipReason) -> Self {
        Self {
            email: email.into(),
            status: OutcomeStatus::Skipped,
            detail: reason.to_string(),
        }
    }
}

/// Where a run's outcomes ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    pub changed: PathBuf,
    pub skipped: PathBuf,
}

/// Sink for outcome records. The CSV log is the production implementation.
pub trait OutcomeSink {
    fn record(&mut self, outcome: &OutcomeRecord) -> Result<(), OutcomeLogError>;
}

struct LogFile {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl LogFile {
    fn create(path: &Path, header: [&str; 2]) -> Result<Self, OutcomeLogError> {
        let writer = csv::Writer::from_path(path).map_err(|source| OutcomeLogError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file = Self {
            path: path.to_path_buf(),
            writer,
        };
        file.append(header)?;
        Ok(file)
    }

    /// Write one row and push it through to the file.
    fn append(&mut self, row: [&str; 2]) -> Result<(), OutcomeLogError> {
        if let Err(e) = self.writer.write_record(row) {
            return Err(OutcomeLogError::Write {
                path: self.path.clone(),
                reason: e.to_string(),
            });
        }
        self.flush()
    }

    fn flush(&mut self) -> Result<(), OutcomeLogError> {
        self.writer.flush().map_err(|e| OutcomeLogError::Write {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

/// The changed and skipped logs for one run.
///
/// Writers flush on drop, so early returns leave complete lines on disk.
pub struct OutcomeLog {
    changed: LogFile,
    skipped: LogFile,
}

impl OutcomeLog {
    /// Create (truncate) both logs and write their headers.
    pub fn create(changed: &Path, skipped: &Path) -> Result<Self, OutcomeLogError> {
        Ok(Self {
            changed: LogFile::create(changed, CHANGED_HEADER)?,
            skipped: LogFile::create(skipped, SKIPPED_HEADER)?,
        })
    }

    pub fn paths(&self) -> LogPaths {
        LogPaths {
            changed: self.changed.path.clone(),
            skipped: self.skipped.path.clone(),
        }
    }

    /// Flush both logs and close them.
    pub fn finish(mut self) -> Result<LogPaths, OutcomeLogError> {
        self.changed.flush()?;
        self.skipped.flush()?;
        Ok(self.paths())
    }
}

impl OutcomeSink for OutcomeLog {
    fn record(&mut self, outcome: &OutcomeRecord) -> Result<(), OutcomeLogError> {
        let file = match outcome.status {
            OutcomeStatus::Updated => &mut self.changed,
            OutcomeStatus::Skipped => &mut self.skipped,
        };
        file.append([outcome.email.as_str(), outcome.detail.as_str()])
    }
}

impl OutcomeSink for Vec<OutcomeRecord> {
    fn record(&mut self, outcome: &OutcomeRecord) -> Result<(), OutcomeLogError> {
        self.push(outcome.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn skip_reason_text() {
        assert_eq!(SkipReason::InvalidEmail.to_string(), "Invalid email format");
        assert_eq!(
            SkipReason::NotFound { remote: "Omnisend".into() }.to_string(),
            "Not found in Omnisend"
        );
        assert_eq!(SkipReason::UpdateFailed { status: 400 }.to_string(), "Update failed (400)");
        assert_eq!(SkipReason::UpdateNoResponse.to_string(), "Update failed (no response)");
        assert_eq!(
            SkipReason::LookupFailed { cause: "timed out".into() }.to_string(),
            "Lookup failed (timed out)"
        );
    }

    #[test]
    fn updated_record_joins_interests() {
        let record =
            OutcomeRecord::updated("a@x.com", &["Ladies".to_string(), "Gentlemen".to_string()]);
        assert_eq!(record.status, OutcomeStatus::Updated);
        assert_eq!(record.detail, "Ladies,Gentlemen");
    }

    #[test]
    fn empty_run_leaves_header_only_logs() {
        let dir = tempfile::tempdir().unwrap();
        let changed = dir.path().join("changed.csv");
        let skipped = dir.path().join("skipped.csv");

        let log = OutcomeLog::create(&changed, &skipped).unwrap();
        let paths = log.finish().unwrap();

        assert_eq!(paths.changed, changed);
        assert_eq!(read_rows(&changed), vec![vec!["Email", "Updated Interests"]]);
        assert_eq!(read_rows(&skipped), vec![vec!["Email", "Reason"]]);
    }

    #[test]
    fn records_route_to_matching_log() {
        let dir = tempfile::tempdir().unwrap();
        let changed = dir.path().join("changed.csv");
        let skipped = dir.path().join("skipped.csv");

        let mut log = OutcomeLog::create(&changed, &skipped).unwrap();
        log.record(&OutcomeRecord::updated(
            "a@x.com",
            &["Ladies".to_string(), "Gentlemen".to_string()],
        ))
        .unwrap();
        log.record(&OutcomeRecord::skipped("bad-email", &SkipReason::InvalidEmail))
            .unwrap();
        log.finish().unwrap();

        let changed_rows = read_rows(&changed);
        assert_eq!(changed_rows.len(), 2);
        assert_eq!(changed_rows[1], vec!["a@x.com", "Ladies,Gentlemen"]);

        let skipped_rows = read_rows(&skipped);
        assert_eq!(skipped_rows.len(), 2);
        assert_eq!(skipped_rows[1], vec!["bad-email", "Invalid email format"]);
    }

    #[test]
    fn records_are_on_disk_before_finish() {
        let dir = tempfile::tempdir().unwrap();
        let changed = dir.path().join("changed.csv");
        let skipped = dir.path().join("skipped.csv");

        let mut log = OutcomeLog::create(&changed, &skipped).unwrap();
        log.record(&OutcomeRecord::skipped(
            "c@x.com",
            &SkipReason::NotFound { remote: "Omnisend".into() },
        ))
        .unwrap();

        let rows = read_rows(&skipped);
        assert_eq!(rows.last().unwrap(), &vec!["c@x.com", "Not found in Omnisend"]);
        drop(log);
    }

    #[test]
    fn create_truncates_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let changed = dir.path().join("changed.csv");
        let skipped = dir.path().join("skipped.csv");
        std::fs::write(&skipped, "old,stuff\nmore,old\n").unwrap();

        OutcomeLog::create(&changed, &skipped).unwrap().finish().unwrap();
        assert_eq!(read_rows(&skipped), vec![vec!["Email", "Reason"]]);
    }

    #[test]
    fn create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = OutcomeLog::create(
            &dir.path().join("missing/changed.csv"),
            &dir.path().join("skipped.csv"),
        );
        assert!(matches!(result, Err(OutcomeLogError::Create { .. })));
    }
}
