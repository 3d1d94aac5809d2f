//! Migration pipeline: one row at a time, validate → lookup → update → log.
//!
//! Every data row produces exactly one `OutcomeRecord`. Row-level failures
//! (bad email, unknown contact, failed request, rejected update) become
//! skipped records and the run carries on. Only setup failures and log write
//! failures stop the run.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::MigrationConfig;
use crate::contacts::ContactDirectory;
use crate::error::{Error, SetupError};
use crate::outcome::{
    LogPaths, OutcomeLog, OutcomeRecord, OutcomeSink, OutcomeStatus, SkipReason,
};
use crate::reader::{ContactReader, ContactRow};

/// local@domain.tld, no whitespace, exactly one `@`.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// Basic email syntax check. Not a deliverability check.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Counts for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub updated: usize,
    pub skipped: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            total: 0,
            updated: 0,
            skipped: 0,
            started_at: now,
            finished_at: now,
        }
    }

    fn count(&mut self, outcome: &OutcomeRecord) {
        self.total += 1;
        match outcome.status {
            OutcomeStatus::Updated => self.updated += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
        }
    }
}

/// Drives rows through the contact directory.
pub struct Migrator {
    directory: Arc<dyn ContactDirectory>,
}

impl Migrator {
    pub fn new(directory: Arc<dyn ContactDirectory>) -> Self {
        Self { directory }
    }

    /// Decide the outcome for a single row. Never fails: every problem is a skip.
    pub async fn process_row(&self, row: &ContactRow) -> OutcomeRecord {
        if !is_valid_email(&row.email) {
            debug!(record = row.record, email = %row.email, "Invalid email, skipping");
            return OutcomeRecord::skipped(&row.email, &SkipReason::InvalidEmail);
        }

        let contact = match self.directory.lookup(&row.email).await {
            Ok(Some(contact)) => contact,
            Ok(None) => {
                debug!(record = row.record, email = %row.email, "Contact not found");
                return OutcomeRecord::skipped(
                    &row.email,
                    &SkipReason::NotFound {
                        remote: self.directory.name().to_string(),
                    },
                );
            }
            Err(e) => {
                warn!(record = row.record, email = %row.email, error = %e, "Lookup failed");
                return OutcomeRecord::skipped(
                    &row.email,
                    &SkipReason::LookupFailed {
                        cause: e.to_string(),
                    },
                );
            }
        };

        match self
            .directory
            .update(&contact.contact_id, &row.interests)
            .await
        {
            Ok(resp) if resp.is_applied() => {
                info!(
                    record = row.record,
                    email = %row.email,
                    contact_id = %contact.contact_id,
                    interests = row.interests.len(),
                    "Interests updated"
                );
                OutcomeRecord::updated(&row.email, &row.interests)
            }
            Ok(resp) => {
                warn!(
                    record = row.record,
                    email = %row.email,
                    status = resp.status,
                    body = %resp.body.chars().take(200).collect::<String>(),
                    "Update rejected"
                );
                let reason = SkipReason::UpdateFailed {
                    status: resp.status,
                };
                OutcomeRecord::skipped(&row.email, &reason)
            }
            Err(e) => {
                warn!(record = row.record, email = %row.email, error = %e, "Update request failed");
                OutcomeRecord::skipped(&row.email, &SkipReason::UpdateNoResponse)
            }
        }
    }

    /// Process every row in order, writing each outcome before the next row starts.
    ///
    /// A row the reader could not produce is fatal; outcomes already written stay.
    pub async fn run<I, S>(&self, rows: I, sink: &mut S) -> Result<RunSummary, Error>
    where
        I: IntoIterator<Item = Result<ContactRow, SetupError>>,
        S: OutcomeSink,
    {
        let mut summary = RunSummary::start();

        for row in rows {
            let row = row?;
            let outcome = self.process_row(&row).await;
            sink.record(&outcome)?;
            summary.count(&outcome);
        }

        summary.finished_at = Utc::now();
        info!(
            total = summary.total,
            updated = summary.updated,
            skipped = summary.skipped,
            "Migration run complete"
        );
        Ok(summary)
    }
}

/// A finished run: counts plus where the logs were written.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub summary: RunSummary,
    pub logs: LogPaths,
}

/// Run a whole migration as configured.
///
/// The logs are created before the input is opened, so even a run that fails
/// on a missing input leaves fresh header-only logs. The log handles are
/// released on every return path.
pub async fn migrate(
    config: &MigrationConfig,
    directory: Arc<dyn ContactDirectory>,
) -> Result<MigrationReport, Error> {
    let mut log = OutcomeLog::create(&config.changed_log_path, &config.skipped_log_path)?;
    let rows = ContactReader::open(&config.input_path)?;

    info!(
        input = %config.input_path.display(),
        remote = directory.name(),
        "Starting interests migration"
    );

    let summary = Migrator::new(directory).run(rows, &mut log).await?;
    let logs = log.finish()?;
    Ok(MigrationReport { summary, logs })
}
