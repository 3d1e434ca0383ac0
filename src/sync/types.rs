//! Sync outcome and summary types.

use serde::Serialize;

use crate::error::Result;

/// What sync did (or, in a dry run, would do) with one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// A new row was inserted.
    Added,
    /// An existing row was rewritten.
    Updated,
    /// The file is unchanged since the last sync.
    Skipped,
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Updated => write!(f, "updated"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result of syncing one file.
#[derive(Debug)]
pub struct SyncOutcome {
    pub file: String,
    pub result: Result<SyncAction>,
}

/// A file that failed to sync or prune.
#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub file: String,
    pub code: &'static str,
    pub message: String,
}

/// Statistics for a sync or prune run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncSummary {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    pub pruned: usize,
    pub failed: Vec<FailedFile>,
}

impl SyncSummary {
    /// Fold one sync outcome into the counts.
    pub fn record(&mut self, outcome: &SyncOutcome) {
        match &outcome.result {
            Ok(SyncAction::Added) => self.added += 1,
            Ok(SyncAction::Updated) => self.updated += 1,
            Ok(SyncAction::Skipped) => self.skipped += 1,
            Err(e) => self.record_failure(&outcome.file, e),
        }
    }

    pub fn record_pruned(&mut self) {
        self.pruned += 1;
    }

    pub fn record_failure(&mut self, file: &str, error: &crate::error::Error) {
        self.failed.push(FailedFile {
            file: file.to_string(),
            code: error.error_code().as_str(),
            message: error.to_string(),
        });
    }

    /// Files that were processed successfully.
    #[must_use]
    pub fn total(&self) -> usize {
        self.added + self.updated + self.skipped + self.pruned
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl FromIterator<SyncOutcome> for SyncSummary {
    fn from_iter<I: IntoIterator<Item = SyncOutcome>>(iter: I) -> Self {
        let mut summary = Self::default();
        for outcome in iter {
            summary.record(&outcome);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_record_counts() {
        let outcomes = vec![
            SyncOutcome {
                file: "book/a.md".into(),
                result: Ok(SyncAction::Added),
            },
            SyncOutcome {
                file: "book/b.md".into(),
                result: Ok(SyncAction::Skipped),
            },
            SyncOutcome {
                file: "book/c.md".into(),
                result: Err(Error::NotFound {
                    path: "book/c.md".into(),
                }),
            },
        ];
        let summary: SyncSummary = outcomes.into_iter().collect();
        assert_eq!(summary.added, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total(), 2);
        assert_eq!(summary.failed[0].code, "NOT_FOUND");
    }
}
