use serde::Serialize;

use crate::registry::{JobId, Resolution, Transition};

/// Final outcome of one job within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub file_name: String,
    /// What the registry recorded when the job was resolved.
    pub transition: Transition,
}

impl JobOutcome {
    pub fn resolution(&self) -> Option<&Resolution> {
        match &self.transition {
            Transition::Resolved(resolution) => Some(resolution),
            _ => None,
        }
    }

    /// Error message recorded on the job, when it ended in `Error`.
    pub fn error(&self) -> Option<&str> {
        self.resolution().and_then(Resolution::error_message)
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self.resolution(), Some(Resolution::Duplicate))
    }
}

/// Summary of a submitted batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub admitted: Vec<JobId>,
    /// Files left out because their name was already in the registry.
    pub skipped: Vec<String>,
    pub outcomes: Vec<JobOutcome>,
}

/// Per-batch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[deny(missing_docs)]
pub struct BatchCounts {
    /// Jobs created for this batch.
    pub admitted: usize,
    /// Files left out at admission because of a name collision.
    pub skipped: usize,
    /// Jobs that completed with extracted data.
    pub completed: usize,
    /// Jobs rejected by the duplicate classifier.
    pub rejected: usize,
    /// Jobs whose file read or extraction failed.
    pub failed: usize,
    /// Jobs cleared from the registry before they resolved.
    pub discarded: usize,
}

/// User-facing notice for files skipped at admission, if any were.
pub fn skipped_message(count: usize) -> Option<String> {
    match count {
        0 => None,
        n => Some(format!(
            "{} file(s) skipped due to identical file names.",
            n
        )),
    }
}

impl BatchReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn skipped_message(&self) -> Option<String> {
        skipped_message(self.skipped.len())
    }

    pub fn counts(&self) -> BatchCounts {
        let mut counts = BatchCounts {
            admitted: self.admitted.len(),
            skipped: self.skipped.len(),
            ..Default::default()
        };

        for outcome in &self.outcomes {
            match &outcome.transition {
                Transition::Resolved(Resolution::Completed) => counts.completed += 1,
                Transition::Resolved(Resolution::Duplicate) => counts.rejected += 1,
                Transition::Resolved(Resolution::Failed(_)) => counts.failed += 1,
                Transition::Discarded => counts.discarded += 1,
                Transition::Applied(_) | Transition::Ignored { .. } => {}
            }
        }

        counts
    }
}
