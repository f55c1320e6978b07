//! In-session job registry.

use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use serde::Serialize;

use crate::error::ExtractionError;
use crate::extraction::classifier::{is_duplicate, DUPLICATE_MESSAGE};
use crate::extraction::ExtractedData;

use super::events::{JobEventBroadcaster, JobStatusEvent, RegistryEvent};
use super::job::{Job, JobId, JobStatus, SourceFile};

/// What the extraction step produced for one job.
pub type ExtractionOutcome = Result<ExtractedData, ExtractionError>;

/// Result of admitting a batch of files.
#[derive(Debug, Clone, Default)]
pub struct Admission {
    /// Newly created pending jobs, in input order.
    pub jobs: Vec<Job>,
    /// Names of files left out because the name was already taken.
    pub skipped: Vec<String>,
}

impl Admission {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Terminal state recorded by [`JobRegistry::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The job completed with its extracted data.
    Completed,
    /// The extracted data matched a document already in the registry.
    Duplicate,
    /// Reading or extraction failed; carries the recorded message.
    Failed(String),
}

impl Resolution {
    pub fn status(&self) -> JobStatus {
        match self {
            Resolution::Completed => JobStatus::Completed,
            Resolution::Duplicate | Resolution::Failed(_) => JobStatus::Error,
        }
    }

    /// The error message stored on the job, if it ended in `Error`.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Resolution::Completed => None,
            Resolution::Duplicate => Some(DUPLICATE_MESSAGE),
            Resolution::Failed(message) => Some(message),
        }
    }
}

/// Outcome of a registry mutation keyed by job id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The job moved to the given non-terminal status.
    Applied(JobStatus),
    /// The job reached a terminal state.
    Resolved(Resolution),
    /// The job was not in a state that allows this transition; nothing changed.
    Ignored { current: JobStatus },
    /// No job with this id exists any more (e.g. the registry was cleared).
    Discarded,
}

/// Job counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[deny(missing_docs)]
pub struct StatusCounts {
    /// Admitted, not yet picked up.
    pub pending: usize,
    /// Being read or extracted.
    pub processing: usize,
    /// Finished with extracted data.
    pub completed: usize,
    /// Failed or rejected as duplicates.
    pub error: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.error
    }

    pub fn in_flight(&self) -> usize {
        self.pending + self.processing
    }
}

/// Ordered collection of jobs, newest first.
///
/// Every mutation holds the write lock for its whole read-modify-write, so
/// concurrent resolutions never lose each other's updates and the duplicate
/// check always sees every resolution applied before it.
pub struct JobRegistry {
    jobs: RwLock<Vec<Job>>,
    events: Option<JobEventBroadcaster>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(Vec::new()),
            events: None,
        }
    }

    /// Creates a registry that publishes changes on `events`.
    pub fn with_events(events: JobEventBroadcaster) -> Self {
        Self {
            jobs: RwLock::new(Vec::new()),
            events: Some(events),
        }
    }

    /// Subscribes to registry events, if a broadcaster is attached.
    pub fn subscribe(&self) -> Option<tokio::sync::broadcast::Receiver<RegistryEvent>> {
        self.events.as_ref().map(|e| e.subscribe())
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Job>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Job>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn emit(&self, event: RegistryEvent) {
        if let Some(events) = &self.events {
            events.send(event);
        }
    }

    /// Admits a batch of files as pending jobs.
    ///
    /// A file is skipped when its name matches a job already in the registry
    /// or an earlier file of the same batch. Admitted jobs are placed before
    /// all existing jobs, keeping their input order.
    pub fn admit(&self, files: Vec<SourceFile>) -> Admission {
        if files.is_empty() {
            return Admission::default();
        }

        let mut admission = Admission::default();
        {
            let mut jobs = self.write();
            let mut taken: HashSet<String> = jobs.iter().map(|j| j.source.name.clone()).collect();

            for file in files {
                if taken.contains(&file.name) {
                    log::debug!("Skipping '{}': name already in registry", file.name);
                    admission.skipped.push(file.name);
                    continue;
                }
                taken.insert(file.name.clone());
                admission.jobs.push(Job::new(file));
            }

            jobs.splice(0..0, admission.jobs.iter().cloned());
        }

        if !admission.skipped.is_empty() {
            log::info!(
                "{} file(s) skipped due to identical file names",
                admission.skipped.len()
            );
        }
        if !admission.jobs.is_empty() || !admission.skipped.is_empty() {
            self.emit(RegistryEvent::Admitted {
                job_ids: admission.jobs.iter().map(|j| j.id.clone()).collect(),
                skipped: admission.skipped.len(),
                timestamp: Utc::now(),
            });
        }

        admission
    }

    /// Moves a pending job to `Processing`.
    ///
    /// Any other current status leaves the job untouched.
    pub fn mark_processing(&self, id: &JobId) -> Transition {
        let event = {
            let mut jobs = self.write();
            let Some(job) = jobs.iter_mut().find(|j| &j.id == id) else {
                log::debug!("mark_processing: job {} no longer in registry", id);
                return Transition::Discarded;
            };

            if job.status != JobStatus::Pending {
                log::warn!(
                    "mark_processing: job {} is {}, not pending; ignoring",
                    id,
                    job.status
                );
                return Transition::Ignored {
                    current: job.status,
                };
            }

            job.status = JobStatus::Processing;
            JobStatusEvent::from_job(job)
        };

        self.emit(RegistryEvent::StatusChanged(event));
        Transition::Applied(JobStatus::Processing)
    }

    /// Moves a job to its terminal state.
    ///
    /// Successful extractions are checked against the registry as it is now;
    /// a match turns the job into an error with [`DUPLICATE_MESSAGE`].
    /// Failures keep their message verbatim. The returned [`Resolution`] is
    /// what was recorded, so callers never need to read the job back.
    pub fn resolve(&self, id: &JobId, outcome: ExtractionOutcome) -> Transition {
        let (resolution, event) = {
            let mut jobs = self.write();
            let Some(index) = jobs.iter().position(|j| &j.id == id) else {
                log::debug!("resolve: job {} no longer in registry, discarding result", id);
                return Transition::Discarded;
            };

            let current = jobs[index].status;
            if current.is_terminal() {
                log::warn!("resolve: job {} already {}; ignoring", id, current);
                return Transition::Ignored { current };
            }

            let resolution = match outcome {
                Ok(data) if is_duplicate(&data, &jobs) => {
                    log::info!(
                        "Job {} ('{}') rejected as duplicate",
                        id,
                        jobs[index].source.name
                    );
                    jobs[index].fail(DUPLICATE_MESSAGE.to_string());
                    Resolution::Duplicate
                }
                Ok(data) => {
                    jobs[index].complete(data);
                    Resolution::Completed
                }
                Err(e) => {
                    log::warn!("Job {} ('{}') failed: {}", id, jobs[index].source.name, e);
                    let message = e.to_string();
                    jobs[index].fail(message.clone());
                    Resolution::Failed(message)
                }
            };

            (resolution, JobStatusEvent::from_job(&jobs[index]))
        };

        self.emit(RegistryEvent::StatusChanged(event));
        Transition::Resolved(resolution)
    }

    /// Discards every job. In-flight jobs resolve to `Discarded` later.
    pub fn clear(&self) -> usize {
        let count = {
            let mut jobs = self.write();
            let count = jobs.len();
            jobs.clear();
            count
        };

        log::info!("Cleared {} job(s) from registry", count);
        self.emit(RegistryEvent::Cleared {
            count,
            timestamp: Utc::now(),
        });
        count
    }

    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.read().iter().find(|j| &j.id == id).cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Option<Job> {
        self.read().iter().find(|j| j.source.name == name).cloned()
    }

    /// Returns a copy of all jobs, newest first.
    pub fn snapshot(&self) -> Vec<Job> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for job in self.read().iter() {
            match job.status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Error => counts.error += 1,
            }
        }
        counts
    }

    /// True while any job is still pending or processing.
    pub fn is_busy(&self) -> bool {
        self.read().iter().any(|j| !j.is_finished())
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
