use std::sync::Arc;

use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, info_span, Instrument};

use crate::extraction::{ExtractionRequest, Extractor};
use crate::registry::{ExtractionOutcome, Job, JobRegistry, SourceFile, Transition};

use super::report::{BatchReport, JobOutcome};

/// Drives admitted jobs through read, extract and resolve.
#[derive(Clone)]
pub struct BatchProcessor {
    registry: Arc<JobRegistry>,
    extractor: Arc<dyn Extractor>,
    max_concurrency: Option<usize>,
}

impl BatchProcessor {
    /// Creates a processor that dispatches every job of a batch at once.
    pub fn new(registry: Arc<JobRegistry>, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            registry,
            extractor,
            max_concurrency: None,
        }
    }

    /// Limits how many jobs of a batch are extracted at the same time.
    /// `None` or `Some(0)` means no limit.
    pub fn with_max_concurrency(mut self, limit: Option<usize>) -> Self {
        self.max_concurrency = limit.filter(|n| *n > 0);
        self
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Admits `files` and processes every admitted job, returning once all
    /// of them have reached a terminal state or were discarded.
    ///
    /// Failures stay with their job; this never fails as a whole.
    pub async fn submit(&self, files: Vec<SourceFile>) -> BatchReport {
        let admission = self.registry.admit(files);
        let mut report = BatchReport {
            admitted: admission.jobs.iter().map(|j| j.id.clone()).collect(),
            skipped: admission.skipped,
            outcomes: Vec::with_capacity(admission.jobs.len()),
        };

        if admission.jobs.is_empty() {
            return report;
        }

        info!(
            admitted = admission.jobs.len(),
            skipped = report.skipped.len(),
            "Processing batch"
        );

        report.outcomes = match self.max_concurrency {
            None => join_all(admission.jobs.iter().map(|job| self.process(job))).await,
            Some(limit) => {
                let mut outcomes: Vec<JobOutcome> = stream::iter(admission.jobs.iter().map(|job| self.process(job)).collect::<Vec<_>>())
                    .buffer_unordered(limit)
                    .collect()
                    .await;
                // Report in admission order regardless of completion order
                outcomes.sort_by_key(|o| {
                    report
                        .admitted
                        .iter()
                        .position(|id| id == &o.job_id)
                        .unwrap_or(usize::MAX)
                });
                outcomes
            }
        };

        let counts = report.counts();
        info!(
            completed = counts.completed,
            rejected = counts.rejected,
            failed = counts.failed,
            discarded = counts.discarded,
            "Batch finished"
        );

        report
    }

    /// Runs one job: mark processing, read and encode, extract, resolve.
    pub async fn process(&self, job: &Job) -> JobOutcome {
        let span = info_span!("extract_job", job_id = %job.id, file_name = %job.source.name);

        async {
            let transition = match self.registry.mark_processing(&job.id) {
                Transition::Applied(_) => {
                    let outcome = self.extract(&job.source).await;
                    self.registry.resolve(&job.id, outcome)
                }
                other => {
                    debug!(?other, "Job not pending, skipping extraction");
                    other
                }
            };

            debug!(?transition, "Job finished");

            JobOutcome {
                job_id: job.id.clone(),
                file_name: job.source.name.clone(),
                transition,
            }
        }
        .instrument(span)
        .await
    }

    async fn extract(&self, source: &SourceFile) -> ExtractionOutcome {
        let encoded_content = source.read_base64().await?;
        self.extractor
            .extract(ExtractionRequest {
                encoded_content,
                media_type: source.media_type.clone(),
                file_name: source.name.clone(),
            })
            .await
    }
}
