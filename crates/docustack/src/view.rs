//! Read-only projections of the registry for display.

use serde::Serialize;

use crate::registry::{Job, JobId, JobStatus, StatusCounts};

/// One line of the master table: a completed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[deny(missing_docs)]
pub struct MasterRow {
    /// Job that produced the document.
    pub job_id: JobId,
    /// Name of the uploaded file.
    pub file_name: String,
    /// Customer or vendor name read from the document.
    pub name: String,
    /// Document date as printed.
    pub date: String,
    /// Subtotal or base total as printed.
    pub total: String,
    /// Final amount as printed.
    pub grand_total: String,
    /// Number of line items extracted.
    pub row_count: usize,
}

/// A job still waiting, running, or failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[deny(missing_docs)]
pub struct QueueEntry {
    /// Job awaiting verification.
    pub job_id: JobId,
    /// Name of the uploaded file.
    pub file_name: String,
    /// Pending, processing or error.
    pub status: JobStatus,
    /// Failure or duplicate message, present only for errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full view of one completed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetail {
    pub file_name: String,
    pub summary: String,
    pub name: String,
    pub date: String,
    pub total: String,
    pub grand_total: String,
    pub headers: Vec<String>,
    /// Cells rendered as text, aligned with `headers`.
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub counts: StatusCounts,
    /// True while any job is pending or processing.
    pub processing: bool,
}

impl From<StatusCounts> for Summary {
    fn from(counts: StatusCounts) -> Self {
        Self {
            counts,
            processing: counts.in_flight() > 0,
        }
    }
}

/// Completed jobs in registry order.
pub fn master_rows(jobs: &[Job]) -> Vec<MasterRow> {
    jobs.iter()
        .filter(|j| j.status == JobStatus::Completed)
        .filter_map(|j| {
            let data = j.data.as_ref()?;
            Some(MasterRow {
                job_id: j.id.clone(),
                file_name: j.source.name.clone(),
                name: data.metadata.name.clone(),
                date: data.metadata.date.clone(),
                total: data.metadata.total.clone(),
                grand_total: data.metadata.grand_total.clone(),
                row_count: data.rows.len(),
            })
        })
        .collect()
}

/// Every job that has not completed, in registry order.
pub fn queue(jobs: &[Job]) -> Vec<QueueEntry> {
    jobs.iter()
        .filter(|j| j.status != JobStatus::Completed)
        .map(|j| QueueEntry {
            job_id: j.id.clone(),
            file_name: j.source.name.clone(),
            status: j.status,
            error: j.error.clone(),
        })
        .collect()
}

/// Detail view for a completed job; `None` while it has no data.
pub fn detail(job: &Job) -> Option<DocumentDetail> {
    let data = job.data.as_ref()?;
    let rows = (0..data.rows.len())
        .map(|i| data.headers.iter().map(|h| data.cell(i, h)).collect())
        .collect();

    Some(DocumentDetail {
        file_name: job.source.name.clone(),
        summary: data.summary.clone(),
        name: data.metadata.name.clone(),
        date: data.metadata.date.clone(),
        total: data.metadata.total.clone(),
        grand_total: data.metadata.grand_total.clone(),
        headers: data.headers.clone(),
        rows,
    })
}
