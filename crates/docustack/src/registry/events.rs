//! Registry event broadcasting for real-time job status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use super::job::{Job, JobId, JobStatus};

/// Change notification emitted by the registry.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A batch was admitted.
    Admitted {
        job_ids: Vec<JobId>,
        skipped: usize,
        timestamp: DateTime<Utc>,
    },
    /// A job moved to a new status.
    StatusChanged(JobStatusEvent),
    /// Every job was discarded.
    Cleared {
        count: usize,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusEvent {
    pub job_id: JobId,
    pub file_name: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl JobStatusEvent {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            file_name: job.source.name.clone(),
            status: job.status,
            error: job.error.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Broadcasts registry events to any number of subscribers.
#[derive(Clone)]
pub struct JobEventBroadcaster {
    sender: Arc<broadcast::Sender<RegistryEvent>>,
}

impl JobEventBroadcaster {
    /// Creates a broadcaster with the given channel capacity (at least 1).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: RegistryEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.sender.subscribe()
    }
}

impl Default for JobEventBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
