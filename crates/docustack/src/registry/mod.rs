//! Job registry: the authoritative, ordered list of upload jobs.

pub mod events;
pub mod job;
pub mod store;

pub use events::{JobEventBroadcaster, JobStatusEvent, RegistryEvent};
pub use job::{Job, JobId, JobStatus, SourceFile, PDF_MEDIA_TYPE};
pub use store::{
    Admission, ExtractionOutcome, JobRegistry, Resolution, StatusCounts, Transition,
};
