use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ExtractionError;
use crate::extraction::ExtractedData;
use crate::sanitize;

/// Media type used when the file extension tells us nothing.
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Where the bytes of a submitted file live.
#[derive(Debug, Clone)]
enum FileContent {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

/// A file handed in by the user. Never mutated after construction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub name: String,
    pub media_type: String,
    #[serde(skip)]
    content: FileContent,
}

impl SourceFile {
    /// References a file on disk; the media type is guessed from the extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let media_type =
            detect_media_type(&path).unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string());

        Self {
            name,
            media_type,
            content: FileContent::Path(path),
        }
    }

    /// Wraps bytes already held in memory.
    pub fn from_bytes(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            content: FileContent::Memory(bytes.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.content {
            FileContent::Path(path) => Some(path),
            FileContent::Memory(_) => None,
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.media_type == PDF_MEDIA_TYPE
    }

    /// Reads the file and returns its standard base64 encoding.
    pub async fn read_base64(&self) -> Result<String, ExtractionError> {
        match &self.content {
            FileContent::Path(path) => {
                log::debug!("Reading {}", sanitize::redact_path(path));
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|source| ExtractionError::ReadFile {
                        name: self.name.clone(),
                        source,
                    })?;
                Ok(STANDARD.encode(bytes))
            }
            FileContent::Memory(bytes) => Ok(STANDARD.encode(bytes)),
        }
    }
}

/// Detects the media type from a file path using the mime_guess crate.
/// Returns `None` for unknown extensions.
pub fn detect_media_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path).first().map(|m| m.to_string())
}

/// Opaque job identifier, generated at admission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle of a job. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One submitted file's extraction lifecycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub source: SourceFile,
    pub status: JobStatus,
    /// Set only when `status` is `Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set only when `status` is `Completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ExtractedData>,
    pub admitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates a pending job for `source`.
    pub fn new(source: SourceFile) -> Self {
        Self {
            id: JobId::generate(),
            source,
            status: JobStatus::Pending,
            error: None,
            data: None,
            admitted_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.source.name
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    pub(crate) fn complete(&mut self, data: ExtractedData) {
        self.status = JobStatus::Completed;
        self.error = None;
        self.data = Some(data);
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.status = JobStatus::Error;
        self.error = Some(message);
        self.data = None;
        self.finished_at = Some(Utc::now());
    }
}
