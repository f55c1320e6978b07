use async_trait::async_trait;

use crate::error::ExtractionError;

use super::data::ExtractedData;

/// One document handed to the extraction service.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Standard base64 encoding of the file bytes.
    pub encoded_content: String,
    pub media_type: String,
    pub file_name: String,
}

/// Turns a document into structured data.
///
/// Implementations own their transport concerns (timeouts, auth); callers
/// only see the extracted data or a failure with a readable message.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractedData, ExtractionError>;
}
