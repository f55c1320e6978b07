pub mod config;
pub mod error;
pub mod extraction;
pub mod pipeline;
pub mod registry;
pub mod sanitize;
pub mod secrets;
pub mod telemetry;
pub mod view;

pub use config::{load_config, load_config_or_default, Config, ExtractorConfig};
pub use error::{ConfigError, DocustackError, ExtractionError, Result};
pub use extraction::{
    is_duplicate, ExtractedData, ExtractionRequest, Extractor, GeminiExtractor, DUPLICATE_MESSAGE,
};
pub use pipeline::{BatchProcessor, BatchReport};
pub use registry::{Job, JobId, JobRegistry, JobStatus, SourceFile, Transition};
pub use secrets::{resolve_secret, SecretError};
