//! Extraction collaborator, extracted data model and duplicate detection.

pub mod classifier;
pub mod client;
pub mod data;
pub mod gemini;

pub use classifier::{is_duplicate, DUPLICATE_MESSAGE};
pub use client::{ExtractionRequest, Extractor};
pub use data::{DocumentMetadata, ExtractedData, IdentityTuple};
pub use gemini::GeminiExtractor;
