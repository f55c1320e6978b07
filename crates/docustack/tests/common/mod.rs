//! Shared test utilities for docustack integration tests.
//!
//! - `TestHarness` for temp upload directories with PDF files on disk
//! - `ScriptedExtractor` returning canned results per file name
//! - builders for extracted data

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{ScriptedExtractor, TestHarness};
