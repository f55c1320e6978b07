pub mod report;
pub mod runner;

pub use report::{skipped_message, BatchCounts, BatchReport, JobOutcome};
pub use runner::BatchProcessor;
