//! Duplicate detection over extracted documents.

use crate::registry::Job;

use super::data::ExtractedData;

/// Error message recorded on a job whose document is already in the registry.
pub const DUPLICATE_MESSAGE: &str =
    "Duplicate document detected: Data signature already exists in registry.";

/// Returns true if any job already carries data with the candidate's identity.
///
/// Jobs without extracted data never match, whatever their status.
pub fn is_duplicate(candidate: &ExtractedData, existing: &[Job]) -> bool {
    let identity = candidate.identity();
    existing
        .iter()
        .filter_map(|job| job.data.as_ref())
        .any(|data| data.identity() == identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::DocumentMetadata;
    use crate::registry::{JobStatus, SourceFile};

    fn data(name: &str, date: &str, grand_total: &str) -> ExtractedData {
        ExtractedData {
            metadata: DocumentMetadata {
                name: name.to_string(),
                date: date.to_string(),
                total: String::new(),
                grand_total: grand_total.to_string(),
            },
            ..Default::default()
        }
    }

    fn completed(file: &str, extracted: ExtractedData) -> Job {
        let mut job = Job::new(SourceFile::from_path(file));
        job.complete(extracted);
        job
    }

    #[test]
    fn test_empty_registry_has_no_duplicates() {
        assert!(!is_duplicate(&data("Acme", "2024-01-01", "1"), &[]));
    }

    #[test]
    fn test_exact_identity_matches() {
        let jobs = vec![completed(
            "a.pdf",
            data("Acme Corp", "2024-01-01", "100.00"),
        )];
        let mut candidate = data("Acme Corp", "2024-01-01", "100.00");
        candidate.source_file_name = "other.pdf".to_string();
        candidate.metadata.total = "90.00".to_string();

        assert!(is_duplicate(&candidate, &jobs));
    }

    #[test]
    fn test_any_field_difference_is_distinct() {
        let jobs = vec![completed(
            "a.pdf",
            data("Acme Corp", "2024-01-01", "100.00"),
        )];

        assert!(!is_duplicate(&data("Acme Corp", "2024-01-02", "100.00"), &jobs));
        assert!(!is_duplicate(&data("Acme Corp", "2024-01-01", "100.01"), &jobs));
        assert!(!is_duplicate(&data("Acme Inc", "2024-01-01", "100.00"), &jobs));
    }

    #[test]
    fn test_no_case_or_whitespace_folding() {
        let jobs = vec![completed(
            "a.pdf",
            data("Acme Corp", "2024-01-01", "100.00"),
        )];

        assert!(!is_duplicate(&data("ACME CORP", "2024-01-01", "100.00"), &jobs));
        assert!(!is_duplicate(&data("Acme Corp ", "2024-01-01", "100.00"), &jobs));
        assert!(!is_duplicate(&data("Acme Corp", "01/01/2024", "100.00"), &jobs));
    }

    #[test]
    fn test_jobs_without_data_never_match() {
        let pending = Job::new(SourceFile::from_path("p.pdf"));
        let mut failed = Job::new(SourceFile::from_path("f.pdf"));
        failed.fail("boom".to_string());
        assert_eq!(failed.status, JobStatus::Error);

        let candidate = data("", "", "");
        assert!(!is_duplicate(&candidate, &[pending, failed]));
    }
}
