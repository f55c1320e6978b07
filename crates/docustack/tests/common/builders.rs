#![allow(dead_code)]

use docustack::extraction::DocumentMetadata;
use docustack::ExtractedData;
use serde_json::json;

/// Extracted invoice data with the given identity and one line item.
pub fn invoice(name: &str, date: &str, grand_total: &str) -> ExtractedData {
    ExtractedData {
        source_file_name: String::new(),
        summary: format!("Invoice from {}", name),
        metadata: DocumentMetadata {
            name: name.to_string(),
            date: date.to_string(),
            total: grand_total.to_string(),
            grand_total: grand_total.to_string(),
        },
        headers: vec!["Description".to_string(), "Amount".to_string()],
        rows: vec![json!({"Description": "Services", "Amount": grand_total})
            .as_object()
            .cloned()
            .unwrap_or_default()],
    }
}

/// Same as [`invoice`] but with a different set of line items.
pub fn invoice_with_rows(name: &str, date: &str, grand_total: &str, rows: usize) -> ExtractedData {
    let mut data = invoice(name, date, grand_total);
    data.rows = (0..rows)
        .map(|i| {
            json!({"Description": format!("Line {}", i), "Amount": i})
                .as_object()
                .cloned()
                .unwrap_or_default()
        })
        .collect();
    data
}
