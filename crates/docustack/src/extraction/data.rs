//! Structured data returned by the extraction service.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Document-level fields shown in the master table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Customer or vendor name.
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    /// Document date, as printed.
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    /// Subtotal or base total.
    #[serde(default, deserialize_with = "lenient_string")]
    pub total: String,
    /// Final amount.
    #[serde(default, deserialize_with = "lenient_string")]
    pub grand_total: String,
}

/// Fields used to recognise the same document submitted twice.
///
/// Compared as raw strings: no trimming, case folding or date parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityTuple<'a> {
    pub name: &'a str,
    pub date: &'a str,
    pub grand_total: &'a str,
}

/// Result of a successful extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    /// Name of the submitted file.
    #[serde(rename = "fileName", default)]
    pub source_file_name: String,
    /// Free-text summary of the document.
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub metadata: DocumentMetadata,
    /// Column labels for `rows`, in display order.
    #[serde(default)]
    pub headers: Vec<String>,
    /// Line items keyed by header label.
    #[serde(default)]
    pub rows: Vec<Map<String, Value>>,
}

impl ExtractedData {
    pub fn identity(&self) -> IdentityTuple<'_> {
        IdentityTuple {
            name: &self.metadata.name,
            date: &self.metadata.date,
            grand_total: &self.metadata.grand_total,
        }
    }

    /// Renders a row cell for display. Missing cells render empty.
    pub fn cell(&self, row: usize, header: &str) -> String {
        match self.rows.get(row).and_then(|r| r.get(header)) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Accepts strings as-is and keeps other scalars in their JSON text form.
///
/// The service occasionally returns amounts as numbers; `null` becomes empty.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}
