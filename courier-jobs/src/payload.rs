//! CSV payload decoding for bulk jobs.

use std::collections::HashMap;

use crate::JobError;

/// One parsed payload row, with header-named fields.
#[derive(Debug, Clone)]
pub struct PayloadRecord {
    /// 1-based line number in the uploaded file (header is line 1).
    pub line: u64,
    fields: HashMap<String, String>,
}

impl PayloadRecord {
    /// Field value by (case-insensitive) header name; empty cells read as
    /// absent.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(&field.to_lowercase())
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Field value or a row-failure message naming what is missing.
    ///
    /// # Errors
    /// A human-readable description for the job's error log.
    pub fn require(&self, field: &str) -> Result<&str, String> {
        self.get(field)
            .ok_or_else(|| format!("missing required field '{field}'"))
    }
}

/// Decode a headered CSV payload into records.
///
/// Cell values are trimmed. Structural problems (no header, a row with the
/// wrong field count, non-UTF-8 content) are payload errors — the job-level
/// kind — since the uploaded file as a whole is unusable.
///
/// # Errors
/// `JobError::Payload` describing the first structural problem found.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<PayloadRecord>, JobError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| JobError::Payload(format!("unreadable header: {e}")))?
        .iter()
        .map(str::to_lowercase)
        .collect();
    if headers.is_empty() {
        return Err(JobError::Payload("payload has no header row".to_string()));
    }

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let line = index as u64 + 2;
        let row = row.map_err(|e| JobError::Payload(format!("line {line}: {e}")))?;

        let fields = headers
            .iter()
            .cloned()
            .zip(row.iter().map(str::to_string))
            .collect();
        records.push(PayloadRecord { line, fields });
    }

    Ok(records)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_headered_rows() {
        let records = parse_records(b"sku,stock,name\nA-1, 7 ,Widget\nB-2,0,\n").unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].line, 2);
        assert_eq!(records[0].get("SKU"), Some("A-1"));
        assert_eq!(records[0].get("stock"), Some("7"));

        // Empty cells read as absent.
        assert_eq!(records[1].get("name"), None);
        assert!(records[1].require("name").is_err());
    }

    #[test]
    fn ragged_rows_are_a_payload_error() {
        let error = parse_records(b"sku,stock\nA-1\n").unwrap_err();
        assert!(matches!(error, JobError::Payload(_)));
        assert!(error.to_string().contains("line 2"));
    }

    #[test]
    fn empty_payload_has_no_records() {
        assert!(parse_records(b"sku,stock\n").unwrap().is_empty());
    }
}
