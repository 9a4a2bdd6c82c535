use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::workflows::scoring::domain::LeadAttributes;

/// One row of a lead export, ready for scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadRecord {
    pub lead_id: String,
    pub captured_at: Option<NaiveDateTime>,
    pub attributes: LeadAttributes,
}

#[derive(Debug, thiserror::Error)]
pub enum LeadImportError {
    #[error("failed to read lead export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid lead CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// Importer for CRM lead exports. Cell parsing is lenient: blank or
/// malformed numeric cells become absent attributes so a single bad row
/// never aborts the batch, matching the fail-closed scoring semantics.
pub struct LeadCsvImporter;

impl LeadCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<LeadRecord>, LeadImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<LeadRecord>, LeadImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let lead_id_col = column(&headers, "lead id");
        let source_col = column(&headers, "source");
        let response_col = column(&headers, "response time minutes");
        let message_col = column(&headers, "message");
        let captured_col = column(&headers, "captured at");

        let mut records = Vec::new();
        for (row_index, row) in csv_reader.records().enumerate() {
            let row = row?;

            let lead_id = cell(&row, lead_id_col)
                .map(str::to_string)
                .unwrap_or_else(|| format!("lead-{:04}", row_index + 1));

            let message = cell(&row, message_col).map(str::to_string);
            let attributes = LeadAttributes {
                response_time_minutes: cell(&row, response_col)
                    .and_then(|value| value.parse::<f64>().ok()),
                message_length: message.as_ref().map(|text| text.chars().count() as u64),
                source: cell(&row, source_col).map(str::to_string),
                message,
            };

            records.push(LeadRecord {
                lead_id,
                captured_at: cell(&row, captured_col).and_then(parse_datetime),
                attributes,
            });
        }

        Ok(records)
    }
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
}

fn cell<'a>(row: &'a csv::StringRecord, index: Option<usize>) -> Option<&'a str> {
    index
        .and_then(|index| row.get(index))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Some(datetime.naive_utc());
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(datetime);
    }
    chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "Lead ID,Source,Response Time Minutes,Message,Captured At\n";

    #[test]
    fn imports_rows_with_full_attributes() {
        let csv = format!(
            "{HEADER}L-1,referral,5,Need pricing ASAP,2026-03-01T09:30:00Z\n"
        );
        let records = LeadCsvImporter::from_reader(Cursor::new(csv)).expect("import");

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.lead_id, "L-1");
        assert_eq!(record.attributes.response_time_minutes, Some(5.0));
        assert_eq!(record.attributes.source.as_deref(), Some("referral"));
        assert_eq!(record.attributes.message_length, Some(17));
        assert!(record.captured_at.is_some());
    }

    #[test]
    fn blank_and_malformed_cells_become_absent_attributes() {
        let csv = format!("{HEADER}L-2,,not-a-number,,\n");
        let records = LeadCsvImporter::from_reader(Cursor::new(csv)).expect("import");

        let attributes = &records[0].attributes;
        assert_eq!(attributes.response_time_minutes, None);
        assert_eq!(attributes.source, None);
        assert_eq!(attributes.message, None);
        assert_eq!(attributes.message_length, None);
    }

    #[test]
    fn missing_lead_id_is_synthesized_per_row() {
        let csv = "Source,Message\nwebsite,Hello\nads,Hi there\n";
        let records = LeadCsvImporter::from_reader(Cursor::new(csv)).expect("import");

        assert_eq!(records[0].lead_id, "lead-0001");
        assert_eq!(records[1].lead_id, "lead-0002");
    }

    #[test]
    fn datetime_parsing_supports_rfc3339_and_plain_dates() {
        assert!(parse_datetime("2026-03-01T09:30:00Z").is_some());
        assert!(parse_datetime("2026-03-01 09:30:00").is_some());
        assert!(parse_datetime("2026-03-01").is_some());
        assert!(parse_datetime("soon").is_none());
    }

    #[test]
    fn from_path_propagates_io_errors() {
        let error = LeadCsvImporter::from_path("./does-not-exist.csv").expect_err("io error");
        assert!(matches!(error, LeadImportError::Io(_)));
    }
}
