//! DigitalOcean geo CSV
//!
//! Rows are `cidr,country,region,city,postal` with no header line.

use super::Rows;
use crate::error::{IndexError, Result};

pub(super) fn parse(text: &str, rows: &mut Rows) -> Result<Option<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => {
                return Err(IndexError::Feed(format!("{} document: {}", rows.kind(), e)))
            }
            Err(e) => {
                rows.skip(format_args!("malformed row: {}", e));
                continue;
            }
        };
        if record.len() < 4 {
            rows.skip(format_args!("row with {} fields", record.len()));
            continue;
        }
        let region = format!("{} {}", record[2].trim(), record[3].trim());
        rows.push(&record[0], "", region.trim(), "");
    }
    Ok(None)
}
