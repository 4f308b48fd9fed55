use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::bail;
use crate::error::{ErrorKind, ExportResult};

/// Layout used when timestamps are rendered as text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const DATE_FORMAT: &str = "%Y-%m-%d";

const ACCEPTED_FORMATS: &[&str] = &[TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S%.f"];

/// Parses a naive timestamp, accepting a space or `T` separator and bare dates.
pub fn parse_timestamp(s: &str) -> ExportResult<NaiveDateTime> {
    let trimmed = s.trim();

    for format in ACCEPTED_FORMATS {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(timestamp);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(date.and_time(NaiveTime::MIN));
    }

    bail!(
        ErrorKind::ConversionError,
        "Invalid timestamp value",
        format!("expected `YYYY-MM-DD[ HH:MM:SS[.ffffff]]` (received: {s})")
    );
}

pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}
