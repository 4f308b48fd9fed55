use crate::bail;
use crate::error::{ErrorKind, ExportResult};

/// Parses the textual boolean forms the store and archives produce.
pub fn parse_bool(s: &str) -> ExportResult<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "1" => Ok(true),
        "f" | "false" | "0" => Ok(false),
        _ => bail!(
            ErrorKind::ConversionError,
            "Invalid boolean value",
            format!("Boolean value must be one of t, f, true, false, 1, 0 (received: {s})")
        ),
    }
}
