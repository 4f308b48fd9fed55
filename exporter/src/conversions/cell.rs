//! Casts of a raw [`Cell`] into the value a declared column type expects.
//!
//! `Cell::Null` always casts to `None`. Empty strings do too, since the store
//! returns them for unset text fields that are declared numeric.

use chrono::NaiveDateTime;

use crate::bail;
use crate::conversions::bool::parse_bool;
use crate::conversions::timestamp::{format_timestamp, parse_timestamp};
use crate::error::{ErrorKind, ExportResult};
use crate::types::Cell;

fn is_blank(cell: &Cell) -> bool {
    match cell {
        Cell::Null => true,
        Cell::String(value) | Cell::Numeric(value) => value.trim().is_empty(),
        _ => false,
    }
}

/// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
const I64_RANGE: std::ops::Range<f64> = i64::MIN as f64..i64::MAX as f64;

fn integral(value: f64, cell: &Cell, target: &str) -> ExportResult<i64> {
    if !I64_RANGE.contains(&value) || value.fract() != 0.0 {
        bail!(
            ErrorKind::ConversionError,
            "Value is not an integer",
            format!("cannot cast {} {cell:?} to {target}", cell.type_name())
        );
    }

    Ok(value as i64)
}

fn parse_integer(text: &str, cell: &Cell, target: &str) -> ExportResult<i64> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return Ok(value);
    }

    match text.parse::<f64>() {
        Ok(value) => integral(value, cell, target),
        Err(_) => bail!(
            ErrorKind::ConversionError,
            "Value is not numeric",
            format!("cannot cast {} {cell:?} to {target}", cell.type_name())
        ),
    }
}

pub fn cell_to_i64(cell: &Cell) -> ExportResult<Option<i64>> {
    if is_blank(cell) {
        return Ok(None);
    }

    let value = match cell {
        Cell::Bool(value) => i64::from(*value),
        Cell::I16(value) => i64::from(*value),
        Cell::I32(value) => i64::from(*value),
        Cell::I64(value) => *value,
        Cell::F32(value) => integral(f64::from(*value), cell, "int64")?,
        Cell::F64(value) => integral(*value, cell, "int64")?,
        Cell::String(text) | Cell::Numeric(text) => parse_integer(text, cell, "int64")?,
        Cell::Null | Cell::Date(_) | Cell::Timestamp(_) => bail!(
            ErrorKind::ConversionError,
            "Value cannot be cast to an integer",
            format!("cannot cast {} {cell:?} to int64", cell.type_name())
        ),
    };

    Ok(Some(value))
}

pub fn cell_to_i32(cell: &Cell) -> ExportResult<Option<i32>> {
    let Some(value) = cell_to_i64(cell)? else {
        return Ok(None);
    };

    match i32::try_from(value) {
        Ok(value) => Ok(Some(value)),
        Err(_) => bail!(
            ErrorKind::ConversionError,
            "Integer out of range",
            format!("{value} does not fit in int32")
        ),
    }
}

pub fn cell_to_f64(cell: &Cell) -> ExportResult<Option<f64>> {
    if is_blank(cell) {
        return Ok(None);
    }

    let value = match cell {
        Cell::Bool(value) => f64::from(u8::from(*value)),
        Cell::I16(value) => f64::from(*value),
        Cell::I32(value) => f64::from(*value),
        Cell::I64(value) => *value as f64,
        Cell::F32(value) => f64::from(*value),
        Cell::F64(value) => *value,
        Cell::String(text) | Cell::Numeric(text) => match text.trim().parse::<f64>() {
            Ok(value) => value,
            Err(_) => bail!(
                ErrorKind::ConversionError,
                "Value is not numeric",
                format!("cannot cast {} {cell:?} to float64", cell.type_name())
            ),
        },
        Cell::Null | Cell::Date(_) | Cell::Timestamp(_) => bail!(
            ErrorKind::ConversionError,
            "Value cannot be cast to a float",
            format!("cannot cast {} {cell:?} to float64", cell.type_name())
        ),
    };

    Ok(Some(value))
}

pub fn cell_to_bool(cell: &Cell) -> ExportResult<Option<bool>> {
    if is_blank(cell) {
        return Ok(None);
    }

    let value = match cell {
        Cell::Bool(value) => *value,
        Cell::I16(_) | Cell::I32(_) | Cell::I64(_) => match cell_to_i64(cell)? {
            Some(0) => false,
            Some(1) => true,
            _ => bail!(
                ErrorKind::ConversionError,
                "Integer is not a boolean",
                format!("cannot cast {cell:?} to boolean")
            ),
        },
        Cell::String(text) => parse_bool(text)?,
        _ => bail!(
            ErrorKind::ConversionError,
            "Value cannot be cast to a boolean",
            format!("cannot cast {} {cell:?} to boolean", cell.type_name())
        ),
    };

    Ok(Some(value))
}

/// Renders any non-null cell as text.
pub fn cell_to_string(cell: &Cell) -> Option<String> {
    let value = match cell {
        Cell::Null => return None,
        Cell::Bool(value) => value.to_string(),
        Cell::String(value) | Cell::Numeric(value) => value.clone(),
        Cell::I16(value) => value.to_string(),
        Cell::I32(value) => value.to_string(),
        Cell::I64(value) => value.to_string(),
        Cell::F32(value) => value.to_string(),
        Cell::F64(value) => value.to_string(),
        Cell::Date(value) => value.format("%Y-%m-%d").to_string(),
        Cell::Timestamp(value) => format_timestamp(value),
    };

    Some(value)
}

pub fn cell_to_timestamp(cell: &Cell) -> ExportResult<Option<NaiveDateTime>> {
    if is_blank(cell) {
        return Ok(None);
    }

    let value = match cell {
        Cell::Timestamp(value) => *value,
        Cell::Date(value) => value.and_time(chrono::NaiveTime::MIN),
        Cell::String(text) => parse_timestamp(text)?,
        _ => bail!(
            ErrorKind::ConversionError,
            "Value cannot be cast to a timestamp",
            format!("cannot cast {} {cell:?} to timestamp", cell.type_name())
        ),
    };

    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn integers_accept_integral_text_and_floats() {
        assert_eq!(cell_to_i64(&Cell::from("42")).unwrap(), Some(42));
        assert_eq!(cell_to_i64(&Cell::Numeric("7.0".into())).unwrap(), Some(7));
        assert_eq!(cell_to_i64(&Cell::F64(3.0)).unwrap(), Some(3));
        assert_eq!(cell_to_i64(&Cell::from("")).unwrap(), None);
        assert_eq!(
            cell_to_i64(&Cell::F64(3.5)).unwrap_err().kind(),
            ErrorKind::ConversionError
        );
    }

    #[test]
    fn floats_outside_the_i64_range_are_rejected() {
        let two_pow_63 = 9_223_372_036_854_775_808.0_f64;

        assert!(cell_to_i64(&Cell::F64(two_pow_63)).is_err());
        assert!(cell_to_i64(&Cell::from("9223372036854775808.0")).is_err());
        assert!(cell_to_i64(&Cell::F64(f64::NAN)).is_err());
        assert_eq!(cell_to_i64(&Cell::F64(-two_pow_63)).unwrap(), Some(i64::MIN));
    }

    #[test]
    fn int32_rejects_overflow() {
        assert_eq!(cell_to_i32(&Cell::I16(-5)).unwrap(), Some(-5));
        assert_eq!(
            cell_to_i32(&Cell::I64(i64::from(i32::MAX) + 1))
                .unwrap_err()
                .kind(),
            ErrorKind::ConversionError
        );
    }

    #[test]
    fn booleans_accept_zero_and_one() {
        assert_eq!(cell_to_bool(&Cell::I32(1)).unwrap(), Some(true));
        assert_eq!(cell_to_bool(&Cell::from("f")).unwrap(), Some(false));
        assert!(cell_to_bool(&Cell::I32(2)).is_err());
    }

    #[test]
    fn timestamps_widen_dates_and_parse_text() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 18).unwrap();

        assert_eq!(
            cell_to_timestamp(&Cell::Date(date)).unwrap(),
            date.and_hms_opt(0, 0, 0)
        );
        assert_eq!(
            cell_to_timestamp(&Cell::from("2025-01-18 10:00:00")).unwrap(),
            date.and_hms_opt(10, 0, 0)
        );
        assert!(cell_to_timestamp(&Cell::I64(5)).is_err());
    }

    #[test]
    fn strings_render_every_variant() {
        assert_eq!(cell_to_string(&Cell::Null), None);
        assert_eq!(cell_to_string(&Cell::I64(5)).as_deref(), Some("5"));
        assert_eq!(cell_to_string(&Cell::Bool(true)).as_deref(), Some("true"));
    }
}
