use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::bail;
use crate::error::{ErrorKind, ExportError, ExportResult};

/// Which side of the target time a located row must fall on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Latest row logged at or before the target.
    Before,
    /// Earliest row logged at or after the target.
    After,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Before => "before",
            Direction::After => "after",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(Direction::Before),
            "after" => Ok(Direction::After),
            other => bail!(
                ErrorKind::InvalidData,
                "Unknown search direction",
                format!("expected `before` or `after`, got `{other}`")
            ),
        }
    }
}

/// Global minimum and maximum of an identifier column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdBounds {
    pub low: i64,
    pub high: i64,
}

/// One `(id, logged time)` pair returned by a ceiling probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub id: i64,
    pub logged_at: NaiveDateTime,
}

impl ProbeResult {
    pub fn new(id: i64, logged_at: NaiveDateTime) -> Self {
        Self { id, logged_at }
    }
}

/// An inclusive wall-clock window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Whole day, from midnight to the last microsecond.
    pub fn day(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN);
        let end = start
            .checked_add_signed(Duration::days(1) - Duration::microseconds(1))
            .unwrap_or(NaiveDateTime::MAX);

        Self { start, end }
    }

    /// Widens the window by `margin` on both sides, saturating at the
    /// representable time range.
    pub fn widen(&self, margin: Duration) -> Self {
        Self {
            start: self
                .start
                .checked_sub_signed(margin)
                .unwrap_or(NaiveDateTime::MIN),
            end: self
                .end
                .checked_add_signed(margin)
                .unwrap_or(NaiveDateTime::MAX),
        }
    }

    pub fn contains(&self, time: NaiveDateTime) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Start and end rows bounding a time window.
///
/// Either side is `None` when its search found no row on the requested side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocatedRange {
    pub start: Option<ProbeResult>,
    pub end: Option<ProbeResult>,
}

impl LocatedRange {
    pub fn new(start: Option<ProbeResult>, end: Option<ProbeResult>) -> Self {
        Self { start, end }
    }

    /// Both identifiers, or [`ErrorKind::RangeUnresolved`] when a side is missing.
    pub fn ids(&self) -> ExportResult<(i64, i64)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Ok((start.id, end.id)),
            (start, end) => bail!(
                ErrorKind::RangeUnresolved,
                "Located range is missing an identifier",
                format!(
                    "start: {}, end: {}",
                    side_description(start),
                    side_description(end)
                )
            ),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

fn side_description(side: Option<ProbeResult>) -> String {
    match side {
        Some(result) => format!("{} ({})", result.id, result.logged_at),
        None => "no match".to_string(),
    }
}

/// Located range of one exported day, as persisted in the range ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyRange {
    pub date: NaiveDate,
    /// The day itself, without the search margin.
    pub window: TimeWindow,
    pub range: LocatedRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_window_covers_the_whole_day() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 18).unwrap();
        let window = TimeWindow::day(date);

        assert_eq!(window.start.to_string(), "2025-01-18 00:00:00");
        assert_eq!(window.end.to_string(), "2025-01-18 23:59:59.999999");
        assert!(!window.contains(window.end + Duration::microseconds(1)));
    }

    #[test]
    fn widening_saturates_at_the_time_range() {
        let window = TimeWindow::day(NaiveDate::from_ymd_opt(2025, 1, 18).unwrap());

        let widened = window.widen(Duration::minutes(60));
        assert_eq!(widened.start.to_string(), "2025-01-17 23:00:00");
        assert_eq!(widened.end.to_string(), "2025-01-19 00:59:59.999999");

        let edge = TimeWindow::day(NaiveDate::MAX).widen(Duration::days(365_000_000));
        assert_eq!(edge.start, NaiveDateTime::MIN);
        assert_eq!(edge.end, NaiveDateTime::MAX);
    }

    #[test]
    fn unresolved_range_has_no_ids() {
        let logged_at = NaiveDate::from_ymd_opt(2025, 1, 18)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let range = LocatedRange::new(Some(ProbeResult::new(10, logged_at)), None);

        let err = range.ids().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeUnresolved);
        assert!(err.detail().unwrap().contains("no match"));
    }

    #[test]
    fn direction_parses_from_text() {
        assert_eq!("after".parse::<Direction>().unwrap(), Direction::After);
        assert!("sideways".parse::<Direction>().is_err());
    }
}
