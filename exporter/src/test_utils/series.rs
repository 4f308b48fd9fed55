use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Midnight of 2025-01-01, the start of every synthetic series.
pub fn series_base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Ids `low..=high`, each logged `interval` after the previous one.
///
/// Id `n` is logged at `series_base() + n * interval`.
pub fn contiguous_series(low: i64, high: i64, interval: TimeDelta) -> Vec<(i64, NaiveDateTime)> {
    (low..=high)
        .map(|id| (id, series_base() + interval * id as i32))
        .collect()
}

/// Ids starting at `low` with random gaps of up to `max_gap` missing ids.
///
/// Times keep following `series_base() + id * interval`, so gaps in the ids are
/// gaps in time too. The same `seed` always yields the same series.
pub fn gapped_series(
    low: i64,
    count: usize,
    max_gap: i64,
    interval: TimeDelta,
    seed: u64,
) -> Vec<(i64, NaiveDateTime)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut series = Vec::with_capacity(count);
    let mut id = low;

    for _ in 0..count {
        series.push((id, series_base() + interval * id as i32));
        id += 1 + rng.gen_range(0..=max_gap.max(0));
    }

    series
}
