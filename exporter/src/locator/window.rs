use chrono::{NaiveDateTime, TimeDelta};

use crate::types::{Direction, IdBounds, ProbeResult};

/// Where a search stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// The window is still open and [`SearchWindow::candidate`] is the next id to probe.
    Seeking,
    /// A probe landed on the requested side within tolerance, or hit the target exactly.
    Accepted(ProbeResult),
    /// The window closed and the best correctly-sided row seen is returned.
    Exhausted(ProbeResult),
    /// The window closed without any row on the requested side.
    NoMatch,
}

/// What a single observation did to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The candidate had no row at or above it. The window top moved below it.
    Resampled,
    /// The window shrank towards the target.
    Narrowed,
    /// The search ended; see [`SearchWindow::state`] for the outcome.
    Finished,
}

/// Parameters of one search.
#[derive(Debug, Clone, Copy)]
pub struct SearchTarget {
    pub time: NaiveDateTime,
    pub direction: Direction,
    /// Early-accept band. Zero disables early acceptance.
    pub tolerance: TimeDelta,
}

/// Mutable state of a tolerant, direction-aware binary search over an identifier column.
///
/// Identifiers only roughly follow time, so instead of a strict bisection the window
/// moves the candidate by a step that halves after every probe. The search ends when
/// a probe lands close enough on the requested side, hits the target exactly, or when
/// the window closes (`low > high`).
///
/// `low <= candidate <= high` holds while the state is [`SearchState::Seeking`].
#[derive(Debug, Clone)]
pub struct SearchWindow {
    target: SearchTarget,
    low: i64,
    high: i64,
    current: i64,
    step: i64,
    best: Option<ProbeResult>,
    best_diff: Option<TimeDelta>,
    state: SearchState,
}

impl SearchWindow {
    /// Opens a window over `bounds`.
    ///
    /// Without a seed the search starts at the midpoint with a quarter of the range as
    /// step. A seed outside the bounds is clamped into them.
    pub fn new(
        bounds: IdBounds,
        target: SearchTarget,
        seed_id: Option<i64>,
        seed_step: Option<i64>,
    ) -> Self {
        let IdBounds { low, high } = bounds;
        let current = match seed_id {
            Some(seed) => seed.clamp(low, high.max(low)),
            None => low + (high - low) / 2,
        };
        let step = seed_step.unwrap_or((high - low) / 4).max(1);

        let state = if low > high {
            SearchState::NoMatch
        } else {
            SearchState::Seeking
        };

        Self {
            target,
            low,
            high,
            current,
            step,
            best: None,
            best_diff: None,
            state,
        }
    }

    /// Next id to probe, or `None` once the search is over.
    pub fn candidate(&self) -> Option<i64> {
        match self.state {
            SearchState::Seeking => Some(self.current),
            _ => None,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn low(&self) -> i64 {
        self.low
    }

    pub fn high(&self) -> i64 {
        self.high
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    /// Best row seen so far on the requested side.
    pub fn best(&self) -> Option<ProbeResult> {
        self.best
    }

    /// Feeds the result of probing [`SearchWindow::candidate`].
    ///
    /// Observing after the search ended leaves the window untouched.
    pub fn observe(&mut self, probe: Option<ProbeResult>) -> Transition {
        if self.state != SearchState::Seeking {
            return Transition::Finished;
        }

        let Some(result) = probe else {
            return self.resample();
        };

        let delta = result.logged_at - self.target.time;

        if delta.is_zero() || self.within_tolerance(delta) {
            self.state = SearchState::Accepted(result);
            return Transition::Finished;
        }

        self.track_best(result, delta);

        if delta < TimeDelta::zero() {
            self.low = self.current + 1;
            self.current = (self.current + self.step).min(self.high);
        } else {
            self.high = self.current - 1;
            self.current = (self.current - self.step).max(self.low);
        }
        self.step = (self.step / 2).max(1);

        if self.close_if_empty() {
            Transition::Finished
        } else {
            Transition::Narrowed
        }
    }

    /// No row exists at or above the candidate, so nothing from the candidate up can match.
    fn resample(&mut self) -> Transition {
        if self.current < self.low || self.current > self.high {
            self.current = self.current.clamp(self.low, self.high);
            return Transition::Resampled;
        }

        self.high = self.current - 1;
        self.current = (self.current - self.step).max(self.low);

        if self.close_if_empty() {
            Transition::Finished
        } else {
            Transition::Resampled
        }
    }

    fn within_tolerance(&self, delta: TimeDelta) -> bool {
        if self.target.tolerance <= TimeDelta::zero() {
            return false;
        }

        let distance = match self.target.direction {
            Direction::Before => -delta,
            Direction::After => delta,
        };

        TimeDelta::zero() < distance && distance < self.target.tolerance
    }

    fn track_best(&mut self, result: ProbeResult, delta: TimeDelta) {
        let correct_side = match self.target.direction {
            Direction::Before => delta <= TimeDelta::zero(),
            Direction::After => delta >= TimeDelta::zero(),
        };
        if !correct_side {
            return;
        }

        let diff = delta.abs();
        if self.best_diff.is_none_or(|best| diff < best) {
            self.best = Some(result);
            self.best_diff = Some(diff);
        }
    }

    fn close_if_empty(&mut self) -> bool {
        if self.low <= self.high {
            return false;
        }

        self.state = match self.best {
            Some(best) => SearchState::Exhausted(best),
            None => SearchState::NoMatch,
        };

        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn at_secs(secs: i64) -> NaiveDateTime {
        base() + TimeDelta::seconds(secs)
    }

    fn target(direction: Direction, secs: i64, tolerance: i64) -> SearchTarget {
        SearchTarget {
            time: at_secs(secs),
            direction,
            tolerance: TimeDelta::seconds(tolerance),
        }
    }

    fn window(direction: Direction, secs: i64, tolerance: i64) -> SearchWindow {
        SearchWindow::new(
            IdBounds { low: 1, high: 1000 },
            target(direction, secs, tolerance),
            None,
            None,
        )
    }

    #[test]
    fn starts_at_midpoint_with_quarter_step() {
        let window = window(Direction::After, 0, 300);

        assert_eq!(window.candidate(), Some(500));
        assert_eq!(window.step(), 249);
        assert_eq!(window.state(), SearchState::Seeking);
    }

    #[test]
    fn seed_is_clamped_and_step_is_at_least_one() {
        let window = SearchWindow::new(
            IdBounds { low: 10, high: 20 },
            target(Direction::Before, 0, 300),
            Some(5_000),
            Some(0),
        );

        assert_eq!(window.candidate(), Some(20));
        assert_eq!(window.step(), 1);
    }

    #[test]
    fn empty_bounds_are_no_match() {
        let window = SearchWindow::new(
            IdBounds { low: 5, high: 4 },
            target(Direction::Before, 0, 300),
            None,
            None,
        );

        assert_eq!(window.state(), SearchState::NoMatch);
        assert_eq!(window.candidate(), None);
    }

    #[test]
    fn seeking_to_accepted_within_tolerance_after() {
        let mut window = window(Direction::After, 1000, 300);
        let probe = ProbeResult::new(500, at_secs(1100));

        assert_eq!(window.observe(Some(probe)), Transition::Finished);
        assert_eq!(window.state(), SearchState::Accepted(probe));
    }

    #[test]
    fn seeking_to_accepted_within_tolerance_before() {
        let mut window = window(Direction::Before, 1000, 300);
        let probe = ProbeResult::new(500, at_secs(800));

        assert_eq!(window.observe(Some(probe)), Transition::Finished);
        assert_eq!(window.state(), SearchState::Accepted(probe));
    }

    #[test]
    fn wrong_side_within_tolerance_keeps_seeking() {
        let mut window = window(Direction::Before, 1000, 300);
        let probe = ProbeResult::new(500, at_secs(1100));

        assert_eq!(window.observe(Some(probe)), Transition::Narrowed);
        assert_eq!(window.high(), 499);
        assert_eq!(window.candidate(), Some(251));
        assert_eq!(window.best(), None);
    }

    #[test]
    fn exact_hit_is_accepted_even_without_tolerance() {
        let mut window = window(Direction::Before, 1000, 0);
        let probe = ProbeResult::new(500, at_secs(1000));

        assert_eq!(window.observe(Some(probe)), Transition::Finished);
        assert_eq!(window.state(), SearchState::Accepted(probe));
    }

    #[test]
    fn zero_tolerance_disables_early_accept() {
        let mut window = window(Direction::After, 1000, 0);

        assert_eq!(
            window.observe(Some(ProbeResult::new(500, at_secs(1001)))),
            Transition::Narrowed
        );
        assert_eq!(window.best(), Some(ProbeResult::new(500, at_secs(1001))));
    }

    #[test]
    fn logged_before_target_moves_low_up_and_halves_step() {
        let mut window = window(Direction::After, 100_000, 300);

        window.observe(Some(ProbeResult::new(500, at_secs(0))));

        assert_eq!(window.low(), 501);
        assert_eq!(window.candidate(), Some(749));
        assert_eq!(window.step(), 124);
        assert_eq!(window.best(), None);
    }

    #[test]
    fn best_match_only_improves() {
        let mut window = window(Direction::Before, 100_000, 0);

        window.observe(Some(ProbeResult::new(500, at_secs(99_000))));
        assert_eq!(window.best().unwrap().id, 500);

        // Out-of-order commit: a later id logged earlier than the best seen.
        window.observe(Some(ProbeResult::new(749, at_secs(90_000))));
        assert_eq!(window.best().unwrap().id, 500);

        window.observe(Some(ProbeResult::new(873, at_secs(99_500))));
        assert_eq!(window.best().unwrap().id, 873);
    }

    #[test]
    fn absent_probe_lowers_the_top_of_the_window() {
        let mut window = window(Direction::Before, 100_000, 300);

        assert_eq!(window.observe(None), Transition::Resampled);
        assert_eq!(window.high(), 499);
        assert_eq!(window.candidate(), Some(251));
        assert_eq!(window.step(), 249);
    }

    #[test]
    fn closing_window_with_best_is_exhausted() {
        let mut window = SearchWindow::new(
            IdBounds { low: 1, high: 1 },
            target(Direction::Before, 1000, 0),
            None,
            None,
        );
        let probe = ProbeResult::new(1, at_secs(10));

        assert_eq!(window.observe(Some(probe)), Transition::Finished);
        assert_eq!(window.state(), SearchState::Exhausted(probe));
    }

    #[test]
    fn closing_window_without_best_is_no_match() {
        let mut window = SearchWindow::new(
            IdBounds { low: 1, high: 1 },
            target(Direction::Before, 1000, 0),
            None,
            None,
        );

        window.observe(Some(ProbeResult::new(1, at_secs(5000))));

        assert_eq!(window.state(), SearchState::NoMatch);
        assert_eq!(window.candidate(), None);
    }
}
