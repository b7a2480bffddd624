//! Click accuracy bookkeeping, functional core.
//!
//! No I/O, no threads. The capture loop feeds it one detection count per
//! iteration together with whether a click was consumed in that
//! iteration, and gets the updated accuracy back.
//!
//! A click is "accurate" when the detected-object count dropped between
//! the previous iteration and this one. The click did not necessarily
//! cause the drop; the correlation is deliberately coarse.

use std::fmt;

/// What to report before the first click has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoClickPolicy {
    /// 100%: no evidence of a miss yet.
    #[default]
    Optimistic,
    /// 0%: no evidence of a hit yet.
    Zero,
}

impl NoClickPolicy {
    pub fn percent(self) -> f64 {
        match self {
            Self::Optimistic => 100.0,
            Self::Zero => 0.0,
        }
    }
}

/// Snapshot of the running counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccuracyState {
    pub total_clicks: u64,
    pub accurate_clicks: u64,
    pub last_object_count: usize,
}

/// Outcome of a single `record` call, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    NoClick,
    Hit,
    Miss,
}

#[derive(Debug, Clone)]
pub struct AccuracyTracker {
    state: AccuracyState,
    policy: NoClickPolicy,
}

impl AccuracyTracker {
    pub fn new(policy: NoClickPolicy) -> Self {
        Self {
            state: AccuracyState::default(),
            policy,
        }
    }

    /// Apply one iteration's detection count.
    ///
    /// With a click pending, `total_clicks` always grows by one and
    /// `accurate_clicks` grows by one iff `current_count` is strictly
    /// below the previous count. The previous count starts at 0, so a
    /// click in the very first iteration can never be accurate.
    ///
    /// Returns the freshly computed accuracy percentage.
    pub fn record(&mut self, current_count: usize, click_pending: bool) -> f64 {
        self.record_with_outcome(current_count, click_pending).0
    }

    /// Same as [`record`](Self::record), also reporting what happened to
    /// the click.
    pub fn record_with_outcome(
        &mut self,
        current_count: usize,
        click_pending: bool,
    ) -> (f64, ClickOutcome) {
        let outcome = if click_pending {
            self.state.total_clicks += 1;
            if current_count < self.state.last_object_count {
                self.state.accurate_clicks += 1;
                ClickOutcome::Hit
            } else {
                ClickOutcome::Miss
            }
        } else {
            ClickOutcome::NoClick
        };

        self.state.last_object_count = current_count;
        (self.accuracy(), outcome)
    }

    /// Current accuracy in percent, or the policy default with no clicks.
    pub fn accuracy(&self) -> f64 {
        if self.state.total_clicks == 0 {
            return self.policy.percent();
        }
        (self.state.accurate_clicks as f64 / self.state.total_clicks as f64) * 100.0
    }

    pub fn state(&self) -> AccuracyState {
        self.state
    }

    pub fn policy(&self) -> NoClickPolicy {
        self.policy
    }
}

/// Formatted the way every presenter shows it: `Accuracy: 87.50%`.
pub struct AccuracyLabel(pub f64);

impl fmt::Display for AccuracyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Accuracy: {:.2}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_at(last: usize) -> AccuracyTracker {
        let mut t = AccuracyTracker::new(NoClickPolicy::Optimistic);
        t.record(last, false);
        t
    }

    #[test]
    fn count_drop_with_click_is_accurate() {
        let mut t = tracker_at(5);
        t.record(3, true);
        assert_eq!(t.state().total_clicks, 1);
        assert_eq!(t.state().accurate_clicks, 1);
        assert_eq!(t.accuracy(), 100.0);
    }

    #[test]
    fn unchanged_count_with_click_is_a_miss() {
        let mut t = tracker_at(5);
        let (acc, outcome) = t.record_with_outcome(5, true);
        assert_eq!(outcome, ClickOutcome::Miss);
        assert_eq!(t.state().total_clicks, 1);
        assert_eq!(t.state().accurate_clicks, 0);
        assert_eq!(acc, 0.0);
    }

    #[test]
    fn first_iteration_click_with_zero_objects_is_a_miss() {
        let mut t = AccuracyTracker::new(NoClickPolicy::Optimistic);
        t.record(0, true);
        assert_eq!(t.state().total_clicks, 1);
        assert_eq!(t.state().accurate_clicks, 0);
    }

    #[test]
    fn first_iteration_is_not_special_cased() {
        // Previous count starts at 0, so nothing can be "fewer" than it.
        let mut t = AccuracyTracker::new(NoClickPolicy::Optimistic);
        t.record(7, true);
        assert_eq!(t.state().accurate_clicks, 0);
        assert_eq!(t.state().last_object_count, 7);
    }

    #[test]
    fn no_clicks_reports_policy_default() {
        let t = AccuracyTracker::new(NoClickPolicy::Optimistic);
        assert_eq!(t.accuracy(), 100.0);
        let t = AccuracyTracker::new(NoClickPolicy::Zero);
        assert_eq!(t.accuracy(), 0.0);
    }

    #[test]
    fn record_without_click_only_moves_last_count() {
        let mut t = tracker_at(4);
        t.record(9, true);
        let before = t.state();
        for n in [0, 1, 20, 3] {
            t.record(n, false);
            assert_eq!(t.state().total_clicks, before.total_clicks);
            assert_eq!(t.state().accurate_clicks, before.accurate_clicks);
            assert_eq!(t.state().last_object_count, n);
        }
    }

    #[test]
    fn invariants_hold_over_a_long_mixed_sequence() {
        let mut t = AccuracyTracker::new(NoClickPolicy::Zero);
        let counts = [3usize, 2, 2, 5, 1, 0, 0, 4, 3, 3, 8, 2];
        for (i, &n) in counts.iter().cycle().take(200).enumerate() {
            let acc = t.record(n, i % 3 != 1);
            let s = t.state();
            assert!(s.accurate_clicks <= s.total_clicks);
            assert!((0.0..=100.0).contains(&acc));
        }
    }

    #[test]
    fn label_uses_two_decimals() {
        assert_eq!(AccuracyLabel(87.5).to_string(), "Accuracy: 87.50%");
        assert_eq!(AccuracyLabel(100.0).to_string(), "Accuracy: 100.00%");
    }
}
