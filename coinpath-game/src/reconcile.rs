//! Reentry reconciliation: catch-up progress for whole days away.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{LOG_REENTRY_CATCH_UP, MILLIS_PER_DAY};
use crate::state::JourneyState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub days_passed: u32,
    pub tiles_gained: u32,
}

/// Whole elapsed days between `since` and `now`, using fixed 24h days.
#[must_use]
pub fn whole_days_between(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - since).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}

/// Grant capped catch-up tiles and streak credit for time away.
///
/// A second call with the same `now` is a no-op.
pub fn reconcile(
    ledger: &mut JourneyState,
    now: DateTime<Utc>,
    catch_up_cap: u32,
) -> ReconcileOutcome {
    let days = whole_days_between(ledger.last_visit, now);
    if days <= 0 {
        return ReconcileOutcome::default();
    }
    let days_passed = u32::try_from(days).unwrap_or(u32::MAX);
    let gain = days_passed.min(catch_up_cap).min(ledger.tiles_remaining());
    let tiles_gained = ledger.advance_by(gain);
    ledger.day_streak = ledger.day_streak.saturating_add(days_passed);
    ledger.touch(now);
    log::debug!(
        "{LOG_REENTRY_CATCH_UP}: {days_passed} days away, +{tiles_gained} tiles, streak {}",
        ledger.day_streak
    );
    ReconcileOutcome {
        days_passed,
        tiles_gained,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounters::EncounterRegistry;
    use chrono::{Duration, TimeZone};

    fn ledger(at: DateTime<Utc>) -> JourneyState {
        let mut ledger = JourneyState::fresh(15, EncounterRegistry::default(), at);
        ledger.current_tile = 4;
        ledger.day_streak = 2;
        ledger
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn partial_day_is_a_no_op() {
        let mut ledger = ledger(start());
        let before = ledger.clone();
        let outcome = reconcile(&mut ledger, start() + Duration::hours(23), 3);
        assert_eq!(outcome, ReconcileOutcome::default());
        assert_eq!(ledger, before);
    }

    #[test]
    fn long_absence_is_capped() {
        let mut ledger = ledger(start());
        let now = start() + Duration::days(10) + Duration::hours(5);
        let outcome = reconcile(&mut ledger, now, 3);
        assert_eq!(outcome.days_passed, 10);
        assert_eq!(outcome.tiles_gained, 3);
        assert_eq!(ledger.current_tile, 7);
        assert_eq!(ledger.previous_tile, 4);
        assert_eq!(ledger.day_streak, 12);
        assert_eq!(ledger.last_visit, now);
    }

    #[test]
    fn second_call_with_same_instant_is_idempotent() {
        let mut ledger = ledger(start());
        let now = start() + Duration::days(2);
        assert_eq!(reconcile(&mut ledger, now, 3).tiles_gained, 2);
        let settled = ledger.clone();
        assert_eq!(reconcile(&mut ledger, now, 3), ReconcileOutcome::default());
        assert_eq!(ledger, settled);
    }

    #[test]
    fn gain_never_passes_final_tile() {
        let mut ledger = ledger(start());
        ledger.current_tile = 14;
        let outcome = reconcile(&mut ledger, start() + Duration::days(5), 3);
        assert_eq!(outcome.tiles_gained, 1);
        assert_eq!(ledger.current_tile, 15);
        assert_eq!(ledger.day_streak, 7);
    }

    #[test]
    fn clock_going_backwards_changes_nothing() {
        let mut ledger = ledger(start());
        let outcome = reconcile(&mut ledger, start() - Duration::days(3), 3);
        assert_eq!(outcome.days_passed, 0);
        assert_eq!(ledger.last_visit, start());
        assert_eq!(whole_days_between(start(), start() - Duration::hours(1)), -1);
    }
}
