//! Derived progress report: arrival estimate, savings pace, streak tier.
use chrono::{DateTime, Days, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    ETA_IDLE_TILES_PER_DAY, ETA_MAX_TILES_PER_DAY, ETA_MIN_TILES_PER_DAY,
    ETA_SAVINGS_RATE_WEIGHT, MILESTONE_TILE_INTERVAL, MILLIS_PER_DAY,
    STREAK_ATTACK_BONUS_CAP_DAYS,
};
use crate::numbers::{ceil_f64_to_u32, i64_to_f64, rounded_pct};
use crate::state::JourneyAggregate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakTier {
    Building,
    Momentum,
    Strong,
    Amazing,
    Legendary,
}

impl StreakTier {
    #[must_use]
    pub const fn for_streak(day_streak: u32) -> Self {
        match day_streak {
            30.. => Self::Legendary,
            14..=29 => Self::Amazing,
            7..=13 => Self::Strong,
            3..=6 => Self::Momentum,
            _ => Self::Building,
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Legendary => "LEGENDARY streak! Your hero radiates golden power!",
            Self::Amazing => "Amazing streak! Demons cower before you!",
            Self::Strong => "Strong streak! Your attacks grow more powerful!",
            Self::Momentum => "Good momentum! Keep it up, traveler!",
            Self::Building => "Build your streak by avoiding unnecessary spending!",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub eta_days: u32,
    pub arrival: chrono::NaiveDate,
    pub on_track: bool,
    /// Whole days until the goal deadline, `None` without a future deadline.
    pub deadline_days_left: Option<u32>,
    pub saved_pct: u32,
    pub daily_saving_needed: f64,
    pub remaining_to_save: f64,
    pub day_streak: u32,
    pub streak_tier: StreakTier,
    pub streak_message: String,
    pub attack_bonus: u32,
    pub next_milestone_tile: u32,
    pub tiles_to_milestone: u32,
}

/// Estimated travel speed from savings pace; idle heroes crawl.
#[must_use]
pub fn tiles_per_day(day_streak: u32, savings_to_target: f64) -> f64 {
    if day_streak == 0 {
        return ETA_IDLE_TILES_PER_DAY;
    }
    (savings_to_target * ETA_SAVINGS_RATE_WEIGHT).clamp(ETA_MIN_TILES_PER_DAY, ETA_MAX_TILES_PER_DAY)
}

/// Next milestone strictly ahead of `tile`, capped at the final tile.
#[must_use]
pub fn next_milestone(tile: u32, total_tiles: u32) -> u32 {
    let next = (tile / MILESTONE_TILE_INTERVAL + 1).saturating_mul(MILESTONE_TILE_INTERVAL);
    next.min(total_tiles)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Build the report for `now`. Never mutates the aggregate.
#[must_use]
pub fn progress_report(aggregate: &JourneyAggregate, now: DateTime<Utc>) -> ProgressReport {
    let journey = &aggregate.journey;
    let goal = &aggregate.goal;

    let tiles_left = journey.tiles_remaining();
    let speed = tiles_per_day(journey.day_streak, journey.savings_to_target);
    let eta_days = ceil_f64_to_u32(f64::from(tiles_left) / speed);
    let today = now.date_naive();
    let arrival = today
        .checked_add_days(Days::new(u64::from(eta_days)))
        .unwrap_or(today);

    let deadline_days = goal.deadline.map(|deadline| {
        let due = deadline.and_time(NaiveTime::MIN).and_utc();
        let millis = (due - now).num_milliseconds();
        (i64_to_f64(millis) / i64_to_f64(MILLIS_PER_DAY)).ceil()
    });
    let on_track = deadline_days.is_none_or(|days| f64::from(eta_days) <= days);
    let deadline_days_left = deadline_days
        .filter(|days| *days > 0.0)
        .map(ceil_f64_to_u32);

    let remaining_to_save = goal.remaining();
    let daily_saving_needed = match deadline_days_left {
        Some(days) => remaining_to_save / f64::from(days),
        None => remaining_to_save,
    };

    let streak_tier = StreakTier::for_streak(journey.day_streak);
    let next_milestone_tile = next_milestone(journey.current_tile, journey.total_tiles);
    ProgressReport {
        eta_days,
        arrival,
        on_track,
        deadline_days_left,
        saved_pct: rounded_pct(goal.current_amount, goal.target_amount),
        daily_saving_needed: round_cents(daily_saving_needed),
        remaining_to_save: round_cents(remaining_to_save),
        day_streak: journey.day_streak,
        streak_tier,
        streak_message: streak_tier.message().to_string(),
        attack_bonus: journey.day_streak.min(STREAK_ATTACK_BONUS_CAP_DAYS) * 3,
        next_milestone_tile,
        tiles_to_milestone: next_milestone_tile.saturating_sub(journey.current_tile),
    }
}
