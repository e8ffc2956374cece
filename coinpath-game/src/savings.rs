//! Savings processor: converts a contribution into progress and rewards.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    LOG_SAVINGS_ADVANCE, LOG_SAVINGS_BLOCKED, SAVINGS_GOLD_DIVISOR, SAVINGS_GOLD_PER_STEP,
    SAVINGS_MIN_TILE_ADVANCE, SAVINGS_XP_BASE, SAVINGS_XP_DIVISOR,
};
use crate::journey::JourneyError;
use crate::numbers::{floor_f64_to_u32, round_f64_to_u32};
use crate::state::{EncounterId, JourneyAggregate};

/// Result of a single savings contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsOutcome {
    pub tiles_advanced: u32,
    pub leveled_up: bool,
    pub new_level: u32,
    /// Encounter that intercepted this contribution and is now pending.
    pub demon_triggered: Option<EncounterId>,
    pub xp_gained: u32,
    pub gold_gained: u32,
    #[serde(default)]
    pub lore_unlocked: Vec<String>,
}

/// Tiles a contribution would cover before interception, never less than one.
#[must_use]
pub fn raw_advance(amount: f64, target_amount: f64, total_tiles: u32) -> u32 {
    let scaled = if target_amount > 0.0 {
        round_f64_to_u32(amount / target_amount * f64::from(total_tiles))
    } else {
        0
    };
    scaled.max(SAVINGS_MIN_TILE_ADVANCE)
}

#[must_use]
pub fn xp_for_contribution(amount: f64) -> u32 {
    SAVINGS_XP_BASE.saturating_add(floor_f64_to_u32(amount / SAVINGS_XP_DIVISOR))
}

#[must_use]
pub fn gold_for_contribution(amount: f64) -> u32 {
    floor_f64_to_u32(amount / SAVINGS_GOLD_DIVISOR).saturating_mul(SAVINGS_GOLD_PER_STEP)
}

/// Credit a contribution to the goal and move the hero forward.
///
/// The first undefeated encounter on the traversed tiles stops the hero one
/// tile short and becomes the pending battle. An already pending battle is
/// never replaced.
///
/// # Errors
///
/// Returns `JourneyError::InvalidAmount` before any mutation when `amount` is
/// zero, negative, or not finite.
pub fn contribute(
    aggregate: &mut JourneyAggregate,
    amount: f64,
    now: DateTime<Utc>,
) -> Result<SavingsOutcome, JourneyError> {
    let amount = JourneyError::check_amount(amount)?;

    let target = aggregate.goal.target_amount;
    aggregate.goal.deposit(amount);
    let journey = &mut aggregate.journey;
    journey.savings_to_target = aggregate.goal.ratio();

    let start = journey.current_tile;
    let reach = raw_advance(amount, target, journey.total_tiles).min(journey.tiles_remaining());
    let blocker = journey
        .demons
        .first_blocking_between(start, start + reach)
        .map(|encounter| (encounter.id.clone(), encounter.tile));

    let mut demon_triggered = None;
    let advance = match blocker {
        Some((id, tile)) => {
            log::debug!("{LOG_SAVINGS_BLOCKED}: {id} on tile {tile}");
            if journey.pending_battle.is_none() {
                journey.pending_battle = Some(id.clone());
                demon_triggered = Some(id);
            }
            tile.saturating_sub(1).saturating_sub(start)
        }
        None => reach,
    };
    let tiles_advanced = journey.advance_by(advance);

    let xp_gained = xp_for_contribution(amount);
    let leveled_up = journey.grant_xp(xp_gained);
    let gold_gained = gold_for_contribution(amount);
    journey.grant_gold(gold_gained);
    journey.touch(now);
    log::debug!(
        "{LOG_SAVINGS_ADVANCE}: +{amount} moved {start} -> {} (+{xp_gained}xp, +{gold_gained}g)",
        journey.current_tile
    );
    let new_level = journey.level;

    let lore_unlocked = aggregate.unlock_lore_for_tile(now);
    Ok(SavingsOutcome {
        tiles_advanced,
        leveled_up,
        new_level,
        demon_triggered,
        xp_gained,
        gold_gained,
        lore_unlocked,
    })
}
