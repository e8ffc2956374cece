//! Centralized balance and policy constants for Coinpath journey logic.
//!
//! These values define the deterministic math for the core engine.
//! Keeping them together ensures that the savings, spending, and battle
//! curves can only be adjusted via code changes reviewed in version control,
//! rather than through external JSON assets.

// Logging keys -------------------------------------------------------------
pub(crate) const LOG_SAVINGS_ADVANCE: &str = "log.savings.advance";
pub(crate) const LOG_SAVINGS_BLOCKED: &str = "log.savings.blocked";
pub(crate) const LOG_SPEND_PENALTY: &str = "log.spend.penalty";
pub(crate) const LOG_BATTLE_START: &str = "log.battle.start";
pub(crate) const LOG_BATTLE_ROUND: &str = "log.battle.round";
pub(crate) const LOG_BATTLE_WON: &str = "log.battle.won";
pub(crate) const LOG_BATTLE_COLLECT: &str = "log.battle.collect";
pub(crate) const LOG_BATTLE_FLEE: &str = "log.battle.flee";
pub(crate) const LOG_REENTRY_CATCH_UP: &str = "log.reentry.catch-up";
pub(crate) const LOG_LEVEL_UP: &str = "log.level-up";
pub(crate) const LOG_LORE_UNLOCK: &str = "log.lore.unlock";
pub(crate) const LOG_NARRATION_FALLBACK: &str = "log.narration.fallback";

// Leveling -------------------------------------------------------------------
/// Cumulative experience required to reach each level, index 0 = level 1.
pub const XP_LEVEL_THRESHOLDS: [u32; 11] =
    [0, 100, 250, 500, 800, 1200, 1700, 2300, 3000, 4000, 5000];

// Savings processor -----------------------------------------------------------
pub(crate) const SAVINGS_MIN_TILE_ADVANCE: u32 = 1;
pub(crate) const SAVINGS_XP_BASE: u32 = 20;
pub(crate) const SAVINGS_XP_DIVISOR: f64 = 10.0;
pub(crate) const SAVINGS_GOLD_DIVISOR: f64 = 50.0;
pub(crate) const SAVINGS_GOLD_PER_STEP: u32 = 5;

// Spending evaluator ------------------------------------------------------------
pub(crate) const WRONG_TURN_GOAL_PCT: f64 = 0.4;
pub(crate) const WRONG_TURN_SAFE_PCT: f64 = 0.15;
pub(crate) const WRONG_TURN_ABSOLUTE: f64 = 200.0;
pub(crate) const WRONG_TURN_TILE_DELTA: i32 = -3;
pub(crate) const WRONG_TURN_DAYS_DIVISOR: f64 = 15.0;
pub(crate) const DETOUR_GOAL_PCT: f64 = 0.15;
pub(crate) const DETOUR_SAFE_PCT: f64 = 0.05;
pub(crate) const DETOUR_ABSOLUTE: f64 = 50.0;
pub(crate) const DETOUR_TILE_DELTA: i32 = -1;
pub(crate) const DETOUR_DAYS_DIVISOR: f64 = 30.0;
pub(crate) const SAFE_DAYS_DIVISOR: f64 = 50.0;

// Battle -----------------------------------------------------------------------
pub(crate) const HERO_BASE_DAMAGE: u32 = 20;
pub(crate) const HERO_DAMAGE_PER_LEVEL: u32 = 8;
pub(crate) const HERO_STREAK_BONUS_PER_DAY: u32 = 3;
pub(crate) const HERO_STREAK_BONUS_CAP_DAYS: u32 = 15;
pub(crate) const HERO_CRIT_CAP: f64 = 0.3;
pub(crate) const HERO_CRIT_PER_STREAK_DAY: f64 = 0.02;
pub(crate) const HERO_CRIT_PER_LEVEL: f64 = 0.03;
pub(crate) const HERO_CRIT_MULTIPLIER: f64 = 1.8;
pub(crate) const HERO_DAMAGE_VARIANCE: u32 = 15;
pub(crate) const DEMON_BASE_DAMAGE: u32 = 6;
pub(crate) const DEMON_HP_RATIO_WEIGHT: f64 = 10.0;
pub(crate) const DEMON_DAMAGE_VARIANCE: u32 = 6;
pub(crate) const VICTORY_XP_BASE: u32 = 50;
pub(crate) const VICTORY_XP_PER_LEVEL: u32 = 15;
pub(crate) const DEFAULT_REWARD_TILES: u32 = 1;

// Reentry reconciler -------------------------------------------------------------
pub const MILLIS_PER_DAY: i64 = 86_400_000;

// Progress report ------------------------------------------------------------------
pub(crate) const MILESTONE_TILE_INTERVAL: u32 = 5;
pub(crate) const STREAK_ATTACK_BONUS_CAP_DAYS: u32 = 10;
pub(crate) const ETA_IDLE_TILES_PER_DAY: f64 = 0.1;
pub(crate) const ETA_MIN_TILES_PER_DAY: f64 = 0.15;
pub(crate) const ETA_MAX_TILES_PER_DAY: f64 = 1.0;
pub(crate) const ETA_SAVINGS_RATE_WEIGHT: f64 = 1.2;

