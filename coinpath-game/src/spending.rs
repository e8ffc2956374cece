//! Spending evaluator: verdict ladder and backward penalty.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    DETOUR_ABSOLUTE, DETOUR_DAYS_DIVISOR, DETOUR_GOAL_PCT, DETOUR_SAFE_PCT, DETOUR_TILE_DELTA,
    LOG_SPEND_PENALTY, SAFE_DAYS_DIVISOR, WRONG_TURN_ABSOLUTE, WRONG_TURN_DAYS_DIVISOR,
    WRONG_TURN_GOAL_PCT, WRONG_TURN_SAFE_PCT, WRONG_TURN_TILE_DELTA,
};
use crate::journey::JourneyError;
use crate::numbers::{ceil_f64_to_u32, rounded_pct};
use crate::state::JourneyState;

/// Spending category tag, parsed from lowercase names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SpendCategory {
    Food,
    Shopping,
    Transport,
    Subscription,
    Utilities,
    Housing,
    Health,
    Entertainment,
    Other(String),
}

impl SpendCategory {
    /// Categories whose detours also break the no-spend streak.
    #[must_use]
    pub const fn is_impulse_prone(&self) -> bool {
        matches!(self, Self::Shopping | Self::Food)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Food => "food",
            Self::Shopping => "shopping",
            Self::Transport => "transport",
            Self::Subscription => "subscription",
            Self::Utilities => "utilities",
            Self::Housing => "housing",
            Self::Health => "health",
            Self::Entertainment => "entertainment",
            Self::Other(tag) => tag,
        }
    }
}

impl FromStr for SpendCategory {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        Ok(match tag.as_str() {
            "food" => Self::Food,
            "shopping" => Self::Shopping,
            "transport" => Self::Transport,
            "subscription" => Self::Subscription,
            "utilities" => Self::Utilities,
            "housing" => Self::Housing,
            "health" => Self::Health,
            "entertainment" => Self::Entertainment,
            _ => Self::Other(tag),
        })
    }
}

impl From<String> for SpendCategory {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(category) => category,
            Err(never) => match never {},
        }
    }
}

impl From<SpendCategory> for String {
    fn from(value: SpendCategory) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SpendCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome tier of a spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpendVerdict {
    Safe,
    Detour,
    WrongTurn,
}

impl SpendVerdict {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Detour => "DETOUR",
            Self::WrongTurn => "WRONG_TURN",
        }
    }
}

impl fmt::Display for SpendVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Budget figures the ladder compares a spend against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpendContext {
    pub safe_to_spend: f64,
    pub goal_amount: f64,
}

/// Verdict plus its ledger and display consequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendEvaluation {
    pub verdict: SpendVerdict,
    /// Always `<= 0`.
    pub tile_delta: i32,
    pub days_delta: u32,
    pub reason: String,
    pub streak_broken: bool,
    /// `amount / goal_amount`, 0 when there is no positive goal.
    pub pct_of_goal: f64,
}

/// Classify a spend with the first-match ladder WRONG_TURN, DETOUR, SAFE.
///
/// # Errors
///
/// Returns `JourneyError::InvalidAmount` for zero, negative, or non-finite amounts.
pub fn evaluate(
    amount: f64,
    category: &SpendCategory,
    context: SpendContext,
) -> Result<SpendEvaluation, JourneyError> {
    let amount = JourneyError::check_amount(amount)?;
    let goal = context.goal_amount;
    let sts = context.safe_to_spend;
    let pct_of_goal = if goal > 0.0 { amount / goal } else { 0.0 };
    let pct = rounded_pct(amount, goal);

    let evaluation = if pct_of_goal > WRONG_TURN_GOAL_PCT
        || amount > sts * WRONG_TURN_SAFE_PCT
        || amount > WRONG_TURN_ABSOLUTE
    {
        SpendEvaluation {
            verdict: SpendVerdict::WrongTurn,
            tile_delta: WRONG_TURN_TILE_DELTA,
            days_delta: ceil_f64_to_u32(amount / WRONG_TURN_DAYS_DIVISOR),
            reason: format!(
                "This ${amount} purchase is {pct}% of your ${goal} goal! A dangerous path; the demons of debt grow stronger!"
            ),
            streak_broken: true,
            pct_of_goal,
        }
    } else if pct_of_goal > DETOUR_GOAL_PCT
        || amount > sts * DETOUR_SAFE_PCT
        || amount > DETOUR_ABSOLUTE
    {
        let days = ceil_f64_to_u32(amount / DETOUR_DAYS_DIVISOR);
        SpendEvaluation {
            verdict: SpendVerdict::Detour,
            tile_delta: DETOUR_TILE_DELTA,
            days_delta: days,
            reason: format!(
                "This ${amount} spend is {pct}% of your goal. A detour that delays you ~{days} days, traveler."
            ),
            streak_broken: category.is_impulse_prone(),
            pct_of_goal,
        }
    } else {
        let days = ceil_f64_to_u32(amount / SAFE_DAYS_DIVISOR);
        SpendEvaluation {
            verdict: SpendVerdict::Safe,
            tile_delta: 0,
            days_delta: days,
            reason: format!(
                "Affordable! Only {pct}% of your goal. Minor delay of ~{days} days. Path stays clear!"
            ),
            streak_broken: false,
            pct_of_goal,
        }
    };
    log::debug!(
        "spend {amount} ({category}) -> {} delta {}",
        evaluation.verdict,
        evaluation.tile_delta
    );
    Ok(evaluation)
}

/// Move the ledger back by `tile_delta` tiles. Positive deltas are treated as 0.
///
/// Returns the number of tiles actually lost.
pub fn apply_penalty(ledger: &mut JourneyState, tile_delta: i32, now: DateTime<Utc>) -> u32 {
    let lost = ledger.retreat_by(tile_delta.min(0).unsigned_abs());
    ledger.touch(now);
    if lost > 0 {
        log::debug!(
            "{LOG_SPEND_PENALTY}: {} -> {}",
            ledger.previous_tile,
            ledger.current_tile
        );
    }
    lost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounters::EncounterRegistry;
    use chrono::TimeZone;

    const CONTEXT: SpendContext = SpendContext {
        safe_to_spend: 2_000.0,
        goal_amount: 5_000.0,
    };

    #[test]
    fn absolute_clause_alone_triggers_wrong_turn() {
        let eval = evaluate(200.01, &SpendCategory::Entertainment, CONTEXT).unwrap();
        assert!(eval.pct_of_goal < WRONG_TURN_GOAL_PCT);
        assert_eq!(eval.verdict, SpendVerdict::WrongTurn);
        assert_eq!(eval.tile_delta, -3);
        assert_eq!(eval.days_delta, 14);
        assert!(eval.streak_broken);
    }

    #[test]
    fn detour_breaks_streak_only_for_impulse_categories() {
        let food = evaluate(60.0, &SpendCategory::Food, CONTEXT).unwrap();
        assert_eq!(food.verdict, SpendVerdict::Detour);
        assert_eq!(food.tile_delta, -1);
        assert_eq!(food.days_delta, 2);
        assert!(food.streak_broken);

        let transit = evaluate(60.0, &SpendCategory::Transport, CONTEXT).unwrap();
        assert_eq!(transit.verdict, SpendVerdict::Detour);
        assert!(!transit.streak_broken);
    }

    #[test]
    fn small_spend_is_safe() {
        let eval = evaluate(12.0, &SpendCategory::Shopping, CONTEXT).unwrap();
        assert_eq!(eval.verdict, SpendVerdict::Safe);
        assert_eq!(eval.tile_delta, 0);
        assert_eq!(eval.days_delta, 1);
        assert!(!eval.streak_broken);
        assert!(eval.reason.starts_with("Affordable!"));
    }

    #[test]
    fn safe_to_spend_clause_outranks_milder_signals() {
        let tight = SpendContext {
            safe_to_spend: 100.0,
            goal_amount: 5_000.0,
        };
        let eval = evaluate(20.0, &SpendCategory::Utilities, tight).unwrap();
        assert_eq!(eval.verdict, SpendVerdict::WrongTurn);
    }

    #[test]
    fn missing_goal_uses_zero_pct() {
        let context = SpendContext {
            safe_to_spend: 10_000.0,
            goal_amount: 0.0,
        };
        let eval = evaluate(30.0, &SpendCategory::Food, context).unwrap();
        assert!(eval.pct_of_goal.abs() < f64::EPSILON);
        assert_eq!(eval.verdict, SpendVerdict::Safe);
        assert!(eval.reason.contains("Only 0%"));
    }

    #[test]
    fn invalid_amounts_are_rejected() {
        for amount in [0.0, -5.0, f64::NAN] {
            assert!(matches!(
                evaluate(amount, &SpendCategory::Food, CONTEXT),
                Err(JourneyError::InvalidAmount { .. })
            ));
        }
    }

    #[test]
    fn category_tags_parse_and_serialize() {
        assert_eq!("Food".parse::<SpendCategory>().unwrap(), SpendCategory::Food);
        assert_eq!(
            "gadgets".parse::<SpendCategory>().unwrap(),
            SpendCategory::Other("gadgets".to_string())
        );
        let json = serde_json::to_string(&SpendCategory::Subscription).unwrap();
        assert_eq!(json, "\"subscription\"");
        let back: SpendCategory = serde_json::from_str("\"fixed\"").unwrap();
        assert_eq!(back.to_string(), "fixed");
    }

    #[test]
    fn penalty_clamps_at_zero_and_ignores_positive_deltas() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut ledger = JourneyState::fresh(15, EncounterRegistry::default(), now);
        ledger.current_tile = 1;
        assert_eq!(apply_penalty(&mut ledger, -3, now), 1);
        assert_eq!(ledger.current_tile, 0);
        assert_eq!(ledger.previous_tile, 1);

        ledger.current_tile = 6;
        assert_eq!(apply_penalty(&mut ledger, 4, now), 0);
        assert_eq!(ledger.current_tile, 6);
        assert_eq!(ledger.previous_tile, 6);

        assert_eq!(apply_penalty(&mut ledger, i32::MIN, now), 6);
        assert_eq!(ledger.current_tile, 0);
    }
}
