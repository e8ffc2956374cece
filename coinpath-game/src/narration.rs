//! Optional flavor-text provider and the deterministic fallback templates.
//!
//! Numeric outcomes are always settled before a narrator is consulted; a
//! narrator can only replace display strings.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::LOG_NARRATION_FALLBACK;
use crate::spending::{SpendCategory, SpendVerdict};

/// Failure modes of a narration provider. Never surfaced to players.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NarrationError {
    #[error("narration provider is not configured")]
    Unavailable,
    #[error("narration provider timed out after {millis}ms")]
    Timeout { millis: u64 },
    #[error("narration provider failed: {0}")]
    Provider(String),
    #[error("narration provider returned no text")]
    EmptyResponse,
}

/// Settled battle numbers handed to a narrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleFacts {
    pub demon_name: String,
    pub hero_damage: u32,
    pub demon_damage: u32,
    pub is_crit: bool,
    pub defeated: bool,
    pub day_streak: u32,
    pub hero_level: u32,
}

/// Settled spend verdict handed to a narrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendFacts {
    pub amount: f64,
    pub category: SpendCategory,
    pub verdict: SpendVerdict,
    pub tile_delta: i32,
    pub days_delta: u32,
    pub pct_of_goal: f64,
    pub safe_to_spend: f64,
    pub goal_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NarrationFacts {
    Battle(BattleFacts),
    Spend(SpendFacts),
}

/// Injected capability producing flavor text from settled facts.
pub trait Narrator {
    /// Produce a short line of flavor text.
    ///
    /// # Errors
    ///
    /// Returns `NarrationError` when no text can be produced; callers fall back
    /// to the local templates.
    fn narrate(&self, facts: &NarrationFacts) -> Result<String, NarrationError>;
}

/// Narrator that never answers, leaving every string on its fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNarrator;

impl Narrator for SilentNarrator {
    fn narrate(&self, _facts: &NarrationFacts) -> Result<String, NarrationError> {
        Err(NarrationError::Unavailable)
    }
}

impl<F> Narrator for F
where
    F: Fn(&NarrationFacts) -> Result<String, NarrationError>,
{
    fn narrate(&self, facts: &NarrationFacts) -> Result<String, NarrationError> {
        self(facts)
    }
}

/// Ask the narrator once; any failure or blank answer yields `fallback`.
pub fn narrate_or_fallback(
    narrator: &dyn Narrator,
    facts: &NarrationFacts,
    fallback: String,
) -> String {
    match narrator.narrate(facts) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            log::warn!("{LOG_NARRATION_FALLBACK}: {}", NarrationError::EmptyResponse);
            fallback
        }
        Err(NarrationError::Unavailable) => fallback,
        Err(err) => {
            log::warn!("{LOG_NARRATION_FALLBACK}: {err}");
            fallback
        }
    }
}

/// Number of local battle templates for the given result.
#[must_use]
pub const fn battle_template_count(defeated: bool) -> usize {
    if defeated { 4 } else { 3 }
}

/// Local battle line; `variant` is reduced modulo the template count.
#[must_use]
pub fn battle_fallback(facts: &BattleFacts, variant: usize) -> String {
    let name = &facts.demon_name;
    let dmg = facts.hero_damage;
    let streak = facts.day_streak;
    let crit = facts.is_crit;
    if facts.defeated {
        match variant % battle_template_count(true) {
            0 => format!(
                "{}Your blade of discipline strikes true! {name} crumbles!",
                if crit { "CRITICAL HIT! " } else { "" }
            ),
            1 => format!("A mighty blow fueled by {streak} days of saving! {name} is vanquished!"),
            2 => format!("{name} dissolves! Your financial willpower proved too strong!"),
            _ => format!(
                "{}{dmg} DMG! {name} shatters like a bad spending habit!",
                if crit { "DEVASTATING " } else { "" }
            ),
        }
    } else {
        let counter = facts.demon_damage;
        match variant % battle_template_count(false) {
            0 => format!(
                "{}You slash for {dmg} DMG! {name} retaliates for {counter}!",
                if crit { "CRITICAL! " } else { "" }
            ),
            1 => format!(
                "Your {streak}-day streak powers a {dmg} DMG strike! {name} bites back for {counter}!"
            ),
            _ => format!(
                "{dmg} damage{}! {name} claws back for {counter}! Keep fighting!",
                if crit { " (CRIT!)" } else { "" }
            ),
        }
    }
}

#[must_use]
pub fn battle_start_message(demon_name: &str) -> String {
    format!("A wild {demon_name} blocks your path! Your saving streak powers your sword!")
}

#[must_use]
pub fn flee_message(demon_name: &str) -> String {
    format!("You retreat from {demon_name}. Save more to power up and face it again!")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn facts(defeated: bool, is_crit: bool) -> BattleFacts {
        BattleFacts {
            demon_name: "Debt Dragon".to_string(),
            hero_damage: 57,
            demon_damage: 9,
            is_crit,
            defeated,
            day_streak: 4,
            hero_level: 2,
        }
    }

    #[test]
    fn fallback_templates_cover_both_outcomes() {
        let hit = battle_fallback(&facts(false, true), 0);
        assert_eq!(hit, "CRITICAL! You slash for 57 DMG! Debt Dragon retaliates for 9!");
        let streak = battle_fallback(&facts(false, false), 1);
        assert!(streak.starts_with("Your 4-day streak"));
        let wrapped = battle_fallback(&facts(false, false), 5);
        assert!(wrapped.ends_with("Keep fighting!"));

        let win = battle_fallback(&facts(true, true), 3);
        assert_eq!(win, "DEVASTATING 57 DMG! Debt Dragon shatters like a bad spending habit!");
        for variant in 0..battle_template_count(true) {
            assert!(battle_fallback(&facts(true, false), variant).contains("Debt Dragon"));
        }
    }

    #[test]
    fn narrator_text_replaces_fallback() {
        let narrator = |_: &NarrationFacts| -> Result<String, NarrationError> {
            Ok("  The dragon weeps gold.  ".to_string())
        };
        let text = narrate_or_fallback(
            &narrator,
            &NarrationFacts::Battle(facts(true, false)),
            "fallback".to_string(),
        );
        assert_eq!(text, "The dragon weeps gold.");
    }

    #[test]
    fn failures_fall_back_after_a_single_attempt() {
        let calls = Cell::new(0);
        let narrator = |_: &NarrationFacts| -> Result<String, NarrationError> {
            calls.set(calls.get() + 1);
            Err(NarrationError::Timeout { millis: 4_000 })
        };
        let text = narrate_or_fallback(
            &narrator,
            &NarrationFacts::Battle(facts(false, false)),
            "fallback".to_string(),
        );
        assert_eq!(text, "fallback");
        assert_eq!(calls.get(), 1);

        let blank = |_: &NarrationFacts| -> Result<String, NarrationError> { Ok("   ".to_string()) };
        let facts = NarrationFacts::Battle(facts(false, false));
        assert_eq!(narrate_or_fallback(&blank, &facts, "kept".to_string()), "kept");
        assert_eq!(
            narrate_or_fallback(&SilentNarrator, &facts, "silent".to_string()),
            "silent"
        );
    }
}
