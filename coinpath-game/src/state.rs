//! Journey aggregate: progress ledger, goal, commitments and budget.
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{LOG_LEVEL_UP, LOG_LORE_UNLOCK};
use crate::data::{Encounter, LoreScroll, RosterData};
use crate::encounters::EncounterRegistry;
use crate::journey::JourneyCfg;
use crate::leveling::level_for;
use crate::spending::SpendCategory;

/// Identifier of an encounter in the registry.
pub type EncounterId = String;

/// Positional progress ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyState {
    pub current_tile: u32,
    pub previous_tile: u32,
    pub total_tiles: u32,
    pub last_visit: DateTime<Utc>,
    /// Cached `goal.current_amount / goal.target_amount`, in `[0, 1]`.
    #[serde(default)]
    pub savings_to_target: f64,
    #[serde(default)]
    pub day_streak: u32,
    #[serde(default)]
    pub xp: u32,
    #[serde(default = "JourneyState::default_level")]
    pub level: u32,
    #[serde(default)]
    pub gold_coins: u32,
    #[serde(default)]
    pub demons: EncounterRegistry,
    #[serde(default)]
    pub pending_battle: Option<EncounterId>,
    #[serde(default)]
    pub battle_log: Vec<String>,
}

impl JourneyState {
    const fn default_level() -> u32 {
        1
    }

    /// Fresh ledger at tile 0 with a full-health roster.
    #[must_use]
    pub fn fresh(total_tiles: u32, demons: EncounterRegistry, now: DateTime<Utc>) -> Self {
        Self {
            current_tile: 0,
            previous_tile: 0,
            total_tiles: total_tiles.max(1),
            last_visit: now,
            savings_to_target: 0.0,
            day_streak: 0,
            xp: 0,
            level: 1,
            gold_coins: 0,
            demons,
            pending_battle: None,
            battle_log: Vec::new(),
        }
    }

    #[must_use]
    pub const fn tiles_remaining(&self) -> u32 {
        self.total_tiles.saturating_sub(self.current_tile)
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.current_tile >= self.total_tiles
    }

    /// Move forward by up to `tiles`, never past the final tile. Returns the distance moved.
    pub fn advance_by(&mut self, tiles: u32) -> u32 {
        let gained = tiles.min(self.tiles_remaining());
        self.previous_tile = self.current_tile;
        self.current_tile += gained;
        gained
    }

    /// Move backward by up to `tiles`, never below tile 0. Returns the distance moved.
    pub fn retreat_by(&mut self, tiles: u32) -> u32 {
        let lost = tiles.min(self.current_tile);
        self.previous_tile = self.current_tile;
        self.current_tile -= lost;
        lost
    }

    /// Add experience and recompute level. Returns `true` on a level boundary crossing.
    pub fn grant_xp(&mut self, amount: u32) -> bool {
        let before = self.level;
        self.xp = self.xp.saturating_add(amount);
        self.level = level_for(self.xp);
        let leveled_up = self.level > before;
        if leveled_up {
            log::info!("{LOG_LEVEL_UP}: level {before} -> {}", self.level);
        }
        leveled_up
    }

    pub fn grant_gold(&mut self, amount: u32) {
        self.gold_coins = self.gold_coins.saturating_add(amount);
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_visit = now;
    }

    /// Encounter currently blocking progress, if any.
    #[must_use]
    pub fn pending_encounter(&self) -> Option<&Encounter> {
        self.pending_battle
            .as_deref()
            .and_then(|id| self.demons.get(id))
    }

    /// Restore invariants on a ledger loaded from storage.
    pub fn sanitize(&mut self) {
        self.total_tiles = self.total_tiles.max(1);
        self.current_tile = self.current_tile.min(self.total_tiles);
        self.previous_tile = self.previous_tile.min(self.total_tiles);
        self.savings_to_target = if self.savings_to_target.is_finite() {
            self.savings_to_target.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.level = level_for(self.xp);
        let pending_is_live = self
            .pending_encounter()
            .is_some_and(|encounter| !encounter.defeated);
        if !pending_is_live {
            self.pending_battle = None;
        }
    }
}

/// Savings target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub label: String,
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: f64,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

impl Goal {
    #[must_use]
    pub fn new(label: impl Into<String>, target_amount: f64, deadline: Option<NaiveDate>) -> Self {
        Self {
            label: label.into(),
            target_amount,
            current_amount: 0.0,
            deadline,
        }
    }

    /// Add a contribution, clamping at the target.
    pub fn deposit(&mut self, amount: f64) {
        let target = self.target_amount.max(0.0);
        self.current_amount = (self.current_amount + amount).clamp(0.0, target);
    }

    /// Saved fraction of the target, 0 when there is no positive target.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.target_amount > 0.0 {
            (self.current_amount / self.target_amount).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    #[must_use]
    pub fn remaining(&self) -> f64 {
        (self.target_amount - self.current_amount).max(0.0)
    }

    fn sanitize(&mut self) {
        if !self.target_amount.is_finite() || self.target_amount < 0.0 {
            self.target_amount = 0.0;
        }
        if !self.current_amount.is_finite() {
            self.current_amount = 0.0;
        }
        self.current_amount = self.current_amount.clamp(0.0, self.target_amount);
    }
}

/// Fixed recurring outflow the player has pledged to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub label: String,
    pub category: SpendCategory,
    pub amount_per_month: f64,
    #[serde(default = "Commitment::default_active")]
    pub active: bool,
}

impl Commitment {
    const fn default_active() -> bool {
        true
    }

    #[must_use]
    pub fn new(label: impl Into<String>, category: SpendCategory, amount_per_month: f64) -> Self {
        Self {
            label: label.into(),
            category,
            amount_per_month,
            active: true,
        }
    }
}

/// Monthly cash-flow figures used to derive the safe-to-spend allowance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default = "Budget::default_income")]
    pub monthly_income: f64,
    #[serde(default = "Budget::default_buffer")]
    pub safety_buffer: f64,
}

impl Budget {
    const fn default_income() -> f64 {
        3_200.0
    }

    const fn default_buffer() -> f64 {
        200.0
    }

    /// Income left after active commitments and the safety buffer, never negative.
    #[must_use]
    pub fn safe_to_spend(&self, commitments: &[Commitment]) -> f64 {
        let committed: f64 = commitments
            .iter()
            .filter(|commitment| commitment.active)
            .map(|commitment| commitment.amount_per_month.max(0.0))
            .sum();
        (self.monthly_income - committed - self.safety_buffer).max(0.0)
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            monthly_income: Self::default_income(),
            safety_buffer: Self::default_buffer(),
        }
    }
}

/// Player choices captured when a journey is (re)started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneySetup {
    pub goal: Goal,
    #[serde(default)]
    pub commitments: Vec<Commitment>,
    #[serde(default)]
    pub budget: Budget,
}

/// The single consistency unit read and written by every journey operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyAggregate {
    pub journey: JourneyState,
    pub goal: Goal,
    #[serde(default)]
    pub commitments: Vec<Commitment>,
    #[serde(default)]
    pub budget: Budget,
    #[serde(default)]
    pub lore: Vec<LoreScroll>,
}

impl JourneyAggregate {
    /// Start a journey from setup choices and the shipped roster.
    #[must_use]
    pub fn new(
        cfg: &JourneyCfg,
        roster: &RosterData,
        setup: JourneySetup,
        now: DateTime<Utc>,
    ) -> Self {
        let demons = EncounterRegistry::new(roster.encounters());
        let mut aggregate = Self {
            journey: JourneyState::fresh(cfg.total_tiles, demons, now),
            goal: setup.goal,
            commitments: setup.commitments,
            budget: setup.budget,
            lore: roster.lore(now),
        };
        aggregate.goal.sanitize();
        aggregate.journey.savings_to_target = aggregate.goal.ratio();
        aggregate
    }

    /// Mid-journey sample used for first launch and demos.
    #[must_use]
    pub fn demo(roster: &RosterData, now: DateTime<Utc>) -> Self {
        let started = Utc
            .with_ymd_and_hms(2026, 1, 15, 12, 0, 0)
            .single()
            .unwrap_or(now);
        let mut goal = Goal::new(
            "Emergency Fund",
            5_000.0,
            NaiveDate::from_ymd_opt(2026, 8, 1),
        );
        goal.current_amount = 1_100.0;

        let mut demons = EncounterRegistry::new(roster.encounters());
        if let Some(imp) = demons.get_mut("d1") {
            imp.defeated = true;
            imp.hp = 0;
        }

        let mut journey = JourneyState::fresh(15, demons, now);
        journey.current_tile = 3;
        journey.savings_to_target = goal.ratio();
        journey.day_streak = 5;
        journey.xp = 120;
        journey.level = level_for(journey.xp);
        journey.gold_coins = 75;

        Self {
            journey,
            goal,
            commitments: vec![
                Commitment::new("Pack lunch 4x/week", SpendCategory::Food, 200.0),
                Commitment::new("No impulse buys > $30", SpendCategory::Shopping, 150.0),
            ],
            budget: Budget::default(),
            lore: roster.lore(started),
        }
    }

    /// Reset progress for a new journey, keeping the roster and lore catalog.
    pub fn new_journey(&mut self, setup: JourneySetup, now: DateTime<Utc>) {
        let total_tiles = self.journey.total_tiles;
        let mut demons = std::mem::take(&mut self.journey.demons);
        demons.reset_all();
        self.journey = JourneyState::fresh(total_tiles, demons, now);

        self.goal = setup.goal;
        self.goal.sanitize();
        self.journey.savings_to_target = self.goal.ratio();
        self.commitments = setup.commitments;
        self.budget = setup.budget;
        for scroll in &mut self.lore {
            if scroll.unlock_tile > 0 {
                scroll.unlocked_at = None;
            }
        }
    }

    /// Re-establish invariants after loading, filling gaps from the shipped roster.
    #[must_use]
    pub fn rehydrate(mut self, roster: &RosterData) -> Self {
        if self.journey.demons.is_empty() {
            self.journey.demons = EncounterRegistry::new(roster.encounters());
        }
        for scroll in roster.lore(self.journey.last_visit) {
            if !self.lore.iter().any(|known| known.id == scroll.id) {
                self.lore.push(scroll);
            }
        }
        self.goal.sanitize();
        self.journey.sanitize();
        self.journey.savings_to_target = self.goal.ratio();
        self
    }

    #[must_use]
    pub fn safe_to_spend(&self) -> f64 {
        self.budget.safe_to_spend(&self.commitments)
    }

    /// Unlock every tile-gated scroll the current position has reached.
    pub fn unlock_lore_for_tile(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let tile = self.journey.current_tile;
        let mut unlocked = Vec::new();
        for scroll in &mut self.lore {
            if !scroll.is_unlocked() && scroll.unlock_tile > 0 && scroll.unlock_tile <= tile {
                scroll.unlocked_at = Some(now);
                log::debug!("{LOG_LORE_UNLOCK}: {} at tile {tile}", scroll.id);
                unlocked.push(scroll.id.clone());
            }
        }
        unlocked
    }

    /// Unlock a scroll by id. Returns `true` only when it was previously locked.
    pub fn unlock_lore(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        match self.lore.iter_mut().find(|scroll| scroll.id == id) {
            Some(scroll) if !scroll.is_unlocked() => {
                scroll.unlocked_at = Some(now);
                log::debug!("{LOG_LORE_UNLOCK}: {id}");
                true
            }
            _ => false,
        }
    }
}
