//! Session facade: one journey aggregate plus its battle view, welcome notice
//! and narrator, reconciled once before the first mutation.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::battle::{self, AttackOutcome, Battle, CollectOutcome, HeroVitals};
use crate::journey::{CommandOutcome, JourneyCfg, JourneyCommand, JourneyError, RngBundle};
use crate::narration::{
    BattleFacts, NarrationFacts, Narrator, SilentNarrator, SpendFacts, narrate_or_fallback,
};
use crate::progress::{ProgressReport, progress_report};
use crate::reconcile::{ReconcileOutcome, reconcile};
use crate::savings::{self, SavingsOutcome};
use crate::spending::{self, SpendCategory, SpendContext, SpendEvaluation};
use crate::state::{JourneyAggregate, JourneySetup};

/// One-time notice for progress granted while the player was away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeNotice {
    pub days_passed: u32,
    pub tiles_gained: u32,
}

/// Result of an attack submission: a blow, or the reward once the fight is won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttackResult {
    Strike(AttackOutcome),
    Collected(CollectOutcome),
}

/// High-level session wrapper owning one journey aggregate and its presentation state.
pub struct JourneySession {
    cfg: JourneyCfg,
    aggregate: JourneyAggregate,
    rngs: RngBundle,
    battle: Option<Battle>,
    welcome: Option<WelcomeNotice>,
    reconciled: bool,
    narrator: Box<dyn Narrator>,
}

impl fmt::Debug for JourneySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JourneySession")
            .field("cfg", &self.cfg)
            .field("aggregate", &self.aggregate)
            .field("battle", &self.battle)
            .field("welcome", &self.welcome)
            .field("reconciled", &self.reconciled)
            .finish_non_exhaustive()
    }
}

impl JourneySession {
    /// Wrap an aggregate with deterministic randomness seeded from `seed`.
    #[must_use]
    pub fn new(cfg: JourneyCfg, aggregate: JourneyAggregate, seed: u64) -> Self {
        Self::with_rngs(cfg, aggregate, RngBundle::from_user_seed(seed))
    }

    /// Wrap an aggregate for live play with nondeterministic randomness.
    #[must_use]
    pub fn with_entropy(cfg: JourneyCfg, aggregate: JourneyAggregate) -> Self {
        Self::with_rngs(cfg, aggregate, RngBundle::from_entropy())
    }

    fn with_rngs(cfg: JourneyCfg, aggregate: JourneyAggregate, rngs: RngBundle) -> Self {
        let battle = battle::resume(&aggregate, cfg.hero_max_hp);
        Self {
            cfg,
            aggregate,
            rngs,
            battle,
            welcome: None,
            reconciled: false,
            narrator: Box::new(SilentNarrator),
        }
    }

    /// Attach a flavor-text provider.
    #[must_use]
    pub fn with_narrator(mut self, narrator: impl Narrator + 'static) -> Self {
        self.narrator = Box::new(narrator);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &JourneyCfg {
        &self.cfg
    }

    /// Borrow the underlying aggregate.
    #[must_use]
    pub const fn state(&self) -> &JourneyAggregate {
        &self.aggregate
    }

    /// Apply a closure to the mutable aggregate.
    pub fn with_state_mut<R>(&mut self, f: impl FnOnce(&mut JourneyAggregate) -> R) -> R {
        f(&mut self.aggregate)
    }

    /// Consume the session, returning the aggregate for persistence.
    #[must_use]
    pub fn into_state(self) -> JourneyAggregate {
        self.aggregate
    }

    /// Active battle view, if any.
    #[must_use]
    pub const fn battle(&self) -> Option<&Battle> {
        self.battle.as_ref()
    }

    /// Deterministically reseed the session's random streams.
    pub fn reseed(&mut self, seed: u64) {
        self.rngs = RngBundle::from_user_seed(seed);
    }

    const fn vitals(&self) -> HeroVitals {
        HeroVitals {
            max_hp: self.cfg.hero_max_hp,
            hp_floor: self.cfg.hero_hp_floor,
        }
    }

    /// Grant catch-up progress for time away. Calling again with the same `now` is a no-op.
    pub fn reconcile_on_load(&mut self, now: DateTime<Utc>) -> ReconcileOutcome {
        self.reconciled = true;
        let outcome = reconcile(
            &mut self.aggregate.journey,
            now,
            self.cfg.catch_up_cap_tiles,
        );
        if outcome.days_passed > 0 {
            self.welcome = Some(WelcomeNotice {
                days_passed: outcome.days_passed,
                tiles_gained: outcome.tiles_gained,
            });
            self.aggregate.unlock_lore_for_tile(now);
        }
        outcome
    }

    fn ensure_reconciled(&mut self, now: DateTime<Utc>) {
        if !self.reconciled {
            self.reconcile_on_load(now);
        }
    }

    #[must_use]
    pub const fn welcome(&self) -> Option<WelcomeNotice> {
        self.welcome
    }

    /// Tiles gained on reentry, held until acknowledged.
    #[must_use]
    pub fn tiles_gained(&self) -> u32 {
        self.welcome.map_or(0, |notice| notice.tiles_gained)
    }

    pub fn acknowledge_welcome(&mut self) {
        self.welcome = None;
    }

    /// Credit savings toward the goal.
    ///
    /// # Errors
    ///
    /// Returns `JourneyError::InvalidAmount` for non-positive or non-finite amounts.
    pub fn contribute_savings(
        &mut self,
        amount: f64,
        now: DateTime<Utc>,
    ) -> Result<SavingsOutcome, JourneyError> {
        JourneyError::check_amount(amount)?;
        self.ensure_reconciled(now);
        let outcome = savings::contribute(&mut self.aggregate, amount, now)?;
        if outcome.demon_triggered.is_some() {
            self.battle = battle::resume(&self.aggregate, self.cfg.hero_max_hp);
        }
        Ok(outcome)
    }

    #[must_use]
    pub fn spend_context(&self) -> SpendContext {
        SpendContext {
            safe_to_spend: self.aggregate.safe_to_spend(),
            goal_amount: self.aggregate.goal.target_amount,
        }
    }

    /// Judge a spend against the current budget. Never mutates the journey.
    ///
    /// # Errors
    ///
    /// Returns `JourneyError::InvalidAmount` for non-positive or non-finite amounts.
    pub fn evaluate_spend(
        &self,
        amount: f64,
        category: &SpendCategory,
    ) -> Result<SpendEvaluation, JourneyError> {
        let context = self.spend_context();
        let mut evaluation = spending::evaluate(amount, category, context)?;
        let facts = NarrationFacts::Spend(SpendFacts {
            amount,
            category: category.clone(),
            verdict: evaluation.verdict,
            tile_delta: evaluation.tile_delta,
            days_delta: evaluation.days_delta,
            pct_of_goal: evaluation.pct_of_goal,
            safe_to_spend: context.safe_to_spend,
            goal_amount: context.goal_amount,
        });
        let fallback = std::mem::take(&mut evaluation.reason);
        evaluation.reason = narrate_or_fallback(self.narrator.as_ref(), &facts, fallback);
        Ok(evaluation)
    }

    /// Push the hero back by a spend verdict's tile delta. Returns tiles lost.
    pub fn apply_spend_penalty(&mut self, tile_delta: i32, now: DateTime<Utc>) -> u32 {
        self.ensure_reconciled(now);
        spending::apply_penalty(&mut self.aggregate.journey, tile_delta, now)
    }

    /// Open a fight against a reachable encounter.
    ///
    /// # Errors
    ///
    /// Returns an error when the encounter is unknown, defeated, out of reach,
    /// or a different encounter is already pending.
    pub fn start_battle(
        &mut self,
        encounter_id: &str,
        now: DateTime<Utc>,
    ) -> Result<&Battle, JourneyError> {
        self.ensure_reconciled(now);
        let battle = battle::start(&mut self.aggregate, encounter_id, self.cfg.hero_max_hp)?;
        Ok(self.battle.insert(battle))
    }

    /// Submit an attack. Once the fight is won the submission collects the reward.
    ///
    /// Returns `None` when no battle is pending.
    pub fn attack(&mut self, now: DateTime<Utc>) -> Option<AttackResult> {
        self.ensure_reconciled(now);
        if self.battle.as_ref().is_some_and(Battle::is_won) {
            return self.collect_reward(now).map(AttackResult::Collected);
        }
        let vitals = self.vitals();
        let battle = self.battle.as_mut()?;
        let mut outcome = battle::attack(&mut self.aggregate, battle, vitals, &mut self.rngs)?;

        let demon_name = self
            .aggregate
            .journey
            .demons
            .get(&battle.encounter_id)
            .map(|encounter| encounter.name.clone())
            .unwrap_or_default();
        let facts = NarrationFacts::Battle(BattleFacts {
            demon_name,
            hero_damage: outcome.hero_damage,
            demon_damage: outcome.demon_damage,
            is_crit: outcome.is_crit,
            defeated: outcome.defeated,
            day_streak: self.aggregate.journey.day_streak,
            hero_level: self.aggregate.journey.level,
        });
        let fallback = std::mem::take(&mut outcome.message);
        outcome.message = narrate_or_fallback(self.narrator.as_ref(), &facts, fallback);
        if let Some(last) = battle.messages.last_mut() {
            last.clone_from(&outcome.message);
        }
        Some(AttackResult::Strike(outcome))
    }

    /// Settle a won fight. `None` unless a fight is won and still uncollected.
    pub fn collect_reward(&mut self, now: DateTime<Utc>) -> Option<CollectOutcome> {
        self.ensure_reconciled(now);
        let battle = self.battle.as_ref()?;
        let outcome = battle::collect(&mut self.aggregate, battle, now)?;
        self.battle = None;
        Some(outcome)
    }

    /// Walk away from the active fight.
    pub fn flee(&mut self) -> Option<String> {
        let battle = self.battle.take()?;
        let message = battle::flee(&mut self.aggregate, &battle);
        if message.is_none() {
            self.battle = Some(battle);
        }
        message
    }

    #[must_use]
    pub fn progress(&self, now: DateTime<Utc>) -> ProgressReport {
        progress_report(&self.aggregate, now)
    }

    /// Reset the journey with fresh setup choices.
    pub fn new_journey(&mut self, setup: JourneySetup, now: DateTime<Utc>) {
        self.aggregate.new_journey(setup, now);
        self.battle = None;
        self.welcome = None;
        self.reconciled = true;
    }

    /// Single entry point mapping a command onto the session.
    ///
    /// # Errors
    ///
    /// Propagates validation errors from the underlying operation; no state is
    /// changed when an error is returned.
    pub fn apply(
        &mut self,
        command: JourneyCommand,
        now: DateTime<Utc>,
    ) -> Result<CommandOutcome, JourneyError> {
        let outcome = match command {
            JourneyCommand::ContributeSavings { amount } => {
                CommandOutcome::Savings(self.contribute_savings(amount, now)?)
            }
            JourneyCommand::EvaluateSpend { amount, category } => {
                CommandOutcome::SpendEvaluated(self.evaluate_spend(amount, &category)?)
            }
            JourneyCommand::LogSpend { amount, category } => {
                let evaluation = self.evaluate_spend(amount, &category)?;
                let tiles_lost = self.apply_spend_penalty(evaluation.tile_delta, now);
                CommandOutcome::SpendLogged {
                    evaluation,
                    tiles_lost,
                }
            }
            JourneyCommand::ApplySpendPenalty { tile_delta } => CommandOutcome::PenaltyApplied {
                tiles_lost: self.apply_spend_penalty(tile_delta, now),
            },
            JourneyCommand::StartBattle { encounter_id } => {
                CommandOutcome::BattleStarted(self.start_battle(&encounter_id, now)?.clone())
            }
            JourneyCommand::Attack => match self.attack(now) {
                Some(AttackResult::Strike(outcome)) => CommandOutcome::Attacked(outcome),
                Some(AttackResult::Collected(outcome)) => CommandOutcome::RewardCollected(outcome),
                None => CommandOutcome::NoActiveEncounter,
            },
            JourneyCommand::CollectReward => self
                .collect_reward(now)
                .map_or(CommandOutcome::NoActiveEncounter, CommandOutcome::RewardCollected),
            JourneyCommand::Flee => self
                .flee()
                .map_or(CommandOutcome::NoActiveEncounter, |message| {
                    CommandOutcome::Fled { message }
                }),
            JourneyCommand::Reconcile => CommandOutcome::Reconciled(self.reconcile_on_load(now)),
            JourneyCommand::AcknowledgeWelcome => {
                self.acknowledge_welcome();
                CommandOutcome::WelcomeAcknowledged
            }
            JourneyCommand::NewJourney { setup } => {
                self.new_journey(setup, now);
                CommandOutcome::JourneyStarted
            }
        };
        Ok(outcome)
    }
}
