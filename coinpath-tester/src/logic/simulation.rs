use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use coinpath_game::{
    AttackResult, Budget, Goal, JourneyAggregate, JourneyCfg, JourneySession, JourneySetup,
    NarrationError, NarrationFacts, Narrator, RosterData, SpendVerdict, level_for,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use std::sync::Arc;

use crate::logic::policy::{PlannedAction, SaverStrategy};

pub const DEFAULT_MAX_STEPS: u32 = 240;
const DEFAULT_GOAL_AMOUNT: f64 = 5_000.0;
// Weakest possible hero hit at level 1 with no streak.
const MIN_HERO_DAMAGE: u32 = 28;

pub type Expectation = fn(&SimulationSummary) -> Result<()>;

/// Shared narrator handle so one provider can serve many sessions.
pub type SharedNarrator = Arc<dyn Narrator + Send + Sync>;

/// Scripted run description: strategy, journey setup and expectations.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: SaverStrategy,
    pub max_steps: u32,
    pub goal_amount: f64,
    pub monthly_income: f64,
    pub replay_check: bool,
    pub expectations: Vec<Expectation>,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(strategy: SaverStrategy) -> Self {
        Self {
            strategy,
            max_steps: DEFAULT_MAX_STEPS,
            goal_amount: DEFAULT_GOAL_AMOUNT,
            monthly_income: Budget::default().monthly_income,
            replay_check: false,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    #[must_use]
    pub fn with_goal(mut self, goal_amount: f64) -> Self {
        self.goal_amount = goal_amount;
        self
    }

    #[must_use]
    pub fn with_income(mut self, monthly_income: f64) -> Self {
        self.monthly_income = monthly_income;
        self
    }

    /// Replay every run with the same seed and compare final aggregates.
    #[must_use]
    pub fn with_replay_check(mut self) -> Self {
        self.replay_check = true;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: Expectation) -> Self {
        self.expectations.push(expectation);
        self
    }

    fn setup(&self) -> JourneySetup {
        JourneySetup {
            goal: Goal::new("Emergency Fund", self.goal_amount, None),
            commitments: Vec::new(),
            budget: Budget {
                monthly_income: self.monthly_income,
                ..Budget::default()
            },
        }
    }
}

/// Counters gathered while a run plays out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationMetrics {
    pub contributions: u32,
    pub spends: u32,
    pub detours: u32,
    pub wrong_turns: u32,
    pub tiles_lost: u32,
    pub battles_won: u32,
    pub attacks: u32,
    pub longest_battle: u32,
    pub reentries: u32,
    pub catch_up_tiles: u32,
    pub lore_unlocked: u32,
}

#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: SaverStrategy,
    pub steps_run: u32,
    pub completed: bool,
    pub final_state: JourneyAggregate,
    pub metrics: SimulationMetrics,
    /// Last few actions, newest last.
    pub recent_actions: Vec<String>,
    pub violations: Vec<String>,
    /// `Some(true)` when a replay with the same seed ended identically.
    pub replay_matches: Option<bool>,
    pub catch_up_cap: u32,
}

/// Deterministic driver that plays a [`SimulationPlan`] through a session.
#[derive(Clone)]
pub struct JourneySimulator {
    cfg: JourneyCfg,
    roster: RosterData,
    narrator: Option<SharedNarrator>,
    verbose: bool,
}

impl JourneySimulator {
    #[must_use]
    pub fn new(cfg: JourneyCfg, verbose: bool) -> Self {
        Self {
            cfg,
            roster: RosterData::load_from_static(),
            narrator: None,
            verbose,
        }
    }

    #[must_use]
    pub fn with_narrator(mut self, narrator: SharedNarrator) -> Self {
        self.narrator = Some(narrator);
        self
    }

    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    fn session(&self, plan: &SimulationPlan, seed: u64, now: DateTime<Utc>) -> JourneySession {
        let aggregate = JourneyAggregate::new(&self.cfg, &self.roster, plan.setup(), now);
        let mut session = JourneySession::new(self.cfg.clone(), aggregate, seed);
        if let Some(narrator) = &self.narrator {
            let narrator = Arc::clone(narrator);
            session = session.with_narrator(
                move |facts: &NarrationFacts| -> Result<String, NarrationError> {
                    narrator.narrate(facts)
                },
            );
        }
        session
    }

    /// Upper bound on attack submissions for the toughest encounter, plus the collecting call.
    fn attack_budget(&self) -> u32 {
        let toughest = self
            .roster
            .encounters
            .iter()
            .map(|seed| seed.max_hp)
            .max()
            .unwrap_or(0);
        toughest.div_ceil(MIN_HERO_DAMAGE) + 1
    }

    #[must_use]
    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> SimulationSummary {
        let mut summary = self.play(plan, seed);
        if plan.replay_check {
            let replay = self.play(plan, seed);
            let matches = replay.final_state == summary.final_state
                && replay.metrics == summary.metrics;
            summary.replay_matches = Some(matches);
        }
        summary
    }

    fn play(&self, plan: &SimulationPlan, seed: u64) -> SimulationSummary {
        let mut now = Self::start_time();
        let mut session = self.session(plan, seed, now);
        session.reconcile_on_load(now);
        let mut policy = plan.strategy.create_policy();
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let attack_budget = self.attack_budget();

        let mut metrics = SimulationMetrics::default();
        let mut recent_actions = Vec::new();
        let mut violations = Vec::new();
        let mut steps_run = 0;
        let mut saved = session.state().goal.current_amount;
        let mut level = session.state().journey.level;

        for step in 0..plan.max_steps {
            if session.state().journey.is_complete() {
                break;
            }
            steps_run = step + 1;

            if session.battle().is_some() {
                let attacks = fight(&mut session, now, attack_budget);
                metrics.attacks += attacks;
                metrics.longest_battle = metrics.longest_battle.max(attacks);
                if session.battle().is_some() {
                    violations.push(format!(
                        "step {step}: battle still open after {attacks} attacks"
                    ));
                    break;
                }
                metrics.battles_won += 1;
                remember(&mut recent_actions, format!("won battle in {attacks} attacks"));
                continue;
            }

            let action = policy.next_action(&mut rng, session.state());
            remember(&mut recent_actions, action.label());
            match action {
                PlannedAction::Save(amount) => match session.contribute_savings(amount, now) {
                    Ok(outcome) => {
                        metrics.contributions += 1;
                        metrics.lore_unlocked += count(outcome.lore_unlocked.len());
                    }
                    Err(err) => violations.push(format!("step {step}: {err}")),
                },
                PlannedAction::Spend { amount, category } => {
                    match session.evaluate_spend(amount, &category) {
                        Ok(evaluation) => {
                            metrics.spends += 1;
                            match evaluation.verdict {
                                SpendVerdict::Detour => metrics.detours += 1,
                                SpendVerdict::WrongTurn => metrics.wrong_turns += 1,
                                SpendVerdict::Safe => {}
                            }
                            metrics.tiles_lost +=
                                session.apply_spend_penalty(evaluation.tile_delta, now);
                        }
                        Err(err) => violations.push(format!("step {step}: {err}")),
                    }
                }
                PlannedAction::Wait(hours) => {
                    now += Duration::hours(i64::from(hours));
                    let outcome = session.reconcile_on_load(now);
                    if outcome.days_passed > 0 {
                        metrics.reentries += 1;
                        metrics.catch_up_tiles += outcome.tiles_gained;
                        if outcome.tiles_gained > self.cfg.catch_up_cap_tiles {
                            violations.push(format!(
                                "step {step}: catch-up granted {} tiles",
                                outcome.tiles_gained
                            ));
                        }
                        session.acknowledge_welcome();
                    }
                }
            }

            check_invariants(&session, step, saved, level, &mut violations);
            saved = session.state().goal.current_amount;
            level = session.state().journey.level;
        }

        let final_state = session.into_state();
        if self.verbose {
            log::debug!(
                "seed {seed} ({}) finished on tile {}/{} after {steps_run} steps",
                plan.strategy,
                final_state.journey.current_tile,
                final_state.journey.total_tiles
            );
        }
        SimulationSummary {
            seed,
            strategy: plan.strategy,
            steps_run,
            completed: final_state.journey.is_complete(),
            final_state,
            metrics,
            recent_actions,
            violations,
            replay_matches: None,
            catch_up_cap: self.cfg.catch_up_cap_tiles,
        }
    }
}

fn fight(session: &mut JourneySession, now: DateTime<Utc>, budget: u32) -> u32 {
    let mut attacks = 0;
    while attacks < budget {
        attacks += 1;
        match session.attack(now) {
            Some(AttackResult::Strike(_)) => {}
            Some(AttackResult::Collected(_)) | None => break,
        }
    }
    attacks
}

fn check_invariants(
    session: &JourneySession,
    step: u32,
    saved: f64,
    level: u32,
    violations: &mut Vec<String>,
) {
    let state = session.state();
    let journey = &state.journey;
    if journey.current_tile > journey.total_tiles {
        violations.push(format!(
            "step {step}: tile {} beyond {}",
            journey.current_tile, journey.total_tiles
        ));
    }
    if journey.level != level_for(journey.xp) {
        violations.push(format!(
            "step {step}: level {} does not match {} xp",
            journey.level, journey.xp
        ));
    }
    if journey.level < level {
        violations.push(format!("step {step}: level fell from {level}"));
    }
    if state.goal.current_amount < saved {
        violations.push(format!("step {step}: savings fell below {saved:.2}"));
    }
    if journey
        .pending_encounter()
        .is_some_and(|encounter| encounter.defeated)
    {
        violations.push(format!("step {step}: defeated encounter still pending"));
    }
}

const RECENT_ACTIONS: usize = 5;

fn remember(recent: &mut Vec<String>, entry: String) {
    if recent.len() == RECENT_ACTIONS {
        recent.remove(0);
    }
    recent.push(entry);
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
