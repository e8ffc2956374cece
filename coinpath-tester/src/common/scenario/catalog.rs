use anyhow::{Result, ensure};

use crate::logic::{SaverStrategy, SimulationPlan, SimulationSummary};

/// Catalog row: CLI key, display title, aliases and the plan to run.
pub struct CatalogEntry {
    pub key: &'static str,
    pub title: &'static str,
    pub aliases: &'static [&'static str],
    pub plan: SimulationPlan,
}

impl CatalogEntry {
    fn new(key: &'static str, title: &'static str, plan: SimulationPlan) -> Self {
        Self {
            key,
            title,
            aliases: &[],
            plan,
        }
    }

    fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }
}

pub fn catalog_scenarios() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry::new(
            "smoke",
            "Smoke Test",
            SimulationPlan::new(SaverStrategy::Balanced)
                .with_max_steps(40)
                .with_expectation(smoke_expectation),
        ),
        CatalogEntry::new(
            "steady-saver",
            "Steady Saver Completes Journey",
            SimulationPlan::new(SaverStrategy::Steady).with_expectation(completion_expectation),
        )
        .aliases(&["steady"]),
        CatalogEntry::new(
            "impulsive-spender",
            "Impulsive Spender Setbacks",
            SimulationPlan::new(SaverStrategy::Impulsive)
                .with_max_steps(120)
                .with_expectation(setback_expectation),
        )
        .aliases(&["impulsive"]),
        CatalogEntry::new(
            "battle-gauntlet",
            "Battle Gauntlet",
            SimulationPlan::new(SaverStrategy::Steady)
                .with_goal(3_000.0)
                .with_expectation(completion_expectation)
                .with_expectation(battle_ledger_expectation),
        )
        .aliases(&["battles"]),
        CatalogEntry::new(
            "reentry-catch-up",
            "Reentry Catch-Up",
            SimulationPlan::new(SaverStrategy::Drifter)
                .with_max_steps(120)
                .with_expectation(catch_up_expectation),
        )
        .aliases(&["reentry", "drifter"]),
        CatalogEntry::new(
            "tight-budget",
            "Tight Budget Spending",
            SimulationPlan::new(SaverStrategy::Balanced)
                .with_income(300.0)
                .with_max_steps(80)
                .with_expectation(tight_budget_expectation),
        )
        .aliases(&["budget"]),
        CatalogEntry::new(
            "deterministic",
            "Deterministic Replay",
            SimulationPlan::new(SaverStrategy::Impulsive)
                .with_max_steps(100)
                .with_replay_check()
                .with_expectation(replay_expectation),
        )
        .aliases(&["replay"]),
    ]
}

fn smoke_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.steps_run > 0, "simulation should run at least one step");
    ensure!(
        summary.metrics.contributions + summary.metrics.spends > 0,
        "simulation should record some activity"
    );
    Ok(())
}

fn completion_expectation(summary: &SimulationSummary) -> Result<()> {
    let journey = &summary.final_state.journey;
    ensure!(
        summary.completed,
        "journey stalled on tile {}/{} after {} steps",
        journey.current_tile,
        journey.total_tiles,
        summary.steps_run
    );
    Ok(())
}

fn setback_expectation(summary: &SimulationSummary) -> Result<()> {
    let metrics = &summary.metrics;
    ensure!(metrics.spends > 0, "impulsive saver never spent");
    ensure!(metrics.wrong_turns > 0, "no wrong turns from large purchases");
    ensure!(
        metrics.tiles_lost <= metrics.wrong_turns * 3 + metrics.detours,
        "lost {} tiles from {} wrong turns and {} detours",
        metrics.tiles_lost,
        metrics.wrong_turns,
        metrics.detours
    );
    Ok(())
}

fn battle_ledger_expectation(summary: &SimulationSummary) -> Result<()> {
    let journey = &summary.final_state.journey;
    let defeated: Vec<_> = journey.demons.iter().filter(|d| d.defeated).collect();
    ensure!(
        journey.battle_log.len() == defeated.len(),
        "{} battle log entries for {} defeated encounters",
        journey.battle_log.len(),
        defeated.len()
    );
    for encounter in defeated {
        ensure!(encounter.hp == 0, "{} defeated with {} hp", encounter.id, encounter.hp);
    }
    ensure!(
        summary.metrics.battles_won == u32::try_from(journey.battle_log.len()).unwrap_or(0),
        "won {} battles but logged {}",
        summary.metrics.battles_won,
        journey.battle_log.len()
    );
    Ok(())
}

fn catch_up_expectation(summary: &SimulationSummary) -> Result<()> {
    let metrics = &summary.metrics;
    ensure!(metrics.reentries > 0, "drifter never left long enough to reenter");
    ensure!(
        metrics.catch_up_tiles <= metrics.reentries * summary.catch_up_cap,
        "{} catch-up tiles over {} reentries",
        metrics.catch_up_tiles,
        metrics.reentries
    );
    ensure!(
        summary.final_state.journey.day_streak > 0,
        "reentries should build the day streak"
    );
    Ok(())
}

fn tight_budget_expectation(summary: &SimulationSummary) -> Result<()> {
    let metrics = &summary.metrics;
    ensure!(
        metrics.detours + metrics.wrong_turns == metrics.spends,
        "{} of {} spends passed as safe on a $100 allowance",
        metrics.spends - metrics.detours - metrics.wrong_turns,
        metrics.spends
    );
    Ok(())
}

fn replay_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.replay_matches == Some(true),
        "replay with seed {} diverged",
        summary.seed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::JourneySimulator;
    use coinpath_game::JourneyCfg;
    use std::collections::HashSet;

    #[test]
    fn keys_and_aliases_are_unique() {
        let mut seen = HashSet::new();
        for entry in catalog_scenarios() {
            assert!(seen.insert(entry.key), "duplicate key {}", entry.key);
            for alias in entry.aliases {
                assert!(seen.insert(alias), "duplicate alias {alias}");
            }
        }
    }

    #[test]
    fn catalog_passes_on_a_few_seeds() {
        let simulator = JourneySimulator::new(JourneyCfg::default(), false);
        for entry in catalog_scenarios() {
            for seed in [1_u64, 42, 1337] {
                let summary = simulator.run_plan(&entry.plan, seed);
                assert!(summary.violations.is_empty(), "{}: {:?}", entry.key, summary.violations);
                for expectation in &entry.plan.expectations {
                    if let Err(err) = expectation(&summary) {
                        panic!("{} seed {seed}: {err}", entry.key);
                    }
                }
            }
        }
    }
}
