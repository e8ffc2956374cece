use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::common::scenario::TestScenario;
use crate::logic::simulation::{JourneySimulator, SimulationPlan, SimulationSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub completed_journeys: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct LogicTester {
    simulator: JourneySimulator,
}

impl LogicTester {
    pub const fn new(simulator: JourneySimulator) -> Self {
        Self { simulator }
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.simulator.verbose() {
                println!(
                    "🧪 Testing scenario: {} (strategy: {} seed: {})",
                    scenario.name.bright_white(),
                    scenario.plan.strategy,
                    seed
                );
            }

            let result = self.run_single_scenario(scenario, seed, iterations);
            results.push(result);
        }

        results
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let run = self.run_simulation_iterations(&scenario.plan, seed, iterations);

        let avg_duration = if run.performance_data.is_empty() {
            Duration::ZERO
        } else {
            run.performance_data.iter().sum::<Duration>()
                / u32::try_from(run.performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            seed,
            passed: run.failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: run.successes,
            completed_journeys: run.completed,
            failures: run.failures,
            average_duration: avg_duration,
            performance_data: run.performance_data,
        }
    }

    fn run_simulation_iterations(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        iterations: usize,
    ) -> IterationRun {
        let mut run = IterationRun::default();
        let verbose = self.simulator.verbose();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let summary = self.simulator.run_plan(plan, iteration_seed);
            if summary.completed {
                run.completed += 1;
            }

            if let Some(err) = evaluate_expectations(plan, &summary) {
                let journey = &summary.final_state.journey;
                run.failures.push(format!(
                    "Iteration {} (strategy {}, seed {}, steps {}, tile {}/{}, level {}): {} | {}",
                    i + 1,
                    summary.strategy,
                    summary.seed,
                    summary.steps_run,
                    journey.current_tile,
                    journey.total_tiles,
                    journey.level,
                    err,
                    summarize_recent_actions(&summary)
                ));

                if verbose {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.red()
                    );
                }
            } else {
                run.successes += 1;
                let duration = start_time.elapsed();
                run.performance_data.push(duration);

                if verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) tile:{}/{} battles:{} wrong turns:{}",
                        i + 1,
                        iterations,
                        summary.final_state.journey.current_tile,
                        summary.final_state.journey.total_tiles,
                        summary.metrics.battles_won,
                        summary.metrics.wrong_turns
                    );
                }
            }
        }

        run
    }
}

#[derive(Debug, Default)]
struct IterationRun {
    successes: usize,
    completed: usize,
    failures: Vec<String>,
    performance_data: Vec<Duration>,
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SimulationSummary) -> Option<String> {
    if let Some(violation) = summary.violations.first() {
        return Some(format!("invariant violated: {violation}"));
    }
    for expectation in &plan.expectations {
        if let Err(err) = expectation(summary) {
            return Some(err.to_string());
        }
    }
    None
}

fn summarize_recent_actions(summary: &SimulationSummary) -> String {
    if summary.recent_actions.is_empty() {
        return "no actions recorded".to_string();
    }
    summary.recent_actions.join(" -> ")
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::policy::SaverStrategy;
    use coinpath_game::JourneyCfg;

    fn tester() -> LogicTester {
        LogicTester::new(JourneySimulator::new(JourneyCfg::default(), false))
    }

    fn always_fails(_: &SimulationSummary) -> anyhow::Result<()> {
        anyhow::bail!("expected failure")
    }

    #[test]
    fn passing_plan_reports_every_iteration() {
        let scenario = TestScenario::simulation(
            "Steady",
            SimulationPlan::new(SaverStrategy::Steady).with_max_steps(30),
        );
        let results = tester().run_scenario(&scenario, &[1, 2], 2);
        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(result.passed, "{:?}", result.failures);
            assert_eq!(result.successful_iterations, 2);
            assert_eq!(result.performance_data.len(), 2);
        }
    }

    #[test]
    fn failing_expectation_is_recorded_with_context() {
        let scenario = TestScenario::simulation(
            "Doomed",
            SimulationPlan::new(SaverStrategy::Balanced)
                .with_max_steps(5)
                .with_expectation(always_fails),
        );
        let results = tester().run_scenario(&scenario, &[3], 1);
        let result = &results[0];
        assert!(!result.passed);
        assert_eq!(result.successful_iterations, 0);
        assert!(result.failures[0].contains("expected failure"));
        assert!(result.failures[0].contains("seed 3"));
    }

    #[test]
    fn result_durations_serialize_as_millis() {
        let result = ScenarioResult {
            scenario_name: "Smoke".to_string(),
            seed: 1,
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            completed_journeys: 0,
            failures: Vec::new(),
            average_duration: Duration::from_millis(12),
            performance_data: vec![Duration::from_millis(12)],
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""average_duration":12"#));
        assert!(json.contains(r#""performance_data":[12]"#));
        let back: ScenarioResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.average_duration, Duration::from_millis(12));
    }
}
