pub mod catalog;

use crate::logic::SimulationPlan;
use catalog::catalog_scenarios;

/// Named plan the logic tester runs across seeds.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

/// Look up a scenario by CLI key or alias.
pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let key = name.to_lowercase();
    catalog_scenarios()
        .into_iter()
        .find(|entry| entry.key == key || entry.aliases.contains(&key.as_str()))
        .map(|entry| TestScenario::simulation(entry.title, entry.plan))
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog_scenarios()
        .into_iter()
        .map(|entry| (entry.key, entry.title))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        for (key, title) in list_scenarios() {
            let scenario = get_scenario(key).unwrap_or_else(|| panic!("{key} missing"));
            assert_eq!(scenario.name, title);
        }
    }

    #[test]
    fn aliases_and_case_are_accepted() {
        assert!(get_scenario("SMOKE").is_some());
        assert!(get_scenario("battles").is_some());
        assert!(get_scenario("no-such-scenario").is_none());
    }
}
