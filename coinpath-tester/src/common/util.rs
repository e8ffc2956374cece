use anyhow::{Context, Result};
use coinpath_game::JourneyCfg;
use std::{fs, path::Path};

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Journey tuning from a JSON file, or the built-in defaults.
pub fn load_journey_config(path: Option<&Path>) -> Result<JourneyCfg> {
    let Some(path) = path else {
        return Ok(JourneyCfg::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    JourneyCfg::from_json(&raw).with_context(|| format!("in config {}", path.display()))
}
