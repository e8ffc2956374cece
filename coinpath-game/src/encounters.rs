//! Encounter registry and reward descriptors.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::constants::DEFAULT_REWARD_TILES;
use crate::data::Encounter;

fn tile_reward_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\+(\d+)\s*Tile").expect("static tile pattern"))
}

fn gold_reward_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+)\s*Gold").expect("static gold pattern"))
}

/// Tile and gold bonus parsed from an encounter's reward descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardGrant {
    pub tiles: u32,
    pub gold: u32,
}

impl RewardGrant {
    /// Parse descriptors of the form `"+2 Tiles & 100 Gold"`.
    ///
    /// A missing tile clause grants one tile; a missing gold clause grants none.
    #[must_use]
    pub fn parse(descriptor: &str) -> Self {
        let tiles = tile_reward_pattern()
            .captures(descriptor)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(DEFAULT_REWARD_TILES);
        let gold = gold_reward_pattern()
            .captures(descriptor)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0);
        Self { tiles, gold }
    }
}

/// Ordered set of blocking encounters owned by the journey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EncounterRegistry(Vec<Encounter>);

impl EncounterRegistry {
    #[must_use]
    pub fn new(encounters: Vec<Encounter>) -> Self {
        Self(encounters)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Encounter> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Encounter> {
        self.0.iter().find(|encounter| encounter.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Encounter> {
        self.0.iter_mut().find(|encounter| encounter.id == id)
    }

    /// First undefeated encounter by tile order on `(from, to]`.
    ///
    /// Encounters sharing a tile resolve in registry order.
    #[must_use]
    pub fn first_blocking_between(&self, from: u32, to: u32) -> Option<&Encounter> {
        self.0
            .iter()
            .filter(|encounter| !encounter.defeated && encounter.tile > from && encounter.tile <= to)
            .min_by_key(|encounter| encounter.tile)
    }

    /// Whether a manual battle may be started from `current_tile`.
    #[must_use]
    pub fn is_reachable(encounter: &Encounter, current_tile: u32) -> bool {
        encounter.tile <= current_tile.saturating_add(1)
    }

    /// Next undefeated encounter strictly ahead of `tile`.
    #[must_use]
    pub fn next_undefeated_after(&self, tile: u32) -> Option<&Encounter> {
        self.first_blocking_between(tile, u32::MAX)
    }

    #[must_use]
    pub fn undefeated_count(&self) -> usize {
        self.0.iter().filter(|encounter| !encounter.defeated).count()
    }

    /// Restore every encounter to full hp and undefeated.
    pub fn reset_all(&mut self) {
        for encounter in &mut self.0 {
            encounter.reset();
        }
    }
}
