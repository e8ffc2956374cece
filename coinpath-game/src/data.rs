//! Encounter roster and lore catalog data, embedded and loadable from JSON.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const DEFAULT_ROSTER_DATA: &str = include_str!("../assets/data/roster.json");

/// Cosmetic sprite tag for an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sprite {
    #[default]
    Shadow,
    Flame,
    Ice,
    Skull,
    Dragon,
}

/// A blocking encounter pinned to a tile of the journey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: String,
    pub name: String,
    pub tile: u32,
    pub hp: u32,
    pub max_hp: u32,
    #[serde(default)]
    pub defeated: bool,
    /// Reward descriptor such as `"+2 Tiles & 100 Gold"`.
    pub reward: String,
    #[serde(default)]
    pub sprite: Sprite,
    /// Lore scroll unlocked when this encounter is defeated.
    #[serde(default)]
    pub unlocks_lore: Option<String>,
}

impl Encounter {
    /// Restore the encounter to its undefeated, full-health shape.
    pub fn reset(&mut self) {
        self.defeated = false;
        self.hp = self.max_hp;
    }

    /// Remaining hp as a fraction of max hp.
    #[must_use]
    pub fn hp_ratio(&self) -> f64 {
        if self.max_hp == 0 {
            return 0.0;
        }
        f64::from(self.hp) / f64::from(self.max_hp)
    }
}

/// Roster entry as authored in data files; hp starts at `max_hp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterSeed {
    pub id: String,
    pub name: String,
    pub tile: u32,
    pub max_hp: u32,
    pub reward: String,
    #[serde(default)]
    pub sprite: Sprite,
    #[serde(default)]
    pub unlocks_lore: Option<String>,
}

impl From<EncounterSeed> for Encounter {
    fn from(seed: EncounterSeed) -> Self {
        let max_hp = seed.max_hp.max(1);
        Self {
            id: seed.id,
            name: seed.name,
            tile: seed.tile,
            hp: max_hp,
            max_hp,
            defeated: false,
            reward: seed.reward,
            sprite: seed.sprite,
            unlocks_lore: seed.unlocks_lore,
        }
    }
}

/// Lore entry unlocked by reaching a tile or defeating an encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoreScroll {
    pub id: String,
    pub title: String,
    pub body: String,
    /// Tile at which the scroll unlocks on its own; 0 means unlocked from the start.
    #[serde(default)]
    pub unlock_tile: u32,
    #[serde(default)]
    pub unlocked_at: Option<DateTime<Utc>>,
}

impl LoreScroll {
    #[must_use]
    pub const fn is_unlocked(&self) -> bool {
        self.unlocked_at.is_some()
    }
}

/// Container for the encounter roster and lore catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RosterData {
    pub encounters: Vec<EncounterSeed>,
    #[serde(default)]
    pub lore: Vec<LoreScroll>,
}

impl RosterData {
    /// Create empty roster data (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self {
            encounters: Vec::new(),
            lore: Vec::new(),
        }
    }

    /// Load roster data from JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into valid roster data.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Roster shipped with the crate.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_ROSTER_DATA).unwrap_or_else(|err| {
            log::warn!("embedded roster failed to parse ({err}); starting with an empty roster");
            Self::empty()
        })
    }

    /// Materialize the roster into live encounters with full hp.
    #[must_use]
    pub fn encounters(&self) -> Vec<Encounter> {
        self.encounters.iter().cloned().map(Encounter::from).collect()
    }

    /// Lore catalog with start-of-journey scrolls unlocked at `now`.
    #[must_use]
    pub fn lore(&self, now: DateTime<Utc>) -> Vec<LoreScroll> {
        self.lore
            .iter()
            .cloned()
            .map(|mut scroll| {
                scroll.unlocked_at = (scroll.unlock_tile == 0).then_some(now);
                scroll
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_from_json() {
        let json = r#"{
            "encounters": [
                {
                    "id": "x1",
                    "name": "Test Imp",
                    "tile": 3,
                    "max_hp": 80,
                    "reward": "+1 Tile",
                    "sprite": "skull"
                }
            ]
        }"#;

        let data = RosterData::from_json(json).unwrap();
        assert_eq!(data.encounters.len(), 1);
        assert!(data.lore.is_empty());

        let live = data.encounters();
        assert_eq!(live[0].hp, 80);
        assert_eq!(live[0].sprite, Sprite::Skull);
        assert!(!live[0].defeated);
    }

    #[test]
    fn static_roster_is_ordered_by_tile() {
        let data = RosterData::load_from_static();
        assert_eq!(data.encounters.len(), 6);
        assert!(data.encounters.windows(2).all(|w| w[0].tile < w[1].tile));

        let lore = data.lore(Utc::now());
        assert_eq!(lore.iter().filter(|scroll| scroll.is_unlocked()).count(), 2);
    }

    #[test]
    fn reset_restores_full_hp() {
        let mut encounter = RosterData::load_from_static().encounters().remove(0);
        encounter.hp = 0;
        encounter.defeated = true;
        encounter.reset();
        assert_eq!(encounter.hp, encounter.max_hp);
        assert!(!encounter.defeated);
        assert!((encounter.hp_ratio() - 1.0).abs() < f64::EPSILON);
    }
}
