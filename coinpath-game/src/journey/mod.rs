//! Journey domain primitives shared by the session and the aggregate ledger.
use anyhow::Context;
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

pub mod command;
pub mod session;
pub use command::{CommandOutcome, JourneyCommand};
pub use session::{JourneySession, WelcomeNotice};

/// Errors returned by journey operations before any state is touched.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JourneyError {
    #[error("amount must be a positive number (got {amount})")]
    InvalidAmount { amount: f64 },
    #[error("unknown encounter '{id}'")]
    UnknownEncounter { id: String },
    #[error("encounter '{id}' is already defeated")]
    EncounterDefeated { id: String },
    #[error("encounter '{id}' on tile {tile} is out of reach from tile {current_tile}")]
    EncounterUnreachable {
        id: String,
        tile: u32,
        current_tile: u32,
    },
    #[error("a battle against '{id}' is already in progress")]
    BattleInProgress { id: String },
}

impl JourneyError {
    /// Validate a monetary input: finite and strictly positive.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for zero, negative, or non-finite amounts.
    pub fn check_amount(amount: f64) -> Result<f64, Self> {
        if amount.is_finite() && amount > 0.0 {
            Ok(amount)
        } else {
            Err(Self::InvalidAmount { amount })
        }
    }
}

/// Errors raised when journey configuration invariants are violated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JourneyConfigError {
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: u64,
        value: u64,
    },
    #[error("{field} must be between {min} and {max} (got {value})")]
    RangeViolation {
        field: &'static str,
        min: u64,
        max: u64,
        value: u64,
    },
    #[error("hero hp floor {floor} must stay below hero max hp {max}")]
    HeroHpFloor { floor: u32, max: u32 },
}

/// Setup-level journey configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyCfg {
    #[serde(default = "JourneyCfg::default_total_tiles")]
    pub total_tiles: u32,
    #[serde(default = "JourneyCfg::default_catch_up_cap")]
    pub catch_up_cap_tiles: u32,
    #[serde(default = "JourneyCfg::default_hero_max_hp")]
    pub hero_max_hp: u32,
    #[serde(default = "JourneyCfg::default_hero_hp_floor")]
    pub hero_hp_floor: u32,
    #[serde(default = "JourneyCfg::default_narration_timeout_ms")]
    pub narration_timeout_ms: u64,
}

impl JourneyCfg {
    #[must_use]
    pub const fn default_total_tiles() -> u32 {
        15
    }

    #[must_use]
    pub const fn default_catch_up_cap() -> u32 {
        3
    }

    #[must_use]
    pub const fn default_hero_max_hp() -> u32 {
        100
    }

    #[must_use]
    pub const fn default_hero_hp_floor() -> u32 {
        10
    }

    #[must_use]
    pub const fn default_narration_timeout_ms() -> u64 {
        4_000
    }

    /// Parse and validate a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or violates a documented bound.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_json::from_str(json).context("journey config is not valid JSON")?;
        cfg.validate().context("journey config rejected")?;
        Ok(cfg)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `JourneyConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), JourneyConfigError> {
        const MAX_TILES: u64 = 500;
        if !(1..=MAX_TILES).contains(&u64::from(self.total_tiles)) {
            return Err(JourneyConfigError::RangeViolation {
                field: "total_tiles",
                min: 1,
                max: MAX_TILES,
                value: u64::from(self.total_tiles),
            });
        }
        if self.catch_up_cap_tiles > self.total_tiles {
            return Err(JourneyConfigError::RangeViolation {
                field: "catch_up_cap_tiles",
                min: 0,
                max: u64::from(self.total_tiles),
                value: u64::from(self.catch_up_cap_tiles),
            });
        }
        if self.hero_hp_floor == 0 {
            return Err(JourneyConfigError::MinViolation {
                field: "hero_hp_floor",
                min: 1,
                value: 0,
            });
        }
        if self.hero_hp_floor >= self.hero_max_hp {
            return Err(JourneyConfigError::HeroHpFloor {
                floor: self.hero_hp_floor,
                max: self.hero_max_hp,
            });
        }
        if !(100..=60_000).contains(&self.narration_timeout_ms) {
            return Err(JourneyConfigError::RangeViolation {
                field: "narration_timeout_ms",
                min: 100,
                max: 60_000,
                value: self.narration_timeout_ms,
            });
        }
        Ok(())
    }
}

impl Default for JourneyCfg {
    fn default() -> Self {
        Self {
            total_tiles: Self::default_total_tiles(),
            catch_up_cap_tiles: Self::default_catch_up_cap(),
            hero_max_hp: Self::default_hero_max_hp(),
            hero_hp_floor: Self::default_hero_hp_floor(),
            narration_timeout_ms: Self::default_narration_timeout_ms(),
        }
    }
}

/// Deterministic bundle of RNG streams segregated by engine domain.
#[derive(Debug, Clone)]
pub struct RngBundle {
    battle: CountingRng<SmallRng>,
    narration: CountingRng<SmallRng>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            battle: CountingRng::new(derive_stream_seed(seed, b"battle")),
            narration: CountingRng::new(derive_stream_seed(seed, b"narration")),
        }
    }

    /// Construct a nondeterministic bundle for live play.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::from_user_seed(rand::random::<u64>())
    }

    /// Access the battle RNG stream (crit rolls, damage variance).
    pub fn battle(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.battle
    }

    /// Access the narration RNG stream (fallback template selection).
    pub fn narration(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.narration
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let seed_bytes: [u8; 8] = digest[..8].try_into().expect("digest slice length");
    u64::from_le_bytes(seed_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn default_config_is_valid() {
        let cfg = JourneyCfg::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.total_tiles, 15);
        assert_eq!(cfg.catch_up_cap_tiles, 3);
    }

    #[test]
    fn config_overlays_missing_fields_with_defaults() {
        let cfg = JourneyCfg::from_json(r#"{ "total_tiles": 30 }"#).unwrap();
        assert_eq!(cfg.total_tiles, 30);
        assert_eq!(cfg.hero_max_hp, 100);
    }

    #[test]
    fn config_rejects_out_of_range_values() {
        let cfg = JourneyCfg {
            total_tiles: 0,
            ..JourneyCfg::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(JourneyConfigError::RangeViolation {
                field: "total_tiles",
                ..
            })
        ));

        let cfg = JourneyCfg {
            hero_hp_floor: 100,
            ..JourneyCfg::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(JourneyConfigError::HeroHpFloor {
                floor: 100,
                max: 100
            })
        );

        let cfg = JourneyCfg {
            catch_up_cap_tiles: 40,
            ..JourneyCfg::default()
        };
        assert!(cfg.validate().is_err());

        let err = JourneyCfg::from_json(r#"{ "narration_timeout_ms": 5 }"#).unwrap_err();
        assert!(format!("{err:#}").contains("narration_timeout_ms"));
    }

    #[test]
    fn amount_check_rejects_non_positive() {
        assert!(JourneyError::check_amount(0.0).is_err());
        assert!(JourneyError::check_amount(-4.0).is_err());
        assert!(JourneyError::check_amount(f64::NAN).is_err());
        assert!(JourneyError::check_amount(f64::INFINITY).is_err());
        assert_eq!(JourneyError::check_amount(12.5), Ok(12.5));
    }

    #[test]
    fn rng_streams_are_deterministic_and_independent() {
        let mut a = RngBundle::from_user_seed(42);
        let mut b = RngBundle::from_user_seed(42);
        let first: Vec<u32> = (0..4).map(|_| a.battle().gen_range(0..1000)).collect();
        let second: Vec<u32> = (0..4).map(|_| b.battle().gen_range(0..1000)).collect();
        assert_eq!(first, second);
        assert_eq!(a.battle().draws(), 4);
        assert_eq!(a.narration().draws(), 0);

        let narration_a: u64 = a.narration().r#gen();
        let battle_c: u64 = RngBundle::from_user_seed(42).battle().r#gen();
        assert_ne!(narration_a, battle_c);
    }
}
