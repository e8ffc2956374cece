//! Coinpath Journey Engine
//!
//! Platform-agnostic progression engine that turns saving and spending into
//! movement along a tiled journey, with blocking encounters, leveling, and
//! catch-up on reentry. No UI or network dependencies.

pub mod battle;
pub mod constants;
pub mod data;
pub mod encounters;
pub mod journey;
pub mod leveling;
pub mod narration;
pub mod numbers;
pub mod progress;
pub mod reconcile;
pub mod savings;
pub mod spending;
pub mod state;

use anyhow::Context;
use chrono::{DateTime, Utc};

// Re-export commonly used types
pub use battle::{AttackOutcome, Battle, BattlePhase, CollectOutcome, HeroVitals};
pub use data::{Encounter, EncounterSeed, LoreScroll, RosterData, Sprite};
pub use encounters::{EncounterRegistry, RewardGrant};
pub use journey::session::AttackResult;
pub use journey::{
    CommandOutcome, JourneyCfg, JourneyCommand, JourneyConfigError, JourneyError, JourneySession,
    RngBundle, WelcomeNotice,
};
pub use leveling::{level_for, xp_to_next_level};
pub use narration::{
    BattleFacts, NarrationError, NarrationFacts, Narrator, SilentNarrator, SpendFacts,
    narrate_or_fallback,
};
pub use progress::{ProgressReport, StreakTier, progress_report};
pub use reconcile::ReconcileOutcome;
pub use savings::SavingsOutcome;
pub use spending::{SpendCategory, SpendContext, SpendEvaluation, SpendVerdict};
pub use state::{
    Budget, Commitment, EncounterId, Goal, JourneyAggregate, JourneySetup, JourneyState,
};

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the encounter roster and lore catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be loaded.
    fn load_roster(&self) -> Result<RosterData, Self::Error>;

    /// Load journey configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config(&self) -> Result<JourneyCfg, Self::Error>;
}

/// Loader backed by the roster embedded in the crate and default tuning.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticDataLoader;

impl DataLoader for StaticDataLoader {
    type Error = std::convert::Infallible;

    fn load_roster(&self) -> Result<RosterData, Self::Error> {
        Ok(RosterData::load_from_static())
    }

    fn load_config(&self) -> Result<JourneyCfg, Self::Error> {
        Ok(JourneyCfg::default())
    }
}

/// Trait for abstracting save/load operations.
///
/// Implementations own the single-writer guarantee per slot.
pub trait JourneyStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save a journey aggregate
    ///
    /// # Errors
    ///
    /// Returns an error if the aggregate cannot be saved.
    fn save_journey(&self, slot: &str, aggregate: &JourneyAggregate) -> Result<(), Self::Error>;

    /// Load a journey aggregate
    ///
    /// # Errors
    ///
    /// Returns an error if the aggregate cannot be loaded.
    fn load_journey(&self, slot: &str) -> Result<Option<JourneyAggregate>, Self::Error>;

    /// Delete a saved journey
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_journey(&self, slot: &str) -> Result<(), Self::Error>;
}

/// Engine performing load, mutate, save around each journey operation.
pub struct JourneyEngine<L, S>
where
    L: DataLoader,
    S: JourneyStorage,
{
    data_loader: L,
    storage: S,
}

impl<L, S> JourneyEngine<L, S>
where
    L: DataLoader,
    S: JourneyStorage,
    L::Error: Into<anyhow::Error>,
    S::Error: Into<anyhow::Error>,
{
    /// Create a new engine with the provided data loader and storage
    pub const fn new(data_loader: L, storage: S) -> Self {
        Self {
            data_loader,
            storage,
        }
    }

    fn config(&self) -> anyhow::Result<JourneyCfg> {
        let cfg = self.data_loader.load_config().map_err(Into::into)?;
        cfg.validate().context("invalid journey configuration")?;
        Ok(cfg)
    }

    /// Start a journey in `slot`, replacing anything saved there.
    ///
    /// # Errors
    ///
    /// Returns an error if data cannot be loaded or the aggregate cannot be saved.
    pub fn create_journey(
        &self,
        slot: &str,
        setup: JourneySetup,
        now: DateTime<Utc>,
    ) -> anyhow::Result<JourneyAggregate> {
        let cfg = self.config()?;
        let roster = self.data_loader.load_roster().map_err(Into::into)?;
        let aggregate = JourneyAggregate::new(&cfg, &roster, setup, now);
        self.save_journey(slot, &aggregate)?;
        Ok(aggregate)
    }

    /// Save a journey aggregate
    ///
    /// # Errors
    ///
    /// Returns an error if the aggregate cannot be saved.
    pub fn save_journey(&self, slot: &str, aggregate: &JourneyAggregate) -> anyhow::Result<()> {
        self.storage
            .save_journey(slot, aggregate)
            .map_err(Into::into)
            .with_context(|| format!("failed to save journey slot '{slot}'"))
    }

    /// Load a journey aggregate
    ///
    /// # Errors
    ///
    /// Returns an error if the aggregate cannot be loaded or rehydrated.
    pub fn load_journey(&self, slot: &str) -> anyhow::Result<Option<JourneyAggregate>> {
        let Some(aggregate) = self.storage.load_journey(slot).map_err(Into::into)? else {
            return Ok(None);
        };
        // Rehydrate with fresh data
        let roster = self.data_loader.load_roster().map_err(Into::into)?;
        Ok(Some(aggregate.rehydrate(&roster)))
    }

    /// Delete a saved journey
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    pub fn delete_journey(&self, slot: &str) -> anyhow::Result<()> {
        self.storage.delete_journey(slot).map_err(Into::into)
    }

    /// Load `slot` into a session and reconcile elapsed time.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is empty or cannot be loaded.
    pub fn open_session(
        &self,
        slot: &str,
        seed: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<JourneySession> {
        let aggregate = self
            .load_journey(slot)?
            .with_context(|| format!("no journey saved in slot '{slot}'"))?;
        let mut session = JourneySession::new(self.config()?, aggregate, seed);
        session.reconcile_on_load(now);
        Ok(session)
    }

    /// Persist a session's aggregate back into `slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the aggregate cannot be saved.
    pub fn commit_session(&self, slot: &str, session: &JourneySession) -> anyhow::Result<()> {
        self.save_journey(slot, session.state())
    }

    /// Load, apply one command, and save. Nothing is saved when the command fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be loaded or saved, or the command
    /// is rejected.
    pub fn execute(
        &self,
        slot: &str,
        command: JourneyCommand,
        seed: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<CommandOutcome> {
        let mut session = self.open_session(slot, seed, now)?;
        let outcome = session.apply(command, now)?;
        self.commit_session(slot, &session)?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct MemoryStorage {
        saves: Rc<RefCell<HashMap<String, JourneyAggregate>>>,
    }

    impl JourneyStorage for MemoryStorage {
        type Error = Infallible;

        fn save_journey(
            &self,
            slot: &str,
            aggregate: &JourneyAggregate,
        ) -> Result<(), Self::Error> {
            self.saves
                .borrow_mut()
                .insert(slot.to_string(), aggregate.clone());
            Ok(())
        }

        fn load_journey(&self, slot: &str) -> Result<Option<JourneyAggregate>, Self::Error> {
            Ok(self.saves.borrow().get(slot).cloned())
        }

        fn delete_journey(&self, slot: &str) -> Result<(), Self::Error> {
            self.saves.borrow_mut().remove(slot);
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
    }

    fn setup() -> JourneySetup {
        JourneySetup {
            goal: Goal::new("Emergency Fund", 5_000.0, None),
            commitments: vec![Commitment::new("Rent", SpendCategory::Housing, 1_200.0)],
            budget: Budget::default(),
        }
    }

    #[test]
    fn engine_creates_and_roundtrips_journey() {
        let engine = JourneyEngine::new(StaticDataLoader, MemoryStorage::default());
        let created = engine.create_journey("slot-one", setup(), now()).unwrap();
        assert_eq!(created.journey.total_tiles, 15);

        let loaded = engine.load_journey("slot-one").unwrap().expect("save exists");
        assert_eq!(loaded, created);
        assert!(engine.load_journey("missing-slot").unwrap().is_none());

        engine.delete_journey("slot-one").unwrap();
        assert!(engine.load_journey("slot-one").unwrap().is_none());
    }

    #[test]
    fn execute_saves_only_successful_commands() {
        let storage = MemoryStorage::default();
        let engine = JourneyEngine::new(StaticDataLoader, storage.clone());
        engine.create_journey("hero", setup(), now()).unwrap();

        let outcome = engine
            .execute(
                "hero",
                JourneyCommand::ContributeSavings { amount: 150.0 },
                7,
                now(),
            )
            .unwrap();
        let CommandOutcome::Savings(savings) = outcome else {
            panic!("expected savings outcome");
        };
        assert_eq!(savings.tiles_advanced, 1);
        assert_eq!(engine.load_journey("hero").unwrap().unwrap().journey.xp, 35);

        let err = engine
            .execute(
                "hero",
                JourneyCommand::ContributeSavings { amount: 0.0 },
                7,
                now(),
            )
            .unwrap_err();
        assert!(err.downcast_ref::<JourneyError>().is_some());
        assert_eq!(engine.load_journey("hero").unwrap().unwrap().journey.xp, 35);
    }

    #[test]
    fn open_session_reconciles_elapsed_days() {
        let engine = JourneyEngine::new(StaticDataLoader, MemoryStorage::default());
        engine.create_journey("hero", setup(), now()).unwrap();
        let session = engine
            .open_session("hero", 1, now() + Duration::days(4))
            .unwrap();
        assert_eq!(session.tiles_gained(), 3);
        assert_eq!(session.state().journey.day_streak, 4);

        let err = engine.open_session("ghost", 1, now()).unwrap_err();
        assert!(format!("{err:#}").contains("ghost"));
    }

    #[test]
    fn battle_can_be_driven_through_the_engine() {
        let engine = JourneyEngine::new(StaticDataLoader, MemoryStorage::default());
        engine.create_journey("hero", setup(), now()).unwrap();
        engine
            .execute(
                "hero",
                JourneyCommand::ContributeSavings { amount: 100.0 },
                3,
                now(),
            )
            .unwrap();
        let started = engine
            .execute(
                "hero",
                JourneyCommand::StartBattle {
                    encounter_id: "d1".to_string(),
                },
                3,
                now(),
            )
            .unwrap();
        assert!(matches!(started, CommandOutcome::BattleStarted(_)));

        let mut collected = false;
        for round in 0..10 {
            match engine
                .execute("hero", JourneyCommand::Attack, round, now())
                .unwrap()
            {
                CommandOutcome::RewardCollected(_) => {
                    collected = true;
                    break;
                }
                CommandOutcome::Attacked(_) => {}
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert!(collected);
        let saved = engine.load_journey("hero").unwrap().unwrap();
        assert!(saved.journey.demons.get("d1").unwrap().defeated);
        assert!(saved.journey.pending_battle.is_none());
        assert_eq!(saved.journey.current_tile, 2);
    }
}
