use serde::{Deserialize, Serialize};

use crate::battle::{AttackOutcome, Battle, CollectOutcome};
use crate::reconcile::ReconcileOutcome;
use crate::savings::SavingsOutcome;
use crate::spending::{SpendCategory, SpendEvaluation};
use crate::state::JourneySetup;

/// Caller intent applied to a session through [`super::JourneySession::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JourneyCommand {
    ContributeSavings {
        amount: f64,
    },
    EvaluateSpend {
        amount: f64,
        category: SpendCategory,
    },
    /// Evaluate a spend and immediately apply its tile penalty.
    LogSpend {
        amount: f64,
        category: SpendCategory,
    },
    ApplySpendPenalty {
        tile_delta: i32,
    },
    StartBattle {
        encounter_id: String,
    },
    Attack,
    CollectReward,
    Flee,
    Reconcile,
    AcknowledgeWelcome,
    NewJourney {
        setup: JourneySetup,
    },
}

/// Result of a command. `NoActiveEncounter` marks an absorbed battle no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandOutcome {
    Savings(SavingsOutcome),
    SpendEvaluated(SpendEvaluation),
    SpendLogged {
        evaluation: SpendEvaluation,
        tiles_lost: u32,
    },
    PenaltyApplied {
        tiles_lost: u32,
    },
    BattleStarted(Battle),
    Attacked(AttackOutcome),
    RewardCollected(CollectOutcome),
    Fled {
        message: String,
    },
    NoActiveEncounter,
    Reconciled(ReconcileOutcome),
    WelcomeAcknowledged,
    JourneyStarted,
}
