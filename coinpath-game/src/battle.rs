//! Encounter resolution: the choose / attacking / won cycle for one encounter.
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEMON_BASE_DAMAGE, DEMON_DAMAGE_VARIANCE, DEMON_HP_RATIO_WEIGHT, HERO_BASE_DAMAGE,
    HERO_CRIT_CAP, HERO_CRIT_MULTIPLIER, HERO_CRIT_PER_LEVEL, HERO_CRIT_PER_STREAK_DAY,
    HERO_DAMAGE_PER_LEVEL, HERO_DAMAGE_VARIANCE, HERO_STREAK_BONUS_CAP_DAYS,
    HERO_STREAK_BONUS_PER_DAY, LOG_BATTLE_COLLECT, LOG_BATTLE_FLEE, LOG_BATTLE_ROUND,
    LOG_BATTLE_START, LOG_BATTLE_WON, VICTORY_XP_BASE, VICTORY_XP_PER_LEVEL,
};
use crate::encounters::{EncounterRegistry, RewardGrant};
use crate::journey::{JourneyError, RngBundle};
use crate::narration::{BattleFacts, battle_fallback, battle_start_message, flee_message};
use crate::numbers::floor_f64_to_u32;
use crate::state::{EncounterId, JourneyAggregate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BattlePhase {
    #[default]
    Choose,
    Attacking,
    Won,
}

/// Presentation-side view of the active fight. Encounter hp lives in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Battle {
    pub encounter_id: EncounterId,
    pub hero_hp: u32,
    pub phase: BattlePhase,
    /// Round-by-round messages, oldest first.
    #[serde(default)]
    pub messages: Vec<String>,
}

impl Battle {
    fn begin(encounter_id: EncounterId, hero_max_hp: u32, opening: String) -> Self {
        Self {
            encounter_id,
            hero_hp: hero_max_hp,
            phase: BattlePhase::Choose,
            messages: vec![opening],
        }
    }

    #[must_use]
    pub fn is_won(&self) -> bool {
        self.phase == BattlePhase::Won
    }
}

/// Hero and encounter tuning the resolver needs from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeroVitals {
    pub max_hp: u32,
    pub hp_floor: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub hero_damage: u32,
    pub demon_damage: u32,
    pub new_demon_hp: u32,
    pub defeated: bool,
    pub is_crit: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectOutcome {
    pub encounter_id: EncounterId,
    pub tiles_advanced: u32,
    pub gold_bonus: u32,
    pub xp_gained: u32,
    pub leveled_up: bool,
    pub new_level: u32,
    pub log_entry: String,
    #[serde(default)]
    pub lore_unlocked: Vec<String>,
}

/// Hero strike: base and streak bonus plus variance, multiplied on a crit.
pub fn roll_hero_damage(level: u32, day_streak: u32, rng: &mut impl Rng) -> (u32, bool) {
    let base = HERO_BASE_DAMAGE.saturating_add(HERO_DAMAGE_PER_LEVEL.saturating_mul(level));
    let streak_bonus =
        HERO_STREAK_BONUS_PER_DAY.saturating_mul(day_streak.min(HERO_STREAK_BONUS_CAP_DAYS));
    let crit_chance = (HERO_CRIT_PER_STREAK_DAY * f64::from(day_streak)
        + HERO_CRIT_PER_LEVEL * f64::from(level))
    .clamp(0.0, HERO_CRIT_CAP);
    let is_crit = rng.gen_bool(crit_chance);
    let variance = rng.gen_range(0..HERO_DAMAGE_VARIANCE);
    let raw = base.saturating_add(streak_bonus).saturating_add(variance);
    if is_crit {
        (floor_f64_to_u32(f64::from(raw) * HERO_CRIT_MULTIPLIER), true)
    } else {
        (raw, false)
    }
}

/// Counter strike, weaker as the encounter's remaining hp ratio falls.
pub fn roll_demon_damage(hp_ratio: f64, rng: &mut impl Rng) -> u32 {
    let scaled = floor_f64_to_u32(DEMON_HP_RATIO_WEIGHT * hp_ratio.clamp(0.0, 1.0));
    DEMON_BASE_DAMAGE
        .saturating_add(scaled)
        .saturating_add(rng.gen_range(0..DEMON_DAMAGE_VARIANCE))
}

/// Open a fight against a reachable, undefeated encounter.
///
/// # Errors
///
/// Fails without mutation when the encounter is unknown, defeated, out of
/// reach, or another encounter is already pending.
pub fn start(
    aggregate: &mut JourneyAggregate,
    encounter_id: &str,
    hero_max_hp: u32,
) -> Result<Battle, JourneyError> {
    let journey = &mut aggregate.journey;
    if let Some(pending) = journey.pending_battle.as_deref()
        && pending != encounter_id
    {
        return Err(JourneyError::BattleInProgress {
            id: pending.to_string(),
        });
    }
    let encounter = journey
        .demons
        .get(encounter_id)
        .ok_or_else(|| JourneyError::UnknownEncounter {
            id: encounter_id.to_string(),
        })?;
    if encounter.defeated {
        return Err(JourneyError::EncounterDefeated {
            id: encounter_id.to_string(),
        });
    }
    if !EncounterRegistry::is_reachable(encounter, journey.current_tile) {
        return Err(JourneyError::EncounterUnreachable {
            id: encounter_id.to_string(),
            tile: encounter.tile,
            current_tile: journey.current_tile,
        });
    }
    let opening = battle_start_message(&encounter.name);
    log::info!(
        "{LOG_BATTLE_START}: {encounter_id} ({}/{} hp)",
        encounter.hp,
        encounter.max_hp
    );
    let already_won = encounter.hp == 0;
    journey.pending_battle = Some(encounter_id.to_string());
    let mut battle = Battle::begin(encounter_id.to_string(), hero_max_hp, opening);
    if already_won {
        battle.phase = BattlePhase::Won;
    }
    Ok(battle)
}

/// Battle view for a pending encounter set by savings interception.
#[must_use]
pub fn resume(aggregate: &JourneyAggregate, hero_max_hp: u32) -> Option<Battle> {
    let encounter = aggregate.journey.pending_encounter()?;
    let mut battle = Battle::begin(
        encounter.id.clone(),
        hero_max_hp,
        battle_start_message(&encounter.name),
    );
    if encounter.hp == 0 && !encounter.defeated {
        battle.phase = BattlePhase::Won;
    }
    Some(battle)
}

/// Resolve one exchange of blows. `None` when there is nothing to fight or the
/// fight is already won.
pub fn attack(
    aggregate: &mut JourneyAggregate,
    battle: &mut Battle,
    vitals: HeroVitals,
    rngs: &mut RngBundle,
) -> Option<AttackOutcome> {
    if battle.is_won()
        || aggregate.journey.pending_battle.as_deref() != Some(battle.encounter_id.as_str())
    {
        return None;
    }
    let level = aggregate.journey.level;
    let day_streak = aggregate.journey.day_streak;
    let encounter = aggregate
        .journey
        .demons
        .get_mut(&battle.encounter_id)
        .filter(|encounter| !encounter.defeated)?;

    battle.phase = BattlePhase::Attacking;
    let (hero_damage, is_crit) = roll_hero_damage(level, day_streak, rngs.battle());
    let demon_damage = roll_demon_damage(encounter.hp_ratio(), rngs.battle());
    encounter.hp = encounter.hp.saturating_sub(hero_damage);
    battle.hero_hp = battle
        .hero_hp
        .saturating_sub(demon_damage)
        .max(vitals.hp_floor.min(vitals.max_hp));

    let defeated = encounter.hp == 0;
    battle.phase = if defeated {
        BattlePhase::Won
    } else {
        BattlePhase::Choose
    };
    let facts = BattleFacts {
        demon_name: encounter.name.clone(),
        hero_damage,
        demon_damage,
        is_crit,
        defeated,
        day_streak,
        hero_level: level,
    };
    let variant = rngs.narration().gen_range(0..usize::MAX);
    let message = battle_fallback(&facts, variant);
    battle.messages.push(message.clone());

    if defeated {
        log::info!("{LOG_BATTLE_WON}: {}", battle.encounter_id);
    } else {
        log::debug!(
            "{LOG_BATTLE_ROUND}: {} took {hero_damage}{}, hp {}",
            battle.encounter_id,
            if is_crit { " (crit)" } else { "" },
            encounter.hp
        );
    }
    Some(AttackOutcome {
        hero_damage,
        demon_damage,
        new_demon_hp: encounter.hp,
        defeated,
        is_crit,
        message,
    })
}

/// Settle a won fight exactly once.
pub fn collect(
    aggregate: &mut JourneyAggregate,
    battle: &Battle,
    now: DateTime<Utc>,
) -> Option<CollectOutcome> {
    if !battle.is_won()
        || aggregate.journey.pending_battle.as_deref() != Some(battle.encounter_id.as_str())
    {
        return None;
    }
    let journey = &mut aggregate.journey;
    let level = journey.level;
    let encounter = journey
        .demons
        .get_mut(&battle.encounter_id)
        .filter(|encounter| !encounter.defeated)?;
    encounter.defeated = true;
    encounter.hp = 0;
    let name = encounter.name.clone();
    let grant = RewardGrant::parse(&encounter.reward);
    let lore_reward = encounter.unlocks_lore.clone();

    let tiles_advanced = journey.advance_by(grant.tiles);
    journey.grant_gold(grant.gold);
    let xp_gained = VICTORY_XP_BASE.saturating_add(VICTORY_XP_PER_LEVEL.saturating_mul(level));
    let leveled_up = journey.grant_xp(xp_gained);
    let new_level = journey.level;

    let mut log_entry = format!("Defeated {name}! +{xp_gained}XP");
    if grant.gold > 0 {
        log_entry.push_str(&format!(" +{}G", grant.gold));
    }
    if leveled_up {
        log_entry.push_str(&format!(" LEVEL UP! Lv{new_level}!"));
    }
    journey.battle_log.push(log_entry.clone());
    journey.pending_battle = None;
    journey.touch(now);
    log::info!("{LOG_BATTLE_COLLECT}: {log_entry}");

    let mut lore_unlocked = aggregate.unlock_lore_for_tile(now);
    if let Some(id) = lore_reward
        && aggregate.unlock_lore(&id, now)
    {
        lore_unlocked.push(id);
    }
    Some(CollectOutcome {
        encounter_id: battle.encounter_id.clone(),
        tiles_advanced,
        gold_bonus: grant.gold,
        xp_gained,
        leveled_up,
        new_level,
        log_entry,
        lore_unlocked,
    })
}

/// Leave the fight without reward or penalty. The encounter keeps its hp.
pub fn flee(aggregate: &mut JourneyAggregate, battle: &Battle) -> Option<String> {
    let journey = &mut aggregate.journey;
    if journey.pending_battle.as_deref() != Some(battle.encounter_id.as_str()) {
        return None;
    }
    journey.pending_battle = None;
    let name = journey
        .demons
        .get(&battle.encounter_id)
        .map_or_else(|| battle.encounter_id.clone(), |encounter| encounter.name.clone());
    log::info!("{LOG_BATTLE_FLEE}: {}", battle.encounter_id);
    Some(flee_message(&name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RosterData;
    use crate::journey::JourneyCfg;
    use crate::state::{Budget, Goal, JourneySetup};
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    const VITALS: HeroVitals = HeroVitals {
        max_hp: 100,
        hp_floor: 10,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 18, 0, 0).unwrap()
    }

    fn aggregate() -> JourneyAggregate {
        let setup = JourneySetup {
            goal: Goal::new("Car", 5_000.0, None),
            commitments: Vec::new(),
            budget: Budget::default(),
        };
        JourneyAggregate::new(
            &JourneyCfg::default(),
            &RosterData::load_from_static(),
            setup,
            now(),
        )
    }

    #[test]
    fn hero_damage_stays_within_formula_bounds() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..500 {
            let (damage, crit) = roll_hero_damage(2, 5, &mut rng);
            let floor = 20 + 16 + 15;
            let ceiling = floor + 14;
            if crit {
                assert!(damage >= floor * 18 / 10 && damage <= ceiling * 18 / 10);
            } else {
                assert!((floor..=ceiling).contains(&damage));
            }
        }
    }

    #[test]
    fn zero_streak_level_zero_never_crits() {
        let mut rng = SmallRng::seed_from_u64(3);
        assert!((0..200).all(|_| !roll_hero_damage(0, 0, &mut rng).1));
    }

    #[test]
    fn demon_damage_scales_with_remaining_hp() {
        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..200 {
            let full = roll_demon_damage(1.0, &mut rng);
            assert!((16..22).contains(&full));
            let spent = roll_demon_damage(0.0, &mut rng);
            assert!((6..12).contains(&spent));
        }
    }

    #[test]
    fn start_validates_target() {
        let mut aggregate = aggregate();
        assert_eq!(
            start(&mut aggregate, "nope", 100).unwrap_err(),
            JourneyError::UnknownEncounter {
                id: "nope".to_string()
            }
        );
        assert!(matches!(
            start(&mut aggregate, "d2", 100),
            Err(JourneyError::EncounterUnreachable { tile: 4, .. })
        ));
        aggregate.journey.current_tile = 1;
        let battle = start(&mut aggregate, "d1", 100).unwrap();
        assert_eq!(battle.hero_hp, 100);
        assert_eq!(battle.phase, BattlePhase::Choose);
        assert_eq!(aggregate.journey.pending_battle.as_deref(), Some("d1"));

        aggregate.journey.current_tile = 3;
        assert!(matches!(
            start(&mut aggregate, "d2", 100),
            Err(JourneyError::BattleInProgress { .. })
        ));
        aggregate.journey.pending_battle = None;
        aggregate.journey.demons.get_mut("d2").unwrap().defeated = true;
        assert!(matches!(
            start(&mut aggregate, "d2", 100),
            Err(JourneyError::EncounterDefeated { .. })
        ));
    }

    #[test]
    fn fight_reaches_won_and_collects_once() {
        let mut aggregate = aggregate();
        aggregate.journey.current_tile = 1;
        let mut rngs = RngBundle::from_user_seed(99);
        let mut battle = start(&mut aggregate, "d1", VITALS.max_hp).unwrap();

        let mut rounds = 0;
        while !battle.is_won() {
            let outcome = attack(&mut aggregate, &mut battle, VITALS, &mut rngs).unwrap();
            assert!(battle.hero_hp >= VITALS.hp_floor);
            rounds += 1;
            assert!(rounds <= 5, "imp should fall within five rounds");
            if outcome.defeated {
                assert_eq!(outcome.new_demon_hp, 0);
            }
        }
        assert!(attack(&mut aggregate, &mut battle, VITALS, &mut rngs).is_none());
        assert!(!aggregate.journey.demons.get("d1").unwrap().defeated);

        let collected = collect(&mut aggregate, &battle, now()).unwrap();
        assert_eq!(collected.tiles_advanced, 1);
        assert_eq!(collected.gold_bonus, 0);
        assert_eq!(collected.xp_gained, 65);
        assert_eq!(collected.log_entry, "Defeated Impulse Imp! +65XP");
        assert_eq!(aggregate.journey.current_tile, 2);
        assert_eq!(aggregate.journey.previous_tile, 1);
        assert!(aggregate.journey.pending_battle.is_none());
        assert!(aggregate.journey.demons.get("d1").unwrap().defeated);

        let xp = aggregate.journey.xp;
        assert!(collect(&mut aggregate, &battle, now()).is_none());
        assert_eq!(aggregate.journey.xp, xp);
        assert_eq!(aggregate.journey.battle_log.len(), 1);
    }

    #[test]
    fn restarting_a_won_fight_opens_ready_to_collect() {
        let mut aggregate = aggregate();
        aggregate.journey.current_tile = 1;
        let mut rngs = RngBundle::from_user_seed(21);
        let mut battle = start(&mut aggregate, "d1", VITALS.max_hp).unwrap();
        while !battle.is_won() {
            attack(&mut aggregate, &mut battle, VITALS, &mut rngs).unwrap();
        }
        let draws = rngs.battle().draws();

        let mut reopened = start(&mut aggregate, "d1", VITALS.max_hp).unwrap();
        assert_eq!(reopened.phase, BattlePhase::Won);
        assert!(attack(&mut aggregate, &mut reopened, VITALS, &mut rngs).is_none());
        assert_eq!(rngs.battle().draws(), draws);
        assert!(collect(&mut aggregate, &reopened, now()).is_some());
    }

    #[test]
    fn collect_grants_gold_level_and_lore() {
        let mut aggregate = aggregate();
        aggregate.journey.current_tile = 5;
        aggregate.journey.xp = 90;
        aggregate.journey.level = 1;
        let mut battle = start(&mut aggregate, "d3", 100).unwrap();
        aggregate.journey.demons.get_mut("d3").unwrap().hp = 0;
        battle.phase = BattlePhase::Won;

        let collected = collect(&mut aggregate, &battle, now()).unwrap();
        assert_eq!(collected.gold_bonus, 50);
        assert!(collected.leveled_up);
        assert_eq!(
            collected.log_entry,
            "Defeated Fast Food Fiend! +65XP +50G LEVEL UP! Lv2!"
        );
        assert!(collected.lore_unlocked.contains(&"l3".to_string()));
        assert_eq!(aggregate.journey.gold_coins, 50);
    }

    #[test]
    fn reward_tiles_clamp_to_total() {
        let mut aggregate = aggregate();
        aggregate.journey.current_tile = 12;
        let mut battle = start(&mut aggregate, "d6", 100).unwrap();
        aggregate.journey.demons.get_mut("d6").unwrap().hp = 0;
        battle.phase = BattlePhase::Won;
        aggregate.journey.total_tiles = 13;
        let collected = collect(&mut aggregate, &battle, now()).unwrap();
        assert_eq!(collected.tiles_advanced, 1);
        assert_eq!(aggregate.journey.current_tile, 13);
    }

    #[test]
    fn flee_keeps_encounter_damage() {
        let mut aggregate = aggregate();
        aggregate.journey.current_tile = 1;
        let mut rngs = RngBundle::from_user_seed(1);
        let mut battle = start(&mut aggregate, "d1", 100).unwrap();
        aggregate.journey.demons.get_mut("d1").unwrap().hp = 1_000;
        attack(&mut aggregate, &mut battle, VITALS, &mut rngs).unwrap();
        let hp = aggregate.journey.demons.get("d1").unwrap().hp;

        let message = flee(&mut aggregate, &battle).unwrap();
        assert!(message.starts_with("You retreat from Impulse Imp"));
        assert!(aggregate.journey.pending_battle.is_none());
        assert_eq!(aggregate.journey.demons.get("d1").unwrap().hp, hp);
        assert!(flee(&mut aggregate, &battle).is_none());
        assert!(attack(&mut aggregate, &mut battle, VITALS, &mut rngs).is_none());
    }

    #[test]
    fn resume_builds_view_for_intercepted_encounter() {
        let mut aggregate = aggregate();
        assert!(resume(&aggregate, 100).is_none());
        aggregate.journey.pending_battle = Some("d1".to_string());
        let battle = resume(&aggregate, 100).unwrap();
        assert_eq!(battle.encounter_id, "d1");
        assert_eq!(battle.hero_hp, 100);
        assert!(battle.messages[0].contains("Impulse Imp"));
    }
}
