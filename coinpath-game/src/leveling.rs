//! Experience to level mapping.
use crate::constants::XP_LEVEL_THRESHOLDS;

/// Level reached with `xp` cumulative experience. Always at least 1.
#[must_use]
pub fn level_for(xp: u32) -> u32 {
    let reached = XP_LEVEL_THRESHOLDS
        .iter()
        .take_while(|&&threshold| xp >= threshold)
        .count();
    u32::try_from(reached.max(1)).unwrap_or(1)
}

/// Experience still needed to reach the next level, `None` once the table is exhausted.
#[must_use]
pub fn xp_to_next_level(xp: u32) -> Option<u32> {
    XP_LEVEL_THRESHOLDS
        .iter()
        .find(|&&threshold| threshold > xp)
        .map(|threshold| threshold - xp)
}

/// Highest level the table can produce.
#[must_use]
pub fn max_level() -> u32 {
    u32::try_from(XP_LEVEL_THRESHOLDS.len()).unwrap_or(1)
}
