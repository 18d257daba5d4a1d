//! XP to level/title progression.
//!
//! The tier table is fixed configuration. Each tier's span is 1.25x the
//! previous one, seeded at 100 XP for tier 1 -> 2, rounded to whole points.
//! Tier 10 has no upper bound.

use serde::Serialize;
use utoipa::ToSchema;

pub const MAX_LEVEL: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct LevelInfo {
    pub level: u8,
    pub title: &'static str,
    pub min_xp: i64,
    /// Exclusive upper bound; `None` for the last tier.
    pub max_xp: Option<i64>,
}

const fn tier(level: u8, title: &'static str, min_xp: i64, max_xp: Option<i64>) -> LevelInfo {
    LevelInfo {
        level,
        title,
        min_xp,
        max_xp,
    }
}

static LEVELS: [LevelInfo; MAX_LEVEL as usize] = [
    tier(1, "Eco Rookie", 0, Some(100)),
    tier(2, "Litter Spotter", 100, Some(225)),
    tier(3, "Green Scout", 225, Some(381)),
    tier(4, "Trail Keeper", 381, Some(576)),
    tier(5, "Eco Warrior", 576, Some(820)),
    tier(6, "Nature Guardian", 820, Some(1125)),
    tier(7, "Earth Defender", 1125, Some(1506)),
    tier(8, "Planet Protector", 1506, Some(1983)),
    tier(9, "Eco Champion", 1983, Some(2579)),
    tier(10, "Eco Legend", 2579, None),
];

pub fn levels() -> &'static [LevelInfo] {
    &LEVELS
}

/// Highest tier whose `min_xp <= xp`. Negative input counts as zero.
pub fn level_for_xp(xp: i64) -> LevelInfo {
    let xp = xp.max(0);
    LEVELS
        .iter()
        .rev()
        .find(|info| info.min_xp <= xp)
        .copied()
        .unwrap_or(LEVELS[0])
}

pub fn progress_percent(xp: i64) -> u8 {
    let xp = xp.max(0);
    let info = level_for_xp(xp);
    let Some(max_xp) = info.max_xp else {
        return 100;
    };

    let span = max_xp - info.min_xp;
    let gained = xp - info.min_xp;
    // round half up without going through floats
    let percent = (gained * 200 + span) / (span * 2);
    percent.clamp(0, 100) as u8
}

pub fn xp_to_next_level(xp: i64) -> i64 {
    let xp = xp.max(0);
    match level_for_xp(xp).max_xp {
        Some(max_xp) => max_xp - xp,
        None => 0,
    }
}

/// The three derived values for one XP total, computed from a single lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Progression {
    pub points: i64,
    pub level: u8,
    pub title: &'static str,
    pub progress_percent: u8,
    pub xp_to_next_level: i64,
}

impl Progression {
    pub fn of(points: Option<i64>) -> Self {
        let points = points.unwrap_or(0).max(0);
        let info = level_for_xp(points);
        Self {
            points,
            level: info.level,
            title: info.title,
            progress_percent: progress_percent(points),
            xp_to_next_level: xp_to_next_level(points),
        }
    }
}
