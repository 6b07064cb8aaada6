//! Derived values for a character sheet.
//!
//! Every function here is pure and total: identical input always gives
//! identical output, and out-of-range input is clamped rather than rejected.

use crate::character::{Attribute, Character, Limb, LimbId};
use crate::class_data::{CharacterClass, DEFAULT_MENTAL_STRENGTH};
use std::fmt;

/// Cheapest and dearest scores available during point buy.
pub const POINT_BUY_MIN: i32 = 8;
pub const POINT_BUY_MAX: i32 = 15;

/// Total points available for point buy.
pub const POINT_BUY_BUDGET: i32 = 27;

/// Upper bound of the sanity pool.
pub const SANITY_CAP: i32 = 100;

/// Shield bonus when a shield carries no armor profile of its own.
pub const DEFAULT_SHIELD_BONUS: i32 = 2;

/// Experience needed to reach each level, index 0 being level 1.
pub const EXPERIENCE_THRESHOLDS: [u32; 20] = [
    0, 300, 900, 2700, 6500, 14000, 23000, 34000, 48000, 64000, 85000, 100000, 120000, 140000,
    165000, 195000, 225000, 265000, 305000, 355000,
];

fn clamp_level(level: u8) -> u8 {
    level.clamp(1, crate::character::MAX_LEVEL)
}

pub fn ability_modifier(score: i32) -> i32 {
    // Floor division: 8-9 = -1, 10-11 = 0, 12-13 = +1.
    score.saturating_sub(10).div_euclid(2)
}

pub fn proficiency_bonus(level: u8) -> i32 {
    match clamp_level(level) {
        1..=4 => 2,
        5..=8 => 3,
        9..=12 => 4,
        13..=16 => 5,
        _ => 6,
    }
}

/// Sanity adjustment from wisdom: five points per modifier step above 10,
/// five points per score point below it.
pub fn sanity_modifier_from_wisdom(wisdom: i32) -> i32 {
    if wisdom >= 10 {
        ability_modifier(wisdom).saturating_mul(5)
    } else {
        wisdom.saturating_sub(10).saturating_mul(5)
    }
}

pub fn class_base_mental_strength(class: &str) -> i32 {
    CharacterClass::from_id(class)
        .map(|c| c.mental_strength())
        .unwrap_or(DEFAULT_MENTAL_STRENGTH)
}

pub fn max_sanity(class: &str, wisdom: i32, level: u8) -> i32 {
    let raw = class_base_mental_strength(class)
        .saturating_add(sanity_modifier_from_wisdom(wisdom.clamp(-1000, 1000)))
        .saturating_add(level as i32 / 2);
    raw.clamp(0, SANITY_CAP)
}

/// Half the character's max HP, rounded up, plus the constitution modifier.
/// Never below 1.
pub fn limb_max_hp(max_hp: i32, constitution: i32) -> i32 {
    let half = (max_hp.saturating_add(1)).div_euclid(2);
    half.saturating_add(ability_modifier(constitution)).max(1)
}

/// The six limbs at full health with no armor.
pub fn default_limbs(max_hp: i32, constitution: i32) -> Vec<Limb> {
    let hp = limb_max_hp(max_hp, constitution);
    LimbId::all().into_iter().map(|id| Limb::new(id, hp)).collect()
}

/// Level 1 hit points: the class hit die maximum plus constitution.
pub fn starting_hp(class: &str, constitution: i32) -> i32 {
    let hit_die = CharacterClass::from_id(class)
        .map(|c| c.hit_die())
        .unwrap_or(8);
    hit_die.saturating_add(ability_modifier(constitution)).max(1)
}

/// Point cost of a score; scores outside 8..=15 are clamped first.
pub fn point_buy_cost(score: i32) -> i32 {
    match score.clamp(POINT_BUY_MIN, POINT_BUY_MAX) {
        8 => 0,
        9 => 1,
        10 => 2,
        11 => 3,
        12 => 4,
        13 => 5,
        14 => 7,
        _ => 9,
    }
}

/// Experience required to reach `level`.
pub fn experience_threshold(level: u8) -> u32 {
    EXPERIENCE_THRESHOLDS[clamp_level(level) as usize - 1]
}

pub fn can_level_up(level: u8, experience: u32) -> bool {
    level < crate::character::MAX_LEVEL && experience >= experience_threshold(level + 1)
}

/// Highest level the given experience supports.
pub fn level_for_experience(experience: u32) -> u8 {
    EXPERIENCE_THRESHOLDS
        .iter()
        .rposition(|&t| experience >= t)
        .map(|i| i as u8 + 1)
        .unwrap_or(1)
}

/// How badly a limb is hurt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LimbInjury {
    None,
    Light,
    Severe,
    Destroyed,
}

impl fmt::Display for LimbInjury {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LimbInjury::None => "unhurt",
            LimbInjury::Light => "lightly injured",
            LimbInjury::Severe => "severely injured",
            LimbInjury::Destroyed => "destroyed",
        };
        write!(f, "{label}")
    }
}

pub fn limb_injury(current_hp: i32) -> LimbInjury {
    match current_hp {
        hp if hp > 0 => LimbInjury::None,
        hp if hp > -5 => LimbInjury::Light,
        hp if hp > -10 => LimbInjury::Severe,
        _ => LimbInjury::Destroyed,
    }
}

/// Exchange rate between coins `steps` apart on the 10:1 ladder.
pub fn coin_rate(steps: u32) -> u32 {
    10u32.pow(steps.min(9))
}

// ============================================================================
// Armor class
// ============================================================================

/// Bonus from an equipped shield, if any.
pub fn shield_bonus(character: &Character) -> i32 {
    character
        .inventory
        .iter()
        .find(|i| i.equipped && i.is_shield())
        .map(|shield| {
            shield
                .armor
                .as_ref()
                .map(|a| a.base_ac)
                .unwrap_or(DEFAULT_SHIELD_BONUS)
        })
        .unwrap_or(0)
}

/// Armor class from the equipped armor, dexterity and shield.
///
/// Without armor this is `10 + dex` and a shield adds nothing.
pub fn armor_class(character: &Character) -> i32 {
    let dex = character.modifier(Attribute::Dexterity);
    let Some(profile) = character.equipped_armor().and_then(|i| i.armor.as_ref()) else {
        return dex.saturating_add(10);
    };
    let applied_dex = match (profile.dex_modifier, profile.max_dex_modifier) {
        (false, _) => 0,
        (true, Some(cap)) => dex.min(cap),
        (true, None) => dex,
    };
    profile
        .base_ac
        .saturating_add(applied_dex)
        .saturating_add(shield_bonus(character))
}

/// Per-limb AC granted by the equipped armor; uncovered limbs get 0.
pub fn limb_ac(character: &Character, limb: LimbId) -> i32 {
    character
        .equipped_armor()
        .and_then(|i| i.armor.as_ref())
        .and_then(|profile| profile.limb_ac.get(&limb).copied())
        .unwrap_or(0)
}

// ============================================================================
// Spell preparation
// ============================================================================

/// How many spells of `level` may be prepared, or `None` for no limit.
///
/// An explicit per-level cap wins; otherwise the cap is the number of slots
/// the character's spell slot resources of that level provide. Cantrips are
/// never limited.
pub fn preparation_cap(character: &Character, level: u8) -> Option<u32> {
    if level == 0 {
        return None;
    }
    if let Some(cap) = character.max_prepared_spells.get(&level) {
        return Some(*cap);
    }
    let slots: i32 = character
        .resources
        .iter()
        .filter(|r| r.spell_slot_level == Some(level))
        .map(|r| r.max.max(0))
        .sum();
    Some(slots as u32)
}

pub fn prepared_count(character: &Character, level: u8) -> u32 {
    character
        .spells
        .iter()
        .filter(|s| s.level == level && s.prepared)
        .count() as u32
}

pub fn knows_school(character: &Character, school: &str) -> bool {
    character
        .known_schools
        .iter()
        .any(|s| s.eq_ignore_ascii_case(school.trim()))
}
