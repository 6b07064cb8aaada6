//! Class catalog used by character creation and the sanity derivation.
//!
//! Characters store their class as a free string id; this module maps the
//! twelve known ids to hit dice, mental strength, skill choices and the
//! resources and abilities a level 1 character starts with.

use crate::character::{Ability, Recharge, Resource, Skill};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mental strength for class ids not in the catalog.
pub const DEFAULT_MENTAL_STRENGTH: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterClass {
    Barbarian,
    Bard,
    Cleric,
    Druid,
    Fighter,
    Monk,
    Paladin,
    Ranger,
    Rogue,
    Sorcerer,
    Warlock,
    Wizard,
}

/// Class-specific data for character creation.
pub struct ClassData {
    /// Number of skills to choose.
    pub skill_count: usize,
    /// Skills available to choose from.
    pub skill_options: &'static [Skill],
    /// Starting HP at level 1 (hit die max, before CON modifier).
    pub base_hp: i32,
    /// Base of the sanity pool before wisdom and level.
    pub mental_strength: i32,
    /// Counters the class starts with (rage, ki, spell slots...).
    pub resources: Vec<Resource>,
    /// Level 1 abilities; `resource` holds the index into `resources`.
    pub abilities: Vec<(Ability, Option<usize>)>,
}

impl CharacterClass {
    /// Look up a class by its stored id, ignoring case and surrounding space.
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim().to_lowercase();
        Self::all().iter().copied().find(|c| c.id() == id)
    }

    pub fn id(&self) -> &'static str {
        match self {
            CharacterClass::Barbarian => "barbarian",
            CharacterClass::Bard => "bard",
            CharacterClass::Cleric => "cleric",
            CharacterClass::Druid => "druid",
            CharacterClass::Fighter => "fighter",
            CharacterClass::Monk => "monk",
            CharacterClass::Paladin => "paladin",
            CharacterClass::Ranger => "ranger",
            CharacterClass::Rogue => "rogue",
            CharacterClass::Sorcerer => "sorcerer",
            CharacterClass::Warlock => "warlock",
            CharacterClass::Wizard => "wizard",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CharacterClass::Barbarian => "Barbarian",
            CharacterClass::Bard => "Bard",
            CharacterClass::Cleric => "Cleric",
            CharacterClass::Druid => "Druid",
            CharacterClass::Fighter => "Fighter",
            CharacterClass::Monk => "Monk",
            CharacterClass::Paladin => "Paladin",
            CharacterClass::Ranger => "Ranger",
            CharacterClass::Rogue => "Rogue",
            CharacterClass::Sorcerer => "Sorcerer",
            CharacterClass::Warlock => "Warlock",
            CharacterClass::Wizard => "Wizard",
        }
    }

    pub fn mental_strength(&self) -> i32 {
        match self {
            CharacterClass::Barbarian | CharacterClass::Rogue => 45,
            CharacterClass::Bard | CharacterClass::Wizard => 55,
            CharacterClass::Cleric | CharacterClass::Monk => 65,
            CharacterClass::Druid | CharacterClass::Paladin => 60,
            CharacterClass::Fighter | CharacterClass::Ranger | CharacterClass::Sorcerer => 50,
            CharacterClass::Warlock => 35,
        }
    }

    pub fn hit_die(&self) -> i32 {
        match self {
            CharacterClass::Barbarian => 12,
            CharacterClass::Fighter | CharacterClass::Paladin | CharacterClass::Ranger => 10,
            CharacterClass::Sorcerer | CharacterClass::Wizard => 6,
            _ => 8,
        }
    }

    /// Spell slots at level 1, if the class casts from the start.
    pub fn first_level_slots(&self) -> Option<i32> {
        match self {
            CharacterClass::Warlock => Some(1),
            CharacterClass::Bard
            | CharacterClass::Cleric
            | CharacterClass::Druid
            | CharacterClass::Sorcerer
            | CharacterClass::Wizard => Some(2),
            _ => None,
        }
    }

    /// Get class data for character creation.
    pub fn data(&self) -> ClassData {
        let mut resources = Vec::new();
        let mut abilities = Vec::new();

        match self {
            CharacterClass::Barbarian => {
                resources.push(Resource::new("Rage", 2));
                abilities.push((
                    Ability::new("Rage").described(
                        "Enter a rage as a bonus action: advantage on STR checks and resistance to physical damage.",
                    ),
                    Some(0),
                ));
            }
            CharacterClass::Bard => {
                resources.push(Resource::new("Bardic Inspiration", 3));
                abilities.push((
                    Ability::new("Bardic Inspiration")
                        .described("Give one creature a d6 to add to a check, attack or save."),
                    Some(0),
                ));
            }
            CharacterClass::Fighter => {
                resources.push(Resource::new("Second Wind", 1).recharging(Recharge::ShortRest));
                abilities.push((
                    Ability::new("Second Wind")
                        .described("As a bonus action, regain 1d10 + fighter level HP."),
                    Some(0),
                ));
            }
            CharacterClass::Monk => {
                abilities.push((
                    Ability::new("Martial Arts")
                        .described("Use DEX for unarmed strikes; unarmed damage is 1d4."),
                    None,
                ));
            }
            CharacterClass::Paladin => {
                resources.push(Resource::new("Lay on Hands", 5));
                resources.push(Resource::new("Divine Sense", 1));
                abilities.push((
                    Ability::new("Divine Sense")
                        .described("Sense celestials, fiends and undead within 60 feet."),
                    Some(1),
                ));
            }
            CharacterClass::Ranger => {
                abilities.push((
                    Ability::new("Favored Enemy")
                        .described("Advantage on tracking and recalling lore about one enemy type."),
                    None,
                ));
            }
            CharacterClass::Rogue => {
                abilities.push((
                    Ability::new("Sneak Attack").described(
                        "Once per turn, deal an extra 1d6 damage with advantage or an ally adjacent to the target.",
                    ),
                    None,
                ));
            }
            CharacterClass::Wizard => {
                resources.push(Resource::new("Arcane Recovery", 1));
                abilities.push((
                    Ability::new("Arcane Recovery")
                        .described("During a short rest, recover spell slots of combined level up to half your wizard level."),
                    Some(0),
                ));
            }
            CharacterClass::Cleric | CharacterClass::Druid | CharacterClass::Sorcerer => {}
            CharacterClass::Warlock => {}
        }

        if let Some(slots) = self.first_level_slots() {
            let mut pool = Resource::spell_slots(1, slots);
            if *self == CharacterClass::Warlock {
                pool = pool.recharging(Recharge::ShortRest);
            }
            resources.push(pool);
        }

        ClassData {
            skill_count: match self {
                CharacterClass::Rogue => 4,
                CharacterClass::Bard | CharacterClass::Ranger => 3,
                _ => 2,
            },
            skill_options: self.skill_options(),
            base_hp: self.hit_die(),
            mental_strength: self.mental_strength(),
            resources,
            abilities,
        }
    }

    fn skill_options(&self) -> &'static [Skill] {
        match self {
            CharacterClass::Barbarian => &[
                Skill::AnimalHandling,
                Skill::Athletics,
                Skill::Intimidation,
                Skill::Nature,
                Skill::Perception,
                Skill::Survival,
            ],
            CharacterClass::Bard => &[
                Skill::Acrobatics, Skill::AnimalHandling, Skill::Arcana, Skill::Athletics,
                Skill::Deception, Skill::History, Skill::Insight, Skill::Intimidation,
                Skill::Investigation, Skill::Medicine, Skill::Nature, Skill::Perception,
                Skill::Performance, Skill::Persuasion, Skill::Religion, Skill::SleightOfHand,
                Skill::Stealth, Skill::Survival,
            ],
            CharacterClass::Cleric => &[
                Skill::History,
                Skill::Insight,
                Skill::Medicine,
                Skill::Persuasion,
                Skill::Religion,
            ],
            CharacterClass::Druid => &[
                Skill::Arcana,
                Skill::AnimalHandling,
                Skill::Insight,
                Skill::Medicine,
                Skill::Nature,
                Skill::Perception,
                Skill::Religion,
                Skill::Survival,
            ],
            CharacterClass::Fighter => &[
                Skill::Acrobatics,
                Skill::AnimalHandling,
                Skill::Athletics,
                Skill::History,
                Skill::Insight,
                Skill::Intimidation,
                Skill::Perception,
                Skill::Survival,
            ],
            CharacterClass::Monk => &[
                Skill::Acrobatics,
                Skill::Athletics,
                Skill::History,
                Skill::Insight,
                Skill::Religion,
                Skill::Stealth,
            ],
            CharacterClass::Paladin => &[
                Skill::Athletics,
                Skill::Insight,
                Skill::Intimidation,
                Skill::Medicine,
                Skill::Persuasion,
                Skill::Religion,
            ],
            CharacterClass::Ranger => &[
                Skill::AnimalHandling,
                Skill::Athletics,
                Skill::Insight,
                Skill::Investigation,
                Skill::Nature,
                Skill::Perception,
                Skill::Stealth,
                Skill::Survival,
            ],
            CharacterClass::Rogue => &[
                Skill::Acrobatics,
                Skill::Athletics,
                Skill::Deception,
                Skill::Insight,
                Skill::Intimidation,
                Skill::Investigation,
                Skill::Perception,
                Skill::Performance,
                Skill::Persuasion,
                Skill::SleightOfHand,
                Skill::Stealth,
            ],
            CharacterClass::Sorcerer => &[
                Skill::Arcana,
                Skill::Deception,
                Skill::Insight,
                Skill::Intimidation,
                Skill::Persuasion,
                Skill::Religion,
            ],
            CharacterClass::Warlock => &[
                Skill::Arcana,
                Skill::Deception,
                Skill::History,
                Skill::Intimidation,
                Skill::Investigation,
                Skill::Nature,
                Skill::Religion,
            ],
            CharacterClass::Wizard => &[
                Skill::Arcana,
                Skill::History,
                Skill::Insight,
                Skill::Investigation,
                Skill::Medicine,
                Skill::Religion,
            ],
        }
    }

    /// Get all character classes.
    pub fn all() -> &'static [CharacterClass] {
        &[
            CharacterClass::Barbarian,
            CharacterClass::Bard,
            CharacterClass::Cleric,
            CharacterClass::Druid,
            CharacterClass::Fighter,
            CharacterClass::Monk,
            CharacterClass::Paladin,
            CharacterClass::Ranger,
            CharacterClass::Rogue,
            CharacterClass::Sorcerer,
            CharacterClass::Warlock,
            CharacterClass::Wizard,
        ]
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_classes_have_data() {
        for class in CharacterClass::all() {
            let data = class.data();
            assert!(data.skill_count > 0);
            assert!(!data.skill_options.is_empty());
            assert!(data.base_hp > 0);
            for (_, index) in &data.abilities {
                if let Some(index) = index {
                    assert!(*index < data.resources.len());
                }
            }
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(CharacterClass::from_id(" Wizard "), Some(CharacterClass::Wizard));
        assert_eq!(CharacterClass::from_id("artificer"), None);
    }

    #[test]
    fn test_mental_strength_table() {
        assert_eq!(CharacterClass::Warlock.mental_strength(), 35);
        assert_eq!(CharacterClass::Cleric.mental_strength(), 65);
        assert_eq!(CharacterClass::Fighter.mental_strength(), 50);
    }

    #[test]
    fn test_fighter_data() {
        let data = CharacterClass::Fighter.data();
        assert_eq!(data.skill_count, 2);
        assert_eq!(data.base_hp, 10);
        assert!(data.resources.iter().any(|r| r.name == "Second Wind"));
    }

    #[test]
    fn test_casters_start_with_slots() {
        let wizard = CharacterClass::Wizard.data();
        let slots = wizard
            .resources
            .iter()
            .find(|r| r.spell_slot_level == Some(1))
            .expect("wizard has first level slots");
        assert_eq!(slots.max, 2);

        let warlock = CharacterClass::Warlock.data();
        let pact = warlock
            .resources
            .iter()
            .find(|r| r.spell_slot_level == Some(1))
            .expect("warlock has pact slots");
        assert_eq!(pact.max, 1);
        assert_eq!(pact.recharge, Recharge::ShortRest);

        assert!(CharacterClass::Fighter
            .data()
            .resources
            .iter()
            .all(|r| r.spell_slot_level.is_none()));
    }

    #[test]
    fn test_rogue_gets_4_skills() {
        let data = CharacterClass::Rogue.data();
        assert_eq!(data.skill_count, 4);
    }
}
