//! Character builder for new sheets.
//!
//! Collects name, class, race, background, ability scores and skill picks,
//! validates them, and produces a level 1 character with its derived fields
//! seeded: HP from class and constitution, AC from dexterity, default limbs,
//! class resources and sanity at its maximum.

use crate::character::{Attribute, Attributes, Character, Skill};
use crate::class_data::CharacterClass;
use crate::migrate;
use crate::rules::{self, POINT_BUY_BUDGET, POINT_BUY_MAX, POINT_BUY_MIN};
use rand::Rng;
use thiserror::Error;

/// Method for determining ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbilityMethod {
    /// Standard array: 15, 14, 13, 12, 10, 8
    #[default]
    StandardArray,
    /// Point buy: 27 points, scores 8-15
    PointBuy,
    /// Roll 4d6, drop lowest, 6 times
    Rolled,
}

impl AbilityMethod {
    pub fn name(&self) -> &'static str {
        match self {
            AbilityMethod::StandardArray => "Standard Array",
            AbilityMethod::PointBuy => "Point Buy",
            AbilityMethod::Rolled => "Rolled",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AbilityMethod::StandardArray => "Assign 15, 14, 13, 12, 10, 8 to your abilities",
            AbilityMethod::PointBuy => "Spend 27 points to customize your scores (8-15 range)",
            AbilityMethod::Rolled => "Roll 4d6, drop the lowest die, six times",
        }
    }

    pub fn all() -> &'static [AbilityMethod] {
        &[
            AbilityMethod::StandardArray,
            AbilityMethod::PointBuy,
            AbilityMethod::Rolled,
        ]
    }
}

/// Standard array values.
pub const STANDARD_ARRAY: [i32; 6] = [15, 14, 13, 12, 10, 8];

/// Error from character building.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("Character name is required")]
    MissingName,
    #[error("Class selection is required")]
    MissingClass,
    #[error("Race selection is required")]
    MissingRace,
    #[error("Ability scores are required")]
    MissingAbilityScores,
    #[error("Expected {expected} skills, got {got}")]
    InvalidSkillCount { expected: usize, got: usize },
    #[error("Skill {} is not available for this class", .0.name())]
    SkillNotAvailable(Skill),
    #[error("Invalid point buy: {0}")]
    InvalidPointBuy(String),
    #[error("Scores must use each standard array value exactly once")]
    InvalidStandardArray,
}

/// Running point-buy budget.
///
/// Starts with every score at 8 and refuses changes that leave the 8-15
/// range or overspend the budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointBuy {
    scores: Attributes,
}

impl Default for PointBuy {
    fn default() -> Self {
        Self::new()
    }
}

impl PointBuy {
    pub fn new() -> Self {
        Self {
            scores: Attributes::uniform(POINT_BUY_MIN),
        }
    }

    /// Points spent so far.
    pub fn cost(&self) -> i32 {
        Attribute::all()
            .into_iter()
            .map(|a| rules::point_buy_cost(self.scores.get(a)))
            .sum()
    }

    pub fn remaining(&self) -> i32 {
        POINT_BUY_BUDGET - self.cost()
    }

    pub fn can_increase(&self, attribute: Attribute) -> bool {
        let score = self.scores.get(attribute);
        score < POINT_BUY_MAX
            && rules::point_buy_cost(score + 1) - rules::point_buy_cost(score) <= self.remaining()
    }

    pub fn increase(&mut self, attribute: Attribute) -> bool {
        if !self.can_increase(attribute) {
            return false;
        }
        self.scores.set(attribute, self.scores.get(attribute) + 1);
        true
    }

    pub fn decrease(&mut self, attribute: Attribute) -> bool {
        let score = self.scores.get(attribute);
        if score <= POINT_BUY_MIN {
            return false;
        }
        self.scores.set(attribute, score - 1);
        true
    }

    /// Set one score directly. Out-of-range scores and changes that would
    /// overspend are refused.
    pub fn set(&mut self, attribute: Attribute, score: i32) -> bool {
        if !(POINT_BUY_MIN..=POINT_BUY_MAX).contains(&score) {
            return false;
        }
        let before = self.scores.get(attribute);
        self.scores.set(attribute, score);
        if self.remaining() < 0 {
            self.scores.set(attribute, before);
            return false;
        }
        true
    }

    pub fn scores(&self) -> Attributes {
        self.scores
    }
}

/// Builder for level 1 characters.
#[derive(Debug, Clone, Default)]
pub struct CharacterBuilder {
    name: Option<String>,
    class: Option<CharacterClass>,
    race: Option<String>,
    background: Option<String>,
    scores: Option<Attributes>,
    method: AbilityMethod,
    skills: Vec<Skill>,
    backstory: Option<String>,
}

impl CharacterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn class(mut self, class: CharacterClass) -> Self {
        self.class = Some(class);
        self
    }

    pub fn race(mut self, race: impl Into<String>) -> Self {
        self.race = Some(race.into());
        self
    }

    pub fn background(mut self, background: impl Into<String>) -> Self {
        self.background = Some(background.into());
        self
    }

    pub fn ability_method(mut self, method: AbilityMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the ability scores directly, validated against the current
    /// method on build.
    pub fn ability_scores(mut self, scores: Attributes) -> Self {
        self.scores = Some(scores);
        self
    }

    /// Set ability scores from standard array assignment.
    ///
    /// `assignment` maps each standard array value (15, 14, 13, 12, 10, 8) to an attribute.
    pub fn standard_array(mut self, assignment: [(i32, Attribute); 6]) -> Self {
        let mut scores = Attributes::uniform(0);
        for (value, attribute) in assignment {
            scores.set(attribute, value);
        }
        self.scores = Some(scores);
        self.method = AbilityMethod::StandardArray;
        self
    }

    pub fn point_buy(mut self, point_buy: &PointBuy) -> Self {
        self.scores = Some(point_buy.scores());
        self.method = AbilityMethod::PointBuy;
        self
    }

    pub fn rolled(mut self, scores: Attributes) -> Self {
        self.scores = Some(scores);
        self.method = AbilityMethod::Rolled;
        self
    }

    /// Skills chosen from the class options.
    pub fn skills(mut self, skills: Vec<Skill>) -> Self {
        self.skills = skills;
        self
    }

    pub fn backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = Some(backstory.into());
        self
    }

    /// Build the character, returning an error if any required field is missing.
    pub fn build(self) -> Result<Character, BuilderError> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or(BuilderError::MissingName)?;
        let class = self.class.ok_or(BuilderError::MissingClass)?;
        let race = self
            .race
            .filter(|r| !r.trim().is_empty())
            .ok_or(BuilderError::MissingRace)?;
        let scores = self.scores.ok_or(BuilderError::MissingAbilityScores)?;

        match self.method {
            AbilityMethod::StandardArray => validate_standard_array(&scores)?,
            AbilityMethod::PointBuy => validate_point_buy(&scores)?,
            AbilityMethod::Rolled => {}
        }

        let class_data = class.data();
        if self.skills.len() != class_data.skill_count {
            return Err(BuilderError::InvalidSkillCount {
                expected: class_data.skill_count,
                got: self.skills.len(),
            });
        }
        if let Some(skill) = self
            .skills
            .iter()
            .find(|s| !class_data.skill_options.contains(s))
        {
            return Err(BuilderError::SkillNotAvailable(*skill));
        }

        let mut character = Character::new(name.trim());
        character.class = class.id().to_string();
        character.race = race.trim().to_string();
        character.background = self.background.unwrap_or_default();
        character.backstory = self.backstory.unwrap_or_default();
        character.attributes = scores;

        character.max_hp = rules::starting_hp(&character.class, scores.constitution);
        character.current_hp = character.max_hp;
        character.limbs = rules::default_limbs(character.max_hp, scores.constitution);
        character.armor_class = 10 + rules::ability_modifier(scores.dexterity);
        character.max_sanity = rules::max_sanity(&character.class, scores.wisdom, 1);
        character.sanity = character.max_sanity;

        for entry in &mut character.skills {
            if self.skills.contains(&entry.id) {
                entry.proficient = true;
            }
        }

        // Abilities point at their resource by index until ids exist.
        for (ability, resource) in class_data.abilities {
            let ability = match resource.and_then(|i| class_data.resources.get(i)) {
                Some(resource) => ability.costing(resource.id.clone(), 1),
                None => ability,
            };
            character.abilities.push(ability);
        }
        character.resources = class_data.resources;

        Ok(migrate::normalize(character))
    }
}

/// Roll 4d6, drop lowest, for ability score generation.
pub fn roll_4d6_drop_lowest() -> i32 {
    let mut rng = rand::thread_rng();
    let mut rolls: Vec<i32> = (0..4).map(|_| rng.gen_range(1..=6)).collect();
    rolls.sort();
    rolls[1..].iter().sum()
}

/// Roll a full set of ability scores (6 values).
pub fn roll_ability_scores() -> [i32; 6] {
    let mut scores = [0; 6];
    for score in &mut scores {
        *score = roll_4d6_drop_lowest();
    }
    scores.sort_by(|a, b| b.cmp(a)); // Sort descending
    scores
}

/// Validate point buy scores.
pub fn validate_point_buy(scores: &Attributes) -> Result<(), BuilderError> {
    let mut total_cost = 0;

    for attribute in Attribute::all() {
        let score = scores.get(attribute);
        if !(POINT_BUY_MIN..=POINT_BUY_MAX).contains(&score) {
            return Err(BuilderError::InvalidPointBuy(format!(
                "{} score {score} is out of range ({POINT_BUY_MIN}-{POINT_BUY_MAX})",
                attribute.abbreviation()
            )));
        }
        total_cost += rules::point_buy_cost(score);
    }

    if total_cost > POINT_BUY_BUDGET {
        return Err(BuilderError::InvalidPointBuy(format!(
            "Total point cost {total_cost} exceeds maximum {POINT_BUY_BUDGET}"
        )));
    }

    Ok(())
}

fn validate_standard_array(scores: &Attributes) -> Result<(), BuilderError> {
    let mut values: Vec<i32> = Attribute::all().into_iter().map(|a| scores.get(a)).collect();
    values.sort_by(|a, b| b.cmp(a));
    if values == STANDARD_ARRAY {
        Ok(())
    } else {
        Err(BuilderError::InvalidStandardArray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::LimbId;

    fn fighter_array() -> [(i32, Attribute); 6] {
        [
            (15, Attribute::Strength),
            (14, Attribute::Constitution),
            (13, Attribute::Dexterity),
            (12, Attribute::Wisdom),
            (10, Attribute::Intelligence),
            (8, Attribute::Charisma),
        ]
    }

    fn fighter() -> CharacterBuilder {
        CharacterBuilder::new()
            .name("Thorin")
            .race("Dwarf")
            .class(CharacterClass::Fighter)
            .background("Soldier")
            .standard_array(fighter_array())
            .skills(vec![Skill::Athletics, Skill::Perception])
    }

    #[test]
    fn test_build_fighter() {
        let character = fighter().build().expect("Should build successfully");

        assert_eq!(character.name, "Thorin");
        assert_eq!(character.class, "fighter");
        assert_eq!(character.level, 1);
        assert_eq!(character.proficiency_bonus, 2);
        // HP = 10 (fighter) + 2 (CON mod)
        assert_eq!(character.max_hp, 12);
        assert_eq!(character.current_hp, 12);
        // AC = 10 + 1 (DEX mod)
        assert_eq!(character.armor_class, 11);
        // ceil(12 / 2) + 2
        assert_eq!(character.limb(LimbId::Head).map(|l| l.max_hp), Some(8));
        // 50 base + (12 - 10) / 2 * 5
        assert_eq!(character.max_sanity, 55);
        assert_eq!(character.sanity, 55);

        let proficient: Vec<Skill> = character
            .skills
            .iter()
            .filter(|s| s.proficient)
            .map(|s| s.id)
            .collect();
        assert_eq!(proficient, vec![Skill::Athletics, Skill::Perception]);
    }

    #[test]
    fn test_class_abilities_link_resources() {
        let character = fighter().build().expect("Should build successfully");
        let second_wind = character
            .abilities
            .iter()
            .find(|a| a.name == "Second Wind")
            .expect("fighter has Second Wind");
        let resource_id = second_wind.resource.clone().expect("linked to a resource");
        assert!(character.resource(&resource_id).is_some());
        assert_eq!(second_wind.cost, 1);
    }

    #[test]
    fn test_wizard_gets_spell_slots() {
        let character = CharacterBuilder::new()
            .name("Merlin")
            .race("Human")
            .class(CharacterClass::Wizard)
            .standard_array([
                (15, Attribute::Intelligence),
                (14, Attribute::Constitution),
                (13, Attribute::Dexterity),
                (12, Attribute::Wisdom),
                (10, Attribute::Strength),
                (8, Attribute::Charisma),
            ])
            .skills(vec![Skill::Arcana, Skill::Investigation])
            .build()
            .expect("Should build successfully");

        let slots = character
            .resources
            .iter()
            .find(|r| r.spell_slot_level == Some(1))
            .expect("wizard has first level slots");
        assert_eq!(slots.current, 2);
        // HP = 6 (wizard) + 2 (CON mod)
        assert_eq!(character.max_hp, 8);
    }

    #[test]
    fn test_missing_fields() {
        let result = CharacterBuilder::new()
            .race("Human")
            .class(CharacterClass::Fighter)
            .standard_array(fighter_array())
            .build();
        assert_eq!(result.unwrap_err(), BuilderError::MissingName);

        let result = CharacterBuilder::new().name("   ").build();
        assert_eq!(result.unwrap_err(), BuilderError::MissingName);

        let result = CharacterBuilder::new().name("No Class").build();
        assert_eq!(result.unwrap_err(), BuilderError::MissingClass);

        let result = CharacterBuilder::new()
            .name("No Race")
            .class(CharacterClass::Rogue)
            .build();
        assert_eq!(result.unwrap_err(), BuilderError::MissingRace);

        let result = CharacterBuilder::new()
            .name("No Scores")
            .class(CharacterClass::Rogue)
            .race("Halfling")
            .build();
        assert_eq!(result.unwrap_err(), BuilderError::MissingAbilityScores);
    }

    #[test]
    fn test_wrong_skill_count_error() {
        let result = fighter().skills(vec![Skill::Athletics]).build();
        assert_eq!(
            result.unwrap_err(),
            BuilderError::InvalidSkillCount {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn test_skill_not_available() {
        let result = fighter()
            .skills(vec![Skill::Athletics, Skill::Arcana])
            .build();
        assert_eq!(
            result.unwrap_err(),
            BuilderError::SkillNotAvailable(Skill::Arcana)
        );
    }

    #[test]
    fn test_standard_array_must_be_a_permutation() {
        let result = fighter()
            .standard_array([
                (15, Attribute::Strength),
                (15, Attribute::Constitution),
                (13, Attribute::Dexterity),
                (12, Attribute::Wisdom),
                (10, Attribute::Intelligence),
                (8, Attribute::Charisma),
            ])
            .build();
        assert_eq!(result.unwrap_err(), BuilderError::InvalidStandardArray);
    }

    #[test]
    fn test_point_buy_validation() {
        // Valid point buy
        let valid = Attributes::new(15, 14, 13, 12, 10, 8);
        assert!(validate_point_buy(&valid).is_ok());

        // Too expensive
        let expensive = Attributes::new(15, 15, 15, 15, 8, 8);
        assert!(validate_point_buy(&expensive).is_err());

        // Out of range
        let out_of_range = Attributes::new(16, 14, 13, 12, 10, 8);
        assert!(validate_point_buy(&out_of_range).is_err());
    }

    #[test]
    fn test_point_buy_tracker() {
        let mut point_buy = PointBuy::new();
        assert_eq!(point_buy.cost(), 0);
        assert_eq!(point_buy.remaining(), 27);
        assert!(!point_buy.decrease(Attribute::Strength));

        assert!(point_buy.set(Attribute::Strength, 15));
        assert!(point_buy.set(Attribute::Dexterity, 15));
        assert!(point_buy.set(Attribute::Constitution, 15));
        assert_eq!(point_buy.remaining(), 0);
        assert!(!point_buy.can_increase(Attribute::Wisdom));
        assert!(!point_buy.increase(Attribute::Wisdom));
        assert!(!point_buy.set(Attribute::Wisdom, 9));
        assert!(!point_buy.set(Attribute::Wisdom, 16));

        assert!(point_buy.decrease(Attribute::Strength));
        assert_eq!(point_buy.remaining(), 2);
        assert!(point_buy.increase(Attribute::Wisdom));
        assert_eq!(point_buy.scores().wisdom, 9);

        let character = fighter()
            .point_buy(&point_buy)
            .build()
            .expect("Should build successfully");
        assert_eq!(character.attributes.strength, 14);
    }

    #[test]
    fn test_roll_4d6_drop_lowest() {
        for _ in 0..100 {
            let score = roll_4d6_drop_lowest();
            assert!((3..=18).contains(&score));
        }
        let scores = roll_ability_scores();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_build_with_backstory() {
        let backstory = "A former soldier who left the army after witnessing too much bloodshed.";
        let character = fighter()
            .backstory(backstory)
            .build()
            .expect("Should build successfully");
        assert_eq!(character.backstory, backstory);
        assert_eq!(character.background, "Soldier");
    }
}
