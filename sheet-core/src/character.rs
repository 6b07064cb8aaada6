//! Character sheet types.
//!
//! Contains the persisted shape of a character: attributes, skills, limbs,
//! inventory, attacks, abilities, spells, resources, currency and the change
//! history, plus the roster preview derived from it.

use crate::coerce;
use crate::rules;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Prefix of attack ids generated from equipped weapons.
pub const WEAPON_ATTACK_PREFIX: &str = "attack_weapon_";

/// Number of history entries kept on a sheet.
pub const HISTORY_LIMIT: usize = 10;

/// Highest character level.
pub const MAX_LEVEL: u8 = 20;

/// Highest spell level.
pub const MAX_SPELL_LEVEL: u8 = 9;

/// The eight schools of magic, used as the default known schools.
pub const SPELL_SCHOOLS: [&str; 8] = [
    "abjuration",
    "conjuration",
    "divination",
    "enchantment",
    "evocation",
    "illusion",
    "necromancy",
    "transmutation",
];

/// Generate a fresh id for a nested entity (item, spell, resource...).
pub fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

/// Id of the attack generated for an equipped weapon.
pub fn weapon_attack_id(item_id: &str) -> String {
    format!("{WEAPON_ATTACK_PREFIX}{item_id}")
}

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for characters.
///
/// Stored as a plain string so imported sheets keep whatever id they carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CharacterId(pub String);

impl CharacterId {
    pub fn new() -> Self {
        Self(fresh_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CharacterId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CharacterId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Attributes
// ============================================================================

/// The six attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    #[default]
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Attribute {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Attribute::Strength => "STR",
            Attribute::Dexterity => "DEX",
            Attribute::Constitution => "CON",
            Attribute::Intelligence => "INT",
            Attribute::Wisdom => "WIS",
            Attribute::Charisma => "CHA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Strength => "Strength",
            Attribute::Dexterity => "Dexterity",
            Attribute::Constitution => "Constitution",
            Attribute::Intelligence => "Intelligence",
            Attribute::Wisdom => "Wisdom",
            Attribute::Charisma => "Charisma",
        }
    }

    pub fn all() -> [Attribute; 6] {
        [
            Attribute::Strength,
            Attribute::Dexterity,
            Attribute::Constitution,
            Attribute::Intelligence,
            Attribute::Wisdom,
            Attribute::Charisma,
        ]
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// One integer per attribute. Used both for raw scores and flat bonuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    #[serde(deserialize_with = "coerce::int")]
    pub strength: i32,
    #[serde(deserialize_with = "coerce::int")]
    pub dexterity: i32,
    #[serde(deserialize_with = "coerce::int")]
    pub constitution: i32,
    #[serde(deserialize_with = "coerce::int")]
    pub intelligence: i32,
    #[serde(deserialize_with = "coerce::int")]
    pub wisdom: i32,
    #[serde(deserialize_with = "coerce::int")]
    pub charisma: i32,
}

impl Attributes {
    pub fn new(str: i32, dex: i32, con: i32, int: i32, wis: i32, cha: i32) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    /// Every attribute at `value`.
    pub fn uniform(value: i32) -> Self {
        Self::new(value, value, value, value, value, value)
    }

    /// All zeroes, the shape of an empty bonus table.
    pub fn zeroed() -> Self {
        Self::uniform(0)
    }

    pub fn get(&self, attribute: Attribute) -> i32 {
        match attribute {
            Attribute::Strength => self.strength,
            Attribute::Dexterity => self.dexterity,
            Attribute::Constitution => self.constitution,
            Attribute::Intelligence => self.intelligence,
            Attribute::Wisdom => self.wisdom,
            Attribute::Charisma => self.charisma,
        }
    }

    pub fn set(&mut self, attribute: Attribute, value: i32) {
        match attribute {
            Attribute::Strength => self.strength = value,
            Attribute::Dexterity => self.dexterity = value,
            Attribute::Constitution => self.constitution = value,
            Attribute::Intelligence => self.intelligence = value,
            Attribute::Wisdom => self.wisdom = value,
            Attribute::Charisma => self.charisma = value,
        }
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self::uniform(10)
    }
}

fn zeroed_attributes() -> Attributes {
    Attributes::zeroed()
}

// ============================================================================
// Skills
// ============================================================================

/// The fixed skill catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Skill {
    Athletics,
    Acrobatics,
    SleightOfHand,
    Stealth,
    Arcana,
    History,
    Investigation,
    Nature,
    Religion,
    AnimalHandling,
    Insight,
    Medicine,
    Perception,
    Survival,
    Deception,
    Intimidation,
    Performance,
    Persuasion,
}

impl Skill {
    pub fn attribute(&self) -> Attribute {
        match self {
            Skill::Athletics => Attribute::Strength,
            Skill::Acrobatics | Skill::SleightOfHand | Skill::Stealth => Attribute::Dexterity,
            Skill::Arcana
            | Skill::History
            | Skill::Investigation
            | Skill::Nature
            | Skill::Religion => Attribute::Intelligence,
            Skill::AnimalHandling
            | Skill::Insight
            | Skill::Medicine
            | Skill::Perception
            | Skill::Survival => Attribute::Wisdom,
            Skill::Deception | Skill::Intimidation | Skill::Performance | Skill::Persuasion => {
                Attribute::Charisma
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Skill::Athletics => "Athletics",
            Skill::Acrobatics => "Acrobatics",
            Skill::SleightOfHand => "Sleight of Hand",
            Skill::Stealth => "Stealth",
            Skill::Arcana => "Arcana",
            Skill::History => "History",
            Skill::Investigation => "Investigation",
            Skill::Nature => "Nature",
            Skill::Religion => "Religion",
            Skill::AnimalHandling => "Animal Handling",
            Skill::Insight => "Insight",
            Skill::Medicine => "Medicine",
            Skill::Perception => "Perception",
            Skill::Survival => "Survival",
            Skill::Deception => "Deception",
            Skill::Intimidation => "Intimidation",
            Skill::Performance => "Performance",
            Skill::Persuasion => "Persuasion",
        }
    }

    pub fn all() -> [Skill; 18] {
        [
            Skill::Athletics,
            Skill::Acrobatics,
            Skill::SleightOfHand,
            Skill::Stealth,
            Skill::Arcana,
            Skill::History,
            Skill::Investigation,
            Skill::Nature,
            Skill::Religion,
            Skill::AnimalHandling,
            Skill::Insight,
            Skill::Medicine,
            Skill::Perception,
            Skill::Survival,
            Skill::Deception,
            Skill::Intimidation,
            Skill::Performance,
            Skill::Persuasion,
        ]
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A skill on the sheet with its training flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillEntry {
    pub id: Skill,
    #[serde(default, deserialize_with = "coerce::or_default")]
    pub attribute: Attribute,
    #[serde(default, deserialize_with = "coerce::or_default")]
    pub proficient: bool,
    #[serde(default, deserialize_with = "coerce::or_default")]
    pub expertise: bool,
}

impl SkillEntry {
    pub fn untrained(skill: Skill) -> Self {
        Self {
            id: skill,
            attribute: skill.attribute(),
            proficient: false,
            expertise: false,
        }
    }

    /// Bonus added on top of the attribute modifier.
    pub fn proficiency(&self, proficiency_bonus: i32) -> i32 {
        match (self.proficient, self.expertise) {
            (_, true) => proficiency_bonus.saturating_mul(2),
            (true, false) => proficiency_bonus,
            (false, false) => 0,
        }
    }
}

/// The full catalog, untrained.
pub fn default_skills() -> Vec<SkillEntry> {
    Skill::all().into_iter().map(SkillEntry::untrained).collect()
}

// ============================================================================
// Limbs
// ============================================================================

/// The six tracked body locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LimbId {
    Head,
    Torso,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
}

impl LimbId {
    pub fn name(&self) -> &'static str {
        match self {
            LimbId::Head => "Head",
            LimbId::Torso => "Torso",
            LimbId::LeftArm => "Left Arm",
            LimbId::RightArm => "Right Arm",
            LimbId::LeftLeg => "Left Leg",
            LimbId::RightLeg => "Right Leg",
        }
    }

    pub fn all() -> [LimbId; 6] {
        [
            LimbId::Head,
            LimbId::Torso,
            LimbId::LeftArm,
            LimbId::RightArm,
            LimbId::LeftLeg,
            LimbId::RightLeg,
        ]
    }
}

impl fmt::Display for LimbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Hit points and armor of one body location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limb {
    pub id: LimbId,
    #[serde(rename = "currentHP", default, deserialize_with = "coerce::int")]
    pub current_hp: i32,
    #[serde(rename = "maxHP", default, deserialize_with = "coerce::int")]
    pub max_hp: i32,
    #[serde(default, deserialize_with = "coerce::int")]
    pub ac: i32,
}

impl Limb {
    pub fn new(id: LimbId, max_hp: i32) -> Self {
        Self {
            id,
            current_hp: max_hp,
            max_hp,
            ac: 0,
        }
    }

    pub fn injury(&self) -> rules::LimbInjury {
        rules::limb_injury(self.current_hp)
    }
}

// ============================================================================
// Inventory
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Armor,
    Weapon,
    Ammunition,
    #[default]
    Item,
}

/// Protection an armor item gives (or a shield).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmorProfile {
    #[serde(rename = "baseAC", default, deserialize_with = "coerce::int")]
    pub base_ac: i32,
    /// Whether the dexterity modifier applies at all.
    #[serde(default = "enabled", deserialize_with = "coerce::or_default")]
    pub dex_modifier: bool,
    #[serde(default, deserialize_with = "coerce::opt_int")]
    pub max_dex_modifier: Option<i32>,
    #[serde(rename = "limbAC", default, deserialize_with = "coerce::keyed_ints")]
    pub limb_ac: BTreeMap<LimbId, i32>,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WeaponProfile {
    #[serde(default, deserialize_with = "coerce::text")]
    pub damage: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub damage_type: String,
    #[serde(default, deserialize_with = "coerce::or_default")]
    pub ranged: bool,
}

/// Inventory item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default, deserialize_with = "coerce::text")]
    pub id: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub name: String,
    #[serde(default, deserialize_with = "coerce::or_default")]
    pub kind: ItemKind,
    #[serde(default, deserialize_with = "coerce::text")]
    pub description: String,
    #[serde(default = "one", deserialize_with = "coerce::uint")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "coerce::or_default")]
    pub weight: f32,
    #[serde(default, deserialize_with = "coerce::or_default")]
    pub equipped: bool,
    #[serde(default, deserialize_with = "coerce::or_default")]
    pub armor: Option<ArmorProfile>,
    #[serde(default, deserialize_with = "coerce::or_default")]
    pub weapon: Option<WeaponProfile>,
}

fn one() -> u32 {
    1
}

impl Item {
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: fresh_id(),
            name: name.into(),
            kind,
            description: String::new(),
            quantity: 1,
            weight: 0.0,
            equipped: false,
            armor: None,
            weapon: None,
        }
    }

    /// Body armor with a base AC; dexterity applies uncapped until told otherwise.
    pub fn armor(name: impl Into<String>, base_ac: i32) -> Self {
        let mut item = Self::new(name, ItemKind::Armor);
        item.armor = Some(ArmorProfile {
            base_ac,
            dex_modifier: true,
            max_dex_modifier: None,
            limb_ac: BTreeMap::new(),
        });
        item
    }

    /// A shield: a plain item whose name marks it as one.
    pub fn shield(name: impl Into<String>, bonus: i32) -> Self {
        let mut item = Self::new(name, ItemKind::Item);
        item.armor = Some(ArmorProfile {
            base_ac: bonus,
            dex_modifier: false,
            max_dex_modifier: None,
            limb_ac: BTreeMap::new(),
        });
        item
    }

    pub fn weapon(
        name: impl Into<String>,
        damage: impl Into<String>,
        damage_type: impl Into<String>,
    ) -> Self {
        let mut item = Self::new(name, ItemKind::Weapon);
        item.weapon = Some(WeaponProfile {
            damage: damage.into(),
            damage_type: damage_type.into(),
            ranged: false,
        });
        item
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Cap the dexterity modifier this armor allows.
    pub fn with_max_dex(mut self, cap: i32) -> Self {
        if let Some(armor) = self.armor.as_mut() {
            armor.max_dex_modifier = Some(cap);
        }
        self
    }

    /// Heavy armor: dexterity never applies.
    pub fn without_dex(mut self) -> Self {
        if let Some(armor) = self.armor.as_mut() {
            armor.dex_modifier = false;
        }
        self
    }

    pub fn covering(mut self, limb: LimbId, ac: i32) -> Self {
        if let Some(armor) = self.armor.as_mut() {
            armor.limb_ac.insert(limb, ac);
        }
        self
    }

    pub fn ranged(mut self) -> Self {
        if let Some(weapon) = self.weapon.as_mut() {
            weapon.ranged = true;
        }
        self
    }

    pub fn is_armor(&self) -> bool {
        self.kind == ItemKind::Armor
    }

    pub fn is_weapon(&self) -> bool {
        self.kind == ItemKind::Weapon
    }

    /// Shields are ordinary items recognised by name.
    pub fn is_shield(&self) -> bool {
        !self.is_armor() && !self.is_weapon() && self.name.to_lowercase().contains("shield")
    }

    pub fn is_ranged(&self) -> bool {
        self.weapon.as_ref().map(|w| w.ranged).unwrap_or(false)
    }

    /// Only consumable kinds track a meaningful stack count.
    pub fn is_stackable(&self) -> bool {
        matches!(self.kind, ItemKind::Item | ItemKind::Ammunition)
    }
}

// ============================================================================
// Combat
// ============================================================================

/// An attack line on the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attack {
    #[serde(default, deserialize_with = "coerce::text")]
    pub id: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub name: String,
    #[serde(default, deserialize_with = "coerce::int")]
    pub hit_bonus: i32,
    #[serde(default, deserialize_with = "coerce::text")]
    pub damage: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub damage_type: String,
    #[serde(default, deserialize_with = "coerce::or_default")]
    pub attribute: Attribute,
    #[serde(default, deserialize_with = "coerce::or_default")]
    pub uses_ammunition: bool,
    #[serde(default, deserialize_with = "coerce::text")]
    pub notes: String,
}

impl Attack {
    pub fn new(name: impl Into<String>, damage: impl Into<String>, attribute: Attribute) -> Self {
        Self {
            id: fresh_id(),
            name: name.into(),
            hit_bonus: 0,
            damage: damage.into(),
            damage_type: String::new(),
            attribute,
            uses_ammunition: false,
            notes: String::new(),
        }
    }

    /// The attack an equipped weapon contributes.
    pub fn from_weapon(item: &Item) -> Self {
        let weapon = item.weapon.clone().unwrap_or_default();
        let ranged = weapon.ranged;
        Self {
            id: weapon_attack_id(&item.id),
            name: item.name.clone(),
            hit_bonus: 0,
            damage: weapon.damage,
            damage_type: weapon.damage_type,
            attribute: if ranged {
                Attribute::Dexterity
            } else {
                Attribute::Strength
            },
            uses_ammunition: ranged,
            notes: String::new(),
        }
    }

    /// True for attacks owned by an equipped weapon.
    pub fn is_generated(&self) -> bool {
        self.id.starts_with(WEAPON_ATTACK_PREFIX)
    }

    /// The item id a generated attack belongs to.
    pub fn weapon_item_id(&self) -> Option<&str> {
        self.id.strip_prefix(WEAPON_ATTACK_PREFIX)
    }
}

/// A class or racial ability, optionally paid for from a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ability {
    #[serde(default, deserialize_with = "coerce::text")]
    pub id: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub name: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub description: String,
    #[serde(default, deserialize_with = "coerce::opt_text")]
    pub resource: Option<String>,
    #[serde(default, deserialize_with = "coerce::int")]
    pub cost: i32,
}

impl Ability {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: fresh_id(),
            name: name.into(),
            description: String::new(),
            resource: None,
            cost: 0,
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn costing(mut self, resource_id: impl Into<String>, cost: i32) -> Self {
        self.resource = Some(resource_id.into());
        self.cost = cost;
        self
    }
}

/// A spell in the spellbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spell {
    #[serde(default, deserialize_with = "coerce::text")]
    pub id: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub name: String,
    #[serde(default, deserialize_with = "coerce::small")]
    pub level: u8,
    #[serde(default, deserialize_with = "coerce::text")]
    pub school: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub description: String,
    #[serde(default, deserialize_with = "coerce::opt_text")]
    pub resource: Option<String>,
    #[serde(default, deserialize_with = "coerce::or_default")]
    pub prepared: bool,
}

impl Spell {
    pub fn new(name: impl Into<String>, level: u8, school: impl Into<String>) -> Self {
        Self {
            id: fresh_id(),
            name: name.into(),
            level: level.min(MAX_SPELL_LEVEL),
            school: school.into(),
            description: String::new(),
            resource: None,
            prepared: false,
        }
    }

    pub fn using_slot(mut self, resource_id: impl Into<String>) -> Self {
        self.resource = Some(resource_id.into());
        self
    }

    pub fn is_cantrip(&self) -> bool {
        self.level == 0
    }
}

// ============================================================================
// Resources
// ============================================================================

/// When a resource refills on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Recharge {
    ShortRest,
    #[default]
    LongRest,
    Manual,
}

/// A named current/max counter: rage, ki, spell slots...
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default, deserialize_with = "coerce::text")]
    pub id: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub name: String,
    #[serde(default, deserialize_with = "coerce::int")]
    pub current: i32,
    #[serde(default, deserialize_with = "coerce::int")]
    pub max: i32,
    /// Set on spell slot pools; counts toward preparation limits.
    #[serde(default, deserialize_with = "coerce::opt_small")]
    pub spell_slot_level: Option<u8>,
    #[serde(default, deserialize_with = "coerce::or_default")]
    pub recharge: Recharge,
}

impl Resource {
    pub fn new(name: impl Into<String>, max: i32) -> Self {
        Self {
            id: fresh_id(),
            name: name.into(),
            current: max,
            max,
            spell_slot_level: None,
            recharge: Recharge::LongRest,
        }
    }

    pub fn spell_slots(level: u8, max: i32) -> Self {
        let mut resource = Self::new(format!("Level {level} Spell Slots"), max);
        resource.spell_slot_level = Some(level);
        resource
    }

    pub fn recharging(mut self, recharge: Recharge) -> Self {
        self.recharge = recharge;
        self
    }
}

// ============================================================================
// Currency
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coin {
    Copper,
    Silver,
    Gold,
}

impl Coin {
    /// Position in the 10:1 ladder, copper first.
    pub fn rank(&self) -> u32 {
        match self {
            Coin::Copper => 0,
            Coin::Silver => 1,
            Coin::Gold => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Coin::Copper => "copper",
            Coin::Silver => "silver",
            Coin::Gold => "gold",
        }
    }
}

/// Three-denomination purse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Purse {
    #[serde(deserialize_with = "coerce::uint")]
    pub copper: u32,
    #[serde(deserialize_with = "coerce::uint")]
    pub silver: u32,
    #[serde(deserialize_with = "coerce::uint")]
    pub gold: u32,
}

impl Purse {
    pub fn new(copper: u32, silver: u32, gold: u32) -> Self {
        Self {
            copper,
            silver,
            gold,
        }
    }

    pub fn get(&self, coin: Coin) -> u32 {
        match coin {
            Coin::Copper => self.copper,
            Coin::Silver => self.silver,
            Coin::Gold => self.gold,
        }
    }

    pub fn set(&mut self, coin: Coin, value: u32) {
        match coin {
            Coin::Copper => self.copper = value,
            Coin::Silver => self.silver = value,
            Coin::Gold => self.gold = value,
        }
    }

    /// Add or remove coins, never going below zero.
    pub fn adjust(&mut self, coin: Coin, delta: i64) {
        let next = (self.get(coin) as i64).saturating_add(delta).clamp(0, u32::MAX as i64);
        self.set(coin, next as u32);
    }

    /// Value of the whole purse in copper.
    pub fn total_copper(&self) -> u64 {
        self.copper as u64 + self.silver as u64 * 10 + self.gold as u64 * 100
    }

    /// Exchange up to `amount` coins of `from` into `to`.
    ///
    /// Converting up only moves whole multiples of the rate; the remainder
    /// stays where it was. Returns how many `to` coins were gained.
    pub fn convert(&mut self, from: Coin, to: Coin, amount: u32) -> u32 {
        let amount = amount.min(self.get(from));
        if amount == 0 || from == to {
            return 0;
        }
        let (spent, gained) = if from.rank() < to.rank() {
            let rate = rules::coin_rate(to.rank() - from.rank());
            let gained = amount / rate;
            (gained * rate, gained)
        } else {
            let rate = rules::coin_rate(from.rank() - to.rank());
            (amount, amount.saturating_mul(rate))
        };
        self.set(from, self.get(from) - spent);
        self.set(to, self.get(to).saturating_add(gained));
        gained
    }
}

// ============================================================================
// Defenses, traits and history
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResistanceLevel {
    Resistance,
    Vulnerability,
    Immunity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resistance {
    #[serde(deserialize_with = "coerce::text")]
    pub damage_type: String,
    pub level: ResistanceLevel,
}

/// A freeform named note (racial trait, feat, quirk).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trait {
    #[serde(default, deserialize_with = "coerce::text")]
    pub id: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub name: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub description: String,
}

impl Trait {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: fresh_id(),
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HistoryCategory {
    Health,
    Sanity,
    Resource,
    Level,
    Inventory,
    Equipment,
    Currency,
    Attribute,
    Spell,
    Rest,
    #[default]
    General,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unix seconds.
    #[serde(default, deserialize_with = "coerce::or_default")]
    pub at: u64,
    #[serde(default, deserialize_with = "coerce::or_default")]
    pub category: HistoryCategory,
    #[serde(default, deserialize_with = "coerce::text")]
    pub message: String,
}

/// Change log, newest entry first, capped at [`HISTORY_LIMIT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(transparent)]
pub struct History(Vec<HistoryEntry>);

impl History {
    pub fn from_entries(mut entries: Vec<HistoryEntry>) -> Self {
        entries.truncate(HISTORY_LIMIT);
        Self(entries)
    }

    pub fn push(&mut self, at: u64, category: HistoryCategory, message: impl Into<String>) {
        self.0.insert(
            0,
            HistoryEntry {
                at,
                category,
                message: message.into(),
            },
        );
        self.0.truncate(HISTORY_LIMIT);
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.0.first()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for History {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        coerce::entries(deserializer).map(Self::from_entries)
    }
}

// ============================================================================
// Character
// ============================================================================

/// A complete character sheet.
///
/// Every field has a default so partial records still load; the migration
/// pipeline and [`crate::migrate::normalize`] fill in the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Character {
    pub id: CharacterId,
    #[serde(deserialize_with = "coerce::uint")]
    pub schema_version: u32,

    // Identity and narrative
    #[serde(deserialize_with = "coerce::text")]
    pub name: String,
    #[serde(deserialize_with = "coerce::text")]
    pub class: String,
    #[serde(deserialize_with = "coerce::text")]
    pub subclass: String,
    #[serde(deserialize_with = "coerce::text")]
    pub race: String,
    #[serde(deserialize_with = "coerce::text")]
    pub background: String,
    #[serde(deserialize_with = "coerce::text")]
    pub alignment: String,
    #[serde(deserialize_with = "coerce::text")]
    pub backstory: String,
    #[serde(deserialize_with = "coerce::text")]
    pub appearance: String,
    #[serde(deserialize_with = "coerce::text")]
    pub personality: String,
    #[serde(deserialize_with = "coerce::text")]
    pub notes: String,
    #[serde(deserialize_with = "coerce::opt_text")]
    pub avatar: Option<String>,

    // Progression
    #[serde(deserialize_with = "coerce::small")]
    pub level: u8,
    #[serde(deserialize_with = "coerce::uint")]
    pub experience: u32,
    #[serde(deserialize_with = "coerce::int")]
    pub proficiency_bonus: i32,

    // Vitals
    #[serde(rename = "currentHP", deserialize_with = "coerce::int")]
    pub current_hp: i32,
    #[serde(rename = "maxHP", deserialize_with = "coerce::int")]
    pub max_hp: i32,
    #[serde(rename = "tempHP", deserialize_with = "coerce::int")]
    pub temp_hp: i32,
    #[serde(rename = "maxHPBonus", deserialize_with = "coerce::int")]
    pub max_hp_bonus: i32,
    #[serde(deserialize_with = "coerce::int")]
    pub sanity: i32,
    #[serde(deserialize_with = "coerce::int")]
    pub max_sanity: i32,

    // Defense
    #[serde(deserialize_with = "coerce::int")]
    pub armor_class: i32,
    #[serde(deserialize_with = "coerce::entries")]
    pub limbs: Vec<Limb>,
    #[serde(deserialize_with = "coerce::entries")]
    pub resistances: Vec<Resistance>,

    // Attributes and skills
    #[serde(deserialize_with = "coerce::or_default")]
    pub attributes: Attributes,
    #[serde(default = "zeroed_attributes", deserialize_with = "zeroed_or_attributes")]
    pub attribute_bonuses: Attributes,
    #[serde(deserialize_with = "coerce::entries")]
    pub skills: Vec<SkillEntry>,

    // Combat
    #[serde(deserialize_with = "coerce::entries")]
    pub attacks: Vec<Attack>,
    #[serde(deserialize_with = "coerce::entries")]
    pub abilities: Vec<Ability>,
    #[serde(deserialize_with = "coerce::entries")]
    pub resources: Vec<Resource>,

    // Spellbook
    #[serde(deserialize_with = "coerce::entries")]
    pub spells: Vec<Spell>,
    #[serde(deserialize_with = "coerce::entries")]
    pub known_schools: Vec<String>,
    #[serde(deserialize_with = "coerce::level_caps")]
    pub max_prepared_spells: BTreeMap<u8, u32>,

    // Possessions
    #[serde(deserialize_with = "coerce::entries")]
    pub inventory: Vec<Item>,
    #[serde(deserialize_with = "coerce::or_default")]
    pub currency: Purse,

    #[serde(deserialize_with = "coerce::entries")]
    pub traits: Vec<Trait>,
    pub history: History,
}

fn zeroed_or_attributes<'de, D>(deserializer: D) -> Result<Attributes, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(Attributes::zeroed());
    }
    // Missing bonuses are zero, not the score default of 10.
    let mut bonuses = Attributes::zeroed();
    for attribute in Attribute::all() {
        if let Some(v) = value.get(attribute.name().to_lowercase()) {
            bonuses.set(attribute, coerce::int_or(v, 0));
        }
    }
    Ok(bonuses)
}

impl Default for Character {
    /// A blank record: the backfill source for missing fields.
    fn default() -> Self {
        Self {
            id: CharacterId::default(),
            schema_version: 0,
            name: String::new(),
            class: String::new(),
            subclass: String::new(),
            race: String::new(),
            background: String::new(),
            alignment: String::new(),
            backstory: String::new(),
            appearance: String::new(),
            personality: String::new(),
            notes: String::new(),
            avatar: None,
            level: 1,
            experience: 0,
            proficiency_bonus: rules::proficiency_bonus(1),
            current_hp: 0,
            max_hp: 0,
            temp_hp: 0,
            max_hp_bonus: 0,
            sanity: 0,
            max_sanity: 0,
            armor_class: 10,
            limbs: Vec::new(),
            resistances: Vec::new(),
            attributes: Attributes::default(),
            attribute_bonuses: Attributes::zeroed(),
            skills: Vec::new(),
            attacks: Vec::new(),
            abilities: Vec::new(),
            resources: Vec::new(),
            spells: Vec::new(),
            known_schools: Vec::new(),
            max_prepared_spells: BTreeMap::new(),
            inventory: Vec::new(),
            currency: Purse::default(),
            traits: Vec::new(),
            history: History::default(),
        }
    }
}

impl Character {
    /// A fresh level 1 sheet with derived defaults seeded.
    pub fn new(name: impl Into<String>) -> Self {
        let mut character = Self {
            id: CharacterId::new(),
            schema_version: crate::migrate::CURRENT_SCHEMA_VERSION,
            name: name.into(),
            max_hp: 10,
            current_hp: 10,
            skills: default_skills(),
            known_schools: SPELL_SCHOOLS.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        };
        character.limbs = rules::default_limbs(character.max_hp, character.attributes.constitution);
        character.armor_class = character.modifier(Attribute::Dexterity).saturating_add(10);
        character.max_sanity = rules::max_sanity(
            &character.class,
            character.attributes.wisdom,
            character.level,
        );
        character.sanity = character.max_sanity;
        character
    }

    /// Attribute modifier with the flat bonus layered on top.
    pub fn modifier(&self, attribute: Attribute) -> i32 {
        rules::ability_modifier(self.attributes.get(attribute))
            .saturating_add(self.attribute_bonuses.get(attribute))
    }

    /// Total modifier for a skill check.
    pub fn skill_modifier(&self, skill: Skill) -> i32 {
        let training = self
            .skills
            .iter()
            .find(|s| s.id == skill)
            .map(|s| s.proficiency(self.proficiency_bonus))
            .unwrap_or(0);
        self.modifier(skill.attribute()).saturating_add(training)
    }

    /// Hit point ceiling including the max HP bonus.
    pub fn effective_max_hp(&self) -> i32 {
        self.max_hp.saturating_add(self.max_hp_bonus)
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.inventory.iter().find(|i| i.id == id)
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn limb(&self, id: LimbId) -> Option<&Limb> {
        self.limbs.iter().find(|l| l.id == id)
    }

    /// The armor currently worn, if any.
    pub fn equipped_armor(&self) -> Option<&Item> {
        self.inventory.iter().find(|i| i.is_armor() && i.equipped)
    }

    pub fn equipped_weapons(&self) -> impl Iterator<Item = &Item> {
        self.inventory.iter().filter(|i| i.is_weapon() && i.equipped)
    }

    pub fn can_level_up(&self) -> bool {
        rules::can_level_up(self.level, self.experience)
    }

    pub fn preview(&self) -> CharacterPreview {
        CharacterPreview::from(self)
    }
}

/// A roster entry: enough of a character to list it without loading it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterPreview {
    pub id: CharacterId,
    #[serde(default, deserialize_with = "coerce::text")]
    pub name: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub class: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub subclass: String,
    #[serde(default = "first_level", deserialize_with = "coerce::small")]
    pub level: u8,
    #[serde(rename = "currentHP", default, deserialize_with = "coerce::int")]
    pub current_hp: i32,
    #[serde(rename = "maxHP", default, deserialize_with = "coerce::int")]
    pub max_hp: i32,
    #[serde(default, deserialize_with = "coerce::opt_text")]
    pub avatar: Option<String>,
    #[serde(default, deserialize_with = "coerce::entries")]
    pub resistances: Vec<Resistance>,
}

fn first_level() -> u8 {
    1
}

impl From<&Character> for CharacterPreview {
    fn from(character: &Character) -> Self {
        Self {
            id: character.id.clone(),
            name: character.name.clone(),
            class: character.class.clone(),
            subclass: character.subclass.clone(),
            level: character.level,
            current_hp: character.current_hp,
            max_hp: character.max_hp,
            avatar: character.avatar.clone(),
            resistances: character.resistances.clone(),
        }
    }
}

/// Free-text fields editable from the notes tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NarrativeField {
    Name,
    Class,
    Subclass,
    Race,
    Background,
    Alignment,
    Backstory,
    Appearance,
    Personality,
    Notes,
    Avatar,
}

impl Character {
    pub fn narrative(&self, field: NarrativeField) -> &str {
        match field {
            NarrativeField::Name => &self.name,
            NarrativeField::Class => &self.class,
            NarrativeField::Subclass => &self.subclass,
            NarrativeField::Race => &self.race,
            NarrativeField::Background => &self.background,
            NarrativeField::Alignment => &self.alignment,
            NarrativeField::Backstory => &self.backstory,
            NarrativeField::Appearance => &self.appearance,
            NarrativeField::Personality => &self.personality,
            NarrativeField::Notes => &self.notes,
            NarrativeField::Avatar => self.avatar.as_deref().unwrap_or(""),
        }
    }

    pub fn set_narrative(&mut self, field: NarrativeField, text: String) {
        match field {
            NarrativeField::Name => self.name = text,
            NarrativeField::Class => self.class = text,
            NarrativeField::Subclass => self.subclass = text,
            NarrativeField::Race => self.race = text,
            NarrativeField::Background => self.background = text,
            NarrativeField::Alignment => self.alignment = text,
            NarrativeField::Backstory => self.backstory = text,
            NarrativeField::Appearance => self.appearance = text,
            NarrativeField::Personality => self.personality = text,
            NarrativeField::Notes => self.notes = text,
            NarrativeField::Avatar => self.avatar = Some(text).filter(|t| !t.is_empty()),
        }
    }
}

/// Create a sample level 3 fighter for testing.
pub fn create_sample_fighter(name: &str) -> Character {
    let mut character = Character::new(name);
    character.class = "fighter".to_string();
    character.race = "Human".to_string();
    character.background = "Soldier".to_string();
    character.level = 3;
    character.experience = 900;
    character.attributes = Attributes::new(16, 14, 15, 10, 12, 8);
    character.max_hp = 28;
    character.current_hp = 28;
    character.limbs = rules::default_limbs(character.max_hp, character.attributes.constitution);
    character.armor_class = 10 + character.modifier(Attribute::Dexterity);
    character.max_sanity =
        rules::max_sanity(&character.class, character.attributes.wisdom, character.level);
    character.sanity = character.max_sanity;
    for skill in &mut character.skills {
        if matches!(skill.id, Skill::Athletics | Skill::Intimidation) {
            skill.proficient = true;
        }
    }
    character
        .resources
        .push(Resource::new("Second Wind", 1).recharging(Recharge::ShortRest));
    character.inventory.push(
        Item::armor("Scale Mail", 14)
            .with_max_dex(2)
            .covering(LimbId::Torso, 4)
            .covering(LimbId::LeftArm, 2)
            .covering(LimbId::RightArm, 2),
    );
    character
        .inventory
        .push(Item::weapon("Longsword", "1d8", "slashing").with_weight(3.0));
    character
        .inventory
        .push(Item::weapon("Longbow", "1d8", "piercing").ranged());
    character
        .inventory
        .push(Item::new("Arrows", ItemKind::Ammunition).with_quantity(20));
    character.currency = Purse::new(0, 5, 10);
    character
}
