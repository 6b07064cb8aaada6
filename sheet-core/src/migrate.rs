//! Schema evolution for saved character sheets.
//!
//! Loading a record runs three stages in order:
//!
//! 1. Versioned migration steps on the raw JSON. A step runs when the
//!    record's `schemaVersion` is below the step's version, so each step is
//!    applied at most once per record.
//! 2. [`sanitize`], which always runs and repairs numeric fields that older
//!    releases or hand edits left non-numeric.
//! 3. Lenient typed deserialization followed by [`normalize`], which
//!    re-derives computed fields and restores cross-field invariants.
//!
//! [`normalize`] also runs on every write, so it must be idempotent.

use crate::character::{
    fresh_id, Attack, Attribute, Character, CharacterId, Limb, LimbId, SkillEntry, Skill,
    MAX_LEVEL, MAX_SPELL_LEVEL, SPELL_SCHOOLS,
};
use crate::coerce;
use crate::rules;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::debug;

/// Version written by this release.
pub const CURRENT_SCHEMA_VERSION: u32 = 5;

/// One ordered schema step over the raw JSON object.
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub apply: fn(&mut Map<String, Value>),
}

/// All steps, oldest first.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "fill_collections",
        apply: fill_collections,
    },
    Migration {
        version: 2,
        name: "spellbook_fields",
        apply: spellbook_fields,
    },
    Migration {
        version: 3,
        name: "limbs_and_bonuses",
        apply: limbs_and_bonuses,
    },
    Migration {
        version: 4,
        name: "currency_purse",
        apply: currency_purse,
    },
    Migration {
        version: 5,
        name: "history_categories",
        apply: history_categories,
    },
];

const COLLECTIONS: [&str; 10] = [
    "limbs",
    "resistances",
    "skills",
    "attacks",
    "abilities",
    "resources",
    "spells",
    "inventory",
    "traits",
    "history",
];

fn fill_collections(record: &mut Map<String, Value>) {
    for key in COLLECTIONS {
        if !record.get(key).is_some_and(Value::is_array) {
            record.insert(key.to_string(), Value::Array(Vec::new()));
        }
    }
    if !record.get("attributes").is_some_and(Value::is_object) {
        record.insert("attributes".to_string(), json!({}));
    }
    if !record.get("currency").is_some_and(Value::is_object) {
        record.insert("currency".to_string(), json!({}));
    }
}

fn spellbook_fields(record: &mut Map<String, Value>) {
    if !record.get("knownSchools").is_some_and(Value::is_array) {
        record.insert("knownSchools".to_string(), json!(SPELL_SCHOOLS));
    }
    if !record.get("maxPreparedSpells").is_some_and(Value::is_object) {
        record.insert("maxPreparedSpells".to_string(), json!({}));
    }
}

fn limbs_and_bonuses(record: &mut Map<String, Value>) {
    let has_limbs = record
        .get("limbs")
        .and_then(Value::as_array)
        .is_some_and(|limbs| !limbs.is_empty());
    if !has_limbs {
        let max_hp = record.get("maxHP").map(|v| coerce::int_or(v, 0)).unwrap_or(0);
        let constitution = record
            .get("attributes")
            .and_then(|a| a.get("constitution"))
            .map(|v| coerce::int_or(v, 10))
            .unwrap_or(10);
        let limbs = rules::default_limbs(max_hp, constitution);
        record.insert(
            "limbs".to_string(),
            serde_json::to_value(limbs).unwrap_or_else(|_| json!([])),
        );
    }
    if !record.get("attributeBonuses").is_some_and(Value::is_object) {
        let zeroed: Map<String, Value> = Attribute::all()
            .iter()
            .map(|a| (a.name().to_lowercase(), json!(0)))
            .collect();
        record.insert("attributeBonuses".to_string(), Value::Object(zeroed));
    }
}

/// Early releases kept coins as top-level `gold`/`silver`/`copper` fields.
fn currency_purse(record: &mut Map<String, Value>) {
    let mut purse = match record.remove("currency") {
        Some(Value::Object(purse)) => purse,
        _ => Map::new(),
    };
    for coin in ["copper", "silver", "gold"] {
        if let Some(loose) = record.remove(coin) {
            let existing = purse.get(coin).map(|v| coerce::uint_or(v, 0)).unwrap_or(0);
            let total = existing.saturating_add(coerce::uint_or(&loose, 0));
            purse.insert(coin.to_string(), json!(total));
        }
    }
    record.insert("currency".to_string(), Value::Object(purse));
}

/// History used to be a list of plain strings.
fn history_categories(record: &mut Map<String, Value>) {
    let Some(Value::Array(entries)) = record.get_mut("history") else {
        return;
    };
    for entry in entries.iter_mut() {
        if let Value::String(message) = entry {
            *entry = json!({ "at": 0, "category": "general", "message": message.clone() });
        }
    }
}

/// Repairs that run on every load regardless of version.
///
/// A non-numeric `currentHP` becomes `maxHP`, a non-numeric `sanity` becomes
/// the sanity maximum and a non-numeric resource `current` becomes its `max`.
pub fn sanitize(record: &mut Map<String, Value>) {
    match record.get("id") {
        Some(Value::String(_)) | None => {}
        Some(Value::Number(n)) => {
            let id = n.to_string();
            record.insert("id".to_string(), Value::String(id));
        }
        Some(_) => {
            record.remove("id");
        }
    }

    let max_hp = record.get("maxHP").map(|v| coerce::int_or(v, 0)).unwrap_or(0);
    if !record.get("currentHP").is_some_and(|v| coerce::number(v).is_some()) {
        record.insert("currentHP".to_string(), json!(max_hp));
    }

    if !record.get("sanity").is_some_and(|v| coerce::number(v).is_some()) {
        let max_sanity = record
            .get("maxSanity")
            .and_then(coerce::number)
            .map(|n| n as i32)
            .unwrap_or_else(|| derived_max_sanity(record));
        record.insert("sanity".to_string(), json!(max_sanity));
    }

    if let Some(Value::Array(resources)) = record.get_mut("resources") {
        for resource in resources.iter_mut().filter_map(Value::as_object_mut) {
            if !resource.get("current").is_some_and(|v| coerce::number(v).is_some()) {
                let max = resource.get("max").map(|v| coerce::int_or(v, 0)).unwrap_or(0);
                resource.insert("current".to_string(), json!(max));
            }
        }
    }
}

fn derived_max_sanity(record: &Map<String, Value>) -> i32 {
    let class = record.get("class").and_then(Value::as_str).unwrap_or("");
    let wisdom = record
        .get("attributes")
        .and_then(|a| a.get("wisdom"))
        .map(|v| coerce::int_or(v, 10))
        .unwrap_or(10);
    let level = record
        .get("level")
        .map(|v| coerce::uint_or(v, 1))
        .unwrap_or(1)
        .clamp(1, MAX_LEVEL as u32) as u8;
    rules::max_sanity(class, wisdom, level)
}

/// Run pending migration steps and the always-on repairs over a raw record.
///
/// Returns `None` when the value is not a JSON object.
pub fn migrate_value(value: Value) -> Option<Value> {
    let Value::Object(mut record) = value else {
        return None;
    };
    let version = record
        .get("schemaVersion")
        .map(|v| coerce::uint_or(v, 0))
        .unwrap_or(0);
    for step in MIGRATIONS.iter().filter(|m| version < m.version) {
        debug!(step = step.name, version = step.version, "applying schema migration");
        (step.apply)(&mut record);
    }
    sanitize(&mut record);
    record.insert("schemaVersion".to_string(), json!(CURRENT_SCHEMA_VERSION));
    Some(Value::Object(record))
}

/// Full load path: migrate, deserialize leniently, normalize.
pub fn load_value(value: Value) -> Option<Character> {
    let migrated = migrate_value(value)?;
    let character: Character = serde_json::from_value(migrated).ok()?;
    Some(normalize(character))
}

/// Restore every cross-field invariant of a character.
///
/// Idempotent: `normalize(normalize(c)) == normalize(c)`.
pub fn normalize(mut character: Character) -> Character {
    character.schema_version = CURRENT_SCHEMA_VERSION;
    if character.id.is_empty() {
        character.id = CharacterId::new();
    }

    character.level = character.level.clamp(1, MAX_LEVEL);
    character.proficiency_bonus = rules::proficiency_bonus(character.level);
    character.max_hp = character.max_hp.max(0);
    character.temp_hp = character.temp_hp.max(0);
    character.max_sanity = rules::max_sanity(
        &character.class,
        character.attributes.wisdom,
        character.level,
    );
    character.sanity = character.sanity.clamp(0, character.max_sanity);

    normalize_skills(&mut character);
    normalize_limbs(&mut character);
    fill_ids(&mut character);

    for resource in &mut character.resources {
        resource.max = resource.max.max(0);
        resource.current = resource.current.clamp(0, resource.max);
    }
    for spell in &mut character.spells {
        spell.level = spell.level.min(MAX_SPELL_LEVEL);
    }

    if keep_single_armor(&mut character) {
        refresh_defense(&mut character);
    }
    reconcile_weapon_attacks(&mut character);
    character
}

fn normalize_skills(character: &mut Character) {
    let existing = std::mem::take(&mut character.skills);
    character.skills = Skill::all()
        .into_iter()
        .map(|skill| {
            let mut entry = existing
                .iter()
                .find(|e| e.id == skill)
                .cloned()
                .unwrap_or_else(|| SkillEntry::untrained(skill));
            entry.attribute = skill.attribute();
            entry.proficient |= entry.expertise;
            entry
        })
        .collect();
}

fn normalize_limbs(character: &mut Character) {
    let hp = rules::limb_max_hp(character.max_hp, character.attributes.constitution);
    let existing = std::mem::take(&mut character.limbs);
    character.limbs = LimbId::all()
        .into_iter()
        .map(|id| {
            let mut limb = existing
                .iter()
                .find(|l| l.id == id)
                .cloned()
                .unwrap_or_else(|| Limb::new(id, hp));
            limb.max_hp = limb.max_hp.max(1);
            limb.current_hp = limb.current_hp.clamp(-10, limb.max_hp);
            limb
        })
        .collect();
}

fn fill_ids(character: &mut Character) {
    fn fill(id: &mut String) {
        if id.trim().is_empty() {
            *id = fresh_id();
        }
    }
    character.inventory.iter_mut().for_each(|i| fill(&mut i.id));
    character.attacks.iter_mut().for_each(|a| fill(&mut a.id));
    character.abilities.iter_mut().for_each(|a| fill(&mut a.id));
    character.spells.iter_mut().for_each(|s| fill(&mut s.id));
    character.resources.iter_mut().for_each(|r| fill(&mut r.id));
    character.traits.iter_mut().for_each(|t| fill(&mut t.id));
}

/// Unequip every armor after the first equipped one. Returns whether
/// anything changed.
fn keep_single_armor(character: &mut Character) -> bool {
    let mut seen = false;
    let mut changed = false;
    for item in character.inventory.iter_mut().filter(|i| i.is_armor() && i.equipped) {
        if seen {
            item.equipped = false;
            changed = true;
        }
        seen = true;
    }
    changed
}

/// Recompute armor class and per-limb AC from the current equipment.
pub fn refresh_defense(character: &mut Character) {
    character.armor_class = rules::armor_class(character);
    let limb_acs: Vec<(LimbId, i32)> = LimbId::all()
        .into_iter()
        .map(|id| (id, rules::limb_ac(character, id)))
        .collect();
    for limb in &mut character.limbs {
        if let Some((_, ac)) = limb_acs.iter().find(|(id, _)| *id == limb.id) {
            limb.ac = *ac;
        }
    }
}

/// Make generated attacks match the equipped weapons exactly: drop attacks
/// for weapons no longer equipped, then add one for each equipped weapon
/// that lacks it.
pub fn reconcile_weapon_attacks(character: &mut Character) {
    let equipped: Vec<String> = character.equipped_weapons().map(|w| w.id.clone()).collect();
    let mut seen = HashSet::new();
    character.attacks.retain(|attack| match attack.weapon_item_id() {
        None => true,
        Some(item_id) => equipped.iter().any(|id| id == item_id) && seen.insert(attack.id.clone()),
    });

    let missing: Vec<Attack> = character
        .equipped_weapons()
        .filter(|w| seen.insert(crate::character::weapon_attack_id(&w.id)))
        .map(Attack::from_weapon)
        .collect();
    character.attacks.extend(missing);
}
