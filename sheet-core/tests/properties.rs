//! Property-based tests for the sheet model
//!
//! Tests invariants:
//! - Modifier formula and monotonicity
//! - Proficiency range and monotonicity
//! - Sanity clamping for extreme inputs
//! - Normalization idempotence through a serialize/load round trip
//! - History cap under arbitrary edit sequences
//! - Exact currency conversion

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use sheet_core::character::{create_sample_fighter, Coin, Purse, HISTORY_LIMIT};
use sheet_core::edits::{self, Edit};
use sheet_core::migrate;
use sheet_core::rules;

// ============================================================================
// Strategies for generating test inputs
// ============================================================================

/// A numeric field as a number, a numeric string or junk.
fn arb_number() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-50i64..200).prop_map(|n| json!(n)),
        (-50i64..200).prop_map(|n| json!(n.to_string())),
        Just(json!("lots")),
        Just(Value::Null),
        Just(json!(true)),
    ]
}

fn arb_item() -> impl Strategy<Value = Value> {
    (
        prop_oneof![Just("armor"), Just("weapon"), Just("item"), Just("ammunition"), Just("junk")],
        prop::option::of("[a-c]"),
        any::<bool>(),
        arb_number(),
    )
        .prop_map(|(kind, id, equipped, quantity)| {
            let mut item = json!({
                "name": format!("{kind} piece"),
                "kind": kind,
                "equipped": equipped,
                "quantity": quantity,
            });
            if let Some(id) = id {
                item["id"] = json!(id);
            }
            match kind {
                "armor" => item["armor"] = json!({ "baseAC": 13, "maxDexModifier": 2 }),
                "weapon" => item["weapon"] = json!({ "damage": "1d6", "ranged": equipped }),
                _ => {}
            }
            item
        })
}

fn arb_resource() -> impl Strategy<Value = Value> {
    (arb_number(), arb_number()).prop_map(|(current, max)| {
        json!({ "name": "Pool", "current": current, "max": max })
    })
}

/// A character record with any subset of fields present.
fn arb_record() -> impl Strategy<Value = Value> {
    (
        prop::option::of(arb_number()),
        prop::option::of(arb_number()),
        prop::option::of(arb_number()),
        prop::option::of(arb_number()),
        prop::option::of((arb_number(), arb_number(), arb_number())),
        prop::option::of(prop_oneof![Just("fighter"), Just("warlock"), Just("tinker")]),
        prop::collection::vec(arb_item(), 0..5),
        prop::collection::vec(arb_resource(), 0..3),
        prop::option::of(0u32..6),
    )
        .prop_map(
            |(level, current_hp, max_hp, sanity, attributes, class, items, resources, version)| {
                let mut record = Map::new();
                record.insert("name".to_string(), json!("Prop"));
                let optional = [
                    ("level", level),
                    ("currentHP", current_hp),
                    ("maxHP", max_hp),
                    ("sanity", sanity),
                    ("class", class.map(|c| json!(c))),
                    ("schemaVersion", version.map(|v| json!(v))),
                    (
                        "attributes",
                        attributes.map(|(dex, con, wis)| {
                            json!({ "dexterity": dex, "constitution": con, "wisdom": wis })
                        }),
                    ),
                ];
                for (key, value) in optional {
                    if let Some(value) = value {
                        record.insert(key.to_string(), value);
                    }
                }
                record.insert("inventory".to_string(), Value::Array(items));
                record.insert("resources".to_string(), Value::Array(resources));
                Value::Object(record)
            },
        )
}

fn arb_coin() -> impl Strategy<Value = Coin> {
    prop_oneof![Just(Coin::Copper), Just(Coin::Silver), Just(Coin::Gold)]
}

fn arb_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (-30i32..30).prop_map(|delta| Edit::AdjustHp { delta }),
        (-30i32..30).prop_map(|delta| Edit::AdjustSanity { delta }),
        (-2000i64..2000).prop_map(|amount| Edit::AddExperience { amount }),
        Just(Edit::LevelUp),
        Just(Edit::ShortRest),
        Just(Edit::LongRest),
        (arb_coin(), -50i64..50).prop_map(|(coin, delta)| Edit::AdjustCurrency { coin, delta }),
    ]
}

// ============================================================================
// Derivations
// ============================================================================

proptest! {
    #[test]
    fn modifier_matches_floor_formula(score in 1i32..=30) {
        let expected = ((score - 10) as f64 / 2.0).floor() as i32;
        prop_assert_eq!(rules::ability_modifier(score), expected);
        prop_assert!(rules::ability_modifier(score) <= rules::ability_modifier(score + 1));
    }

    #[test]
    fn proficiency_is_bounded_and_monotonic(level in 1u8..20) {
        let bonus = rules::proficiency_bonus(level);
        prop_assert!((2..=6).contains(&bonus));
        prop_assert!(bonus <= rules::proficiency_bonus(level + 1));
    }

    #[test]
    fn max_sanity_stays_in_range(
        class in prop_oneof![Just("warlock"), Just("cleric"), Just(""), Just("nobody")],
        wisdom in -100i32..200,
        level in any::<u8>(),
    ) {
        let sanity = rules::max_sanity(class, wisdom, level);
        prop_assert!((0..=100).contains(&sanity));
    }
}

// ============================================================================
// Normalization
// ============================================================================

proptest! {
    #[test]
    fn normalization_is_idempotent(record in arb_record()) {
        let Some(first) = migrate::load_value(record) else {
            return Err(TestCaseError::fail("record should load"));
        };
        let serialized = serde_json::to_value(&first).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let reloaded = migrate::load_value(serialized);

        prop_assert_eq!(reloaded.as_ref(), Some(&first));
        prop_assert_eq!(&migrate::normalize(first.clone()), &first);
    }

    #[test]
    fn loaded_records_keep_invariants(record in arb_record()) {
        let Some(c) = migrate::load_value(record) else {
            return Err(TestCaseError::fail("record should load"));
        };
        prop_assert!((1..=20).contains(&c.level));
        prop_assert!((0..=c.max_sanity).contains(&c.sanity));
        prop_assert!(c.resources.iter().all(|r| (0..=r.max).contains(&r.current)));
        prop_assert!(c.inventory.iter().filter(|i| i.is_armor() && i.equipped).count() <= 1);
        for weapon in c.equipped_weapons() {
            let attacks = c
                .attacks
                .iter()
                .filter(|a| a.weapon_item_id() == Some(weapon.id.as_str()))
                .count();
            prop_assert_eq!(attacks, 1);
        }
    }

    #[test]
    fn history_never_exceeds_limit(edits in prop::collection::vec(arb_edit(), 0..40)) {
        let mut character = create_sample_fighter("Busy");
        for (at, edit) in edits.iter().enumerate() {
            character = edits::apply(character, edit, at as u64);
            prop_assert!(character.history.len() <= HISTORY_LIMIT);
        }
        if let Some(latest) = character.history.latest() {
            prop_assert!(character.history.entries().iter().all(|e| e.at <= latest.at));
        }
    }
}

// ============================================================================
// Currency
// ============================================================================

proptest! {
    #[test]
    fn conversion_preserves_value(
        copper in 0u32..10_000,
        silver in 0u32..10_000,
        gold in 0u32..10_000,
        from in arb_coin(),
        to in arb_coin(),
        amount in 0u32..20_000,
    ) {
        let mut purse = Purse::new(copper, silver, gold);
        let before = purse.total_copper();
        purse.convert(from, to, amount);
        prop_assert_eq!(purse.total_copper(), before);
    }

    #[test]
    fn converting_down_then_up_is_exact(gold in 0u32..1_000) {
        let mut purse = Purse::new(0, 0, gold);
        purse.convert(Coin::Gold, Coin::Copper, gold);
        prop_assert_eq!(purse, Purse::new(gold * 100, 0, 0));
        purse.convert(Coin::Copper, Coin::Gold, gold * 100);
        prop_assert_eq!(purse, Purse::new(0, 0, gold));
    }
}
