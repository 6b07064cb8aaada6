//! End-to-end sheet scenarios driven through the character store.
//!
//! Run with: `cargo test -p sheet-core --test store_flow`

use sheet_core::character::{Attribute, HistoryCategory, Item, LimbId, Resource, HISTORY_LIMIT};
use sheet_core::edits::Edit;
use sheet_core::testing::{
    assert_ac, assert_equipped, assert_hp, assert_logged, assert_sanity, assert_unequipped,
    TestHarness,
};
use sheet_core::{Character, CharacterId};

/// A level 1 character with dexterity 18 and nothing equipped.
fn nimble() -> Character {
    let mut character = Character::new("Nimble");
    character.attributes.dexterity = 18;
    character
}

// =============================================================================
// Armor
// =============================================================================

#[tokio::test]
async fn test_armor_caps_dexterity() {
    let mut harness = TestHarness::with_character(nimble()).await;
    harness
        .edit(Edit::AddItem {
            item: Item::armor("Breastplate", 14)
                .with_max_dex(2)
                .covering(LimbId::Torso, 3),
        })
        .await;
    let plate = harness.item_id("Breastplate");

    harness.edit(Edit::EquipItem { item_id: plate.clone() }).await;
    assert_ac(&harness, 16);
    assert_eq!(harness.character().limb(LimbId::Torso).map(|l| l.ac), Some(3));

    harness.edit(Edit::UnequipItem { item_id: plate }).await;
    assert_ac(&harness, 14);
    assert!(harness.character().limbs.iter().all(|l| l.ac == 0));
}

#[tokio::test]
async fn test_only_one_armor_stays_equipped() {
    let mut harness = TestHarness::new().await;
    harness
        .edit(Edit::AddItem {
            item: Item::armor("Chain Mail", 16).without_dex(),
        })
        .await;
    let scale = harness.item_id("Scale Mail");
    let chain = harness.item_id("Chain Mail");

    harness.edit(Edit::EquipItem { item_id: scale }).await;
    harness.edit(Edit::EquipItem { item_id: chain }).await;

    let equipped: Vec<&str> = harness
        .character()
        .inventory
        .iter()
        .filter(|i| i.is_armor() && i.equipped)
        .map(|i| i.name.as_str())
        .collect();
    assert_eq!(equipped, vec!["Chain Mail"]);
    assert_ac(&harness, 16);
}

#[tokio::test]
async fn test_shield_adds_to_armor() {
    let mut harness = TestHarness::new().await;
    harness
        .edit(Edit::AddItem {
            item: Item::shield("Wooden Shield", 2),
        })
        .await;
    let scale = harness.item_id("Scale Mail");
    let shield = harness.item_id("Wooden Shield");

    harness.edit(Edit::EquipItem { item_id: scale }).await;
    harness.edit(Edit::EquipItem { item_id: shield }).await;
    // 14 + dex 2 (capped) + shield 2
    assert_ac(&harness, 18);
}

#[tokio::test]
async fn test_dexterity_change_recomputes_armor_class() {
    let mut harness = TestHarness::with_character(nimble()).await;
    harness
        .edit(Edit::SetAttribute {
            attribute: Attribute::Dexterity,
            score: 12,
        })
        .await;
    assert_ac(&harness, 11);
    assert_logged(&harness, HistoryCategory::Attribute);
}

// =============================================================================
// Weapons
// =============================================================================

#[tokio::test]
async fn test_ranged_weapon_attack_lifecycle() {
    let mut harness = TestHarness::new().await;
    let sword = harness.item_id("Longsword");
    let bow = harness.item_id("Longbow");

    harness.edit(Edit::EquipItem { item_id: sword }).await;
    harness.edit(Edit::EquipItem { item_id: bow.clone() }).await;
    assert_equipped(&harness, "Longbow");

    let attack = harness
        .character()
        .attacks
        .iter()
        .find(|a| a.weapon_item_id() == Some(bow.as_str()))
        .cloned()
        .expect("bow attack");
    assert!(attack.uses_ammunition);
    assert_eq!(attack.attribute, Attribute::Dexterity);

    harness.edit(Edit::UnequipItem { item_id: bow }).await;
    assert_unequipped(&harness, "Longbow");
    assert_equipped(&harness, "Longsword");
    assert_eq!(harness.character().attacks.len(), 1);
}

#[tokio::test]
async fn test_removing_equipped_weapon_drops_attack() {
    let mut harness = TestHarness::new().await;
    let sword = harness.item_id("Longsword");
    harness.edit(Edit::EquipItem { item_id: sword.clone() }).await;
    harness.edit(Edit::RemoveItem { item_id: sword }).await;
    assert!(harness.character().attacks.is_empty());
}

// =============================================================================
// Vitals, resources and progression
// =============================================================================

#[tokio::test]
async fn test_resource_spend_clamps_at_zero() {
    let mut character = Character::new("Caster");
    character.resources.push(Resource::new("Ki", 3));
    let mut harness = TestHarness::with_character(character).await;
    let ki = harness.resource_id("Ki");

    harness
        .edit(Edit::AdjustResource {
            resource_id: ki.clone(),
            delta: -999,
        })
        .await;
    assert_eq!(harness.character().resource(&ki).map(|r| r.current), Some(0));
    assert_logged(&harness, HistoryCategory::Resource);

    harness.store.long_rest().await;
    assert_eq!(harness.character().resource(&ki).map(|r| r.current), Some(3));
}

#[tokio::test]
async fn test_temp_hp_absorbs_damage() {
    let mut harness = TestHarness::new().await;
    harness.edit(Edit::SetTempHp { temp_hp: 5 }).await;
    harness.store.damage(8).await;
    assert_hp(&harness, 25, 28);
    assert_eq!(harness.character().temp_hp, 0);

    harness.store.heal(100).await;
    assert_hp(&harness, 28, 28);
}

#[tokio::test]
async fn test_sanity_is_clamped() {
    let mut harness = TestHarness::new().await;
    let (_, max) = harness.sanity();

    harness.store.adjust_sanity(-1000).await;
    assert_sanity(&harness, 0);
    harness.store.adjust_sanity(1000).await;
    assert_sanity(&harness, max);
}

#[tokio::test]
async fn test_limb_injury_tracks_damage() {
    let mut harness = TestHarness::new().await;
    harness.store.damage_limb(LimbId::LeftLeg, 100).await;
    let leg = harness
        .character()
        .limb(LimbId::LeftLeg)
        .cloned()
        .expect("left leg");
    assert_eq!(leg.current_hp, -10);
    assert_eq!(leg.injury(), sheet_core::rules::LimbInjury::Destroyed);
}

#[tokio::test]
async fn test_level_up_recomputes_proficiency() {
    let mut harness = TestHarness::new().await;
    harness.store.add_experience(6500 - 900).await;
    assert!(harness.store.level_up().await);
    assert!(harness.store.level_up().await);
    assert!(!harness.store.level_up().await);

    let character = harness.character();
    assert_eq!(character.level, 5);
    assert_eq!(character.proficiency_bonus, 3);
    assert_logged(&harness, HistoryCategory::Level);
}

#[tokio::test]
async fn test_history_is_capped_newest_first() {
    let mut harness = TestHarness::new().await;
    for _ in 0..15 {
        harness.store.damage(1).await;
    }
    harness.store.adjust_sanity(-1).await;

    let history = &harness.character().history;
    assert_eq!(history.len(), HISTORY_LIMIT);
    assert_eq!(
        history.entries().first().map(|e| e.category),
        Some(HistoryCategory::Sanity)
    );
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_delete_then_load_is_noop() {
    let mut harness = TestHarness::new().await;
    let id = harness.character().id.clone();
    harness.store.delete(&id).await;

    assert!(harness.store.active().is_none());
    assert!(harness.store.roster().is_empty());
    assert!(harness.store.load(&id).await.is_none());
    assert!(harness.store.active().is_none());

    let reopened = harness.reopen().await;
    assert!(reopened.roster().is_empty());
}

#[tokio::test]
async fn test_unknown_ids_are_noops() {
    let mut harness = TestHarness::new().await;
    let before = harness.character().clone();

    harness
        .edit(Edit::EquipItem {
            item_id: "nope".to_string(),
        })
        .await;
    harness
        .edit(Edit::AdjustResource {
            resource_id: "nope".to_string(),
            delta: -1,
        })
        .await;
    harness
        .edit(Edit::RemoveAttack {
            attack_id: "nope".to_string(),
        })
        .await;
    harness.store.delete(&CharacterId::from("nope")).await;

    assert_eq!(harness.character(), &before);
    assert_eq!(harness.store.roster().len(), 1);
}

#[tokio::test]
async fn test_roster_tracks_updates() {
    let mut harness = TestHarness::new().await;
    harness.store.damage(3).await;

    let reopened = harness.reopen().await;
    assert_eq!(reopened.roster().len(), 1);
    assert_eq!(reopened.roster()[0].current_hp, 25);
}
